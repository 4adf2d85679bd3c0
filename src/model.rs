//! Data model for manifest pre-filling.
//!
//! Holds the session-level [`PackageContext`], the four parsed manifest
//! document kinds, and the opaque records returned by the hosting-platform
//! collaborator. All document types carry unknown keys through a flattened
//! `extra` map so a pre-fill round trip never drops fields the model does
//! not know about.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

// ============================================================================
// Session context
// ============================================================================

/// Per-run package identity shared by the whole resolution session.
///
/// `default_locale` is written at most once per run: after the previous
/// version manifest has been read, the session overwrites it with the
/// locale recorded there (if any). No spawned task writes this struct.
#[derive(Debug, Clone)]
pub struct PackageContext {
    /// Package identifier, e.g. `"Publisher.Package"` (immutable)
    pub identifier: String,

    /// Version being assembled, e.g. `"1.2.3"`
    pub version: String,

    /// Primary locale for textual metadata, e.g. `"en-US"`
    pub default_locale: String,

    /// Display name supplied by the caller, if known
    pub package_name: Option<String>,
}

/// Constants sourced from the manifest schema definition.
///
/// These never go through the field-precedence chain; the schema
/// collaborator owns them.
#[derive(Debug, Clone)]
pub struct SchemaConstants {
    /// `ManifestType` value for a default-locale manifest
    pub default_locale_manifest_type: String,

    /// Schema version stamped into every produced manifest
    pub manifest_version: String,
}

// ============================================================================
// Manifest documents
// ============================================================================

/// Parsed installer manifest (`{identifier}.installer.yaml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstallerManifest {
    pub package_identifier: String,
    pub package_version: String,
    #[serde(default)]
    pub installers: Vec<Installer>,
    #[serde(default)]
    pub manifest_type: Option<String>,
    #[serde(default)]
    pub manifest_version: Option<String>,

    /// Keys not modeled here, preserved verbatim
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// One installer entry inside an [`InstallerManifest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Installer {
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub installer_type: Option<String>,
    #[serde(default)]
    pub installer_url: Option<Url>,
    #[serde(default)]
    pub installer_sha256: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Parsed version manifest (`{identifier}.yaml`).
///
/// `default_locale` is the value that may retarget the stage-3/4 locale
/// lookups of the previous-manifest resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VersionManifest {
    pub package_identifier: String,
    pub package_version: String,
    #[serde(default)]
    pub default_locale: Option<String>,
    #[serde(default)]
    pub manifest_type: Option<String>,
    #[serde(default)]
    pub manifest_version: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Parsed default-locale manifest (`{identifier}.locale.{locale}.yaml`).
///
/// This is the main pre-fill source: every textual field a new manifest may
/// inherit from the previous version lives here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DefaultLocaleManifest {
    #[serde(default)]
    pub package_identifier: Option<String>,
    #[serde(default)]
    pub package_version: Option<String>,
    #[serde(default)]
    pub package_locale: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub publisher_url: Option<Url>,
    #[serde(default)]
    pub publisher_support_url: Option<Url>,
    #[serde(default)]
    pub privacy_url: Option<Url>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub package_url: Option<Url>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub license_url: Option<Url>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default)]
    pub copyright_url: Option<Url>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub moniker: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub release_notes: Option<String>,
    #[serde(default)]
    pub release_notes_url: Option<Url>,
    #[serde(default)]
    pub manifest_type: Option<String>,
    #[serde(default)]
    pub manifest_version: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Parsed non-default locale manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocaleManifest {
    #[serde(default)]
    pub package_identifier: Option<String>,
    #[serde(default)]
    pub package_version: Option<String>,
    pub package_locale: String,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub release_notes: Option<String>,
    #[serde(default)]
    pub release_notes_url: Option<Url>,
    #[serde(default)]
    pub manifest_type: Option<String>,
    #[serde(default)]
    pub manifest_version: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

// ============================================================================
// Hosting-platform records
// ============================================================================

/// Repository record returned by the hosting-platform collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/name`
    pub full_name: String,

    /// Web URL of the repository
    pub html_url: Url,

    /// Repository description, if set
    pub description: Option<String>,

    /// License identifier, lowercase as the platform reports it
    pub license_id: Option<String>,

    /// Owner's blog/homepage field, free-form text
    pub owner_blog: Option<String>,

    /// Whether the issue tracker is enabled
    pub has_issues: bool,

    /// Repository topics
    pub topics: Vec<String>,
}

/// Release record for a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub tag: String,
    pub html_url: Url,

    /// Markdown release body, if any
    pub body: Option<String>,
}

/// One downloadable asset attached to a release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: Url,

    /// Creation timestamp, RFC 3339 (e.g. `"2024-01-02T03:04:05Z"`)
    pub created_at: String,
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Bare filename, e.g. `"Publisher.Package.installer.yaml"`
    pub name: String,

    /// Full path usable with the fetch collaborator
    pub path: String,

    /// Web URL of the entry, when the platform exposes one
    pub html_url: Option<Url>,
}
