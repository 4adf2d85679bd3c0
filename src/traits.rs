//! Collaborator traits and the error taxonomy.
//!
//! The pre-fill core never talks to the network, parses YAML, or validates
//! URLs against a schema itself. Those capabilities are consumed through the
//! traits below and injected by the caller:
//! - [`RemoteRegistry`]: the package registry holding previous manifests
//! - [`HostingApi`]: the source-hosting platform (repositories, releases)
//! - [`ManifestParser`]: raw bytes to parsed manifest documents
//! - [`UrlValidator`]: schema-level URL validation (support-URL heuristic)

use crate::model::{
    DefaultLocaleManifest, FileEntry, InstallerManifest, LocaleManifest, Release, ReleaseAsset,
    Repository, VersionManifest,
};
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// Error taxonomy
// ============================================================================

/// Remote fetch failure, as seen by any lookup task.
///
/// Both variants are non-fatal at the field level: a field whose fetch fails
/// resolves to absent. `Clone` is required because a single failed base fetch
/// (e.g. the repository lookup) is handed to every detection field task.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// File, directory, repository, or release does not exist
    #[error("remote resource not found")]
    NotFound,

    /// Network/API failure, including collaborator-side timeouts
    #[error("transient fetch error: {0}")]
    Transient(String),
}

/// Malformed manifest content.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("failed to parse {kind} manifest: {message}")]
pub struct ParseError {
    /// Manifest kind, e.g. `"version"` or `"defaultLocale"`
    pub kind: &'static str,
    pub message: String,
}

/// URL rejected by the schema validator.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid url '{candidate}': {reason}")]
pub struct UrlError {
    pub candidate: String,
    pub reason: String,
}

/// Why a single field task produced no value.
///
/// Collapsed to absent at the task boundary (see `resolve::FieldTask`),
/// never propagated to sibling fields.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Read-only access to the remote package registry (previous manifests).
///
/// Paths follow the registry layout produced by
/// [`package_path`](crate::resolve::package_path).
#[async_trait]
pub trait RemoteRegistry: Send + Sync {
    /// Lists a directory. `Err(FetchError::NotFound)` when the directory
    /// does not exist.
    async fn directory_listing(&self, path: &str) -> Result<Vec<FileEntry>, FetchError>;

    /// Fetches raw file bytes.
    async fn file_content(&self, path: &str) -> Result<Vec<u8>, FetchError>;
}

/// Read-only access to the source-hosting platform's repository/release API.
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// Looks up a repository by `owner/name`.
    async fn repository(&self, full_name: &str) -> Result<Repository, FetchError>;

    /// Looks up a release by tag name.
    async fn release_by_tag(&self, repo: &Repository, tag: &str) -> Result<Release, FetchError>;

    /// Lists the assets attached to a release.
    async fn release_assets(&self, release: &Release) -> Result<Vec<ReleaseAsset>, FetchError>;

    /// Lists a directory of the repository's default branch
    /// (`""` for the root).
    async fn directory_listing(
        &self,
        repo: &Repository,
        path: &str,
    ) -> Result<Vec<FileEntry>, FetchError>;

    /// Returns the repository's license file entry.
    async fn license_content(&self, repo: &Repository) -> Result<FileEntry, FetchError>;
}

/// Decodes raw manifest bytes, one method per manifest kind.
///
/// The YAML codec and schema validation live with the caller; this crate
/// only consumes the parsed documents.
pub trait ManifestParser: Send + Sync {
    fn parse_installer(&self, bytes: &[u8]) -> Result<InstallerManifest, ParseError>;
    fn parse_version(&self, bytes: &[u8]) -> Result<VersionManifest, ParseError>;
    fn parse_default_locale(&self, bytes: &[u8]) -> Result<DefaultLocaleManifest, ParseError>;
    fn parse_locale(&self, bytes: &[u8]) -> Result<LocaleManifest, ParseError>;
}

/// Validates a candidate URL against the manifest schema's URL rules.
pub trait UrlValidator: Send + Sync {
    /// `Ok(())` when the candidate is acceptable for a URL-typed manifest
    /// field. `can_be_blank` mirrors the schema's empty-string allowance.
    fn validate(&self, candidate: &str, can_be_blank: bool) -> Result<(), UrlError>;
}
