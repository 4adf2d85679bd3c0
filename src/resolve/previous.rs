//! Previous-manifest resolution.
//!
//! Locates the four manifest files of the prior package version in the
//! remote registry and parses them, each stage as its own [`FieldTask`]:
//! 1. installer manifest (independent)
//! 2. version manifest (independent; yields the effective default locale)
//! 3. default-locale manifest (gated on stage 2 — the filename embeds the
//!    locale code)
//! 4. non-default locale manifests (gated on stage 2)
//!
//! Every stage fails silently: a missing directory, missing file, fetch
//! error, or parse error leaves the corresponding field absent and never
//! disturbs its siblings.

use crate::model::{
    DefaultLocaleManifest, FileEntry, InstallerManifest, LocaleManifest, PackageContext,
    VersionManifest,
};
use crate::resolve::task::FieldTask;
use crate::traits::{FetchError, FieldError, ManifestParser, RemoteRegistry};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{oneshot, OnceCell};
use tracing::debug;

/// Registry directory for a package, optionally down to one version.
///
/// Layout: `manifests/{first char, lowercased}/{identifier parts}/{version}`,
/// e.g. `Package.Identifier`/`1.2.3` → `manifests/p/Package/Identifier/1.2.3`.
pub fn package_path(identifier: &str, version: Option<&str>) -> String {
    let mut result = String::from("manifests");
    if let Some(first) = identifier.chars().next() {
        result.push('/');
        result.push(first.to_ascii_lowercase());
        for part in identifier.split('.') {
            result.push('/');
            result.push_str(part);
        }
    }
    if let Some(version) = version {
        result.push('/');
        result.push_str(version);
    }
    result
}

/// Directory listing shared by all four stages, fetched at most once.
///
/// An absent directory (unknown identifier or version) collapses to an empty
/// listing so every stage resolves to "no data" without error.
type SharedListing = Arc<OnceCell<Result<Arc<Vec<FileEntry>>, FetchError>>>;

async fn cached_listing(
    registry: &Arc<dyn RemoteRegistry>,
    cell: &SharedListing,
    path: &str,
) -> Result<Arc<Vec<FileEntry>>, FieldError> {
    let result = cell
        .get_or_init(|| async {
            match registry.directory_listing(path).await {
                Ok(entries) => Ok(Arc::new(entries)),
                Err(FetchError::NotFound) => Ok(Arc::new(Vec::new())),
                Err(error) => Err(error),
            }
        })
        .await;
    result.clone().map_err(FieldError::from)
}

/// Fetches the bytes of the listing entry named `name`, absent when the
/// entry is not listed or has vanished since listing.
async fn entry_bytes(
    registry: &Arc<dyn RemoteRegistry>,
    entries: &[FileEntry],
    name: &str,
) -> Result<Option<Vec<u8>>, FieldError> {
    let Some(entry) = entries.iter().find(|entry| entry.name == name) else {
        return Ok(None);
    };
    match registry.file_content(&entry.path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(FetchError::NotFound) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// In-flight handles for the four previous-manifest stages.
///
/// Returned immediately by [`PreviousManifestResolver::spawn`]; the fetches
/// run on the runtime while the caller does other work.
#[derive(Debug)]
pub struct PreviousManifestHandles {
    pub installer: FieldTask<InstallerManifest>,
    pub version: FieldTask<VersionManifest>,
    pub default_locale: FieldTask<DefaultLocaleManifest>,
    pub locales: FieldTask<Vec<LocaleManifest>>,
    prior_locale: String,
}

/// Joined previous-manifest data, each document present at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousManifestBundle {
    pub installer: Option<InstallerManifest>,
    pub version: Option<VersionManifest>,
    pub default_locale_manifest: Option<DefaultLocaleManifest>,
    pub locales: Option<Vec<LocaleManifest>>,

    /// Effective default locale: the previous version manifest's value when
    /// it parsed, otherwise the locale the session started with.
    pub default_locale: String,
}

impl PreviousManifestHandles {
    /// Awaits all four stages and computes the effective default locale.
    pub async fn join(self) -> PreviousManifestBundle {
        let (installer, version, default_locale_manifest, locales) = tokio::join!(
            self.installer.get(),
            self.version.get(),
            self.default_locale.get(),
            self.locales.get(),
        );
        let default_locale = version
            .as_ref()
            .and_then(|manifest| manifest.default_locale.clone())
            .unwrap_or(self.prior_locale);
        PreviousManifestBundle {
            installer,
            version,
            default_locale_manifest,
            locales,
            default_locale,
        }
    }
}

/// Spawns the staged previous-manifest fetches for one package version.
pub struct PreviousManifestResolver;

impl PreviousManifestResolver {
    /// Launches all four stages and returns their handles without blocking.
    ///
    /// Stage ordering is enforced with oneshot barriers: stages 3 and 4 wait
    /// for stage 2 to deliver the effective default locale before they touch
    /// the registry. Stage 2 sends on completion whether or not the version
    /// manifest resolved; if its task dies the receivers fall back to the
    /// prior locale.
    pub fn spawn(
        ctx: &PackageContext,
        registry: Arc<dyn RemoteRegistry>,
        parser: Arc<dyn ManifestParser>,
    ) -> PreviousManifestHandles {
        let dir = package_path(&ctx.identifier, Some(&ctx.version));
        let listing: SharedListing = Arc::new(OnceCell::new());
        let (locale_tx3, locale_rx3) = oneshot::channel::<String>();
        let (locale_tx4, locale_rx4) = oneshot::channel::<String>();

        let installer = {
            let registry = registry.clone();
            let parser = parser.clone();
            let listing = listing.clone();
            let dir = dir.clone();
            let name = format!("{}.installer.yaml", ctx.identifier);
            FieldTask::spawn("previous.installer", async move {
                let entries = cached_listing(&registry, &listing, &dir).await?;
                match entry_bytes(&registry, &entries, &name).await? {
                    Some(bytes) => Ok(Some(parser.parse_installer(&bytes)?)),
                    None => Ok(None),
                }
            })
        };

        let version = {
            let registry = registry.clone();
            let parser = parser.clone();
            let listing = listing.clone();
            let dir = dir.clone();
            let name = format!("{}.yaml", ctx.identifier);
            let prior = ctx.default_locale.clone();
            FieldTask::spawn("previous.version", async move {
                let result: Result<Option<VersionManifest>, FieldError> = async {
                    let entries = cached_listing(&registry, &listing, &dir).await?;
                    match entry_bytes(&registry, &entries, &name).await? {
                        Some(bytes) => Ok(Some(parser.parse_version(&bytes)?)),
                        None => Ok(None),
                    }
                }
                .await;

                // Completion barrier for stages 3/4: always send, success or
                // not, so the locale-dependent fetches can start.
                let effective = result
                    .as_ref()
                    .ok()
                    .and_then(|manifest| manifest.as_ref())
                    .and_then(|manifest| manifest.default_locale.clone())
                    .unwrap_or(prior);
                let _ = locale_tx3.send(effective.clone());
                let _ = locale_tx4.send(effective);

                result
            })
        };

        let default_locale = {
            let registry = registry.clone();
            let parser = parser.clone();
            let listing = listing.clone();
            let dir = dir.clone();
            let identifier = ctx.identifier.clone();
            let prior = ctx.default_locale.clone();
            FieldTask::spawn("previous.default_locale", async move {
                let locale = locale_rx3.await.unwrap_or(prior);
                let entries = cached_listing(&registry, &listing, &dir).await?;
                let name = format!("{identifier}.locale.{locale}.yaml");
                match entry_bytes(&registry, &entries, &name).await? {
                    Some(bytes) => Ok(Some(parser.parse_default_locale(&bytes)?)),
                    None => Ok(None),
                }
            })
        };

        let locales = {
            let registry = registry.clone();
            let parser = parser.clone();
            let listing = listing.clone();
            let dir = dir.clone();
            let identifier = ctx.identifier.clone();
            let prior = ctx.default_locale.clone();
            FieldTask::spawn("previous.locales", async move {
                let locale = locale_rx4.await.unwrap_or(prior);
                let entries = cached_listing(&registry, &listing, &dir).await?;
                let pattern = Regex::new(&format!(
                    r"^{}\.locale\..+\.yaml$",
                    regex::escape(&identifier)
                ))
                .expect("valid locale filename pattern");
                let default_name = format!("{identifier}.locale.{locale}.yaml");

                let mut seen = HashSet::new();
                let mut manifests = Vec::new();
                for entry in entries.iter() {
                    if entry.name == default_name || !pattern.is_match(&entry.name) {
                        continue;
                    }
                    if !seen.insert(entry.name.clone()) {
                        continue;
                    }
                    let bytes = match registry.file_content(&entry.path).await {
                        Ok(bytes) => bytes,
                        Err(error) => {
                            debug!(file = %entry.name, %error, "skipping locale manifest");
                            continue;
                        }
                    };
                    match parser.parse_locale(&bytes) {
                        Ok(manifest) => manifests.push(manifest),
                        Err(error) => {
                            debug!(file = %entry.name, %error, "skipping unparsable locale manifest");
                        }
                    }
                }
                if manifests.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(manifests))
                }
            })
        };

        PreviousManifestHandles {
            installer,
            version,
            default_locale,
            locales,
            prior_locale: ctx.default_locale.clone(),
        }
    }
}
