//! Hosting-platform metadata detection.
//!
//! Given one release-asset URL, [`DetectionSource::spawn`] validates that
//! the URL belongs to the known hosting platform, then launches one task per
//! inferable field (license, URLs, release notes, ...). The repository,
//! release, and matching asset are fetched once and shared by every field
//! task; each field resolves independently and collapses its own failures
//! to absent without disturbing siblings.

use crate::model::{Release, ReleaseAsset, Repository};
use crate::resolve::task::FieldTask;
use crate::resolve::text::format_release_notes;
use crate::traits::{FetchError, FieldError, HostingApi, UrlValidator};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use url::Url;

/// Host the detection source accepts asset URLs from.
pub const HOSTING_HOST: &str = "github.com";

/// Construction-time failure: the one error in this crate that is fatal.
///
/// Raised before any task is spawned; a caller holding this must not
/// proceed with detection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    /// The asset URL's host is not the hosting platform
    #[error("asset url host '{host}' does not match the hosting platform")]
    HostMismatch { host: String },

    /// The asset URL path does not contain owner/repo/tag/asset segments
    #[error("asset url path is not a release-asset path")]
    MalformedAssetUrl,
}

/// Repository + release + matching asset, fetched once per bundle.
#[derive(Debug)]
struct ReleaseContext {
    repository: Repository,
    release: Release,
    asset: ReleaseAsset,
}

/// Inputs shared by every field task.
struct DetectionSeed {
    api: Arc<dyn HostingApi>,
    validator: Arc<dyn UrlValidator>,
    full_name: String,
    tag: String,
    asset_url: Url,
    base: OnceCell<Result<Arc<ReleaseContext>, FetchError>>,
}

impl DetectionSeed {
    /// Resolves the shared release context, fetching it on first use.
    ///
    /// Concurrent callers wait on the single in-flight fetch; a failure is
    /// cached and handed to every field as its own failure.
    async fn context(&self) -> Result<Arc<ReleaseContext>, FieldError> {
        let result = self
            .base
            .get_or_init(|| async {
                let repository = self.api.repository(&self.full_name).await?;
                let release = self.api.release_by_tag(&repository, &self.tag).await?;
                let assets = self.api.release_assets(&release).await?;
                let asset = assets
                    .into_iter()
                    .find(|asset| asset.browser_download_url == self.asset_url)
                    .ok_or(FetchError::NotFound)?;
                Ok(Arc::new(ReleaseContext {
                    repository,
                    release,
                    asset,
                }))
            })
            .await;
        result.clone().map_err(FieldError::from)
    }
}

/// In-flight detection tasks, one per field.
///
/// Every field is awaitable on its own via [`FieldTask::get`], or all at
/// once via [`DetectionBundle::join`].
#[derive(Debug)]
pub struct DetectionBundle {
    pub publisher_url: FieldTask<Url>,
    pub short_description: FieldTask<String>,
    pub support_url: FieldTask<Url>,
    pub license: FieldTask<String>,
    pub license_url: FieldTask<Url>,
    pub package_url: FieldTask<Url>,
    pub release_date: FieldTask<String>,
    pub release_notes_url: FieldTask<Url>,
    pub release_notes: FieldTask<String>,
    pub privacy_url: FieldTask<Url>,
    pub topics: FieldTask<Vec<String>>,
}

/// Joined detection results; every field absent on any per-field failure.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetectionData {
    pub publisher_url: Option<Url>,
    pub short_description: Option<String>,
    pub support_url: Option<Url>,
    pub license: Option<String>,
    pub license_url: Option<Url>,
    pub package_url: Option<Url>,
    pub release_date: Option<String>,
    pub release_notes_url: Option<Url>,
    pub release_notes: Option<String>,
    pub privacy_url: Option<Url>,
    pub topics: Option<Vec<String>>,
}

impl DetectionBundle {
    /// Awaits every field concurrently.
    pub async fn join(self) -> DetectionData {
        let (
            publisher_url,
            short_description,
            support_url,
            license,
            license_url,
            package_url,
            release_date,
            release_notes_url,
            release_notes,
            privacy_url,
            topics,
        ) = tokio::join!(
            self.publisher_url.get(),
            self.short_description.get(),
            self.support_url.get(),
            self.license.get(),
            self.license_url.get(),
            self.package_url.get(),
            self.release_date.get(),
            self.release_notes_url.get(),
            self.release_notes.get(),
            self.privacy_url.get(),
            self.topics.get(),
        );
        DetectionData {
            publisher_url,
            short_description,
            support_url,
            license,
            license_url,
            package_url,
            release_date,
            release_notes_url,
            release_notes,
            privacy_url,
            topics,
        }
    }
}

/// Spawns the per-field detection tasks for one release-asset URL.
pub struct DetectionSource;

impl DetectionSource {
    /// Validates the asset URL and launches all field tasks.
    ///
    /// The URL must point at the hosting platform and follow the
    /// `/{owner}/{repo}/.../{tag}/{asset}` release-download layout; anything
    /// else fails here, before any task is spawned.
    pub fn spawn(
        asset_url: Url,
        api: Arc<dyn HostingApi>,
        validator: Arc<dyn UrlValidator>,
    ) -> Result<DetectionBundle, DetectionError> {
        let host = asset_url.host_str().unwrap_or_default();
        if !host.eq_ignore_ascii_case(HOSTING_HOST) {
            return Err(DetectionError::HostMismatch {
                host: host.to_string(),
            });
        }

        let segments: Vec<&str> = asset_url
            .path_segments()
            .map(|segments| segments.collect())
            .unwrap_or_default();
        if segments.len() < 4 {
            return Err(DetectionError::MalformedAssetUrl);
        }
        let full_name = format!("{}/{}", segments[0], segments[1]);
        let tag = segments[segments.len() - 2].to_string();

        let seed = Arc::new(DetectionSeed {
            api,
            validator,
            full_name,
            tag,
            asset_url,
            base: OnceCell::new(),
        });

        let license = {
            let seed = seed.clone();
            FieldTask::spawn("detection.license", async move {
                let base = seed.context().await?;
                Ok(base
                    .repository
                    .license_id
                    .as_ref()
                    .map(|id| id.to_uppercase()))
            })
        };

        let license_url = {
            let seed = seed.clone();
            FieldTask::spawn("detection.license_url", async move {
                let base = seed.context().await?;
                match seed.api.license_content(&base.repository).await {
                    Ok(entry) => Ok(entry.html_url),
                    Err(FetchError::NotFound) => Ok(None),
                    Err(error) => Err(error.into()),
                }
            })
        };

        let package_url = {
            let seed = seed.clone();
            FieldTask::spawn("detection.package_url", async move {
                let base = seed.context().await?;
                Ok(Some(base.repository.html_url.clone()))
            })
        };

        let publisher_url = {
            let seed = seed.clone();
            FieldTask::spawn("detection.publisher_url", async move {
                let base = seed.context().await?;
                Ok(base
                    .repository
                    .owner_blog
                    .as_deref()
                    .and_then(|blog| Url::parse(blog).ok()))
            })
        };

        let short_description = {
            let seed = seed.clone();
            FieldTask::spawn("detection.short_description", async move {
                let base = seed.context().await?;
                Ok(base.repository.description.clone())
            })
        };

        let topics = {
            let seed = seed.clone();
            FieldTask::spawn("detection.topics", async move {
                let base = seed.context().await?;
                let topics = base.repository.topics.clone();
                Ok(if topics.is_empty() { None } else { Some(topics) })
            })
        };

        let release_date = {
            let seed = seed.clone();
            FieldTask::spawn("detection.release_date", async move {
                let base = seed.context().await?;
                Ok(base
                    .asset
                    .created_at
                    .split('T')
                    .next()
                    .filter(|date| !date.is_empty())
                    .map(str::to_string))
            })
        };

        let release_notes_url = {
            let seed = seed.clone();
            FieldTask::spawn("detection.release_notes_url", async move {
                let base = seed.context().await?;
                Ok(Some(base.release.html_url.clone()))
            })
        };

        let release_notes = {
            let seed = seed.clone();
            FieldTask::spawn("detection.release_notes", async move {
                let base = seed.context().await?;
                Ok(base
                    .release
                    .body
                    .as_deref()
                    .and_then(format_release_notes))
            })
        };

        let privacy_url = {
            let seed = seed.clone();
            FieldTask::spawn("detection.privacy_url", async move {
                let base = seed.context().await?;
                let entries = match seed.api.directory_listing(&base.repository, "").await {
                    Ok(entries) => entries,
                    Err(FetchError::NotFound) => return Ok(None),
                    Err(error) => return Err(error.into()),
                };
                Ok(entries
                    .into_iter()
                    .find(|entry| entry.name.to_lowercase().contains("privacy"))
                    .and_then(|entry| entry.html_url))
            })
        };

        let support_url = {
            let seed = seed.clone();
            FieldTask::spawn("detection.support_url", async move {
                let base = seed.context().await?;
                let candidate = format!("{}/support", seed.asset_url);
                if seed.validator.validate(&candidate, false).is_ok() {
                    return Ok(Url::parse(&candidate).ok());
                }
                if base.repository.has_issues {
                    let issues =
                        format!("https://{HOSTING_HOST}/{}/issues", base.repository.full_name);
                    return Ok(Url::parse(&issues).ok());
                }
                Ok(None)
            })
        };

        Ok(DetectionBundle {
            publisher_url,
            short_description,
            support_url,
            license,
            license_url,
            package_url,
            release_date,
            release_notes_url,
            release_notes,
            privacy_url,
            topics,
        })
    }
}
