//! Session wiring for one manifest pre-fill run.
//!
//! [`ResolverSession`] owns the collaborator handles and drives the data
//! flow: spawn the previous-manifest stages and the detection tasks, join
//! both concurrently, apply the once-per-run default-locale update, then
//! run the pure field resolution. The raw bundles travel in the outcome so
//! the downstream assembler can re-query them (installer data, release
//! date, schema extras).

use crate::model::{PackageContext, SchemaConstants};
use crate::resolve::detection::{DetectionData, DetectionError, DetectionSource};
use crate::resolve::fields::{resolve_fields, FieldOverrides, ResolvedFields};
use crate::resolve::previous::{PreviousManifestBundle, PreviousManifestResolver};
use crate::traits::{HostingApi, ManifestParser, RemoteRegistry, UrlValidator};
use std::sync::Arc;
use tracing::{info, instrument};
use url::Url;

/// One pre-fill session's collaborators and schema constants.
pub struct ResolverSession {
    registry: Arc<dyn RemoteRegistry>,
    hosting: Arc<dyn HostingApi>,
    parser: Arc<dyn ManifestParser>,
    url_validator: Arc<dyn UrlValidator>,
    schema: SchemaConstants,
}

/// Everything a manifest assembler needs from one run.
#[derive(Debug)]
pub struct SessionOutcome {
    /// Per-field values after precedence resolution
    pub fields: ResolvedFields,

    /// Raw previous-manifest documents, for fields resolved elsewhere
    pub previous: PreviousManifestBundle,

    /// Raw detection results; `None` when no asset URL was supplied
    pub detection: Option<DetectionData>,

    /// The context, with its default locale finalized
    pub context: PackageContext,
}

impl ResolverSession {
    pub fn new(
        registry: Arc<dyn RemoteRegistry>,
        hosting: Arc<dyn HostingApi>,
        parser: Arc<dyn ManifestParser>,
        url_validator: Arc<dyn UrlValidator>,
        schema: SchemaConstants,
    ) -> Self {
        Self {
            registry,
            hosting,
            parser,
            url_validator,
            schema,
        }
    }

    /// Runs the full resolution pipeline for one package version.
    ///
    /// The only hard failure is an asset URL that does not belong to the
    /// hosting platform; every remote field failure resolves to absent.
    #[instrument(skip_all, fields(identifier = %ctx.identifier, version = %ctx.version))]
    pub async fn resolve(
        &self,
        mut ctx: PackageContext,
        overrides: FieldOverrides,
        asset_url: Option<Url>,
    ) -> Result<SessionOutcome, DetectionError> {
        // Host validation is the one hard failure; do it before anything
        // else is spawned.
        let detection_bundle = match asset_url {
            Some(url) => Some(DetectionSource::spawn(
                url,
                self.hosting.clone(),
                self.url_validator.clone(),
            )?),
            None => None,
        };
        let handles =
            PreviousManifestResolver::spawn(&ctx, self.registry.clone(), self.parser.clone());
        info!(detection = detection_bundle.is_some(), "remote lookups started");

        let (previous, detection) = match detection_bundle {
            Some(bundle) => {
                let (previous, detection) = tokio::join!(handles.join(), bundle.join());
                (previous, Some(detection))
            }
            None => (handles.join().await, None),
        };

        // The single once-per-run default-locale write; stage 2 has
        // completed by the time the bundle is joined.
        ctx.default_locale = previous.default_locale.clone();

        let fields = resolve_fields(&overrides, &ctx, detection.as_ref(), &previous, &self.schema);
        info!(default_locale = %ctx.default_locale, "field resolution complete");

        Ok(SessionOutcome {
            fields,
            previous,
            detection,
            context: ctx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DefaultLocaleManifest, FileEntry, InstallerManifest, LocaleManifest, Release, ReleaseAsset,
        Repository, VersionManifest,
    };
    use crate::traits::{FetchError, ParseError, UrlError};
    use async_trait::async_trait;
    use std::collections::HashMap;

    const ASSET_URL: &str = "https://github.com/owner/repo/releases/download/v2.0.0/tool.msi";

    fn context() -> PackageContext {
        PackageContext {
            identifier: "Owner.Tool".to_string(),
            version: "2.0.0".to_string(),
            default_locale: "en-US".to_string(),
            package_name: Some("Tool".to_string()),
        }
    }

    fn schema() -> SchemaConstants {
        SchemaConstants {
            default_locale_manifest_type: "defaultLocale".to_string(),
            manifest_version: "1.6.0".to_string(),
        }
    }

    struct MapRegistry {
        files: HashMap<String, Vec<u8>>,
    }

    impl MapRegistry {
        fn empty() -> Self {
            Self {
                files: HashMap::new(),
            }
        }

        fn for_previous_version() -> Self {
            let dir = "manifests/o/Owner/Tool/2.0.0";
            let mut files = HashMap::new();
            files.insert(
                format!("{dir}/Owner.Tool.yaml"),
                serde_json::to_vec(&serde_json::json!({
                    "PackageIdentifier": "Owner.Tool",
                    "PackageVersion": "1.9.0",
                    "DefaultLocale": "en-GB",
                }))
                .unwrap(),
            );
            files.insert(
                format!("{dir}/Owner.Tool.locale.en-GB.yaml"),
                serde_json::to_vec(&serde_json::json!({
                    "PackageLocale": "en-GB",
                    "Publisher": "Previous Publisher",
                    "License": "Apache-2.0",
                }))
                .unwrap(),
            );
            Self { files }
        }
    }

    #[async_trait]
    impl RemoteRegistry for MapRegistry {
        async fn directory_listing(&self, path: &str) -> Result<Vec<FileEntry>, FetchError> {
            let entries: Vec<FileEntry> = self
                .files
                .keys()
                .filter(|file| file.starts_with(&format!("{path}/")))
                .map(|file| FileEntry {
                    name: file.rsplit('/').next().unwrap().to_string(),
                    path: file.clone(),
                    html_url: None,
                })
                .collect();
            if entries.is_empty() {
                return Err(FetchError::NotFound);
            }
            Ok(entries)
        }

        async fn file_content(&self, path: &str) -> Result<Vec<u8>, FetchError> {
            self.files.get(path).cloned().ok_or(FetchError::NotFound)
        }
    }

    struct JsonParser;

    fn json_parse<T: serde::de::DeserializeOwned>(
        kind: &'static str,
        bytes: &[u8],
    ) -> Result<T, ParseError> {
        serde_json::from_slice(bytes).map_err(|error| ParseError {
            kind,
            message: error.to_string(),
        })
    }

    impl ManifestParser for JsonParser {
        fn parse_installer(&self, bytes: &[u8]) -> Result<InstallerManifest, ParseError> {
            json_parse("installer", bytes)
        }

        fn parse_version(&self, bytes: &[u8]) -> Result<VersionManifest, ParseError> {
            json_parse("version", bytes)
        }

        fn parse_default_locale(&self, bytes: &[u8]) -> Result<DefaultLocaleManifest, ParseError> {
            json_parse("defaultLocale", bytes)
        }

        fn parse_locale(&self, bytes: &[u8]) -> Result<LocaleManifest, ParseError> {
            json_parse("locale", bytes)
        }
    }

    struct StubHosting;

    #[async_trait]
    impl HostingApi for StubHosting {
        async fn repository(&self, full_name: &str) -> Result<Repository, FetchError> {
            Ok(Repository {
                full_name: full_name.to_string(),
                html_url: Url::parse("https://github.com/owner/repo").unwrap(),
                description: Some("Detected description".to_string()),
                license_id: Some("mit".to_string()),
                owner_blog: None,
                has_issues: true,
                topics: Vec::new(),
            })
        }

        async fn release_by_tag(
            &self,
            _repo: &Repository,
            tag: &str,
        ) -> Result<Release, FetchError> {
            Ok(Release {
                tag: tag.to_string(),
                html_url: Url::parse("https://github.com/owner/repo/releases/tag/v2.0.0").unwrap(),
                body: None,
            })
        }

        async fn release_assets(&self, _release: &Release) -> Result<Vec<ReleaseAsset>, FetchError> {
            Ok(vec![ReleaseAsset {
                name: "tool.msi".to_string(),
                browser_download_url: Url::parse(ASSET_URL).unwrap(),
                created_at: "2024-06-07T00:00:00Z".to_string(),
            }])
        }

        async fn directory_listing(
            &self,
            _repo: &Repository,
            _path: &str,
        ) -> Result<Vec<FileEntry>, FetchError> {
            Ok(Vec::new())
        }

        async fn license_content(&self, _repo: &Repository) -> Result<FileEntry, FetchError> {
            Err(FetchError::NotFound)
        }
    }

    struct AcceptAll;
    impl UrlValidator for AcceptAll {
        fn validate(&self, _candidate: &str, _can_be_blank: bool) -> Result<(), UrlError> {
            Ok(())
        }
    }

    fn session(registry: MapRegistry) -> ResolverSession {
        ResolverSession::new(
            Arc::new(registry),
            Arc::new(StubHosting),
            Arc::new(JsonParser),
            Arc::new(AcceptAll),
            schema(),
        )
    }

    #[tokio::test]
    async fn test_full_run_combines_all_sources() {
        let session = session(MapRegistry::for_previous_version());
        let overrides = FieldOverrides {
            publisher: Some("Override Publisher".to_string()),
            ..Default::default()
        };
        let outcome = session
            .resolve(context(), overrides, Some(Url::parse(ASSET_URL).unwrap()))
            .await
            .unwrap();

        // Explicit input beats the previous manifest.
        assert_eq!(outcome.fields.publisher, "Override Publisher");
        // Detection beats the previous manifest for the license.
        assert_eq!(outcome.fields.license, "MIT");
        // Previous manifest was read against the retargeted locale.
        assert_eq!(outcome.context.default_locale, "en-GB");
        assert!(outcome.previous.default_locale_manifest.is_some());
        assert_eq!(
            outcome
                .detection
                .as_ref()
                .and_then(|data| data.short_description.as_deref()),
            Some("Detected description")
        );
    }

    #[tokio::test]
    async fn test_detection_is_optional() {
        let session = session(MapRegistry::for_previous_version());
        let outcome = session
            .resolve(context(), FieldOverrides::default(), None)
            .await
            .unwrap();

        assert!(outcome.detection.is_none());
        // License falls back to the previous manifest.
        assert_eq!(outcome.fields.license, "Apache-2.0");
        assert_eq!(outcome.context.default_locale, "en-GB");
    }

    #[tokio::test]
    async fn test_foreign_asset_url_is_a_hard_failure() {
        let session = session(MapRegistry::empty());
        let result = session
            .resolve(
                context(),
                FieldOverrides::default(),
                Some(Url::parse("https://example.com/a/b/releases/download/v1/x.exe").unwrap()),
            )
            .await;
        assert!(matches!(result, Err(DetectionError::HostMismatch { .. })));
    }

    #[tokio::test]
    async fn test_empty_remote_world_still_resolves() {
        let session = session(MapRegistry::empty());
        let outcome = session
            .resolve(context(), FieldOverrides::default(), None)
            .await
            .unwrap();

        assert_eq!(outcome.fields.publisher, "");
        assert_eq!(outcome.fields.package_name, "Tool");
        assert_eq!(outcome.fields.license, "");
        assert_eq!(outcome.context.default_locale, "en-US");
    }

    #[tokio::test]
    async fn test_identical_inputs_resolve_identically() {
        let first = session(MapRegistry::for_previous_version())
            .resolve(context(), FieldOverrides::default(), Some(Url::parse(ASSET_URL).unwrap()))
            .await
            .unwrap();
        let second = session(MapRegistry::for_previous_version())
            .resolve(context(), FieldOverrides::default(), Some(Url::parse(ASSET_URL).unwrap()))
            .await
            .unwrap();
        assert_eq!(first.fields, second.fields);
    }
}
