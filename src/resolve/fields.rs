//! Field resolution: the per-field precedence chains.
//!
//! Pure and synchronous — callers await the detection and previous-manifest
//! sources first, then hand the joined data in. The general order is
//! explicit caller input, then remote sources, then a fallback (empty string
//! for required fields, absent for optional ones), but the position of
//! detection versus the previous manifest varies per field on purpose:
//! `license` trusts fresh detection over stale manifests, while the URL
//! fields prefer the previous manifest's curated values. Each chain below is
//! deliberate; do not unify them.

use crate::model::{PackageContext, SchemaConstants};
use crate::resolve::detection::DetectionData;
use crate::resolve::previous::PreviousManifestBundle;
use crate::resolve::text::reflow_sentences;
use serde::Serialize;
use url::Url;

/// Explicit values supplied by the caller for this run.
///
/// A blank string counts as "not supplied".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldOverrides {
    pub publisher: Option<String>,
    pub publisher_url: Option<Url>,
    pub publisher_support_url: Option<Url>,
    pub privacy_url: Option<Url>,
    pub author: Option<String>,
    pub package_url: Option<Url>,
    pub license: Option<String>,
    pub license_url: Option<Url>,
    pub copyright: Option<String>,
    pub copyright_url: Option<Url>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub moniker: Option<String>,
    pub tags: Option<Vec<String>>,
    pub release_notes_url: Option<Url>,
}

/// Final per-field values handed to the manifest assembler.
///
/// Required fields are `String` and fall back to empty; optional fields
/// stay absent when no source had a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFields {
    pub publisher: String,
    pub publisher_url: Option<Url>,
    pub publisher_support_url: Option<Url>,
    pub privacy_url: Option<Url>,
    pub author: Option<String>,
    pub package_name: String,
    pub package_url: Option<Url>,
    pub license: String,
    pub license_url: Option<Url>,
    pub copyright: Option<String>,
    pub copyright_url: Option<Url>,
    pub short_description: String,
    pub description: Option<String>,
    pub moniker: Option<String>,
    pub tags: Option<Vec<String>>,
    pub release_notes: Option<String>,
    pub release_notes_url: Option<Url>,
    pub manifest_type: String,
    pub manifest_version: String,
}

/// Trimmed, non-empty copy of an optional string.
fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Applies the precedence chains to the awaited sources.
///
/// `detection` is `None` when no asset URL pointed at the hosting platform;
/// every detection candidate is then simply absent.
pub fn resolve_fields(
    overrides: &FieldOverrides,
    ctx: &PackageContext,
    detection: Option<&DetectionData>,
    previous: &PreviousManifestBundle,
    schema: &SchemaConstants,
) -> ResolvedFields {
    let prev = previous.default_locale_manifest.as_ref();

    let publisher = non_blank(overrides.publisher.as_ref())
        .or_else(|| prev.and_then(|manifest| manifest.publisher.clone()))
        .unwrap_or_default();

    let publisher_url = overrides
        .publisher_url
        .clone()
        .or_else(|| prev.and_then(|manifest| manifest.publisher_url.clone()))
        .or_else(|| detection.and_then(|data| data.publisher_url.clone()));

    let publisher_support_url = overrides
        .publisher_support_url
        .clone()
        .or_else(|| prev.and_then(|manifest| manifest.publisher_support_url.clone()))
        .or_else(|| detection.and_then(|data| data.support_url.clone()));

    let privacy_url = overrides
        .privacy_url
        .clone()
        .or_else(|| prev.and_then(|manifest| manifest.privacy_url.clone()))
        .or_else(|| detection.and_then(|data| data.privacy_url.clone()));

    let author = non_blank(overrides.author.as_ref())
        .or_else(|| prev.and_then(|manifest| manifest.author.clone()));

    let package_name = non_blank(ctx.package_name.as_ref())
        .or_else(|| prev.and_then(|manifest| manifest.package_name.clone()))
        .unwrap_or_default();

    let package_url = overrides
        .package_url
        .clone()
        .or_else(|| detection.and_then(|data| data.package_url.clone()));

    // Detection first: a freshly detected license beats the previous
    // manifest's possibly outdated one.
    let license = non_blank(overrides.license.as_ref())
        .or_else(|| detection.and_then(|data| data.license.clone()))
        .or_else(|| prev.and_then(|manifest| manifest.license.clone()))
        .unwrap_or_default();

    let license_url = overrides
        .license_url
        .clone()
        .or_else(|| prev.and_then(|manifest| manifest.license_url.clone()))
        .or_else(|| detection.and_then(|data| data.license_url.clone()));

    let copyright = non_blank(overrides.copyright.as_ref())
        .or_else(|| prev.and_then(|manifest| manifest.copyright.clone()));

    let copyright_url = overrides
        .copyright_url
        .clone()
        .or_else(|| prev.and_then(|manifest| manifest.copyright_url.clone()));

    let short_description = non_blank(overrides.short_description.as_ref())
        .or_else(|| prev.and_then(|manifest| manifest.short_description.clone()))
        .or_else(|| detection.and_then(|data| data.short_description.clone()))
        .unwrap_or_default();

    let description = non_blank(overrides.description.as_ref())
        .or_else(|| prev.and_then(|manifest| manifest.description.clone()))
        .map(|description| reflow_sentences(&description, "").trim().to_string())
        .filter(|description| !description.is_empty());

    let moniker = non_blank(overrides.moniker.as_ref())
        .or_else(|| prev.and_then(|manifest| manifest.moniker.clone()));

    let tags = overrides
        .tags
        .clone()
        .filter(|tags| !tags.is_empty())
        .or_else(|| prev.and_then(|manifest| manifest.tags.clone()))
        .or_else(|| detection.and_then(|data| data.topics.clone()));

    let release_notes_url = overrides
        .release_notes_url
        .clone()
        .or_else(|| detection.and_then(|data| data.release_notes_url.clone()));

    let release_notes = detection
        .and_then(|data| data.release_notes.as_deref())
        .map(|notes| notes.trim().to_string())
        .filter(|notes| !notes.is_empty());

    ResolvedFields {
        publisher,
        publisher_url,
        publisher_support_url,
        privacy_url,
        author,
        package_name,
        package_url,
        license,
        license_url,
        copyright,
        copyright_url,
        short_description,
        description,
        moniker,
        tags,
        release_notes,
        release_notes_url,
        manifest_type: schema.default_locale_manifest_type.clone(),
        manifest_version: schema.manifest_version.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DefaultLocaleManifest;

    fn schema() -> SchemaConstants {
        SchemaConstants {
            default_locale_manifest_type: "defaultLocale".to_string(),
            manifest_version: "1.6.0".to_string(),
        }
    }

    fn context() -> PackageContext {
        PackageContext {
            identifier: "Publisher.Package".to_string(),
            version: "1.2.3".to_string(),
            default_locale: "en-US".to_string(),
            package_name: None,
        }
    }

    fn empty_bundle() -> PreviousManifestBundle {
        PreviousManifestBundle {
            installer: None,
            version: None,
            default_locale_manifest: None,
            locales: None,
            default_locale: "en-US".to_string(),
        }
    }

    fn bundle_with(manifest: DefaultLocaleManifest) -> PreviousManifestBundle {
        PreviousManifestBundle {
            default_locale_manifest: Some(manifest),
            ..empty_bundle()
        }
    }

    #[test]
    fn test_explicit_input_always_wins() {
        let overrides = FieldOverrides {
            license: Some("GPL-3.0".to_string()),
            ..Default::default()
        };
        let detection = DetectionData {
            license: Some("MIT".to_string()),
            ..Default::default()
        };
        let previous = bundle_with(DefaultLocaleManifest {
            license: Some("Apache-2.0".to_string()),
            ..Default::default()
        });

        let fields = resolve_fields(&overrides, &context(), Some(&detection), &previous, &schema());
        assert_eq!(fields.license, "GPL-3.0");
    }

    #[test]
    fn test_license_prefers_detection_over_previous() {
        let detection = DetectionData {
            license: Some("MIT".to_string()),
            ..Default::default()
        };
        let previous = bundle_with(DefaultLocaleManifest {
            license: Some("Apache-2.0".to_string()),
            ..Default::default()
        });

        let fields = resolve_fields(
            &FieldOverrides::default(),
            &context(),
            Some(&detection),
            &previous,
            &schema(),
        );
        assert_eq!(fields.license, "MIT");
    }

    #[test]
    fn test_publisher_url_prefers_previous_over_detection() {
        let detection = DetectionData {
            publisher_url: Some(Url::parse("https://detected.example.com").unwrap()),
            ..Default::default()
        };
        let previous = bundle_with(DefaultLocaleManifest {
            publisher_url: Some(Url::parse("https://previous.example.com").unwrap()),
            ..Default::default()
        });

        let fields = resolve_fields(
            &FieldOverrides::default(),
            &context(),
            Some(&detection),
            &previous,
            &schema(),
        );
        assert_eq!(
            fields.publisher_url.as_ref().map(Url::as_str),
            Some("https://previous.example.com/")
        );
    }

    #[test]
    fn test_fallbacks_never_panic() {
        let fields = resolve_fields(
            &FieldOverrides::default(),
            &context(),
            None,
            &empty_bundle(),
            &schema(),
        );
        assert_eq!(fields.publisher, "");
        assert_eq!(fields.package_name, "");
        assert_eq!(fields.license, "");
        assert_eq!(fields.short_description, "");
        assert_eq!(fields.author, None);
        assert_eq!(fields.copyright, None);
        assert_eq!(fields.description, None);
        assert_eq!(fields.tags, None);
    }

    #[test]
    fn test_blank_override_is_treated_as_absent() {
        let overrides = FieldOverrides {
            author: Some("   ".to_string()),
            copyright: Some("".to_string()),
            ..Default::default()
        };
        let previous = bundle_with(DefaultLocaleManifest {
            author: Some("Previous Author".to_string()),
            copyright: Some("(c) Previous".to_string()),
            ..Default::default()
        });

        let fields = resolve_fields(&overrides, &context(), None, &previous, &schema());
        assert_eq!(fields.author.as_deref(), Some("Previous Author"));
        assert_eq!(fields.copyright.as_deref(), Some("(c) Previous"));
    }

    #[test]
    fn test_description_is_reflowed_and_trimmed() {
        let previous = bundle_with(DefaultLocaleManifest {
            description: Some("  Full description. It has more. Done!  ".to_string()),
            ..Default::default()
        });

        let fields = resolve_fields(
            &FieldOverrides::default(),
            &context(),
            None,
            &previous,
            &schema(),
        );
        assert_eq!(
            fields.description.as_deref(),
            Some("Full description.\nIt has more.\nDone!")
        );
    }

    #[test]
    fn test_package_name_prefers_context_over_previous() {
        let mut ctx = context();
        ctx.package_name = Some("Fancy App".to_string());
        let previous = bundle_with(DefaultLocaleManifest {
            package_name: Some("Old App".to_string()),
            ..Default::default()
        });

        let fields = resolve_fields(
            &FieldOverrides::default(),
            &ctx,
            None,
            &previous,
            &schema(),
        );
        assert_eq!(fields.package_name, "Fancy App");
    }

    #[test]
    fn test_empty_tag_override_falls_through_to_topics() {
        let overrides = FieldOverrides {
            tags: Some(Vec::new()),
            ..Default::default()
        };
        let detection = DetectionData {
            topics: Some(vec!["cli".to_string()]),
            ..Default::default()
        };

        let fields = resolve_fields(
            &overrides,
            &context(),
            Some(&detection),
            &empty_bundle(),
            &schema(),
        );
        assert_eq!(fields.tags, Some(vec!["cli".to_string()]));
    }

    #[test]
    fn test_release_notes_come_from_detection_only() {
        let detection = DetectionData {
            release_notes: Some("- fixed things\n".to_string()),
            ..Default::default()
        };
        let previous = bundle_with(DefaultLocaleManifest {
            release_notes: Some("- previous notes".to_string()),
            ..Default::default()
        });

        let fields = resolve_fields(
            &FieldOverrides::default(),
            &context(),
            Some(&detection),
            &previous,
            &schema(),
        );
        assert_eq!(fields.release_notes.as_deref(), Some("- fixed things"));

        let without_detection =
            resolve_fields(&FieldOverrides::default(), &context(), None, &previous, &schema());
        assert_eq!(without_detection.release_notes, None);
    }

    #[test]
    fn test_constants_always_come_from_schema() {
        let previous = bundle_with(DefaultLocaleManifest {
            manifest_type: Some("somethingElse".to_string()),
            manifest_version: Some("0.1.0".to_string()),
            ..Default::default()
        });

        let fields = resolve_fields(
            &FieldOverrides::default(),
            &context(),
            None,
            &previous,
            &schema(),
        );
        assert_eq!(fields.manifest_type, "defaultLocale");
        assert_eq!(fields.manifest_version, "1.6.0");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let overrides = FieldOverrides {
            publisher: Some("Publisher".to_string()),
            ..Default::default()
        };
        let detection = DetectionData {
            license: Some("MIT".to_string()),
            short_description: Some("A tool".to_string()),
            ..Default::default()
        };
        let previous = bundle_with(DefaultLocaleManifest {
            publisher_url: Some(Url::parse("https://previous.example.com").unwrap()),
            ..Default::default()
        });

        let first = resolve_fields(&overrides, &context(), Some(&detection), &previous, &schema());
        let second = resolve_fields(&overrides, &context(), Some(&detection), &previous, &schema());
        assert_eq!(first, second);
    }
}
