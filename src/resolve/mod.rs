//! Resolve module - the asynchronous multi-source data-resolution pipeline.
//!
//! Three sources feed one record:
//! - **Detection**: metadata inferred from the hosting platform
//!   ([`detection::DetectionSource`])
//! - **Previous manifests**: the prior version's files in the remote
//!   registry ([`previous::PreviousManifestResolver`])
//! - **Explicit input**: caller-supplied overrides
//!   ([`fields::FieldOverrides`])
//!
//! [`fields::resolve_fields`] applies the per-field precedence once both
//! remote sources have been joined.

pub mod detection;
pub mod fields;
pub mod previous;
pub mod task;
pub mod text;

// Re-export commonly used types
pub use detection::{DetectionBundle, DetectionData, DetectionError, DetectionSource};
pub use fields::{resolve_fields, FieldOverrides, ResolvedFields};
pub use previous::{
    package_path, PreviousManifestBundle, PreviousManifestHandles, PreviousManifestResolver,
};
pub use task::FieldTask;
