pub mod logging;
pub mod model;
pub mod resolve;
pub mod session;
pub mod traits;

// Re-export common types for convenience
pub use model::*;
pub use resolve::*;
pub use session::{ResolverSession, SessionOutcome};
pub use traits::*;
