//! Shared runtime resources and scoped add-on activation for a host application.
//!
//! Two subsystems sit behind the plugin runtime:
//!
//! - the resource loader, which registers named resources, injects each one at
//!   most once and coalesces concurrent requests for it;
//! - the scope resolver, which decides whether an add-on is active for the
//!   host's current context.

pub use outrigger_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use outrigger_internal::prelude::*;
}
