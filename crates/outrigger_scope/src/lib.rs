//! Per-context add-on activation for Outrigger.
//!
//! Add-ons can be restricted to a set of contexts (characters, sessions).
//! An add-on without a binding runs everywhere; a bound add-on runs only when
//! the current context is one of its targets.
//!
//! - [`BindingTable`] - Add-on to target contexts, never holding empty entries
//! - [`resolve`] - Pure activation decision
//! - [`ScopeAPI`] - Persisted table plus resolver
//! - [`ScopePlugin`] - Installs the API on a
//!   [`Server`](outrigger_system::server::Server)

pub mod api;
pub mod binding;
mod plugin;
pub mod resolver;

pub use api::ScopeAPI;
pub use binding::{BindingTable, ScopeBinding};
pub use plugin::ScopePlugin;
pub use resolver::{Decision, ResolverModel, resolve};
