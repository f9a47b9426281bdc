//! The plugin runtime underneath Outrigger.
//!
//! `outrigger_system` provides the primitives the host uses to wire its
//! collaborators together:
//!
//! - [`api`] - Marker trait for single-owner components shared between plugins
//! - [`plugin`] - Plugin trait and plugin groups
//! - [`resource`] - Marker trait for read-only global values
//! - [`server`] - Server runtime for plugin orchestration
//!
//! # Example
//!
//! ```
//! use outrigger_system::api::API;
//! use outrigger_system::plugin::Plugin;
//! use outrigger_system::server::Server;
//!
//! #[derive(Default)]
//! struct Counter;
//! impl API for Counter {}
//!
//! struct CounterPlugin;
//!
//! impl Plugin for CounterPlugin {
//!     fn build(&self, server: &mut Server) {
//!         server.insert_api(Counter);
//!     }
//! }
//!
//! let mut server = Server::new();
//! server.add_plugins(CounterPlugin);
//! server.finish();
//! assert!(server.contains_api::<Counter>());
//! ```

/// Marker trait for shared components.
pub mod api;

/// Plugin trait for extensible functionality.
pub mod plugin;

/// Global value markers.
pub mod resource;

/// Server runtime for plugin orchestration.
pub mod server;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::api::*;
    pub use crate::plugin::*;
    pub use crate::resource::*;
    pub use crate::server::*;
}
