//! Shared components owned by the server.
//!
//! An API is a single-instance component that one plugin inserts and every
//! other collaborator reaches through [`Server::api`](crate::server::Server::api).
//! This replaces ambient module-level singletons: the server is the only
//! owner, and access is always explicit.
//!
//! # Interior Mutability Pattern
//!
//! Components that mutate after startup keep their state behind a lock and
//! expose `&self` methods:
//!
//! ```
//! use outrigger_system::api::API;
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! pub struct Registry {
//!     names: RwLock<HashMap<String, String>>,
//! }
//!
//! impl API for Registry {}
//!
//! impl Registry {
//!     pub fn register(&self, key: &str, value: &str) {
//!         self.names
//!             .write()
//!             .unwrap()
//!             .entry(key.to_owned())
//!             .or_insert_with(|| value.to_owned());
//!     }
//! }
//! ```
//!
//! This allows:
//! - `server.api::<Registry>()` returns `&Registry`
//! - Multiple plugins can call `register()` without `&mut Server`

/// Marker trait for components stored in the server's API registry.
///
/// # Usage in Plugins
///
/// ```ignore
/// impl Plugin for LoaderPlugin {
///     fn build(&self, server: &mut Server) {
///         server.insert_api(ResourceLoader::builder(injector).build());
///     }
/// }
///
/// impl Plugin for ConsumerPlugin {
///     fn ready(&self, server: &mut Server) {
///         let loader = server.api::<ResourceLoader>()
///             .expect("ResourceLoaderPlugin required");
///         loader.register("chartjs", source, "Chart", None);
///     }
/// }
/// ```
pub trait API: Send + Sync + 'static {}
