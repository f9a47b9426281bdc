//! Read-only values shared for the lifetime of the server.
//!
//! Globals carry configuration that plugins publish during `build()` and
//! others read afterwards (for example the active tracing configuration).
//! Unlike an [`API`](crate::api::API), a global is plain data with no
//! behavior of its own.

/// Marker for values stored with [`Server::insert_global`](crate::server::Server::insert_global).
///
/// ```
/// use outrigger_system::resource::GlobalResource;
/// use outrigger_system::server::Server;
///
/// struct Namespace(&'static str);
/// impl GlobalResource for Namespace {}
///
/// let mut server = Server::new();
/// server.insert_global(Namespace("outrigger"));
/// assert_eq!(server.get_global::<Namespace>().map(|n| n.0), Some("outrigger"));
/// ```
pub trait GlobalResource: Send + Sync + 'static {}
