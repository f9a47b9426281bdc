//! Resource registry and loader for Outrigger.
//!
//! Add-ons declare the third-party libraries they need as named resources.
//! The [`ResourceLoader`] keeps the registry, makes sure each resource is
//! injected into the host runtime at most once at a time, remembers which
//! resources to load at startup, and tracks which add-ons hold which
//! resource.
//!
//! The runtime itself sits behind the [`Injector`] trait.
//!
//! # Overview
//!
//! - [`ResourceDescriptor`] - Name, source, exposed handle and load mode
//! - [`ResourceLoader`] - Registration, coalesced loads, autoload, references
//! - [`ResourceLoaderPlugin`] - Installs the loader on a
//!   [`Server`](outrigger_system::server::Server)
//! - [`MockInjector`] - Scriptable injector (`test-utils` feature)

mod activation;
mod autoload;
mod builtins;
pub mod descriptor;
mod error;
pub mod injector;
mod loader;
pub mod persist;
mod plugin;

#[cfg(any(test, feature = "test-utils"))]
mod mock;

pub use activation::Release;
pub use builtins::builtin_resources;
pub use descriptor::{LoadMode, ResourceDescriptor, ResourceSource, ResourceState};
pub use error::ResourceError;
pub use injector::{Handle, InjectError, Injector};
pub use loader::{LoadReport, ResourceLoader, ResourceLoaderBuilder};
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockInjector;
pub use persist::CustomResource;
pub use plugin::ResourceLoaderPlugin;
