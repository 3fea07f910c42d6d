//! Process-wide runtime state: the application domain, assembly loading and the bridge
//! to host-implemented methods.

mod domain;
mod loader;
mod native;

pub use domain::{AppDomain, AssemblyResolution};
pub use loader::{AssemblyLoader, CatalogLoader, LoadTicket};
pub use native::{
    NativeBridge, NativeCall, NativeCallFactory, NativeFunction, NativeLibrary, NativeStatus,
};
