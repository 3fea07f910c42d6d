//! Asynchronous assembly loading.
//!
//! A frame that needs an assembly which is not loaded yet parks on a [`LoadTicket`]. The
//! [`AssemblyLoader`] receives a clone of the ticket and completes it whenever the assembly
//! is available, possibly from another OS thread; the frame polls it on every step.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use log::debug;

use crate::metadata::assembly::AssemblyRc;

#[derive(Debug)]
struct TicketState {
    name: String,
    outcome: OnceLock<Result<AssemblyRc, String>>,
}

/// Completion handle of one outstanding assembly load.
///
/// Clones share the same state. The outcome can be set exactly once; later attempts are
/// ignored and reported through the return value.
///
/// # Example
///
/// ```rust
/// use dotframe::emulation::LoadTicket;
/// use dotframe::metadata::assembly::Assembly;
///
/// let ticket = LoadTicket::new("Lib");
/// let observer = ticket.clone();
/// assert!(!observer.is_ready());
///
/// assert!(ticket.complete(Assembly::builder("Lib").build()));
/// assert!(observer.is_ready());
/// assert!(!ticket.fail("too late"));
/// ```
#[derive(Debug, Clone)]
pub struct LoadTicket(Arc<TicketState>);

impl LoadTicket {
    /// Creates an outstanding ticket for the named assembly
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        LoadTicket(Arc::new(TicketState {
            name: name.into(),
            outcome: OnceLock::new(),
        }))
    }

    /// Name of the requested assembly
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Completes the load. Returns false if the ticket was already settled.
    pub fn complete(&self, assembly: AssemblyRc) -> bool {
        self.0.outcome.set(Ok(assembly)).is_ok()
    }

    /// Fails the load. Returns false if the ticket was already settled.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.0.outcome.set(Err(reason.into())).is_ok()
    }

    /// Returns true once the load completed or failed
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.0.outcome.get().is_some()
    }

    /// The outcome, `None` while the load is outstanding
    #[must_use]
    pub fn outcome(&self) -> Option<&Result<AssemblyRc, String>> {
        self.0.outcome.get()
    }

    /// Returns true if both tickets track the same load request
    #[must_use]
    pub fn same_request(&self, other: &LoadTicket) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Loads assemblies on behalf of an [`crate::emulation::AppDomain`].
///
/// `load` is called at most once per assembly name while a load is outstanding. It must
/// not block: implementations complete the ticket right away or hand it to whatever
/// produces the assembly later.
pub trait AssemblyLoader: Send + Sync {
    /// Starts loading the named assembly
    fn load(&self, name: &str, ticket: LoadTicket);
}

/// An [`AssemblyLoader`] serving assemblies from an in-memory catalog.
///
/// Loads complete synchronously; names not in the catalog fail the ticket.
#[derive(Debug, Default)]
pub struct CatalogLoader {
    catalog: DashMap<String, AssemblyRc>,
}

impl CatalogLoader {
    /// Creates an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assembly, builder style
    #[must_use]
    pub fn with_assembly(self, assembly: AssemblyRc) -> Self {
        self.add(assembly);
        self
    }

    /// Adds an assembly under its (case-insensitive) name
    pub fn add(&self, assembly: AssemblyRc) {
        self.catalog
            .insert(assembly.name().to_ascii_lowercase(), assembly);
    }

    /// Number of assemblies in the catalog
    #[must_use]
    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    /// Returns true if the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}

impl AssemblyLoader for CatalogLoader {
    fn load(&self, name: &str, ticket: LoadTicket) {
        let found = self
            .catalog
            .get(&name.to_ascii_lowercase())
            .map(|entry| entry.value().clone());

        match found {
            Some(assembly) => {
                debug!("Catalog serves assembly '{}'", name);
                ticket.complete(assembly);
            }
            None => {
                ticket.fail(format!("assembly '{name}' is not in the catalog"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::metadata::assembly::Assembly;

    #[test]
    fn test_ticket_settles_once() {
        let ticket = LoadTicket::new("Lib");
        assert_eq!(ticket.name(), "Lib");
        assert!(ticket.outcome().is_none());

        assert!(ticket.fail("broken"));
        assert!(!ticket.complete(Assembly::builder("Lib").build()));
        assert!(matches!(ticket.outcome(), Some(Err(reason)) if reason == "broken"));
    }

    #[test]
    fn test_ticket_completed_from_other_thread() {
        let ticket = LoadTicket::new("Lib");
        let remote = ticket.clone();
        assert!(ticket.same_request(&remote));
        assert!(!ticket.same_request(&LoadTicket::new("Lib")));

        thread::spawn(move || remote.complete(Assembly::builder("Lib").build()))
            .join()
            .unwrap();

        assert!(ticket.is_ready());
        assert!(matches!(ticket.outcome(), Some(Ok(assembly)) if assembly.name() == "Lib"));
    }

    #[test]
    fn test_catalog_loader() {
        let loader = CatalogLoader::new().with_assembly(Assembly::builder("System.Runtime").build());
        assert_eq!(loader.len(), 1);

        let found = LoadTicket::new("system.runtime");
        loader.load("system.runtime", found.clone());
        assert!(matches!(found.outcome(), Some(Ok(_))));

        let missing = LoadTicket::new("Other");
        loader.load("Other", missing.clone());
        assert!(matches!(missing.outcome(), Some(Err(_))));
    }
}
