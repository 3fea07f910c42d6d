//! The application domain: which assemblies are loaded, which are being loaded, and the
//! value pool shared by every thread.

use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use dashmap::{mapref::entry::Entry, DashMap};
use log::{debug, warn};

use crate::{
    emulation::{
        config::ExecutionConfig,
        engine::EmulationError,
        memory::ValuePool,
        runtime::{AssemblyLoader, LoadTicket},
    },
    metadata::assembly::AssemblyRc,
    Result,
};

/// Outcome of looking up an assembly by name
#[derive(Debug, Clone)]
pub enum AssemblyResolution {
    /// The assembly is registered and can be used right away
    Loaded(AssemblyRc),
    /// A load is outstanding; the ticket settles once it finishes
    Pending(LoadTicket),
}

/// Process-wide registry of assemblies.
///
/// Names are compared case-insensitively. While a load for a name is outstanding every
/// resolution of that name returns the same [`LoadTicket`], so the loader sees a single
/// request no matter how many frames wait for it.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use dotframe::emulation::{AppDomain, AssemblyResolution, CatalogLoader};
/// use dotframe::metadata::assembly::Assembly;
///
/// let loader = CatalogLoader::new().with_assembly(Assembly::builder("Lib").build());
/// let domain = AppDomain::new().with_loader(Arc::new(loader));
///
/// let AssemblyResolution::Pending(ticket) = domain.resolve("lib")? else { unreachable!() };
/// let assembly = domain.finish_load(&ticket)?.expect("catalog loads synchronously");
///
/// assert_eq!(assembly.name(), "Lib");
/// assert!(domain.contains("LIB"));
/// assert_eq!(domain.load_requests(), 1);
/// # Ok::<(), dotframe::Error>(())
/// ```
pub struct AppDomain {
    /// Registered assemblies by lowercase name
    assemblies: DashMap<String, AssemblyRc>,
    /// Outstanding loads by lowercase name
    pending: DashMap<String, LoadTicket>,
    /// Issues loads for unknown names
    loader: Option<Arc<dyn AssemblyLoader>>,
    /// Storage for frame arguments and locals
    pool: ValuePool,
    /// Number of loads handed to the loader
    load_requests: AtomicUsize,
}

impl AppDomain {
    /// Creates an empty domain with a default sized pool and no loader
    #[must_use]
    pub fn new() -> Self {
        Self::with_pool(ValuePool::default_size())
    }

    /// Creates an empty domain whose pool follows the memory configuration
    #[must_use]
    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self::with_pool(ValuePool::new(config.memory.max_pool_bytes))
    }

    fn with_pool(pool: ValuePool) -> Self {
        AppDomain {
            assemblies: DashMap::new(),
            pending: DashMap::new(),
            loader: None,
            pool,
            load_requests: AtomicUsize::new(0),
        }
    }

    /// Sets the loader used for assemblies that are not registered
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn AssemblyLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Registers an assembly under its name, returning the one it replaced
    pub fn register(&self, assembly: AssemblyRc) -> Option<AssemblyRc> {
        let key = assembly.name().to_ascii_lowercase();
        debug!("Registering assembly '{}'", assembly.name());
        self.assemblies.insert(key, assembly)
    }

    /// Looks up a registered assembly
    #[must_use]
    pub fn assembly(&self, name: &str) -> Option<AssemblyRc> {
        self.assemblies
            .get(&name.to_ascii_lowercase())
            .map(|entry| entry.value().clone())
    }

    /// Returns true if an assembly with this name is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.assemblies.contains_key(&name.to_ascii_lowercase())
    }

    /// Number of registered assemblies
    #[must_use]
    pub fn assembly_count(&self) -> usize {
        self.assemblies.len()
    }

    /// Resolves an assembly by name, issuing a load if it isn't registered.
    ///
    /// A registered assembly is returned directly. Otherwise the outstanding ticket for the
    /// name is returned, or a new load is issued to the loader.
    ///
    /// # Errors
    /// Returns [`EmulationError::AssemblyNotFound`] if the assembly is unknown and no
    /// loader is configured.
    pub fn resolve(&self, name: &str) -> Result<AssemblyResolution> {
        let key = name.to_ascii_lowercase();
        if let Some(assembly) = self.assemblies.get(&key) {
            return Ok(AssemblyResolution::Loaded(assembly.value().clone()));
        }

        let Some(loader) = &self.loader else {
            return Err(EmulationError::AssemblyNotFound {
                name: name.to_string(),
            }
            .into());
        };

        let ticket = match self.pending.entry(key) {
            Entry::Occupied(entry) => return Ok(AssemblyResolution::Pending(entry.get().clone())),
            Entry::Vacant(entry) => {
                // A load may have finished between the registry lookup and this guard
                if let Some(assembly) = self.assemblies.get(entry.key()) {
                    return Ok(AssemblyResolution::Loaded(assembly.value().clone()));
                }
                entry.insert(LoadTicket::new(name)).value().clone()
            }
        };

        // The map guard is gone, the loader may settle the ticket synchronously
        self.load_requests.fetch_add(1, Ordering::SeqCst);
        debug!("Requesting load of assembly '{}'", name);
        loader.load(name, ticket.clone());

        Ok(AssemblyResolution::Pending(ticket))
    }

    /// Collects the result of a load.
    ///
    /// Returns `None` while the ticket is outstanding. A completed load registers the
    /// assembly, under the requested name and its own, and retires the pending entry.
    ///
    /// # Errors
    /// Returns [`EmulationError::AssemblyLoadFailed`] if the loader failed the ticket.
    pub fn finish_load(&self, ticket: &LoadTicket) -> Result<Option<AssemblyRc>> {
        let Some(outcome) = ticket.outcome() else {
            return Ok(None);
        };

        let key = ticket.name().to_ascii_lowercase();

        // Registered before the pending entry is retired, so a concurrent resolve always
        // finds one of the two
        let result = match outcome {
            Ok(assembly) => {
                if !assembly.name().eq_ignore_ascii_case(ticket.name()) {
                    warn!(
                        "Load of '{}' produced assembly '{}'",
                        ticket.name(),
                        assembly.name()
                    );
                    self.assemblies
                        .entry(assembly.name().to_ascii_lowercase())
                        .or_insert_with(|| assembly.clone());
                }
                self.assemblies
                    .entry(key.clone())
                    .or_insert_with(|| assembly.clone());

                Ok(Some(assembly.clone()))
            }
            Err(reason) => Err(EmulationError::AssemblyLoadFailed {
                name: ticket.name().to_string(),
                reason: reason.clone(),
            }
            .into()),
        };

        self.pending
            .remove_if(&key, |_, pending| pending.same_request(ticket));

        result
    }

    /// Number of loads handed to the loader so far
    #[must_use]
    pub fn load_requests(&self) -> usize {
        self.load_requests.load(Ordering::SeqCst)
    }

    /// Number of loads currently outstanding
    #[must_use]
    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    /// The value pool shared by every thread of this domain
    #[must_use]
    pub fn pool(&self) -> &ValuePool {
        &self.pool
    }
}

impl Default for AppDomain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AppDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppDomain")
            .field("assemblies", &self.assemblies.len())
            .field("pending", &self.pending.len())
            .field("loader", &self.loader.is_some())
            .field("pool", &self.pool)
            .finish()
    }
}
