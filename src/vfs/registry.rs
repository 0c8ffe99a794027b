//! Backend discovery.
//!
//! A [`VfsRegistry`] is the host's list of named backends. The first entry
//! is the default: the backend a database engine gets when it does not ask
//! for one by name.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{Error, Result};
use crate::vfs::{MemVfs, Vfs};

/// Named, discoverable storage backends.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use trackvfs::vfs::{MemVfs, VfsRegistry};
///
/// let host = VfsRegistry::new();
/// host.register(Arc::new(MemVfs::new()), true).unwrap();
/// assert_eq!(host.default_vfs().unwrap().name(), "memfs");
/// ```
pub struct VfsRegistry {
    /// Registered backends; index 0 is the default.
    backends: RwLock<Vec<Arc<dyn Vfs>>>,
}

impl VfsRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(Vec::new()),
        }
    }

    /// Create a registry with the in-memory backend installed as default.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry
            .backends
            .write()
            .push(Arc::new(MemVfs::new()) as Arc<dyn Vfs>);
        registry
    }

    /// Register a backend, optionally making it the default.
    ///
    /// Registering the same instance again moves it (to the front when
    /// `make_default`).
    ///
    /// # Errors
    /// `Error::Registration` if the name is empty or already taken by a
    /// different backend.
    pub fn register(&self, vfs: Arc<dyn Vfs>, make_default: bool) -> Result<()> {
        if vfs.name().is_empty() {
            return Err(Error::Registration("backend name is empty".to_string()));
        }

        let mut backends = self.backends.write();
        if let Some(pos) = backends.iter().position(|b| b.name() == vfs.name()) {
            if !Arc::ptr_eq(&backends[pos], &vfs) {
                return Err(Error::Registration(format!(
                    "a different backend is already registered as '{}'",
                    vfs.name()
                )));
            }
            backends.remove(pos);
        }

        if make_default || backends.is_empty() {
            backends.insert(0, vfs);
        } else {
            backends.insert(1, vfs);
        }
        Ok(())
    }

    /// Remove a backend by name. Returns whether it was registered.
    ///
    /// If it was the default, the next registered backend becomes default.
    pub fn unregister(&self, name: &str) -> bool {
        let mut backends = self.backends.write();
        match backends.iter().position(|b| b.name() == name) {
            Some(pos) => {
                backends.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Look up a backend by name; `None` returns the default.
    pub fn find(&self, name: Option<&str>) -> Option<Arc<dyn Vfs>> {
        let backends = self.backends.read();
        match name {
            Some(name) => backends.iter().find(|b| b.name() == name).cloned(),
            None => backends.first().cloned(),
        }
    }

    /// The default backend, if any is registered.
    pub fn default_vfs(&self) -> Option<Arc<dyn Vfs>> {
        self.find(None)
    }

    /// Names of all registered backends, default first.
    pub fn names(&self) -> Vec<String> {
        self.backends
            .read()
            .iter()
            .map(|b| b.name().to_string())
            .collect()
    }
}

impl Default for VfsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
