//! Purpose: Load native libraries by logical name, preferring extracted copies.
//! Exports: `LibLoader`, `NativeLinker`, `DynamicLinker`.
//! Role: The public load path; consults the immutable `Registry` and per-name state.
//! Invariants: A registered name is loaded at most once; the check-load-mark runs under its own lock.
//! Invariants: Unregistered names always fall through to search-path loading and are not tracked.
//! Invariants: Load failures propagate unchanged in kind (`ErrorKind::Load`); there is no retry.
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use libloading::Library;

use crate::core::config::{Config, Diagnostics};
use crate::core::error::{Error, ErrorKind};
use crate::core::extract::Extractor;
use crate::core::platform::{LibraryBundle, Platform};
use crate::core::registry::Registry;
use crate::core::resource::EmbeddedResources;

/// The two ways a library reaches the process.
pub trait NativeLinker: Send + Sync {
    /// Loads the shared library at an absolute path.
    fn load_path(&self, path: &Path) -> Result<(), Error>;

    /// Loads a library by logical name through the platform search path.
    fn load_name(&self, name: &str) -> Result<(), Error>;
}

/// `dlopen`-backed linker. Libraries are opened with global symbol visibility so
/// later native code in the process can bind to them, and handles are retained
/// so they stay mapped for as long as the linker lives.
#[derive(Debug, Default)]
pub struct DynamicLinker {
    handles: Mutex<Vec<Library>>,
}

impl DynamicLinker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded_count(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn retain(&self, library: Library) {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(library);
    }
}

impl NativeLinker for DynamicLinker {
    fn load_path(&self, path: &Path) -> Result<(), Error> {
        // SAFETY: running library initializers is inherent to loading native code;
        // the bundle only ships libraries built for this purpose.
        let library = unsafe { open_global(path.as_os_str()) }.map_err(|err| {
            Error::new(ErrorKind::Load)
                .with_message("failed to load native library")
                .with_path(path)
                .with_source(err)
        })?;
        self.retain(library);
        Ok(())
    }

    fn load_name(&self, name: &str) -> Result<(), Error> {
        let file_name = libloading::library_filename(name);
        // SAFETY: see `load_path`.
        let library = unsafe { open_global(&file_name) }.map_err(|err| {
            Error::new(ErrorKind::Load)
                .with_message(format!(
                    "failed to load {} from the library search path",
                    file_name.to_string_lossy()
                ))
                .with_source(err)
        })?;
        self.retain(library);
        Ok(())
    }
}

#[cfg(unix)]
unsafe fn open_global(file: &OsStr) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};
    unsafe { UnixLibrary::open(Some(file), RTLD_NOW | RTLD_GLOBAL) }.map(Library::from)
}

#[cfg(not(unix))]
unsafe fn open_global(file: &OsStr) -> Result<Library, libloading::Error> {
    unsafe { Library::new(file) }
}

impl<T: NativeLinker + ?Sized> NativeLinker for Arc<T> {
    fn load_path(&self, path: &Path) -> Result<(), Error> {
        (**self).load_path(path)
    }

    fn load_name(&self, name: &str) -> Result<(), Error> {
        (**self).load_name(name)
    }
}

pub struct LibLoader<L: NativeLinker = DynamicLinker> {
    registry: Registry,
    loaded: HashMap<String, Mutex<bool>>,
    linker: L,
    diag: Diagnostics,
}

impl LibLoader<DynamicLinker> {
    /// Detects the current platform and extracts the embedded TinyB libraries.
    pub fn initialize(config: &Config) -> Self {
        let diag = config.diagnostics();
        let extractor = Extractor::new(Arc::new(EmbeddedResources), config.temp_root(), diag);
        let registry = Registry::detect(
            Platform::current(),
            &LibraryBundle::default(),
            &extractor,
            diag,
        );
        Self::new(registry, DynamicLinker::new(), diag)
    }
}

impl<L: NativeLinker> LibLoader<L> {
    pub fn new(registry: Registry, linker: L, diag: Diagnostics) -> Self {
        let loaded = registry
            .names()
            .map(|name| (name.to_string(), Mutex::new(false)))
            .collect();
        Self {
            registry,
            loaded,
            linker,
            diag,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn linker(&self) -> &L {
        &self.linker
    }

    /// `None` for names the registry never saw.
    pub fn is_loaded(&self, name: &str) -> Option<bool> {
        self.loaded
            .get(name)
            .map(|flag| *flag.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn load(&self, name: &str) -> Result<(), Error> {
        self.diag.trace(format!("Trying to load '{name}' ..."));

        let Some(flag) = self.loaded.get(name) else {
            self.diag.trace("...Loading via library search path");
            self.linker
                .load_name(name)
                .map_err(|err| self.load_failed(name, err))?;
            self.diag.trace("...*done*");
            return Ok(());
        };

        let mut loaded = flag.lock().unwrap_or_else(PoisonError::into_inner);
        if *loaded {
            self.diag
                .trace(format!("Library '{name}' is already loaded"));
            return Ok(());
        }

        let result = match self.registry.path(name) {
            Some(path) => {
                self.diag.trace(format!(
                    "...Loading via extracted copy: {}",
                    path.display()
                ));
                self.linker.load_path(path)
            }
            None => {
                self.diag.trace("...Loading via library search path");
                self.linker.load_name(name)
            }
        };
        result.map_err(|err| self.load_failed(name, err))?;

        *loaded = true;
        self.diag.trace("...*done*");
        Ok(())
    }

    fn load_failed(&self, name: &str, err: Error) -> Error {
        let err = err.with_name(name);
        self.diag
            .error(format!("Failed to load library '{name}'"), &err);
        err
    }
}
