//! Purpose: Define the public Rust API boundary for the loader.
//! Exports: Loader, registry, extraction, configuration, and error types.
//! Role: Public, additive-only surface over the `core` modules.
//! Invariants: `load_library` always goes through one lazily initialized process-wide loader.

mod process;

pub use crate::core::config::{
    Config, DEBUG_ENV, Diagnostics, SUPPRESS_ERROR_ENV, TMPDIR_ENV,
};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::extract::{CacheStatus, Extraction, Extractor, NAMESPACE};
pub use crate::core::loader::{DynamicLinker, LibLoader, NativeLinker};
pub use crate::core::platform::{LibraryBundle, LibrarySpec, Platform};
pub use crate::core::registry::Registry;
pub use crate::core::resource::{EmbeddedResources, MemoryResources, ResourceSource};
pub use process::{load_library, process_loader};
