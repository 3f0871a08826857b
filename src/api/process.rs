// Process-wide loader backing `load_library`, initialized from the environment on first use.
use std::sync::OnceLock;

use crate::core::config::Config;
use crate::core::error::Error;
use crate::core::loader::LibLoader;

static PROCESS_LOADER: OnceLock<LibLoader> = OnceLock::new();

/// The loader shared by every `load_library` caller in this process.
pub fn process_loader() -> &'static LibLoader {
    PROCESS_LOADER.get_or_init(|| LibLoader::initialize(&Config::from_env()))
}

/// Loads a TinyB library (`"tinyb"`, `"javatinyb"`) by logical name.
///
/// The first call detects the platform and extracts the embedded libraries;
/// later calls for an already loaded library return immediately.
pub fn load_library(name: &str) -> Result<(), Error> {
    process_loader().load(name)
}
