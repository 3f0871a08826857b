// Read-only resource bundles: the build-time embedded table and in-memory maps.
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

mod embedded {
    include!(concat!(env!("OUT_DIR"), "/embedded.rs"));
}

/// A source of named byte streams bundled with the distribution.
pub trait ResourceSource: Send + Sync {
    /// Opens `location` (e.g. `/libtinyb.so`) for reading, or `None` when absent.
    fn open(&self, location: &str) -> Option<Box<dyn Read + '_>>;
}

/// Libraries embedded by `build.rs` from the `native/` directory.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbeddedResources;

impl EmbeddedResources {
    pub fn locations(&self) -> impl Iterator<Item = &'static str> {
        embedded::EMBEDDED.iter().map(|(location, _)| *location)
    }
}

impl ResourceSource for EmbeddedResources {
    fn open(&self, location: &str) -> Option<Box<dyn Read + '_>> {
        embedded::EMBEDDED
            .iter()
            .find(|(candidate, _)| *candidate == location)
            .map(|(_, bytes)| Box::new(Cursor::new(*bytes)) as Box<dyn Read + '_>)
    }
}

/// An owned in-memory bundle, used when resources come from somewhere other
/// than the crate itself.
#[derive(Clone, Debug, Default)]
pub struct MemoryResources {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(location, bytes);
        self
    }

    pub fn insert(&mut self, location: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(location.into(), bytes.into());
    }
}

impl ResourceSource for MemoryResources {
    fn open(&self, location: &str) -> Option<Box<dyn Read + '_>> {
        self.entries
            .get(location)
            .map(|bytes| Box::new(bytes.as_slice()) as Box<dyn Read + '_>)
    }
}

pub(crate) fn resource_location(folder: &str, file_name: &str) -> String {
    format!("{folder}{file_name}")
}
