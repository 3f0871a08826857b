//! Purpose: Run platform detection once and record what was extracted for each library.
//! Exports: `Registry`.
//! Role: Immutable name -> extraction map handed to the loader at construction.
//! Invariants: Unsupported platforms produce an empty registry, never an error.
//! Invariants: Lookups of unregistered names return `None`; nothing panics on a missing key.
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::config::Diagnostics;
use crate::core::extract::{Extraction, Extractor};
use crate::core::platform::{LibraryBundle, Platform};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Registry {
    platform: Platform,
    entries: BTreeMap<String, Extraction>,
}

impl Registry {
    pub fn detect(
        platform: Platform,
        bundle: &LibraryBundle,
        extractor: &Extractor,
        diag: Diagnostics,
    ) -> Self {
        diag.trace(format!("os.name='{}'", platform.os));
        diag.trace(format!("os.arch='{}'", platform.arch));

        let mut entries = BTreeMap::new();
        if platform.supports_extraction() {
            for spec in &bundle.libraries {
                let extraction = extractor.try_extract(&bundle.folder, &spec.file_name);
                entries.insert(spec.name.clone(), extraction);
            }
        } else {
            diag.trace(format!(
                "Sorry, platform '{}' ({}) not supported by the library loader",
                platform.os, platform.arch
            ));
        }

        let registry = Self { platform, entries };
        diag.trace(format!("Map: {:?}", registry.path_map()));
        registry
    }

    /// A registry with no libraries; every load goes through the search path.
    pub fn empty(platform: Platform) -> Self {
        Self {
            platform,
            entries: BTreeMap::new(),
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn extraction(&self, name: &str) -> Option<&Extraction> {
        self.entries.get(name)
    }

    pub fn path(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).and_then(Extraction::path)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Extraction)> {
        self.entries.iter().map(|(name, extraction)| (name.as_str(), extraction))
    }

    pub fn path_map(&self) -> BTreeMap<&str, Option<&Path>> {
        self.entries
            .iter()
            .map(|(name, extraction)| (name.as_str(), extraction.path()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;
    use crate::core::config::Diagnostics;
    use crate::core::extract::{Extraction, Extractor, NAMESPACE};
    use crate::core::platform::{LibraryBundle, LibrarySpec, Platform};
    use crate::core::resource::MemoryResources;
    use std::sync::Arc;

    fn bundle() -> LibraryBundle {
        LibraryBundle::new(
            "/",
            vec![
                LibrarySpec::new("core", "libcore.so"),
                LibrarySpec::new("binding", "libbinding.so"),
            ],
        )
    }

    fn extractor(root: &std::path::Path) -> Extractor {
        let resources = MemoryResources::new()
            .with("/libcore.so", b"core".to_vec())
            .with("/libbinding.so", b"binding".to_vec());
        Extractor::new(Arc::new(resources), root, Diagnostics::default())
    }

    #[test]
    fn supported_platforms_register_every_library() {
        for (os, arch) in [("Linux", "arm"), ("Linux", "amd64"), ("Linux", "x86_64")] {
            let temp = tempfile::tempdir().expect("tempdir");
            let registry = Registry::detect(
                Platform::new(os, arch),
                &bundle(),
                &extractor(temp.path()),
                Diagnostics::default(),
            );
            assert_eq!(registry.names().collect::<Vec<_>>(), ["binding", "core"]);
            assert!(registry.path("core").is_some());
            assert!(registry.path("binding").is_some());
        }
    }

    #[test]
    fn unsupported_platforms_register_nothing() {
        for (os, arch) in [("Linux", "i386"), ("Windows 10", "amd64"), ("Mac OS X", "arm")] {
            let temp = tempfile::tempdir().expect("tempdir");
            let registry = Registry::detect(
                Platform::new(os, arch),
                &bundle(),
                &extractor(temp.path()),
                Diagnostics::default(),
            );
            assert!(registry.is_empty(), "{os}/{arch}");
            assert!(!temp.path().join(NAMESPACE).exists());
        }
    }

    #[test]
    fn missing_resource_registers_without_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let extractor = Extractor::new(
            Arc::new(MemoryResources::new().with("/libcore.so", b"core".to_vec())),
            temp.path(),
            Diagnostics::new(true, false),
        );
        let registry = Registry::detect(
            Platform::new("Linux", "x86_64"),
            &bundle(),
            &extractor,
            Diagnostics::new(true, false),
        );

        assert!(registry.is_registered("binding"));
        assert_eq!(registry.path("binding"), None);
        assert_eq!(registry.extraction("binding"), Some(&Extraction::Missing));
        assert_eq!(
            registry.path("core"),
            Some(temp.path().join(NAMESPACE).join("libcore.so").as_path())
        );
        assert_eq!(registry.path("never-registered"), None);
    }
}
