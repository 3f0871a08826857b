// End-to-end loader flows over a fake linker that counts native load calls.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tinyb_loader::api::{
    Diagnostics, Error, ErrorKind, Extraction, Extractor, LibLoader, LibraryBundle, LibrarySpec,
    MemoryResources, NAMESPACE, NativeLinker, Platform, Registry,
};

#[derive(Clone, Debug, Eq, PartialEq)]
enum Load {
    ByPath(PathBuf),
    ByName(String),
}

#[derive(Default)]
struct CountingLinker {
    loads: Mutex<Vec<Load>>,
}

impl CountingLinker {
    fn loads(&self) -> Vec<Load> {
        self.loads.lock().expect("loads").clone()
    }
}

impl NativeLinker for CountingLinker {
    fn load_path(&self, path: &Path) -> Result<(), Error> {
        self.loads.lock().expect("loads").push(Load::ByPath(path.to_path_buf()));
        Ok(())
    }

    fn load_name(&self, name: &str) -> Result<(), Error> {
        self.loads.lock().expect("loads").push(Load::ByName(name.to_string()));
        if name == "nowhere" {
            return Err(Error::new(ErrorKind::Load).with_message("not on the search path"));
        }
        Ok(())
    }
}

fn core_binding_bundle() -> LibraryBundle {
    LibraryBundle::new(
        "/",
        vec![
            LibrarySpec::new("core", "libcore.so"),
            LibrarySpec::new("binding", "libbinding.so"),
        ],
    )
}

fn only_core_resources() -> Arc<MemoryResources> {
    Arc::new(MemoryResources::new().with("/libcore.so", b"\x7fELF core library".to_vec()))
}

#[test]
fn linux_x86_64_extracts_core_and_falls_back_for_binding() {
    let temp = tempfile::tempdir().expect("tempdir");
    let diag = Diagnostics::new(true, false);
    let extractor = Extractor::new(only_core_resources(), temp.path(), diag);
    let registry = Registry::detect(
        Platform::new("Linux", "x86_64"),
        &core_binding_bundle(),
        &extractor,
        diag,
    );

    let core_path = temp.path().join(NAMESPACE).join("libcore.so");
    let map = registry.path_map();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get("core"), Some(&Some(core_path.as_path())));
    assert_eq!(map.get("binding"), Some(&None));

    let linker = Arc::new(CountingLinker::default());
    let loader = LibLoader::new(registry, Arc::clone(&linker), diag);
    loader.load("core").expect("load core");
    loader.load("binding").expect("load binding");

    assert_eq!(
        linker.loads(),
        vec![Load::ByPath(core_path), Load::ByName("binding".to_string())]
    );
}

#[test]
fn windows_registers_nothing_and_loads_by_name() {
    let temp = tempfile::tempdir().expect("tempdir");
    let diag = Diagnostics::default();
    let extractor = Extractor::new(only_core_resources(), temp.path(), diag);
    let registry = Registry::detect(
        Platform::new("Windows 10", "amd64"),
        &core_binding_bundle(),
        &extractor,
        diag,
    );
    assert!(registry.is_empty());
    assert!(!extractor.dir().exists());

    let loader = LibLoader::new(registry, CountingLinker::default(), diag);
    loader.load("core").expect("load core");
    assert_eq!(loader.is_loaded("core"), None);
    assert_eq!(loader.linker().loads(), vec![Load::ByName("core".to_string())]);
}

#[test]
fn repeated_loads_of_a_registered_name_reach_the_linker_once() {
    let temp = tempfile::tempdir().expect("tempdir");
    let diag = Diagnostics::default();
    let extractor = Extractor::new(only_core_resources(), temp.path(), diag);
    let registry = Registry::detect(
        Platform::new("linux", "arm"),
        &core_binding_bundle(),
        &extractor,
        diag,
    );
    let loader = LibLoader::new(registry, CountingLinker::default(), diag);

    for _ in 0..3 {
        loader.load("core").expect("load core");
        loader.load("binding").expect("load binding");
    }
    assert_eq!(loader.linker().loads().len(), 2);
    assert_eq!(loader.is_loaded("core"), Some(true));
    assert_eq!(loader.is_loaded("binding"), Some(true));
}

#[test]
fn extraction_survives_a_second_process_start() {
    let temp = tempfile::tempdir().expect("tempdir");
    let diag = Diagnostics::default();
    let platform = Platform::new("Linux", "amd64");

    let first = Registry::detect(
        platform.clone(),
        &core_binding_bundle(),
        &Extractor::new(only_core_resources(), temp.path(), diag),
        diag,
    );
    let path = first.path("core").expect("core path").to_path_buf();
    let modified = fs::metadata(&path).expect("metadata").modified().expect("mtime");

    let second = Registry::detect(
        platform,
        &core_binding_bundle(),
        &Extractor::new(only_core_resources(), temp.path(), diag),
        diag,
    );
    assert_eq!(second.extraction("core"), Some(&Extraction::Reused(path.clone())));
    assert_eq!(
        fs::metadata(&path).expect("metadata").modified().expect("mtime"),
        modified
    );
}

#[test]
fn search_path_failures_propagate() {
    let loader = LibLoader::new(
        Registry::empty(Platform::new("Linux", "i386")),
        CountingLinker::default(),
        Diagnostics::new(false, true),
    );
    let err = loader.load("nowhere").expect_err("load should fail");
    assert_eq!(err.kind(), ErrorKind::Load);
    assert_eq!(err.name(), Some("nowhere"));
}
