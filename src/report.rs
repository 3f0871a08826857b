//! Purpose: Stable JSON views of detection, verification, and load results for the CLI.
//! Exports: `DetectReport`, `VerifyEntry`, `LoadReport`, `CleanReport`, `error_json`.
//! Role: Keeps output schemas in one place so `main` only orchestrates.
//! Invariants: Field names are additive-only once published.
//! Invariants: Paths are rendered with `Path::display` (lossy on non-UTF-8 names).
use std::error::Error as StdError;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value, json};

use tinyb_loader::api::{CacheStatus, Error, Extraction, LibraryBundle, Registry};

#[derive(Debug, Serialize)]
pub struct PlatformView {
    pub os: String,
    pub arch: String,
    pub supported: bool,
}

#[derive(Debug, Serialize)]
pub struct LibraryView {
    pub name: String,
    pub file: Option<String>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DetectReport {
    pub platform: PlatformView,
    pub dir: String,
    pub libraries: Vec<LibraryView>,
}

impl DetectReport {
    pub fn new(registry: &Registry, bundle: &LibraryBundle, dir: &Path) -> Self {
        let platform = registry.platform();
        let libraries = registry
            .entries()
            .map(|(name, extraction)| {
                let file = bundle
                    .libraries
                    .iter()
                    .find(|spec| spec.name == name)
                    .map(|spec| spec.file_name.clone());
                library_view(name, file, extraction)
            })
            .collect();
        Self {
            platform: PlatformView {
                os: platform.os.clone(),
                arch: platform.arch.clone(),
                supported: platform.supports_extraction(),
            },
            dir: dir.display().to_string(),
            libraries,
        }
    }
}

fn library_view(name: &str, file: Option<String>, extraction: &Extraction) -> LibraryView {
    let mut view = LibraryView {
        name: name.to_string(),
        file,
        status: extraction.label(),
        path: extraction.path().map(|path| path.display().to_string()),
        bytes: None,
        reason: None,
    };
    match extraction {
        Extraction::Copied { bytes, .. } => view.bytes = Some(*bytes),
        Extraction::Failed(reason) => view.reason = Some(reason.clone()),
        Extraction::Reused(_) | Extraction::Missing => {}
    }
    view
}

#[derive(Debug, Serialize)]
pub struct VerifyEntry {
    pub name: String,
    pub file: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_sha256: Option<String>,
}

impl VerifyEntry {
    pub fn new(name: &str, file: &str, status: &CacheStatus) -> Self {
        let (expected_sha256, actual_sha256) = match status {
            CacheStatus::Stale { expected, actual } => (Some(expected.clone()), Some(actual.clone())),
            _ => (None, None),
        };
        Self {
            name: name.to_string(),
            file: file.to_string(),
            status: status.label(),
            expected_sha256,
            actual_sha256,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoadReport {
    pub library: String,
    pub loaded: bool,
    pub via: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl LoadReport {
    pub fn new(name: &str, registry: &Registry) -> Self {
        let path = registry.path(name);
        Self {
            library: name.to_string(),
            loaded: true,
            via: if path.is_some() {
                "extracted"
            } else {
                "search_path"
            },
            path: path.map(|path| path.display().to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CleanReport {
    pub dir: String,
    pub removed: bool,
}

pub fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(err.to_string()));
    if let Some(name) = err.name() {
        inner.insert("library".to_string(), json!(name));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(cause) = StdError::source(err) {
        inner.insert("cause".to_string(), json!(cause.to_string()));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

#[cfg(test)]
mod tests {
    use super::{DetectReport, LoadReport, VerifyEntry, error_json};
    use std::path::Path;
    use std::sync::Arc;
    use tinyb_loader::api::{
        CacheStatus, Diagnostics, Error, ErrorKind, Extractor, LibraryBundle, MemoryResources,
        Platform, Registry,
    };

    #[test]
    fn detect_report_lists_each_registered_library() {
        let temp = tempfile::tempdir().expect("tempdir");
        let bundle = LibraryBundle::default();
        let extractor = Extractor::new(
            Arc::new(MemoryResources::new().with("/libtinyb.so", b"tinyb".to_vec())),
            temp.path(),
            Diagnostics::default(),
        );
        let registry = Registry::detect(
            Platform::new("Linux", "amd64"),
            &bundle,
            &extractor,
            Diagnostics::default(),
        );

        let report = DetectReport::new(&registry, &bundle, extractor.dir());
        let value = serde_json::to_value(&report).expect("json");
        assert_eq!(value["platform"]["supported"], true);

        let libraries = value["libraries"].as_array().expect("libraries");
        assert_eq!(libraries.len(), 2);
        let tinyb = libraries
            .iter()
            .find(|entry| entry["name"] == "tinyb")
            .expect("tinyb entry");
        assert_eq!(tinyb["status"], "copied");
        assert_eq!(tinyb["bytes"], 5);
        let binding = libraries
            .iter()
            .find(|entry| entry["name"] == "javatinyb")
            .expect("javatinyb entry");
        assert_eq!(binding["status"], "missing");
        assert!(binding.get("path").is_none());
    }

    #[test]
    fn load_report_names_the_strategy() {
        let registry = Registry::empty(Platform::new("Windows", "amd64"));
        let report = LoadReport::new("tinyb", &registry);
        assert_eq!(report.via, "search_path");
        assert_eq!(report.path, None);
    }

    #[test]
    fn stale_entries_carry_both_digests() {
        let status = CacheStatus::Stale {
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        let entry = VerifyEntry::new("tinyb", "libtinyb.so", &status);
        let value = serde_json::to_value(&entry).expect("json");
        assert_eq!(value["status"], "stale");
        assert_eq!(value["expected_sha256"], "aa");
        assert_eq!(value["actual_sha256"], "bb");
    }

    #[test]
    fn error_json_has_kind_and_context() {
        let err = Error::new(ErrorKind::Load)
            .with_name("tinyb")
            .with_path(Path::new("/tmp/libtinyb.so"));
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "Load");
        assert_eq!(value["error"]["library"], "tinyb");
        assert_eq!(value["error"]["path"], "/tmp/libtinyb.so");
        assert!(value["error"].get("cause").is_none());
    }
}
