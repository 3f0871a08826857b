//! Purpose: Embed bundled native libraries into the crate as read-only resources.
//! Role: Cargo build-script; writes `$OUT_DIR/embedded.rs` with one `include_bytes!` per file.
//! Invariants: Resources are keyed `/<file name>`; subdirectories and dotfiles are ignored.
//! Invariants: A missing native directory yields an empty table, never a build failure.
//! Invariants: `TINYB_NATIVE_DIR` overrides the default `<manifest>/native` directory.
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    let native_dir = env::var_os("TINYB_NATIVE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| manifest_dir.join("native"));

    println!("cargo:rerun-if-env-changed=TINYB_NATIVE_DIR");
    println!("cargo:rerun-if-changed={}", native_dir.display());

    let files = collect_native_files(&native_dir);
    if files.is_empty() {
        println!(
            "cargo:warning=tinyb-loader: no native libraries found in {}",
            native_dir.display()
        );
    }

    let mut table = String::from("pub(crate) static EMBEDDED: &[(&str, &[u8])] = &[\n");
    for (file_name, path) in &files {
        println!("cargo:rerun-if-changed={}", path.display());
        table.push_str(&format!(
            "    ({:?}, include_bytes!({:?})),\n",
            format!("/{file_name}"),
            path.display().to_string()
        ));
    }
    table.push_str("];\n");

    fs::write(out_dir.join("embedded.rs"), table).expect("failed to write embedded.rs");
}

fn collect_native_files(dir: &Path) -> Vec<(String, PathBuf)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<(String, PathBuf)> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|kind| kind.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            if name.starts_with('.') {
                return None;
            }
            let path = fs::canonicalize(entry.path()).ok()?;
            Some((name, path))
        })
        .collect();
    files.sort();
    files
}
