//! Purpose: Copy bundled native libraries into a versioned temp directory.
//! Exports: `Extractor`, `Extraction`, `CacheStatus`, `NAMESPACE`.
//! Role: The only code that writes to the filesystem; callers see paths or absence.
//! Invariants: An existing destination file is never rewritten or removed by extraction.
//! Invariants: Copies are staged in a sibling temp file and moved into place without clobbering.
//! Invariants: Failures are logged (unless suppressed) and reported as `Extraction::Failed`, never raised.
//! Notes: The namespace acts as a cache key; bump it whenever the bundled binaries change.
use std::error::Error as StdError;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use sha2::{Digest, Sha256};

use crate::core::config::Diagnostics;
use crate::core::error::{Error, ErrorKind};
use crate::core::resource::{ResourceSource, resource_location};

pub const NAMESPACE: &str = "tinyb-libs-0.5";

const LOCK_FILE: &str = ".extract.lock";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Extraction {
    /// The resource was copied to `path` during this call.
    Copied { path: PathBuf, bytes: u64 },
    /// A previous extraction (possibly by another process) was reused.
    Reused(PathBuf),
    /// The bundle has no such resource.
    Missing,
    /// Copying failed; the reason is kept for diagnostics only.
    Failed(String),
}

impl Extraction {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Extraction::Copied { path, .. } | Extraction::Reused(path) => Some(path),
            Extraction::Missing | Extraction::Failed(_) => None,
        }
    }

    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Extraction::Copied { path, .. } | Extraction::Reused(path) => Some(path),
            Extraction::Missing | Extraction::Failed(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Extraction::Copied { .. } => "copied",
            Extraction::Reused(_) => "reused",
            Extraction::Missing => "missing",
            Extraction::Failed(_) => "failed",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CacheStatus {
    ResourceMissing,
    NotExtracted,
    Fresh,
    Stale { expected: String, actual: String },
}

impl CacheStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CacheStatus::ResourceMissing => "resource_missing",
            CacheStatus::NotExtracted => "not_extracted",
            CacheStatus::Fresh => "fresh",
            CacheStatus::Stale { .. } => "stale",
        }
    }
}

#[derive(Clone)]
pub struct Extractor {
    resources: Arc<dyn ResourceSource>,
    dir: PathBuf,
    diag: Diagnostics,
}

impl Extractor {
    pub fn new(
        resources: Arc<dyn ResourceSource>,
        temp_root: impl AsRef<Path>,
        diag: Diagnostics,
    ) -> Self {
        let temp_root = temp_root.as_ref();
        let temp_root = std::path::absolute(temp_root).unwrap_or_else(|_| temp_root.to_path_buf());
        Self {
            resources,
            dir: temp_root.join(NAMESPACE),
            diag,
        }
    }

    /// The versioned directory extracted files land in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn destination(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Extracts `folder + file_name`, returning the extracted path or `None`
    /// when the resource is missing or the copy failed.
    pub fn extract(&self, folder: &str, file_name: &str) -> Option<PathBuf> {
        self.try_extract(folder, file_name).into_path()
    }

    pub fn try_extract(&self, folder: &str, file_name: &str) -> Extraction {
        let location = resource_location(folder, file_name);
        let Some(stream) = self.resources.open(&location) else {
            self.diag
                .trace(format!("Could not find {location} in resources"));
            return Extraction::Missing;
        };

        match self.copy_into_place(stream, file_name) {
            Ok(extraction) => extraction,
            Err(err) => {
                self.diag
                    .error(format!("Error extracting {location} to temp"), &err);
                let reason = match StdError::source(&err) {
                    Some(cause) => format!("{err}: {cause}"),
                    None => err.to_string(),
                };
                Extraction::Failed(reason)
            }
        }
    }

    fn copy_into_place(
        &self,
        mut stream: Box<dyn Read + '_>,
        file_name: &str,
    ) -> Result<Extraction, Error> {
        validate_file_name(file_name)?;
        fs::create_dir_all(&self.dir).map_err(|err| Error::io(err).with_path(&self.dir))?;

        let destination = self.destination(file_name);
        if destination.exists() {
            return Ok(Extraction::Reused(destination));
        }

        let _lock = ExtractLock::acquire(&self.dir.join(LOCK_FILE))?;
        if destination.exists() {
            return Ok(Extraction::Reused(destination));
        }

        let mut staged = tempfile::Builder::new()
            .prefix(".")
            .suffix(".partial")
            .tempfile_in(&self.dir)
            .map_err(|err| Error::io(err).with_path(&self.dir))?;
        let bytes = io::copy(&mut stream, staged.as_file_mut())
            .map_err(|err| Error::io(err).with_path(staged.path()))?;
        staged
            .as_file()
            .sync_all()
            .map_err(|err| Error::io(err).with_path(staged.path()))?;
        set_library_permissions(staged.path())?;

        if let Err(err) = staged.persist_noclobber(&destination) {
            if destination.exists() {
                return Ok(Extraction::Reused(destination));
            }
            return Err(Error::io(err.error).with_path(&destination));
        }

        self.diag.trace(format!(
            "Extracting {file_name} to {} *done*. written bytes: {bytes}",
            destination.display()
        ));
        Ok(Extraction::Copied {
            path: destination,
            bytes,
        })
    }

    /// Compares the bundled bytes with the extracted copy without touching either.
    pub fn verify(&self, folder: &str, file_name: &str) -> Result<CacheStatus, Error> {
        validate_file_name(file_name)?;
        let location = resource_location(folder, file_name);
        let Some(mut stream) = self.resources.open(&location) else {
            return Ok(CacheStatus::ResourceMissing);
        };

        let destination = self.destination(file_name);
        if !destination.exists() {
            return Ok(CacheStatus::NotExtracted);
        }

        let expected = sha256_hex(&mut stream).map_err(|err| {
            Error::io(err).with_message(format!("failed to read resource {location}"))
        })?;
        let mut file =
            File::open(&destination).map_err(|err| Error::io(err).with_path(&destination))?;
        let actual = sha256_hex(&mut file).map_err(|err| Error::io(err).with_path(&destination))?;

        if expected == actual {
            Ok(CacheStatus::Fresh)
        } else {
            Ok(CacheStatus::Stale { expected, actual })
        }
    }

    /// Removes the whole namespace directory. Returns whether anything was removed.
    pub fn clear(&self) -> Result<bool, Error> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                self.diag
                    .trace(format!("Removed {}", self.dir.display()));
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Error::io(err).with_path(&self.dir)),
        }
    }
}

struct ExtractLock {
    file: File,
}

impl ExtractLock {
    fn acquire(path: &Path) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|err| Error::io(err).with_path(path))?;
        FileExt::lock_exclusive(&file).map_err(|err| Error::io(err).with_path(path))?;
        Ok(Self { file })
    }
}

impl Drop for ExtractLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn validate_file_name(file_name: &str) -> Result<(), Error> {
    let plain = !file_name.is_empty()
        && file_name != "."
        && file_name != ".."
        && !file_name.contains(['/', '\\']);
    if plain {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::Usage)
            .with_message(format!("library file name must not contain path components: {file_name:?}")))
    }
}

#[cfg(unix)]
fn set_library_permissions(path: &Path) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|err| Error::io(err).with_path(path))
}

#[cfg(not(unix))]
fn set_library_permissions(_path: &Path) -> Result<(), Error> {
    Ok(())
}

fn sha256_hex(reader: &mut dyn Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(reader, &mut hasher)?;
    Ok(hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect())
}
