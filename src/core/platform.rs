//! Purpose: Decide whether bundled native libraries can be extracted on this host.
//! Exports: `Platform`, `LibrarySpec`, `LibraryBundle`.
//! Role: Pure decision table over OS/arch strings; no filesystem access.
//! Invariants: Matching is case-insensitive substring matching.
//! Invariants: Only Linux on "arm" or "amd64"/"x86_64" is supported.

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn supports_extraction(&self) -> bool {
        let os = self.os.to_ascii_lowercase();
        let arch = self.arch.to_ascii_lowercase();
        if !os.contains("linux") {
            return false;
        }
        arch.contains("arm") || arch.contains("amd64") || arch.contains("x86_64")
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LibrarySpec {
    pub name: String,
    pub file_name: String,
}

impl LibrarySpec {
    pub fn new(name: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
        }
    }
}

/// The set of libraries prepared on supported platforms, and where they live
/// in the embedded resources.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LibraryBundle {
    pub folder: String,
    pub libraries: Vec<LibrarySpec>,
}

impl LibraryBundle {
    pub fn new(folder: impl Into<String>, libraries: Vec<LibrarySpec>) -> Self {
        Self {
            folder: folder.into(),
            libraries,
        }
    }

    pub fn tinyb() -> Self {
        Self::new(
            "/",
            vec![
                LibrarySpec::new("tinyb", "libtinyb.so"),
                LibrarySpec::new("javatinyb", "libjavatinyb.so"),
            ],
        )
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.libraries.iter().map(|spec| spec.name.as_str())
    }
}

impl Default for LibraryBundle {
    fn default() -> Self {
        Self::tinyb()
    }
}
