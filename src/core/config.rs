//! Purpose: Process-wide switches for diagnostics and the extraction root.
//! Exports: `Config`, `Diagnostics`, and the environment variable names.
//! Role: Single place where environment lookups happen; everything else takes a `Config`.
//! Invariants: Booleans are true only for a case-insensitive "true"; anything else is false.
//! Invariants: Diagnostics never influence control flow; they only gate tracing events.
use std::error::Error as StdError;
use std::path::PathBuf;

pub const DEBUG_ENV: &str = "TINYB_ACTBUNDLE_DEBUG";
pub const SUPPRESS_ERROR_ENV: &str = "TINYB_ACTBUNDLE_SUPPRESS_ERROR";
pub const TMPDIR_ENV: &str = "TINYB_ACTBUNDLE_TMPDIR";

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Config {
    pub debug: bool,
    pub suppress_error: bool,
    pub temp_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            debug: parse_flag(lookup(DEBUG_ENV)),
            suppress_error: parse_flag(lookup(SUPPRESS_ERROR_ENV)),
            temp_dir: lookup(TMPDIR_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Root under which the versioned extraction namespace lives.
    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            debug: self.debug,
            suppress_error: self.suppress_error,
        }
    }
}

fn parse_flag(value: Option<String>) -> bool {
    value.is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Diagnostics {
    debug: bool,
    suppress_error: bool,
}

impl Diagnostics {
    pub fn new(debug: bool, suppress_error: bool) -> Self {
        Self {
            debug,
            suppress_error,
        }
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug
    }

    pub fn errors_enabled(&self) -> bool {
        !self.suppress_error
    }

    pub(crate) fn trace(&self, message: impl AsRef<str>) {
        if self.debug {
            tracing::info!(target: "tinyb_loader", "{}", message.as_ref());
        }
    }

    pub(crate) fn error(&self, message: impl AsRef<str>, err: &(dyn StdError + 'static)) {
        if self.suppress_error {
            return;
        }
        let mut chain = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push_str(": ");
            chain.push_str(&cause.to_string());
            source = cause.source();
        }
        tracing::error!(target: "tinyb_loader", error = %chain, "{}", message.as_ref());
    }
}
