//! Reproducibility report printed at the end of a run.

use std::fmt;

/// Environment the comparison ran in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Crate name.
    pub package: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Target operating system.
    pub os: &'static str,
    /// Target architecture.
    pub arch: &'static str,
    /// Threads available to the process.
    pub threads: usize,
    /// `debug` or `release`.
    pub profile: &'static str,
}

impl Report {
    /// Collects the report for the running process.
    #[must_use]
    pub fn collect() -> Self {
        Self {
            package: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            profile: if cfg!(debug_assertions) { "debug" } else { "release" },
        }
    }

    fn rows(&self) -> [(&'static str, String); 5] {
        [
            ("version", format!("{} {}", self.package, self.version)),
            ("os", self.os.to_string()),
            ("arch", self.arch.to_string()),
            ("threads", self.threads.to_string()),
            ("profile", self.profile.to_string()),
        ]
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.rows();
        let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let rule = "-".repeat(40);
        writeln!(f, "{rule}")?;
        for (key, value) in &rows {
            writeln!(f, "{key:>width$} : {value}")?;
        }
        write!(f, "{rule}")
    }
}
