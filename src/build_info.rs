//! Build information
//!
//! Package metadata plus the compile stamp set by `build.rs`.

use serde::Serialize;

/// When the sources were last compiled, ISO 8601 UTC
pub const BUILD_TIMESTAMP: &str = match option_env!("NUTRIEVAL_BUILD_TIMESTAMP") {
    Some(s) => s,
    None => "unknown",
};

/// Cargo profile of the build ("debug" or "release")
pub const BUILD_PROFILE: &str = match option_env!("NUTRIEVAL_BUILD_PROFILE") {
    Some(s) => s,
    None => "unknown",
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub profile: &'static str,
    pub compiled_at: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: NAME,
            version: VERSION,
            profile: BUILD_PROFILE,
            compiled_at: BUILD_TIMESTAMP,
        }
    }

    /// Short form for logs, e.g. "nutrieval 0.3.0 (release, 2026-01-01T10:00:00Z)"
    pub fn summary(&self) -> String {
        format!(
            "{} {} ({}, {})",
            self.name, self.version, self.profile, self.compiled_at
        )
    }
}

/// Print the startup banner to stderr; stdout belongs to the MCP transport
pub fn print_startup_banner() {
    eprintln!("Nutrieval - nutrition scoring for food detection");
    eprintln!("{}", BuildInfo::current().summary());
}
