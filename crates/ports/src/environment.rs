//! Build environment and console boundary contracts.

/// Read-only view of the build environment variables.
pub trait EnvironmentPort: Send + Sync {
    /// Look up a variable; `None` when unset.
    fn var(&self, name: &str) -> Option<String>;
}

/// Best-effort, human-facing output sink (CI console).
///
/// Implementations must never fail; write errors are dropped.
pub trait ConsolePort: Send + Sync {
    /// Write one line.
    fn write_line(&self, line: &str);
}
