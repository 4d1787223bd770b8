//! Product configuration trait for CLI binaries
//!
//! A binary implements this trait to give the generator its identity and the
//! endpoints it talks to.

/// Configuration trait for a scaffolding CLI
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for the CLI command, env vars)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Registry endpoint queried for the latest published version
    fn version_check_url(&self) -> &'static str;

    /// Environment variable name for overriding the version check URL
    fn version_check_url_env(&self) -> &'static str;

    /// Upgrade/install command shown in version warnings
    fn upgrade_command(&self) -> &'static str;

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }
}
