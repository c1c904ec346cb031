//! Crate-wide constants.

/// Application name used for the tool's own directories.
pub const APP_NAME: &str = "partplan";

/// Hidden directory under the work directory holding per-application data.
pub const DATA_DIR_NAME: &str = ".partplan";

/// Directory name for step state within an application's data directory.
pub const STATE_DIR_NAME: &str = "state";

/// Version of the on-disk step state format.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Latest completion time a state record may carry: 9999-12-31T23:59:59Z.
pub const MAX_COMPLETED_AT: u64 = 253_402_300_799;

/// Plugin API versions this crate can plan for.
pub const SUPPORTED_PLUGIN_VERSIONS: &[&str] = &["v2"];

/// Plugin API version used when none is configured.
pub const DEFAULT_PLUGIN_VERSION: &str = "v2";
