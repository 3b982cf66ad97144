//! System-wide constants.

/// Application name used in CLI output and log targets.
pub const APP_NAME: &str = "tessera";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "tessera";

/// File extension for Tessera composition files.
pub const TSR_EXTENSION: &str = ".tsr";

/// Default composition file looked up by the CLI.
pub const DEFAULT_COMPOSITION_FILE: &str = "tessera.tsr";

/// Environment variable selecting the validation mode.
pub const MODE_ENV_VAR: &str = "TESSERA_MODE";

/// Opening delimiter of an output template placeholder.
pub const PLACEHOLDER_OPEN: &str = "${";

/// Closing delimiter of an output template placeholder.
pub const PLACEHOLDER_CLOSE: &str = "}";
