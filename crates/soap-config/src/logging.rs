use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Switches for the wire-level diagnostic dumps.
///
/// Each enabled switch emits the corresponding material as a `debug` event on
/// the daemon's wire tracing target.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DumpSettings {
    /// Log the error chain of every fault raised by a handler.
    pub fault_info: bool,
    /// Log inbound HTTP request lines and headers.
    pub headers_in: bool,
    /// Log outbound HTTP status lines and headers.
    pub headers_out: bool,
    /// Log inbound envelope bytes.
    pub soap_in: bool,
    /// Log outbound envelope bytes.
    pub soap_out: bool,
}

impl DumpSettings {
    /// Whether any dump is enabled.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.fault_info || self.headers_in || self.headers_out || self.soap_in || self.soap_out
    }
}
