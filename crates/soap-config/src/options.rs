//! Dispatch and listener switches shared by the daemon and its embedders.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How much diagnostic detail a synthesised `Server` fault carries.
///
/// Faults authored by handlers are never altered by this policy.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FaultDetail {
    /// No detail element.
    Omit,
    /// `<error kind> <error message>`.
    #[default]
    Terse,
    /// Error kind, message, and every `source()` in the chain.
    Full,
}

/// Connection scheduling used by the listener.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ServeMode {
    /// The accept thread serves each connection to completion before
    /// accepting the next.
    Sequential,
    /// One thread per accepted connection.
    #[default]
    Threaded,
}

/// PEM files backing the TLS listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TlsSettings {
    /// Certificate chain in PEM format.
    pub cert_path: Utf8PathBuf,
    /// Private key in PEM format.
    pub key_path: Utf8PathBuf,
}
