//! Core type definitions shared across crates.

use serde::{Deserialize, Serialize};

/// Kind of backend a media source is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A directory on the local filesystem.
    Local,
    /// A WebDAV server.
    Webdav,
    /// An SMB/CIFS share.
    Smb,
}

impl SourceKind {
    /// Whether listings on this backend are worth retrying with a
    /// percent-decoded path. Network servers sometimes double-encode
    /// special characters; local paths never are.
    #[must_use]
    pub fn retries_decoded_paths(self) -> bool {
        matches!(self, Self::Webdav | Self::Smb)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Webdav => write!(f, "webdav"),
            Self::Smb => write!(f, "smb"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "webdav" => Ok(Self::Webdav),
            "smb" => Ok(Self::Smb),
            other => Err(crate::Error::invalid_input(format!(
                "unknown source kind: {other}"
            ))),
        }
    }
}

/// Type of a directory listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}
