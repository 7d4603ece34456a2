//! Mount mode classification from POSIX permission bits.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Owner write bit.
const OWNER_WRITE: u32 = 0o200;
/// Group write bit.
const GROUP_WRITE: u32 = 0o020;

/// How a bind-mounted file is exposed inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountMode {
    /// Writable.
    Rw,
    /// Read-only.
    Ro,
}

impl MountMode {
    /// Classify permission bits.
    ///
    /// A file is mounted `rw` when its owner or its group may write it. The
    /// container user is provisioned into one of those two classes, so the
    /// "other" bits and all execute bits play no part. Bits above the low
    /// nine are ignored.
    #[must_use]
    pub const fn from_permissions(bits: u32) -> Self {
        let bits = bits & 0o777;
        if bits & (OWNER_WRITE | GROUP_WRITE) != 0 {
            Self::Rw
        } else {
            Self::Ro
        }
    }

    /// Compose mount suffix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rw => "rw",
            Self::Ro => "ro",
        }
    }

    /// Whether the mount is read-only.
    #[must_use]
    pub const fn is_readonly(self) -> bool {
        matches!(self, Self::Ro)
    }
}

impl fmt::Display for MountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
