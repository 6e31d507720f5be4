//! Types for the filesystem module.

use std::fmt;
use std::ops::BitOr;
use std::path::PathBuf;

/// Metadata about a single filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    /// Root-relative path of the entry.
    pub path: PathBuf,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
}

impl FileStat {
    /// Final component of the path, or an empty string for the root.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Classification bits of a change notification.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventMask(u8);

impl EventMask {
    pub const CREATE: EventMask = EventMask(1);
    pub const MODIFY: EventMask = EventMask(1 << 1);
    pub const REMOVE: EventMask = EventMask(1 << 2);
    pub const RENAME: EventMask = EventMask(1 << 3);

    /// An empty mask.
    pub const fn empty() -> Self {
        EventMask(0)
    }

    /// Whether every bit of `other` is set in `self`.
    pub const fn contains(self, other: EventMask) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        EventMask(self.0 | rhs.0)
    }
}

impl fmt::Debug for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::CREATE, "CREATE"),
            (Self::MODIFY, "MODIFY"),
            (Self::REMOVE, "REMOVE"),
            (Self::RENAME, "RENAME"),
        ]
        .into_iter()
        .filter(|(bit, _)| self.contains(*bit))
        .map(|(_, name)| name)
        .collect();
        write!(f, "EventMask({})", names.join("|"))
    }
}

/// A change notification delivered by a [`Watcher`](super::Watcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    /// Root-relative path of the affected entry.
    pub path: PathBuf,
    /// What happened to it.
    pub mask: EventMask,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, mask: EventMask) -> Self {
        Self {
            path: path.into(),
            mask,
        }
    }

    /// Whether this event announces a newly created entry.
    pub fn is_create(&self) -> bool {
        self.mask.contains(EventMask::CREATE)
    }
}
