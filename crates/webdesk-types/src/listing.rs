//! Directory listing and metadata types.
//!
//! Listing entries are produced per call and never persisted. Field names
//! serialize in camelCase because the desktop client consumes them as-is.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Entry type in a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryType {
    /// Regular file (or synthetic file-like entry such as a package).
    File,
    /// Directory.
    Dir,
}

impl EntryType {
    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryType::Dir)
    }

    /// Returns true if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryType::File)
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Abstract path of the entry.
    pub path: String,
    /// Abstract path of the directory that was listed.
    pub root_path: String,
    /// Size in bytes (0 for directories and synthetic entries).
    pub size_bytes: u64,
    /// MIME type; `None` for directories.
    pub mime_type: Option<String>,
    /// Icon hint for the desktop client.
    pub icon_hint: String,
    /// File or directory.
    pub entry_type: EntryType,
    /// Whether the client should refuse to delete or rename this entry.
    pub is_protected: bool,
}

impl ListingEntry {
    /// Create a directory entry.
    pub fn dir(
        name: impl Into<String>,
        path: impl Into<String>,
        root_path: impl Into<String>,
        icon_hint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            root_path: root_path.into(),
            size_bytes: 0,
            mime_type: None,
            icon_hint: icon_hint.into(),
            entry_type: EntryType::Dir,
            is_protected: true,
        }
    }

    /// Create a file entry.
    pub fn file(
        name: impl Into<String>,
        path: impl Into<String>,
        root_path: impl Into<String>,
        mime_type: impl Into<String>,
        icon_hint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            root_path: root_path.into(),
            size_bytes: 0,
            mime_type: Some(mime_type.into()),
            icon_hint: icon_hint.into(),
            entry_type: EntryType::File,
            is_protected: true,
        }
    }

    /// Set the size.
    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    /// Set the protection flag.
    pub fn with_protected(mut self, is_protected: bool) -> Self {
        self.is_protected = is_protected;
        self
    }

    /// Returns true if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.entry_type.is_dir()
    }
}

/// Payload of the `fileinfo` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// File name without directory.
    pub filename: String,
    /// Abstract path of the containing directory.
    pub parent_path: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Guessed MIME type.
    pub mime_type: String,
    /// Type-specific extras (modification time, permissions, PDF metadata).
    pub extended_info: serde_json::Value,
}
