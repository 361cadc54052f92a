//! Virtual directory registry.
//!
//! A fixed table of abstract prefixes with special meaning. Built once and
//! shared read-only; nothing registers directories at runtime.

use serde::Serialize;
use strum::Display;

use crate::mapper::VfsPath;

/// What backs a virtual directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DirKind {
    /// Entries are computed, nothing on disk.
    SyntheticListing,
    /// Real directory, informational read-only.
    RealReadonlySubtree,
    /// Real directory, writable.
    RealReadwriteSubtree,
    /// Real directory confined to the calling user.
    ChrootedUserSubtree,
}

/// Declared access mode. Listing metadata only; enforcement lives outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccessMode {
    Read,
    ReadWrite,
}

/// One registry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualDir {
    pub prefix: &'static str,
    pub kind: DirKind,
    pub access: AccessMode,
    pub icon: &'static str,
}

/// The registry table.
#[derive(Debug, Clone)]
pub struct VirtualDirs {
    entries: Vec<VirtualDir>,
}

impl Default for VirtualDirs {
    fn default() -> Self {
        use AccessMode::*;
        use DirKind::*;

        let row = |prefix, kind, access, icon| VirtualDir {
            prefix,
            kind,
            access,
            icon,
        };

        Self {
            entries: vec![
                row("/System/Packages", SyntheticListing, Read, "places/user-bookmarks.png"),
                row("/System/Docs", RealReadonlySubtree, Read, "places/user-bookmarks.png"),
                row("/System/Wallpapers", RealReadonlySubtree, Read, "places/user-pictures.png"),
                row("/System/Fonts", RealReadonlySubtree, Read, "places/folder-templates.png"),
                row("/System/Sounds", RealReadonlySubtree, Read, "places/folder-music.png"),
                row("/System/Templates", RealReadonlySubtree, Read, "places/folder-templates.png"),
                row("/System/Themes", RealReadonlySubtree, Read, "places/folder-templates.png"),
                row("/System", RealReadonlySubtree, Read, "places/folder-system.png"),
                row("/User", ChrootedUserSubtree, ReadWrite, "places/user-home.png"),
                row("/Public", RealReadwriteSubtree, ReadWrite, "places/folder-publicshare.png"),
                row("/Shared", RealReadonlySubtree, Read, "places/folder-remote.png"),
            ],
        }
    }
}

impl VirtualDirs {
    /// Exact match of a normalized path against the table.
    pub fn classify(&self, path: &VfsPath) -> Option<&VirtualDir> {
        let key = path.to_string();
        self.entries.iter().find(|e| e.prefix == key)
    }

    /// Icon for a registered directory.
    pub fn icon_for(&self, path: &VfsPath) -> Option<&'static str> {
        self.classify(path).map(|e| e.icon)
    }

    /// Whether listing this path produces computed entries.
    pub fn is_synthetic(&self, path: &VfsPath) -> bool {
        self.classify(path)
            .is_some_and(|e| e.kind == DirKind::SyntheticListing)
    }

    /// All rows, in table order.
    pub fn entries(&self) -> &[VirtualDir] {
        &self.entries
    }
}
