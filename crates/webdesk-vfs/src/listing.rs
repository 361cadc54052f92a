//! Directory listings.
//!
//! Real directories are read from disk; `/System/Packages` is computed from
//! the package collaborator. Both end up in the same ordered shape:
//! `..` first (except at `/`), then directories, then files, each group
//! sorted by name.

use indexmap::IndexMap;
use serde::Deserialize;
use strum::{Display, EnumString};
use tokio::fs;
use webdesk_types::{ListingEntry, PackageInfo, User};

use crate::error::{VfsError, VfsResult};
use crate::icons::{FOLDER_ICON, PARENT_ICON, guess_mime, mime_matches};
use crate::mapper::{USER_SEGMENT, VfsPath};
use crate::service::Vfs;

/// Ordered listing keyed by entry name.
pub type Listing = IndexMap<String, ListingEntry>;

/// Names never shown in a listing besides dotfiles.
const IGNORED: &[&str] = &["CVS", "Thumbs.db", "desktop.ini", "lost+found"];

fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || IGNORED.contains(&name)
}

/// Secondary sort key for `lswrap`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Mime,
}

impl Vfs {
    /// List a directory.
    ///
    /// Files whose MIME does not pass `mime_filter` are dropped;
    /// directories always pass.
    #[tracing::instrument(skip_all, fields(user = %user.username, path = %path))]
    pub async fn list(
        &self,
        user: &User,
        path: &VfsPath,
        mime_filter: &[String],
    ) -> VfsResult<Listing> {
        let (dirs, files) = if self.dirs.is_synthetic(path) {
            (Vec::new(), self.list_packages(user, path, mime_filter).await?)
        } else {
            self.list_disk(user, path, mime_filter).await?
        };
        Ok(assemble(path, dirs, files))
    }

    async fn list_packages(
        &self,
        user: &User,
        path: &VfsPath,
        mime_filter: &[String],
    ) -> VfsResult<Vec<ListingEntry>> {
        let packages = self
            .packages
            .installed_system_packages(&user.language)
            .await?;

        let root_path = path.to_string();
        let entries = packages
            .into_iter()
            .filter_map(|(name, info)| {
                let mime = info.mime_type();
                if !mime_matches(mime_filter, &mime) {
                    return None;
                }
                let icon = package_icon(&name, &info);
                let entry_path = path.join(&name).to_string();
                Some(ListingEntry::file(name, entry_path, root_path.clone(), mime, icon))
            })
            .collect();
        Ok(entries)
    }

    async fn list_disk(
        &self,
        user: &User,
        path: &VfsPath,
        mime_filter: &[String],
    ) -> VfsResult<(Vec<ListingEntry>, Vec<ListingEntry>)> {
        let display = path.to_string();
        let mapped = self.resolve(user, path)?;
        let mut reader = fs::read_dir(&mapped.concrete)
            .await
            .map_err(|e| VfsError::from_io(e, &display))?;

        let mut dirs = Vec::new();
        let mut files = Vec::new();

        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| VfsError::from_io(e, &display))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_ignored(&name) {
                continue;
            }

            // Follows symlinks; dangling links are skipped
            let meta = match fs::metadata(entry.path()).await {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::debug!(name = %name, "skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let child = path.join(&name);
            let protected = !child.is_user();
            if meta.is_dir() {
                let icon = self.dirs.icon_for(&child).unwrap_or(FOLDER_ICON);
                dirs.push(
                    ListingEntry::dir(name, child.to_string(), display.clone(), icon)
                        .with_protected(protected),
                );
            } else {
                let mime = guess_mime(&name);
                if !mime_matches(mime_filter, &mime) {
                    continue;
                }
                let icon = self.icons.icon_for(&name, Some(mime.as_str()));
                files.push(
                    ListingEntry::file(name, child.to_string(), display.clone(), mime, icon)
                        .with_size(meta.len())
                        .with_protected(protected),
                );
            }
        }

        // The private subtree lives under home_root, not public_root
        if path.is_root() && !dirs.iter().any(|d| d.name == USER_SEGMENT) {
            let user_dir = VfsPath::parse(USER_SEGMENT);
            let icon = self.dirs.icon_for(&user_dir).unwrap_or(FOLDER_ICON);
            dirs.push(
                ListingEntry::dir(USER_SEGMENT, user_dir.to_string(), display.clone(), icon)
                    .with_protected(true),
            );
        }

        Ok((dirs, files))
    }

    /// List a directory and re-sort it for a file-manager view.
    ///
    /// Directories still precede files and `..` stays first.
    pub async fn list_sorted(
        &self,
        user: &User,
        path: &VfsPath,
        mime_filter: &[String],
        sort: SortKey,
    ) -> VfsResult<Listing> {
        let mut listing = self.list(user, path, mime_filter).await?;
        listing.sort_by(|_, a, _, b| {
            let parent_first = (b.name == "..").cmp(&(a.name == ".."));
            let dirs_first = b.is_dir().cmp(&a.is_dir());
            let key = match sort {
                SortKey::Name => a.name.cmp(&b.name),
                SortKey::Size => a.size_bytes.cmp(&b.size_bytes).then(a.name.cmp(&b.name)),
                SortKey::Mime => a.mime_type.cmp(&b.mime_type).then(a.name.cmp(&b.name)),
            };
            parent_first.then(dirs_first).then(key)
        });
        Ok(listing)
    }
}

/// Icon for a package: absolute icons pass through, relative ones resolve
/// against the package's resource directory.
fn package_icon(name: &str, info: &PackageInfo) -> String {
    if info.icon.is_empty() {
        "apps/system-software-install.png".to_string()
    } else if info.icon.starts_with('/') || info.icon.contains("://") {
        info.icon.clone()
    } else {
        format!("/packages/{name}/{}", info.icon)
    }
}

fn assemble(path: &VfsPath, mut dirs: Vec<ListingEntry>, mut files: Vec<ListingEntry>) -> Listing {
    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let mut listing = Listing::with_capacity(dirs.len() + files.len() + 1);
    if !path.is_root() {
        let parent = ListingEntry::dir(
            "..",
            path.parent().to_string(),
            path.to_string(),
            PARENT_ICON,
        );
        listing.insert(parent.name.clone(), parent);
    }
    for entry in dirs.into_iter().chain(files) {
        listing.insert(entry.name.clone(), entry);
    }
    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VfsConfig;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tempfile::TempDir;
    use webdesk_types::EntryType;

    struct Fixture {
        vfs: Vfs,
        user: User,
        home: TempDir,
        public: TempDir,
    }

    async fn setup() -> Fixture {
        let home = TempDir::new().unwrap();
        let public = TempDir::new().unwrap();
        let vfs = Vfs::new(VfsConfig::with_roots(home.path(), public.path()));
        let user = User::new("amy", "en_EN");
        vfs.ensure_home(&user).await.unwrap();
        Fixture {
            vfs,
            user,
            home,
            public,
        }
    }

    fn names(listing: &Listing) -> Vec<&str> {
        listing.keys().map(String::as_str).collect()
    }

    #[tokio::test]
    async fn test_dirs_first_then_files_parent_leading() {
        let f = setup().await;
        let root = f.home.path().join("amy");
        std::fs::create_dir(root.join("zeta")).unwrap();
        std::fs::create_dir(root.join("alpha")).unwrap();
        std::fs::write(root.join("b.txt"), "b").unwrap();
        std::fs::write(root.join("a.txt"), "aa").unwrap();
        std::fs::write(root.join(".hidden"), "").unwrap();
        std::fs::create_dir(root.join(".git")).unwrap();

        let listing = f.vfs.list(&f.user, &VfsPath::parse("/User"), &[]).await.unwrap();
        assert_eq!(names(&listing), vec!["..", "alpha", "zeta", "a.txt", "b.txt"]);

        let parent = &listing[".."];
        assert_eq!(parent.path, "/");
        assert!(parent.is_protected);

        let a = &listing["a.txt"];
        assert_eq!(a.path, "/User/a.txt");
        assert_eq!(a.root_path, "/User");
        assert_eq!(a.size_bytes, 2);
        assert_eq!(a.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(a.entry_type, EntryType::File);
        assert!(!a.is_protected);
        assert!(!listing["alpha"].is_protected);
    }

    #[tokio::test]
    async fn test_mime_filter_keeps_dirs() {
        let f = setup().await;
        let root = f.home.path().join("amy");
        std::fs::write(root.join("a.png"), "").unwrap();
        std::fs::write(root.join("b.txt"), "").unwrap();
        std::fs::create_dir(root.join("pics")).unwrap();

        let filter = vec!["image/*".to_string()];
        let listing = f
            .vfs
            .list(&f.user, &VfsPath::parse("/User"), &filter)
            .await
            .unwrap();
        assert_eq!(names(&listing), vec!["..", "pics", "a.png"]);
    }

    #[tokio::test]
    async fn test_root_has_no_parent_and_shows_user() {
        let f = setup().await;
        std::fs::create_dir_all(f.public.path().join("System/Fonts")).unwrap();
        std::fs::create_dir(f.public.path().join("Public")).unwrap();

        let listing = f.vfs.list(&f.user, &VfsPath::root(), &[]).await.unwrap();
        assert!(!listing.contains_key(".."));
        assert_eq!(names(&listing), vec!["Public", "System", "User"]);
        assert!(listing["System"].is_protected);
        assert_eq!(listing["System"].icon_hint, "places/folder-system.png");
        assert_eq!(listing["User"].path, "/User");
    }

    #[tokio::test]
    async fn test_public_entries_are_protected() {
        let f = setup().await;
        let fonts = f.public.path().join("System/Fonts");
        std::fs::create_dir_all(&fonts).unwrap();
        std::fs::write(fonts.join("sans.ttf"), "x").unwrap();

        let listing = f
            .vfs
            .list(&f.user, &VfsPath::parse("/System/Fonts"), &[])
            .await
            .unwrap();
        assert_eq!(names(&listing), vec!["..", "sans.ttf"]);
        assert_eq!(listing[".."].path, "/System");
        assert!(listing["sans.ttf"].is_protected);
    }

    #[tokio::test]
    async fn test_missing_directory_fails() {
        let f = setup().await;
        let err = f
            .vfs
            .list(&f.user, &VfsPath::parse("/User/nope"), &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "not found: /User/nope");
    }

    #[tokio::test]
    async fn test_packages_listing() {
        let f = setup().await;
        let mut table = BTreeMap::new();
        table.insert("Foo".to_string(), PackageInfo::new("Application", "x.png"));
        table.insert("Bar".to_string(), PackageInfo::new("Service", "/abs/bar.png"));
        let vfs = Vfs::new(VfsConfig::with_roots(f.home.path(), f.public.path()))
            .with_packages(Arc::new(crate::collab::StaticPackages::new(table)));

        let listing = vfs
            .list(&f.user, &VfsPath::parse("/System/Packages"), &[])
            .await
            .unwrap();
        assert_eq!(names(&listing), vec!["..", "Bar", "Foo"]);

        let foo = &listing["Foo"];
        assert_eq!(foo.entry_type, EntryType::File);
        assert_eq!(foo.mime_type.as_deref(), Some("OSjs/Application"));
        assert_eq!(foo.path, "/System/Packages/Foo");
        assert_eq!(foo.icon_hint, "/packages/Foo/x.png");
        assert!(foo.is_protected);
        assert_eq!(listing["Bar"].icon_hint, "/abs/bar.png");

        let services = vfs
            .list(
                &f.user,
                &VfsPath::parse("/System/Packages"),
                &["OSjs/Service".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(names(&services), vec!["..", "Bar"]);
    }

    #[tokio::test]
    async fn test_sorted_by_size() {
        let f = setup().await;
        let root = f.home.path().join("amy");
        std::fs::write(root.join("big.txt"), "xxxxxxxx").unwrap();
        std::fs::write(root.join("small.txt"), "x").unwrap();
        std::fs::create_dir(root.join("dir")).unwrap();

        let listing = f
            .vfs
            .list_sorted(&f.user, &VfsPath::parse("/User"), &[], SortKey::Size)
            .await
            .unwrap();
        assert_eq!(names(&listing), vec!["..", "dir", "small.txt", "big.txt"]);
    }
}
