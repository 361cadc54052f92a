//! The VFS service: shared configuration plus collaborator handles.
//!
//! A `Vfs` is built once at startup and shared behind an `Arc`. All tables
//! it holds are read-only after construction; calls share nothing mutable.

use std::path::PathBuf;
use std::sync::Arc;

use webdesk_types::User;

use crate::collab::{
    ArchiveProvider, CommandArchiver, HttpFetcher, PackageProvider, StaticPackages, UrlFetcher,
};
use crate::config::VfsConfig;
use crate::error::{VfsError, VfsResult};
use crate::icons::IconTheme;
use crate::mapper::{Mapped, PathMapper, VfsPath, ensure_inside};
use crate::process::ToolRunner;
use crate::registry::VirtualDirs;

/// Per-user sandboxed virtual filesystem.
pub struct Vfs {
    pub(crate) config: Arc<VfsConfig>,
    pub(crate) mapper: PathMapper,
    pub(crate) dirs: VirtualDirs,
    pub(crate) icons: IconTheme,
    pub(crate) runner: ToolRunner,
    pub(crate) packages: Arc<dyn PackageProvider>,
    pub(crate) archiver: Arc<dyn ArchiveProvider>,
    pub(crate) fetcher: Arc<dyn UrlFetcher>,
}

impl std::fmt::Debug for Vfs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vfs")
            .field("mapper", &self.mapper)
            .field("runner", &self.runner)
            .finish_non_exhaustive()
    }
}

impl Vfs {
    /// Build a VFS with the bundled collaborators.
    pub fn new(config: VfsConfig) -> Self {
        let runner = ToolRunner::new(config.tool_timeout());
        let tools = Arc::new(config.tools.clone());
        let packages = StaticPackages::new(config.packages.clone());
        Self {
            mapper: PathMapper::new(&config.home_root, &config.public_root),
            dirs: VirtualDirs::default(),
            icons: IconTheme::default(),
            packages: Arc::new(packages),
            archiver: Arc::new(CommandArchiver::new(tools, runner.clone())),
            fetcher: Arc::new(HttpFetcher::default()),
            runner,
            config: Arc::new(config),
        }
    }

    /// Replace the package collaborator.
    pub fn with_packages(mut self, packages: Arc<dyn PackageProvider>) -> Self {
        self.packages = packages;
        self
    }

    /// Replace the archive collaborator.
    pub fn with_archiver(mut self, archiver: Arc<dyn ArchiveProvider>) -> Self {
        self.archiver = archiver;
        self
    }

    /// Replace the URL fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn UrlFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    pub fn registry(&self) -> &VirtualDirs {
        &self.dirs
    }

    /// Map an abstract path to its concrete location without touching disk.
    pub fn map_path(&self, user: &User, path: &str) -> PathBuf {
        self.mapper.map_str(user, path)
    }

    /// Map a path for a storage operation, rejecting symlink escapes.
    pub(crate) fn resolve(&self, user: &User, path: &VfsPath) -> VfsResult<Mapped> {
        let mapped = self.mapper.resolve(user, path);
        ensure_inside(&mapped, path)?;
        Ok(mapped)
    }

    /// Create the user's private root if it is missing.
    pub async fn ensure_home(&self, user: &User) -> VfsResult<()> {
        let root = self.mapper.user_root(user);
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| VfsError::from_io(e, "/User"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_home_creates_root() {
        let home = tempfile::TempDir::new().unwrap();
        let vfs = Vfs::new(VfsConfig::with_roots(home.path(), "/nonexistent"));
        let user = User::new("amy", "en_EN");

        vfs.ensure_home(&user).await.unwrap();
        assert!(home.path().join("amy").is_dir());
        // Idempotent
        vfs.ensure_home(&user).await.unwrap();
    }

    #[test]
    fn test_map_path_export() {
        let vfs = Vfs::new(VfsConfig::with_roots("/srv/home", "/srv/public"));
        let user = User::new("amy", "en_EN");
        assert_eq!(
            vfs.map_path(&user, "/User/../../etc/passwd"),
            PathBuf::from("/srv/home/amy/etc/passwd")
        );
        assert_eq!(
            vfs.map_path(&user, "/Shared/x"),
            PathBuf::from("/srv/public/Shared/x")
        );
    }
}
