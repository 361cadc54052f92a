//! Collaborator seams.
//!
//! The VFS consumes package metadata and archive handling from outside.
//! These traits are the whole contract; the bundled implementations are a
//! static package table and an archiver driven by configured commands.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use webdesk_types::PackageInfo;

use crate::config::ToolsConfig;
use crate::error::{VfsError, VfsResult};
use crate::process::ToolRunner;

/// Source of installed packages for `/System/Packages`.
#[async_trait]
pub trait PackageProvider: Send + Sync {
    /// Installed system packages, keyed by package name.
    async fn installed_system_packages(
        &self,
        language: &str,
    ) -> anyhow::Result<IndexMap<String, PackageInfo>>;
}

/// Packages from a fixed table (usually the `[packages]` config section).
#[derive(Debug, Clone, Default)]
pub struct StaticPackages {
    packages: BTreeMap<String, PackageInfo>,
}

impl StaticPackages {
    pub fn new(packages: BTreeMap<String, PackageInfo>) -> Self {
        Self { packages }
    }
}

#[async_trait]
impl PackageProvider for StaticPackages {
    async fn installed_system_packages(
        &self,
        _language: &str,
    ) -> anyhow::Result<IndexMap<String, PackageInfo>> {
        Ok(self
            .packages
            .iter()
            .map(|(name, info)| (name.clone(), info.clone()))
            .collect())
    }
}

/// A member reported by an archive listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveFile {
    /// Member name as printed by the archiver.
    pub name: String,
    /// Whether the member is a directory.
    pub is_dir: bool,
}

/// Result of listing an archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveListing {
    pub files: Vec<ArchiveFile>,
}

/// Archive listing and extraction.
#[async_trait]
pub trait ArchiveProvider: Send + Sync {
    /// List members of the archive at a concrete path.
    async fn list(&self, path: &Path) -> VfsResult<ArchiveListing>;

    /// Extract the archive into a concrete directory.
    async fn extract(&self, src: &Path, dest: &Path) -> VfsResult<bool>;
}

/// Archiver that shells out to the configured commands.
///
/// The list command must print one member per line; a trailing `/` marks
/// a directory. Nothing else about the output is interpreted.
#[derive(Debug, Clone)]
pub struct CommandArchiver {
    tools: Arc<ToolsConfig>,
    runner: ToolRunner,
}

impl CommandArchiver {
    pub fn new(tools: Arc<ToolsConfig>, runner: ToolRunner) -> Self {
        Self { tools, runner }
    }
}

#[async_trait]
impl ArchiveProvider for CommandArchiver {
    async fn list(&self, path: &Path) -> VfsResult<ArchiveListing> {
        let archive = path.to_string_lossy();
        let stdout = self
            .runner
            .run("archive_list", &self.tools.archive_list, &[("archive", &*archive)], None)
            .await?;

        let files = String::from_utf8_lossy(&stdout)
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(|line| match line.strip_suffix('/') {
                Some(dir) => ArchiveFile {
                    name: dir.to_string(),
                    is_dir: true,
                },
                None => ArchiveFile {
                    name: line.to_string(),
                    is_dir: false,
                },
            })
            .collect();
        Ok(ArchiveListing { files })
    }

    async fn extract(&self, src: &Path, dest: &Path) -> VfsResult<bool> {
        let archive = src.to_string_lossy();
        let dest = dest.to_string_lossy();
        self.runner
            .run(
                "archive_extract",
                &self.tools.archive_extract,
                &[("archive", &*archive), ("dest", &*dest)],
                None,
            )
            .await?;
        Ok(true)
    }
}

/// Fetches remote documents for `readurl`.
#[async_trait]
pub trait UrlFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> VfsResult<String>;
}

/// `reqwest`-backed fetcher. Only http and https URLs are accepted.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[async_trait]
impl UrlFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> VfsResult<String> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(VfsError::malformed(format!("unsupported url: {url}")));
        }
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
