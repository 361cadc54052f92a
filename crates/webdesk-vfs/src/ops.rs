//! Single-file and single-directory operations.
//!
//! Every operation maps its abstract path through the sandbox first and
//! reports errors against the abstract path.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use webdesk_types::{FileInfo, User};

use crate::error::{VfsError, VfsResult};
use crate::icons::guess_mime;
use crate::mapper::VfsPath;
use crate::service::Vfs;

fn io_err(path: &VfsPath) -> impl FnOnce(std::io::Error) -> VfsError + '_ {
    move |e| VfsError::from_io(e, &path.to_string())
}

async fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}

impl Vfs {
    /// Read a file as text. Invalid UTF-8 is replaced, not rejected.
    pub async fn cat(&self, user: &User, path: &VfsPath) -> VfsResult<String> {
        let mapped = self.resolve(user, path)?;
        let bytes = fs::read(&mapped.concrete).await.map_err(io_err(path))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Whether the path exists. Never fails.
    pub async fn exists(&self, user: &User, path: &VfsPath) -> bool {
        match self.resolve(user, path) {
            Ok(mapped) => path_exists(&mapped.concrete).await,
            Err(_) => false,
        }
    }

    /// Create a directory. The parent must exist.
    pub async fn mkdir(&self, user: &User, path: &VfsPath) -> VfsResult<bool> {
        let mapped = self.resolve(user, path)?;
        fs::create_dir(&mapped.concrete).await.map_err(io_err(path))?;
        Ok(true)
    }

    /// Create an empty file. Fails if anything already exists there.
    pub async fn touch(&self, user: &User, path: &VfsPath) -> VfsResult<bool> {
        let mapped = self.resolve(user, path)?;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&mapped.concrete)
            .await
            .map_err(io_err(path))?;
        Ok(true)
    }

    /// Remove a file.
    pub async fn rm(&self, user: &User, path: &VfsPath) -> VfsResult<bool> {
        let mapped = self.resolve(user, path)?;
        let meta = fs::symlink_metadata(&mapped.concrete)
            .await
            .map_err(io_err(path))?;
        if meta.is_dir() {
            return Err(VfsError::is_a_directory(path.to_string()));
        }
        fs::remove_file(&mapped.concrete).await.map_err(io_err(path))?;
        Ok(true)
    }

    /// Remove a directory and everything below it.
    ///
    /// Any failure during the walk aborts with an error.
    pub async fn rmdir(&self, user: &User, path: &VfsPath) -> VfsResult<bool> {
        if path.is_scope_root() {
            return Err(VfsError::malformed(format!("refusing to remove {path}")));
        }
        let mapped = self.resolve(user, path)?;
        let meta = fs::symlink_metadata(&mapped.concrete)
            .await
            .map_err(io_err(path))?;
        if !meta.is_dir() {
            return Err(VfsError::not_a_directory(path.to_string()));
        }
        fs::remove_dir_all(&mapped.concrete)
            .await
            .map_err(io_err(path))?;
        Ok(true)
    }

    /// Rename a file or directory. The destination must not exist.
    pub async fn mv(&self, user: &User, source: &VfsPath, dest: &VfsPath) -> VfsResult<bool> {
        if source.is_scope_root() {
            return Err(VfsError::malformed(format!("refusing to move {source}")));
        }
        if dest.is_scope_root() {
            return Err(VfsError::malformed(format!("refusing to replace {dest}")));
        }
        let from = self.resolve(user, source)?;
        let to = self.resolve(user, dest)?;
        if path_exists(&to.concrete).await {
            return Err(VfsError::already_exists(dest.to_string()));
        }
        if !path_exists(&from.concrete).await {
            return Err(VfsError::not_found(source.to_string()));
        }
        fs::rename(&from.concrete, &to.concrete)
            .await
            .map_err(io_err(dest))?;
        Ok(true)
    }

    /// Copy a file, or a directory recursively. The destination must not exist.
    pub async fn cp(&self, user: &User, source: &VfsPath, dest: &VfsPath) -> VfsResult<bool> {
        if dest.is_scope_root() {
            return Err(VfsError::malformed(format!("refusing to replace {dest}")));
        }
        let from = self.resolve(user, source)?;
        let to = self.resolve(user, dest)?;
        if path_exists(&to.concrete).await {
            return Err(VfsError::already_exists(dest.to_string()));
        }
        let meta = fs::metadata(&from.concrete).await.map_err(io_err(source))?;
        if meta.is_dir() {
            if to.concrete.starts_with(&from.concrete) {
                return Err(VfsError::malformed(format!(
                    "cannot copy {source} into itself"
                )));
            }
            copy_tree(from.concrete, to.concrete)
                .await
                .map_err(io_err(dest))?;
        } else {
            fs::copy(&from.concrete, &to.concrete)
                .await
                .map_err(io_err(dest))?;
        }
        Ok(true)
    }

    /// Append bytes to an existing file.
    pub async fn put(&self, user: &User, path: &VfsPath, data: &[u8]) -> VfsResult<bool> {
        let mapped = self.resolve(user, path)?;
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&mapped.concrete)
            .await
            .map_err(io_err(path))?;
        file.write_all(data).await.map_err(io_err(path))?;
        file.flush().await.map_err(io_err(path))?;
        Ok(true)
    }

    /// Metadata for a file. Directories are rejected.
    pub async fn fileinfo(&self, user: &User, path: &VfsPath) -> VfsResult<FileInfo> {
        let mapped = self.resolve(user, path)?;
        let meta = fs::metadata(&mapped.concrete).await.map_err(io_err(path))?;
        if meta.is_dir() {
            return Err(VfsError::is_a_directory(path.to_string()));
        }

        let filename = path.name().to_string();
        let mime_type = guess_mime(&filename);
        let mut extended = serde_json::Map::new();
        extended.insert(
            "modified".into(),
            meta.modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .into(),
        );
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            extended.insert(
                "permissions".into(),
                format!("{:o}", meta.permissions().mode() & 0o7777).into(),
            );
        }
        if mime_type == "application/pdf" {
            match self.read_pdf_metadata(user, path).await {
                Ok(info) => {
                    extended.insert("pdf".into(), serde_json::to_value(info).unwrap_or_default());
                }
                Err(e) => tracing::debug!(path = %path, "no pdf metadata: {}", e),
            }
        }

        Ok(FileInfo {
            filename,
            parent_path: path.parent().to_string(),
            size_bytes: meta.len(),
            mime_type,
            extended_info: serde_json::Value::Object(extended),
        })
    }

    /// Move an uploaded temporary file into a directory.
    ///
    /// `source` is a concrete path owned by the HTTP layer, not an
    /// abstract one, and must resolve to a file inside the upload
    /// directory. Only the final component of `filename` is used.
    pub async fn upload(
        &self,
        user: &User,
        source: &Path,
        dest_dir: &VfsPath,
        filename: Option<&str>,
    ) -> VfsResult<bool> {
        let name = filename
            .map(Path::new)
            .unwrap_or(source)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| *n != "..")
            .ok_or_else(|| VfsError::malformed("upload has no usable filename"))?
            .to_string();

        let source = self.upload_source(source)?;
        let dest = dest_dir.join(&name);
        let to = self.resolve(user, &dest)?;
        if path_exists(&to.concrete).await {
            return Err(VfsError::already_exists(dest.to_string()));
        }

        if let Err(e) = fs::rename(&source, &to.concrete).await {
            // Temp dirs often sit on another device
            tracing::debug!("rename failed, copying upload: {}", e);
            fs::copy(&source, &to.concrete).await.map_err(io_err(&dest))?;
            fs::remove_file(&source).await.map_err(io_err(&dest))?;
        }
        Ok(true)
    }

    /// Canonicalize an upload source and confine it to the upload directory.
    ///
    /// Sources under either storage root are rejected even when the upload
    /// directory contains them.
    fn upload_source(&self, source: &Path) -> VfsResult<PathBuf> {
        let escapes = || VfsError::path_escapes_root("upload source");
        let canonical = dunce::canonicalize(source)
            .map_err(|_| VfsError::malformed("upload source is missing"))?;
        let upload_root = dunce::canonicalize(self.config.upload_root()).map_err(|_| escapes())?;
        if canonical == upload_root || !canonical.starts_with(&upload_root) {
            tracing::warn!(source = %source.display(), "upload source outside upload dir");
            return Err(escapes());
        }
        for root in [&self.config.home_root, &self.config.public_root] {
            if let Ok(root) = dunce::canonicalize(root)
                && canonical.starts_with(&root)
            {
                tracing::warn!(source = %source.display(), "upload source inside storage");
                return Err(escapes());
            }
        }
        if !canonical.is_file() {
            return Err(VfsError::malformed("upload source is not a file"));
        }
        Ok(canonical)
    }
}

/// Recursive directory copy.
async fn copy_tree(from: PathBuf, to: PathBuf) -> std::io::Result<()> {
    let mut stack = vec![(from, to)];
    while let Some((src, dst)) = stack.pop() {
        fs::create_dir(&dst).await?;
        let mut reader = fs::read_dir(&src).await?;
        while let Some(entry) = reader.next_entry().await? {
            let target = dst.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                stack.push((entry.path(), target));
            } else {
                fs::copy(entry.path(), target).await?;
            }
        }
    }
    Ok(())
}
