//! Archive listing and extraction through the archive collaborator.

use webdesk_types::{ListingEntry, User};

use crate::error::{VfsError, VfsResult};
use crate::icons::{BINARY_ICON, BINARY_MIME, FOLDER_ICON};
use crate::listing::Listing;
use crate::mapper::VfsPath;
use crate::service::Vfs;

impl Vfs {
    /// List the members of an archive.
    ///
    /// The archiver reports no per-member MIME, so every file gets the
    /// generic binary icon and type.
    #[tracing::instrument(skip_all, fields(user = %user.username, path = %path))]
    pub async fn list_archive(&self, user: &User, path: &VfsPath) -> VfsResult<Listing> {
        let mapped = self.resolve(user, path)?;
        if !tokio::fs::try_exists(&mapped.concrete).await.unwrap_or(false) {
            return Err(VfsError::not_found(path.to_string()));
        }

        let archive = path.to_string();
        let listing = self.archiver.list(&mapped.concrete).await?;
        Ok(listing
            .files
            .into_iter()
            .map(|member| {
                let entry = if member.is_dir {
                    ListingEntry::dir(&member.name, &member.name, &archive, FOLDER_ICON)
                } else {
                    ListingEntry::file(&member.name, &member.name, &archive, BINARY_MIME, BINARY_ICON)
                };
                (member.name, entry)
            })
            .collect())
    }

    /// Extract an archive into a directory, creating it if needed.
    #[tracing::instrument(skip_all, fields(user = %user.username, src = %src, dest = %dest))]
    pub async fn extract_archive(
        &self,
        user: &User,
        src: &VfsPath,
        dest: &VfsPath,
    ) -> VfsResult<bool> {
        let from = self.resolve(user, src)?;
        let to = self.resolve(user, dest)?;
        if !tokio::fs::try_exists(&from.concrete).await.unwrap_or(false) {
            return Err(VfsError::not_found(src.to_string()));
        }
        tokio::fs::create_dir_all(&to.concrete)
            .await
            .map_err(|e| VfsError::from_io(e, &dest.to_string()))?;
        self.archiver.extract(&from.concrete, &to.concrete).await
    }
}
