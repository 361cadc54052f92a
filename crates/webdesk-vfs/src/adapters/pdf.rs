//! PDF metadata and page rendering.

use std::path::PathBuf;

use indexmap::IndexMap;
use uuid::Uuid;
use webdesk_types::User;

use crate::error::{VfsError, VfsResult};
use crate::mapper::VfsPath;
use crate::service::Vfs;

/// Metadata fields in the order the extractor printed them.
pub type PdfInfo = IndexMap<String, String>;

/// Scratch file removed when dropped.
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        // Drop cannot await; one unlink is fine to run inline
        if let Err(e) = std::fs::remove_file(&self.0)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.0.display(), "failed to remove scratch file: {}", e);
        }
    }
}

impl Vfs {
    /// Read `Key: value` metadata from a PDF.
    #[tracing::instrument(skip_all, fields(user = %user.username, path = %path))]
    pub async fn read_pdf_metadata(&self, user: &User, path: &VfsPath) -> VfsResult<PdfInfo> {
        let mapped = self.resolve(user, path)?;
        let file = mapped.concrete.to_string_lossy();
        let stdout = self
            .runner
            .run("pdf_info", &self.config.tools.pdf_info, &[("file", &*file)], None)
            .await?;
        Ok(parse_pdf_info(&String::from_utf8_lossy(&stdout)))
    }

    /// Render one page (1-based) of a PDF as SVG markup.
    #[tracing::instrument(skip_all, fields(user = %user.username, path = %path, page = page))]
    pub async fn read_pdf_page_svg(
        &self,
        user: &User,
        path: &VfsPath,
        page: u32,
    ) -> VfsResult<String> {
        if page == 0 {
            return Err(VfsError::malformed("pages start at 1"));
        }
        let mapped = self.resolve(user, path)?;
        if !tokio::fs::try_exists(&mapped.concrete).await.unwrap_or(false) {
            return Err(VfsError::not_found(path.to_string()));
        }

        let scratch_dir = self.config.scratch_dir();
        tokio::fs::create_dir_all(&scratch_dir).await?;
        let scratch = ScratchFile(scratch_dir.join(format!("webdesk-{}.svg", Uuid::new_v4())));

        let file = mapped.concrete.to_string_lossy();
        let output = scratch.0.to_string_lossy();
        let page = page.to_string();
        self.runner
            .run(
                "pdf_to_svg",
                &self.config.tools.pdf_to_svg,
                &[("file", &*file), ("output", &*output), ("page", &page)],
                None,
            )
            .await?;

        let svg = tokio::fs::read_to_string(&scratch.0).await?;
        Ok(svg)
    }
}

fn parse_pdf_info(text: &str) -> PdfInfo {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}
