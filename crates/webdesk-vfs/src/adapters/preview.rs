//! Inline previews keyed on the MIME category.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::AsyncReadExt;
use webdesk_types::User;

use super::escape_html;
use crate::error::{VfsError, VfsResult};
use crate::icons::{guess_mime, mime_category};
use crate::mapper::VfsPath;
use crate::service::Vfs;

impl Vfs {
    /// Build preview markup for a file.
    ///
    /// Returns `None` for categories without a preview, and for
    /// audio/video unless `embed` is set.
    #[tracing::instrument(skip_all, fields(user = %user.username, path = %path))]
    pub async fn preview(
        &self,
        user: &User,
        path: &VfsPath,
        mime: Option<&str>,
        embed: bool,
    ) -> VfsResult<Option<String>> {
        let mime = mime.map_or_else(|| guess_mime(path.name()), str::to_string);
        let mapped = self.resolve(user, path)?;
        let io_err = |e| VfsError::from_io(e, &path.to_string());

        match mime_category(&mime) {
            tag @ ("audio" | "video") => {
                if !embed {
                    return Ok(None);
                }
                let src = escape_html(&format!("{}{}", self.config.media_url, path));
                Ok(Some(format!(
                    r#"<{tag} src="{src}" type="{}" controls></{tag}>"#,
                    escape_html(&mime)
                )))
            }
            "text" => {
                let limit = self.config.preview_text_limit;
                let file = tokio::fs::File::open(&mapped.concrete).await.map_err(io_err)?;
                // A char is at most four bytes
                let mut bytes = Vec::new();
                file.take((limit as u64).saturating_mul(4))
                    .read_to_end(&mut bytes)
                    .await
                    .map_err(io_err)?;
                let text: String = String::from_utf8_lossy(&bytes).chars().take(limit).collect();
                Ok(Some(format!("<pre>{}</pre>", escape_html(&text))))
            }
            "image" => {
                let bytes = tokio::fs::read(&mapped.concrete).await.map_err(io_err)?;
                let png = self
                    .runner
                    .run(
                        "image_resize",
                        &self.config.tools.image_resize,
                        &[("size", self.config.preview_image_size.as_str())],
                        Some(bytes),
                    )
                    .await?;
                Ok(Some(format!(
                    r#"<img src="data:image/png;base64,{}" alt="{}" />"#,
                    STANDARD.encode(png),
                    escape_html(path.name())
                )))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{sh, vfs_with_tools};
    use super::*;
    use crate::config::{ToolsConfig, VfsConfig};

    #[tokio::test]
    async fn test_text_preview_is_escaped_and_truncated() {
        let (vfs, user, _dir) = vfs_with_tools(ToolsConfig::default()).await;
        let path = VfsPath::parse("/User/notes.txt");
        vfs.touch(&user, &path).await.unwrap();
        let body = format!("<b>{}</b>", "x".repeat(400));
        vfs.put(&user, &path, body.as_bytes()).await.unwrap();

        let html = vfs.preview(&user, &path, None, false).await.unwrap().unwrap();
        assert!(html.starts_with("<pre>&lt;b&gt;xxx"));
        assert!(html.ends_with("</pre>"));
        let inner = &html["<pre>&lt;b&gt;".len()..html.len() - "</pre>".len()];
        assert_eq!(inner.len(), 255 - 3);
    }

    #[tokio::test]
    async fn test_unbounded_text_limit_reads_whole_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config =
            VfsConfig::with_roots(dir.path().join("home"), dir.path().join("public"));
        config.preview_text_limit = usize::MAX;
        let vfs = Vfs::new(config);
        let user = webdesk_types::User::new("amy", "en_EN");
        vfs.ensure_home(&user).await.unwrap();
        let path = VfsPath::parse("/User/notes.txt");
        vfs.touch(&user, &path).await.unwrap();
        vfs.put(&user, &path, "y".repeat(1000).as_bytes()).await.unwrap();

        let html = vfs.preview(&user, &path, None, false).await.unwrap().unwrap();
        assert_eq!(html, format!("<pre>{}</pre>", "y".repeat(1000)));
    }

    #[tokio::test]
    async fn test_media_embed_only_when_requested() {
        let (vfs, user, _dir) = vfs_with_tools(ToolsConfig::default()).await;
        let path = VfsPath::parse("/User/song.mp3");
        vfs.touch(&user, &path).await.unwrap();

        assert_eq!(vfs.preview(&user, &path, None, false).await.unwrap(), None);
        let html = vfs.preview(&user, &path, None, true).await.unwrap().unwrap();
        assert!(html.starts_with(r#"<audio src="/media/User/song.mp3""#));
        assert!(html.contains("controls"));

        let html = vfs
            .preview(&user, &path, Some("video/mp4"), true)
            .await
            .unwrap()
            .unwrap();
        assert!(html.starts_with("<video "));
    }

    #[tokio::test]
    async fn test_image_preview_pipes_through_resizer() {
        let (vfs, user, _dir) = vfs_with_tools(ToolsConfig {
            image_resize: sh("cat", &["{size}"]),
            ..Default::default()
        })
        .await;
        let path = VfsPath::parse("/User/a.png");
        vfs.touch(&user, &path).await.unwrap();
        vfs.put(&user, &path, b"PNGDATA").await.unwrap();

        let html = vfs.preview(&user, &path, None, false).await.unwrap().unwrap();
        assert_eq!(
            html,
            format!(r#"<img src="data:image/png;base64,{}" alt="a.png" />"#, STANDARD.encode("PNGDATA"))
        );
    }

    #[tokio::test]
    async fn test_image_resizer_failure() {
        let (vfs, user, _dir) = vfs_with_tools(ToolsConfig {
            image_resize: sh("cat >/dev/null; echo 'no decoder' >&2; exit 1", &[]),
            ..Default::default()
        })
        .await;
        let path = VfsPath::parse("/User/a.png");
        vfs.touch(&user, &path).await.unwrap();

        let err = vfs.preview(&user, &path, None, false).await.unwrap_err();
        assert!(err.to_string().contains("no decoder"));
    }

    #[tokio::test]
    async fn test_other_categories_have_no_preview() {
        let (vfs, user, _dir) = vfs_with_tools(ToolsConfig::default()).await;
        let path = VfsPath::parse("/User/blob.bin");
        vfs.touch(&user, &path).await.unwrap();
        assert_eq!(vfs.preview(&user, &path, None, true).await.unwrap(), None);
    }
}
