//! VFS configuration.
//!
//! Loaded once at startup from TOML and never mutated afterwards. Every
//! field has a default so an empty file is a valid configuration.
//!
//! ```toml
//! home_root = "~/webdesk/home"
//! public_root = "~/webdesk/public"
//! tool_timeout_secs = 60
//!
//! [tools]
//! archive_list = ["unzip", "-Z1", "{archive}"]
//!
//! [packages.Calculator]
//! type = "Application"
//! icon = "calculator.png"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use webdesk_types::PackageInfo;

/// Top-level VFS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Parent directory of every per-user private root.
    pub home_root: PathBuf,
    /// Root for every abstract path outside `/User`.
    pub public_root: PathBuf,
    /// URL prefix that serves files for audio/video embeds.
    pub media_url: String,
    /// Maximum characters returned by a text preview.
    pub preview_text_limit: usize,
    /// Geometry passed to the image resize tool.
    pub preview_image_size: String,
    /// External tool timeout in seconds; 0 waits forever.
    pub tool_timeout_secs: u64,
    /// Scratch directory for converter output; system temp dir if unset.
    pub temp_dir: Option<PathBuf>,
    /// Where the HTTP layer leaves uploaded files; scratch dir if unset.
    pub upload_dir: Option<PathBuf>,
    /// External tool argv templates.
    pub tools: ToolsConfig,
    /// Static package table for `/System/Packages`.
    pub packages: BTreeMap<String, PackageInfo>,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            home_root: PathBuf::from("/var/lib/webdesk/home"),
            public_root: PathBuf::from("/var/lib/webdesk/public"),
            media_url: "/media".to_string(),
            preview_text_limit: 255,
            preview_image_size: "240x240".to_string(),
            tool_timeout_secs: 120,
            temp_dir: None,
            upload_dir: None,
            tools: ToolsConfig::default(),
            packages: BTreeMap::new(),
        }
    }
}

impl VfsConfig {
    /// Config rooted at the given directories, everything else default.
    pub fn with_roots(home_root: impl Into<PathBuf>, public_root: impl Into<PathBuf>) -> Self {
        Self {
            home_root: home_root.into(),
            public_root: public_root.into(),
            ..Default::default()
        }
    }

    /// Parse a TOML document. Roots are tilde-expanded.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("invalid VFS config")?;
        Ok(config.expanded())
    }

    /// Load a TOML file from disk.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// External tool timeout, `None` when disabled.
    pub fn tool_timeout(&self) -> Option<Duration> {
        (self.tool_timeout_secs > 0).then(|| Duration::from_secs(self.tool_timeout_secs))
    }

    /// Directory for per-call scratch files.
    pub fn scratch_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Directory upload sources must come from.
    pub fn upload_root(&self) -> PathBuf {
        self.upload_dir.clone().unwrap_or_else(|| self.scratch_dir())
    }

    fn expanded(mut self) -> Self {
        self.home_root = expand(&self.home_root);
        self.public_root = expand(&self.public_root);
        self
    }
}

fn expand(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&s).as_ref())
}

/// Argv templates for external tools.
///
/// Placeholders: `{archive}`, `{dest}`, `{file}`, `{output}`, `{page}`,
/// `{size}`. A placeholder may sit anywhere inside an argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Print one archive member per line.
    pub archive_list: Vec<String>,
    /// Extract `{archive}` into `{dest}`.
    pub archive_extract: Vec<String>,
    /// Read an image on stdin, write a resized PNG on stdout.
    pub image_resize: Vec<String>,
    /// Print `Key: value` PDF metadata lines.
    pub pdf_info: Vec<String>,
    /// Render `{page}` of `{file}` as SVG into `{output}`.
    pub pdf_to_svg: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        fn argv(parts: &[&str]) -> Vec<String> {
            parts.iter().map(|s| s.to_string()).collect()
        }
        Self {
            archive_list: argv(&["unzip", "-Z1", "{archive}"]),
            archive_extract: argv(&["unzip", "-o", "{archive}", "-d", "{dest}"]),
            image_resize: argv(&["convert", "-", "-resize", "{size}", "png:-"]),
            pdf_info: argv(&["pdfinfo", "{file}"]),
            pdf_to_svg: argv(&["pdf2svg", "{file}", "{output}", "{page}"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = VfsConfig::from_toml_str("").unwrap();
        assert_eq!(config.preview_text_limit, 255);
        assert_eq!(config.tools.pdf_info, vec!["pdfinfo", "{file}"]);
        assert_eq!(config.tool_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_parse_roots_tools_and_packages() {
        let config = VfsConfig::from_toml_str(
            r#"
            home_root = "/srv/home"
            public_root = "/srv/public"
            tool_timeout_secs = 0

            [tools]
            archive_list = ["7z", "l", "-slt", "{archive}"]

            [packages.Calculator]
            type = "Application"
            icon = "calc.png"
            "#,
        )
        .unwrap();
        assert_eq!(config.home_root, PathBuf::from("/srv/home"));
        assert_eq!(config.tool_timeout(), None);
        assert_eq!(config.tools.archive_list[0], "7z");
        // Untouched tools keep their defaults
        assert_eq!(config.tools.pdf_to_svg[0], "pdf2svg");
        assert_eq!(config.packages["Calculator"].kind, "Application");
    }

    #[test]
    fn test_upload_root_falls_back_to_scratch() {
        let mut config = VfsConfig::from_toml_str("temp_dir = \"/var/tmp/webdesk\"").unwrap();
        assert_eq!(config.upload_root(), PathBuf::from("/var/tmp/webdesk"));
        config.upload_dir = Some(PathBuf::from("/srv/uploads"));
        assert_eq!(config.upload_root(), PathBuf::from("/srv/uploads"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(VfsConfig::from_toml_str("home_root = [").is_err());
    }
}
