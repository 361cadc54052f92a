//! Adapters over external tools and remote resources.
//!
//! Each adapter runs at most one external process per call through
//! [`ToolRunner`](crate::process::ToolRunner). A non-zero exit is a
//! failure whose message carries the tool's stderr.

mod archive;
mod pdf;
mod preview;

pub use pdf::PdfInfo;

use crate::error::VfsResult;
use crate::service::Vfs;

impl Vfs {
    /// Fetch a remote document as text.
    #[tracing::instrument(skip(self))]
    pub async fn read_url(&self, url: &str) -> VfsResult<String> {
        self.fetcher.fetch(url).await
    }
}

/// Escape text for inclusion in HTML markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }
}
