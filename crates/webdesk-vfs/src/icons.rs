//! Icon and MIME resolution for listings.

use std::collections::HashMap;
use std::path::Path;

/// Icon for files nothing else matched.
pub const DEFAULT_ICON: &str = "mimetypes/gnome-fs-regular.png";
/// Icon for directories outside the registry.
pub const FOLDER_ICON: &str = "places/folder.png";
/// Icon for the synthesized parent entry.
pub const PARENT_ICON: &str = "actions/up.png";
/// Icon for archive members.
pub const BINARY_ICON: &str = "mimetypes/binary.png";
/// MIME for anything we cannot identify.
pub const BINARY_MIME: &str = "application/octet-stream";

/// Lookup tables mapping names and MIME types to icons.
///
/// Resolution order: extension, exact MIME, MIME category, default.
#[derive(Debug, Clone)]
pub struct IconTheme {
    by_extension: HashMap<&'static str, &'static str>,
    by_mime: HashMap<&'static str, &'static str>,
    by_category: HashMap<&'static str, &'static str>,
}

impl Default for IconTheme {
    fn default() -> Self {
        let by_extension = HashMap::from([
            ("pdf", "mimetypes/gnome-mime-application-pdf.png"),
            ("zip", "mimetypes/folder_tar.png"),
            ("tar", "mimetypes/folder_tar.png"),
            ("gz", "mimetypes/folder_tar.png"),
            ("bz2", "mimetypes/folder_tar.png"),
            ("rar", "mimetypes/folder_tar.png"),
            ("7z", "mimetypes/folder_tar.png"),
            ("doc", "mimetypes/gnome-mime-application-msword.png"),
            ("docx", "mimetypes/gnome-mime-application-msword.png"),
            ("odt", "mimetypes/x-office-document.png"),
            ("xls", "mimetypes/x-office-spreadsheet.png"),
            ("ods", "mimetypes/x-office-spreadsheet.png"),
            ("ppt", "mimetypes/x-office-presentation.png"),
            ("odp", "mimetypes/x-office-presentation.png"),
            ("exe", "mimetypes/binary.png"),
            ("bin", "mimetypes/binary.png"),
            ("iso", "devices/media-optical.png"),
            ("ttf", "mimetypes/font-x-generic.png"),
            ("otf", "mimetypes/font-x-generic.png"),
            ("html", "mimetypes/text-html.png"),
            ("htm", "mimetypes/text-html.png"),
            ("js", "mimetypes/text-x-script.png"),
            ("sh", "mimetypes/text-x-script.png"),
            ("py", "mimetypes/text-x-script.png"),
            ("rs", "mimetypes/text-x-script.png"),
        ]);

        let by_mime = HashMap::from([
            ("application/pdf", "mimetypes/gnome-mime-application-pdf.png"),
            ("application/zip", "mimetypes/folder_tar.png"),
            ("application/x-tar", "mimetypes/folder_tar.png"),
            ("application/x-gzip", "mimetypes/folder_tar.png"),
            ("application/gzip", "mimetypes/folder_tar.png"),
            ("application/x-rar-compressed", "mimetypes/folder_tar.png"),
            ("application/msword", "mimetypes/gnome-mime-application-msword.png"),
            ("application/xml", "mimetypes/text-html.png"),
            ("application/javascript", "mimetypes/text-x-script.png"),
            ("text/html", "mimetypes/text-html.png"),
            ("text/css", "mimetypes/text-x-generic-template.png"),
        ]);

        let by_category = HashMap::from([
            ("image", "mimetypes/image-x-generic.png"),
            ("video", "mimetypes/video-x-generic.png"),
            ("audio", "mimetypes/audio-x-generic.png"),
            ("text", "mimetypes/text-x-generic.png"),
            ("application", "mimetypes/binary.png"),
        ]);

        Self {
            by_extension,
            by_mime,
            by_category,
        }
    }
}

impl IconTheme {
    /// Resolve an icon for a file. Total: always returns something.
    pub fn icon_for(&self, filename: &str, mime: Option<&str>) -> &'static str {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if let Some(icon) = extension
            .as_deref()
            .and_then(|e| self.by_extension.get(e).copied())
        {
            return icon;
        }

        let Some(mime) = mime else {
            return DEFAULT_ICON;
        };
        if let Some(icon) = self.by_mime.get(mime).copied() {
            return icon;
        }
        self.by_category
            .get(mime_category(mime))
            .copied()
            .unwrap_or(DEFAULT_ICON)
    }
}

/// The top-level part of a MIME string: `image` for `image/png`.
pub fn mime_category(mime: &str) -> &str {
    mime.split('/').next().unwrap_or(mime)
}

/// Guess a MIME type from a file name.
pub fn guess_mime(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(BINARY_MIME)
        .to_string()
}

/// Whether `mime` passes a listing filter.
///
/// Empty filters pass everything. `image/*` matches by category.
pub fn mime_matches(filter: &[String], mime: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    filter.iter().any(|f| match f.strip_suffix("/*") {
        Some(category) => mime_category(mime) == category,
        None => f == mime,
    })
}
