//! Package metadata as exposed by the package collaborator.

use serde::{Deserialize, Serialize};

/// An installed package, reduced to what a listing needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Package type: "Application", "Service", "PanelItem".
    #[serde(rename = "type")]
    pub kind: String,
    /// Icon, either absolute or relative to the package resource directory.
    #[serde(default)]
    pub icon: String,
}

impl PackageInfo {
    pub fn new(kind: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            icon: icon.into(),
        }
    }

    /// The synthetic MIME string used in listings: `OSjs/<type>`.
    pub fn mime_type(&self) -> String {
        format!("OSjs/{}", self.kind)
    }
}
