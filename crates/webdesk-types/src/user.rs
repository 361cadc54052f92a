//! The authenticated caller.

use serde::{Deserialize, Serialize};

/// A user as handed to the VFS by the session layer.
///
/// Immutable for the duration of a call. The username is the only input
/// used to derive the private storage root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    /// Stable login handle: "amy", "guest".
    pub username: String,
    /// Locale tag used for package names: "en_EN", "nb_NO".
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en_EN".to_string()
}

impl User {
    pub fn new(username: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            language: language.into(),
        }
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.username, self.language)
    }
}
