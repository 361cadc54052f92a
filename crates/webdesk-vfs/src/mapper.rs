//! Abstract path parsing and abstract → concrete path mapping.
//!
//! Confinement is structural: a [`VfsPath`] can only be built by
//! [`VfsPath::parse`], which resolves `.` and `..` lexically and clamps at
//! the scope root. Every stored segment is therefore a plain name, and
//! joining plain names onto a root can never leave that root. The mapper
//! only accepts `VfsPath`, so no caller string reaches storage unparsed.
//!
//! `/User/..` stays at `/User`: for user paths the clamp point is the user
//! root, not `/`.

use std::path::{Path, PathBuf};

use webdesk_types::User;

use crate::error::{VfsError, VfsResult};

/// First segment of the per-user subtree.
pub const USER_SEGMENT: &str = "User";

/// A normalized abstract VFS path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VfsPath {
    segments: Vec<String>,
}

impl VfsPath {
    /// The root `/`.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse and normalize a caller-supplied path.
    ///
    /// Empty segments and `.` are dropped. `..` pops one segment but never
    /// past the scope root (`/` or `/User`).
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split('/').filter(|s| !s.is_empty() && *s != ".");
        let mut segments = Vec::new();
        let floor = match parts.clone().next() {
            Some(USER_SEGMENT) => {
                parts.next();
                segments.push(USER_SEGMENT.to_string());
                1
            }
            _ => 0,
        };

        for part in parts {
            if part == ".." {
                if segments.len() > floor {
                    segments.pop();
                }
            } else {
                segments.push(part.to_string());
            }
        }
        Self { segments }
    }

    /// Whether this path lives in the caller's private subtree.
    pub fn is_user(&self) -> bool {
        self.segments.first().is_some_and(|s| s == USER_SEGMENT)
    }

    /// Whether this is `/`.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether this is `/` or `/User`, the roots `..` clamps at.
    pub fn is_scope_root(&self) -> bool {
        self.is_root() || (self.is_user() && self.segments.len() == 1)
    }

    /// Last segment, empty for `/`.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Parent path; `/` is its own parent.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Append a single child name.
    ///
    /// Names that are not plain segments (contain `/`, or are `.`/`..`)
    /// go through normal parsing relative to this path.
    pub fn join(&self, name: &str) -> Self {
        let mut raw = self.to_string();
        raw.push('/');
        raw.push_str(name);
        let joined = Self::parse(&raw);
        // A child of a user path must stay a user path
        if self.is_user() && !joined.is_user() {
            return self.clone();
        }
        joined
    }

    /// Whether `self` equals `prefix` or lies beneath it.
    pub fn starts_with(&self, prefix: &VfsPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl std::fmt::Display for VfsPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// A mapped path together with the root it is confined to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapped {
    /// Concrete OS path.
    pub concrete: PathBuf,
    /// Sandbox root the concrete path lies under.
    pub root: PathBuf,
}

/// Translates abstract paths into concrete storage paths.
#[derive(Debug, Clone)]
pub struct PathMapper {
    home_root: PathBuf,
    public_root: PathBuf,
}

impl PathMapper {
    pub fn new(home_root: impl Into<PathBuf>, public_root: impl Into<PathBuf>) -> Self {
        Self {
            home_root: home_root.into(),
            public_root: public_root.into(),
        }
    }

    /// The private root for a user.
    pub fn user_root(&self, user: &User) -> PathBuf {
        self.home_root.join(encode_username(&user.username))
    }

    /// The shared root for non-user paths.
    pub fn public_root(&self) -> &Path {
        &self.public_root
    }

    /// Map an abstract path, returning the concrete path and its root.
    pub fn resolve(&self, user: &User, path: &VfsPath) -> Mapped {
        let (root, rest) = if path.is_user() {
            (self.user_root(user), &path.segments[1..])
        } else {
            (self.public_root.clone(), &path.segments[..])
        };

        let mut concrete = root.clone();
        concrete.extend(rest);
        debug_assert!(concrete.starts_with(&root));
        Mapped { concrete, root }
    }

    /// Map an abstract path to its concrete location.
    pub fn map(&self, user: &User, path: &VfsPath) -> PathBuf {
        self.resolve(user, path).concrete
    }

    /// Map a raw caller string.
    pub fn map_str(&self, user: &User, raw: &str) -> PathBuf {
        self.map(user, &VfsPath::parse(raw))
    }
}

/// Check that a mapped path does not leave its root through a symlink.
///
/// Lexical confinement already holds; this canonicalizes the deepest
/// existing ancestor and compares it against the canonical root.
pub fn ensure_inside(mapped: &Mapped, abstract_path: &VfsPath) -> VfsResult<()> {
    let Ok(canonical_root) = dunce::canonicalize(&mapped.root) else {
        // Nothing exists yet, so nothing can point outside
        return Ok(());
    };

    let mut cursor = mapped.concrete.as_path();
    loop {
        match dunce::canonicalize(cursor) {
            Ok(resolved) if resolved.starts_with(&canonical_root) => return Ok(()),
            Ok(resolved) => {
                tracing::warn!(
                    path = %abstract_path,
                    resolved = %resolved.display(),
                    "blocked symlink escape"
                );
                return Err(VfsError::path_escapes_root(abstract_path.to_string()));
            }
            Err(_) => match cursor.parent() {
                Some(parent) if parent.starts_with(&mapped.root) => cursor = parent,
                _ => return Ok(()),
            },
        }
    }
}

/// Encode a username as exactly one plain path component.
///
/// Injective: bytes outside `[A-Za-z0-9._-]` become `%XX`, the names `.`
/// and `..` have their dots escaped, and the empty name becomes `%`.
pub fn encode_username(username: &str) -> String {
    if username.is_empty() {
        return "%".to_string();
    }
    if username == "." || username == ".." {
        return "%2E".repeat(username.len());
    }

    let mut out = String::with_capacity(username.len());
    for byte in username.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
