//! Per-user sandboxed virtual filesystem.
//!
//! Exposes a unified path namespace over each user's private storage and a
//! shared public tree, driven by named methods through the [`Gateway`].
//!
//! # Layout
//!
//! | Abstract path | Backed by |
//! |---------------|-----------|
//! | `/User/...` | `home_root/<user>/...`, writable, never protected |
//! | `/System/Packages` | the [`PackageProvider`] |
//! | everything else | `public_root/...` |
//!
//! Paths are parsed into [`VfsPath`] before anything touches storage. `..`
//! is resolved lexically and clamped at `/` or `/User`, so no request can
//! name a location outside its root.
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() {
//! use std::sync::Arc;
//! use webdesk_types::User;
//! use webdesk_vfs::{Gateway, Vfs, VfsConfig};
//!
//! let vfs = Vfs::new(VfsConfig::with_roots("/srv/home", "/srv/public"));
//! let gateway = Gateway::new(Arc::new(vfs));
//! let user = User::new("amy", "en_EN");
//!
//! let reply = gateway
//!     .dispatch(&user, "ls", serde_json::json!("/User"))
//!     .await
//!     .expect("ls is a known method");
//! assert!(reply.success);
//! # }
//! ```

pub mod adapters;
pub mod collab;
pub mod config;
pub mod error;
pub mod gateway;
pub mod icons;
pub mod listing;
pub mod mapper;
pub mod ops;
pub mod process;
pub mod registry;
pub mod service;

pub use adapters::PdfInfo;
pub use collab::{
    ArchiveFile, ArchiveListing, ArchiveProvider, CommandArchiver, HttpFetcher, PackageProvider,
    StaticPackages, UrlFetcher,
};
pub use config::{ToolsConfig, VfsConfig};
pub use error::{VfsError, VfsResult};
pub use gateway::{Gateway, Method, Request};
pub use listing::{Listing, SortKey};
pub use mapper::{PathMapper, VfsPath};
pub use registry::{AccessMode, DirKind, VirtualDir, VirtualDirs};
pub use service::Vfs;
