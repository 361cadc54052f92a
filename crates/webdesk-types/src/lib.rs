//! Shared wire types for the webdesk VFS gateway.
//!
//! This crate has **no internal webdesk dependencies**. It is the vocabulary
//! the gateway shares with its collaborators (session layer, package
//! registry, HTTP routing), so it stays small and serde-friendly.
//!
//! |------------------|-----------------------------------------------|
//! | Type             | Purpose                                       |
//! |------------------|-----------------------------------------------|
//! | [`User`]         | Authenticated caller (username + language)    |
//! | [`ListingEntry`] | One row of a directory listing                |
//! | [`EntryType`]    | `file` or `dir`                               |
//! | [`PackageInfo`]  | Installed package as seen by `/System/Packages` |
//! | [`FileInfo`]     | Payload of `fileinfo`                         |
//! | [`Reply`]        | The `(success, payload)` result convention    |
//! |------------------|-----------------------------------------------|

pub mod listing;
pub mod package;
pub mod reply;
pub mod user;

pub use listing::{EntryType, FileInfo, ListingEntry};
pub use package::PackageInfo;
pub use reply::Reply;
pub use user::User;
