//! Method dispatch.
//!
//! A method name resolves to a [`Method`] (several names may alias one
//! method). Its JSON arguments are then parsed into a typed [`Request`],
//! which is executed against the [`Vfs`] and turned into a [`Reply`].
//!
//! An unknown method name is reported synchronously and distinctly from an
//! operation failure: [`Gateway::call`] returns `false` and never invokes
//! its callback.

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};
use webdesk_types::{Reply, User};

use crate::error::{VfsError, VfsResult};
use crate::listing::{Listing, SortKey};
use crate::mapper::VfsPath;
use crate::service::Vfs;

/// A recognized method. Parsing accepts every alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Method {
    #[strum(to_string = "ls", serialize = "readdir")]
    List,
    #[strum(to_string = "cat", serialize = "read")]
    Read,
    #[strum(to_string = "exists")]
    Exists,
    #[strum(to_string = "mkdir")]
    Mkdir,
    #[strum(to_string = "touch")]
    Touch,
    #[strum(to_string = "rm", serialize = "delete")]
    Remove,
    #[strum(to_string = "rmdir")]
    RemoveDir,
    #[strum(to_string = "mv", serialize = "rename")]
    Move,
    #[strum(to_string = "cp", serialize = "copy")]
    Copy,
    #[strum(to_string = "put", serialize = "write")]
    Write,
    #[strum(to_string = "fileinfo", serialize = "file_info")]
    FileInfo,
    #[strum(to_string = "readurl")]
    ReadUrl,
    #[strum(to_string = "lswrap")]
    ListWrapped,
    #[strum(to_string = "upload")]
    Upload,
    #[strum(to_string = "preview")]
    Preview,
    #[strum(to_string = "readpdf")]
    ReadPdf,
    #[strum(to_string = "ls_archive")]
    ListArchive,
    #[strum(to_string = "extract_archive")]
    ExtractArchive,
}

/// A fully parsed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    List {
        path: VfsPath,
        mime: Vec<String>,
    },
    ListWrapped {
        path: VfsPath,
        mime: Vec<String>,
        view: String,
        sort: SortKey,
    },
    Read(VfsPath),
    Exists(VfsPath),
    Mkdir(VfsPath),
    Touch(VfsPath),
    Remove(VfsPath),
    RemoveDir(VfsPath),
    Move {
        source: VfsPath,
        destination: VfsPath,
    },
    Copy {
        source: VfsPath,
        destination: VfsPath,
    },
    Write {
        path: VfsPath,
        data: Vec<u8>,
    },
    FileInfo(VfsPath),
    ReadUrl(String),
    Upload {
        source: PathBuf,
        destination: VfsPath,
        filename: Option<String>,
    },
    Preview {
        path: VfsPath,
        mime: Option<String>,
        embed: bool,
    },
    ReadPdf {
        path: VfsPath,
        page: Option<u32>,
    },
    ListArchive(VfsPath),
    ExtractArchive {
        source: VfsPath,
        destination: VfsPath,
    },
}

// Argument shapes accepted on the wire.

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) if s.is_empty() => Vec::new(),
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PathArgs {
    Bare(String),
    Object { path: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListArgs {
    Bare(String),
    Object {
        path: String,
        #[serde(default)]
        mime: Option<OneOrMany>,
        #[serde(default)]
        view: Option<String>,
        #[serde(default)]
        sort: Option<SortKey>,
    },
}

#[derive(Deserialize)]
struct PairArgs {
    source: String,
    destination: String,
}

#[derive(Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Deserialize)]
struct UploadArgs {
    #[serde(alias = "tmp_path")]
    source: PathBuf,
    destination: String,
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PreviewArgs {
    Bare(String),
    Object {
        path: String,
        #[serde(default)]
        mime: Option<String>,
        #[serde(default)]
        embed: bool,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PdfArgs {
    Bare(String),
    Object {
        path: String,
        #[serde(default)]
        page: Option<u32>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UrlArgs {
    Bare(String),
    Object { url: String },
}

fn args<T: DeserializeOwned>(method: Method, value: Value) -> VfsResult<T> {
    serde_json::from_value(value)
        .map_err(|_| VfsError::malformed(format!("invalid arguments for {method}")))
}

fn path_arg(method: Method, value: Value) -> VfsResult<VfsPath> {
    let raw = match args::<PathArgs>(method, value)? {
        PathArgs::Bare(path) | PathArgs::Object { path } => path,
    };
    Ok(VfsPath::parse(&raw))
}

fn pair_arg(method: Method, value: Value) -> VfsResult<(VfsPath, VfsPath)> {
    let PairArgs {
        source,
        destination,
    } = args::<PairArgs>(method, value)?;
    Ok((VfsPath::parse(&source), VfsPath::parse(&destination)))
}

/// Decode `put` content. Base64 content may be a bare payload or a
/// `data:` URI.
fn decode_content(content: String, encoding: Option<&str>) -> VfsResult<Vec<u8>> {
    match encoding {
        None | Some("" | "utf8" | "utf-8" | "text") => Ok(content.into_bytes()),
        Some("base64") => {
            let payload = match content.strip_prefix("data:") {
                Some(uri) => uri
                    .split_once(";base64,")
                    .map(|(_, data)| data)
                    .ok_or_else(|| VfsError::malformed("data URI is not base64"))?,
                None => content.as_str(),
            };
            STANDARD
                .decode(payload.trim())
                .map_err(|e| VfsError::malformed(format!("invalid base64 content: {e}")))
        }
        Some(other) => Err(VfsError::malformed(format!("unsupported encoding: {other}"))),
    }
}

impl Request {
    /// Parse the arguments for `method`.
    pub fn parse(method: Method, value: Value) -> VfsResult<Self> {
        Ok(match method {
            Method::List => {
                let (path, mime, _, _) = list_args(method, value)?;
                Request::List { path, mime }
            }
            Method::ListWrapped => {
                let (path, mime, view, sort) = list_args(method, value)?;
                Request::ListWrapped {
                    path,
                    mime,
                    view,
                    sort,
                }
            }
            Method::Read => Request::Read(path_arg(method, value)?),
            Method::Exists => Request::Exists(path_arg(method, value)?),
            Method::Mkdir => Request::Mkdir(path_arg(method, value)?),
            Method::Touch => Request::Touch(path_arg(method, value)?),
            Method::Remove => Request::Remove(path_arg(method, value)?),
            Method::RemoveDir => Request::RemoveDir(path_arg(method, value)?),
            Method::FileInfo => Request::FileInfo(path_arg(method, value)?),
            Method::ListArchive => Request::ListArchive(path_arg(method, value)?),
            Method::Move => {
                let (source, destination) = pair_arg(method, value)?;
                Request::Move {
                    source,
                    destination,
                }
            }
            Method::Copy => {
                let (source, destination) = pair_arg(method, value)?;
                Request::Copy {
                    source,
                    destination,
                }
            }
            Method::ExtractArchive => {
                let (source, destination) = pair_arg(method, value)?;
                Request::ExtractArchive {
                    source,
                    destination,
                }
            }
            Method::Write => {
                let WriteArgs {
                    path,
                    content,
                    encoding,
                } = args::<WriteArgs>(method, value)?;
                Request::Write {
                    path: VfsPath::parse(&path),
                    data: decode_content(content, encoding.as_deref())?,
                }
            }
            Method::ReadUrl => match args::<UrlArgs>(method, value)? {
                UrlArgs::Bare(url) | UrlArgs::Object { url } => Request::ReadUrl(url),
            },
            Method::Upload => {
                let UploadArgs {
                    source,
                    destination,
                    filename,
                } = args::<UploadArgs>(method, value)?;
                if source.as_os_str().is_empty() {
                    return Err(VfsError::malformed("upload has no source"));
                }
                Request::Upload {
                    source,
                    destination: VfsPath::parse(&destination),
                    filename,
                }
            }
            Method::Preview => match args::<PreviewArgs>(method, value)? {
                PreviewArgs::Bare(path) => Request::Preview {
                    path: VfsPath::parse(&path),
                    mime: None,
                    embed: false,
                },
                PreviewArgs::Object { path, mime, embed } => Request::Preview {
                    path: VfsPath::parse(&path),
                    mime: mime.filter(|m| !m.is_empty()),
                    embed,
                },
            },
            Method::ReadPdf => match args::<PdfArgs>(method, value)? {
                PdfArgs::Bare(path) => Request::ReadPdf {
                    path: VfsPath::parse(&path),
                    page: None,
                },
                PdfArgs::Object { path, page } => Request::ReadPdf {
                    path: VfsPath::parse(&path),
                    page,
                },
            },
        })
    }
}

fn list_args(method: Method, value: Value) -> VfsResult<(VfsPath, Vec<String>, String, SortKey)> {
    Ok(match args::<ListArgs>(method, value)? {
        ListArgs::Bare(path) => (VfsPath::parse(&path), Vec::new(), String::new(), SortKey::default()),
        ListArgs::Object {
            path,
            mime,
            view,
            sort,
        } => (
            VfsPath::parse(&path),
            mime.map(OneOrMany::into_vec).unwrap_or_default(),
            view.unwrap_or_default(),
            sort.unwrap_or_default(),
        ),
    })
}

/// Payload of `lswrap`.
#[derive(Debug, Serialize)]
struct WrappedListing {
    path: String,
    view: String,
    sort: String,
    list: Listing,
}

/// Dispatches named methods to the VFS.
#[derive(Debug, Clone)]
pub struct Gateway {
    vfs: Arc<Vfs>,
}

impl Gateway {
    pub fn new(vfs: Arc<Vfs>) -> Self {
        Self { vfs }
    }

    pub fn vfs(&self) -> &Vfs {
        &self.vfs
    }

    /// Start `method` and deliver its reply to `reply`.
    ///
    /// Returns `false` without calling `reply` when the method is unknown.
    /// Otherwise the operation runs as a spawned task on the current tokio
    /// runtime, and `reply` is called exactly once.
    pub fn call<F>(&self, user: User, method: &str, args: Value, reply: F) -> bool
    where
        F: FnOnce(Reply) + Send + 'static,
    {
        let Ok(method) = method.parse::<Method>() else {
            tracing::debug!(user = %user.username, method, "unknown method");
            return false;
        };

        let gateway = self.clone();
        tokio::spawn(async move {
            reply(gateway.run(&user, method, args).await);
        });
        true
    }

    /// Run `method` to completion. `None` means the method is unknown.
    pub async fn dispatch(&self, user: &User, method: &str, args: Value) -> Option<Reply> {
        let method = method.parse::<Method>().ok()?;
        Some(self.run(user, method, args).await)
    }

    #[tracing::instrument(skip_all, fields(user = %user.username, method = %method))]
    async fn run(&self, user: &User, method: Method, args: Value) -> Reply {
        let reply = match Request::parse(method, args) {
            Ok(request) => match self.vfs.ensure_home(user).await {
                Ok(()) => self.execute(user, request).await,
                Err(e) => Reply::failure(e.to_string()),
            },
            Err(e) => Reply::failure(e.to_string()),
        };
        if let Some(error) = reply.error() {
            tracing::warn!(error, "request failed");
        }
        reply
    }

    /// Execute a parsed request.
    pub async fn execute(&self, user: &User, request: Request) -> Reply {
        let vfs = &self.vfs;
        match request {
            Request::List { path, mime } => vfs.list(user, &path, &mime).await.into(),
            Request::ListWrapped {
                path,
                mime,
                view,
                sort,
            } => vfs
                .list_sorted(user, &path, &mime, sort)
                .await
                .map(|list| WrappedListing {
                    path: path.to_string(),
                    view,
                    sort: sort.to_string(),
                    list,
                })
                .into(),
            Request::Read(path) => vfs.cat(user, &path).await.into(),
            Request::Exists(path) => Reply::success(vfs.exists(user, &path).await),
            Request::Mkdir(path) => vfs.mkdir(user, &path).await.into(),
            Request::Touch(path) => vfs.touch(user, &path).await.into(),
            Request::Remove(path) => vfs.rm(user, &path).await.into(),
            Request::RemoveDir(path) => vfs.rmdir(user, &path).await.into(),
            Request::Move {
                source,
                destination,
            } => vfs.mv(user, &source, &destination).await.into(),
            Request::Copy {
                source,
                destination,
            } => vfs.cp(user, &source, &destination).await.into(),
            Request::Write { path, data } => vfs.put(user, &path, &data).await.into(),
            Request::FileInfo(path) => vfs.fileinfo(user, &path).await.into(),
            Request::ReadUrl(url) => vfs.read_url(&url).await.into(),
            Request::Upload {
                source,
                destination,
                filename,
            } => vfs
                .upload(user, &source, &destination, filename.as_deref())
                .await
                .into(),
            Request::Preview { path, mime, embed } => {
                vfs.preview(user, &path, mime.as_deref(), embed).await.into()
            }
            Request::ReadPdf {
                path,
                page: Some(page),
            } => vfs.read_pdf_page_svg(user, &path, page).await.into(),
            Request::ReadPdf { path, page: None } => {
                vfs.read_pdf_metadata(user, &path).await.into()
            }
            Request::ListArchive(path) => vfs.list_archive(user, &path).await.into(),
            Request::ExtractArchive {
                source,
                destination,
            } => vfs.extract_archive(user, &source, &destination).await.into(),
        }
    }
}
