//! End-to-end scenarios through the gateway.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::oneshot;
use webdesk_types::{PackageInfo, Reply, User};
use webdesk_vfs::{Gateway, StaticPackages, UrlFetcher, Vfs, VfsConfig, VfsError, VfsResult};

struct Harness {
    gateway: Gateway,
    user: User,
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self::with(|vfs| vfs)
    }

    fn with(customize: impl FnOnce(Vfs) -> Vfs) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("public/System")).unwrap();
        std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
        let mut config =
            VfsConfig::with_roots(dir.path().join("home"), dir.path().join("public"));
        config.temp_dir = Some(dir.path().to_path_buf());
        config.upload_dir = Some(dir.path().join("uploads"));
        let vfs = customize(Vfs::new(config));
        Self {
            gateway: Gateway::new(Arc::new(vfs)),
            user: User::new("amy", "en_EN"),
            dir,
        }
    }

    async fn ok(&self, method: &str, args: Value) -> Value {
        let reply = self.reply(method, args).await;
        assert!(reply.success, "{method} failed: {:?}", reply.payload);
        reply.payload
    }

    async fn fail(&self, method: &str, args: Value) -> String {
        let reply = self.reply(method, args).await;
        assert!(!reply.success, "{method} unexpectedly succeeded: {:?}", reply.payload);
        reply.error().unwrap().to_string()
    }

    async fn reply(&self, method: &str, args: Value) -> Reply {
        self.gateway
            .dispatch(&self.user, method, args)
            .await
            .unwrap_or_else(|| panic!("{method} is not a known method"))
    }
}

fn names(listing: &Value) -> Vec<&str> {
    listing.as_object().unwrap().keys().map(String::as_str).collect()
}

#[tokio::test]
async fn docs_scenario() {
    let h = Harness::new();
    assert_eq!(h.ok("mkdir", json!("/User/Docs")).await, true);
    assert_eq!(h.ok("touch", json!("/User/Docs/readme.txt")).await, true);

    let listing = h.ok("ls", json!("/User/Docs")).await;
    assert_eq!(names(&listing), vec!["..", "readme.txt"]);
    assert_eq!(listing[".."]["entryType"], "dir");
    assert_eq!(listing["readme.txt"]["entryType"], "file");
    assert_eq!(listing["readme.txt"]["isProtected"], false);

    assert_eq!(h.ok("rm", json!("/User/Docs/readme.txt")).await, true);
    assert_eq!(h.ok("rmdir", json!("/User/Docs")).await, true);
    assert_eq!(h.ok("exists", json!("/User/Docs")).await, false);
}

#[tokio::test]
async fn touch_exists_rm_roundtrip() {
    let h = Harness::new();
    h.ok("touch", json!("/User/p.txt")).await;
    assert_eq!(h.ok("exists", json!("/User/p.txt")).await, true);
    h.ok("delete", json!({"path": "/User/p.txt"})).await;
    assert_eq!(h.ok("exists", json!("/User/p.txt")).await, false);
}

#[tokio::test]
async fn conflicts_and_missing() {
    let h = Harness::new();
    h.ok("touch", json!("/User/a")).await;
    assert!(h.fail("touch", json!("/User/a")).await.starts_with("already exists"));
    assert_eq!(h.fail("rm", json!("/User/gone")).await, "not found: /User/gone");

    h.ok("touch", json!("/User/b")).await;
    let pair = json!({"source": "/User/a", "destination": "/User/b"});
    assert!(h.fail("mv", pair.clone()).await.starts_with("already exists"));
    assert!(h.fail("cp", pair).await.starts_with("already exists"));
    assert!(h.fail("put", json!({"path": "/User/none", "content": "x"})).await.starts_with("not found"));
}

#[tokio::test]
async fn root_listing_has_no_parent() {
    let h = Harness::new();
    let root = h.ok("ls", json!("/")).await;
    assert!(!names(&root).contains(&".."));
    assert!(names(&root).contains(&"User"));

    h.ok("mkdir", json!("/User/sub")).await;
    let sub = h.ok("readdir", json!({"path": "/User/sub"})).await;
    let parents = names(&sub).iter().filter(|n| **n == "..").count();
    assert_eq!(parents, 1);
    assert_eq!(names(&sub)[0], "..");
}

#[tokio::test]
async fn mime_filter_listing() {
    let h = Harness::new();
    h.ok("touch", json!("/User/a.png")).await;
    h.ok("touch", json!("/User/b.txt")).await;

    let listing = h.ok("ls", json!({"path": "/User", "mime": ["image/*"]})).await;
    assert_eq!(names(&listing), vec!["..", "a.png"]);
    assert_eq!(listing["a.png"]["mimeType"], "image/png");
}

#[tokio::test]
async fn packages_listing() {
    let h = Harness::with(|vfs| {
        let mut table = BTreeMap::new();
        table.insert("Foo".to_string(), PackageInfo::new("Application", "x.png"));
        vfs.with_packages(Arc::new(StaticPackages::new(table)))
    });

    let listing = h.ok("ls", json!("/System/Packages")).await;
    let files: Vec<_> = listing
        .as_object()
        .unwrap()
        .values()
        .filter(|e| e["entryType"] == "file")
        .collect();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "Foo");
    assert_eq!(files[0]["mimeType"], "OSjs/Application");
    assert_eq!(files[0]["isProtected"], true);
}

#[tokio::test]
async fn sandbox_holds_through_gateway() {
    let h = Harness::new();
    h.ok("touch", json!("/User/../../../../outside.txt")).await;
    assert!(h.dir.path().join("home/amy/outside.txt").exists());
    assert!(!h.dir.path().join("outside.txt").exists());

    let other = User::new("bob", "en_EN");
    let reply = h
        .gateway
        .dispatch(&other, "exists", json!("/User/outside.txt"))
        .await
        .unwrap();
    assert_eq!(reply.payload, false);
}

#[tokio::test]
async fn write_read_and_fileinfo() {
    let h = Harness::new();
    h.ok("touch", json!("/User/log.txt")).await;
    h.ok("write", json!({"path": "/User/log.txt", "content": "hello "})).await;
    h.ok(
        "put",
        json!({"path": "/User/log.txt", "content": "d29ybGQ=", "encoding": "base64"}),
    )
    .await;
    assert_eq!(h.ok("read", json!("/User/log.txt")).await, "hello world");

    let info = h.ok("file_info", json!("/User/log.txt")).await;
    assert_eq!(info["filename"], "log.txt");
    assert_eq!(info["parentPath"], "/User");
    assert_eq!(info["sizeBytes"], 11);
    assert_eq!(info["mimeType"], "text/plain");

    assert!(h.fail("fileinfo", json!("/User")).await.starts_with("is a directory"));
}

#[tokio::test]
async fn lswrap_sorts_by_size() {
    let h = Harness::new();
    h.ok("mkdir", json!("/User/dir")).await;
    h.ok("touch", json!("/User/big.txt")).await;
    h.ok("put", json!({"path": "/User/big.txt", "content": "0123456789"})).await;
    h.ok("touch", json!("/User/small.txt")).await;

    let wrapped = h
        .ok("lswrap", json!({"path": "/User", "view": "list", "sort": "size"}))
        .await;
    assert_eq!(wrapped["path"], "/User");
    assert_eq!(wrapped["view"], "list");
    assert_eq!(wrapped["sort"], "size");
    assert_eq!(names(&wrapped["list"]), vec!["..", "dir", "small.txt", "big.txt"]);
}

#[tokio::test]
async fn upload_into_directory() {
    let h = Harness::new();
    let tmp = h.dir.path().join("uploads/upload-42");
    std::fs::write(&tmp, "bytes").unwrap();
    h.ok("mkdir", json!("/User/in")).await;

    h.ok(
        "upload",
        json!({"tmp_path": tmp, "destination": "/User/in", "filename": "f.bin"}),
    )
    .await;
    assert_eq!(h.ok("cat", json!("/User/in/f.bin")).await, "bytes");

    let err = h.fail("upload", json!({"destination": "/User/in"})).await;
    assert!(err.starts_with("malformed request"));
}

#[tokio::test]
async fn upload_cannot_take_another_users_file() {
    let h = Harness::new();
    let bob = User::new("bob", "en_EN");
    let reply = h.gateway.dispatch(&bob, "touch", json!("/User/secret.txt")).await.unwrap();
    assert!(reply.success);
    let secret = h.dir.path().join("home/bob/secret.txt");
    std::fs::write(&secret, "bob only").unwrap();

    let err = h
        .fail("upload", json!({"tmp_path": secret, "destination": "/User"}))
        .await;
    assert!(err.starts_with("path escapes root"));
    assert!(secret.exists());
    assert_eq!(h.ok("exists", json!("/User/secret.txt")).await, false);
}

#[tokio::test]
async fn scope_roots_cannot_be_moved_or_replaced() {
    let h = Harness::new();
    h.ok("touch", json!("/User/a")).await;

    h.fail("mv", json!({"source": "/", "destination": "/User/taken"})).await;
    h.fail("mv", json!({"source": "/User", "destination": "/User/a/b"})).await;
    h.fail("mv", json!({"source": "/User/a", "destination": "/User"})).await;
    h.fail("cp", json!({"source": "/User/a", "destination": "/"})).await;

    assert!(h.dir.path().join("public/System").is_dir());
    assert_eq!(h.ok("exists", json!("/User/taken")).await, false);
    assert_eq!(h.ok("exists", json!("/User/a")).await, true);
}

#[cfg(unix)]
#[tokio::test]
async fn rmdir_reports_partial_failure() {
    use std::os::unix::fs::PermissionsExt;

    let h = Harness::new();
    h.ok("mkdir", json!("/User/tree")).await;
    h.ok("mkdir", json!("/User/tree/locked")).await;
    h.ok("touch", json!("/User/tree/locked/f")).await;

    let locked = h.dir.path().join("home/amy/tree/locked");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();
    // Permission bits do not bind root
    if std::fs::write(locked.join("write-check"), "").is_ok() {
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let reply = h.reply("rmdir", json!("/User/tree")).await;
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    assert!(!reply.success);
    assert!(locked.join("f").exists());
}

#[tokio::test]
async fn malformed_arguments_are_failures() {
    let h = Harness::new();
    let err = h.fail("mv", json!({"source": "/User/a"})).await;
    assert_eq!(err, "malformed request: invalid arguments for mv");
    assert!(h.fail("cat", json!(17)).await.starts_with("malformed request"));
}

#[tokio::test]
async fn unknown_method_is_not_dispatched() {
    let h = Harness::new();
    assert!(h.gateway.dispatch(&h.user, "format", json!("/")).await.is_none());

    let called = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = called.clone();
    let known = h.gateway.call(h.user.clone(), "format", json!("/"), move |_| {
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
    });
    assert!(!known);
    tokio::task::yield_now().await;
    assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
}

#[tokio::test]
async fn call_delivers_reply_once() {
    let h = Harness::new();
    let (tx, rx) = oneshot::channel();
    let known = h.gateway.call(h.user.clone(), "mkdir", json!("/User/cb"), move |reply| {
        let _ = tx.send(reply);
    });
    assert!(known);
    let reply = rx.await.unwrap();
    assert_eq!(reply, Reply::success(true));

    let (tx, rx) = oneshot::channel();
    h.gateway.call(h.user.clone(), "mkdir", json!("/User/cb"), move |reply| {
        let _ = tx.send(reply);
    });
    let reply = rx.await.unwrap();
    assert!(!reply.success);
    assert!(reply.error().unwrap().starts_with("already exists"));
}

struct CannedFetcher;

#[async_trait]
impl UrlFetcher for CannedFetcher {
    async fn fetch(&self, url: &str) -> VfsResult<String> {
        match url {
            "https://example.test/readme" => Ok("remote text".to_string()),
            other => Err(VfsError::collaborator(format!("no route to {other}"))),
        }
    }
}

#[tokio::test]
async fn readurl_uses_fetcher() {
    let h = Harness::with(|vfs| vfs.with_fetcher(Arc::new(CannedFetcher)));
    assert_eq!(
        h.ok("readurl", json!({"url": "https://example.test/readme"})).await,
        "remote text"
    );
    assert!(h.fail("readurl", json!("https://example.test/other")).await.contains("no route"));
}

#[tokio::test]
async fn archive_and_pdf_tools() {
    let dir = TempDir::new().unwrap();
    let mut config = VfsConfig::with_roots(dir.path().join("home"), dir.path().join("public"));
    let scratch = dir.path().join("scratch");
    std::fs::create_dir(&scratch).unwrap();
    config.temp_dir = Some(scratch.clone());
    let sh = |script: &str, args: &[&str]| -> Vec<String> {
        ["sh", "-c", script, "sh"]
            .iter()
            .chain(args)
            .map(|s| s.to_string())
            .collect()
    };
    config.tools.archive_list = sh("printf 'a.txt\\nsub/\\n'", &["{archive}"]);
    config.tools.archive_extract = sh("touch \"$1/a.txt\"", &["{dest}"]);
    config.tools.pdf_info = sh("printf 'Pages: 4\\n'", &["{file}"]);
    config.tools.pdf_to_svg = sh("echo '<svg/>' > \"$2\"", &["{file}", "{output}", "{page}"]);

    let gateway = Gateway::new(Arc::new(Vfs::new(config)));
    let user = User::new("amy", "en_EN");
    let call = |method: &'static str, args: Value| {
        let gateway = gateway.clone();
        let user = user.clone();
        async move { gateway.dispatch(&user, method, args).await.unwrap() }
    };

    assert!(call("touch", json!("/User/a.zip")).await.success);
    let listing = call("ls_archive", json!("/User/a.zip")).await;
    assert_eq!(names(&listing.payload), vec!["a.txt", "sub"]);
    assert_eq!(listing.payload["a.txt"]["mimeType"], "application/octet-stream");

    let extracted = call(
        "extract_archive",
        json!({"source": "/User/a.zip", "destination": "/User/out"}),
    )
    .await;
    assert!(extracted.success);
    assert_eq!(call("exists", json!("/User/out/a.txt")).await.payload, true);

    assert!(call("touch", json!("/User/doc.pdf")).await.success);
    let meta = call("readpdf", json!("/User/doc.pdf")).await;
    assert_eq!(meta.payload, json!({"Pages": "4"}));
    let page = call("readpdf", json!({"path": "/User/doc.pdf", "page": 1})).await;
    assert_eq!(page.payload, "<svg/>\n");
    assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);

    let info = call("fileinfo", json!("/User/doc.pdf")).await;
    assert_eq!(info.payload["extendedInfo"]["pdf"]["Pages"], "4");
}
