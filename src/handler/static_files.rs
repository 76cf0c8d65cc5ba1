//! Static file serving module
//!
//! Maps request paths onto files under a root directory. A path that would
//! leave the root is answered with 403; anything the resolver cannot serve
//! (missing files, directories without an index, filesystem errors) is
//! reported as not handled so the dispatcher can fall through.

use crate::http::{self, mime, ResponseBody};
use crate::logger;
use hyper::{Method, Response};
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use tokio::fs;

const INDEX_FILE: &str = "index.html";

/// Result of a static lookup
pub enum StaticOutcome {
    Served(Response<ResponseBody>),
    Forbidden,
    NotHandled,
}

impl StaticOutcome {
    /// The response to write, if the lookup ends the request
    pub fn into_response(self) -> Option<Response<ResponseBody>> {
        match self {
            Self::Served(resp) => Some(resp),
            Self::Forbidden => Some(http::build_403_response()),
            Self::NotHandled => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    reserved_prefix: Option<String>,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reserved_prefix: None,
        }
    }

    /// Paths under `prefix` are left to dynamic routes
    #[must_use]
    pub fn with_reserved_prefix(mut self, prefix: Option<&str>) -> Self {
        self.reserved_prefix = prefix
            .map(|p| p.trim_end_matches('/'))
            .filter(|p| !p.is_empty())
            .map(ToString::to_string);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a request should try the static phase at all
    pub fn applies(&self, method: &Method, path: &str) -> bool {
        *method == Method::GET && !self.is_reserved(path)
    }

    /// Checked on the decoded path, the same form the resolver walks
    fn is_reserved(&self, path: &str) -> bool {
        self.reserved_prefix.as_deref().is_some_and(|prefix| {
            let decoded = percent_decode_str(path).decode_utf8_lossy();
            decoded
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    /// Look up `path` (as found in the request URI) under the root
    pub async fn serve(&self, path: &str) -> StaticOutcome {
        let root = match fs::canonicalize(&self.root).await {
            Ok(root) => root,
            Err(e) => {
                logger::log_warning(&format!(
                    "Static root not accessible '{}': {e}",
                    self.root.display()
                ));
                return StaticOutcome::NotHandled;
            }
        };

        let Some(candidate) = resolve_within(&root, path) else {
            logger::log_warning(&format!("Path traversal attempt blocked: {path}"));
            return StaticOutcome::Forbidden;
        };

        let target = match locate(&root, &candidate).await {
            Located::Found(target) => target,
            Located::Escapes(target) => {
                logger::log_warning(&format!(
                    "Path traversal attempt blocked: {path} -> {}",
                    target.display()
                ));
                return StaticOutcome::Forbidden;
            }
            Located::Missing => return StaticOutcome::NotHandled,
        };

        let meta = match fs::metadata(&target).await {
            Ok(meta) => meta,
            Err(_) => return StaticOutcome::NotHandled,
        };

        if meta.is_dir() {
            return match locate(&root, &target.join(INDEX_FILE)).await {
                Located::Found(index) => open(&index, "text/html").await,
                Located::Escapes(index) => {
                    logger::log_warning(&format!(
                        "Directory index escapes static root: {}",
                        index.display()
                    ));
                    StaticOutcome::Forbidden
                }
                Located::Missing => {
                    logger::log_debug(&format!("No index in directory {}", target.display()));
                    StaticOutcome::NotHandled
                }
            };
        }

        if meta.is_file() {
            return open(&target, mime::content_type_for(&target)).await;
        }

        StaticOutcome::NotHandled
    }
}

enum Located {
    Found(PathBuf),
    Escapes(PathBuf),
    Missing,
}

/// Canonicalize an existing path and check it is still under `root`
async fn locate(root: &Path, candidate: &Path) -> Located {
    match fs::canonicalize(candidate).await {
        Ok(target) if target.starts_with(root) => Located::Found(target),
        Ok(target) => Located::Escapes(target),
        Err(_) => Located::Missing,
    }
}

async fn open(path: &Path, content_type: &str) -> StaticOutcome {
    match fs::File::open(path).await {
        Ok(file) => {
            logger::log_debug(&format!("Serving static file {}", path.display()));
            StaticOutcome::Served(http::build_file_response(file, content_type))
        }
        Err(e) => {
            logger::log_debug(&format!("Failed to open '{}': {e}", path.display()));
            StaticOutcome::NotHandled
        }
    }
}

/// Percent-decode the request path and apply it segment by segment to
/// `root`; `None` when `..` would climb above the root
fn resolve_within(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8_lossy();
    let mut resolved = root.to_path_buf();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if resolved == root {
                    return None;
                }
                resolved.pop();
            }
            name => resolved.push(name),
        }
    }
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::header::CONTENT_TYPE;
    use std::fs as stdfs;
    use tempfile::TempDir;

    /// `<tmp>/public` is the root; `<tmp>/secret.txt` sits outside it
    fn site() -> (TempDir, StaticFiles) {
        let dir = TempDir::new().unwrap();
        let public = dir.path().join("public");
        stdfs::create_dir_all(public.join("docs")).unwrap();
        stdfs::create_dir_all(public.join("empty")).unwrap();
        stdfs::write(public.join("index.html"), "<h1>home</h1>").unwrap();
        stdfs::write(public.join("style.CSS"), "body{}").unwrap();
        stdfs::write(public.join("data.bin"), [0_u8, 1, 2]).unwrap();
        stdfs::write(public.join("docs/index.html"), "<h1>docs</h1>").unwrap();
        stdfs::write(dir.path().join("secret.txt"), "secret").unwrap();
        let statics = StaticFiles::new(&public).with_reserved_prefix(Some("/api"));
        (dir, statics)
    }

    async fn served(outcome: StaticOutcome) -> (String, Vec<u8>) {
        let StaticOutcome::Served(resp) = outcome else {
            panic!("expected a served file");
        };
        assert_eq!(resp.status(), 200);
        let content_type = resp.headers()[CONTENT_TYPE].to_str().unwrap().to_string();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (content_type, body.to_vec())
    }

    #[tokio::test]
    async fn test_serves_file_with_content_type() {
        let (_dir, statics) = site();
        let (ct, body) = served(statics.serve("/style.CSS").await).await;
        assert_eq!(ct, "text/css");
        assert_eq!(body, b"body{}");

        let (ct, body) = served(statics.serve("/data.bin").await).await;
        assert_eq!(ct, mime::DEFAULT_CONTENT_TYPE);
        assert_eq!(body, [0, 1, 2]);
    }

    #[tokio::test]
    async fn test_directory_index() {
        let (_dir, statics) = site();
        let (ct, body) = served(statics.serve("/docs").await).await;
        assert_eq!(ct, "text/html");
        assert_eq!(body, b"<h1>docs</h1>");

        let (_, body) = served(statics.serve("/").await).await;
        assert_eq!(body, b"<h1>home</h1>");

        assert!(matches!(statics.serve("/empty").await, StaticOutcome::NotHandled));
    }

    #[tokio::test]
    async fn test_missing_file_not_handled() {
        let (_dir, statics) = site();
        assert!(matches!(statics.serve("/nope.js").await, StaticOutcome::NotHandled));
        assert!(matches!(
            StaticFiles::new("/definitely/not/here").serve("/index.html").await,
            StaticOutcome::NotHandled
        ));
    }

    #[tokio::test]
    async fn test_traversal_forbidden() {
        let (_dir, statics) = site();
        for path in [
            "/../secret.txt",
            "/../../etc/passwd",
            "/docs/../../secret.txt",
            "/%2e%2e/secret.txt",
            "/%2E%2E%2Fsecret.txt",
            "/..%5csecret.txt",
        ] {
            assert!(
                matches!(statics.serve(path).await, StaticOutcome::Forbidden),
                "{path} was not rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_dot_segments_inside_root() {
        let (_dir, statics) = site();
        let (ct, _) = served(statics.serve("/docs/../style.CSS").await).await;
        assert_eq!(ct, "text/css");
        let (_, body) = served(statics.serve("/./docs/./index.html").await).await;
        assert_eq!(body, b"<h1>docs</h1>");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_forbidden() {
        let (dir, statics) = site();
        std::os::unix::fs::symlink(dir.path().join("secret.txt"), statics.root().join("link"))
            .unwrap();
        assert!(matches!(statics.serve("/link").await, StaticOutcome::Forbidden));
    }

    #[test]
    fn test_applies() {
        let statics = StaticFiles::new("/srv").with_reserved_prefix(Some("/api/"));
        assert!(statics.applies(&Method::GET, "/app.js"));
        assert!(statics.applies(&Method::GET, "/apiary"));
        assert!(!statics.applies(&Method::GET, "/api"));
        assert!(!statics.applies(&Method::GET, "/api/users"));
        assert!(!statics.applies(&Method::POST, "/app.js"));
        assert!(!statics.applies(&Method::GET, "/%61pi/users"));
        assert!(!statics.applies(&Method::GET, "/%61%70%69"));

        let open = StaticFiles::new("/srv");
        assert!(open.applies(&Method::GET, "/api/users"));
    }

    #[test]
    fn test_forbidden_outcome_response() {
        let resp = StaticOutcome::Forbidden.into_response().unwrap();
        assert_eq!(resp.status(), 403);
        assert!(StaticOutcome::NotHandled.into_response().is_none());
    }
}
