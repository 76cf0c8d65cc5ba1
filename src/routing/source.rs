//! Route sources
//!
//! Anything that can list `(method, path, handler)` triples can feed the
//! route table. Two sources ship with the crate: plain lists (including the
//! `[[routes.entries]]` config section) and a directory of TOML trigger
//! manifests.

use crate::error::{Error, RouteError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_EXTENSION: &str = "toml";
const HTTP_TRIGGER: &str = "http";
const DEFAULT_METHOD: &str = "GET";

/// One route to register
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteSpec {
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    pub handler: String,
}

impl RouteSpec {
    pub fn new(method: &str, path: &str, handler: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            handler: handler.to_string(),
        }
    }
}

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

/// Produces routes for registration
pub trait RouteSource {
    fn routes(&self) -> Result<Vec<RouteSpec>, Error>;
}

impl RouteSource for [RouteSpec] {
    fn routes(&self) -> Result<Vec<RouteSpec>, Error> {
        Ok(self.to_vec())
    }
}

impl RouteSource for Vec<RouteSpec> {
    fn routes(&self) -> Result<Vec<RouteSpec>, Error> {
        Ok(self.clone())
    }
}

/// Directory of trigger manifests
///
/// A manifest at `<root>/users/get.toml` containing
///
/// ```toml
/// [[triggers]]
/// type = "http"
/// method = "GET"
/// path = "users/:id"
/// ```
///
/// registers `GET <prefix>/users/:id` for handler `users/get`. Without a
/// `path` the handler id doubles as the route path.
#[derive(Debug, Clone)]
pub struct TriggerDirectory {
    root: PathBuf,
    prefix: String,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    triggers: Vec<TriggerDescriptor>,
}

#[derive(Debug, Deserialize)]
struct TriggerDescriptor {
    #[serde(rename = "type")]
    kind: String,
    method: Option<String>,
    path: Option<String>,
}

impl TriggerDirectory {
    pub fn new(root: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    fn route_for(&self, manifest_path: &Path) -> Result<Option<RouteSpec>, Error> {
        let text = fs::read_to_string(manifest_path).map_err(|source| RouteError::ManifestIo {
            path: manifest_path.to_path_buf(),
            source,
        })?;
        let manifest: Manifest = toml::from_str(&text).map_err(|source| RouteError::Manifest {
            path: manifest_path.to_path_buf(),
            source,
        })?;

        let Some(trigger) = manifest.triggers.into_iter().find(|t| t.kind == HTTP_TRIGGER) else {
            return Ok(None);
        };

        let handler = handler_id(&self.root, manifest_path);
        let path = trigger.path.as_deref().unwrap_or(&handler);
        Ok(Some(RouteSpec {
            method: trigger.method.unwrap_or_else(default_method),
            path: format!("{}/{}", self.prefix, path.trim_start_matches('/')),
            handler,
        }))
    }
}

impl RouteSource for TriggerDirectory {
    fn routes(&self) -> Result<Vec<RouteSpec>, Error> {
        let mut manifests = Vec::new();
        collect_manifests(&self.root, &mut manifests)?;
        manifests.sort();

        let mut routes = Vec::with_capacity(manifests.len());
        for path in &manifests {
            if let Some(route) = self.route_for(path)? {
                routes.push(route);
            }
        }
        Ok(routes)
    }
}

fn collect_manifests(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_manifests(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(MANIFEST_EXTENSION) {
            out.push(path);
        }
    }
    Ok(())
}

/// Relative location of the manifest with `/` separators, the file name cut
/// at its first `.`
fn handler_id(root: &Path, manifest: &Path) -> String {
    let relative = manifest.strip_prefix(root).unwrap_or(manifest);
    let mut parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(file) = parts.last_mut() {
        if let Some(stem_end) = file.find('.') {
            file.truncate(stem_end);
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn test_list_source() {
        let routes = vec![RouteSpec::new("GET", "/a", "a")];
        assert_eq!(routes.routes().unwrap(), routes);
    }

    #[test]
    fn test_directory_defaults_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "users/list.toml", "[[triggers]]\ntype = \"http\"\n");
        write(
            dir.path(),
            "users/update.toml",
            "[[triggers]]\ntype = \"http\"\nmethod = \"PUT\"\npath = \"users/:id\"\n",
        );
        write(dir.path(), "jobs/nightly.toml", "[[triggers]]\ntype = \"cron\"\n");
        write(dir.path(), "README.md", "not a manifest");

        let routes = TriggerDirectory::new(dir.path(), "/api/").routes().unwrap();
        assert_eq!(
            routes,
            vec![
                RouteSpec::new("GET", "/api/users/list", "users/list"),
                RouteSpec::new("PUT", "/api/users/:id", "users/update"),
            ]
        );
    }

    #[test]
    fn test_handler_id_cuts_at_first_dot() {
        let root = Path::new("/srv/flows");
        assert_eq!(
            handler_id(root, Path::new("/srv/flows/a/b.flow.toml")),
            "a/b"
        );
    }

    #[test]
    fn test_bad_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.toml", "[[triggers]\n");
        let err = TriggerDirectory::new(dir.path(), "/api").routes().unwrap_err();
        assert!(matches!(err, Error::Route(RouteError::Manifest { .. })));
    }
}
