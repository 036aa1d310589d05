//! The registry of named strings that `#include` directives resolve against.
//!
//! A named string is a virtual file identified by an absolute, slash-prefixed
//! path such as `/lighting/brdf.glsl`. The resolver only ever reads from the
//! registry through [`NamedStringSource`], so any map keyed by path can stand
//! in for [`NamedStrings`].

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::NamedStringError;

/// Read-only lookup of include paths.
pub trait NamedStringSource {
    /// Returns the text registered under `path`, if any.
    fn named_string(&self, path: &str) -> Option<&str>;
}

impl<T: NamedStringSource + ?Sized> NamedStringSource for &T {
    fn named_string(&self, path: &str) -> Option<&str> {
        (**self).named_string(path)
    }
}

impl<S: std::hash::BuildHasher> NamedStringSource for HashMap<String, String, S> {
    fn named_string(&self, path: &str) -> Option<&str> {
        self.get(path).map(String::as_str)
    }
}

impl NamedStringSource for BTreeMap<String, String> {
    fn named_string(&self, path: &str) -> Option<&str> {
        self.get(path).map(String::as_str)
    }
}

/// An owned set of named strings.
///
/// Keys are validated on insertion so every registered path can actually be
/// referenced from an `#include <...>` line.
#[derive(Debug, Clone, Default)]
pub struct NamedStrings {
    strings: HashMap<String, String>,
}

impl NamedStrings {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `text` under `path`, returning the text it replaced.
    ///
    /// # Errors
    ///
    /// Returns [`NamedStringError::InvalidPath`] if `path` is empty, is not
    /// slash-prefixed, or contains `<`, `>` or a line break.
    pub fn insert(
        &mut self,
        path: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Option<String>, NamedStringError> {
        let path = path.into();
        validate_path(&path)?;
        Ok(self.strings.insert(path, text.into()))
    }

    /// Reads `file` from disk and registers its contents under `path`.
    ///
    /// # Errors
    ///
    /// Fails if `path` is invalid or the file cannot be read as UTF-8.
    pub fn insert_file(
        &mut self,
        path: impl Into<String>,
        file: impl AsRef<Path>,
    ) -> Result<Option<String>, NamedStringError> {
        let path = path.into();
        validate_path(&path)?;
        let file = file.as_ref();
        let text = fs::read_to_string(file).map_err(|source| NamedStringError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        Ok(self.strings.insert(path, text))
    }

    /// Builds a registry from every file below `root`.
    ///
    /// `root/common/math.glsl` is registered as `/common/math.glsl`. Files
    /// whose relative path is not valid UTF-8, or would not be a usable include
    /// path, are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Fails on the first directory or file that cannot be read.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self, NamedStringError> {
        let root = root.as_ref();
        let mut strings = Self::new();

        // Symlinks are not followed while walking, so link cycles cannot
        // recurse. A link to a file is still loaded through its target.
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|err| walk_error(root, err))?;
            let file = entry.path();
            if entry.file_type().is_dir() || !file.is_file() {
                continue;
            }
            let Some(key) = include_key(root, file) else {
                log::warn!("Skipping non UTF-8 shader path {}", file.display());
                continue;
            };
            match strings.insert_file(key, file) {
                Ok(_) => log::debug!("Registered named string for {}", file.display()),
                Err(err @ NamedStringError::InvalidPath { .. }) => log::warn!("{err}"),
                Err(err) => return Err(err),
            }
        }

        Ok(strings)
    }

    /// Removes `path`, returning its text.
    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.strings.remove(path)
    }

    /// Whether `path` is registered.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.strings.contains_key(path)
    }

    /// Text registered under `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.strings.get(path).map(String::as_str)
    }

    /// Number of registered strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// All registered paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.strings.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

impl NamedStringSource for NamedStrings {
    fn named_string(&self, path: &str) -> Option<&str> {
        self.get(path)
    }
}

impl<P: Into<String>, T: Into<String>> Extend<(P, T)> for NamedStrings {
    fn extend<I: IntoIterator<Item = (P, T)>>(&mut self, iter: I) {
        for (path, text) in iter {
            if let Err(err) = self.insert(path, text) {
                log::warn!("{err}");
            }
        }
    }
}

impl<P: Into<String>, T: Into<String>> FromIterator<(P, T)> for NamedStrings {
    fn from_iter<I: IntoIterator<Item = (P, T)>>(iter: I) -> Self {
        let mut strings = Self::new();
        strings.extend(iter);
        strings
    }
}

fn validate_path(path: &str) -> Result<(), NamedStringError> {
    let reason = if path.is_empty() {
        "path is empty"
    } else if !path.starts_with('/') {
        "path must start with '/'"
    } else if path.contains(['<', '>']) {
        "path must not contain angle brackets"
    } else if path.contains(['\n', '\r']) {
        "path must not contain line breaks"
    } else {
        return Ok(());
    };

    Err(NamedStringError::InvalidPath {
        path: path.to_owned(),
        reason,
    })
}

fn walk_error(root: &Path, err: walkdir::Error) -> NamedStringError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other(message));
    NamedStringError::Io { path, source }
}

/// `/`-joined path of `file` relative to `root`.
fn include_key(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let mut key = String::new();
    for component in relative.components() {
        key.push('/');
        key.push_str(component.as_os_str().to_str()?);
    }
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "glsl-include-{}-{name}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn insert_rejects_unusable_paths() {
        let mut strings = NamedStrings::new();

        for path in ["", "relative.glsl", "/a<b", "/a>b", "/a\nb"] {
            assert!(
                matches!(
                    strings.insert(path, "x"),
                    Err(NamedStringError::InvalidPath { .. })
                ),
                "{path:?} should be rejected"
            );
        }
        assert!(strings.is_empty());
    }

    #[test]
    fn insert_replaces_existing_text() {
        let mut strings = NamedStrings::new();
        assert_eq!(strings.insert("/a", "one").unwrap(), None);
        assert_eq!(strings.insert("/a", "two").unwrap().as_deref(), Some("one"));
        assert_eq!(strings.get("/a"), Some("two"));
        assert_eq!(strings.len(), 1);

        assert_eq!(strings.remove("/a").as_deref(), Some("two"));
        assert!(!strings.contains("/a"));
    }

    #[test]
    fn collect_skips_invalid_entries() {
        let strings: NamedStrings = [("/b", "b"), ("nope", "x"), ("/a", "a")]
            .into_iter()
            .collect();

        assert_eq!(strings.paths(), vec!["/a", "/b"]);
    }

    #[test]
    fn maps_act_as_sources() {
        let mut map = HashMap::new();
        map.insert("/a".to_owned(), "A".to_owned());
        assert_eq!(map.named_string("/a"), Some("A"));
        assert_eq!((&map).named_string("/missing"), None);

        let tree: BTreeMap<String, String> = [("/t".to_owned(), "T".to_owned())].into();
        assert_eq!(tree.named_string("/t"), Some("T"));
    }

    #[test]
    fn from_dir_keys_files_by_relative_path() {
        let root = scratch_dir("from-dir");
        fs::create_dir_all(root.join("common")).unwrap();
        fs::write(root.join("main.glsl"), "void main() {}\n").unwrap();
        fs::write(root.join("common").join("math.glsl"), "float sq(float x);\n").unwrap();

        let strings = NamedStrings::from_dir(&root).unwrap();

        assert_eq!(strings.paths(), vec!["/common/math.glsl", "/main.glsl"]);
        assert_eq!(strings.get("/common/math.glsl"), Some("float sq(float x);\n"));

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn from_dir_reports_missing_root() {
        let root = std::env::temp_dir().join("glsl-include-does-not-exist");
        let err = NamedStrings::from_dir(&root).unwrap_err();
        assert!(matches!(err, NamedStringError::Io { path, .. } if path == root));
    }

    #[cfg(unix)]
    #[test]
    fn from_dir_does_not_descend_into_link_cycles() {
        use std::os::unix::fs::symlink;

        let root = scratch_dir("link-cycle");
        fs::create_dir_all(root.join("common")).unwrap();
        fs::write(root.join("common").join("math.glsl"), "float sq(float x);\n").unwrap();
        symlink(&root, root.join("common").join("up")).unwrap();
        symlink(
            root.join("common").join("math.glsl"),
            root.join("alias.glsl"),
        )
        .unwrap();

        let strings = NamedStrings::from_dir(&root).unwrap();

        assert_eq!(strings.paths(), vec!["/alias.glsl", "/common/math.glsl"]);
        assert_eq!(strings.get("/alias.glsl"), Some("float sq(float x);\n"));

        fs::remove_dir_all(&root).unwrap();
    }
}
