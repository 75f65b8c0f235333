//! Directory path normalization.
//!
//! A directory path always starts and ends with `/` and never contains an
//! empty segment. Parsing rules for request input:
//!
//! * empty input means the root directory `/`
//! * a missing trailing slash is appended (`/dir` becomes `/dir/`)
//! * input not starting with `/` is rejected
//! * repeated slashes (`/a//b/`) are rejected rather than collapsed
//! * control characters are rejected
//!
//! Segments named `.` or `..` are ordinary names; no path resolution is done.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::{BrowseError, BrowseResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirectoryPath(String);

impl DirectoryPath {
    pub fn root() -> Self {
        DirectoryPath("/".to_string())
    }

    pub fn parse(raw: &str) -> BrowseResult<Self> {
        if raw.is_empty() {
            return Ok(Self::root());
        }
        if !raw.starts_with('/') {
            return Err(BrowseError::validation(
                "path",
                "Expected directory path to be in format /path/ or /path.",
            ));
        }
        if raw.chars().any(char::is_control) {
            return Err(BrowseError::validation(
                "path",
                "Directory path must not contain control characters.",
            ));
        }

        let mut path = raw.to_string();
        if !path.ends_with('/') {
            path.push('/');
        }
        if path.len() > 1 && path[1..path.len() - 1].split('/').any(str::is_empty) {
            return Err(BrowseError::validation(
                "path",
                "Directory path must not contain empty segments.",
            ));
        }
        Ok(DirectoryPath(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Last segment of the path, empty for the root.
    pub fn name(&self) -> &str {
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
    }

    pub fn parent(&self) -> Option<DirectoryPath> {
        if self.is_root() {
            return None;
        }
        let trimmed = self.0.trim_end_matches('/');
        let cut = trimmed.rfind('/').unwrap_or(0);
        Some(DirectoryPath(self.0[..=cut].to_string()))
    }

    pub fn child(&self, name: &str) -> DirectoryPath {
        DirectoryPath(format!("{}{}/", self.0, name))
    }

    /// One-based `split_part` index of the segment directly below this path.
    pub fn child_segment_index(&self) -> i32 {
        self.0.matches('/').count() as i32 + 1
    }

    /// Name of the immediate child of this path that contains `directory_path`.
    ///
    /// Returns `Some("")` when `directory_path` is this path and `None` when it is
    /// not below it at all.
    pub fn child_segment<'a>(&self, directory_path: &'a str) -> Option<&'a str> {
        let rest = directory_path.strip_prefix(self.0.as_str())?;
        Some(rest.split('/').next().unwrap_or(""))
    }
}

impl Default for DirectoryPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for DirectoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DirectoryPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for DirectoryPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_appends_missing_slash() {
        assert_eq!(DirectoryPath::parse("/dir").unwrap().as_str(), "/dir/");
        assert_eq!(DirectoryPath::parse("/dir/sub/").unwrap().as_str(), "/dir/sub/");
        assert_eq!(DirectoryPath::parse("").unwrap(), DirectoryPath::root());
        assert_eq!(DirectoryPath::parse("/").unwrap(), DirectoryPath::root());
    }

    #[test]
    fn parse_rejects_malformed_paths() {
        assert!(DirectoryPath::parse("dir/").unwrap_err().is_validation());
        assert!(DirectoryPath::parse("/a//b/").unwrap_err().is_validation());
        assert!(DirectoryPath::parse("//").unwrap_err().is_validation());
        assert!(DirectoryPath::parse("/a\n/").unwrap_err().is_validation());
    }

    #[test]
    fn name_and_parent() {
        let path = DirectoryPath::parse("/dir/sub/").unwrap();
        assert_eq!(path.name(), "sub");
        assert_eq!(path.parent().unwrap().as_str(), "/dir/");
        assert_eq!(path.parent().unwrap().parent().unwrap(), DirectoryPath::root());
        assert_eq!(DirectoryPath::root().name(), "");
        assert!(DirectoryPath::root().parent().is_none());
    }

    #[test]
    fn child_segment_of_descendants() {
        let path = DirectoryPath::parse("/dir/").unwrap();
        assert_eq!(path.child_segment("/dir/"), Some(""));
        assert_eq!(path.child_segment("/dir/sub/"), Some("sub"));
        assert_eq!(path.child_segment("/dir/sub/deeper/"), Some("sub"));
        assert_eq!(path.child_segment("/other/"), None);
        assert_eq!(path.child_segment("/directory/"), None);
    }

    #[test]
    fn segment_index_points_below_the_path() {
        assert_eq!(DirectoryPath::root().child_segment_index(), 2);
        assert_eq!(DirectoryPath::parse("/a/b").unwrap().child_segment_index(), 4);
        // split_part("/a/b/c/", '/', 4) == "c"
        let parts: Vec<&str> = "/a/b/c/".split('/').collect();
        assert_eq!(parts[3], "c");
    }
}
