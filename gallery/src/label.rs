use std::borrow::Borrow;
use std::fmt;
use std::path::Path;

use crate::GalleryError;

/// Identity label of a known face.
///
/// Labels are sanitized once, when they are created, to the filesystem-safe
/// charset `[A-Za-z0-9_.-]`. Any other character becomes `_`. Comparison is
/// case-sensitive and ordering is byte-wise lexicographic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(String);

impl Label {
    /// Sanitizes `raw` into a label.
    ///
    /// Leading dots become `_` so the record file is never hidden.
    ///
    /// Fails with [`GalleryError::InvalidLabel`] when the result would be
    /// empty or made only of dots (`.`, `..`), which cannot name a record.
    pub fn new(raw: &str) -> Result<Self, GalleryError> {
        let mut leading = true;
        let sanitized: String = raw
            .trim()
            .chars()
            .map(|c| {
                let out = match c {
                    '.' if leading => '_',
                    c if is_safe(c) => c,
                    _ => '_',
                };
                leading &= c == '.';
                out
            })
            .collect();
        if sanitized.is_empty() || raw.trim().chars().all(|c| c == '.') {
            return Err(GalleryError::InvalidLabel(raw.to_string()));
        }
        Ok(Self(sanitized))
    }

    /// Derives a label from a file's base name without its extension
    /// (e.g. `faces/alice.jpg` -> `alice`).
    pub fn from_file_stem(path: &Path) -> Result<Self, GalleryError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| GalleryError::InvalidLabel(path.display().to_string()))?;
        Self::new(stem)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Label {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_safe_characters() {
        let l = Label::new("Alice_Smith-2.v1").unwrap();
        assert_eq!(l.as_str(), "Alice_Smith-2.v1");
    }

    #[test]
    fn replaces_unsafe_characters() {
        assert_eq!(Label::new("bob jones").unwrap().as_str(), "bob_jones");
        assert_eq!(Label::new("../etc/passwd").unwrap().as_str(), "___etc_passwd");
        assert_eq!(Label::new("zoë").unwrap().as_str(), "zo_");
    }

    #[test]
    fn case_sensitive() {
        assert_ne!(Label::new("Alice").unwrap(), Label::new("alice").unwrap());
    }

    #[test]
    fn rejects_empty_and_dots() {
        assert!(Label::new("").is_err());
        assert!(Label::new("   ").is_err());
        assert!(Label::new(".").is_err());
        assert!(Label::new("..").is_err());
    }

    #[test]
    fn leading_dots_are_replaced() {
        assert_eq!(Label::new(".alice").unwrap().as_str(), "_alice");
        assert_eq!(Label::new("..bob.v2").unwrap().as_str(), "__bob.v2");
        assert_eq!(
            Label::from_file_stem(Path::new("faces/.carol.jpg")).unwrap().as_str(),
            "_carol"
        );
    }

    #[test]
    fn from_file_stem() {
        let l = Label::from_file_stem(Path::new("faces/carol.JPG")).unwrap();
        assert_eq!(l.as_str(), "carol");
    }

    #[test]
    fn lexicographic_order() {
        let mut labels = vec![
            Label::new("bob").unwrap(),
            Label::new("Zed").unwrap(),
            Label::new("alice").unwrap(),
        ];
        labels.sort();
        let names: Vec<&str> = labels.iter().map(|l| l.as_str()).collect();
        assert_eq!(names, vec!["Zed", "alice", "bob"]);
    }
}
