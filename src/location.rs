//! Canonical code locations
//!
//! A [`LocationId`] identifies the directory or archive a code unit was loaded
//! from. Differently spelled locations for the same place (`jar:` wrappers
//! with entry suffixes, `file:/x` vs `file:///x`, relative segments, percent
//! encoding, trailing slashes on directories) normalize to equal values.

use crate::error::AttributionError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;
use url::Url;

const JAR_SCHEME: &str = "jar:";

/// Separator between an archive and the entry inside it in `jar:` URLs
const ARCHIVE_ENTRY_SEPARATOR: char = '!';

/// Normalized location identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationId {
    url: Url,
}

impl LocationId {
    /// Parse a location URL as reported by the runtime
    ///
    /// `jar:<archive>!/<entry>` is reduced to `<archive>`; nested `jar:`
    /// wrappers are unwrapped.
    pub fn parse(raw: &str) -> Result<Self, AttributionError> {
        let archive = strip_archive_entry(raw.trim())?;
        let url = Url::parse(archive).map_err(|e| AttributionError::malformed(raw, e))?;
        Ok(Self {
            url: normalize(url),
        })
    }

    /// Location of an absolute filesystem path (directory or archive)
    pub fn from_path(path: &Path) -> Result<Self, AttributionError> {
        let url = Url::from_file_path(path).map_err(|()| {
            AttributionError::malformed(path.display().to_string(), "path is not absolute")
        })?;
        Ok(Self {
            url: normalize(url),
        })
    }

    /// Parse either a URL (`file:`, `jar:`, `scheme://...`) or a filesystem
    /// path; relative paths are resolved against `base`
    pub fn parse_flexible(raw: &str, base: Option<&Path>) -> Result<Self, AttributionError> {
        let raw = raw.trim();
        if looks_like_url(raw) {
            return Self::parse(raw);
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            return Self::from_path(path);
        }
        match base {
            Some(base) => Self::from_path(&base.join(path)),
            None => Err(AttributionError::malformed(
                raw,
                "relative path with no base directory",
            )),
        }
    }

    /// Same location with its path replaced
    pub fn with_path(&self, path: &str) -> Self {
        let mut url = self.url.clone();
        url.set_path(path);
        Self {
            url: normalize(url),
        }
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Percent-encoded path component
    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

impl Serialize for LocationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.url.as_str())
    }
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Whether `raw` is written as a URL rather than a filesystem path
pub(crate) fn looks_like_url(raw: &str) -> bool {
    raw.contains("://") || has_prefix_ignore_case(raw, JAR_SCHEME) || has_prefix_ignore_case(raw, "file:")
}

fn strip_archive_entry(raw: &str) -> Result<&str, AttributionError> {
    let mut current = raw;
    while has_prefix_ignore_case(current, JAR_SCHEME) {
        let inner = &current[JAR_SCHEME.len()..];
        current = match inner.find(ARCHIVE_ENTRY_SEPARATOR) {
            Some(idx) => &inner[..idx],
            None => {
                return Err(AttributionError::malformed(
                    raw,
                    "archive URL has no '!' entry separator",
                ))
            }
        };
    }
    Ok(current)
}

fn normalize(mut url: Url) -> Url {
    url.set_fragment(None);
    url.set_query(None);

    // Round-trip local files through the filesystem path so percent encoding
    // is canonical
    if url.scheme() == "file" {
        if let Ok(path) = url.to_file_path() {
            if let Ok(canonical) = Url::from_file_path(&path) {
                url = canonical;
            }
        }
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            url.set_path("/");
        } else {
            url.set_path(&trimmed);
        }
    }
    url
}
