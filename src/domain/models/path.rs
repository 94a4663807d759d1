//! Resource locators.
//!
//! A [`PathDescriptor`] splits a path string into a [`Scheme`] and the path
//! that follows it. Parsing is purely syntactic: nothing here checks that a
//! bucket or object exists, and an unknown scheme is accepted and only
//! rejected when the scan is executed.

use std::fmt;

use crate::domain::errors::PlanError;

/// Storage scheme of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Local filesystem, either a bare path or `file://`.
    Local,
    /// Amazon S3 or S3-compatible (`s3://`, `s3a://`).
    S3,
    /// Google Cloud Storage (`gs://`, `gcs://`).
    Gcs,
    /// Azure Blob Storage / ADLS Gen2 (`az://`, `azure://`, `abfs://`, `abfss://`, `adl://`).
    Azure,
    /// Syntactically valid but unknown scheme, kept verbatim (lowercased).
    Unrecognized(String),
}

impl Scheme {
    fn from_literal(literal: &str) -> Self {
        match literal {
            "file" => Self::Local,
            "s3" | "s3a" => Self::S3,
            "gs" | "gcs" => Self::Gcs,
            "az" | "azure" | "abfs" | "abfss" | "adl" => Self::Azure,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Local => "file",
            Self::S3 => "s3",
            Self::Gcs => "gs",
            Self::Azure => "az",
            Self::Unrecognized(literal) => literal,
        }
    }

    /// Whether paths with this scheme start with a bucket or container.
    pub fn is_cloud(&self) -> bool {
        matches!(self, Self::S3 | Self::Gcs | Self::Azure)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed resource locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathDescriptor {
    scheme: Scheme,
    literal: String,
    raw_path: String,
    key: String,
    original: String,
}

impl PathDescriptor {
    /// Parse a path string.
    ///
    /// Accepted forms:
    /// - `scheme://rest` with `scheme` matching `[A-Za-z][A-Za-z0-9+.-]*`
    /// - anything without `://`, taken as a local filesystem path
    ///
    /// Cloud schemes additionally require a non-empty bucket. Bucket and
    /// object existence are never checked. Local keys are normalized
    /// lexically, see [`PathDescriptor::key`].
    pub fn parse(path: &str) -> Result<Self, PlanError> {
        if path.is_empty() {
            return Err(PlanError::EmptyPath);
        }

        let Some((literal, rest)) = path.split_once("://") else {
            return Ok(Self {
                scheme: Scheme::Local,
                literal: Scheme::Local.as_str().to_string(),
                raw_path: path.to_string(),
                key: normalize_local(path),
                original: path.to_string(),
            });
        };

        if literal.is_empty() {
            return Err(PlanError::EmptyScheme(path.to_string()));
        }
        if !is_valid_scheme(literal) {
            return Err(PlanError::InvalidScheme {
                path: path.to_string(),
                scheme: literal.to_string(),
            });
        }

        let literal = literal.to_lowercase();
        let scheme = Scheme::from_literal(&literal);
        if scheme.is_cloud() && rest.split('/').next().is_none_or(str::is_empty) {
            return Err(PlanError::MissingBucket(path.to_string()));
        }

        let key = match scheme {
            Scheme::Local => normalize_local(rest),
            _ if scheme.is_cloud() => rest.split_once('/').map_or("", |(_, key)| key).to_string(),
            _ => rest.to_string(),
        };

        Ok(Self {
            scheme,
            literal,
            raw_path: rest.to_string(),
            key,
            original: path.to_string(),
        })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// The scheme exactly as written, lowercased (`abfss`, `s3a`, ...).
    /// `file` for bare local paths.
    pub fn scheme_literal(&self) -> &str {
        &self.literal
    }

    /// Path after the `scheme://` prefix (or the whole local path).
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// The string the descriptor was parsed from.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Bucket or container for cloud schemes.
    pub fn bucket(&self) -> Option<&str> {
        if !self.scheme.is_cloud() {
            return None;
        }
        self.raw_path.split('/').next()
    }

    /// Object key within the bucket, or the filesystem path for local paths.
    ///
    /// Local keys have `.` segments and repeated separators removed, and each
    /// `..` folded into the segment before it. A relative key keeps its
    /// leading `..` segments and becomes empty when it names the working
    /// directory itself.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// A path that names a set of objects rather than a single one:
    /// it ends in `/`, contains a `*` or `?` wildcard, or is a bare bucket.
    pub fn is_prefix(&self) -> bool {
        let key = self.key();
        key.is_empty() || key.ends_with('/') || key.contains(WILDCARDS)
    }

    /// Longest literal prefix of the key, up to the first wildcard.
    pub fn listing_prefix(&self) -> &str {
        let key = self.key();
        match key.find(WILDCARDS) {
            Some(pos) => key[..pos].rsplit_once('/').map_or("", |(dir, _)| dir),
            None => key.trim_end_matches('/'),
        }
    }

    /// The key when it contains a wildcard.
    pub fn glob(&self) -> Option<&str> {
        let key = self.key();
        key.contains(WILDCARDS).then_some(key)
    }
}

const WILDCARDS: [char; 2] = ['*', '?'];

fn normalize_local(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // `/..` is `/`
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let mut key = segments.join("/");
    let names_directory = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    if names_directory && !key.is_empty() {
        key.push('/');
    }
    if absolute {
        key.insert(0, '/');
    }
    key
}

impl fmt::Display for PathDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

fn is_valid_scheme(literal: &str) -> bool {
    let mut chars = literal.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
