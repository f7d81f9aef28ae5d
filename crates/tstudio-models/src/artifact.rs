//! Artifact URIs of the form `scheme://container/path`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// A parsed artifact reference.
///
/// The store treats the URI as opaque beyond the container (bucket) and the
/// object path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactUri {
    scheme: String,
    container: String,
    path: String,
}

impl ArtifactUri {
    /// Build a URI from its parts.
    pub fn new(
        scheme: impl Into<String>,
        container: impl Into<String>,
        path: impl Into<String>,
    ) -> ModelResult<Self> {
        let uri = Self {
            scheme: scheme.into(),
            container: container.into(),
            path: path.into().trim_start_matches('/').to_string(),
        };
        if uri.scheme.is_empty() || uri.container.is_empty() || uri.path.is_empty() {
            return Err(ModelError::invalid_uri(
                uri.to_string(),
                "scheme, container and path must be non-empty",
            ));
        }
        uri.check_file_name()?;
        Ok(uri)
    }

    /// Parse `scheme://container/path`.
    pub fn parse(raw: &str) -> ModelResult<Self> {
        let raw = raw.trim();
        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| ModelError::invalid_uri(raw, "expected scheme://container/path"))?;

        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(ModelError::invalid_uri(raw, "invalid scheme"));
        }

        let (container, path) = rest
            .split_once('/')
            .ok_or_else(|| ModelError::invalid_uri(raw, "missing object path"))?;

        if container.is_empty() {
            return Err(ModelError::invalid_uri(raw, "missing container"));
        }
        if path.is_empty() {
            return Err(ModelError::invalid_uri(raw, "missing object path"));
        }

        let uri = Self {
            scheme: scheme.to_string(),
            container: container.to_string(),
            path: path.to_string(),
        };
        uri.check_file_name()?;
        Ok(uri)
    }

    /// The last segment becomes a local file name, so it must name a file.
    fn check_file_name(&self) -> ModelResult<()> {
        match self.file_name() {
            "" | "." | ".." => Err(ModelError::invalid_uri(
                self.to_string(),
                "object path must end in a file name",
            )),
            _ => Ok(()),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Object path inside the container (no leading slash).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment, e.g. `video.mp4`.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// File name without its extension, e.g. `video`.
    pub fn file_stem(&self) -> &str {
        Path::new(self.file_name())
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_else(|| self.file_name())
    }
}

impl fmt::Display for ArtifactUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.container, self.path)
    }
}

impl FromStr for ArtifactUri {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
