//! Deployed container metadata.
//!
//! A `ContainerInfo` binds a container id (e.g. `test1.0`) to the release it
//! was deployed from and to the alias clients route by (e.g. `test`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing release coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReleaseIdError {
    /// The value did not have exactly three `:`-separated parts.
    #[error("release id '{0}' must have the form group:artifact:version")]
    Malformed(String),

    /// One of the coordinates was empty.
    #[error("release id '{value}' has an empty {part}")]
    EmptyPart { value: String, part: &'static str },
}

/// Maven-style release coordinates (`group:artifact:version`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseId {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl ReleaseId {
    /// Build release coordinates from their parts.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

impl FromStr for ReleaseId {
    type Err = ReleaseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [group, artifact, version] = parts.as_slice() else {
            return Err(ReleaseIdError::Malformed(s.to_string()));
        };

        for (value, part) in [(group, "group"), (artifact, "artifact"), (version, "version")] {
            if value.trim().is_empty() {
                return Err(ReleaseIdError::EmptyPart {
                    value: s.to_string(),
                    part,
                });
            }
        }

        Ok(Self::new(*group, *artifact, *version))
    }
}

impl TryFrom<String> for ReleaseId {
    type Error = ReleaseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReleaseId> for String {
    fn from(id: ReleaseId) -> Self {
        id.to_string()
    }
}

/// Metadata for one deployed container.
///
/// Equality covers all three fields; the registry stores these in sets and
/// removes them by value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    pub container_id: String,
    pub alias: String,
    pub release_id: ReleaseId,
}

impl ContainerInfo {
    pub fn new(
        container_id: impl Into<String>,
        alias: impl Into<String>,
        release_id: ReleaseId,
    ) -> Self {
        Self {
            container_id: container_id.into(),
            alias: alias.into(),
            release_id,
        }
    }

    /// Build an info whose alias is the artifact id of its release.
    pub fn from_release(container_id: impl Into<String>, release_id: ReleaseId) -> Self {
        let alias = release_id.artifact_id.clone();
        Self::new(container_id, alias, release_id)
    }

    /// Keys this info is registered under: the exact container id, then the
    /// alias when it differs.
    pub fn registry_keys(&self) -> impl Iterator<Item = &str> {
        let alias = (self.alias != self.container_id).then_some(self.alias.as_str());
        std::iter::once(self.container_id.as_str()).chain(alias)
    }
}
