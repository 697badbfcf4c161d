//! Logical identifiers for template resources and outputs.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const PATH_SEP: &str = "/";
const HASH_LEN: usize = 8;
const MAX_HUMAN_LEN: usize = 240;
const MAX_ID_LEN: usize = 255;

/// Path component dropped from both the hash and the human-readable part.
pub const HIDDEN_ID: &str = "Default";
/// Path component kept in the hash but dropped from the human-readable part.
pub const HIDDEN_FROM_HUMAN_ID: &str = "Resource";

/// A template-unique identifier derived from a construct path.
///
/// A single path component maps to itself with every non-alphanumeric
/// character removed. Longer paths get a stable 8-character MD5 suffix so
/// two paths that sanitize to the same text still yield distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct LogicalId(String);

impl LogicalId {
    /// Build a logical id from the construct path inside a stack.
    pub fn from_path<S: AsRef<str>>(components: &[S]) -> Result<Self> {
        let components: Vec<&str> = components
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| *c != HIDDEN_ID)
            .collect();

        if components.is_empty() {
            return Err(Error::InvalidInput(
                "unable to derive a logical id from an empty path".to_string(),
            ));
        }

        if components.len() == 1 {
            let candidate = remove_non_alphanumeric(components[0]);
            if candidate.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "construct id '{}' has no alphanumeric characters",
                    components[0]
                )));
            }
            if candidate.len() <= MAX_ID_LEN {
                return Ok(Self(candidate));
            }
        }

        let hash = path_hash(&components);
        let mut human: String = remove_dupes(&components)
            .into_iter()
            .filter(|c| *c != HIDDEN_FROM_HUMAN_ID)
            .map(remove_non_alphanumeric)
            .collect();
        human.truncate(MAX_HUMAN_LEN);

        Ok(Self(format!("{human}{hash}")))
    }

    /// Wrap a literal id. Fails when the id is not purely alphanumeric.
    pub fn literal(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_ID_LEN || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidInput(format!("invalid logical id: '{id}'")));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// First 8 upper-case hex characters of the MD5 of the joined path.
pub fn path_hash<S: AsRef<str>>(components: &[S]) -> String {
    let joined = components
        .iter()
        .map(|c| c.as_ref())
        .collect::<Vec<_>>()
        .join(PATH_SEP);
    let digest = format!("{:x}", md5::compute(joined.as_bytes()));
    digest[..HASH_LEN].to_uppercase()
}

fn remove_non_alphanumeric(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

fn remove_dupes<'a>(components: &[&'a str]) -> Vec<&'a str> {
    let mut out: Vec<&'a str> = Vec::with_capacity(components.len());
    for c in components {
        if out.last() != Some(c) {
            out.push(c);
        }
    }
    out
}
