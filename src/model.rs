//! [`Model`] to use for inference.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hosted model on Replicate, addressed as `owner/name`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Model {
    /// Snowflake Arctic Instruct. This is the default model.
    #[default]
    SnowflakeArcticInstruct,
    /// Any other official model.
    Other {
        /// Account that owns the model.
        owner: String,
        /// Model name.
        name: String,
    },
}

impl Model {
    /// Account that owns the model.
    pub fn owner(&self) -> &str {
        match self {
            Self::SnowflakeArcticInstruct => "snowflake",
            Self::Other { owner, .. } => owner,
        }
    }

    /// Model name without the owner.
    pub fn name(&self) -> &str {
        match self {
            Self::SnowflakeArcticInstruct => "snowflake-arctic-instruct",
            Self::Other { name, .. } => name,
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner(), self.name())
    }
}

/// Model identifier was not of the form `owner/name`.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Invalid model `{0}` (expected `owner/name`)")]
pub struct InvalidModel(pub String);

impl FromStr for Model {
    type Err = InvalidModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some(("snowflake", "snowflake-arctic-instruct")) => {
                Ok(Self::SnowflakeArcticInstruct)
            }
            Some((owner, name))
                if !owner.is_empty()
                    && !name.is_empty()
                    && !name.contains('/') =>
            {
                Ok(Self::Other {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(InvalidModel(s.to_string())),
        }
    }
}

impl TryFrom<String> for Model {
    type Error = InvalidModel;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Model> for String {
    fn from(model: Model) -> Self {
        model.to_string()
    }
}
