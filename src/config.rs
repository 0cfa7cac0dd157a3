//! # Connection options
//!
//! The fairing accepts either one connection object or a non-empty array of
//! them, e.g. in `Rocket.toml`:
//!
//! ```toml
//! [default.mongodb]
//! url = "mongodb://localhost:27017/app"
//! settings = { maxPoolSize = 10 }
//! decorate = true
//! ```
//!
//! Every input is normalized into a [`ConnectionBatch`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ValidationError;

/// Used when a connection omits `url`.
pub const DEFAULT_URL: &str = "mongodb://localhost:27017/test";

/// Name of the decoration created by `decorate = true`.
pub const DEFAULT_DECORATION: &str = "mongo";

/// Driver options, forwarded to the driver without inspection.
pub type Settings = Map<String, Value>;

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

/// One configured connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSpec {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorate: Option<Decorate>,
}

impl Default for ConnectionSpec {
    fn default() -> Self {
        Self {
            url: default_url(),
            settings: Settings::new(),
            decorate: None,
        }
    }
}

impl ConnectionSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn decorate(mut self, decorate: Decorate) -> Self {
        self.decorate = Some(decorate);
        self
    }

    fn decorate_kind(&self) -> DecorateMode {
        match self.decorate {
            None => DecorateMode::Expose,
            Some(Decorate::Default) => DecorateMode::Default,
            Some(Decorate::Named(_)) => DecorateMode::Named,
        }
    }
}

/// `decorate = true` or `decorate = "name"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDecorate", into = "RawDecorate")]
pub enum Decorate {
    Default,
    Named(String),
}

impl Decorate {
    pub fn name(&self) -> &str {
        match self {
            Decorate::Default => DEFAULT_DECORATION,
            Decorate::Named(name) => name,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawDecorate {
    Flag(bool),
    Name(String),
}

impl TryFrom<RawDecorate> for Decorate {
    type Error = &'static str;

    fn try_from(raw: RawDecorate) -> Result<Self, Self::Error> {
        match raw {
            RawDecorate::Flag(true) => Ok(Decorate::Default),
            RawDecorate::Flag(false) => Err("decorate must be `true` or a name"),
            RawDecorate::Name(name) if name.is_empty() => Err("decorate name must not be empty"),
            RawDecorate::Name(name) => Ok(Decorate::Named(name)),
        }
    }
}

impl From<Decorate> for RawDecorate {
    fn from(decorate: Decorate) -> Self {
        match decorate {
            Decorate::Default => RawDecorate::Flag(true),
            Decorate::Named(name) => RawDecorate::Name(name),
        }
    }
}

/// How the connected state is handed to the rest of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorateMode {
    /// Managed as Rocket state.
    Expose,
    /// Attached under [`DEFAULT_DECORATION`].
    Default,
    /// Attached under each connection's own name.
    Named,
}

/// Validated, non-empty, ordered list of connections.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionBatch {
    specs: Vec<ConnectionSpec>,
    mode: DecorateMode,
}

impl ConnectionBatch {
    pub fn new(specs: Vec<ConnectionSpec>) -> Result<Self, ValidationError> {
        let first = specs.first().ok_or(ValidationError::Empty)?;
        let mode = first.decorate_kind();

        if specs.iter().any(|spec| spec.decorate_kind() != mode) {
            return Err(ValidationError::MixedDecorate);
        }

        if mode == DecorateMode::Named {
            let mut seen = HashSet::new();
            for spec in &specs {
                if let Some(decorate) = &spec.decorate
                    && !seen.insert(decorate.name())
                {
                    return Err(ValidationError::DuplicateDecoration(
                        decorate.name().to_string(),
                    ));
                }
            }
        }

        Ok(Self { specs, mode })
    }

    pub fn single(spec: ConnectionSpec) -> Self {
        let mode = spec.decorate_kind();
        Self {
            specs: vec![spec],
            mode,
        }
    }

    /// Normalizes untyped options: `null` is the default connection, an
    /// array is a batch, anything else is a single connection.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Null => Ok(Self::single(ConnectionSpec::default())),
            Value::Array(items) => {
                let specs = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| parse_spec(index, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Self::new(specs)
            }
            other => parse_spec(0, other).map(Self::single),
        }
    }

    pub fn mode(&self) -> DecorateMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConnectionSpec> {
        self.specs.iter()
    }

    /// Names this batch attaches its state under, empty when it only exposes.
    pub fn decoration_names(&self) -> Vec<&str> {
        match self.mode {
            DecorateMode::Expose => Vec::new(),
            DecorateMode::Default => vec![DEFAULT_DECORATION],
            DecorateMode::Named => self
                .specs
                .iter()
                .filter_map(|spec| spec.decorate.as_ref().map(Decorate::name))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ConnectionBatch {
    type Item = &'a ConnectionSpec;
    type IntoIter = std::slice::Iter<'a, ConnectionSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn parse_spec(index: usize, value: Value) -> Result<ConnectionSpec, ValidationError> {
    serde_json::from_value(value).map_err(|e| ValidationError::Invalid {
        index,
        message: e.to_string(),
    })
}
