use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::types::Frame;

/// Structural problem with scenario input, surfaced at load time.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario sequence is empty; at least one frame is required")]
    EmptySequence,
    #[error("failed to read scenario file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scenario json at {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown scenario key '{key}'")]
    UnknownScenario { key: String },
}

/// Validated, non-empty list of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    frames: Vec<Frame>,
}

impl Sequence {
    pub fn new(frames: Vec<Frame>) -> Result<Self, ScenarioError> {
        if frames.is_empty() {
            return Err(ScenarioError::EmptySequence);
        }
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn clamp_index(&self, index: i64) -> usize {
        index.clamp(0, self.last_index() as i64) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(rename = "desc", default)]
    pub description: String,
    #[serde(rename = "seq", default)]
    pub frames: Vec<Frame>,
}

impl Scenario {
    pub fn sequence(&self) -> Result<Sequence, ScenarioError> {
        Sequence::new(self.frames.clone())
    }
}

/// Keyed collection of authored scenarios, as stored in `scenarios.json`.
#[derive(Debug, Clone, Default)]
pub struct ScenarioLibrary {
    scenarios: BTreeMap<String, Scenario>,
}

impl ScenarioLibrary {
    pub fn from_json_str(raw: &str) -> Result<Self, ScenarioError> {
        let scenarios = decode_json::<BTreeMap<String, Scenario>>(raw)?;
        Ok(Self { scenarios })
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path).map_err(|source| ScenarioError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let library = Self::from_json_str(&raw)?;
        info!(
            path = %path.display(),
            scenario_count = library.len(),
            "scenario_library_loaded"
        );
        Ok(library)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    pub fn first_key(&self) -> Option<&str> {
        self.keys().next()
    }

    pub fn get(&self, key: &str) -> Result<&Scenario, ScenarioError> {
        self.scenarios
            .get(key)
            .ok_or_else(|| ScenarioError::UnknownScenario {
                key: key.to_string(),
            })
    }

    /// Key after `current`, wrapping to the first. Unknown keys also map to the first.
    pub fn next_key(&self, current: &str) -> Option<&str> {
        let mut keys = self.keys().skip_while(|key| *key != current);
        match (keys.next(), keys.next()) {
            (Some(_), Some(next)) => Some(next),
            _ => self.first_key(),
        }
    }
}

pub(crate) fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, ScenarioError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let value = serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        ScenarioError::Decode {
            path,
            source: error.into_inner(),
        }
    })?;
    deserializer
        .end()
        .map_err(|source| ScenarioError::Decode {
            path: ".".to_string(),
            source,
        })?;
    Ok(value)
}
