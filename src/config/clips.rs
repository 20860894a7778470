// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::collections::HashMap;
use std::path::Path;

use config::{Config, File};
use serde::Deserialize;

use super::error::ConfigError;
use crate::clips::FetchPhase;

/// One clip in the clip data object.
#[derive(Clone, Debug, Deserialize)]
pub struct ClipConfig {
    /// The clip's own name, mirroring its table key.
    name: String,

    /// The path or URL of the clip's audio.
    file: String,

    /// The serialized fetch state. Registration always begins a fresh
    /// lifecycle; the field exists for format fidelity.
    #[serde(default)]
    fetched: FetchPhase,

    /// Optional offset positions within the clip, in seconds.
    clip_offsets: Option<Vec<f64>>,
}

impl ClipConfig {
    /// Gets the clip name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the file reference.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Gets the serialized fetch state.
    pub fn fetched(&self) -> FetchPhase {
        self.fetched
    }

    /// Gets the clip's offset positions.
    pub fn clip_offsets(&self) -> Option<&[f64]> {
        self.clip_offsets.as_deref()
    }
}

/// The clip data object: clip name to clip description.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClipTable {
    #[serde(flatten)]
    clips: HashMap<String, ClipConfig>,
}

impl ClipTable {
    /// Parses a clip table from a YAML or JSON file.
    pub fn deserialize(path: &Path) -> Result<ClipTable, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<ClipTable>()?)
    }

    /// Parses the JSON clip data object format directly.
    pub fn from_json(json: &str) -> Result<ClipTable, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parses the clip data object from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<ClipTable, serde_yml::Error> {
        serde_yml::from_str(yaml)
    }

    /// Gets the clips by name.
    pub fn clips(&self) -> &HashMap<String, ClipConfig> {
        &self.clips
    }
}
