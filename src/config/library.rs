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
use crate::library::{SampleDescriptor, SampleLibrary};
use crate::note::PitchClass;

/// One recorded sample reference in an instrument bank.
#[derive(Clone, Debug, Deserialize)]
pub struct SampleEntry {
    /// The note name, sharp or flat spelling (`A#`, `Bb`, ...).
    note: String,

    /// The octave of the recording.
    octave: i32,

    /// The path or URL of the audio file.
    file: String,
}

impl SampleEntry {
    /// Gets the note name as written.
    pub fn note(&self) -> &str {
        &self.note
    }

    /// Gets the octave.
    pub fn octave(&self) -> i32 {
        self.octave
    }

    /// Gets the file reference.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Parses the note spelling and builds the catalogue descriptor.
    pub fn to_descriptor(&self) -> Result<SampleDescriptor, ConfigError> {
        let pitch = PitchClass::from_name(&self.note)?;
        Ok(SampleDescriptor::new(pitch, self.octave, self.file.clone()))
    }
}

/// A YAML representation of the sample library: instrument name to
/// ordered sample bank.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LibraryConfig {
    #[serde(flatten)]
    instruments: HashMap<String, Vec<SampleEntry>>,
}

impl LibraryConfig {
    /// Parses a sample library from a YAML file.
    pub fn deserialize(path: &Path) -> Result<LibraryConfig, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<LibraryConfig>()?)
    }

    /// Parses a sample library from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<LibraryConfig, serde_yml::Error> {
        serde_yml::from_str(yaml)
    }

    /// Gets the raw instrument banks.
    pub fn instruments(&self) -> &HashMap<String, Vec<SampleEntry>> {
        &self.instruments
    }

    /// Builds the typed catalogue, normalizing flat spellings along
    /// the way.
    pub fn to_library(&self) -> Result<SampleLibrary, ConfigError> {
        let mut library = SampleLibrary::new();
        for (instrument, entries) in &self.instruments {
            let bank = entries
                .iter()
                .map(SampleEntry::to_descriptor)
                .collect::<Result<Vec<_>, _>>()?;
            library.insert(instrument.clone(), bank);
        }
        Ok(library)
    }
}
