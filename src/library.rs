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

//! The sample catalogue and nearest-sample resolution.

use std::collections::HashMap;

use tracing::debug;

use crate::note::{note_distance, Note, PitchClass};

/// Errors from catalogue lookups.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LibraryError {
    /// The instrument is unknown or has an empty sample bank.
    #[error("no samples for instrument {0:?}")]
    NoSamplesForInstrument(String),
}

/// A recorded sample: the note it was recorded at and where its audio
/// lives.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleDescriptor {
    pitch: PitchClass,
    octave: i32,
    file: String,
}

impl SampleDescriptor {
    /// Creates a new sample descriptor.
    pub fn new(pitch: PitchClass, octave: i32, file: impl Into<String>) -> SampleDescriptor {
        SampleDescriptor {
            pitch,
            octave,
            file: file.into(),
        }
    }

    /// The note this sample was recorded at.
    pub fn note(&self) -> Note {
        Note::new(self.pitch, self.octave)
    }

    /// The path or URL of the recording.
    pub fn file(&self) -> &str {
        &self.file
    }
}

/// The nearest recorded sample to a request, along with the signed
/// semitone distance from the request to the sample. The distance is
/// the pitch-shift amount playback will apply.
#[derive(Clone, Debug, PartialEq)]
pub struct NearestSample {
    /// The selected catalogue entry.
    pub descriptor: SampleDescriptor,
    /// Signed semitones from the request to the recording.
    pub distance: i32,
}

/// Read-only catalogue mapping instrument names to ordered sample
/// banks.
#[derive(Clone, Debug, Default)]
pub struct SampleLibrary {
    banks: HashMap<String, Vec<SampleDescriptor>>,
}

impl SampleLibrary {
    /// Creates an empty library.
    pub fn new() -> SampleLibrary {
        SampleLibrary::default()
    }

    /// Registers an instrument's sample bank. Bank order matters: it
    /// breaks distance ties during resolution.
    pub fn insert(&mut self, instrument: impl Into<String>, bank: Vec<SampleDescriptor>) {
        self.banks.insert(instrument.into(), bank);
    }

    /// The sample bank for an instrument.
    pub fn bank(&self, instrument: &str) -> Option<&[SampleDescriptor]> {
        self.banks.get(instrument).map(Vec::as_slice)
    }

    /// Picks the bank entry with the smallest absolute semitone
    /// distance to the requested note. When two entries are
    /// equidistant, the one earlier in the bank wins.
    pub fn nearest(&self, instrument: &str, note: Note) -> Result<NearestSample, LibraryError> {
        let bank = self
            .banks
            .get(instrument)
            .filter(|bank| !bank.is_empty())
            .ok_or_else(|| LibraryError::NoSamplesForInstrument(instrument.to_string()))?;

        // Stable sort preserves bank order among equidistant entries.
        let mut sorted: Vec<&SampleDescriptor> = bank.iter().collect();
        sorted.sort_by_key(|descriptor| note_distance(note, descriptor.note()).abs());

        let descriptor = sorted[0].clone();
        let distance = note_distance(note, descriptor.note());
        debug!(
            instrument,
            sample = descriptor.file(),
            distance,
            "Resolved nearest sample"
        );

        Ok(NearestSample {
            descriptor,
            distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library_with(bank: Vec<SampleDescriptor>) -> SampleLibrary {
        let mut library = SampleLibrary::new();
        library.insert("piano", bank);
        library
    }

    #[test]
    fn test_nearest_picks_smallest_absolute_distance() {
        let library = library_with(vec![
            SampleDescriptor::new(PitchClass::C, 3, "c3.wav"),
            SampleDescriptor::new(PitchClass::C, 4, "c4.wav"),
        ]);

        // A3 is 9 semitones above C3 but only 3 below C4.
        let nearest = library
            .nearest("piano", Note::new(PitchClass::A, 3))
            .unwrap();
        assert_eq!(nearest.descriptor.file(), "c4.wav");
        assert_eq!(nearest.distance, -3);
    }

    #[test]
    fn test_nearest_exact_match() {
        let library = library_with(vec![
            SampleDescriptor::new(PitchClass::C, 3, "c3.wav"),
            SampleDescriptor::new(PitchClass::G, 3, "g3.wav"),
        ]);

        let nearest = library
            .nearest("piano", Note::new(PitchClass::G, 3))
            .unwrap();
        assert_eq!(nearest.descriptor.file(), "g3.wav");
        assert_eq!(nearest.distance, 0);
    }

    #[test]
    fn test_nearest_tie_keeps_bank_order() {
        // D4 sits exactly one semitone from both entries; the earlier
        // bank entry must win.
        let library = library_with(vec![
            SampleDescriptor::new(PitchClass::DSharp, 4, "ds4.wav"),
            SampleDescriptor::new(PitchClass::CSharp, 4, "cs4.wav"),
        ]);

        let nearest = library
            .nearest("piano", Note::new(PitchClass::D, 4))
            .unwrap();
        assert_eq!(nearest.descriptor.file(), "ds4.wav");
        assert_eq!(nearest.distance, -1);

        // Reversed bank, reversed winner.
        let library = library_with(vec![
            SampleDescriptor::new(PitchClass::CSharp, 4, "cs4.wav"),
            SampleDescriptor::new(PitchClass::DSharp, 4, "ds4.wav"),
        ]);

        let nearest = library
            .nearest("piano", Note::new(PitchClass::D, 4))
            .unwrap();
        assert_eq!(nearest.descriptor.file(), "cs4.wav");
        assert_eq!(nearest.distance, 1);
    }

    #[test]
    fn test_missing_and_empty_instruments() {
        let library = library_with(vec![]);
        let note = Note::new(PitchClass::C, 4);

        assert_eq!(
            library.nearest("piano", note),
            Err(LibraryError::NoSamplesForInstrument("piano".to_string()))
        );
        assert_eq!(
            library.nearest("cello", note),
            Err(LibraryError::NoSamplesForInstrument("cello".to_string()))
        );
    }
}
