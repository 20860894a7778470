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

//! Note names, chromatic values, and semitone distances.

use std::fmt;
use std::str::FromStr;

/// Errors from note name and token parsing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NoteError {
    /// The token does not match `<A-G>[b|#]?<digit>`.
    #[error("invalid note token {0:?}")]
    InvalidNoteToken(String),
}

/// One of the twelve chromatic pitch classes.
///
/// Flat spellings are accepted on parse and normalized to sharps.
/// Equality and ordering go through the chromatic index, never the
/// spelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// The index in the chromatic scale, starting at C.
    pub fn chromatic_index(self) -> i32 {
        match self {
            PitchClass::C => 0,
            PitchClass::CSharp => 1,
            PitchClass::D => 2,
            PitchClass::DSharp => 3,
            PitchClass::E => 4,
            PitchClass::F => 5,
            PitchClass::FSharp => 6,
            PitchClass::G => 7,
            PitchClass::GSharp => 8,
            PitchClass::A => 9,
            PitchClass::ASharp => 10,
            PitchClass::B => 11,
        }
    }

    /// Parses a note name, normalizing the flat spellings (Bb, Db, Eb,
    /// Gb, Ab) to their sharp equivalents.
    pub fn from_name(name: &str) -> Result<PitchClass, NoteError> {
        Ok(match name {
            "C" => PitchClass::C,
            "C#" | "Db" => PitchClass::CSharp,
            "D" => PitchClass::D,
            "D#" | "Eb" => PitchClass::DSharp,
            "E" => PitchClass::E,
            "F" => PitchClass::F,
            "F#" | "Gb" => PitchClass::FSharp,
            "G" => PitchClass::G,
            "G#" | "Ab" => PitchClass::GSharp,
            "A" => PitchClass::A,
            "A#" | "Bb" => PitchClass::ASharp,
            "B" => PitchClass::B,
            _ => return Err(NoteError::InvalidNoteToken(name.to_string())),
        })
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        };
        write!(f, "{}", name)
    }
}

/// A pitch class with its octave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Note {
    /// The pitch class.
    pub pitch: PitchClass,
    /// The octave the pitch class sits in.
    pub octave: i32,
}

impl Note {
    /// Creates a new note.
    pub fn new(pitch: PitchClass, octave: i32) -> Note {
        Note { pitch, octave }
    }

    /// The absolute chromatic value of this note.
    pub fn value(&self) -> i32 {
        note_value(self.pitch, self.octave)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch, self.octave)
    }
}

impl FromStr for Note {
    type Err = NoteError;

    /// Parses a note/octave token such as `C4`, `F#2`, or `Bb3`.
    fn from_str(s: &str) -> Result<Note, NoteError> {
        let invalid = || NoteError::InvalidNoteToken(s.to_string());

        if !s.is_ascii() || s.len() < 2 || s.len() > 3 {
            return Err(invalid());
        }

        let (name, octave) = s.split_at(s.len() - 1);
        if !octave.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let octave = octave.parse::<i32>().map_err(|_| invalid())?;
        let pitch = PitchClass::from_name(name).map_err(|_| invalid())?;

        Ok(Note { pitch, octave })
    }
}

/// The absolute chromatic value `octave * 12 + chromatic index`.
pub fn note_value(pitch: PitchClass, octave: i32) -> i32 {
    octave * 12 + pitch.chromatic_index()
}

/// Signed semitone distance from `a` to `b`. Positive when `a` sits
/// above `b`.
pub fn note_distance(a: Note, b: Note) -> i32 {
    a.value() - b.value()
}
