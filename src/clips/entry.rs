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

//! Clip table entries and their fetch lifecycle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::cache::ClipLoad;
use crate::audio::DecodedBuffer;

/// The observable fetch lifecycle of a clip.
///
/// Transitions are monotonic (`NotStarted → InProgress → Complete`)
/// with one exception: a failed load resets the entry to `NotStarted`
/// so it can be retried.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum FetchPhase {
    /// No load has been requested yet.
    #[default]
    #[serde(rename = "notStarted")]
    NotStarted,
    /// Exactly one load is running.
    #[serde(rename = "inProgress")]
    InProgress,
    /// The decoded buffer is cached.
    #[serde(rename = "Complete")]
    Complete,
}

/// Internal fetch state of a clip entry.
pub(crate) enum FetchState {
    NotStarted,
    /// All requesters share the single running load's future.
    InProgress(ClipLoad),
    /// The canonical decoded buffer.
    Complete(Arc<DecodedBuffer>),
}

impl FetchState {
    pub(crate) fn phase(&self) -> FetchPhase {
        match self {
            FetchState::NotStarted => FetchPhase::NotStarted,
            FetchState::InProgress(_) => FetchPhase::InProgress,
            FetchState::Complete(_) => FetchPhase::Complete,
        }
    }
}

/// One clip in the table.
pub(crate) struct ClipEntry {
    pub(crate) name: String,
    pub(crate) file: String,
    pub(crate) offsets: Option<Vec<f64>>,
    pub(crate) state: FetchState,
}

impl ClipEntry {
    pub(crate) fn snapshot(&self) -> ClipSnapshot {
        ClipSnapshot {
            name: self.name.clone(),
            file: self.file.clone(),
            fetched: self.state.phase(),
            clip_offsets: self.offsets.clone(),
        }
    }
}

/// A caller-facing view of a clip entry, matching the external clip
/// data object shape.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipSnapshot {
    /// The clip's name (its table key).
    pub name: String,
    /// The path or URL of the clip's audio.
    pub file: String,
    /// Where the clip sits in its fetch lifecycle.
    pub fetched: FetchPhase,
    /// Offset positions within the clip, in seconds.
    pub clip_offsets: Option<Vec<f64>>,
}
