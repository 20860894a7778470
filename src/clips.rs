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

//! Deduplicated clip fetching and caching.
//!
//! This module provides:
//! - The process-wide clip table, one entry per named clip
//! - The fetch state machine guaranteeing at most one in-flight load
//!   per clip, with the result fanned out to every concurrent caller
//! - Note-resolved sample lookups feeding the playback scheduler

mod cache;
mod entry;

pub use cache::{
    ClipLoad, DecodedAudio, FetchedClips, LoadCause, ResolveError, ResolvedSample, SampleCache,
    SampleLoadError,
};
pub use entry::{ClipSnapshot, FetchPhase};
