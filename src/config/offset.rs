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
use serde::Deserialize;

use crate::offset::OffsetSpec;

/// The loosely-typed offset object accepted at the playback boundary.
///
/// With an array, `offset` is an index into it (rounded and clamped),
/// or random when `random` is set. Without one, `offset` and
/// `duration` are literal seconds. Validation into [`OffsetSpec`]
/// happens here, before anything reaches playback.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct OffsetConfig {
    array: Option<Vec<f64>>,
    random: Option<bool>,
    offset: Option<f64>,
    duration: Option<f64>,
}

impl OffsetConfig {
    /// An explicit offset/duration pair in seconds.
    pub fn explicit(offset: f64, duration: f64) -> OffsetConfig {
        OffsetConfig {
            offset: Some(offset),
            duration: Some(duration),
            ..OffsetConfig::default()
        }
    }

    /// An index into an offset array.
    pub fn indexed(array: Vec<f64>, index: f64) -> OffsetConfig {
        OffsetConfig {
            array: Some(array),
            offset: Some(index),
            ..OffsetConfig::default()
        }
    }

    /// A random pick from an offset array. Without an array, the
    /// clip's own offsets are used at playback time.
    pub fn random(array: Option<Vec<f64>>) -> OffsetConfig {
        OffsetConfig {
            array,
            random: Some(true),
            ..OffsetConfig::default()
        }
    }

    /// Builds the validated spec. `clip_offsets` supplies the array
    /// for a random pick when the object does not carry one.
    pub fn to_spec(&self, clip_offsets: Option<&[f64]>) -> OffsetSpec {
        let random = self.random.unwrap_or(false);
        let array = self.array.clone().or_else(|| {
            if random {
                clip_offsets.map(<[f64]>::to_vec)
            } else {
                None
            }
        });

        match array {
            Some(array) if random => OffsetSpec::Random { array },
            Some(array) => {
                let index = self.offset.unwrap_or(0.0).round().max(0.0) as usize;
                OffsetSpec::ArrayIndexed { array, index }
            }
            None => OffsetSpec::Explicit {
                offset: self.offset.unwrap_or(0.0),
                duration: self.duration.unwrap_or(0.0),
            },
        }
    }
}
