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

//! Flexible offset specifications for clip playback.

use rand::Rng;

/// How to choose the playback offset and duration within a clip.
#[derive(Clone, Debug, PartialEq)]
pub enum OffsetSpec {
    /// Play from `offset` for `duration` seconds. A negative duration
    /// is treated as zero (play to the end).
    Explicit { offset: f64, duration: f64 },
    /// Use `array[index]` as the offset and the gap to the following
    /// element as the duration. The index is clamped to the array
    /// bounds; the last element plays to the end of the clip.
    ArrayIndexed { array: Vec<f64>, index: usize },
    /// `ArrayIndexed` with a uniformly chosen index.
    Random { array: Vec<f64> },
}

/// A concrete offset/duration pair. A zero duration means play to the
/// natural end of the clip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedOffset {
    /// Offset into the clip, in seconds.
    pub offset: f64,
    /// Playback length in seconds, zero for "to the end".
    pub duration: f64,
}

/// Resolves a spec, drawing random indices from the thread RNG.
pub fn resolve(spec: &OffsetSpec) -> ResolvedOffset {
    resolve_with_rng(spec, &mut rand::thread_rng())
}

/// Resolves a spec with a caller-supplied RNG. Pure apart from the RNG
/// draw, so tests can seed it.
pub fn resolve_with_rng<R: Rng + ?Sized>(spec: &OffsetSpec, rng: &mut R) -> ResolvedOffset {
    match spec {
        OffsetSpec::Explicit { offset, duration } => ResolvedOffset {
            offset: *offset,
            duration: duration.max(0.0),
        },
        OffsetSpec::Random { array } => {
            if array.is_empty() {
                return ResolvedOffset {
                    offset: 0.0,
                    duration: 0.0,
                };
            }
            indexed(array, rng.gen_range(0..array.len()))
        }
        OffsetSpec::ArrayIndexed { array, index } => {
            if array.is_empty() {
                return ResolvedOffset {
                    offset: 0.0,
                    duration: 0.0,
                };
            }
            indexed(array, *index)
        }
    }
}

fn indexed(array: &[f64], index: usize) -> ResolvedOffset {
    let last = array.len() - 1;
    if index < last {
        ResolvedOffset {
            offset: array[index],
            duration: array[index + 1] - array[index],
        }
    } else {
        // Last element, or an index past the end: play from the
        // clamped offset to the end of the clip.
        ResolvedOffset {
            offset: array[last],
            duration: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_explicit() {
        let resolved = resolve(&OffsetSpec::Explicit {
            offset: 1.5,
            duration: 0.25,
        });
        assert_eq!(
            resolved,
            ResolvedOffset {
                offset: 1.5,
                duration: 0.25
            }
        );
    }

    #[test]
    fn test_explicit_negative_duration_clamps_to_zero() {
        let resolved = resolve(&OffsetSpec::Explicit {
            offset: 2.0,
            duration: -1.0,
        });
        assert_eq!(
            resolved,
            ResolvedOffset {
                offset: 2.0,
                duration: 0.0
            }
        );
    }

    #[test]
    fn test_array_indexed() {
        let array = vec![0.0, 1.0, 2.0, 5.0];

        // An interior index plays up to the next offset.
        let resolved = resolve(&OffsetSpec::ArrayIndexed {
            array: array.clone(),
            index: 1,
        });
        assert_eq!(
            resolved,
            ResolvedOffset {
                offset: 1.0,
                duration: 1.0
            }
        );

        // The last index plays to the end.
        let resolved = resolve(&OffsetSpec::ArrayIndexed {
            array: array.clone(),
            index: 3,
        });
        assert_eq!(
            resolved,
            ResolvedOffset {
                offset: 5.0,
                duration: 0.0
            }
        );

        // Out-of-range indices clamp to the last element.
        let resolved = resolve(&OffsetSpec::ArrayIndexed { array, index: 10 });
        assert_eq!(
            resolved,
            ResolvedOffset {
                offset: 5.0,
                duration: 0.0
            }
        );
    }

    #[test]
    fn test_random_lands_on_array_values() {
        let array = vec![0.0, 1.0, 2.0, 5.0];
        let spec = OffsetSpec::Random {
            array: array.clone(),
        };
        let mut rng = StdRng::seed_from_u64(17);

        for _ in 0..100 {
            let resolved = resolve_with_rng(&spec, &mut rng);
            let index = array
                .iter()
                .position(|offset| *offset == resolved.offset)
                .expect("offset must come from the array");
            if index < array.len() - 1 {
                assert_eq!(resolved.duration, array[index + 1] - array[index]);
            } else {
                assert_eq!(resolved.duration, 0.0);
            }
        }
    }

    #[test]
    fn test_empty_arrays_play_whole_clip() {
        let whole = ResolvedOffset {
            offset: 0.0,
            duration: 0.0,
        };
        assert_eq!(
            resolve(&OffsetSpec::ArrayIndexed {
                array: vec![],
                index: 2
            }),
            whole
        );
        assert_eq!(resolve(&OffsetSpec::Random { array: vec![] }), whole);
    }
}
