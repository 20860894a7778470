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

//! Playback scheduling: pitch-shifted, offset, delayed clip output.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::audio::{Context, DecodedBuffer, Destination, PlaybackError, StartParams};
use crate::clips::{ResolveError, SampleCache, SampleLoadError};
use crate::config::offset::OffsetConfig;
use crate::offset::{self, OffsetSpec, ResolvedOffset};

/// Errors from playback entry points.
#[derive(Debug, thiserror::Error)]
pub enum PlayError {
    /// Resolving the instrument/note to a sample failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Loading the clip failed.
    #[error(transparent)]
    Load(#[from] SampleLoadError),

    /// Scheduling the playback failed.
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

/// A scheduled playback: the shared buffer it plays, where it
/// connects, and the concrete parameters it started with. Handed back
/// when the platform signals end of playback so callers can chain
/// follow-up actions.
#[derive(Clone, Debug)]
pub struct PlaybackUnit {
    /// The decoded audio being played.
    pub buffer: Arc<DecodedBuffer>,
    /// The sink the playback connected to.
    pub destination: Destination,
    /// The applied playback rate.
    pub rate: f64,
    /// Offset into the clip, in seconds.
    pub offset: f64,
    /// Playback length in seconds; `None` played to the natural end.
    pub duration: Option<f64>,
}

/// The playback rate that shifts a recording by the given number of
/// semitones under equal temperament.
pub fn playback_rate(distance: i32) -> f64 {
    2f64.powf(distance as f64 / 12.0)
}

/// Schedules decoded buffers for playback against an audio context.
pub struct Player {
    context: Arc<dyn Context>,
    cache: Arc<SampleCache>,
}

impl Player {
    /// Creates a new player.
    pub fn new(context: Arc<dyn Context>, cache: Arc<SampleCache>) -> Player {
        Player { context, cache }
    }

    /// The cache this player draws clips from.
    pub fn cache(&self) -> &Arc<SampleCache> {
        &self.cache
    }

    /// The context's default output destination.
    pub fn destination(&self) -> Destination {
        self.context.destination()
    }

    /// Schedules a buffer for playback `delay` from now, pitch-shifted
    /// by `distance` semitones. A non-positive `duration` plays from
    /// `offset` to the natural end.
    ///
    /// An invalid destination is rejected synchronously. The returned
    /// future resolves exactly once, when the platform signals end of
    /// playback, carrying the playback unit.
    pub fn schedule(
        &self,
        buffer: Arc<DecodedBuffer>,
        distance: i32,
        destination: &Destination,
        offset: f64,
        duration: f64,
        delay: Duration,
    ) -> Result<impl Future<Output = Result<PlaybackUnit, PlaybackError>>, PlaybackError> {
        if !destination.is_attached() {
            return Err(PlaybackError::InvalidDestination);
        }

        let unit = PlaybackUnit {
            buffer: buffer.clone(),
            destination: destination.clone(),
            rate: playback_rate(distance),
            offset,
            duration: if duration > 0.0 { Some(duration) } else { None },
        };

        let completion = self.context.start(StartParams {
            buffer,
            destination: destination.clone(),
            rate: unit.rate,
            offset,
            duration: unit.duration,
            delay,
        })?;

        debug!(
            rate = unit.rate,
            offset,
            duration = unit.duration,
            delay_ms = delay.as_millis() as u64,
            "Playback scheduled"
        );

        Ok(async move {
            completion
                .await
                .map_err(|_| PlaybackError::ContextClosed)?;
            Ok(unit)
        })
    }

    /// Resolves the nearest sample for an instrument and note token
    /// and plays the whole buffer against the given destination.
    /// Returns the end-of-playback future.
    pub async fn play_sample(
        &self,
        instrument: &str,
        note_token: &str,
        destination: &Destination,
        delay: Duration,
    ) -> Result<impl Future<Output = Result<PlaybackUnit, PlaybackError>>, PlayError> {
        let sample = self.cache.get_sample(instrument, note_token).await?;
        Ok(self.schedule(sample.buffer, sample.distance, destination, 0.0, 0.0, delay)?)
    }

    /// Plays a registered clip with an explicit pitch distance and
    /// offset specification. Resolves when the clip finishes playing.
    pub async fn play_clip_at_offset(
        &self,
        clip: &str,
        distance: i32,
        destination: &Destination,
        spec: &OffsetSpec,
        delay: Duration,
    ) -> Result<PlaybackUnit, PlayError> {
        let buffer = self.cache.ensure_fetched(clip).await?;
        let ResolvedOffset { offset, duration } = offset::resolve(spec);
        let completion = self.schedule(buffer, distance, destination, offset, duration, delay)?;
        Ok(completion.await?)
    }

    /// Plays a clip using the caller-facing offset object, falling
    /// back to the clip's own `clip_offsets` when the object asks for
    /// array semantics without carrying an array.
    pub async fn play_clip(
        &self,
        clip: &str,
        distance: i32,
        destination: &Destination,
        config: &OffsetConfig,
        delay: Duration,
    ) -> Result<PlaybackUnit, PlayError> {
        let offsets = self.cache.clip(clip).and_then(|snapshot| snapshot.clip_offsets);
        let spec = config.to_spec(offsets.as_deref());
        self.play_clip_at_offset(clip, distance, destination, &spec, delay)
            .await
    }
}
