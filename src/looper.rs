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

//! Fixed-period playback loops.
//!
//! A loop fires its playback immediately and then on every tick of a
//! fixed-period timer. Iterations are fire-and-forget: a clip longer
//! than the period overlaps the next one, it does not delay it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::audio::Destination;
use crate::offset::OffsetSpec;
use crate::playback::Player;
use crate::playsync::CancelHandle;

/// A running loop. Dropping the handle leaves the loop running;
/// cancelling stops it before its next tick.
pub struct LoopHandle {
    cancel: CancelHandle,
    join: JoinHandle<()>,
}

impl LoopHandle {
    /// Requests the loop stop before its next iteration.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The cancel handle, for sharing.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancels the loop and waits for its task to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.join.await {
            warn!(error = %err, "Loop task did not shut down cleanly");
        }
    }
}

/// Plays the nearest sample for an instrument/note immediately and
/// then every `period`, each playback scheduled `delay` from its tick.
pub fn start_sample_loop(
    player: Arc<Player>,
    instrument: impl Into<String>,
    note_token: impl Into<String>,
    destination: Destination,
    period: Duration,
    delay: Duration,
) -> LoopHandle {
    let instrument = instrument.into();
    let note_token = note_token.into();
    debug!(
        instrument = instrument.as_str(),
        note = note_token.as_str(),
        period_ms = period.as_millis() as u64,
        "Starting sample loop"
    );

    let cancel = CancelHandle::new();
    let join = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticks.tick() => {}
                }

                let player = player.clone();
                let instrument = instrument.clone();
                let note_token = note_token.clone();
                let destination = destination.clone();
                tokio::spawn(async move {
                    match player
                        .play_sample(&instrument, &note_token, &destination, delay)
                        .await
                    {
                        Ok(completion) => {
                            let _ = completion.await;
                        }
                        Err(err) => warn!(
                            instrument = instrument.as_str(),
                            note = note_token.as_str(),
                            error = %err,
                            "Loop playback failed"
                        ),
                    }
                });
            }
            debug!("Sample loop cancelled");
        })
    };

    LoopHandle { cancel, join }
}

/// Plays a registered clip immediately and then every `period`, with
/// the given pitch distance and offset specification. The spec is
/// re-resolved on every iteration, so a random spec varies per pass.
pub fn start_clip_loop(
    player: Arc<Player>,
    clip: impl Into<String>,
    distance: i32,
    destination: Destination,
    spec: OffsetSpec,
    period: Duration,
    delay: Duration,
) -> LoopHandle {
    let clip = clip.into();
    debug!(
        clip = clip.as_str(),
        distance,
        period_ms = period.as_millis() as u64,
        "Starting clip loop"
    );

    let cancel = CancelHandle::new();
    let join = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticks.tick() => {}
                }

                let player = player.clone();
                let clip = clip.clone();
                let destination = destination.clone();
                let spec = spec.clone();
                tokio::spawn(async move {
                    if let Err(err) = player
                        .play_clip_at_offset(&clip, distance, &destination, &spec, delay)
                        .await
                    {
                        warn!(clip = clip.as_str(), error = %err, "Loop playback failed");
                    }
                });
            }
            debug!("Clip loop cancelled");
        })
    };

    LoopHandle { cancel, join }
}
