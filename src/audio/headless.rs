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

//! A headless audio context: real decoding, simulated output.
//!
//! Playback emits no audio; completion fires after the wall-clock time
//! the clip would have taken at the requested rate. This is the
//! context to use when running without an output device attached.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use super::{decode, DecodeError, DecodedBuffer, Destination, PlaybackError, Sink, StartParams};

/// Headless platform context. Must be driven from within a tokio
/// runtime: completions are delivered by spawned timer tasks.
pub struct Context {
    sink: Arc<Sink>,
}

impl Context {
    /// Creates a headless context with a single output sink.
    pub fn new() -> Arc<Context> {
        Arc::new(Context {
            sink: Sink::new("headless-output"),
        })
    }
}

impl super::Context for Context {
    fn decode(&self, bytes: &[u8]) -> Result<Arc<DecodedBuffer>, DecodeError> {
        decode::decode_bytes(bytes)
    }

    fn destination(&self) -> Destination {
        Destination::to_sink(&self.sink)
    }

    fn start(&self, params: StartParams) -> Result<oneshot::Receiver<()>, PlaybackError> {
        let sink = params
            .destination
            .sink()
            .ok_or(PlaybackError::InvalidDestination)?;

        let natural = params.buffer.duration().as_secs_f64();
        let portion = match params.duration {
            Some(duration) => duration,
            None => natural - params.offset,
        }
        .max(0.0);
        let wall = if params.rate > 0.0 {
            portion / params.rate
        } else {
            0.0
        };

        debug!(
            sink = sink.label(),
            rate = params.rate,
            offset = params.offset,
            seconds = wall,
            "Starting headless playback"
        );

        let (sender, receiver) = oneshot::channel();
        let delay = params.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay + Duration::from_secs_f64(wall)).await;
            let _ = sender.send(());
        });
        Ok(receiver)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::super::Context as _;
    use super::*;
    use crate::testutil;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_completion_timing_tracks_clip_length() {
        let context = Context::new();

        // 0.1 seconds of mono audio at 44.1kHz.
        let buffer = Arc::new(DecodedBuffer::new(vec![0.0; 4410], 1, 44_100));

        let started = Instant::now();
        let receiver = context
            .start(StartParams {
                buffer,
                destination: context.destination(),
                rate: 1.0,
                offset: 0.0,
                duration: None,
                delay: Duration::ZERO,
            })
            .unwrap();
        receiver.await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(95), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(2), "{:?}", elapsed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_double_rate_halves_playback_time() {
        let context = Context::new();

        // 0.2 seconds of audio played at rate 2.0 takes 0.1 seconds.
        let buffer = Arc::new(DecodedBuffer::new(vec![0.0; 8820], 1, 44_100));

        let started = Instant::now();
        let receiver = context
            .start(StartParams {
                buffer,
                destination: context.destination(),
                rate: 2.0,
                offset: 0.0,
                duration: None,
                delay: Duration::ZERO,
            })
            .unwrap();
        receiver.await.unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(95), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(190), "{:?}", elapsed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rejects_dead_destination() {
        let context = Context::new();
        let result = context.start(StartParams {
            buffer: Arc::new(DecodedBuffer::new(vec![0.0; 8], 1, 44_100)),
            destination: Destination::detached(),
            rate: 1.0,
            offset: 0.0,
            duration: None,
            delay: Duration::ZERO,
        });
        assert!(matches!(result, Err(PlaybackError::InvalidDestination)));
    }

    #[test]
    fn test_decodes_real_audio() {
        let samples: Vec<f32> = vec![0.25; 1000];
        let bytes = testutil::wav_bytes(&samples, 1, 44_100);

        let context = Context::new();
        let buffer = context.decode(&bytes).unwrap();
        assert_eq!(buffer.sample_rate(), 44_100);
        assert_eq!(buffer.channel_count(), 1);
    }
}
