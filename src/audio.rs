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

//! The platform audio collaborator: decoded buffers, output
//! destinations, and the context that turns bytes into buffers and
//! buffers into scheduled output.
//!
//! The context is process-wide in spirit but injected as a dependency,
//! so tests can substitute the mock.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::oneshot;

pub mod decode;
pub mod headless;
pub mod mock;

/// Errors from decoding raw bytes into PCM.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The underlying codec rejected the stream.
    #[error("audio decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    /// The container held no decodable audio track.
    #[error("no decodable audio track found")]
    NoAudioTrack,

    /// Decoding succeeded but produced no samples.
    #[error("decoded stream was empty")]
    EmptyStream,

    /// The decoder failed for another reason.
    #[error("decode failed: {0}")]
    Failed(String),
}

/// Errors from playback scheduling.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlaybackError {
    /// The destination handle no longer refers to a live sink.
    #[error("invalid playback destination")]
    InvalidDestination,

    /// The context dropped the completion signal without finishing.
    #[error("audio context closed before playback completed")]
    ContextClosed,
}

/// In-memory PCM audio: interleaved f32 samples plus format data.
///
/// The cache owns the canonical copy behind an `Arc`; every requester
/// shares it by reference, never by copy.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedBuffer {
    samples: Vec<f32>,
    channel_count: u16,
    sample_rate: u32,
}

impl DecodedBuffer {
    /// Creates a buffer from interleaved samples.
    pub fn new(samples: Vec<f32>, channel_count: u16, sample_rate: u32) -> DecodedBuffer {
        DecodedBuffer {
            samples,
            channel_count,
            sample_rate,
        }
    }

    /// The interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// The number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// The sample rate of the audio data.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The natural playback length at rate 1.0.
    pub fn duration(&self) -> Duration {
        if self.channel_count == 0 || self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() as f64 / self.channel_count as f64;
        Duration::from_secs_f64(frames / self.sample_rate as f64)
    }
}

/// An output sink owned by an audio context. Destinations hold weak
/// references to it; once the context drops the sink, its handles go
/// invalid.
#[derive(Debug)]
pub struct Sink {
    label: String,
}

impl Sink {
    /// Creates a new sink.
    pub fn new(label: impl Into<String>) -> Arc<Sink> {
        Arc::new(Sink {
            label: label.into(),
        })
    }

    /// The sink's display label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// An opaque handle to an output sink. Cheap to clone; validity is
/// checked at scheduling time.
#[derive(Clone, Debug)]
pub struct Destination {
    sink: Weak<Sink>,
}

impl Destination {
    /// Creates a handle to the given sink.
    pub fn to_sink(sink: &Arc<Sink>) -> Destination {
        Destination {
            sink: Arc::downgrade(sink),
        }
    }

    /// A handle that refers to no sink. Always invalid; exists so
    /// rejection paths can be exercised.
    pub fn detached() -> Destination {
        Destination { sink: Weak::new() }
    }

    /// The sink, if it is still alive.
    pub fn sink(&self) -> Option<Arc<Sink>> {
        self.sink.upgrade()
    }

    /// Whether the handle still refers to a live sink.
    pub fn is_attached(&self) -> bool {
        self.sink.strong_count() > 0
    }
}

/// Everything a context needs to begin output.
#[derive(Clone, Debug)]
pub struct StartParams {
    /// The decoded audio to play.
    pub buffer: Arc<DecodedBuffer>,
    /// Where the playback connects.
    pub destination: Destination,
    /// Playback rate multiplier (1.0 plays at the recorded pitch).
    pub rate: f64,
    /// Offset into the clip, in seconds.
    pub offset: f64,
    /// Playback length in seconds. `None` plays to the natural end.
    pub duration: Option<f64>,
    /// Delay before output begins.
    pub delay: Duration,
}

/// The platform audio context.
pub trait Context: Send + Sync {
    /// Decodes raw bytes into a shareable PCM buffer.
    fn decode(&self, bytes: &[u8]) -> Result<Arc<DecodedBuffer>, DecodeError>;

    /// The context's default output destination.
    fn destination(&self) -> Destination;

    /// Begins output. The returned receiver fires exactly once, when
    /// playback ends.
    fn start(&self, params: StartParams) -> Result<oneshot::Receiver<()>, PlaybackError>;
}
