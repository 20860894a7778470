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

//! A mock audio context: canned decoding, recorded starts, and
//! controllable completion.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::{DecodeError, DecodedBuffer, Destination, PlaybackError, Sink, StartParams};

/// How the mock completes playbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Completion fires as soon as the playback starts.
    Immediate,
    /// Completion fires only when the test calls
    /// [`Context::finish_all`].
    Manual,
}

/// Mock context. Decoding maps each byte to one mono sample, so
/// distinct payloads yield distinct buffers without real audio data.
pub struct Context {
    sink: Arc<Sink>,
    completion: Completion,
    started: Mutex<Vec<StartParams>>,
    pending: Mutex<Vec<oneshot::Sender<()>>>,
    decode_failures: Mutex<usize>,
    decodes: AtomicUsize,
}

impl Context {
    /// Creates a mock context with the given completion mode.
    pub fn new(completion: Completion) -> Arc<Context> {
        Arc::new(Context {
            sink: Sink::new("mock-output"),
            completion,
            started: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            decode_failures: Mutex::new(0),
            decodes: AtomicUsize::new(0),
        })
    }

    /// Makes the next `count` decodes fail.
    pub fn fail_decodes(&self, count: usize) {
        *self.decode_failures.lock() = count;
    }

    /// The number of decode calls so far, failures included.
    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    /// Parameters of every playback started so far.
    pub fn started(&self) -> Vec<StartParams> {
        self.started.lock().clone()
    }

    /// Completes every pending manual playback.
    pub fn finish_all(&self) {
        for sender in self.pending.lock().drain(..) {
            let _ = sender.send(());
        }
    }
}

impl super::Context for Context {
    fn decode(&self, bytes: &[u8]) -> Result<Arc<DecodedBuffer>, DecodeError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);

        {
            let mut failures = self.decode_failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(DecodeError::Failed("mock decode failure".to_string()));
            }
        }

        let samples = bytes.iter().map(|byte| *byte as f32 / 255.0).collect();
        Ok(Arc::new(DecodedBuffer::new(samples, 1, 44_100)))
    }

    fn destination(&self) -> Destination {
        Destination::to_sink(&self.sink)
    }

    fn start(&self, params: StartParams) -> Result<oneshot::Receiver<()>, PlaybackError> {
        if !params.destination.is_attached() {
            return Err(PlaybackError::InvalidDestination);
        }

        let (sender, receiver) = oneshot::channel();
        self.started.lock().push(params);
        match self.completion {
            Completion::Immediate => {
                let _ = sender.send(());
            }
            Completion::Manual => self.pending.lock().push(sender),
        }
        Ok(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::super::Context as _;
    use super::*;

    #[test]
    fn test_mock_decode() {
        let context = Context::new(Completion::Immediate);
        let buffer = context.decode(&[0, 255]).unwrap();
        assert_eq!(buffer.samples().len(), 2);
        assert_eq!(buffer.samples()[0], 0.0);
        assert_eq!(buffer.samples()[1], 1.0);
        assert_eq!(context.decode_count(), 1);

        context.fail_decodes(1);
        assert!(context.decode(&[1]).is_err());
        assert!(context.decode(&[1]).is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mock_completion_modes() {
        let buffer = Arc::new(DecodedBuffer::new(vec![0.0; 8], 1, 44_100));

        let immediate = Context::new(Completion::Immediate);
        let receiver = immediate
            .start(StartParams {
                buffer: buffer.clone(),
                destination: immediate.destination(),
                rate: 1.0,
                offset: 0.0,
                duration: None,
                delay: std::time::Duration::ZERO,
            })
            .unwrap();
        receiver.await.unwrap();

        let manual = Context::new(Completion::Manual);
        let receiver = manual
            .start(StartParams {
                buffer,
                destination: manual.destination(),
                rate: 1.0,
                offset: 0.0,
                duration: None,
                delay: std::time::Duration::ZERO,
            })
            .unwrap();
        manual.finish_all();
        receiver.await.unwrap();
        assert_eq!(manual.started().len(), 1);
    }

    #[test]
    fn test_mock_rejects_detached_destination() {
        let context = Context::new(Completion::Immediate);
        let result = context.start(StartParams {
            buffer: Arc::new(DecodedBuffer::new(Vec::new(), 1, 44_100)),
            destination: Destination::detached(),
            rate: 1.0,
            offset: 0.0,
            duration: None,
            delay: std::time::Duration::ZERO,
        });
        assert_eq!(result.unwrap_err(), PlaybackError::InvalidDestination);
    }
}
