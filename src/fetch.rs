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

//! Byte transport for sample retrieval.
//!
//! Retrieval is a narrow seam: the cache only needs the raw bytes
//! behind a path-or-URL string. The file transport covers on-disk
//! sample libraries; tests use the mock.

use std::fs;

use tracing::debug;

/// Errors from byte retrieval.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Reading the path failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The transport refused to serve the path.
    #[error("transport refused {path}: {reason}")]
    Refused { path: String, reason: String },
}

/// Retrieves the raw bytes behind a path-or-URL string.
/// Implementations may block; the cache drives them from the blocking
/// pool.
pub trait Transport: Send + Sync {
    /// Fetches the raw bytes for the given path.
    fn fetch(&self, path: &str) -> Result<Vec<u8>, TransportError>;
}

/// Reads samples from the local filesystem.
#[derive(Debug, Default)]
pub struct FileTransport;

impl Transport for FileTransport {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, TransportError> {
        let bytes = fs::read(path).map_err(|source| TransportError::Io {
            path: path.to_string(),
            source,
        })?;
        debug!(path, bytes = bytes.len(), "Fetched sample file");
        Ok(bytes)
    }
}

pub mod mock {
    //! A controllable transport for tests: canned payloads, failure
    //! injection, artificial latency, and fetch counting.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::TransportError;

    /// Serves registered payloads, optionally delaying or failing.
    #[derive(Default)]
    pub struct Transport {
        payloads: Mutex<HashMap<String, Vec<u8>>>,
        /// Remaining forced failures per path.
        failures: Mutex<HashMap<String, usize>>,
        delay: Mutex<Option<Duration>>,
        fetches: AtomicUsize,
    }

    impl Transport {
        /// Creates an empty mock transport.
        pub fn new() -> Transport {
            Transport::default()
        }

        /// Registers the payload served for a path.
        pub fn insert(&self, path: impl Into<String>, bytes: Vec<u8>) {
            self.payloads.lock().insert(path.into(), bytes);
        }

        /// Makes the next `count` fetches of `path` fail.
        pub fn fail_next(&self, path: impl Into<String>, count: usize) {
            self.failures.lock().insert(path.into(), count);
        }

        /// Adds an artificial delay to every fetch.
        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock() = Some(delay);
        }

        /// The number of fetches served so far, failures included.
        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl super::Transport for Transport {
        fn fetch(&self, path: &str) -> Result<Vec<u8>, TransportError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);

            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                // Fetches run on the blocking pool, so a thread sleep
                // models transport latency.
                std::thread::sleep(delay);
            }

            {
                let mut failures = self.failures.lock();
                if let Some(remaining) = failures.get_mut(path) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(TransportError::Refused {
                            path: path.to_string(),
                            reason: "mock failure".to_string(),
                        });
                    }
                }
            }

            self.payloads
                .lock()
                .get(path)
                .cloned()
                .ok_or_else(|| TransportError::Refused {
                    path: path.to_string(),
                    reason: "no payload registered".to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_file_transport_reads_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"sample-bytes").unwrap();

        let transport = FileTransport;
        let bytes = transport.fetch(file.path().to_str().unwrap()).unwrap();
        assert_eq!(bytes, b"sample-bytes");
    }

    #[test]
    fn test_file_transport_missing_file() {
        let transport = FileTransport;
        let err = transport.fetch("/definitely/not/here.wav").unwrap_err();
        assert!(matches!(err, TransportError::Io { .. }));
    }

    #[test]
    fn test_mock_transport_counts_and_fails() {
        let transport = mock::Transport::new();
        transport.insert("kick.wav", vec![1, 2, 3]);
        transport.fail_next("kick.wav", 1);

        assert!(transport.fetch("kick.wav").is_err());
        assert_eq!(transport.fetch("kick.wav").unwrap(), vec![1, 2, 3]);
        assert!(transport.fetch("unknown.wav").is_err());
        assert_eq!(transport.fetch_count(), 3);
    }
}
