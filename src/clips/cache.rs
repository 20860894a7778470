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

//! The sample cache: deduplicating fetch/decode and note-resolved
//! sample lookups.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::task;
use tracing::{debug, info, warn};

use super::entry::{ClipEntry, ClipSnapshot, FetchState};
use crate::audio::{Context, DecodeError, DecodedBuffer};
use crate::fetch::{Transport, TransportError};
use crate::library::{LibraryError, SampleLibrary};
use crate::note::{Note, NoteError};

/// The shareable future returned by [`SampleCache::ensure_fetched`].
/// Every concurrent requester of one clip awaits a clone of the same
/// future.
pub type ClipLoad = Shared<BoxFuture<'static, Result<Arc<DecodedBuffer>, SampleLoadError>>>;

/// The underlying cause of a failed clip load.
#[derive(Debug, thiserror::Error)]
pub enum LoadCause {
    /// Retrieving the clip bytes failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Decoding the clip bytes failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The clip is not registered in the table.
    #[error("clip is not registered in the table")]
    UnknownClip,

    /// The background load task died before producing a result.
    #[error("load task failed: {0}")]
    Background(String),
}

/// A clip load failed. Carries the clip name and the underlying
/// cause. Cloneable so a single failure can reject every waiter
/// sharing the in-flight load.
#[derive(Clone, Debug, thiserror::Error)]
#[error("failed to load clip {clip:?}: {cause}")]
pub struct SampleLoadError {
    clip: String,
    cause: Arc<LoadCause>,
}

impl SampleLoadError {
    /// The clip that failed to load.
    pub fn clip(&self) -> &str {
        &self.clip
    }

    /// The underlying cause.
    pub fn cause(&self) -> &LoadCause {
        &self.cause
    }
}

/// Errors from note-resolved sample lookups.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The note/octave token was malformed.
    #[error(transparent)]
    Note(#[from] NoteError),

    /// The instrument has no samples to resolve against.
    #[error(transparent)]
    Library(#[from] LibraryError),

    /// The resolved sample failed to load.
    #[error(transparent)]
    Load(#[from] SampleLoadError),
}

/// Decoded audio for a batch request: a single buffer when exactly
/// one clip was requested, otherwise one buffer per requested name in
/// input order.
#[derive(Clone, Debug)]
pub enum DecodedAudio {
    Single(Arc<DecodedBuffer>),
    Multiple(Vec<Arc<DecodedBuffer>>),
}

impl DecodedAudio {
    /// The single buffer, if the request named exactly one clip.
    pub fn single(&self) -> Option<&Arc<DecodedBuffer>> {
        match self {
            DecodedAudio::Single(buffer) => Some(buffer),
            DecodedAudio::Multiple(_) => None,
        }
    }

    /// All buffers regardless of arity.
    pub fn buffers(&self) -> Vec<Arc<DecodedBuffer>> {
        match self {
            DecodedAudio::Single(buffer) => vec![buffer.clone()],
            DecodedAudio::Multiple(buffers) => buffers.clone(),
        }
    }
}

/// The result of a batch fetch.
#[derive(Clone, Debug)]
pub struct FetchedClips {
    /// Decoded audio, single or per-name.
    pub audio: DecodedAudio,
    /// Snapshots of the requested entries, parallel to the request.
    pub clips: Vec<ClipSnapshot>,
}

/// A note-resolved sample: the buffer to play and the semitone
/// distance to shift it by.
#[derive(Clone, Debug)]
pub struct ResolvedSample {
    /// The decoded audio of the nearest recorded sample.
    pub buffer: Arc<DecodedBuffer>,
    /// Signed semitones from the request to the recording.
    pub distance: i32,
}

/// Process-wide sample cache.
///
/// Owns the clip table and guarantees at most one in-flight
/// fetch+decode per clip no matter how many callers request it
/// concurrently. The table lock is never held across an await.
pub struct SampleCache {
    context: Arc<dyn Context>,
    transport: Arc<dyn Transport>,
    library: SampleLibrary,
    table: Arc<Mutex<HashMap<String, ClipEntry>>>,
}

impl SampleCache {
    /// Creates a cache over the given platform context and transport.
    pub fn new(
        context: Arc<dyn Context>,
        transport: Arc<dyn Transport>,
        library: SampleLibrary,
    ) -> SampleCache {
        SampleCache {
            context,
            transport,
            library,
            table: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers a clip. An existing entry (and any audio it already
    /// cached) is kept as is.
    pub fn register_clip(
        &self,
        name: impl Into<String>,
        file: impl Into<String>,
        offsets: Option<Vec<f64>>,
    ) {
        let name = name.into();
        let mut table = self.table.lock();
        table.entry(name.clone()).or_insert_with(|| ClipEntry {
            name,
            file: file.into(),
            offsets,
            state: FetchState::NotStarted,
        });
    }

    /// Registers every clip from a deserialized clip table. Serialized
    /// fetch states are not honored: every registration starts a fresh
    /// lifecycle, since cached audio cannot be carried in the format.
    pub fn register_table(&self, table: &crate::config::clips::ClipTable) {
        for (name, clip) in table.clips() {
            self.register_clip(
                name.clone(),
                clip.file().to_string(),
                clip.clip_offsets().map(<[f64]>::to_vec),
            );
        }
    }

    /// The library used for note resolution.
    pub fn library(&self) -> &SampleLibrary {
        &self.library
    }

    /// A snapshot of the named clip, if registered.
    pub fn clip(&self, name: &str) -> Option<ClipSnapshot> {
        self.table.lock().get(name).map(ClipEntry::snapshot)
    }

    /// Names of all registered clips, sorted for deterministic batch
    /// ordering.
    pub fn clip_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Fetches and decodes an arbitrary path directly, bypassing the
    /// clip table.
    pub async fn fetch_sample(&self, path: &str) -> Result<Arc<DecodedBuffer>, SampleLoadError> {
        Self::load(self.context.clone(), self.transport.clone(), path.to_string())
            .await
            .map_err(|cause| SampleLoadError {
                clip: path.to_string(),
                cause: Arc::new(cause),
            })
    }

    /// Returns a future resolving to the named clip's decoded buffer,
    /// starting the clip's single fetch+decode if nobody has yet.
    ///
    /// - `NotStarted`: transitions the entry to `InProgress`, creates
    ///   exactly one load, and shares its future.
    /// - `InProgress`: returns the already-running load's future.
    /// - `Complete`: resolves immediately to the cached buffer.
    ///
    /// On failure every waiter observes the same [`SampleLoadError`]
    /// and the entry returns to `NotStarted` so it can be retried.
    pub fn ensure_fetched(&self, name: &str) -> ClipLoad {
        let mut table = self.table.lock();
        let entry = match table.get_mut(name) {
            Some(entry) => entry,
            None => {
                warn!(clip = name, "Requested clip is not registered");
                let err = SampleLoadError {
                    clip: name.to_string(),
                    cause: Arc::new(LoadCause::UnknownClip),
                };
                return future::ready(Err(err)).boxed().shared();
            }
        };

        match &entry.state {
            FetchState::Complete(buffer) => {
                debug!(clip = name, "Clip already cached");
                future::ready(Ok(buffer.clone())).boxed().shared()
            }
            FetchState::InProgress(load) => {
                debug!(clip = name, "Joining in-flight clip load");
                load.clone()
            }
            FetchState::NotStarted => {
                info!(clip = name, file = entry.file.as_str(), "Starting clip load");

                let context = self.context.clone();
                let transport = self.transport.clone();
                let shared_table = Arc::clone(&self.table);
                let clip = entry.name.clone();
                let file = entry.file.clone();

                let load = async move {
                    let result = Self::load(context, transport, file).await;

                    // Store the outcome before any waiter resolves, so
                    // every caller observes the final state alongside
                    // the shared result.
                    let mut table = shared_table.lock();
                    match result {
                        Ok(buffer) => {
                            if let Some(entry) = table.get_mut(&clip) {
                                entry.state = FetchState::Complete(buffer.clone());
                            }
                            debug!(clip = clip.as_str(), "Clip load complete");
                            Ok(buffer)
                        }
                        Err(cause) => {
                            if let Some(entry) = table.get_mut(&clip) {
                                entry.state = FetchState::NotStarted;
                            }
                            let err = SampleLoadError {
                                clip: clip.clone(),
                                cause: Arc::new(cause),
                            };
                            warn!(clip = clip.as_str(), error = %err, "Clip load failed");
                            Err(err)
                        }
                    }
                }
                .boxed()
                .shared();

                entry.state = FetchState::InProgress(load.clone());
                load
            }
        }
    }

    /// Fetches every named clip concurrently (all registered clips
    /// when `names` is `None`), joining in-flight loads rather than
    /// starting duplicates. Buffers come back parallel to the request
    /// order, collapsed to a single buffer when exactly one clip was
    /// named.
    pub async fn ensure_fetched_all(
        &self,
        names: Option<&[&str]>,
    ) -> Result<FetchedClips, SampleLoadError> {
        let requested: Vec<String> = match names {
            Some(names) => names.iter().map(|name| name.to_string()).collect(),
            None => self.clip_names(),
        };

        let loads: Vec<ClipLoad> = requested
            .iter()
            .map(|name| self.ensure_fetched(name))
            .collect();
        let mut buffers = future::try_join_all(loads).await?;

        let clips: Vec<ClipSnapshot> = requested
            .iter()
            .filter_map(|name| self.clip(name))
            .collect();

        let audio = if buffers.len() == 1 {
            DecodedAudio::Single(buffers.remove(0))
        } else {
            DecodedAudio::Multiple(buffers)
        };

        Ok(FetchedClips { audio, clips })
    }

    /// Resolves an instrument and note/octave token to the nearest
    /// recorded sample and loads its audio through the clip table
    /// (keyed by file path), so concurrent lookups of the same file
    /// share one load.
    pub async fn get_sample(
        &self,
        instrument: &str,
        note_token: &str,
    ) -> Result<ResolvedSample, ResolveError> {
        let note: Note = note_token.parse()?;
        let nearest = self.library.nearest(instrument, note)?;
        let file = nearest.descriptor.file().to_string();

        self.register_clip(file.clone(), file.clone(), None);
        let buffer = self.ensure_fetched(&file).await?;

        debug!(
            instrument,
            note = note_token,
            file = file.as_str(),
            distance = nearest.distance,
            "Sample ready"
        );
        Ok(ResolvedSample {
            buffer,
            distance: nearest.distance,
        })
    }

    /// Runs one fetch+decode on the blocking pool.
    async fn load(
        context: Arc<dyn Context>,
        transport: Arc<dyn Transport>,
        file: String,
    ) -> Result<Arc<DecodedBuffer>, LoadCause> {
        let joined = task::spawn_blocking(move || -> Result<Arc<DecodedBuffer>, LoadCause> {
            let bytes = transport.fetch(&file)?;
            let buffer = context.decode(&bytes)?;
            Ok(buffer)
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(err) => Err(LoadCause::Background(err.to_string())),
        }
    }
}

impl std::fmt::Debug for SampleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleCache")
            .field("clips", &self.table.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::audio::mock::{Completion, Context as MockContext};
    use crate::fetch::mock::Transport as MockTransport;
    use crate::library::SampleDescriptor;
    use crate::note::PitchClass;
    use crate::FetchPhase;

    fn test_cache(library: SampleLibrary) -> (Arc<SampleCache>, Arc<MockContext>, Arc<MockTransport>) {
        let context = MockContext::new(Completion::Immediate);
        let transport = Arc::new(MockTransport::new());
        let cache = Arc::new(SampleCache::new(
            context.clone(),
            transport.clone(),
            library,
        ));
        (cache, context, transport)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_ensure_fetched_loads_once() {
        let (cache, context, transport) = test_cache(SampleLibrary::new());
        transport.insert("kick.wav", vec![1, 2, 3, 4]);
        transport.set_delay(Duration::from_millis(25));
        cache.register_clip("kick", "kick.wav", None);

        let first = cache.ensure_fetched("kick");
        let second = cache.ensure_fetched("kick");
        assert_eq!(cache.clip("kick").unwrap().fetched, FetchPhase::InProgress);

        let (first, second) = tokio::join!(first, second);
        let first = first.unwrap();
        let second = second.unwrap();

        // Both callers share the identical buffer, from a single
        // fetch+decode.
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(transport.fetch_count(), 1);
        assert_eq!(context.decode_count(), 1);
        assert_eq!(cache.clip("kick").unwrap().fetched, FetchPhase::Complete);

        // Later requests resolve immediately to the cached buffer.
        let third = cache.ensure_fetched("kick").await.unwrap();
        assert!(Arc::ptr_eq(&first, &third));
        assert_eq!(transport.fetch_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_load_rejects_all_waiters_and_resets() {
        let (cache, _context, transport) = test_cache(SampleLibrary::new());
        transport.insert("snare.wav", vec![9, 9, 9]);
        transport.fail_next("snare.wav", 1);
        transport.set_delay(Duration::from_millis(10));
        cache.register_clip("snare", "snare.wav", None);

        let first = cache.ensure_fetched("snare");
        let second = cache.ensure_fetched("snare");
        let (first, second) = tokio::join!(first, second);

        let err = first.unwrap_err();
        assert_eq!(err.clip(), "snare");
        assert!(matches!(err.cause(), LoadCause::Transport(_)));
        assert!(second.is_err());

        // The entry must not stay stuck in progress.
        assert_eq!(cache.clip("snare").unwrap().fetched, FetchPhase::NotStarted);

        // A later caller retries and succeeds.
        let buffer = cache.ensure_fetched("snare").await.unwrap();
        assert_eq!(buffer.samples().len(), 3);
        assert_eq!(transport.fetch_count(), 2);
        assert_eq!(cache.clip("snare").unwrap().fetched, FetchPhase::Complete);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ensure_fetched_unknown_clip() {
        let (cache, _context, _transport) = test_cache(SampleLibrary::new());
        let err = cache.ensure_fetched("ghost").await.unwrap_err();
        assert_eq!(err.clip(), "ghost");
        assert!(matches!(err.cause(), LoadCause::UnknownClip));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ensure_fetched_all_single_and_multiple() {
        let (cache, _context, transport) = test_cache(SampleLibrary::new());
        transport.insert("kick.wav", vec![1]);
        transport.insert("snare.wav", vec![2, 2]);
        cache.register_clip("kick", "kick.wav", None);
        cache.register_clip("snare", "snare.wav", None);

        // A single name collapses to a single buffer.
        let fetched = cache.ensure_fetched_all(Some(&["kick"])).await.unwrap();
        let buffer = fetched.audio.single().expect("single buffer");
        assert_eq!(buffer.samples().len(), 1);
        assert_eq!(fetched.clips.len(), 1);
        assert_eq!(fetched.clips[0].name, "kick");
        assert_eq!(fetched.clips[0].fetched, FetchPhase::Complete);

        // No names fetches every registered clip, in sorted order.
        let fetched = cache.ensure_fetched_all(None).await.unwrap();
        let buffers = fetched.audio.buffers();
        assert_eq!(buffers.len(), 2);
        assert_eq!(buffers[0].samples().len(), 1);
        assert_eq!(buffers[1].samples().len(), 2);
        assert_eq!(transport.fetch_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_overlapping_batches_share_loads() {
        let (cache, context, transport) = test_cache(SampleLibrary::new());
        transport.insert("kick.wav", vec![1]);
        transport.insert("snare.wav", vec![2]);
        transport.insert("hat.wav", vec![3]);
        transport.set_delay(Duration::from_millis(20));
        cache.register_clip("kick", "kick.wav", None);
        cache.register_clip("snare", "snare.wav", None);
        cache.register_clip("hat", "hat.wav", None);

        let (first, second) = tokio::join!(
            cache.ensure_fetched_all(Some(&["kick", "snare"])),
            cache.ensure_fetched_all(Some(&["snare", "hat"])),
        );
        let first = first.unwrap();
        let second = second.unwrap();

        // The overlapping "snare" load ran once and fanned out.
        assert_eq!(transport.fetch_count(), 3);
        assert_eq!(context.decode_count(), 3);
        assert!(Arc::ptr_eq(
            &first.audio.buffers()[1],
            &second.audio.buffers()[0]
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fetch_sample_bypasses_table() {
        let (cache, _context, transport) = test_cache(SampleLibrary::new());
        transport.insert("oneoff.wav", vec![7; 7]);

        let buffer = cache.fetch_sample("oneoff.wav").await.unwrap();
        assert_eq!(buffer.samples().len(), 7);
        assert!(cache.clip("oneoff.wav").is_none());

        let err = cache.fetch_sample("missing.wav").await.unwrap_err();
        assert_eq!(err.clip(), "missing.wav");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_sample_resolves_and_dedupes() {
        let mut library = SampleLibrary::new();
        library.insert(
            "piano",
            vec![
                SampleDescriptor::new(PitchClass::C, 3, "c3.wav"),
                SampleDescriptor::new(PitchClass::C, 4, "c4.wav"),
            ],
        );
        let (cache, _context, transport) = test_cache(library);
        transport.insert("c3.wav", vec![3; 3]);
        transport.insert("c4.wav", vec![4; 4]);
        transport.set_delay(Duration::from_millis(10));

        let (first, second) = tokio::join!(
            cache.get_sample("piano", "A3"),
            cache.get_sample("piano", "A3"),
        );
        let first = first.unwrap();
        let second = second.unwrap();

        assert_eq!(first.distance, -3);
        assert!(Arc::ptr_eq(&first.buffer, &second.buffer));
        assert_eq!(first.buffer.samples().len(), 4);
        assert_eq!(transport.fetch_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_sample_errors() {
        let (cache, _context, _transport) = test_cache(SampleLibrary::new());

        assert!(matches!(
            cache.get_sample("piano", "X9").await.unwrap_err(),
            ResolveError::Note(_)
        ));
        assert!(matches!(
            cache.get_sample("piano", "C4").await.unwrap_err(),
            ResolveError::Library(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_decode_failure_propagates() {
        let (cache, context, transport) = test_cache(SampleLibrary::new());
        transport.insert("pad.wav", vec![1, 2]);
        cache.register_clip("pad", "pad.wav", None);
        context.fail_decodes(1);

        let err = cache.ensure_fetched("pad").await.unwrap_err();
        assert!(matches!(err.cause(), LoadCause::Decode(_)));
        assert_eq!(cache.clip("pad").unwrap().fetched, FetchPhase::NotStarted);

        // Retry succeeds once the decoder recovers.
        assert!(cache.ensure_fetched("pad").await.is_ok());
    }
}
