//! Production recorder — cpal capture thread writing a WAV file.
//!
//! cpal streams are not `Send`, so the stream lives on a dedicated capture
//! thread for the duration of one attempt. The thread reports setup success
//! or failure back over a channel before [`WavRecorder::start`] returns, so
//! start failures (no device, device busy) surface as `None` immediately
//! rather than as a later silent empty file.
//!
//! The capture callback writes 16-bit PCM to the fixed capture file and
//! publishes the RMS of each buffer as the live input level.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::{Recorder, RecorderState};

/// Bytes in a canonical WAV header; a file at or below this size carries no
/// audio payload.
const WAV_HEADER_BYTES: u64 = 44;

/// Poll interval of the capture thread's stop-flag loop.
const STOP_POLL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// RecordError
// ---------------------------------------------------------------------------

/// Internal capture-setup errors. Callers of the [`Recorder`] trait only see
/// `None`; the specific cause is logged.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to create WAV file: {0}")]
    Wav(#[from] hound::Error),
}

// ---------------------------------------------------------------------------
// PartialTranscriptFeed
// ---------------------------------------------------------------------------

/// Write handle for a streaming recognizer to publish live partial text.
///
/// Cheap to clone; when nothing pushes into it, the recorder's partial
/// transcript stays empty (the documented "unavailable" behaviour).
#[derive(Clone)]
pub struct PartialTranscriptFeed {
    slot: Arc<Mutex<String>>,
}

impl PartialTranscriptFeed {
    /// Replace the current partial transcript.
    pub fn push(&self, text: impl Into<String>) {
        *self.slot.lock().unwrap() = text.into();
    }
}

// ---------------------------------------------------------------------------
// WavRecorder
// ---------------------------------------------------------------------------

struct CaptureWorker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Records microphone audio to a fixed WAV file.
pub struct WavRecorder {
    capture_path: PathBuf,
    state: RecorderState,
    level: Arc<Mutex<f32>>,
    partial: Arc<Mutex<String>>,
    worker: Option<CaptureWorker>,
}

impl WavRecorder {
    /// Create a recorder capturing to `capture_path`.
    pub fn new(capture_path: PathBuf) -> Self {
        Self {
            capture_path,
            state: RecorderState::Idle,
            level: Arc::new(Mutex::new(0.0)),
            partial: Arc::new(Mutex::new(String::new())),
            worker: None,
        }
    }

    /// Handle a streaming recognizer can use to publish live partial text.
    pub fn partial_feed(&self) -> PartialTranscriptFeed {
        PartialTranscriptFeed {
            slot: Arc::clone(&self.partial),
        }
    }

    /// The fixed capture path.
    pub fn capture_path(&self) -> &Path {
        &self.capture_path
    }

    /// Signal the capture thread to finish and wait for the WAV finalize.
    async fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::Relaxed);
            // Joining blocks on the thread's stop-poll loop; keep it off the
            // async executor.
            let _ = tokio::task::spawn_blocking(move || worker.handle.join()).await;
        }
    }

    fn non_empty_artifact(path: &Path) -> Option<PathBuf> {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        (size > WAV_HEADER_BYTES).then(|| path.to_path_buf())
    }
}

#[async_trait]
impl Recorder for WavRecorder {
    async fn request_permission(&mut self) -> bool {
        self.state = RecorderState::RequestingPermission;
        // Desktop hosts gate access at device-open time; probing the default
        // input device is the closest equivalent of a permission prompt.
        let granted = tokio::task::spawn_blocking(|| {
            cpal::default_host()
                .default_input_device()
                .map(|d| d.default_input_config().is_ok())
                .unwrap_or(false)
        })
        .await
        .unwrap_or(false);

        self.state = if granted {
            RecorderState::Idle
        } else {
            log::warn!("recorder: microphone access unavailable");
            RecorderState::PermissionDenied
        };
        granted
    }

    async fn start(&mut self) -> Option<PathBuf> {
        // A previous in-flight attempt is always discarded first.
        self.join_worker().await;

        self.state = RecorderState::Starting;
        *self.level.lock().unwrap() = 0.0;
        self.partial.lock().unwrap().clear();

        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), RecordError>>();

        let path = self.capture_path.clone();
        let level = Arc::clone(&self.level);
        let stop_flag = Arc::clone(&stop);

        let handle = match std::thread::Builder::new()
            .name("practice-capture".into())
            .spawn(move || capture_thread(path, level, stop_flag, ready_tx))
        {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("recorder: failed to spawn capture thread: {e}");
                self.state = RecorderState::StartFailed;
                return None;
            }
        };

        // Wait for the thread to report stream setup success or failure.
        let ready = tokio::task::spawn_blocking(move || ready_rx.recv()).await;
        match ready {
            Ok(Ok(Ok(()))) => {
                self.worker = Some(CaptureWorker { stop, handle });
                self.state = RecorderState::Recording;
                Some(self.capture_path.clone())
            }
            Ok(Ok(Err(e))) => {
                log::warn!("recorder: capture setup failed: {e}");
                let _ = handle.join();
                self.state = RecorderState::StartFailed;
                None
            }
            _ => {
                log::warn!("recorder: capture thread exited before reporting readiness");
                stop.store(true, Ordering::Relaxed);
                let _ = handle.join();
                self.state = RecorderState::StartFailed;
                None
            }
        }
    }

    async fn stop(&mut self) -> Option<PathBuf> {
        if self.worker.is_none() {
            log::debug!("recorder: stop called while not recording");
            return None;
        }

        self.state = RecorderState::Stopping;
        self.join_worker().await;
        *self.level.lock().unwrap() = 0.0;

        match Self::non_empty_artifact(&self.capture_path) {
            Some(path) => {
                self.state = RecorderState::Idle;
                Some(path)
            }
            None => {
                log::warn!("recorder: stop produced no audio artifact");
                self.state = RecorderState::StopFailed;
                None
            }
        }
    }

    fn current_audio(&self) -> Option<PathBuf> {
        Self::non_empty_artifact(&self.capture_path)
    }

    fn input_level(&self) -> f32 {
        *self.level.lock().unwrap()
    }

    fn partial_transcript(&self) -> String {
        self.partial.lock().unwrap().clone()
    }

    fn state(&self) -> RecorderState {
        self.state
    }
}

// ---------------------------------------------------------------------------
// Capture thread
// ---------------------------------------------------------------------------

/// Owns the cpal stream and the WAV writer for one attempt.
///
/// Reports setup success/failure over `ready_tx` exactly once, then loops on
/// the stop flag, and finalizes the WAV file on the way out.
fn capture_thread(
    path: PathBuf,
    level: Arc<Mutex<f32>>,
    stop: Arc<AtomicBool>,
    ready_tx: mpsc::Sender<Result<(), RecordError>>,
) {
    let setup = || -> Result<(cpal::Stream, SharedWriter), RecordError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(RecordError::NoDevice)?;
        let supported = device.default_input_config()?;

        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        // create() truncates — any prior attempt file is overwritten.
        let writer: SharedWriter =
            Arc::new(Mutex::new(Some(hound::WavWriter::create(&path, spec)?)));

        let cb_writer = Arc::clone(&writer);
        let cb_level = Arc::clone(&level);
        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Some(w) = cb_writer.lock().unwrap().as_mut() {
                    for &sample in data {
                        let s = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                        // Write errors surface at finalize; don't spam per sample.
                        let _ = w.write_sample(s);
                    }
                }
                *cb_level.lock().unwrap() = rms(data);
            },
            |err: cpal::StreamError| {
                log::error!("recorder: cpal stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        Ok((stream, writer))
    };

    match setup() {
        Ok((stream, writer)) => {
            let _ = ready_tx.send(Ok(()));
            while !stop.load(Ordering::Relaxed) {
                std::thread::sleep(STOP_POLL);
            }
            drop(stream);
            if let Some(w) = writer.lock().unwrap().take() {
                if let Err(e) = w.finalize() {
                    log::warn!("recorder: WAV finalize failed: {e}");
                }
            }
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        }
    }
}

type SharedWriter = Arc<Mutex<Option<hound::WavWriter<BufWriter<File>>>>>;

/// RMS of one callback buffer, clamped to `[0, 1]`.
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_sq: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean_sq.sqrt().min(1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(rms(&[0.0; 256]), 0.0);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn rms_is_clamped_to_unit_range() {
        let loud = vec![2.0_f32; 64];
        assert_eq!(rms(&loud), 1.0);
        let half = vec![0.5_f32; 64];
        assert!((rms(&half) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn header_only_file_is_not_an_artifact() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("attempt.wav");

        // 44-byte header, no payload.
        std::fs::write(&path, vec![0u8; WAV_HEADER_BYTES as usize]).unwrap();
        assert!(WavRecorder::non_empty_artifact(&path).is_none());

        std::fs::write(&path, vec![0u8; WAV_HEADER_BYTES as usize + 2]).unwrap();
        assert_eq!(WavRecorder::non_empty_artifact(&path), Some(path));
    }

    #[test]
    fn current_audio_checks_the_capture_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("attempt.wav");
        let recorder = WavRecorder::new(path.clone());

        assert!(recorder.current_audio().is_none());
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        assert_eq!(recorder.current_audio(), Some(path));
    }

    #[tokio::test]
    async fn stop_while_idle_is_a_reported_no_op() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut recorder = WavRecorder::new(dir.path().join("attempt.wav"));
        assert!(recorder.stop().await.is_none());
        // Still idle, not wedged in an error state.
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[test]
    fn partial_feed_publishes_to_the_recorder() {
        let dir = tempfile::tempdir().expect("temp dir");
        let recorder = WavRecorder::new(dir.path().join("attempt.wav"));
        assert_eq!(recorder.partial_transcript(), "");

        let feed = recorder.partial_feed();
        feed.push("สวัส…");
        assert_eq!(recorder.partial_transcript(), "สวัส…");
    }
}
