//! The detection pipeline: decode, track, classify.
//!
//! ```text
//! Idle ─▶ Decoding ─▶ Tracking ─▶ Classifying ─▶ Done
//!            │            │                        ▲
//!            └────────────┴── failure / cancel ────┘ (default result)
//! ```
//!
//! [`KeyDetector::detect`] never fails: decode errors, missing audio,
//! cancellation, timeouts and too little pitched material all resolve to a
//! result whose confidence is 0 and whose [`DetectionOutcome`] says why.
//!
//! [`KeyDetector::spawn`] runs the same pipeline on a worker thread. The
//! run's deadline makes the decoder stop early and the rest of the pipeline
//! works on the partial PCM; if the worker still has not answered shortly
//! after the deadline, [`DetectionHandle::wait`] gives up on it and returns
//! a default result.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError, bounded};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::{DEFAULT_MIN_WINDOWS, KeyClassifier};
use crate::error::DetectError;
use crate::histogram::NoteHistogram;
use crate::key::MusicalKey;
use crate::pitch::{PitchTracker, TrackerConfig};
use crate::source::{CancelToken, DecodeLimits, DecodeOutcome, PcmBuffer, PcmSource};

/// Time the handle keeps waiting past the deadline for the partial result.
const DEADLINE_GRACE: Duration = Duration::from_secs(2);

/// Tracking budget for PCM whose decode already ran into the deadline.
const PARTIAL_TRACKING_BUDGET: Duration = Duration::from_secs(1);

/// Pipeline settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionConfig {
    /// Rate the decoder decimates towards, in Hz.
    pub analysis_rate: u32,
    /// Longest stretch of audio analyzed, in seconds.
    pub max_duration_secs: f32,
    /// Pitch tracker tuning.
    pub tracker: TrackerConfig,
    /// Pitched windows needed for a conclusive result.
    pub min_windows: u32,
    /// Deadline for the whole run.
    pub timeout: Duration,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            analysis_rate: 22_050,
            max_duration_secs: 30.0,
            tracker: TrackerConfig::default(),
            min_windows: DEFAULT_MIN_WINDOWS,
            timeout: Duration::from_secs(8),
        }
    }
}

impl DetectionConfig {
    /// Decoder limits for this configuration.
    pub fn limits(&self) -> DecodeLimits {
        DecodeLimits::new(self.analysis_rate, self.max_duration_secs)
    }
}

/// Where a run currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionStage {
    /// Not started.
    Idle,
    /// Pulling PCM from the source.
    Decoding,
    /// Windowed pitch tracking.
    Tracking,
    /// Profile correlation.
    Classifying,
    /// Result available.
    Done,
}

impl DetectionStage {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Decoding,
            2 => Self::Tracking,
            3 => Self::Classifying,
            4 => Self::Done,
            _ => Self::Idle,
        }
    }
}

#[derive(Debug, Default)]
struct StageCell(AtomicU8);

impl StageCell {
    fn set(&self, stage: DetectionStage) {
        self.0.store(stage as u8, Ordering::Release);
    }

    fn get(&self) -> DetectionStage {
        DetectionStage::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionOutcome {
    /// Classified from the full analysis length.
    Detected,
    /// Classified from the PCM decoded before the deadline.
    Partial,
    /// Too few pitched windows.
    Inconclusive,
    /// The source has no audio track.
    NoAudioTrack,
    /// Decoding or the worker failed.
    Failed,
    /// The caller cancelled the run.
    Cancelled,
    /// The deadline passed without enough material.
    TimedOut,
}

/// Detected key, confidence and the evidence behind it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyDetectionResult {
    /// Best-fitting key, or A minor when inconclusive.
    pub key: MusicalKey,
    /// `(r + 1) / 2` of the winning correlation, 0 when inconclusive.
    pub confidence: f32,
    /// Pitch classes of the accepted windows.
    pub histogram: NoteHistogram,
    /// How the run ended.
    pub outcome: DetectionOutcome,
    /// Seconds of audio analyzed.
    pub analyzed_secs: f32,
}

impl KeyDetectionResult {
    /// The default A-minor result with confidence 0.
    pub fn inconclusive(histogram: NoteHistogram, outcome: DetectionOutcome) -> Self {
        Self {
            key: MusicalKey::DEFAULT_DETECTION,
            confidence: 0.0,
            histogram,
            outcome,
            analyzed_secs: 0.0,
        }
    }

    /// True when the key came from data rather than the default.
    pub fn is_conclusive(&self) -> bool {
        matches!(
            self.outcome,
            DetectionOutcome::Detected | DetectionOutcome::Partial
        )
    }
}

impl Default for KeyDetectionResult {
    fn default() -> Self {
        Self::inconclusive(NoteHistogram::new(), DetectionOutcome::Inconclusive)
    }
}

/// Runs the detection pipeline.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyDetector {
    config: DetectionConfig,
}

impl KeyDetector {
    /// Detector with `config`.
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect the key of `source` on the calling thread. Never fails.
    ///
    /// The deadline is honoured between decode steps; a source that ignores
    /// its token can hold this call up, [`spawn`](Self::spawn) cannot be.
    pub fn detect(&self, source: &mut dyn PcmSource) -> KeyDetectionResult {
        let cancel = CancelToken::with_timeout(self.config.timeout);
        self.run(source, &cancel, &StageCell::default())
    }

    /// Detect the key of already-decoded mono PCM.
    pub fn detect_pcm(&self, buffer: &PcmBuffer) -> KeyDetectionResult {
        let stage = StageCell::default();
        self.analyze(buffer, &CancelToken::new(), &stage, false)
    }

    /// Detect the key of `source` on a worker thread.
    pub fn spawn(&self, source: impl PcmSource + 'static) -> DetectionHandle {
        let cancel = CancelToken::with_timeout(self.config.timeout);
        let stage = Arc::new(StageCell::default());
        let (tx, rx) = bounded(1);
        let detector = *self;
        let mut source = source;

        let worker = {
            let cancel = cancel.clone();
            let stage = Arc::clone(&stage);
            thread::Builder::new()
                .name("bluesgrid-keydetect".into())
                .spawn(move || {
                    let result = detector.run(&mut source, &cancel, &stage);
                    let _ = tx.send(result);
                })
        };

        let (worker, result) = match worker {
            Ok(handle) => (Some(handle), None),
            Err(e) => {
                warn!(error = %DetectError::Worker(e), "key detection unavailable");
                stage.set(DetectionStage::Done);
                let failed = KeyDetectionResult::inconclusive(
                    NoteHistogram::new(),
                    DetectionOutcome::Failed,
                );
                (None, Some(failed))
            }
        };

        DetectionHandle {
            rx,
            cancel,
            stage,
            worker,
            result,
            give_up_at: Instant::now().checked_add(self.config.timeout.saturating_add(DEADLINE_GRACE)),
        }
    }

    fn run(
        &self,
        source: &mut dyn PcmSource,
        cancel: &CancelToken,
        stage: &StageCell,
    ) -> KeyDetectionResult {
        let started = Instant::now();
        let name = source.describe();
        info!(source = %name, "key detection started");

        stage.set(DetectionStage::Decoding);
        let decoded = source.decode(&self.config.limits(), cancel);
        let result = match decoded {
            _ if cancel.is_cancelled() => self.finish(DetectionOutcome::Cancelled, stage),
            Err(e) => {
                warn!(source = %name, error = %e, "decode failed");
                self.finish(DetectionOutcome::Failed, stage)
            }
            Ok(DecodeOutcome::NoAudioTrack) => {
                warn!(source = %name, "no audio track found");
                self.finish(DetectionOutcome::NoAudioTrack, stage)
            }
            Ok(DecodeOutcome::Decoded(buffer)) => {
                debug!(
                    samples = buffer.len(),
                    rate = buffer.sample_rate(),
                    "decoded analysis pcm"
                );
                let partial = cancel.deadline_passed();
                if partial {
                    warn!(
                        seconds = buffer.duration_secs(),
                        "decode deadline passed, analyzing partial audio"
                    );
                }
                self.analyze(&buffer, cancel, stage, partial)
            }
        };

        info!(
            key = %result.key,
            confidence = result.confidence,
            outcome = ?result.outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "key detection finished"
        );
        result
    }

    fn analyze(
        &self,
        buffer: &PcmBuffer,
        cancel: &CancelToken,
        stage: &StageCell,
        partial: bool,
    ) -> KeyDetectionResult {
        stage.set(DetectionStage::Tracking);
        let tracker = PitchTracker::new(self.config.tracker, buffer.sample_rate());
        let budget = if partial {
            cancel.with_deadline(Instant::now().checked_add(PARTIAL_TRACKING_BUDGET))
        } else {
            cancel.clone()
        };
        let summary = tracker.track_with(buffer.samples(), &budget);
        if summary.interrupted {
            return self.finish(DetectionOutcome::Cancelled, stage);
        }
        let partial = partial || summary.deadline_hit;
        if summary.deadline_hit {
            warn!(
                windows = summary.windows,
                "deadline passed while tracking, classifying tracked windows"
            );
        }

        stage.set(DetectionStage::Classifying);
        let mut result = KeyClassifier::new(self.config.min_windows).classify(&summary.histogram);
        result.analyzed_secs = buffer.duration_secs();
        result.outcome = match (result.is_conclusive(), partial) {
            (true, false) => DetectionOutcome::Detected,
            (true, true) => DetectionOutcome::Partial,
            (false, false) => DetectionOutcome::Inconclusive,
            (false, true) => DetectionOutcome::TimedOut,
        };
        stage.set(DetectionStage::Done);
        result
    }

    fn finish(&self, outcome: DetectionOutcome, stage: &StageCell) -> KeyDetectionResult {
        stage.set(DetectionStage::Done);
        KeyDetectionResult::inconclusive(NoteHistogram::new(), outcome)
    }
}

/// A detection running on a worker thread. Dropping it cancels the run.
#[derive(Debug)]
pub struct DetectionHandle {
    rx: Receiver<KeyDetectionResult>,
    cancel: CancelToken,
    stage: Arc<StageCell>,
    worker: Option<JoinHandle<()>>,
    result: Option<KeyDetectionResult>,
    give_up_at: Option<Instant>,
}

impl DetectionHandle {
    /// Ask the worker to stop. The result will be `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Current pipeline stage.
    pub fn stage(&self) -> DetectionStage {
        self.stage.get()
    }

    /// The result, if the worker has delivered it.
    pub fn try_result(&mut self) -> Option<&KeyDetectionResult> {
        if self.result.is_none() {
            match self.rx.try_recv() {
                Ok(result) => {
                    self.result = Some(result);
                    self.join();
                }
                Err(TryRecvError::Disconnected) => {
                    self.result = Some(KeyDetectionResult::inconclusive(
                        NoteHistogram::new(),
                        DetectionOutcome::Failed,
                    ));
                }
                Err(TryRecvError::Empty) => {}
            }
        }
        self.result.as_ref()
    }

    /// Block until the result arrives or the deadline (plus a short grace)
    /// passes. Always returns a result.
    pub fn wait(mut self) -> KeyDetectionResult {
        if let Some(result) = self.result.take() {
            return result;
        }
        let received = match self.give_up_at {
            Some(at) => self.rx.recv_timeout(at.saturating_duration_since(Instant::now())),
            None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(result) => {
                self.join();
                result
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("key detection worker unresponsive, abandoning it");
                self.cancel.cancel();
                KeyDetectionResult::inconclusive(NoteHistogram::new(), DetectionOutcome::TimedOut)
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("key detection worker exited without a result");
                KeyDetectionResult::inconclusive(NoteHistogram::new(), DetectionOutcome::Failed)
            }
        }
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for DetectionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
