//! Session coordinator
//!
//! [`Session`] is the explicit per-run context object: it owns the two
//! single-slot channels, the OCR worker lifecycle, the rolling history, and
//! the freeze state. Only the primary loop touches history and freeze state,
//! so neither needs a lock. Teardown drops the frame channel and joins the
//! worker thread.

use tracing::{info, warn};

use crate::capture::{CaptureError, Frame, FrameSource};
use crate::pipeline::{single_slot, SlotReceiver, SlotSender};
use crate::reconcile::{Reconciler, RECONCILE_FAILED};
use crate::text::RollingHistory;
use crate::vision::annotate::{Annotated, Annotator};
use crate::vision::preprocess::PreprocessConfig;
use crate::vision::worker::OcrWorker;
use crate::vision::{DetectionBatch, TextDetector};

/// Freeze toggle state
#[derive(Debug, Clone, Default)]
pub struct FreezeState {
    /// Whether frame production is paused
    pub frozen: bool,
    /// Reconciled reading produced on the last freeze, cleared on resume
    pub reconciled_text: Option<String>,
}

/// Counters for one session, updated only by the primary loop
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    /// Frames rendered to the caller
    pub frames_rendered: u64,
    /// Frames handed to the OCR worker
    pub frames_offered: u64,
    /// Frames dropped because the worker was still busy
    pub frames_dropped: u64,
    /// Detection batches consumed from the worker
    pub batches_consumed: u64,
}

/// Outcome of one primary-loop cycle
#[derive(Debug)]
pub enum Cycle {
    /// A frame was captured and annotated
    Frame(Annotated),
    /// The session is frozen; no frame was pulled from the source
    Frozen,
    /// The frame source is exhausted; the session loop should end
    EndOfStream,
}

/// One live text-recognition session.
///
/// Created per run and torn down at the end of it; [`shutdown`]
/// (or drop) stops the worker and joins its thread.
///
/// [`shutdown`]: Session::shutdown
pub struct Session {
    source: Box<dyn FrameSource>,
    frames: Option<SlotSender<Frame>>,
    batches: SlotReceiver<DetectionBatch>,
    worker: Option<OcrWorker>,
    annotator: Annotator,
    history: RollingHistory,
    reconciler: Box<dyn Reconciler>,
    freeze: FreezeState,
    stats: SessionStats,
}

impl Session {
    /// Assemble a session and start its OCR worker
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn TextDetector>,
        reconciler: Box<dyn Reconciler>,
        annotator: Annotator,
        preprocess: PreprocessConfig,
        history_window: usize,
    ) -> Self {
        let (frame_tx, frame_rx) = single_slot();
        let (batch_tx, batch_rx) = single_slot();

        let worker = OcrWorker::spawn(detector, preprocess, frame_rx, batch_tx);

        Self {
            source,
            frames: Some(frame_tx),
            batches: batch_rx,
            worker: Some(worker),
            annotator,
            history: RollingHistory::new(history_window),
            reconciler,
            freeze: FreezeState::default(),
            stats: SessionStats::default(),
        }
    }

    /// Run one primary-loop cycle: capture, annotate, record history, and
    /// offer the frame to the OCR worker.
    ///
    /// While frozen no frame is pulled from the source at all. The result
    /// channel is checked without blocking, so annotations may lag the live
    /// frame by one OCR pass; that lag is bounded by the single-slot
    /// channels.
    pub fn cycle(&mut self) -> Result<Cycle, CaptureError> {
        if self.freeze.frozen {
            return Ok(Cycle::Frozen);
        }

        let Some(frame) = self.source.next_frame()? else {
            info!("Frame source exhausted");
            return Ok(Cycle::EndOfStream);
        };

        let batch = self.batches.try_get();
        if batch.is_some() {
            self.stats.batches_consumed += 1;
        }

        let annotated = self.annotator.annotate(&frame.image, batch.as_ref());

        if !annotated.text.is_empty() {
            self.history.push(annotated.text.clone());
        }

        // Hand the frame to the worker; if it is still chewing on an older
        // frame the slot is full and this one is skipped.
        if let Some(frames) = &self.frames {
            if frames.try_put(frame) {
                self.stats.frames_offered += 1;
            } else {
                self.stats.frames_dropped += 1;
            }
        }

        self.stats.frames_rendered += 1;
        Ok(Cycle::Frame(annotated))
    }

    /// Freeze the session and reconcile the history window.
    ///
    /// Blocks on the chat call by design. Any reconciliation failure
    /// surfaces as the literal `"Error"` sentinel rather than an error; it
    /// is stored and returned like any other reading. Calling freeze on an
    /// already-frozen session returns the stored text without a new call.
    pub fn freeze(&mut self) -> String {
        if self.freeze.frozen {
            return self.freeze.reconciled_text.clone().unwrap_or_default();
        }

        self.freeze.frozen = true;

        let candidates = self.history.snapshot();
        let text = match self.reconciler.reconcile(&candidates) {
            Ok(text) => text,
            Err(e) => {
                warn!("Reconciliation failed: {}", e);
                RECONCILE_FAILED.to_string()
            }
        };

        info!("Frozen; reconciled reading: {}", text);
        self.freeze.reconciled_text = Some(text.clone());
        text
    }

    /// Resume capture, clearing the reconciled reading
    pub fn resume(&mut self) {
        self.freeze.frozen = false;
        self.freeze.reconciled_text = None;
        info!("Resumed capture");
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze.frozen
    }

    pub fn freeze_state(&self) -> &FreezeState {
        &self.freeze
    }

    /// Adjust the annotator's confidence threshold (0-100)
    pub fn set_confidence_threshold(&mut self, threshold: u8) {
        self.annotator.set_threshold(threshold);
    }

    pub fn history(&self) -> &RollingHistory {
        &self.history
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Stop the worker and join its thread
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        // Dropping the sender disconnects the worker's frame channel; the
        // explicit stop also covers a worker parked mid-select.
        self.frames.take();
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}
