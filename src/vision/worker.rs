//! Background OCR worker
//!
//! Owns the detection engine on a dedicated thread. The worker drains the
//! frame channel, preprocesses, detects, and publishes batches to the result
//! channel. It runs until told to stop or until the frame channel
//! disconnects; a per-frame engine failure publishes an empty batch and the
//! loop keeps going.

use std::thread::JoinHandle;

use crossbeam_channel::{bounded, select, Sender};
use tracing::{debug, info, warn};

use crate::capture::Frame;
use crate::pipeline::{SlotReceiver, SlotSender};
use crate::vision::preprocess::{self, PreprocessConfig};
use crate::vision::{DetectionBatch, TextDetector};

/// Handle to the background OCR thread.
///
/// Owned by the session; [`stop`](OcrWorker::stop) (or drop) signals the
/// loop and joins the thread.
pub struct OcrWorker {
    handle: Option<JoinHandle<()>>,
    shutdown: Sender<()>,
}

impl OcrWorker {
    /// Start the worker thread.
    ///
    /// The detector moves onto the thread; frames arrive through `frames`
    /// and batches leave through `batches`.
    pub fn spawn(
        mut detector: Box<dyn TextDetector>,
        preprocess: PreprocessConfig,
        frames: SlotReceiver<Frame>,
        batches: SlotSender<DetectionBatch>,
    ) -> Self {
        let (shutdown, shutdown_rx) = bounded::<()>(1);

        let handle = std::thread::spawn(move || {
            info!("OCR worker started");

            loop {
                let frame = select! {
                    recv(shutdown_rx) -> _ => break,
                    recv(frames.raw()) -> msg => match msg {
                        Ok(frame) => frame,
                        Err(_) => break,
                    },
                };

                let batch = process_frame(detector.as_mut(), &preprocess, &frame);

                // A pending unconsumed batch wins; this one is dropped so the
                // display side never sees a backlog.
                if !batches.try_put(batch) {
                    debug!("Result slot full, dropping batch");
                }
            }

            info!("OCR worker stopped");
        });

        Self {
            handle: Some(handle),
            shutdown,
        }
    }

    /// Signal the loop and wait for the thread to exit
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    /// Whether the worker thread is still running
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn shutdown_and_join(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for OcrWorker {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

/// One worker cycle: preprocess then detect.
///
/// Preprocessing faults fall back to the plain grayscale frame; engine
/// faults degrade to an empty batch.
fn process_frame(
    detector: &mut dyn TextDetector,
    preprocess: &PreprocessConfig,
    frame: &Frame,
) -> DetectionBatch {
    let enhanced = match preprocess::enhance(&frame.image, preprocess) {
        Ok(gray) => gray,
        Err(e) => {
            warn!("Preprocessing failed ({}), using plain grayscale", e);
            preprocess::to_grayscale(&frame.image)
        }
    };

    match detector.detect(&enhanced) {
        Ok(detections) => DetectionBatch::new(detections, frame.timestamp),
        Err(e) => {
            warn!("Detection failed for frame: {}", e);
            DetectionBatch::empty(frame.timestamp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::single_slot;
    use crate::vision::{DetectError, Detection};
    use image::{GrayImage, RgbImage};
    use std::time::Duration;

    /// Detector that fails on selected frames and counts invocations
    struct ScriptedDetector {
        calls: usize,
        fail_on: Vec<usize>,
    }

    impl ScriptedDetector {
        fn new(fail_on: Vec<usize>) -> Self {
            Self { calls: 0, fail_on }
        }
    }

    impl TextDetector for ScriptedDetector {
        fn detect(&mut self, _image: &GrayImage) -> Result<Vec<Detection>, DetectError> {
            let call = self.calls;
            self.calls += 1;
            if self.fail_on.contains(&call) {
                Err(DetectError::Engine("scripted failure".into()))
            } else {
                Ok(vec![Detection::from_rect(
                    0.0,
                    0.0,
                    10.0,
                    10.0,
                    format!("frame{call}"),
                    0.9,
                )])
            }
        }
    }

    fn wait_for_batch(rx: &SlotReceiver<DetectionBatch>) -> DetectionBatch {
        for _ in 0..100 {
            if let Some(batch) = rx.try_get() {
                return batch;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("worker did not publish a batch in time");
    }

    #[test]
    fn test_worker_publishes_batches() {
        let (frame_tx, frame_rx) = single_slot();
        let (batch_tx, batch_rx) = single_slot();

        let worker = OcrWorker::spawn(
            Box::new(ScriptedDetector::new(vec![])),
            PreprocessConfig::default(),
            frame_rx,
            batch_tx,
        );

        assert!(frame_tx.try_put(Frame::new(RgbImage::new(16, 16))));
        let batch = wait_for_batch(&batch_rx);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.detections[0].text, "frame0");

        worker.stop();
    }

    #[test]
    fn test_engine_failure_yields_empty_batch_and_worker_survives() {
        let (frame_tx, frame_rx) = single_slot();
        let (batch_tx, batch_rx) = single_slot();

        let worker = OcrWorker::spawn(
            Box::new(ScriptedDetector::new(vec![0])),
            PreprocessConfig::default(),
            frame_rx,
            batch_tx,
        );

        assert!(frame_tx.try_put(Frame::new(RgbImage::new(16, 16))));
        let first = wait_for_batch(&batch_rx);
        assert!(first.is_empty());

        // The next frame still gets processed.
        assert!(frame_tx.try_put(Frame::new(RgbImage::new(16, 16))));
        let second = wait_for_batch(&batch_rx);
        assert_eq!(second.detections[0].text, "frame1");

        worker.stop();
    }

    #[test]
    fn test_stop_joins_thread() {
        let (_frame_tx, frame_rx) = single_slot::<Frame>();
        let (batch_tx, _batch_rx) = single_slot();

        let worker = OcrWorker::spawn(
            Box::new(ScriptedDetector::new(vec![])),
            PreprocessConfig::default(),
            frame_rx,
            batch_tx,
        );

        assert!(worker.is_running());
        worker.stop();
    }

    #[test]
    fn test_frame_channel_disconnect_stops_worker() {
        let (frame_tx, frame_rx) = single_slot::<Frame>();
        let (batch_tx, _batch_rx) = single_slot();

        let worker = OcrWorker::spawn(
            Box::new(ScriptedDetector::new(vec![])),
            PreprocessConfig::default(),
            frame_rx,
            batch_tx,
        );

        drop(frame_tx);
        for _ in 0..100 {
            if !worker.is_running() {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("worker did not exit after frame channel disconnect");
    }
}
