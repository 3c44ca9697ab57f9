use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::detection::domain::face_inference::{FaceInference, InferenceError};
use crate::detection::domain::inference_dispatch::{
    InferenceDispatch, InferenceOutcome, InferenceRequest,
};

/// Runs the inference oracle on one dedicated thread.
///
/// Layout: `host poll → [request, cap 1] → worker → [outcomes] → host poll`
///
/// The host thread never blocks on inference. The request channel holds at
/// most one frame, so a second submit while the worker is busy is rejected.
pub struct InferenceWorker {
    request_tx: Option<Sender<InferenceRequest>>,
    outcome_rx: Receiver<InferenceOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl InferenceWorker {
    pub fn spawn(mut inference: Box<dyn FaceInference>) -> std::io::Result<Self> {
        let (request_tx, request_rx) = crossbeam_channel::bounded::<InferenceRequest>(1);
        // Unbounded so the worker never blocks on a host that stopped draining.
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded::<InferenceOutcome>();

        let handle = std::thread::Builder::new()
            .name("proctor-inference".into())
            .spawn(move || {
                for request in request_rx {
                    let outcome = InferenceOutcome::run(inference.as_mut(), request);
                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            request_tx: Some(request_tx),
            outcome_rx,
            handle: Some(handle),
        })
    }
}

impl InferenceDispatch for InferenceWorker {
    fn submit(&mut self, request: InferenceRequest) -> Result<(), InferenceError> {
        let tx = self
            .request_tx
            .as_ref()
            .ok_or_else(|| InferenceError::new("inference worker shut down"))?;
        tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => InferenceError::new("inference worker busy"),
            TrySendError::Disconnected(_) => InferenceError::new("inference worker stopped"),
        })
    }

    fn try_complete(&mut self) -> Option<InferenceOutcome> {
        self.outcome_rx.try_recv().ok()
    }
}

impl Drop for InferenceWorker {
    fn drop(&mut self) {
        drop(self.request_tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Inference worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detection::{BoundingBox, FaceDetection};
    use crate::shared::frame::Frame;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct GatedInference {
        gate: Arc<Mutex<()>>,
    }

    impl FaceInference for GatedInference {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceDetection>, InferenceError> {
            let _open = self.gate.lock().unwrap();
            Ok(vec![FaceDetection::new(
                BoundingBox::new(0.0, 0.0, frame.width() as f64, frame.height() as f64),
                0.9,
            )])
        }
    }

    struct PanickingInference;

    impl FaceInference for PanickingInference {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceDetection>, InferenceError> {
            panic!("backend crashed");
        }
    }

    fn request(generation: u64) -> InferenceRequest {
        InferenceRequest {
            generation,
            frame: Frame::solid(8, 6, [1, 2, 3], generation),
        }
    }

    fn wait(worker: &InferenceWorker) -> InferenceOutcome {
        worker
            .outcome_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker produced no outcome")
    }

    #[test]
    fn test_outcome_is_tagged_with_generation() {
        let gate = Arc::new(Mutex::new(()));
        let mut worker = InferenceWorker::spawn(Box::new(GatedInference { gate })).unwrap();

        worker.submit(request(3)).unwrap();
        let outcome = wait(&worker);

        assert_eq!(outcome.generation, 3);
        assert_eq!(outcome.result.unwrap().len(), 1);
    }

    #[test]
    fn test_second_submit_rejected_while_busy() {
        let gate = Arc::new(Mutex::new(()));
        let closed = gate.lock().unwrap();
        let mut worker = InferenceWorker::spawn(Box::new(GatedInference { gate: gate.clone() }))
            .unwrap();

        worker.submit(request(1)).unwrap();
        // Give the worker time to pull request 1 and block inside detect.
        std::thread::sleep(Duration::from_millis(50));
        worker.submit(request(2)).unwrap(); // fills the single slot
        let third = worker.submit(request(3));

        assert_eq!(third, Err(InferenceError::new("inference worker busy")));
        drop(closed);
        assert_eq!(wait(&worker).generation, 1);
        assert_eq!(wait(&worker).generation, 2);
    }

    #[test]
    fn test_try_complete_is_non_blocking() {
        let gate = Arc::new(Mutex::new(()));
        let mut worker = InferenceWorker::spawn(Box::new(GatedInference { gate })).unwrap();
        assert!(worker.try_complete().is_none());
    }

    #[test]
    fn test_worker_survives_panicking_backend() {
        let mut worker = InferenceWorker::spawn(Box::new(PanickingInference)).unwrap();

        worker.submit(request(1)).unwrap();
        let first = wait(&worker);
        worker.submit(request(2)).unwrap();
        let second = wait(&worker);

        assert_eq!(first.generation, 1);
        assert!(first.result.is_err());
        assert_eq!(second.generation, 2);
        assert!(second.result.is_err());
    }
}
