//! Background decode worker for live scanning.
//!
//! Camera acquisition runs much faster than a frame decode, so captures
//! funnel through a throttle (at most one submission per 250 ms; frames
//! arriving faster are dropped, the next capture is just as good) into a
//! dedicated worker thread that owns the [`LiveSession`]. Workers never
//! poll for cancellation mid-decode; a cancelled session simply discards
//! whatever the worker still produces, which keeps per-frame latency
//! predictable.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::bitmap::Bitmap;
use crate::config::Tuning;

use super::LiveSession;

/// Minimum interval between accepted submissions.
const SUBMIT_INTERVAL: Duration = Duration::from_millis(250);

/// A [`LiveSession`] running on its own worker thread.
#[derive(Debug)]
pub struct ScanWorker {
	frames: Option<mpsc::Sender<Bitmap>>,
	results: mpsc::Receiver<Vec<u8>>,
	cancelled: Arc<AtomicBool>,
	last_submit: Option<Instant>,
	handle: Option<thread::JoinHandle<()>>,
}

impl ScanWorker {
	/// Spawns the worker thread with a fresh session.
	pub fn spawn(tuning: Tuning) -> Self {
		let (frame_tx, frame_rx) = mpsc::channel::<Bitmap>();
		let (result_tx, result_rx) = mpsc::channel::<Vec<u8>>();
		let cancelled = Arc::new(AtomicBool::new(false));

		let flag = Arc::clone(&cancelled);
		let handle = thread::spawn(move || {
			let mut session = LiveSession::new(tuning);
			while let Ok(bitmap) = frame_rx.recv() {
				// Decode runs to completion even when cancelled; only the
				// result is dropped.
				let outcome = session.submit(&bitmap);
				if flag.load(Ordering::Relaxed) {
					debug!("session cancelled, dropping decode result");
					continue;
				}
				if let Some(payload) = outcome {
					if result_tx.send(payload).is_err() {
						break;
					}
					return;
				}
			}
		});

		Self {
			frames: Some(frame_tx),
			results: result_rx,
			cancelled,
			last_submit: None,
			handle: Some(handle),
		}
	}

	/// Offers a captured bitmap to the worker.
	///
	/// Returns `false` when the frame was dropped: throttled, cancelled,
	/// or the worker has already finished.
	pub fn submit(&mut self, bitmap: Bitmap) -> bool {
		if self.cancelled.load(Ordering::Relaxed) {
			return false;
		}
		if let Some(last) = self.last_submit
			&& last.elapsed() < SUBMIT_INTERVAL
		{
			return false;
		}

		let Some(frames) = &self.frames else {
			return false;
		};
		if frames.send(bitmap).is_err() {
			return false;
		}
		self.last_submit = Some(Instant::now());
		true
	}

	/// Returns the completed payload, if the worker has produced one.
	pub fn poll(&mut self) -> Option<Vec<u8>> {
		if self.cancelled.load(Ordering::Relaxed) {
			return None;
		}
		self.results.try_recv().ok()
	}

	/// Blocks until the session completes or the worker stops.
	///
	/// Mostly useful for batch replays where captures are submitted ahead
	/// of time.
	pub fn wait(&mut self) -> Option<Vec<u8>> {
		// Close the submission side so the worker drains and exits.
		self.frames = None;
		let payload = self.results.recv().ok();
		if self.cancelled.load(Ordering::Relaxed) { None } else { payload }
	}

	/// Cancels the session; in-flight results are discarded.
	pub fn cancel(&self) {
		info!("cancelling scan session");
		self.cancelled.store(true, Ordering::Relaxed);
	}
}

impl Drop for ScanWorker {
	fn drop(&mut self) {
		self.frames = None;
		if let Some(handle) = self.handle.take() {
			let _ = handle.join();
		}
	}
}
