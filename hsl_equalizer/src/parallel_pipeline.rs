// THEORY:
// `EqualizerService` puts the synchronous `Equalizer` behind an async queue so a tokio
// application can hand off many images without blocking its runtime.
//
// - Callers `submit` frames; each becomes a task on an unbounded mpsc queue carrying a
//   oneshot sender for its result.
// - A single dispatcher task drains the queue in order. Each job runs on
//   `spawn_blocking`, where it installs itself on the equalizer's rayon pool. Jobs run
//   one after another, so two images never compete for the same bounded pool.
// - `equalize_batch` submits a whole batch and awaits all results in input order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use image::RgbaImage;
use log::{debug, error};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::EqualizerConfig;
use crate::error::{EqualizeError, Result};
use crate::pipeline::{Equalized, Equalizer};

/// An owned RGBA8 frame queued for equalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ImageFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }
}

impl From<RgbaImage> for ImageFrame {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height)
    }
}

struct EqualizeTask {
    job_id: u64,
    frame: ImageFrame,
    result_sender: oneshot::Sender<Result<Equalized>>,
}

pub struct EqualizerService {
    task_sender: mpsc::UnboundedSender<EqualizeTask>,
    dispatcher: JoinHandle<()>,
    job_counter: AtomicU64,
}

impl EqualizerService {
    /// Builds the equalizer and spawns the dispatcher. Must be called inside a tokio runtime.
    pub fn new(config: EqualizerConfig) -> Result<Self> {
        let equalizer = Arc::new(Equalizer::new(config)?);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<EqualizeTask>();

        let dispatcher = tokio::spawn(async move {
            while let Some(task) = task_receiver.recv().await {
                let EqualizeTask {
                    job_id,
                    frame,
                    result_sender,
                } = task;
                debug!("Job {} dispatched ({}x{})", job_id, frame.width, frame.height);

                let worker_equalizer = Arc::clone(&equalizer);
                let outcome = tokio::task::spawn_blocking(move || {
                    worker_equalizer.equalize(&frame.data, frame.width, frame.height)
                })
                .await;

                let result = outcome.unwrap_or_else(|join_error| {
                    error!("Job {} worker did not complete: {}", job_id, join_error);
                    Err(EqualizeError::ServiceClosed)
                });

                // The submitter may have stopped waiting; that is not our problem.
                let _ = result_sender.send(result);
            }
        });

        Ok(Self {
            task_sender,
            dispatcher,
            job_counter: AtomicU64::new(0),
        })
    }

    /// Queues one frame and waits for its result.
    pub async fn submit(&self, frame: ImageFrame) -> Result<Equalized> {
        let job_id = self.job_counter.fetch_add(1, Ordering::Relaxed);
        let (result_sender, result_receiver) = oneshot::channel();

        self.task_sender
            .send(EqualizeTask {
                job_id,
                frame,
                result_sender,
            })
            .map_err(|_| EqualizeError::ServiceClosed)?;

        result_receiver
            .await
            .map_err(|_| EqualizeError::ServiceClosed)?
    }

    /// Equalizes every frame; results line up with `frames`.
    pub async fn equalize_batch(&self, frames: Vec<ImageFrame>) -> Vec<Result<Equalized>> {
        join_all(frames.into_iter().map(|frame| self.submit(frame))).await
    }

    /// Number of jobs submitted so far.
    pub fn submitted(&self) -> u64 {
        self.job_counter.load(Ordering::Relaxed)
    }

    /// Stops accepting work and waits for queued jobs to drain.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        if let Err(e) = self.dispatcher.await {
            error!("Equalizer dispatcher ended abnormally: {}", e);
        }
    }
}
