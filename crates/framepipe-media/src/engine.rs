//! Multi-threaded pattern clip engine.
//!
//! Requests are queued on a channel shared by a fixed pool of worker
//! threads. Each worker sleeps for the clip's per-frame jitter before
//! rendering, so completions come back out of order on arbitrary threads.

use crate::clip::ClipSpec;
use crate::pattern::{FrameLease, PatternFrame};
use crossbeam_channel::{unbounded, Receiver, Sender};
use framepipe_core::{FrameIndex, Result, StreamInfo, VideoFormat};
use framepipe_pipeline::{CancelToken, Completion, FrameSource, RenderError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

struct Job {
    index: FrameIndex,
    cancel: CancelToken,
    done: Completion<PatternFrame>,
}

/// Render state shared by the workers. Holds no reference to the engine, so
/// the engine can shut the pool down when it is dropped.
struct Renderer {
    spec: ClipSpec,
    format: VideoFormat,
    outstanding: Arc<AtomicUsize>,
    rendered: AtomicUsize,
}

impl Renderer {
    fn run(&self, job: Job) {
        let Job {
            index,
            cancel,
            done,
        } = job;
        if cancel.is_cancelled() {
            done(index, Err(RenderError::Cancelled));
            return;
        }

        let delay = self.spec.jitter_for(index.0);
        if !delay.is_zero() {
            // Sleep on the cancel channel so a cancel cuts the delay short.
            let _ = cancel.channel().recv_timeout(delay);
            if cancel.is_cancelled() {
                done(index, Err(RenderError::Cancelled));
                return;
            }
        }

        if index.0 >= self.spec.frames {
            done(
                index,
                Err(RenderError::Failed(format!(
                    "frame {index} is past the end of the clip"
                ))),
            );
            return;
        }
        if self.spec.fail_at == Some(index.0) {
            done(
                index,
                Err(RenderError::Failed(format!(
                    "pattern clip fails at frame {index}"
                ))),
            );
            return;
        }

        let frame = PatternFrame::render(
            index,
            self.format,
            self.spec.width,
            self.spec.height,
            self.spec.padding,
            FrameLease::take(&self.outstanding),
        );
        self.rendered.fetch_add(1, Ordering::SeqCst);
        debug!(%index, "Rendered pattern frame");
        done(index, Ok(frame));
    }
}

fn worker_loop(renderer: Arc<Renderer>, jobs: Receiver<Job>) {
    for job in jobs.iter() {
        renderer.run(job);
    }
}

/// A [`FrameSource`] rendering a [`ClipSpec`] on a pool of worker threads.
pub struct PatternEngine {
    info: StreamInfo,
    renderer: Arc<Renderer>,
    jobs: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl PatternEngine {
    /// Spawn the worker pool for `spec`.
    pub fn new(spec: ClipSpec) -> Result<Self> {
        spec.validate()?;
        let info = spec.stream_info();
        let threads = info.concurrency;
        let renderer = Arc::new(Renderer {
            format: spec.format(),
            spec,
            outstanding: Arc::new(AtomicUsize::new(0)),
            rendered: AtomicUsize::new(0),
        });

        let (tx, rx) = unbounded();
        let workers = (0..threads)
            .map(|n| {
                let renderer = Arc::clone(&renderer);
                let rx = rx.clone();
                thread::Builder::new()
                    .name(format!("pattern-worker-{n}"))
                    .spawn(move || worker_loop(renderer, rx))
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        info!(
            threads,
            width = info.width,
            height = info.height,
            frames = info.num_frames,
            "Pattern engine started"
        );

        Ok(Self {
            info,
            renderer,
            jobs: Some(tx),
            workers,
        })
    }

    /// Load a clip file and start its engine.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Self::new(ClipSpec::load(path)?)
    }

    pub fn spec(&self) -> &ClipSpec {
        &self.renderer.spec
    }

    /// Worker threads in the pool.
    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Frames rendered but not yet released.
    pub fn outstanding(&self) -> usize {
        self.renderer.outstanding.load(Ordering::SeqCst)
    }

    /// Frames rendered since the engine started.
    pub fn rendered(&self) -> usize {
        self.renderer.rendered.load(Ordering::SeqCst)
    }
}

impl FrameSource for PatternEngine {
    type Frame = PatternFrame;

    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn request_frame(&self, index: FrameIndex, cancel: CancelToken, done: Completion<PatternFrame>) {
        let job = Job {
            index,
            cancel,
            done,
        };
        let rejected = match &self.jobs {
            Some(jobs) => jobs.send(job).err().map(|e| e.into_inner()),
            None => Some(job),
        };
        if let Some(job) = rejected {
            (job.done)(
                index,
                Err(RenderError::Failed("engine is shut down".to_string())),
            );
        }
    }
}

impl Drop for PatternEngine {
    fn drop(&mut self) {
        self.jobs.take();
        let current = thread::current().id();
        for worker in self.workers.drain(..) {
            // The last handle may be released from inside a completion.
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                warn!("Pattern worker panicked");
            }
        }
    }
}
