//! The ingestion engine: a background worker that tails the journal
//! directory and publishes state changes to a [`Subscriber`].

use crate::bus::{self, Publisher, Subscriber};
use crate::config::EngineConfig;
use crate::event::EventKind;
use crate::journal::{ChangeWaiter, JournalSource};
use crate::pipeline::Pipeline;
use crate::scan::InitialScan;
use chrono::Utc;
use log::{info, warn};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

struct Worker {
    stop: Arc<AtomicBool>,
    commands: Sender<EventKind>,
    handle: JoinHandle<Pipeline>,
}

/// Owns the reducer state and the worker thread that feeds it.
///
/// While running, the worker is the only writer to the reducers. While
/// stopped, the engine holds the state itself, so mining controls and
/// [`clear_state`](Engine::clear_state) apply directly.
///
/// Restarting re-reads the current journal from its beginning. Reducer state
/// is kept across a stop; call [`clear_state`](Engine::clear_state) before
/// restarting so history is not applied twice.
///
/// # Examples
///
/// ```no_run
/// use journalfold::{Engine, EngineConfig, Notification};
/// use std::time::Duration;
///
/// let (mut engine, mut events) = Engine::new(EngineConfig::new("/path/to/journals"));
/// engine.start_ingestion()?;
/// while let Some(notification) = events.recv_timeout(Duration::from_secs(1)) {
///     if let Notification::SliceChanged(state) = notification {
///         println!("{} changed", state.slice());
///     }
/// }
/// engine.stop_ingestion();
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Engine {
    config: EngineConfig,
    publisher: Publisher,
    /// Present while stopped.
    pipeline: Option<Pipeline>,
    /// Present while running.
    worker: Option<Worker>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> (Engine, Subscriber) {
        let (publisher, subscriber) = bus::channel();
        let pipeline = Pipeline::new(&config);
        let engine = Engine {
            config,
            publisher,
            pipeline: Some(pipeline),
            worker: None,
        };
        (engine, subscriber)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Start the worker: initial scan, then steady-state tailing.
    ///
    /// Returns `Ok(false)` if ingestion was already running.
    pub fn start_ingestion(&mut self) -> io::Result<bool> {
        if self.worker.is_some() {
            return Ok(false);
        }

        let pipeline = self
            .pipeline
            .take()
            .unwrap_or_else(|| Pipeline::new(&self.config));
        let stop = Arc::new(AtomicBool::new(false));
        let (commands, command_rx) = mpsc::channel();

        let loop_config = self.config.clone();
        let publisher = self.publisher.clone();
        let loop_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("journalfold-ingest".to_string())
            .spawn(move || run(pipeline, &loop_config, &publisher, &loop_stop, &command_rx))?;

        info!(
            "started ingestion from {}",
            self.config.journal_dir.display()
        );
        self.worker = Some(Worker {
            stop,
            commands,
            handle,
        });
        Ok(true)
    }

    /// Stop the worker and wait for it to finish its current poll.
    ///
    /// Returns `false` if ingestion was not running.
    pub fn stop_ingestion(&mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            return false;
        };

        worker.stop.store(true, Ordering::Release);
        drop(worker.commands);
        match worker.handle.join() {
            Ok(pipeline) => self.pipeline = Some(pipeline),
            Err(_) => {
                warn!("ingestion worker panicked; reducer state was lost");
                self.pipeline = Some(Pipeline::new(&self.config));
            }
        }
        info!("stopped ingestion");
        true
    }

    /// Reset every slice to empty and publish the empty states.
    ///
    /// Only allowed while stopped; returns `false` while running.
    pub fn clear_state(&mut self) -> bool {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return false;
        };
        pipeline.reset();
        self.publisher.publish_all(pipeline.states());
        true
    }

    pub fn start_mining_session(&mut self) {
        self.mining_control(EventKind::StartMiningSession);
    }

    pub fn stop_mining_session(&mut self) {
        self.mining_control(EventKind::StopMiningSession);
    }

    pub fn reset_mining_session(&mut self) {
        self.mining_control(EventKind::ResetMiningSession);
    }

    fn mining_control(&mut self, kind: EventKind) {
        if let Some(worker) = &self.worker {
            if worker.commands.send(kind).is_ok() {
                return;
            }
            warn!("ingestion worker is gone; dropping {}", kind.as_str());
            return;
        }
        if let Some(pipeline) = self.pipeline.as_mut() {
            self.publisher.publish_all(pipeline.control(kind, Utc::now()));
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop_ingestion();
    }
}

/// Worker body. Returns the pipeline so its state survives the stop.
fn run(
    mut pipeline: Pipeline,
    config: &EngineConfig,
    publisher: &Publisher,
    stop: &AtomicBool,
    commands: &Receiver<EventKind>,
) -> Pipeline {
    let mut source = JournalSource::new(&config.journal_dir, config.lock_retry);
    let waiter = ChangeWaiter::new(&config.journal_dir, config.watch_files);

    InitialScan::new().run(&mut pipeline, &mut source, publisher);

    while !stop.load(Ordering::Acquire) {
        apply_commands(&mut pipeline, publisher, commands);

        match source.poll() {
            Ok(records) => {
                for record in &records {
                    publisher.publish_all(pipeline.ingest(record));
                }
            }
            Err(e) => warn!("skipping this poll: {e}"),
        }

        if stop.load(Ordering::Acquire) {
            break;
        }
        waiter.wait(config.poll_interval_duration());
    }

    // controls sent just before the stop still count
    apply_commands(&mut pipeline, publisher, commands);
    pipeline
}

fn apply_commands(pipeline: &mut Pipeline, publisher: &Publisher, commands: &Receiver<EventKind>) {
    while let Ok(kind) = commands.try_recv() {
        publisher.publish_all(pipeline.control(kind, Utc::now()));
    }
}
