//! Engine service — a worker thread that owns the engine.
//!
//! Communication with producers is via `mpsc` commands; every command that
//! expects an answer carries its own reply channel. Readers never talk to the
//! worker: they hold a `SnapshotReader`.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::domain::{IngestError, PeriodId, RawObservation};

use super::snapshot::SnapshotReader;
use super::{Engine, IngestStatus, SeedSummary};

type Reply<T> = Sender<Result<T, IngestError>>;

/// Commands sent from producers to the engine worker.
#[derive(Debug)]
pub enum EngineCommand {
    Ingest {
        period_id: PeriodId,
        raw_value: u8,
        reply: Option<Reply<IngestStatus>>,
    },
    Seed {
        observations: Vec<RawObservation>,
        reply: Option<Reply<SeedSummary>>,
    },
    Shutdown,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine worker is gone")]
    Disconnected,
    #[error("engine worker panicked")]
    Panicked,
}

/// Producer-side handle to a running engine worker.
pub struct EngineHandle {
    tx: Sender<EngineCommand>,
    reader: SnapshotReader,
    join: Option<JoinHandle<()>>,
}

/// Build an engine from `config` and move it onto its own thread.
pub fn spawn_engine(config: EngineConfig) -> Result<EngineHandle, ServiceError> {
    let engine = Engine::new(config)?;
    let reader = engine.reader();
    let (tx, rx) = mpsc::channel();
    let join = thread::Builder::new()
        .name("sizecast-engine".into())
        .spawn(move || engine_loop(engine, rx))?;
    Ok(EngineHandle {
        tx,
        reader,
        join: Some(join),
    })
}

fn engine_loop(mut engine: Engine, rx: Receiver<EngineCommand>) {
    loop {
        match rx.recv() {
            Ok(EngineCommand::Shutdown) | Err(_) => break,
            Ok(EngineCommand::Ingest {
                period_id,
                raw_value,
                reply,
            }) => {
                let result = engine.ingest(period_id, raw_value);
                if let Err(e) = &result {
                    warn!(period = %period_id, raw_value, error = %e, "rejected observation");
                }
                if let Some(reply) = reply {
                    // Caller may have stopped waiting.
                    let _ = reply.send(result);
                }
            }
            Ok(EngineCommand::Seed {
                observations,
                reply,
            }) => {
                let result = engine.seed(&observations);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
        }
    }
    debug!("engine worker stopped");
}

impl EngineHandle {
    /// Submit an observation and wait for the result.
    pub fn ingest(&self, period_id: PeriodId, raw_value: u8) -> Result<IngestStatus, ServiceError> {
        let (reply, rx) = mpsc::channel();
        self.send(EngineCommand::Ingest {
            period_id,
            raw_value,
            reply: Some(reply),
        })?;
        Ok(rx.recv().map_err(|_| ServiceError::Disconnected)??)
    }

    /// Submit an observation without waiting.
    pub fn submit(&self, period_id: PeriodId, raw_value: u8) -> Result<(), ServiceError> {
        self.send(EngineCommand::Ingest {
            period_id,
            raw_value,
            reply: None,
        })
    }

    pub fn seed(&self, observations: Vec<RawObservation>) -> Result<SeedSummary, ServiceError> {
        let (reply, rx) = mpsc::channel();
        self.send(EngineCommand::Seed {
            observations,
            reply: Some(reply),
        })?;
        Ok(rx.recv().map_err(|_| ServiceError::Disconnected)??)
    }

    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    /// Stop the worker after it drains queued commands.
    pub fn shutdown(mut self) -> Result<(), ServiceError> {
        self.stop()
    }

    fn send(&self, command: EngineCommand) -> Result<(), ServiceError> {
        self.tx.send(command).map_err(|_| ServiceError::Disconnected)
    }

    fn stop(&mut self) -> Result<(), ServiceError> {
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        // The worker may already be gone; joining reports how it ended.
        let _ = self.tx.send(EngineCommand::Shutdown);
        join.join().map_err(|_| ServiceError::Panicked)
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "engine worker did not stop cleanly");
        }
    }
}
