//! Background signer and patch orchestrator.
//!
//! A [`SyncNode`] wraps an engine together with a [`FileAccessor`] over the
//! local replica. It periodically signs the file and publishes the
//! signature on a channel, answers delta requests from peers, and applies
//! patch plans by staging the rebuilt file and atomically replacing the
//! replica. Scheduling and locking live entirely here; the core engine
//! stays synchronous and oblivious.

use std::io::{Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tokio::sync::{mpsc, Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::{Config, ConfigError};
use crate::error::SyncError;
use crate::sync::engine::BlockSync;
use crate::sync::types::{ChunkChecksums, PatcherBlockSpan};
use crate::transfer::accessor::FileAccessor;

fn to_unix_nanos(time: DateTime<Utc>) -> i64 {
    // File times past the representable range count as arbitrarily new.
    time.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Orchestrator around a [`BlockSync`] engine and a local replica.
///
/// Signing holds a shared lock on the replica; patching holds the
/// exclusive lock and swaps the file atomically, so readers never observe
/// a half-written replica.
pub struct SyncNode {
    engine: Mutex<BlockSync>,
    accessor: Arc<dyn FileAccessor>,
    file_lock: RwLock<()>,
    request_interval: Duration,
    temp_file_dir: Option<PathBuf>,
    signature_tx: mpsc::Sender<ChunkChecksums>,
    stop: Notify,
}

impl SyncNode {
    /// Build a node and the channel on which background signatures arrive.
    pub fn new(
        config: Config,
    ) -> Result<(Arc<Self>, mpsc::Receiver<ChunkChecksums>), SyncError> {
        let mut validated = config.into_validated()?;
        let accessor = validated
            .file_accessor
            .take()
            .ok_or(ConfigError::MissingFileAccessor)?;
        let request_interval = validated.request_update_interval;
        let temp_file_dir = validated.temp_file_dir.take();
        let engine = BlockSync::from_validated(validated);

        let (signature_tx, signature_rx) = mpsc::channel(1);

        let node = Arc::new(Self {
            engine: Mutex::new(engine),
            accessor,
            file_lock: RwLock::new(()),
            request_interval,
            temp_file_dir,
            signature_tx,
            stop: Notify::new(),
        });

        Ok((node, signature_rx))
    }

    /// Spawn the background signing loop.
    ///
    /// Every interval the replica is signed under the shared lock and the
    /// signature is published; failures are logged and the loop continues.
    /// The loop ends on [`stop`](Self::stop) or when the receiver is gone.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let node = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(node.request_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match node.create_signature().await {
                            Ok(checksums) => {
                                if node.signature_tx.send(checksums).await.is_err() {
                                    tracing::info!("signature receiver dropped, stopping sync loop");
                                    break;
                                }
                            }
                            Err(e) => tracing::error!("failed creating signature: {}", e),
                        }
                    }
                    _ = node.stop.notified() => {
                        tracing::info!("stopping sync service");
                        break;
                    }
                }
            }
        })
    }

    /// Stop the background signing loop.
    pub fn stop(&self) {
        self.stop.notify_one();
    }

    /// Diff the local replica, acting as the source, against a peer's
    /// signature.
    ///
    /// Refused when the replica is not strictly newer than the signature:
    /// the peer has nothing to pull.
    pub async fn delta(&self, checksums: &ChunkChecksums) -> Result<PatcherBlockSpan, SyncError> {
        let mod_time = to_unix_nanos(self.accessor.mod_time()?);
        if mod_time <= checksums.mod_time {
            return Err(SyncError::TargetNewer);
        }

        let mut source = self.accessor.open_read()?;
        let mut engine = self.engine.lock().await;
        let mut plan = engine.delta(&mut source, checksums)?;
        plan.mod_time = mod_time;

        Ok(plan)
    }

    /// Apply a patch plan to the local replica.
    ///
    /// The rebuilt file is staged next to the replica (or in the configured
    /// temp directory) and swapped in atomically. Refused when the replica
    /// is already newer than the plan.
    pub async fn patch(&self, plan: &PatcherBlockSpan) -> Result<(), SyncError> {
        let _guard = self.file_lock.write().await;

        let mod_time = to_unix_nanos(self.accessor.mod_time()?);
        if mod_time > plan.mod_time {
            return Err(SyncError::TargetNewer);
        }

        let mut local = self.accessor.open_read()?;
        let mut staged = match &self.temp_file_dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };

        {
            let mut engine = self.engine.lock().await;
            engine.patch(&mut local, plan, staged.as_file_mut())?;
        }

        staged.as_file_mut().seek(SeekFrom::Start(0))?;
        self.accessor.replace_contents(staged.as_file_mut())?;

        Ok(())
    }

    async fn create_signature(&self) -> Result<ChunkChecksums, SyncError> {
        let _guard = self.file_lock.read().await;

        let mut local = self.accessor.open_read()?;
        let mut engine = self.engine.lock().await;
        let mut checksums = engine.sign(&mut local)?;
        checksums.mod_time = to_unix_nanos(self.accessor.mod_time()?);

        Ok(checksums)
    }
}
