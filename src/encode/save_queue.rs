use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::JoinHandle;

use anyhow::Context;

use crate::assets::encode::encode_file;
use crate::foundation::error::{TrailError, TrailResult};
use crate::raster::buffer::PixelBuffer;

/// Saves allowed in flight before `submit` blocks.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// Outcome of every save handed to a queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: usize,
}

struct SaveJob {
    path: PathBuf,
    frame: PixelBuffer,
}

/// Write-behind encoder: one background thread drains a bounded channel in submission order.
///
/// Each job owns its frame. When `capacity` jobs are pending, `submit` blocks until the writer
/// takes the oldest one. A failed write is logged and counted, never retried.
pub struct SaveQueue {
    tx: Option<mpsc::SyncSender<SaveJob>>,
    writer: Option<JoinHandle<SaveReport>>,
}

impl SaveQueue {
    pub fn spawn(capacity: usize) -> TrailResult<Self> {
        let (tx, rx) = mpsc::sync_channel::<SaveJob>(capacity.max(1));
        let writer = std::thread::Builder::new()
            .name("radartrail-save".to_owned())
            .spawn(move || drain(rx))
            .context("spawn save thread")?;
        Ok(Self {
            tx: Some(tx),
            writer: Some(writer),
        })
    }

    pub fn submit(&self, path: PathBuf, frame: PixelBuffer) -> TrailResult<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| TrailError::encode("save queue already finished"))?;
        tx.send(SaveJob { path, frame })
            .map_err(|_| TrailError::encode("save thread is not accepting frames"))
    }

    /// Close the queue and wait for every pending save.
    pub fn finish(mut self) -> TrailResult<SaveReport> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> TrailResult<SaveReport> {
        drop(self.tx.take());
        match self.writer.take() {
            Some(writer) => writer
                .join()
                .map_err(|_| TrailError::encode("save thread panicked")),
            None => Ok(SaveReport::default()),
        }
    }
}

impl Drop for SaveQueue {
    fn drop(&mut self) {
        if self.writer.is_some()
            && let Err(err) = self.shutdown()
        {
            tracing::warn!(error = %format!("{err:#}"), "save queue shut down uncleanly");
        }
    }
}

fn drain(rx: mpsc::Receiver<SaveJob>) -> SaveReport {
    let mut report = SaveReport::default();
    for job in rx {
        match encode_file(&job.path, &job.frame) {
            Ok(()) => {
                report.saved += 1;
                tracing::info!(path = %job.path.display(), "saved");
            }
            Err(err) => {
                report.failed += 1;
                tracing::warn!(
                    path = %job.path.display(),
                    error = %format!("{err:#}"),
                    "save failed"
                );
            }
        }
    }
    report
}

#[cfg(test)]
#[path = "../../tests/unit/encode/save_queue.rs"]
mod tests;
