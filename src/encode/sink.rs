use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::encode::save_queue::{SaveQueue, SaveReport};
use crate::foundation::error::{TrailError, TrailResult};
use crate::raster::buffer::PixelBuffer;

/// Consumer of composed frames.
///
/// Ordering contract: `push_frame` is called in output order. `name` is a bare file name
/// (`stem.ext`); the sink decides where it goes.
pub trait FrameSink {
    fn push_frame(&mut self, name: &str, frame: PixelBuffer) -> TrailResult<()>;
    /// Flush everything pushed so far.
    fn finish(&mut self) -> TrailResult<SaveReport>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    /// Frames in push order.
    pub frames: Vec<(String, PixelBuffer)>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.frames.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn frame(&self, name: &str) -> Option<&PixelBuffer> {
        self.frames
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, frame)| frame)
    }
}

impl FrameSink for InMemorySink {
    fn push_frame(&mut self, name: &str, frame: PixelBuffer) -> TrailResult<()> {
        self.frames.push((name.to_owned(), frame));
        Ok(())
    }

    fn finish(&mut self) -> TrailResult<SaveReport> {
        Ok(SaveReport {
            saved: self.frames.len(),
            failed: 0,
        })
    }
}

/// Writes frames under a directory through a [`SaveQueue`].
pub struct DirSink {
    dir: PathBuf,
    queue: Option<SaveQueue>,
}

impl DirSink {
    pub fn new(dir: &Path, capacity: usize) -> TrailResult<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output dir '{}'", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            queue: Some(SaveQueue::spawn(capacity)?),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameSink for DirSink {
    fn push_frame(&mut self, name: &str, frame: PixelBuffer) -> TrailResult<()> {
        let queue = self
            .queue
            .as_ref()
            .ok_or_else(|| TrailError::encode("sink already finished"))?;
        queue.submit(self.dir.join(name), frame)
    }

    fn finish(&mut self) -> TrailResult<SaveReport> {
        match self.queue.take() {
            Some(queue) => queue.finish(),
            None => Ok(SaveReport::default()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
