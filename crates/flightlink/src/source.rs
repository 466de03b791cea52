//! Line sources: lazy producers of raw telemetry lines.
//!
//! A source is only a description of where lines come from. Nothing is opened
//! until [`LineSource::lines`] is iterated, and each call to `lines` starts a
//! fresh pass over the origin.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Lines};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};

/// A restartable, lazily evaluated sequence of raw lines.
pub trait LineSource: Send + Sync {
    /// The iterator produced by one pass over the origin.
    type Lines: Iterator<Item = Result<String>> + Send;

    /// A short description of the origin, for logging.
    fn describe(&self) -> String;

    /// Start a new pass over the origin.
    fn lines(&self) -> Self::Lines;
}

/// Lines read from a file on disk.
#[derive(Debug, Clone)]
pub struct FileLineSource {
    path: PathBuf,
}

impl FileLineSource {
    /// Describe a file source. The file is not touched until iteration.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LineSource for FileLineSource {
    type Lines = FileLines;

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn lines(&self) -> FileLines {
        FileLines {
            path: self.path.clone(),
            state: FileState::Unopened,
        }
    }
}

#[derive(Debug)]
enum FileState {
    Unopened,
    Open(Lines<BufReader<File>>),
    Finished,
}

/// One pass over a [`FileLineSource`].
///
/// The file is opened on the first call to `next`. A missing file yields a
/// single [`Error::NotFound`] and then ends.
#[derive(Debug)]
pub struct FileLines {
    path: PathBuf,
    state: FileState,
}

impl FileLines {
    fn open(&self) -> Result<Lines<BufReader<File>>> {
        debug!("Opening line source {}", self.path.display());
        let file = File::open(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                Error::NotFound {
                    path: self.path.clone(),
                }
            } else {
                Error::SourceRead {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        Ok(BufReader::new(file).lines())
    }
}

impl Iterator for FileLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, FileState::Unopened) {
            match self.open() {
                Ok(lines) => self.state = FileState::Open(lines),
                Err(err) => {
                    self.state = FileState::Finished;
                    return Some(Err(err));
                }
            }
        }

        let FileState::Open(lines) = &mut self.state else {
            return None;
        };
        match lines.next() {
            Some(Ok(line)) => Some(Ok(line)),
            Some(Err(source)) => {
                self.state = FileState::Finished;
                Some(Err(Error::SourceRead {
                    path: self.path.clone(),
                    source,
                }))
            }
            None => {
                self.state = FileState::Finished;
                None
            }
        }
    }
}

/// Lines held in memory, e.g. from a generator or a test fixture.
#[derive(Debug, Clone)]
pub struct MemoryLineSource {
    lines: Arc<[String]>,
}

impl MemoryLineSource {
    /// Create a source over the given lines.
    #[must_use]
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of lines in one pass.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the source has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl LineSource for MemoryLineSource {
    type Lines = MemoryLines;

    fn describe(&self) -> String {
        format!("memory ({} lines)", self.lines.len())
    }

    fn lines(&self) -> MemoryLines {
        MemoryLines {
            lines: Arc::clone(&self.lines),
            index: 0,
        }
    }
}

/// One pass over a [`MemoryLineSource`].
#[derive(Debug)]
pub struct MemoryLines {
    lines: Arc<[String]>,
    index: usize,
}

impl Iterator for MemoryLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.get(self.index)?.clone();
        self.index += 1;
        Some(Ok(line))
    }
}
