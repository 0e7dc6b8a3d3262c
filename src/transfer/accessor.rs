//! Access to the local replica consumed by the orchestrator.

use std::fs::{self, File};
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

/// Readable and seekable handle, boxable as a trait object.
pub trait ReadSeeker: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeeker for T {}

/// File operations the orchestrator performs on the local replica.
pub trait FileAccessor: Send + Sync {
    /// Current size in bytes.
    fn size(&self) -> io::Result<u64>;

    /// Modification time in UTC.
    fn mod_time(&self) -> io::Result<DateTime<Utc>>;

    /// Open a fresh reader over the current contents.
    fn open_read(&self) -> io::Result<Box<dyn ReadSeeker>>;

    /// Atomically replace the contents with everything in `reader`.
    fn replace_contents(&self, reader: &mut dyn Read) -> io::Result<()>;
}

/// Accessor over a path on the local filesystem.
///
/// Replacements are staged in a temp file and renamed over the target, so
/// concurrent readers always observe either the old or the new contents.
pub struct LocalFileAccessor {
    path: PathBuf,
    temp_dir: Option<PathBuf>,
}

impl LocalFileAccessor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temp_dir: None,
        }
    }

    /// Stage replacements in `dir` instead of the file's parent directory.
    ///
    /// The directory must live on the same filesystem as the target for the
    /// final rename to stay atomic.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    fn staging_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(|| {
            self.path
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        })
    }
}

impl FileAccessor for LocalFileAccessor {
    fn size(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    fn mod_time(&self) -> io::Result<DateTime<Utc>> {
        let modified = fs::metadata(&self.path)?.modified()?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn open_read(&self) -> io::Result<Box<dyn ReadSeeker>> {
        Ok(Box::new(File::open(&self.path)?))
    }

    fn replace_contents(&self, reader: &mut dyn Read) -> io::Result<()> {
        let mut staged = NamedTempFile::new_in(self.staging_dir())?;
        io::copy(reader, &mut staged)?;
        staged.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
