//! Engine and orchestrator configuration.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::hash::strong::{md5_factory, StrongHasherFactory};
use crate::transfer::accessor::FileAccessor;
use crate::transfer::requester::BlockRequester;

/// Upper bound on the checksum block size.
pub const MAX_BLOCK_SIZE: usize = 128 * 1024;

/// Block size applied when none is configured.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Cap applied to missing spans when none is configured.
pub const DEFAULT_MAX_REQUEST_BLOCK_SIZE: u64 = 512 * 1024;

/// Period between background signatures when none is configured.
pub const DEFAULT_REQUEST_UPDATE_INTERVAL: Duration = Duration::from_secs(4);

/// Callback returning the byte size of the reference source.
pub type SizeFn = Box<dyn Fn() -> io::Result<u64> + Send + Sync>;

/// Rejected configurations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid block length {0}")]
    InvalidBlockLength(usize),

    #[error("requester must be specified")]
    MissingRequester,

    #[error("size function must be specified")]
    MissingSizeFn,

    #[error("file accessor must be specified")]
    MissingFileAccessor,
}

/// Parameters for building a [`BlockSync`](crate::BlockSync) engine or a
/// [`SyncNode`](crate::SyncNode) around one.
///
/// Only the requester and the size callback are mandatory; everything else
/// falls back to a default during validation.
pub struct Config {
    /// Checksum block size in bytes; 0 selects the default.
    pub block_size: usize,
    /// Factory for strong hashers; MD5 when unset.
    pub strong_hasher: Option<StrongHasherFactory>,
    /// Cap on a single missing span; explicit 0 disables capping.
    pub max_request_block_size: Option<u64>,
    /// Fetcher for missing byte ranges of the source.
    pub requester: Option<Box<dyn BlockRequester>>,
    /// Size of the reference source.
    pub size_fn: Option<SizeFn>,
    /// Period between background signatures (orchestrator only).
    pub request_update_interval: Duration,
    /// Staging directory for patch output (orchestrator only).
    pub temp_file_dir: Option<PathBuf>,
    /// Access to the local replica (orchestrator only).
    pub file_accessor: Option<Arc<dyn FileAccessor>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: 0,
            strong_hasher: None,
            max_request_block_size: None,
            requester: None,
            size_fn: None,
            request_update_interval: DEFAULT_REQUEST_UPDATE_INTERVAL,
            temp_file_dir: None,
            file_accessor: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn strong_hasher(mut self, factory: StrongHasherFactory) -> Self {
        self.strong_hasher = Some(factory);
        self
    }

    pub fn max_request_block_size(mut self, size: u64) -> Self {
        self.max_request_block_size = Some(size);
        self
    }

    pub fn requester(mut self, requester: Box<dyn BlockRequester>) -> Self {
        self.requester = Some(requester);
        self
    }

    pub fn size_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> io::Result<u64> + Send + Sync + 'static,
    {
        self.size_fn = Some(Box::new(f));
        self
    }

    pub fn request_update_interval(mut self, interval: Duration) -> Self {
        self.request_update_interval = interval;
        self
    }

    pub fn temp_file_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_file_dir = Some(dir.into());
        self
    }

    pub fn file_accessor(mut self, accessor: Arc<dyn FileAccessor>) -> Self {
        self.file_accessor = Some(accessor);
        self
    }

    /// Check the mandatory fields and resolve defaults.
    pub(crate) fn into_validated(self) -> Result<ValidatedConfig, ConfigError> {
        if self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::InvalidBlockLength(self.block_size));
        }

        let requester = self.requester.ok_or(ConfigError::MissingRequester)?;
        let size_fn = self.size_fn.ok_or(ConfigError::MissingSizeFn)?;

        let block_size = if self.block_size == 0 {
            DEFAULT_BLOCK_SIZE
        } else {
            self.block_size
        };

        Ok(ValidatedConfig {
            block_size,
            strong_hasher: self.strong_hasher.unwrap_or_else(md5_factory),
            max_request_block_size: self
                .max_request_block_size
                .unwrap_or(DEFAULT_MAX_REQUEST_BLOCK_SIZE),
            requester,
            size_fn,
            request_update_interval: self.request_update_interval,
            temp_file_dir: self.temp_file_dir,
            file_accessor: self.file_accessor,
        })
    }
}

/// A configuration with defaults resolved and mandatory fields present.
pub(crate) struct ValidatedConfig {
    pub(crate) block_size: usize,
    pub(crate) strong_hasher: StrongHasherFactory,
    pub(crate) max_request_block_size: u64,
    pub(crate) requester: Box<dyn BlockRequester>,
    pub(crate) size_fn: SizeFn,
    pub(crate) request_update_interval: Duration,
    pub(crate) temp_file_dir: Option<PathBuf>,
    pub(crate) file_accessor: Option<Arc<dyn FileAccessor>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::requester::ReadSeekerRequester;
    use std::io::Cursor;

    fn requester() -> Box<dyn BlockRequester> {
        Box::new(ReadSeekerRequester::new(Cursor::new(Vec::new())))
    }

    #[test]
    fn test_oversized_block_length_rejected() {
        let config = Config::new().block_size(512 * 1024 * 1024);
        let err = config.into_validated().err().unwrap();

        assert_eq!(err, ConfigError::InvalidBlockLength(512 * 1024 * 1024));
        assert!(err.to_string().contains("invalid block length"));
    }

    #[test]
    fn test_missing_requester_rejected() {
        let err = Config::new().block_size(4).into_validated().err().unwrap();

        assert_eq!(err, ConfigError::MissingRequester);
        assert!(err.to_string().contains("requester must be specified"));
    }

    #[test]
    fn test_missing_size_fn_rejected() {
        let err = Config::new()
            .block_size(4)
            .requester(requester())
            .into_validated()
            .err()
            .unwrap();

        assert_eq!(err, ConfigError::MissingSizeFn);
        assert!(err.to_string().contains("size function must be specified"));
    }

    #[test]
    fn test_defaults_applied() {
        let validated = Config::new()
            .requester(requester())
            .size_fn(|| Ok(0))
            .into_validated()
            .unwrap();

        assert_eq!(validated.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(
            validated.max_request_block_size,
            DEFAULT_MAX_REQUEST_BLOCK_SIZE
        );
        assert_eq!(
            validated.request_update_interval,
            DEFAULT_REQUEST_UPDATE_INTERVAL
        );

        // Unset strong hasher falls back to MD5.
        let mut hasher = (validated.strong_hasher)();
        assert_eq!(hasher.output_len(), 16);
        hasher.write(b"");
        assert_eq!(
            hex::encode(hasher.finalize()),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_explicit_zero_cap_disables_capping() {
        let validated = Config::new()
            .max_request_block_size(0)
            .requester(requester())
            .size_fn(|| Ok(0))
            .into_validated()
            .unwrap();

        assert_eq!(validated.max_request_block_size, 0);
    }

    #[test]
    fn test_max_block_size_accepted() {
        let validated = Config::new()
            .block_size(MAX_BLOCK_SIZE)
            .requester(requester())
            .size_fn(|| Ok(0))
            .into_validated()
            .unwrap();

        assert_eq!(validated.block_size, MAX_BLOCK_SIZE);
    }
}
