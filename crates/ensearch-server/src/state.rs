//! Shared server state with a hot-swappable directory

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::config::ServerConfig;
use crate::directory::Directory;
use crate::error::{Result, ServerError};

pub struct ServerState {
    directory: ArcSwap<Directory>,
    /// File the directory is (re)loaded from
    source: Option<PathBuf>,
    pub config: ServerConfig,
}

pub type SharedState = Arc<ServerState>;

/// Outcome of a directory reload
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReloadResult {
    pub previous_profiles: usize,
    pub profiles: usize,
    pub loaded_at: i64,
}

impl ServerState {
    pub fn new(directory: Directory, config: ServerConfig) -> Self {
        crate::metrics::record_directory_size(directory.len());
        Self {
            directory: ArcSwap::from_pointee(directory),
            source: None,
            config,
        }
    }

    /// Load the directory from a file, remembering it for reloads
    pub fn from_file(path: impl Into<PathBuf>, config: ServerConfig) -> Result<Self> {
        let path = path.into();
        let directory = Directory::load(&path)?;
        tracing::info!(path = %path.display(), profiles = directory.len(), "Directory loaded");
        Ok(Self {
            source: Some(path),
            ..Self::new(directory, config)
        })
    }

    /// Current directory snapshot; requests in flight keep the one they took
    pub fn directory(&self) -> Arc<Directory> {
        self.directory.load_full()
    }

    /// Re-read the source file and swap it in.
    ///
    /// On failure the current directory stays in place.
    pub fn reload(&self) -> Result<ReloadResult> {
        let path = self.source.as_ref().ok_or(ServerError::NoSource)?;
        let next = Directory::load(path)?;
        let result = ReloadResult {
            previous_profiles: self.directory.load().len(),
            profiles: next.len(),
            loaded_at: next.loaded_at(),
        };

        crate::metrics::record_directory_size(next.len());
        self.directory.store(Arc::new(next));
        tracing::info!(
            path = %path.display(),
            previous = result.previous_profiles,
            profiles = result.profiles,
            "Directory reloaded"
        );
        Ok(result)
    }
}

pub fn create_shared_state(directory: Directory, config: ServerConfig) -> SharedState {
    Arc::new(ServerState::new(directory, config))
}
