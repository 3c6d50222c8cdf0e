//! Hot reload of the config file into a [`SharedConfig`].
//!
//! The parent directory is watched rather than the file, so editors that
//! save by rename keep triggering reloads. Reloaded settings are only picked
//! up by the check loop on its next start.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::loader::{load_config, ConfigError};
use crate::config::provider::SharedConfig;

/// Reloads one config file into a shared config.
#[derive(Clone)]
pub struct ConfigWatcher {
    path: PathBuf,
    shared: Arc<SharedConfig>,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>, shared: Arc<SharedConfig>) -> Self {
        Self {
            path: path.into(),
            shared,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file and swap it in.
    ///
    /// Returns `Ok(false)` when the file matches the current config. A file
    /// that fails to load or validate leaves the current config in place.
    pub fn reload(&self) -> Result<bool, ConfigError> {
        let new_config = load_config(&self.path)?;
        if *self.shared.load() == new_config {
            return Ok(false);
        }
        self.shared.store(new_config);
        Ok(true)
    }

    fn handle_event(&self, event: Event) {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }
        let file_name = self.path.file_name();
        if !event.paths.iter().any(|p| p.file_name() == file_name) {
            return;
        }

        match self.reload() {
            Ok(true) => tracing::info!(
                path = %self.path.display(),
                "Configuration updated, applies on next service restart"
            ),
            Ok(false) => tracing::debug!(path = %self.path.display(), "Config file touched, no changes"),
            Err(e) => tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to reload config, keeping current configuration"
            ),
        }
    }

    /// Start watching on notify's background thread.
    ///
    /// Reloads stop when the returned watcher is dropped.
    pub fn watch(&self) -> Result<RecommendedWatcher, notify::Error> {
        let handler = self.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => handler.handle_event(event),
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}
