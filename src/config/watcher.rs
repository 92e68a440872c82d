//! Configuration file watcher for hot reload.
//!
//! Editors usually emit several modify events per save. Each event reloads
//! and validates the file, but only a configuration that differs from the last
//! forwarded one reaches the server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::VerifierConfig;

/// Drops reloads identical to the previously forwarded configuration.
#[derive(Debug, Default)]
pub struct ReloadFilter {
    last: Option<VerifierConfig>,
}

impl ReloadFilter {
    /// Seed the filter with the configuration the server started with.
    pub fn new(initial: Option<VerifierConfig>) -> Self {
        Self { last: initial }
    }

    /// Return the configuration if it should be forwarded.
    pub fn accept(&mut self, config: VerifierConfig) -> Option<VerifierConfig> {
        if self.last.as_ref() == Some(&config) {
            return None;
        }
        self.last = Some(config.clone());
        Some(config)
    }
}

/// Watches the configuration file and forwards validated changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<VerifierConfig>,
    filter: ReloadFilter,
}

impl ConfigWatcher {
    /// Create a watcher for `path`, seeded with the configuration already in use.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path, current: &VerifierConfig) -> (Self, mpsc::UnboundedReceiver<VerifierConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
                filter: ReloadFilter::new(Some(current.clone())),
            },
            update_rx,
        )
    }

    /// Start watching the file. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();
        let mut filter = self.filter;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let config = match load_config(&path) {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::error!(path = ?path, error = %e, "Invalid config change, keeping current configuration");
                            return;
                        }
                    };

                    match filter.accept(config) {
                        Some(config) => {
                            tracing::info!(path = ?path, "Config file changed, reloading");
                            if tx.send(config).is_err() {
                                tracing::debug!("Config receiver dropped, ignoring reload");
                            }
                        }
                        None => tracing::debug!(path = ?path, "Config file event without changes"),
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_reloads_are_dropped() {
        let initial = VerifierConfig::default();
        let mut filter = ReloadFilter::new(Some(initial.clone()));

        assert!(filter.accept(initial.clone()).is_none());

        let mut changed = initial;
        changed.polling.max_attempts = 5;
        assert_eq!(filter.accept(changed.clone()), Some(changed.clone()));
        assert!(filter.accept(changed).is_none());
    }

    #[test]
    fn test_unseeded_filter_forwards_first_config() {
        let mut filter = ReloadFilter::default();
        assert!(filter.accept(VerifierConfig::default()).is_some());
    }
}
