use super::runner::LiveClient;
use crate::{
    config::LiveConfig,
    node::{Format, Node},
};
use anyhow::{bail, Context};
use log::debug;
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

/// Plays saved live responses back in order, without waiting between them.
/// Raises `shutdown` once the last one has been served.
pub struct ReplayClient {
    paths: Vec<PathBuf>,
    format: Option<Format>,
    next: usize,
    shutdown: Option<Arc<AtomicBool>>,
}

impl ReplayClient {
    pub fn new(paths: Vec<PathBuf>, format: Option<Format>) -> Self {
        Self {
            paths,
            format,
            next: 0,
            shutdown: None,
        }
    }

    pub fn stop_when_done(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
}

impl LiveClient for ReplayClient {
    type Session = ();

    fn create_session(&mut self, config: &LiveConfig) -> anyhow::Result<()> {
        if self.paths.is_empty() {
            bail!("no live responses to replay");
        }
        debug!(
            "replaying {} live responses, update period {}s",
            self.paths.len(),
            config.update_period
        );
        Ok(())
    }

    fn fetch(&mut self, _session: &()) -> anyhow::Result<Node> {
        let path = match self.paths.get(self.next) {
            Some(path) => path,
            None => bail!("all {} live responses replayed", self.paths.len()),
        };
        self.next += 1;
        if self.next == self.paths.len() {
            if let Some(shutdown) = &self.shutdown {
                shutdown.store(true, Ordering::SeqCst);
            }
        }
        let format = self.format.unwrap_or_else(|| Format::from_path(path));
        Node::from_path(path, format)
            .with_context(|| format!("error reading live response {}", path.display()))
    }

    fn close_session(&mut self, _session: ()) -> anyhow::Result<()> {
        Ok(())
    }

    fn wait(&mut self, _period: Duration) {}
}
