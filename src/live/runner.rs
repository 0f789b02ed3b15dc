use super::{
    model::{DecodeError, LiveStatsResponse},
    shape::LiveColumns,
};
use crate::{
    columns::UnitStyle,
    config::{ConfigError, LiveConfig},
    node::Node,
    sink::RowSink,
};
use log::{debug, error, info, trace};
use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LiveError {
    #[error("invalid live config")]
    Config(#[from] ConfigError),
    #[error("failed to create live stats session")]
    CreateSession(#[source] anyhow::Error),
    #[error("failed to fetch live stats")]
    Fetch(#[source] anyhow::Error),
    #[error("failed to close live stats session")]
    CloseSession(#[source] anyhow::Error),
    #[error("malformed live stats response")]
    Decode(#[from] DecodeError),
    #[error("failed to write live stats")]
    Write(#[from] io::Error),
}

/// Transport side of a live session. The session is opened once, polled
/// every update period and closed when polling stops.
pub trait LiveClient {
    type Session;

    fn create_session(&mut self, config: &LiveConfig) -> anyhow::Result<Self::Session>;

    fn fetch(&mut self, session: &Self::Session) -> anyhow::Result<Node>;

    fn close_session(&mut self, session: Self::Session) -> anyhow::Result<()>;

    fn wait(&mut self, period: Duration) {
        std::thread::sleep(period);
    }
}

pub struct LiveRunner<C: LiveClient> {
    client: C,
    config: LiveConfig,
    unit_style: UnitStyle,
    shutdown: Arc<AtomicBool>,
}

impl<C: LiveClient> LiveRunner<C> {
    pub fn new(client: C, config: LiveConfig, unit_style: UnitStyle) -> Self {
        Self {
            client,
            config,
            unit_style,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Setting the returned flag stops polling before the next fetch.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn into_client(self) -> C {
        self.client
    }

    /// Polls until the configured number of rows has been written or
    /// shutdown is requested. The session is closed on every exit path.
    /// Returns the number of buckets written.
    pub fn run<S: RowSink>(&mut self, mut sink: S) -> Result<u64, LiveError> {
        self.config.validate()?;
        let session = self
            .client
            .create_session(&self.config)
            .map_err(LiveError::CreateSession)?;
        info!("live stats session created");

        let result = self.poll(&session, &mut sink);
        if let Err(e) = &result {
            error!("live stats polling failed: {}", e);
        }
        let closed = self.client.close_session(session);
        info!("live stats session closed");
        let written = result?;
        closed.map_err(LiveError::CloseSession)?;
        Ok(written)
    }

    fn poll<S: RowSink>(&mut self, session: &C::Session, sink: &mut S) -> Result<u64, LiveError> {
        let period = self.config.update_period as i64;
        let history_size = self.config.history_size as i64;
        let mut previous: Option<i64> = None;
        let mut columns: Option<LiveColumns> = None;
        let mut counter: u64 = 0;

        while self.more(counter) {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("shutdown requested, stopping live stats");
                break;
            }
            let node = self.client.fetch(session).map_err(LiveError::Fetch)?;
            let response = LiveStatsResponse::from_node(&node, self.unit_style)?;
            let timestamp = response.timestamp();

            match (previous, timestamp) {
                (Some(prev), Some(ts)) if prev != ts => {
                    let history_limit =
                        (ts.saturating_sub(prev) / period).clamp(0, history_size) as u64;
                    let row_limit = self
                        .config
                        .iterations
                        .map(|max| history_limit.min(max.saturating_sub(counter)) as usize);
                    if columns.is_none() {
                        columns = Some(response.write_header(sink)?);
                    }
                    if let Some(columns) = &columns {
                        let rows =
                            response.write_rows(sink, columns, Some(history_limit as usize), row_limit)?;
                        debug!("wrote {} live rows at {}", rows, ts);
                    }
                    sink.flush()?;
                    counter += history_limit;
                }
                _ => trace!("no new live data since {:?}", previous),
            }
            previous = timestamp;

            if self.more(counter) && !self.shutdown.load(Ordering::SeqCst) {
                self.client.wait(self.config.update_period());
            }
        }
        Ok(counter)
    }

    fn more(&self, counter: u64) -> bool {
        self.config.iterations.map_or(true, |max| counter < max)
    }
}
