//! Live statistics: short rolling histories polled from an open session and
//! written as one CSV table that grows with every new bucket.

pub mod model;
pub mod replay;
pub mod runner;
pub mod shape;

pub use model::{DataSet, DecodeError, LivePoint, LiveStatsResponse, Set, StatsGroup};
pub use replay::ReplayClient;
pub use runner::{LiveClient, LiveError, LiveRunner};
pub use shape::LiveColumns;
