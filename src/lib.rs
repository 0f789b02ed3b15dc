pub mod columns;
pub mod config;
pub mod live;
pub mod node;
pub mod shape;
pub mod sink;
pub mod stat;
pub mod timeline;
pub mod value;

pub use columns::UnitStyle;
pub use config::{Config, ConfigError, LiveConfig, ShapeConfig};
pub use live::{LiveClient, LiveError, LiveRunner, LiveStatsResponse, ReplayClient};
pub use node::{Format, Node};
pub use sink::{CsvSink, RowBuffer, RowSink};
pub use stat::{Diagnostic, MeasurementPoint, Statistic, StatsResponse};
