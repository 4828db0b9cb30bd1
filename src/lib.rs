pub mod config;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod fake_day;
pub mod indices;
pub mod model;
pub mod profile;
pub mod race_ranker;
pub mod rank;
pub mod snapshot;

pub use engine::{DaySummary, Engine, FieldSource, HistorySource, ResultSink};
pub use error::EngineError;
