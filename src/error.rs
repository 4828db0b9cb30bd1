use thiserror::Error;

use crate::model::RaceKey;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("race {race}: field size {declared} does not match {supplied} supplied entries")]
    FieldSizeMismatch {
        race: RaceKey,
        declared: usize,
        supplied: usize,
    },

    #[error("race {race}: source failed: {message}")]
    Source { race: RaceKey, message: String },

    #[error("race {race}: result sink failed: {message}")]
    Sink { race: RaceKey, message: String },
}

impl EngineError {
    pub fn race(&self) -> &RaceKey {
        match self {
            EngineError::FieldSizeMismatch { race, .. }
            | EngineError::Source { race, .. }
            | EngineError::Sink { race, .. } => race,
        }
    }

    pub(crate) fn source_failed(race: &RaceKey, err: anyhow::Error) -> Self {
        EngineError::Source {
            race: race.clone(),
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn sink_failed(race: &RaceKey, err: anyhow::Error) -> Self {
        EngineError::Sink {
            race: race.clone(),
            message: format!("{err:#}"),
        }
    }
}
