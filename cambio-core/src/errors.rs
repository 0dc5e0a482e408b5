use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CambioError {
    #[error("Invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: String,
        value: f64,
        reason: String,
    },
    #[error("Emissions scenario shape is undefined for inv_time_constant={inv_time_constant} and transition_duration={transition_duration}. Their product must lie strictly between 0 and 3 for the peak year to be invertible.")]
    UndefinedScenarioShape {
        inv_time_constant: f64,
        transition_duration: f64,
    },
    #[error("Could not parse parameter overrides: {0}")]
    ConfigParse(String),
    #[error("Atmospheric carbon became non-positive ({c_atm}) in year {year}; ocean pH is undefined")]
    NonPositiveAtmosphericCarbon { year: f64, c_atm: f64 },
    #[error("Internal error: output {variable} differs from its input at index {index} (expected {expected}, got {actual})")]
    InconsistentOutput {
        variable: String,
        index: usize,
        expected: f64,
        actual: f64,
    },
    #[error("Could not build the atmospheric carbon noise distribution: {0}")]
    Stochastic(String),
    #[error("Scenario {0} is defined more than once")]
    DuplicateScenario(String),
}

/// Convenience type for `Result<T, CambioError>`.
pub type CambioResult<T> = Result<T, CambioError>;

impl CambioError {
    pub(crate) fn invalid(name: &str, value: f64, reason: &str) -> Self {
        CambioError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        }
    }

    /// True for errors caused by the caller's configuration rather than by the model.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            CambioError::InvalidParameter { .. }
                | CambioError::UndefinedScenarioShape { .. }
                | CambioError::ConfigParse(_)
                | CambioError::DuplicateScenario(_)
        )
    }
}
