use thiserror::Error;

#[derive(Error, Debug)]
pub enum PKError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid model configuration: {0}")]
    InvalidModel(String),

    #[error("Invalid dosing configuration: {0}")]
    InvalidDosing(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Parameter validation error: {0}")]
    Validation(String),

    #[error("Random number generation error")]
    Random,
}

impl From<rand_distr::NormalError> for PKError {
    fn from(_: rand_distr::NormalError) -> Self {
        PKError::Random
    }
}

pub type PKResult<T> = Result<T, PKError>;

/// Status codes returned by the core computation surface (`calculator`,
/// `concentration`). Distinct from `PKError`: these are not wrapped with
/// `?` through the ambient config/IO layer, they are returned verbatim by
/// the multi-concentration calculator and matched on by its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputingStatus {
    Ok,
    ConcentrationCalculatorNoParameters,
    DensityError,
    NoSteadyState,
    BadParameters,
    SampleExtractionError,
    Nan,
}

impl ComputingStatus {
    pub fn is_ok(self) -> bool {
        matches!(self, ComputingStatus::Ok)
    }
}
