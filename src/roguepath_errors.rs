use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoguePathError {
    #[error("Invalid angular step: {0} (must be strictly positive and below 360)")]
    InvalidAngularStep(f64),

    #[error("Invalid annulus radii: inner {inner} must be smaller than outer {outer}")]
    InvalidAnnulus { inner: f64, outer: f64 },

    #[error("Proposal table not found: {0}")]
    MissingTable(String),

    #[error("Missing required column `{column}` in table `{table}`")]
    MissingColumn { table: String, column: String },

    #[error("Observation not found: {0}")]
    ObservationNotFound(u32),

    #[error("Observation {0} has not been swept yet (call Program::run first)")]
    ObservationNotSwept(u32),

    #[error("Susceptibility polygon needs at least 3 vertices, got {0}")]
    DegeneratePolygon(usize),

    #[error("Background model failed: {0}")]
    BackgroundModelFailure(String),

    #[error("Background model timed out after {0:?}")]
    BackgroundModelTimeout(std::time::Duration),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PartialEq for RoguePathError {
    fn eq(&self, other: &Self) -> bool {
        use RoguePathError::*;
        match (self, other) {
            (InvalidAngularStep(a), InvalidAngularStep(b)) => a == b,
            (
                InvalidAnnulus { inner: a, outer: b },
                InvalidAnnulus { inner: c, outer: d },
            ) => a == c && b == d,
            (MissingTable(a), MissingTable(b)) => a == b,
            (
                MissingColumn { table: a, column: b },
                MissingColumn { table: c, column: d },
            ) => a == c && b == d,
            (ObservationNotFound(a), ObservationNotFound(b)) => a == b,
            (ObservationNotSwept(a), ObservationNotSwept(b)) => a == b,
            (DegeneratePolygon(a), DegeneratePolygon(b)) => a == b,
            (BackgroundModelFailure(a), BackgroundModelFailure(b)) => a == b,
            (BackgroundModelTimeout(a), BackgroundModelTimeout(b)) => a == b,

            // Wrapped foreign errors are not comparable: equal if same variant
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (JsonError(_), JsonError(_)) => true,

            _ => false,
        }
    }
}
