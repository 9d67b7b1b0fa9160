use chrono::NaiveDate;

/// Run-level error carrying the process exit code.
///
/// Exit codes:
/// - `2`: configuration / local I/O
/// - `3`: schema violation in the source data
/// - `4`: fetch / network failure
/// - `5`: chart rendering failure
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Fatal data-integrity failures raised by the transformation core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("missing required column `{raw}` (maps to `{column}`)")]
    MissingColumn { column: String, raw: String },

    #[error("line {line}: missing required value for `{column}`")]
    MissingValue { line: usize, column: String },

    #[error("line {line}: invalid value '{value}' for `{column}`")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
    },

    #[error("line {line}: unknown region code '{code}'")]
    UnknownRegion { line: usize, code: String },

    #[error("duplicate row for ({entity}, {kind}, {date})")]
    DuplicateKey {
        entity: String,
        kind: String,
        date: NaiveDate,
    },

    #[error("moving-average window must be a positive number of days (got {0})")]
    InvalidWindow(usize),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidWindow(_) => AppError::new(2, err.to_string()),
            _ => AppError::new(3, format!("Schema violation: {err}")),
        }
    }
}

/// A non-fatal outcome: some entity or stage produced nothing.
///
/// These never abort a run. They are logged when they happen and listed in the
/// run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skipped {
    /// No population is known for the country; per-capita values are null.
    LookupMiss { country: String },
    /// The series never had a full window, so no smoothed rows were produced.
    ///
    /// `with_values` counts observations carrying at least one metric value.
    InsufficientWindow {
        entity: String,
        observations: usize,
        with_values: usize,
        window: usize,
    },
    /// A filter stage left nothing behind.
    EmptyResult { stage: &'static str },
}

impl std::fmt::Display for Skipped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Skipped::LookupMiss { country } => {
                write!(f, "no population found for {country}; per-capita values are empty")
            }
            Skipped::InsufficientWindow {
                entity,
                observations,
                with_values,
                window,
            } => write!(
                f,
                "{entity}: no defined {window}-day window in {observations} observation(s), {with_values} with values"
            ),
            Skipped::EmptyResult { stage } => write!(f, "{stage}: no rows left"),
        }
    }
}
