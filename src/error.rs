use std::backtrace::Backtrace;
pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error(
        "variable `{variable}`: lower bounds have {lower_len} cells but upper bounds have {upper_len}"
    )]
    ShapeMismatch {
        variable: String,
        lower_len: usize,
        upper_len: usize,
    },

    #[error(
        "variable `{variable}`: lower bound {lower} exceeds upper bound {upper} at cell {index}"
    )]
    InvalidBounds {
        variable: String,
        index: usize,
        lower: i64,
        upper: i64,
    },

    #[error("variable `{name}` is already declared")]
    DuplicateVariable { name: String },

    #[error("constraint `{constraint}` references undeclared variable `{variable}`")]
    UnknownVariable {
        constraint: String,
        variable: String,
    },

    #[error("problem has no constraints")]
    EmptyProblem,

    #[error("index {index:?} is outside a view of shape {dims:?}")]
    IndexOutOfRange { index: Vec<usize>, dims: Vec<usize> },

    #[error("constraint `{constraint}` failed to evaluate after {nodes} nodes: {source}")]
    ConstraintEvaluationFailed {
        constraint: String,
        nodes: u64,
        source: Box<SolverError>,
    },

    #[error(
        "constraint `{constraint}` rejected a candidate without reading any cell (after {nodes} nodes)"
    )]
    NoCellsRead { constraint: String, nodes: u64 },

    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Inner: {inner}\n{backtrace}")]
    Inner {
        inner: Box<SolverError>,
        backtrace: Box<Backtrace>,
    },
}

impl From<SolverError> for Error {
    fn from(inner: SolverError) -> Self {
        Error::Inner {
            inner: Box::new(inner),
            backtrace: Box::new(std::backtrace::Backtrace::capture()),
        }
    }
}

impl Error {
    /// The underlying error kind, without the captured backtrace.
    pub fn kind(&self) -> &SolverError {
        match self {
            Error::Inner { inner, .. } => inner,
        }
    }
}
