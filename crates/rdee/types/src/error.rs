use crate::node::StageOrdinal;
use crate::trace::FaultKind;
use thiserror::Error;

/// Errors raised anywhere in the filtering engine.
///
/// Variants split into two classes. Branch-local errors (see
/// [`RdeeError::fault_kind`]) end only the branch that raised them; the
/// branch is finalized as a `Faulted` trace and its siblings keep going.
/// Everything else halts the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RdeeError {
    #[error("invalid bounds for parameter '{parameter}': {reason}")]
    InvalidBounds { parameter: String, reason: String },

    #[error("stage {stage} produced malformed score {score} (expected a probability in [0, 1])")]
    MalformedScore { stage: StageOrdinal, score: f64 },

    #[error("branching policy requested {requested} children, fan-out cap is {max}")]
    FanoutExceeded { requested: usize, max: u32 },

    #[error("depth budget exceeded: node at depth {depth} with max_depth {max_depth}")]
    DepthBudgetExceeded { depth: u32, max_depth: u32 },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("stage {stage} requires parameter '{parameter}' which is not bounded")]
    MissingParameter {
        stage: StageOrdinal,
        parameter: String,
    },

    #[error("no evaluator registered for stage {0}")]
    UnknownStage(StageOrdinal),

    #[error("evaluator for stage {stage} failed: {message}")]
    Evaluator { stage: StageOrdinal, message: String },

    #[error("trace invariant violated: {0}")]
    TraceInvariant(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("trace archive error: {0}")]
    Archive(String),

    #[error("worker failure: {0}")]
    Worker(String),
}

impl RdeeError {
    /// The fault classification of a branch-local error, `None` for fatal ones.
    ///
    /// `InvalidBounds` is branch-local here because configured bounds are
    /// validated before any sampling starts; during exploration it can only
    /// come from a branching policy proposing an out-of-range child.
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            Self::MalformedScore { .. } => Some(FaultKind::MalformedScore),
            Self::FanoutExceeded { .. } => Some(FaultKind::FanoutExceeded),
            Self::InvalidBounds { .. } => Some(FaultKind::InvalidChild),
            Self::MissingParameter { .. } => Some(FaultKind::MissingParameter),
            Self::Evaluator { .. } => Some(FaultKind::Evaluator),
            _ => None,
        }
    }

    /// Whether the error terminates only the current branch.
    pub fn is_branch_local(&self) -> bool {
        self.fault_kind().is_some()
    }

    pub fn invalid_bounds(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBounds {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for RdeeError {
    fn from(e: serde_json::Error) -> Self {
        RdeeError::Serialization(e.to_string())
    }
}

/// Convenience type alias for engine results.
pub type RdeeResult<T> = Result<T, RdeeError>;
