use thiserror::Error;

// Unified error type for the generator
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // Code placement
    #[error("Address conflict: 0x{0:04X} to 0x{1:04X} overlaps with block 0x{2:04X} to 0x{3:04X}")]
    CodeOverlap(u64, u64, u64, u64),

    #[error("No code at 0x{0:04X}")]
    NoCode(u64),

    // Expansion
    #[error("No suitable preparator is found for {0}.")]
    NoPreparator(String),

    #[error("Unresolved dependency: call {0} depends on a call outside its sequence")]
    UnresolvedDependency(usize),

    #[error("Malformed primitive: {0}")]
    MalformedPrimitive(String),

    #[error("Unassigned argument {1} of {0}")]
    UnassignedArgument(String, String),

    // Labels
    #[error("Label redefinition: {0}")]
    LabelRedefinition(String),

    #[error("Duplicate label: {0}")]
    DuplicateLabel(String),

    #[error("No label scope is open")]
    NoOpenScope,

    #[error("Cannot reset label series while {0} scope(s) are open")]
    ScopeOpen(usize),

    // Composition
    #[error("Unknown combinator: {0}")]
    UnknownCombinator(String),

    #[error("Unknown compositor: {0}")]
    UnknownCompositor(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    // Presimulation
    #[error("Execution limit: {0} executed more than {1} times")]
    ExecutionLimit(String, usize),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Query failed for situation {0}: {1}")]
    Query(String, String),

    #[error("Allocation failed: no {1} value left for {0}")]
    AllocationFailed(String, String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Generation of sequence {sequence} aborted: {source}")]
    Aborted { sequence: usize, source: Box<Error> },
}

impl Error {
    pub fn aborted(sequence: usize, err: Error) -> Self {
        match err {
            Error::Aborted { .. } => err,
            _ => Error::Aborted {
                sequence,
                source: Box::new(err),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
