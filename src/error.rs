use thiserror::Error;

/// Fatal, pipeline-aborting failures. Recoverable per-site diagnostics are
/// collected separately by the analysis pass; once any were reported the
/// phase as a whole fails with the `Analysis` variant.
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input tree: {0}")]
    Parse(String),

    #[error("preprocessing failed: {0}")]
    Preprocess(String),

    #[error("context analysis failed: {0}")]
    Analysis(String),

    #[error("loop lowering failed: {0}")]
    Lowering(String),
}

impl CompilerError {
    /// Process exit code for the driver, one per failing phase.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompilerError::Io(_) | CompilerError::Parse(_) => 1,
            CompilerError::Preprocess(_) => 2,
            CompilerError::Analysis(_) => 3,
            CompilerError::Lowering(_) => 4,
        }
    }
}
