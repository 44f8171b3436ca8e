use thiserror::Error;
use veda_sandbox::SandboxError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("pattern {0} could not satisfy its validation rules")]
    PatternUnsatisfiable(String),

    #[error("unknown pattern: {0}")]
    UnknownPattern(String),

    #[error("no templates for concept: {0}")]
    UnknownConcept(String),

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            EngineError::PatternUnsatisfiable("quad_1".to_string()).to_string(),
            "pattern quad_1 could not satisfy its validation rules"
        );
        assert_eq!(
            EngineError::UnknownConcept("calculus".to_string()).to_string(),
            "no templates for concept: calculus"
        );
    }

    #[test]
    fn test_sandbox_error_converts() {
        let err: EngineError = SandboxError::Timeout.into();
        assert!(matches!(err, EngineError::Sandbox(_)));
    }
}
