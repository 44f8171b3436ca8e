use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SandboxError {
    #[error("syntax rejected: {0}")]
    SyntaxRejected(String),

    #[error("name not bound: {0}")]
    NameUnbound(String),

    #[error("domain error: {0}")]
    DomainError(String),

    #[error("evaluation timed out")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, SandboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SandboxError::SyntaxRejected("unexpected '['".to_string()).to_string(),
            "syntax rejected: unexpected '['"
        );
        assert_eq!(
            SandboxError::NameUnbound("q".to_string()).to_string(),
            "name not bound: q"
        );
        assert_eq!(
            SandboxError::DomainError("division by zero".to_string()).to_string(),
            "domain error: division by zero"
        );
        assert_eq!(SandboxError::Timeout.to_string(), "evaluation timed out");
    }
}
