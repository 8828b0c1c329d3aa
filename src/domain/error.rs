//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent malformed decision trees.
/// These are independent of session and infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("options question has no options: {0}")]
    EmptyOptions(String),

    #[error("empty option label in question: {0}")]
    EmptyLabel(String),

    #[error("duplicate option label '{label}' in question: {question}")]
    DuplicateLabel { question: String, label: String },

    #[error("unknown tree node referenced by: {0}")]
    UnknownNode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(err: &DomainError) -> &'static str {
        match err {
            DomainError::EmptyOptions(_) => "empty-options",
            DomainError::EmptyLabel(_) => "empty-label",
            DomainError::DuplicateLabel { .. } => "duplicate-label",
            DomainError::UnknownNode(_) => "unknown-node",
        }
    }

    #[test]
    fn given_builder_failures_when_displayed_then_name_the_question() {
        let errors = [
            DomainError::EmptyOptions("Which field?".into()),
            DomainError::EmptyLabel("Which field?".into()),
            DomainError::DuplicateLabel {
                question: "Which field?".into(),
                label: "words".into(),
            },
            DomainError::UnknownNode("Which field?".into()),
        ];

        for err in &errors {
            assert!(err.to_string().contains("Which field?"), "{}", kind(err));
        }
        assert_eq!(
            errors.iter().map(kind).collect::<Vec<_>>(),
            vec!["empty-options", "empty-label", "duplicate-label", "unknown-node"]
        );
    }
}
