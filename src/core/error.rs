//! Structured error types.
//!
//! Errors must be classifiable, attributable, and actionable.
//! Every error answers: What failed? Why? What can be done next?

use serde::{Deserialize, Serialize};

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rule violations in user-supplied data (correctable by the user).
    Validation,
    /// Failures inside the finance computation pass.
    Computation,
    /// Persistence failures (always advisory at the container boundary).
    Storage,
    /// JSON import/export failures.
    Import,
    /// Invalid requests (unknown scenario, unknown menu item, bad flags).
    User,
    /// System-level errors (IO, environment).
    System,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Computation => write!(f, "computation"),
            Self::Storage => write!(f, "storage"),
            Self::Import => write!(f, "import"),
            Self::User => write!(f, "user"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Structured error with full context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerError {
    /// Error category for classification.
    pub category: ErrorCategory,
    /// Unique error code within category.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Component and operation that originated the error.
    pub origin: String,
    /// Hint for recovery action.
    pub recovery_hint: Option<String>,
}

impl PlannerError {
    /// Creates a new error with the given parameters.
    #[must_use]
    pub fn new(
        category: ErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            origin: origin.into(),
            recovery_hint: None,
        }
    }

    /// Sets the recovery hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.recovery_hint = Some(hint.into());
        self
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(
        code: impl Into<String>,
        message: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::Validation, code, message, origin)
    }

    /// Creates a computation error.
    #[must_use]
    pub fn computation(
        code: impl Into<String>,
        message: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::Computation, code, message, origin)
    }

    /// Creates a storage error.
    #[must_use]
    pub fn storage(
        code: impl Into<String>,
        message: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::Storage, code, message, origin)
    }

    /// Creates an import error.
    #[must_use]
    pub fn import(
        code: impl Into<String>,
        message: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::Import, code, message, origin)
    }

    /// Creates a user input error.
    #[must_use]
    pub fn user(
        code: impl Into<String>,
        message: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::User, code, message, origin)
    }

    /// Creates a system error.
    #[must_use]
    pub fn system(
        code: impl Into<String>,
        message: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCategory::System, code, message, origin)
    }
}

impl std::fmt::Display for PlannerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PlannerError {}

/// Result type using `PlannerError`.
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Exit codes for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    NotFound = 2,
    Invalid = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_the_message() {
        let err = PlannerError::computation(
            "no_margin",
            "average contribution margin is zero",
            "engine:compute",
        );
        assert_eq!(err.to_string(), "average contribution margin is zero");
    }

    #[test]
    fn error_with_hint() {
        let err = PlannerError::user(
            "scenario_not_found",
            "Scenario peak not found",
            "manager:set_current_scenario",
        )
        .with_hint("Run `prixfixe scenario list` to see known scenarios");

        assert_eq!(err.category, ErrorCategory::User);
        assert!(err.recovery_hint.is_some());
    }

    #[test]
    fn error_serialization() {
        let err = PlannerError::storage("write_failed", "disk full", "storage:file");
        let json = serde_json::to_string(&err).expect("serialize");
        let restored: PlannerError = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored.category, ErrorCategory::Storage);
        assert_eq!(restored.code, "write_failed");
    }
}
