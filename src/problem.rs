//! Client-facing problems attached to mutation payloads

use async_graphql::{Enum, SimpleObject};

use crate::errors::ErrorCode;
use crate::GraphQLError;

const INTERNAL_PROBLEM_MESSAGE: &str = "An internal error occurred while processing the request";

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemType {
    BadRequest,
    Conflict,
    NotFound,
    Forbidden,
    ServiceUnavailable,
    InternalError,
}

/// A mutation failure reported inside the payload instead of the error list
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub message: String,
    /// Path of the input field the problem relates to, when known
    pub field: Option<Vec<String>>,
    #[graphql(name = "type")]
    pub problem_type: ProblemType,
}

impl Problem {
    pub fn new(problem_type: ProblemType, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
            problem_type,
        }
    }

    pub fn with_field(mut self, field: &[&str]) -> Self {
        self.field = Some(field.iter().map(|f| f.to_string()).collect());
        self
    }
}

/// Convert a failed mutation into a problem
///
/// Internal failures keep their cause out of the response; it is logged
/// instead.
pub fn build_problem(err: &GraphQLError) -> Problem {
    let problem_type = match err.code() {
        ErrorCode::Conflict | ErrorCode::OptimisticLock => ProblemType::Conflict,
        ErrorCode::Invalid | ErrorCode::TooLarge => ProblemType::BadRequest,
        ErrorCode::NotFound => ProblemType::NotFound,
        ErrorCode::Forbidden | ErrorCode::Unauthorized => ProblemType::Forbidden,
        ErrorCode::ServiceUnavailable => ProblemType::ServiceUnavailable,
        ErrorCode::Internal => {
            tracing::error!(error = %err, "mutation failed with an internal error");
            return Problem::new(ProblemType::InternalError, INTERNAL_PROBLEM_MESSAGE);
        }
    };

    tracing::warn!(error = %err, problem = ?problem_type, "mutation returned a problem");
    Problem::new(problem_type, err.to_string())
}
