//! HTTP error responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{StoreError, TurnError};

/// An error rendered as `{"message": ...}` with a status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "{}", self.message);
        }
        (
            self.status,
            Json(serde_json::json!({ "message": self.message })),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match &e {
            StoreError::UserNotFound { .. }
            | StoreError::ConversationNotFound { .. }
            | StoreError::NoConversationForUser { .. }
            | StoreError::MilestoneNotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::UsernameTaken { .. }
            | StoreError::ConversationExists { .. }
            | StoreError::ReplyPending { .. } => StatusCode::CONFLICT,
        };
        Self::new(status, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::EmptyMessage => Self::bad_request(e.to_string()),
            TurnError::Store(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_statuses() {
        let cases = [
            (StoreError::UserNotFound { user_id: 1 }, StatusCode::NOT_FOUND),
            (StoreError::MilestoneNotFound { milestone_id: "x".into() }, StatusCode::NOT_FOUND),
            (StoreError::UsernameTaken { username: "a".into() }, StatusCode::CONFLICT),
            (StoreError::ReplyPending { conversation_id: 1 }, StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_turn_error_statuses() {
        assert_eq!(ApiError::from(TurnError::EmptyMessage).status, StatusCode::BAD_REQUEST);
        let e = ApiError::from(TurnError::Store(StoreError::ConversationNotFound { conversation_id: 9 }));
        assert_eq!(e.status, StatusCode::NOT_FOUND);
        assert_eq!(e.message, "Conversation not found: 9");
    }
}
