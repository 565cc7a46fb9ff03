//! Stable, human-readable messages for every failure category.

use crate::api::ApiError;

pub const BACKEND_UNREACHABLE: &str = "Could not reach the backend. Check that the server is running.";
pub const SESSION_EXPIRED: &str = "Session expired or not authorized. Please log in again.";
pub const UNEXPECTED_REPLY: &str = "The backend sent an unexpected reply.";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";

/// Generic message for a failed backend call.
pub fn describe(err: &ApiError) -> String {
    match err {
        ApiError::Auth(_) => SESSION_EXPIRED.to_string(),
        ApiError::Server { status, .. } => format!("The backend returned an error (HTTP {status})."),
        ApiError::Network(_) => BACKEND_UNREACHABLE.to_string(),
        ApiError::Decode(_) => UNEXPECTED_REPLY.to_string(),
    }
}

/// Chat failures all read as "could not reach the backend"; an HTTP-level
/// failure names its status so it can be told apart from a dead connection.
pub fn chat_failure(err: &ApiError) -> String {
    match err.status() {
        Some(status) => format!("Could not reach the backend (HTTP {status}). Try again in a moment."),
        None if err.is_network() => BACKEND_UNREACHABLE.to_string(),
        None => format!("Could not reach the backend: {}", UNEXPECTED_REPLY.to_lowercase()),
    }
}
