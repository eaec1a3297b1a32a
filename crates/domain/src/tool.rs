//! Tool-call wire envelope spoken across the MCP boundary.
//!
//! Every side effect in the system travels as a `POST /mcp/tools/call`
//! with a [`ToolCallRequest`] body and comes back as either
//! `{"result": ...}` or `{"error": {"code", "message"}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / response envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Body of a tool-call request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Body of a tool-call response: exactly one of `result` / `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolCallResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn err(code: ToolErrorCode, message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(ToolError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Extract the result, treating a present `error` as authoritative.
    pub fn into_result(self) -> Result<Value, ToolError> {
        if let Some(err) = self.error {
            Err(err)
        } else {
            Ok(self.result.unwrap_or(Value::Null))
        }
    }
}

/// A tool-returned error: closed code plus human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolError {
    pub code: ToolErrorCode,
    pub message: String,
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ToolError {}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error code taxonomy (closed set)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The closed set of error codes a tool server may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolErrorCode {
    AthleteNotFound,
    UserNotFound,
    DbError,
    InvalidInput,
    InvalidLimit,
    InvalidDays,
    InvalidSessionData,
    InvalidDateFormat,
    InvalidWorkoutDescription,
    MissingRaceInfo,
    InvalidRaceDate,
    MissingSeasonInfo,
    InvalidSeasonDates,
    InvalidMessage,
    FileNotFound,
    ReadError,
    EncodingError,
    InvalidFilename,
}

impl ToolErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorCode::AthleteNotFound => "ATHLETE_NOT_FOUND",
            ToolErrorCode::UserNotFound => "USER_NOT_FOUND",
            ToolErrorCode::DbError => "DB_ERROR",
            ToolErrorCode::InvalidInput => "INVALID_INPUT",
            ToolErrorCode::InvalidLimit => "INVALID_LIMIT",
            ToolErrorCode::InvalidDays => "INVALID_DAYS",
            ToolErrorCode::InvalidSessionData => "INVALID_SESSION_DATA",
            ToolErrorCode::InvalidDateFormat => "INVALID_DATE_FORMAT",
            ToolErrorCode::InvalidWorkoutDescription => "INVALID_WORKOUT_DESCRIPTION",
            ToolErrorCode::MissingRaceInfo => "MISSING_RACE_INFO",
            ToolErrorCode::InvalidRaceDate => "INVALID_RACE_DATE",
            ToolErrorCode::MissingSeasonInfo => "MISSING_SEASON_INFO",
            ToolErrorCode::InvalidSeasonDates => "INVALID_SEASON_DATES",
            ToolErrorCode::InvalidMessage => "INVALID_MESSAGE",
            ToolErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ToolErrorCode::ReadError => "READ_ERROR",
            ToolErrorCode::EncodingError => "ENCODING_ERROR",
            ToolErrorCode::InvalidFilename => "INVALID_FILENAME",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_roundtrip() {
        let req = ToolCallRequest {
            tool: "load_context".into(),
            arguments: serde_json::json!({"conversation_id": "c1", "limit": 20}),
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: ToolCallRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, back);
    }

    #[test]
    fn error_codes_serialize_screaming_snake() {
        let json = serde_json::to_string(&ToolErrorCode::InvalidFilename).unwrap();
        assert_eq!(json, "\"INVALID_FILENAME\"");
        let back: ToolErrorCode = serde_json::from_str("\"ATHLETE_NOT_FOUND\"").unwrap();
        assert_eq!(back, ToolErrorCode::AthleteNotFound);
    }

    #[test]
    fn response_error_wins_over_result() {
        let resp = ToolCallResponse {
            result: Some(serde_json::json!({"ok": true})),
            error: Some(ToolError {
                code: ToolErrorCode::DbError,
                message: "locked".into(),
            }),
        };
        assert!(resp.into_result().is_err());
    }
}
