use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown {0} id {1}")]
    InvalidReference(String, Uuid),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Permission denied")]
    Forbidden,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Error {
        Error::InvalidInput(msg.into())
    }

    pub fn invalid_reference(kind: &str, id: Uuid) -> Error {
        Error::InvalidReference(String::from(kind), id)
    }

    pub fn not_found(kind: impl Into<String>) -> Error {
        Error::NotFound(kind.into())
    }

    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::InvalidReference(_, _) => StatusCode::NOT_FOUND,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Renders the `{message, success: false, error: true}` envelope,
    /// plus a machine-readable `type` (and per-type fields) so that
    /// `parse` can round-trip the error.
    pub fn contents(&self) -> Vec<u8> {
        let mut body = match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::InvalidInput(msg) => json!({
                "message": msg,
                "type": "invalid-input",
            }),
            Error::InvalidReference(kind, id) => json!({
                "message": format!("{} {} does not exist", kind, id),
                "type": "invalid-reference",
                "kind": kind,
                "id": id,
            }),
            Error::NotFound(kind) => json!({
                "message": format!("{} not found", kind),
                "type": "not-found",
                "kind": kind,
            }),
            Error::Forbidden => json!({
                "message": "permission denied",
                "type": "forbidden",
            }),
            Error::Unauthorized => json!({
                "message": "authentication required",
                "type": "unauthorized",
            }),
            Error::Conflict(msg) => json!({
                "message": msg,
                "type": "conflict",
            }),
        };
        let obj = body.as_object_mut().expect("error body is an object");
        obj.insert(String::from("success"), json!(false));
        obj.insert(String::from("error"), json!(true));
        serde_json::to_vec(&body).expect("serializing error body")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let message = || {
            String::from(
                data.get("message")
                    .and_then(|msg| msg.as_str())
                    .unwrap_or(""),
            )
        };
        let kind = || -> anyhow::Result<String> {
            Ok(String::from(
                data.get("kind")
                    .and_then(|k| k.as_str())
                    .ok_or_else(|| anyhow!("error has no kind field"))?,
            ))
        };
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(message()),
                "invalid-input" => Error::InvalidInput(message()),
                "invalid-reference" => Error::InvalidReference(
                    kind()?,
                    data.get("id")
                        .and_then(|id| id.as_str())
                        .and_then(|id| Uuid::from_str(id).ok())
                        .ok_or_else(|| anyhow!("invalid-reference error without a proper id"))?,
                ),
                "not-found" => Error::NotFound(kind()?),
                "forbidden" => Error::Forbidden,
                "unauthorized" => Error::Unauthorized,
                "conflict" => Error::Conflict(message()),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_round_trip_through_wire_form() {
        let errors = vec![
            Error::Unknown(String::from("boom")),
            Error::InvalidInput(String::from("bad sort order")),
            Error::invalid_reference("video", Uuid::new_v4()),
            Error::not_found("playlist"),
            Error::Forbidden,
            Error::Unauthorized,
            Error::Conflict(String::from("already subscribed")),
        ];
        for e in errors {
            let parsed = Error::parse(&e.contents()).expect("parsing rendered error");
            assert_eq!(e, parsed);
        }
    }

    #[test]
    fn error_envelope_has_failure_flags() {
        let body: serde_json::Value =
            serde_json::from_slice(&Error::Forbidden.contents()).unwrap();
        assert_eq!(body["success"], serde_json::json!(false));
        assert_eq!(body["error"], serde_json::json!(true));
        assert!(body["message"].is_string());
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        use http::StatusCode;
        assert_eq!(
            Error::invalid_input("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::invalid_reference("video", Uuid::new_v4()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(Error::not_found("comment").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Error::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
    }
}
