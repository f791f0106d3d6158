//! Status envelope handed to collaborators that expect `{success, id|data|error}`.

use super::error::{DbError, DbResult, ErrorKind};
use super::rows::Resolved;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl Envelope {
    fn empty(success: bool) -> Self {
        Envelope {
            success,
            id: None,
            updated_count: None,
            data: None,
            error: None,
            message: None,
            error_kind: None,
        }
    }

    pub fn ok() -> Self {
        Self::empty(true)
    }

    pub fn created<I: Serialize>(id: I) -> Self {
        Envelope {
            id: serde_json::to_value(id).ok(),
            ..Self::empty(true)
        }
    }

    pub fn updated(count: usize) -> Self {
        Envelope {
            updated_count: Some(count),
            ..Self::empty(true)
        }
    }

    pub fn with_data<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Envelope {
                data: Some(value),
                ..Self::empty(true)
            },
            Err(e) => Self::failure(&DbError::from(e)),
        }
    }

    pub fn failure(error: &DbError) -> Self {
        let mut envelope = Envelope {
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            ..Self::empty(false)
        };
        if let Some(existing) = error.existing_id() {
            envelope.id = Some(Value::String(existing.to_string()));
        }
        envelope
    }

    /// Resolve-or-create outcome. A pre-existing row still counts as success.
    pub fn resolved<I: Serialize + ToString>(result: DbResult<Resolved<I>>) -> Self {
        match result {
            Ok(resolved) if resolved.created => Self::created(resolved.id),
            Ok(resolved) => Envelope {
                message: Some(format!("Already exists with id {}", resolved.id.to_string())),
                ..Self::created(resolved.id)
            },
            Err(e) => Self::failure(&e),
        }
    }

    pub fn from_id<I: Serialize>(result: DbResult<I>) -> Self {
        match result {
            Ok(id) => Self::created(id),
            Err(e) => Self::failure(&e),
        }
    }

    pub fn from_unit(result: DbResult<()>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failure(&e),
        }
    }

    pub fn from_count(result: DbResult<usize>) -> Self {
        match result {
            Ok(count) => Self::updated(count),
            Err(e) => Self::failure(&e),
        }
    }

    pub fn from_data<T: Serialize>(result: DbResult<T>) -> Self {
        match result {
            Ok(data) => Self::with_data(&data),
            Err(e) => Self::failure(&e),
        }
    }

    /// HTTP status for the API layer.
    pub fn http_status(&self) -> u16 {
        if self.success {
            return if self.id.is_some() && self.message.is_none() {
                201
            } else if self.id.is_none() && self.data.is_none() && self.updated_count.is_none() {
                204
            } else {
                200
            };
        }
        match self.error_kind {
            Some(ErrorKind::NotFound) => 404,
            Some(ErrorKind::Validation) => 400,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_map_to_http_statuses() {
        assert_eq!(Envelope::failure(&DbError::not_found("Client", "x")).http_status(), 404);
        assert_eq!(Envelope::failure(&DbError::validation("name", "empty")).http_status(), 400);
        assert_eq!(Envelope::failure(&DbError::conflict("Client", "dup")).http_status(), 500);
        assert_eq!(Envelope::failure(&DbError::Storage("disk".into())).http_status(), 500);
    }

    #[test]
    fn successes_map_to_http_statuses() {
        assert_eq!(Envelope::created("abc").http_status(), 201);
        assert_eq!(Envelope::updated(1).http_status(), 200);
        assert_eq!(Envelope::ok().http_status(), 204);
    }

    #[test]
    fn existing_row_is_success_with_message() {
        let envelope = Envelope::resolved(Ok(Resolved::existing(7_i64)));
        assert!(envelope.success);
        assert_eq!(envelope.id, Some(Value::from(7)));
        assert!(envelope.message.unwrap().contains('7'));
    }

    #[test]
    fn conflict_carries_existing_id() {
        let envelope = Envelope::failure(&DbError::conflict_with("CandidateProgress", "already recorded", "p1"));
        assert!(!envelope.success);
        assert_eq!(envelope.id, Some(Value::String("p1".into())));
        assert!(envelope.error.unwrap().contains("CandidateProgress"));
    }

    #[test]
    fn serialises_without_empty_fields() {
        let json = serde_json::to_value(Envelope::created(5)).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "id": 5}));
    }
}
