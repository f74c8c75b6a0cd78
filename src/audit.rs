use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Create/update/soft-delete metadata stored on every entity row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Audit {
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    pub updated_by: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
    pub deleted_by: Option<String>,
}

impl Audit {
    pub fn created_now(by: &str) -> Self {
        Self {
            created_at: OffsetDateTime::now_utc(),
            created_by: by.to_string(),
            updated_at: None,
            updated_by: None,
            deleted_at: None,
            deleted_by: None,
        }
    }

    /// Copy of `self` stamped as updated now by `by`.
    pub fn touched(&self, by: &str) -> Self {
        Self {
            updated_at: Some(OffsetDateTime::now_utc()),
            updated_by: Some(by.to_string()),
            ..self.clone()
        }
    }

    #[cfg(test)]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// `None` for empty strings, so unselected or blank text never reaches a response.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touched_keeps_creation_fields() {
        let created = Audit::created_now("Alice");
        let updated = created.touched("Bob");
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.created_by, "Alice");
        assert_eq!(updated.updated_by.as_deref(), Some("Bob"));
        assert!(updated.updated_at.is_some());
        assert!(!updated.is_deleted());
    }

    #[test]
    fn non_empty_drops_blank_strings() {
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("x".into())), Some("x".into()));
        assert_eq!(non_empty(None), None);
    }
}
