use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row of the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// A freshly registered account: unverified.
    pub fn new_unverified(email: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            verified: false,
            verified_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Lower-cases and trims an address so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Cheap shape check: one `@`, non-empty local part, dotted domain, no whitespace.
pub fn is_plausible_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
    }

    #[test]
    fn test_plausible_email_accepts_common_forms() {
        assert!(is_plausible_email("jane@example.com"));
        assert!(is_plausible_email("jane+resume@mail.example.co.uk"));
    }

    #[test]
    fn test_plausible_email_rejects_garbage() {
        assert!(!is_plausible_email(""));
        assert!(!is_plausible_email("jane"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("jane@localhost"));
        assert!(!is_plausible_email("jane@@example.com"));
        assert!(!is_plausible_email("jane doe@example.com"));
        assert!(!is_plausible_email("jane@example."));
    }

    #[test]
    fn test_new_unverified_starts_unverified() {
        let user = UserRecord::new_unverified("jane@example.com".to_string());
        assert!(!user.verified);
        assert!(user.verified_at.is_none());
    }
}
