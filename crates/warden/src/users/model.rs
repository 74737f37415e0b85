//! User account record.

use chrono::{DateTime, Utc};
use serde::Serialize;

use warden_common::{Identity, UserStatus, WardenError};

use crate::auth::PasswordHash;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 64;
const PASSWORD_MIN: usize = 6;

/// Stored user account.
///
/// Not `Serialize`; responses use `UserProfile`, which omits the password
/// and the MFA secret.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: PasswordHash,
    pub role_id: String,
    pub status: UserStatus,
    pub mfa_secret: Option<String>,
    pub mfa_enabled: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New active account with a freshly salted password
    pub fn new(username: &str, password: &str, role_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            password: PasswordHash::new(password),
            role_id: role_id.to_string(),
            status: UserStatus::Active,
            mfa_secret: None,
            mfa_enabled: false,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_password(&mut self, password: &str) {
        self.password = PasswordHash::new(password);
        self.touch();
    }

    pub async fn check_password(&self, candidate: &str) -> Result<bool, WardenError> {
        self.password.verify_async(candidate).await
    }

    pub fn set_status(&mut self, status: UserStatus) {
        self.status = status;
        self.touch();
    }

    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login = Some(now);
        self.updated_at = now;
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id.clone(),
            username: self.username.clone(),
            role_id: self.role_id.clone(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            role_id: self.role_id.clone(),
            status: self.status,
            mfa_enabled: self.mfa_enabled,
            last_login: self.last_login,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub role_id: String,
    pub status: UserStatus,
    pub mfa_enabled: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn validate_username(username: &str) -> Result<(), WardenError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(WardenError::InvalidInput(format!(
            "username must be {USERNAME_MIN}-{USERNAME_MAX} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(WardenError::InvalidInput(
            "username may only contain letters, digits, '_', '.' and '-'".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), WardenError> {
    if password.chars().count() < PASSWORD_MIN {
        return Err(WardenError::InvalidInput(format!(
            "password must be at least {PASSWORD_MIN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user() {
        let user = User::new("alice", "s3cret!", "3");
        assert_eq!(user.status, UserStatus::Active);
        assert!(user.password.verify("s3cret!"));
        assert!(!user.password.verify("s3cret"));
        assert!(!user.password.needs_upgrade());
        assert_eq!(user.identity().username, "alice");
    }

    #[test]
    fn test_profile_hides_secrets() {
        let mut user = User::new("alice", "s3cret!", "3");
        user.mfa_secret = Some("JBSWY3DPEHPK3PXP".to_string());

        let json = serde_json::to_value(user.profile()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert!(!keys.contains(&"password"));
        assert!(!keys.contains(&"mfa_secret"));
        assert_eq!(json["status"], "active");
        assert!(json["last_login"].is_null());
    }

    #[test]
    fn test_set_password_replaces_hash() {
        let mut user = User::new("alice", "first-pass", "3");
        let before = user.updated_at;
        user.set_password("second-pass");
        assert!(user.password.verify("second-pass"));
        assert!(!user.password.verify("first-pass"));
        assert!(user.updated_at >= before);
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("admin").is_ok());
        assert!(validate_username("a.b-c_1").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(65)).is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("ünï").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("123456").is_ok());
        assert!(validate_password("12345").is_err());
    }
}
