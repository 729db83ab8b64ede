//! AccountService: email/password accounts for the session provider.
//!
//! Hashing runs on the blocking pool; bcrypt is deliberately slow.

use crate::{
    db::is_unique_violation,
    models::user::{Identity, Role, User, UserId},
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::{self, JoinError};
use tracing::info;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Invalid(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email already exists")]
    EmailTaken,
    #[error("User not found")]
    UserNotFound(UserId),
    #[error(transparent)]
    Hash(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Join(#[from] JoinError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type AccountResult<T> = Result<T, AccountError>;

const MIN_PASSWORD_LEN: usize = 6;
const MIN_NAME_LEN: usize = 2;

const USER_COLUMNS: &str = "id, email, password_hash, name, role, created_at";

#[derive(Clone)]
pub struct AccountService {
    pub db: Arc<SqlitePool>,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(db: Arc<SqlitePool>, bcrypt_cost: u32) -> Self {
        Self { db, bcrypt_cost }
    }

    /// Check credentials. Unknown emails and wrong passwords are
    /// indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> AccountResult<User> {
        let email = normalize_email(email)?;

        let user = self
            .find_by_email(&email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        let hash = user.password_hash.clone();
        let password = password.to_string();
        let matches = task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
        if !matches {
            return Err(AccountError::InvalidCredentials);
        }

        info!(user_id = user.id, "login succeeded");
        Ok(user)
    }

    /// Register a customer account.
    pub async fn signup(&self, email: &str, password: &str, name: &str) -> AccountResult<User> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::Invalid(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }
        let name = name.trim();
        if name.chars().count() < MIN_NAME_LEN {
            return Err(AccountError::Invalid(format!(
                "Name must be at least {MIN_NAME_LEN} characters long"
            )));
        }

        if self.find_by_email(&email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let user = self.insert(&email, password, name, Role::Customer).await?;
        info!(user_id = user.id, "account created");
        Ok(user)
    }

    pub async fn find(&self, id: UserId) -> AccountResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or(AccountError::UserNotFound(id))
    }

    /// Create the configured administrator unless the email is already registered.
    /// Returns the identity of the existing or new account.
    pub async fn ensure_admin(&self, email: &str, password: &str, name: &str) -> AccountResult<Identity> {
        let email = normalize_email(email)?;
        if let Some(existing) = self.find_by_email(&email).await? {
            if existing.role != Role::Admin {
                tracing::warn!(
                    user_id = existing.id,
                    "bootstrap admin email belongs to a customer account; leaving it unchanged"
                );
            }
            return Ok(existing.identity());
        }

        let admin = self.insert(&email, password, name.trim(), Role::Admin).await?;
        info!(user_id = admin.id, "bootstrap administrator created");
        Ok(admin.identity())
    }

    async fn find_by_email(&self, email: &str) -> AccountResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
                .bind(email)
                .fetch_optional(&*self.db)
                .await?,
        )
    }

    async fn insert(&self, email: &str, password: &str, name: &str, role: Role) -> AccountResult<User> {
        let cost = self.bcrypt_cost;
        let password = password.to_string();
        let password_hash = task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;

        let inserted = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, name, role, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await;

        match inserted {
            Ok(user) => Ok(user),
            Err(err) if is_unique_violation(&err) => Err(AccountError::EmailTaken),
            Err(err) => Err(err.into()),
        }
    }
}

fn normalize_email(email: &str) -> AccountResult<String> {
    let email = email.trim();
    if !validator::validate_email(email) {
        return Err(AccountError::Invalid("Invalid email format".into()));
    }
    Ok(email.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn accounts() -> AccountService {
        let db = Arc::new(db::open_in_memory().await.unwrap());
        AccountService::new(db, 4 /* bcrypt minimum cost; bcrypt::MIN_COST is private */)
    }

    #[tokio::test]
    async fn signup_creates_customers_and_login_checks_password() {
        let accounts = accounts().await;
        let user = accounts
            .signup(" jane@example.com ", "secret123", "Jane")
            .await
            .unwrap();
        assert_eq!(user.role, Role::Customer);
        assert_eq!(user.email, "jane@example.com");
        assert_ne!(user.password_hash, "secret123");

        let logged_in = accounts.login("jane@example.com", "secret123").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(matches!(
            accounts.login("jane@example.com", "wrong-pass").await,
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.login("nobody@example.com", "secret123").await,
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn signup_validation() {
        let accounts = accounts().await;

        assert!(matches!(
            accounts.signup("not-an-email", "secret123", "Jane").await,
            Err(AccountError::Invalid(_))
        ));
        assert!(matches!(
            accounts.signup("jane@example.com", "12345", "Jane").await,
            Err(AccountError::Invalid(_))
        ));
        assert!(matches!(
            accounts.signup("jane@example.com", "secret123", " J ").await,
            Err(AccountError::Invalid(_))
        ));

        accounts
            .signup("jane@example.com", "secret123", "Jane")
            .await
            .unwrap();
        assert!(matches!(
            accounts.signup("jane@example.com", "other-secret", "Janet").await,
            Err(AccountError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let accounts = accounts().await;
        let first = accounts
            .ensure_admin("root@example.com", "adminpass", "Root")
            .await
            .unwrap();
        assert_eq!(first.role, Role::Admin);

        let second = accounts
            .ensure_admin("root@example.com", "different", "Other")
            .await
            .unwrap();
        assert_eq!(second.id, first.id);

        let user = accounts.login("root@example.com", "adminpass").await.unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(matches!(
            accounts.find(first.id + 100).await,
            Err(AccountError::UserNotFound(_))
        ));
    }
}
