//! User repository for the registration and login flows.

use super::DbError;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::PgPool;

/// A registered API user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
}

type UserRow = (i32, String, String, String, NaiveDateTime);

impl From<UserRow> for User {
    fn from((id, name, email, hashed_password, created_at): UserRow) -> Self {
        Self {
            id,
            name,
            email,
            hashed_password,
            created_at: created_at.and_utc(),
        }
    }
}

// Legacy rows may carry NULLs in every non-key column.
const SELECT_USER: &str = r#"
    SELECT id,
           COALESCE(name, ''),
           COALESCE(email, ''),
           COALESCE(hashed_password, ''),
           COALESCE(created_at, now() AT TIME ZONE 'utc')
    FROM users
"#;

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user whose password has already been hashed.
    ///
    /// The unique index on `email` settles concurrent registrations of the
    /// same address; the loser gets [`DbError::EmailExists`].
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, DbError> {
        let created_at = Utc::now().naive_utc();

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO users (name, email, hashed_password, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(hashed_password)
        .bind(created_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::EmailExists(email.to_string());
            }
            DbError::from(e)
        })?;

        Ok(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            created_at: created_at.and_utc(),
        })
    }

    /// Find user by email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE email = $1"))
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(User::from))
    }
}
