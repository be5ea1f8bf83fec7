//! User repository for database operations.
//!
//! Runs on a borrowed connection so callers decide the transaction scope.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use simply_orders_core::{Email, ExternalCustomerId, UserId};

use super::RepositoryError;
use crate::models::{LoginProfile, User, UserUpsert};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    external_customer_id: Option<ExternalCustomerId>,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            external_customer_id: row.external_customer_id,
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            created_at: row.created_at,
            last_login: row.last_login,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for user database operations.
pub(super) struct UserRepository<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> UserRepository<'c> {
    /// Create a new user repository.
    pub(super) const fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }

    /// Insert or update a user.
    ///
    /// Matches on `external_customer_id` first, so a customer who changed
    /// their email keeps one row. Falls back to the unique email; a row found
    /// by email keeps any customer id it already has. Run inside a
    /// transaction: the lookup-by-id and the insert are two statements.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new email already belongs
    /// to a different customer.
    pub(super) async fn upsert(&mut self, user: &UserUpsert) -> Result<User, RepositoryError> {
        if let Some(external_id) = user.external_customer_id {
            let updated = sqlx::query_as::<_, UserRow>(
                r"
                UPDATE sync.user
                SET email = $2,
                    first_name = COALESCE($3, first_name),
                    last_name = COALESCE($4, last_name),
                    phone = COALESCE($5, phone),
                    updated_at = now()
                WHERE external_customer_id = $1
                RETURNING id, external_customer_id, email, first_name, last_name, phone,
                          created_at, last_login, updated_at
                ",
            )
            .bind(external_id)
            .bind(&user.email)
            .bind(user.first_name.as_deref())
            .bind(user.last_name.as_deref())
            .bind(user.phone.as_deref())
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(|e| RepositoryError::from_write(e, "user email"))?;

            if let Some(row) = updated {
                return row.try_into();
            }
        }

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO sync.user AS u (external_customer_id, email, first_name, last_name, phone)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE SET
                external_customer_id = COALESCE(u.external_customer_id, EXCLUDED.external_customer_id),
                first_name = COALESCE(EXCLUDED.first_name, u.first_name),
                last_name = COALESCE(EXCLUDED.last_name, u.last_name),
                phone = COALESCE(EXCLUDED.phone, u.phone),
                updated_at = now()
            RETURNING id, external_customer_id, email, first_name, last_name, phone,
                      created_at, last_login, updated_at
            ",
        )
        .bind(user.external_customer_id)
        .bind(&user.email)
        .bind(user.first_name.as_deref())
        .bind(user.last_name.as_deref())
        .bind(user.phone.as_deref())
        .fetch_one(&mut *self.conn)
        .await
        .map_err(|e| RepositoryError::from_write(e, "user"))?;

        row.try_into()
    }

    /// Upsert a user by email and stamp `last_login`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub(super) async fn record_login(
        &mut self,
        email: &Email,
        profile: &LoginProfile,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO sync.user AS u (email, first_name, last_name, phone, last_login)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (email) DO UPDATE SET
                first_name = COALESCE(EXCLUDED.first_name, u.first_name),
                last_name = COALESCE(EXCLUDED.last_name, u.last_name),
                phone = COALESCE(EXCLUDED.phone, u.phone),
                last_login = now(),
                updated_at = now()
            RETURNING id, external_customer_id, email, first_name, last_name, phone,
                      created_at, last_login, updated_at
            ",
        )
        .bind(email)
        .bind(profile.first_name.as_deref())
        .bind(profile.last_name.as_deref())
        .bind(profile.phone.as_deref())
        .fetch_one(&mut *self.conn)
        .await?;

        row.try_into()
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub(super) async fn get_by_email(&mut self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, external_customer_id, email, first_name, last_name, phone,
                   created_at, last_login, updated_at
            FROM sync.user
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(User::try_from).transpose()
    }
}
