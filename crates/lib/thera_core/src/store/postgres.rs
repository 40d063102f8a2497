//! PostgreSQL user store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{StoreError, UserStore};
use crate::models::user::{NewUser, ProfileUpdate, ProviderFlag, User, UserWithPassword};

const USER_COLUMNS: &str = "id, phone, email, password_hash, roles, name, surname, \
                            is_google, is_apple, thread, created_at";

/// Row returned by user queries.
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    phone: String,
    email: String,
    password_hash: Option<String>,
    roles: String,
    name: String,
    surname: String,
    is_google: bool,
    is_apple: bool,
    thread: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserWithPassword {
    fn from(row: UserRow) -> Self {
        UserWithPassword {
            user: User {
                id: row.id,
                phone: row.phone,
                email: row.email,
                name: row.name,
                surname: row.surname,
                roles: row.roles,
                is_google: row.is_google,
                is_apple: row.is_apple,
                thread: row.thread,
                created_at: row.created_at,
            },
            password_hash: row.password_hash,
        }
    }
}

/// [`UserStore`] over a `sqlx` Postgres pool.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations under `thera_core/migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn fetch_one_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> Result<Option<UserWithPassword>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {predicate} LIMIT 1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserWithPassword::from))
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| UserWithPassword::from(r).user))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, StoreError> {
        self.fetch_one_where("email <> '' AND lower(email) = lower($1)", email)
            .await
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<UserWithPassword>, StoreError> {
        self.fetch_one_where("phone <> '' AND phone = $1", phone).await
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users \
             (phone, email, password_hash, name, surname, is_google, is_apple, thread) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.phone)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(&user.surname)
            .bind(user.is_google)
            .bind(user.is_apple)
            .bind(&user.thread)
            .fetch_one(&self.pool)
            .await?;
        Ok(UserWithPassword::from(row).user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "UPDATE users SET \
               phone = COALESCE($2, phone), \
               email = COALESCE($3, email), \
               name = COALESCE($4, name), \
               surname = COALESCE($5, surname) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(&update.phone)
            .bind(&update.email)
            .bind(&update.name)
            .bind(&update.surname)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| UserWithPassword::from(r).user))
    }

    async fn set_thread(&self, id: Uuid, thread: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET thread = $2 WHERE id = $1")
            .bind(id)
            .bind(thread)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_provider_flag(&self, id: Uuid, flag: ProviderFlag) -> Result<bool, StoreError> {
        let sql = match flag {
            ProviderFlag::Google => "UPDATE users SET is_google = true WHERE id = $1",
            ProviderFlag::Apple => "UPDATE users SET is_apple = true WHERE id = $1",
        };
        let result = sqlx::query(sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
