use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{MySqlConnection, MySqlPool};

use crate::{
    error::{AppError, AppResult},
    model::user::{NewUser, User, UserRow, UserUpdate},
    repository::leave_request::now,
    utils::db_utils::{SqlUpdate, SqlValue},
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn create(&self, new: NewUser) -> AppResult<User>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn find_by_id(&self, id: u64) -> AppResult<Option<User>>;

    async fn find_all(&self) -> AppResult<Vec<User>>;

    /// Writes only the given fields. Role-dependent fields are not re-checked.
    async fn update(&self, id: u64, changes: UserUpdate) -> AppResult<User>;

    async fn delete(&self, id: u64) -> AppResult<()>;

    /// Every stored email, used to warm the email index.
    async fn emails(&self) -> AppResult<Vec<String>>;
}

const USER_COLUMNS: &str =
    "id, name, email, contact, role, course, semester, password_hash, created_at";

fn not_found(id: u64) -> AppError {
    AppError::NotFound { resource: "User", id }
}

fn map_duplicate(e: sqlx::Error) -> AppError {
    if AppError::is_duplicate_key(&e) {
        AppError::Conflict("Email already registered".into())
    } else {
        AppError::Store(e)
    }
}

pub struct MySqlUserRepository {
    pool: MySqlPool,
}

impl MySqlUserRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn leave_ids(conn: &mut MySqlConnection, user_id: u64) -> AppResult<Vec<u64>> {
        let ids = sqlx::query_scalar::<_, u64>(
            "SELECT id FROM leave_requests WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;
        Ok(ids)
    }

    async fn fetch_one(
        conn: &mut MySqlConnection,
        column: &'static str,
        value: FetchKey<'_>,
    ) -> AppResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let query = sqlx::query_as::<_, UserRow>(&sql);
        let query = match value {
            FetchKey::Id(id) => query.bind(id),
            FetchKey::Email(email) => query.bind(email),
        };

        let Some(row) = query.fetch_optional(&mut *conn).await? else {
            return Ok(None);
        };
        let leave_requests = Self::leave_ids(conn, row.id).await?;
        row.into_user(leave_requests).map(Some)
    }
}

enum FetchKey<'a> {
    Id(u64),
    Email(&'a str),
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    async fn create(&self, new: NewUser) -> AppResult<User> {
        new.check()?;

        let created_at = now();
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO users
                (name, email, contact, role, course, semester, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.contact)
        .bind(new.role.as_ref())
        .bind(&new.course)
        .bind(new.semester)
        .bind(&new.password_hash)
        .bind(created_at)
        .execute(&mut *conn)
        .await
        .map_err(map_duplicate)?;

        Ok(User {
            id: result.last_insert_id(),
            name: new.name,
            email: new.email,
            contact: new.contact,
            role: new.role,
            course: new.course,
            semester: new.semester,
            leave_requests: Vec::new(),
            created_at,
            password_hash: new.password_hash,
        })
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_one(&mut conn, "email", FetchKey::Email(email)).await
    }

    async fn find_by_id(&self, id: u64) -> AppResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_one(&mut conn, "id", FetchKey::Id(id)).await
    }

    async fn find_all(&self) -> AppResult<Vec<User>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&mut *conn)
            .await?;

        // One pass over the leave table instead of a query per user.
        let pairs = sqlx::query_as::<_, (u64, u64)>(
            "SELECT user_id, id FROM leave_requests ORDER BY id",
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut owned: HashMap<u64, Vec<u64>> = HashMap::new();
        for (user_id, leave_id) in pairs {
            owned.entry(user_id).or_default().push(leave_id);
        }

        rows.into_iter()
            .map(|row| {
                let ids = owned.remove(&row.id).unwrap_or_default();
                row.into_user(ids)
            })
            .collect()
    }

    async fn update(&self, id: u64, changes: UserUpdate) -> AppResult<User> {
        let update = SqlUpdate::new("users")
            .set_some("name", changes.name.map(SqlValue::String))
            .set_some("email", changes.email.map(SqlValue::String))
            .set_some("contact", changes.contact.map(SqlValue::String))
            .set_some(
                "role",
                changes.role.map(|r| SqlValue::String(r.as_ref().to_string())),
            )
            .set_some("course", changes.course.map(SqlValue::String))
            .set_some("semester", changes.semester.map(SqlValue::U8));

        if update.is_empty() {
            return Err(AppError::validation("No fields provided for update"));
        }

        let mut tx = self.pool.begin().await?;

        let exists: Option<(u64,)> = sqlx::query_as("SELECT id FROM users WHERE id = ? FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(not_found(id));
        }

        update
            .execute(&mut tx, "id", id)
            .await
            .map_err(map_duplicate)?;

        let user = Self::fetch_one(&mut tx, "id", FetchKey::Id(id))
            .await?
            .ok_or_else(|| not_found(id))?;

        tx.commit().await?;
        Ok(user)
    }

    async fn delete(&self, id: u64) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn emails(&self) -> AppResult<Vec<String>> {
        let mut conn = self.pool.acquire().await?;
        let emails = sqlx::query_scalar::<_, String>("SELECT email FROM users")
            .fetch_all(&mut *conn)
            .await?;
        Ok(emails)
    }
}
