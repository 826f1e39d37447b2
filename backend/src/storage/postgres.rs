use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    AccessRequestRegistry, CredentialStore, MoodLedger, Result, Storage, StorageError, TaskLedger,
};
use crate::models::{
    access_request::NewAccessRequest,
    mood::{DateKey, Mood, MoodMap},
    task::{NewTask, TaskEntry},
    user::User,
};

#[derive(Clone)]
pub struct PgStorage {
    db: PgPool,
}

impl PgStorage {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(FromRow)]
struct MoodRow {
    date_key: String,
    mood: Mood,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Take the user's row lock for the rest of the transaction. Concurrent
/// replaces for one user queue here instead of interleaving their deletes
/// and inserts.
async fn lock_user(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<()> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .map(|_| ())
        .ok_or_else(|| StorageError::NotFound("User not found".into()))
}

#[async_trait]
impl CredentialStore for PgStorage {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await;

        match inserted {
            Ok(id) => Ok(id),
            Err(e) if is_unique_violation(&e) => {
                Err(StorageError::Conflict("User already exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl MoodLedger for PgStorage {
    async fn moods(&self, user_id: Uuid) -> Result<MoodMap> {
        let rows = sqlx::query_as::<_, MoodRow>(
            "SELECT date_key, mood FROM mood_entries WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<(DateKey, Mood)> {
                let key = row
                    .date_key
                    .parse::<DateKey>()
                    .map_err(|e| StorageError::Corrupt(e.to_string()))?;
                Ok((key, row.mood))
            })
            .collect()
    }

    async fn replace_moods(&self, user_id: Uuid, moods: &MoodMap) -> Result<()> {
        let mut tx = self.db.begin().await?;
        lock_user(&mut tx, user_id).await?;

        sqlx::query("DELETE FROM mood_entries WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if !moods.is_empty() {
            let keys: Vec<String> = moods.keys().map(ToString::to_string).collect();
            let labels: Vec<String> = moods.values().map(|m| m.as_str().to_string()).collect();

            sqlx::query(
                r#"
                INSERT INTO mood_entries (user_id, date_key, mood)
                SELECT $1, t.date_key, t.mood::mood_kind
                FROM UNNEST($2::text[], $3::text[]) AS t(date_key, mood)
                "#,
            )
            .bind(user_id)
            .bind(&keys)
            .bind(&labels)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(user_id = %user_id, entries = moods.len(), "Mood map replaced");
        Ok(())
    }
}

#[async_trait]
impl TaskLedger for PgStorage {
    async fn tasks(&self, user_id: Uuid) -> Result<Vec<TaskEntry>> {
        let tasks = sqlx::query_as::<_, TaskEntry>(
            r#"
            SELECT id, text, completed, date
            FROM tasks
            WHERE user_id = $1
            ORDER BY date DESC, position ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(tasks)
    }

    async fn replace_tasks(&self, user_id: Uuid, tasks: &[NewTask]) -> Result<()> {
        let mut tx = self.db.begin().await?;
        lock_user(&mut tx, user_id).await?;

        sqlx::query("DELETE FROM tasks WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if !tasks.is_empty() {
            let ids: Vec<Uuid> = tasks.iter().map(|_| Uuid::new_v4()).collect();
            let texts: Vec<String> = tasks.iter().map(|t| t.text.clone()).collect();
            let completed: Vec<bool> = tasks.iter().map(|t| t.completed).collect();
            let dates: Vec<DateTime<Utc>> = tasks.iter().map(|t| t.date).collect();
            let positions: Vec<i32> = (0..tasks.len() as i32).collect();

            sqlx::query(
                r#"
                INSERT INTO tasks (id, user_id, text, completed, date, position)
                SELECT t.id, $1, t.text, t.completed, t.date, t.position
                FROM UNNEST($2::uuid[], $3::text[], $4::bool[], $5::timestamptz[], $6::int4[])
                    AS t(id, text, completed, date, position)
                "#,
            )
            .bind(user_id)
            .bind(&ids)
            .bind(&texts)
            .bind(&completed)
            .bind(&dates)
            .bind(&positions)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(user_id = %user_id, tasks = tasks.len(), "Task list replaced");
        Ok(())
    }
}

#[async_trait]
impl AccessRequestRegistry for PgStorage {
    async fn register_access_request(&self, request: &NewAccessRequest) -> Result<bool> {
        let existing =
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM access_requests WHERE email = $1")
                .bind(&request.email)
                .fetch_optional(&self.db)
                .await?;

        if existing.is_some() {
            return Ok(false);
        }

        // A concurrent request for the same email lands on DO NOTHING; a phone
        // number held by another email still violates its unique index.
        let inserted = sqlx::query(
            r#"
            INSERT INTO access_requests (id, username, email, phone_number, company, reference_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.username)
        .bind(&request.email)
        .bind(&request.phone_number)
        .bind(&request.company)
        .bind(&request.reference_id)
        .execute(&self.db)
        .await;

        match inserted {
            Ok(result) => Ok(result.rows_affected() == 1),
            Err(e) if is_unique_violation(&e) => Err(StorageError::Conflict(
                "An account with this email or phone number already exists.".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await?;
        Ok(())
    }
}
