use std::fmt::{self, Display, Formatter};

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use deadpool_postgres::Pool;
use serde::{Deserialize, Serialize};

use crate::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Category {
    General,
    Bug,
    Feature,
    Question,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "General Feedback",
            Self::Bug => "Bug Report",
            Self::Feature => "Feature Request",
            Self::Question => "Question",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Status {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        [Self::Open, Self::InProgress, Self::Resolved, Self::Closed]
            .into_iter()
            .find(|s| s.as_str() == label)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i32,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub user_id: String,
    pub username: String,
    pub user_email: String,
    pub category: String,
    pub comment: String,
    pub status: Status,
    pub admin_response: String,
}

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS feedback (
    id SERIAL PRIMARY KEY,
    timestamp TIMESTAMP NOT NULL DEFAULT NOW(),
    user_id VARCHAR(255) NOT NULL,
    username VARCHAR(255) NOT NULL,
    user_email VARCHAR(255) NOT NULL,
    category VARCHAR(50) NOT NULL,
    comment TEXT NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'Open',
    admin_response TEXT
)";

impl Feedback {
    pub async fn ensure_table(pool: &Pool) -> Result<()> {
        let client = pool.get().await?;
        client.batch_execute(CREATE_TABLE).await?;
        client.batch_execute(
            "CREATE INDEX IF NOT EXISTS idx_feedback_user_id ON feedback (user_id);
             CREATE INDEX IF NOT EXISTS idx_feedback_status ON feedback (status);",
        ).await?;
        Ok(())
    }

    pub async fn create(pool: &Pool, who: &Identity, category: Category, comment: &str) -> Result<Feedback> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(anyhow!("feedback comment is empty"));
        }
        let client = pool.get().await?;
        let stmt = client.prepare(
            "INSERT INTO feedback (user_id, username, user_email, category, comment, status)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *"
        ).await?;
        let row = client.query_one(
            &stmt,
            &[&who.user_id, &who.username, &who.email, &category.as_str(), &comment, &Status::Open.as_str()],
        ).await?;
        Feedback::from_row(&row)
    }

    /// Newest first; all users when `user_id` is `None`.
    pub async fn list(pool: &Pool, user_id: Option<&str>) -> Result<Vec<Feedback>> {
        let client = pool.get().await?;
        let rows = match user_id {
            Some(user_id) => {
                let stmt = client.prepare("SELECT * FROM feedback WHERE user_id = $1 ORDER BY timestamp DESC").await?;
                client.query(&stmt, &[&user_id]).await?
            }
            None => {
                let stmt = client.prepare("SELECT * FROM feedback ORDER BY timestamp DESC").await?;
                client.query(&stmt, &[]).await?
            }
        };
        rows.iter().map(Feedback::from_row).collect()
    }

    pub async fn respond(pool: &Pool, id: i32, status: Status, response: &str) -> Result<Option<Feedback>> {
        let client = pool.get().await?;
        let stmt = client.prepare(
            "UPDATE feedback SET admin_response = $1, status = $2 WHERE id = $3 RETURNING *"
        ).await?;
        match client.query_opt(&stmt, &[&response, &status.as_str(), &id]).await? {
            Some(row) => Ok(Some(Feedback::from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Returns whether a row was deleted.
    pub async fn delete(pool: &Pool, id: i32) -> Result<bool> {
        let client = pool.get().await?;
        let stmt = client.prepare("DELETE FROM feedback WHERE id = $1").await?;
        Ok(client.execute(&stmt, &[&id]).await? > 0)
    }

    fn from_row(row: &tokio_postgres::Row) -> Result<Feedback> {
        let status: String = row.try_get("status")?;
        Ok(Feedback {
            id: row.try_get("id")?,
            timestamp: row.try_get::<_, chrono::NaiveDateTime>("timestamp")?.and_utc(),
            user_id: row.try_get("user_id")?,
            username: row.try_get("username")?,
            user_email: row.try_get("user_email")?,
            category: row.try_get("category")?,
            comment: row.try_get("comment")?,
            status: Status::parse(&status).ok_or_else(|| anyhow!("unknown feedback status '{}'", status))?,
            admin_response: row.try_get::<_, Option<String>>("admin_response")?.unwrap_or_default(),
        })
    }
}
