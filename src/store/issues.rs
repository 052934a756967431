//! Periodical issues, unique per (year, month).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite};
use tracing::{debug, info, instrument};

use crate::db::Database;

use super::Result;

const ISSUE_COLUMNS: &str = "id, year, month, title, description, pdf_url, pdf_public_id, \
                             created_by, created_at, updated_at";

/// A published issue. Serialized with its column names.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Issue {
    pub id: i64,
    pub year: i64,
    pub month: i64,
    pub title: String,
    pub description: Option<String>,
    pub pdf_url: String,
    pub pdf_public_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional filters for [`IssueStore::list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IssueFilter {
    pub year: Option<i64>,
    pub month: Option<i64>,
}

/// Fields for creating or replacing the issue of a (year, month).
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub year: i64,
    pub month: i64,
    pub title: String,
    pub description: Option<String>,
    pub pdf_url: String,
    pub pdf_public_id: String,
    pub created_by: String,
}

/// Whether an upsert created a row or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Result of [`IssueStore::upsert`].
#[derive(Debug, Clone)]
pub struct IssueUpsert {
    pub issue: Issue,
    pub outcome: UpsertOutcome,
    /// Storage id of the object the replaced row pointed at.
    pub previous_public_id: Option<String>,
}

/// Reads and writes the `issues` table.
#[derive(Debug, Clone)]
pub struct IssueStore {
    db: Database,
}

impl IssueStore {
    /// Creates a store over `db`.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Distinct years that have at least one issue, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](super::StoreError) when the query fails.
    #[instrument(skip(self))]
    pub async fn years(&self) -> Result<Vec<i64>> {
        let years = self
            .db
            .run(|pool| async move {
                sqlx::query_scalar::<_, i64>("SELECT DISTINCT year FROM issues ORDER BY year DESC")
                    .fetch_all(&pool)
                    .await
            })
            .await?;
        Ok(years)
    }

    /// Issues matching `filter`, ordered year then month, both descending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](super::StoreError) when the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: IssueFilter) -> Result<Vec<Issue>> {
        let issues = self
            .db
            .run(|pool| async move {
                let mut query: QueryBuilder<'_, Sqlite> =
                    QueryBuilder::new(format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE 1=1"));
                if let Some(year) = filter.year {
                    query.push(" AND year = ").push_bind(year);
                }
                if let Some(month) = filter.month {
                    query.push(" AND month = ").push_bind(month);
                }
                query.push(" ORDER BY year DESC, month DESC");
                query.build_query_as::<Issue>().fetch_all(&pool).await
            })
            .await?;
        debug!(count = issues.len(), "issues loaded");
        Ok(issues)
    }

    /// Looks an issue up by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](super::StoreError) when the query fails.
    #[instrument(skip(self))]
    pub async fn find(&self, id: i64) -> Result<Option<Issue>> {
        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?");
        let issue = self
            .db
            .run(|pool| {
                let sql = sql.clone();
                async move {
                    sqlx::query_as::<_, Issue>(&sql)
                        .bind(id)
                        .fetch_optional(&pool)
                        .await
                }
            })
            .await?;
        Ok(issue)
    }

    /// Looks up the issue for a (year, month).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](super::StoreError) when the query fails.
    #[instrument(skip(self))]
    pub async fn find_by_period(&self, year: i64, month: i64) -> Result<Option<Issue>> {
        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE year = ? AND month = ?");
        let issue = self
            .db
            .run(|pool| {
                let sql = sql.clone();
                async move {
                    sqlx::query_as::<_, Issue>(&sql)
                        .bind(year)
                        .bind(month)
                        .fetch_optional(&pool)
                        .await
                }
            })
            .await?;
        Ok(issue)
    }

    /// Inserts the issue for its (year, month), or replaces the document and
    /// metadata of the existing one. `created_by` and `created_at` of a
    /// replaced row are kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](super::StoreError) when a query fails.
    #[instrument(skip(self, issue), fields(year = issue.year, month = issue.month))]
    pub async fn upsert(&self, issue: &NewIssue) -> Result<IssueUpsert> {
        let now = Utc::now();

        if let Some(existing) = self.find_by_period(issue.year, issue.month).await? {
            let sql = format!(
                "UPDATE issues
                 SET title = ?, description = ?, pdf_url = ?, pdf_public_id = ?, updated_at = ?
                 WHERE id = ?
                 RETURNING {ISSUE_COLUMNS}"
            );
            let id = existing.id;
            let replaced = self
                .db
                .run(|pool| {
                    let sql = sql.clone();
                    async move {
                        sqlx::query_as::<_, Issue>(&sql)
                            .bind(&issue.title)
                            .bind(issue.description.as_deref())
                            .bind(&issue.pdf_url)
                            .bind(&issue.pdf_public_id)
                            .bind(now)
                            .bind(id)
                            .fetch_one(&pool)
                            .await
                    }
                })
                .await?;
            info!(id, "issue replaced");
            return Ok(IssueUpsert {
                issue: replaced,
                outcome: UpsertOutcome::Replaced,
                previous_public_id: Some(existing.pdf_public_id),
            });
        }

        let sql = format!(
            "INSERT INTO issues
             (year, month, title, description, pdf_url, pdf_public_id, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {ISSUE_COLUMNS}"
        );
        let inserted = self
            .db
            .run(|pool| {
                let sql = sql.clone();
                async move {
                    sqlx::query_as::<_, Issue>(&sql)
                        .bind(issue.year)
                        .bind(issue.month)
                        .bind(&issue.title)
                        .bind(issue.description.as_deref())
                        .bind(&issue.pdf_url)
                        .bind(&issue.pdf_public_id)
                        .bind(&issue.created_by)
                        .bind(now)
                        .bind(now)
                        .fetch_one(&pool)
                        .await
                }
            })
            .await?;
        info!(id = inserted.id, "issue inserted");
        Ok(IssueUpsert {
            issue: inserted,
            outcome: UpsertOutcome::Inserted,
            previous_public_id: None,
        })
    }

    /// Updates title and description. Returns `None` when no such issue.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](super::StoreError) when the query fails.
    #[instrument(skip(self, description))]
    pub async fn update_meta(
        &self,
        id: i64,
        title: &str,
        description: Option<&str>,
    ) -> Result<Option<Issue>> {
        let sql = format!(
            "UPDATE issues SET title = ?, description = ?, updated_at = ?
             WHERE id = ?
             RETURNING {ISSUE_COLUMNS}"
        );
        let now = Utc::now();
        let issue = self
            .db
            .run(|pool| {
                let sql = sql.clone();
                async move {
                    sqlx::query_as::<_, Issue>(&sql)
                        .bind(title)
                        .bind(description)
                        .bind(now)
                        .bind(id)
                        .fetch_optional(&pool)
                        .await
                }
            })
            .await?;
        Ok(issue)
    }

    /// Deletes an issue row. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](super::StoreError) when the query fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = self
            .db
            .run(|pool| async move {
                sqlx::query("DELETE FROM issues WHERE id = ?")
                    .bind(id)
                    .execute(&pool)
                    .await
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
