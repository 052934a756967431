//! Locally uploaded debate records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tracing::{debug, instrument};

use crate::db::Database;

use super::Result;

/// A persisted local debate document.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDebateRecord {
    /// Store-assigned primary key.
    pub id: i64,
    /// Display name; may be absent or empty.
    pub name: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Stable retrieval URL of the stored object.
    pub pdf_url: String,
    /// Storage-side identifier, kept for future deletion.
    pub storage_id: String,
    /// User id of the uploader.
    pub created_by: String,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

/// Fields for a new local debate record.
#[derive(Debug, Clone)]
pub struct NewDebate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub pdf_url: String,
    pub storage_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Reads and writes the `debates` table.
#[derive(Debug, Clone)]
pub struct DebateStore {
    db: Database,
}

impl DebateStore {
    /// Creates a store over `db`.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All records, newest first. Ties on `created_at` fall back to the
    /// higher id first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](super::StoreError) when the query fails.
    #[instrument(skip(self))]
    pub async fn list_newest_first(&self) -> Result<Vec<LocalDebateRecord>> {
        let records = self
            .db
            .run(|pool| async move {
                sqlx::query_as::<_, LocalDebateRecord>(
                    "SELECT id, name, description, pdf_url, storage_id, created_by, created_at
                     FROM debates
                     ORDER BY created_at DESC, id DESC",
                )
                .fetch_all(&pool)
                .await
            })
            .await?;
        debug!(count = records.len(), "local debates loaded");
        Ok(records)
    }

    /// Looks a record up by primary key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](super::StoreError) when the query fails.
    #[instrument(skip(self))]
    pub async fn find(&self, id: i64) -> Result<Option<LocalDebateRecord>> {
        let record = self
            .db
            .run(|pool| async move {
                sqlx::query_as::<_, LocalDebateRecord>(
                    "SELECT id, name, description, pdf_url, storage_id, created_by, created_at
                     FROM debates WHERE id = ?",
                )
                .bind(id)
                .fetch_optional(&pool)
                .await
            })
            .await?;
        Ok(record)
    }

    /// Inserts a record and returns it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](super::StoreError) when the insert fails.
    #[instrument(skip(self, debate), fields(storage_id = %debate.storage_id))]
    pub async fn insert(&self, debate: &NewDebate) -> Result<LocalDebateRecord> {
        let record = self
            .db
            .run(|pool| async move {
                sqlx::query_as::<_, LocalDebateRecord>(
                    "INSERT INTO debates (name, description, pdf_url, storage_id, created_by, created_at)
                     VALUES (?, ?, ?, ?, ?, ?)
                     RETURNING id, name, description, pdf_url, storage_id, created_by, created_at",
                )
                .bind(debate.name.as_deref())
                .bind(debate.description.as_deref())
                .bind(&debate.pdf_url)
                .bind(&debate.storage_id)
                .bind(&debate.created_by)
                .bind(debate.created_at)
                .fetch_one(&pool)
                .await
            })
            .await?;
        debug!(id = record.id, "local debate inserted");
        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn new_debate(name: &str, created_at: DateTime<Utc>) -> NewDebate {
        NewDebate {
            name: Some(name.to_string()),
            description: None,
            pdf_url: format!("https://res.cloudinary.com/demo/raw/upload/{name}.pdf"),
            storage_id: format!("debates/{name}"),
            created_by: "admin-1".to_string(),
            created_at,
        }
    }

    async fn store() -> DebateStore {
        DebateStore::new(Database::new_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_round_trips() {
        let store = store().await;
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let inserted = store.insert(&new_debate("first", at)).await.unwrap();
        let found = store.find(inserted.id).await.unwrap().unwrap();

        assert_eq!(found, inserted);
        assert_eq!(found.created_at, at);
        assert_eq!(found.storage_id, "debates/first");
    }

    #[tokio::test]
    async fn test_find_missing_is_none() {
        let store = store().await;
        assert!(store.find(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_creation_time_descending() {
        let store = store().await;
        let old = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mid = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();

        store.insert(&new_debate("old", old)).await.unwrap();
        store.insert(&new_debate("new", new)).await.unwrap();
        store.insert(&new_debate("mid", mid)).await.unwrap();

        let names: Vec<_> = store
            .list_newest_first()
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.name.unwrap())
            .collect();
        assert_eq!(names, ["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_list_breaks_time_ties_by_id() {
        let store = store().await;
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let a = store.insert(&new_debate("a", at)).await.unwrap();
        let b = store.insert(&new_debate("b", at)).await.unwrap();

        let ids: Vec<_> = store
            .list_newest_first()
            .await
            .unwrap()
            .iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, [b.id, a.id]);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = LocalDebateRecord {
            id: 7,
            name: None,
            description: Some("d".to_string()),
            pdf_url: "https://res.cloudinary.com/x.pdf".to_string(),
            storage_id: "debates/x".to_string(),
            created_by: "u1".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["pdfUrl"], "https://res.cloudinary.com/x.pdf");
        assert_eq!(json["storageId"], "debates/x");
        assert_eq!(json["createdBy"], "u1");
        assert!(json["name"].is_null());
        assert!(json.get("createdAt").is_some());
    }
}
