//! Categories, tags and image categories.
//!
//! The three tables share one shape, so one store serves all of them keyed
//! by [`TaxonomyKind`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use sqlx::FromRow;
use tracing::{info, instrument};

use crate::db::{Database, DbErrorKind};

use super::{Result, StoreError};

static NON_SLUG_RUN: LazyLock<Regex> = LazyLock::new(|| compile_static_regex("[^a-z0-9]+"));

fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Lowercases `name`, replaces each run of characters outside `[a-z0-9]`
/// with `-`, then trims leading and trailing `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    NON_SLUG_RUN
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Which taxonomy table an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyKind {
    Category,
    Tag,
    ImageCategory,
}

impl TaxonomyKind {
    fn table(self) -> &'static str {
        match self {
            Self::Category => "categories",
            Self::Tag => "tags",
            Self::ImageCategory => "image_categories",
        }
    }

    /// Human label used in messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Tag => "tag",
            Self::ImageCategory => "image category",
        }
    }

    /// Key wrapping a created term in API responses.
    #[must_use]
    pub fn response_key(self) -> &'static str {
        match self {
            Self::Category | Self::ImageCategory => "category",
            Self::Tag => "tag",
        }
    }
}

/// A taxonomy term.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Term {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

/// Fields for a new term; the slug is derived from `name`.
#[derive(Debug, Clone)]
pub struct NewTerm {
    pub name: String,
    pub description: Option<String>,
}

/// Reads and writes the taxonomy tables.
#[derive(Debug, Clone)]
pub struct TaxonomyStore {
    db: Database,
}

impl TaxonomyStore {
    /// Creates a store over `db`.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All terms of `kind`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, kind: TaxonomyKind) -> Result<Vec<Term>> {
        let sql = format!(
            "SELECT id, name, slug, description FROM {} ORDER BY name ASC",
            kind.table()
        );
        let terms = self
            .db
            .run(|pool| {
                let sql = sql.clone();
                async move { sqlx::query_as::<_, Term>(&sql).fetch_all(&pool).await }
            })
            .await?;
        Ok(terms)
    }

    /// Creates a term.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when a term with the same slug
    /// exists, or [`StoreError::Database`] when a query fails.
    #[instrument(skip(self, term), fields(name = %term.name))]
    pub async fn create(&self, kind: TaxonomyKind, term: &NewTerm) -> Result<Term> {
        let slug = slugify(&term.name);
        let table = kind.table();
        let conflict = || StoreError::Conflict {
            what: format!("{} '{slug}'", kind.label()),
        };

        let lookup = format!("SELECT id FROM {table} WHERE slug = ?");
        let existing = self
            .db
            .run(|pool| {
                let lookup = lookup.clone();
                let slug = slug.as_str();
                async move {
                    sqlx::query_scalar::<_, i64>(&lookup)
                        .bind(slug)
                        .fetch_optional(&pool)
                        .await
                }
            })
            .await?;
        if existing.is_some() {
            return Err(conflict());
        }

        let insert = format!(
            "INSERT INTO {table} (name, slug, description) VALUES (?, ?, ?)
             RETURNING id, name, slug, description"
        );
        let created = self
            .db
            .run(|pool| {
                let insert = insert.clone();
                let slug = slug.as_str();
                async move {
                    sqlx::query_as::<_, Term>(&insert)
                        .bind(&term.name)
                        .bind(slug)
                        .bind(term.description.as_deref())
                        .fetch_one(&pool)
                        .await
                }
            })
            .await
            .map_err(|error| match StoreError::from(error) {
                StoreError::Database {
                    kind: DbErrorKind::ConstraintViolation,
                    ..
                } => conflict(),
                other => other,
            })?;

        info!(id = created.id, slug = %created.slug, kind = kind.label(), "term created");
        Ok(created)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_and_trims() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Art & Culture!! "), "art-culture");
        assert_eq!(slugify("---x---"), "x");
        assert_eq!(slugify("2024 Elections"), "2024-elections");
        assert_eq!(slugify("!!!"), "");
    }

    #[tokio::test]
    async fn test_create_and_list_sorted_by_name() {
        let store = TaxonomyStore::new(Database::new_in_memory().await.unwrap());
        for name in ["Politics", "Art", "Economy"] {
            store
                .create(
                    TaxonomyKind::Category,
                    &NewTerm {
                        name: name.to_string(),
                        description: None,
                    },
                )
                .await
                .unwrap();
        }

        let names: Vec<_> = store
            .list(TaxonomyKind::Category)
            .await
            .unwrap()
            .into_iter()
            .map(|term| term.name)
            .collect();
        assert_eq!(names, ["Art", "Economy", "Politics"]);
        assert!(store.list(TaxonomyKind::Tag).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_conflict() {
        let store = TaxonomyStore::new(Database::new_in_memory().await.unwrap());
        let term = |name: &str| NewTerm {
            name: name.to_string(),
            description: Some("d".to_string()),
        };

        store
            .create(TaxonomyKind::Tag, &term("Free Speech"))
            .await
            .unwrap();
        let error = store
            .create(TaxonomyKind::Tag, &term("free  speech"))
            .await
            .unwrap_err();

        assert!(matches!(error, StoreError::Conflict { .. }));
        assert!(error.to_string().contains("free-speech"));

        // Same slug in a different table is fine.
        store
            .create(TaxonomyKind::ImageCategory, &term("Free Speech"))
            .await
            .unwrap();
    }

    #[test]
    fn test_response_keys() {
        assert_eq!(TaxonomyKind::Category.response_key(), "category");
        assert_eq!(TaxonomyKind::ImageCategory.response_key(), "category");
        assert_eq!(TaxonomyKind::Tag.response_key(), "tag");
    }
}
