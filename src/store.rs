//! Favorite location persistence.
//!
//! SQLite-backed per-user set of (name, coordinate) pairs via `sqlx`.
//! The per-user coordinate uniqueness invariant is enforced at add time
//! by the pipeline, not by a schema constraint. Every read and write is
//! scoped to the requesting user:
//! a row owned by someone else is indistinguishable from an absent one.

use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{FavoriteLocation, GeoCandidate, WeatherError};

#[derive(Debug, FromRow)]
struct FavoriteRow {
    id: String,
    name: String,
    latitude: f64,
    longitude: f64,
    user_id: i64,
}

impl From<FavoriteRow> for FavoriteLocation {
    fn from(r: FavoriteRow) -> Self {
        FavoriteLocation {
            id: r.id,
            name: r.name,
            latitude: r.latitude,
            longitude: r.longitude,
            user_id: r.user_id,
        }
    }
}

/// Durable store of favorite locations.
#[derive(Clone)]
pub struct FavoriteStore {
    pool: SqlitePool,
}

impl FavoriteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the backing table if it doesn't exist.
    ///
    /// No UNIQUE constraint on (user_id, latitude, longitude): the
    /// duplicate check is an add-time invariant of `add`.
    pub async fn migrate(&self) -> Result<(), WeatherError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS favorite_locations (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        debug!("favorite_locations table ready");
        Ok(())
    }

    /// Add a geocoded candidate to a user's favorites.
    ///
    /// Fails with `Conflict` when the same user already has a row with
    /// bit-identical latitude and longitude (no tolerance radius).
    pub async fn add(
        &self,
        user_id: i64,
        candidate: &GeoCandidate,
    ) -> Result<FavoriteLocation, WeatherError> {
        let existing = sqlx::query_as::<_, FavoriteRow>(
            "SELECT id, name, latitude, longitude, user_id
             FROM favorite_locations
             WHERE user_id = ? AND latitude = ? AND longitude = ?",
        )
        .bind(user_id)
        .bind(candidate.latitude)
        .bind(candidate.longitude)
        .fetch_optional(&self.pool)
        .await?;

        if existing.is_some() {
            return Err(WeatherError::Conflict(format!(
                "Location '{}' is already in your favorites.",
                candidate.name
            )));
        }

        let favorite = FavoriteLocation {
            id: Uuid::new_v4().to_string(),
            name: candidate.name.clone(),
            latitude: candidate.latitude,
            longitude: candidate.longitude,
            user_id,
        };

        sqlx::query(
            "INSERT INTO favorite_locations (id, name, latitude, longitude, user_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&favorite.id)
        .bind(&favorite.name)
        .bind(favorite.latitude)
        .bind(favorite.longitude)
        .bind(favorite.user_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        info!(user_id, id = %favorite.id, name = %favorite.name, "Saved favorite location");
        Ok(favorite)
    }

    /// All favorites for a user, in insertion order.
    pub async fn list(&self, user_id: i64) -> Result<Vec<FavoriteLocation>, WeatherError> {
        let rows = sqlx::query_as::<_, FavoriteRow>(
            "SELECT id, name, latitude, longitude, user_id
             FROM favorite_locations
             WHERE user_id = ?
             ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// One favorite by id, scoped to its owner.
    pub async fn get(&self, user_id: i64, id: &str) -> Result<FavoriteLocation, WeatherError> {
        let row = sqlx::query_as::<_, FavoriteRow>(
            "SELECT id, name, latitude, longitude, user_id
             FROM favorite_locations
             WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into).ok_or_else(|| {
            WeatherError::NotFound("Favorite location not found or access denied.".into())
        })
    }

    /// Remove a favorite by id, scoped to its owner. Returns the removed
    /// row so callers can name it in the response message.
    pub async fn remove(&self, user_id: i64, id: &str) -> Result<FavoriteLocation, WeatherError> {
        let favorite = self.get(user_id, id).await.map_err(|_| {
            WeatherError::NotFound(
                "Favorite location not found or you do not have permission to delete it.".into(),
            )
        })?;

        sqlx::query("DELETE FROM favorite_locations WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        info!(user_id, id, name = %favorite.name, "Deleted favorite location");
        Ok(favorite)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> FavoriteStore {
        // One connection: each in-memory SQLite connection is its own DB.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = FavoriteStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn rome() -> GeoCandidate {
        GeoCandidate {
            name: "Roma".into(),
            latitude: 41.89193,
            longitude: 12.51133,
            country: "Italia".into(),
            region: Some("Lazio".into()),
        }
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let store = test_store().await;
        let fav = store.add(1, &rome()).await.unwrap();
        let got = store.get(1, &fav.id).await.unwrap();
        assert_eq!(got.name, "Roma");
        assert_eq!(got.latitude, 41.89193);
        assert_eq!(got.user_id, 1);
    }

    #[tokio::test]
    async fn test_duplicate_coordinates_same_user_conflict() {
        let store = test_store().await;
        store.add(1, &rome()).await.unwrap();
        let err = store.add(1, &rome()).await.unwrap_err();
        assert!(matches!(err, WeatherError::Conflict(_)));
        assert!(format!("{err}").contains("Roma"));
    }

    #[tokio::test]
    async fn test_duplicate_coordinates_different_user_ok() {
        let store = test_store().await;
        store.add(1, &rome()).await.unwrap();
        let fav = store.add(2, &rome()).await.unwrap();
        assert_eq!(fav.user_id, 2);
    }

    #[tokio::test]
    async fn test_nearby_coordinates_are_not_duplicates() {
        let store = test_store().await;
        store.add(1, &rome()).await.unwrap();
        let mut near = rome();
        near.latitude += 1e-9; // not bit-identical, so allowed
        assert!(store.add(1, &near).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_scoped_and_ordered() {
        let store = test_store().await;
        let a = store.add(1, &rome()).await.unwrap();
        let mut milan = rome();
        milan.name = "Milano".into();
        milan.latitude = 45.46427;
        milan.longitude = 9.18951;
        let b = store.add(1, &milan).await.unwrap();
        store.add(2, &rome()).await.unwrap();

        let list = store.list(1).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, a.id);
        assert_eq!(list[1].id, b.id);
    }

    #[tokio::test]
    async fn test_foreign_row_indistinguishable_from_absent() {
        let store = test_store().await;
        let fav = store.add(1, &rome()).await.unwrap();

        let by_other = store.get(2, &fav.id).await.unwrap_err();
        let by_bogus = store.get(2, "no-such-id").await.unwrap_err();
        assert_eq!(format!("{by_other}"), format!("{by_bogus}"));
    }

    #[tokio::test]
    async fn test_remove_scoped_to_owner() {
        let store = test_store().await;
        let fav = store.add(1, &rome()).await.unwrap();

        assert!(matches!(
            store.remove(2, &fav.id).await,
            Err(WeatherError::NotFound(_))
        ));
        // Still there for the owner
        assert!(store.get(1, &fav.id).await.is_ok());

        let removed = store.remove(1, &fav.id).await.unwrap();
        assert_eq!(removed.name, "Roma");
        assert!(store.get(1, &fav.id).await.is_err());
    }

    #[tokio::test]
    async fn test_readd_after_remove() {
        let store = test_store().await;
        let fav = store.add(1, &rome()).await.unwrap();
        store.remove(1, &fav.id).await.unwrap();
        assert!(store.add(1, &rome()).await.is_ok());
    }
}
