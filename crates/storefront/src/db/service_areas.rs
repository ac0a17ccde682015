//! Service area repository.

use sqlx::PgPool;

use ahmed_mart_core::ServiceAreaId;
use ahmed_mart_core::service_area::{NewServiceArea, ServiceArea};

use super::RepositoryError;

const AREA_COLUMNS: &str =
    "id, name, center_latitude, center_longitude, radius_km, is_active, created_at";

/// Row shape for `service_areas`; kept separate so the core type stays
/// free of database derives.
#[derive(Debug, sqlx::FromRow)]
struct ServiceAreaRow {
    id: ServiceAreaId,
    name: String,
    center_latitude: f64,
    center_longitude: f64,
    radius_km: f64,
    is_active: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ServiceAreaRow> for ServiceArea {
    fn from(row: ServiceAreaRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            center_latitude: row.center_latitude,
            center_longitude: row.center_longitude,
            radius_km: row.radius_km,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Repository for delivery geofences.
pub struct ServiceAreaRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ServiceAreaRepository<'a> {
    /// Create a new service area repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every area, active or not, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ServiceArea>, RepositoryError> {
        let rows = sqlx::query_as::<_, ServiceAreaRow>(&format!(
            "SELECT {AREA_COLUMNS} FROM service_areas ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ServiceArea::from).collect())
    }

    /// Active areas only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<ServiceArea>, RepositoryError> {
        let rows = sqlx::query_as::<_, ServiceAreaRow>(&format!(
            "SELECT {AREA_COLUMNS} FROM service_areas WHERE is_active"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ServiceArea::from).collect())
    }

    /// Insert a validated area.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, area: &NewServiceArea) -> Result<ServiceArea, RepositoryError> {
        let row = sqlx::query_as::<_, ServiceAreaRow>(&format!(
            r"
            INSERT INTO service_areas (name, center_latitude, center_longitude, radius_km, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {AREA_COLUMNS}
            "
        ))
        .bind(area.name.trim())
        .bind(area.center_latitude)
        .bind(area.center_longitude)
        .bind(area.radius_km)
        .bind(area.is_active)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Replace an area's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the area does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ServiceAreaId,
        area: &NewServiceArea,
    ) -> Result<ServiceArea, RepositoryError> {
        let row = sqlx::query_as::<_, ServiceAreaRow>(&format!(
            r"
            UPDATE service_areas
            SET name = $2, center_latitude = $3, center_longitude = $4,
                radius_km = $5, is_active = $6
            WHERE id = $1
            RETURNING {AREA_COLUMNS}
            "
        ))
        .bind(id)
        .bind(area.name.trim())
        .bind(area.center_latitude)
        .bind(area.center_longitude)
        .bind(area.radius_km)
        .bind(area.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete an area.
    ///
    /// # Returns
    ///
    /// Returns `true` if the area was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ServiceAreaId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM service_areas WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
