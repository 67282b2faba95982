//! Plugin descriptor repository implementation.

use sqlx::PgPool;
use sqlx::types::Json;
use tracing::debug;

use hearth_core::error::{AppError, ErrorKind};
use hearth_core::result::AppResult;
use hearth_entity::plugin::{DescriptorPatch, PluginDescriptor};

const SELECT_COLUMNS: &str =
    "SELECT name, basename, filepath, status, schema_version, weight, info FROM plugins";

/// Repository for the `plugins` table.
#[derive(Debug, Clone)]
pub struct PluginRepository {
    pool: PgPool,
}

impl PluginRepository {
    /// Create a new plugin repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All descriptors in the order they were last written.
    pub async fn find_all(&self) -> AppResult<Vec<PluginDescriptor>> {
        sqlx::query_as::<_, PluginDescriptor>(&format!("{SELECT_COLUMNS} ORDER BY position"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| persistence("Failed to list plugins", e))
    }

    /// Find a descriptor by name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<PluginDescriptor>> {
        sqlx::query_as::<_, PluginDescriptor>(&format!("{SELECT_COLUMNS} WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| persistence("Failed to find plugin", e))
    }

    /// Truncate the table and write `descriptors` in order, in one
    /// transaction.
    pub async fn replace_all(&self, descriptors: &[PluginDescriptor]) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| persistence("Failed to begin plugin rewrite", e))?;

        sqlx::query("DELETE FROM plugins")
            .execute(&mut *tx)
            .await
            .map_err(|e| persistence("Failed to clear plugins", e))?;

        for (position, d) in descriptors.iter().enumerate() {
            sqlx::query(
                "INSERT INTO plugins \
                 (position, name, basename, filepath, status, schema_version, weight, info) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(position as i32)
            .bind(&d.name)
            .bind(&d.basename)
            .bind(&d.filepath)
            .bind(d.status)
            .bind(d.schema_version)
            .bind(d.weight)
            .bind(Json(&d.info))
            .execute(&mut *tx)
            .await
            .map_err(|e| persistence(format!("Failed to insert plugin '{}'", d.name), e))?;
        }

        tx.commit()
            .await
            .map_err(|e| persistence("Failed to commit plugin rewrite", e))?;

        debug!(count = descriptors.len(), "Plugin table rewritten");
        Ok(())
    }

    /// Update the activation fields set in `patch`; unset fields keep their
    /// stored value.
    pub async fn update_by_name(&self, name: &str, patch: &DescriptorPatch) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE plugins SET \
             status = COALESCE($2, status), \
             schema_version = COALESCE($3, schema_version), \
             weight = COALESCE($4, weight), \
             updated_at = NOW() \
             WHERE name = $1",
        )
        .bind(name)
        .bind(patch.status)
        .bind(patch.schema_version)
        .bind(patch.weight)
        .execute(&self.pool)
        .await
        .map_err(|e| persistence(format!("Failed to update plugin '{name}'"), e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Plugin '{name}' is not in the descriptor store"
            )));
        }
        Ok(())
    }

    /// Count stored descriptors.
    pub async fn count(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM plugins")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| persistence("Failed to count plugins", e))?;
        Ok(count as u64)
    }
}

fn persistence(message: impl Into<String>, err: sqlx::Error) -> AppError {
    AppError::with_source(ErrorKind::Persistence, message, err)
}
