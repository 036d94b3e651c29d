//! Extension repository for database operations.
//!
//! Every record kind is stored as a JSON document in the `extensions` table.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};

use crate::entities::extensions;
use s3link_core::extension::{Extension, ExtensionError, ExtensionStore};

/// Extension repository implementation.
#[derive(Debug, Clone)]
pub struct ExtensionRepository {
    db: DatabaseConnection,
}

impl ExtensionRepository {
    /// Create a new extension repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl ExtensionStore for ExtensionRepository {
    async fn fetch<E: Extension>(&self, name: &str) -> Result<Option<E>, ExtensionError> {
        let model = extensions::Entity::find_by_id((E::KIND.to_string(), name.to_string()))
            .one(&self.db)
            .await
            .map_err(repository_error)?;

        model.map(to_extension::<E>).transpose()
    }

    async fn list<E, P>(&self, predicate: P) -> Result<Vec<E>, ExtensionError>
    where
        E: Extension,
        P: Fn(&E) -> bool + Send + Sync,
    {
        let models = extensions::Entity::find()
            .filter(extensions::Column::Kind.eq(E::KIND))
            .order_by_asc(extensions::Column::CreatedAt)
            .order_by_asc(extensions::Column::Name)
            .all(&self.db)
            .await
            .map_err(repository_error)?;

        let mut records = Vec::with_capacity(models.len());
        for model in models {
            let record = to_extension::<E>(model)?;
            if predicate(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn create<E: Extension>(&self, mut extension: E) -> Result<E, ExtensionError> {
        let now = Utc::now();
        extension.metadata_mut().creation_timestamp = Some(now);

        let data = serde_json::to_value(&extension)
            .map_err(|e| ExtensionError::serialization(E::KIND, &e))?;

        let active_model = extensions::ActiveModel {
            kind: Set(E::KIND.to_string()),
            name: Set(extension.name().to_string()),
            data: Set(data),
            created_at: Set(now.into()),
        };

        active_model.insert(&self.db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                ExtensionError::AlreadyExists {
                    kind: E::KIND,
                    name: extension.name().to_string(),
                }
            } else {
                repository_error(e)
            }
        })?;

        tracing::debug!(kind = E::KIND, name = %extension.name(), "Extension created");
        Ok(extension)
    }
}

fn repository_error(err: DbErr) -> ExtensionError {
    ExtensionError::repository(err.to_string())
}

/// Convert a stored document back into its record type.
fn to_extension<E: Extension>(model: extensions::Model) -> Result<E, ExtensionError> {
    serde_json::from_value(model.data).map_err(|e| ExtensionError::serialization(E::KIND, &e))
}
