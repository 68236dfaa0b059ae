use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{customer, machine_model};
use crate::errors::ServiceError;

use super::{BaseRepository, Repository};

/// Name lookups for customers and machine models used to label views.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_customers_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<Vec<customer::Model>, ServiceError>;

    async fn find_models_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<Vec<machine_model::Model>, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct SeaOrmCatalogRepository {
    base: BaseRepository,
}

impl SeaOrmCatalogRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl CatalogRepository for SeaOrmCatalogRepository {
    async fn find_customers_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<Vec<customer::Model>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(customer::Entity::find()
            .filter(customer::Column::Id.is_in(ids))
            .all(self.base.get_db())
            .await?)
    }

    async fn find_models_by_ids(
        &self,
        ids: Vec<Uuid>,
    ) -> Result<Vec<machine_model::Model>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(machine_model::Entity::find()
            .filter(machine_model::Column::Id.is_in(ids))
            .all(self.base.get_db())
            .await?)
    }
}
