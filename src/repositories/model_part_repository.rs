use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::model_part::{Column, Entity as ModelPart, Model as ModelPartModel};
use crate::errors::ServiceError;
use crate::models::Branch;

use super::{BaseRepository, Repository};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelPartRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ModelPartModel>, ServiceError>;

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<ModelPartModel>, ServiceError>;

    /// Active parts of a model. With a branch, parts restricted to another
    /// branch are left out; parts without a branch apply everywhere.
    async fn find_by_model_id(
        &self,
        model_id: Uuid,
        branch: Option<Branch>,
    ) -> Result<Vec<ModelPartModel>, ServiceError>;

    /// Active parts whose item code or name equals `key`, ignoring case.
    async fn find_by_item_code_or_name(
        &self,
        key: &str,
    ) -> Result<Vec<ModelPartModel>, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct SeaOrmModelPartRepository {
    base: BaseRepository,
}

impl SeaOrmModelPartRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl ModelPartRepository for SeaOrmModelPartRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ModelPartModel>, ServiceError> {
        Ok(ModelPart::find_by_id(id).one(self.base.get_db()).await?)
    }

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<ModelPartModel>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(ModelPart::find()
            .filter(Column::Id.is_in(ids))
            .all(self.base.get_db())
            .await?)
    }

    async fn find_by_model_id(
        &self,
        model_id: Uuid,
        branch: Option<Branch>,
    ) -> Result<Vec<ModelPartModel>, ServiceError> {
        let mut query = ModelPart::find()
            .filter(Column::ModelId.eq(model_id))
            .filter(Column::IsActive.eq(true));

        if let Some(branch) = branch {
            query = query.filter(
                Condition::any()
                    .add(Column::Branch.is_null())
                    .add(Column::Branch.eq(branch)),
            );
        }

        Ok(query
            .order_by_asc(Column::Name)
            .all(self.base.get_db())
            .await?)
    }

    async fn find_by_item_code_or_name(
        &self,
        key: &str,
    ) -> Result<Vec<ModelPartModel>, ServiceError> {
        let key = key.trim();
        if key.is_empty() {
            return Ok(Vec::new());
        }

        // Case folding is done here rather than in SQL so it behaves the same on
        // Postgres and SQLite.
        let parts = ModelPart::find()
            .filter(Column::IsActive.eq(true))
            .all(self.base.get_db())
            .await?;

        Ok(parts
            .into_iter()
            .filter(|part| {
                part.item_code
                    .as_deref()
                    .is_some_and(|code| code.trim().eq_ignore_ascii_case(key))
                    || part.name.trim().eq_ignore_ascii_case(key)
            })
            .collect())
    }
}
