use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::part_replacement::{
    ActiveModel as PartReplacementActiveModel, Column, Entity as PartReplacement,
    Model as PartReplacementModel,
};
use crate::errors::ServiceError;

use super::{BaseRepository, Repository};

/// Replacement events are append-only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PartReplacementRepository: Send + Sync {
    /// Latest event for the pair by order date, then capture time.
    async fn find_latest_by_machine_and_part(
        &self,
        machine_id: Uuid,
        model_part_id: Uuid,
    ) -> Result<Option<PartReplacementModel>, ServiceError>;

    async fn find_by_machine_id(
        &self,
        machine_id: Uuid,
    ) -> Result<Vec<PartReplacementModel>, ServiceError>;

    async fn create(
        &self,
        replacement: PartReplacementModel,
    ) -> Result<PartReplacementModel, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct SeaOrmPartReplacementRepository {
    base: BaseRepository,
}

impl SeaOrmPartReplacementRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl PartReplacementRepository for SeaOrmPartReplacementRepository {
    async fn find_latest_by_machine_and_part(
        &self,
        machine_id: Uuid,
        model_part_id: Uuid,
    ) -> Result<Option<PartReplacementModel>, ServiceError> {
        Ok(PartReplacement::find()
            .filter(Column::MachineId.eq(machine_id))
            .filter(Column::ModelPartId.eq(model_part_id))
            .order_by_desc(Column::OrderDate)
            .order_by_desc(Column::CreatedAt)
            .one(self.base.get_db())
            .await?)
    }

    async fn find_by_machine_id(
        &self,
        machine_id: Uuid,
    ) -> Result<Vec<PartReplacementModel>, ServiceError> {
        Ok(PartReplacement::find()
            .filter(Column::MachineId.eq(machine_id))
            .order_by_desc(Column::OrderDate)
            .order_by_desc(Column::CreatedAt)
            .all(self.base.get_db())
            .await?)
    }

    async fn create(
        &self,
        replacement: PartReplacementModel,
    ) -> Result<PartReplacementModel, ServiceError> {
        let active = PartReplacementActiveModel {
            id: Set(replacement.id),
            machine_id: Set(replacement.machine_id),
            model_part_id: Set(replacement.model_part_id),
            order_date: Set(replacement.order_date),
            prior_reading: Set(replacement.prior_reading),
            current_reading: Set(replacement.current_reading),
            usage: Set(replacement.usage),
            remaining_toner_percent: Set(replacement.remaining_toner_percent),
            yield_met: Set(replacement.yield_met),
            shortfall_clicks: Set(replacement.shortfall_clicks),
            adjusted_shortfall_clicks: Set(replacement.adjusted_shortfall_clicks),
            cost_per_click: Set(replacement.cost_per_click),
            display_charge_rand: Set(replacement.display_charge_rand),
            expected_yield_snapshot: Set(replacement.expected_yield_snapshot),
            cost_rand_snapshot: Set(replacement.cost_rand_snapshot),
            captured_by: Set(replacement.captured_by),
            created_at: Set(replacement.created_at),
        };
        Ok(active.insert(self.base.get_db()).await?)
    }
}
