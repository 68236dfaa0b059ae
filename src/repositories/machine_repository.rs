use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::machine::{Column, Entity as Machine, Model as MachineModel};
use crate::errors::ServiceError;
use crate::models::BranchFilter;

use super::{BaseRepository, Repository};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MachineRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MachineModel>, ServiceError>;

    async fn find_by_serial_number(
        &self,
        serial_number: &str,
    ) -> Result<Option<MachineModel>, ServiceError>;

    /// Active machines in scope, ordered by serial number. Decommissioned
    /// machines are only returned when `include_decommissioned` is set.
    async fn find_active_by_branch(
        &self,
        filter: BranchFilter,
        include_decommissioned: bool,
    ) -> Result<Vec<MachineModel>, ServiceError>;

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<MachineModel>, ServiceError>;
}

/// Repository for machine lookups
#[derive(Debug, Clone)]
pub struct SeaOrmMachineRepository {
    base: BaseRepository,
}

impl SeaOrmMachineRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl MachineRepository for SeaOrmMachineRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<MachineModel>, ServiceError> {
        Ok(Machine::find_by_id(id).one(self.base.get_db()).await?)
    }

    async fn find_by_serial_number(
        &self,
        serial_number: &str,
    ) -> Result<Option<MachineModel>, ServiceError> {
        Ok(Machine::find()
            .filter(Column::SerialNumber.eq(serial_number.trim()))
            .one(self.base.get_db())
            .await?)
    }

    async fn find_active_by_branch(
        &self,
        filter: BranchFilter,
        include_decommissioned: bool,
    ) -> Result<Vec<MachineModel>, ServiceError> {
        let mut query = Machine::find().filter(Column::IsActive.eq(true));

        if let BranchFilter::Specific(branch) = filter {
            query = query.filter(Column::Branch.eq(branch));
        }
        if !include_decommissioned {
            query = query.filter(Column::IsDecommissioned.eq(false));
        }

        Ok(query
            .order_by_asc(Column::SerialNumber)
            .all(self.base.get_db())
            .await?)
    }

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<MachineModel>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Machine::find()
            .filter(Column::Id.is_in(ids))
            .all(self.base.get_db())
            .await?)
    }
}
