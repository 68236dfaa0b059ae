use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::reading::{
    ActiveModel as ReadingActiveModel, Column, Entity as Reading, Model as ReadingModel,
};
use crate::errors::ServiceError;
use crate::models::{BillingPeriod, Branch};

use super::{BaseRepository, Repository};

/// Values written by a reading upsert. `branch` is only used when the row is
/// first created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReading {
    pub machine_id: Uuid,
    pub period: BillingPeriod,
    pub mono: Option<i64>,
    pub colour: Option<i64>,
    pub scan: Option<i64>,
    pub mono_usage: Option<i64>,
    pub colour_usage: Option<i64>,
    pub scan_usage: Option<i64>,
    pub note: Option<String>,
    pub captured_by: Uuid,
    pub branch: Branch,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadingRepository: Send + Sync {
    async fn find_by_year_month_branch(
        &self,
        period: BillingPeriod,
        branch: Branch,
    ) -> Result<Vec<ReadingModel>, ServiceError>;

    async fn find_by_machine_and_period(
        &self,
        machine_id: Uuid,
        period: BillingPeriod,
    ) -> Result<Option<ReadingModel>, ServiceError>;

    async fn find_by_machines_and_period(
        &self,
        machine_ids: Vec<Uuid>,
        period: BillingPeriod,
    ) -> Result<Vec<ReadingModel>, ServiceError>;

    /// Most recent reading of a machine that carries at least one meter value.
    async fn find_latest_by_machine(
        &self,
        machine_id: Uuid,
    ) -> Result<Option<ReadingModel>, ServiceError>;

    async fn upsert_by_machine_period(
        &self,
        reading: NewReading,
    ) -> Result<ReadingModel, ServiceError>;

    /// Returns whether a row was removed.
    async fn delete_by_machine_period(
        &self,
        machine_id: Uuid,
        period: BillingPeriod,
    ) -> Result<bool, ServiceError>;
}

/// Repository for monthly meter readings
#[derive(Debug, Clone)]
pub struct SeaOrmReadingRepository {
    base: BaseRepository,
}

impl SeaOrmReadingRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

fn period_condition(period: BillingPeriod) -> Condition {
    Condition::all()
        .add(Column::Year.eq(period.year))
        .add(Column::Month.eq(period.month))
}

#[async_trait]
impl ReadingRepository for SeaOrmReadingRepository {
    async fn find_by_year_month_branch(
        &self,
        period: BillingPeriod,
        branch: Branch,
    ) -> Result<Vec<ReadingModel>, ServiceError> {
        Ok(Reading::find()
            .filter(period_condition(period))
            .filter(Column::Branch.eq(branch))
            .all(self.base.get_db())
            .await?)
    }

    async fn find_by_machine_and_period(
        &self,
        machine_id: Uuid,
        period: BillingPeriod,
    ) -> Result<Option<ReadingModel>, ServiceError> {
        Ok(Reading::find()
            .filter(Column::MachineId.eq(machine_id))
            .filter(period_condition(period))
            .one(self.base.get_db())
            .await?)
    }

    async fn find_by_machines_and_period(
        &self,
        machine_ids: Vec<Uuid>,
        period: BillingPeriod,
    ) -> Result<Vec<ReadingModel>, ServiceError> {
        if machine_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(Reading::find()
            .filter(Column::MachineId.is_in(machine_ids))
            .filter(period_condition(period))
            .all(self.base.get_db())
            .await?)
    }

    async fn find_latest_by_machine(
        &self,
        machine_id: Uuid,
    ) -> Result<Option<ReadingModel>, ServiceError> {
        Ok(Reading::find()
            .filter(Column::MachineId.eq(machine_id))
            .filter(
                Condition::any()
                    .add(Column::Mono.is_not_null())
                    .add(Column::Colour.is_not_null())
                    .add(Column::Scan.is_not_null()),
            )
            .order_by_desc(Column::Year)
            .order_by_desc(Column::Month)
            .one(self.base.get_db())
            .await?)
    }

    /// Single-statement upsert on the (machine, year, month) key, so
    /// concurrent writers resolve last-write-wins. `branch` and `created_at`
    /// keep their first-insert values.
    async fn upsert_by_machine_period(
        &self,
        reading: NewReading,
    ) -> Result<ReadingModel, ServiceError> {
        let db = self.base.get_db();
        let (machine_id, period) = (reading.machine_id, reading.period);
        let now = Utc::now();

        let active = ReadingActiveModel {
            id: Set(Uuid::new_v4()),
            machine_id: Set(reading.machine_id),
            year: Set(reading.period.year),
            month: Set(reading.period.month),
            mono: Set(reading.mono),
            colour: Set(reading.colour),
            scan: Set(reading.scan),
            mono_usage: Set(reading.mono_usage),
            colour_usage: Set(reading.colour_usage),
            scan_usage: Set(reading.scan_usage),
            note: Set(reading.note),
            captured_by: Set(reading.captured_by),
            branch: Set(reading.branch),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        Reading::insert(active)
            .on_conflict(
                OnConflict::columns([Column::MachineId, Column::Year, Column::Month])
                    .update_columns([
                        Column::Mono,
                        Column::Colour,
                        Column::Scan,
                        Column::MonoUsage,
                        Column::ColourUsage,
                        Column::ScanUsage,
                        Column::Note,
                        Column::CapturedBy,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        self.find_by_machine_and_period(machine_id, period)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Reading for machine {} in {} missing after upsert",
                    machine_id, period
                ))
            })
    }

    async fn delete_by_machine_period(
        &self,
        machine_id: Uuid,
        period: BillingPeriod,
    ) -> Result<bool, ServiceError> {
        let result = Reading::delete_many()
            .filter(Column::MachineId.eq(machine_id))
            .filter(period_condition(period))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected > 0)
    }
}
