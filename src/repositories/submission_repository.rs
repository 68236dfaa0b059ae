use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::submission::{
    ActiveModel as SubmissionActiveModel, Column, Entity as Submission, Model as SubmissionModel,
};
use crate::errors::ServiceError;
use crate::models::{BillingPeriod, Branch};

use super::{BaseRepository, Repository};

/// Month locks. A row for (year, month, branch) means the scope is locked.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn find_by_year_month_branch(
        &self,
        period: BillingPeriod,
        branch: Branch,
    ) -> Result<Option<SubmissionModel>, ServiceError>;

    async fn upsert_by_year_month_branch(
        &self,
        period: BillingPeriod,
        branch: Branch,
        submitted_by: Uuid,
    ) -> Result<SubmissionModel, ServiceError>;

    /// Returns whether a lock was removed.
    async fn delete_by_year_month_branch(
        &self,
        period: BillingPeriod,
        branch: Branch,
    ) -> Result<bool, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct SeaOrmSubmissionRepository {
    base: BaseRepository,
}

impl SeaOrmSubmissionRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl SubmissionRepository for SeaOrmSubmissionRepository {
    async fn find_by_year_month_branch(
        &self,
        period: BillingPeriod,
        branch: Branch,
    ) -> Result<Option<SubmissionModel>, ServiceError> {
        Ok(Submission::find()
            .filter(Column::Year.eq(period.year))
            .filter(Column::Month.eq(period.month))
            .filter(Column::Branch.eq(branch))
            .one(self.base.get_db())
            .await?)
    }

    /// Re-locking refreshes who locked the scope and when.
    async fn upsert_by_year_month_branch(
        &self,
        period: BillingPeriod,
        branch: Branch,
        submitted_by: Uuid,
    ) -> Result<SubmissionModel, ServiceError> {
        let active = SubmissionActiveModel {
            id: Set(Uuid::new_v4()),
            year: Set(period.year),
            month: Set(period.month),
            branch: Set(branch),
            submitted_by: Set(submitted_by),
            submitted_at: Set(Utc::now()),
        };

        Submission::insert(active)
            .on_conflict(
                OnConflict::columns([Column::Year, Column::Month, Column::Branch])
                    .update_columns([Column::SubmittedBy, Column::SubmittedAt])
                    .to_owned(),
            )
            .exec_without_returning(self.base.get_db())
            .await?;

        self.find_by_year_month_branch(period, branch)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Lock for {} ({}) missing after upsert",
                    period, branch
                ))
            })
    }

    async fn delete_by_year_month_branch(
        &self,
        period: BillingPeriod,
        branch: Branch,
    ) -> Result<bool, ServiceError> {
        let result = Submission::delete_many()
            .filter(Column::Year.eq(period.year))
            .filter(Column::Month.eq(period.month))
            .filter(Column::Branch.eq(branch))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected > 0)
    }
}
