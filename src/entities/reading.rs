use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{BillingPeriod, Branch, MeterKind};

/// One month's meter values for a machine; unique per (machine, year, month).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "readings")]
#[schema(as = Reading)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub machine_id: Uuid,
    pub year: i32,
    pub month: i32,
    pub mono: Option<i64>,
    pub colour: Option<i64>,
    pub scan: Option<i64>,
    pub mono_usage: Option<i64>,
    pub colour_usage: Option<i64>,
    pub scan_usage: Option<i64>,
    pub note: Option<String>,
    pub captured_by: Uuid,
    /// Copied from the machine when first captured; never rewritten on update.
    pub branch: Branch,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn period(&self) -> BillingPeriod {
        BillingPeriod {
            year: self.year,
            month: self.month,
        }
    }

    pub fn meter(&self, kind: MeterKind) -> Option<i64> {
        match kind {
            MeterKind::Mono => self.mono,
            MeterKind::Colour => self.colour,
            MeterKind::Scan => self.scan,
        }
    }

    pub fn usage(&self, kind: MeterKind) -> Option<i64> {
        match kind {
            MeterKind::Mono => self.mono_usage,
            MeterKind::Colour => self.colour_usage,
            MeterKind::Scan => self.scan_usage,
        }
    }

    /// A note-only reading has no meter values and does not count as captured.
    pub fn has_meter_values(&self) -> bool {
        self.mono.is_some() || self.colour.is_some() || self.scan.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::machine::Entity",
        from = "Column::MachineId",
        to = "super::machine::Column::Id",
        on_delete = "Cascade"
    )]
    Machine,
}

impl Related<super::machine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Machine.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}
