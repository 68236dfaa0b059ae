use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A consumable order/replacement event.
///
/// `expected_yield_snapshot` and `cost_rand_snapshot` freeze the part definition
/// at capture time so later edits to the part never change historical charges.
/// Rows are never updated, only created or deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "part_replacements")]
#[schema(as = PartReplacement)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub machine_id: Uuid,
    pub model_part_id: Uuid,
    pub order_date: NaiveDate,
    pub prior_reading: i64,
    pub current_reading: i64,
    pub usage: i64,
    pub remaining_toner_percent: Option<Decimal>,
    pub yield_met: bool,
    pub shortfall_clicks: i64,
    pub adjusted_shortfall_clicks: i64,
    pub cost_per_click: Decimal,
    pub display_charge_rand: Decimal,
    pub expected_yield_snapshot: i64,
    pub cost_rand_snapshot: Decimal,
    pub captured_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::machine::Entity",
        from = "Column::MachineId",
        to = "super::machine::Column::Id"
    )]
    Machine,
    #[sea_orm(
        belongs_to = "super::model_part::Entity",
        from = "Column::ModelPartId",
        to = "super::model_part::Column::Id"
    )]
    ModelPart,
}

impl Related<super::machine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Machine.def()
    }
}

impl Related<super::model_part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ModelPart.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
