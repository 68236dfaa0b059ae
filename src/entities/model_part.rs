use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{BillingMeter, Branch, PartType};

/// A consumable defined for a machine model, optionally restricted to one branch.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate, ToSchema)]
#[sea_orm(table_name = "model_parts")]
#[schema(as = ModelPart)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub model_id: Uuid,
    pub branch: Option<Branch>,

    #[validate(length(min = 1, max = 200))]
    pub name: String,

    pub item_code: Option<String>,
    pub part_type: PartType,
    pub toner_color: Option<String>,

    #[validate(range(min = 1))]
    pub expected_yield: i64,

    pub cost_rand: Decimal,
    pub meter_type: BillingMeter,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::machine_model::Entity",
        from = "Column::ModelId",
        to = "super::machine_model::Column::Id"
    )]
    MachineModel,
    #[sea_orm(has_many = "super::part_replacement::Entity")]
    Replacements,
}

impl Related<super::machine_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MachineModel.def()
    }
}

impl Related<super::part_replacement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Replacements.def()
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
