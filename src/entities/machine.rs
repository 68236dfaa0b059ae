use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Branch, MeterKind};

/// A copier/printer in the fleet.
///
/// A meter value may only ever be recorded against a machine whose matching
/// capability flag is set.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate, ToSchema)]
#[sea_orm(table_name = "machines")]
#[schema(as = Machine)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "Serial number must be between 1 and 100 characters"
    ))]
    pub serial_number: String,

    pub customer_id: Option<Uuid>,
    pub model_id: Option<Uuid>,
    pub mono_enabled: bool,
    pub colour_enabled: bool,
    pub scan_enabled: bool,
    pub is_active: bool,
    pub is_decommissioned: bool,
    pub branch: Branch,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn meter_enabled(&self, kind: MeterKind) -> bool {
        match kind {
            MeterKind::Mono => self.mono_enabled,
            MeterKind::Colour => self.colour_enabled,
            MeterKind::Scan => self.scan_enabled,
        }
    }

    /// Active and not decommissioned.
    pub fn is_in_service(&self) -> bool {
        self.is_active && !self.is_decommissioned
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::machine_model::Entity",
        from = "Column::ModelId",
        to = "super::machine_model::Column::Id"
    )]
    MachineModel,
    #[sea_orm(has_many = "super::reading::Entity")]
    Readings,
    #[sea_orm(has_many = "super::part_replacement::Entity")]
    PartReplacements,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::machine_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MachineModel.def()
    }
}

impl Related<super::reading::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Readings.def()
    }
}

impl Related<super::part_replacement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PartReplacements.def()
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
