use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_directory_tables::Migration),
            Box::new(m20240101_000002_create_machines_table::Migration),
            Box::new(m20240101_000003_create_readings_table::Migration),
            Box::new(m20240101_000004_create_submissions_table::Migration),
            Box::new(m20240101_000005_create_model_parts_table::Migration),
            Box::new(m20240101_000006_create_part_replacements_table::Migration),
        ]
    }
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    Name,
    ContactEmail,
    Branch,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MachineModels {
    Table,
    Id,
    Make,
    Name,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Machines {
    Table,
    Id,
    SerialNumber,
    CustomerId,
    ModelId,
    MonoEnabled,
    ColourEnabled,
    ScanEnabled,
    IsActive,
    IsDecommissioned,
    Branch,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Readings {
    Table,
    Id,
    MachineId,
    Year,
    Month,
    Mono,
    Colour,
    Scan,
    MonoUsage,
    ColourUsage,
    ScanUsage,
    Note,
    CapturedBy,
    Branch,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Submissions {
    Table,
    Id,
    Year,
    Month,
    Branch,
    SubmittedBy,
    SubmittedAt,
}

#[derive(DeriveIden)]
enum ModelParts {
    Table,
    Id,
    ModelId,
    Branch,
    Name,
    ItemCode,
    PartType,
    TonerColor,
    ExpectedYield,
    CostRand,
    MeterType,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PartReplacements {
    Table,
    Id,
    MachineId,
    ModelPartId,
    OrderDate,
    PriorReading,
    CurrentReading,
    Usage,
    RemainingTonerPercent,
    YieldMet,
    ShortfallClicks,
    AdjustedShortfallClicks,
    CostPerClick,
    DisplayChargeRand,
    ExpectedYieldSnapshot,
    CostRandSnapshot,
    CapturedBy,
    CreatedAt,
}

mod m20240101_000001_create_directory_tables {
    use super::{Customers, MachineModels};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_directory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Customers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .col(ColumnDef::new(Customers::ContactEmail).string().null())
                        .col(ColumnDef::new(Customers::Branch).string_len(8).not_null())
                        .col(
                            ColumnDef::new(Customers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MachineModels::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MachineModels::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MachineModels::Make).string().not_null())
                        .col(ColumnDef::new(MachineModels::Name).string().not_null())
                        .col(
                            ColumnDef::new(MachineModels::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MachineModels::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MachineModels::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000002_create_machines_table {
    use super::{Customers, MachineModels, Machines};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_machines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Machines::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Machines::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Machines::SerialNumber)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Machines::CustomerId).uuid().null())
                        .col(ColumnDef::new(Machines::ModelId).uuid().null())
                        .col(
                            ColumnDef::new(Machines::MonoEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Machines::ColourEnabled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Machines::ScanEnabled)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Machines::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Machines::IsDecommissioned)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Machines::Branch).string_len(8).not_null())
                        .col(
                            ColumnDef::new(Machines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Machines::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_machines_customer_id")
                                .from(Machines::Table, Machines::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_machines_model_id")
                                .from(Machines::Table, Machines::ModelId)
                                .to(MachineModels::Table, MachineModels::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_machines_branch")
                        .table(Machines::Table)
                        .col(Machines::Branch)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Machines::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000003_create_readings_table {
    use super::{Machines, Readings};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_readings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Readings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Readings::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Readings::MachineId).uuid().not_null())
                        .col(ColumnDef::new(Readings::Year).integer().not_null())
                        .col(ColumnDef::new(Readings::Month).integer().not_null())
                        .col(ColumnDef::new(Readings::Mono).big_integer().null())
                        .col(ColumnDef::new(Readings::Colour).big_integer().null())
                        .col(ColumnDef::new(Readings::Scan).big_integer().null())
                        .col(ColumnDef::new(Readings::MonoUsage).big_integer().null())
                        .col(ColumnDef::new(Readings::ColourUsage).big_integer().null())
                        .col(ColumnDef::new(Readings::ScanUsage).big_integer().null())
                        .col(ColumnDef::new(Readings::Note).text().null())
                        .col(ColumnDef::new(Readings::CapturedBy).uuid().not_null())
                        .col(ColumnDef::new(Readings::Branch).string_len(8).not_null())
                        .col(
                            ColumnDef::new(Readings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Readings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_readings_machine_id")
                                .from(Readings::Table, Readings::MachineId)
                                .to(Machines::Table, Machines::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_readings_machine_period")
                        .table(Readings::Table)
                        .col(Readings::MachineId)
                        .col(Readings::Year)
                        .col(Readings::Month)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_readings_period_branch")
                        .table(Readings::Table)
                        .col(Readings::Year)
                        .col(Readings::Month)
                        .col(Readings::Branch)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Readings::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000004_create_submissions_table {
    use super::Submissions;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_submissions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Submissions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Submissions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Submissions::Year).integer().not_null())
                        .col(ColumnDef::new(Submissions::Month).integer().not_null())
                        .col(ColumnDef::new(Submissions::Branch).string_len(8).not_null())
                        .col(ColumnDef::new(Submissions::SubmittedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Submissions::SubmittedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_submissions_period_branch")
                        .table(Submissions::Table)
                        .col(Submissions::Year)
                        .col(Submissions::Month)
                        .col(Submissions::Branch)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Submissions::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000005_create_model_parts_table {
    use super::{MachineModels, ModelParts};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_model_parts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ModelParts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ModelParts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(ModelParts::ModelId).uuid().not_null())
                        .col(ColumnDef::new(ModelParts::Branch).string_len(8).null())
                        .col(ColumnDef::new(ModelParts::Name).string_len(200).not_null())
                        .col(ColumnDef::new(ModelParts::ItemCode).string().null())
                        .col(ColumnDef::new(ModelParts::PartType).string_len(16).not_null())
                        .col(ColumnDef::new(ModelParts::TonerColor).string().null())
                        .col(ColumnDef::new(ModelParts::ExpectedYield).big_integer().not_null())
                        .col(
                            ColumnDef::new(ModelParts::CostRand)
                                .decimal_len(14, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ModelParts::MeterType).string_len(16).not_null())
                        .col(
                            ColumnDef::new(ModelParts::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ModelParts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ModelParts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_model_parts_model_id")
                                .from(ModelParts::Table, ModelParts::ModelId)
                                .to(MachineModels::Table, MachineModels::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_model_parts_model_id")
                        .table(ModelParts::Table)
                        .col(ModelParts::ModelId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ModelParts::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000006_create_part_replacements_table {
    use super::{Machines, ModelParts, PartReplacements};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_part_replacements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PartReplacements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PartReplacements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PartReplacements::MachineId).uuid().not_null())
                        .col(ColumnDef::new(PartReplacements::ModelPartId).uuid().not_null())
                        .col(ColumnDef::new(PartReplacements::OrderDate).date().not_null())
                        .col(
                            ColumnDef::new(PartReplacements::PriorReading)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PartReplacements::CurrentReading)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PartReplacements::Usage).big_integer().not_null())
                        .col(
                            ColumnDef::new(PartReplacements::RemainingTonerPercent)
                                .decimal_len(5, 2)
                                .null(),
                        )
                        .col(ColumnDef::new(PartReplacements::YieldMet).boolean().not_null())
                        .col(
                            ColumnDef::new(PartReplacements::ShortfallClicks)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PartReplacements::AdjustedShortfallClicks)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PartReplacements::CostPerClick)
                                .decimal_len(16, 8)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PartReplacements::DisplayChargeRand)
                                .decimal_len(16, 8)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PartReplacements::ExpectedYieldSnapshot)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PartReplacements::CostRandSnapshot)
                                .decimal_len(14, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PartReplacements::CapturedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(PartReplacements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_part_replacements_machine_id")
                                .from(PartReplacements::Table, PartReplacements::MachineId)
                                .to(Machines::Table, Machines::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_part_replacements_model_part_id")
                                .from(PartReplacements::Table, PartReplacements::ModelPartId)
                                .to(ModelParts::Table, ModelParts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_part_replacements_machine_part")
                        .table(PartReplacements::Table)
                        .col(PartReplacements::MachineId)
                        .col(PartReplacements::ModelPartId)
                        .col(PartReplacements::OrderDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PartReplacements::Table).to_owned())
                .await
        }
    }
}
