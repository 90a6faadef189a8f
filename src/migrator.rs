use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_part_types_table::Migration),
            Box::new(m20240301_000002_create_device_types_table::Migration),
            Box::new(m20240301_000003_create_locations_table::Migration),
            Box::new(m20240301_000004_create_devices_table::Migration),
            Box::new(m20240301_000005_create_replacement_suggestions_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_part_types_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_part_types_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PartTypes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PartTypes::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PartTypes::Name).string_len(100).not_null())
                        .col(ColumnDef::new(PartTypes::Description).text().null())
                        .col(
                            ColumnDef::new(PartTypes::ExpectedFailureIntervalDays)
                                .integer()
                                .null(),
                        )
                        .col(ColumnDef::new(PartTypes::CreatedBy).big_integer().not_null())
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PartTypes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum PartTypes {
        Table,
        Id,
        Name,
        Description,
        ExpectedFailureIntervalDays,
        CreatedBy,
    }
}

mod m20240301_000002_create_device_types_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_device_types_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DeviceTypes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeviceTypes::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DeviceTypes::Manufacturer).string_len(100).null())
                        .col(ColumnDef::new(DeviceTypes::Model).string_len(100).null())
                        .col(
                            ColumnDef::new(DeviceTypes::ExpectedLifetimeMonths)
                                .integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(DeviceTypes::PartTypeId)
                                .big_integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_device_types_part_type_id")
                                .from(DeviceTypes::Table, DeviceTypes::PartTypeId)
                                .to(PartTypes::Table, PartTypes::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DeviceTypes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DeviceTypes {
        Table,
        Id,
        Manufacturer,
        Model,
        ExpectedLifetimeMonths,
        PartTypeId,
    }

    #[derive(DeriveIden)]
    enum PartTypes {
        Table,
        Id,
    }
}

mod m20240301_000003_create_locations_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_locations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Locations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Locations::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Locations::Name).string_len(100).not_null())
                        .col(ColumnDef::new(Locations::ParentId).big_integer().null())
                        .col(ColumnDef::new(Locations::Description).text().null())
                        .col(ColumnDef::new(Locations::CreatedBy).big_integer().not_null())
                        // Acyclicity of parent links is not enforced here.
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_locations_parent_id")
                                .from(Locations::Table, Locations::ParentId)
                                .to(Locations::Table, Locations::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_locations_parent_id")
                        .table(Locations::Table)
                        .col(Locations::ParentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Locations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Locations {
        Table,
        Id,
        Name,
        ParentId,
        Description,
        CreatedBy,
    }
}

mod m20240301_000004_create_devices_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_devices_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Devices::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Devices::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Devices::SerialNumber)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Devices::TypeId).big_integer().not_null())
                        .col(ColumnDef::new(Devices::PurchaseDate).date().null())
                        .col(ColumnDef::new(Devices::WarrantyEnd).date().null())
                        .col(ColumnDef::new(Devices::CurrentLocationId).big_integer().null())
                        .col(ColumnDef::new(Devices::Status).string_len(20).not_null())
                        .col(ColumnDef::new(Devices::CreatedBy).big_integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_devices_type_id")
                                .from(Devices::Table, Devices::TypeId)
                                .to(DeviceTypes::Table, DeviceTypes::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_devices_current_location_id")
                                .from(Devices::Table, Devices::CurrentLocationId)
                                .to(Locations::Table, Locations::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_devices_warranty_end")
                        .table(Devices::Table)
                        .col(Devices::WarrantyEnd)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_devices_current_location_id")
                        .table(Devices::Table)
                        .col(Devices::CurrentLocationId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Devices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Devices {
        Table,
        Id,
        SerialNumber,
        TypeId,
        PurchaseDate,
        WarrantyEnd,
        CurrentLocationId,
        Status,
        CreatedBy,
    }

    #[derive(DeriveIden)]
    enum DeviceTypes {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Locations {
        Table,
        Id,
    }
}

mod m20240301_000005_create_replacement_suggestions_table {
    use super::m20240301_000001_create_part_types_table::PartTypes;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_replacement_suggestions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ReplacementSuggestions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ReplacementSuggestions::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ReplacementSuggestions::PartTypeId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReplacementSuggestions::SuggestionDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReplacementSuggestions::ForecastReplacementDate)
                                .date()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReplacementSuggestions::GeneratedBy)
                                .string_len(50)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ReplacementSuggestions::Status)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ReplacementSuggestions::Comments).text().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_replacement_suggestions_part_type_id")
                                .from(
                                    ReplacementSuggestions::Table,
                                    ReplacementSuggestions::PartTypeId,
                                )
                                .to(PartTypes::Table, PartTypes::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Backs the (part_type_id, suggestion_date) existence check of the daily job
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_replacement_suggestions_part_type_date")
                        .table(ReplacementSuggestions::Table)
                        .col(ReplacementSuggestions::PartTypeId)
                        .col(ReplacementSuggestions::SuggestionDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(
                    Table::drop()
                        .table(ReplacementSuggestions::Table)
                        .to_owned(),
                )
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ReplacementSuggestions {
        Table,
        Id,
        PartTypeId,
        SuggestionDate,
        ForecastReplacementDate,
        GeneratedBy,
        Status,
        Comments,
    }
}
