use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_identity_tables::Migration),
            Box::new(m20240101_000002_create_catalogue_tables::Migration),
            Box::new(m20240101_000003_create_cart_tables::Migration),
            Box::new(m20240101_000004_create_order_tables::Migration),
            Box::new(m20240101_000005_create_subscription_tables::Migration),
        ]
    }
}

fn money(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .decimal_len(16, 4)
        .not_null()
        .default(0)
        .to_owned()
}

fn timestamp(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

mod m20240101_000001_create_identity_tables {
    use super::timestamp;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_identity_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::Email).string().null())
                        .col(ColumnDef::new(Users::Phone).string().null())
                        .col(ColumnDef::new(Users::Role).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(timestamp(Users::CreatedAt))
                        .col(timestamp(Users::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_users_role")
                        .table(Users::Table)
                        .col(Users::Role)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CustomerProfiles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CustomerProfiles::UserId)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(CustomerProfiles::Plan).string().null())
                        .col(super::money(CustomerProfiles::WalletBalance))
                        .col(timestamp(CustomerProfiles::CreatedAt))
                        .col(timestamp(CustomerProfiles::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CustomerAddresses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CustomerAddresses::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(CustomerAddresses::UserId).uuid().not_null())
                        .col(ColumnDef::new(CustomerAddresses::Label).string().null())
                        .col(ColumnDef::new(CustomerAddresses::Line1).string().not_null())
                        .col(ColumnDef::new(CustomerAddresses::City).string().null())
                        .col(ColumnDef::new(CustomerAddresses::PostalCode).string().null())
                        .col(ColumnDef::new(CustomerAddresses::Latitude).double().null())
                        .col(ColumnDef::new(CustomerAddresses::Longitude).double().null())
                        .col(timestamp(CustomerAddresses::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_customer_addresses_user")
                        .table(CustomerAddresses::Table)
                        .col(CustomerAddresses::UserId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DeliveryPartners::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryPartners::UserId)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(DeliveryPartners::IsAvailable)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(DeliveryPartners::Latitude).double().null())
                        .col(ColumnDef::new(DeliveryPartners::Longitude).double().null())
                        .col(ColumnDef::new(DeliveryPartners::Vehicle).string().null())
                        .col(
                            ColumnDef::new(DeliveryPartners::TotalDeliveries)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DeliveryPartners::LocationUpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(timestamp(DeliveryPartners::CreatedAt))
                        .col(timestamp(DeliveryPartners::UpdatedAt))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DeliveryPartners::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CustomerAddresses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CustomerProfiles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Name,
        Email,
        Phone,
        Role,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CustomerProfiles {
        Table,
        UserId,
        Plan,
        WalletBalance,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CustomerAddresses {
        Table,
        Id,
        UserId,
        Label,
        Line1,
        City,
        PostalCode,
        Latitude,
        Longitude,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum DeliveryPartners {
        Table,
        UserId,
        IsAvailable,
        Latitude,
        Longitude,
        Vehicle,
        TotalDeliveries,
        LocationUpdatedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_catalogue_tables {
    use super::{money, timestamp};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_catalogue_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Stores::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Stores::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Stores::VendorId).uuid().not_null())
                        .col(ColumnDef::new(Stores::Name).string().not_null())
                        .col(
                            ColumnDef::new(Stores::Code)
                                .string_len(16)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Stores::IsApproved)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Stores::IsOpen)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Stores::Latitude).double().null())
                        .col(ColumnDef::new(Stores::Longitude).double().null())
                        .col(ColumnDef::new(Stores::DeliveryRadiusKm).double().null())
                        .col(
                            ColumnDef::new(Stores::CommissionPercent)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(ColumnDef::new(Stores::SubscriptionPlan).string().null())
                        .col(ColumnDef::new(Stores::SubscriptionId).uuid().null())
                        .col(timestamp(Stores::CreatedAt))
                        .col(timestamp(Stores::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stores_vendor")
                        .table(Stores::Table)
                        .col(Stores::VendorId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Products::StoreId).uuid().not_null())
                        .col(ColumnDef::new(Products::VendorId).uuid().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::ImageUrl).string().null())
                        .col(money(Products::Price))
                        .col(
                            ColumnDef::new(Products::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::Status).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::DeletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(timestamp(Products::CreatedAt))
                        .col(timestamp(Products::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_store")
                                .from(Products::Table, Products::StoreId)
                                .to(Stores::Table, Stores::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_products_store")
                        .table(Products::Table)
                        .col(Products::StoreId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Stores::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Stores {
        Table,
        Id,
        VendorId,
        Name,
        Code,
        IsApproved,
        IsOpen,
        Latitude,
        Longitude,
        DeliveryRadiusKm,
        CommissionPercent,
        SubscriptionPlan,
        SubscriptionId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        StoreId,
        VendorId,
        Name,
        ImageUrl,
        Price,
        Quantity,
        Status,
        IsActive,
        DeletedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_cart_tables {
    use super::timestamp;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_cart_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Carts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Carts::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Carts::UserId).uuid().not_null().unique_key())
                        .col(ColumnDef::new(Carts::Status).string_len(20).not_null())
                        .col(timestamp(Carts::CreatedAt))
                        .col(timestamp(Carts::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(CartItems::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(CartItems::CartId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::StoreId).uuid().not_null())
                        .col(ColumnDef::new(CartItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(CartItems::Name).string().not_null())
                        .col(ColumnDef::new(CartItems::ImageUrl).string().null())
                        .col(ColumnDef::new(CartItems::Position).integer().not_null())
                        .col(timestamp(CartItems::CreatedAt))
                        .col(timestamp(CartItems::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_cart")
                                .from(CartItems::Table, CartItems::CartId)
                                .to(Carts::Table, Carts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_cart_items_cart_product")
                        .table(CartItems::Table)
                        .col(CartItems::CartId)
                        .col(CartItems::ProductId)
                        .unique()
                        .if_not_exists()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Carts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Carts {
        Table,
        Id,
        UserId,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CartItems {
        Table,
        Id,
        CartId,
        ProductId,
        StoreId,
        Quantity,
        Name,
        ImageUrl,
        Position,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_order_tables {
    use super::{money, timestamp};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Orders::PaymentStatus)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(money(Orders::Subtotal))
                        .col(money(Orders::Tax))
                        .col(money(Orders::DeliveryCharge))
                        .col(money(Orders::DeliveryFeeTotal))
                        .col(money(Orders::CommissionTotal))
                        .col(money(Orders::VendorTotal))
                        .col(money(Orders::PlatformTotal))
                        .col(money(Orders::CashbackAmount))
                        .col(money(Orders::TotalAmount))
                        .col(money(Orders::PartnerBaseFee))
                        .col(money(Orders::PartnerIncentive))
                        .col(money(Orders::PartnerTip))
                        .col(money(Orders::PartnerTotal))
                        .col(ColumnDef::new(Orders::DistanceKm).double().null())
                        .col(ColumnDef::new(Orders::StoreBreakdown).json().not_null())
                        .col(ColumnDef::new(Orders::DeliveryAddress).json().null())
                        .col(ColumnDef::new(Orders::DeliveryPartnerId).uuid().null())
                        .col(
                            ColumnDef::new(Orders::DeliveredAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(timestamp(Orders::CreatedAt))
                        .col(timestamp(Orders::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_customer")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_partner")
                        .table(Orders::Table)
                        .col(Orders::DeliveryPartnerId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderItems::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::StoreId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Name).string().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(money(OrderItems::UnitPrice))
                        .col(money(OrderItems::LineTotal))
                        .col(timestamp(OrderItems::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_order_items_store")
                        .table(OrderItems::Table)
                        .col(OrderItems::StoreId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderHistory::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderHistory::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderHistory::StoreId).uuid().null())
                        .col(ColumnDef::new(OrderHistory::Status).string_len(32).not_null())
                        .col(ColumnDef::new(OrderHistory::Note).string().null())
                        .col(ColumnDef::new(OrderHistory::ChangedBy).uuid().null())
                        .col(
                            ColumnDef::new(OrderHistory::ActorRole)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(timestamp(OrderHistory::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_order_history_order")
                        .table(OrderHistory::Table)
                        .col(OrderHistory::OrderId)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DeliveryHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryHistory::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DeliveryHistory::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(DeliveryHistory::DeliveryPartnerId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryHistory::Status)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryHistory::Note).string().null())
                        .col(timestamp(DeliveryHistory::CreatedAt))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DeliveryHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderHistory::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        CustomerId,
        Status,
        PaymentStatus,
        Subtotal,
        Tax,
        DeliveryCharge,
        DeliveryFeeTotal,
        CommissionTotal,
        VendorTotal,
        PlatformTotal,
        CashbackAmount,
        TotalAmount,
        PartnerBaseFee,
        PartnerIncentive,
        PartnerTip,
        PartnerTotal,
        DistanceKm,
        StoreBreakdown,
        DeliveryAddress,
        DeliveryPartnerId,
        DeliveredAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        StoreId,
        Name,
        Quantity,
        UnitPrice,
        LineTotal,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderHistory {
        Table,
        Id,
        OrderId,
        StoreId,
        Status,
        Note,
        ChangedBy,
        ActorRole,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum DeliveryHistory {
        Table,
        Id,
        OrderId,
        DeliveryPartnerId,
        Status,
        Note,
        CreatedAt,
    }
}

mod m20240101_000005_create_subscription_tables {
    use super::{money, timestamp};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_subscription_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(VendorSubscriptions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(VendorSubscriptions::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(VendorSubscriptions::VendorId).uuid().not_null())
                        .col(ColumnDef::new(VendorSubscriptions::StoreId).uuid().not_null())
                        .col(
                            ColumnDef::new(VendorSubscriptions::PlanName)
                                .string()
                                .not_null(),
                        )
                        .col(money(VendorSubscriptions::CommissionPercent))
                        .col(money(VendorSubscriptions::MonthlyFee))
                        .col(timestamp(VendorSubscriptions::StartDate))
                        .col(timestamp(VendorSubscriptions::EndDate))
                        .col(
                            ColumnDef::new(VendorSubscriptions::Status)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(VendorSubscriptions::AutoRenew)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(VendorSubscriptions::IsFreeTrial)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(timestamp(VendorSubscriptions::CreatedAt))
                        .col(timestamp(VendorSubscriptions::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_vendor_subscriptions_store")
                        .table(VendorSubscriptions::Table)
                        .col(VendorSubscriptions::StoreId)
                        .col(VendorSubscriptions::Status)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Counters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Counters::Key)
                                .string_len(64)
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Counters::Seq)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(timestamp(Counters::UpdatedAt))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Counters::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(VendorSubscriptions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum VendorSubscriptions {
        Table,
        Id,
        VendorId,
        StoreId,
        PlanName,
        CommissionPercent,
        MonthlyFee,
        StartDate,
        EndDate,
        Status,
        AutoRenew,
        IsFreeTrial,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Counters {
        Table,
        Key,
        Seq,
        UpdatedAt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectOptions, Database};

    #[tokio::test]
    async fn schema_applies_on_sqlite() {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1);
        let db = Database::connect(opt).await.unwrap();

        Migrator::up(&db, None).await.unwrap();

        let applied = Migrator::get_applied_migrations(&db).await.unwrap();
        assert_eq!(applied.len(), Migrator::migrations().len());
        assert!(Migrator::get_pending_migrations(&db).await.unwrap().is_empty());
    }
}
