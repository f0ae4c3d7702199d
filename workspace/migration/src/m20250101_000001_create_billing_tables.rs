use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .col(string(Users::FirstName).default(""))
                    .col(string(Users::LastName).default(""))
                    .col(string_null(Users::Email))
                    .to_owned(),
            )
            .await?;

        // Create user_profiles table (one-to-one with users)
        manager
            .create_table(
                Table::create()
                    .table(UserProfiles::Table)
                    .if_not_exists()
                    .col(pk_auto(UserProfiles::Id))
                    .col(integer(UserProfiles::UserId).unique_key())
                    .col(string_len(UserProfiles::BillingAddress, 1024))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_profile_user")
                            .from(UserProfiles::Table, UserProfiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create services table
        manager
            .create_table(
                Table::create()
                    .table(Services::Table)
                    .if_not_exists()
                    .col(pk_auto(Services::Id))
                    .col(string_len(Services::Reference, 5))
                    .col(string_len(Services::Name, 128))
                    .col(string_len(Services::Description, 1024))
                    .col(decimal(Services::Price).decimal_len(16, 4))
                    .to_owned(),
            )
            .await?;

        // Create bills table
        manager
            .create_table(
                Table::create()
                    .table(Bills::Table)
                    .if_not_exists()
                    .col(pk_auto(Bills::Id))
                    .col(integer(Bills::UserId))
                    .col(string_len(Bills::Number, 16).unique_key())
                    .col(boolean(Bills::IsPaid).default(false))
                    .col(date(Bills::BillingDate))
                    .col(decimal(Bills::Amount).decimal_len(16, 4).default(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bill_user")
                            .from(Bills::Table, Bills::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create bill_lines table
        manager
            .create_table(
                Table::create()
                    .table(BillLines::Table)
                    .if_not_exists()
                    .col(pk_auto(BillLines::Id))
                    .col(integer(BillLines::BillId))
                    .col(integer(BillLines::ServiceId))
                    .col(small_integer(BillLines::Quantity).default(1))
                    .col(decimal(BillLines::Total).decimal_len(16, 4))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bill_line_bill")
                            .from(BillLines::Table, BillLines::BillId)
                            .to(Bills::Table, Bills::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bill_line_service")
                            .from(BillLines::Table, BillLines::ServiceId)
                            .to(Services::Table, Services::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bill_lines_bill_id")
                    .table(BillLines::Table)
                    .col(BillLines::BillId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(BillLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bills::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Services::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserProfiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    FirstName,
    LastName,
    Email,
}

#[derive(DeriveIden)]
enum UserProfiles {
    Table,
    Id,
    UserId,
    BillingAddress,
}

#[derive(DeriveIden)]
enum Services {
    Table,
    Id,
    Reference,
    Name,
    Description,
    Price,
}

#[derive(DeriveIden)]
enum Bills {
    Table,
    Id,
    UserId,
    Number,
    IsPaid,
    BillingDate,
    Amount,
}

#[derive(DeriveIden)]
enum BillLines {
    Table,
    Id,
    BillId,
    ServiceId,
    Quantity,
    Total,
}
