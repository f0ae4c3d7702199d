use sea_orm_migration::{prelude::*, schema::*, sea_orm::ConnectionTrait};

/// Id of the only row in `bill_sequences`.
const BILL_SEQUENCE_ID: i32 = 1;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BillSequences::Table)
                    .if_not_exists()
                    .col(integer(BillSequences::Id).primary_key())
                    .col(big_integer(BillSequences::LastValue).default(0))
                    .to_owned(),
            )
            .await?;

        // Seed the counter so the first bill gets sequence 1
        let seed = Query::insert()
            .into_table(BillSequences::Table)
            .columns([BillSequences::Id, BillSequences::LastValue])
            .values_panic([BILL_SEQUENCE_ID.into(), 0i64.into()])
            .to_owned();

        let db = manager.get_connection();
        db.execute(db.get_database_backend().build(&seed)).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BillSequences::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BillSequences {
    Table,
    Id,
    LastValue,
}
