use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MessageOutcomes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MessageOutcomes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(MessageOutcomes::MessageId).string().not_null())
                    .col(
                        ColumnDef::new(MessageOutcomes::RecipientPhone)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MessageOutcomes::RecipientLabel)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MessageOutcomes::RecipientContactId)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(MessageOutcomes::Body).text().not_null())
                    .col(ColumnDef::new(MessageOutcomes::MediaUrls).json().not_null())
                    .col(ColumnDef::new(MessageOutcomes::OwnerId).string().null())
                    .col(ColumnDef::new(MessageOutcomes::OwnerKind).string().null())
                    .col(ColumnDef::new(MessageOutcomes::Status).string().not_null())
                    .col(ColumnDef::new(MessageOutcomes::ErrorMessage).text().null())
                    .col(ColumnDef::new(MessageOutcomes::ProviderSid).string().null())
                    .col(
                        ColumnDef::new(MessageOutcomes::ProviderResponse)
                            .json()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MessageOutcomes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(MessageOutcomes::DeliveredAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_outcomes_message_id")
                            .from(MessageOutcomes::Table, MessageOutcomes::MessageId)
                            .to(Batches::Table, Batches::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per recipient per batch; repeated flushes conflict here
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("idx_message_outcomes_message_recipient")
                    .table(MessageOutcomes::Table)
                    .col(MessageOutcomes::MessageId)
                    .col(MessageOutcomes::RecipientPhone)
                    .to_owned(),
            )
            .await?;

        // Delivery receipts look rows up by provider sid
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_message_outcomes_provider_sid")
                    .table(MessageOutcomes::Table)
                    .col(MessageOutcomes::ProviderSid)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MessageOutcomes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MessageOutcomes {
    Table,
    Id,
    MessageId,
    RecipientPhone,
    RecipientLabel,
    RecipientContactId,
    Body,
    MediaUrls,
    OwnerId,
    OwnerKind,
    Status,
    ErrorMessage,
    ProviderSid,
    ProviderResponse,
    CreatedAt,
    DeliveredAt,
}

#[derive(DeriveIden)]
enum Batches {
    Table,
    Id,
}
