use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DbBackend, EntityName};

use bdaybot_entities::{notification_log, notification_setting, user};

const UPDATED_AT: &str = "updated_at";

/// Tables created before `updated_at` was part of their definition.
fn tables() -> Vec<String> {
    vec![
        user::Entity.table_name().to_owned(),
        notification_log::Entity.table_name().to_owned(),
        notification_setting::Entity.table_name().to_owned(),
    ]
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sqlite = manager.get_database_backend() == DbBackend::Sqlite;

        // `foreign_keys` is per connection. Migrations run sequentially at
        // startup, so every statement here is served by the same pooled
        // connection and the pragma is restored on the one that turned it off.
        if sqlite {
            manager.get_connection().execute_unprepared("PRAGMA foreign_keys = OFF").await?;
        }

        let mut result = Ok(());
        for table in tables() {
            result = add_updated_at(manager, &table).await;
            if result.is_err() {
                break;
            }
        }

        if sqlite {
            manager.get_connection().execute_unprepared("PRAGMA foreign_keys = ON").await?;
        }

        result
    }

    async fn down(&self, _manager: &SchemaManager) -> Result<(), DbErr> {
        // The column is part of the current table definitions; there is nothing to revert to.
        Ok(())
    }
}

async fn add_updated_at(manager: &SchemaManager<'_>, table: &str) -> Result<(), DbErr> {
    if manager.has_column(table, UPDATED_AT).await? {
        return Ok(());
    }

    log::info!("Adding `{}` to `{}`", UPDATED_AT, table);

    let mut column = ColumnDef::new(Alias::new(UPDATED_AT));
    column.date_time();

    match manager.get_database_backend() {
        // SQLite rejects non-constant defaults in `ADD COLUMN`, so the column is
        // added nullable and existing rows are stamped afterwards.
        DbBackend::Sqlite => {
            column.null();
        }
        _ => {
            column.not_null().default(Expr::current_timestamp());
        }
    }

    manager
        .alter_table(Table::alter().table(Alias::new(table)).add_column(&mut column).to_owned())
        .await?;

    manager
        .exec_stmt(
            Query::update()
                .table(Alias::new(table))
                .value(Alias::new(UPDATED_AT), Expr::current_timestamp())
                .and_where(Expr::col(Alias::new(UPDATED_AT)).is_null())
                .to_owned(),
        )
        .await?;

    Ok(())
}
