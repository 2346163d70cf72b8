use sea_orm_migration::prelude::*;

use bdaybot_entities::{notification_log, notification_setting, notification_template, system_setting, user};

use crate::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        manager.create_table(schema.create_table_from_entity(user::Entity).if_not_exists().to_owned()).await?;
        manager.create_table(schema.create_table_from_entity(notification_template::Entity).if_not_exists().to_owned()).await?;
        manager.create_table(schema.create_table_from_entity(notification_setting::Entity).if_not_exists().to_owned()).await?;
        manager.create_table(schema.create_table_from_entity(notification_log::Entity).if_not_exists().to_owned()).await?;
        manager.create_table(schema.create_table_from_entity(system_setting::Entity).if_not_exists().to_owned()).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(system_setting::Entity).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(notification_log::Entity).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(notification_setting::Entity).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(notification_template::Entity).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(user::Entity).if_exists().to_owned()).await?;

        Ok(())
    }
}
