use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait};

use bdaybot_common::config::Config;
use bdaybot_entities::{notification_log, notification_setting, notification_template, system_setting, user};
use bdaybot_migrator::{Migrator, MigratorTrait};

use crate::services;

/// A migrated database and the services that operate on it.
#[derive(Debug, Clone)]
pub struct Store {
    db: DatabaseConnection,
    pub users: services::user::Service,
    pub templates: services::template::Service,
    pub notification_settings: services::notification_setting::Service,
    pub notification_logs: services::notification_log::Service,
    pub system_settings: services::system_setting::Service,
}

/// Row counts per table.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct StoreReport {
    pub users: u64,
    pub notification_templates: u64,
    pub notification_settings: u64,
    pub notification_logs: u64,
    pub system_settings: u64,
}

impl Store {
    pub async fn connect(config: &Config) -> Result<Self, DbErr> {
        let mut options = ConnectOptions::new(config.database_url.clone());
        options
            .max_connections(config.database_max_connections)
            .sqlx_logging(false);

        let db = Database::connect(options).await?;
        Self::from_connection(db).await
    }

    /// Applies pending migrations on `db` before handing it to the services.
    pub async fn from_connection(db: DatabaseConnection) -> Result<Self, DbErr> {
        Migrator::up(&db, None).await?;
        tracing::info!("Database migrations are up to date");

        Ok(Self {
            users: services::user::Service::new(db.clone()),
            templates: services::template::Service::new(db.clone()),
            notification_settings: services::notification_setting::Service::new(db.clone()),
            notification_logs: services::notification_log::Service::new(db.clone()),
            system_settings: services::system_setting::Service::new(db.clone()),
            db,
        })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    #[tracing::instrument(skip(self))]
    pub async fn report(&self) -> Result<StoreReport, DbErr> {
        Ok(StoreReport {
            users: user::Entity::find().count(&self.db).await?,
            notification_templates: notification_template::Entity::find().count(&self.db).await?,
            notification_settings: notification_setting::Entity::find().count(&self.db).await?,
            notification_logs: notification_log::Entity::find().count(&self.db).await?,
            system_settings: system_setting::Entity::find().count(&self.db).await?,
        })
    }

    pub async fn close(self) -> Result<(), DbErr> {
        self.db.close().await
    }
}
