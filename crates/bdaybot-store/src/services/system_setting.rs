use sea_orm::prelude::*;
use sea_orm::{ActiveValue, IntoActiveModel, QueryOrder};

use bdaybot_entities::system_setting;

#[derive(Clone, Debug)]
pub struct Service {
    db: DatabaseConnection,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),
}

/// Where members send their contributions.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PaymentDetails {
    pub phone: Option<String>,
    pub name: Option<String>,
}

impl Service {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Option<system_setting::Model>, Error> {
        Ok(system_setting::Entity::find_by_id(key).one(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn value(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.get(key).await?.and_then(|setting| setting.value))
    }

    /// Creates or overwrites `key`. A `None` description keeps the stored one.
    #[tracing::instrument(skip(self))]
    pub async fn set(&self, key: &str, value: Option<String>, description: Option<String>) -> Result<system_setting::Model, Error> {
        if let Some(existing) = self.get(key).await? {
            let mut setting = existing.into_active_model();
            setting.value = ActiveValue::Set(value);
            if description.is_some() {
                setting.description = ActiveValue::Set(description);
            }

            return Ok(setting.update(&self.db).await?);
        }

        let setting = system_setting::ActiveModel {
            key: ActiveValue::Set(key.to_string()),
            value: ActiveValue::Set(value),
            description: ActiveValue::Set(description),
        }
            .insert(&self.db)
            .await?;

        log::info!("System setting added: {}", setting.key);

        Ok(setting)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<system_setting::Model>, Error> {
        let settings = system_setting::Entity::find()
            .order_by_asc(system_setting::Column::Key)
            .all(&self.db)
            .await?;

        Ok(settings)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<bool, Error> {
        let result = system_setting::Entity::delete_by_id(key).exec(&self.db).await?;

        Ok(result.rows_affected > 0)
    }

    #[tracing::instrument(skip(self))]
    pub async fn payment_details(&self) -> Result<PaymentDetails, Error> {
        Ok(PaymentDetails {
            phone: self.value(system_setting::PAYMENT_PHONE).await?,
            name: self.value(system_setting::PAYMENT_NAME).await?,
        })
    }
}
