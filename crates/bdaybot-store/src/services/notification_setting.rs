use std::sync::Arc;

use sea_orm::prelude::*;
use sea_orm::{ActiveValue, IntoActiveModel, QueryOrder, QuerySelect, SqlErr};
use tokio::sync::Mutex;

use bdaybot_common::chrono_utils;
use bdaybot_entities::{notification_setting, notification_template};

#[derive(Clone, Debug)]
pub struct Service {
    db: DatabaseConnection,
    /// Serializes upserts so the lookup and the insert see the same rows.
    upsert_lock: Arc<Mutex<()>>,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),
    #[error("Notification setting {0} not found")]
    NotFound(i32),
    #[error("Template {0} does not exist")]
    UnknownTemplate(i32),
    #[error("Invalid time of day `{0}`, expected HH:MM")]
    InvalidTime(String),
    #[error("Days before must not be negative, got {0}")]
    NegativeDaysBefore(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSetting {
    pub template_id: i32,
    pub days_before: i32,
    pub time: String,
    pub is_active: bool,
}

impl NewSetting {
    pub fn new(template_id: i32, days_before: i32, time: impl Into<String>) -> Self {
        Self {
            template_id,
            days_before,
            time: time.into(),
            is_active: true,
        }
    }
}

pub type SettingWithTemplate = (notification_setting::Model, notification_template::Model);

/// Checks the offset and returns the time normalized to `HH:MM`.
fn validate(setting: &NewSetting) -> Result<String, Error> {
    if setting.days_before < 0 {
        return Err(Error::NegativeDaysBefore(setting.days_before));
    }

    let time = chrono_utils::parse_time_of_day(&setting.time)
        .ok_or_else(|| Error::InvalidTime(setting.time.clone()))?;

    Ok(time.format(chrono_utils::TIME_OF_DAY_FORMAT).to_string())
}

fn map_insert_error(err: DbErr, template_id: i32) -> Error {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => Error::UnknownTemplate(template_id),
        _ => Error::DatabaseError(err),
    }
}

impl Service {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            upsert_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Inserts the setting. When one with the same template, offset and time
    /// already exists only its active flag is updated.
    #[tracing::instrument(skip(self))]
    pub async fn upsert_setting(&self, new_setting: NewSetting) -> Result<notification_setting::Model, Error> {
        let time = validate(&new_setting)?;

        let _guard = self.upsert_lock.lock().await;
        let existing = notification_setting::Entity::find()
            .filter(notification_setting::Column::TemplateId.eq(new_setting.template_id))
            .filter(notification_setting::Column::DaysBefore.eq(new_setting.days_before))
            .filter(notification_setting::Column::Time.eq(time.as_str()))
            .one(&self.db)
            .await?;

        if let Some(existing) = existing {
            let mut setting = existing.into_active_model();
            setting.is_active = ActiveValue::Set(new_setting.is_active);
            let setting = setting.update(&self.db).await?;

            log::info!("Notification setting {} updated", setting.id);
            return Ok(setting);
        }

        let setting = notification_setting::ActiveModel {
            template_id: ActiveValue::Set(new_setting.template_id),
            days_before: ActiveValue::Set(new_setting.days_before),
            time: ActiveValue::Set(time),
            is_active: ActiveValue::Set(new_setting.is_active),
            ..Default::default()
        }
            .insert(&self.db)
            .await
            .map_err(|err| map_insert_error(err, new_setting.template_id))?;

        log::info!(
            "Notification setting added: template_id={}, days_before={}, time={}",
            setting.template_id,
            setting.days_before,
            setting.time
        );

        Ok(setting)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find(&self, id: i32) -> Result<Option<notification_setting::Model>, Error> {
        Ok(notification_setting::Entity::find_by_id(id).one(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_settings(&self, active_only: bool) -> Result<Vec<notification_setting::Model>, Error> {
        let mut query = notification_setting::Entity::find();
        if active_only {
            query = query.filter(notification_setting::Column::IsActive.eq(true));
        }

        let settings = query
            .order_by_asc(notification_setting::Column::DaysBefore)
            .order_by_asc(notification_setting::Column::Time)
            .all(&self.db)
            .await?;

        Ok(settings)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_for_template(&self, template_id: i32, active_only: bool) -> Result<Vec<notification_setting::Model>, Error> {
        let mut query = notification_setting::Entity::find()
            .filter(notification_setting::Column::TemplateId.eq(template_id));
        if active_only {
            query = query.filter(notification_setting::Column::IsActive.eq(true));
        }

        let settings = query
            .order_by_asc(notification_setting::Column::DaysBefore)
            .order_by_asc(notification_setting::Column::Time)
            .all(&self.db)
            .await?;

        Ok(settings)
    }

    /// Settings paired with their templates. With `active_only` both sides must be active.
    #[tracing::instrument(skip(self))]
    pub async fn list_with_templates(&self, active_only: bool) -> Result<Vec<SettingWithTemplate>, Error> {
        let mut query = notification_setting::Entity::find()
            .find_also_related(notification_template::Entity);
        if active_only {
            query = query
                .filter(notification_setting::Column::IsActive.eq(true))
                .filter(notification_template::Column::IsActive.eq(true));
        }

        let rows = query
            .order_by_asc(notification_setting::Column::DaysBefore)
            .order_by_asc(notification_setting::Column::Time)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(setting, template)| template.map(|template| (setting, template)))
            .collect())
    }

    /// Active settings, with active templates, that fire at `time`.
    #[tracing::instrument(skip(self))]
    pub async fn due_at(&self, time: &str) -> Result<Vec<SettingWithTemplate>, Error> {
        let time = chrono_utils::parse_time_of_day(time)
            .ok_or_else(|| Error::InvalidTime(time.to_string()))?
            .format(chrono_utils::TIME_OF_DAY_FORMAT)
            .to_string();

        let rows = notification_setting::Entity::find()
            .find_also_related(notification_template::Entity)
            .filter(notification_setting::Column::Time.eq(time))
            .filter(notification_setting::Column::IsActive.eq(true))
            .filter(notification_template::Column::IsActive.eq(true))
            .order_by_asc(notification_setting::Column::DaysBefore)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(setting, template)| template.map(|template| (setting, template)))
            .collect())
    }

    /// Largest offset across all settings, `None` when there are none.
    #[tracing::instrument(skip(self))]
    pub async fn max_days_before(&self) -> Result<Option<i32>, Error> {
        let max = notification_setting::Entity::find()
            .select_only()
            .column_as(notification_setting::Column::DaysBefore.max(), "max_days_before")
            .into_tuple::<Option<i32>>()
            .one(&self.db)
            .await?;

        Ok(max.flatten())
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_setting(&self, id: i32, update: NewSetting) -> Result<notification_setting::Model, Error> {
        let time = validate(&update)?;

        let mut setting = self.get(id).await?.into_active_model();
        setting.template_id = ActiveValue::Set(update.template_id);
        setting.days_before = ActiveValue::Set(update.days_before);
        setting.time = ActiveValue::Set(time);
        setting.is_active = ActiveValue::Set(update.is_active);

        setting
            .update(&self.db)
            .await
            .map_err(|err| map_insert_error(err, update.template_id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_active(&self, id: i32, is_active: bool) -> Result<notification_setting::Model, Error> {
        let mut setting = self.get(id).await?.into_active_model();
        setting.is_active = ActiveValue::Set(is_active);

        Ok(setting.update(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_setting(&self, id: i32) -> Result<bool, Error> {
        let result = notification_setting::Entity::delete_by_id(id).exec(&self.db).await?;

        Ok(result.rows_affected > 0)
    }

    async fn get(&self, id: i32) -> Result<notification_setting::Model, Error> {
        self.find(id).await?.ok_or(Error::NotFound(id))
    }
}
