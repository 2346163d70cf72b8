use std::sync::Arc;

use sea_orm::prelude::*;
use sea_orm::{ActiveValue, IntoActiveModel, PaginatorTrait, QueryOrder, QuerySelect};
use tokio::sync::Mutex;

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
    #[error("Template {0} not found")]
    NotFound(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTemplate {
    pub name: String,
    pub template: String,
    pub category: String,
    pub is_active: bool,
}

impl NewTemplate {
    /// An active template in the default `birthday` category.
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            category: notification_template::DEFAULT_CATEGORY.to_string(),
            is_active: true,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// What `delete_template` did with the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateRemoval {
    /// Settings still reference the template, so it was only deactivated.
    Deactivated,
    Deleted,
}

impl Service {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            upsert_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Inserts the template, or overwrites the body and active flag of the one
    /// sharing its name and category.
    #[tracing::instrument(skip(self))]
    pub async fn upsert_template(&self, new_template: NewTemplate) -> Result<notification_template::Model, Error> {
        let _guard = self.upsert_lock.lock().await;

        if let Some(existing) = self.find_by_name_and_category(&new_template.name, &new_template.category).await? {
            let mut template = existing.into_active_model();
            template.template = ActiveValue::Set(new_template.template);
            template.is_active = ActiveValue::Set(new_template.is_active);
            let template = template.update(&self.db).await?;

            log::info!("Template updated: {} ({})", template.name, template.category);
            return Ok(template);
        }

        let template = notification_template::ActiveModel {
            name: ActiveValue::Set(new_template.name),
            template: ActiveValue::Set(new_template.template),
            category: ActiveValue::Set(new_template.category),
            is_active: ActiveValue::Set(new_template.is_active),
            ..Default::default()
        }
            .insert(&self.db)
            .await?;

        log::info!("Template added: {} ({})", template.name, template.category);

        Ok(template)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find(&self, id: i32) -> Result<Option<notification_template::Model>, Error> {
        Ok(notification_template::Entity::find_by_id(id).one(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_name_and_category(&self, name: &str, category: &str) -> Result<Option<notification_template::Model>, Error> {
        let template = notification_template::Entity::find()
            .filter(notification_template::Column::Name.eq(name))
            .filter(notification_template::Column::Category.eq(category))
            .one(&self.db)
            .await?;

        Ok(template)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_templates(&self, active_only: bool) -> Result<Vec<notification_template::Model>, Error> {
        let mut query = notification_template::Entity::find();
        if active_only {
            query = query.filter(notification_template::Column::IsActive.eq(true));
        }

        let templates = query
            .order_by_asc(notification_template::Column::Category)
            .order_by_asc(notification_template::Column::Name)
            .all(&self.db)
            .await?;

        Ok(templates)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_by_category(&self, category: &str, active_only: bool) -> Result<Vec<notification_template::Model>, Error> {
        let mut query = notification_template::Entity::find()
            .filter(notification_template::Column::Category.eq(category));
        if active_only {
            query = query.filter(notification_template::Column::IsActive.eq(true));
        }

        Ok(query.order_by_asc(notification_template::Column::Name).all(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<String>, Error> {
        let categories = notification_template::Entity::find()
            .select_only()
            .column(notification_template::Column::Category)
            .distinct()
            .order_by_asc(notification_template::Column::Category)
            .into_tuple::<String>()
            .all(&self.db)
            .await?;

        Ok(categories)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_template(&self, id: i32, update: NewTemplate) -> Result<notification_template::Model, Error> {
        let mut template = self.get(id).await?.into_active_model();
        template.name = ActiveValue::Set(update.name);
        template.template = ActiveValue::Set(update.template);
        template.category = ActiveValue::Set(update.category);
        template.is_active = ActiveValue::Set(update.is_active);

        Ok(template.update(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_active(&self, id: i32, is_active: bool) -> Result<notification_template::Model, Error> {
        let mut template = self.get(id).await?.into_active_model();
        template.is_active = ActiveValue::Set(is_active);

        Ok(template.update(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_template(&self, id: i32) -> Result<TemplateRemoval, Error> {
        let template = self.get(id).await?;

        let references = notification_setting::Entity::find()
            .filter(notification_setting::Column::TemplateId.eq(id))
            .count(&self.db)
            .await?;

        if references > 0 {
            let mut template = template.into_active_model();
            template.is_active = ActiveValue::Set(false);
            template.update(&self.db).await?;

            log::info!("Template {} deactivated, {} settings still use it", id, references);
            return Ok(TemplateRemoval::Deactivated);
        }

        notification_template::Entity::delete_by_id(template.id).exec(&self.db).await?;
        log::info!("Template {} deleted", id);

        Ok(TemplateRemoval::Deleted)
    }

    async fn get(&self, id: i32) -> Result<notification_template::Model, Error> {
        self.find(id).await?.ok_or(Error::NotFound(id))
    }
}
