use chrono::{Days, Local, NaiveDate};
use sea_orm::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue, IntoActiveModel, QueryOrder, QuerySelect, SqlErr, TransactionTrait};

use bdaybot_common::chrono_utils::{self, BirthDateError};
use bdaybot_entities::{notification_log, user};

#[derive(Clone, Debug)]
pub struct Service {
    db: DatabaseConnection,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),
    #[error("User with telegram id {0} already exists")]
    DuplicateTelegramId(i64),
    #[error("User {0} not found")]
    NotFound(i32),
    #[error("Invalid birth date: {0}")]
    InvalidBirthDate(#[from] BirthDateError),
}

/// Editable part of a user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub birth_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub telegram_id: i64,
    pub profile: UserProfile,
    pub is_admin: bool,
    pub is_subscribed: bool,
    pub is_notifications_enabled: bool,
}

impl NewUser {
    pub fn new(telegram_id: i64, first_name: impl Into<String>, birth_date: impl Into<String>) -> Self {
        Self {
            telegram_id,
            profile: UserProfile {
                username: None,
                first_name: first_name.into(),
                last_name: None,
                birth_date: birth_date.into(),
            },
            is_admin: false,
            is_subscribed: false,
            is_notifications_enabled: true,
        }
    }
}

impl Service {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_user(&self, new_user: NewUser) -> Result<user::Model, Error> {
        chrono_utils::validate_birth_date(&new_user.profile.birth_date, Local::now().date_naive())?;

        let telegram_id = new_user.telegram_id;
        let user = user::ActiveModel {
            telegram_id: ActiveValue::Set(telegram_id),
            username: ActiveValue::Set(new_user.profile.username),
            first_name: ActiveValue::Set(new_user.profile.first_name),
            last_name: ActiveValue::Set(new_user.profile.last_name),
            birth_date: ActiveValue::Set(new_user.profile.birth_date),
            is_admin: ActiveValue::Set(new_user.is_admin),
            is_subscribed: ActiveValue::Set(new_user.is_subscribed),
            is_notifications_enabled: ActiveValue::Set(new_user.is_notifications_enabled),
            ..Default::default()
        }
            .insert(&self.db)
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateTelegramId(telegram_id),
                _ => Error::DatabaseError(err),
            })?;

        tracing::debug!("User created: {:?}", user);

        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, id: i32) -> Result<Option<user::Model>, Error> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<user::Model>, Error> {
        let user = user::Entity::find()
            .filter(user::Column::TelegramId.eq(telegram_id))
            .one(&self.db)
            .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>, Error> {
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<user::Model>, Error> {
        Ok(user::Entity::find().order_by_asc(user::Column::Id).all(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_admins(&self) -> Result<Vec<user::Model>, Error> {
        let admins = user::Entity::find()
            .filter(user::Column::IsAdmin.eq(true))
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?;

        Ok(admins)
    }

    #[tracing::instrument(skip(self))]
    pub async fn admin_telegram_ids(&self) -> Result<Vec<i64>, Error> {
        let ids = user::Entity::find()
            .select_only()
            .column(user::Column::TelegramId)
            .filter(user::Column::IsAdmin.eq(true))
            .order_by_asc(user::Column::Id)
            .into_tuple::<i64>()
            .all(&self.db)
            .await?;

        Ok(ids)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_subscribed(&self) -> Result<Vec<user::Model>, Error> {
        let users = user::Entity::find()
            .filter(user::Column::IsSubscribed.eq(true))
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?;

        Ok(users)
    }

    /// Users whose birthday falls on `date`. Rows with an unreadable birth date are skipped.
    #[tracing::instrument(skip(self))]
    pub async fn users_with_birthday_on(&self, date: NaiveDate) -> Result<Vec<user::Model>, Error> {
        let users = self.list_users().await?;

        let matching = users
            .into_iter()
            .filter(|user| match chrono_utils::parse_birth_date(&user.birth_date) {
                Some(birth_date) => chrono_utils::is_birthday_on(birth_date, date),
                None => {
                    tracing::warn!("User {} has an unreadable birth date: {:?}", user.id, user.birth_date);
                    false
                }
            })
            .collect();

        Ok(matching)
    }

    /// Users whose birthday is exactly `days_before` days from today.
    /// Empty when that day is past the last representable date.
    #[tracing::instrument(skip(self))]
    pub async fn upcoming_birthdays(&self, days_before: u32) -> Result<Vec<user::Model>, Error> {
        let today = Local::now().date_naive();
        let Some(date) = today.checked_add_days(Days::new(days_before.into())) else {
            tracing::warn!("{} days from {} is out of range", days_before, today);
            return Ok(Vec::new());
        };

        self.users_with_birthday_on(date).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_profile(&self, id: i32, profile: UserProfile) -> Result<user::Model, Error> {
        chrono_utils::validate_birth_date(&profile.birth_date, Local::now().date_naive())?;

        let mut user = self.get(id).await?.into_active_model();
        user.username = ActiveValue::Set(profile.username);
        user.first_name = ActiveValue::Set(profile.first_name);
        user.last_name = ActiveValue::Set(profile.last_name);
        user.birth_date = ActiveValue::Set(profile.birth_date);

        Ok(user.update(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_admin(&self, id: i32, is_admin: bool) -> Result<user::Model, Error> {
        let mut user = self.get(id).await?.into_active_model();
        user.is_admin = ActiveValue::Set(is_admin);

        Ok(user.update(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_subscribed(&self, id: i32, is_subscribed: bool) -> Result<user::Model, Error> {
        let mut user = self.get(id).await?.into_active_model();
        user.is_subscribed = ActiveValue::Set(is_subscribed);

        Ok(user.update(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_notifications_enabled(&self, id: i32, enabled: bool) -> Result<user::Model, Error> {
        let mut user = self.get(id).await?.into_active_model();
        user.is_notifications_enabled = ActiveValue::Set(enabled);

        Ok(user.update(&self.db).await?)
    }

    /// Deletes the user; their notification logs are kept with `user_id` cleared.
    ///
    /// The logs are detached explicitly because tables created before
    /// `ON DELETE SET NULL` keep a plain foreign key.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, id: i32) -> Result<bool, Error> {
        let txn = self.db.begin().await?;

        let detached = notification_log::Entity::update_many()
            .col_expr(notification_log::Column::UserId, Expr::value(Option::<i32>::None))
            .col_expr(notification_log::Column::UpdatedAt, Expr::current_timestamp().into())
            .filter(notification_log::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        let result = user::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        if result.rows_affected > 0 {
            log::info!("User {} deleted, {} notification logs detached", id, detached.rows_affected);
        }

        Ok(result.rows_affected > 0)
    }

    async fn get(&self, id: i32) -> Result<user::Model, Error> {
        self.find_by_id(id).await?.ok_or(Error::NotFound(id))
    }
}
