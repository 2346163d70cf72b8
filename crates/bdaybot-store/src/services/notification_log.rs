use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::prelude::*;
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ActiveValue, QueryOrder, QuerySelect};

use bdaybot_entities::notification_log::{self, LogStatus};

#[derive(Debug, Clone)]
pub struct Service {
    db: DatabaseConnection,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLog {
    pub user_id: Option<i32>,
    pub message_text: String,
    pub status: LogStatus,
    pub error_message: Option<String>,
}

impl NewLog {
    pub fn success(user_id: i32, message_text: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            message_text: message_text.into(),
            status: LogStatus::Success,
            error_message: None,
        }
    }

    pub fn error(user_id: Option<i32>, message_text: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            user_id,
            message_text: message_text.into(),
            status: LogStatus::Error,
            error_message: Some(error_message.into()),
        }
    }
}

/// Log counts for one day, by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct LogSummary {
    pub total: u64,
    pub success: u64,
    pub error: u64,
    pub warning: u64,
}

impl Service {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[tracing::instrument(skip(self))]
    pub async fn record(&self, log: NewLog) -> Result<notification_log::Model, Error> {
        let log = notification_log::ActiveModel {
            user_id: ActiveValue::Set(log.user_id),
            message_text: ActiveValue::Set(log.message_text),
            status: ActiveValue::Set(log.status.to_string()),
            error_message: ActiveValue::Set(log.error_message),
            ..Default::default()
        }
            .insert(&self.db)
            .await?;

        tracing::debug!("Notification log recorded: {:?}", log);

        Ok(log)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find(&self, id: i32) -> Result<Option<notification_log::Model>, Error> {
        Ok(notification_log::Entity::find_by_id(id).one(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_log(&self, id: i32) -> Result<bool, Error> {
        let result = notification_log::Entity::delete_by_id(id).exec(&self.db).await?;

        Ok(result.rows_affected > 0)
    }

    #[tracing::instrument(skip(self))]
    pub async fn for_user(&self, user_id: i32, limit: u64) -> Result<Vec<notification_log::Model>, Error> {
        self.newest_first(notification_log::Column::UserId.eq(user_id), limit).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn with_status(&self, status: &str, limit: u64) -> Result<Vec<notification_log::Model>, Error> {
        self.newest_first(notification_log::Column::Status.eq(status), limit).await
    }

    /// Logs created within `[start, end]`.
    #[tracing::instrument(skip(self))]
    pub async fn between(&self, start: NaiveDateTime, end: NaiveDateTime, limit: u64) -> Result<Vec<notification_log::Model>, Error> {
        self.newest_first(notification_log::Column::CreatedAt.between(start, end), limit).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn recent(&self, limit: u64) -> Result<Vec<notification_log::Model>, Error> {
        let logs = notification_log::Entity::find()
            .order_by_desc(notification_log::Column::CreatedAt)
            .order_by_desc(notification_log::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(logs)
    }

    /// Failed deliveries that carry an error message.
    #[tracing::instrument(skip(self))]
    pub async fn errors(&self, limit: u64) -> Result<Vec<notification_log::Model>, Error> {
        let condition = notification_log::Column::Status
            .eq(LogStatus::Error.as_str())
            .and(notification_log::Column::ErrorMessage.is_not_null());

        self.newest_first(condition, limit).await
    }

    /// Deletes logs created before `cutoff` and returns how many were removed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_older_than(&self, cutoff: NaiveDateTime) -> Result<u64, Error> {
        let result = notification_log::Entity::delete_many()
            .filter(notification_log::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await?;

        log::info!("Deleted {} notification logs created before {}", result.rows_affected, cutoff);

        Ok(result.rows_affected)
    }

    #[tracing::instrument(skip(self))]
    pub async fn summary_for_date(&self, date: NaiveDate) -> Result<LogSummary, Error> {
        let start = date.and_time(NaiveTime::default());
        let end = date
            .checked_add_days(Days::new(1))
            .map(|next| next.and_time(NaiveTime::default()))
            .unwrap_or(NaiveDateTime::MAX);

        let counts = notification_log::Entity::find()
            .select_only()
            .column(notification_log::Column::Status)
            .column_as(notification_log::Column::Id.count(), "count")
            .filter(notification_log::Column::CreatedAt.gte(start))
            .filter(notification_log::Column::CreatedAt.lt(end))
            .group_by(notification_log::Column::Status)
            .into_tuple::<(String, i64)>()
            .all(&self.db)
            .await?;

        let mut summary = LogSummary::default();
        for (status, count) in counts {
            let count = count as u64;
            summary.total += count;
            match status.parse::<LogStatus>() {
                Ok(LogStatus::Success) => summary.success += count,
                Ok(LogStatus::Error) => summary.error += count,
                Ok(LogStatus::Warning) => summary.warning += count,
                Err(_) => {}
            }
        }

        Ok(summary)
    }

    async fn newest_first(&self, condition: SimpleExpr, limit: u64) -> Result<Vec<notification_log::Model>, Error> {
        let logs = notification_log::Entity::find()
            .filter(condition)
            .order_by_desc(notification_log::Column::CreatedAt)
            .order_by_desc(notification_log::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(logs)
    }
}
