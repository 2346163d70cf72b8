pub mod notification_log;
pub mod notification_setting;
pub mod notification_template;
pub mod system_setting;
pub mod user;

/// Timestamp written to `updated_at` on every save.
pub(crate) fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}
