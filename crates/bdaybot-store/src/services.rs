pub mod notification_log;
pub mod notification_setting;
pub mod system_setting;
pub mod template;
pub mod user;
