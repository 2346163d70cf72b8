#![allow(dead_code)]

use bdaybot_store::Store;
use sea_orm::{ConnectOptions, ConnectionTrait, Database};
use tempfile::TempDir;

/// `users` and `notification_logs` as created before `updated_at` and
/// `ON DELETE SET NULL` existed.
const LEGACY_SCHEMA: &str = r#"
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    telegram_id INTEGER UNIQUE NOT NULL,
    username TEXT,
    first_name TEXT NOT NULL,
    last_name TEXT,
    birth_date TEXT NOT NULL,
    is_admin BOOLEAN DEFAULT 0,
    is_subscribed BOOLEAN DEFAULT 0,
    is_notifications_enabled BOOLEAN DEFAULT 1,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE notification_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER,
    message_text TEXT NOT NULL,
    status TEXT NOT NULL,
    error_message TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (user_id) REFERENCES users(id)
);
"#;

/// A migrated store on a private in-memory database.
pub async fn store() -> Store {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    Store::from_connection(db).await.unwrap()
}

/// A store migrated on top of the legacy tables.
pub async fn legacy_store() -> Store {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    db.execute_unprepared(LEGACY_SCHEMA).await.unwrap();
    Store::from_connection(db).await.unwrap()
}

/// A migrated store on a database file with a pool of several connections.
/// The directory must outlive the store.
pub async fn file_store() -> (Store, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("bot.db").display());

    let mut options = ConnectOptions::new(url);
    options.max_connections(5).sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    (Store::from_connection(db).await.unwrap(), dir)
}
