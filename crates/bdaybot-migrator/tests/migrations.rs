use bdaybot_entities::{notification_setting, notification_template, system_setting, user};
use bdaybot_migrator::sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, PaginatorTrait, SqlErr, Statement,
};
use bdaybot_migrator::{m20240802_093015_add_updated_at, m20240802_101244_seed_system_settings};
use bdaybot_migrator::{MigrationTrait, Migrator, MigratorTrait, SchemaManager};

async fn connect() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    Database::connect(options).await.unwrap()
}

async fn count(db: &DatabaseConnection, sql: &str) -> i64 {
    let row = db
        .query_one(Statement::from_string(db.get_database_backend(), sql))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "n").unwrap()
}

/// Tables as they looked before `updated_at` was introduced.
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
CREATE TABLE notification_templates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    template TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT 'birthday',
    is_active BOOLEAN DEFAULT 1,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE notification_settings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    template_id INTEGER NOT NULL,
    days_before INTEGER NOT NULL,
    time TEXT NOT NULL,
    is_active BOOLEAN DEFAULT 1,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (template_id) REFERENCES notification_templates(id)
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
INSERT INTO users (telegram_id, first_name, birth_date) VALUES (100, 'Anna', '01.02.1990');
INSERT INTO notification_templates (name, template) VALUES ('reminder', 'Hi {name}');
INSERT INTO notification_settings (template_id, days_before, time) VALUES (1, 3, '10:00');
INSERT INTO notification_logs (user_id, message_text, status) VALUES (1, 'Hi Anna', 'success');
"#;

fn new_user(telegram_id: i64) -> user::ActiveModel {
    user::ActiveModel {
        telegram_id: ActiveValue::Set(telegram_id),
        first_name: ActiveValue::Set("Anna".to_string()),
        birth_date: ActiveValue::Set("01.02.1990".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn fresh_database_gets_tables_and_seed() {
    let db = connect().await;
    Migrator::up(&db, None).await.unwrap();

    let manager = SchemaManager::new(&db);
    for table in [
        "users",
        "notification_templates",
        "notification_settings",
        "notification_logs",
        "system_settings",
    ] {
        assert!(manager.has_table(table).await.unwrap(), "{table} missing");
    }

    let phone = system_setting::Entity::find_by_id(system_setting::PAYMENT_PHONE)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(phone.value.as_deref(), Some("7 920 132 2534"));
    assert!(phone.description.is_some());

    let name = system_setting::Entity::find_by_id(system_setting::PAYMENT_NAME)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(name.value.as_deref(), Some("Диана Ибрагимовна Рыжова"));

    // Message templates and their schedules are left to the bot.
    assert_eq!(notification_template::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(notification_setting::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn applying_twice_is_idempotent() {
    let db = connect().await;
    Migrator::up(&db, None).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    // Re-run the guarded steps directly, bypassing the migration bookkeeping.
    let manager = SchemaManager::new(&db);
    m20240802_093015_add_updated_at::Migration.up(&manager).await.unwrap();
    m20240802_101244_seed_system_settings::Migration.up(&manager).await.unwrap();
    m20240802_101244_seed_system_settings::Migration.up(&manager).await.unwrap();

    assert_eq!(system_setting::Entity::find().count(&db).await.unwrap(), 2);
    assert_eq!(
        count(&db, "SELECT COUNT(*) AS n FROM pragma_table_info('users') WHERE name = 'updated_at'").await,
        1
    );
}

#[tokio::test]
async fn legacy_tables_gain_updated_at() {
    let db = connect().await;
    db.execute_unprepared(LEGACY_SCHEMA).await.unwrap();

    let manager = SchemaManager::new(&db);
    assert!(!manager.has_column("users", "updated_at").await.unwrap());
    assert!(!manager.has_column("notification_settings", "updated_at").await.unwrap());

    Migrator::up(&db, None).await.unwrap();

    for table in ["users", "notification_logs", "notification_settings"] {
        assert!(manager.has_column(table, "updated_at").await.unwrap(), "{table} missing updated_at");
        let nulls = count(&db, &format!("SELECT COUNT(*) AS n FROM {table} WHERE updated_at IS NULL")).await;
        assert_eq!(nulls, 0, "{table} rows were not stamped");
    }

    let legacy_user = user::Entity::find_by_id(1).one(&db).await.unwrap().unwrap();
    assert_eq!(legacy_user.telegram_id, 100);

    assert_eq!(count(&db, "SELECT foreign_keys AS n FROM pragma_foreign_keys()").await, 1);

    assert_eq!(system_setting::Entity::find().count(&db).await.unwrap(), 2);
}

#[tokio::test]
async fn foreign_keys_are_enforced_after_migration() {
    let db = connect().await;
    Migrator::up(&db, None).await.unwrap();

    let err = notification_setting::ActiveModel {
        template_id: ActiveValue::Set(999),
        days_before: ActiveValue::Set(1),
        time: ActiveValue::Set("09:00".to_string()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap_err();
    assert!(matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))));

    let template = notification_template::ActiveModel {
        name: ActiveValue::Set("reminder".to_string()),
        template: ActiveValue::Set("Hi {name}".to_string()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();
    assert_eq!(template.category, notification_template::DEFAULT_CATEGORY);
    assert!(template.is_active);

    let setting = notification_setting::ActiveModel {
        template_id: ActiveValue::Set(template.id),
        days_before: ActiveValue::Set(1),
        time: ActiveValue::Set("09:00".to_string()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();
    assert_eq!(setting.template_id, template.id);
}

#[tokio::test]
async fn telegram_id_is_unique() {
    let db = connect().await;
    Migrator::up(&db, None).await.unwrap();

    let first = new_user(42).insert(&db).await.unwrap();
    assert!(!first.is_admin);
    assert!(!first.is_subscribed);
    assert!(first.is_notifications_enabled);

    let err = new_user(42).insert(&db).await.unwrap_err();
    assert!(matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))));
}
