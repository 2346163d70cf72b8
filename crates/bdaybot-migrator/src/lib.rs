pub use sea_orm_migration::prelude::*;

pub mod m20240617_112207_create_table;
pub mod m20240802_093015_add_updated_at;
pub mod m20240802_101244_seed_system_settings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240617_112207_create_table::Migration),
            Box::new(m20240802_093015_add_updated_at::Migration),
            Box::new(m20240802_101244_seed_system_settings::Migration),
        ]
    }
}
