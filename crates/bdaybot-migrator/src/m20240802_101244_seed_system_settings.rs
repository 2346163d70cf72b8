use sea_orm_migration::prelude::*;

use bdaybot_entities::system_setting;

const SEED: [(&str, &str, &str); 2] = [
    (
        system_setting::PAYMENT_PHONE,
        "7 920 132 2534",
        "Номер телефона для перевода взносов",
    ),
    (
        system_setting::PAYMENT_NAME,
        "Диана Ибрагимовна Рыжова",
        "Имя получателя платежа",
    ),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert()
            .into_table(system_setting::Entity)
            .columns([
                system_setting::Column::Key,
                system_setting::Column::Value,
                system_setting::Column::Description,
            ])
            .on_conflict(
                OnConflict::column(system_setting::Column::Key)
                    .do_nothing()
                    .to_owned(),
            )
            .to_owned();

        for (key, value, description) in SEED {
            insert.values_panic([key.into(), value.into(), description.into()]);
        }

        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(system_setting::Entity)
                    .and_where(
                        Expr::col(system_setting::Column::Key)
                            .is_in(SEED.iter().map(|(key, _, _)| *key)),
                    )
                    .to_owned(),
            )
            .await
    }
}
