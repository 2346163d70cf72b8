use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, serde::Serialize, serde::Deserialize)]
#[sea_orm(table_name = "notification_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(not_null)]
    pub template_id: i32,
    pub days_before: i32,
    /// Time of day, `HH:MM`.
    pub time: String,
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub created_at: chrono::NaiveDateTime,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::notification_template::Entity",
        from = "Column::TemplateId",
        to = "super::notification_template::Column::Id"
    )]
    NotificationTemplate,
}

impl Related<super::notification_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NotificationTemplate.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        self.updated_at = ActiveValue::Set(crate::now());
        Ok(self)
    }
}
