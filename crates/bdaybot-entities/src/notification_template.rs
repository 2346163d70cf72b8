use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};

pub const DEFAULT_CATEGORY: &str = "birthday";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, serde::Serialize, serde::Deserialize)]
#[sea_orm(table_name = "notification_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Message body with `{placeholders}` filled in by the sender.
    pub template: String,
    #[sea_orm(default_value = "birthday")]
    pub category: String,
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub created_at: chrono::NaiveDateTime,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::notification_setting::Entity")]
    NotificationSettings,
}

impl Related<super::notification_setting::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NotificationSettings.def()
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
