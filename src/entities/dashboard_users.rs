use sea_orm::entity::prelude::*;

/// One row per SSO user; `owned_server` is null when no server is owned.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "dashboarddb")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,

    pub owned_server: Option<String>,

    #[sea_orm(default_value = false)]
    pub premium_user: bool,

    #[sea_orm(default_value = 0)]
    pub total_modern_auth_players: i32,

    #[sea_orm(default_value = 0)]
    pub total_players: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
