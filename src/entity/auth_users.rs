use sea_orm::entity::prelude::*;

/// Identity record owned by the authentication gateway. Application data lives in `profiles`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub email_confirmed_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(unique)]
    pub confirmation_code: Option<String>,
    #[sea_orm(unique)]
    pub recovery_code: Option<String>,
    pub recovery_sent_at: Option<DateTimeWithTimeZone>,
    pub user_metadata: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::profiles::Entity")]
    Profiles,
}

impl Related<super::profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
