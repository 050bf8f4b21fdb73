//! SeaORM Entity for genres table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "genres")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::title_genres::Entity")]
    TitleGenres,
}

impl Related<super::title_genres::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TitleGenres.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
