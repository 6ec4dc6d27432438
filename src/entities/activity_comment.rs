//! Activity comment entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activity comment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_comments")]
pub struct Model {
    /// Unique identifier for the comment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent activity
    pub activity_id: i64,
    /// Who wrote it
    pub author: String,
    /// Comment body
    pub text: String,
    /// When it was posted
    pub created_at: DateTimeUtc,
}

/// Each comment belongs to one activity
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Parent activity
    #[sea_orm(
        belongs_to = "super::activity::Entity",
        from = "Column::ActivityId",
        to = "super::activity::Column::Id",
        on_delete = "Cascade"
    )]
    Activity,
}

impl Related<super::activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
