//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod action_plan_item;
pub mod activity;
pub mod activity_comment;
pub mod activity_document;
pub mod kpi_entry;
pub mod project;
pub mod subtask;

// Re-export specific types to avoid conflicts
pub use action_plan_item::{
    Column as ActionPlanItemColumn, Entity as ActionPlanItem, Model as ActionPlanItemModel,
};
pub use activity::{Column as ActivityColumn, Entity as Activity, Model as ActivityModel};
pub use activity_comment::{
    Column as ActivityCommentColumn, Entity as ActivityComment, Model as ActivityCommentModel,
};
pub use activity_document::{
    Column as ActivityDocumentColumn, Entity as ActivityDocument, Model as ActivityDocumentModel,
};
pub use kpi_entry::{Column as KpiEntryColumn, Entity as KpiEntry, Model as KpiEntryModel};
pub use project::{Column as ProjectColumn, Entity as Project, Model as ProjectModel};
pub use subtask::{Column as SubtaskColumn, Entity as Subtask, Model as SubtaskModel};
