//! Database configuration module for the KPI service.
//!
//! Handles `SQLite` connections and schema creation using `SeaORM`. Tables are generated
//! from the entity definitions with `Schema::create_table_from_entity`, so the schema always
//! matches the Rust structs. Creation is idempotent: every statement uses `IF NOT EXISTS`.

use crate::entities::{
    ActionPlanItem, Activity, ActivityComment, ActivityDocument, KpiEntry, Project, Subtask,
    kpi_entry,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::Index,
};
use std::path::Path;
use tracing::{debug, info};

/// Default location of the `SQLite` file when `DATABASE_URL` is unset.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/indicore.sqlite?mode=rwc";

/// Name of the unique index enforcing one entry per indicator per month.
pub const KPI_PERIOD_INDEX: &str = "idx_kpi_entries_area_indicator_period";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back to
/// `configured` and then to [`DEFAULT_DATABASE_URL`].
#[must_use]
pub fn get_database_url(configured: Option<&str>) -> String {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database at `database_url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(parent) = sqlite_file_parent(database_url) {
        tokio::fs::create_dir_all(parent).await?;
    }

    info!("Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

fn sqlite_file_parent(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next()?;
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Activities are created before their child tables so foreign keys resolve.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, KpiEntry).await?;
    create_table(db, &schema, Activity).await?;
    create_table(db, &schema, Subtask).await?;
    create_table(db, &schema, ActivityDocument).await?;
    create_table(db, &schema, ActivityComment).await?;
    create_table(db, &schema, Project).await?;
    create_table(db, &schema, ActionPlanItem).await?;

    let period_index = Index::create()
        .if_not_exists()
        .name(KPI_PERIOD_INDEX)
        .table(KpiEntry)
        .col(kpi_entry::Column::Area)
        .col(kpi_entry::Column::Indicator)
        .col(kpi_entry::Column::Period)
        .unique()
        .to_owned();
    db.execute(builder.build(&period_index)).await?;

    debug!("Database schema ready");
    Ok(())
}

async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
) -> Result<()> {
    let builder = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;
    Ok(())
}
