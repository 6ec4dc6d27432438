/// Activity board: cards, subtasks, documents and comments
pub mod activity;
/// The compiled-in KPI catalog
pub mod catalog;
/// Recording and querying KPI entries
pub mod kpi;
/// Monthly report aggregation
pub mod monthly;
/// Calendar-month periods and the one-entry-per-period guard
pub mod period;
/// Area projects and action plans
pub mod projects;
/// KPI definitions, formulas and compliance rules
pub mod registry;
/// Plain-text report rendering
pub mod report;
/// Document bucket for activity attachments
pub mod storage;
/// Optional report narratives
pub mod summary;
