//! The compiled-in KPI catalog, grouped by area.

use super::registry::{Formula, KpiDefinition, TargetMode};

use Formula::{Difference, Margin, Percent, PercentChange, Ratio, Value};
use TargetMode::{Custom, Equal, GreaterOrEqual, LessOrEqual, LessThanPrevious};

const fn pct(part: &'static str, whole: &'static str) -> Formula {
    Percent { part, whole }
}

const fn ratio(numerator: &'static str, denominator: &'static str) -> Formula {
    Ratio {
        numerator,
        denominator,
    }
}

const fn diff(minuend: &'static str, subtrahend: &'static str) -> Formula {
    Difference {
        minuend,
        subtrahend,
    }
}

const fn change(current: &'static str, baseline: &'static str) -> Formula {
    PercentChange { current, baseline }
}

const fn value(field: &'static str) -> Formula {
    Value { field }
}

/// Every indicator known to the service, in display order.
#[must_use]
#[rustfmt::skip]
#[allow(clippy::too_many_lines)]
pub fn standard_definitions() -> Vec<KpiDefinition> {
    let d = KpiDefinition::new;
    vec![
        // Inventory
        d("Inventory", "Inventory accuracy", pct("correct_units", "total_units"),
            Some(98.0), GreaterOrEqual, "%", "Measure inventory precision"),
        d("Inventory", "Adjustment value", pct("adjustment_value", "total_sales"),
            Some(-0.25), LessOrEqual, "%", "Control inventory deviations"),
        d("Inventory", "ABC category turnover", ratio("sales", "average_inventory"),
            None, Custom, "times", "Evaluate inventory efficiency"),
        d("Inventory", "Days of coverage", ratio("available_inventory", "average_daily_consumption"),
            Some(30.0), LessOrEqual, "days", "Estimate inventory autonomy"),
        d("Inventory", "Inactive inventory", pct("inactive_value", "total_inventory"),
            Some(5.0), LessOrEqual, "%", "Detect products without movement"),
        d("Inventory", "Inventory cost", diff("current_cost", "previous_cost"),
            None, LessThanPrevious, "$", "Control financial impact"),
        d("Inventory", "Audits performed", pct("audits_performed", "audits_planned"),
            Some(90.0), GreaterOrEqual, "%", "Monitor control compliance"),
        d("Inventory", "Supported adjustments", pct("adjustments_with_evidence", "total_adjustments"),
            Some(100.0), Equal, "%", "Ensure traceability"),

        // Logistics
        d("Logistics", "Average receiving time", ratio("total_receiving_hours", "total_receptions"),
            Some(2.0), LessOrEqual, "h", "Speed up logistics processes"),
        d("Logistics", "Receiving accuracy", pct("correct_receptions", "total_receptions"),
            Some(98.0), GreaterOrEqual, "%", "Reduce errors when goods come in"),
        d("Logistics", "Storage space usage", pct("space_used", "space_available"),
            Some(90.0), GreaterOrEqual, "%", "Optimize warehouse usage"),
        d("Logistics", "Loss incidents", value("loss_incidents"),
            Some(0.0), Equal, "", "Eliminate logistics losses"),
        d("Logistics", "Dispatch time compliance", pct("on_time_dispatches", "total_dispatches"),
            Some(95.0), GreaterOrEqual, "%", "Guarantee punctuality"),
        d("Logistics", "Delivery punctuality", pct("on_time_deliveries", "total_deliveries"),
            Some(97.0), GreaterOrEqual, "%", "Improve internal customer service"),
        d("Logistics", "Picking errors", pct("picking_errors", "total_pickings"),
            Some(1.0), LessOrEqual, "%", "Reduce rework"),
        d("Logistics", "Fleet availability", pct("available_days", "operating_days"),
            Some(95.0), GreaterOrEqual, "%", "Measure transport readiness"),

        // Supplies
        d("Supplies", "Petty cash spending", ratio("petty_cash_spent", "authorized_cap"),
            Some(1.0), LessOrEqual, "", "Control resource execution"),
        d("Supplies", "Utility report compliance", pct("reports_delivered", "reports_scheduled"),
            Some(100.0), Equal, "%", "Verify regulatory compliance"),
        d("Supplies", "Utility consumption", diff("current_consumption", "previous_consumption"),
            None, LessThanPrevious, "", "Reduce unnecessary consumption"),
        d("Supplies", "Packaging income", ratio("packaging_income", "income_goal"),
            Some(1.0), GreaterOrEqual, "", "Measure recovery from packaging"),
        d("Supplies", "Supplies consumption", ratio("total_consumption", "planned_consumption"),
            Some(1.0), LessOrEqual, "", "Control operational deviations"),
        d("Supplies", "Consumption variance", change("current_consumption", "planned_consumption"),
            Some(5.0), LessOrEqual, "%", "Detect anomalies in supply usage"),
        d("Supplies", "Inventory accuracy", pct("correct_inventory", "total_inventory"),
            Some(98.0), GreaterOrEqual, "%", "Guarantee reliable records"),
        d("Supplies", "Inventory turnover", ratio("sales", "average_inventory"),
            Some(1.5), GreaterOrEqual, "times", "Measure turnover efficiency"),
        d("Supplies", "Average inventory days", ratio("available_inventory", "daily_consumption"),
            Some(30.0), LessOrEqual, "days", "Estimate inventory coverage"),
        d("Supplies", "Obsolescence losses", pct("lost_value", "total_value"),
            Some(1.0), LessOrEqual, "%", "Reduce expiry losses"),

        // Maintenance
        d("Maintenance", "Preventive maintenance compliance", pct("activities_executed", "activities_scheduled"),
            Some(95.0), GreaterOrEqual, "%", "Ensure timely maintenance"),
        d("Maintenance", "Response time", ratio("total_attention_hours", "total_failures"),
            Some(2.0), LessOrEqual, "h", "Reduce attention time"),
        d("Maintenance", "Critical equipment availability", pct("available_time", "total_time"),
            Some(97.0), GreaterOrEqual, "%", "Guarantee continuous operation"),
        d("Maintenance", "Repeat incidents", value("recurring_failures"),
            Some(0.0), Equal, "", "Prevent recurrence"),
        d("Maintenance", "Spare parts consumption", ratio("total_consumed", "total_requested"),
            Some(1.0), LessOrEqual, "", "Control material usage"),
        d("Maintenance", "Documented activities", pct("complete_records", "total_activities"),
            Some(100.0), Equal, "%", "Ensure traceability"),
        d("Maintenance", "Internal satisfaction", pct("positive_surveys", "total_surveys"),
            Some(90.0), GreaterOrEqual, "%", "Measure service perception"),
        d("Maintenance", "Trainings delivered", value("trainings_delivered"),
            Some(1.0), GreaterOrEqual, "monthly", "Train technical staff"),

        // Meats
        d("Meats", "Margin compliance", Margin { revenue: "sale_price", cost: "cost" },
            Some(20.0), GreaterOrEqual, "%", "Measure profitability"),
        d("Meats", "Products without turnover", pct("products_without_sales", "total_products"),
            Some(5.0), LessOrEqual, "%", "Identify overstock"),
        d("Meats", "Average turnover", ratio("sales", "average_inventory"),
            Some(1.5), GreaterOrEqual, "times/month", "Evaluate product turnover"),
        d("Meats", "Sanitary visits completed", pct("visits_done", "visits_scheduled"),
            Some(100.0), Equal, "%", "Verify sanitary compliance"),
        d("Meats", "Promotions executed", pct("promotions_applied", "promotions_scheduled"),
            Some(90.0), GreaterOrEqual, "%", "Drive turnover and sales"),
        d("Meats", "Live purchase profit", pct("net_profit", "live_purchase_cost"),
            Some(10.0), GreaterOrEqual, "%", "Measure direct profitability"),
        d("Meats", "Visit plan", pct("visits_done", "visits_planned"),
            Some(100.0), Equal, "%", "Strengthen leader presence"),
        d("Meats", "Differentiated products", pct("innovative_products", "total_portfolio"),
            Some(5.0), GreaterOrEqual, "%", "Encourage added value"),

        // Produce
        d("Produce", "Sales growth", change("current_sales", "previous_sales"),
            Some(4.0), GreaterOrEqual, "pp", "Evaluate revenue growth"),
        d("Produce", "Average gross margin", Margin { revenue: "sales", cost: "cost_of_sales" },
            None, Custom, "%", "Measure overall profitability"),
        d("Produce", "Shrinkage reduction", change("current_shrinkage", "previous_shrinkage"),
            None, Custom, "%", "Reduce spoilage losses"),
        d("Produce", "Inventory accuracy", pct("physical_inventory", "system_inventory"),
            Some(98.0), GreaterOrEqual, "%", "Ensure inventory control"),
        d("Produce", "In-store freshness", pct("fresh_products", "products_evaluated"),
            Some(95.0), GreaterOrEqual, "%", "Keep shelf quality"),
        d("Produce", "Commercial campaign compliance", pct("campaigns_executed", "campaigns_planned"),
            Some(100.0), Equal, "%", "Align commercial actions"),
        d("Produce", "Corrective actions implemented", pct("actions_executed", "actions_recommended"),
            Some(95.0), GreaterOrEqual, "%", "Improve operational response"),

        // Processes
        d("Processes", "Operating time and cost reduction", diff("cost_before", "cost_after"),
            None, Custom, "$", "Measure efficiency gained"),
        d("Processes", "Efficiency and satisfaction", value("current_satisfaction"),
            Some(90.0), GreaterOrEqual, "%", "Increase value perceived by users"),
        d("Processes", "Continuous improvement standards", pct("processes_with_standard", "total_processes"),
            Some(95.0), GreaterOrEqual, "%", "Ensure methodology alignment"),
        d("Processes", "Process quality", pct("processes_without_findings", "total_audited"),
            Some(90.0), GreaterOrEqual, "%", "Improve consistency and quality"),

        // Systems
        d("Systems", "Ticket resolution", pct("tickets_resolved_24h", "total_tickets"),
            Some(90.0), GreaterOrEqual, "%", "Measure support agility"),
        d("Systems", "System availability", pct("uptime", "total_time"),
            Some(99.9), GreaterOrEqual, "%", "Guarantee technology operations"),
        d("Systems", "Scheduled maintenance compliance", pct("maintenances_done", "maintenances_scheduled"),
            Some(100.0), Equal, "%", "Ensure technology continuity"),
        d("Systems", "Security incidents", value("incidents_reported"),
            Some(0.0), Equal, "", "Prevent vulnerabilities"),
        d("Systems", "Successful backups", pct("backups_ok", "backups_scheduled"),
            Some(100.0), Equal, "%", "Protect critical data"),
        d("Systems", "User satisfaction", pct("satisfied_users", "surveyed"),
            Some(85.0), GreaterOrEqual, "%", "Measure IT service perception"),
        d("Systems", "Critical incident response", value("critical_response_hours"),
            Some(2.0), LessOrEqual, "h", "Act fast on severe failures"),

        // Development
        d("Development", "Projects delivered on time", pct("projects_on_time", "total_projects"),
            Some(90.0), GreaterOrEqual, "%", "Meet schedules"),
        d("Development", "User satisfaction", pct("satisfied_users", "total_surveyed"),
            Some(85.0), GreaterOrEqual, "%", "Measure perceived value of development"),
        d("Development", "Critical errors", value("critical_failures"),
            Some(1.0), LessOrEqual, "per month", "Prevent severe failures"),
        d("Development", "Requests handled", pct("requests_resolved", "requests_received"),
            Some(100.0), Equal, "%", "Respond in time"),
        d("Development", "Average development time", ratio("total_days", "developments"),
            Some(15.0), LessOrEqual, "days", "Reduce duration per project"),
        d("Development", "Successful deployments", pct("deployments_without_error", "total_deployments"),
            Some(100.0), Equal, "%", "Ensure delivery quality"),
        d("Development", "New technology adoption", value("technology_implementations"),
            Some(1.0), GreaterOrEqual, "per quarter", "Stay current"),

        // Store leaders
        d("Store Leaders", "Sales goal compliance", pct("actual_sales", "sales_goal"),
            Some(100.0), GreaterOrEqual, "%", "Evaluate commercial effectiveness"),
        d("Store Leaders", "Average ticket per customer", ratio("total_sales", "customers"),
            None, Custom, "$", "Increase value per transaction"),
        d("Store Leaders", "Profitability per store", pct("net_profit", "total_sales"),
            Some(20.0), GreaterOrEqual, "%", "Measure financial efficiency"),
        d("Store Leaders", "Customer satisfaction", pct("satisfied_customers", "total_surveyed"),
            Some(90.0), GreaterOrEqual, "%", "Measure service quality"),
        d("Store Leaders", "Improvement project compliance", pct("projects_executed", "projects_planned"),
            Some(90.0), GreaterOrEqual, "%", "Measure execution capacity"),
    ]
}
