use console::style;
use rust_decimal::Decimal;
use crate::models::{ConsolidatedReport, RunStatus};

fn money(amount: Decimal, currency: &str) -> String {
    format!("{} {}", amount.round_dp(2), currency)
}

pub fn format_report_markdown(report: &ConsolidatedReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Cost Analysis Report\n\n- Run: `{}`\n", report.run_id));
    out.push_str(&format!("- Period: {}\n", report.window));
    out.push_str(&format!("- Mode: {}\n", report.mode));
    out.push_str(&format!("- Generated: {}\n\n", report.generated_at.to_rfc3339()));

    out.push_str(&format!(
        "## Summary\n\n| Metric | Value |\n|---|---|\n| Total cost | {} |\n| Savings potential | {} |\n| Services analyzed | {} |\n| Recommendations | {} |\n| Failed partitions | {} of {} |\n\n",
        money(report.total_cost, &report.currency),
        money(report.total_potential_savings, &report.currency),
        report.services_analyzed,
        report.recommendations_count(),
        report.partitions_failed.len(),
        report.partitions_total,
    ));

    if !report.top_cost_services.is_empty() {
        out.push_str("## Top Services by Cost\n\n| Service | Cost |\n|---|---|\n");
        for cost in &report.top_cost_services {
            out.push_str(&format!("| {} | {} |\n", cost.service_id, money(cost.amount, &report.currency)));
        }
        out.push('\n');
    }

    if !report.top_savings.is_empty() {
        out.push_str("## Top Savings Opportunities\n\n| Resource | Kind | Priority | Monthly savings | Finding |\n|---|---|---|---|---|\n");
        for rec in &report.top_savings {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                rec.resource_id,
                rec.kind,
                rec.priority.as_str(),
                money(rec.estimated_monthly_savings, &report.currency),
                rec.finding,
            ));
        }
        out.push('\n');
    }

    if !report.errors.is_empty() {
        out.push_str("## Failed Partitions\n\n| Partition | Kind | Attempts | Message |\n|---|---|---|---|\n");
        for e in &report.errors {
            out.push_str(&format!(
                "| {}@{} | {} | {} | {} |\n",
                e.service_id, e.region_id, e.kind, e.attempts, e.message
            ));
        }
    }

    out
}

/// Short colored summary for the terminal.
pub fn format_report_terminal(report: &ConsolidatedReport) -> String {
    let status = match report.status {
        RunStatus::Succeeded => style("SUCCEEDED").green().bold(),
        RunStatus::Partial => style("PARTIAL").yellow().bold(),
        other => style(other.as_str()).red().bold(),
    };
    let mut lines = vec![
        format!("  Run {} {}", style(&report.run_id).dim(), status),
        format!("  Period            {}", report.window),
        format!("  Total cost        {}", style(money(report.total_cost, &report.currency)).cyan()),
        format!(
            "  Savings potential {}",
            style(money(report.total_potential_savings, &report.currency)).green()
        ),
        format!(
            "  Services          {} analyzed, {} of {} partitions failed",
            report.services_analyzed,
            report.partitions_failed.len(),
            report.partitions_total
        ),
    ];

    if !report.top_cost_services.is_empty() {
        lines.push(String::new());
        lines.push(format!("  {}", style("Top services").bold()));
        for (i, cost) in report.top_cost_services.iter().enumerate() {
            lines.push(format!(
                "  {:>3}. {:<20} {}",
                i + 1,
                cost.service_id,
                money(cost.amount, &report.currency)
            ));
        }
    }

    if !report.top_savings.is_empty() {
        lines.push(String::new());
        lines.push(format!("  {}", style("Top savings").bold()));
        for rec in &report.top_savings {
            lines.push(format!(
                "  [{}] {} {} {}",
                rec.priority.as_str(),
                rec.resource_id,
                style(&rec.kind).dim(),
                money(rec.estimated_monthly_savings, &report.currency)
            ));
        }
    }

    if !report.errors.is_empty() {
        lines.push(String::new());
        lines.push(format!("  {}", style("Failed partitions").bold().red()));
        for e in &report.errors {
            lines.push(format!("  {}@{}: {} ({})", e.service_id, e.region_id, e.kind, e.message));
        }
    }

    lines.join("\n")
}
