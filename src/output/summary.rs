use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::model::{DurationPoint, JobBreakdown, JobTrends, PipelineStats};
use crate::narrative::NarrativeReport;

use super::styling::{bright, bright_green, bright_red, bright_yellow, cyan, dim};
use super::tables::{
    color_coded_change_cell, color_coded_duration_cell, color_coded_success_cell,
    create_cyan_header, create_table, status_cell,
};

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn format_seconds(seconds: f64) -> String {
    if seconds >= 60.0 {
        format!("{:.1}min", seconds / 60.0)
    } else {
        format!("{seconds:.0}s")
    }
}

/// Prints the fleet-wide health summary for a pipeline scope.
pub fn print_stats(stats: &PipelineStats, scope: Option<&str>) {
    let mut output = String::new();
    add_section_header(&mut output, "📊", "Overview");

    let success_rate_display = if stats.success_rate > 80.0 {
        bright_green(format!("{:.1}%", stats.success_rate))
    } else if stats.success_rate >= 50.0 {
        bright_yellow(format!("{:.1}%", stats.success_rate))
    } else {
        bright_red(format!("{:.1}%", stats.success_rate))
    };

    let median_display = stats
        .median_duration
        .map_or_else(|| "n/a".to_string(), format_seconds);
    let cost_display = stats
        .total_cost
        .map_or_else(|| "n/a".to_string(), |cost| format!("${cost:.2}"));

    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}",
        dim("Scope:"),
        cyan(scope.unwrap_or("all pipelines")),
        dim("Total runs:"),
        bright_yellow(stats.total_runs),
        dim("Success rate:"),
        success_rate_display,
        dim("Median duration:"),
        bright_yellow(median_display),
        dim("Total cost:"),
        bright_yellow(cost_display)
    );

    println!("{output}");
}

/// Prints the anomaly-annotated duration series, oldest run first.
pub fn print_duration_analysis(points: &[DurationPoint]) {
    let mut output = String::new();
    add_section_header(&mut output, "📈", "Run Durations");

    if points.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No successful runs with timing data yet."));
        println!("{output}");
        return;
    }

    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Run",
        "Duration",
        "Lifetime Avg",
        "Anomaly",
    ]));

    for point in points {
        let anomaly_cell = if point.is_anomaly {
            Cell::new("⚠ anomaly").fg(TableColor::Red)
        } else {
            Cell::new("")
        };

        table.add_row(vec![
            Cell::new(&point.label),
            color_coded_duration_cell(point.duration_seconds),
            Cell::new(format_seconds(point.cumulative_avg)),
            anomaly_cell,
        ]);
    }

    let _ = writeln!(output, "{table}");
    println!("{output}");
}

/// Prints the per-job breakdown for the most recent run, the heuristic
/// attribution for anomalous jobs, and the optional narrative report.
pub fn print_job_breakdown(breakdown: &JobBreakdown, narrative: Option<&NarrativeReport>) {
    let mut output = String::new();
    add_section_header(&mut output, "🔬", "Job Breakdown");

    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n",
        dim("Pipeline:"),
        cyan(&breakdown.pipeline_name),
        dim("Commit:"),
        dim(format!(
            "{} — {}",
            &breakdown.commit_sha, &breakdown.commit_message
        ))
    );

    if breakdown.jobs.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No runs with job data yet."));
        println!("{output}");
        return;
    }

    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Job", "Category", "Status", "Duration", "Hist Avg", "Change", "Anomaly",
    ]));

    for entry in &breakdown.jobs {
        let duration_display = entry
            .current_duration
            .map_or_else(|| "n/a".to_string(), format_seconds);
        let avg_display = entry
            .historical_avg
            .map_or_else(|| "n/a".to_string(), format_seconds);
        let change_cell = entry
            .percent_change
            .map_or_else(|| Cell::new("n/a"), color_coded_change_cell);
        let anomaly_cell = if entry.is_anomaly {
            Cell::new("⚠").fg(TableColor::Red)
        } else {
            Cell::new("")
        };

        table.add_row(vec![
            Cell::new(&entry.job_name),
            Cell::new(&entry.job_category).fg(TableColor::DarkGrey),
            status_cell(entry.status),
            Cell::new(duration_display),
            Cell::new(avg_display),
            change_cell,
            anomaly_cell,
        ]);
    }

    let _ = writeln!(output, "{table}");

    let attributed: Vec<_> = breakdown
        .jobs
        .iter()
        .filter(|entry| entry.heuristic_summary.is_some() || entry.attribution_confidence.is_some())
        .collect();

    if !attributed.is_empty() {
        add_section_header(&mut output, "🧭", "Likely Causes");
        for entry in attributed {
            let confidence = entry
                .attribution_confidence
                .map_or("", |c| match c {
                    crate::model::AttributionConfidence::High => " (high confidence)",
                    crate::model::AttributionConfidence::Medium => " (medium confidence)",
                });
            let _ = writeln!(
                output,
                "  {}{}",
                cyan(&entry.job_name),
                dim(confidence)
            );
            if let Some(summary) = &entry.heuristic_summary {
                let _ = writeln!(output, "    {summary}");
            }
            if let Some(sha) = &entry.last_healthy_run_sha {
                let _ = writeln!(output, "    {} {}", dim("Last healthy at:"), dim(sha));
            }
        }
    }

    if let Some(report) = narrative {
        add_section_header(&mut output, "📝", "Narrative");
        if let Some(root_cause) = &report.root_cause {
            let _ = writeln!(output, "  {} {root_cause}", dim("Root cause:"));
        }
        if let Some(confidence) = &report.confidence {
            let _ = writeln!(output, "  {} {confidence}", dim("Confidence:"));
        }
        if let Some(remediation) = &report.remediation {
            let _ = writeln!(output, "  {} {remediation}", dim("Remediation:"));
        }
        if !report.relevant_files.is_empty() {
            let _ = writeln!(
                output,
                "  {} {}",
                dim("Relevant files:"),
                report.relevant_files.join(", ")
            );
        }
    }

    println!("{output}");
}

/// Prints the per-job duration trend table, one row per run.
pub fn print_trends(trends: &JobTrends) {
    let mut output = String::new();
    add_section_header(&mut output, "📉", "Job Trends");

    if trends.chart_data.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No successful runs with job data yet."));
        println!("{output}");
        return;
    }

    let mut header = vec!["Run"];
    header.extend(trends.job_names.iter().map(String::as_str));

    let mut table = create_table();
    table.set_header(create_cyan_header(&header));

    for row in &trends.chart_data {
        let mut cells = vec![Cell::new(&row.name)];
        for job_name in &trends.job_names {
            let cell = row
                .durations
                .get(job_name)
                .map_or_else(|| Cell::new(""), |&d| Cell::new(format_seconds(d)));
            cells.push(cell);
        }
        table.add_row(cells);
    }

    let _ = writeln!(output, "{table}");
    println!("{output}");
}

/// Prints the known pipeline names.
pub fn print_pipelines(names: &[String]) {
    let mut output = String::new();
    add_section_header(&mut output, "🗂", "Pipelines");

    if names.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No runs ingested yet."));
    } else {
        for name in names {
            let _ = writeln!(output, "  {}", cyan(name));
        }
    }

    println!("{output}");
}
