use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn color_coded_success_cell(rate: f64) -> Cell {
    let text = format!("{rate:.1}%");
    if rate > 80.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if rate >= 50.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

pub fn color_coded_duration_cell(seconds: f64) -> Cell {
    let minutes = seconds / 60.0;
    let text = format!("{minutes:.1}min");
    if minutes <= 10.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if minutes <= 15.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

/// Percent-change cells go red past the per-job anomaly threshold.
pub fn color_coded_change_cell(percent: f64) -> Cell {
    let text = format!("{percent:+.1}%");
    if percent <= 0.0 {
        Cell::new(text).fg(TableColor::Green)
    } else if percent <= 25.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}

pub fn status_cell(status: crate::model::RunStatus) -> Cell {
    use crate::model::RunStatus;
    match status {
        RunStatus::Success => Cell::new("success").fg(TableColor::Green),
        RunStatus::Failure => Cell::new("failure").fg(TableColor::Red),
        RunStatus::Unknown => Cell::new("unknown").fg(TableColor::DarkGrey),
    }
}
