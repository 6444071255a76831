use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::baseline::ColumnSummary;
use crate::drift::DriftScore;

/// Scores at or above this are highlighted as drifted.
pub const DRIFT_ALERT_THRESHOLD: f64 = 0.5;

pub fn render_baseline_table(summary: &[ColumnSummary]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Column", "Rows", "Min", "Max", "Mean"]);

    for column in summary {
        table.add_row(Row::from(vec![
            Cell::new(&column.name),
            Cell::new(column.count),
            Cell::new(format!("{:.3}", column.min)),
            Cell::new(format!("{:.3}", column.max)),
            Cell::new(format!("{:.3}", column.mean)),
        ]));
    }
    table.to_string()
}

pub fn render_drift_table(column: &str, live_count: usize, score: DriftScore) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Column", "Live Values", "K-S Score", "Drifted"]);

    let drifted = score.value() >= DRIFT_ALERT_THRESHOLD;
    let drifted_cell = if drifted {
        Cell::new("YES").fg(Color::Red)
    } else {
        Cell::new("NO").fg(Color::Green)
    };
    table.add_row(Row::from(vec![
        Cell::new(column),
        Cell::new(live_count),
        Cell::new(format!("{:.4}", score.value())),
        drifted_cell,
    ]));
    table.to_string()
}
