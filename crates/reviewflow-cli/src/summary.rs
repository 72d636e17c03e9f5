use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use reviewflow_model::{
    DeliveryStatus, QualityTier, RunOutcome, ScoredRestaurant, StagingReport, StepResult,
    StepStatus,
};

use crate::commands::{RunReport, ScoreReport};

pub fn print_run_summary(report: &RunReport) {
    let run = &report.run;
    println!("Run: {}", run.id());
    println!("City: {}", report.city);
    println!(
        "Outcome: {} ({} ms)",
        run.outcome(),
        run.duration().as_millis()
    );
    if let Some(step) = run.aborted_before() {
        println!("Aborted before: {step}");
    }
    match run.delivery() {
        DeliveryStatus::Delivered => println!("Notification: delivered"),
        DeliveryStatus::NotAttempted => println!("Notification: not attempted"),
        DeliveryStatus::Failed { message } => println!("Notification: FAILED ({message})"),
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Step"),
        header_cell("Status"),
        header_cell("Attempts"),
        header_cell("Duration (ms)"),
        header_cell("Error"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for step in run.steps() {
        table.add_row(step_row(step));
    }
    println!("{table}");

    if let Some(staging) = &report.staging {
        print_staging(staging);
    }
    if run.outcome() != RunOutcome::Failure && !report.mart.is_empty() {
        print_leaderboard(&report.mart, report.top_n);
    }
}

pub fn print_score_summary(report: &ScoreReport) {
    println!("City: {}", report.city);
    print_staging(&report.staging);
    print_leaderboard(&report.mart, report.limit);
}

fn step_row(step: &StepResult) -> Vec<Cell> {
    let error = match &step.failure {
        Some(failure) if failure.failing_checks.is_empty() => {
            Cell::new(format!("[{}] {}", failure.kind, failure.message))
        }
        Some(failure) => Cell::new(format!(
            "[{}] {}",
            failure.kind,
            failure.failing_checks.join(", ")
        )),
        None => dim_cell("-"),
    };
    vec![
        Cell::new(step.step.as_str()),
        status_cell(step.status),
        Cell::new(step.attempts),
        Cell::new(step.duration.as_millis()),
        error,
    ]
}

fn print_leaderboard(mart: &[ScoredRestaurant], limit: usize) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Restaurant"),
        header_cell("Rating"),
        header_cell("Reviews"),
        header_cell("Positive %"),
        header_cell("Score"),
        header_cell("Tier"),
        header_cell("Recommendation"),
    ]);
    apply_table_style(&mut table);
    for index in [0, 2, 3, 4, 5] {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for (position, row) in mart.iter().take(limit).enumerate() {
        let rating = row
            .restaurant
            .rating
            .map_or_else(|| dim_cell("-"), |rating| Cell::new(format!("{rating:.1}")));
        table.add_row(vec![
            Cell::new(position + 1),
            Cell::new(row.name()),
            rating,
            Cell::new(row.review_count_matched),
            Cell::new(format!("{:.1}", row.positive_sentiment_pct)),
            Cell::new(format!("{:.1}", row.quality_score)).add_attribute(Attribute::Bold),
            tier_cell(row.tier),
            Cell::new(row.recommendation.as_str()),
        ]);
    }
    if mart.len() > limit {
        println!("Top {limit} of {} restaurants:", mart.len());
    }
    println!("{table}");
}

fn print_staging(report: &StagingReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("In"),
        header_cell("Kept"),
        header_cell("Dropped"),
        header_cell("Reason"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=3 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    table.add_row(vec![
        Cell::new("restaurants"),
        Cell::new(report.restaurants_in),
        Cell::new(report.restaurants_kept),
        count_cell(report.restaurants_dropped()),
        drop_reason_cell(&[
            ("missing name", report.restaurants_missing_name),
            ("duplicate place id", report.restaurants_duplicate_place_id),
        ]),
    ]);
    table.add_row(vec![
        Cell::new("reviews"),
        Cell::new(report.reviews_in),
        Cell::new(report.reviews_kept),
        count_cell(report.reviews_dropped()),
        drop_reason_cell(&[("rating outside 1-5", report.reviews_invalid_rating)]),
    ]);
    println!("{table}");
}

fn drop_reason_cell(reasons: &[(&str, usize)]) -> Cell {
    let text: Vec<String> = reasons
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(reason, count)| format!("{reason}: {count}"))
        .collect();
    if text.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(text.join(", ")).fg(Color::Yellow)
    }
}

fn status_cell(status: StepStatus) -> Cell {
    match status {
        StepStatus::Success => Cell::new("✓").fg(Color::Green),
        StepStatus::Failed => Cell::new("FAILED")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        StepStatus::TimedOut => Cell::new("TIMED OUT")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
    }
}

fn tier_cell(tier: QualityTier) -> Cell {
    let cell = Cell::new(tier.as_str());
    match tier {
        QualityTier::Premium => cell.fg(Color::Green).add_attribute(Attribute::Bold),
        QualityTier::Excellent => cell.fg(Color::Green),
        QualityTier::VeryGood | QualityTier::Good => cell,
        QualityTier::Average => cell.fg(Color::DarkGrey),
    }
}

fn count_cell(count: usize) -> Cell {
    if count > 0 {
        Cell::new(count).fg(Color::Yellow).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
