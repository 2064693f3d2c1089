use super::ui;
use crate::core::format::{FormatPolicy, FormattedRow, format_pct_arrow, format_usd, standout_mover};
use crate::core::{QuoteFetcher, TrackedAsset};
use crate::render::{self, BannerInput};
use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use std::collections::HashMap;
use std::path::Path;

pub fn rows_table(rows: &[FormattedRow], policy: &FormatPolicy) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Price"),
        ui::header_cell("24h"),
        ui::header_cell("Trend"),
        ui::header_cell("Suggestion"),
    ]);
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.symbol),
            Cell::new(&row.display_name),
            ui::price_cell(format_usd(row.price_usd, policy)),
            ui::change_cell(row.change_24h_pct),
            ui::trend_cell(row.trend),
            Cell::new(row.suggestion.text()),
        ]);
    }
    table
}

pub fn resolved_table(assets: &[TrackedAsset], resolved: &HashMap<String, String>) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Provider ID"),
        ui::header_cell("Candidates"),
    ]);
    for asset in assets {
        let id_cell = match resolved.get(&asset.symbol) {
            Some(id) => Cell::new(id),
            None => Cell::new("N/A").fg(comfy_table::Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(&asset.symbol),
            id_cell,
            Cell::new(asset.candidate_ids.join(", ")),
        ]);
    }
    table
}

/// Fetches once and prints the rows; optionally writes the banner PNG.
pub async fn run(
    assets: &[TrackedAsset],
    fetcher: &QuoteFetcher,
    policy: &FormatPolicy,
    title: &str,
    subtitle: &str,
    logo_png: Option<&[u8]>,
    banner_path: Option<&Path>,
) -> Result<()> {
    let pb = ui::new_spinner("Fetching prices...");
    let snapshot = fetcher.fetch(assets).await;
    pb.finish_and_clear();
    let rows = crate::core::format::build_rows(assets, &snapshot?);

    if rows.is_empty() {
        println!(
            "{}",
            ui::style_text("No prices available in this snapshot.", ui::StyleType::Error)
        );
        return Ok(());
    }

    println!("\n{}", ui::style_text(title, ui::StyleType::Title));
    println!("{}", rows_table(&rows, policy));

    if let Some(mover) = standout_mover(&rows) {
        println!(
            "Standout mover: {} {}",
            ui::style_text(&format!("{} • {}", mover.symbol, mover.display_name), ui::StyleType::Highlight),
            format_pct_arrow(mover.change_24h_pct)
        );
    }

    if let Some(path) = banner_path {
        let png = render::render_banner(&BannerInput {
            title,
            subtitle,
            rows: &rows,
            policy,
            logo_png,
        })
        .await?;
        std::fs::write(path, png)
            .with_context(|| format!("Failed to write banner to {}", path.display()))?;
        println!(
            "{}",
            ui::style_text(&format!("Banner written to {}", path.display()), ui::StyleType::Subtle)
        );
    }

    Ok(())
}
