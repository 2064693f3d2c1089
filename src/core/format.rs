//! Turns quotes into display rows

use crate::core::asset::TrackedAsset;
use crate::core::fetcher::MarketSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub const COLOR_UP: u32 = 0x1F9D55;
pub const COLOR_DOWN: u32 = 0xD83C3C;
pub const COLOR_NEUTRAL: u32 = 0x2B2D31;

const TREND_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Uptrend,
    Sideways,
    Downtrend,
}

impl Trend {
    /// Strictly beyond +/-2% counts as a trend; the boundaries are sideways.
    pub fn from_change(change: f64) -> Self {
        if change > TREND_THRESHOLD {
            Trend::Uptrend
        } else if change < -TREND_THRESHOLD {
            Trend::Downtrend
        } else {
            Trend::Sideways
        }
    }
}

impl Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Trend::Uptrend => "Uptrend",
                Trend::Sideways => "Sideways",
                Trend::Downtrend => "Downtrend",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suggestion {
    StrongMove,
    MomentumPositive,
    SharpDrawdown,
    UnderPressure,
    NoSignal,
}

impl Suggestion {
    pub fn from_change(change: f64) -> Self {
        if change >= 7.0 {
            Suggestion::StrongMove
        } else if change >= 3.0 {
            Suggestion::MomentumPositive
        } else if change <= -7.0 {
            Suggestion::SharpDrawdown
        } else if change <= -3.0 {
            Suggestion::UnderPressure
        } else {
            Suggestion::NoSignal
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Suggestion::StrongMove => "Strong move — wait for a pullback?",
            Suggestion::MomentumPositive => "Momentum positive — watch support.",
            Suggestion::SharpDrawdown => "Sharp drawdown — possible value zone (DYOR).",
            Suggestion::UnderPressure => "Under pressure — size risk carefully.",
            Suggestion::NoSignal => "No strong signal — monitor price action.",
        }
    }
}

impl Display for Suggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct FormatPolicy {
    /// Drop trailing zeros on prices below $1000 (`0.5000` becomes `0.5`)
    #[serde(default)]
    pub trim_trailing_zeros: bool,
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn group_thousands(int_part: &str) -> String {
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Formats a USD price: grouped with at most two decimals from $1000 up,
/// four decimals below that.
pub fn format_usd(price: f64, policy: &FormatPolicy) -> String {
    if price >= 1000.0 {
        let fixed = format!("{price:.2}");
        let trimmed = trim_zeros(&fixed);
        let (int_part, frac) = match trimmed.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (trimmed, None),
        };
        let grouped = group_thousands(int_part);
        match frac {
            Some(f) => format!("${grouped}.{f}"),
            None => format!("${grouped}"),
        }
    } else {
        let fixed = format!("{price:.4}");
        if policy.trim_trailing_zeros {
            format!("${}", trim_zeros(&fixed))
        } else {
            format!("${fixed}")
        }
    }
}

/// `▲ 1.20%` for flat or rising, `▼ 6.50%` for falling.
pub fn format_pct_arrow(change: f64) -> String {
    let arrow = if change >= 0.0 { '▲' } else { '▼' };
    format!("{arrow} {:.2}%", change.abs())
}

pub fn color_by_change(change: f64) -> u32 {
    if change > 0.0 {
        COLOR_UP
    } else if change < 0.0 {
        COLOR_DOWN
    } else {
        COLOR_NEUTRAL
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormattedRow {
    pub symbol: String,
    pub display_name: String,
    pub price_usd: f64,
    pub change_24h_pct: f64,
    pub trend: Trend,
    pub suggestion: Suggestion,
}

impl FormattedRow {
    pub fn new(asset: &TrackedAsset, price_usd: f64, change_24h_pct: f64) -> Self {
        FormattedRow {
            symbol: asset.symbol.clone(),
            display_name: asset.display_name.clone(),
            price_usd,
            change_24h_pct,
            trend: Trend::from_change(change_24h_pct),
            suggestion: Suggestion::from_change(change_24h_pct),
        }
    }
}

/// Rows in symbol-table order; assets without a quote are left out.
pub fn build_rows(assets: &[TrackedAsset], snapshot: &MarketSnapshot) -> Vec<FormattedRow> {
    assets
        .iter()
        .filter_map(|asset| {
            let id = snapshot.ids.get(&asset.symbol)?;
            let quote = snapshot.quotes.get(id)?;
            Some(FormattedRow::new(asset, quote.price_usd, quote.change_24h_pct))
        })
        .collect()
}

/// Row with the largest absolute change; the first one wins a tie.
pub fn standout_mover(rows: &[FormattedRow]) -> Option<&FormattedRow> {
    let mut best: Option<&FormattedRow> = None;
    for row in rows {
        match best {
            Some(b) if row.change_24h_pct.abs() <= b.change_24h_pct.abs() => {}
            _ => best = Some(row),
        }
    }
    best
}

/// Color for the whole batch, taken from the standout mover.
pub fn batch_color(rows: &[FormattedRow]) -> u32 {
    standout_mover(rows).map_or(COLOR_NEUTRAL, |r| color_by_change(r.change_24h_pct))
}
