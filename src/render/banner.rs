//! Banner layout: panel, logo, title, accent bar and one chip per asset

use super::scene::{Anchor, Node, Paint, Scene};
use crate::core::format::{
    FormatPolicy, FormattedRow, batch_color, color_by_change, format_pct_arrow, format_usd,
};

pub const BANNER_WIDTH: u32 = 1200;
/// Height with a single row of chips
pub const BANNER_HEIGHT: u32 = 420;

const MARGIN: f32 = 40.0;
const LOGO_SIZE: f32 = 96.0;
const CHIP_ORIGIN_Y: f32 = 200.0;
const CHIP_WIDTH: f32 = 150.0;
const CHIP_HEIGHT: f32 = 170.0;
/// Horizontal distance between the left edges of neighbouring chips
pub const CHIP_SPACING: f32 = 160.0;
/// Vertical distance between the top edges of chip rows
pub const ROW_SPACING: f32 = CHIP_HEIGHT + 20.0;
/// Chips that fit between the side margins
pub const CHIPS_PER_ROW: usize =
    ((BANNER_WIDTH as f32 - 2.0 * MARGIN - CHIP_WIDTH) / CHIP_SPACING) as usize + 1;

const PANEL: Paint = Paint::with_opacity(0x0F1115, 0.92);
const CHIP: Paint = Paint::with_opacity(0x1B1E24, 1.0);
const TEXT: Paint = Paint::solid(0xFFFFFF);
const MUTED: Paint = Paint::with_opacity(0xFFFFFF, 0.7);

pub struct BannerInput<'a> {
    pub title: &'a str,
    pub subtitle: &'a str,
    pub rows: &'a [FormattedRow],
    pub policy: &'a FormatPolicy,
    pub logo_png: Option<&'a [u8]>,
}

/// Top-left corner of the chip at `index`. Chips fill a row left to right
/// and wrap once `CHIPS_PER_ROW` is reached.
pub fn chip_origin(index: usize) -> (f32, f32) {
    let column = index % CHIPS_PER_ROW;
    let line = index / CHIPS_PER_ROW;
    (
        MARGIN + column as f32 * CHIP_SPACING,
        CHIP_ORIGIN_Y + line as f32 * ROW_SPACING,
    )
}

/// Canvas height needed for `chips` chips.
pub fn banner_height(chips: usize) -> u32 {
    let lines = chips.div_ceil(CHIPS_PER_ROW).max(1);
    BANNER_HEIGHT + ((lines - 1) as f32 * ROW_SPACING) as u32
}

fn chip(scene: &mut Scene, index: usize, row: &FormattedRow, policy: &FormatPolicy) {
    let (x, top) = chip_origin(index);
    let center = x + CHIP_WIDTH / 2.0;
    let change_paint = Paint::solid(color_by_change(row.change_24h_pct));

    scene
        .push(Node::Rect {
            x,
            y: top,
            width: CHIP_WIDTH,
            height: CHIP_HEIGHT,
            radius: 14.0,
            fill: CHIP,
        })
        .push(Node::Rect {
            x,
            y: top,
            width: CHIP_WIDTH,
            height: 6.0,
            radius: 3.0,
            fill: change_paint,
        })
        .push(Node::Text {
            x: center,
            y: top + 48.0,
            content: row.symbol.clone(),
            size: 28.0,
            bold: true,
            fill: TEXT,
            anchor: Anchor::Middle,
        })
        .push(Node::Text {
            x: center,
            y: top + 74.0,
            content: row.display_name.clone(),
            size: 15.0,
            bold: false,
            fill: MUTED,
            anchor: Anchor::Middle,
        })
        .push(Node::Text {
            x: center,
            y: top + 110.0,
            content: format_usd(row.price_usd, policy),
            size: 18.0,
            bold: true,
            fill: TEXT,
            anchor: Anchor::Middle,
        })
        .push(Node::Text {
            x: center,
            y: top + 142.0,
            content: format_pct_arrow(row.change_24h_pct),
            size: 18.0,
            bold: true,
            fill: change_paint,
            anchor: Anchor::Middle,
        });
}

/// Lays out the banner scene. Pure: same input, same scene.
pub fn banner_scene(input: &BannerInput) -> Scene {
    let height = banner_height(input.rows.len());
    let mut scene = Scene::new(BANNER_WIDTH, height);
    let inner_width = BANNER_WIDTH as f32 - 2.0 * MARGIN;

    scene.push(Node::Rect {
        x: 0.0,
        y: 0.0,
        width: BANNER_WIDTH as f32,
        height: height as f32,
        radius: 24.0,
        fill: PANEL,
    });

    let text_x = match input.logo_png {
        Some(png) => {
            scene.push(Node::Image {
                x: MARGIN,
                y: MARGIN,
                width: LOGO_SIZE,
                height: LOGO_SIZE,
                png: png.to_vec(),
            });
            MARGIN + LOGO_SIZE + 24.0
        }
        None => MARGIN,
    };

    scene
        .push(Node::Text {
            x: text_x,
            y: 88.0,
            content: input.title.to_string(),
            size: 44.0,
            bold: true,
            fill: TEXT,
            anchor: Anchor::Start,
        })
        .push(Node::Text {
            x: text_x,
            y: 126.0,
            content: input.subtitle.to_string(),
            size: 22.0,
            bold: false,
            fill: MUTED,
            anchor: Anchor::Start,
        })
        .push(Node::Rect {
            x: MARGIN,
            y: 160.0,
            width: inner_width,
            height: 6.0,
            radius: 3.0,
            fill: Paint::solid(batch_color(input.rows)),
        });

    for (index, row) in input.rows.iter().enumerate() {
        chip(&mut scene, index, row, input.policy);
    }

    scene
}
