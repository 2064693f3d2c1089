//! Typed scene graph serialized to SVG

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
}

impl Anchor {
    fn as_svg(&self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
        }
    }
}

/// 24-bit RGB plus opacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub rgb: u32,
    pub opacity: f32,
}

impl Paint {
    pub const fn solid(rgb: u32) -> Self {
        Paint { rgb, opacity: 1.0 }
    }

    pub const fn with_opacity(rgb: u32, opacity: f32) -> Self {
        Paint { rgb, opacity }
    }

    fn hex(&self) -> String {
        format!("#{:06X}", self.rgb & 0xFF_FFFF)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        fill: Paint,
    },
    Text {
        x: f32,
        y: f32,
        content: String,
        size: f32,
        bold: bool,
        fill: Paint,
        anchor: Anchor,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        png: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub nodes: Vec<Node>,
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

impl Scene {
    pub fn new(width: u32, height: u32) -> Self {
        Scene {
            width,
            height,
            nodes: Vec::new(),
        }
    }

    pub fn push(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        // Writing into a String cannot fail
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        for node in &self.nodes {
            let _ = match node {
                Node::Rect {
                    x,
                    y,
                    width,
                    height,
                    radius,
                    fill,
                } => write!(
                    svg,
                    r#"<rect x="{x}" y="{y}" width="{width}" height="{height}" rx="{radius}" fill="{}" fill-opacity="{}"/>"#,
                    fill.hex(),
                    fill.opacity
                ),
                Node::Text {
                    x,
                    y,
                    content,
                    size,
                    bold,
                    fill,
                    anchor,
                } => write!(
                    svg,
                    r#"<text x="{x}" y="{y}" font-family="DejaVu Sans, Arial, sans-serif" font-size="{size}" font-weight="{}" fill="{}" fill-opacity="{}" text-anchor="{}">{}</text>"#,
                    if *bold { "bold" } else { "normal" },
                    fill.hex(),
                    fill.opacity,
                    anchor.as_svg(),
                    escape(content)
                ),
                Node::Image {
                    x,
                    y,
                    width,
                    height,
                    png,
                } => write!(
                    svg,
                    r#"<image x="{x}" y="{y}" width="{width}" height="{height}" href="data:image/png;base64,{}"/>"#,
                    STANDARD.encode(png)
                ),
            };
        }
        svg.push_str("</svg>");
        svg
    }
}
