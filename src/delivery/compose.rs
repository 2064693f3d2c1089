//! Builds chat posts from formatted rows

use chrono::{DateTime, SecondsFormat, Utc};

use super::{Attachment, Embed, EmbedField, EmbedFooter, EmbedMedia, Post};
use crate::core::config::BrandingConfig;
use crate::core::format::{
    FormatPolicy, FormattedRow, batch_color, format_pct_arrow, format_usd, standout_mover,
};

pub const BANNER_FILENAME: &str = "banner.png";
const MAIN_FOOTER: &str = "Source: CoinGecko • Not financial advice";
const BUZZ_TITLE: &str = "🔥 Buzz & Forecast";
const BUZZ_FOOTER: &str = "Let's Play 🎮";

/// Everything a post needs besides the rows themselves.
pub struct PostContext<'a> {
    pub branding: &'a BrandingConfig,
    pub policy: &'a FormatPolicy,
    pub timestamp: DateTime<Utc>,
}

impl PostContext<'_> {
    fn timestamp_str(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

fn row_summary(row: &FormattedRow, policy: &FormatPolicy) -> String {
    format!(
        "{}  |  {}  |  {}",
        format_usd(row.price_usd, policy),
        format_pct_arrow(row.change_24h_pct),
        row.trend
    )
}

/// Single plain-text message, one line per asset.
pub fn text_post(rows: &[FormattedRow], ctx: &PostContext) -> Post {
    let mut lines = vec![format!("**{}**", ctx.branding.title)];
    if rows.is_empty() {
        lines.push("No prices available in this snapshot.".to_string());
    }
    for row in rows {
        lines.push(format!(
            "**{} • {}**: {}",
            row.symbol,
            row.display_name,
            row_summary(row, ctx.policy)
        ));
    }
    Post {
        content: Some(lines.join("\n")),
        ..Default::default()
    }
}

fn main_embed(rows: &[FormattedRow], ctx: &PostContext) -> Embed {
    let fields = rows
        .iter()
        .map(|row| EmbedField {
            name: format!("**{} • {}**", row.symbol, row.display_name),
            value: format!("{}\n*{}*", row_summary(row, ctx.policy), row.suggestion),
            inline: true,
        })
        .collect();

    Embed {
        title: Some(ctx.branding.title.clone()),
        description: Some(ctx.branding.subtitle.clone()),
        color: Some(batch_color(rows)),
        fields,
        footer: Some(EmbedFooter {
            text: MAIN_FOOTER.to_string(),
        }),
        timestamp: Some(ctx.timestamp_str()),
        ..Default::default()
    }
}

fn buzz_embed(rows: &[FormattedRow], ctx: &PostContext) -> Embed {
    let description = match standout_mover(rows) {
        Some(mover) => format!(
            "**{} • {}** moved **{}**.\n**Buzz:** Momentum notable.\n**Forecast:** Watch volatility ahead.",
            mover.symbol,
            mover.display_name,
            format_pct_arrow(mover.change_24h_pct)
        ),
        None => "No standout mover detected in this snapshot.".to_string(),
    };

    Embed {
        title: Some(BUZZ_TITLE.to_string()),
        description: Some(description),
        color: Some(batch_color(rows)),
        thumbnail: ctx
            .branding
            .thumbnail_url
            .as_ref()
            .map(|url| EmbedMedia { url: url.clone() }),
        footer: Some(EmbedFooter {
            text: BUZZ_FOOTER.to_string(),
        }),
        timestamp: Some(ctx.timestamp_str()),
        ..Default::default()
    }
}

/// Main market embed plus the standout-mover embed.
pub fn embed_post(rows: &[FormattedRow], ctx: &PostContext) -> Post {
    Post {
        embeds: vec![main_embed(rows, ctx), buzz_embed(rows, ctx)],
        ..Default::default()
    }
}

/// Embed post with the rendered banner attached and shown in the main embed.
pub fn banner_post(rows: &[FormattedRow], ctx: &PostContext, banner_png: Vec<u8>) -> Post {
    let mut post = embed_post(rows, ctx);
    if let Some(main) = post.embeds.first_mut() {
        main.image = Some(EmbedMedia {
            url: format!("attachment://{BANNER_FILENAME}"),
        });
    }
    post.attachment = Some(Attachment {
        filename: BANNER_FILENAME.to_string(),
        content_type: "image/png".to_string(),
        data: banner_png,
    });
    post
}
