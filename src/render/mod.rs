//! Banner rendering: layout into a scene, serialize to SVG, rasterize to PNG

pub mod banner;
pub mod scene;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{self, fontdb};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::retry::RetryPolicy;
pub use banner::{BannerInput, banner_scene};
pub use scene::Scene;

// System font scan is slow, do it once per process
static FONTS: LazyLock<Arc<fontdb::Database>> = LazyLock::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    debug!(faces = db.len(), "Loaded system fonts");
    Arc::new(db)
});

/// Warms the font database so the first render does not pay for the scan.
pub fn init_fonts() {
    LazyLock::force(&FONTS);
}

/// Rasterizes a scene to PNG bytes. The background stays transparent
/// wherever the scene draws nothing.
pub fn rasterize(scene: &Scene) -> Result<Vec<u8>> {
    let svg = scene.to_svg();
    let options = usvg::Options {
        fontdb: Arc::clone(&FONTS),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(&svg, &options).context("Failed to parse banner SVG")?;

    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow!("Invalid banner size {}x{}", size.width(), size.height()))?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());

    pixmap.encode_png().context("Failed to encode banner PNG")
}

/// Lays out and rasterizes the banner off the async runtime.
pub async fn render_banner(input: &BannerInput<'_>) -> Result<Vec<u8>> {
    let scene = banner_scene(input);
    tokio::task::spawn_blocking(move || rasterize(&scene))
        .await
        .context("Banner render task panicked")?
}

/// Turns banner input into PNG bytes.
#[async_trait]
pub trait BannerRenderer: Send + Sync {
    async fn render(&self, input: &BannerInput<'_>) -> Result<Vec<u8>>;
}

/// resvg backed renderer used in production.
pub struct PngRenderer;

#[async_trait]
impl BannerRenderer for PngRenderer {
    async fn render(&self, input: &BannerInput<'_>) -> Result<Vec<u8>> {
        render_banner(input).await
    }
}

/// Downloads the banner logo once. Any failure yields `None` and the banner
/// is drawn without it.
#[instrument(name = "FetchLogo", skip(retry))]
pub async fn fetch_logo(url: &str, retry: &RetryPolicy) -> Option<Vec<u8>> {
    let client = match reqwest::Client::builder()
        .user_agent("coinpulse/0.1")
        .timeout(Duration::from_secs(15))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Could not build HTTP client for logo");
            return None;
        }
    };

    let client = &client;
    let result = retry
        .run(move || async move {
            let response = client.get(url).send().await?;
            if !response.status().is_success() {
                return Err(anyhow!("HTTP error: {} for logo {}", response.status(), url));
            }
            Ok(response.bytes().await?.to_vec())
        })
        .await;

    match result {
        Ok(bytes) => {
            debug!(bytes = bytes.len(), "Fetched banner logo");
            Some(bytes)
        }
        Err(e) => {
            warn!(error = %e, "Logo fetch failed, banner will render without it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::TrackedAsset;
    use crate::core::format::{FormatPolicy, FormattedRow};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn png_dimensions(png: &[u8]) -> (u32, u32) {
        let w = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
        let h = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
        (w, h)
    }

    #[tokio::test]
    async fn test_render_banner_produces_fixed_width_png() {
        let rows = vec![
            FormattedRow::new(&TrackedAsset::new("BTC", "Bitcoin", &[]), 65000.0, 1.2),
            FormattedRow::new(&TrackedAsset::new("ETH", "Ethereum", &[]), 3200.0, -6.5),
        ];
        let policy = FormatPolicy::default();
        let input = BannerInput {
            title: "Market Pulse",
            subtitle: "24h",
            rows: &rows,
            policy: &policy,
            logo_png: None,
        };

        let png = render_banner(&input).await.unwrap();
        assert_eq!(png[..8], PNG_SIGNATURE);
        assert_eq!(
            png_dimensions(&png),
            (banner::BANNER_WIDTH, banner::BANNER_HEIGHT)
        );
    }

    #[test]
    fn test_rasterize_keeps_transparent_background() {
        let mut scene = Scene::new(4, 4);
        scene.push(scene::Node::Rect {
            x: 0.0,
            y: 0.0,
            width: 2.0,
            height: 2.0,
            radius: 0.0,
            fill: scene::Paint::solid(0xFF0000),
        });
        let png = rasterize(&scene).unwrap();
        let pixmap = Pixmap::decode_png(&png).unwrap();

        assert_eq!(pixmap.pixel(0, 0).unwrap().alpha(), 255);
        assert_eq!(pixmap.pixel(3, 3).unwrap().alpha(), 0);
    }

    #[tokio::test]
    async fn test_fetch_logo() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logo.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_SIGNATURE.to_vec()))
            .mount(&mock_server)
            .await;

        let url = format!("{}/logo.png", mock_server.uri());
        let logo = fetch_logo(&url, &RetryPolicy::fixed(1, 1)).await;
        assert_eq!(logo.unwrap(), PNG_SIGNATURE.to_vec());
    }

    #[tokio::test]
    async fn test_fetch_logo_failure_is_tolerated() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logo.png"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&mock_server)
            .await;

        let url = format!("{}/logo.png", mock_server.uri());
        assert!(fetch_logo(&url, &RetryPolicy::fixed(2, 1)).await.is_none());
    }
}
