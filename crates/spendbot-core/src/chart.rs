//! Pie chart rendering for monthly reports

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::ChartConfig;
use crate::error::{Error, Result};
use crate::report::CategoryTotals;

/// Environment variable overriding the QuickChart endpoint
pub const QUICKCHART_URL_ENV: &str = "QUICKCHART_URL";

#[async_trait]
pub trait ChartRenderer: Send + Sync {
    /// Render category totals as a PNG image
    async fn render(&self, totals: &CategoryTotals) -> Result<Vec<u8>>;
}

/// Renders Chart.js configs through a QuickChart server
#[derive(Clone)]
pub struct QuickChartRenderer {
    http_client: Client,
    url: String,
    width: u32,
    height: u32,
    timeout: Duration,
}

impl QuickChartRenderer {
    pub fn new(config: &ChartConfig) -> Self {
        Self {
            http_client: Client::new(),
            url: config.url.clone(),
            width: config.width,
            height: config.height,
            timeout: config.timeout,
        }
    }

    /// Like `new`, with `QUICKCHART_URL` taking precedence over the configured URL
    pub fn from_env(config: &ChartConfig) -> Self {
        let mut renderer = Self::new(config);
        if let Ok(url) = std::env::var(QUICKCHART_URL_ENV) {
            if !url.is_empty() {
                renderer.url = url;
            }
        }
        renderer
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_body(&self, totals: &CategoryTotals) -> Value {
        let (labels, data): (Vec<&str>, Vec<f64>) = totals
            .iter()
            .map(|(category, sum)| (category.as_str(), (sum * 100.0).round() / 100.0))
            .unzip();

        json!({
            "width": self.width,
            "height": self.height,
            "format": "png",
            "backgroundColor": "white",
            "chart": {
                "type": "pie",
                "data": {
                    "labels": labels,
                    "datasets": [{ "data": data }],
                },
                "options": {
                    "plugins": {
                        "title": { "display": true, "text": "Monthly Spending" },
                    },
                },
            },
        })
    }
}

#[async_trait]
impl ChartRenderer for QuickChartRenderer {
    async fn render(&self, totals: &CategoryTotals) -> Result<Vec<u8>> {
        if totals.is_empty() {
            return Err(Error::Chart("nothing to chart".into()));
        }

        let response = self
            .http_client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&self.request_body(totals))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Chart(format!("renderer returned {}: {}", status, body)));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(Error::Chart("renderer returned an empty image".into()));
        }
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotConfig;
    use crate::models::Category;
    use crate::test_utils::MockChartServer;

    fn totals() -> CategoryTotals {
        let mut totals = CategoryTotals::new();
        totals.add(Category::FoodDining, 15.0);
        totals.add(Category::Transport, 20.0);
        totals
    }

    #[test]
    fn test_request_body_keeps_category_order() {
        let renderer = QuickChartRenderer::new(&BotConfig::default().chart);
        let body = renderer.request_body(&totals());

        assert_eq!(body["chart"]["type"], "pie");
        assert_eq!(body["chart"]["data"]["labels"], json!(["Food/Dining", "Transport"]));
        assert_eq!(body["chart"]["data"]["datasets"][0]["data"], json!([15.0, 20.0]));
        assert_eq!(body["width"], 500);
    }

    #[tokio::test]
    async fn test_render_returns_png_bytes() {
        let server = MockChartServer::start().await;
        let mut config = BotConfig::default().chart;
        config.url = server.url();

        let png = QuickChartRenderer::new(&config).render(&totals()).await.unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[tokio::test]
    async fn test_render_errors() {
        let renderer = QuickChartRenderer::new(&BotConfig::default().chart);
        assert!(matches!(
            renderer.render(&CategoryTotals::new()).await,
            Err(Error::Chart(_))
        ));

        let server = MockChartServer::start().await;
        let mut config = BotConfig::default().chart;
        config.url = format!("{}/missing", server.url());
        assert!(QuickChartRenderer::new(&config).render(&totals()).await.is_err());
    }
}
