//! The tool surface the tip producer talks to.

use crate::services::fetch::{EnvironmentSource, FetchError, Location};
use crate::services::genai::{parse_rating, rating_prompt, GenerateError, TextGenerator};
use crate::services::resources::{
    air_quality_resource, air_quality_text, news_resource, news_text, resource_templates, ResourceTemplate,
    ResourceUri,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("tool server I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed tool server message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tool server closed the connection")]
    Closed,
    #[error("tool server error {code}: {message}")]
    Rpc { code: i32, message: String },
    #[error("tool failed: {0}")]
    Remote(String),
}

/// Environmental tools, in-process or behind a server
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Air quality summary text for a location
    async fn check_air_quality(&self, location: Location) -> Result<String, ToolError>;
    /// Numbered list of recent environmental news
    async fn get_news(&self) -> Result<String, ToolError>;
    /// Sentiment of one article, 0 (neutral) to 10 (best)
    async fn rate_news_sentiment(&self, title: &str, description: &str) -> Result<u8, ToolError>;
    async fn list_resources(&self) -> Result<Vec<ResourceTemplate>, ToolError>;
    /// JSON text of a resource document
    async fn read_resource(&self, uri: &str) -> Result<String, ToolError>;
}

/// Tools backed directly by a data source and a text generator
pub struct LocalTools {
    source: Arc<dyn EnvironmentSource>,
    generator: Arc<dyn TextGenerator>,
}

impl LocalTools {
    pub fn new(source: Arc<dyn EnvironmentSource>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { source, generator }
    }
}

#[async_trait]
impl ToolBackend for LocalTools {
    async fn check_air_quality(&self, location: Location) -> Result<String, ToolError> {
        let data = self.source.air_pollution(location).await?;
        Ok(air_quality_text(&air_quality_resource(Some(&data), location)))
    }

    async fn get_news(&self) -> Result<String, ToolError> {
        let data = self.source.news().await?;
        Ok(news_text(&news_resource(Some(&data))))
    }

    async fn rate_news_sentiment(&self, title: &str, description: &str) -> Result<u8, ToolError> {
        let answer = self.generator.generate(&rating_prompt(title, description)).await?;
        let rating = parse_rating(&answer);
        tracing::debug!(rating, answer = answer.trim(), "rated article");
        Ok(rating)
    }

    async fn list_resources(&self) -> Result<Vec<ResourceTemplate>, ToolError> {
        Ok(resource_templates())
    }

    async fn read_resource(&self, uri: &str) -> Result<String, ToolError> {
        // Fetch failures become error documents rather than errors
        let json = match ResourceUri::parse(uri) {
            Some(ResourceUri::AirQuality(location)) => {
                let data = self
                    .source
                    .air_pollution(location)
                    .await
                    .inspect_err(|e| tracing::warn!(error = %e, "air quality fetch failed"))
                    .ok();
                serde_json::to_string_pretty(&air_quality_resource(data.as_ref(), location))?
            }
            Some(ResourceUri::News) => {
                let data = self
                    .source
                    .news()
                    .await
                    .inspect_err(|e| tracing::warn!(error = %e, "news fetch failed"))
                    .ok();
                serde_json::to_string_pretty(&news_resource(data.as_ref()))?
            }
            None => return Err(ToolError::UnknownResource(uri.to_string())),
        };
        Ok(json)
    }
}
