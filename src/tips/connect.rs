//! Building a tip pipeline from settings.

use crate::config::{ApiKeys, TipSettings, ToolTransport};
use crate::services::{GeminiClient, HttpSource, LocalTools, StdioToolClient, ToolBackend, ToolError};
use crate::tips::TipPipeline;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn gemini_client(http: reqwest::Client, keys: &ApiKeys, model: &str) -> GeminiClient {
    GeminiClient::new(http, keys.gemini.clone(), model)
}

/// Tools that talk to the web services directly
pub fn local_tools(http: reqwest::Client, keys: &ApiKeys, model: &str) -> LocalTools {
    let source = HttpSource::new(http.clone(), keys.openweather.clone(), keys.news.clone());
    LocalTools::new(Arc::new(source), Arc::new(gemini_client(http, keys, model)))
}

/// Arguments that make a child process act as the tool server
pub fn serve_args(config_path: Option<&Path>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(path) = config_path {
        args.push("--config".to_string());
        args.push(path.display().to_string());
    }
    args.push("serve".to_string());
    args
}

/// Connect the tools over the configured transport. Tip text is always
/// generated in this process.
pub async fn connect_pipeline(
    keys: ApiKeys,
    settings: TipSettings,
    config_path: Option<PathBuf>,
) -> Result<TipPipeline, ToolError> {
    let http = reqwest::Client::new();
    let tools: Arc<dyn ToolBackend> = match settings.transport {
        ToolTransport::InProcess => Arc::new(local_tools(http.clone(), &keys, &settings.gemini_model)),
        ToolTransport::Stdio => {
            let exe = std::env::current_exe()?;
            let client = StdioToolClient::spawn(&exe, &serve_args(config_path.as_deref())).await?;
            Arc::new(client)
        }
    };
    tracing::info!(transport = ?settings.transport, "tip pipeline connected");
    let generator = Arc::new(gemini_client(http, &keys, &settings.gemini_model));
    Ok(TipPipeline::new(tools, generator, settings.location))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_args_without_config() {
        assert_eq!(serve_args(None), vec!["serve"]);
    }

    #[test]
    fn test_serve_args_forward_config() {
        let args = serve_args(Some(Path::new("pets/marten.json")));
        assert_eq!(args, vec!["--config", "pets/marten.json", "serve"]);
    }

    #[tokio::test]
    async fn test_in_process_pipeline_connects_without_keys() {
        let pipeline = connect_pipeline(ApiKeys::default(), TipSettings::default(), None).await;
        assert!(pipeline.is_ok());
    }
}
