//! Background tip producer.
//!
//! Runs on its own OS thread with a current-thread tokio runtime so the UI
//! loop never waits on the network.

use crate::chat::{truncate_with_ellipsis, ChatMessage};
use crate::constants::*;
use crate::services::{GenerateError, Location, TextGenerator, ToolBackend, ToolError};
use std::future::Future;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum TipError {
    #[error("news unavailable: {0}")]
    News(#[source] ToolError),
    #[error("no article to base a tip on")]
    NoArticle,
    #[error("tip generation failed: {0}")]
    Generate(#[from] GenerateError),
}

#[derive(Debug, Clone, Copy)]
pub struct TipProducerConfig {
    pub warmup: Duration,
    pub period: Duration,
}

impl Default for TipProducerConfig {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(TIP_WARMUP_SECS),
            period: Duration::from_secs(TIP_PERIOD_SECS),
        }
    }
}

/// Headline article pulled from the news text
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlineArticle {
    pub title: String,
    pub description: Option<String>,
}

/// Find article "1." in a numbered news list. The description is the next
/// non-empty line within a few lines that is not a `Source:` or `URL:` line.
pub fn first_article(news: &str) -> Option<HeadlineArticle> {
    let lines: Vec<&str> = news.lines().map(str::trim).collect();
    let start = lines.iter().position(|l| l.starts_with("1."))?;
    let title = lines[start].strip_prefix("1.").unwrap_or_default().trim();
    if title.is_empty() {
        return None;
    }
    let description = lines[start + 1..]
        .iter()
        .take(4)
        .take_while(|l| !l.starts_with("2."))
        .find(|l| !l.is_empty() && !l.starts_with("Source:") && !l.starts_with("URL:"))
        .map(|l| l.to_string());
    Some(HeadlineArticle {
        title: title.to_string(),
        description,
    })
}

pub fn compose_prompt(air_quality: Option<&str>, article: &HeadlineArticle, rating: Option<u8>) -> String {
    let air = air_quality
        .map(|a| a.chars().take(PROMPT_AIR_MAX_CHARS).collect::<String>())
        .unwrap_or_else(|| "No data".to_string());
    let rating = rating.map(|r| r.to_string()).unwrap_or_else(|| "unknown".to_string());
    format!(
        "Based on this environmental news and air quality data, generate a short, actionable \
sustainability tip (max {TIP_TARGET_CHARS} characters).\n\n\
Air Quality: {air}\n\n\
Recent News: {title}\n{description}\n\n\
Sentiment Rating: {rating}/{MAX_RATING} (0=neutral, {MAX_RATING}=best)\n\n\
Generate a friendly, concise tip that relates to this news. Keep it under {TIP_TARGET_CHARS} characters. \
Focus on what individuals can do.",
        title = article.title,
        description = article.description.as_deref().unwrap_or(""),
    )
}

/// One fetch-rate-generate cycle
pub struct TipPipeline {
    tools: Arc<dyn ToolBackend>,
    generator: Arc<dyn TextGenerator>,
    location: Location,
}

impl TipPipeline {
    pub fn new(tools: Arc<dyn ToolBackend>, generator: Arc<dyn TextGenerator>, location: Location) -> Self {
        Self {
            tools,
            generator,
            location,
        }
    }

    pub async fn next_tip(&self) -> Result<ChatMessage, TipError> {
        let air = self
            .tools
            .check_air_quality(self.location)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "air quality unavailable"))
            .ok();

        let news = self.tools.get_news().await.map_err(TipError::News)?;
        let article = first_article(&news).ok_or(TipError::NoArticle)?;

        let rating = match &article.description {
            Some(description) => self
                .tools
                .rate_news_sentiment(&article.title, description)
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "rating failed"))
                .ok(),
            None => None,
        };

        let prompt = compose_prompt(air.as_deref(), &article, rating);
        let text = self.generator.generate(&prompt).await?;
        let text = truncate_with_ellipsis(text.trim(), TIP_MAX_CHARS);
        let label = truncate_with_ellipsis(&article.title, ARTICLE_LABEL_MAX_CHARS + 3);

        tracing::info!(tip = %text, rating = ?rating, "tip ready");
        Ok(ChatMessage::tip(text, rating, Some(label)))
    }
}

/// Handle to the producer thread
pub struct TipProducer {
    shutdown: watch::Sender<bool>,
    done: std_mpsc::Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl TipProducer {
    /// Start the producer thread. `connect` runs on the producer's runtime
    /// and builds the pipeline, so it may spawn processes or open sockets.
    pub fn start<F, Fut>(connect: F, tx: UnboundedSender<ChatMessage>, config: TipProducerConfig) -> std::io::Result<Self>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<TipPipeline, ToolError>>,
    {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (done_tx, done) = std_mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("tip-producer".into())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(rt) => rt.block_on(async move {
                        match connect().await {
                            Ok(pipeline) => run(pipeline, tx, config, shutdown_rx).await,
                            Err(e) => tracing::error!(error = %e, "tip pipeline unavailable"),
                        }
                    }),
                    Err(e) => tracing::error!(error = %e, "failed to build tip runtime"),
                }
                let _ = done_tx.send(());
            })?;
        tracing::info!(warmup = ?config.warmup, period = ?config.period, "tip producer started");
        Ok(Self {
            shutdown,
            done,
            handle: Some(handle),
        })
    }

    /// Ask the thread to stop and wait up to `timeout`. Returns false if it
    /// was still busy and has been left to finish on its own.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        let _ = self.shutdown.send(true);
        let Some(handle) = self.handle.take() else {
            return true;
        };
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                tracing::info!("tip producer stopped");
                true
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                tracing::warn!(?timeout, "tip producer did not stop in time, detaching");
                false
            }
        }
    }
}

impl Drop for TipProducer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn run(
    pipeline: TipPipeline,
    tx: UnboundedSender<ChatMessage>,
    config: TipProducerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::select! {
        _ = tokio::time::sleep(config.warmup) => {}
        _ = shutdown.changed() => return,
    }
    let mut interval = tokio::time::interval(config.period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }
        let outcome = tokio::select! {
            outcome = pipeline.next_tip() => outcome,
            _ = shutdown.changed() => break,
        };
        match outcome {
            Ok(tip) => {
                if tx.send(tip).is_err() {
                    tracing::info!("tip queue closed");
                    break;
                }
            }
            Err(e) => tracing::warn!(error = %e, "no tip this cycle"),
        }
    }
}
