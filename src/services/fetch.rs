//! HTTP fetchers for air pollution (OpenWeather) and environmental news (NewsAPI).
//!
//! No retries: a failed request is reported and the caller decides what
//! "no data this cycle" means.

use crate::constants::*;
use async_trait::async_trait;
use chrono::{Local, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no API key configured for {0}")]
    MissingKey(&'static str),
    #[error("{service} request failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} returned HTTP {status}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
    },
}

/// A point on the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            lat: DEFAULT_LATITUDE,
            lon: DEFAULT_LONGITUDE,
        }
    }
}

// ---- OpenWeather air pollution ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirPollutionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coord: Option<Coord>,
    #[serde(default)]
    pub list: Vec<AirPollutionEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirPollutionEntry {
    pub dt: i64,
    pub main: AqiMain,
    #[serde(default)]
    pub components: Components,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AqiMain {
    pub aqi: u8,
}

/// Pollutant concentrations in µg/m³
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub co: Option<f64>,
    pub no: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub nh3: Option<f64>,
}

// ---- NewsAPI ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsData {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub articles: Vec<NewsArticle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    #[serde(default)]
    pub source: ArticleSource,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Where environmental data comes from
#[async_trait]
pub trait EnvironmentSource: Send + Sync {
    async fn air_pollution(&self, location: Location) -> Result<AirPollutionData, FetchError>;
    async fn news(&self) -> Result<NewsData, FetchError>;
}

/// Live data over HTTP
pub struct HttpSource {
    client: reqwest::Client,
    openweather_key: Option<String>,
    news_key: Option<String>,
}

impl HttpSource {
    pub fn new(client: reqwest::Client, openweather_key: Option<String>, news_key: Option<String>) -> Self {
        Self {
            client,
            openweather_key,
            news_key,
        }
    }
}

#[async_trait]
impl EnvironmentSource for HttpSource {
    async fn air_pollution(&self, location: Location) -> Result<AirPollutionData, FetchError> {
        let key = self
            .openweather_key
            .as_deref()
            .ok_or(FetchError::MissingKey("OpenWeather"))?;
        fetch_air_pollution(&self.client, location, key).await
    }

    async fn news(&self) -> Result<NewsData, FetchError> {
        let key = self.news_key.as_deref().ok_or(FetchError::MissingKey("NewsAPI"))?;
        fetch_news(&self.client, key).await
    }
}

pub fn air_pollution_request(client: &reqwest::Client, location: Location, key: &str) -> reqwest::RequestBuilder {
    client.get(AIR_POLLUTION_URL).query(&[
        ("lat", location.lat.to_string()),
        ("lon", location.lon.to_string()),
        ("appid", key.to_string()),
    ])
}

/// Articles from the last `NEWS_LOOKBACK_DAYS` days before `today`, most relevant first
pub fn news_request(client: &reqwest::Client, key: &str, today: NaiveDate) -> reqwest::RequestBuilder {
    let from = today - TimeDelta::days(NEWS_LOOKBACK_DAYS);
    client.get(NEWS_URL).query(&[
        ("q", NEWS_QUERY.to_string()),
        ("language", "en".to_string()),
        ("from", from.format("%Y-%m-%d").to_string()),
        ("sortBy", "relevancy".to_string()),
        ("excludeDomains", NEWS_EXCLUDED_DOMAINS.to_string()),
        ("apiKey", key.to_string()),
    ])
}

pub async fn fetch_air_pollution(
    client: &reqwest::Client,
    location: Location,
    key: &str,
) -> Result<AirPollutionData, FetchError> {
    const SERVICE: &str = "air pollution";
    let resp = air_pollution_request(client, location, key)
        .send()
        .await
        .map_err(|source| FetchError::Request { service: SERVICE, source })?;
    if !resp.status().is_success() {
        return Err(FetchError::Status {
            service: SERVICE,
            status: resp.status(),
        });
    }
    let data: AirPollutionData = resp
        .json()
        .await
        .map_err(|source| FetchError::Request { service: SERVICE, source })?;
    tracing::debug!(entries = data.list.len(), "fetched air pollution");
    Ok(data)
}

pub async fn fetch_news(client: &reqwest::Client, key: &str) -> Result<NewsData, FetchError> {
    const SERVICE: &str = "news";
    let resp = news_request(client, key, Local::now().date_naive())
        .send()
        .await
        .map_err(|source| FetchError::Request { service: SERVICE, source })?;
    if !resp.status().is_success() {
        return Err(FetchError::Status {
            service: SERVICE,
            status: resp.status(),
        });
    }
    let data: NewsData = resp
        .json()
        .await
        .map_err(|source| FetchError::Request { service: SERVICE, source })?;
    tracing::debug!(articles = data.articles.len(), "fetched news");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air_pollution_url() {
        let client = reqwest::Client::new();
        let req = air_pollution_request(&client, Location::default(), "k3y").build().unwrap();
        let url = req.url();
        assert_eq!(url.host_str(), Some("api.openweathermap.org"));
        assert_eq!(url.path(), "/data/2.5/air_pollution");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("lat".into(), "42.728".into())));
        assert!(query.contains(&("lon".into(), "-73.687".into())));
        assert!(query.contains(&("appid".into(), "k3y".into())));
    }

    #[test]
    fn test_news_url_looks_back_thirty_days() {
        let client = reqwest::Client::new();
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let req = news_request(&client, "abc", today).build().unwrap();
        let query: Vec<(String, String)> = req.url().query_pairs().into_owned().collect();
        assert!(query.contains(&("from".into(), "2024-02-14".into())));
        assert!(query.contains(&("sortBy".into(), "relevancy".into())));
        assert!(query.contains(&("excludeDomains".into(), "hbr.org,finance.yahoo.com".into())));
        assert!(query.contains(&("apiKey".into(), "abc".into())));
    }

    #[test]
    fn test_parse_air_pollution_payload() {
        let raw = r#"{
            "coord": {"lon": -73.687, "lat": 42.728},
            "list": [{
                "main": {"aqi": 2},
                "components": {"co": 201.94, "no": 0.0, "no2": 4.11, "o3": 60.08,
                               "so2": 0.64, "pm2_5": 3.13, "pm10": 4.97, "nh3": 0.5},
                "dt": 1700000000
            }]
        }"#;
        let data: AirPollutionData = serde_json::from_str(raw).unwrap();
        assert_eq!(data.list[0].main.aqi, 2);
        assert_eq!(data.list[0].components.pm2_5, Some(3.13));
    }

    #[test]
    fn test_parse_news_with_missing_fields() {
        let raw = r#"{
            "status": "ok",
            "totalResults": 2,
            "articles": [
                {"source": {"id": null, "name": "Grist"}, "title": "Solar surges",
                 "description": null, "url": "https://example.org/a", "publishedAt": "2024-03-01T00:00:00Z"},
                {"title": "Bare"}
            ]
        }"#;
        let data: NewsData = serde_json::from_str(raw).unwrap();
        assert_eq!(data.total_results, Some(2));
        assert_eq!(data.articles[0].source.name.as_deref(), Some("Grist"));
        assert_eq!(data.articles[0].description, None);
        assert_eq!(data.articles[1].source, ArticleSource::default());
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let source = HttpSource::new(reqwest::Client::new(), None, None);
        assert!(matches!(
            source.air_pollution(Location::default()).await,
            Err(FetchError::MissingKey(_))
        ));
        assert!(matches!(source.news().await, Err(FetchError::MissingKey(_))));
    }
}
