//! Fetched data reshaped into readable resource documents and tool text.

use crate::constants::*;
use crate::services::fetch::{AirPollutionData, Location, NewsData};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

pub const NEWS_URI: &str = "environment://news/latest";
const AIR_QUALITY_PREFIX: &str = "environment://air-quality/";

pub fn aqi_category(value: u8) -> &'static str {
    match value {
        1 => "Good",
        2 => "Fair",
        3 => "Moderate",
        4 => "Poor",
        5 => "Very Poor",
        _ => "Unknown",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub uri_template: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub mime_type: String,
}

pub fn resource_templates() -> Vec<ResourceTemplate> {
    vec![
        ResourceTemplate {
            uri_template: format!("{AIR_QUALITY_PREFIX}{{lat}}/{{lon}}"),
            name: "air-quality".into(),
            title: "Air Quality Data".into(),
            description: "Current air quality index and pollutant levels for any location".into(),
            mime_type: "application/json".into(),
        },
        ResourceTemplate {
            uri_template: NEWS_URI.into(),
            name: "environmental-news".into(),
            title: "Environmental News".into(),
            description: format!("Recent environmental news from the past {NEWS_LOOKBACK_DAYS} days"),
            mime_type: "application/json".into(),
        },
    ]
}

/// A resource URI we know how to read
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResourceUri {
    AirQuality(Location),
    News,
}

impl ResourceUri {
    pub fn parse(uri: &str) -> Option<Self> {
        if uri == NEWS_URI {
            return Some(ResourceUri::News);
        }
        let rest = uri.strip_prefix(AIR_QUALITY_PREFIX)?;
        let (lat, lon) = rest.split_once('/')?;
        Some(ResourceUri::AirQuality(Location {
            lat: lat.parse().ok()?,
            lon: lon.parse().ok()?,
        }))
    }
}

pub fn air_quality_uri(location: Location) -> String {
    format!("{AIR_QUALITY_PREFIX}{}/{}", location.lat, location.lon)
}

/// Either the document or the reason it could not be built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceDoc<T> {
    Ready(T),
    Unavailable { uri: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityReport {
    pub uri: String,
    pub location: Coordinates,
    pub timestamp: i64,
    pub air_quality_index: AqiReading,
    pub pollutants: Pollutants,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqiReading {
    pub value: u8,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pollutants {
    pub co: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsDigest {
    pub uri: String,
    pub total_results: Option<u64>,
    pub articles: Vec<ArticleSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub title: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub published_at: Option<String>,
    pub url: Option<String>,
}

pub fn air_quality_resource(data: Option<&AirPollutionData>, location: Location) -> ResourceDoc<AirQualityReport> {
    let uri = air_quality_uri(location);
    let Some(latest) = data.and_then(|d| d.list.first()) else {
        return ResourceDoc::Unavailable {
            uri,
            error: "No air quality data available".into(),
        };
    };
    let c = &latest.components;
    ResourceDoc::Ready(AirQualityReport {
        uri,
        location: Coordinates {
            latitude: location.lat,
            longitude: location.lon,
        },
        timestamp: latest.dt,
        air_quality_index: AqiReading {
            value: latest.main.aqi,
            category: aqi_category(latest.main.aqi).into(),
        },
        pollutants: Pollutants {
            co: c.co,
            no2: c.no2,
            o3: c.o3,
            pm2_5: c.pm2_5,
            pm10: c.pm10,
        },
    })
}

pub fn news_resource(data: Option<&NewsData>) -> ResourceDoc<NewsDigest> {
    let Some(data) = data else {
        return ResourceDoc::Unavailable {
            uri: NEWS_URI.into(),
            error: "No news data available".into(),
        };
    };
    let articles = data
        .articles
        .iter()
        .take(NEWS_RESOURCE_ARTICLES)
        .map(|a| ArticleSummary {
            title: a.title.clone(),
            description: a.description.clone(),
            source: a.source.name.clone(),
            published_at: a.published_at.clone(),
            url: a.url.clone(),
        })
        .collect();
    ResourceDoc::Ready(NewsDigest {
        uri: NEWS_URI.into(),
        total_results: data.total_results,
        articles,
    })
}

/// One-paragraph air quality summary for tool output
pub fn air_quality_text(doc: &ResourceDoc<AirQualityReport>) -> String {
    let report = match doc {
        ResourceDoc::Ready(report) => report,
        ResourceDoc::Unavailable { error, .. } => return format!("Air quality unavailable: {error}"),
    };
    let mut out = format!(
        "Air quality at ({}, {}): {} (AQI {}).",
        report.location.latitude,
        report.location.longitude,
        report.air_quality_index.category,
        report.air_quality_index.value
    );
    let p = &report.pollutants;
    let readings = [
        ("PM2.5", p.pm2_5),
        ("PM10", p.pm10),
        ("O3", p.o3),
        ("NO2", p.no2),
        ("CO", p.co),
    ];
    for (name, value) in readings {
        if let Some(v) = value {
            let _ = write!(out, " {name} {v:.1} µg/m³.");
        }
    }
    out
}

/// Numbered article list for tool output.
///
/// Each article is a "N. Title" line followed by indented description,
/// `Source:` and `URL:` lines, with a blank line between articles.
pub fn news_text(doc: &ResourceDoc<NewsDigest>) -> String {
    let digest = match doc {
        ResourceDoc::Ready(digest) => digest,
        ResourceDoc::Unavailable { error, .. } => return format!("News unavailable: {error}"),
    };
    if digest.articles.is_empty() {
        return "No environmental news found.".into();
    }
    let mut out = String::from("Latest environmental news:\n");
    for (i, article) in digest.articles.iter().enumerate() {
        let title = article.title.as_deref().unwrap_or("Untitled");
        let _ = write!(out, "\n{}. {}\n", i + 1, title.trim());
        if let Some(desc) = article.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "   {desc}");
        }
        if let Some(source) = &article.source {
            let _ = writeln!(out, "   Source: {source}");
        }
        if let Some(url) = &article.url {
            let _ = writeln!(out, "   URL: {url}");
        }
    }
    out
}
