//! Tip pipeline constants.

/// Delay before the first fetch after startup (seconds)
pub const TIP_WARMUP_SECS: u64 = 10;
/// Delay between fetch cycles (seconds)
pub const TIP_PERIOD_SECS: u64 = 60;
/// How often the UI looks at the tip queue (seconds)
pub const TIP_POLL_SECS: u64 = 5;
/// Longest tip shown in a bubble (characters, ellipsis included)
pub const TIP_MAX_CHARS: usize = 80;
/// Longest article title kept alongside a tip (characters, before ellipsis)
pub const ARTICLE_LABEL_MAX_CHARS: usize = 50;
/// Rating used when the scorer's answer cannot be read
pub const NEUTRAL_RATING: u8 = 5;
/// Highest sentiment rating
pub const MAX_RATING: u8 = 10;
/// How long shutdown waits for the producer thread (seconds)
pub const PRODUCER_STOP_TIMEOUT_SECS: u64 = 2;
/// Default location for air-quality lookups (Troy, NY)
pub const DEFAULT_LATITUDE: f64 = 42.728;
pub const DEFAULT_LONGITUDE: f64 = -73.687;
/// Articles kept in the news resource
pub const NEWS_RESOURCE_ARTICLES: usize = 5;
/// How far back the news query looks (days)
pub const NEWS_LOOKBACK_DAYS: i64 = 30;
/// Air-quality text included in the tip prompt (characters)
pub const PROMPT_AIR_MAX_CHARS: usize = 200;
/// Length the text generator is asked to keep tips under (characters)
pub const TIP_TARGET_CHARS: usize = 60;

/// Default text-generation model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const AIR_POLLUTION_URL: &str = "https://api.openweathermap.org/data/2.5/air_pollution";
pub const NEWS_URL: &str = "https://newsapi.org/v2/everything";
pub const NEWS_QUERY: &str = "environmental protection OR climate change OR renewable energy -business";
pub const NEWS_EXCLUDED_DOMAINS: &str = "hbr.org,finance.yahoo.com";
