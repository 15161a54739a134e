//! Current weather from an HTTP endpoint
//!
//! The endpoint returns the OpenWeatherMap "current weather" document. Fetches
//! run on the caller's executor; each one is tagged with a generation number
//! so a slow response can never overwrite a newer one.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::Instrument;

use crate::clock::Clock;
use crate::config::WeatherSettings;
use crate::error::{WeatherError, WeatherResult};
use crate::observable::Property;
use crate::tracing::{field_names, span_names};

/// Retrieves the raw weather document
#[async_trait(?Send)]
pub trait WeatherSource {
    /// Returns the response body of a successful request
    async fn fetch(&self) -> WeatherResult<String>;
}

/// `reqwest` GET of a fixed URL
#[derive(Debug, Clone)]
pub struct HttpWeatherSource {
    client: reqwest::Client,
    url: String,
}

impl HttpWeatherSource {
    /// Builds a client for `url`
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::NotConfigured`] for an empty URL, or a request
    /// error if the client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> WeatherResult<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(WeatherError::NotConfigured);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::Request(e.to_string()))?;
        Ok(Self { client, url })
    }

    /// Builds a client from the `[weather]` config section
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_settings(settings: &WeatherSettings) -> WeatherResult<Self> {
        Self::new(&settings.url, Duration::from_secs(settings.timeout_secs))
    }
}

#[async_trait(?Send)]
impl WeatherSource for HttpWeatherSource {
    async fn fetch(&self) -> WeatherResult<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| WeatherError::Request(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(WeatherError::Status(status.as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| WeatherError::Request(e.to_string()))
    }
}

/// The fields of a weather document the bar displays
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    /// Condition group, with `Clear` split into `Clear-Day`/`Clear-Night`
    pub group: String,
    /// Human-readable description
    pub description: String,
    /// Temperature in the endpoint's units
    pub temperature: f64,
}

#[derive(Deserialize)]
struct ApiResponse {
    weather: Vec<ApiCondition>,
    main: ApiMain,
    sys: ApiSys,
}

#[derive(Deserialize)]
struct ApiCondition {
    main: String,
    description: String,
}

#[derive(Deserialize)]
struct ApiMain {
    temp: f64,
}

#[derive(Deserialize)]
struct ApiSys {
    sunrise: i64,
    sunset: i64,
}

impl WeatherReport {
    /// Parses a response body; `now` (unix seconds) decides day or night for
    /// clear skies.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Malformed`] if a required field is missing.
    pub fn from_json(body: &str, now: i64) -> WeatherResult<Self> {
        let response: ApiResponse =
            serde_json::from_str(body).map_err(|e| WeatherError::Malformed(e.to_string()))?;
        let condition = response
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::Malformed("empty weather list".to_string()))?;

        Ok(Self {
            group: classify_group(&condition.main, response.sys.sunrise, response.sys.sunset, now),
            description: condition.description,
            temperature: response.main.temp,
        })
    }
}

/// `Clear` becomes `Clear-Day` between sunrise and sunset (inclusive), else
/// `Clear-Night`; other groups pass through.
#[must_use]
pub fn classify_group(group: &str, sunrise: i64, sunset: i64, now: i64) -> String {
    if group != "Clear" {
        return group.to_string();
    }
    if (sunrise..=sunset).contains(&now) {
        "Clear-Day".to_string()
    } else {
        "Clear-Night".to_string()
    }
}

/// Latest weather values for the bar
pub struct WeatherService {
    source: Option<Box<dyn WeatherSource>>,
    clock: Rc<dyn Clock>,
    next_generation: Cell<u64>,
    applied_generation: Cell<u64>,
    /// Condition group
    pub group: Property<String>,
    /// Description text
    pub description: Property<String>,
    /// Temperature
    pub temperature: Property<f64>,
    /// Whether the last applied fetch succeeded
    pub status: Property<bool>,
}

impl std::fmt::Debug for WeatherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherService")
            .field("configured", &self.source.is_some())
            .field("group", &self.group.get())
            .field("status", &self.status.get())
            .finish_non_exhaustive()
    }
}

impl WeatherService {
    /// Creates the service; without a source every refresh reports failure
    #[must_use]
    pub fn new(source: Option<Box<dyn WeatherSource>>, clock: Rc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            next_generation: Cell::new(0),
            applied_generation: Cell::new(0),
            group: Property::new(String::new()),
            description: Property::new(String::new()),
            temperature: Property::new(0.0),
            status: Property::new(false),
        }
    }

    /// Whether a source is configured
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    /// Fetches once and applies the result unless a newer fetch already landed
    pub async fn refresh(&self) {
        let generation = self.begin_refresh();
        let result = match &self.source {
            Some(source) => {
                tracing::info!(generation, "Fetching weather data");
                source
                    .fetch()
                    .instrument(crate::trace_operation!(span_names::WEATHER_FETCH, generation))
                    .await
            }
            None => Err(WeatherError::NotConfigured),
        };
        let result = result.and_then(|body| WeatherReport::from_json(&body, self.clock.unix_timestamp()));
        self.apply(generation, result);
    }

    /// Reserves the next generation number
    pub fn begin_refresh(&self) -> u64 {
        let generation = self.next_generation.get() + 1;
        self.next_generation.set(generation);
        generation
    }

    /// Applies a fetch result. Returns `false` if it was discarded because a
    /// later generation was already applied.
    pub fn apply(&self, generation: u64, result: WeatherResult<WeatherReport>) -> bool {
        if generation < self.applied_generation.get() {
            tracing::debug!(generation, "Discarding stale weather response");
            return false;
        }
        self.applied_generation.set(generation);

        match result {
            Ok(report) => {
                self.status.set(true);
                self.group.set(report.group);
                self.description.set(report.description);
                self.temperature.set(report.temperature);
            }
            Err(e) => {
                tracing::warn!({ field_names::ERROR } = %e, "Could not fetch weather data");
                self.status.set(false);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::DateTime;

    const BODY: &str = r#"{
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky"}],
        "main": {"temp": 18.5, "humidity": 40},
        "sys": {"sunrise": 1000, "sunset": 2000}
    }"#;

    struct Canned(WeatherResult<&'static str>);

    #[async_trait(?Send)]
    impl WeatherSource for Canned {
        async fn fetch(&self) -> WeatherResult<String> {
            match &self.0 {
                Ok(body) => Ok((*body).to_string()),
                Err(_) => Err(WeatherError::Status(503)),
            }
        }
    }

    fn clock_at(unix: i64) -> Rc<ManualClock> {
        let now = DateTime::from_timestamp(unix, 0).unwrap().naive_local();
        Rc::new(ManualClock::new(now))
    }

    #[test]
    fn test_clear_split_by_daylight() {
        assert_eq!(classify_group("Clear", 1000, 2000, 1000), "Clear-Day");
        assert_eq!(classify_group("Clear", 1000, 2000, 2000), "Clear-Day");
        assert_eq!(classify_group("Clear", 1000, 2000, 2001), "Clear-Night");
        assert_eq!(classify_group("Clear", 1000, 2000, 999), "Clear-Night");
        assert_eq!(classify_group("Rain", 1000, 2000, 1500), "Rain");
    }

    #[test]
    fn test_parse_report() {
        let report = WeatherReport::from_json(BODY, 1500).unwrap();
        assert_eq!(report.group, "Clear-Day");
        assert_eq!(report.description, "clear sky");
        assert!((report.temperature - 18.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            WeatherReport::from_json(r#"{"weather": []}"#, 0),
            Err(WeatherError::Malformed(_))
        ));
        let no_conditions = r#"{"weather": [], "main": {"temp": 1}, "sys": {"sunrise": 0, "sunset": 1}}"#;
        assert!(WeatherReport::from_json(no_conditions, 0).is_err());
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let service = WeatherService::new(None, clock_at(0));
        let first = service.begin_refresh();
        let second = service.begin_refresh();

        let newer = WeatherReport {
            group: "Rain".to_string(),
            description: "light rain".to_string(),
            temperature: 9.0,
        };
        assert!(service.apply(second, Ok(newer)));
        assert!(!service.apply(first, Err(WeatherError::Status(500))));
        assert!(service.status.get());
        assert_eq!(service.group.get(), "Rain");
    }

    #[tokio::test]
    async fn test_refresh_success_then_failure() {
        let service = WeatherService::new(Some(Box::new(Canned(Ok(BODY)))), clock_at(3000));
        service.refresh().await;
        assert!(service.status.get());
        assert_eq!(service.group.get(), "Clear-Night");

        let failing = WeatherService::new(
            Some(Box::new(Canned(Err(WeatherError::Status(503))))),
            clock_at(0),
        );
        failing.refresh().await;
        assert!(!failing.status.get());
    }

    #[tokio::test]
    async fn test_unconfigured_refresh_reports_failure() {
        let service = WeatherService::new(None, clock_at(0));
        service.status.set(true);
        service.refresh().await;
        assert!(!service.status.get());
    }

    #[test]
    fn test_http_source_requires_url() {
        assert!(matches!(
            HttpWeatherSource::new("  ", Duration::from_secs(1)),
            Err(WeatherError::NotConfigured)
        ));
    }
}
