//! Location and weather context for a generation request.
//!
//! Neither lookup is critical: a slow or failed lookup yields the fallback
//! context instead of an error.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ClientError;

pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_secs(9);
pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com/v1";
pub const DEFAULT_GEOCODE_URL: &str = "https://api.bigdatacloud.net/data";

const UNKNOWN_LOCATION: &str = "Unknown location";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temp: i32,
    pub condition: String,
    pub icon: String,
    pub description: String,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            temp: 22,
            condition: "clear".into(),
            icon: "☀️".into(),
            description: "Clear skies".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AmbientContext {
    pub location: String,
    /// ISO country code of the resolved place, when geocoding succeeded.
    pub country_code: Option<String>,
    pub weather: Weather,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

pub fn fallback_context() -> AmbientContext {
    AmbientContext {
        location: UNKNOWN_LOCATION.into(),
        country_code: None,
        weather: Weather::default(),
    }
}

/// Builds a [`Weather`] from an Open-Meteo weather code and temperature.
pub fn describe_weather_code(code: u32, temperature: f64) -> Weather {
    let (icon, description) = if code <= 2 {
        ("☀️", "Sunny")
    } else if code <= 45 {
        ("🌤️", "Partly cloudy")
    } else {
        ("🌧️", "Moody skies")
    };
    Weather {
        temp: temperature.round() as i32,
        condition: code.to_string(),
        icon: icon.into(),
        description: description.into(),
    }
}

/// Current-weather lookup against Open-Meteo.
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ForecastResponse {
    current_weather: Option<CurrentWeather>,
}

#[derive(Deserialize)]
struct CurrentWeather {
    temperature: f64,
    weathercode: u32,
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new(DEFAULT_WEATHER_URL)
    }
}

impl WeatherClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Current weather at `coords`, `None` when the service has nothing usable.
    pub async fn current(&self, coords: Coordinates) -> Option<Weather> {
        let url = format!(
            "{}/forecast?latitude={}&longitude={}&current_weather=true",
            self.base_url, coords.latitude, coords.longitude
        );

        let res = match self.client.get(&url).send().await {
            Ok(res) if res.status().is_success() => res,
            Ok(res) => {
                tracing::debug!(status = %res.status(), "weather lookup failed");
                return None;
            }
            Err(e) => {
                tracing::debug!("weather lookup failed: {}", e);
                return None;
            }
        };

        let current = res.json::<ForecastResponse>().await.ok()?.current_weather?;
        Some(describe_weather_code(current.weathercode, current.temperature))
    }
}

/// Human-readable place resolved from coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Place {
    pub location: String,
    pub country_code: String,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ReverseGeocode {
    city: String,
    locality: String,
    principal_subdivision: String,
    country_name: String,
    country_code: String,
}

impl ReverseGeocode {
    /// `"City, Region"`, falling back to the country name alone.
    fn into_place(self) -> Place {
        let city = [&self.city, &self.locality, &self.principal_subdivision]
            .into_iter()
            .find(|s| !s.is_empty())
            .cloned()
            .unwrap_or_default();
        let location = if !city.is_empty() {
            let region = if self.principal_subdivision.is_empty() {
                &self.country_name
            } else {
                &self.principal_subdivision
            };
            format!("{}, {}", city, region)
        } else if !self.country_name.is_empty() {
            self.country_name
        } else {
            UNKNOWN_LOCATION.to_owned()
        };
        let country_code = if self.country_code.is_empty() {
            "US".to_owned()
        } else {
            self.country_code
        };
        Place {
            location,
            country_code,
        }
    }
}

/// Reverse-geocoding lookup against BigDataCloud's client endpoint.
#[derive(Clone)]
pub struct GeocodeClient {
    client: Client,
    base_url: String,
}

impl Default for GeocodeClient {
    fn default() -> Self {
        Self::new(DEFAULT_GEOCODE_URL)
    }
}

impl GeocodeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// The place at `coords`, `None` when the service has nothing usable.
    pub async fn place(&self, coords: Coordinates) -> Option<Place> {
        let url = format!(
            "{}/reverse-geocode-client?latitude={}&longitude={}&localityLanguage=en",
            self.base_url, coords.latitude, coords.longitude
        );

        let res = match self.client.get(&url).send().await {
            Ok(res) if res.status().is_success() => res,
            Ok(res) => {
                tracing::debug!(status = %res.status(), "reverse geocoding failed");
                return None;
            }
            Err(e) => {
                tracing::debug!("reverse geocoding failed: {}", e);
                return None;
            }
        };

        let data = res.json::<ReverseGeocode>().await.ok()?;
        Some(data.into_place())
    }
}

/// Services consulted once coordinates are known.
#[derive(Clone, Default)]
pub struct ContextSources {
    pub weather: WeatherClient,
    pub geocode: GeocodeClient,
}

impl ContextSources {
    pub fn new(weather: WeatherClient, geocode: GeocodeClient) -> Self {
        Self { weather, geocode }
    }
}

/// Resolves the generation context.
///
/// `locate` is given `timeout` to produce coordinates; past that, or on any
/// failure, the fallback context is returned. Reverse geocoding and the
/// weather lookup then run together, and each keeps its default on failure.
pub async fn resolve_context<F>(
    sources: &ContextSources,
    locate: F,
    timeout: Duration,
) -> AmbientContext
where
    F: Future<Output = Result<Coordinates, ClientError>>,
{
    let coords = match tokio::time::timeout(timeout, locate).await {
        Ok(Ok(coords)) => coords,
        Ok(Err(e)) => {
            tracing::debug!("location lookup failed: {}", e);
            return fallback_context();
        }
        Err(_) => {
            tracing::debug!(?timeout, "location lookup timed out");
            return fallback_context();
        }
    };

    let (place, current) = tokio::join!(
        sources.geocode.place(coords),
        sources.weather.current(coords)
    );

    let mut context = fallback_context();
    if let Some(place) = place {
        context.location = place.location;
        context.country_code = Some(place.country_code);
    }
    if let Some(current) = current {
        context.weather = current;
    }
    context
}
