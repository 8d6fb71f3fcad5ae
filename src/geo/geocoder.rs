//! Reverse geocoding via Nominatim

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::GeocodingConfig;

/// Returned whenever a lookup fails or yields nothing
pub const ADDRESS_NOT_FOUND: &str = "Address not found";

/// Turns coordinates into a human-readable address.
/// Never fails: lookup problems degrade to [`ADDRESS_NOT_FOUND`].
#[async_trait]
pub trait ReverseGeocoder: Send + Sync + 'static {
    async fn address_for(&self, lat: f64, lon: f64) -> String;
}

/// Nominatim `/reverse` response (format=jsonv2)
#[derive(Debug, Default, Deserialize)]
pub struct ReverseResponse {
    pub display_name: Option<String>,
    #[serde(default)]
    pub address: Map<String, Value>,
    pub error: Option<String>,
}

/// Build a friendly address: place name, street, locality, state, postcode, country
pub fn format_address(response: &ReverseResponse) -> Option<String> {
    if response.error.is_some() {
        return None;
    }

    let addr = &response.address;
    let get = |key: &str| -> Option<&str> {
        addr.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    };
    let first_of = |keys: &[&str]| keys.iter().find_map(|k| get(k));

    let mut parts: Vec<String> = Vec::new();

    if let Some(name) = first_of(&["name", "amenity", "building", "shop", "poi"]) {
        parts.push(name.to_string());
    }

    let road: Vec<&str> = [get("house_number"), get("road")].into_iter().flatten().collect();
    if !road.is_empty() {
        parts.push(road.join(" "));
    }

    if let Some(area) = first_of(&["neighbourhood", "suburb", "city_district", "city", "town", "village"]) {
        parts.push(area.to_string());
    }

    for key in ["state", "postcode", "country"] {
        if let Some(value) = get(key) {
            parts.push(value.to_string());
        }
    }

    if parts.is_empty() {
        response.display_name.clone().filter(|d| !d.is_empty())
    } else {
        Some(parts.join(", "))
    }
}

/// Nominatim HTTP client
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
    zoom: u8,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build geocoding client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            zoom: config.zoom,
        })
    }

    async fn lookup(&self, lat: f64, lon: f64) -> Result<ReverseResponse> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("zoom", self.zoom.to_string()),
                ("addressdetails", "1".to_string()),
                ("accept-language", "en".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn address_for(&self, lat: f64, lon: f64) -> String {
        match self.lookup(lat, lon).await {
            Ok(response) => format_address(&response).unwrap_or_else(|| ADDRESS_NOT_FOUND.to_string()),
            Err(e) => {
                warn!("Reverse geocoding error: {}", e);
                ADDRESS_NOT_FOUND.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn response(address: Value, display: Option<&str>) -> ReverseResponse {
        ReverseResponse {
            display_name: display.map(str::to_string),
            address: address.as_object().cloned().unwrap_or_default(),
            error: None,
        }
    }

    #[test]
    fn test_format_full_address() {
        let r = response(
            serde_json::json!({
                "amenity": "City Hospital",
                "house_number": "12",
                "road": "Mall Road",
                "suburb": "Civil Lines",
                "city": "Kanpur",
                "state": "Uttar Pradesh",
                "postcode": "208001",
                "country": "India"
            }),
            Some("ignored"),
        );
        assert_eq!(
            format_address(&r).unwrap(),
            "City Hospital, 12 Mall Road, Civil Lines, Uttar Pradesh, 208001, India"
        );
    }

    #[test]
    fn test_format_falls_back_to_display_name() {
        let r = response(serde_json::json!({}), Some("Somewhere, Earth"));
        assert_eq!(format_address(&r).unwrap(), "Somewhere, Earth");

        let empty = response(serde_json::json!({}), None);
        assert!(format_address(&empty).is_none());
    }

    #[test]
    fn test_format_error_response() {
        let r = ReverseResponse {
            error: Some("Unable to geocode".to_string()),
            ..Default::default()
        };
        assert!(format_address(&r).is_none());
    }

    fn config(endpoint: String) -> GeocodingConfig {
        GeocodingConfig {
            endpoint,
            user_agent: "nivedan-test".to_string(),
            timeout_secs: 5,
            zoom: 18,
        }
    }

    #[tokio::test]
    async fn test_lookup_sends_expected_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/reverse")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "jsonv2".into()),
                Matcher::UrlEncoded("zoom".into(), "18".into()),
                Matcher::UrlEncoded("lat".into(), "26.5".into()),
            ]))
            .match_header("user-agent", "nivedan-test")
            .with_status(200)
            .with_body(r#"{"display_name": "x", "address": {"road": "GT Road", "city": "Kanpur", "country": "India"}}"#)
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&config(format!("{}/reverse", server.url()))).unwrap();
        let address = geocoder.address_for(26.5, 80.3).await;

        mock.assert_async().await;
        assert_eq!(address, "GT Road, Kanpur, India");
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/reverse")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let geocoder = NominatimGeocoder::new(&config(format!("{}/reverse", server.url()))).unwrap();
        assert_eq!(geocoder.address_for(0.0, 0.0).await, ADDRESS_NOT_FOUND);
    }
}
