//! Device location: where is the user right now?

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use wxpro_core::LocationError;

use crate::types::Location;

const IPINFO_URL: &str = "https://ipinfo.io/json";

/// Host geolocation capability.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_location(&self) -> Result<Location, LocationError>;
}

/// Resolve the device location, giving up after `timeout`. No retries.
pub async fn resolve_device_location(
    source: &dyn LocationSource,
    timeout: Duration,
) -> Result<Location, LocationError> {
    match tokio::time::timeout(timeout, source.current_location()).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("Device location timed out after {:?}", timeout);
            Err(LocationError::Timeout)
        }
    }
}

/// For hosts without any geolocation capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocationSource;

#[async_trait]
impl LocationSource for NoLocationSource {
    async fn current_location(&self) -> Result<Location, LocationError> {
        Err(LocationError::Unavailable)
    }
}

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    #[serde(default)]
    city: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    country: String,
    /// "latitude,longitude"
    loc: Option<String>,
}

impl IpInfoResponse {
    fn coordinates(&self) -> Option<(f64, f64)> {
        let (lat, lon) = self.loc.as_deref()?.split_once(',')?;
        Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
    }
}

/// Approximate location from the public IP address.
#[derive(Debug, Clone)]
pub struct IpLocationSource {
    client: Client,
    url: String,
}

impl IpLocationSource {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            url: IPINFO_URL.to_string(),
        }
    }

    pub fn with_url(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl LocationSource for IpLocationSource {
    async fn current_location(&self) -> Result<Location, LocationError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LocationError::Other(e.to_string()))?;

        match response.status().as_u16() {
            200..=299 => {}
            // No prompt to deny here; the service refusing us is the stand-in
            401 | 403 => return Err(LocationError::PermissionDenied),
            status => {
                tracing::debug!("IP location lookup returned status {}", status);
                return Err(LocationError::Unavailable);
            }
        }

        let body: IpInfoResponse = response
            .json()
            .await
            .map_err(|e| LocationError::Other(e.to_string()))?;

        let (lat, lon) = body
            .coordinates()
            .ok_or_else(|| LocationError::Other("Malformed coordinates".to_string()))?;

        tracing::info!("Got location: {}, {}", lat, lon);
        Ok(Location {
            name: body.city,
            country: body.country,
            state: Some(body.region).filter(|r| !r.is_empty()),
            lat,
            lon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct SlowSource;

    #[async_trait]
    impl LocationSource for SlowSource {
        async fn current_location(&self) -> Result<Location, LocationError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Location::from_coordinates(0.0, 0.0))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolution_is_bounded() {
        let result = resolve_device_location(&SlowSource, Duration::from_secs(10)).await;
        assert!(matches!(result, Err(LocationError::Timeout)));
    }

    #[tokio::test]
    async fn test_no_capability_is_unavailable() {
        let result = resolve_device_location(&NoLocationSource, Duration::from_secs(10)).await;
        assert!(matches!(result, Err(LocationError::Unavailable)));
    }

    #[tokio::test]
    async fn test_ip_lookup() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "city": "London",
                "region": "England",
                "country": "GB",
                "loc": "51.5085,-0.1257",
                "timezone": "Europe/London"
            })))
            .mount(&mock_server)
            .await;

        let source = IpLocationSource::with_url(Client::new(), &mock_server.uri());
        let loc = source.current_location().await.unwrap();

        assert_eq!(loc.name, "London");
        assert_eq!(loc.state.as_deref(), Some("England"));
        assert_eq!(loc.lat, 51.5085);
        assert_eq!(loc.lon, -0.1257);
    }

    #[tokio::test]
    async fn test_ip_lookup_forbidden_is_denied() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let source = IpLocationSource::with_url(Client::new(), &mock_server.uri());
        assert!(matches!(
            source.current_location().await,
            Err(LocationError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_ip_lookup_malformed_coordinates() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"loc": "nowhere"})),
            )
            .mount(&mock_server)
            .await;

        let source = IpLocationSource::with_url(Client::new(), &mock_server.uri());
        assert!(matches!(
            source.current_location().await,
            Err(LocationError::Other(_))
        ));
    }
}
