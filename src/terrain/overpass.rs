use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::ExternalServiceError;
use crate::terrain::{FeatureTags, TerrainSource};

const SERVICE: &str = "Overpass";

/// OpenStreetMap Overpass API client.
pub struct OverpassClient {
    client: Client,
    url: String,
    radius_m: u32,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    tags: Option<FeatureTags>,
}

impl OverpassClient {
    pub fn new(url: impl Into<String>, radius_m: u32, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            radius_m,
            timeout,
        }
    }

    fn query(&self, lat: f64, lon: f64) -> String {
        let around = format!("around:{},{lat},{lon}", self.radius_m);
        let timeout_s = self.timeout.as_secs().max(1);
        format!(
            "[out:json][timeout:{timeout_s}];\n(\n  nwr({around})[landuse];\n  nwr({around})[natural];\n  nwr({around})[leisure];\n  nwr({around})[water];\n  way({around})[waterway];\n  node({around})[place];\n);\nout tags;"
        )
    }
}

#[async_trait]
impl TerrainSource for OverpassClient {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn features_near(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<Vec<FeatureTags>, ExternalServiceError> {
        tracing::debug!(lat, lon, radius_m = self.radius_m, "Querying Overpass");

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "text/plain")
            .timeout(self.timeout)
            .body(self.query(lat, lon))
            .send()
            .await
            .map_err(|e| ExternalServiceError::from_reqwest(SERVICE, self.timeout, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExternalServiceError::from_status(SERVICE, status, body));
        }

        let payload: OverpassResponse =
            response
                .json()
                .await
                .map_err(|e| ExternalServiceError::InvalidPayload {
                    service: SERVICE,
                    message: e.to_string(),
                })?;

        Ok(feature_tags(payload))
    }
}

fn feature_tags(payload: OverpassResponse) -> Vec<FeatureTags> {
    payload
        .elements
        .into_iter()
        .filter_map(|element| element.tags)
        .filter(|tags| !tags.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_uses_radius_and_coordinates() {
        let client = OverpassClient::new("http://localhost", 100, Duration::from_secs(15));
        let query = client.query(46.5, 7.25);
        assert!(query.starts_with("[out:json][timeout:15];"));
        assert!(query.contains("nwr(around:100,46.5,7.25)[landuse];"));
        assert!(query.contains("node(around:100,46.5,7.25)[place];"));
        assert!(!query.contains("around:1000"));
        assert!(query.ends_with("out tags;"));
    }

    #[test]
    fn elements_without_tags_are_dropped() {
        let payload: OverpassResponse = serde_json::from_str(
            r#"{
                "version": 0.6,
                "elements": [
                    {"type": "way", "id": 1, "tags": {"landuse": "forest", "name": "Bois"}},
                    {"type": "node", "id": 2},
                    {"type": "node", "id": 3, "tags": {}},
                    {"type": "node", "id": 4, "tags": {"place": "village"}}
                ]
            }"#,
        )
        .unwrap();

        let features = feature_tags(payload);
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["landuse"], "forest");
        assert_eq!(features[1]["place"], "village");
    }
}
