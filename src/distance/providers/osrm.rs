use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

use crate::distance::matrix::{DistanceError, DistanceProvider};
use crate::domain::types::Location;
use crate::utils::preview;

pub struct OsrmTable {
    client: Client,
    base_url: String,
}

impl OsrmTable {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn is_public(&self) -> bool {
        self.base_url.contains("router.project-osrm.org")
    }
}

#[async_trait]
impl DistanceProvider for OsrmTable {
    async fn distance_km(
        &self,
        origin: Location,
        destination: Location,
    ) -> Result<f64, DistanceError> {
        // OSRM wants longitude,latitude in that order
        let coord_str = format!(
            "{},{};{},{}",
            origin.lng, origin.lat, destination.lng, destination.lat
        );
        let url = format!("{}/{}?annotations=distance", self.base_url, coord_str);
        debug!("Built OSRM URL: {}", url);

        let mut request_builder = self.client.get(&url);
        if self.is_public() {
            request_builder = request_builder.header("User-Agent", "Cemento-Storefront/1.0");
            trace!("Using public OSRM, added User-Agent");
        }

        let response = request_builder
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| {
                error!("OSRM request failed: {}", e);
                if e.to_string().contains("handshake") || e.to_string().contains("TLS") {
                    warn!("TLS/handshake failure, likely blocked by public OSRM. Switch to self-hosted.");
                }
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(
                "OSRM returned HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            );
            return Err(DistanceError::Http(status.as_u16()));
        }

        let text = response.text().await?;
        let json: Value = serde_json::from_str(&text).map_err(|e| {
            error!(
                "Failed to parse OSRM JSON: {} (first 200 chars: {})",
                e,
                preview(&text, 200)
            );
            DistanceError::Malformed(e.to_string())
        })?;

        let km = table_distance_km(&json)?;
        info!("OSRM resolved {:.3} km", km);
        Ok(km)
    }
}

/// Read `distances[0][1]` (origin row, destination column) from a table response.
pub(crate) fn table_distance_km(json: &Value) -> Result<f64, DistanceError> {
    if let Some(code) = json["code"].as_str() {
        if code != "Ok" {
            return Err(DistanceError::Status(code.to_string()));
        }
    }

    let distances = json["distances"].as_array().ok_or_else(|| {
        error!(
            "No 'distances' array in OSRM response. Keys: {:?}",
            json.as_object().map(|o| o.keys().collect::<Vec<_>>())
        );
        DistanceError::Malformed("missing distances".to_string())
    })?;

    let cell = distances
        .first()
        .and_then(|row| row.as_array())
        .and_then(|row| row.get(1))
        .ok_or_else(|| DistanceError::Malformed("distances smaller than 1x2".to_string()))?;

    // Unreachable pairs come back as null
    cell.as_f64()
        .map(|meters| meters / 1000.0)
        .ok_or(DistanceError::NoRoute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer a single request with `200 OK` and `body`, returning the table base URL.
    async fn serve_once(body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/table/v1/driving")
    }

    #[tokio::test]
    async fn non_json_body_is_malformed_while_logging_errors() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::ERROR)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        // The 200th byte falls inside the two-byte 'é'.
        let base_url = serve_once(format!("{}é…", "x".repeat(199))).await;
        let osrm = OsrmTable::new(Client::builder().no_proxy().build().unwrap(), base_url);

        let result = osrm
            .distance_km(Location::new(25.68, -100.31), Location::new(25.75, -100.40))
            .await;

        assert!(matches!(result, Err(DistanceError::Malformed(_))));
    }

    #[test]
    fn reads_origin_to_destination_cell() {
        let json = json!({
            "code": "Ok",
            "distances": [[0.0, 12345.0], [12001.0, 0.0]]
        });

        let km = table_distance_km(&json).unwrap();
        assert!((km - 12.345).abs() < 1e-9);
    }

    #[test]
    fn null_cell_means_no_route() {
        let json = json!({ "code": "Ok", "distances": [[0.0, null], [null, 0.0]] });
        assert!(matches!(table_distance_km(&json), Err(DistanceError::NoRoute)));
    }

    #[test]
    fn error_code_is_surfaced() {
        let json = json!({ "code": "InvalidQuery", "message": "bad coords" });
        assert!(matches!(
            table_distance_km(&json),
            Err(DistanceError::Status(code)) if code == "InvalidQuery"
        ));
    }

    #[test]
    fn public_router_is_detected() {
        let osrm = OsrmTable::new(
            Client::new(),
            "https://router.project-osrm.org/table/v1/driving/".to_string(),
        );
        assert!(osrm.is_public());
        assert_eq!(osrm.base_url, "https://router.project-osrm.org/table/v1/driving");
    }
}
