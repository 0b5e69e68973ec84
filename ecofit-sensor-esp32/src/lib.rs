//! Sensor adapter for the ESP32 ultrasonic distance sensor mounted in the bin lid.
//!
//! The device serves `GET http://{address}/distance` and answers
//! `{"distance_cm": <number>}`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::error;

use ecofit_core::{
    model::SensorReading,
    ports::{SensorError, SensorPort},
};

/// Wait used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct DistancePayload {
    distance_cm: Option<f64>,
}

/// Reads distances from an ESP32 over HTTP.
pub struct Esp32Sensor {
    client: Client,
    address: String,
    url: String,
    timeout: Duration,
}

impl Esp32Sensor {
    /// Create a sensor bound to `address` (host or `host:port`).
    #[must_use]
    pub fn new<A: Into<String>>(client: Client, address: A, timeout: Duration) -> Self {
        let address = address.into();
        Self {
            client,
            url: format!("http://{address}/distance"),
            address,
            timeout,
        }
    }

    /// URL queried for each reading.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_error(&self, err: &reqwest::Error) -> SensorError {
        let address = self.address.clone();
        if err.is_timeout() {
            SensorError::Timeout { address }
        } else if err.is_connect() {
            SensorError::Connection { address }
        } else if err.is_decode() {
            SensorError::MalformedResponse {
                address,
                detail: err.to_string(),
            }
        } else {
            SensorError::Protocol {
                address,
                detail: err.to_string(),
            }
        }
    }

    fn malformed(&self, detail: &str) -> SensorError {
        SensorError::MalformedResponse {
            address: self.address.clone(),
            detail: detail.to_owned(),
        }
    }

    async fn fetch(&self) -> Result<SensorReading, SensorError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| self.transport_error(&err))?
            .error_for_status()
            .map_err(|err| self.transport_error(&err))?;

        let payload: DistancePayload = response
            .json()
            .await
            .map_err(|err| self.transport_error(&err))?;

        let distance_cm = payload
            .distance_cm
            .ok_or_else(|| self.malformed("missing distance_cm"))?;
        if !distance_cm.is_finite() || distance_cm < 0.0 {
            return Err(self.malformed("distance_cm out of range"));
        }

        Ok(SensorReading {
            distance_cm,
            read_at: Utc::now(),
        })
    }
}

#[async_trait]
impl SensorPort for Esp32Sensor {
    fn address(&self) -> &str {
        &self.address
    }

    async fn read_distance(&self) -> Result<SensorReading, SensorError> {
        let reading = self.fetch().await;
        if let Err(err) = &reading {
            error!(address = %self.address, error = %err, "ESP32 reading failed");
        }
        reading
    }
}

/// Build the shared sensor handle.
#[must_use]
pub fn sensor<A: Into<String>>(
    client: Client,
    address: A,
    timeout: Duration,
) -> Arc<dyn SensorPort> {
    Arc::new(Esp32Sensor::new(client, address, timeout))
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn client() -> Client {
        Client::builder().no_proxy().build().expect("client")
    }

    /// Answer one GET with a canned response; returns the device address.
    async fn device(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = Vec::new();
            let mut chunk = [0_u8; 512];
            while !buf.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = socket.read(&mut chunk).await.expect("read");
                if read == 0 {
                    break;
                }
                buf.extend_from_slice(chunk.get(..read).unwrap_or_default());
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write");
            socket.shutdown().await.expect("shutdown");
        });
        addr.to_string()
    }

    #[tokio::test]
    async fn reads_distance_from_device() {
        let address = device("200 OK", r#"{"distance_cm": 12.5}"#).await;
        let sensor = Esp32Sensor::new(client(), address.clone(), DEFAULT_TIMEOUT);
        assert_eq!(sensor.url(), format!("http://{address}/distance"));

        let reading = sensor.read_distance().await.expect("reading");
        assert!((reading.distance_cm - 12.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn missing_distance_is_malformed_not_zero() {
        let address = device("200 OK", r#"{"distance_cm": null}"#).await;
        let err = Esp32Sensor::new(client(), address, DEFAULT_TIMEOUT)
            .read_distance()
            .await
            .expect_err("no distance");
        assert!(matches!(err, SensorError::MalformedResponse { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn negative_distance_is_malformed() {
        let address = device("200 OK", r#"{"distance_cm": -4}"#).await;
        let err = Esp32Sensor::new(client(), address, DEFAULT_TIMEOUT)
            .read_distance()
            .await
            .expect_err("negative distance");
        assert!(matches!(err, SensorError::MalformedResponse { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let address = device("200 OK", "distance=12").await;
        let err = Esp32Sensor::new(client(), address, DEFAULT_TIMEOUT)
            .read_distance()
            .await
            .expect_err("not json");
        assert!(matches!(err, SensorError::MalformedResponse { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn error_status_is_protocol_error() {
        let address = device("500 Internal Server Error", "{}").await;
        let err = Esp32Sensor::new(client(), address, DEFAULT_TIMEOUT)
            .read_distance()
            .await
            .expect_err("device failed");
        assert!(matches!(err, SensorError::Protocol { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn refused_connection_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr").to_string();
        drop(listener);

        let err = Esp32Sensor::new(client(), address.clone(), DEFAULT_TIMEOUT)
            .read_distance()
            .await
            .expect_err("nobody listening");
        assert_eq!(err, SensorError::Connection { address });
    }

    #[tokio::test]
    async fn silent_device_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr").to_string();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let err = Esp32Sensor::new(client(), address.clone(), Duration::from_millis(200))
            .read_distance()
            .await
            .expect_err("no answer");
        assert_eq!(err, SensorError::Timeout { address });
    }
}
