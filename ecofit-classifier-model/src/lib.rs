//! Classifier backend delegating to a remote inference endpoint.
//!
//! The endpoint receives `POST {base_url}/classify` with either
//! `{"image_data": "<base64>"}` or `{"description": "<text>"}` and answers
//! `{"label": "<waste type>", "confidence": <0..1>}`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use ecofit_core::{
    model::{Classification, WasteType},
    ports::ClassifierPort,
};

/// Identifier this backend registers under.
pub const BACKEND_ID: &str = "model";

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_data: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    label: String,
    confidence: f64,
}

/// Classifier backed by a model server.
pub struct ModelClassifier {
    client: Client,
    endpoint: String,
}

impl ModelClassifier {
    /// Create a classifier talking to the inference server at `base_url`.
    #[must_use]
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/classify", base_url.trim_end_matches('/')),
        }
    }

    /// Full URL of the classification endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn classify(&self, request: ClassifyRequest<'_>) -> Classification {
        let req = self.client.post(&self.endpoint).json(&request);
        match fetch_json::<ClassifyResponse>(req).await {
            Ok(response) => Classification::new(
                WasteType::from_label(&response.label),
                response.confidence,
            ),
            Err(err) => {
                warn!(endpoint = %self.endpoint, error = %err, "model classification failed");
                Classification::fallback()
            }
        }
    }
}

#[async_trait]
impl ClassifierPort for ModelClassifier {
    fn id(&self) -> &str {
        BACKEND_ID
    }

    async fn classify_image(&self, image_data: &str) -> Classification {
        self.classify(ClassifyRequest {
            image_data: Some(image_data),
            description: None,
        })
        .await
    }

    async fn classify_text(&self, description: &str) -> Classification {
        self.classify(ClassifyRequest {
            image_data: None,
            description: Some(description),
        })
        .await
    }
}

/// Build the shared backend handle for registration.
#[must_use]
pub fn backend(client: Client, base_url: &str) -> Arc<dyn ClassifierPort> {
    Arc::new(ModelClassifier::new(client, base_url))
}

async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, reqwest::Error> {
    req.send().await?.error_for_status()?.json().await
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 1024];
        loop {
            let read = socket.read(&mut chunk).await.expect("read request");
            buf.extend_from_slice(chunk.get(..read).unwrap_or_default());
            let text = String::from_utf8_lossy(&buf).into_owned();
            if let Some((head, body)) = text.split_once("\r\n\r\n") {
                let length = head
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if body.len() >= length || read == 0 {
                    return body.to_owned();
                }
            } else if read == 0 {
                return String::new();
            }
        }
    }

    /// Serve a single canned response and hand back the request body.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let request_body = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write");
            socket.shutdown().await.expect("shutdown");
            request_body
        });
        (format!("http://{addr}"), handle)
    }

    fn client() -> Client {
        Client::builder().no_proxy().build().expect("client")
    }

    #[tokio::test]
    async fn model_label_is_parsed_and_confidence_clamped() {
        let (base_url, server) = serve_once("200 OK", r#"{"label":"light_bulbs","confidence":1.4}"#).await;
        let classifier = ModelClassifier::new(client(), &base_url);

        let result = classifier.classify_text("old bulb").await;
        assert_eq!(result, Classification::new(WasteType::LightBulbs, 1.0));

        let sent = server.await.expect("server task");
        assert!(sent.contains(r#""description":"old bulb""#), "{sent}");
        assert!(!sent.contains("image_data"), "{sent}");
    }

    #[tokio::test]
    async fn unrecognised_label_becomes_unknown() {
        let (base_url, _server) = serve_once("200 OK", r#"{"label":"styrofoam","confidence":0.9}"#).await;
        let result = ModelClassifier::new(client(), &base_url)
            .classify_image("aGVsbG8=")
            .await;
        assert_eq!(result, Classification::new(WasteType::Unknown, 0.9));
    }

    #[tokio::test]
    async fn server_error_falls_back() {
        let (base_url, _server) = serve_once("503 Service Unavailable", r#"{"detail":"loading"}"#).await;
        let result = ModelClassifier::new(client(), &base_url)
            .classify_text("anything")
            .await;
        assert_eq!(result, Classification::fallback());
    }

    #[tokio::test]
    async fn unreachable_endpoint_falls_back() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let result = ModelClassifier::new(client(), &format!("http://{addr}/"))
            .classify_image("aGVsbG8=")
            .await;
        assert_eq!(result, Classification::fallback());
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let classifier = ModelClassifier::new(client(), "http://models.local:9000/");
        assert_eq!(classifier.endpoint(), "http://models.local:9000/classify");
    }
}
