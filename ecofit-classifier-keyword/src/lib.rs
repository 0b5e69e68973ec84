//! Rule-based classifier backend: keyword matching for descriptions and an
//! orientation heuristic for photos.
//!
//! Useful on its own in tests and as the default backend when no inference
//! endpoint is deployed.

use std::cmp::Ordering;
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageReader;
use tracing::warn;

use ecofit_core::{
    model::{Classification, WasteType},
    ports::ClassifierPort,
};

/// Identifier this backend registers under.
pub const BACKEND_ID: &str = "keyword";

const KEYWORD_CONFIDENCE: f64 = 0.8;
const NO_MATCH_CONFIDENCE: f64 = 0.6;

/// Keyword groups, tried in order. "bottle" is claimed by plastic before glass.
const KEYWORDS: [(WasteType, &[&str]); 7] = [
    (WasteType::Plastic, &["plastic", "bottle", "container", "bag"]),
    (WasteType::Paper, &["paper", "cardboard", "newspaper", "book"]),
    (WasteType::Glass, &["glass", "jar", "bottle"]),
    (WasteType::Metal, &["metal", "can", "aluminum", "steel"]),
    (WasteType::Organic, &["food", "organic", "compost", "banana", "apple"]),
    (WasteType::Electronic, &["electronic", "phone", "computer", "battery"]),
    (WasteType::Hazardous, &["chemical", "paint", "oil", "hazardous"]),
];

#[derive(Debug, Clone, Copy, Default)]
/// Keyword and orientation based classifier.
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Create the classifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ClassifierPort for KeywordClassifier {
    fn id(&self) -> &str {
        BACKEND_ID
    }

    async fn classify_image(&self, image_data: &str) -> Classification {
        match image_dimensions(image_data) {
            Ok((width, height)) => classify_orientation(width, height),
            Err(reason) => {
                warn!(%reason, "Error processing image");
                Classification::fallback()
            }
        }
    }

    async fn classify_text(&self, description: &str) -> Classification {
        classify_keywords(description)
    }
}

/// Build the shared backend handle for registration.
#[must_use]
pub fn backend() -> Arc<dyn ClassifierPort> {
    Arc::new(KeywordClassifier::new())
}

fn classify_keywords(description: &str) -> Classification {
    let lowered = description.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|word| lowered.contains(word)))
        .map_or_else(
            || Classification::new(WasteType::Other, NO_MATCH_CONFIDENCE),
            |(waste_type, _)| Classification::new(*waste_type, KEYWORD_CONFIDENCE),
        )
}

/// Landscape shots tend to be bottles lying down, square ones flat paper,
/// portrait ones standing jars.
fn classify_orientation(width: u32, height: u32) -> Classification {
    match width.cmp(&height) {
        Ordering::Greater => Classification::new(WasteType::Plastic, 0.85),
        Ordering::Equal => Classification::new(WasteType::Paper, 0.78),
        Ordering::Less => Classification::new(WasteType::Glass, 0.82),
    }
}

fn image_dimensions(image_data: &str) -> Result<(u32, u32), String> {
    // Accept data URLs as sent by browsers: "data:image/png;base64,<payload>".
    let payload = image_data
        .split_once(";base64,")
        .map_or(image_data, |(_, payload)| payload)
        .trim();
    let bytes = STANDARD
        .decode(payload)
        .map_err(|err| format!("invalid base64: {err}"))?;
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| format!("unreadable image: {err}"))?
        .into_dimensions()
        .map_err(|err| format!("unsupported image: {err}"))
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageFormat};

    use super::*;

    fn png_base64(width: u32, height: u32) -> String {
        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");
        STANDARD.encode(bytes)
    }

    #[tokio::test]
    async fn descriptions_match_keywords_case_insensitively() {
        let classifier = KeywordClassifier::new();
        let cases = [
            ("Empty PLASTIC tray", WasteType::Plastic),
            ("wine bottle", WasteType::Plastic),
            ("old newspaper", WasteType::Paper),
            ("jam jar", WasteType::Glass),
            ("soda can", WasteType::Metal),
            ("rotten apple", WasteType::Organic),
            ("broken phone", WasteType::Electronic),
            ("leftover paint", WasteType::Hazardous),
        ];
        for (description, expected) in cases {
            let result = classifier.classify_text(description).await;
            assert_eq!(result.waste_type, expected, "{description}");
            assert!((result.confidence - KEYWORD_CONFIDENCE).abs() < f64::EPSILON);
        }
    }

    #[tokio::test]
    async fn unmatched_description_is_other_with_lower_confidence() {
        let result = KeywordClassifier::new().classify_text("mystery item").await;
        assert_eq!(result.waste_type, WasteType::Other);
        assert!((result.confidence - NO_MATCH_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn image_orientation_selects_type() {
        let classifier = KeywordClassifier::new();
        let landscape = classifier.classify_image(&png_base64(40, 20)).await;
        let square = classifier.classify_image(&png_base64(16, 16)).await;
        let portrait = classifier.classify_image(&png_base64(10, 30)).await;

        assert_eq!(landscape, Classification::new(WasteType::Plastic, 0.85));
        assert_eq!(square, Classification::new(WasteType::Paper, 0.78));
        assert_eq!(portrait, Classification::new(WasteType::Glass, 0.82));
    }

    #[tokio::test]
    async fn data_url_prefix_is_accepted() {
        let data_url = format!("data:image/png;base64,{}", png_base64(12, 12));
        let result = KeywordClassifier::new().classify_image(&data_url).await;
        assert_eq!(result.waste_type, WasteType::Paper);
    }

    #[tokio::test]
    async fn bad_image_data_falls_back() {
        let classifier = KeywordClassifier::new();
        assert_eq!(
            classifier.classify_image("%%% not base64 %%%").await,
            Classification::fallback()
        );
        let not_an_image = STANDARD.encode(b"plain text, not pixels");
        assert_eq!(
            classifier.classify_image(&not_an_image).await,
            Classification::fallback()
        );
    }

    #[test]
    fn backend_registers_under_keyword() {
        assert_eq!(backend().id(), BACKEND_ID);
    }
}
