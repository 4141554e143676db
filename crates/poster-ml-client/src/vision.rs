//! Cloud Vision face detection client.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use poster_media::{FaceDetector, MediaError, MediaResult};
use poster_models::{DetectedFace, Point};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, Instrument};

use crate::auth::AccessTokenSource;
use crate::config::VertexConfig;
use crate::error::{MlClientError, MlResult};
use crate::http::{build_client, post_json};

const MAX_FACES: u32 = 10;

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: [AnnotateImageRequest<'a>; 1],
}

#[derive(Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: [Feature<'a>; 1],
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    face_annotations: Vec<FaceAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FaceAnnotation {
    bounding_poly: Option<BoundingPoly>,
    #[serde(default)]
    detection_confidence: f64,
}

#[derive(Debug, Deserialize)]
struct BoundingPoly {
    #[serde(default)]
    vertices: Vec<Vertex>,
}

/// Vision omits zero-valued coordinates.
#[derive(Debug, Deserialize)]
struct Vertex {
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

fn to_detected(annotation: FaceAnnotation) -> Option<DetectedFace> {
    let vertices = annotation.bounding_poly?.vertices;
    if vertices.is_empty() {
        return None;
    }

    let corner = |i: usize| {
        let v = &vertices[i.min(vertices.len() - 1)];
        Point::new(v.x, v.y)
    };
    Some(DetectedFace {
        corners: [corner(0), corner(1), corner(2), corner(3)],
        confidence: annotation.detection_confidence,
    })
}

fn parse_faces(response: AnnotateResponse) -> MlResult<Vec<DetectedFace>> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(Vec::new());
    };
    if let Some(error) = first.error {
        return Err(MlClientError::invalid_response(format!("Vision error: {}", error.message)));
    }
    Ok(first.face_annotations.into_iter().filter_map(to_detected).collect())
}

/// Face detector backed by the Vision `images:annotate` endpoint.
#[derive(Clone)]
pub struct VisionClient {
    http: Client,
    tokens: Arc<dyn AccessTokenSource>,
    url: String,
}

impl VisionClient {
    pub fn new(config: &VertexConfig, tokens: Arc<dyn AccessTokenSource>) -> MlResult<Self> {
        Ok(Self {
            http: build_client(config.timeout)?,
            tokens,
            url: format!("{}/v1/images:annotate", config.vision_base_url.trim_end_matches('/')),
        })
    }

    /// Detect faces in `image`.
    pub async fn detect_faces(&self, image: &[u8]) -> MlResult<Vec<DetectedFace>> {
        let request = AnnotateRequest {
            requests: [AnnotateImageRequest {
                image: ImageContent {
                    content: BASE64.encode(image),
                },
                features: [Feature {
                    kind: "FACE_DETECTION",
                    max_results: MAX_FACES,
                }],
            }],
        };

        let response: AnnotateResponse = post_json(&self.http, &self.tokens, &self.url, &request)
            .instrument(info_span!("vision_annotate", bytes = image.len()))
            .await?;
        let faces = parse_faces(response)?;
        debug!(faces = faces.len(), "Vision face detection complete");
        Ok(faces)
    }
}

#[async_trait]
impl FaceDetector for VisionClient {
    async fn detect(&self, image: &[u8]) -> MediaResult<Vec<DetectedFace>> {
        self.detect_faces(image)
            .await
            .map_err(|e| MediaError::detection_failed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "cloud_vision"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> VisionClient {
        let config = VertexConfig {
            vision_base_url: server.uri(),
            ..Default::default()
        };
        VisionClient::new(&config, Arc::new(StaticToken("test-token".to_string()))).unwrap()
    }

    #[test]
    fn test_parse_missing_coordinates_default_to_zero() {
        let response: AnnotateResponse = serde_json::from_value(json!({
            "responses": [{
                "faceAnnotations": [{
                    "boundingPoly": {"vertices": [{}, {"x": 40}, {"x": 40, "y": 50}, {"y": 50}]},
                    "detectionConfidence": 0.93
                }]
            }]
        }))
        .unwrap();

        let faces = parse_faces(response).unwrap();
        assert_eq!(faces.len(), 1);
        let region = faces[0].region();
        assert_eq!((region.x, region.y, region.width, region.height), (0.0, 0.0, 40.0, 50.0));
        assert_eq!(region.confidence, Some(0.93));
    }

    #[test]
    fn test_parse_empty_and_error_responses() {
        let empty: AnnotateResponse = serde_json::from_value(json!({"responses": [{}]})).unwrap();
        assert!(parse_faces(empty).unwrap().is_empty());

        let failed: AnnotateResponse = serde_json::from_value(json!({
            "responses": [{"error": {"code": 3, "message": "Bad image data."}}]
        }))
        .unwrap();
        assert!(parse_faces(failed).is_err());
    }

    #[tokio::test]
    async fn test_detect_posts_face_detection_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images:annotate"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(json!({
                "requests": [{"features": [{"type": "FACE_DETECTION"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responses": [{
                    "faceAnnotations": [
                        {"boundingPoly": {"vertices": [{"x": 10, "y": 10}, {"x": 20, "y": 10}, {"x": 20, "y": 20}, {"x": 10, "y": 20}]}, "detectionConfidence": 0.8},
                        {"boundingPoly": {"vertices": [{"x": 100, "y": 100}, {"x": 180, "y": 100}, {"x": 180, "y": 190}, {"x": 100, "y": 190}]}, "detectionConfidence": 0.9}
                    ]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let faces = client_for(&server).detect(b"jpeg bytes").await.unwrap();
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[1].region().width, 80.0);
    }

    #[tokio::test]
    async fn test_detect_maps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = client_for(&server).detect(b"img").await.unwrap_err();
        assert!(matches!(err, MediaError::DetectionFailed(_)));
    }
}
