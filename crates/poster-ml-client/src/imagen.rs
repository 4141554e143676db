//! Vertex AI Imagen client.
//!
//! Both edits and generations go through the model's `:predict` endpoint;
//! the first prediction's image is returned.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, info_span, Instrument};

use crate::auth::AccessTokenSource;
use crate::config::VertexConfig;
use crate::error::{MlClientError, MlResult};
use crate::http::{build_client, post_json};
use crate::synthesizer::{EditRequest, ImageSynthesizer};

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<Value>,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
}

fn encoded(bytes: &[u8]) -> Value {
    json!({ "bytesBase64Encoded": BASE64.encode(bytes) })
}

fn edit_body(request: &EditRequest) -> PredictRequest {
    let mut instance = json!({
        "prompt": request.prompt,
        "image": encoded(&request.base_image),
        "mask": { "image": encoded(&request.mask) },
    });
    if let Some(reference) = &request.reference_image {
        instance["referenceImages"] = json!([{
            "referenceType": "REFERENCE_TYPE_SUBJECT",
            "referenceId": 1,
            "referenceImage": encoded(reference),
        }]);
    }

    PredictRequest {
        instances: vec![instance],
        parameters: json!({
            "sampleCount": 1,
            "editConfig": { "editMode": request.mode.as_str() },
            "guidanceScale": request.guidance,
        }),
    }
}

fn generate_body(prompt: &str, aspect_ratio: &str, guidance: f32) -> PredictRequest {
    PredictRequest {
        instances: vec![json!({ "prompt": prompt })],
        parameters: json!({
            "sampleCount": 1,
            "aspectRatio": aspect_ratio,
            "guidanceScale": guidance,
        }),
    }
}

fn first_image(response: PredictResponse) -> MlResult<Vec<u8>> {
    let encoded = response
        .predictions
        .into_iter()
        .find_map(|p| p.bytes_base64_encoded)
        .ok_or_else(|| MlClientError::invalid_response("Image generation returned no results"))?;

    BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| MlClientError::invalid_response(format!("Bad image payload: {}", e)))
}

/// Imagen editing and generation over REST.
#[derive(Clone)]
pub struct ImagenClient {
    http: Client,
    tokens: Arc<dyn AccessTokenSource>,
    url: String,
}

impl ImagenClient {
    /// Create a client. Fails when no project is configured.
    pub fn new(config: &VertexConfig, tokens: Arc<dyn AccessTokenSource>) -> MlResult<Self> {
        let project_id = config
            .project_id
            .as_deref()
            .ok_or_else(|| MlClientError::not_configured("Vertex AI not configured (missing PROJECT_ID)"))?;

        Ok(Self {
            http: build_client(config.timeout)?,
            tokens,
            url: config.predict_url(project_id),
        })
    }

    async fn predict(&self, body: &PredictRequest) -> MlResult<Vec<u8>> {
        let response: PredictResponse = post_json(&self.http, &self.tokens, &self.url, body).await?;
        first_image(response)
    }
}

#[async_trait]
impl ImageSynthesizer for ImagenClient {
    async fn edit(&self, request: EditRequest) -> MlResult<Vec<u8>> {
        let body = edit_body(&request);
        let image = self
            .predict(&body)
            .instrument(info_span!("imagen_edit", mode = %request.mode))
            .await?;
        info!(bytes = image.len(), "Imagen edit complete");
        Ok(image)
    }

    async fn generate(&self, prompt: &str, aspect_ratio: &str, guidance: f32) -> MlResult<Vec<u8>> {
        let body = generate_body(prompt, aspect_ratio, guidance);
        let image = self
            .predict(&body)
            .instrument(info_span!("imagen_generate", aspect_ratio))
            .await?;
        info!(bytes = image.len(), "Imagen generation complete");
        Ok(image)
    }

    fn name(&self) -> &'static str {
        "imagen"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::synthesizer::EditMode;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PREDICT_PATH: &str =
        "/v1/projects/demo/locations/us-central1/publishers/google/models/imagegeneration@006:predict";

    fn client_for(server: &MockServer) -> ImagenClient {
        let config = VertexConfig {
            project_id: Some("demo".to_string()),
            vertex_base_url: Some(server.uri()),
            ..Default::default()
        };
        ImagenClient::new(&config, Arc::new(StaticToken("t".to_string()))).unwrap()
    }

    fn edit_request() -> EditRequest {
        EditRequest {
            base_image: vec![1, 2, 3],
            mask: vec![4, 5],
            prompt: "A cinematic movie poster.".to_string(),
            reference_image: Some(vec![9]),
            mode: EditMode::InpaintingInsert,
            guidance: 60.0,
        }
    }

    #[test]
    fn test_requires_project() {
        let err = ImagenClient::new(&VertexConfig::default(), Arc::new(StaticToken("t".to_string())))
            .err()
            .unwrap();
        assert!(err.is_not_configured());
    }

    #[test]
    fn test_edit_body_shape() {
        let body = serde_json::to_value(edit_body(&edit_request())).unwrap();
        assert_eq!(body["parameters"]["editConfig"]["editMode"], "inpainting-insert");
        assert_eq!(body["parameters"]["guidanceScale"], 60.0);
        assert_eq!(body["instances"][0]["image"]["bytesBase64Encoded"], "AQID");
        assert_eq!(body["instances"][0]["mask"]["image"]["bytesBase64Encoded"], "BAU=");
        assert_eq!(
            body["instances"][0]["referenceImages"][0]["referenceType"],
            "REFERENCE_TYPE_SUBJECT"
        );
    }

    #[test]
    fn test_first_image_requires_prediction() {
        let empty: PredictResponse = serde_json::from_value(json!({"predictions": []})).unwrap();
        assert!(matches!(first_image(empty), Err(MlClientError::InvalidResponse(_))));

        let ok: PredictResponse =
            serde_json::from_value(json!({"predictions": [{"bytesBase64Encoded": "aGk=", "mimeType": "image/png"}]}))
                .unwrap();
        assert_eq!(first_image(ok).unwrap(), b"hi".to_vec());
    }

    #[tokio::test]
    async fn test_edit_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PREDICT_PATH))
            .and(body_partial_json(json!({"parameters": {"sampleCount": 1}})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"predictions": [{"bytesBase64Encoded": "cG9zdGVy"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let image = client_for(&server).edit(edit_request()).await.unwrap();
        assert_eq!(image, b"poster".to_vec());
    }

    #[tokio::test]
    async fn test_generate_sends_aspect_ratio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PREDICT_PATH))
            .and(body_partial_json(json!({"parameters": {"aspectRatio": "3:4"}})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"predictions": [{"bytesBase64Encoded": "Ymc="}]})),
            )
            .mount(&server)
            .await;

        let image = client_for(&server).generate("a desert", "3:4", 15.0).await.unwrap();
        assert_eq!(image, b"bg".to_vec());
    }

    #[tokio::test]
    async fn test_edit_surfaces_service_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = client_for(&server).edit(edit_request()).await.unwrap_err();
        assert!(matches!(err, MlClientError::Http { status: 400, .. }));
        assert!(err.to_string().contains("quota exceeded"));
    }
}
