//! Request channel to the inference backend
//!
//! The backend itself runs out of process. Requests are queued here with an
//! id; a bridge drains them, forwards them, and pushes responses back for
//! the UI thread to pick up on its next frame.
//!
//! On the wire a request is its JSON form plus an `"id"` field. Replies are
//! JSON arrays of `{"type": ..., "data": ...}` messages with images as
//! base64 PNG.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::RgbaImage;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::PathBuf;

use crate::workspace::extent::Rect;
use crate::workspace::parameters::{GenerationParameters, Metadata};

/// Identifier handed out for every request
pub type RequestId = i64;

/// Which pipeline a generation request targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Txt2Img,
    Img2Img,
    Inpaint,
}

/// A generation request built from the workspace inputs
#[derive(Clone, Debug, Serialize)]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    pub parameters: GenerationParameters,
    /// PNG-encoded source images, in sequence order
    #[serde(serialize_with = "as_base64")]
    pub images: Vec<Vec<u8>>,
    /// PNG-encoded linked masks, in sequence order
    #[serde(serialize_with = "as_base64")]
    pub masks: Vec<Vec<u8>>,
    /// Inpainting extent of each mask, parallel to `masks`
    pub extents: Vec<Option<Rect>>,
}

fn as_base64<S: Serializer>(blobs: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(blobs.iter().map(|blob| BASE64.encode(blob)))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DownloadRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UploadRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub file: PathBuf,
}

/// Everything the UI can ask of the backend
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BackendRequest {
    Generate(GenerationRequest),
    Download(DownloadRequest),
    Upload(UploadRequest),
    Options,
    Cancel { id: RequestId },
}

impl BackendRequest {
    pub fn name(&self) -> &'static str {
        match self {
            BackendRequest::Generate(_) => "generate",
            BackendRequest::Download(_) => "download",
            BackendRequest::Upload(_) => "upload",
            BackendRequest::Options => "options",
            BackendRequest::Cancel { .. } => "cancel",
        }
    }
}

/// One generated image with the metadata the backend attached
#[derive(Clone, Debug)]
pub struct GeneratedImage {
    pub image: RgbaImage,
    pub metadata: Metadata,
}

/// Messages coming back from the backend
#[derive(Clone, Debug)]
pub enum BackendResponse {
    Result {
        id: RequestId,
        images: Vec<GeneratedImage>,
    },
    Downloaded {
        id: RequestId,
        message: String,
    },
    Error {
        id: RequestId,
        message: String,
    },
}

#[derive(Deserialize)]
struct WireImage {
    image: String,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Deserialize)]
struct WireResult {
    id: RequestId,
    images: Vec<WireImage>,
}

#[derive(Deserialize)]
struct WireMessage {
    id: RequestId,
    #[serde(default)]
    message: String,
}

/// Serialize a request for the bridge, tagged with its id
pub fn encode_request(id: RequestId, request: &BackendRequest) -> Result<String, String> {
    let mut value = serde_json::to_value(request).map_err(|e| e.to_string())?;
    if let Value::Object(map) = &mut value {
        map.insert("id".to_string(), Value::from(id));
    }
    serde_json::to_string(&value).map_err(|e| e.to_string())
}

fn decode_image(encoded: &str) -> Result<RgbaImage, String> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| format!("Invalid image data: {}", e))?;
    let image = image::load_from_memory(&bytes).map_err(|e| format!("Invalid image: {}", e))?;
    Ok(image.into_rgba8())
}

/// Parse a bridge reply into responses. Message types the UI does not
/// handle are skipped.
pub fn decode_responses(body: &str) -> Result<Vec<BackendResponse>, String> {
    let messages: Vec<Value> =
        serde_json::from_str(body).map_err(|e| format!("Invalid reply: {}", e))?;

    let mut responses = Vec::new();
    for mut message in messages {
        let kind = message
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let data = message.get_mut("data").map(Value::take).unwrap_or(Value::Null);
        match kind.as_str() {
            "result" => {
                let result: WireResult =
                    serde_json::from_value(data).map_err(|e| format!("Invalid result: {}", e))?;
                let images = result
                    .images
                    .into_iter()
                    .map(|wire| {
                        Ok(GeneratedImage {
                            image: decode_image(&wire.image)?,
                            metadata: wire.metadata,
                        })
                    })
                    .collect::<Result<Vec<_>, String>>()?;
                responses.push(BackendResponse::Result {
                    id: result.id,
                    images,
                });
            }
            "downloaded" | "error" => {
                let WireMessage { id, message } =
                    serde_json::from_value(data).map_err(|e| format!("Invalid {}: {}", kind, e))?;
                responses.push(if kind == "error" {
                    BackendResponse::Error { id, message }
                } else {
                    BackendResponse::Downloaded { id, message }
                });
            }
            other => log::debug!("Skipping {} message", other),
        }
    }
    Ok(responses)
}

/// Connection state of the backend bridge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
        }
    }
}

/// Dispatch seam used by the workspace and the model manager
pub trait Backend {
    /// Queue a request and return its id
    fn make_request(&mut self, request: BackendRequest) -> RequestId;

    /// Ask the backend to abandon a request
    fn cancel_request(&mut self, id: RequestId);
}

/// In-process request queue shared with the backend bridge
#[derive(Default)]
pub struct RequestQueue {
    next_id: RequestId,
    pending: VecDeque<(RequestId, BackendRequest)>,
    responses: VecDeque<BackendResponse>,
    status: ConnectionStatus,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            log::info!("Backend {}", status.label().to_lowercase());
        }
        self.status = status;
    }

    /// Mark the bridge as gone and drop everything it never picked up
    pub fn disconnect(&mut self) -> usize {
        self.set_status(ConnectionStatus::Disconnected);
        let dropped = self.pending.len();
        if dropped > 0 {
            log::warn!("Dropped {} unsent request(s)", dropped);
        }
        self.pending.clear();
        dropped
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Take every queued request, oldest first
    pub fn drain_requests(&mut self) -> Vec<(RequestId, BackendRequest)> {
        self.pending.drain(..).collect()
    }

    /// Hand a response back to the UI
    pub fn push_response(&mut self, response: BackendResponse) {
        self.responses.push_back(response);
    }

    /// Take every response received since the last call
    pub fn take_responses(&mut self) -> Vec<BackendResponse> {
        self.responses.drain(..).collect()
    }
}

impl Backend for RequestQueue {
    fn make_request(&mut self, request: BackendRequest) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        log::info!("Queued {} request {}", request.name(), id);
        self.pending.push_back((id, request));
        id
    }

    fn cancel_request(&mut self, id: RequestId) {
        let before = self.pending.len();
        self.pending.retain(|(pending, _)| *pending != id);
        if self.pending.len() != before {
            log::info!("Dropped queued request {}", id);
            return;
        }
        // Already forwarded, the bridge has to cancel it remotely
        self.make_request(BackendRequest::Cancel { id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_increase() {
        let mut queue = RequestQueue::new();
        let a = queue.make_request(BackendRequest::Options);
        let b = queue.make_request(BackendRequest::Options);
        assert!(b > a);
        assert_eq!(queue.pending_count(), 2);
    }

    #[test]
    fn test_cancel_queued_request() {
        let mut queue = RequestQueue::new();
        let id = queue.make_request(BackendRequest::Options);
        queue.cancel_request(id);
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_cancel_forwarded_request() {
        let mut queue = RequestQueue::new();
        let id = queue.make_request(BackendRequest::Options);
        assert_eq!(queue.drain_requests().len(), 1);

        queue.cancel_request(id);
        let pending = queue.drain_requests();
        assert_eq!(pending.len(), 1);
        assert!(matches!(pending[0].1, BackendRequest::Cancel { id: cancelled } if cancelled == id));
    }

    #[test]
    fn test_request_wire_format() {
        let request = BackendRequest::Download(DownloadRequest {
            kind: "lora".to_string(),
            url: "https://example.com/x.safetensors".to_string(),
            token: None,
        });
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "download",
                "data": {"type": "lora", "url": "https://example.com/x.safetensors"}
            })
        );

        let json = serde_json::to_value(&BackendRequest::Options).unwrap();
        assert_eq!(json, serde_json::json!({"type": "options"}));
    }

    #[test]
    fn test_disconnect_drops_unsent() {
        let mut queue = RequestQueue::new();
        queue.set_status(ConnectionStatus::Connected);
        queue.make_request(BackendRequest::Options);
        queue.make_request(BackendRequest::Options);

        assert_eq!(queue.disconnect(), 2);
        assert_eq!(queue.pending_count(), 0);
        assert_eq!(queue.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_encode_request_adds_id() {
        let json = encode_request(7, &BackendRequest::Cancel { id: 3 }).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "cancel", "data": {"id": 3}, "id": 7})
        );
    }

    #[test]
    fn test_generate_images_are_base64() {
        let request = BackendRequest::Generate(GenerationRequest {
            kind: GenerationKind::Img2Img,
            parameters: GenerationParameters::default(),
            images: vec![vec![1, 2, 3]],
            masks: Vec::new(),
            extents: Vec::new(),
        });
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["data"]["images"], serde_json::json!(["AQID"]));
        assert_eq!(value["data"]["kind"], "img2img");
    }

    #[test]
    fn test_decode_responses() {
        let png = crate::workspace::encode_png(&RgbaImage::new(3, 2)).unwrap();
        let body = serde_json::json!([
            {"type": "result", "data": {
                "id": 4,
                "images": [{"image": BASE64.encode(&png), "metadata": {"seed": 9}}]
            }},
            {"type": "downloaded", "data": {"id": 5, "message": "50%"}},
            {"type": "error", "data": {"id": 6, "message": "out of memory"}},
            {"type": "options", "data": {"models": []}}
        ])
        .to_string();

        let responses = decode_responses(&body).unwrap();
        assert_eq!(responses.len(), 3);
        match &responses[0] {
            BackendResponse::Result { id, images } => {
                assert_eq!(*id, 4);
                assert_eq!(images[0].image.dimensions(), (3, 2));
                assert_eq!(images[0].metadata["seed"], 9);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&responses[1], BackendResponse::Downloaded { id: 5, message } if message == "50%"));
        assert!(matches!(&responses[2], BackendResponse::Error { id: 6, .. }));
    }

    #[test]
    fn test_decode_responses_rejects_bad_image() {
        let body = r#"[{"type": "result", "data": {"id": 1, "images": [{"image": "!!"}]}}]"#;
        assert!(decode_responses(body).is_err());
        assert!(decode_responses("not json").is_err());
    }

    #[test]
    fn test_responses_round_trip_through_queue() {
        let mut queue = RequestQueue::new();
        queue.push_response(BackendResponse::Downloaded {
            id: 0,
            message: "done".to_string(),
        });
        assert_eq!(queue.take_responses().len(), 1);
        assert!(queue.take_responses().is_empty());
    }
}
