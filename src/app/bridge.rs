use crate::backend::{decode_responses, encode_request, BackendRequest, BackendResponse, RequestId};
use eframe::egui;
use std::sync::mpsc;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Generation can take minutes on slow hardware
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Something the bridge threads learned
#[derive(Debug)]
pub enum BridgeEvent {
    Connected,
    Failed(String),
    Responses(Vec<BackendResponse>),
}

/// HTTP link to the inference bridge
///
/// Every request is posted from its own thread. Events are tagged with the
/// session they were started in, so nothing from a dropped connection
/// reaches the UI after a disconnect.
pub struct Bridge {
    tx: mpsc::Sender<(u64, BridgeEvent)>,
    rx: mpsc::Receiver<(u64, BridgeEvent)>,
    session: u64,
}

impl Default for Bridge {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx, session: 0 }
    }
}

fn post(endpoint: &str, id: RequestId, request: &BackendRequest) -> Result<Vec<BackendResponse>, String> {
    let body = encode_request(id, request)?;
    let client = reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| e.to_string())?;
    let reply = client
        .post(endpoint)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.text())
        .map_err(|e| e.to_string())?;
    decode_responses(&reply)
}

impl Bridge {
    fn spawn(&self, ctx: &egui::Context, job: impl FnOnce() -> BridgeEvent + Send + 'static) {
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        let session = self.session;
        std::thread::spawn(move || {
            let _ = tx.send((session, job()));
            ctx.request_repaint();
        });
    }

    /// Start a new session with an options handshake
    pub fn connect(&mut self, ctx: &egui::Context, endpoint: &str) {
        self.session += 1;
        log::info!("Connecting to {}", endpoint);
        let endpoint = endpoint.to_string();
        self.spawn(ctx, move || match post(&endpoint, 0, &BackendRequest::Options) {
            Ok(_) => BridgeEvent::Connected,
            Err(e) => BridgeEvent::Failed(e),
        });
    }

    /// Forget the current session; replies still in flight are dropped
    pub fn disconnect(&mut self) {
        self.session += 1;
    }

    /// Post one queued request; its replies show up in `poll`
    pub fn forward(&self, ctx: &egui::Context, endpoint: &str, id: RequestId, request: BackendRequest) {
        log::debug!("Forwarding {} request {}", request.name(), id);
        let endpoint = endpoint.to_string();
        self.spawn(ctx, move || match post(&endpoint, id, &request) {
            Ok(responses) => BridgeEvent::Responses(responses),
            Err(message) => BridgeEvent::Responses(vec![BackendResponse::Error { id, message }]),
        });
    }

    /// Events from the current session since the last call
    pub fn poll(&self) -> Vec<BridgeEvent> {
        self.rx
            .try_iter()
            .filter(|(session, _)| *session == self.session)
            .map(|(_, event)| event)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_drops_events_from_old_sessions() {
        let mut bridge = Bridge::default();
        bridge.tx.send((bridge.session, BridgeEvent::Connected)).unwrap();
        assert!(matches!(bridge.poll()[..], [BridgeEvent::Connected]));

        bridge.tx.send((bridge.session, BridgeEvent::Connected)).unwrap();
        bridge.disconnect();
        bridge
            .tx
            .send((bridge.session, BridgeEvent::Failed("refused".to_string())))
            .unwrap();

        let events = bridge.poll();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], BridgeEvent::Failed(e) if e == "refused"));
    }

    #[test]
    fn test_post_reports_unreachable_endpoint() {
        // Port 9 (discard) is closed on test machines
        let result = post("http://127.0.0.1:9", 1, &BackendRequest::Options);
        assert!(result.is_err());
    }
}
