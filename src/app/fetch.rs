use eframe::egui;
use std::sync::mpsc;

/// Outcome of a background download
pub enum FetchResult {
    Fetched { url: String, bytes: Vec<u8> },
    Failed { url: String, error: String },
}

/// Downloads pasted image URLs off the UI thread
pub struct Fetcher {
    tx: mpsc::Sender<FetchResult>,
    rx: mpsc::Receiver<FetchResult>,
}

impl Default for Fetcher {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

fn download(url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    Ok(response.bytes()?.to_vec())
}

impl Fetcher {
    /// Start downloading `url`; the result shows up in `poll`
    pub fn fetch(&self, ctx: &egui::Context, url: String) {
        log::info!("Fetching {}", url);
        let tx = self.tx.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = match download(&url) {
                Ok(bytes) => FetchResult::Fetched { url, bytes },
                Err(e) => FetchResult::Failed {
                    url,
                    error: e.to_string(),
                },
            };
            let _ = tx.send(result);
            ctx.request_repaint();
        });
    }

    /// Finished downloads since the last call
    pub fn poll(&self) -> Vec<FetchResult> {
        self.rx.try_iter().collect()
    }
}
