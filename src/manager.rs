//! Model manager panel state: downloads, uploads and the download log

use std::path::{Path, PathBuf};

use crate::backend::{
    Backend, BackendRequest, BackendResponse, ConnectionStatus, DownloadRequest, RequestId,
    UploadRequest,
};

/// Upload categories, in the order the upload selector lists them
pub const UPLOAD_MODES: [&str; 7] = [
    "Checkpoint",
    "LoRA",
    "Hypernetwork",
    "Embedding",
    "Upscaler",
    "Other",
    "ControlNet",
];

/// Tabs of the manager panel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ManagerTab {
    #[default]
    Remote,
    Models,
    Log,
}

impl ManagerTab {
    pub const ALL: [ManagerTab; 3] = [ManagerTab::Remote, ManagerTab::Models, ManagerTab::Log];

    pub fn label(self) -> &'static str {
        match self {
            ManagerTab::Remote => "Remote",
            ManagerTab::Models => "Models",
            ManagerTab::Log => "Log",
        }
    }
}

/// Selector position for a model kind, `None` for unknown kinds
pub fn upload_mode_for(kind: &str) -> Option<usize> {
    match kind {
        "checkpoint" | "component" => Some(0),
        "lora" => Some(1),
        "hypernet" => Some(2),
        "embedding" => Some(3),
        "upscale" => Some(4),
        "controlnet" => Some(6),
        _ => None,
    }
}

/// Model kind sent with an upload from selector position `mode`
pub fn upload_kind(mode: usize) -> &'static str {
    match mode {
        0 => "checkpoint",
        1 => "lora",
        2 => "hypernet",
        3 => "embedding",
        4 => "upscale",
        6 => "controlnet",
        _ => "other",
    }
}

#[derive(Default)]
pub struct ManagerState {
    pub current_tab: ManagerTab,
    /// File picked for upload
    pub current_upload: Option<PathBuf>,
    /// Index into [`UPLOAD_MODES`]
    pub upload_mode: usize,
    log: String,
}

impl ManagerState {
    pub fn log(&self) -> &str {
        &self.log
    }

    /// Point the upload selector at a model kind
    pub fn set_upload_mode(&mut self, kind: &str) {
        match upload_mode_for(kind) {
            Some(mode) => self.upload_mode = mode,
            None => log::warn!("Unknown model kind: {}", kind),
        }
    }

    /// Ask the backend to download a model. Needs a connection and a URL.
    pub fn download(
        &self,
        backend: &mut dyn Backend,
        status: ConnectionStatus,
        kind: &str,
        url: &str,
        token: Option<&str>,
    ) -> Option<RequestId> {
        let url = url.trim();
        if url.is_empty() || status != ConnectionStatus::Connected {
            return None;
        }
        let request = DownloadRequest {
            kind: kind.to_string(),
            url: url.to_string(),
            token: token.filter(|t| !t.is_empty()).map(str::to_string),
        };
        Some(backend.make_request(BackendRequest::Download(request)))
    }

    /// Ask the backend to take a local model file. Needs a connection.
    pub fn upload(
        &self,
        backend: &mut dyn Backend,
        status: ConnectionStatus,
        kind: &str,
        file: &Path,
    ) -> Option<RequestId> {
        if status != ConnectionStatus::Connected || !file.is_absolute() {
            return None;
        }
        let request = UploadRequest {
            kind: kind.to_string(),
            file: file.to_path_buf(),
        };
        Some(backend.make_request(BackendRequest::Upload(request)))
    }

    /// Ask the backend for its current model lists
    pub fn refresh(&self, backend: &mut dyn Backend) -> RequestId {
        backend.make_request(BackendRequest::Options)
    }

    /// Record download progress; a finished download triggers a refresh
    pub fn on_response(&mut self, backend: &mut dyn Backend, response: &BackendResponse) {
        let BackendResponse::Downloaded { message, .. } = response else {
            return;
        };
        self.log.push_str(message);
        self.log.push('\n');
        self.refresh(backend);
    }

    /// Clear the log before the backend restarts
    pub fn restart(&mut self) {
        self.log.clear();
        log::info!("Backend restart requested");
    }
}
