//! Drops, clipboard pastes and copies between the workspace and the outside

use image::RgbaImage;
use std::path::{Path, PathBuf};

use super::input::InputRole;
use super::navigation::Area;
use super::outputs::OutputId;
use super::png_text::decode_with_parameters;
use super::sequence::InputEvent;
use super::{load_image, Workspace};

/// Remote images we are willing to fetch, by file extension
const FETCHABLE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

/// What was dropped onto the input list or onto a single input
#[derive(Clone, Debug)]
pub enum DropPayload {
    /// Another input, by position
    Input(usize),
    /// A generated output, by id
    Output(OutputId),
    /// Raw image data
    Image(RgbaImage),
    /// Local files
    Files(Vec<PathBuf>),
}

/// Snapshot of the system clipboard or a drop
#[derive(Clone, Debug, Default)]
pub struct ClipboardContent {
    pub text: Option<String>,
    pub image: Option<RgbaImage>,
    /// `file://` and `http(s)://` URLs
    pub urls: Vec<String>,
}

/// Results of a paste, for the caller to route
#[derive(Clone, Debug)]
pub enum PasteEvent {
    /// Text to apply as parameters
    Text(String),
    Image(RgbaImage),
    /// A remote image to download; pass the bytes to `on_fetched`
    Fetch(String),
}

/// An image event, followed by the parameters embedded in it
fn image_events(image: RgbaImage, parameters: Option<String>) -> Vec<PasteEvent> {
    let mut events = vec![PasteEvent::Image(image)];
    events.extend(parameters.map(PasteEvent::Text));
    events
}

/// Local path of a `file://` URL
pub fn local_path(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("file://")?;
    // file:///C:/x on Windows
    let rest = if cfg!(windows) {
        rest.strip_prefix('/').unwrap_or(rest)
    } else {
        rest
    };
    Some(PathBuf::from(rest))
}

/// Whether a URL points at a remote image we can download
pub fn is_fetchable(url: &str) -> bool {
    let Some(rest) = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
    else {
        return false;
    };
    let path = rest.split(['?', '#']).next().unwrap_or(rest);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name
        .rsplit('.')
        .next()
        .is_some_and(|ext| FETCHABLE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn try_load(path: &Path) -> Option<RgbaImage> {
    match load_image(path) {
        Ok(image) => Some(image),
        Err(e) => {
            log::warn!("Failed to load {}: {}", path.display(), e);
            None
        }
    }
}

fn try_load_with_parameters(path: &Path) -> Option<(RgbaImage, Option<String>)> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };
    match decode_with_parameters(&bytes) {
        Ok(loaded) => Some(loaded),
        Err(e) => {
            log::warn!("Failed to load {}: {}", path.display(), e);
            None
        }
    }
}

impl Workspace {
    fn output_image(&self, id: OutputId) -> Option<RgbaImage> {
        self.outputs.get(id).map(|output| output.image.clone())
    }

    /// Handle a drop on the input list. `None` appends.
    pub fn add_drop(&mut self, payload: DropPayload, index: Option<usize>) -> Vec<InputEvent> {
        let index = index.unwrap_or(self.inputs.len()).min(self.inputs.len());
        match payload {
            DropPayload::Input(source) => {
                self.move_input(source, index);
                Vec::new()
            }
            DropPayload::Output(id) => match self.output_image(id) {
                Some(image) => self.insert_input(index, InputRole::Image, Some(image)),
                None => Vec::new(),
            },
            DropPayload::Image(image) => self.insert_input(index, InputRole::Image, Some(image)),
            DropPayload::Files(paths) => {
                let mut events = Vec::new();
                let mut at = index;
                for image in paths.iter().filter_map(|p| try_load(p)) {
                    events.extend(self.insert_input(at, InputRole::Image, Some(image)));
                    at += 1;
                }
                events
            }
        }
    }

    /// Handle a drop onto the input at `target`
    pub fn set_input_drop(&mut self, target: usize, payload: DropPayload) -> Vec<InputEvent> {
        match payload {
            DropPayload::Input(source) => {
                self.swap_inputs(source, target);
                Vec::new()
            }
            DropPayload::Output(id) => match self.output_image(id) {
                Some(image) => self.set_input_image(target, Some(image)),
                None => Vec::new(),
            },
            DropPayload::Image(image) => self.set_input_image(target, Some(image)),
            DropPayload::Files(paths) => {
                // The last readable file wins
                match paths.iter().filter_map(|p| try_load(p)).last() {
                    Some(image) => self.set_input_image(target, Some(image)),
                    None => Vec::new(),
                }
            }
        }
    }

    /// Turn clipboard content into paste events
    pub fn paste(&self, content: ClipboardContent) -> Vec<PasteEvent> {
        let mut events = Vec::new();
        if let Some(text) = content.text.filter(|t| !t.trim().is_empty()) {
            events.push(PasteEvent::Text(text));
        }
        if let Some(image) = content.image {
            events.push(PasteEvent::Image(image));
        }
        for url in content.urls {
            if let Some(path) = local_path(&url) {
                events.extend(self.paste_files(&[path]));
            } else if is_fetchable(&url) {
                events.push(PasteEvent::Fetch(url));
            }
        }
        events
    }

    /// Paste events for local files dropped from outside, in order.
    /// Unreadable files are skipped.
    pub fn paste_files(&self, paths: &[PathBuf]) -> Vec<PasteEvent> {
        paths
            .iter()
            .filter_map(|path| try_load_with_parameters(path))
            .flat_map(|(image, parameters)| image_events(image, parameters))
            .collect()
    }

    /// Handle a downloaded image.
    ///
    /// If `url` was fetched for `paste_item` the image becomes a new input;
    /// otherwise it is handed back as a paste, with its embedded parameters.
    pub fn on_fetched(&mut self, url: &str, bytes: &[u8]) -> Vec<PasteEvent> {
        let insert = self.reply_insert.remove(url);
        let (image, parameters) = match decode_with_parameters(bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("Failed to decode image from {}: {}", url, e);
                return Vec::new();
            }
        };
        match insert {
            Some(index) => {
                let index = index.min(self.inputs.len());
                self.insert_input(index, InputRole::Image, Some(image));
                Vec::new()
            }
            None => image_events(image, parameters),
        }
    }

    /// Forget where a failed download was meant to go
    pub fn on_fetch_failed(&mut self, url: &str) {
        if self.reply_insert.remove(url).is_some() {
            log::debug!("Dropped insert position for {}", url);
        }
    }

    /// Image to place on the clipboard for an input or output
    pub fn copy_item(&self, index: i64, area: Area) -> Option<RgbaImage> {
        match area {
            Area::Input => usize::try_from(index)
                .ok()
                .and_then(|i| self.inputs.get(i))
                .and_then(|input| input.image().cloned()),
            Area::Output => self.output_image(index),
        }
    }

    /// Insert clipboard images as new inputs at `index` (`None` appends).
    ///
    /// Remote URLs are returned as fetches; their images land at `index`.
    pub fn paste_item(&mut self, index: Option<usize>, content: ClipboardContent) -> Vec<PasteEvent> {
        let index = index.unwrap_or(self.inputs.len()).min(self.inputs.len());
        let mut images = Vec::new();
        let mut fetches = Vec::new();

        images.extend(content.image);
        for url in content.urls {
            if let Some(path) = local_path(&url) {
                images.extend(try_load(&path));
            } else if is_fetchable(&url) {
                self.reply_insert.insert(url.clone(), index);
                fetches.push(PasteEvent::Fetch(url));
            }
        }

        for (offset, image) in images.into_iter().enumerate() {
            self.insert_input(index + offset, InputRole::Image, Some(image));
        }
        fetches
    }
}
