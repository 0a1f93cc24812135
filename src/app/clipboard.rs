//! System clipboard access via arboard

use image::RgbaImage;
use std::borrow::Cow;

use crate::workspace::ClipboardContent;

fn is_url(line: &str) -> bool {
    ["file://", "http://", "https://"]
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

/// Split clipboard text into URLs and plain text.
///
/// Text made only of URL lines (as file managers and browsers copy them)
/// becomes a URL list; anything else is kept as text.
pub fn classify_text(text: &str, content: &mut ClipboardContent) {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if !lines.is_empty() && lines.iter().all(|l| is_url(l)) {
        content.urls.extend(lines.into_iter().map(str::to_string));
    } else {
        content.text = Some(text.to_string());
    }
}

/// Snapshot the system clipboard
pub fn read() -> ClipboardContent {
    let mut content = ClipboardContent::default();
    let mut clip = match arboard::Clipboard::new() {
        Ok(clip) => clip,
        Err(e) => {
            log::warn!("Clipboard unavailable: {}", e);
            return content;
        }
    };

    if let Ok(text) = clip.get_text() {
        classify_text(&text, &mut content);
    }
    if let Ok(data) = clip.get_image() {
        content.image = RgbaImage::from_raw(
            data.width as u32,
            data.height as u32,
            data.bytes.into_owned(),
        );
    }
    content
}

/// Plain text on the system clipboard
pub fn read_text() -> Result<String, String> {
    let mut clip = arboard::Clipboard::new().map_err(|e| e.to_string())?;
    clip.get_text().map_err(|e| e.to_string())
}

/// Put an image on the system clipboard
pub fn write_image(image: &RgbaImage) -> Result<(), String> {
    let mut clip = arboard::Clipboard::new().map_err(|e| e.to_string())?;
    let data = arboard::ImageData {
        width: image.width() as usize,
        height: image.height() as usize,
        bytes: Cow::Borrowed(image.as_raw()),
    };
    clip.set_image(data).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_lines_become_urls() {
        let mut content = ClipboardContent::default();
        classify_text("file:///tmp/a.png\nhttps://x.org/b.png\n", &mut content);
        assert_eq!(content.urls.len(), 2);
        assert!(content.text.is_none());
    }

    #[test]
    fn test_mixed_text_stays_text() {
        let mut content = ClipboardContent::default();
        classify_text("a castle\nhttps://x.org/b.png", &mut content);
        assert!(content.urls.is_empty());
        assert_eq!(content.text.as_deref(), Some("a castle\nhttps://x.org/b.png"));
    }
}
