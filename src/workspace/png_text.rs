//! Generation parameters stored in PNG text chunks
//!
//! Exported outputs carry their parameters text under the `parameters`
//! keyword, and images pasted back in hand it over again.

use image::RgbaImage;
use std::io::Cursor;

const PARAMETERS_KEYWORD: &str = "parameters";

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

fn is_latin1(text: &str) -> bool {
    text.chars().all(|c| (c as u32) < 0x100)
}

/// Encode an image as PNG with `parameters` in a text chunk.
///
/// Latin-1 text goes in a `tEXt` chunk, anything else in `iTXt`. Empty
/// text writes no chunk.
pub fn encode_png_with_parameters(image: &RgbaImage, parameters: &str) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        if !parameters.is_empty() {
            let keyword = PARAMETERS_KEYWORD.to_string();
            let text = parameters.to_string();
            let added = if is_latin1(parameters) {
                encoder.add_text_chunk(keyword, text)
            } else {
                encoder.add_itxt_chunk(keyword, text)
            };
            added.map_err(|e| e.to_string())?;
        }

        let mut writer = encoder.write_header().map_err(|e| e.to_string())?;
        writer
            .write_image_data(image.as_raw())
            .map_err(|e| e.to_string())?;
        writer.finish().map_err(|e| e.to_string())?;
    }
    Ok(bytes)
}

/// Parameters text embedded in PNG bytes, if any
pub fn read_parameters(bytes: &[u8]) -> Option<String> {
    if !bytes.starts_with(PNG_SIGNATURE) {
        return None;
    }
    let reader = match png::Decoder::new(Cursor::new(bytes)).read_info() {
        Ok(reader) => reader,
        Err(e) => {
            log::debug!("Cannot read PNG text chunks: {}", e);
            return None;
        }
    };
    let info = reader.info();

    let text = info
        .uncompressed_latin1_text
        .iter()
        .find(|chunk| chunk.keyword == PARAMETERS_KEYWORD)
        .map(|chunk| chunk.text.clone())
        .or_else(|| {
            info.compressed_latin1_text
                .iter()
                .find(|chunk| chunk.keyword == PARAMETERS_KEYWORD)
                .and_then(|chunk| chunk.get_text().ok())
        })
        .or_else(|| {
            info.utf8_text
                .iter()
                .find(|chunk| chunk.keyword == PARAMETERS_KEYWORD)
                .and_then(|chunk| chunk.get_text().ok())
        });
    text.filter(|t| !t.is_empty())
}

/// Decode image bytes, along with any embedded parameters
pub fn decode_with_parameters(bytes: &[u8]) -> Result<(RgbaImage, Option<String>), image::ImageError> {
    let image = image::load_from_memory(bytes)?.into_rgba8();
    Ok((image, read_parameters(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid() -> RgbaImage {
        RgbaImage::from_pixel(4, 3, Rgba([200, 100, 50, 255]))
    }

    #[test]
    fn test_parameters_survive_export() {
        let text = "a cat\nNegative prompt: blurry\nSteps: 20, Seed: 7";
        let bytes = encode_png_with_parameters(&solid(), text).unwrap();

        let (image, parameters) = decode_with_parameters(&bytes).unwrap();
        assert_eq!(image, solid());
        assert_eq!(parameters.as_deref(), Some(text));
    }

    #[test]
    fn test_non_latin1_parameters() {
        let text = "桜の木\nSteps: 20";
        let bytes = encode_png_with_parameters(&solid(), text).unwrap();
        assert_eq!(read_parameters(&bytes).as_deref(), Some(text));
    }

    #[test]
    fn test_plain_images_have_no_parameters() {
        let plain = crate::workspace::encode_png(&solid()).unwrap();
        assert_eq!(read_parameters(&plain), None);

        let empty = encode_png_with_parameters(&solid(), "").unwrap();
        assert_eq!(read_parameters(&empty), None);

        assert_eq!(read_parameters(b"GIF89a"), None);
    }
}
