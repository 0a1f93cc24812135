//! Generation parameters and their textual "parameters" form
//!
//! Outputs carry their settings as a block of text:
//!
//! ```text
//! a castle on a hill
//! Negative prompt: blurry
//! Steps: 25, CFG scale: 7, Seed: 1234, Size: 512x768
//! ```
//!
//! The same text can be pasted back to restore the settings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata attached to a generated image by the backend
pub type Metadata = Map<String, Value>;

const NEGATIVE_PREFIX: &str = "Negative prompt: ";

/// Settings for a generation request, also consumed by the extent calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParameters {
    pub prompt: String,
    pub negative_prompt: String,
    /// Working resolution width
    pub width: u32,
    /// Working resolution height
    pub height: u32,
    /// Padding around the masked region, in source pixels
    pub padding: u32,
    pub steps: u32,
    pub scale: f32,
    pub strength: f32,
    /// -1 picks a random seed
    pub seed: i64,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            negative_prompt: String::new(),
            width: 512,
            height: 512,
            padding: 32,
            steps: 25,
            scale: 7.0,
            strength: 0.75,
            seed: -1,
        }
    }
}

/// Metadata keys rendered on the settings line, in order
const LABELS: &[(&str, &str)] = &[
    ("steps", "Steps"),
    ("sampler", "Sampler"),
    ("scale", "CFG scale"),
    ("seed", "Seed"),
    ("strength", "Strength"),
    ("padding", "Padding"),
    ("model", "Model"),
];

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render output metadata as parameters text
pub fn format(metadata: &Metadata) -> String {
    let mut lines = Vec::new();

    if let Some(prompt) = metadata.get("prompt") {
        lines.push(value_text(prompt));
    }
    if let Some(negative) = metadata.get("negative_prompt") {
        let negative = value_text(negative);
        if !negative.is_empty() {
            lines.push(format!("{}{}", NEGATIVE_PREFIX, negative));
        }
    }

    let mut settings: Vec<String> = Vec::new();
    for (key, label) in LABELS {
        if let Some(value) = metadata.get(*key) {
            settings.push(format!("{}: {}", label, value_text(value)));
        }
        // Size sits right after the seed
        if *key == "seed" {
            if let (Some(w), Some(h)) = (metadata.get("width"), metadata.get("height")) {
                settings.push(format!("Size: {}x{}", value_text(w), value_text(h)));
            }
        }
    }
    if !settings.is_empty() {
        lines.push(settings.join(", "));
    }

    lines.join("\n")
}

fn is_settings_line(line: &str) -> bool {
    !line.is_empty() && line.split(", ").all(|part| part.contains(": "))
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("Invalid value for {}: {}", key, value))
}

impl GenerationParameters {
    /// Whether mask extents computed under `other` still hold
    pub fn same_extent_inputs(&self, other: &GenerationParameters) -> bool {
        self.width == other.width && self.height == other.height && self.padding == other.padding
    }

    /// Apply pasted parameters text.
    ///
    /// Returns the keys that were not recognised.
    pub fn import(&mut self, text: &str) -> Result<Vec<String>, String> {
        let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        if lines.is_empty() {
            return Err("No parameters found".to_string());
        }

        let has_settings = lines.last().is_some_and(|last| {
            (lines.len() > 1 || last.starts_with("Steps: ")) && is_settings_line(last)
        });
        let settings = if has_settings { lines.pop() } else { None };

        let mut prompt = Vec::new();
        let mut negative = Vec::new();
        let mut in_negative = false;
        for line in lines {
            if let Some(rest) = line.strip_prefix(NEGATIVE_PREFIX) {
                in_negative = true;
                negative.push(rest);
            } else if in_negative {
                negative.push(line);
            } else {
                prompt.push(line);
            }
        }

        // Validate everything before touching self
        let mut updated = self.clone();
        updated.prompt = prompt.join("\n");
        updated.negative_prompt = negative.join("\n");

        let mut unknown = Vec::new();
        if let Some(settings) = settings {
            for part in settings.split(", ") {
                let Some((key, value)) = part.split_once(": ") else {
                    continue;
                };
                match key {
                    "Steps" => updated.steps = parse_num(key, value)?,
                    "CFG scale" => updated.scale = parse_num(key, value)?,
                    "Seed" => updated.seed = parse_num(key, value)?,
                    "Strength" => updated.strength = parse_num(key, value)?,
                    "Padding" => updated.padding = parse_num(key, value)?,
                    "Size" => {
                        let (w, h) = value
                            .split_once('x')
                            .ok_or_else(|| format!("Invalid size: {}", value))?;
                        updated.width = parse_num(key, w)?;
                        updated.height = parse_num(key, h)?;
                    }
                    other => unknown.push(other.to_string()),
                }
            }
        }

        *self = updated;
        if !unknown.is_empty() {
            log::debug!("Ignored parameter keys: {}", unknown.join(", "));
        }
        Ok(unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: Value) -> Metadata {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_extent_inputs() {
        let base = GenerationParameters::default();
        let prompt_only = GenerationParameters {
            prompt: "a cat".to_string(),
            steps: 40,
            ..Default::default()
        };
        assert!(base.same_extent_inputs(&prompt_only));
        for changed in [
            GenerationParameters { width: 768, ..Default::default() },
            GenerationParameters { height: 768, ..Default::default() },
            GenerationParameters { padding: 0, ..Default::default() },
        ] {
            assert!(!base.same_extent_inputs(&changed));
        }
    }

    #[test]
    fn test_default_parameters() {
        let params = GenerationParameters::default();
        assert_eq!((params.width, params.height), (512, 512));
        assert_eq!(params.padding, 32);
        assert_eq!(params.seed, -1);
    }

    #[test]
    fn test_format_full() {
        let meta = metadata(json!({
            "prompt": "a castle",
            "negative_prompt": "blurry",
            "steps": 25,
            "scale": 7.5,
            "seed": 1234,
            "width": 512,
            "height": 768,
            "sampler": "Euler a",
            "file": "out.png"
        }));

        assert_eq!(
            format(&meta),
            "a castle\nNegative prompt: blurry\n\
             Steps: 25, Sampler: Euler a, CFG scale: 7.5, Seed: 1234, Size: 512x768"
        );
    }

    #[test]
    fn test_format_skips_empty_negative() {
        let meta = metadata(json!({"prompt": "cat", "negative_prompt": ""}));
        assert_eq!(format(&meta), "cat");
    }

    #[test]
    fn test_import_restores_format() {
        let meta = metadata(json!({
            "prompt": "a castle",
            "negative_prompt": "blurry",
            "steps": 30,
            "scale": 6.5,
            "seed": 42,
            "width": 640,
            "height": 448,
            "padding": 16
        }));

        let mut params = GenerationParameters::default();
        let unknown = params.import(&format(&meta)).unwrap();

        assert!(unknown.is_empty());
        assert_eq!(params.prompt, "a castle");
        assert_eq!(params.negative_prompt, "blurry");
        assert_eq!(params.steps, 30);
        assert_eq!(params.scale, 6.5);
        assert_eq!(params.seed, 42);
        assert_eq!((params.width, params.height), (640, 448));
        assert_eq!(params.padding, 16);
    }

    #[test]
    fn test_import_prompt_only() {
        let mut params = GenerationParameters::default();
        params.import("just a prompt").unwrap();
        assert_eq!(params.prompt, "just a prompt");
        assert_eq!(params.steps, 25);
    }

    #[test]
    fn test_import_reports_unknown_keys() {
        let mut params = GenerationParameters::default();
        let unknown = params
            .import("dog\nSteps: 10, Sampler: DDIM, Model: sd15")
            .unwrap();
        assert_eq!(unknown, vec!["Sampler".to_string(), "Model".to_string()]);
        assert_eq!(params.steps, 10);
    }

    #[test]
    fn test_import_invalid_value_leaves_params_untouched() {
        let mut params = GenerationParameters::default();
        let result = params.import("dog\nSteps: many, Seed: 3");
        assert!(result.is_err());
        assert_eq!(params, GenerationParameters::default());
    }

    #[test]
    fn test_import_empty_text() {
        let mut params = GenerationParameters::default();
        assert!(params.import("\n\n").is_err());
    }
}
