//! Generated outputs, keyed by increasing id
//!
//! The gallery lists outputs newest first, so positional indices run over
//! ids in descending order.

use image::RgbaImage;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::parameters::{self, Metadata};

pub type OutputId = i64;

/// A generated image together with the settings that produced it
#[derive(Clone, Debug)]
pub struct Output {
    pub image: RgbaImage,
    pub metadata: Metadata,
    /// Rendered parameters text, see [`parameters::format`]
    pub parameters: String,
    /// File the backend saved the image to, if any
    pub file: Option<PathBuf>,
}

impl Output {
    pub fn new(image: RgbaImage, metadata: Metadata) -> Self {
        let parameters = parameters::format(&metadata);
        let file = metadata
            .get("file")
            .and_then(|v| v.as_str())
            .map(PathBuf::from);
        Self {
            image,
            metadata,
            parameters,
            file,
        }
    }

    pub fn size_label(&self) -> String {
        format!("{}x{}", self.image.width(), self.image.height())
    }
}

#[derive(Default)]
pub struct OutputStore {
    outputs: BTreeMap<OutputId, Output>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: OutputId, output: Output) {
        if self.outputs.insert(id, output).is_some() {
            log::warn!("Replaced existing output {}", id);
        }
    }

    pub fn get(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(&id)
    }

    pub fn contains(&self, id: OutputId) -> bool {
        self.outputs.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Remove one output
    #[must_use = "returns whether the output existed"]
    pub fn remove(&mut self, id: OutputId) -> bool {
        self.outputs.remove(&id).is_some()
    }

    /// Remove every output with an id strictly below `id`
    pub fn remove_before(&mut self, id: OutputId) -> usize {
        let kept = self.outputs.split_off(&id);
        let removed = self.outputs.len();
        self.outputs = kept;
        removed
    }

    /// Ids newest first
    pub fn ids_descending(&self) -> impl Iterator<Item = OutputId> + '_ {
        self.outputs.keys().rev().copied()
    }

    /// Position of `id` in newest-first order
    pub fn id_to_index(&self, id: OutputId) -> Option<usize> {
        self.ids_descending().position(|p| p == id)
    }

    /// Id at newest-first position `index`; negative indices have none
    pub fn index_to_id(&self, index: i64) -> Option<OutputId> {
        let index = usize::try_from(index).ok()?;
        self.ids_descending().nth(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn output() -> Output {
        Output::new(RgbaImage::new(4, 4), Metadata::new())
    }

    fn store(ids: &[OutputId]) -> OutputStore {
        let mut store = OutputStore::new();
        for &id in ids {
            store.insert(id, output());
        }
        store
    }

    #[test]
    fn test_newest_first_translation() {
        let store = store(&[3, 7, 5]);

        assert_eq!(store.ids_descending().collect::<Vec<_>>(), vec![7, 5, 3]);
        assert_eq!(store.id_to_index(7), Some(0));
        assert_eq!(store.id_to_index(3), Some(2));
        assert_eq!(store.id_to_index(4), None);
        assert_eq!(store.index_to_id(1), Some(5));
        assert_eq!(store.index_to_id(3), None);
        assert_eq!(store.index_to_id(-1), None);
    }

    #[test]
    fn test_remove() {
        let mut store = store(&[1, 2]);
        assert!(store.remove(1));
        assert!(!store.remove(1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_before() {
        let mut store = store(&[1, 2, 3, 4]);
        assert_eq!(store.remove_before(3), 2);
        assert_eq!(store.ids_descending().collect::<Vec<_>>(), vec![4, 3]);
        assert_eq!(store.remove_before(0), 0);
    }

    #[test]
    fn test_output_reads_metadata() {
        let metadata = match json!({"prompt": "fox", "file": "/tmp/out/0001.png"}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        let out = Output::new(RgbaImage::new(8, 6), metadata);
        assert_eq!(out.parameters, "fox");
        assert_eq!(out.file, Some(PathBuf::from("/tmp/out/0001.png")));
        assert_eq!(out.size_label(), "8x6");
    }
}
