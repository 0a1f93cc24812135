//! Workspace module: inputs, masks, generation dispatch and outputs

pub mod bbox;
pub mod extent;
pub mod highlight;
pub mod input;
pub mod interop;
pub mod navigation;
pub mod outputs;
pub mod parameters;
pub mod png_text;
pub mod sequence;

pub use input::{ImageInput, InputRole, LinkState};
pub use interop::{ClipboardContent, DropPayload, PasteEvent};
pub use navigation::{Area, Opened};
pub use outputs::{Output, OutputId, OutputStore};
pub use parameters::GenerationParameters;
pub use sequence::{InputEvent, InputSequence};

use image::{ImageFormat, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use crate::backend::{
    Backend, BackendRequest, GeneratedImage, GenerationKind, GenerationRequest, RequestId,
};

/// The basic generation workspace
#[derive(Default)]
pub struct Workspace {
    inputs: InputSequence,
    outputs: OutputStore,
    opened: Option<Opened>,
    /// Keep generating as soon as each result arrives
    forever: bool,
    /// Request whose results we are waiting for
    pending: Option<RequestId>,
    /// Where images fetched for `paste_item` go, by URL
    reply_insert: HashMap<String, usize>,
}

/// Encode an image as PNG bytes
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Load an image file as RGBA
pub fn load_image(path: &Path) -> Result<RgbaImage, image::ImageError> {
    let image = image::open(path)?;
    log::info!(
        "Loaded image: {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image.into_rgba8())
}

impl Workspace {
    pub fn new(parameters: GenerationParameters) -> Self {
        Self {
            inputs: InputSequence::new(parameters),
            ..Default::default()
        }
    }

    pub fn inputs(&self) -> &InputSequence {
        &self.inputs
    }

    /// Mutable access for subscribing listeners
    pub fn inputs_mut(&mut self) -> &mut InputSequence {
        &mut self.inputs
    }

    pub fn outputs(&self) -> &OutputStore {
        &self.outputs
    }

    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(id)
    }

    pub fn parameters(&self) -> &GenerationParameters {
        self.inputs.parameters()
    }

    pub fn set_parameters(&mut self, parameters: GenerationParameters) -> Vec<InputEvent> {
        if *self.inputs.parameters() == parameters {
            return Vec::new();
        }
        self.inputs.set_parameters(parameters)
    }

    /// Apply pasted parameters text, see [`GenerationParameters::import`]
    pub fn import_parameters(&mut self, text: &str) -> Result<Vec<String>, String> {
        let mut parameters = self.parameters().clone();
        let unknown = parameters.import(text)?;
        self.set_parameters(parameters);
        Ok(unknown)
    }

    pub fn forever(&self) -> bool {
        self.forever
    }

    pub fn set_forever(&mut self, forever: bool) {
        self.forever = forever;
    }

    /// Id of the request we are waiting on
    pub fn pending(&self) -> Option<RequestId> {
        self.pending
    }

    // ---- inputs ----

    pub fn add_image(&mut self) -> Vec<InputEvent> {
        self.inputs.push(InputRole::Image, None)
    }

    pub fn add_mask(&mut self) -> Vec<InputEvent> {
        self.inputs.push(InputRole::Mask, None)
    }

    pub fn add_input(&mut self, role: InputRole, image: Option<RgbaImage>) -> Vec<InputEvent> {
        self.inputs.push(role, image)
    }

    /// Insert at `index`, clamped to the end of the sequence
    pub fn insert_input(
        &mut self,
        index: usize,
        role: InputRole,
        image: Option<RgbaImage>,
    ) -> Vec<InputEvent> {
        let index = index.min(self.inputs.len());
        let events = self.inputs.insert(index, role, image);
        if let Some(Opened::Input(opened)) = self.opened {
            if opened >= index {
                self.opened = Some(Opened::Input(opened + 1));
            }
        }
        events
    }

    /// Remove an input. Returns whether it existed.
    pub fn delete_input(&mut self, index: usize) -> bool {
        if index >= self.inputs.len() {
            return false;
        }
        self.inputs.remove(index);

        if let Some(Opened::Input(opened)) = self.opened {
            if self.inputs.is_empty() {
                self.opened = None;
            } else if opened == index {
                self.opened = Some(Opened::Input(index.min(self.inputs.len() - 1)));
            } else if opened > index {
                self.opened = Some(Opened::Input(opened - 1));
            }
        }
        true
    }

    /// Move an input to drop position `to` (`to == len` appends)
    pub fn move_input(&mut self, from: usize, to: usize) -> bool {
        let len = self.inputs.len();
        if from >= len || to > len {
            log::warn!("Ignoring move from {} to {} ({} inputs)", from, to, len);
            return false;
        }
        self.inputs.move_item(from, to);
        true
    }

    pub fn swap_inputs(&mut self, a: usize, b: usize) -> bool {
        let len = self.inputs.len();
        if a >= len || b >= len {
            log::warn!("Ignoring swap of {} and {} ({} inputs)", a, b, len);
            return false;
        }
        self.inputs.swap(a, b);
        true
    }

    pub fn set_input_image(&mut self, index: usize, image: Option<RgbaImage>) -> Vec<InputEvent> {
        if index >= self.inputs.len() {
            return Vec::new();
        }
        self.inputs.set_image(index, image)
    }

    pub fn clear_input_image(&mut self, index: usize) -> Vec<InputEvent> {
        self.set_input_image(index, None)
    }

    pub fn set_input_canvas(&mut self, index: usize) -> Vec<InputEvent> {
        if index >= self.inputs.len() {
            return Vec::new();
        }
        self.inputs.set_canvas(index)
    }

    pub fn set_input_role(&mut self, index: usize, role: InputRole) -> Vec<InputEvent> {
        if index >= self.inputs.len() {
            return Vec::new();
        }
        self.inputs.set_role(index, role)
    }

    /// Load a file into an existing input
    pub fn load_input_file(
        &mut self,
        index: usize,
        path: &Path,
    ) -> Result<Vec<InputEvent>, image::ImageError> {
        let image = load_image(path)?;
        Ok(self.set_input_image(index, Some(image)))
    }

    // ---- generation ----

    /// Build a request from the current inputs
    pub fn build_request(&self) -> Result<GenerationRequest, image::ImageError> {
        let mut images = Vec::new();
        let mut masks = Vec::new();
        let mut extents = Vec::new();

        for input in self.inputs.iter() {
            let Some(image) = input.image() else {
                continue;
            };
            match input.role() {
                InputRole::Image => images.push(encode_png(image)?),
                // Unlinked masks have nothing to apply to
                InputRole::Mask if input.link().is_some() => {
                    masks.push(encode_png(image)?);
                    extents.push(input.extent());
                }
                InputRole::Mask => {}
            }
        }

        let kind = if !masks.is_empty() {
            GenerationKind::Inpaint
        } else if !images.is_empty() {
            GenerationKind::Img2Img
        } else {
            GenerationKind::Txt2Img
        };

        Ok(GenerationRequest {
            kind,
            parameters: self.parameters().clone(),
            images,
            masks,
            extents,
        })
    }

    /// Send a generation request and remember its id
    pub fn generate(&mut self, backend: &mut dyn Backend) -> Result<RequestId, image::ImageError> {
        let request = self.build_request()?;
        log::info!(
            "Generating {:?} with {} image(s) and {} mask(s)",
            request.kind,
            request.images.len(),
            request.masks.len()
        );
        let id = backend.make_request(BackendRequest::Generate(request));
        self.pending = Some(id);
        Ok(id)
    }

    pub fn cancel(&mut self, backend: &mut dyn Backend) {
        if let Some(id) = self.pending.take() {
            backend.cancel_request(id);
        }
        self.forever = false;
    }

    /// Store the results of a request.
    ///
    /// Results for other requests are ignored. Outputs get consecutive ids
    /// starting at the request id (or after the newest output, whichever is
    /// higher), assigned from the last image to the first.
    pub fn on_result(
        &mut self,
        id: RequestId,
        results: Vec<GeneratedImage>,
        backend: &mut dyn Backend,
    ) -> Result<(), image::ImageError> {
        if self.pending != Some(id) {
            return Ok(());
        }
        self.pending = None;

        let sticky = self.is_sticky();
        let mut next = self
            .outputs
            .ids_descending()
            .next()
            .map_or(id, |newest| id.max(newest + 1));

        log::info!("Received {} result(s) for request {}", results.len(), id);
        for result in results.into_iter().rev() {
            self.outputs
                .insert(next, Output::new(result.image, result.metadata));
            next += 1;
        }

        if sticky {
            self.left();
        }
        if self.forever {
            self.generate(backend)?;
        }
        Ok(())
    }

    /// Forget a request the backend gave up on. Also stops forever mode so
    /// a broken setup does not loop. Returns whether it was ours.
    pub fn on_failed(&mut self, id: RequestId) -> bool {
        if self.pending != Some(id) {
            return false;
        }
        log::warn!("Request {} failed, stopping", id);
        self.pending = None;
        self.forever = false;
        true
    }

    // ---- outputs ----

    /// Remove an output. Returns whether it existed.
    pub fn delete_output(&mut self, id: OutputId) -> bool {
        let removed = self.outputs.remove(id);
        if removed && self.opened == Some(Opened::Output(id)) && self.outputs.is_empty() {
            self.opened = None;
        }
        removed
    }

    /// Remove every output older than `id`
    pub fn delete_outputs_before(&mut self, id: OutputId) -> usize {
        let removed = self.outputs.remove_before(id);
        if let Some(Opened::Output(opened)) = self.opened {
            if opened < id {
                self.opened = None;
            }
        }
        log::info!("Deleted {} output(s) older than {}", removed, id);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RequestQueue;
    use crate::workspace::parameters::Metadata;
    use image::Rgba;

    fn solid(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]))
    }

    fn results(n: usize) -> Vec<GeneratedImage> {
        (0..n)
            .map(|i| GeneratedImage {
                image: RgbaImage::new(i as u32 + 1, 1),
                metadata: Metadata::new(),
            })
            .collect()
    }

    #[test]
    fn test_request_kinds() {
        let mut ws = Workspace::default();
        assert_eq!(ws.build_request().unwrap().kind, GenerationKind::Txt2Img);

        ws.add_input(InputRole::Image, Some(solid(8, 8)));
        assert_eq!(ws.build_request().unwrap().kind, GenerationKind::Img2Img);

        ws.add_input(InputRole::Mask, Some(solid(8, 8)));
        let request = ws.build_request().unwrap();
        assert_eq!(request.kind, GenerationKind::Inpaint);
        assert_eq!(request.images.len(), 1);
        assert_eq!(request.masks.len(), 1);
        assert_eq!(request.extents.len(), 1);
        assert!(request.images[0].starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_unlinked_and_empty_inputs_are_skipped() {
        let mut ws = Workspace::default();
        ws.add_input(InputRole::Mask, Some(solid(8, 8)));
        ws.add_image();

        let request = ws.build_request().unwrap();
        assert!(request.images.is_empty());
        assert!(request.masks.is_empty());
    }

    #[test]
    fn test_result_ids_and_order() {
        let mut ws = Workspace::default();
        let mut queue = RequestQueue::new();
        let id = ws.generate(&mut queue).unwrap();

        ws.on_result(id, results(3), &mut queue).unwrap();
        assert_eq!(ws.outputs().len(), 3);
        assert_eq!(ws.pending(), None);

        // The first image gets the highest id and leads the gallery
        let newest = ws.outputs().index_to_id(0).unwrap();
        assert_eq!(newest, id + 2);
        assert_eq!(ws.output(newest).unwrap().image.width(), 1);
    }

    #[test]
    fn test_foreign_results_are_ignored() {
        let mut ws = Workspace::default();
        let mut queue = RequestQueue::new();
        let id = ws.generate(&mut queue).unwrap();

        ws.on_result(id + 100, results(1), &mut queue).unwrap();
        assert!(ws.outputs().is_empty());
        assert_eq!(ws.pending(), Some(id));
    }

    #[test]
    fn test_later_results_never_collide() {
        let mut ws = Workspace::default();
        let mut queue = RequestQueue::new();

        let first = ws.generate(&mut queue).unwrap();
        ws.on_result(first, results(4), &mut queue).unwrap();
        let second = ws.generate(&mut queue).unwrap();
        ws.on_result(second, results(2), &mut queue).unwrap();

        assert_eq!(ws.outputs().len(), 6);
    }

    #[test]
    fn test_forever_regenerates() {
        let mut ws = Workspace::default();
        let mut queue = RequestQueue::new();
        ws.set_forever(true);

        let id = ws.generate(&mut queue).unwrap();
        ws.on_result(id, results(1), &mut queue).unwrap();
        assert!(ws.pending().is_some_and(|next| next != id));
        assert_eq!(queue.pending_count(), 2);

        ws.cancel(&mut queue);
        assert!(!ws.forever());
        assert_eq!(ws.pending(), None);
    }

    #[test]
    fn test_sticky_viewer_follows_new_results() {
        let mut ws = Workspace::default();
        let mut queue = RequestQueue::new();

        let id = ws.generate(&mut queue).unwrap();
        ws.on_result(id, results(1), &mut queue).unwrap();
        let first = ws.outputs().index_to_id(0).unwrap();
        ws.open(first, Area::Output);

        let id = ws.generate(&mut queue).unwrap();
        ws.on_result(id, results(2), &mut queue).unwrap();

        let newest = ws.outputs().index_to_id(0).unwrap();
        assert_eq!(ws.opened(), Some(Opened::Output(newest)));
    }

    #[test]
    fn test_sticky_viewer_moves_before_regenerating() {
        let mut ws = Workspace::default();
        let mut queue = RequestQueue::new();

        let id = ws.generate(&mut queue).unwrap();
        ws.on_result(id, results(1), &mut queue).unwrap();
        ws.open(ws.outputs().index_to_id(0).unwrap(), Area::Output);

        ws.set_forever(true);
        let id = ws.generate(&mut queue).unwrap();
        ws.on_result(id, results(1), &mut queue).unwrap();

        let newest = ws.outputs().index_to_id(0).unwrap();
        assert_eq!(ws.opened(), Some(Opened::Output(newest)));
        assert!(ws.pending().is_some_and(|next| next != id));
    }

    #[test]
    fn test_failed_request_stops_forever() {
        let mut ws = Workspace::default();
        let mut queue = RequestQueue::new();
        ws.set_forever(true);
        let id = ws.generate(&mut queue).unwrap();

        assert!(!ws.on_failed(id + 1));
        assert_eq!(ws.pending(), Some(id));

        assert!(ws.on_failed(id));
        assert_eq!(ws.pending(), None);
        assert!(!ws.forever());
    }

    #[test]
    fn test_delete_outputs_before() {
        let mut ws = Workspace::default();
        let mut queue = RequestQueue::new();
        let id = ws.generate(&mut queue).unwrap();
        ws.on_result(id, results(4), &mut queue).unwrap();

        ws.open(id, Area::Output);
        assert_eq!(ws.delete_outputs_before(id + 2), 2);
        assert_eq!(ws.outputs().len(), 2);
        assert_eq!(ws.opened(), None);
        assert!(!ws.delete_output(id));
        assert!(ws.delete_output(id + 3));
    }

    #[test]
    fn test_insert_keeps_opened_input() {
        let mut ws = Workspace::default();
        ws.add_image();
        ws.add_mask();
        ws.open(1, Area::Input);

        ws.insert_input(0, InputRole::Image, None);
        assert_eq!(ws.opened(), Some(Opened::Input(2)));

        assert!(ws.delete_input(0));
        assert_eq!(ws.opened(), Some(Opened::Input(1)));
        assert!(!ws.delete_input(5));
    }

    #[test]
    fn test_invalid_moves_are_rejected() {
        let mut ws = Workspace::default();
        ws.add_image();
        assert!(!ws.move_input(1, 0));
        assert!(!ws.move_input(0, 2));
        assert!(ws.move_input(0, 1));
        assert!(!ws.swap_inputs(0, 1));
    }

    #[test]
    fn test_import_parameters_updates_extents() {
        let mut ws = Workspace::default();
        let mut mask = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 0]));
        mask.put_pixel(50, 50, Rgba([0, 0, 0, 255]));
        ws.add_input(InputRole::Mask, Some(mask));

        ws.import_parameters("cat\nSteps: 20, Padding: 0").unwrap();
        assert_eq!(ws.parameters().prompt, "cat");
        let extent = ws.inputs().get(0).unwrap().extent().unwrap();
        assert_eq!((extent.width, extent.height), (1, 1));
    }
}
