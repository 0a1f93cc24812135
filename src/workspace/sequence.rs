//! Ordered input sequence and mask linking
//!
//! A mask is linked to the input directly before it when that input is an
//! image. Links are recomputed after every mutation; a mask whose link
//! changes is fitted to its image and gets a fresh extent.
//!
//! Indices passed to the mutators must be in range. The workspace validates
//! them before calling in.

use image::{Rgba, RgbaImage};

use super::input::{ImageInput, InputId, InputRole, Link};
use super::parameters::GenerationParameters;

/// Change notification delivered to listeners and returned by mutators
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// Inputs were inserted, removed or reordered
    Structure,
    ImageChanged(InputId),
    LinkChanged(InputId),
    ExtentChanged(InputId),
}

/// Callback invoked synchronously for every event, in order
pub type Listener = Box<dyn FnMut(&InputEvent)>;

/// Owns the workspace inputs and keeps mask links consistent
pub struct InputSequence {
    inputs: Vec<ImageInput>,
    params: GenerationParameters,
    next_id: InputId,
    listeners: Vec<Listener>,
}

impl Default for InputSequence {
    fn default() -> Self {
        Self::new(GenerationParameters::default())
    }
}

impl InputSequence {
    pub fn new(params: GenerationParameters) -> Self {
        Self {
            inputs: Vec::new(),
            params,
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    /// Register a listener for all future events
    pub fn subscribe(&mut self, listener: impl FnMut(&InputEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageInput> {
        self.inputs.get(index)
    }

    pub fn inputs(&self) -> &[ImageInput] {
        &self.inputs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageInput> {
        self.inputs.iter()
    }

    pub fn index_of(&self, id: InputId) -> Option<usize> {
        self.inputs.iter().position(|input| input.id() == id)
    }

    pub fn parameters(&self) -> &GenerationParameters {
        &self.params
    }

    /// Append a new input
    pub fn push(&mut self, role: InputRole, image: Option<RgbaImage>) -> Vec<InputEvent> {
        let index = self.inputs.len();
        self.insert(index, role, image)
    }

    /// Insert a new input at `index` (`index == len` appends)
    pub fn insert(
        &mut self,
        index: usize,
        role: InputRole,
        image: Option<RgbaImage>,
    ) -> Vec<InputEvent> {
        let id = self.next_id;
        self.next_id += 1;

        let mut input = ImageInput::new(id, role, image);
        input.update_extent(&self.params);
        self.inputs.insert(index, input);
        log::debug!("Inserted {} input {} at {}", role.label(), id, index);

        self.finish_structural()
    }

    /// Remove the input at `index`
    pub fn remove(&mut self, index: usize) -> Vec<InputEvent> {
        let removed = self.inputs.remove(index);
        log::debug!("Removed input {} from {}", removed.id(), index);
        self.finish_structural()
    }

    /// Move the input at `from` so it lands at drop position `to`.
    ///
    /// `to` is a position in the sequence before removal, so moving forward
    /// lands one slot earlier than `to`.
    pub fn move_item(&mut self, from: usize, to: usize) -> Vec<InputEvent> {
        let input = self.inputs.remove(from);
        let to = if from < to { to - 1 } else { to };
        self.inputs.insert(to, input);
        log::debug!("Moved input from {} to {}", from, to);
        self.finish_structural()
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Vec<InputEvent> {
        self.inputs.swap(a, b);
        self.finish_structural()
    }

    /// Replace the image of the input at `index`
    pub fn set_image(&mut self, index: usize, image: Option<RgbaImage>) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let input = &mut self.inputs[index];
        input.replace_image(image);
        events.push(InputEvent::ImageChanged(input.id()));

        // A mask's own raster changed: refit even if the link is unchanged
        if self.inputs[index].role() == InputRole::Mask {
            self.refresh(index, &mut events);
        }
        self.relink(&mut events);
        self.emit(events)
    }

    pub fn clear_image(&mut self, index: usize) -> Vec<InputEvent> {
        self.set_image(index, None)
    }

    /// Give a linked mask a blank, fully transparent canvas the size of its image
    pub fn set_canvas(&mut self, index: usize) -> Vec<InputEvent> {
        let size = match self.inputs[index].link() {
            Some(_) if index > 0 => self.inputs[index - 1].image().map(|img| img.dimensions()),
            _ => None,
        };
        let Some((w, h)) = size else {
            log::warn!("Cannot create a canvas for input {} without a linked image", index);
            return Vec::new();
        };
        self.set_image(index, Some(RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 0]))))
    }

    pub fn set_role(&mut self, index: usize, role: InputRole) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let input = &mut self.inputs[index];
        if input.role() == role {
            return events;
        }
        input.set_role(role);
        events.push(InputEvent::ImageChanged(input.id()));

        self.refresh(index, &mut events);
        self.relink(&mut events);
        self.emit(events)
    }

    /// Replace the parameters. Extents are recomputed only when the
    /// working size or padding changed.
    pub fn set_parameters(&mut self, params: GenerationParameters) -> Vec<InputEvent> {
        let rescan = !self.params.same_extent_inputs(&params);
        self.params = params;
        if !rescan {
            return Vec::new();
        }
        let mut events = Vec::new();
        for input in &mut self.inputs {
            if input.update_extent(&self.params) {
                events.push(InputEvent::ExtentChanged(input.id()));
            }
        }
        self.emit(events)
    }

    fn finish_structural(&mut self) -> Vec<InputEvent> {
        let mut events = vec![InputEvent::Structure];
        self.relink(&mut events);
        self.emit(events)
    }

    /// Restore the adjacency invariant over the whole sequence
    fn relink(&mut self, events: &mut Vec<InputEvent>) {
        for index in 0..self.inputs.len() {
            let desired = match index.checked_sub(1).map(|prev| &self.inputs[prev]) {
                Some(prev)
                    if self.inputs[index].role() == InputRole::Mask
                        && prev.role() == InputRole::Image =>
                {
                    Some(Link {
                        target: prev.id(),
                        revision: prev.revision(),
                        empty: prev.is_empty(),
                    })
                }
                _ => None,
            };

            let input = &mut self.inputs[index];
            if input.link() == desired {
                continue;
            }
            input.set_link(desired);
            events.push(InputEvent::LinkChanged(input.id()));
            self.refresh(index, events);
        }
    }

    /// Fit a linked mask to its image and recompute its extent
    fn refresh(&mut self, index: usize, events: &mut Vec<InputEvent>) {
        let (before, rest) = self.inputs.split_at_mut(index);
        let input = &mut rest[0];

        if input.role() == InputRole::Mask && input.is_linked() {
            if let Some(target) = before.last().and_then(|prev| prev.image()) {
                if input.fit_to(target) {
                    events.push(InputEvent::ImageChanged(input.id()));
                }
            }
        }

        if input.update_extent(&self.params) {
            events.push(InputEvent::ExtentChanged(input.id()));
        }
    }

    fn emit(&mut self, events: Vec<InputEvent>) -> Vec<InputEvent> {
        for event in &events {
            for listener in &mut self.listeners {
                listener(event);
            }
        }
        events
    }
}
