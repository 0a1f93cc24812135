use eframe::egui;
use image::RgbaImage;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::workspace::input::InputId;
use crate::workspace::{InputEvent, OutputId, Workspace};

/// Identity of a cached texture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKey {
    Input(InputId),
    Output(OutputId),
}

/// GPU textures for input and output images
///
/// Input textures are invalidated through the input sequence's event
/// listener; outputs never change once stored.
#[derive(Default)]
pub struct TextureCache {
    textures: HashMap<TextureKey, egui::TextureHandle>,
    stale: Rc<RefCell<HashSet<InputId>>>,
}

/// Convert an RGBA image into an egui color image
pub fn to_color_image(image: &RgbaImage) -> egui::ColorImage {
    let size = [image.width() as usize, image.height() as usize];
    egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw())
}

impl TextureCache {
    /// Subscribe to input changes so replaced images get reloaded
    pub fn watch(&self, workspace: &mut Workspace) {
        let stale = Rc::clone(&self.stale);
        workspace.inputs_mut().subscribe(move |event| {
            if let InputEvent::ImageChanged(id) = event {
                stale.borrow_mut().insert(*id);
            }
        });
    }

    /// Get the texture for `key`, uploading `image` if needed
    pub fn get_or_load(
        &mut self,
        ctx: &egui::Context,
        key: TextureKey,
        image: &RgbaImage,
    ) -> egui::TextureHandle {
        if let Some(texture) = self.textures.get(&key) {
            return texture.clone();
        }
        let name = match key {
            TextureKey::Input(id) => format!("input-{}", id),
            TextureKey::Output(id) => format!("output-{}", id),
        };
        let texture = ctx.load_texture(name, to_color_image(image), egui::TextureOptions::LINEAR);
        self.textures.insert(key, texture.clone());
        texture
    }

    /// Drop textures for changed inputs and for items that no longer exist
    pub fn prune(&mut self, workspace: &Workspace) {
        let stale: HashSet<InputId> = self.stale.borrow_mut().drain().collect();
        self.textures.retain(|key, _| match key {
            TextureKey::Input(id) => {
                !stale.contains(id) && workspace.inputs().index_of(*id).is_some()
            }
            TextureKey::Output(id) => workspace.outputs().contains(*id),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::InputRole;

    #[test]
    fn test_watch_marks_changed_inputs_stale() {
        let cache = TextureCache::default();
        let mut workspace = Workspace::default();
        cache.watch(&mut workspace);

        workspace.add_image();
        workspace.set_input_image(0, Some(RgbaImage::new(2, 2)));
        let id = workspace.inputs().get(0).unwrap().id();
        assert!(cache.stale.borrow().contains(&id));

        workspace.add_input(InputRole::Mask, None);
        assert_eq!(cache.stale.borrow().len(), 1);
    }

    #[test]
    fn test_color_image_size() {
        let image = to_color_image(&RgbaImage::new(3, 2));
        assert_eq!(image.size, [3, 2]);
    }
}
