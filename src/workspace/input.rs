//! Image and mask inputs of the workspace

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

use super::bbox::BoundingBox;
use super::extent::{compute_extent, Rect};
use super::parameters::GenerationParameters;

/// Stable identity of an input, independent of its position in the sequence
pub type InputId = u64;

/// What an input contributes to a generation request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InputRole {
    #[default]
    Image,
    Mask,
}

impl InputRole {
    pub fn label(self) -> &'static str {
        match self {
            InputRole::Image => "Image",
            InputRole::Mask => "Mask",
        }
    }
}

/// Non-owning reference from a mask to the image preceding it.
///
/// `revision` is the target's image revision at the time of linking, so a
/// replaced image on the target counts as a new link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    pub target: InputId,
    pub revision: u64,
    pub empty: bool,
}

/// Per-mask link state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    Unlinked,
    /// Linked image has no pixel data
    LinkedEmpty,
    /// Linked image present and the mask has been fitted to it
    LinkedReady,
}

/// One entry of the ordered input sequence
#[derive(Clone, Debug)]
pub struct ImageInput {
    id: InputId,
    role: InputRole,
    image: Option<RgbaImage>,
    /// Bumped on every image replacement
    revision: u64,
    link: Option<Link>,
    extent: Option<Rect>,
}

impl ImageInput {
    pub(super) fn new(id: InputId, role: InputRole, image: Option<RgbaImage>) -> Self {
        Self {
            id,
            role,
            image: image.filter(|img| img.width() > 0 && img.height() > 0),
            revision: 0,
            link: None,
            extent: None,
        }
    }

    pub fn id(&self) -> InputId {
        self.id
    }

    pub fn role(&self) -> InputRole {
        self.role
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_none()
    }

    pub fn width(&self) -> u32 {
        self.image.as_ref().map_or(0, |img| img.width())
    }

    pub fn height(&self) -> u32 {
        self.image.as_ref().map_or(0, |img| img.height())
    }

    /// Human-readable size, empty string for an empty input
    pub fn size_label(&self) -> String {
        match &self.image {
            Some(img) => format!("{}x{}", img.width(), img.height()),
            None => String::new(),
        }
    }

    pub fn link(&self) -> Option<Link> {
        self.link
    }

    /// Whether the input is linked to an image that has pixel data
    pub fn is_linked(&self) -> bool {
        self.link.is_some_and(|l| !l.empty)
    }

    pub fn link_state(&self) -> LinkState {
        match self.link {
            None => LinkState::Unlinked,
            Some(link) if link.empty => LinkState::LinkedEmpty,
            Some(_) => LinkState::LinkedReady,
        }
    }

    pub fn extent(&self) -> Option<Rect> {
        self.extent
    }

    pub(super) fn set_role(&mut self, role: InputRole) {
        self.role = role;
    }

    pub(super) fn replace_image(&mut self, image: Option<RgbaImage>) {
        self.image = image.filter(|img| img.width() > 0 && img.height() > 0);
        self.revision += 1;
    }

    pub(super) fn set_link(&mut self, link: Option<Link>) {
        self.link = link;
    }

    /// Resize and centre-crop the mask so it matches `target` exactly.
    ///
    /// Returns whether the raster changed.
    pub(super) fn fit_to(&mut self, target: &RgbaImage) -> bool {
        let Some(mask) = self.image.take() else {
            return false;
        };
        let (tw, th) = target.dimensions();
        if mask.dimensions() == (tw, th) {
            self.image = Some(mask);
            return false;
        }

        log::debug!(
            "Fitting mask {} from {}x{} to {}x{}",
            self.id,
            mask.width(),
            mask.height(),
            tw,
            th
        );
        let fitted = DynamicImage::ImageRgba8(mask)
            .resize_to_fill(tw, th, FilterType::Lanczos3)
            .into_rgba8();
        self.image = Some(fitted);
        self.revision += 1;
        true
    }

    /// Recompute the extent from the current raster and parameters.
    ///
    /// Returns whether the extent changed.
    pub(super) fn update_extent(&mut self, params: &GenerationParameters) -> bool {
        let extent = match (&self.image, self.role) {
            (Some(img), InputRole::Mask) => compute_extent(
                BoundingBox::find(img),
                img.dimensions(),
                params.padding,
                (params.width, params.height),
            ),
            _ => None,
        };
        let changed = extent != self.extent;
        self.extent = extent;
        changed
    }
}
