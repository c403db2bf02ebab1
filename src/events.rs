use std::path::PathBuf;

/// Texture a decoded image is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Item(usize),
    Backdrop,
}

#[derive(Debug, Clone)]
pub struct LoadMedia {
    pub slot: TextureSlot,
    pub path: PathBuf,
}

/// RGBA8 pixels ready for upload.
#[derive(Debug)]
pub struct DecodedImage {
    pub slot: TextureSlot,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }
}

#[derive(Debug)]
pub enum LoaderEvent {
    Loaded(DecodedImage),
    Failed { slot: TextureSlot, path: PathBuf },
}

/// What the gallery tells the outside world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryEvent {
    /// The pointer moved onto another item, or off every item.
    Hovered { index: Option<usize>, id: Option<String> },
    /// An item was clicked; navigation is up to the receiver.
    Open { index: usize, id: String },
    /// The indicator moved to another slide.
    SlideChanged { index: usize, total: usize },
    /// Every image settled, or the load timeout expired.
    Ready { timed_out: bool },
}
