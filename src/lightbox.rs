//! Lightbox activation contract.
//!
//! Rendered image figures carry a [`LightboxRequest`] when fullscreen viewing
//! is enabled. Activating a figure hands the request's image list and start
//! index to whatever implements [`Lightbox`]. A single image block opens a
//! one-image list; a gallery opens over the whole gallery so prev/next can
//! move across it.
//!
//! [`LightboxViewer`] is the reference state machine. The generated site's
//! `lightbox.js` follows the same rules: navigation wraps at both ends and
//! the start index is clamped into range.

use crate::responsive::ResolvedImage;

pub trait Lightbox {
    fn open(&mut self, images: &[ResolvedImage], start_index: usize);
    fn close(&mut self);
}

/// Request to open a lightbox over `images`, starting at `start_index`.
#[derive(Debug, Clone, PartialEq)]
pub struct LightboxRequest {
    pub images: Vec<ResolvedImage>,
    pub start_index: usize,
}

impl LightboxRequest {
    pub fn dispatch(&self, lightbox: &mut dyn Lightbox) {
        lightbox.open(&self.images, self.start_index);
    }
}

#[derive(Debug, Default)]
pub struct LightboxViewer {
    images: Vec<ResolvedImage>,
    index: usize,
    open: bool,
}

impl LightboxViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&ResolvedImage> {
        if self.open {
            self.images.get(self.index)
        } else {
            None
        }
    }

    pub fn next(&mut self) {
        if self.open && !self.images.is_empty() {
            self.index = (self.index + 1) % self.images.len();
        }
    }

    pub fn previous(&mut self) {
        if self.open && !self.images.is_empty() {
            self.index = self
                .index
                .checked_sub(1)
                .unwrap_or(self.images.len() - 1);
        }
    }
}

impl Lightbox for LightboxViewer {
    fn open(&mut self, images: &[ResolvedImage], start_index: usize) {
        if images.is_empty() {
            return;
        }
        self.images = images.to_vec();
        self.index = start_index.min(images.len() - 1);
        self.open = true;
    }

    fn close(&mut self) {
        self.open = false;
        self.images.clear();
        self.index = 0;
    }
}
