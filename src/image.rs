//! Pixel buffers and the generators that fill them.

use crate::event::Geometry;

/// Tightly packed RGBA image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Image {
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: rgba.repeat(count),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Produces the content shown in the window for a given size.
pub trait ImageGenerator {
    fn generate(&mut self, geometry: Geometry) -> Image;
}

/// Uniform colour everywhere.
#[derive(Debug, Clone, Copy)]
pub struct SolidFill {
    pub rgba: [u8; 4],
}

impl SolidFill {
    pub fn new(rgba: [u8; 4]) -> Self {
        Self { rgba }
    }
}

impl ImageGenerator for SolidFill {
    fn generate(&mut self, geometry: Geometry) -> Image {
        Image::filled(geometry.width, geometry.height, self.rgba)
    }
}
