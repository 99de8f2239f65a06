//! CPU-side texture images
//!
//! A [`TextureImage`] is the RGBA8 pixel block handed to
//! [`GpuContext::create_texture`](crate::gfx::gpu::GpuContext::create_texture).
//! Images come from solid colours, raw canvas pixels, or encoded image files.

use image::{imageops::FilterType, RgbaImage};

use crate::error::{Result, SceneError};

/// Side length that lazily loaded board images are resampled to
pub const BOARD_TEXTURE_SIZE: u32 = 2048;

/// RGBA8 pixels, row-major, top row first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Colour description accepted by [`TextureImage::from_color`]
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpec {
    /// `#rrggbb` or `#rrggbbaa`
    Hex(String),
    /// Channels in 0..=1; alpha defaults to 1
    Rgba { r: f32, g: f32, b: f32, a: Option<f32> },
}

impl ColorSpec {
    pub fn hex(hex: impl Into<String>) -> Self {
        ColorSpec::Hex(hex.into())
    }

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        ColorSpec::Rgba { r, g, b, a: None }
    }

    /// Resolves to RGBA8 bytes
    ///
    /// # Errors
    /// [`SceneError::InvalidColor`] for malformed hex strings.
    pub fn to_rgba8(&self) -> Result<[u8; 4]> {
        match self {
            ColorSpec::Hex(hex) => parse_hex(hex),
            ColorSpec::Rgba { r, g, b, a } => {
                let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).floor() as u8;
                Ok([channel(*r), channel(*g), channel(*b), channel(a.unwrap_or(1.0))])
            }
        }
    }
}

fn parse_hex(hex: &str) -> Result<[u8; 4]> {
    let invalid = || SceneError::InvalidColor(hex.to_string());
    let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
    if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
        return Err(invalid());
    }
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
    let alpha = if digits.len() == 8 { byte(6)? } else { 255 };
    Ok([byte(0)?, byte(2)?, byte(4)?, alpha])
}

impl TextureImage {
    /// Wraps raw RGBA pixels, as read back from a canvas.
    ///
    /// Returns `None` when `pixels` is not exactly `width * height * 4` bytes.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == (width as usize) * (height as usize) * 4).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// 1x1 texture of a single colour
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }

    pub fn from_color(color: &ColorSpec) -> Result<Self> {
        Ok(Self::solid(color.to_rgba8()?))
    }

    /// Decodes PNG or JPEG bytes
    pub fn from_encoded(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self::from_image(img))
    }

    pub fn from_image(img: RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Stretches the image onto a `size`x`size` square
    pub fn resampled(&self, size: u32) -> Self {
        match RgbaImage::from_raw(self.width, self.height, self.pixels.clone()) {
            Some(img) => Self::from_image(image::imageops::resize(&img, size, size, FilterType::Triangle)),
            None => {
                log::warn!(
                    "Texture image {}x{} has {} bytes, cannot resample",
                    self.width,
                    self.height,
                    self.pixels.len()
                );
                self.clone()
            }
        }
    }
}
