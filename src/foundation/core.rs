use crate::foundation::error::{FitError, FitResult};

/// Pixel dimensions of the render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> FitResult<Self> {
        if width == 0 || height == 0 {
            return Err(FitError::validation("ImageSize width and height must be > 0"));
        }
        Ok(Self { width, height })
    }

    pub fn square(side: u32) -> FitResult<Self> {
        Self::new(side, side)
    }

    pub fn pixel_count(self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
        }
    }
}

/// A single-channel floating point image, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameF32 {
    pub size: ImageSize,
    pub data: Vec<f32>,
}

impl FrameF32 {
    pub fn zeroed(size: ImageSize) -> Self {
        Self {
            size,
            data: vec![0.0; size.pixel_count()],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[(y as usize) * (self.size.width as usize) + (x as usize)]
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().map(|&v| f64::from(v)).sum()
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
