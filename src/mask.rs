//! Binary occupancy masks and their accumulation

use image::GrayImage;
use std::path::Path;

use crate::error::SplitError;

/// Value written for foreground pixels when a mask is persisted
pub const MASK_FOREGROUND: u8 = 255;

/// A row-major width x height grid of {0, 1}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BinaryMask {
    /// An all-background mask
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Build a mask from row-major cells; any non-zero cell is foreground
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, SplitError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(SplitError::BufferSize {
                expected,
                found: data.len(),
            });
        }
        let data = data.into_iter().map(|v| u8::from(v != 0)).collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[self.index(x, y)] != 0
    }

    pub fn set(&mut self, x: u32, y: u32) {
        if x < self.width && y < self.height {
            let index = self.index(x, y);
            self.data[index] = 1;
        }
    }

    /// Mark `[x_start, x_end)` on row `y`
    pub(crate) fn fill_span(&mut self, y: u32, x_start: u32, x_end: u32) {
        let x_end = x_end.min(self.width);
        if y >= self.height || x_start >= x_end {
            return;
        }
        let row = y as usize * self.width as usize;
        self.data[row + x_start as usize..row + x_end as usize].fill(1);
    }

    /// Number of foreground pixels
    pub fn count_ones(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }

    /// In-place pixel-wise OR
    pub fn union_with(&mut self, other: &BinaryMask) -> Result<(), SplitError> {
        if self.dimensions() != other.dimensions() {
            return Err(SplitError::DimensionMismatch {
                expected: self.dimensions(),
                found: other.dimensions(),
            });
        }
        for (a, &b) in self.data.iter_mut().zip(&other.data) {
            *a |= b;
        }
        Ok(())
    }

    /// The persisted form: 255 = object, 0 = background
    pub fn to_gray_image(&self) -> GrayImage {
        let pixels = self.data.iter().map(|&v| v * MASK_FOREGROUND).collect();
        // The buffer length always equals width * height
        GrayImage::from_raw(self.width, self.height, pixels)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    /// Write the mask as a single-channel PNG
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SplitError> {
        self.to_gray_image()
            .save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Merge a sequence of equally sized masks with pixel-wise OR
///
/// The result does not depend on the order of `masks`. An empty sequence is
/// rejected because a class is only accumulated when at least one
/// annotation exists.
pub fn accumulate<I>(masks: I) -> Result<BinaryMask, SplitError>
where
    I: IntoIterator<Item = BinaryMask>,
{
    let mut masks = masks.into_iter();
    let mut merged = masks.next().ok_or(SplitError::EmptyAccumulation)?;
    for mask in masks {
        merged.union_with(&mask)?;
    }
    Ok(merged)
}
