//! Region rasterization
//!
//! Polygon regions are scan-converted with the even-odd rule over all loops of
//! the region combined, sampling at pixel centers `(x + 0.5, y + 0.5)`. An edge
//! crosses a scanline when `min(y0, y1) <= yc < max(y0, y1)`, so a center lying
//! exactly on a top edge is inside and one on a bottom edge is outside.
//! Overlapping loops carve holes.
//!
//! Run-length regions follow the COCO convention: column-major order
//! (`index = y + height * x`), alternating runs that start with background.

use crate::coco::{Annotation, RleCounts, Segmentation};
use crate::error::SplitError;
use crate::mask::BinaryMask;

/// A polygon vertex in pixel coordinates
pub type Point = [f64; 2];

/// A run-length encoded bitmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLength {
    height: u32,
    width: u32,
    counts: Vec<u64>,
}

impl RunLength {
    /// Validate that the runs cover exactly `height * width` pixels.
    /// An empty run list is accepted and decodes to an empty mask.
    pub fn new(height: u32, width: u32, counts: Vec<u64>) -> Result<Self, String> {
        if !counts.is_empty() {
            let pixels = height as u64 * width as u64;
            let total = counts
                .iter()
                .try_fold(0u64, |acc, &run| acc.checked_add(run))
                .ok_or_else(|| "run lengths overflow".to_string())?;
            if total != pixels {
                return Err(format!(
                    "run lengths sum to {} but a {}x{} region has {} pixels",
                    total, width, height, pixels
                ));
            }
        }
        Ok(Self {
            height,
            width,
            counts,
        })
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }
}

/// The geometric extent of one annotation
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// Closed loops; the last vertex connects back to the first
    Polygons(Vec<Vec<Point>>),
    RunLength(RunLength),
}

impl Region {
    /// Type the raw segmentation of an annotation.
    ///
    /// A missing segmentation is an empty polygon set.
    pub fn from_annotation(annotation: &Annotation) -> Result<Region, SplitError> {
        let id = annotation.id;
        match &annotation.segmentation {
            None => Ok(Region::Polygons(Vec::new())),
            Some(Segmentation::Polygons(loops)) => loops
                .iter()
                .map(|coords| parse_loop(id, coords))
                .collect::<Result<Vec<_>, _>>()
                .map(Region::Polygons),
            Some(Segmentation::FlatPolygon(coords)) => {
                Ok(Region::Polygons(vec![parse_loop(id, coords)?]))
            }
            Some(Segmentation::Rle { size, counts }) => {
                let [height, width] = *size;
                let counts = match counts {
                    RleCounts::Uncompressed(counts) => counts.clone(),
                    RleCounts::Compressed(encoded) => decode_rle_string(encoded)
                        .map_err(|reason| SplitError::invalid_region(id, reason))?,
                };
                RunLength::new(height, width, counts)
                    .map(Region::RunLength)
                    .map_err(|reason| SplitError::invalid_region(id, reason))
            }
            Some(Segmentation::Unrecognized(value)) => Err(SplitError::invalid_region(
                id,
                format!("unrecognized segmentation: {}", value),
            )),
        }
    }
}

fn parse_loop(annotation_id: u64, coords: &[f64]) -> Result<Vec<Point>, SplitError> {
    if coords.len() % 2 != 0 {
        return Err(SplitError::invalid_region(
            annotation_id,
            format!("odd number of polygon coordinates ({})", coords.len()),
        ));
    }
    if coords.iter().any(|v| !v.is_finite()) {
        return Err(SplitError::invalid_region(
            annotation_id,
            "non-finite polygon coordinate",
        ));
    }
    Ok(coords.chunks_exact(2).map(|xy| [xy[0], xy[1]]).collect())
}

/// Decode the pycocotools compressed `counts` string.
///
/// Each count is a little-endian sequence of 5-bit groups offset by 48, with
/// bit 0x20 as continuation and bit 0x10 of the last group as sign. Counts
/// after the second are stored as deltas against the count two positions back.
pub fn decode_rle_string(encoded: &str) -> Result<Vec<u64>, String> {
    const MAX_GROUPS: u32 = 12;

    let bytes = encoded.as_bytes();
    let mut counts: Vec<i64> = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let mut value: i64 = 0;
        let mut groups = 0;
        loop {
            let byte = *bytes
                .get(pos)
                .ok_or_else(|| "truncated run-length string".to_string())?;
            let chunk = i64::from(byte) - 48;
            if !(0..64).contains(&chunk) {
                return Err(format!("invalid run-length character {:?}", byte as char));
            }
            value |= (chunk & 0x1f) << (5 * groups);
            pos += 1;
            groups += 1;
            if chunk & 0x20 == 0 {
                if chunk & 0x10 != 0 {
                    value |= -1i64 << (5 * groups);
                }
                break;
            }
            if groups >= MAX_GROUPS {
                return Err("run-length value too large".to_string());
            }
        }
        if counts.len() > 2 {
            value += counts[counts.len() - 2];
        }
        if value < 0 {
            return Err(format!("negative run length {}", value));
        }
        counts.push(value);
    }

    Ok(counts.into_iter().map(|c| c as u64).collect())
}

/// Rasterize a region into a mask of `width` x `height`
pub fn rasterize(region: &Region, width: u32, height: u32) -> Result<BinaryMask, SplitError> {
    let mut mask = BinaryMask::new(width, height);
    rasterize_into(region, &mut mask)?;
    Ok(mask)
}

/// OR a region into an existing mask, leaving its foreground untouched.
///
/// On error the mask may already hold part of the region.
pub fn rasterize_into(region: &Region, mask: &mut BinaryMask) -> Result<(), SplitError> {
    match region {
        Region::Polygons(loops) => fill_polygons(mask, loops),
        Region::RunLength(rle) => {
            if (rle.width, rle.height) != mask.dimensions() {
                return Err(SplitError::DimensionMismatch {
                    expected: mask.dimensions(),
                    found: (rle.width, rle.height),
                });
            }
            fill_run_length(mask, rle);
        }
    }
    Ok(())
}

/// Type and rasterize one annotation against its image size
pub fn rasterize_annotation(
    annotation: &Annotation,
    width: u32,
    height: u32,
) -> Result<BinaryMask, SplitError> {
    let region = Region::from_annotation(annotation)?;
    rasterize(&region, width, height)
}

fn fill_polygons(mask: &mut BinaryMask, loops: &[Vec<Point>]) {
    // Loops with fewer than 3 vertices enclose nothing
    let edges: Vec<(Point, Point)> = loops
        .iter()
        .filter(|vertices| vertices.len() >= 3)
        .flat_map(|vertices| {
            vertices
                .iter()
                .copied()
                .zip(vertices.iter().copied().cycle().skip(1))
        })
        .collect();

    if edges.is_empty() {
        return;
    }

    let (min_y, max_y) = edges
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), (a, b)| {
            (lo.min(a[1]).min(b[1]), hi.max(a[1]).max(b[1]))
        });

    let width = f64::from(mask.width());
    let height = f64::from(mask.height());
    // Rows whose center lies in [min_y, max_y)
    let first_row = (min_y - 0.5).ceil().clamp(0.0, height) as u32;
    let end_row = (max_y - 0.5).ceil().clamp(0.0, height) as u32;

    let mut crossings: Vec<f64> = Vec::with_capacity(edges.len());
    for y in first_row..end_row {
        let yc = f64::from(y) + 0.5;
        crossings.clear();
        for &([x0, y0], [x1, y1]) in &edges {
            if (y0 <= yc && yc < y1) || (y1 <= yc && yc < y0) {
                crossings.push(x0 + (yc - y0) * (x1 - x0) / (y1 - y0));
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        // Pixel x is inside a span when xa <= x + 0.5 < xb
        for span in crossings.chunks_exact(2) {
            let start = (span[0] - 0.5).ceil().clamp(0.0, width) as u32;
            let end = (span[1] - 0.5).ceil().clamp(0.0, width) as u32;
            mask.fill_span(y, start, end);
        }
    }
}

fn fill_run_length(mask: &mut BinaryMask, rle: &RunLength) {
    let height = u64::from(rle.height);
    if height == 0 || rle.width == 0 {
        return;
    }
    let mut offset = 0u64;
    for (i, &run) in rle.counts.iter().enumerate() {
        if i % 2 == 1 {
            for k in offset..offset + run {
                mask.set((k / height) as u32, (k % height) as u32);
            }
        }
        offset += run;
    }
}
