//! Sliding-window tiling of an (input, label) image pair.

use crate::common::*;

/// Geometry of the sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileParams {
    tile_size: u32,
    stride: u32,
    downsample_factor: u32,
}

impl TileParams {
    pub fn new(tile_size: u32, stride: u32, downsample_factor: u32) -> Result<Self> {
        if tile_size == 0 {
            return Err(Error::invalid_parameter("tile size must be at least 1"));
        }
        if stride == 0 {
            return Err(Error::invalid_parameter("sliding step must be at least 1"));
        }
        if downsample_factor == 0 {
            return Err(Error::invalid_parameter(
                "downsample factor must be greater than or equal to 1",
            ));
        }

        Ok(Self {
            tile_size,
            stride,
            downsample_factor,
        })
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn downsample_factor(&self) -> u32 {
        self.downsample_factor
    }
}

/// A cropped input tile and the label tile at the same offset.
#[derive(Debug, Clone)]
pub struct TilePair {
    /// `(row, col)` of the top-left pixel in the (downsampled) source.
    pub origin: (u32, u32),
    pub input: DynamicImage,
    pub label: DynamicImage,
}

/// Downsamples both images, checks that they agree in size and starts the scan.
pub fn crop(input: DynamicImage, label: DynamicImage, params: TileParams) -> Result<TileIter> {
    let input = downsample(input, params.downsample_factor);
    let label = downsample(label, params.downsample_factor);

    if input.dimensions() != label.dimensions() {
        return Err(Error::DimensionMismatch {
            input: input.dimensions(),
            label: label.dimensions(),
        });
    }

    let (width, height) = input.dimensions();
    let origins = tile_origins(height, width, params.tile_size, params.stride);

    Ok(TileIter {
        input,
        label,
        tile_size: params.tile_size,
        origins,
    })
}

/// Shrinks the image by integer division of both sides.
fn downsample(image: DynamicImage, factor: u32) -> DynamicImage {
    if factor <= 1 {
        return image;
    }

    let (width, height) = image.dimensions();
    let (width, height) = (width / factor, height / factor);
    if width == 0 || height == 0 {
        // nothing can be cropped from a degenerated image
        return DynamicImage::new_luma8(width, height);
    }
    image.resize_exact(width, height, FilterType::Nearest)
}

/// Enumerates the top-left corners of all full tiles in row-major order.
pub fn tile_origins(height: u32, width: u32, tile_size: u32, stride: u32) -> TileOrigins {
    TileOrigins {
        height,
        width,
        tile_size,
        stride: stride.max(1),
        row: 0,
        col: 0,
    }
}

#[derive(Debug, Clone)]
pub struct TileOrigins {
    height: u32,
    width: u32,
    tile_size: u32,
    stride: u32,
    row: u32,
    col: u32,
}

impl Iterator for TileOrigins {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let fits = |offset: u32, extent: u32| {
            u64::from(offset) + u64::from(self.tile_size) <= u64::from(extent)
        };

        while self.row < self.height {
            let (i, j) = (self.row, self.col);

            match self.col.checked_add(self.stride) {
                Some(col) if col < self.width => self.col = col,
                _ => {
                    self.col = 0;
                    self.row = self.row.saturating_add(self.stride);
                }
            }

            // partial tiles on the borders are dropped
            if fits(i, self.height) && fits(j, self.width) {
                return Some((i, j));
            }
        }

        None
    }
}

/// The tile pairs of one image pair. Consumed once.
#[derive(Debug)]
pub struct TileIter {
    input: DynamicImage,
    label: DynamicImage,
    tile_size: u32,
    origins: TileOrigins,
}

impl TileIter {
    /// Size of the (downsampled) source as `(width, height)`.
    pub fn source_dimensions(&self) -> (u32, u32) {
        self.input.dimensions()
    }
}

impl Iterator for TileIter {
    type Item = TilePair;

    fn next(&mut self) -> Option<Self::Item> {
        let (row, col) = self.origins.next()?;
        let size = self.tile_size;
        Some(TilePair {
            origin: (row, col),
            input: self.input.crop_imm(col, row, size, size),
            label: self.label.crop_imm(col, row, size, size),
        })
    }
}
