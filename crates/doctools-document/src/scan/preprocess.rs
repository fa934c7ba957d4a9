// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR pre-processing pipeline: grayscale, contrast-limited adaptive histogram
// equalization (CLAHE), non-local means denoising and sharpening, applied to
// photographed or scanned pages before text recognition.

use doctools_core::config::{DenoiseMethod, PreprocessConfig};
use doctools_core::error::DoctoolsError;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::{filter3x3, median_filter};
use tracing::{debug, info, instrument};

use crate::image::processor::ImageProcessor;

/// Prepares a page image for OCR.
///
/// The working image is always 8-bit grayscale; construction performs the
/// grayscale step. Each stage consumes `self` and returns the next stage, so
/// the fixed sequence reads top to bottom:
///
/// ```ignore
/// let ready = OcrPreprocessor::from_bytes(&upload, 2000)?
///     .equalize_contrast(2.0, 8)
///     .denoise_nl_means(10.0, 7, 21)
///     .sharpen()
///     .into_gray();
/// ```
pub struct OcrPreprocessor {
    image: GrayImage,
}

impl OcrPreprocessor {
    // -- Construction ---------------------------------------------------------

    /// Decode an uploaded image, cap its size and convert it to grayscale.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8], max_dimension: u32) -> Result<Self, DoctoolsError> {
        let processor = ImageProcessor::from_bytes(data)?;
        Ok(Self::from_processor(processor, max_dimension))
    }

    /// Wrap an already-decoded image, capping its size and converting it to
    /// grayscale.
    pub fn from_dynamic(image: DynamicImage, max_dimension: u32) -> Self {
        Self::from_processor(ImageProcessor::from_dynamic(image), max_dimension)
    }

    fn from_processor(processor: ImageProcessor, max_dimension: u32) -> Self {
        let image = processor.fit_within(max_dimension).grayscale().into_luma();
        info!(
            width = image.width(),
            height = image.height(),
            "OCR pre-processing input ready"
        );
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_gray(self) -> GrayImage {
        self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        DynamicImage::ImageLuma8(self.image)
    }

    // -- Pipeline -------------------------------------------------------------

    /// Run the configured sequence: CLAHE, denoise, sharpen.
    #[instrument(skip_all)]
    pub fn run(self, config: &PreprocessConfig) -> Self {
        let equalized = self.equalize_contrast(config.clahe_clip_limit, config.clahe_grid);
        let denoised = match config.denoise {
            DenoiseMethod::NonLocalMeans => equalized.denoise_nl_means(
                config.denoise_strength,
                config.template_window,
                config.search_window,
            ),
            DenoiseMethod::Median => equalized.denoise_median(),
            DenoiseMethod::None => equalized,
        };
        if config.sharpen {
            denoised.sharpen()
        } else {
            denoised
        }
    }

    // -- Stages ---------------------------------------------------------------

    /// Contrast-limited adaptive histogram equalization.
    ///
    /// The image is split into a `grid` x `grid` array of tiles; each tile gets
    /// its own equalization curve whose histogram is clipped at
    /// `clip_limit` times the uniform bin height, with the excess spread back
    /// over all bins. Pixels are mapped by bilinear interpolation between the
    /// curves of the four nearest tile centres, which hides tile seams.
    #[instrument(skip(self))]
    pub fn equalize_contrast(self, clip_limit: f32, grid: u32) -> Self {
        debug!("Applying CLAHE");
        Self {
            image: clahe(&self.image, clip_limit, grid),
        }
    }

    /// Non-local means denoising.
    ///
    /// Every pixel becomes a weighted mean of the pixels in its
    /// `search_window` neighbourhood, weighted by how similar the surrounding
    /// `template_window` patches are: `w = exp(-d / h²)` where `d` is the mean
    /// squared patch difference.
    #[instrument(skip(self))]
    pub fn denoise_nl_means(self, h: f32, template_window: u32, search_window: u32) -> Self {
        debug!("Applying non-local means denoising");
        Self {
            image: non_local_means(&self.image, h, template_window, search_window),
        }
    }

    /// 3x3 median filter.
    #[instrument(skip(self))]
    pub fn denoise_median(self) -> Self {
        debug!("Applying median denoising");
        Self {
            image: median_filter(&self.image, 1, 1),
        }
    }

    /// Sharpen with the kernel `[[0,-1,0],[-1,5,-1],[0,-1,0]]`.
    /// Borders replicate the edge pixel.
    #[instrument(skip(self))]
    pub fn sharpen(self) -> Self {
        debug!("Sharpening");
        Self {
            image: sharpen(&self.image),
        }
    }
}

/// Run the full configured pre-processing sequence on a decoded image.
pub fn preprocess_for_ocr(image: DynamicImage, config: &PreprocessConfig) -> GrayImage {
    OcrPreprocessor::from_dynamic(image, config.max_dimension)
        .run(config)
        .into_gray()
}

// -- CLAHE ---------------------------------------------------------------------

fn clahe(gray: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    // Tiles never smaller than one pixel; recount after rounding so no tile is
    // empty.
    let tile_w = width.div_ceil(grid.clamp(1, width));
    let tile_h = height.div_ceil(grid.clamp(1, height));
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let (x0, x1) = (tx * tile_w, ((tx + 1) * tile_w).min(width));
            let (y0, y1) = (ty * tile_h, ((ty + 1) * tile_h).min(height));

            let mut histogram = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    histogram[gray.get_pixel(x, y).0[0] as usize] += 1;
                }
            }
            luts.push(tile_lut(&mut histogram, (x1 - x0) * (y1 - y0), clip_limit));
        }
    }

    debug!(tiles_x, tiles_y, tile_w, tile_h, "CLAHE tile curves computed");

    GrayImage::from_fn(width, height, |x, y| {
        let value = gray.get_pixel(x, y).0[0] as usize;
        let (tx0, tx1, ax) = neighbour_tiles(x, tile_w, tiles_x);
        let (ty0, ty1, ay) = neighbour_tiles(y, tile_h, tiles_y);
        let at = |tx: usize, ty: usize| luts[ty * tiles_x as usize + tx][value] as f32;

        let top = at(tx0, ty0) + (at(tx1, ty0) - at(tx0, ty0)) * ax;
        let bottom = at(tx0, ty1) + (at(tx1, ty1) - at(tx0, ty1)) * ax;
        let mapped = top + (bottom - top) * ay;
        Luma([mapped.round().clamp(0.0, 255.0) as u8])
    })
}

/// Clip a tile histogram and turn it into an equalization lookup table.
fn tile_lut(histogram: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for count in histogram.iter_mut() {
            if *count > limit {
                excess += *count - limit;
                *count = limit;
            }
        }

        let bonus = excess / 256;
        let residual = (excess % 256) as usize;
        for count in histogram.iter_mut() {
            *count += bonus;
        }
        if residual > 0 {
            let step = (256 / residual).max(1);
            for index in (0..256).step_by(step).take(residual) {
                histogram[index] += 1;
            }
        }
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut cumulative = 0u32;
    for (value, count) in histogram.iter().enumerate() {
        cumulative += count;
        lut[value] = (cumulative as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// The two tiles whose centres bracket `pos`, and the weight of the second.
fn neighbour_tiles(pos: u32, tile_size: u32, tile_count: u32) -> (usize, usize, f32) {
    let f = (pos as f32 + 0.5) / tile_size as f32 - 0.5;
    if f <= 0.0 {
        return (0, 0, 0.0);
    }
    let first = f.floor() as u32;
    if first >= tile_count - 1 {
        let last = (tile_count - 1) as usize;
        return (last, last, 0.0);
    }
    (first as usize, first as usize + 1, f - first as f32)
}

// -- Non-local means -------------------------------------------------------------

/// Fast non-local means: for each displacement in the search window the
/// squared-difference image is summed into an integral image, so every patch
/// distance costs O(1) regardless of the template size.
fn non_local_means(gray: &GrayImage, h: f32, template_window: u32, search_window: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let (w, ht) = (width as usize, height as usize);
    let t = (template_window / 2) as isize;
    let s = (search_window / 2) as isize;
    let src = gray.as_raw();
    let weights = nlm_weights((h * h).max(f32::EPSILON));

    let clamp_x = |x: isize| x.clamp(0, w as isize - 1) as usize;
    let clamp_y = |y: isize| y.clamp(0, ht as isize - 1) as usize;

    let mut weight_sum = vec![0f32; w * ht];
    let mut value_sum = vec![0f32; w * ht];
    // Integral of squared differences, (w+1) x (ht+1) with a zero border.
    let stride = w + 1;
    let mut integral = vec![0u64; stride * (ht + 1)];

    for dy in -s..=s {
        for dx in -s..=s {
            for y in 0..ht {
                let shifted_row = clamp_y(y as isize + dy) * w;
                let mut row_sum = 0u64;
                for x in 0..w {
                    let a = src[y * w + x] as i32;
                    let b = src[shifted_row + clamp_x(x as isize + dx)] as i32;
                    row_sum += ((a - b) * (a - b)) as u64;
                    integral[(y + 1) * stride + x + 1] = row_sum + integral[y * stride + x + 1];
                }
            }

            for y in 0..ht {
                let y0 = clamp_y(y as isize - t);
                let y1 = clamp_y(y as isize + t) + 1;
                let shifted_row = clamp_y(y as isize + dy) * w;
                for x in 0..w {
                    let x0 = clamp_x(x as isize - t);
                    let x1 = clamp_x(x as isize + t) + 1;
                    let patch = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                        - integral[y0 * stride + x1]
                        - integral[y1 * stride + x0];
                    let area = ((x1 - x0) * (y1 - y0)) as f32;
                    let distance = (patch as f32 / area).round() as usize;
                    let weight = weights.get(distance).copied().unwrap_or(0.0);

                    let index = y * w + x;
                    weight_sum[index] += weight;
                    value_sum[index] += weight * src[shifted_row + clamp_x(x as isize + dx)] as f32;
                }
            }
        }
    }

    let pixels = value_sum
        .iter()
        .zip(&weight_sum)
        .map(|(value, weight)| (value / weight).round().clamp(0.0, 255.0) as u8)
        .collect();

    // Buffer length is exactly width * height by construction.
    GrayImage::from_raw(width, height, pixels).unwrap_or_else(|| gray.clone())
}

/// `exp(-d / h²)` for every integer mean patch distance `d` whose weight is
/// still significant. Larger distances weigh zero.
fn nlm_weights(h2: f32) -> Vec<f32> {
    let len = ((h2 * NLM_CUTOFF).ceil() as usize + 1).min(MAX_PATCH_DISTANCE + 1);
    (0..len).map(|d| (-(d as f32) / h2).exp()).collect()
}

/// `exp(-12)` is below 1e-5.
const NLM_CUTOFF: f32 = 12.0;
const MAX_PATCH_DISTANCE: usize = 255 * 255;

// -- Sharpening ------------------------------------------------------------------

const SHARPEN_KERNEL: [i32; 9] = [0, -1, 0, -1, 5, -1, 0, -1, 0];

fn sharpen(gray: &GrayImage) -> GrayImage {
    filter3x3::<_, i32, u8>(gray, &SHARPEN_KERNEL)
}
