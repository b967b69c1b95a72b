//! Perceptual image hashing for similarity detection.
//!
//! This module provides the [`PerceptualHasher`] which decodes an image once
//! and derives two complementary digests from it:
//!
//! - **structural**: DCT preprocessing followed by a median threshold (pHash).
//!   Stable under resizing, recompression and mild color shifts.
//! - **gradient**: adjacent-pixel brightness comparisons (dHash). Cheaper and
//!   tolerant of small crops and local edits.
//!
//! Both digests are `grid × grid` bits wide, so a larger grid makes matching
//! stricter and widens the Hamming-distance domain.

use image_hasher::{HashAlg, HasherConfig, ImageHash};
use std::path::Path;
use thiserror::Error;

/// Default perceptual grid size (16×16 → 256-bit digests).
pub const DEFAULT_GRID_SIZE: u32 = 16;

/// Errors that can occur during perceptual hashing.
#[derive(Debug, Error)]
pub enum PerceptualError {
    /// Failed to open or decode the image.
    #[error("Failed to decode image {0}: {1}")]
    Decode(String, #[source] image::ImageError),

    /// A stored digest string could not be parsed.
    #[error("Invalid perceptual digest encoding: {0}")]
    InvalidDigest(String),
}

/// The pair of perceptual digests computed for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerceptualDigests {
    /// DCT-based digest.
    pub structural: ImageHash,
    /// Gradient-based digest.
    pub gradient: ImageHash,
}

impl PerceptualDigests {
    /// Create a digest pair.
    #[must_use]
    pub fn new(structural: ImageHash, gradient: ImageHash) -> Self {
        Self {
            structural,
            gradient,
        }
    }

    /// Sum of the structural and gradient Hamming distances.
    ///
    /// The combined distance is half of this value; callers compare
    /// `distance_sum <= 2 * threshold` to stay in integers.
    #[must_use]
    pub fn distance_sum(&self, other: &Self) -> u32 {
        self.structural.dist(&other.structural) + self.gradient.dist(&other.gradient)
    }

    /// Mean of the structural and gradient Hamming distances.
    #[must_use]
    pub fn combined_distance(&self, other: &Self) -> f64 {
        f64::from(self.distance_sum(other)) / 2.0
    }

    /// Bit length of each digest.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.structural.as_bytes().len() * 8
    }
}

/// Computes structural and gradient perceptual digests for images.
pub struct PerceptualHasher {
    structural: image_hasher::Hasher,
    gradient: image_hasher::Hasher,
    grid_size: u32,
}

impl PerceptualHasher {
    /// Create a new hasher producing `grid_size × grid_size` bit digests.
    pub fn new(grid_size: u32) -> Self {
        let structural = HasherConfig::new()
            .hash_size(grid_size, grid_size)
            .hash_alg(HashAlg::Median)
            .preproc_dct()
            .to_hasher();
        let gradient = HasherConfig::new()
            .hash_size(grid_size, grid_size)
            .hash_alg(HashAlg::Gradient)
            .to_hasher();

        Self {
            structural,
            gradient,
            grid_size,
        }
    }

    /// Decode the image at `path` and compute both digests.
    ///
    /// # Errors
    ///
    /// Returns [`PerceptualError::Decode`] if the file cannot be opened or
    /// is not a decodable image.
    pub fn compute<P: AsRef<Path>>(&self, path: P) -> Result<PerceptualDigests, PerceptualError> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|e| PerceptualError::Decode(path.display().to_string(), e))?;

        Ok(self.compute_image(&img))
    }

    /// Compute both digests for an already decoded image.
    #[must_use]
    pub fn compute_image(&self, img: &image::DynamicImage) -> PerceptualDigests {
        PerceptualDigests {
            structural: self.structural.hash_image(img),
            gradient: self.gradient.hash_image(img),
        }
    }

    /// Grid size this hasher was configured with.
    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// Bit length of the digests this hasher produces.
    pub fn digest_bits(&self) -> u32 {
        self.grid_size * self.grid_size
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE)
    }
}

/// Encode a digest for storage.
#[must_use]
pub fn digest_to_string(digest: &ImageHash) -> String {
    digest.to_base64()
}

/// Decode a digest previously produced by [`digest_to_string`].
///
/// # Errors
///
/// Returns [`PerceptualError::InvalidDigest`] for malformed input.
pub fn digest_from_string(s: &str) -> Result<ImageHash, PerceptualError> {
    ImageHash::from_base64(s).map_err(|_| PerceptualError::InvalidDigest(s.to_string()))
}
