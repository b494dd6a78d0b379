use crate::error::{CleanupError, Result};
use image::DynamicImage;
use image_hasher::{HashAlg, Hasher, HasherConfig};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Width of every fingerprint, in bits.
pub const FINGERPRINT_BITS: u32 = 64;

/// 64-bit perceptual fingerprint. Only ever compared by Hamming distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Number of differing bits.
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    fn from_hash_bytes(bytes: &[u8]) -> Self {
        let bits = bytes
            .iter()
            .take(8)
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
        Self(bits)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FingerprintAlgorithm {
    /// DCT-preprocessed mean hash.
    #[default]
    #[serde(rename = "phash")]
    PHash,
    Mean,
    Gradient,
    VertGradient,
    /// Horizontal and vertical gradients on a half-size grid.
    DoubleGradient,
    Blockhash,
}

/// Anything that can turn an image file into a [`Fingerprint`].
pub trait Fingerprinter: Sync {
    fn fingerprint_file(&self, path: &Path) -> Result<Fingerprint>;
}

/// Perceptual hasher sized so every algorithm fills at most 64 bits.
pub struct FingerprintComputer {
    hasher: Hasher,
}

impl FingerprintComputer {
    pub fn new(algorithm: FingerprintAlgorithm) -> Self {
        let config = HasherConfig::new().hash_size(8, 8);
        let config = match algorithm {
            // 10x10 resizes to 6x6 and yields 2 * 5 * 6 = 60 bits.
            FingerprintAlgorithm::DoubleGradient => config
                .hash_size(10, 10)
                .hash_alg(HashAlg::DoubleGradient),
            FingerprintAlgorithm::PHash => config.hash_alg(HashAlg::Mean).preproc_dct(),
            FingerprintAlgorithm::Mean => config.hash_alg(HashAlg::Mean),
            FingerprintAlgorithm::Gradient => config.hash_alg(HashAlg::Gradient),
            FingerprintAlgorithm::VertGradient => config.hash_alg(HashAlg::VertGradient),
            FingerprintAlgorithm::Blockhash => config.hash_alg(HashAlg::Blockhash),
        };

        Self {
            hasher: config.to_hasher(),
        }
    }

    pub fn fingerprint(&self, image: &DynamicImage) -> Fingerprint {
        let hash = self.hasher.hash_image(image);
        Fingerprint::from_hash_bytes(hash.as_bytes())
    }
}

impl Default for FingerprintComputer {
    fn default() -> Self {
        Self::new(FingerprintAlgorithm::default())
    }
}

impl Fingerprinter for FingerprintComputer {
    fn fingerprint_file(&self, path: &Path) -> Result<Fingerprint> {
        let image = image::open(path).map_err(|source| CleanupError::UnreadableImage {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.fingerprint(&image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::fs;
    use tempfile::TempDir;

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let intensity = ((x * 3 + y * 7) % 256) as u8;
            Rgb([intensity, intensity, intensity])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_distance_counts_differing_bits() {
        let a = Fingerprint::from_bits(0b1011);
        let b = Fingerprint::from_bits(0b0001);
        assert_eq!(a.distance(&b), 2);
        assert_eq!(b.distance(&a), 2);
        assert_eq!(a.distance(&a), 0);
        assert_eq!(
            Fingerprint::from_bits(0).distance(&Fingerprint::from_bits(u64::MAX)),
            FINGERPRINT_BITS
        );
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(Fingerprint::from_bits(0xab).to_string(), "00000000000000ab");
    }

    #[test]
    fn test_hash_bytes_are_folded_big_endian() {
        let fp = Fingerprint::from_hash_bytes(&[0x01, 0x02, 0, 0, 0, 0, 0, 0xff]);
        assert_eq!(fp.bits(), 0x0102_0000_0000_00ff);
    }

    #[test]
    fn test_identical_pixels_identical_fingerprint() {
        let computer = FingerprintComputer::default();
        let a = computer.fingerprint(&create_test_image(120, 80));
        let b = computer.fingerprint(&create_test_image(120, 80));
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_algorithm_is_deterministic() {
        let img = create_test_image(64, 64);
        for alg in [
            FingerprintAlgorithm::PHash,
            FingerprintAlgorithm::Mean,
            FingerprintAlgorithm::Gradient,
            FingerprintAlgorithm::VertGradient,
            FingerprintAlgorithm::DoubleGradient,
            FingerprintAlgorithm::Blockhash,
        ] {
            let computer = FingerprintComputer::new(alg);
            assert_eq!(computer.fingerprint(&img), computer.fingerprint(&img));
        }
    }

    #[test]
    fn test_fingerprint_file_roundtrips_through_png() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("figure.png");
        let img = create_test_image(100, 100);
        img.save(&path).unwrap();

        let computer = FingerprintComputer::default();
        let from_file = computer.fingerprint_file(&path).unwrap();
        assert_eq!(from_file, computer.fingerprint(&img));
    }

    #[test]
    fn test_corrupt_file_is_unreadable_image() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.png");
        fs::write(&path, b"definitely not a png").unwrap();

        let err = FingerprintComputer::default()
            .fingerprint_file(&path)
            .unwrap_err();
        assert!(matches!(err, CleanupError::UnreadableImage { .. }));
    }

    #[test]
    fn test_algorithm_names() {
        let alg: FingerprintAlgorithm = serde_json::from_str("\"phash\"").unwrap();
        assert_eq!(alg, FingerprintAlgorithm::PHash);
        let alg: FingerprintAlgorithm = serde_json::from_str("\"vert-gradient\"").unwrap();
        assert_eq!(alg, FingerprintAlgorithm::VertGradient);
        let alg: FingerprintAlgorithm = serde_json::from_str("\"double-gradient\"").unwrap();
        assert_eq!(alg, FingerprintAlgorithm::DoubleGradient);
    }

    #[test]
    fn test_double_gradient_fits_in_fingerprint() {
        let hasher = HasherConfig::new()
            .hash_size(10, 10)
            .hash_alg(HashAlg::DoubleGradient)
            .to_hasher();
        let hash = hasher.hash_image(&create_test_image(64, 64));
        assert!(hash.as_bytes().len() <= 8);
        assert!(hash.as_bytes().len() * 8 >= 60);
    }

    #[test]
    fn test_double_gradient_from_config_file() {
        let config: crate::config::FileConfig =
            serde_json::from_str(r#"{"cleanup": {"algorithm": "double-gradient"}}"#).unwrap();
        assert_eq!(config.cleanup.algorithm, FingerprintAlgorithm::DoubleGradient);
    }
}
