use glam::UVec2;

/// Curve applied to colours after bloom and before display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneMappingMode {
    None,
    Reinhard,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneMapping {
    pub mode: ToneMappingMode,
    pub exposure: f32,
}

impl Default for ToneMapping {
    fn default() -> Self {
        Self {
            mode: ToneMappingMode::Reinhard,
            exposure: 1.0,
        }
    }
}

/// Number of blurred mip levels in the bloom chain.
pub const BLOOM_MIPS: usize = 5;
/// Gaussian kernel radius of each bloom mip level.
pub const BLOOM_KERNEL_RADII: [u32; BLOOM_MIPS] = [3, 5, 7, 9, 11];
/// Per-mip weights before the radius mirror is applied.
pub const BLOOM_FACTORS: [f32; BLOOM_MIPS] = [1.0, 0.8, 0.6, 0.4, 0.2];

/// Parameters of the Unreal-style bloom pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomPass {
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
    /// Width of the smooth step above `threshold`.
    pub smooth_width: f32,
    pub resolution: UVec2,
}

impl BloomPass {
    pub fn new(resolution: UVec2, strength: f32, radius: f32, threshold: f32) -> Self {
        Self {
            strength,
            radius,
            threshold,
            smooth_width: 0.01,
            resolution,
        }
    }

    /// Weight of mip `level` after mirroring by `radius`.
    pub fn mip_weight(&self, level: usize) -> f32 {
        let factor = BLOOM_FACTORS[level];
        factor + (1.2 - factor - factor) * self.radius
    }

    /// Sizes of the blurred mip chain, starting at half resolution.
    pub fn mip_sizes(&self) -> [UVec2; BLOOM_MIPS] {
        let mut size = UVec2::new(half(self.resolution.x), half(self.resolution.y));
        let mut sizes = [UVec2::ONE; BLOOM_MIPS];
        for slot in sizes.iter_mut() {
            *slot = size;
            size = UVec2::new(half(size.x), half(size.y));
        }
        sizes
    }
}

fn half(value: u32) -> u32 {
    ((value as f32 / 2.0).round() as u32).max(1)
}

/// Pass chain drawn for every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Render,
    Bloom,
    Output,
}

/// CPU-side description of the post-processing pipeline. The GPU renderer
/// reads it each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Composer {
    pub passes: Vec<PassKind>,
    pub tone_mapping: ToneMapping,
    pub bloom: BloomPass,
    size: UVec2,
}

impl Composer {
    pub fn new(size: UVec2, bloom: BloomPass) -> Self {
        Self {
            passes: vec![PassKind::Render, PassKind::Bloom, PassKind::Output],
            tone_mapping: ToneMapping::default(),
            bloom,
            size,
        }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.size = UVec2::new(width, height);
        self.bloom.resolution = self.size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_halves_until_one_pixel() {
        let bloom = BloomPass::new(UVec2::new(800, 6), 1.0, 0.0, 0.0);
        let sizes = bloom.mip_sizes();
        assert_eq!(sizes[0], UVec2::new(400, 3));
        assert_eq!(sizes[1], UVec2::new(200, 2));
        assert_eq!(sizes[4], UVec2::new(25, 1));
    }

    #[test]
    fn radius_mirrors_mip_weights() {
        let mut bloom = BloomPass::new(UVec2::ONE, 1.0, 0.0, 0.0);
        assert_eq!(bloom.mip_weight(0), 1.0);
        bloom.radius = 1.0;
        assert!((bloom.mip_weight(0) - 0.2).abs() < 1e-6);
        assert!((bloom.mip_weight(4) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn composer_resize_follows_bloom_resolution() {
        let mut composer = Composer::new(UVec2::new(4, 4), BloomPass::new(UVec2::new(4, 4), 3.0, 0.0, 0.0));
        composer.set_size(640, 480);
        assert_eq!(composer.size(), UVec2::new(640, 480));
        assert_eq!(composer.bloom.resolution, UVec2::new(640, 480));
        assert_eq!(composer.passes, vec![PassKind::Render, PassKind::Bloom, PassKind::Output]);
    }
}
