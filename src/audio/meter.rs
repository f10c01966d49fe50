//! RMS decibel energy of an audio block.

/// Floor added to the RMS amplitude before taking the logarithm, so silence
/// produces a finite level instead of a log-domain error.
pub const RMS_FLOOR: f32 = 1e-6;

/// Decibel energy of a block of normalized samples.
///
/// Root-mean-square amplitude over all samples, shifted by [`RMS_FLOOR`]:
/// `20 * log10(rms + RMS_FLOOR)`. An empty block evaluates to the floor
/// value alone (-120 dB), the same level an all-zero block produces.
pub fn level_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 20.0 * RMS_FLOOR.log10();
    }
    let mean_square = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    20.0 * (mean_square.sqrt() + RMS_FLOOR).log10()
}
