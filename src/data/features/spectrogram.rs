// Log-power spectrogram: |STFT|² in dB relative to the map's own maximum.

use crate::data::features::stft::{power_to_db, PowerStft};
use crate::domain::sample::FeatureMap;
use crate::domain::traits::FeatureExtractor;

#[derive(Default)]
pub struct LogSpectrogram {
    stft: PowerStft,
}

impl LogSpectrogram {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FeatureExtractor for LogSpectrogram {
    fn extract(&self, waveform: &[f32]) -> FeatureMap {
        let power = self.stft.power(waveform);
        let reference = power.fold(0.0f32, |m, &p| m.max(p));
        power_to_db(&power, reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::features::stft::N_FFT;
    use crate::domain::sample::SAMPLE_RATE;
    use ndarray::Axis;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    #[test]
    fn test_sine_energy_peaks_at_its_bin() {
        let extractor = LogSpectrogram::new();
        let map = extractor.extract(&sine(1000.0, 16_000));
        assert_eq!(map.nrows(), N_FFT / 2 + 1);

        let profile = map.mean_axis(Axis(1)).unwrap();
        let peak_bin = profile
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let expected = (1000.0 * N_FFT as f32 / SAMPLE_RATE as f32).round() as usize;
        assert!(peak_bin.abs_diff(expected) <= 1, "peak at {peak_bin}, expected {expected}");
    }

    #[test]
    fn test_maximum_is_zero_db() {
        let map = LogSpectrogram::new().extract(&sine(440.0, 8_000));
        let max = map.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        assert!(max.abs() < 1e-4);
    }
}
