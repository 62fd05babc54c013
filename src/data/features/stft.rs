// Shared short-time Fourier transform for the spectrogram and MFCC
// extractors: periodic Hann window, centred frames with reflect padding,
// squared magnitude out.

use std::sync::Arc;

use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

pub const N_FFT: usize = 2048;
pub const HOP_LENGTH: usize = 512;

/// Smallest power value fed to the logarithm.
const AMIN: f32 = 1e-10;
/// Dynamic range kept below the peak, in dB.
pub const TOP_DB: f32 = 80.0;

pub struct PowerStft {
    fft:    Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    n_fft:  usize,
    hop:    usize,
}

impl PowerStft {
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(n_fft);
        let window = (0..n_fft)
            .map(|i| {
                let angle = 2.0 * std::f32::consts::PI * i as f32 / n_fft as f32;
                0.5 - 0.5 * angle.cos()
            })
            .collect();
        Self { fft, window, n_fft, hop }
    }

    pub fn n_freq(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frames produced for a signal of `len` samples (centred framing).
    pub fn frames(&self, len: usize) -> usize {
        1 + len / self.hop
    }

    /// Power spectrogram, shape `[n_fft / 2 + 1, frames]`.
    pub fn power(&self, signal: &[f32]) -> Array2<f32> {
        let pad = self.n_fft / 2;
        let padded: Vec<f32> = (0..signal.len() + 2 * pad)
            .map(|j| signal[reflect_index(j as isize - pad as isize, signal.len())])
            .collect();

        let n_frames = self.frames(signal.len());
        let mut out = Array2::<f32>::zeros((self.n_freq(), n_frames));
        let mut buf = vec![Complex::new(0.0f32, 0.0); self.n_fft];

        for t in 0..n_frames {
            let frame = &padded[t * self.hop..t * self.hop + self.n_fft];
            for ((b, &x), &w) in buf.iter_mut().zip(frame).zip(&self.window) {
                *b = Complex::new(x * w, 0.0);
            }
            self.fft.process(&mut buf);
            for (k, c) in buf.iter().take(self.n_freq()).enumerate() {
                out[[k, t]] = c.norm_sqr();
            }
        }
        out
    }
}

impl Default for PowerStft {
    fn default() -> Self {
        Self::new(N_FFT, HOP_LENGTH)
    }
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge sample.
fn reflect_index(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let m = i.rem_euclid(period);
    if m >= len as isize {
        (period - m) as usize
    } else {
        m as usize
    }
}

/// Power to decibels relative to `reference`, floored `TOP_DB` below the peak.
pub fn power_to_db(power: &Array2<f32>, reference: f32) -> Array2<f32> {
    let offset = 10.0 * reference.max(AMIN).log10();
    let mut db = power.mapv(|p| 10.0 * p.max(AMIN).log10() - offset);
    let peak = db.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let floor = peak - TOP_DB;
    db.mapv_inplace(|v| v.max(floor));
    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_index() {
        // x = [a b c d]: x[-2] = c, x[-1] = b, x[4] = c, x[5] = b
        assert_eq!(reflect_index(-2, 4), 2);
        assert_eq!(reflect_index(-1, 4), 1);
        assert_eq!(reflect_index(0, 4), 0);
        assert_eq!(reflect_index(4, 4), 2);
        assert_eq!(reflect_index(5, 4), 1);
        assert_eq!(reflect_index(-3, 1), 0);
    }

    #[test]
    fn test_frame_count_is_centred() {
        let stft = PowerStft::default();
        assert_eq!(stft.frames(64_000), 126);
        let power = stft.power(&vec![0.5; 4096]);
        assert_eq!(power.dim(), (N_FFT / 2 + 1, 9));
    }

    #[test]
    fn test_power_to_db_floor() {
        let p = Array2::from_shape_vec((1, 3), vec![1.0, 1e-3, 1e-12]).unwrap();
        let db = power_to_db(&p, 1.0);
        assert!((db[[0, 0]] - 0.0).abs() < 1e-4);
        assert!((db[[0, 1]] + 30.0).abs() < 1e-3);
        assert!((db[[0, 2]] + TOP_DB).abs() < 1e-3);
    }
}
