// ============================================================
// Layer 4 — Waveform Normaliser / Padder
// ============================================================
// Every waveform reaching a feature extractor has exactly the
// configured length. Length fitting happens BEFORE extraction,
// never after.
//
// Short inputs are stretched by ELEMENT-WISE repetition:
//   [a, b, c] with 3 repeats → [a, a, a, b, b, b, c, c, c]
// and then truncated. This is not tiling; it changes the audio
// content, but trained checkpoints depend on it, so it stays.

use ndarray::{s, Array2};

use crate::domain::error::SpoofError;

/// Fixed waveform length used by the ASVspoof models (4 s at 16 kHz).
pub const DEFAULT_MAX_LEN: usize = 64_000;

/// Fit `waveform` to exactly `target_len` samples.
///
/// Long inputs keep their first `target_len` samples. Short inputs have each
/// sample repeated `ceil(target_len / len) + 1` times before truncation.
pub fn fit_length(waveform: &[f32], target_len: usize) -> Result<Vec<f32>, SpoofError> {
    let len = waveform.len();
    if len == 0 {
        return Err(SpoofError::EmptyInput);
    }
    if len >= target_len {
        return Ok(waveform[..target_len].to_vec());
    }

    let repeats = repeat_factor(len, target_len);
    let padded: Vec<f32> = waveform
        .iter()
        .flat_map(|&x| std::iter::repeat(x).take(repeats))
        .take(target_len)
        .collect();
    Ok(padded)
}

/// Same rule as [`fit_length`], applied to whole frames (columns) of a
/// precomputed feature map.
pub fn fit_frames(map: &Array2<f32>, target_frames: usize) -> Result<Array2<f32>, SpoofError> {
    let frames = map.ncols();
    if frames == 0 || map.nrows() == 0 {
        return Err(SpoofError::EmptyInput);
    }
    if frames >= target_frames {
        return Ok(map.slice(s![.., ..target_frames]).to_owned());
    }

    let repeats = repeat_factor(frames, target_frames);
    Ok(Array2::from_shape_fn((map.nrows(), target_frames), |(r, c)| {
        map[[r, c / repeats]]
    }))
}

fn repeat_factor(len: usize, target_len: usize) -> usize {
    (target_len + len - 1) / len + 1
}

/// Rescale so the peak absolute amplitude is exactly 1.0.
pub fn peak_normalize(waveform: &[f32]) -> Result<Vec<f32>, SpoofError> {
    let peak = peak_amplitude(waveform)?;
    Ok(waveform.iter().map(|&x| x / peak).collect())
}

/// Largest absolute sample value, rejecting inputs peak normalisation cannot handle.
pub fn peak_amplitude(waveform: &[f32]) -> Result<f32, SpoofError> {
    if waveform.is_empty() {
        return Err(SpoofError::EmptyInput);
    }
    if waveform.iter().any(|x| !x.is_finite()) {
        return Err(SpoofError::DegenerateInput("non-finite sample"));
    }
    let peak = waveform.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
    if peak == 0.0 {
        return Err(SpoofError::DegenerateInput("silent waveform"));
    }
    Ok(peak)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_long_input_keeps_prefix() {
        let x: Vec<f32> = (0..100).map(|i| i as f32).collect();
        for target in [1, 10, 99, 100] {
            let y = fit_length(&x, target).unwrap();
            assert_eq!(y.as_slice(), &x[..target]);
        }
    }

    #[test]
    fn test_short_input_repeats_each_sample() {
        let y = fit_length(&[1.0, 2.0, 3.0], 7).unwrap();
        // ceil(7/3) + 1 = 4 copies of each sample, then truncated
        assert_eq!(y, vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_short_input_exact_length_and_values_from_input() {
        let x = [0.5f32, -0.25, 0.125, 0.75, -1.0];
        for target in [6, 11, 64, 1000] {
            let y = fit_length(&x, target).unwrap();
            assert_eq!(y.len(), target);
            assert!(y.iter().all(|v| x.contains(v)));
        }
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(fit_length(&[], 10), Err(SpoofError::EmptyInput)));
    }

    #[test]
    fn test_peak_normalize_scales_to_unit_peak() {
        let y = peak_normalize(&[0.1, -0.4, 0.2]).unwrap();
        let peak = y.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
        assert_abs_diff_eq!(peak, 1.0, epsilon = 1e-7);
        assert_abs_diff_eq!(y[0], 0.25, epsilon = 1e-7);
    }

    #[test]
    fn test_peak_normalize_rejects_silence() {
        assert!(matches!(
            peak_normalize(&[0.0; 16]),
            Err(SpoofError::DegenerateInput(_))
        ));
        assert!(matches!(
            peak_normalize(&[0.1, f32::NAN]),
            Err(SpoofError::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_fit_frames_repeats_columns() {
        let m = array![[1.0f32, 2.0], [3.0, 4.0]];
        let fitted = fit_frames(&m, 5).unwrap();
        // ceil(5/2) + 1 = 4 copies of each frame
        assert_eq!(fitted, array![[1.0, 1.0, 1.0, 1.0, 2.0], [3.0, 3.0, 3.0, 3.0, 4.0]]);

        let cut = fit_frames(&fitted, 2).unwrap();
        assert_eq!(cut, array![[1.0, 1.0], [3.0, 3.0]]);
    }
}
