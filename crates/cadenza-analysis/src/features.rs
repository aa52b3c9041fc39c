//! Per-frame signal features
//!
//! Spectral statistics over the magnitude spectrogram and framed time-domain
//! measures. Silent frames yield 0.0 rather than NaN so downstream consumers
//! never see non-finite values.

/// Fraction of total magnitude below the rolloff frequency
const ROLLOFF_FRACTION: f32 = 0.85;

/// Octave band edges in Hz for spectral contrast; the last band runs to Nyquist
const CONTRAST_EDGES: [f32; 7] = [0.0, 200.0, 400.0, 800.0, 1600.0, 3200.0, 6400.0];

/// Frequency-weighted spectral center of mass per frame
pub fn spectral_centroid(spectrogram: &[Vec<f32>], fft_size: usize, sample_rate: u32) -> Vec<f32> {
    let hz_per_bin = sample_rate as f32 / fft_size as f32;
    spectrogram
        .iter()
        .map(|frame| {
            let total: f32 = frame.iter().sum();
            if total <= 0.0 {
                return 0.0;
            }
            let weighted: f32 = frame
                .iter()
                .enumerate()
                .map(|(bin, &magnitude)| bin as f32 * hz_per_bin * magnitude)
                .sum();
            weighted / total
        })
        .collect()
}

/// Magnitude-weighted standard deviation around the centroid per frame
pub fn spectral_bandwidth(spectrogram: &[Vec<f32>], fft_size: usize, sample_rate: u32) -> Vec<f32> {
    let hz_per_bin = sample_rate as f32 / fft_size as f32;
    let centroids = spectral_centroid(spectrogram, fft_size, sample_rate);

    spectrogram
        .iter()
        .zip(centroids.iter())
        .map(|(frame, &centroid)| {
            let total: f32 = frame.iter().sum();
            if total <= 0.0 {
                return 0.0;
            }
            let variance: f32 = frame
                .iter()
                .enumerate()
                .map(|(bin, &magnitude)| {
                    let deviation = bin as f32 * hz_per_bin - centroid;
                    magnitude * deviation * deviation
                })
                .sum::<f32>()
                / total;
            variance.sqrt()
        })
        .collect()
}

/// Frequency below which 85% of each frame's magnitude falls
pub fn spectral_rolloff(spectrogram: &[Vec<f32>], fft_size: usize, sample_rate: u32) -> Vec<f32> {
    let hz_per_bin = sample_rate as f32 / fft_size as f32;
    spectrogram
        .iter()
        .map(|frame| {
            let total: f32 = frame.iter().sum();
            if total <= 0.0 {
                return 0.0;
            }
            let target = total * ROLLOFF_FRACTION;
            let mut cumulative = 0.0f32;
            for (bin, &magnitude) in frame.iter().enumerate() {
                cumulative += magnitude;
                if cumulative >= target {
                    return bin as f32 * hz_per_bin;
                }
            }
            (frame.len() - 1) as f32 * hz_per_bin
        })
        .collect()
}

/// Peak-to-valley log contrast per octave band, bands × frames
pub fn spectral_contrast(
    spectrogram: &[Vec<f32>],
    fft_size: usize,
    sample_rate: u32,
) -> Vec<Vec<f32>> {
    let hz_per_bin = sample_rate as f32 / fft_size as f32;
    let nyquist = sample_rate as f32 / 2.0;
    let num_bins = fft_size / 2;

    // Bin ranges per band, clamped to the spectrum
    let mut bands: Vec<(usize, usize)> = Vec::with_capacity(CONTRAST_EDGES.len());
    for (i, &lo) in CONTRAST_EDGES.iter().enumerate() {
        let hi = CONTRAST_EDGES.get(i + 1).copied().unwrap_or(nyquist);
        let lo_bin = (lo / hz_per_bin) as usize;
        let hi_bin = ((hi / hz_per_bin) as usize).min(num_bins);
        if lo_bin < hi_bin {
            bands.push((lo_bin, hi_bin));
        }
    }

    let mut rows = vec![vec![0.0f32; spectrogram.len()]; bands.len()];
    for (frame_idx, frame) in spectrogram.iter().enumerate() {
        for (band_idx, &(lo_bin, hi_bin)) in bands.iter().enumerate() {
            let mut magnitudes: Vec<f32> = frame[lo_bin..hi_bin].to_vec();
            magnitudes.sort_by(f32::total_cmp);

            let quantile = (magnitudes.len() / 5).max(1);
            let valley: f32 =
                magnitudes[..quantile].iter().sum::<f32>() / quantile as f32;
            let peak: f32 = magnitudes[magnitudes.len() - quantile..]
                .iter()
                .sum::<f32>()
                / quantile as f32;

            rows[band_idx][frame_idx] = ((peak + 1e-10) / (valley + 1e-10)).ln();
        }
    }
    rows
}

/// Sign-change rate per frame over the raw samples
pub fn zero_crossing_rate(samples: &[f32], frame_size: usize, hop_size: usize) -> Vec<f32> {
    framed(samples, frame_size, hop_size, |frame| {
        let crossings = frame
            .windows(2)
            .filter(|pair| pair[0] * pair[1] < 0.0)
            .count();
        crossings as f32 / frame_size as f32
    })
}

/// Root-mean-square energy per frame over the raw samples
pub fn rms_energy(samples: &[f32], frame_size: usize, hop_size: usize) -> Vec<f32> {
    framed(samples, frame_size, hop_size, |frame| {
        let mean_square: f32 =
            frame.iter().map(|&s| s * s).sum::<f32>() / frame_size as f32;
        mean_square.sqrt()
    })
}

/// Per-frame spectral energy folded onto the 12 pitch classes (C..B),
/// max-normalized per frame; 12 rows × frames
pub fn chroma(spectrogram: &[Vec<f32>], fft_size: usize, sample_rate: u32) -> Vec<Vec<f32>> {
    let hz_per_bin = sample_rate as f32 / fft_size as f32;
    let mut rows = vec![vec![0.0f32; spectrogram.len()]; 12];

    for (frame_idx, frame) in spectrogram.iter().enumerate() {
        let mut classes = [0.0f32; 12];
        for (bin, &magnitude) in frame.iter().enumerate().skip(1) {
            let freq = bin as f32 * hz_per_bin;
            // Below A0 the bin-to-pitch mapping is too coarse to be meaningful
            if freq < 27.5 {
                continue;
            }
            let midi = 69.0 + 12.0 * (freq / 440.0).log2();
            let class = (midi.round() as i32).rem_euclid(12) as usize;
            classes[class] += magnitude * magnitude;
        }

        let max = classes.iter().cloned().fold(0.0f32, f32::max);
        if max > 0.0 {
            for energy in &mut classes {
                *energy /= max;
            }
        }
        for (class, &energy) in classes.iter().enumerate() {
            rows[class][frame_idx] = energy;
        }
    }
    rows
}

fn framed<F: Fn(&[f32]) -> f32>(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
    measure: F,
) -> Vec<f32> {
    if samples.len() < frame_size {
        return Vec::new();
    }
    let num_frames = (samples.len() - frame_size) / hop_size + 1;
    (0..num_frames)
        .map(|i| {
            let start = i * hop_size;
            measure(&samples[start..start + frame_size])
        })
        .collect()
}
