//! Mel filterbank and MFCC
//!
//! Triangular mel filters over the magnitude spectrogram, log energies, and
//! a DCT-II projection down to cepstral coefficients.

/// Filters in the mel bank; also the ceiling for requested coefficients
pub const NUM_MEL_FILTERS: usize = 40;

/// Triangular filterbank mapping FFT bins onto the mel scale
pub struct MelFilterBank {
    filters: Vec<Vec<f32>>,
}

impl MelFilterBank {
    /// Build `num_filters` triangular filters for spectra of `fft_size / 2` bins
    pub fn new(num_filters: usize, fft_size: usize, sample_rate: u32) -> Self {
        let num_bins = fft_size / 2;
        let max_mel = hz_to_mel(sample_rate as f32 / 2.0);

        let edges: Vec<f32> = (0..num_filters + 2)
            .map(|i| mel_to_hz(i as f32 * max_mel / (num_filters + 1) as f32))
            .collect();

        let hz_per_bin = sample_rate as f32 / fft_size as f32;
        let mut filters = Vec::with_capacity(num_filters);

        for f in 0..num_filters {
            let (lo, center, hi) = (edges[f], edges[f + 1], edges[f + 2]);
            let mut weights = vec![0.0f32; num_bins];

            let first_bin = (lo / hz_per_bin) as usize;
            let last_bin = ((hi / hz_per_bin) as usize).min(num_bins.saturating_sub(1));
            for (bin, weight) in weights
                .iter_mut()
                .enumerate()
                .take(last_bin + 1)
                .skip(first_bin)
            {
                let freq = bin as f32 * hz_per_bin;
                let w = if freq <= center {
                    (freq - lo) / (center - lo)
                } else {
                    (hi - freq) / (hi - center)
                };
                if w > 0.0 {
                    *weight = w;
                }
            }
            filters.push(weights);
        }

        Self { filters }
    }

    /// Log mel energies per frame (frames × filters)
    pub fn log_energies(&self, spectrogram: &[Vec<f32>]) -> Vec<Vec<f32>> {
        spectrogram
            .iter()
            .map(|frame| {
                self.filters
                    .iter()
                    .map(|filter| {
                        let energy: f32 = frame
                            .iter()
                            .zip(filter.iter())
                            .map(|(magnitude, weight)| magnitude * weight)
                            .sum();
                        (energy + 1e-10).ln()
                    })
                    .collect()
            })
            .collect()
    }
}

/// MFCC matrix, `n_mfcc` coefficients × frames
pub fn mfcc(
    spectrogram: &[Vec<f32>],
    fft_size: usize,
    sample_rate: u32,
    n_mfcc: usize,
) -> Vec<Vec<f32>> {
    let bank = MelFilterBank::new(NUM_MEL_FILTERS, fft_size, sample_rate);
    let log_mel = bank.log_energies(spectrogram);
    let basis = dct_basis(n_mfcc, NUM_MEL_FILTERS);

    let mut rows: Vec<Vec<f32>> = vec![Vec::with_capacity(log_mel.len()); n_mfcc];
    for frame in &log_mel {
        for (k, basis_row) in basis.iter().enumerate() {
            let coefficient: f32 = frame
                .iter()
                .zip(basis_row.iter())
                .map(|(energy, b)| energy * b)
                .sum();
            rows[k].push(coefficient);
        }
    }
    rows
}

fn dct_basis(num_coefficients: usize, input_len: usize) -> Vec<Vec<f32>> {
    (0..num_coefficients)
        .map(|k| {
            (0..input_len)
                .map(|n| {
                    (std::f32::consts::PI * k as f32 * (n as f32 + 0.5) / input_len as f32).cos()
                })
                .collect()
        })
        .collect()
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}
