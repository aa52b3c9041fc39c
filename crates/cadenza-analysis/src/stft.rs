//! Short-time Fourier transform
//!
//! Hann-windowed magnitude spectrogram shared by every spectral feature.
//! Frames are laid out outer-to-inner as frames × bins with fft_size/2 bins
//! per frame.

use rustfft::{num_complex::Complex, FftPlanner};

/// Windowed FFT over hopped frames
pub struct StftProcessor {
    fft_size: usize,
    hop_size: usize,
    window: Vec<f32>,
}

impl StftProcessor {
    /// Create a processor for the given frame and hop sizes
    pub fn new(fft_size: usize, hop_size: usize) -> Self {
        Self {
            fft_size,
            hop_size,
            window: hann_window(fft_size),
        }
    }

    /// Analysis frame length in samples
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Samples advanced between frames
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Magnitude spectrogram, frames × (fft_size / 2) bins. Signals shorter
    /// than one frame produce no frames.
    pub fn spectrogram(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        if samples.len() < self.fft_size {
            return Vec::new();
        }

        let num_frames = (samples.len() - self.fft_size) / self.hop_size + 1;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(self.fft_size);

        let mut frames = Vec::with_capacity(num_frames);
        for i in 0..num_frames {
            let start = i * self.hop_size;
            let mut buffer: Vec<Complex<f32>> = samples[start..start + self.fft_size]
                .iter()
                .zip(self.window.iter())
                .map(|(&s, &w)| Complex::new(s * w, 0.0))
                .collect();

            fft.process(&mut buffer);

            let magnitudes: Vec<f32> = buffer[..self.fft_size / 2]
                .iter()
                .map(|c| (c.re * c.re + c.im * c.im).sqrt() * 2.0 / self.fft_size as f32)
                .collect();
            frames.push(magnitudes);
        }

        frames
    }

    /// Center frequency in Hz of a spectrogram bin
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.fft_size as f32
    }
}

/// Frame time axis: `time[i] = i * hop_size / sample_rate`, exactly
pub fn frame_times(num_frames: usize, hop_size: usize, sample_rate: u32) -> Vec<f64> {
    (0..num_frames)
        .map(|i| (i * hop_size) as f64 / sample_rate as f64)
        .collect()
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}
