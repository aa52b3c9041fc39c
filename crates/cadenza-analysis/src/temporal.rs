//! Onset detection, tempo estimation, and beat tracking
//!
//! The pipeline runs over the magnitude spectrogram: a rectified spectral
//! flux envelope feeds both an adaptive-threshold onset picker and an
//! autocorrelation tempo estimator. Beats are laid out on a tempo grid
//! anchored at the first onset, snapping to nearby onsets to absorb drift.

/// Half-width in envelope frames of the adaptive threshold window
const PICK_WINDOW: usize = 8;

/// The local mean is scaled by this factor before comparison
const PICK_DELTA: f32 = 1.5;

/// Floor added to the threshold so silence never triggers picks
const PICK_BIAS: f32 = 0.02;

/// Minimum spacing between picked onsets, in envelope frames
const MIN_ONSET_GAP: usize = 4;

const MIN_BPM: f64 = 60.0;
const MAX_BPM: f64 = 200.0;

/// A beat may snap to an onset within this fraction of the beat period
const BEAT_SNAP_FRACTION: f64 = 0.35;

/// Tempo and beat grid recovered from one piece of audio
#[derive(Debug, Clone)]
pub struct BeatAnalysis {
    /// Estimated tempo, 0.0 when no periodicity was found
    pub bpm: f64,
    /// Beat positions in seconds, empty when no periodicity was found
    pub beat_times: Vec<f32>,
}

/// Full pipeline: envelope, onsets, tempo, beat grid
pub fn analyze_beats(
    spectrogram: &[Vec<f32>],
    hop_size: usize,
    sample_rate: u32,
    duration: f64,
) -> BeatAnalysis {
    let envelope = onset_envelope(spectrogram);
    let onsets = detect_onsets(&envelope, hop_size, sample_rate);
    let bpm = estimate_tempo(&envelope, hop_size, sample_rate)
        .or_else(|| tempo_from_onsets(&onsets));
    match bpm {
        Some(bpm) => BeatAnalysis {
            bpm,
            beat_times: track_beats(&onsets, bpm, duration),
        },
        None => BeatAnalysis {
            bpm: 0.0,
            beat_times: Vec::new(),
        },
    }
}

/// Rectified spectral flux between consecutive frames, max-normalized.
/// One entry per frame pair, so the envelope is one shorter than the
/// spectrogram.
pub fn onset_envelope(spectrogram: &[Vec<f32>]) -> Vec<f32> {
    let mut envelope: Vec<f32> = spectrogram
        .windows(2)
        .map(|pair| {
            let flux: f32 = pair[0]
                .iter()
                .zip(pair[1].iter())
                .map(|(&prev, &cur)| {
                    let rise = (cur - prev).max(0.0);
                    rise * rise
                })
                .sum();
            flux.sqrt()
        })
        .collect();

    let max = envelope.iter().cloned().fold(0.0f32, f32::max);
    if max > 0.0 {
        for value in &mut envelope {
            *value /= max;
        }
    }
    envelope
}

/// Onset times in seconds, picked where the envelope rises clear of its
/// local mean
pub fn detect_onsets(envelope: &[f32], hop_size: usize, sample_rate: u32) -> Vec<f32> {
    let mut onsets = Vec::new();
    let mut last_pick: Option<usize> = None;

    for i in 0..envelope.len() {
        let lo = i.saturating_sub(PICK_WINDOW);
        let hi = (i + PICK_WINDOW + 1).min(envelope.len());
        let mean: f32 = envelope[lo..hi].iter().sum::<f32>() / (hi - lo) as f32;
        let threshold = mean * PICK_DELTA + PICK_BIAS;

        let rising = i == 0 || envelope[i] >= envelope[i - 1];
        let falling = i + 1 == envelope.len() || envelope[i] > envelope[i + 1];
        if envelope[i] > threshold && rising && falling {
            if let Some(prev) = last_pick {
                if i - prev < MIN_ONSET_GAP {
                    continue;
                }
            }
            last_pick = Some(i);
            // Envelope entry i measures the rise into spectrogram frame i + 1
            onsets.push((i + 1) as f32 * hop_size as f32 / sample_rate as f32);
        }
    }
    onsets
}

/// Tempo from envelope autocorrelation over the 60-200 BPM lag range,
/// weighted toward 120 BPM to break octave ties. None when the envelope
/// is too short or carries no energy.
pub fn estimate_tempo(envelope: &[f32], hop_size: usize, sample_rate: u32) -> Option<f64> {
    let frame_rate = sample_rate as f64 / hop_size as f64;
    let min_lag = (frame_rate * 60.0 / MAX_BPM).round() as usize;
    let max_lag = (frame_rate * 60.0 / MIN_BPM).round() as usize;
    if min_lag == 0 || envelope.len() < max_lag * 2 {
        return None;
    }

    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let centered: Vec<f64> = envelope.iter().map(|&v| (v - mean) as f64).collect();
    let energy: f64 = centered.iter().map(|v| v * v).sum();
    if energy <= f64::EPSILON {
        return None;
    }

    let mut best: Option<(f64, f64)> = None;
    for lag in min_lag..=max_lag {
        let correlation: f64 = centered
            .iter()
            .zip(centered[lag..].iter())
            .map(|(a, b)| a * b)
            .sum();
        let bpm = frame_rate * 60.0 / lag as f64;
        let score = (correlation / energy) * tempo_prior(bpm);
        if best.map_or(true, |(prev, _)| score > prev) {
            best = Some((score, bpm));
        }
    }
    best.filter(|&(score, _)| score > 0.0).map(|(_, bpm)| bpm)
}

/// Log-gaussian preference centered on 120 BPM, one octave per standard
/// deviation
fn tempo_prior(bpm: f64) -> f64 {
    let octaves = (bpm / 120.0).log2();
    (-0.5 * octaves * octaves).exp()
}

/// Fallback tempo from the inter-onset interval histogram. Intervals are
/// folded by octaves into the 60-200 BPM range before binning.
fn tempo_from_onsets(onsets: &[f32]) -> Option<f64> {
    const BIN_WIDTH: f64 = 0.02;
    const NUM_BINS: usize = 64;

    if onsets.len() < 3 {
        return None;
    }

    let mut counts = [0usize; NUM_BINS];
    let mut sums = [0.0f64; NUM_BINS];
    for pair in onsets.windows(2) {
        let mut interval = (pair[1] - pair[0]) as f64;
        if interval <= f64::EPSILON {
            continue;
        }
        while interval < 60.0 / MAX_BPM {
            interval *= 2.0;
        }
        while interval > 60.0 / MIN_BPM {
            interval /= 2.0;
        }
        let bin = ((interval / BIN_WIDTH).round() as usize).min(NUM_BINS - 1);
        counts[bin] += 1;
        sums[bin] += interval;
    }

    let best_bin = (0..NUM_BINS).max_by_key(|&bin| counts[bin])?;
    if counts[best_bin] == 0 {
        return None;
    }
    let mean_interval = sums[best_bin] / counts[best_bin] as f64;
    Some(60.0 / mean_interval)
}

/// Beat times on a tempo grid anchored at the first onset. Each grid
/// point snaps to the nearest onset within the snap tolerance so the
/// grid follows the played beats rather than drifting past them.
pub fn track_beats(onsets: &[f32], bpm: f64, duration: f64) -> Vec<f32> {
    if bpm <= 0.0 || onsets.is_empty() {
        return Vec::new();
    }
    let period = 60.0 / bpm;
    let tolerance = period * BEAT_SNAP_FRACTION;

    let mut beats = Vec::new();
    let mut t = onsets[0] as f64;
    while t < duration {
        let snapped = onsets
            .iter()
            .map(|&onset| onset as f64)
            .filter(|onset| (onset - t).abs() <= tolerance)
            .min_by(|a, b| (a - t).abs().total_cmp(&(b - t).abs()));
        let beat = snapped.unwrap_or(t);
        beats.push(beat as f32);
        t = beat + period;
    }
    beats
}
