//! Operation routing
//!
//! Maps operation names onto the DSP modules and normalizes request
//! parameters up front, so callers hit parameter errors before any
//! decode work happens.

use std::fmt;
use std::str::FromStr;

use crate::features;
use crate::mel::{self, NUM_MEL_FILTERS};
use crate::stft::{frame_times, StftProcessor};
use crate::temporal;
use crate::types::{AnalysisResult, AudioData};
use cadenza_core::{Error, Result};

/// Analysis window length in samples for all spectral operations
pub const FFT_SIZE: usize = 2048;

/// Frame advance in samples when the request does not override it
pub const DEFAULT_HOP_LENGTH: usize = 512;

/// Cepstral coefficient count when the request does not override it
pub const DEFAULT_N_MFCC: usize = 13;

/// Upper bound on the frame advance a request may ask for
pub const MAX_HOP_LENGTH: i64 = 65_536;

/// Every analysis the engine can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Clip length in seconds
    Duration,
    /// Tempo estimate with the tracked beat grid
    Tempo,
    /// Beat positions in seconds
    BeatTimes,
    /// Beat positions as frame indices
    BeatFrames,
    /// Note onset positions in seconds
    OnsetTimes,
    /// Per-frame spectral center of mass
    SpectralCentroid,
    /// Per-frame spread around the centroid
    SpectralBandwidth,
    /// Per-frame 85% energy rolloff frequency
    SpectralRolloff,
    /// Per-band peak-to-valley contrast
    SpectralContrast,
    /// Per-frame sign-change rate
    ZeroCrossingRate,
    /// Per-frame RMS level
    RmsEnergy,
    /// Mel-frequency cepstral coefficients
    Mfcc,
    /// Per-frame pitch class energies
    Chroma,
}

impl Operation {
    /// Every operation, in the order they are listed to callers
    pub const ALL: [Operation; 13] = [
        Operation::Duration,
        Operation::Tempo,
        Operation::BeatTimes,
        Operation::BeatFrames,
        Operation::OnsetTimes,
        Operation::SpectralCentroid,
        Operation::SpectralBandwidth,
        Operation::SpectralRolloff,
        Operation::SpectralContrast,
        Operation::ZeroCrossingRate,
        Operation::RmsEnergy,
        Operation::Mfcc,
        Operation::Chroma,
    ];

    /// Wire name accepted by [`FromStr`] and shown in results
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Duration => "duration",
            Operation::Tempo => "tempo",
            Operation::BeatTimes => "beat_times",
            Operation::BeatFrames => "beat_frames",
            Operation::OnsetTimes => "onset_times",
            Operation::SpectralCentroid => "spectral_centroid",
            Operation::SpectralBandwidth => "spectral_bandwidth",
            Operation::SpectralRolloff => "spectral_rolloff",
            Operation::SpectralContrast => "spectral_contrast",
            Operation::ZeroCrossingRate => "zero_crossing_rate",
            Operation::RmsEnergy => "rms_energy",
            Operation::Mfcc => "mfcc",
            Operation::Chroma => "chroma",
        }
    }

    /// One-line description for tool listings
    pub fn describe(&self) -> &'static str {
        match self {
            Operation::Duration => "Total length of the audio in seconds",
            Operation::Tempo => "Estimated tempo in BPM with the tracked beat times",
            Operation::BeatTimes => "Beat positions in seconds",
            Operation::BeatFrames => "Beat positions as analysis frame indices",
            Operation::OnsetTimes => "Note onset positions in seconds",
            Operation::SpectralCentroid => "Spectral center of mass per frame, in Hz",
            Operation::SpectralBandwidth => "Spectral spread around the centroid per frame, in Hz",
            Operation::SpectralRolloff => "Frequency below which 85% of energy falls, per frame",
            Operation::SpectralContrast => "Peak-to-valley contrast per octave band and frame",
            Operation::ZeroCrossingRate => "Sign-change rate per frame",
            Operation::RmsEnergy => "Root-mean-square level per frame",
            Operation::Mfcc => "Mel-frequency cepstral coefficients, one row per coefficient",
            Operation::Chroma => "Energy per pitch class and frame",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Operation::ALL
            .iter()
            .find(|op| op.name() == s)
            .copied()
            .ok_or_else(|| Error::UnknownOperation(s.to_string()))
    }
}

/// Validated request parameters shared by all operations
#[derive(Debug, Clone)]
pub struct AnalysisParams {
    /// Frame advance in samples
    pub hop_length: usize,
    /// Cepstral coefficient count for the mfcc operation
    pub n_mfcc: usize,
    /// Seconds to skip from the start of the clip
    pub offset: f64,
    /// Seconds to analyze from the offset, None for the remainder
    pub duration: Option<f64>,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            hop_length: DEFAULT_HOP_LENGTH,
            n_mfcc: DEFAULT_N_MFCC,
            offset: 0.0,
            duration: None,
        }
    }
}

impl AnalysisParams {
    /// Range-check raw request values before any audio is touched
    pub fn validate(
        hop_length: Option<i64>,
        n_mfcc: Option<i64>,
        offset: Option<f64>,
        duration: Option<f64>,
    ) -> Result<Self> {
        let mut params = AnalysisParams::default();

        if let Some(hop) = hop_length {
            if hop < 1 {
                return Err(Error::invalid_parameter(
                    "hop_length",
                    format!("must be at least 1, got {hop}"),
                ));
            }
            if hop > MAX_HOP_LENGTH {
                return Err(Error::invalid_parameter(
                    "hop_length",
                    format!("must be at most {MAX_HOP_LENGTH}, got {hop}"),
                ));
            }
            params.hop_length = hop as usize;
        }

        if let Some(n) = n_mfcc {
            if n < 1 || n > NUM_MEL_FILTERS as i64 {
                return Err(Error::invalid_parameter(
                    "n_mfcc",
                    format!("must be between 1 and {NUM_MEL_FILTERS}, got {n}"),
                ));
            }
            params.n_mfcc = n as usize;
        }

        if let Some(offset) = offset {
            if !offset.is_finite() || offset < 0.0 {
                return Err(Error::invalid_parameter(
                    "offset",
                    format!("must be a non-negative number of seconds, got {offset}"),
                ));
            }
            params.offset = offset;
        }

        if let Some(duration) = duration {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(Error::invalid_parameter(
                    "duration",
                    format!("must be a positive number of seconds, got {duration}"),
                ));
            }
            params.duration = Some(duration);
        }

        Ok(params)
    }
}

/// Run one operation over decoded audio
pub fn dispatch(
    operation: Operation,
    params: &AnalysisParams,
    audio: &AudioData,
) -> Result<AnalysisResult> {
    let windowed;
    let audio = if params.offset > 0.0 || params.duration.is_some() {
        windowed = audio.window(params.offset, params.duration)?;
        &windowed
    } else {
        audio
    };

    let hop = params.hop_length;
    let sample_rate = audio.sample_rate;

    let result = match operation {
        Operation::Duration => AnalysisResult::scalar("duration_seconds", audio.duration_secs),

        Operation::Tempo => {
            let analysis = beats_of(audio, hop);
            AnalysisResult::series_with_summary(
                "beat_seconds",
                analysis.beat_times,
                "tempo_bpm",
                analysis.bpm,
            )
        }

        Operation::BeatTimes => {
            AnalysisResult::series("beat_seconds", beats_of(audio, hop).beat_times)
        }

        Operation::BeatFrames => {
            let frames: Vec<f32> = beats_of(audio, hop)
                .beat_times
                .iter()
                .map(|&t| (t as f64 * sample_rate as f64 / hop as f64).round() as f32)
                .collect();
            AnalysisResult::series("beat_frames", frames)
        }

        Operation::OnsetTimes => {
            let envelope = temporal::onset_envelope(&spectrogram_of(audio, hop));
            let onsets = temporal::detect_onsets(&envelope, hop, sample_rate);
            AnalysisResult::series("onset_seconds", onsets)
        }

        Operation::SpectralCentroid => framewise(audio, hop, "centroid_hz", |spec| {
            features::spectral_centroid(spec, FFT_SIZE, sample_rate)
        }),

        Operation::SpectralBandwidth => framewise(audio, hop, "bandwidth_hz", |spec| {
            features::spectral_bandwidth(spec, FFT_SIZE, sample_rate)
        }),

        Operation::SpectralRolloff => framewise(audio, hop, "rolloff_hz", |spec| {
            features::spectral_rolloff(spec, FFT_SIZE, sample_rate)
        }),

        Operation::SpectralContrast => {
            let spec = spectrogram_of(audio, hop);
            AnalysisResult::matrix(
                "spectral_contrast",
                features::spectral_contrast(&spec, FFT_SIZE, sample_rate),
            )
        }

        Operation::ZeroCrossingRate => {
            let values = features::zero_crossing_rate(&audio.samples, FFT_SIZE, hop);
            let times = frame_times(values.len(), hop, sample_rate);
            AnalysisResult::series_with_times("zero_crossing_rate", values, times)
        }

        Operation::RmsEnergy => {
            let values = features::rms_energy(&audio.samples, FFT_SIZE, hop);
            let times = frame_times(values.len(), hop, sample_rate);
            AnalysisResult::series_with_times("rms", values, times)
        }

        Operation::Mfcc => {
            let spec = spectrogram_of(audio, hop);
            AnalysisResult::matrix(
                "mfcc",
                mel::mfcc(&spec, FFT_SIZE, sample_rate, params.n_mfcc),
            )
        }

        Operation::Chroma => {
            let spec = spectrogram_of(audio, hop);
            AnalysisResult::matrix("chroma", features::chroma(&spec, FFT_SIZE, sample_rate))
        }
    };
    Ok(result)
}

fn spectrogram_of(audio: &AudioData, hop: usize) -> Vec<Vec<f32>> {
    StftProcessor::new(FFT_SIZE, hop).spectrogram(&audio.samples)
}

fn beats_of(audio: &AudioData, hop: usize) -> temporal::BeatAnalysis {
    let spec = spectrogram_of(audio, hop);
    temporal::analyze_beats(&spec, hop, audio.sample_rate, audio.duration_secs)
}

fn framewise<F>(audio: &AudioData, hop: usize, label: &str, compute: F) -> AnalysisResult
where
    F: FnOnce(&[Vec<f32>]) -> Vec<f32>,
{
    let spec = spectrogram_of(audio, hop);
    let values = compute(&spec);
    let times = frame_times(values.len(), hop, audio.sample_rate);
    AnalysisResult::series_with_times(label, values, times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::TARGET_SAMPLE_RATE;

    fn sine(freq: f32, duration_secs: f32) -> AudioData {
        let num_samples = (TARGET_SAMPLE_RATE as f32 * duration_secs) as usize;
        let samples = (0..num_samples)
            .map(|i| {
                let t = i as f32 / TARGET_SAMPLE_RATE as f32;
                (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect();
        AudioData::new(samples, TARGET_SAMPLE_RATE)
    }

    fn click_track(duration_secs: f64) -> AudioData {
        let num_samples = (TARGET_SAMPLE_RATE as f64 * duration_secs) as usize;
        let mut samples = vec![0.0f32; num_samples];
        let click_len = (TARGET_SAMPLE_RATE as f64 * 0.03) as usize;
        let mut start_secs = 0.0;
        while start_secs < duration_secs {
            let start = (start_secs * TARGET_SAMPLE_RATE as f64) as usize;
            for i in 0..click_len.min(num_samples.saturating_sub(start)) {
                let t = i as f32 / TARGET_SAMPLE_RATE as f32;
                samples[start + i] =
                    (2.0 * std::f32::consts::PI * 1000.0 * t).sin() * (-t * 80.0).exp();
            }
            start_secs += 0.5;
        }
        AudioData::new(samples, TARGET_SAMPLE_RATE)
    }

    #[test]
    fn test_every_name_parses_back() {
        for op in Operation::ALL {
            assert_eq!(op.name().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn test_unknown_operation_is_its_own_error() {
        let err = "spectral_flux".parse::<Operation>().unwrap_err();
        assert_eq!(err.kind(), "UnknownOperationError");
        assert!(err.to_string().contains("spectral_flux"));
    }

    #[test]
    fn test_validation_rejects_bad_ranges() {
        for (hop, n_mfcc, offset, duration) in [
            (Some(0), None, None, None),
            (Some(-4), None, None, None),
            (Some(MAX_HOP_LENGTH + 1), None, None, None),
            (None, Some(-1), None, None),
            (None, Some(0), None, None),
            (None, Some(41), None, None),
            (None, None, Some(-1.0), None),
            (None, None, Some(f64::NAN), None),
            (None, None, None, Some(0.0)),
            (None, None, None, Some(-2.0)),
        ] {
            let err = AnalysisParams::validate(hop, n_mfcc, offset, duration).unwrap_err();
            assert_eq!(err.kind(), "InvalidParameterError");
        }
    }

    #[test]
    fn test_validation_defaults() {
        let params = AnalysisParams::validate(None, None, None, None).unwrap();
        assert_eq!(params.hop_length, DEFAULT_HOP_LENGTH);
        assert_eq!(params.n_mfcc, DEFAULT_N_MFCC);
        assert_eq!(params.offset, 0.0);
        assert!(params.duration.is_none());
    }

    #[test]
    fn test_duration_matches_the_buffer() {
        let audio = sine(440.0, 2.0);
        let result = dispatch(Operation::Duration, &AnalysisParams::default(), &audio).unwrap();
        match result {
            AnalysisResult::Scalar(s) => {
                assert_eq!(s.label, "duration_seconds");
                assert!((s.value - 2.0).abs() < 1e-9);
            }
            other => panic!("expected a scalar, got {other:?}"),
        }
    }

    #[test]
    fn test_windowed_duration() {
        let audio = sine(440.0, 2.0);
        let params = AnalysisParams::validate(None, None, Some(0.5), Some(1.0)).unwrap();
        let result = dispatch(Operation::Duration, &params, &audio).unwrap();
        match result {
            AnalysisResult::Scalar(s) => assert!((s.value - 1.0).abs() < 1e-6),
            other => panic!("expected a scalar, got {other:?}"),
        }
    }

    #[test]
    fn test_offset_beyond_end_is_rejected() {
        let audio = sine(440.0, 1.0);
        let params = AnalysisParams::validate(None, None, Some(5.0), None).unwrap();
        let err = dispatch(Operation::Duration, &params, &audio).unwrap_err();
        assert_eq!(err.kind(), "InvalidParameterError");
    }

    #[test]
    fn test_frame_times_follow_the_hop() {
        let audio = sine(440.0, 1.0);
        let result =
            dispatch(Operation::SpectralCentroid, &AnalysisParams::default(), &audio).unwrap();
        match result {
            AnalysisResult::Series(series) => {
                let times = series.times.unwrap();
                assert_eq!(times.len(), series.values.len());
                for (i, &t) in times.iter().enumerate() {
                    let expected =
                        (i * DEFAULT_HOP_LENGTH) as f64 / TARGET_SAMPLE_RATE as f64;
                    assert_eq!(t, expected);
                }
            }
            other => panic!("expected a series, got {other:?}"),
        }
    }

    #[test]
    fn test_mfcc_row_count_follows_n_mfcc() {
        let audio = sine(440.0, 1.0);

        let result = dispatch(Operation::Mfcc, &AnalysisParams::default(), &audio).unwrap();
        match result {
            AnalysisResult::Matrix(m) => assert_eq!(m.rows.len(), DEFAULT_N_MFCC),
            other => panic!("expected a matrix, got {other:?}"),
        }

        let params = AnalysisParams::validate(None, Some(20), None, None).unwrap();
        let result = dispatch(Operation::Mfcc, &params, &audio).unwrap();
        match result {
            AnalysisResult::Matrix(m) => assert_eq!(m.rows.len(), 20),
            other => panic!("expected a matrix, got {other:?}"),
        }
    }

    #[test]
    fn test_chroma_has_twelve_rows() {
        let audio = sine(440.0, 1.0);
        let result = dispatch(Operation::Chroma, &AnalysisParams::default(), &audio).unwrap();
        match result {
            AnalysisResult::Matrix(m) => assert_eq!(m.rows.len(), 12),
            other => panic!("expected a matrix, got {other:?}"),
        }
    }

    #[test]
    fn test_tempo_reports_bpm_and_beats() {
        let audio = click_track(6.0);
        let result = dispatch(Operation::Tempo, &AnalysisParams::default(), &audio).unwrap();
        match result {
            AnalysisResult::Series(series) => {
                let summary = series.summary.unwrap();
                assert_eq!(summary.label, "tempo_bpm");
                assert!((summary.value - 120.0).abs() < 10.0, "bpm {}", summary.value);
                assert!(!series.values.is_empty());
            }
            other => panic!("expected a series, got {other:?}"),
        }
    }

    #[test]
    fn test_tempo_of_silence_is_zero() {
        let audio = AudioData::new(vec![0.0; TARGET_SAMPLE_RATE as usize * 4], TARGET_SAMPLE_RATE);
        let result = dispatch(Operation::Tempo, &AnalysisParams::default(), &audio).unwrap();
        match result {
            AnalysisResult::Series(series) => {
                assert_eq!(series.summary.unwrap().value, 0.0);
                assert!(series.values.is_empty());
            }
            other => panic!("expected a series, got {other:?}"),
        }
    }

    #[test]
    fn test_beat_frames_are_integral() {
        let audio = click_track(6.0);
        let result = dispatch(Operation::BeatFrames, &AnalysisParams::default(), &audio).unwrap();
        match result {
            AnalysisResult::Series(series) => {
                assert!(!series.values.is_empty());
                assert!(series.values.iter().all(|v| v.fract() == 0.0));
            }
            other => panic!("expected a series, got {other:?}"),
        }
    }

    #[test]
    fn test_rms_frame_count_matches_formula() {
        let audio = sine(440.0, 1.0);
        let result = dispatch(Operation::RmsEnergy, &AnalysisParams::default(), &audio).unwrap();
        match result {
            AnalysisResult::Series(series) => {
                let expected = (audio.samples.len() - FFT_SIZE) / DEFAULT_HOP_LENGTH + 1;
                assert_eq!(series.values.len(), expected);
            }
            other => panic!("expected a series, got {other:?}"),
        }
    }
}
