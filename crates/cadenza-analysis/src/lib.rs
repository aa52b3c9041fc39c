//! Cadenza - Audio Analysis Library
//!
//! This crate turns audio files into analysis results:
//! - **Rhythm**: tempo estimation, beat tracking, onset detection
//! - **Spectral shape**: centroid, bandwidth, rolloff, contrast
//! - **Timbre and pitch**: MFCC and chroma matrices
//! - **Level**: RMS energy and zero-crossing rate
//!
//! # Architecture
//!
//! Every operation shares one decode and framing front end:
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌─────────────────┐
//! │  Audio File  │───▶│    Decode    │───▶│   STFT Frames   │
//! └──────────────┘    │ (symphonia + │    └────────┬────────┘
//!                     │   rubato)    │             │
//!                     └──────────────┘             │
//!          ┌──────────────────┬───────────────────┼──────────────────┐
//!          ▼                  ▼                   ▼                  ▼
//! ┌────────────────┐ ┌────────────────┐  ┌────────────────┐ ┌────────────────┐
//! │ Onsets / Tempo │ │ Spectral Stats │  │   Mel / MFCC   │ │     Chroma     │
//! │ (flux, AC)     │ │ (per frame)    │  │  (filterbank)  │ │ (pitch class)  │
//! └────────┬───────┘ └────────┬───────┘  └────────┬───────┘ └────────┬───────┘
//!          └──────────────────┴───────────────────┴──────────────────┘
//!                                      │
//!                                      ▼
//!                            ┌──────────────────┐
//!                            │  AnalysisResult  │
//!                            │ (scalar/series/  │
//!                            │     matrix)      │
//!                            └──────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use cadenza_analysis::{analyze_file, AnalysisParams, Operation};
//!
//! fn main() -> cadenza_core::Result<()> {
//!     let params = AnalysisParams::default();
//!     let tempo = analyze_file(Path::new("track.mp3"), Operation::Tempo, &params)?;
//!     println!("{tempo:?}");
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod decode;
pub mod dispatch;
pub mod features;
pub mod mel;
pub mod stft;
pub mod temporal;
pub mod types;

use std::path::Path;

use cadenza_core::Result;

pub use decode::{decode_file, TARGET_SAMPLE_RATE};
pub use dispatch::{
    dispatch, AnalysisParams, Operation, DEFAULT_HOP_LENGTH, DEFAULT_N_MFCC, FFT_SIZE,
    MAX_HOP_LENGTH,
};
pub use temporal::BeatAnalysis;
pub use types::{AnalysisResult, AudioData, MatrixResult, ScalarResult, SeriesResult};

/// Decode a local audio file and run one operation over it.
///
/// Parameters must already be validated; windowing errors and decode
/// failures surface as [`cadenza_core::Error`].
pub fn analyze_file(
    path: &Path,
    operation: Operation,
    params: &AnalysisParams,
) -> Result<AnalysisResult> {
    let audio = decode::decode_file(path)?;
    dispatch::dispatch(operation, params, &audio)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, freq: f32, duration_secs: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let num_samples = (22_050.0 * duration_secs) as usize;
        for i in 0..num_samples {
            let t = i as f32 / 22_050.0;
            let sample = (2.0 * std::f32::consts::PI * freq * t).sin() * 0.8;
            writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_analyze_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 440.0, 2.0);

        let result =
            analyze_file(&path, Operation::Duration, &AnalysisParams::default()).unwrap();
        match result {
            AnalysisResult::Scalar(s) => assert!((s.value - 2.0).abs() < 0.05),
            other => panic!("expected a scalar, got {other:?}"),
        }
    }

    #[test]
    fn test_analyze_file_missing_path() {
        let err = analyze_file(
            Path::new("/nonexistent/audio.mp3"),
            Operation::Duration,
            &AnalysisParams::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "DecodeError");
    }
}
