//! Core types for audio analysis.

use cadenza_core::{Error, Result};
use serde::Serialize;

/// Decoded mono audio at the fixed analysis rate.
#[derive(Debug, Clone)]
pub struct AudioData {
    /// PCM samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration_secs: f64,
}

impl AudioData {
    /// Create audio data from samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        let duration_secs = samples.len() as f64 / sample_rate as f64;
        Self {
            samples,
            sample_rate,
            duration_secs,
        }
    }

    /// Copy out an analysis window starting `offset` seconds in, running for
    /// `duration` seconds (or to the end when `None`).
    pub fn window(&self, offset: f64, duration: Option<f64>) -> Result<AudioData> {
        if offset > 0.0 && offset >= self.duration_secs {
            return Err(Error::invalid_parameter(
                "offset",
                format!(
                    "{offset}s is at or beyond the end of the audio ({:.3}s)",
                    self.duration_secs
                ),
            ));
        }

        let start = (offset * self.sample_rate as f64) as usize;
        let end = match duration {
            Some(d) => start + (d * self.sample_rate as f64) as usize,
            None => self.samples.len(),
        }
        .min(self.samples.len());

        Ok(AudioData::new(
            self.samples[start.min(end)..end].to_vec(),
            self.sample_rate,
        ))
    }

    /// Get number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Scalar analysis value with its label.
#[derive(Debug, Clone, Serialize)]
pub struct ScalarResult {
    /// What the value measures
    pub label: String,
    /// The value itself
    pub value: f64,
}

/// Ordered per-frame or per-event values, optionally on a time axis.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesResult {
    /// What the values measure
    pub label: String,
    /// The values in order
    pub values: Vec<f32>,
    /// Frame times in seconds when the values are frame-aligned
    pub times: Option<Vec<f64>>,
    /// Scalar coupled to the series (the BPM estimate for beat tracking)
    pub summary: Option<ScalarResult>,
}

/// Row-major matrix of per-frame vectors, rows × frames.
#[derive(Debug, Clone, Serialize)]
pub struct MatrixResult {
    /// What one row represents
    pub label: String,
    /// Row-major values; every row has one entry per frame
    pub rows: Vec<Vec<f32>>,
}

/// Analysis output envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AnalysisResult {
    /// Single labeled value
    Scalar(ScalarResult),
    /// Ordered value sequence
    Series(SeriesResult),
    /// Per-frame vector matrix
    Matrix(MatrixResult),
}

impl AnalysisResult {
    /// Single labeled value
    pub fn scalar(label: impl Into<String>, value: f64) -> Self {
        AnalysisResult::Scalar(ScalarResult {
            label: label.into(),
            value,
        })
    }

    /// Value sequence without a time axis
    pub fn series(label: impl Into<String>, values: Vec<f32>) -> Self {
        AnalysisResult::Series(SeriesResult {
            label: label.into(),
            values,
            times: None,
            summary: None,
        })
    }

    /// Frame-aligned value sequence with its time axis
    pub fn series_with_times(label: impl Into<String>, values: Vec<f32>, times: Vec<f64>) -> Self {
        AnalysisResult::Series(SeriesResult {
            label: label.into(),
            values,
            times: Some(times),
            summary: None,
        })
    }

    /// Value sequence coupled with a scalar summary
    pub fn series_with_summary(
        label: impl Into<String>,
        values: Vec<f32>,
        summary_label: impl Into<String>,
        summary_value: f64,
    ) -> Self {
        AnalysisResult::Series(SeriesResult {
            label: label.into(),
            values,
            times: None,
            summary: Some(ScalarResult {
                label: summary_label.into(),
                value: summary_value,
            }),
        })
    }

    /// Matrix of per-frame vectors
    pub fn matrix(label: impl Into<String>, rows: Vec<Vec<f32>>) -> Self {
        AnalysisResult::Matrix(MatrixResult {
            label: label.into(),
            rows,
        })
    }
}
