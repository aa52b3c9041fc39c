//! Tool payload rendering
//!
//! Results go back to the model as pretty-printed JSON. Long series and
//! wide matrices are truncated to keep payloads inside sane context
//! limits; the full counts always ride along so the caller knows what
//! was cut.

use cadenza_analysis::{AnalysisResult, Operation};
use cadenza_core::ResolvedAsset;
use serde_json::{json, Map, Value};

/// Series longer than this are cut to the first entries
pub const MAX_SERIES_VALUES: usize = 1000;

/// Matrix rows wider than this are cut to the first frames
pub const MAX_MATRIX_FRAMES: usize = 200;

const DECIMALS: f64 = 100_000.0;

/// Render one analysis result as a JSON payload
pub fn render(operation: Operation, result: &AnalysisResult) -> Value {
    let mut payload = Map::new();
    payload.insert("operation".into(), json!(operation.name()));

    match result {
        AnalysisResult::Scalar(scalar) => {
            payload.insert("shape".into(), json!("scalar"));
            payload.insert("label".into(), json!(scalar.label));
            payload.insert("value".into(), json!(round(scalar.value)));
        }

        AnalysisResult::Series(series) => {
            payload.insert("shape".into(), json!("series"));
            payload.insert("label".into(), json!(series.label));
            payload.insert("count".into(), json!(series.values.len()));
            payload.insert(
                "returned".into(),
                json!(series.values.len().min(MAX_SERIES_VALUES)),
            );
            payload.insert(
                "truncated".into(),
                json!(series.values.len() > MAX_SERIES_VALUES),
            );
            payload.insert(
                "values".into(),
                rounded_values(series.values.iter().map(|&v| v as f64)),
            );
            if let Some(times) = &series.times {
                payload.insert("times".into(), rounded_values(times.iter().copied()));
            }
            if let Some(summary) = &series.summary {
                payload.insert(
                    "summary".into(),
                    json!({
                        "label": summary.label,
                        "value": round(summary.value),
                    }),
                );
            }
        }

        AnalysisResult::Matrix(matrix) => {
            let frames = matrix.rows.first().map_or(0, Vec::len);
            payload.insert("shape".into(), json!("matrix"));
            payload.insert("label".into(), json!(matrix.label));
            payload.insert("rows".into(), json!(matrix.rows.len()));
            payload.insert("frames".into(), json!(frames));
            payload.insert("truncated".into(), json!(frames > MAX_MATRIX_FRAMES));
            let rows: Vec<Value> = matrix
                .rows
                .iter()
                .map(|row| rounded_values(row.iter().take(MAX_MATRIX_FRAMES).map(|&v| v as f64)))
                .collect();
            payload.insert("values".into(), Value::Array(rows));
        }
    }

    Value::Object(payload)
}

/// Render one analysis result as pretty JSON text
pub fn render_pretty(operation: Operation, result: &AnalysisResult) -> String {
    format!("{:#}", render(operation, result))
}

/// Render a resolved source as a JSON payload
pub fn render_asset(asset: &ResolvedAsset) -> Value {
    json!({
        "canonical_path": asset.canonical_path.to_string_lossy(),
        "cache_key": asset.cache_key,
        "is_temporary": asset.is_temporary,
    })
}

fn round(value: f64) -> f64 {
    (value * DECIMALS).round() / DECIMALS
}

fn rounded_values(values: impl Iterator<Item = f64>) -> Value {
    Value::Array(
        values
            .take(MAX_SERIES_VALUES)
            .map(|v| json!(round(v)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadenza_analysis::AnalysisResult;

    #[test]
    fn test_scalar_payload() {
        let result = AnalysisResult::scalar("duration_seconds", 6.04081632653);
        let payload = render(Operation::Duration, &result);

        assert_eq!(payload["operation"], "duration");
        assert_eq!(payload["shape"], "scalar");
        assert_eq!(payload["label"], "duration_seconds");
        assert_eq!(payload["value"], 6.04082);
    }

    #[test]
    fn test_series_below_cap_is_untouched() {
        let result = AnalysisResult::series_with_times(
            "centroid_hz",
            vec![100.0, 200.0, 300.0],
            vec![0.0, 0.5, 1.0],
        );
        let payload = render(Operation::SpectralCentroid, &result);

        assert_eq!(payload["count"], 3);
        assert_eq!(payload["returned"], 3);
        assert_eq!(payload["truncated"], false);
        assert_eq!(payload["values"].as_array().unwrap().len(), 3);
        assert_eq!(payload["times"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_long_series_is_truncated() {
        let values: Vec<f32> = (0..1500).map(|i| i as f32).collect();
        let times: Vec<f64> = (0..1500).map(|i| i as f64 * 0.01).collect();
        let result = AnalysisResult::series_with_times("rms", values, times);
        let payload = render(Operation::RmsEnergy, &result);

        assert_eq!(payload["count"], 1500);
        assert_eq!(payload["returned"], 1000);
        assert_eq!(payload["truncated"], true);
        assert_eq!(payload["values"].as_array().unwrap().len(), MAX_SERIES_VALUES);
        assert_eq!(payload["times"].as_array().unwrap().len(), MAX_SERIES_VALUES);
    }

    #[test]
    fn test_wide_matrix_is_truncated() {
        let rows: Vec<Vec<f32>> = (0..3).map(|_| vec![1.0; 500]).collect();
        let result = AnalysisResult::matrix("mfcc", rows);
        let payload = render(Operation::Mfcc, &result);

        assert_eq!(payload["rows"], 3);
        assert_eq!(payload["frames"], 500);
        assert_eq!(payload["truncated"], true);
        for row in payload["values"].as_array().unwrap() {
            assert_eq!(row.as_array().unwrap().len(), MAX_MATRIX_FRAMES);
        }
    }

    #[test]
    fn test_values_round_to_five_decimals() {
        let result = AnalysisResult::series("rms", vec![0.123456789]);
        let payload = render(Operation::RmsEnergy, &result);
        assert_eq!(payload["values"][0], 0.12346);
    }

    #[test]
    fn test_summary_rides_along() {
        let result = AnalysisResult::series_with_summary(
            "beat_seconds",
            vec![0.5, 1.0, 1.5],
            "tempo_bpm",
            120.123456,
        );
        let payload = render(Operation::Tempo, &result);

        assert_eq!(payload["summary"]["label"], "tempo_bpm");
        assert_eq!(payload["summary"]["value"], 120.12346);
    }

    #[test]
    fn test_asset_payload() {
        let asset = ResolvedAsset {
            canonical_path: "/tmp/cache/abc.mp3".into(),
            cache_key: "abc".into(),
            is_temporary: true,
        };
        let payload = render_asset(&asset);
        assert_eq!(payload["canonical_path"], "/tmp/cache/abc.mp3");
        assert_eq!(payload["cache_key"], "abc");
        assert_eq!(payload["is_temporary"], true);
    }
}
