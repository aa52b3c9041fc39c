//! MCP tool surface
//!
//! Exposes each analysis operation as its own tool plus a generic
//! `analyze` entry point that routes by operation name. All tools accept
//! the same source forms: local paths, direct audio URLs, and video page
//! URLs. Remote sources are fetched at most once per server run through
//! the shared resolver.

use std::sync::Arc;

use cadenza_analysis::{AnalysisParams, Operation};
use cadenza_core::{Error, SourceResolver};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;
use tracing::info;

use crate::format;

// ============================================================================
// Tool Input Schemas
// ============================================================================

/// Request for operations that only need a source and an optional window
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SourceRequest {
    /// Audio source
    #[schemars(description = "Local file path, direct audio URL, or video page URL")]
    pub input: String,

    /// Window start
    #[schemars(description = "Seconds to skip from the start of the audio")]
    pub offset: Option<f64>,

    /// Window length
    #[schemars(description = "Seconds to analyze from the offset (default: to the end)")]
    pub duration: Option<f64>,
}

/// Request for frame-based operations
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FrameRequest {
    /// Audio source
    #[schemars(description = "Local file path, direct audio URL, or video page URL")]
    pub input: String,

    /// Frame advance
    #[schemars(description = "Frame advance in samples, 1 to 65536 (default: 512)")]
    pub hop_length: Option<i64>,

    /// Window start
    #[schemars(description = "Seconds to skip from the start of the audio")]
    pub offset: Option<f64>,

    /// Window length
    #[schemars(description = "Seconds to analyze from the offset (default: to the end)")]
    pub duration: Option<f64>,
}

/// Request for the mfcc operation
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MfccRequest {
    /// Audio source
    #[schemars(description = "Local file path, direct audio URL, or video page URL")]
    pub input: String,

    /// Coefficient count
    #[schemars(description = "Number of coefficients, 1 to 40 (default: 13)")]
    pub n_mfcc: Option<i64>,

    /// Frame advance
    #[schemars(description = "Frame advance in samples, 1 to 65536 (default: 512)")]
    pub hop_length: Option<i64>,

    /// Window start
    #[schemars(description = "Seconds to skip from the start of the audio")]
    pub offset: Option<f64>,

    /// Window length
    #[schemars(description = "Seconds to analyze from the offset (default: to the end)")]
    pub duration: Option<f64>,
}

/// Request for the generic analyze tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnalyzeRequest {
    /// Operation name
    #[schemars(
        description = "One of: duration, tempo, beat_times, beat_frames, onset_times, spectral_centroid, spectral_bandwidth, spectral_rolloff, spectral_contrast, zero_crossing_rate, rms_energy, mfcc, chroma"
    )]
    pub operation: String,

    /// Audio source
    #[schemars(description = "Local file path, direct audio URL, or video page URL")]
    pub input: String,

    /// Coefficient count
    #[schemars(description = "Number of coefficients for mfcc, 1 to 40 (default: 13)")]
    pub n_mfcc: Option<i64>,

    /// Frame advance
    #[schemars(description = "Frame advance in samples, 1 to 65536 (default: 512)")]
    pub hop_length: Option<i64>,

    /// Window start
    #[schemars(description = "Seconds to skip from the start of the audio")]
    pub offset: Option<f64>,

    /// Window length
    #[schemars(description = "Seconds to analyze from the offset (default: to the end)")]
    pub duration: Option<f64>,
}

/// Request for the resolve_source tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ResolveRequest {
    /// Audio source
    #[schemars(description = "Local file path, direct audio URL, or video page URL")]
    pub input: String,
}

// ============================================================================
// Server
// ============================================================================

/// Audio analysis MCP service
#[derive(Clone)]
pub struct AudioAnalysisServer {
    resolver: Arc<SourceResolver>,
    tool_router: ToolRouter<Self>,
}

impl AudioAnalysisServer {
    pub fn new(resolver: SourceResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            tool_router: Self::tool_router(),
        }
    }

    /// Validate, resolve, decode, analyze, render. Parameter validation
    /// runs before resolution so bad requests never trigger a fetch.
    async fn run_analysis(
        &self,
        operation: Operation,
        input: &str,
        hop_length: Option<i64>,
        n_mfcc: Option<i64>,
        offset: Option<f64>,
        duration: Option<f64>,
    ) -> cadenza_core::Result<String> {
        let params = AnalysisParams::validate(hop_length, n_mfcc, offset, duration)?;
        let asset = self.resolver.resolve(input).await?;
        info!(operation = %operation, path = %asset.canonical_path.display(), "Running analysis");
        let result = cadenza_analysis::analyze_file(&asset.canonical_path, operation, &params)?;
        Ok(format::render_pretty(operation, &result))
    }

    async fn run(
        &self,
        operation: Operation,
        input: &str,
        hop_length: Option<i64>,
        n_mfcc: Option<i64>,
        offset: Option<f64>,
        duration: Option<f64>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .run_analysis(operation, input, hop_length, n_mfcc, offset, duration)
            .await;
        Ok(match outcome {
            Ok(payload) => CallToolResult::success(vec![Content::text(payload)]),
            Err(e) => error_result(&e),
        })
    }
}

fn error_result(error: &Error) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!("{}: {}", error.kind(), error))])
}

#[tool_router]
impl AudioAnalysisServer {
    #[tool(description = "Get the total duration of an audio source in seconds")]
    pub async fn duration(
        &self,
        Parameters(req): Parameters<SourceRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(Operation::Duration, &req.input, None, None, req.offset, req.duration)
            .await
    }

    #[tool(description = "Estimate the tempo of an audio source in BPM, with the tracked beat times")]
    pub async fn tempo(
        &self,
        Parameters(req): Parameters<FrameRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(Operation::Tempo, &req.input, req.hop_length, None, req.offset, req.duration)
            .await
    }

    #[tool(description = "Get beat positions in seconds")]
    pub async fn beat_times(
        &self,
        Parameters(req): Parameters<FrameRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(Operation::BeatTimes, &req.input, req.hop_length, None, req.offset, req.duration)
            .await
    }

    #[tool(description = "Get beat positions as analysis frame indices")]
    pub async fn beat_frames(
        &self,
        Parameters(req): Parameters<FrameRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(Operation::BeatFrames, &req.input, req.hop_length, None, req.offset, req.duration)
            .await
    }

    #[tool(description = "Detect note onset positions in seconds")]
    pub async fn onset_times(
        &self,
        Parameters(req): Parameters<FrameRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(Operation::OnsetTimes, &req.input, req.hop_length, None, req.offset, req.duration)
            .await
    }

    #[tool(description = "Compute the spectral centroid per frame in Hz, a brightness measure")]
    pub async fn spectral_centroid(
        &self,
        Parameters(req): Parameters<FrameRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(
            Operation::SpectralCentroid,
            &req.input,
            req.hop_length,
            None,
            req.offset,
            req.duration,
        )
        .await
    }

    #[tool(description = "Compute the spectral bandwidth per frame in Hz, the spread around the centroid")]
    pub async fn spectral_bandwidth(
        &self,
        Parameters(req): Parameters<FrameRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(
            Operation::SpectralBandwidth,
            &req.input,
            req.hop_length,
            None,
            req.offset,
            req.duration,
        )
        .await
    }

    #[tool(description = "Compute the spectral rolloff per frame, the frequency below which 85% of energy falls")]
    pub async fn spectral_rolloff(
        &self,
        Parameters(req): Parameters<FrameRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(
            Operation::SpectralRolloff,
            &req.input,
            req.hop_length,
            None,
            req.offset,
            req.duration,
        )
        .await
    }

    #[tool(description = "Compute spectral contrast per octave band and frame, separating peaks from noise floor")]
    pub async fn spectral_contrast(
        &self,
        Parameters(req): Parameters<FrameRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(
            Operation::SpectralContrast,
            &req.input,
            req.hop_length,
            None,
            req.offset,
            req.duration,
        )
        .await
    }

    #[tool(description = "Compute the zero-crossing rate per frame, high for noisy or percussive content")]
    pub async fn zero_crossing_rate(
        &self,
        Parameters(req): Parameters<FrameRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(
            Operation::ZeroCrossingRate,
            &req.input,
            req.hop_length,
            None,
            req.offset,
            req.duration,
        )
        .await
    }

    #[tool(description = "Compute the RMS energy per frame, a loudness contour")]
    pub async fn rms_energy(
        &self,
        Parameters(req): Parameters<FrameRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(Operation::RmsEnergy, &req.input, req.hop_length, None, req.offset, req.duration)
            .await
    }

    #[tool(description = "Compute mel-frequency cepstral coefficients, a timbre fingerprint matrix")]
    pub async fn mfcc(
        &self,
        Parameters(req): Parameters<MfccRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(
            Operation::Mfcc,
            &req.input,
            req.hop_length,
            req.n_mfcc,
            req.offset,
            req.duration,
        )
        .await
    }

    #[tool(description = "Compute chroma features, energy per pitch class and frame")]
    pub async fn chroma(
        &self,
        Parameters(req): Parameters<FrameRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run(Operation::Chroma, &req.input, req.hop_length, None, req.offset, req.duration)
            .await
    }

    #[tool(description = "Run any analysis operation by name; see the operation parameter for the full list")]
    pub async fn analyze(
        &self,
        Parameters(req): Parameters<AnalyzeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let operation: Operation = match req.operation.parse() {
            Ok(op) => op,
            Err(e) => return Ok(error_result(&e)),
        };
        self.run(
            operation,
            &req.input,
            req.hop_length,
            req.n_mfcc,
            req.offset,
            req.duration,
        )
        .await
    }

    #[tool(description = "Resolve an audio source to a local file without analyzing it, priming the session cache")]
    pub async fn resolve_source(
        &self,
        Parameters(req): Parameters<ResolveRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(match self.resolver.resolve(&req.input).await {
            Ok(asset) => CallToolResult::success(vec![Content::text(format!(
                "{:#}",
                format::render_asset(&asset)
            ))]),
            Err(e) => error_result(&e),
        })
    }
}

#[tool_handler]
impl ServerHandler for AudioAnalysisServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Audio analysis tools. Every tool takes an 'input' that may be a local \
                 file path, a direct audio URL, or a video page URL; remote sources are \
                 fetched once per session and reused. Use 'duration' or 'tempo' for quick \
                 answers, the spectral and rhythm tools for per-frame detail, and \
                 'analyze' to route any operation by name."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}
