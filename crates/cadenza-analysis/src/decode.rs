//! Audio decoding
//!
//! Decodes any supported container/codec to mono f32 at the fixed analysis
//! rate. Every source is down-mixed by channel average and resampled with a
//! windowed-sinc resampler, so frame-based features line up across sources
//! with different native rates.

use crate::types::AudioData;
use cadenza_core::{Error, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument};

/// All analysis runs at this rate
pub const TARGET_SAMPLE_RATE: u32 = 22_050;

/// Decode a local file into mono samples at [`TARGET_SAMPLE_RATE`]
#[instrument]
pub fn decode_file(path: &Path) -> Result<AudioData> {
    let display = path.display().to_string();

    let file = File::open(path)
        .map_err(|e| Error::decode(&display, format!("cannot open file: {e}")))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::decode(&display, format!("unsupported format: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::decode(&display, "no decodable audio track"))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::decode(&display, format!("unsupported codec: {e}")))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_rate = 0u32;
    let mut channels = 0usize;
    let mut copy_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(Error::decode(&display, format!("packet read failed: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();

                let buf = copy_buf.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
                });
                buf.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buf.samples());
            }
            // Corrupt packets are skipped, not fatal
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(error = %e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(Error::decode(&display, format!("decode failed: {e}"))),
        }
    }

    if interleaved.is_empty() || sample_rate == 0 {
        return Err(Error::decode(&display, "zero audio duration"));
    }

    let mono: Vec<f32> = if channels > 1 {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        interleaved
    };

    let mono = if sample_rate != TARGET_SAMPLE_RATE {
        debug!(from = sample_rate, to = TARGET_SAMPLE_RATE, "Resampling");
        resample(mono, sample_rate, TARGET_SAMPLE_RATE)
            .map_err(|reason| Error::decode(&display, reason))?
    } else {
        mono
    };

    debug!(samples = mono.len(), rate = TARGET_SAMPLE_RATE, "Decoded audio");
    Ok(AudioData::new(mono, TARGET_SAMPLE_RATE))
}

fn resample(
    samples: Vec<f32>,
    from_rate: u32,
    to_rate: u32,
) -> std::result::Result<Vec<f32>, String> {
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        to_rate as f64 / from_rate as f64,
        2.0,
        params,
        samples.len(),
        1,
    )
    .map_err(|e| format!("resampler construction failed: {e}"))?;

    let mut output = resampler
        .process(&[samples], None)
        .map_err(|e| format!("resampling failed: {e}"))?;

    output
        .pop()
        .ok_or_else(|| "resampler produced no output".to_string())
}
