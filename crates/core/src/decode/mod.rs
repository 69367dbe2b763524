//! Audio decoding using symphonia for multi-format support.
//!
//! Format sniffing is delegated entirely to symphonia's probe; no container
//! hint is passed because uploads arrive as anonymous byte buffers.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::DecodeError;

/// A fully decoded clip, downmixed to mono.
#[derive(Debug, Clone)]
pub struct DecodedClip {
    samples: Arc<[f32]>,
    sample_rate: u32,
    source_channels: u16,
}

impl DecodedClip {
    /// Builds a clip from mono samples that are already in memory.
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate: sample_rate.max(1),
            source_channels: 1,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the encoded stream before downmixing.
    pub fn source_channels(&self) -> u16 {
        self.source_channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Decodes an in-memory audio file into a playable clip.
///
/// Packets that fail to decode are skipped; the call only fails when the
/// container cannot be probed, carries no audio track, or yields no samples.
pub fn decode_bytes(bytes: Vec<u8>) -> Result<DecodedClip, DecodeError> {
    let byte_len = bytes.len();
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::Unsupported(e.to_string()))?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);
    let mut mono = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(DecodeError::Malformed(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(reason)) => {
                skipped_packets += 1;
                tracing::debug!(reason, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(DecodeError::Malformed(e.to_string())),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count();

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        downmix_into(buffer.samples(), channels, &mut mono);
    }

    if mono.is_empty() {
        return Err(if skipped_packets > 0 {
            DecodeError::Malformed(format!("all {skipped_packets} packets failed to decode"))
        } else {
            DecodeError::Empty
        });
    }
    if sample_rate == 0 {
        return Err(DecodeError::Malformed("stream has no sample rate".into()));
    }

    tracing::debug!(
        bytes = byte_len,
        frames = mono.len(),
        sample_rate,
        channels,
        skipped_packets,
        "decoded audio clip"
    );

    Ok(DecodedClip {
        samples: mono.into(),
        sample_rate,
        source_channels: channels.max(1) as u16,
    })
}

fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }

    let scale = 1.0 / channels as f32;
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}
