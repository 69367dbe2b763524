//! Test fixtures shared by the unit tests of this crate.
//!
//! Audio fixtures are synthesised in memory with `hound` so no binary files
//! need to live in the repository.

use std::f32::consts::TAU;
use std::io::Cursor;

/// Encodes interleaved 16-bit PCM samples as a WAV file.
pub fn wav_bytes(channels: u16, sample_rate: u32, interleaved: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav header");
        for &sample in interleaved {
            writer.write_sample(sample).expect("wav sample");
        }
        writer.finalize().expect("wav finalize");
    }
    cursor.into_inner()
}

/// A full-scale mono sine tone encoded as WAV.
pub fn sine_wav(frequency: f32, sample_rate: u32, seconds: f32) -> Vec<u8> {
    let samples: Vec<i16> = sine_samples(frequency, sample_rate, seconds)
        .into_iter()
        .map(|s| (s * i16::MAX as f32) as i16)
        .collect();
    wav_bytes(1, sample_rate, &samples)
}

pub fn sine_samples(frequency: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
    let frames = (sample_rate as f32 * seconds).round() as usize;
    (0..frames)
        .map(|n| (TAU * frequency * n as f32 / sample_rate as f32).sin())
        .collect()
}
