//! Encode interleaved f32 PCM to MP3 via libmp3lame bindings.

use cf_domain::error::{Error, Result};
use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, InterleavedPcm, Quality};

/// Encode interleaved f32 PCM (`channels` channels at `sample_rate`) to a
/// complete MP3 byte stream.
pub fn encode_mp3(sample_rate: u32, channels: usize, samples: &[f32]) -> Result<Vec<u8>> {
    let channels = channels.max(1).min(2) as u8;

    let mut builder = Builder::new()
        .ok_or_else(|| Error::Other("failed to create mp3 encoder".into()))?;
    builder
        .set_num_channels(channels)
        .map_err(|e| Error::Other(format!("invalid channel count: {e:?}")))?;
    builder
        .set_sample_rate(sample_rate)
        .map_err(|e| Error::Other(format!("invalid sample rate: {e:?}")))?;
    builder
        .set_brate(Bitrate::Kbps128)
        .map_err(|e| Error::Other(format!("invalid bitrate: {e:?}")))?;
    builder
        .set_quality(Quality::Good)
        .map_err(|e| Error::Other(format!("invalid quality: {e:?}")))?;
    let mut encoder = builder
        .build()
        .map_err(|e| Error::Other(format!("failed to build mp3 encoder: {e:?}")))?;

    let pcm_i16: Vec<i16> = samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect();

    let mut out = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(pcm_i16.len()));
    let encoded = encoder
        .encode(InterleavedPcm(&pcm_i16), out.spare_capacity_mut())
        .map_err(|e| Error::Other(format!("mp3 encode failed: {e:?}")))?;
    unsafe {
        out.set_len(out.len() + encoded);
    }

    let flushed = encoder
        .flush::<FlushNoGap>(out.spare_capacity_mut())
        .map_err(|e| Error::Other(format!("mp3 flush failed: {e:?}")))?;
    unsafe {
        out.set_len(out.len() + flushed);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_silence_to_nonempty_mp3() {
        let samples = vec![0.0f32; 24_000];
        let mp3 = encode_mp3(24_000, 1, &samples).unwrap();
        assert!(!mp3.is_empty());
    }
}
