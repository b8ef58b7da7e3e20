//! Decode an arbitrary compressed audio blob to interleaved f32 PCM.

use cf_domain::error::{Error, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::errors::Error as SymError;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::probe::Hint;

pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: usize,
    pub samples: Vec<f32>,
}

/// Decode `bytes` (an mp3, wav, or other symphonia-supported container) into
/// interleaved f32 PCM. The container hint is left empty; symphonia probes
/// the stream itself, which tolerates the heterogeneous TTS backend outputs
/// this is fed in practice.
pub fn decode_to_pcm(bytes: Vec<u8>) -> Result<DecodedAudio> {
    let cursor = std::io::Cursor::new(bytes);
    let media_stream = MediaSourceStream::new(Box::new(cursor), Default::default());
    let hint = Hint::new();

    let probed = symphonia::default::get_probe()
        .format(&hint, media_stream, &Default::default(), &Default::default())
        .map_err(|e| Error::Other(format!("failed to probe audio: {e}")))?;

    let mut format_reader = probed.format;
    let track = format_reader
        .default_track()
        .ok_or_else(|| Error::Other("audio has no default track".into()))?
        .clone();
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::Other("audio track has no sample rate".into()))?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1);
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &Default::default())
        .map_err(|e| Error::Other(format!("no decoder for audio track: {e}")))?;

    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut samples = Vec::new();

    loop {
        let packet = match format_reader.next_packet() {
            Ok(p) => p,
            Err(SymError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(Error::Other(format!("error reading audio packet: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(audio_buf) => {
                if sample_buf.is_none() {
                    let spec = *audio_buf.spec();
                    sample_buf = Some(SampleBuffer::new(audio_buf.capacity() as u64, spec));
                }
                if let Some(buf) = &mut sample_buf {
                    buf.copy_interleaved_ref(audio_buf);
                    samples.extend_from_slice(buf.samples());
                }
            }
            Err(SymError::DecodeError(_)) => continue,
            Err(e) => return Err(Error::Other(format!("audio decode error: {e}"))),
        }
    }

    Ok(DecodedAudio {
        sample_rate,
        channels,
        samples,
    })
}

/// Resample mono interleaved PCM from `from_rate` to `to_rate`. Channel
/// count is preserved by resampling each channel independently.
pub fn resample(pcm: &[f32], channels: usize, from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

    if from_rate == to_rate || pcm.is_empty() {
        return Ok(pcm.to_vec());
    }
    let channels = channels.max(1);
    let frames = pcm.len() / channels;
    let mut deinterleaved: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); channels];
    for frame in pcm.chunks(channels) {
        for (ch, &s) in frame.iter().enumerate() {
            deinterleaved[ch].push(s);
        }
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, frames, channels)
        .map_err(|e| Error::Other(format!("failed to build resampler: {e}")))?;
    let output = resampler
        .process(&deinterleaved, None)
        .map_err(|e| Error::Other(format!("resample failed: {e}")))?;

    let out_frames = output[0].len();
    let mut interleaved = Vec::with_capacity(out_frames * channels);
    for i in 0..out_frames {
        for ch in output.iter() {
            interleaved.push(ch[i]);
        }
    }
    Ok(interleaved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_to_probe() {
        let result = decode_to_pcm(vec![0u8; 16]);
        assert!(result.is_err());
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let pcm = vec![0.1, 0.2, 0.3, 0.4];
        let out = resample(&pcm, 1, 24_000, 24_000).unwrap();
        assert_eq!(out, pcm);
    }

    #[test]
    fn resample_changes_frame_count_proportionally() {
        let pcm = vec![0.0f32; 4800];
        let out = resample(&pcm, 1, 48_000, 24_000).unwrap();
        assert!(out.len() < pcm.len());
    }
}
