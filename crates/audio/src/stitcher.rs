//! Concatenate per-turn audio with fixed inter-turn silence (§4.7).

use crate::decode::{decode_to_pcm, resample};
use crate::encode::encode_mp3;
use crate::silence::generate_silence;
use cf_domain::error::Result;

const FALLBACK_SAMPLE_RATE: u32 = 24_000;
const FALLBACK_CHANNELS: usize = 1;

/// One turn's raw audio bytes, or `None` if synthesis failed for that turn.
pub struct TurnAudio {
    pub turn_id: u32,
    pub bytes: Option<Vec<u8>>,
}

pub struct StitchOutcome {
    pub mp3_bytes: Vec<u8>,
    pub warnings: Vec<String>,
    pub turns_included: usize,
    pub turns_skipped: usize,
}

pub struct AudioStitcher {
    inter_turn_silence_ms: u64,
}

impl AudioStitcher {
    pub fn new(inter_turn_silence_ms: u64) -> Self {
        Self { inter_turn_silence_ms }
    }

    /// Decode every turn with audio, normalize to a common sample
    /// rate/channel count (the first successfully-decoded turn's format,
    /// falling back to 24kHz mono if none decode), splice fixed silence
    /// between them, and re-encode as one MP3. Turns that fail to decode
    /// are skipped with a warning rather than failing the whole episode.
    pub fn stitch(&self, turns: Vec<TurnAudio>) -> Result<StitchOutcome> {
        let mut warnings = Vec::new();
        let mut target: Option<(u32, usize)> = None;
        let mut decoded: Vec<(u32, Vec<f32>)> = Vec::new();

        for turn in turns {
            let bytes = match turn.bytes {
                Some(b) => b,
                None => {
                    warnings.push(format!("turn {} has no audio, skipped", turn.turn_id));
                    continue;
                }
            };
            match decode_to_pcm(bytes) {
                Ok(audio) => {
                    let (target_rate, target_channels) = *target.get_or_insert((audio.sample_rate, audio.channels));
                    let pcm = if audio.sample_rate == target_rate {
                        audio.samples
                    } else {
                        match resample(&audio.samples, audio.channels, audio.sample_rate, target_rate) {
                            Ok(r) => r,
                            Err(e) => {
                                warnings.push(format!(
                                    "turn {} failed to resample ({e}), skipped",
                                    turn.turn_id
                                ));
                                continue;
                            }
                        }
                    };
                    let pcm = normalize_channels(pcm, audio.channels, target_channels);
                    decoded.push((turn.turn_id, pcm));
                }
                Err(e) => {
                    warnings.push(format!("turn {} failed to decode ({e}), skipped", turn.turn_id));
                }
            }
        }

        let turns_skipped = warnings.len();
        let turns_included = decoded.len();
        let (sample_rate, channels) = target.unwrap_or((FALLBACK_SAMPLE_RATE, FALLBACK_CHANNELS));

        let mut combined = Vec::new();
        let silence = generate_silence(sample_rate, channels, self.inter_turn_silence_ms);
        for (i, (_, pcm)) in decoded.into_iter().enumerate() {
            if i > 0 {
                combined.extend_from_slice(&silence);
            }
            combined.extend(pcm);
        }

        let mp3_bytes = encode_mp3(sample_rate, channels, &combined)?;

        Ok(StitchOutcome {
            mp3_bytes,
            warnings,
            turns_included,
            turns_skipped,
        })
    }
}

fn normalize_channels(pcm: Vec<f32>, from: usize, to: usize) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return pcm;
    }
    if from == 1 && to == 2 {
        let mut out = Vec::with_capacity(pcm.len() * 2);
        for s in pcm {
            out.push(s);
            out.push(s);
        }
        out
    } else if from == 2 && to == 1 {
        pcm.chunks(2).map(|c| (c[0] + c.get(1).copied().unwrap_or(c[0])) / 2.0).collect()
    } else {
        pcm
    }
}
