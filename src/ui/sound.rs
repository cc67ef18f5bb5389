/// Sound engine: procedural chiptune cues via rodio.
///
/// All cues are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

use crate::domain::rules::BlockReason;
use crate::sim::event::{Effect, TweenTarget, VisualRef};
use crate::sim::step::{FinishOutcome, MoveOutcome, StepReport};

/// One sound cue.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sfx {
    Peel,
    Grab,
    Unlock,
    Bump,
    Finish,
}

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
impl Sfx {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        self as usize
    }
}

/// The one cue to play for a tick, if any.
pub fn cue_for(report: &StepReport) -> Option<Sfx> {
    match report.finish {
        Some(FinishOutcome::Solved) => return Some(Sfx::Finish),
        Some(FinishOutcome::Refused { .. }) => return Some(Sfx::Bump),
        Some(FinishOutcome::AlreadySolved) | None => {}
    }
    match &report.movement {
        Some(MoveOutcome::Moved { effects }) => {
            let opened = effects.iter().filter(|e| matches!(e, Effect::DestroyVisual(VisualRef::Occupant(_)))).count();
            let grabbed = effects.iter().any(|e| matches!(e, Effect::TweenMove { to: TweenTarget::HeldSlot, .. }));
            if grabbed {
                Some(Sfx::Grab)
            } else if opened >= 2 {
                // Door and spent key
                Some(Sfx::Unlock)
            } else {
                Some(Sfx::Peel)
            }
        }
        Some(MoveOutcome::Blocked(BlockReason::SessionOver)) => None,
        Some(MoveOutcome::Blocked(_)) => Some(Sfx::Bump),
        None => None,
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use log::warn;
    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Sfx;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = 2.0 * std::f32::consts::PI;

    /// Pre-generated WAV buffers, indexed by `Sfx`.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        cues: [Arc<Vec<u8>>; Sfx::COUNT],
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("no audio output, sound disabled: {e}");
                    return None;
                }
            };

            let cues = [
                Arc::new(make_wav(&gen_peel())),
                Arc::new(make_wav(&gen_grab())),
                Arc::new(make_wav(&gen_unlock())),
                Arc::new(make_wav(&gen_bump())),
                Arc::new(make_wav(&gen_finish())),
            ];

            Some(SoundEngine { _stream: stream, handle, cues })
        }

        pub fn play(&self, sfx: Sfx) {
            let buf = &self.cues[sfx.index()];
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    /// Sequence of notes, each with a 3rd-harmonic square-ish tone.
    fn notes(freqs: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in freqs {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Peel: short crumbly noise tick
    fn gen_peel() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.05) as usize;
        let mut rng: u32 = 12345;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                noise * (1.0 - t).powf(2.0) * 0.15
            })
            .collect()
    }

    /// Grab: quick ascending arpeggio C6→E6→G6
    fn gen_grab() -> Vec<f32> {
        notes(&[1047.0, 1319.0, 1568.0], 0.045, 0.25)
    }

    /// Unlock: C5→E5→G5→C6 with a held top note
    fn gen_unlock() -> Vec<f32> {
        let mut samples = notes(&[523.0, 659.0, 784.0], 0.08, 0.3);
        let n = (SAMPLE_RATE as f32 * 0.25) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32);
            samples.push((t * 1047.0 * TAU).sin() * env * 0.3);
        }
        samples
    }

    /// Bump: low descending thud
    fn gen_bump() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.08) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 180.0 - t * 80.0;
                let ti = i as f32 / SAMPLE_RATE as f32;
                (ti * freq * TAU).sin() * (1.0 - t) * 0.35
            })
            .collect()
    }

    /// Finish: two rising runs ending on a long chord tone
    fn gen_finish() -> Vec<f32> {
        let mut samples = notes(&[523.0, 659.0, 784.0, 1047.0], 0.1, 0.3);
        samples.extend(notes(&[784.0, 1047.0, 1319.0, 1568.0], 0.08, 0.3));
        let n = (SAMPLE_RATE as f32 * 0.4) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32);
            let wave = (t * 1047.0 * TAU).sin() * 0.6 + (t * 1568.0 * TAU).sin() * 0.4;
            samples.push(wave * env * 0.3);
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _sfx: Sfx) {}
}
