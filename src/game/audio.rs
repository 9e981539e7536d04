// Fire-and-forget sound cues
// Sound is best-effort: nothing in the game waits on a cue or checks that it played.
//
// Each cue is a handful of short synthesized voices (tones and filtered noise with an
// exponential fade), played through rodio. Without an output device, cues are only logged.

use std::f32::consts::TAU;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

use crate::config::AudioConfig;

pub const SAMPLE_RATE: u32 = 44_100;
/// Level every voice fades out to by the end of its duration.
const FADE_FLOOR: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCue {
    ScrewTap,
    ScrewOut,
    AllScrewsDone,
    KnifeSelect,
    ShellOpen,
    Cut,
    Lift,
    DogEnter,
    Chomp,
    HappyBark,
    Fart,
    BubblePop,
    RevealChime,
}

impl AudioCue {
    pub fn name(self) -> &'static str {
        match self {
            AudioCue::ScrewTap => "screwTap",
            AudioCue::ScrewOut => "screwOut",
            AudioCue::AllScrewsDone => "allScrewsDone",
            AudioCue::KnifeSelect => "knifeSelect",
            AudioCue::ShellOpen => "shellOpen",
            AudioCue::Cut => "cut",
            AudioCue::Lift => "lift",
            AudioCue::DogEnter => "dogEnter",
            AudioCue::Chomp => "chomp",
            AudioCue::HappyBark => "happyBark",
            AudioCue::Fart => "fart",
            AudioCue::BubblePop => "bubblePop",
            AudioCue::RevealChime => "revealChime",
        }
    }
}

pub trait AudioSink {
    fn play(&mut self, cue: AudioCue);
}

/// Silent sink: cues go to the log.
#[derive(Debug, Default)]
pub struct LogAudio;

impl AudioSink for LogAudio {
    fn play(&mut self, cue: AudioCue) {
        log::debug!("cue {}", cue.name());
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio output: {0}")]
    Stream(#[from] rodio::StreamError),
}

// ============================================================================
// VOICES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Wave {
    Sine,
    Square,
    Saw,
    Triangle,
    /// White noise through a one-pole low-pass at `cutoff` Hz.
    Noise { cutoff: f32 },
}

/// One synthesized layer of a cue. Times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub wave: Wave,
    pub freq: f32,
    /// Frequency reached at the end; equal to `freq` for a steady pitch.
    pub freq_end: f32,
    pub duration: f32,
    pub volume: f32,
    pub delay: f32,
    pub attack: f32,
}

impl Voice {
    fn tone(wave: Wave, freq: f32, duration: f32, volume: f32) -> Self {
        Self {
            wave,
            freq,
            freq_end: freq,
            duration,
            volume,
            delay: 0.0,
            attack: 0.0,
        }
    }

    fn noise(duration: f32, volume: f32, cutoff: f32) -> Self {
        Self::tone(Wave::Noise { cutoff }, 0.0, duration, volume)
    }

    fn after(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }

    fn sweep_to(mut self, freq: f32) -> Self {
        self.freq_end = freq;
        self
    }

    fn swell(mut self, attack: f32) -> Self {
        self.attack = attack;
        self
    }

    /// Envelope at `t` seconds: optional linear swell, then exponential fade to the floor.
    pub fn gain_at(&self, t: f32) -> f32 {
        if t < 0.0 || t >= self.duration || self.volume <= 0.0 {
            return 0.0;
        }
        let floor = FADE_FLOOR.min(self.volume);
        let mut gain = self.volume * (floor / self.volume).powf(t / self.duration);
        if self.attack > 0.0 && t < self.attack {
            gain *= t / self.attack;
        }
        gain
    }

    /// Exponential glide from `freq` to `freq_end`.
    pub fn freq_at(&self, t: f32) -> f32 {
        if self.freq <= 0.0 || self.freq_end <= 0.0 || self.duration <= 0.0 {
            return self.freq;
        }
        let p = (t / self.duration).clamp(0.0, 1.0);
        self.freq * (self.freq_end / self.freq).powf(p)
    }
}

/// The layers that make up `cue`. A few cues are randomly detuned per play.
pub fn voices(cue: AudioCue, rng: &mut impl Rng) -> Vec<Voice> {
    use Wave::*;
    match cue {
        AudioCue::ScrewTap => vec![
            Voice::tone(Square, 800.0, 0.08, 0.07),
            Voice::tone(Sine, 1200.0, 0.06, 0.05),
        ],
        AudioCue::ScrewOut => vec![
            Voice::tone(Saw, 400.0, 0.4, 0.08).sweep_to(1200.0),
            Voice::tone(Sine, 600.0, 0.06, 0.12).after(0.3),
        ],
        AudioCue::AllScrewsDone => [523.0, 659.0, 784.0, 1047.0]
            .iter()
            .enumerate()
            .map(|(i, &f)| Voice::tone(Sine, f, 0.3, 0.1).after(i as f32 * 0.1))
            .collect(),
        AudioCue::KnifeSelect => vec![
            Voice::tone(Sine, 2000.0, 0.15, 0.06),
            Voice::tone(Sine, 3000.0, 0.1, 0.04),
            Voice::noise(0.05, 0.06, 4000.0),
        ],
        // Creaky hinge: down, then back up
        AudioCue::ShellOpen => vec![
            Voice::tone(Saw, 150.0, 0.6, 0.05).sweep_to(80.0).swell(0.2),
            Voice::tone(Saw, 80.0, 0.4, 0.05).sweep_to(200.0).after(0.6),
        ],
        AudioCue::Cut => vec![
            Voice::noise(0.15, 0.1, 3000.0),
            Voice::tone(Triangle, 400.0, 0.1, 0.06),
            Voice::noise(0.08, 0.06, 2000.0).after(0.1),
        ],
        AudioCue::Lift => vec![
            Voice::noise(0.2, 0.08, 600.0),
            Voice::tone(Sine, 200.0, 0.15, 0.05),
            Voice::tone(Sine, 300.0, 0.1, 0.04).after(0.1),
        ],
        AudioCue::DogEnter => [0.0, 0.2, 0.5]
            .iter()
            .flat_map(|&delay| {
                let yip = 800.0 + rng.gen_range(0.0..200.0);
                let chirp = 1000.0 + rng.gen_range(0.0..200.0);
                [
                    Voice::tone(Square, yip, 0.08, 0.06).after(delay),
                    Voice::tone(Sine, chirp, 0.06, 0.04).after(delay),
                ]
            })
            .collect(),
        AudioCue::Chomp => vec![
            Voice::noise(0.08, 0.1, 1500.0),
            Voice::tone(Square, 200.0, 0.05, 0.06),
        ],
        AudioCue::HappyBark => vec![
            Voice::tone(Square, 600.0, 0.1, 0.08),
            Voice::tone(Sine, 900.0, 0.08, 0.06),
        ],
        AudioCue::Fart => vec![
            Voice::tone(Saw, 80.0, 0.9, 0.12).sweep_to(30.0).swell(0.05),
            Voice::tone(Square, 60.0, 0.9, 0.12).sweep_to(20.0).swell(0.05),
            Voice::noise(0.6, 0.06, 200.0),
        ],
        AudioCue::BubblePop => {
            vec![Voice::tone(Sine, 1500.0 + rng.gen_range(0.0..500.0), 0.06, 0.04)]
        }
        AudioCue::RevealChime => [523.0, 659.0, 784.0, 1047.0, 1319.0, 1568.0]
            .iter()
            .enumerate()
            .flat_map(|(i, &f)| {
                let at = i as f32 * 0.12;
                [
                    Voice::tone(Sine, f, 0.5, 0.08).after(at),
                    // Harmonic shimmer
                    Voice::tone(Sine, f * 1.5, 0.3, 0.03).after(at),
                ]
            })
            .collect(),
    }
}

// ============================================================================
// SYNTHESIS
// ============================================================================

/// Mono rodio source rendering one `Voice`.
pub struct Tone {
    voice: Voice,
    index: u32,
    total: u32,
    phase: f32,
    low: f32,
    alpha: f32,
    rng: StdRng,
}

impl Tone {
    pub fn new(voice: Voice, seed: u64) -> Self {
        let dt = 1.0 / SAMPLE_RATE as f32;
        let alpha = match voice.wave {
            Wave::Noise { cutoff } if cutoff > 0.0 => {
                let rc = 1.0 / (TAU * cutoff);
                dt / (rc + dt)
            }
            _ => 1.0,
        };
        Self {
            voice,
            index: 0,
            total: (voice.duration.max(0.0) * SAMPLE_RATE as f32).round() as u32,
            phase: 0.0,
            low: 0.0,
            alpha,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

fn oscillator(wave: Wave, phase: f32) -> f32 {
    match wave {
        Wave::Sine => (phase * TAU).sin(),
        Wave::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Wave::Saw => 2.0 * phase - 1.0,
        Wave::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        Wave::Noise { .. } => 0.0,
    }
}

impl Iterator for Tone {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.index >= self.total {
            return None;
        }
        let t = self.index as f32 / SAMPLE_RATE as f32;
        self.index += 1;

        let raw = match self.voice.wave {
            Wave::Noise { .. } => {
                let white: f32 = self.rng.gen_range(-1.0..1.0);
                self.low += self.alpha * (white - self.low);
                self.low
            }
            wave => {
                self.phase = (self.phase + self.voice.freq_at(t) / SAMPLE_RATE as f32).fract();
                oscillator(wave, self.phase)
            }
        };
        Some(raw * self.voice.gain_at(t))
    }
}

impl Source for Tone {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(self.voice.duration.max(0.0)))
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

/// Plays cues on the default output device.
pub struct RodioAudio {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    volume: f32,
    rng: StdRng,
}

impl RodioAudio {
    pub fn try_new(volume: f32) -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
            volume,
            rng: StdRng::from_entropy(),
        })
    }
}

impl AudioSink for RodioAudio {
    fn play(&mut self, cue: AudioCue) {
        log::debug!("cue {}", cue.name());
        for voice in voices(cue, &mut self.rng) {
            let Ok(sink) = Sink::try_new(&self.handle) else {
                log::trace!("no sink for {}", cue.name());
                return;
            };
            sink.set_volume(self.volume);
            let tone = Tone::new(voice, self.rng.r#gen());
            sink.append(tone.delay(Duration::from_secs_f32(voice.delay)));
            sink.detach();
        }
    }
}

/// Best available sink for `config`: rodio when enabled and a device opens, else the log.
pub fn open_output(config: &AudioConfig) -> Box<dyn AudioSink> {
    if !config.enabled {
        log::info!("audio muted");
        return Box::new(LogAudio);
    }
    match RodioAudio::try_new(config.volume) {
        Ok(audio) => {
            log::info!("audio output ready");
            Box::new(audio)
        }
        Err(e) => {
            log::warn!("{e}; cues will only be logged");
            Box::new(LogAudio)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AudioCue; 13] = [
        AudioCue::ScrewTap,
        AudioCue::ScrewOut,
        AudioCue::AllScrewsDone,
        AudioCue::KnifeSelect,
        AudioCue::ShellOpen,
        AudioCue::Cut,
        AudioCue::Lift,
        AudioCue::DogEnter,
        AudioCue::Chomp,
        AudioCue::HappyBark,
        AudioCue::Fart,
        AudioCue::BubblePop,
        AudioCue::RevealChime,
    ];

    #[test]
    fn every_cue_is_short_and_quiet() {
        let mut rng = StdRng::seed_from_u64(3);
        for cue in ALL {
            let layers = voices(cue, &mut rng);
            assert!(!layers.is_empty(), "{}", cue.name());
            for v in layers {
                assert!(v.duration > 0.0 && v.duration <= 1.0, "{}", cue.name());
                assert!(v.volume > 0.0 && v.volume <= 0.15, "{}", cue.name());
                assert!(v.delay >= 0.0 && v.delay + v.duration <= 1.5, "{}", cue.name());
            }
        }
    }

    #[test]
    fn reveal_chime_climbs_with_a_shimmer() {
        let layers = voices(AudioCue::RevealChime, &mut StdRng::seed_from_u64(0));
        assert_eq!(layers.len(), 12);
        assert_eq!(layers[0].freq, 523.0);
        assert_eq!(layers[1].freq, 523.0 * 1.5);
        assert!((layers[11].delay - 0.6).abs() < 1e-6);
    }

    #[test]
    fn bubble_pops_are_detuned_within_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let pop = voices(AudioCue::BubblePop, &mut rng)[0];
            assert!((1500.0..2000.0).contains(&pop.freq));
        }
    }

    #[test]
    fn envelope_fades_from_volume_to_floor() {
        let v = Voice::tone(Wave::Sine, 800.0, 0.08, 0.07);
        assert!((v.gain_at(0.0) - 0.07).abs() < 1e-6);
        assert!(v.gain_at(0.02) > v.gain_at(0.06));
        assert!((v.gain_at(0.0799) - FADE_FLOOR).abs() < 1e-4);
        assert_eq!(v.gain_at(0.08), 0.0);
        assert_eq!(v.gain_at(-0.01), 0.0);
    }

    #[test]
    fn swell_starts_silent() {
        let fart = voices(AudioCue::Fart, &mut StdRng::seed_from_u64(0))[0];
        assert_eq!(fart.gain_at(0.0), 0.0);
        assert!(fart.gain_at(0.04) > fart.gain_at(0.01));
        assert!((fart.freq_at(0.0) - 80.0).abs() < 1e-3);
        assert!((fart.freq_at(0.9) - 30.0).abs() < 1e-3);
    }

    #[test]
    fn tone_renders_its_duration_within_volume() {
        let v = Voice::tone(Wave::Square, 800.0, 0.08, 0.07);
        let samples: Vec<f32> = Tone::new(v, 1).collect();
        assert_eq!(samples.len(), 3528);
        assert!(samples.iter().all(|s| s.abs() <= 0.07 + 1e-6));
        assert!(samples.iter().any(|s| *s > 0.0) && samples.iter().any(|s| *s < 0.0));
    }

    #[test]
    fn noise_is_filtered_and_repeatable() {
        let v = Voice::noise(0.05, 0.1, 1500.0);
        let a: Vec<f32> = Tone::new(v, 9).collect();
        let b: Vec<f32> = Tone::new(v, 9).collect();
        assert_eq!(a, b);
        assert!(a.iter().all(|s| s.abs() <= 0.1));
        assert!(a.iter().any(|s| *s != 0.0));
        let tone = Tone::new(v, 9);
        assert_eq!(tone.channels(), 1);
        assert_eq!(tone.sample_rate(), SAMPLE_RATE);
    }
}
