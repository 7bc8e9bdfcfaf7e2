//! Audio using the Web Audio API
//!
//! Procedurally generated cues and an ambient drone, no asset files.

/// Background music level, nudged on every start and miss
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MusicLevel {
    level: f32,
}

impl MusicLevel {
    pub const INITIAL: f32 = 0.5;
    pub const STEP: f32 = 0.002;
    /// A miss caps the music at this level
    pub const MISS_CAP: f32 = 0.1;

    pub fn new() -> Self {
        Self {
            level: Self::INITIAL,
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// A run starts: the music ducks a little
    pub fn on_start(&mut self) {
        self.level = if self.level > 0.0 {
            (self.level - Self::STEP).max(0.0)
        } else {
            0.0
        };
    }

    /// A run ends: the music creeps back up, but never above the cap
    pub fn on_miss(&mut self) {
        self.level = if self.level < Self::MISS_CAP {
            (self.level + Self::STEP).min(Self::MISS_CAP)
        } else {
            Self::MISS_CAP
        };
    }
}

impl Default for MusicLevel {
    fn default() -> Self {
        Self::new()
    }
}

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Layer placed; pitch climbs with the score
    Place { score: u32 },
    /// Layer missed
    Miss,
    /// Run made the top of the best-score table
    NewBest,
}

/// Major pentatonic steps above the base note, wrapping every octave
pub fn place_frequency(score: u32) -> f32 {
    const STEPS: [f32; 5] = [0.0, 2.0, 4.0, 7.0, 9.0];
    let octave = (score / 5).min(2) as f32;
    let semitones = STEPS[(score % 5) as usize] + 12.0 * octave;
    440.0 * 2f32.powf(semitones / 12.0)
}

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::{MusicLevel, SoundEffect, place_frequency};

    /// Audio manager for the game
    pub struct AudioManager {
        ctx: Option<AudioContext>,
        master_volume: f32,
        sfx_volume: f32,
        music_volume: f32,
        music: MusicLevel,
        /// Drone gain node and its oscillators, kept alive while playing
        drone: Option<(GainNode, Vec<OscillatorNode>)>,
    }

    impl AudioManager {
        pub fn new(master_volume: f32, sfx_volume: f32, music_volume: f32) -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                master_volume: master_volume.clamp(0.0, 1.0),
                sfx_volume: sfx_volume.clamp(0.0, 1.0),
                music_volume: music_volume.clamp(0.0, 1.0),
                music: MusicLevel::new(),
                drone: None,
            }
        }

        fn context(&self) -> Option<&AudioContext> {
            let ctx = self.ctx.as_ref()?;
            // Browsers keep the context suspended until a user gesture
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }
            Some(ctx)
        }

        fn sfx_gain(&self) -> f32 {
            self.master_volume * self.sfx_volume
        }

        pub fn play(&self, effect: SoundEffect) {
            let vol = self.sfx_gain();
            if vol <= 0.0 {
                return;
            }
            let Some(ctx) = self.context() else { return };

            match effect {
                SoundEffect::Place { score } => play_place(ctx, vol, place_frequency(score)),
                SoundEffect::Miss => play_miss(ctx, vol),
                SoundEffect::NewBest => play_new_best(ctx, vol),
            }
        }

        /// Start the ambient drone (no-op if already running)
        pub fn start_music(&mut self) {
            if self.drone.is_some() {
                return;
            }
            let Some(ctx) = self.context() else { return };
            let Ok(gain) = ctx.create_gain() else { return };
            if gain.connect_with_audio_node(&ctx.destination()).is_err() {
                return;
            }

            // Root, fifth, and a slow detuned octave
            let oscillators: Vec<OscillatorNode> = [(110.0, 0.0), (165.0, 0.0), (220.0, 4.0)]
                .iter()
                .filter_map(|&(freq, detune)| {
                    let osc = ctx.create_oscillator().ok()?;
                    osc.set_type(OscillatorType::Sine);
                    osc.frequency().set_value(freq);
                    osc.detune().set_value(detune);
                    osc.connect_with_audio_node(&gain).ok()?;
                    osc.start().ok()?;
                    Some(osc)
                })
                .collect();

            log::info!("Ambient music started ({} voices)", oscillators.len());
            self.drone = Some((gain, oscillators));
            self.apply_music_level();
        }

        pub fn on_start(&mut self) {
            self.music.on_start();
            self.apply_music_level();
        }

        pub fn on_miss(&mut self) {
            self.music.on_miss();
            self.apply_music_level();
        }

        fn apply_music_level(&self) {
            let (Some(ctx), Some((gain, _))) = (&self.ctx, &self.drone) else {
                return;
            };
            let target = self.music.level() * self.master_volume * self.music_volume;
            gain.gain()
                .linear_ramp_to_value_at_time(target, ctx.current_time() + 0.5)
                .ok();
        }
    }

    /// Oscillator routed through its own gain envelope
    fn create_osc(
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// Bright two-note chime
    fn play_place(ctx: &AudioContext, vol: f32, freq: f32) {
        for (i, f) in [freq, freq * 1.5].iter().enumerate() {
            let Some((osc, gain)) = create_osc(ctx, *f, OscillatorType::Triangle) else {
                continue;
            };
            let t = ctx.current_time() + i as f64 * 0.06;
            gain.gain().set_value_at_time(vol * 0.25, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.25)
                .ok();
            osc.start_with_when(t).ok();
            osc.stop_with_when(t + 0.3).ok();
        }
    }

    /// Low falling buzz
    fn play_miss(ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = create_osc(ctx, 220.0, OscillatorType::Sawtooth) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.3, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.5)
            .ok();
        osc.frequency().set_value_at_time(220.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(55.0, t + 0.5)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.6).ok();
    }

    /// Rising arpeggio
    fn play_new_best(ctx: &AudioContext, vol: f32) {
        for (i, freq) in [523.0, 659.0, 784.0, 1047.0].iter().enumerate() {
            let delay = i as f64 * 0.09;
            if let Some((osc, gain)) = create_osc(ctx, *freq, OscillatorType::Triangle) {
                let t = ctx.current_time() + delay;
                gain.gain().set_value_at_time(vol * 0.25, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.3)
                    .ok();
                osc.start_with_when(t).ok();
                osc.stop_with_when(t + 0.35).ok();
            }
        }
    }
}
