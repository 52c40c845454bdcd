//! bluesgrid core - DSP building blocks for the synth engine
//!
//! Everything here runs on the audio thread: no allocation after
//! construction, no locks, no logging.
//!
//! # Building blocks
//!
//! - [`Effect`] - Object-safe mono processor trait
//! - [`OnePole`] - 6 dB/oct lowpass (and complementary highpass) used for tone shaping
//! - [`StateVariableFilter`] - TPT state variable filter, swept for the wah
//! - [`InterpolatedDelay`] - Fractional delay line for vibrato and chorus
//! - [`CombFilter`] / [`AllpassFilter`] - Reverb network stages
//! - [`Lfo`] - Low-frequency oscillator in unit phase
//! - Math helpers: [`flush_denormal`], [`wet_dry_mix`], [`soft_clip`], [`hard_clip`]
//!
//! # no_std Support
//!
//! Disable the default `std` feature to build for targets without `std`.
//! The delay-based stages need `alloc`.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod allpass;
pub mod comb;
pub mod delay;
pub mod effect;
pub mod lfo;
pub mod math;
pub mod one_pole;
pub mod svf;

pub use allpass::AllpassFilter;
pub use comb::CombFilter;
pub use delay::InterpolatedDelay;
pub use effect::Effect;
pub use lfo::{Lfo, LfoWaveform};
pub use math::{flush_denormal, hard_clip, lerp, soft_clip, wet_dry_mix};
pub use one_pole::OnePole;
pub use svf::{StateVariableFilter, SvfOutput};
