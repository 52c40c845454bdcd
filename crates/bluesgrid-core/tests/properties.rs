//! Property-based tests for bluesgrid-core DSP primitives.
//!
//! Filter stability under swept parameters and bounded reverb stages.

use proptest::prelude::*;
use bluesgrid_core::{
    AllpassFilter, CombFilter, Effect, InterpolatedDelay, OnePole, StateVariableFilter, SvfOutput,
};

fn output_mode(index: usize) -> SvfOutput {
    match index % 4 {
        0 => SvfOutput::Lowpass,
        1 => SvfOutput::Highpass,
        2 => SvfOutput::Bandpass,
        _ => SvfOutput::NormalizedBandpass,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Any cutoff/Q pair keeps every SVF response finite.
    #[test]
    fn svf_stability(
        freq in 20.0f32..20000.0f32,
        q in 0.5f32..20.0f32,
        mode in 0usize..4,
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_cutoff(freq);
        svf.set_q(q);
        svf.set_output(output_mode(mode));
        for _ in 0..32 {
            for &x in &input {
                let y = svf.process(x);
                prop_assert!(y.is_finite(), "freq={} q={} produced {}", freq, q, y);
            }
        }
    }

    /// Sweeping the cutoff every sample (what the wah does) stays bounded.
    #[test]
    fn svf_sweep_bounded(start in 200.0f32..3000.0f32, step in -5.0f32..5.0f32) {
        let mut svf = StateVariableFilter::new(48000.0);
        svf.set_q(6.0);
        svf.set_output(SvfOutput::NormalizedBandpass);
        let mut cutoff = start;
        for i in 0..4800 {
            cutoff = (cutoff + step).clamp(100.0, 5000.0);
            svf.set_cutoff(cutoff);
            let x = if i % 64 < 32 { 0.8 } else { -0.8 };
            let y = svf.process(x);
            prop_assert!(y.abs() < 10.0);
        }
    }

    /// One-pole output always lies between the running input extremes.
    #[test]
    fn one_pole_never_overshoots(
        alpha in 0.001f32..=1.0f32,
        input in prop::array::uniform32(-1.0f32..=1.0f32),
    ) {
        let mut lp = OnePole::with_alpha(alpha);
        for &x in &input {
            let y = lp.process(x);
            prop_assert!(y.abs() <= 1.0 + 1e-6);
        }
    }

    /// Comb and allpass stages decay after input stops.
    #[test]
    fn reverb_stages_decay(
        len in 10usize..500,
        feedback in 0.0f32..=1.5f32,
        damp in 0.0f32..=0.9f32,
    ) {
        let mut comb = CombFilter::new(len);
        comb.set_feedback(feedback);
        comb.set_damp(damp);
        let mut ap = AllpassFilter::new(len / 3 + 1);
        ap.set_gain(0.5);

        for _ in 0..len {
            ap.process(comb.process(1.0));
        }
        let mut peak = 0.0f32;
        for _ in 0..(len * 400) {
            peak = ap.process(comb.process(0.0)).abs();
        }
        prop_assert!(peak < 0.5, "len={} feedback={} tail {}", len, feedback, peak);
    }

    /// Fractional reads lie between the two neighbouring samples.
    #[test]
    fn delay_interpolation_is_bracketed(
        values in prop::array::uniform16(-1.0f32..=1.0f32),
        delay in 0.0f32..14.0f32,
    ) {
        let mut d = InterpolatedDelay::new(16);
        for &v in &values {
            d.write(v);
        }
        let y = d.read(delay);
        let lo = d.read(delay.floor());
        let hi = d.read(delay.floor() + 1.0);
        prop_assert!(y >= lo.min(hi) - 1e-6 && y <= lo.max(hi) + 1e-6);
    }
}
