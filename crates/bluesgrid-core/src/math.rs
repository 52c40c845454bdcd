//! Small scalar helpers used throughout the DSP code.

use libm::tanhf;

/// Flush values small enough to turn denormal to exact zero.
///
/// Feedback paths (comb filters, one-pole states, release tails) decay toward
/// zero forever; denormals there cost a lot of CPU on x86.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Linear crossfade between dry and wet signals. `mix` is clamped to [0, 1].
#[inline]
pub fn wet_dry_mix(dry: f32, wet: f32, mix: f32) -> f32 {
    let mix = mix.clamp(0.0, 1.0);
    dry * (1.0 - mix) + wet * mix
}

/// Hyperbolic tangent saturation after a pre-gain.
#[inline]
pub fn soft_clip(x: f32, drive: f32) -> f32 {
    tanhf(x * drive)
}

/// Hard limit to `[-threshold, threshold]`. NaN becomes silence.
#[inline]
pub fn hard_clip(x: f32, threshold: f32) -> f32 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(-threshold, threshold)
}

/// Linear interpolation.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denormals_flush_to_zero() {
        assert_eq!(flush_denormal(1e-25), 0.0);
        assert_eq!(flush_denormal(-1e-30), 0.0);
        assert_eq!(flush_denormal(0.25), 0.25);
    }

    #[test]
    fn mix_endpoints() {
        assert_eq!(wet_dry_mix(1.0, 0.0, 0.0), 1.0);
        assert_eq!(wet_dry_mix(1.0, 0.0, 1.0), 0.0);
        assert_eq!(wet_dry_mix(1.0, 0.0, 7.0), 0.0);
        assert!((wet_dry_mix(1.0, 0.0, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn soft_clip_is_bounded() {
        for i in -100..=100 {
            let y = soft_clip(i as f32, 10.0);
            assert!(y.abs() <= 1.0);
        }
    }

    #[test]
    fn hard_clip_handles_nan() {
        assert_eq!(hard_clip(f32::NAN, 1.0), 0.0);
        assert_eq!(hard_clip(3.0, 1.0), 1.0);
        assert_eq!(hard_clip(-3.0, 1.0), -1.0);
    }
}
