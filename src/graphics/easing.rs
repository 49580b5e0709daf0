//! Easing curves mapping normalized time to normalized progress.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Easing curve applied to a spark's normalized age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    /// `t`
    Linear,
    /// `t^2`
    EaseIn,
    /// `t * (2 - t)`
    #[default]
    EaseOut,
    /// `2t^2` for the first half, `-1 + (4 - 2t) * t` for the second.
    EaseInOut,
}

impl Easing {
    /// Maps `t` in [0, 1] to eased progress.
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Easing::Linear => simple_easing::linear(t),
            Easing::EaseIn => simple_easing::quad_in(t),
            Easing::EaseOut => simple_easing::quad_out(t),
            Easing::EaseInOut => simple_easing::quad_in_out(t),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseIn => "ease-in",
            Easing::EaseOut => "ease-out",
            Easing::EaseInOut => "ease-in-out",
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown easing \"{0}\", expected linear, ease-in, ease-out or ease-in-out")]
pub struct UnknownEasing(pub String);

impl FromStr for Easing {
    type Err = UnknownEasing;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Easing::Linear),
            "ease-in" => Ok(Easing::EaseIn),
            "ease-out" => Ok(Easing::EaseOut),
            "ease-in-out" => Ok(Easing::EaseInOut),
            other => Err(UnknownEasing(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 4] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
    ];

    #[test]
    fn boundaries_are_zero_and_one() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-6, "{easing} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{easing} at 1");
        }
    }

    #[test]
    fn matches_reference_formulas() {
        for i in 0..=20 {
            let t = i as f32 / 20.0;
            assert!((Easing::Linear.apply(t) - t).abs() < 1e-5);
            assert!((Easing::EaseIn.apply(t) - t * t).abs() < 1e-5);
            assert!((Easing::EaseOut.apply(t) - t * (2.0 - t)).abs() < 1e-5);
            let in_out = if t < 0.5 {
                2.0 * t * t
            } else {
                -1.0 + (4.0 - 2.0 * t) * t
            };
            assert!(
                (Easing::EaseInOut.apply(t) - in_out).abs() < 1e-5,
                "ease-in-out at {t}"
            );
        }
    }

    #[test]
    fn ease_in_out_is_continuous_at_half() {
        let below = Easing::EaseInOut.apply(0.4999);
        let above = Easing::EaseInOut.apply(0.5001);
        assert!((below - above).abs() < 1e-3);
        assert!((Easing::EaseInOut.apply(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn parses_config_names() {
        for easing in ALL {
            assert_eq!(easing.as_str().parse::<Easing>(), Ok(easing));
        }
        assert!("bounce".parse::<Easing>().is_err());
        assert_eq!(Easing::default(), Easing::EaseOut);
    }
}
