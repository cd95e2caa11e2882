//! Easing curves
//!
//! Curves are named the way the site's stylesheets and scripts name them:
//! `power4.out`, `sine.inOut`, `elastic.out(1, 0.5)`, `back.out(1.7)`,
//! `none`. A bare family name (`power2`) eases out.

use std::f32::consts::{FRAC_PI_2, TAU};
use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alphanumeric1, char, multispace0},
    combinator::{all_consuming, map, opt, value},
    multi::separated_list0,
    number::complete::float,
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::error::EasingError;

/// Which end of the curve is eased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EaseDirection {
    In,
    #[default]
    Out,
    InOut,
}

/// An easing curve mapping progress `t` in `[0, 1]` to eased progress
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Easing {
    #[default]
    Linear,
    /// `power1` (quad) through `power4` (quint): exponent is `power + 1`
    Power { power: u8, direction: EaseDirection },
    Sine(EaseDirection),
    Expo(EaseDirection),
    Back { overshoot: f32, direction: EaseDirection },
    Elastic {
        amplitude: f32,
        period: f32,
        direction: EaseDirection,
    },
}

impl Easing {
    pub const POWER4_OUT: Easing = Easing::Power {
        power: 4,
        direction: EaseDirection::Out,
    };

    /// Apply the curve; input is clamped to `[0, 1]`
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        let direction = match self {
            Easing::Linear => return t,
            Easing::Power { direction, .. }
            | Easing::Sine(direction)
            | Easing::Expo(direction)
            | Easing::Back { direction, .. }
            | Easing::Elastic { direction, .. } => *direction,
        };
        match direction {
            EaseDirection::In => self.ease_in(t),
            EaseDirection::Out => 1.0 - self.ease_in(1.0 - t),
            EaseDirection::InOut => {
                if t < 0.5 {
                    self.ease_in(t * 2.0) / 2.0
                } else {
                    1.0 - self.ease_in((1.0 - t) * 2.0) / 2.0
                }
            }
        }
    }

    /// The ease-in form of the curve's family
    fn ease_in(&self, t: f32) -> f32 {
        match *self {
            Easing::Linear => t,
            Easing::Power { power, .. } => t.powi(i32::from(power) + 1),
            Easing::Sine(_) => 1.0 - (t * FRAC_PI_2).cos(),
            Easing::Expo(_) => 2f32.powf(10.0 * (t - 1.0)),
            Easing::Back { overshoot, .. } => t * t * ((overshoot + 1.0) * t - overshoot),
            Easing::Elastic {
                amplitude, period, ..
            } => {
                let amplitude = amplitude.max(1.0);
                let shift = period / TAU * (1.0 / amplitude).asin();
                let t = t - 1.0;
                -(amplitude * 2f32.powf(10.0 * t) * ((t - shift) * TAU / period).sin())
            }
        }
    }

    /// Parse a curve name
    pub fn parse(input: &str) -> Result<Self, EasingError> {
        let (_, (family, direction, args)) = all_consuming(easing_name)(input.trim())
            .map_err(|_| EasingError::Syntax(input.to_string()))?;
        let direction = direction.unwrap_or_default();
        let arg = |i: usize, default: f32| args.get(i).copied().unwrap_or(default);

        let easing = match family.to_ascii_lowercase().as_str() {
            "none" | "linear" | "power0" => Easing::Linear,
            "power1" | "quad" => Easing::Power { power: 1, direction },
            "power2" | "cubic" => Easing::Power { power: 2, direction },
            "power3" | "quart" => Easing::Power { power: 3, direction },
            "power4" | "quint" | "strong" => Easing::Power { power: 4, direction },
            "sine" => Easing::Sine(direction),
            "expo" => Easing::Expo(direction),
            "back" => Easing::Back {
                overshoot: arg(0, 1.70158),
                direction,
            },
            "elastic" => Easing::Elastic {
                amplitude: arg(0, 1.0),
                period: arg(1, 0.3).max(f32::EPSILON),
                direction,
            },
            _ => return Err(EasingError::Unknown(input.to_string())),
        };
        Ok(easing)
    }
}

impl FromStr for Easing {
    type Err = EasingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn dir(d: EaseDirection) -> &'static str {
            match d {
                EaseDirection::In => "in",
                EaseDirection::Out => "out",
                EaseDirection::InOut => "inOut",
            }
        }
        match *self {
            Easing::Linear => f.write_str("none"),
            Easing::Power { power, direction } => write!(f, "power{power}.{}", dir(direction)),
            Easing::Sine(d) => write!(f, "sine.{}", dir(d)),
            Easing::Expo(d) => write!(f, "expo.{}", dir(d)),
            Easing::Back {
                overshoot,
                direction,
            } => write!(f, "back.{}({overshoot})", dir(direction)),
            Easing::Elastic {
                amplitude,
                period,
                direction,
            } => write!(f, "elastic.{}({amplitude}, {period})", dir(direction)),
        }
    }
}

// ============================================================================
// Grammar
// ============================================================================

fn direction(input: &str) -> IResult<&str, EaseDirection> {
    alt((
        value(EaseDirection::InOut, tag("inOut")),
        value(EaseDirection::In, tag("in")),
        value(EaseDirection::Out, tag("out")),
    ))(input)
}

fn arguments(input: &str) -> IResult<&str, Vec<f32>> {
    delimited(
        tuple((char('('), multispace0)),
        separated_list0(tuple((multispace0, char(','), multispace0)), float),
        tuple((multispace0, char(')'))),
    )(input)
}

type EasingParts<'a> = (&'a str, Option<EaseDirection>, Vec<f32>);

fn easing_name(input: &str) -> IResult<&str, EasingParts<'_>> {
    map(
        tuple((
            alphanumeric1,
            opt(preceded(char('.'), direction)),
            opt(arguments),
        )),
        |(family, direction, args)| (family, direction, args.unwrap_or_default()),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_endpoints() {
        for name in [
            "none",
            "power4.out",
            "power2.inOut",
            "sine.in",
            "expo.out",
            "back.out(1.7)",
            "elastic.out(1, 0.5)",
        ] {
            let easing = Easing::parse(name).unwrap();
            assert_eq!(easing.apply(0.0), 0.0, "{name}");
            assert_eq!(easing.apply(1.0), 1.0, "{name}");
        }
    }

    #[test]
    fn test_power_curves() {
        let out = Easing::parse("power4.out").unwrap();
        assert_eq!(out, Easing::POWER4_OUT);
        // 1 - (1 - 0.5)^5
        assert!(approx(out.apply(0.5), 0.96875));

        let quad_in = Easing::parse("power1.in").unwrap();
        assert!(approx(quad_in.apply(0.5), 0.25));

        let bare = Easing::parse("power2").unwrap();
        assert_eq!(
            bare,
            Easing::Power {
                power: 2,
                direction: EaseDirection::Out
            }
        );

        let in_out = Easing::parse("power1.inOut").unwrap();
        assert!(approx(in_out.apply(0.5), 0.5));
    }

    #[test]
    fn test_elastic_overshoots() {
        let elastic = Easing::parse("elastic.out(1, 0.5)").unwrap();
        assert_eq!(
            elastic,
            Easing::Elastic {
                amplitude: 1.0,
                period: 0.5,
                direction: EaseDirection::Out
            }
        );
        let peak = (1..100)
            .map(|i| elastic.apply(i as f32 / 100.0))
            .fold(0.0f32, f32::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Easing::parse("wobble.out"),
            Err(EasingError::Unknown(_))
        ));
        assert!(matches!(
            Easing::parse("power4.sideways"),
            Err(EasingError::Syntax(_))
        ));
    }

    #[test]
    fn test_display_round_trips_names() {
        let easing = Easing::parse("elastic.out(1, 0.5)").unwrap();
        assert_eq!(easing.to_string(), "elastic.out(1, 0.5)");
        assert_eq!(Easing::parse("sine.inOut").unwrap().to_string(), "sine.inOut");
    }
}
