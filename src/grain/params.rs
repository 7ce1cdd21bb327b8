use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{FilmgrainError, FilmgrainResult};

/// Overall grain strength used when `grain_power` is absent.
pub const DEFAULT_GRAIN_POWER: f64 = 1.0;
/// Highlight grain strength used when `highs` is absent.
pub const DEFAULT_HIGHS: f64 = 0.5;
/// Shadow grain strength used when `shadows` is absent.
pub const DEFAULT_SHADOWS: f64 = 0.5;

/// Grain synthesis mode understood by `filmgrainer --type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum GrainType {
    /// Small, fine grain.
    SmallFine = 1,
    /// Small, coarse grain.
    SmallCoarse = 2,
    /// Large, fine grain.
    LargeFine = 3,
    /// Large, coarse grain.
    LargeCoarse = 4,
}

impl TryFrom<u8> for GrainType {
    type Error = FilmgrainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::SmallFine),
            2 => Ok(Self::SmallCoarse),
            3 => Ok(Self::LargeFine),
            4 => Ok(Self::LargeCoarse),
            other => Err(FilmgrainError::validation(format!(
                "grain type must be 1..=4, got {other}"
            ))),
        }
    }
}

impl From<GrainType> for u8 {
    fn from(value: GrainType) -> Self {
        value as u8
    }
}

impl FromStr for GrainType {
    type Err = FilmgrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u8 = s.trim().parse().map_err(|_| {
            FilmgrainError::validation(format!("grain type must be an integer 1..=4, got '{s}'"))
        })?;
        Self::try_from(raw)
    }
}

impl fmt::Display for GrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Grain tuning for one invocation. `None` means "leave the tool default".
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrainParameters {
    /// Resize factor applied before graining.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    /// Overall grain strength.
    #[serde(default, alias = "grain_power", skip_serializing_if = "Option::is_none")]
    pub grain_power: Option<f64>,
    /// Grain strength in shadows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadows: Option<f64>,
    /// Grain strength in highlights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highs: Option<f64>,
    /// Synthesis mode.
    #[serde(default, alias = "grain_type", skip_serializing_if = "Option::is_none")]
    pub grain_type: Option<GrainType>,
    /// Grain color saturation.
    #[serde(
        default,
        alias = "grain_sat",
        alias = "grainSat",
        skip_serializing_if = "Option::is_none"
    )]
    pub grain_saturation: Option<f64>,
    /// Sharpening passes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharpen: Option<u32>,
    /// Produce a grayscale result.
    #[serde(default)]
    pub gray: bool,
}

impl GrainParameters {
    /// Reject values the tool cannot do anything sensible with.
    pub fn validate(&self) -> FilmgrainResult<()> {
        if let Some(scale) = self.scale
            && !(scale.is_finite() && scale > 0.0)
        {
            return Err(FilmgrainError::validation(format!(
                "scale must be a positive number, got {scale}"
            )));
        }
        for (name, value) in [
            ("grainPower", self.grain_power),
            ("shadows", self.shadows),
            ("highs", self.highs),
            ("grainSaturation", self.grain_saturation),
        ] {
            if let Some(v) = value
                && !(v.is_finite() && v >= 0.0)
            {
                return Err(FilmgrainError::validation(format!(
                    "{name} must be a non-negative number, got {v}"
                )));
            }
        }
        Ok(())
    }

    /// Intensity triple with defaults filled in.
    pub fn intensity(&self) -> GrainIntensity {
        GrainIntensity {
            global: self.grain_power.unwrap_or(DEFAULT_GRAIN_POWER),
            highlights: self.highs.unwrap_or(DEFAULT_HIGHS),
            shadows: self.shadows.unwrap_or(DEFAULT_SHADOWS),
        }
    }
}

/// The composite `--power` value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrainIntensity {
    /// Overall strength.
    pub global: f64,
    /// Highlight strength.
    pub highlights: f64,
    /// Shadow strength.
    pub shadows: f64,
}

impl fmt::Display for GrainIntensity {
    /// `global,highlights,shadows`, the order `filmgrainer` parses.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{}",
            format_decimal(self.global),
            format_decimal(self.highlights),
            format_decimal(self.shadows)
        )
    }
}

/// Stable decimal text for a float: integral values keep a trailing `.0`.
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/grain/params.rs"]
mod tests;
