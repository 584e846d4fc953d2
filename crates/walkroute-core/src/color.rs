//! Mapping slope values to display colors.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const GREEN: Rgb = Rgb(0, 128, 0);
    pub const YELLOW: Rgb = Rgb(255, 255, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);

    /// Linear blend towards `other`; `t` is clamped to [0, 1].
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(
            mix(self.0, other.0),
            mix(self.1, other.1),
            mix(self.2, other.2),
        )
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Parse `#rrggbb`.
    pub fn from_hex(hex: &str) -> Option<Rgb> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |at: usize| u8::from_str_radix(&digits[at..at + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Unit the policy's domain and thresholds are expressed in.
///
/// Slope values are always percent grades; `Fraction` divides them by 100
/// before classification so fractional thresholds such as 0.03 mean 3%.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeScale {
    #[default]
    Percent,
    Fraction,
}

impl SlopeScale {
    pub fn apply(self, slope_percent: f64) -> f64 {
        match self {
            SlopeScale::Percent => slope_percent,
            SlopeScale::Fraction => slope_percent / 100.0,
        }
    }
}

impl FromStr for SlopeScale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" => Ok(SlopeScale::Percent),
            "fraction" => Ok(SlopeScale::Fraction),
            other => Err(Error::InvalidInput(format!("unknown slope scale {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Green → yellow → red across the whole domain.
    #[default]
    Continuous,
    /// Green up to `easy_threshold`, yellow up to `medium_threshold`, then ramping to red.
    Thresholded,
}

impl FromStr for ColorMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continuous" => Ok(ColorMode::Continuous),
            "thresholded" => Ok(ColorMode::Thresholded),
            other => Err(Error::InvalidInput(format!("unknown color mode {other:?}"))),
        }
    }
}

/// Slope classification policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorPolicy {
    pub mode: ColorMode,
    pub slope_min: f64,
    pub slope_max: f64,
    pub scale: SlopeScale,
    pub easy_threshold: f64,
    pub medium_threshold: f64,
}

impl Default for ColorPolicy {
    fn default() -> Self {
        Self {
            mode: ColorMode::Continuous,
            slope_min: -1.0,
            slope_max: 1.0,
            scale: SlopeScale::Percent,
            easy_threshold: 0.03,
            medium_threshold: 0.05,
        }
    }
}

impl ColorPolicy {
    pub fn continuous() -> Self {
        Self::default()
    }

    pub fn thresholded() -> Self {
        Self {
            mode: ColorMode::Thresholded,
            ..Self::default()
        }
    }

    pub fn with_scale(mut self, scale: SlopeScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_domain(mut self, slope_min: f64, slope_max: f64) -> Self {
        self.slope_min = slope_min;
        self.slope_max = slope_max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.slope_min,
            self.slope_max,
            self.easy_threshold,
            self.medium_threshold,
        ]
        .iter()
        .all(|value| value.is_finite());
        if !finite {
            return Err(Error::InvalidInput(
                "color policy values must be finite".to_string(),
            ));
        }
        if self.slope_max <= self.slope_min {
            return Err(Error::InvalidInput(format!(
                "slope_max ({}) must exceed slope_min ({})",
                self.slope_max, self.slope_min
            )));
        }
        if self.medium_threshold < self.easy_threshold {
            return Err(Error::InvalidInput(format!(
                "medium_threshold ({}) must not be below easy_threshold ({})",
                self.medium_threshold, self.easy_threshold
            )));
        }
        Ok(())
    }

    /// Position of `slope_percent` within the domain, clamped to [0, 1].
    pub fn normalize(&self, slope_percent: f64) -> f64 {
        let value = self.scale.apply(slope_percent);
        let t = (value - self.slope_min) / (self.slope_max - self.slope_min);
        if t.is_nan() {
            return 0.0;
        }
        t.clamp(0.0, 1.0)
    }

    pub fn rgb(&self, slope_percent: f64) -> Rgb {
        match self.mode {
            ColorMode::Continuous => {
                let t = self.normalize(slope_percent);
                if t <= 0.5 {
                    Rgb::GREEN.lerp(Rgb::YELLOW, t * 2.0)
                } else {
                    Rgb::YELLOW.lerp(Rgb::RED, (t - 0.5) * 2.0)
                }
            }
            ColorMode::Thresholded => {
                let value = self.scale.apply(slope_percent);
                if value.is_nan() || value <= self.easy_threshold {
                    Rgb::GREEN
                } else if value <= self.medium_threshold {
                    Rgb::YELLOW
                } else if self.slope_max <= self.medium_threshold {
                    Rgb::RED
                } else {
                    let ramp = (value - self.medium_threshold)
                        / (self.slope_max - self.medium_threshold);
                    Rgb::YELLOW.lerp(Rgb::RED, ramp)
                }
            }
        }
    }

    /// Hex color (`#rrggbb`) for one slope.
    pub fn color(&self, slope_percent: f64) -> String {
        self.rgb(slope_percent).to_hex()
    }

    pub fn colors(&self, slopes: &[f64]) -> Vec<String> {
        slopes.iter().map(|slope| self.color(*slope)).collect()
    }
}
