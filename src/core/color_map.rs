use crate::config::ThresholdConfig;
use crate::domain::model::{Color, ColorCommand};
use crate::utils::error::{MonitorError, Result};
use crate::utils::validation;

/// 損益 → 顏色/亮度 對照表
///
/// Between break-even and either extreme the brightness is interpolated
/// linearly from `min_brightness` to `max_brightness` and rounded down, so
/// it never decreases as |pnl| grows.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    pub huge_profit: f64,
    pub huge_loss: f64,
    pub break_even_band: f64,
    pub min_brightness: u8,
    pub max_brightness: u8,
    pub break_even_brightness: u8,
}

impl Default for ColorMap {
    fn default() -> Self {
        Self {
            huge_profit: 10_000.0,
            huge_loss: -10_000.0,
            break_even_band: 0.0,
            min_brightness: 0,
            max_brightness: 100,
            break_even_brightness: 50,
        }
    }
}

impl ColorMap {
    pub fn from_config(config: &ThresholdConfig) -> Result<Self> {
        let defaults = Self::default();
        let map = Self {
            huge_profit: config.huge_profit.unwrap_or(defaults.huge_profit),
            huge_loss: config.huge_loss.unwrap_or(defaults.huge_loss),
            break_even_band: config.break_even_band.unwrap_or(defaults.break_even_band),
            min_brightness: config.min_brightness.unwrap_or(defaults.min_brightness),
            max_brightness: config.max_brightness.unwrap_or(defaults.max_brightness),
            break_even_brightness: config
                .break_even_brightness
                .unwrap_or(defaults.break_even_brightness),
        };
        map.validate()?;
        Ok(map)
    }

    /// 檢查門檻與亮度設定是否一致
    pub fn validate(&self) -> Result<()> {
        if !self.huge_profit.is_finite() || self.huge_profit <= 0.0 {
            return Err(MonitorError::invalid_config(
                "thresholds.huge_profit",
                self.huge_profit,
                "Must be a positive amount",
            ));
        }
        if !self.huge_loss.is_finite() || self.huge_loss >= 0.0 {
            return Err(MonitorError::invalid_config(
                "thresholds.huge_loss",
                self.huge_loss,
                "Must be a negative amount",
            ));
        }
        let widest_band = self.huge_profit.min(self.huge_loss.abs());
        if !(0.0..widest_band).contains(&self.break_even_band) {
            return Err(MonitorError::invalid_config(
                "thresholds.break_even_band",
                self.break_even_band,
                format!("Must be at least 0 and below {}", widest_band),
            ));
        }
        validation::validate_range("thresholds.max_brightness", self.max_brightness, 0, 100)?;
        validation::validate_range(
            "thresholds.min_brightness",
            self.min_brightness,
            0,
            self.max_brightness,
        )?;
        validation::validate_range(
            "thresholds.break_even_brightness",
            self.break_even_brightness,
            0,
            100,
        )?;
        Ok(())
    }

    pub fn command_for(&self, pnl: f64) -> ColorCommand {
        if !pnl.is_finite() || pnl.abs() <= self.break_even_band {
            return ColorCommand::Set {
                color: Color::Blue,
                brightness: self.break_even_brightness,
            };
        }

        if pnl > 0.0 {
            ColorCommand::Set {
                color: Color::Green,
                brightness: self.scaled(pnl / self.huge_profit),
            }
        } else {
            ColorCommand::Set {
                color: Color::Red,
                brightness: self.scaled(pnl.abs() / self.huge_loss.abs()),
            }
        }
    }

    fn scaled(&self, ratio: f64) -> u8 {
        if ratio >= 1.0 {
            return self.max_brightness;
        }
        let span = f64::from(self.max_brightness.saturating_sub(self.min_brightness));
        (f64::from(self.min_brightness) + ratio.max(0.0) * span).floor() as u8
    }
}
