//! Routine configuration

use crate::common::error::ConfigError;
use crate::common::field::FieldGeometry;
use std::collections::HashMap;

/// Three inches, in meters
pub const DEFAULT_TOLERANCE_METERS: f64 = 0.0762;

/// Fixed control-loop period used when none is configured (50 Hz)
pub const DEFAULT_LOOP_PERIOD: f64 = 0.02;

/// Settings shared by a routine and every follower it creates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoConfig {
    /// Mirror trajectories when running from the red side
    pub use_alliance_flipping: bool,
    /// Tolerance for pose triggers that do not specify one (meters)
    pub default_tolerance: f64,
    /// Control-loop period (seconds)
    pub loop_period: f64,
    pub field: FieldGeometry,
}

impl AutoConfig {
    pub fn new(field: FieldGeometry) -> Self {
        AutoConfig {
            use_alliance_flipping: true,
            default_tolerance: DEFAULT_TOLERANCE_METERS,
            loop_period: DEFAULT_LOOP_PERIOD,
            field,
        }
    }

    pub fn with_alliance_flipping(mut self, enabled: bool) -> Self {
        self.use_alliance_flipping = enabled;
        self
    }

    /// Configure from a parameter map.
    ///
    /// Recognized keys: `default_tolerance`, `loop_period`, `field_length`,
    /// `field_width`. Every value must be positive. Nothing is applied if any
    /// entry is rejected.
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<(), ConfigError> {
        let mut updated = *self;
        for (key, &value) in params {
            let (name, slot) = match key.as_str() {
                "default_tolerance" => ("default_tolerance", &mut updated.default_tolerance),
                "loop_period" => ("loop_period", &mut updated.loop_period),
                "field_length" => ("field_length", &mut updated.field.length),
                "field_width" => ("field_width", &mut updated.field.width),
                _ => return Err(ConfigError::UnknownParameter(key.clone())),
            };
            *slot = positive(name, value)?;
        }
        *self = updated;
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    // also rejects NaN
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::field::SideChannels;

    fn params(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|&(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn applies_known_parameters() {
        let mut config = AutoConfig::new(FieldGeometry::frc_2024(SideChannels::Swap));
        config
            .configure(&params(&[("loop_period", 0.01), ("field_width", 8.0)]))
            .unwrap();
        assert_eq!(config.loop_period, 0.01);
        assert_eq!(config.field.width, 8.0);
        assert_eq!(config.default_tolerance, DEFAULT_TOLERANCE_METERS);
    }

    #[test]
    fn rejects_bad_values_atomically() {
        let mut config = AutoConfig::new(FieldGeometry::frc_2024(SideChannels::Swap));
        let before = config;

        let err = config
            .configure(&params(&[("default_tolerance", -1.0)]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotPositive {
                name: "default_tolerance",
                value: -1.0
            }
        );
        assert!(config
            .configure(&params(&[("loop_period", 0.01), ("wheel_base", 1.0)]))
            .is_err());
        assert_eq!(config, before);
    }
}
