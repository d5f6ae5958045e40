use std::fmt::Write as _;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::postprocess::Composer;

/// Values driven by the parameter panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettingsOption {
    pub exposure: f32,
    pub threshold: f32,
    pub strength: f32,
    pub radius: f32,
}

impl Default for SettingsOption {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            threshold: 0.0,
            strength: 3.0,
            radius: 0.0,
        }
    }
}

/// Settings field bound to a slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettingField {
    Exposure,
    Strength,
    Radius,
}

/// Range and granularity of one slider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderSpec {
    pub field: SettingField,
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl SliderSpec {
    /// Clamps to the range and snaps to the nearest step. NaN maps to the
    /// minimum.
    pub fn constrain(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min;
        }
        let divisions = (1.0 / f64::from(self.step)).round();
        let min = f64::from(self.min);
        let max = f64::from(self.max);
        let snapped = (f64::from(value).clamp(min, max) * divisions).round() / divisions;
        snapped.clamp(min, max) as f32
    }
}

pub const SLIDERS: [SliderSpec; 3] = [
    SliderSpec {
        field: SettingField::Exposure,
        label: "exposure",
        min: 0.0,
        max: 1.0,
        step: 0.01,
    },
    SliderSpec {
        field: SettingField::Strength,
        label: "strength",
        min: 0.0,
        max: 5.0,
        step: 0.01,
    },
    SliderSpec {
        field: SettingField::Radius,
        label: "radius",
        min: -5.0,
        max: 5.0,
        step: 0.01,
    },
];

pub fn slider(field: SettingField) -> &'static SliderSpec {
    match field {
        SettingField::Exposure => &SLIDERS[0],
        SettingField::Strength => &SLIDERS[1],
        SettingField::Radius => &SLIDERS[2],
    }
}

/// Tone-mapping exposure for a panel exposure value.
pub fn exposure_curve(value: f32) -> f32 {
    value.powi(4)
}

/// Three sliders bound to [`SettingsOption`]; every change is written
/// through to the composer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterPanel {
    settings: SettingsOption,
    selected: usize,
}

impl ParameterPanel {
    pub fn new(settings: SettingsOption) -> Self {
        Self {
            settings,
            selected: 0,
        }
    }

    pub fn settings(&self) -> &SettingsOption {
        &self.settings
    }

    pub fn value(&self, field: SettingField) -> f32 {
        match field {
            SettingField::Exposure => self.settings.exposure,
            SettingField::Strength => self.settings.strength,
            SettingField::Radius => self.settings.radius,
        }
    }

    /// Stores a slider value and applies it. Returns the value after the
    /// slider's clamp and snap. NaN leaves the current value in place.
    pub fn set(&mut self, field: SettingField, value: f32, composer: &mut Composer) -> f32 {
        if value.is_nan() {
            debug!("panel {field:?} ignored NaN");
            return self.value(field);
        }
        let value = slider(field).constrain(value);
        match field {
            SettingField::Exposure => self.settings.exposure = value,
            SettingField::Strength => self.settings.strength = value,
            SettingField::Radius => self.settings.radius = value,
        }
        apply(field, value, composer);
        debug!("panel {field:?} = {value:.2}");
        value
    }

    /// Moves `field` by a whole number of steps.
    pub fn nudge(&mut self, field: SettingField, steps: i32, composer: &mut Composer) -> f32 {
        let value = self.value(field) + slider(field).step * steps as f32;
        self.set(field, value, composer)
    }

    /// Writes every setting into the composer, including the threshold that
    /// has no slider.
    pub fn sync(&self, composer: &mut Composer) {
        for spec in &SLIDERS {
            apply(spec.field, self.value(spec.field), composer);
        }
        composer.bloom.threshold = self.settings.threshold;
    }

    pub fn selected(&self) -> SettingField {
        SLIDERS[self.selected].field
    }

    pub fn select_next(&mut self) -> SettingField {
        self.selected = (self.selected + 1) % SLIDERS.len();
        self.selected()
    }

    /// One-line rendering, the selected slider in brackets.
    pub fn describe(&self) -> String {
        let mut line = String::new();
        for (index, spec) in SLIDERS.iter().enumerate() {
            if index > 0 {
                line.push_str("  ");
            }
            let value = self.value(spec.field);
            if index == self.selected {
                let _ = write!(line, "[{} {value:.2}]", spec.label);
            } else {
                let _ = write!(line, "{} {value:.2}", spec.label);
            }
        }
        line
    }
}

fn apply(field: SettingField, value: f32, composer: &mut Composer) {
    match field {
        SettingField::Exposure => composer.tone_mapping.exposure = exposure_curve(value),
        SettingField::Strength => composer.bloom.strength = value,
        SettingField::Radius => composer.bloom.radius = value,
    }
}

#[cfg(test)]
mod tests {
    use glam::UVec2;

    use super::*;
    use crate::postprocess::BloomPass;

    fn composer() -> Composer {
        Composer::new(UVec2::new(8, 8), BloomPass::new(UVec2::new(8, 8), 1.0, 0.5, 0.3))
    }

    #[test]
    fn exposure_is_raised_to_the_fourth_power() {
        let mut panel = ParameterPanel::new(SettingsOption::default());
        let mut composer = composer();
        for (value, expected) in [(0.5, 0.0625), (1.0, 1.0), (0.0, 0.0)] {
            panel.set(SettingField::Exposure, value, &mut composer);
            assert!((composer.tone_mapping.exposure - expected).abs() < 1e-6);
            assert_eq!(panel.settings().exposure, value);
        }
    }

    #[test]
    fn strength_and_radius_are_written_directly() {
        let mut panel = ParameterPanel::new(SettingsOption::default());
        let mut composer = composer();
        panel.set(SettingField::Strength, 2.5, &mut composer);
        panel.set(SettingField::Radius, -1.25, &mut composer);
        assert_eq!(composer.bloom.strength, 2.5);
        assert_eq!(composer.bloom.radius, -1.25);
    }

    #[test]
    fn values_are_clamped_and_snapped() {
        let mut panel = ParameterPanel::new(SettingsOption::default());
        let mut composer = composer();
        assert_eq!(panel.set(SettingField::Strength, 9.0, &mut composer), 5.0);
        assert_eq!(panel.set(SettingField::Radius, -7.0, &mut composer), -5.0);
        let snapped = panel.set(SettingField::Exposure, 0.123, &mut composer);
        assert!((snapped - 0.12).abs() < 1e-6);
    }

    #[test]
    fn nan_never_reaches_settings_or_composer() {
        assert_eq!(slider(SettingField::Radius).constrain(f32::NAN), -5.0);
        assert_eq!(slider(SettingField::Strength).constrain(f32::INFINITY), 5.0);

        let mut panel = ParameterPanel::new(SettingsOption::default());
        let mut composer = composer();
        panel.sync(&mut composer);
        assert_eq!(panel.set(SettingField::Exposure, f32::NAN, &mut composer), 1.0);
        assert_eq!(panel.settings().exposure, 1.0);
        assert_eq!(composer.tone_mapping.exposure, 1.0);
        assert_eq!(panel.set(SettingField::Strength, f32::NAN, &mut composer), 3.0);
        assert_eq!(composer.bloom.strength, 3.0);
    }

    #[test]
    fn nudge_moves_by_steps() {
        let mut panel = ParameterPanel::new(SettingsOption::default());
        let mut composer = composer();
        let value = panel.nudge(SettingField::Strength, -10, &mut composer);
        assert!((value - 2.9).abs() < 1e-5);
        assert_eq!(panel.nudge(SettingField::Exposure, 3, &mut composer), 1.0);
    }

    #[test]
    fn sync_applies_every_setting() {
        let panel = ParameterPanel::new(SettingsOption::default());
        let mut composer = composer();
        panel.sync(&mut composer);
        assert_eq!(composer.tone_mapping.exposure, 1.0);
        assert_eq!(composer.bloom.strength, 3.0);
        assert_eq!(composer.bloom.radius, 0.0);
        assert_eq!(composer.bloom.threshold, 0.0);
    }

    #[test]
    fn selection_cycles_through_sliders() {
        let mut panel = ParameterPanel::new(SettingsOption::default());
        assert_eq!(panel.selected(), SettingField::Exposure);
        assert_eq!(panel.select_next(), SettingField::Strength);
        assert_eq!(panel.select_next(), SettingField::Radius);
        assert_eq!(panel.select_next(), SettingField::Exposure);
        assert_eq!(
            panel.describe(),
            "[exposure 1.00]  strength 3.00  radius 0.00"
        );
    }
}
