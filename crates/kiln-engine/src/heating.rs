//! Heating schedules: ordered temperature holds with optional regrinds.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// One entry of a [`HeatingSchedule`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StageRecord", into = "StageRecord")]
pub enum HeatingStage {
    /// Run the automaton at `temperature` for `duration` full sweeps.
    Heat {
        /// Number of full-grid sweeps; one sweep is one tick per cell.
        duration: u64,
        /// Temperature in kelvin.
        temperature: f64,
    },
    /// Rebuild the grid from its current composition without reacting.
    Regrind,
}

impl HeatingStage {
    /// The stage's temperature, `None` for a regrind marker.
    pub fn temperature(&self) -> Option<f64> {
        match self {
            Self::Heat { temperature, .. } => Some(*temperature),
            Self::Regrind => None,
        }
    }

    /// Sweeps run by the stage; zero for a regrind marker.
    pub fn duration(&self) -> u64 {
        match self {
            Self::Heat { duration, .. } => *duration,
            Self::Regrind => 0,
        }
    }
}

/// Wire form: `{"duration": n, "temperature": t}` or `{"regrind": true}`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StageRecord {
    Heat { duration: u64, temperature: f64 },
    Regrind { regrind: bool },
}

impl TryFrom<StageRecord> for HeatingStage {
    type Error = String;

    fn try_from(record: StageRecord) -> Result<Self, Self::Error> {
        match record {
            StageRecord::Heat {
                duration,
                temperature,
            } => Ok(Self::Heat {
                duration,
                temperature,
            }),
            StageRecord::Regrind { regrind: true } => Ok(Self::Regrind),
            StageRecord::Regrind { regrind: false } => {
                Err("a regrind marker must have \"regrind\": true".to_string())
            }
        }
    }
}

impl From<HeatingStage> for StageRecord {
    fn from(stage: HeatingStage) -> Self {
        match stage {
            HeatingStage::Heat {
                duration,
                temperature,
            } => Self::Heat {
                duration,
                temperature,
            },
            HeatingStage::Regrind => Self::Regrind { regrind: true },
        }
    }
}

/// An ordered sequence of heating stages.
///
/// Serializes as a plain JSON list of stage records.
///
/// # Examples
///
/// ```
/// use kiln_engine::HeatingSchedule;
///
/// let schedule = HeatingSchedule::sweep(800.0, 1000.0, 5, 100.0)
///     .unwrap()
///     .then(HeatingSchedule::hold(1000.0, 10));
/// assert_eq!(schedule.all_temperatures(), vec![800.0, 900.0, 1000.0]);
/// assert_eq!(schedule.total_duration(), 25);
/// assert_eq!(schedule.temperature_at(12), Some(1000.0));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeatingSchedule {
    stages: Vec<HeatingStage>,
}

impl HeatingSchedule {
    /// A schedule of explicit stages.
    pub fn new(stages: Vec<HeatingStage>) -> Self {
        Self { stages }
    }

    /// A single hold at `temperature` for `duration` sweeps.
    pub fn hold(temperature: f64, duration: u64) -> Self {
        Self::new(vec![HeatingStage::Heat {
            duration,
            temperature,
        }])
    }

    /// Holds of `stage_length` sweeps from `t0` towards `tf` in steps of
    /// `step_size`, always ending with a hold at exactly `tf`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DegenerateSweep`] if `t0 == tf`, and
    /// [`ConfigError::InvalidStage`] if `step_size` is not positive.
    pub fn sweep(t0: f64, tf: f64, stage_length: u64, step_size: f64) -> Result<Self, ConfigError> {
        if t0 == tf {
            return Err(ConfigError::DegenerateSweep { temperature: t0 });
        }
        if !(step_size.is_finite() && step_size > 0.0) {
            return Err(ConfigError::InvalidStage {
                index: 0,
                reason: format!("sweep step must be positive, got {step_size}"),
            });
        }
        let step = if tf < t0 { -step_size } else { step_size };
        let mut stages = Vec::new();
        let mut k = 0u32;
        loop {
            let t = t0 + f64::from(k) * step;
            if (step > 0.0 && t >= tf) || (step < 0.0 && t <= tf) {
                break;
            }
            stages.push(HeatingStage::Heat {
                duration: stage_length,
                temperature: t,
            });
            k += 1;
        }
        stages.push(HeatingStage::Heat {
            duration: stage_length,
            temperature: tf,
        });
        Ok(Self::new(stages))
    }

    /// This schedule followed by `next`.
    pub fn then(mut self, next: HeatingSchedule) -> Self {
        self.stages.extend(next.stages);
        self
    }

    /// Append a regrind marker.
    pub fn regrind(mut self) -> Self {
        self.stages.push(HeatingStage::Regrind);
        self
    }

    /// The stages in order.
    pub fn stages(&self) -> &[HeatingStage] {
        &self.stages
    }

    /// Number of stages, regrind markers included.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the schedule has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Total sweeps across all stages.
    pub fn total_duration(&self) -> u64 {
        self.stages.iter().map(HeatingStage::duration).sum()
    }

    /// Temperature in effect at sweep `step`, or `None` past the end.
    pub fn temperature_at(&self, step: u64) -> Option<f64> {
        let mut elapsed = 0;
        for stage in &self.stages {
            if let HeatingStage::Heat {
                duration,
                temperature,
            } = stage
            {
                elapsed += duration;
                if elapsed > step {
                    return Some(*temperature);
                }
            }
        }
        None
    }

    /// Distinct temperatures in order of first appearance.
    pub fn all_temperatures(&self) -> Vec<f64> {
        let mut out: Vec<f64> = Vec::new();
        for t in self.stages.iter().filter_map(HeatingStage::temperature) {
            if !out.contains(&t) {
                out.push(t);
            }
        }
        out
    }

    /// Check the schedule is runnable.
    ///
    /// It must hold at least one heat stage, and every temperature must be
    /// finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.stages.iter().any(|s| s.temperature().is_some()) {
            return Err(ConfigError::EmptySchedule);
        }
        for (index, stage) in self.stages.iter().enumerate() {
            if let Some(t) = stage.temperature() {
                if !(t.is_finite() && t >= 0.0) {
                    return Err(ConfigError::InvalidStage {
                        index,
                        reason: format!("temperature must be finite and >= 0, got {t}"),
                    });
                }
            }
        }
        Ok(())
    }
}

impl From<Vec<HeatingStage>> for HeatingSchedule {
    fn from(stages: Vec<HeatingStage>) -> Self {
        Self::new(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_up_ends_on_target() {
        let s = HeatingSchedule::sweep(300.0, 550.0, 2, 100.0).unwrap();
        assert_eq!(s.all_temperatures(), vec![300.0, 400.0, 500.0, 550.0]);
        assert_eq!(s.total_duration(), 8);
    }

    #[test]
    fn sweep_down_counts_backwards() {
        let s = HeatingSchedule::sweep(1000.0, 800.0, 1, 100.0).unwrap();
        assert_eq!(s.all_temperatures(), vec![1000.0, 900.0, 800.0]);
    }

    #[test]
    fn sweep_rejects_equal_endpoints() {
        match HeatingSchedule::sweep(900.0, 900.0, 1, 100.0) {
            Err(ConfigError::DegenerateSweep { temperature }) => assert_eq!(temperature, 900.0),
            other => panic!("expected DegenerateSweep, got {other:?}"),
        }
        assert!(HeatingSchedule::sweep(300.0, 900.0, 1, 0.0).is_err());
    }

    #[test]
    fn temperature_at_walks_stage_boundaries() {
        let s = HeatingSchedule::hold(500.0, 3)
            .regrind()
            .then(HeatingSchedule::hold(700.0, 2));
        assert_eq!(s.temperature_at(0), Some(500.0));
        assert_eq!(s.temperature_at(2), Some(500.0));
        assert_eq!(s.temperature_at(3), Some(700.0));
        assert_eq!(s.temperature_at(4), Some(700.0));
        assert_eq!(s.temperature_at(5), None);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn all_temperatures_are_distinct() {
        let s = HeatingSchedule::hold(500.0, 1)
            .then(HeatingSchedule::hold(700.0, 1))
            .then(HeatingSchedule::hold(500.0, 1));
        assert_eq!(s.all_temperatures(), vec![500.0, 700.0]);
    }

    #[test]
    fn json_uses_stage_records() {
        let s = HeatingSchedule::hold(1200.0, 4).regrind();
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"[{"duration":4,"temperature":1200.0},{"regrind":true}]"#);
        let back: HeatingSchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn json_rejects_false_regrind() {
        assert!(serde_json::from_str::<HeatingSchedule>(r#"[{"regrind":false}]"#).is_err());
    }

    #[test]
    fn validate_needs_a_heat_stage() {
        match HeatingSchedule::default().validate() {
            Err(ConfigError::EmptySchedule) => {}
            other => panic!("expected EmptySchedule, got {other:?}"),
        }
        match HeatingSchedule::new(vec![HeatingStage::Regrind]).validate() {
            Err(ConfigError::EmptySchedule) => {}
            other => panic!("expected EmptySchedule, got {other:?}"),
        }
        match HeatingSchedule::hold(f64::NAN, 1).validate() {
            Err(ConfigError::InvalidStage { index: 0, .. }) => {}
            other => panic!("expected InvalidStage, got {other:?}"),
        }
    }
}
