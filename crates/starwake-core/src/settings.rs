use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use starwake_protocol::PersonalityType;
use thiserror::Error;

use crate::personality::DiplomaticTraits;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub enum SettingsSource<'a> {
    Embedded,
    Path(String),
    Bytes(&'a [u8]),
}

/// Game difficulty; ratios above `Normal` sour AI relations toward the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Brutal,
}

impl Difficulty {
    pub fn ratio(self) -> f32 {
        let level = match self {
            Difficulty::Easy => 0.0,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 2.0,
            Difficulty::Brutal => 3.0,
        };
        level / 10.0
    }
}

/// Budget weights as fractions of the treasury strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetWeights {
    pub defense: f32,
    pub ssp: f32,
    pub build: f32,
    pub spy: f32,
    pub colony: f32,
    pub terraform: f32,
}

impl Default for BudgetWeights {
    fn default() -> Self {
        Self {
            defense: 0.10,
            ssp: 0.05,
            build: 0.25,
            spy: 0.05,
            colony: 0.10,
            terraform: 0.03,
        }
    }
}

/// Per-turn decay of each anger category toward zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AngerDecay {
    pub territorial: f32,
    pub diplomatic: f32,
    pub ships_in_borders: f32,
    pub military: f32,
}

impl Default for AngerDecay {
    fn default() -> Self {
        Self {
            territorial: 0.1,
            diplomatic: 0.1,
            ships_in_borders: 0.5,
            military: 0.2,
        }
    }
}

/// Tuning for the whole empire AI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Turns known before the first diplomatic demand or pact offer.
    #[serde(default = "default_first_demand")]
    pub first_demand: u32,
    /// Turns known before trade offers and war target selection.
    #[serde(default = "default_second_demand")]
    pub second_demand: u32,
    /// Weight of the previous value in budget smoothing.
    #[serde(default = "default_ema_smoothing")]
    pub ema_smoothing: f32,
    pub budget: BudgetWeights,
    pub anger_decay: AngerDecay,
    /// Trust gained per peaceful turn, plus the same again per NAPact or trade treaty.
    #[serde(default = "default_trust_gain")]
    pub trust_gain_per_turn: f32,
    pub difficulty: Difficulty,
    pub traits: BTreeMap<PersonalityType, DiplomaticTraits>,
}

fn default_first_demand() -> u32 {
    20
}

fn default_second_demand() -> u32 {
    75
}

fn default_ema_smoothing() -> f32 {
    0.9
}

fn default_trust_gain() -> f32 {
    0.1
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            first_demand: default_first_demand(),
            second_demand: default_second_demand(),
            ema_smoothing: default_ema_smoothing(),
            budget: BudgetWeights::default(),
            anger_decay: AngerDecay::default(),
            trust_gain_per_turn: default_trust_gain(),
            difficulty: Difficulty::default(),
            traits: PersonalityType::ALL
                .into_iter()
                .map(|p| (p, DiplomaticTraits::defaults_for(p)))
                .collect(),
        }
    }
}

impl AiSettings {
    /// Traits for an archetype, falling back to built-in defaults.
    pub fn traits_for(&self, personality: PersonalityType) -> DiplomaticTraits {
        self.traits
            .get(&personality)
            .copied()
            .unwrap_or_else(|| DiplomaticTraits::defaults_for(personality))
    }

    fn validate(self) -> Result<Self, SettingsError> {
        if !(0.0..1.0).contains(&self.ema_smoothing) {
            return Err(SettingsError::Invalid {
                field: "ema_smoothing",
                reason: format!("{} is outside [0, 1)", self.ema_smoothing),
            });
        }
        if self.second_demand < self.first_demand {
            return Err(SettingsError::Invalid {
                field: "second_demand",
                reason: "must not be earlier than first_demand".to_string(),
            });
        }
        Ok(self)
    }
}

pub fn load_settings(source: SettingsSource<'_>) -> Result<AiSettings, SettingsError> {
    let settings: AiSettings = match source {
        SettingsSource::Embedded => {
            serde_yaml::from_str(include_str!("../data/ai_settings.yaml"))?
        }
        SettingsSource::Path(path) => serde_yaml::from_str(&std::fs::read_to_string(path)?)?,
        SettingsSource::Bytes(bytes) => serde_yaml::from_str(std::str::from_utf8(bytes)?)?,
    };
    settings.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_settings_load() {
        let settings = load_settings(SettingsSource::Embedded).unwrap();
        assert_eq!(settings.first_demand, 20);
        assert_eq!(settings.second_demand, 75);
        assert_eq!(settings.traits.len(), PersonalityType::ALL.len());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = b"first_demand: 10\nbudget:\n  defense: 0.2\n";
        let settings = load_settings(SettingsSource::Bytes(yaml)).unwrap();
        assert_eq!(settings.first_demand, 10);
        assert_eq!(settings.second_demand, 75);
        assert_eq!(settings.budget.defense, 0.2);
        assert_eq!(settings.budget.build, BudgetWeights::default().build);
        assert_eq!(
            settings.traits_for(PersonalityType::Pacifist),
            DiplomaticTraits::defaults_for(PersonalityType::Pacifist)
        );
    }

    #[test]
    fn rejects_bad_smoothing() {
        let err = load_settings(SettingsSource::Bytes(b"ema_smoothing: 1.5\n")).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "ema_smoothing", .. }));
    }

    #[test]
    fn difficulty_ratio() {
        assert_eq!(Difficulty::Normal.ratio(), 0.1);
        assert!(Difficulty::Brutal > Difficulty::Normal);
    }
}
