//! Personality policy table.
//!
//! Two layers of data per archetype: the fixed [`PersonalityModifiers`]
//! coefficients and the tunable [`DiplomaticTraits`] that come from settings.

use serde::{Deserialize, Serialize};
use starwake_protocol::PersonalityType;

/// Upper bound of a war grade; 5 is an even war.
pub const MAX_WAR_GRADE: f32 = 10.0;

/// Tunable diplomatic traits of an archetype.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiplomaticTraits {
    /// Spare trust required before offering a trade treaty.
    pub trade: f32,
    /// Tolerance for border friction before it turns into anger.
    pub territorialism: f32,
    /// 0..=100, how reliable the empire is.
    pub trustworthiness: f32,
}

impl DiplomaticTraits {
    pub fn defaults_for(personality: PersonalityType) -> Self {
        let (trade, territorialism, trustworthiness) = match personality {
            PersonalityType::Aggressive => (40.0, 80.0, 40.0),
            PersonalityType::Ruthless => (50.0, 90.0, 20.0),
            PersonalityType::Xenophobic => (60.0, 100.0, 60.0),
            PersonalityType::Cunning => (20.0, 40.0, 50.0),
            PersonalityType::Honorable => (25.0, 50.0, 100.0),
            PersonalityType::Pacifist => (10.0, 20.0, 90.0),
        };
        Self {
            trade,
            territorialism,
            trustworthiness,
        }
    }
}

/// Fixed per-archetype coefficients.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonalityModifiers {
    pub colonization_claim_ratio_warning_threshold: f32,
    pub trust_cost_nap_pact: f32,
    pub trust_cost_trade_pact: f32,
    pub add_anger_allied_with_enemy: f32,
    pub add_anger_allied_with_enemies_3rd_party: f32,
    pub alliance_value_allied_with_enemy: f32,
    pub wanted_agent_mission_multiplier: f32,
    pub turns_above_95_federation_needed: u32,
    pub federation_pop_ratio_war: f32,
    pub planet_stole_trust_multiplier: f32,
    /// How bad the average war grade must get before asking for peace.
    pub war_grade_threshold_for_peace: f32,
    /// Fleet strength adjustment after winning or losing against another empire.
    pub fleet_str_multiplier: f32,
    /// Weight of defense tasks over other tasks.
    pub defense_task_weight: f32,
    pub tech_value_modifier: f32,
    pub assault_bomber_ratio: f32,
    /// Strength ratio required before joining an ally's war against a third party.
    pub ally_call_to_war_ratio: f32,
}

impl PersonalityModifiers {
    pub fn for_personality(personality: PersonalityType) -> Self {
        match personality {
            PersonalityType::Aggressive => Self {
                colonization_claim_ratio_warning_threshold: 0.7,
                trust_cost_nap_pact: 35.0,
                trust_cost_trade_pact: 20.0,
                add_anger_allied_with_enemy: 50.0,
                add_anger_allied_with_enemies_3rd_party: 75.0,
                alliance_value_allied_with_enemy: 0.4,
                wanted_agent_mission_multiplier: 0.115,
                turns_above_95_federation_needed: 350,
                federation_pop_ratio_war: 1.25,
                planet_stole_trust_multiplier: 0.5,
                war_grade_threshold_for_peace: 0.4 * MAX_WAR_GRADE,
                fleet_str_multiplier: 1.4,
                defense_task_weight: 4.0,
                tech_value_modifier: 1.05,
                assault_bomber_ratio: 0.75,
                ally_call_to_war_ratio: 1.15,
            },
            PersonalityType::Ruthless => Self {
                colonization_claim_ratio_warning_threshold: 0.6,
                trust_cost_nap_pact: 45.0,
                trust_cost_trade_pact: 15.0,
                add_anger_allied_with_enemy: 25.0,
                add_anger_allied_with_enemies_3rd_party: 75.0,
                alliance_value_allied_with_enemy: 0.5,
                wanted_agent_mission_multiplier: 0.115,
                turns_above_95_federation_needed: 420,
                federation_pop_ratio_war: 1.2,
                planet_stole_trust_multiplier: 0.6,
                war_grade_threshold_for_peace: 0.4 * MAX_WAR_GRADE,
                fleet_str_multiplier: 1.3,
                defense_task_weight: 6.0,
                tech_value_modifier: 1.1,
                assault_bomber_ratio: 1.0,
                ally_call_to_war_ratio: 1.2,
            },
            PersonalityType::Xenophobic => Self {
                colonization_claim_ratio_warning_threshold: 0.0,
                trust_cost_nap_pact: 15.0,
                trust_cost_trade_pact: 15.0,
                add_anger_allied_with_enemy: 100.0,
                add_anger_allied_with_enemies_3rd_party: 100.0,
                alliance_value_allied_with_enemy: 0.5,
                wanted_agent_mission_multiplier: 0.13,
                turns_above_95_federation_needed: 600,
                federation_pop_ratio_war: 1.45,
                planet_stole_trust_multiplier: 0.1,
                war_grade_threshold_for_peace: 0.3 * MAX_WAR_GRADE,
                fleet_str_multiplier: 1.05,
                defense_task_weight: 7.0,
                tech_value_modifier: 1.2,
                assault_bomber_ratio: 0.5,
                ally_call_to_war_ratio: 1.1,
            },
            PersonalityType::Cunning => Self {
                colonization_claim_ratio_warning_threshold: 1.0,
                trust_cost_nap_pact: 5.0,
                trust_cost_trade_pact: 5.0,
                add_anger_allied_with_enemy: 0.0,
                add_anger_allied_with_enemies_3rd_party: 50.0,
                alliance_value_allied_with_enemy: 0.6,
                wanted_agent_mission_multiplier: 0.13,
                turns_above_95_federation_needed: 320,
                federation_pop_ratio_war: 1.2,
                planet_stole_trust_multiplier: 0.7,
                war_grade_threshold_for_peace: 0.7 * MAX_WAR_GRADE,
                fleet_str_multiplier: 0.95,
                defense_task_weight: 8.0,
                tech_value_modifier: 1.1,
                assault_bomber_ratio: 0.8,
                ally_call_to_war_ratio: 1.25,
            },
            PersonalityType::Honorable => Self {
                colonization_claim_ratio_warning_threshold: 1.0,
                trust_cost_nap_pact: 10.0,
                trust_cost_trade_pact: 10.0,
                add_anger_allied_with_enemy: 75.0,
                add_anger_allied_with_enemies_3rd_party: 100.0,
                alliance_value_allied_with_enemy: 0.5,
                wanted_agent_mission_multiplier: 0.1,
                turns_above_95_federation_needed: 250,
                federation_pop_ratio_war: 1.25,
                planet_stole_trust_multiplier: 0.4,
                war_grade_threshold_for_peace: 0.5 * MAX_WAR_GRADE,
                fleet_str_multiplier: 1.0,
                defense_task_weight: 9.0,
                tech_value_modifier: 1.0,
                assault_bomber_ratio: 0.6,
                ally_call_to_war_ratio: 1.0,
            },
            PersonalityType::Pacifist => Self {
                colonization_claim_ratio_warning_threshold: 1.25,
                trust_cost_nap_pact: 3.0,
                trust_cost_trade_pact: 12.0,
                add_anger_allied_with_enemy: 0.0,
                add_anger_allied_with_enemies_3rd_party: 25.0,
                alliance_value_allied_with_enemy: 0.8,
                wanted_agent_mission_multiplier: 0.1,
                turns_above_95_federation_needed: 300,
                federation_pop_ratio_war: 1.1,
                planet_stole_trust_multiplier: 0.8,
                war_grade_threshold_for_peace: 0.85 * MAX_WAR_GRADE,
                fleet_str_multiplier: 0.9,
                defense_task_weight: 10.0,
                tech_value_modifier: 1.0,
                assault_bomber_ratio: 0.5,
                ally_call_to_war_ratio: 1.35,
            },
        }
    }
}
