use serde::{Deserialize, Serialize};
use starwake_protocol::{EmpireId, WarState, WarType};

use crate::personality::MAX_WAR_GRADE;

/// Strength-equivalent score of a single captured planet.
pub const PLANET_SCORE: f32 = 100.0;

/// Running record of one war, seen from `us`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct War {
    pub us: EmpireId,
    pub them: EmpireId,
    pub war_type: WarType,
    pub start_date: f32,
    pub turns_at_war: u32,
    /// Allies already asked to join; each ally is called once.
    pub allies_called: Vec<EmpireId>,
    pub our_strength_lost: f32,
    pub their_strength_lost: f32,
    pub our_planets_lost: u32,
    pub their_planets_lost: u32,
    /// Systems both sides held when the war started.
    pub starting_contested_systems: u32,
    pub contested_systems_won: u32,
    pub contested_systems_lost: u32,
}

impl War {
    pub fn new(us: EmpireId, them: EmpireId, war_type: WarType, start_date: f32) -> Self {
        Self {
            us,
            them,
            war_type,
            start_date,
            turns_at_war: 0,
            allies_called: Vec::new(),
            our_strength_lost: 0.0,
            their_strength_lost: 0.0,
            our_planets_lost: 0,
            their_planets_lost: 0,
            starting_contested_systems: 0,
            contested_systems_won: 0,
            contested_systems_lost: 0,
        }
    }

    pub fn with_contested_systems(mut self, count: u32) -> Self {
        self.starting_contested_systems = count;
        self
    }

    pub fn record_losses(&mut self, ours: f32, theirs: f32) {
        self.our_strength_lost += ours.max(0.0);
        self.their_strength_lost += theirs.max(0.0);
    }

    pub fn record_planet_taken(&mut self) {
        self.their_planets_lost += 1;
        if self.contested_systems_won + self.contested_systems_lost < self.starting_contested_systems {
            self.contested_systems_won += 1;
        }
    }

    pub fn record_planet_lost(&mut self) {
        self.our_planets_lost += 1;
        if self.contested_systems_won + self.contested_systems_lost < self.starting_contested_systems {
            self.contested_systems_lost += 1;
        }
    }

    pub fn was_ally_called(&self, ally: EmpireId) -> bool {
        self.allies_called.contains(&ally)
    }

    /// Share of the total war result in our favor, 0.5 when nothing happened yet.
    fn score_share(&self) -> f32 {
        let gains = self.their_strength_lost + self.their_planets_lost as f32 * PLANET_SCORE;
        let losses = self.our_strength_lost + self.our_planets_lost as f32 * PLANET_SCORE;
        let total = gains + losses;
        if total <= 0.0 {
            return 0.5;
        }
        gains / total
    }

    pub fn score_state(&self) -> WarState {
        state_from_share(self.score_share())
    }

    /// Border wars are judged on the systems that were contested at the start.
    pub fn border_conflict_state(&self) -> WarState {
        if self.starting_contested_systems == 0 {
            return self.score_state();
        }
        let decided = self.contested_systems_won + self.contested_systems_lost;
        if decided == 0 {
            return WarState::EvenlyMatched;
        }
        state_from_share(self.contested_systems_won as f32 / decided as f32)
    }

    /// 1 (hopeless) to 10 (won); 5 is even.
    pub fn grade(&self) -> f32 {
        (self.score_share() * MAX_WAR_GRADE).clamp(1.0, MAX_WAR_GRADE)
    }
}

fn state_from_share(share: f32) -> WarState {
    if share >= 0.75 {
        WarState::Dominating
    } else if share >= 0.6 {
        WarState::WinningSlightly
    } else if share > 0.4 {
        WarState::EvenlyMatched
    } else if share > 0.25 {
        WarState::LosingSlightly
    } else {
        WarState::LosingBadly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn war() -> War {
        War::new(EmpireId(0), EmpireId(1), WarType::BorderConflict, 1000.0)
    }

    #[test]
    fn fresh_war_is_even() {
        let w = war();
        assert_eq!(w.score_state(), WarState::EvenlyMatched);
        assert_eq!(w.grade(), 5.0);
    }

    #[test]
    fn lopsided_losses_dominate() {
        let mut w = war();
        w.record_losses(100.0, 900.0);
        assert_eq!(w.score_state(), WarState::Dominating);
        assert!((w.grade() - 9.0).abs() < 1e-4);

        w.record_losses(3000.0, 0.0);
        assert_eq!(w.score_state(), WarState::LosingBadly);
        assert!(w.grade() >= 1.0);
    }

    #[test]
    fn border_state_uses_contested_systems() {
        let mut w = war().with_contested_systems(3);
        w.record_losses(500.0, 0.0);
        assert_eq!(w.border_conflict_state(), WarState::EvenlyMatched);
        w.record_planet_taken();
        w.record_planet_taken();
        w.record_planet_lost();
        assert_eq!(w.contested_systems_won, 2);
        assert_eq!(w.border_conflict_state(), WarState::WinningSlightly);
        // contested tally is full; further captures only move the score
        w.record_planet_taken();
        assert_eq!(w.contested_systems_won, 2);
        assert_eq!(w.their_planets_lost, 3);
    }
}
