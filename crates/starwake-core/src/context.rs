//! Per-turn context handed to every planner, and an owning sandbox that
//! can build one.

use crate::galaxy::{Galaxy, StaticGalaxy};
use crate::negotiator::AiNegotiator;
use crate::rng::GameRng;
use crate::services::{
    DiplomacyScreen, NotificationLog, Notifications, OfferAnalyzer, RecordingScreen, TaskBoard, TaskLists,
};
use crate::settings::AiSettings;
use crate::universe::Universe;

/// Everything a planner may read or write during one turn phase.
pub struct GameContext<'a> {
    pub universe: &'a mut Universe,
    pub turn: u32,
    pub star_date: f32,
    pub settings: &'a AiSettings,
    pub galaxy: &'a dyn Galaxy,
    pub screen: &'a mut dyn DiplomacyScreen,
    pub notifications: &'a mut dyn Notifications,
    pub tasks: &'a mut dyn TaskBoard,
    pub negotiator: &'a mut dyn OfferAnalyzer,
    pub rng: &'a mut GameRng,
}

/// Owns a universe plus in-memory collaborators.
pub struct Sandbox {
    pub universe: Universe,
    pub galaxy: StaticGalaxy,
    pub settings: AiSettings,
    pub screen: RecordingScreen,
    pub notifications: NotificationLog,
    pub tasks: TaskLists,
    pub negotiator: Box<dyn OfferAnalyzer>,
    pub rng: GameRng,
    pub turn: u32,
    pub star_date: f32,
}

impl Sandbox {
    /// Relationships are initialized from `settings` right away.
    pub fn new(mut universe: Universe, galaxy: StaticGalaxy, settings: AiSettings, seed: u64) -> Self {
        universe.initialize_relationships(&settings);
        Self {
            universe,
            galaxy,
            settings,
            screen: RecordingScreen::default(),
            notifications: NotificationLog::default(),
            tasks: TaskLists::default(),
            negotiator: Box::new(AiNegotiator),
            rng: GameRng::seed_from_u64(seed),
            turn: 1,
            star_date: 1000.0,
        }
    }

    pub fn with_negotiator(mut self, negotiator: Box<dyn OfferAnalyzer>) -> Self {
        self.negotiator = negotiator;
        self
    }

    pub fn context(&mut self) -> GameContext<'_> {
        GameContext {
            universe: &mut self.universe,
            turn: self.turn,
            star_date: self.star_date,
            settings: &self.settings,
            galaxy: &self.galaxy,
            screen: &mut self.screen,
            notifications: &mut self.notifications,
            tasks: &mut self.tasks,
            negotiator: self.negotiator.as_mut(),
            rng: &mut self.rng,
        }
    }

    /// Moves the clock forward one turn.
    pub fn tick(&mut self) {
        self.turn += 1;
        self.star_date += 0.1;
    }
}
