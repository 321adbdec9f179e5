use serde::{Deserialize, Serialize};

/// A point in universe space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Diplomatic personality archetype of an AI empire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PersonalityType {
    Aggressive,
    Ruthless,
    Xenophobic,
    Cunning,
    #[default]
    Honorable,
    Pacifist,
}

impl PersonalityType {
    pub const ALL: [PersonalityType; 6] = [
        PersonalityType::Aggressive,
        PersonalityType::Ruthless,
        PersonalityType::Xenophobic,
        PersonalityType::Cunning,
        PersonalityType::Honorable,
        PersonalityType::Pacifist,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PersonalityType::Aggressive => "Aggressive",
            PersonalityType::Ruthless => "Ruthless",
            PersonalityType::Xenophobic => "Xenophobic",
            PersonalityType::Cunning => "Cunning",
            PersonalityType::Honorable => "Honorable",
            PersonalityType::Pacifist => "Pacifist",
        }
    }
}

/// Research category of a technology.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TechnologyType {
    General,
    Colonization,
    Economic,
    Industry,
    Research,
    GroundCombat,
    ShipHull,
    ShipDefense,
    ShipWeapons,
    ShipGeneral,
}

impl TechnologyType {
    pub fn is_ship_tech(self) -> bool {
        matches!(
            self,
            TechnologyType::ShipHull
                | TechnologyType::ShipDefense
                | TechnologyType::ShipWeapons
                | TechnologyType::ShipGeneral
        )
    }

    /// Parses the names used by research scripts. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "General" => TechnologyType::General,
            "Colonization" => TechnologyType::Colonization,
            "Economic" => TechnologyType::Economic,
            "Industry" => TechnologyType::Industry,
            "Research" => TechnologyType::Research,
            "GroundCombat" => TechnologyType::GroundCombat,
            "ShipHull" => TechnologyType::ShipHull,
            "ShipDefense" => TechnologyType::ShipDefense,
            "ShipWeapons" => TechnologyType::ShipWeapons,
            "ShipGeneral" => TechnologyType::ShipGeneral,
            _ => return None,
        })
    }
}

/// Hull and design roles of ship designs, ordered from smallest to largest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShipRole {
    Disabled,
    Platform,
    Station,
    Construction,
    Colony,
    Supply,
    Freighter,
    Troop,
    Prototype,
    TroopShip,
    Support,
    Bomber,
    Carrier,
    Fighter,
    Scout,
    Gunboat,
    Drone,
    Corvette,
    Frigate,
    Destroyer,
    Cruiser,
    Capital,
}

impl ShipRole {
    /// Roles that never count as combat targets for research.
    pub fn is_combat_role(self) -> bool {
        !matches!(
            self,
            ShipRole::Disabled
                | ShipRole::Supply
                | ShipRole::Troop
                | ShipRole::Prototype
                | ShipRole::Construction
                | ShipRole::Freighter
                | ShipRole::Colony
        )
    }

    pub fn is_orbital(self) -> bool {
        matches!(self, ShipRole::Platform | ShipRole::Station)
    }
}
