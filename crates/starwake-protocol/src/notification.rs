use serde::{Deserialize, Serialize};

use crate::{EmpireId, TreatyType};

/// Player-facing event log entries emitted by the planners.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
    WarDeclared { aggressor: EmpireId, defender: EmpireId },
    TreatyBroken { by: EmpireId, with: EmpireId, treaty: TreatyType },
    PeaceSigned { a: EmpireId, b: EmpireId },
}
