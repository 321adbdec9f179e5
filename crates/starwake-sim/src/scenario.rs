//! Scenario files: a YAML description of a sector that becomes a [`Sandbox`].

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use starwake_core::{
    load_settings, EconomicStrategy, Empire, EmpireData, Sandbox, SettingsSource, StaticGalaxy, TechEntry, TechTree,
    Treasury, Universe,
};
use starwake_protocol::{EmpireId, PersonalityType, Proposal, TreatyType};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Settings file, relative to the scenario; the embedded tuning otherwise.
    #[serde(default)]
    pub settings: Option<PathBuf>,
    #[serde(default)]
    pub galaxy: StaticGalaxy,
    /// Tech tree every empire starts with.
    #[serde(default)]
    pub techs: Vec<TechEntry>,
    pub empires: Vec<EmpireSpec>,
    #[serde(default)]
    pub contacts: Contacts,
    #[serde(default)]
    pub treaties: Vec<TreatySpec>,
    #[serde(default)]
    pub player_policy: PlayerPolicy,
}

/// Empire ids follow list order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmpireSpec {
    pub name: String,
    pub personality: PersonalityType,
    #[serde(default)]
    pub player: bool,
    #[serde(default)]
    pub faction: bool,
    #[serde(default)]
    pub agents: u32,
    /// Sets military and offensive strength in the galaxy.
    #[serde(default)]
    pub strength: Option<f32>,
    #[serde(default)]
    pub data: EmpireData,
    #[serde(default)]
    pub treasury: Treasury,
    #[serde(default)]
    pub strategy: EconomicStrategy,
    /// Techs unlocked at start.
    #[serde(default)]
    pub unlocked: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Contacts {
    /// Every pair of empires has met.
    #[default]
    All,
    None,
    Pairs(Vec<(u8, u8)>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreatySpec {
    pub between: (u8, u8),
    pub treaty: TreatyType,
}

/// How the simulated player answers proposals shown on the diplomacy screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PlayerPolicy {
    AcceptAll,
    #[default]
    RejectAll,
    /// Accept peace, refuse everything else.
    PeaceOnly,
}

impl PlayerPolicy {
    pub fn accepts(self, proposal: &Proposal) -> bool {
        match self {
            PlayerPolicy::AcceptAll => true,
            PlayerPolicy::RejectAll => false,
            PlayerPolicy::PeaceOnly => proposal.their_offer.peace_treaty || proposal.our_offer.peace_treaty,
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading scenario {}", path.display()))?;
        let mut scenario: Scenario =
            serde_yaml::from_str(&text).with_context(|| format!("parsing scenario {}", path.display()))?;
        if let (Some(settings), Some(dir)) = (scenario.settings.as_mut(), path.parent()) {
            if settings.is_relative() {
                *settings = dir.join(&*settings);
            }
        }
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        if self.empires.is_empty() {
            bail!("scenario {} has no empires", self.name);
        }
        if self.empires.len() > usize::from(u8::MAX) {
            bail!("scenario {} has too many empires", self.name);
        }
        if self.empires.iter().filter(|e| e.player).count() > 1 {
            bail!("scenario {} has more than one player", self.name);
        }
        let count = self.empires.len() as u8;
        let pairs = match &self.contacts {
            Contacts::Pairs(pairs) => pairs.as_slice(),
            _ => &[],
        };
        for &(a, b) in pairs.iter().chain(self.treaties.iter().map(|t| &t.between)) {
            if a >= count || b >= count || a == b {
                bail!("scenario {} pairs unknown empires {a} and {b}", self.name);
            }
        }
        Ok(())
    }

    /// Builds the sandbox; `seed` overrides the scenario's own.
    pub fn into_sandbox(self, seed: Option<u64>) -> Result<Sandbox> {
        self.validate()?;
        let settings = match &self.settings {
            Some(path) => load_settings(SettingsSource::Path(path.display().to_string()))
                .with_context(|| format!("loading settings {}", path.display()))?,
            None => load_settings(SettingsSource::Embedded).context("loading embedded settings")?,
        };

        let mut galaxy = self.galaxy;
        let mut empires = Vec::with_capacity(self.empires.len());
        for (i, spec) in self.empires.into_iter().enumerate() {
            let id = EmpireId(i as u8);
            let mut empire = Empire::new(id, spec.name, spec.personality);
            empire.traits = settings.traits_for(spec.personality);
            empire.is_player = spec.player;
            empire.is_faction = spec.faction;
            empire.agents = spec.agents;
            empire.data = spec.data;
            empire.treasury = spec.treasury;
            empire.strategy = spec.strategy;
            empire.techs = TechTree::new(self.techs.iter().cloned());
            for uid in &spec.unlocked {
                if !empire.unlock_tech(uid) {
                    bail!("{} starts with unknown tech {uid}", empire.name);
                }
            }
            if let Some(strength) = spec.strength {
                galaxy.set_strength(id, strength);
            }
            empires.push(empire);
        }

        let count = empires.len() as u8;
        let seed = seed.or(self.seed).unwrap_or(0);
        let mut sandbox = Sandbox::new(Universe::new(empires), galaxy, settings, seed);

        let pairs: Vec<(u8, u8)> = match self.contacts {
            Contacts::All => (0..count).flat_map(|a| ((a + 1)..count).map(move |b| (a, b))).collect(),
            Contacts::None => Vec::new(),
            Contacts::Pairs(pairs) => pairs,
        };
        for (a, b) in pairs {
            sandbox.universe.set_relations_as_known(EmpireId(a), EmpireId(b))?;
        }
        for TreatySpec { between: (a, b), treaty } in self.treaties {
            sandbox.universe.set_relations_as_known(EmpireId(a), EmpireId(b))?;
            sandbox.universe.sign_treaty_with(EmpireId(a), EmpireId(b), treaty)?;
        }
        Ok(sandbox)
    }
}
