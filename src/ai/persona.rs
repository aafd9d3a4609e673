//! Bot persona: thresholds and temperament for the automated player
//!
//! Loaded from TOML files in `data/personas/`, with built-in presets when
//! no file is present.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{Result, SimError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotPersona {
    pub name: String,
    /// Below this HP fraction with hostiles adjacent, heal no matter what
    pub panic_hp_fraction: f32,
    /// Adjacent hostiles needed before panic kicks in
    pub panic_min_adjacent: usize,
    /// Below this HP fraction, heal when it is safe (or always, see below)
    pub heal_hp_fraction: f32,
    /// Allow routine healing while hostiles are in view
    pub combat_healing: bool,
    /// Oscillation stops tolerated per floor before giving up on it
    pub max_oscillation_restarts: u32,
    /// Searches for hidden stairs once the frontier is exhausted
    pub search_budget: u32,
    /// Walk over to items spotted while exploring
    pub seek_items: bool,
}

impl Default for BotPersona {
    fn default() -> Self {
        Self {
            name: "balanced".into(),
            panic_hp_fraction: 0.2,
            panic_min_adjacent: 1,
            heal_hp_fraction: 0.5,
            combat_healing: false,
            max_oscillation_restarts: 3,
            search_budget: 5,
            seek_items: true,
        }
    }
}

impl BotPersona {
    /// Built-in presets by name
    pub fn preset(name: &str) -> Option<Self> {
        let persona = match name {
            "balanced" => Self::default(),
            "cautious" => Self {
                name: "cautious".into(),
                panic_hp_fraction: 0.35,
                heal_hp_fraction: 0.7,
                combat_healing: true,
                max_oscillation_restarts: 5,
                search_budget: 10,
                ..Self::default()
            },
            "berserker" => Self {
                name: "berserker".into(),
                panic_hp_fraction: 0.1,
                panic_min_adjacent: 2,
                heal_hp_fraction: 0.25,
                combat_healing: false,
                max_oscillation_restarts: 2,
                search_budget: 3,
                seek_items: false,
            },
            _ => return None,
        };
        Some(persona)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("panic_hp_fraction", self.panic_hp_fraction),
            ("heal_hp_fraction", self.heal_hp_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimError::Config(format!(
                    "persona '{}': {} must be within 0.0..=1.0 (got {})",
                    self.name, field, value
                )));
            }
        }
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let persona: BotPersona = toml::from_str(contents)?;
        persona.validate()?;
        Ok(persona)
    }
}

/// Load a persona by name
///
/// Reads `data/personas/{name}.toml` when it exists, otherwise falls back to
/// the built-in preset of that name.
pub fn load_persona(name: &str) -> Result<BotPersona> {
    let path = persona_path(name);
    if path.exists() {
        let mut persona = load_persona_file(&path)?;
        // The file stem is the scenario key, whatever the file says
        persona.name = name.to_string();
        return Ok(persona);
    }
    BotPersona::preset(name).ok_or_else(|| SimError::Config(format!("unknown persona '{}'", name)))
}

/// Load a persona from an explicit TOML file
pub fn load_persona_file(path: &Path) -> Result<BotPersona> {
    let contents = fs::read_to_string(path)?;
    BotPersona::from_toml_str(&contents)
}

/// Get path to persona file
fn persona_path(name: &str) -> PathBuf {
    PathBuf::from("data/personas").join(format!("{}.toml", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_shipped_personas() {
        for name in ["cautious", "balanced", "berserker"] {
            let persona = load_persona(name).expect("shipped persona should load");
            assert_eq!(persona.name, name);
            assert!(persona.panic_hp_fraction <= persona.heal_hp_fraction);
        }
    }

    #[test]
    fn test_unknown_persona_is_an_error() {
        assert!(load_persona("does_not_exist").is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let persona = BotPersona::from_toml_str("name = \"tweaked\"\ncombat_healing = true\n").unwrap();
        assert!(persona.combat_healing);
        assert_eq!(persona.panic_min_adjacent, 1);
    }

    #[test]
    fn test_rejects_fraction_out_of_range() {
        assert!(BotPersona::from_toml_str("heal_hp_fraction = 1.5").is_err());
    }
}
