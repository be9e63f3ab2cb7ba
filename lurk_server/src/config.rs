// Data-driven server and game configuration.
//
// `GameConfig` holds everything the server announces to clients (protocol
// version, stat budget, description) and everything used to seed the world
// (room count and naming, the monster placed in every room). It is loaded
// from JSON at startup; every field has a default, so an empty object `{}`
// or no file at all yields the stock test world.
//
// `ServerConfig` adds the bind address. It is assembled from command-line
// flags in `main.rs`, not from JSON.
//
// See also: `world.rs` (`World::seed`) which consumes `GameConfig`,
// `session.rs` which sends the Version and Game frames built from it.

use std::path::Path;

use lurk_protocol::Status;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to load a `GameConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// The monster placed in every seeded room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterTemplate {
    /// Monster `i` is named `"{name_prefix} {i}"`.
    pub name_prefix: String,
    pub attack: u16,
    pub defense: u16,
    pub regen: u16,
    pub health: i16,
    pub gold: u16,
    pub description: String,
    /// Seeded monsters fight back, so they carry every status bit.
    pub combatant: bool,
}

impl Default for MonsterTemplate {
    fn default() -> Self {
        Self {
            name_prefix: "Test Monster".into(),
            attack: 20,
            defense: 20,
            regen: 0,
            health: 50,
            gold: 1,
            description: "Placeholder monster for testing".into(),
            combatant: true,
        }
    }
}

impl MonsterTemplate {
    pub fn status(&self) -> Status {
        Status {
            combatant: self.combatant,
            ..Status::ALL
        }
    }
}

/// Game parameters and world seeding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub version_major: u8,
    pub version_minor: u8,
    /// Upper bound on attack + defense + regen for a new character.
    pub initial_points: u16,
    pub stat_limit: u16,
    pub description: String,
    /// Rooms are connected in a ring: `i -> i + 1`, the last back to 0.
    pub room_count: u16,
    /// Room `i` is named `"{room_name_prefix} {i}"`.
    pub room_name_prefix: String,
    pub room_description: String,
    pub monster: MonsterTemplate,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            version_major: 2,
            version_minor: 3,
            initial_points: 100,
            stat_limit: 65335,
            description: "LURK Test Realm".into(),
            room_count: 10,
            room_name_prefix: "Test Room".into(),
            room_description: "Placeholder room for testing".into(),
            monster: MonsterTemplate::default(),
        }
    }
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject configs the server cannot run: a world needs room 0, and
    /// every generated name must fit the protocol's name field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.room_count == 0 {
            return Err(ConfigError::Invalid("room_count must be at least 1".into()));
        }
        let widest_suffix = format!(" {}", self.room_count - 1).len();
        for prefix in [&self.room_name_prefix, &self.monster.name_prefix] {
            if prefix.len() + widest_suffix > lurk_protocol::MAX_NAME_LEN {
                return Err(ConfigError::Invalid(format!(
                    "name prefix {prefix:?} is too long for {} rooms",
                    self.room_count
                )));
            }
        }
        for text in [
            &self.description,
            &self.room_description,
            &self.monster.description,
        ] {
            if text.len() > lurk_protocol::MAX_TEXT_LEN {
                return Err(ConfigError::Invalid(
                    "descriptions must fit in 65535 bytes".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Bind address plus game configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    /// 0 lets the OS pick a free port.
    pub port: u16,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5050,
            game: GameConfig::default(),
        }
    }
}
