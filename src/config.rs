//! Scenario files: the immutable configuration handed to the core.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("scenario validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntRange {
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    #[serde(default = "default_dt_seconds")]
    pub dt_seconds: f32,
    #[serde(default)]
    pub ticks: Option<u64>,
    pub params: GenerationParams,
}

fn default_dt_seconds() -> f32 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    pub grid: GridParams,
    pub resources: ResourceParams,
    pub forests: ForestParams,
    pub infrastructure: InfrastructureParams,
    pub fire: FireParams,
    pub workers: WorkerParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridParams {
    pub width: i32,
    pub height: i32,
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
}

fn default_tile_size() -> f32 {
    10.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceParams {
    pub starting_wood: i64,
    pub wood_per_tree: i64,
    pub expedition_wood_cost_per_tile: i64,
    pub starting_workers: u32,
    pub worker_cap_per_fire: u32,
    pub hearth_feed_amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    pub paths: IntRange,
    pub patches_per_path: IntRange,
    pub wood_per_patch: IntRange,
    pub patch_radius: IntRange,
    pub patch_density: FloatRange,
    /// Flat budget penalty applied at the start of every forest path.
    pub difficulty_distance_modifier: i64,
    /// The walk's direction set is refreshed every this many patches.
    pub patches_with_consistent_direction: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureParams {
    pub hearth_min_edge_distance: i32,
    pub house_spawn_interval: FloatRange,
    pub min_house_spacing: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireParams {
    pub burn_rate: f32,
    pub burn_rate_increase: f32,
    pub burn_rate_to_win: f32,
    pub spawn_rate: f32,
    pub spawn_rate_increase: f32,
    pub radius: i32,
    pub radius_increase: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerParams {
    #[serde(default = "default_worker_speed")]
    pub max_speed: f32,
    #[serde(default = "default_seconds_to_death")]
    pub seconds_to_death: f32,
    #[serde(default = "default_despawn_delay")]
    pub despawn_delay: f32,
    /// Half-width, in tiles, of the square idle workers roam within.
    #[serde(default = "default_roam_radius_tiles")]
    pub roam_radius_tiles: i32,
}

fn default_worker_speed() -> f32 {
    5.0
}

fn default_seconds_to_death() -> f32 {
    10.0
}

fn default_despawn_delay() -> f32 {
    5.0
}

fn default_roam_radius_tiles() -> i32 {
    8
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario, ConfigError> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)?;
        let scenario: Scenario = serde_yaml::from_str(&data)?;
        scenario.validate()?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(600)
    }

    /// Hard errors abort the load; recoverable oddities only warn, the
    /// affected generation step degrades instead of crashing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.params;
        if p.grid.width <= 0 || p.grid.height <= 0 {
            return Err(ConfigError::Validation(format!(
                "grid size must be positive, got {}x{}",
                p.grid.width, p.grid.height
            )));
        }
        if p.grid.tile_size <= 0.0 {
            return Err(ConfigError::Validation(
                "tile_size must be positive".into(),
            ));
        }
        if self.dt_seconds <= 0.0 {
            return Err(ConfigError::Validation(
                "dt_seconds must be positive".into(),
            ));
        }
        if p.resources.wood_per_tree <= 0 {
            return Err(ConfigError::Validation(
                "wood_per_tree must be positive".into(),
            ));
        }

        if p.grid.width % 2 != 0 || p.grid.height % 2 != 0 {
            warn!(
                width = p.grid.width,
                height = p.grid.height,
                "grid size has odd components; generation expects even sizes"
            );
        }
        if p.resources.starting_wood
            < p.resources.expedition_wood_cost_per_tile + p.forests.difficulty_distance_modifier
        {
            warn!(
                starting_wood = p.resources.starting_wood,
                "starting wood budget cannot fund a single forest path; generation will skip paths"
            );
        }
        if p.forests.patch_density.min < 0.0 || p.forests.patch_density.max > 1.0 {
            warn!(
                min = p.forests.patch_density.min,
                max = p.forests.patch_density.max,
                "patch density outside [0, 1]; draws will be clamped"
            );
        }
        Ok(())
    }

    /// Built-in scenario used by the runner and the integration tests.
    pub fn frozen_valley() -> Self {
        Self {
            name: "frozen_valley".to_string(),
            seed: 7,
            dt_seconds: 0.1,
            ticks: Some(600),
            params: GenerationParams {
                grid: GridParams {
                    width: 64,
                    height: 64,
                    tile_size: 10.0,
                },
                resources: ResourceParams {
                    starting_wood: 100,
                    wood_per_tree: 5,
                    expedition_wood_cost_per_tile: 1,
                    starting_workers: 3,
                    worker_cap_per_fire: 12,
                    hearth_feed_amount: 10,
                },
                forests: ForestParams {
                    paths: IntRange { min: 3, max: 6 },
                    patches_per_path: IntRange { min: 2, max: 4 },
                    wood_per_patch: IntRange { min: 50, max: 100 },
                    patch_radius: IntRange { min: 2, max: 4 },
                    patch_density: FloatRange { min: 0.4, max: 0.8 },
                    difficulty_distance_modifier: 10,
                    patches_with_consistent_direction: 3,
                },
                infrastructure: InfrastructureParams {
                    hearth_min_edge_distance: 12,
                    house_spawn_interval: FloatRange {
                        min: 20.0,
                        max: 40.0,
                    },
                    min_house_spacing: 3,
                },
                fire: FireParams {
                    burn_rate: 0.2,
                    burn_rate_increase: 0.1,
                    burn_rate_to_win: 1.0,
                    spawn_rate: 0.05,
                    spawn_rate_increase: 0.02,
                    radius: 6,
                    radius_increase: 5,
                },
                workers: WorkerParams {
                    max_speed: 5.0,
                    seconds_to_death: 10.0,
                    despawn_delay: 5.0,
                    roam_radius_tiles: 8,
                },
            },
        }
    }
}
