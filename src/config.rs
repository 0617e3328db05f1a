use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "ProgressConfig::default_deadband")]
    pub deadband: f32,
    /// Subtracted from raw progress before clamping; trades latency for headroom against host jitter.
    #[serde(default)]
    pub delay: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "CameraConfig::default_teleport_distance_squared")]
    pub teleport_distance_squared: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewModelConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "ViewModelConfig::default_node_capacity")]
    pub node_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "ObjectConfig::default_capacity")]
    pub capacity: usize,
    #[serde(default = "ObjectConfig::default_node_capacity")]
    pub node_capacity: usize,
    #[serde(default = "ObjectConfig::default_biped_distance_squared")]
    pub biped_distance_squared: f32,
    #[serde(default = "ObjectConfig::default_other_distance_squared")]
    pub other_distance_squared: f32,
    #[serde(default = "ObjectConfig::default_jitter_distance_squared")]
    pub jitter_distance_squared: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticleConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "ParticleConfig::default_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "LightConfig::default_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "ChainConfig::default_capacity")]
    pub capacity: usize,
    #[serde(default = "ChainConfig::default_vertex_capacity")]
    pub vertex_capacity: usize,
    #[serde(default = "ChainConfig::default_teleport_distance_squared")]
    pub teleport_distance_squared: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterpolationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub view_model: ViewModelConfig,
    #[serde(default)]
    pub objects: ObjectConfig,
    #[serde(default)]
    pub particles: ParticleConfig,
    #[serde(default)]
    pub lights: LightConfig,
    #[serde(default)]
    pub flags: ChainConfig,
    #[serde(default)]
    pub antennas: ChainConfig,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub deadband: Option<f32>,
    pub delay: Option<f32>,
    pub enabled: Option<bool>,
}

const fn default_enabled() -> bool {
    true
}

impl ProgressConfig {
    const fn default_deadband() -> f32 {
        0.0001
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { deadband: Self::default_deadband(), delay: 0.0 }
    }
}

impl CameraConfig {
    const fn default_teleport_distance_squared() -> f32 {
        25.0
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { enabled: true, teleport_distance_squared: Self::default_teleport_distance_squared() }
    }
}

impl ViewModelConfig {
    const fn default_node_capacity() -> usize {
        128
    }
}

impl Default for ViewModelConfig {
    fn default() -> Self {
        Self { enabled: true, node_capacity: Self::default_node_capacity() }
    }
}

impl ObjectConfig {
    const fn default_capacity() -> usize {
        2048
    }

    const fn default_node_capacity() -> usize {
        64
    }

    const fn default_biped_distance_squared() -> f32 {
        6.25
    }

    const fn default_other_distance_squared() -> f32 {
        56.25
    }

    const fn default_jitter_distance_squared() -> f32 {
        0.0005
    }
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: Self::default_capacity(),
            node_capacity: Self::default_node_capacity(),
            biped_distance_squared: Self::default_biped_distance_squared(),
            other_distance_squared: Self::default_other_distance_squared(),
            jitter_distance_squared: Self::default_jitter_distance_squared(),
        }
    }
}

impl ParticleConfig {
    const fn default_capacity() -> usize {
        1024
    }
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self { enabled: true, capacity: Self::default_capacity() }
    }
}

impl LightConfig {
    const fn default_capacity() -> usize {
        0x380
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        Self { enabled: true, capacity: Self::default_capacity() }
    }
}

impl ChainConfig {
    const fn default_capacity() -> usize {
        64
    }

    const fn default_vertex_capacity() -> usize {
        32
    }

    const fn default_teleport_distance_squared() -> f32 {
        56.25
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: Self::default_capacity(),
            vertex_capacity: Self::default_vertex_capacity(),
            teleport_distance_squared: Self::default_teleport_distance_squared(),
        }
    }
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            progress: ProgressConfig::default(),
            camera: CameraConfig::default(),
            view_model: ViewModelConfig::default(),
            objects: ObjectConfig::default(),
            particles: ParticleConfig::default(),
            lights: LightConfig::default(),
            flags: ChainConfig::default(),
            antennas: ChainConfig::default(),
        }
    }
}

impl InterpolationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(deadband) = overrides.deadband {
            self.progress.deadband = deadband;
        }
        if let Some(delay) = overrides.delay {
            self.progress.delay = delay;
        }
        if let Some(enabled) = overrides.enabled {
            self.enabled = enabled;
        }
    }
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.deadband.is_none() && self.delay.is_none() && self.enabled.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.deadband.is_some() {
            fields.push("deadband");
        }
        if self.delay.is_some() {
            fields.push("delay");
        }
        if self.enabled.is_some() {
            fields.push("enabled");
        }
        fields
    }
}
