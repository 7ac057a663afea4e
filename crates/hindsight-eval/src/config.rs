use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::bootstrap::TrustConfig;
use crate::error::{Error, Result};
use crate::holdout::HoldoutConfig;
use crate::observed::ObservedThresholds;
use crate::pairing::PairingConfig;
use crate::trajectory::TrajectoryThresholds;

/// Evaluation configuration persisted as TOML, one section per lane
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub pairing: PairingConfig,
    pub observed: ObservedThresholds,
    pub trajectory: TrajectoryThresholds,
    pub trust: TrustConfig,
    pub holdout: HoldoutConfig,
}

impl EvalConfig {
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: EvalConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.pairing.validate().map_err(Error::Config)?;
        self.trust.validate().map_err(Error::Config)?;
        Ok(())
    }
}
