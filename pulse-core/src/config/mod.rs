use serde::{Deserialize, Serialize};

use crate::config::phi_accrual::PhiAccrualConfig;
use crate::config::survival::SurvivalConfig;

pub mod phi_accrual;
pub mod survival;

/// Settings for one cold-start aware failure detector: the phi accrual
/// detector that watches heartbeat gaps and the survival window that gates
/// when a freshly seen peer may be trusted as stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColdStartConfig {
    pub phi: PhiAccrualConfig,
    pub survival: SurvivalConfig,
}
