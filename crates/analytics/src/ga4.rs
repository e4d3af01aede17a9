//! Alignment between an external analytics tool and internal counts.
//!
//! The ratio is `ga4_active_users / internal_real_users * 100`. Its distance
//! from 100 picks the band.

use serde::{Deserialize, Serialize};

use crate::round1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentBand {
    Excellent,
    Good,
    NeedsAttention,
}

/// Maximum distance from 100% for each band, in percentage points.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ga4Bands {
    #[serde(default = "default_excellent")]
    pub excellent_within: f64,
    #[serde(default = "default_good")]
    pub good_within: f64,
}

fn default_excellent() -> f64 {
    10.0
}

fn default_good() -> f64 {
    25.0
}

impl Default for Ga4Bands {
    fn default() -> Self {
        Self {
            excellent_within: default_excellent(),
            good_within: default_good(),
        }
    }
}

impl Ga4Bands {
    pub fn band(&self, ratio_percentage: f64) -> AlignmentBand {
        let distance = (ratio_percentage - 100.0).abs();
        if distance <= self.excellent_within {
            AlignmentBand::Excellent
        } else if distance <= self.good_within {
            AlignmentBand::Good
        } else {
            AlignmentBand::NeedsAttention
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ga4Alignment {
    pub ga4_active_users: u64,
    pub internal_real_users: u64,
    /// `None` when there are no internal real users to compare against.
    pub ratio_percentage: Option<f64>,
    pub band: AlignmentBand,
}

impl Ga4Alignment {
    pub fn compute(ga4_active_users: u64, internal_real_users: u64, bands: &Ga4Bands) -> Self {
        let ratio_percentage = (internal_real_users > 0)
            .then(|| round1(ga4_active_users as f64 / internal_real_users as f64 * 100.0));
        let band = match ratio_percentage {
            Some(ratio) => bands.band(ratio),
            None if ga4_active_users == 0 => AlignmentBand::Excellent,
            None => AlignmentBand::NeedsAttention,
        };

        Self {
            ga4_active_users,
            internal_real_users,
            ratio_percentage,
            band,
        }
    }
}
