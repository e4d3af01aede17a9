//! Conversion funnels.

use event_store::SessionRollup;
use serde::Serialize;
use tracking_core::SessionStatus;

use crate::{percentage, round1};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStage {
    pub name: String,
    pub count: u64,
    /// Sessions lost before the next stage. 0 on the last stage.
    pub drop_off: u64,
    /// `drop_off / count * 100`, or 0 when `count` is 0.
    pub drop_off_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Funnel {
    pub stages: Vec<FunnelStage>,
    /// `count[last] / count[0] * 100`, one decimal.
    pub overall_conversion: f64,
}

impl Funnel {
    /// Build a funnel from ordered `(name, count)` stages.
    pub fn from_counts<S: AsRef<str>>(counts: &[(S, u64)]) -> Self {
        let stages = counts
            .iter()
            .enumerate()
            .map(|(i, (name, count))| {
                let drop_off = counts
                    .get(i + 1)
                    .map_or(0, |(_, next)| count.saturating_sub(*next));
                FunnelStage {
                    name: name.as_ref().to_string(),
                    count: *count,
                    drop_off,
                    drop_off_percentage: round1(percentage(drop_off, *count)),
                }
            })
            .collect();

        let overall_conversion = match (counts.first(), counts.last()) {
            (Some((_, first)), Some((_, last))) => round1(percentage(*last, *first)),
            _ => 0.0,
        };

        Self {
            stages,
            overall_conversion,
        }
    }

    /// The default configurator funnel over `rollups`.
    ///
    /// Stages are cumulative: a session only counts for a stage when it also
    /// passed every earlier one.
    pub fn configurator<'a>(rollups: impl IntoIterator<Item = &'a SessionRollup>) -> Self {
        let predicates: [(&str, fn(&SessionRollup) -> bool); 6] = [
            ("landing", |_| true),
            ("engaged", SessionRollup::is_engaged),
            ("configurator_started", |r| r.selection_count > 0 || r.snapshot_count > 0),
            ("configuration_half_done", |r| r.max_completion >= 50),
            ("configuration_complete", |r| r.max_completion >= 100),
            ("converted", |r| r.session.status == SessionStatus::Completed),
        ];

        let mut counts: Vec<(&str, u64)> = predicates.iter().map(|(name, _)| (*name, 0)).collect();
        for rollup in rollups {
            for (i, (_, passes)) in predicates.iter().enumerate() {
                if !passes(rollup) {
                    break;
                }
                counts[i].1 += 1;
            }
        }

        Self::from_counts(&counts)
    }
}
