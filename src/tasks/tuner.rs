/// Pool auto-tuner
///
/// A threshold-based controller over pool status snapshots: a saturated
/// pool with a real backlog grows by a fixed step (capped), an idle pool
/// well above its core size shrinks by a fixed step (floored at
/// core + buffer). Deliberately hysteresis-free and stateless between
/// runs; the scheduling interval is the only damping knob.
use super::pool::PoolStatus;
use crate::config::TunerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TuneAction {
    Increased,
    Decreased,
    NoChange,
}

/// One pool's tuning decision
#[derive(Debug, Clone, serde::Serialize)]
pub struct PoolAdjustment {
    pub pool: &'static str,
    pub action: TuneAction,
    pub old_max: usize,
    pub new_max: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct PoolAutoTuner {
    settings: TunerSettings,
}

impl PoolAutoTuner {
    pub fn new(settings: TunerSettings) -> Self {
        Self { settings }
    }

    /// Decide what to do with one pool based on its current status
    pub fn plan(&self, status: &PoolStatus) -> PoolAdjustment {
        let old_max = status.max_size;

        if status.utilization > self.settings.high_utilization
            && status.queued_tasks > self.settings.queue_depth_trigger
        {
            let new_max = (old_max + self.settings.grow_step).min(self.settings.max_ceiling);
            if new_max > old_max {
                return PoolAdjustment {
                    pool: status.name,
                    action: TuneAction::Increased,
                    old_max,
                    new_max,
                    reason: format!(
                        "utilization {:.0}% with {} queued",
                        status.utilization * 100.0,
                        status.queued_tasks
                    ),
                };
            }
            return PoolAdjustment {
                pool: status.name,
                action: TuneAction::NoChange,
                old_max,
                new_max: old_max,
                reason: format!("saturated but already at ceiling {}", self.settings.max_ceiling),
            };
        }

        let shrink_floor = status.core_size + self.settings.shrink_buffer;
        if status.utilization < self.settings.low_utilization && old_max > shrink_floor {
            let new_max = old_max
                .saturating_sub(self.settings.shrink_step)
                .max(shrink_floor);
            return PoolAdjustment {
                pool: status.name,
                action: TuneAction::Decreased,
                old_max,
                new_max,
                reason: format!("utilization {:.0}%", status.utilization * 100.0),
            };
        }

        PoolAdjustment {
            pool: status.name,
            action: TuneAction::NoChange,
            old_max,
            new_max: old_max,
            reason: "within thresholds".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(max: usize, active: usize, queued: usize, core: usize) -> PoolStatus {
        PoolStatus {
            name: "test",
            core_size: core,
            max_size: max,
            current_size: active,
            active_workers: active,
            queued_tasks: queued,
            queue_capacity: 64,
            completed_tasks: 0,
            keep_alive_secs: 60,
            utilization: if max == 0 { 0.0 } else { active as f64 / max as f64 },
            state: "running",
        }
    }

    fn tuner() -> PoolAutoTuner {
        PoolAutoTuner::new(TunerSettings::default())
    }

    #[test]
    fn test_saturated_pool_grows() {
        // 9/10 workers busy, 15 queued: above both triggers
        let adjustment = tuner().plan(&status(10, 9, 15, 2));
        assert_eq!(adjustment.action, TuneAction::Increased);
        assert_eq!(adjustment.old_max, 10);
        assert_eq!(adjustment.new_max, 12);
    }

    #[test]
    fn test_growth_capped_at_ceiling() {
        let adjustment = tuner().plan(&status(32, 32, 50, 2));
        assert_eq!(adjustment.action, TuneAction::NoChange);
        assert_eq!(adjustment.new_max, 32);
    }

    #[test]
    fn test_saturation_without_backlog_is_ignored() {
        // Busy workers but an empty queue: no growth
        let adjustment = tuner().plan(&status(10, 10, 0, 2));
        assert_eq!(adjustment.action, TuneAction::NoChange);
    }

    #[test]
    fn test_idle_pool_shrinks_to_floor() {
        // 1/12 busy, core 2: floor is core + buffer = 4
        let adjustment = tuner().plan(&status(12, 1, 0, 2));
        assert_eq!(adjustment.action, TuneAction::Decreased);
        assert_eq!(adjustment.new_max, 10);

        let at_floor = tuner().plan(&status(5, 0, 0, 2));
        assert_eq!(at_floor.action, TuneAction::Decreased);
        assert_eq!(at_floor.new_max, 4);

        let below = tuner().plan(&status(4, 0, 0, 2));
        assert_eq!(below.action, TuneAction::NoChange);
    }

    #[test]
    fn test_moderate_load_unchanged() {
        let adjustment = tuner().plan(&status(10, 5, 3, 2));
        assert_eq!(adjustment.action, TuneAction::NoChange);
        assert_eq!(adjustment.old_max, adjustment.new_max);
    }
}
