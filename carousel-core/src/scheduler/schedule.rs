//! Per-revolution task schedule
//!
//! Two tasks per card, in card order: a scan stop an eighth of a revolution
//! before the end of the card's band, then a rest stop on the last pulse of
//! the band. The last rest stop lands on `pulses_per_rev - 1`, completing
//! the revolution.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cards::{CardId, CardRegistry, CARD_COUNT};

/// Tasks per revolution
pub const TASK_COUNT: usize = 2 * CARD_COUNT;

/// Which stop of a card a task targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TaskKind {
    /// Card centred over the sensor; dwell is the card's scan time
    Scan,
    /// End of the card's band; dwell is the card's off time
    Rest,
}

/// A single motion + dwell step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Task {
    /// Card this task belongs to
    pub card: CardId,
    /// Scan or rest stop
    pub kind: TaskKind,
    /// Absolute target position in pulses
    pub target: i32,
}

impl Task {
    /// Dwell after reaching the target (ms)
    ///
    /// Read from the registry at dwell time so operator changes apply to the
    /// next stop without rebuilding the schedule.
    pub fn dwell_ms(&self, registry: &CardRegistry) -> u32 {
        let card = registry.get(self.card);
        match self.kind {
            TaskKind::Scan => card.scan_time_ms,
            TaskKind::Rest => card.off_time_ms,
        }
    }
}

/// Ordered tasks for one revolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSchedule {
    tasks: Vec<Task, TASK_COUNT>,
}

impl TaskSchedule {
    /// Derive the schedule from the registry's current bands
    pub fn build(registry: &CardRegistry) -> Self {
        let eighth = registry.pulses_per_rev() / 8;
        let mut tasks = Vec::new();

        for (card, bounds) in registry.iter() {
            let _ = tasks.push(Task {
                card,
                kind: TaskKind::Scan,
                target: bounds.max_pos - eighth,
            });
            let _ = tasks.push(Task {
                card,
                kind: TaskKind::Rest,
                target: bounds.max_pos,
            });
        }

        Self { tasks }
    }

    /// Task at `index`
    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    /// Number of tasks (always [`TASK_COUNT`])
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Always false for a built schedule
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterate tasks in execution order
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CarouselConfig;

    fn registry(pulses_per_rev: i32) -> CardRegistry {
        CardRegistry::new(&CarouselConfig {
            pulses_per_rev,
            ..Default::default()
        })
    }

    #[test]
    fn test_schedule_layout() {
        let reg = registry(1600);
        let schedule = TaskSchedule::build(&reg);
        assert_eq!(schedule.len(), TASK_COUNT);

        let targets: Vec<i32, TASK_COUNT> = schedule.iter().map(|t| t.target).collect();
        assert_eq!(
            targets.as_slice(),
            &[199, 399, 599, 799, 999, 1199, 1399, 1599]
        );
    }

    #[test]
    fn test_schedule_alternates_scan_and_rest() {
        let schedule = TaskSchedule::build(&registry(1600));
        for (i, task) in schedule.iter().enumerate() {
            assert_eq!(task.card.index(), i / 2);
            let expected = if i % 2 == 0 { TaskKind::Scan } else { TaskKind::Rest };
            assert_eq!(task.kind, expected);
        }
    }

    #[test]
    fn test_targets_fall_inside_card_band() {
        let reg = registry(800);
        let schedule = TaskSchedule::build(&reg);
        for task in schedule.iter() {
            assert!(reg.get(task.card).contains(task.target));
        }
    }

    #[test]
    fn test_dwell_follows_registry() {
        let mut reg = registry(1600);
        let schedule = TaskSchedule::build(&reg);
        let card = CardId::new(3).unwrap();
        reg.get_mut(card).scan_time_ms = 2500;
        reg.get_mut(card).off_time_ms = 40;

        assert_eq!(schedule.get(4).unwrap().dwell_ms(&reg), 2500);
        assert_eq!(schedule.get(5).unwrap().dwell_ms(&reg), 40);
    }

    #[test]
    fn test_rebuild_after_resize() {
        let mut reg = registry(1600);
        reg.set_pulses_per_rev(3200);
        let schedule = TaskSchedule::build(&reg);
        assert_eq!(schedule.get(0).unwrap().target, 399);
        assert_eq!(schedule.get(TASK_COUNT - 1).unwrap().target, 3199);
        assert!(schedule.get(TASK_COUNT).is_none());
    }
}
