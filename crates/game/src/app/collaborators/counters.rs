use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum CounterId {
    Score,
    Lives,
    Countdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Rising,
    Falling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ThresholdEvent {
    pub(crate) counter: CounterId,
    pub(crate) value: i64,
}

#[derive(Debug, Clone, Copy)]
struct ThresholdCounter {
    value: i64,
    threshold: i64,
    direction: Direction,
    fired: bool,
}

impl ThresholdCounter {
    fn reached(&self) -> bool {
        match self.direction {
            Direction::Rising => self.value >= self.threshold,
            Direction::Falling => self.value <= self.threshold,
        }
    }
}

/// Named integer counters that report crossing their threshold once per arm.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    counters: BTreeMap<CounterId, ThresholdCounter>,
    pending: Vec<ThresholdEvent>,
}

impl Counters {
    /// Replaces any previous counter under `id`, dropping its queued crossing.
    pub(crate) fn define(
        &mut self,
        id: CounterId,
        start: i64,
        threshold: i64,
        direction: Direction,
    ) {
        self.counters.insert(
            id,
            ThresholdCounter {
                value: start,
                threshold,
                direction,
                fired: false,
            },
        );
        self.pending.retain(|event| event.counter != id);
    }

    pub(crate) fn get(&self, id: CounterId) -> Option<i64> {
        self.counters.get(&id).map(|counter| counter.value)
    }

    pub(crate) fn add(&mut self, id: CounterId, delta: i64) -> Option<i64> {
        let value = self.get(id)?.saturating_add(delta);
        self.set(id, value)
    }

    pub(crate) fn set(&mut self, id: CounterId, value: i64) -> Option<i64> {
        let counter = self.counters.get_mut(&id)?;
        counter.value = value;
        if !counter.fired && counter.reached() {
            counter.fired = true;
            self.pending.push(ThresholdEvent { counter: id, value });
        }
        Some(value)
    }

    /// Sets `value` and re-arms the threshold without checking it.
    pub(crate) fn reset(&mut self, id: CounterId, value: i64) {
        if let Some(counter) = self.counters.get_mut(&id) {
            counter.value = value;
            counter.fired = false;
        }
        self.pending.retain(|event| event.counter != id);
    }

    pub(crate) fn take_pending(&mut self) -> Vec<ThresholdEvent> {
        std::mem::take(&mut self.pending)
    }
}
