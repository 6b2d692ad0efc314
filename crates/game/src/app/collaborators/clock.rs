use std::time::Duration;

use scenes::{EventHandler, EventSource, HandlerResult, Subscribers};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TickEvent {
    pub(crate) tick: u64,
    pub(crate) dt_seconds: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FrameEvent {
    pub(crate) frame: u64,
    pub(crate) frame_dt_seconds: f32,
    pub(crate) ticks_run: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IntervalEvent {
    pub(crate) count: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Ticker {
    next_tick: u64,
    subscribers: Subscribers<TickEvent>,
}

impl Ticker {
    pub(crate) fn next_tick(&self) -> u64 {
        self.next_tick
    }

    pub(crate) fn fire(&mut self, dt_seconds: f32) -> HandlerResult {
        let event = TickEvent {
            tick: self.next_tick,
            dt_seconds,
        };
        self.next_tick += 1;
        self.subscribers.emit(&event)
    }
}

impl EventSource<TickEvent> for Ticker {
    fn subscribe(&mut self, handler: EventHandler<TickEvent>) {
        self.subscribers.subscribe(handler);
    }
}

#[derive(Debug, Default)]
pub(crate) struct FrameClock {
    next_frame: u64,
    subscribers: Subscribers<FrameEvent>,
}

impl FrameClock {
    pub(crate) fn frames_fired(&self) -> u64 {
        self.next_frame
    }

    pub(crate) fn fire(&mut self, frame_dt: Duration, ticks_run: u32) -> HandlerResult {
        let event = FrameEvent {
            frame: self.next_frame,
            frame_dt_seconds: frame_dt.as_secs_f32(),
            ticks_run,
        };
        self.next_frame += 1;
        self.subscribers.emit(&event)
    }
}

impl EventSource<FrameEvent> for FrameClock {
    fn subscribe(&mut self, handler: EventHandler<FrameEvent>) {
        self.subscribers.subscribe(handler);
    }
}

/// Fires once per elapsed `period` of simulated time. A zero period disables
/// the timer.
#[derive(Debug)]
pub(crate) struct IntervalTimer {
    period: Option<Duration>,
    elapsed: Duration,
    fired: u64,
    subscribers: Subscribers<IntervalEvent>,
}

impl IntervalTimer {
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            period: (!period.is_zero()).then_some(period),
            elapsed: Duration::ZERO,
            fired: 0,
            subscribers: Subscribers::new(),
        }
    }

    pub(crate) fn advance(&mut self, dt: Duration) -> HandlerResult {
        let Some(period) = self.period else {
            return Ok(());
        };
        self.elapsed = self.elapsed.saturating_add(dt);
        while self.elapsed >= period {
            self.elapsed -= period;
            self.fired += 1;
            self.subscribers.emit(&IntervalEvent { count: self.fired })?;
        }
        Ok(())
    }
}

impl EventSource<IntervalEvent> for IntervalTimer {
    fn subscribe(&mut self, handler: EventHandler<IntervalEvent>) {
        self.subscribers.subscribe(handler);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn record_intervals(timer: &mut IntervalTimer) -> Rc<RefCell<Vec<u64>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        timer.subscribe(Box::new(move |event: &IntervalEvent| {
            sink.borrow_mut().push(event.count);
            Ok(())
        }));
        log
    }

    #[test]
    fn ticker_numbers_ticks_from_zero() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut ticker = Ticker::default();
        {
            let seen = Rc::clone(&seen);
            ticker.subscribe(Box::new(move |event: &TickEvent| {
                seen.borrow_mut().push(event.tick);
                Ok(())
            }));
        }

        for _ in 0..3 {
            ticker.fire(0.02).expect("tick");
        }

        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        assert_eq!(ticker.next_tick(), 3);
    }

    #[test]
    fn frame_clock_reports_ticks_run() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut frames = FrameClock::default();
        {
            let seen = Rc::clone(&seen);
            frames.subscribe(Box::new(move |event: &FrameEvent| {
                seen.borrow_mut().push((event.frame, event.ticks_run));
                Ok(())
            }));
        }

        frames.fire(Duration::from_millis(16), 1).expect("frame");
        frames.fire(Duration::from_millis(40), 2).expect("frame");

        assert_eq!(*seen.borrow(), vec![(0, 1), (1, 2)]);
        assert_eq!(frames.frames_fired(), 2);
    }

    #[test]
    fn interval_accumulates_partial_periods() {
        let mut timer = IntervalTimer::new(Duration::from_millis(100));
        let log = record_intervals(&mut timer);

        timer.advance(Duration::from_millis(60)).expect("advance");
        assert!(log.borrow().is_empty());
        timer.advance(Duration::from_millis(60)).expect("advance");
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn interval_fires_once_per_elapsed_period() {
        let mut timer = IntervalTimer::new(Duration::from_millis(100));
        let log = record_intervals(&mut timer);

        timer.advance(Duration::from_millis(350)).expect("advance");
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn zero_period_never_fires() {
        let mut timer = IntervalTimer::new(Duration::ZERO);
        let log = record_intervals(&mut timer);

        timer.advance(Duration::from_secs(10)).expect("advance");
        assert!(log.borrow().is_empty());
    }
}
