#![allow(dead_code)]

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
pub use fxjournal::adapters::memory_adapter::MemoryKvAdapter;
use fxjournal::domain::record::NewRecord;
use fxjournal::ports::clock_port::Clock;
use std::cell::Cell;
use std::rc::Rc;

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Rc<Self> {
        Rc::new(Self {
            now: Cell::new(now),
        })
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.now.set(self.now.get() + Duration::minutes(minutes));
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

pub fn boxed(clock: &Rc<ManualClock>) -> Box<dyn Clock> {
    Box::new(Rc::clone(clock))
}

pub fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// A wall-clock time in the local zone, as UTC.
pub fn local_ts(y: i32, m: u32, d: u32, h: u32, min: u32, sec: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(y, m, d, h, min, sec)
        .earliest()
        .unwrap()
        .with_timezone(&Utc)
}

pub fn long(pair: &str) -> NewRecord {
    NewRecord::new(pair, "1H", "Double Bottom", "Long")
}

pub fn short(pair: &str) -> NewRecord {
    NewRecord::new(pair, "4H", "Head and Shoulders", "Short")
}
