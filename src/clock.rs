use chrono::{Local, NaiveDate, NaiveDateTime};

/// Источник "сейчас" в локальном времени сервера. Диапазоны дат считаются от
/// локальной полуночи, поэтому в тестах часы подменяются.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
