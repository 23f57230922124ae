use chrono::{NaiveDate, NaiveTime, Weekday};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Event, Schedule};

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

// Minutes from midnight.
const FIRST_SLOT: u32 = 8 * 60;
const SLOTS_END: u32 = 20 * 60 + 30;
const SLOT_MINUTES: usize = 30;
const SATURDAY_CUTOFF: u32 = 15 * 60;

/// One half-hour cell of the week view.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Slot {
    pub date: NaiveDate,
    pub day: Weekday,
    pub time: NaiveTime,
    /// Saturday afternoons past 15:00 are closed and never list events.
    pub available: bool,
    pub events: Vec<Event>,
}

impl Schedule {
    /// Half-hour slots from 08:00 through 20:00, row by row: every day of the
    /// week at 08:00, then every day at 08:30, and so on.
    #[must_use]
    pub fn grid(&self) -> Vec<Slot> {
        let times = (FIRST_SLOT..SLOTS_END)
            .step_by(SLOT_MINUTES)
            .filter_map(|minutes| {
                NaiveTime::from_num_seconds_from_midnight_opt(minutes * 60, 0)
                    .map(|time| (minutes, time))
            });

        let mut slots = Vec::new();

        for (minutes, time) in times {
            for day in WEEK {
                let Some(date) = self.date_for(day) else {
                    continue;
                };

                let available = !(day == Weekday::Sat && minutes > SATURDAY_CUTOFF);
                let events = if available {
                    self.events_at(date.and_time(time))
                } else {
                    Vec::new()
                };

                slots.push(Slot {
                    date,
                    day,
                    time,
                    available,
                    events,
                });
            }
        }

        slots
    }
}
