use chrono::NaiveDateTime;
use ics::properties::{Categories, DtEnd, DtStart, Location, Summary};

use crate::{Event, Schedule};

fn ics_timestamp(datetime: NaiveDateTime) -> String {
    datetime.format("%Y%m%dT%H%M%S").to_string()
}

impl Schedule {
    /// Exports the week as an iCalendar with floating local times.
    #[must_use]
    pub fn to_ics(&self) -> ics::ICalendar<'_> {
        let mut icalendar = ics::ICalendar::new(
            "2.0",
            format!("-//weekplan//Week of {}//EN", self.week_start()),
        );

        for event in self.events() {
            icalendar.add_event(event.to_ics());
        }

        icalendar
    }
}

impl Event {
    #[must_use]
    pub fn to_ics(&self) -> ics::Event<'_> {
        let start = ics_timestamp(self.start);
        let end = ics_timestamp(self.end);

        let id = format!("{}_{}", start, self.name.replace(' ', "-"));

        let mut ics_event = ics::Event::new(id, start.clone());

        ics_event.push(DtStart::new(start));
        ics_event.push(DtEnd::new(end));
        ics_event.push(Summary::new(&self.name));
        ics_event.push(Categories::new(self.color.name()));

        if !self.location.is_empty() {
            ics_event.push(Location::new(&self.location));
        }

        ics_event
    }
}
