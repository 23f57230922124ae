use std::ops::RangeInclusive;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use log::{debug, info};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Event, EventEdit};

const DURATION_MINUTES: RangeInclusive<i64> = 30..=180;
const EARLIEST_START_HOUR: u32 = 8;
const WEEKDAY_LATEST_END_HOUR: u32 = 20;
const SATURDAY_LATEST_END_HOUR: u32 = 15;
const MAX_OVERLAP_MINUTES: i64 = 30;

/// Why an event was refused admission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("end time must be after start time")]
    EndNotAfterStart,
    #[error("duration of {minutes} minutes is outside the allowed 30 to 180 minutes")]
    Duration { minutes: i64 },
    #[error("events cannot be scheduled on a Sunday")]
    Sunday,
    #[error(
        "{day} events must start at 08:00 or later and end by hour {latest_end_hour} \
         (start hour {start_hour}, end hour {end_hour})"
    )]
    OutsideHours {
        day: Weekday,
        start_hour: u32,
        end_hour: u32,
        latest_end_hour: u32,
    },
    #[error("overlaps `{with}` by {minutes} minutes, at most 30 are allowed")]
    Overlap { with: String, minutes: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("no event at index {0}")]
    NotFound(usize),
    #[error(transparent)]
    Rejected(#[from] Rejection),
}

/// One week of events, anchored to the date the week starts on.
///
/// Events only get in through [`Schedule::add_event`], which refuses anything
/// that breaks the placement or overlap rules.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Schedule {
    week_start: NaiveDate,
    events: Vec<Event>,
}

impl Schedule {
    /// `week_start` is expected to be a Monday, this is not checked.
    #[must_use]
    pub fn new(week_start: NaiveDate) -> Self {
        Self {
            week_start,
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn week_start(&self) -> NaiveDate {
        self.week_start
    }

    /// `None` when the week runs past the last representable date.
    #[must_use]
    pub fn week_end(&self) -> Option<NaiveDate> {
        self.week_start.checked_add_signed(Duration::try_days(6)?)
    }

    /// Date of `day` within this week.
    #[must_use]
    pub fn date_for(&self, day: Weekday) -> Option<NaiveDate> {
        let offset = Duration::try_days(i64::from(day.num_days_from_monday()))?;
        self.week_start.checked_add_signed(offset)
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn add_event(&mut self, event: Event) -> Result<(), Rejection> {
        if let Err(rejection) = self.validate(&event, None) {
            debug!("Rejected event `{}`: {rejection}", event.name);
            return Err(rejection);
        }

        info!(
            "Admitted event `{}` at {} ({} minutes)",
            event.name,
            event.start,
            event.duration_minutes()
        );
        self.events.push(event);
        Ok(())
    }

    /// Placement rules: duration bounds, no Sundays, and the opening hours of
    /// the start's weekday.
    pub fn check_timing(&self, event: &Event) -> Result<(), Rejection> {
        let minutes = event.duration_minutes();
        if !DURATION_MINUTES.contains(&minutes) {
            return Err(Rejection::Duration { minutes });
        }

        let day = event.start.weekday();
        let start_hour = event.start.hour();
        // Derived from start + duration rather than the end field. Both lie
        // within start..=end, so the fallback is never reached in practice.
        let end_hour = Duration::try_minutes(minutes)
            .and_then(|duration| event.start.checked_add_signed(duration))
            .unwrap_or(event.end)
            .hour();

        let latest_end_hour = match day {
            Weekday::Sun => return Err(Rejection::Sunday),
            Weekday::Sat => SATURDAY_LATEST_END_HOUR,
            _ => WEEKDAY_LATEST_END_HOUR,
        };

        if start_hour < EARLIEST_START_HOUR || end_hour > latest_end_hour {
            return Err(Rejection::OutsideHours {
                day,
                start_hour,
                end_hour,
                latest_end_hour,
            });
        }

        Ok(())
    }

    /// Overlap budget against every event already in the schedule.
    pub fn check_overlap(&self, event: &Event) -> Result<(), Rejection> {
        self.check_overlap_skipping(event, None)
    }

    #[must_use]
    pub fn is_valid_timing(&self, event: &Event) -> bool {
        self.check_timing(event).is_ok()
    }

    #[must_use]
    pub fn is_valid_overlap(&self, event: &Event) -> bool {
        self.check_overlap(event).is_ok()
    }

    fn check_overlap_skipping(&self, event: &Event, skip: Option<usize>) -> Result<(), Rejection> {
        for (idx, existing) in self.events.iter().enumerate() {
            if Some(idx) == skip {
                continue;
            }

            // Touching endpoints count as intersecting.
            if existing.end < event.start || event.end < existing.start {
                continue;
            }

            let minutes =
                (existing.end.min(event.end) - existing.start.max(event.start)).num_minutes();
            if minutes > MAX_OVERLAP_MINUTES {
                return Err(Rejection::Overlap {
                    with: existing.name.clone(),
                    minutes,
                });
            }
        }

        Ok(())
    }

    fn validate(&self, event: &Event, skip: Option<usize>) -> Result<(), Rejection> {
        if event.end <= event.start {
            return Err(Rejection::EndNotAfterStart);
        }

        self.check_timing(event)?;
        self.check_overlap_skipping(event, skip)
    }

    /// Removes the first event equal to `event`, leaving any duplicates.
    pub fn remove_event(&mut self, event: &Event) -> Option<Event> {
        let idx = self.events.iter().position(|existing| existing == event)?;
        Some(self.events.remove(idx))
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Event> {
        (index < self.events.len()).then(|| self.events.remove(index))
    }

    /// Rewrites the event at `index` without re-checking any rule.
    pub fn edit_event(&mut self, index: usize, edit: EventEdit) -> Result<&Event, EditError> {
        let event = self
            .events
            .get_mut(index)
            .ok_or(EditError::NotFound(index))?;

        event.edit(edit);
        Ok(&*event)
    }

    /// Rewrites the event at `index` only if the edited event would still be
    /// admitted next to all the others.
    pub fn edit_event_checked(
        &mut self,
        index: usize,
        edit: EventEdit,
    ) -> Result<&Event, EditError> {
        let edited = self
            .events
            .get(index)
            .ok_or(EditError::NotFound(index))?
            .edited(edit);

        self.validate(&edited, Some(index))?;

        self.events[index] = edited;
        Ok(&self.events[index])
    }

    /// Events starting on `date`, in insertion order.
    #[must_use]
    pub fn events_for_day(&self, date: NaiveDate) -> Vec<Event> {
        self.events
            .iter()
            .filter(|event| event.start.date() == date)
            .cloned()
            .collect()
    }

    /// Events running at `instant`, both ends included.
    #[must_use]
    pub fn events_at(&self, instant: NaiveDateTime) -> Vec<Event> {
        self.events
            .iter()
            .filter(|event| event.is_active_at(instant))
            .cloned()
            .collect()
    }
}
