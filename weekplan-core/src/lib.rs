mod event;
mod grid;
mod schedule;

#[cfg(feature = "ics")]
mod ics;

#[cfg(feature = "serde")]
pub mod store;

pub use event::{Color, Event, EventEdit};
pub use grid::Slot;
pub use schedule::{EditError, Rejection, Schedule};
