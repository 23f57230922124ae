use std::fmt;

use chrono::{NaiveDateTime, NaiveTime};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Display colors an event can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
    Orange,
    #[default]
    Gray,
}

impl Color {
    pub const ALL: [Color; 6] = [
        Color::Red,
        Color::Green,
        Color::Yellow,
        Color::Blue,
        Color::Orange,
        Color::Gray,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "Red",
            Color::Green => "Green",
            Color::Yellow => "Yellow",
            Color::Blue => "Blue",
            Color::Orange => "Orange",
            Color::Gray => "Gray",
        }
    }

    /// Strict lookup, `None` for anything outside the palette.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|color| color.name() == name)
    }

    /// Like [`Color::parse`], but unknown names fall back to the default color.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }

    #[must_use]
    pub fn rgb(self) -> [u8; 3] {
        match self {
            Color::Red => [255, 0, 0],
            Color::Green => [0, 255, 0],
            Color::Yellow => [255, 255, 0],
            Color::Blue => [0, 0, 255],
            Color::Orange => [255, 200, 0],
            Color::Gray => [128, 128, 128],
        }
    }

    #[must_use]
    pub fn from_rgb(rgb: [u8; 3]) -> Option<Self> {
        Self::ALL.into_iter().find(|color| color.rgb() == rgb)
    }

    /// Name of the palette entry with this display value, or `"Unknown"`.
    #[must_use]
    pub fn name_for_rgb(rgb: [u8; 3]) -> &'static str {
        Self::from_rgb(rgb).map_or("Unknown", Color::name)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(feature = "serde")]
impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Color::from_name(&name))
    }
}

/// A single booking. Holds no rules of its own, legality is decided by the
/// [`Schedule`](crate::Schedule) it is admitted to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    pub name: String,
    pub location: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub color: Color,
}

/// Replacement fields for an existing event. Times are applied to the
/// event's current dates.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventEdit {
    pub name: String,
    pub location: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub color: Color,
}

impl Event {
    pub fn new<N, L>(
        name: N,
        location: L,
        start: NaiveDateTime,
        end: NaiveDateTime,
        color: Color,
    ) -> Self
    where
        N: Into<String>,
        L: Into<String>,
    {
        Self {
            name: name.into(),
            location: location.into(),
            start,
            end,
            color,
        }
    }

    /// Whole minutes between start and end, truncated.
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Whether `instant` falls within the event, both ends included.
    #[must_use]
    pub fn is_active_at(&self, instant: NaiveDateTime) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Applies `edit` in place without any validation.
    pub fn edit(&mut self, edit: EventEdit) {
        self.name = edit.name;
        self.location = edit.location;
        self.color = edit.color;
        self.start = self.start.date().and_time(edit.start);
        self.end = self.end.date().and_time(edit.end);
    }

    #[must_use]
    pub fn edited(&self, edit: EventEdit) -> Self {
        let mut event = self.clone();
        event.edit(edit);
        event
    }
}
