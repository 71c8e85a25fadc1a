//! Domain data structures for menu identifiers, menu days, and snapshots.

use std::fmt;

use chrono::{DateTime, Duration, Local, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Short code embedded in a public menu URL identifying a district's menu feed.
pub struct MenuIdentifier(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Opaque district id returned by the API, required for menu and picture calls.
pub struct DistrictId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// School building the menu is requested for.
pub struct BuildingId(pub String);

impl fmt::Display for MenuIdentifier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl fmt::Display for DistrictId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A single recipe served on a menu day.
pub struct MenuItem {
    /// Recipe name as shown on the menu.
    pub name: String,
    /// Remote item id used for picture lookups; may be empty.
    pub item_id: String,
    /// Category the recipe was listed under.
    pub category: String,
    /// Local URL of the downloaded thumbnail, if any.
    pub picture_url: Option<String>,
}

impl MenuItem {
    /// Label used in the flattened item list, e.g. `Pizza (Main Entree)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.category)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Menu of one serving session on one day.
pub struct MenuDay {
    /// Display date, e.g. `Monday, September 08, 2025`.
    pub date: String,
    /// Sortable date key.
    pub date_key: NaiveDate,
    /// Date string exactly as returned by the API.
    pub raw_date: String,
    /// Serving session, e.g. `Lunch`.
    pub session: String,
    /// Menu plan name.
    pub plan: String,
    /// Flattened `name (category)` labels in encounter order.
    pub items: Vec<String>,
    /// Items grouped by category; categories keep encounter order, items are name-sorted.
    pub categories: IndexMap<String, Vec<MenuItem>>,
    /// Number of flattened items.
    pub item_count: usize,
    /// Number of non-empty categories.
    pub category_count: usize,
    /// Items with a picture, in picture priority order.
    pub pictures: Vec<MenuItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Complete parsed result of one fetch cycle.
pub struct MenuSnapshot {
    /// Menu days sorted ascending by date key.
    pub menus: Vec<MenuDay>,
    /// When the snapshot was produced.
    pub last_updated: DateTime<Local>,
    /// Number of days the cycle asked for.
    pub days_requested: u8,
}

impl MenuSnapshot {
    /// Snapshot without any menu days, used when a cycle fails softly.
    #[must_use]
    pub fn empty(days_requested: u8) -> Self {
        Self {
            menus: Vec::new(),
            last_updated: Local::now(),
            days_requested,
        }
    }

    /// Total number of flattened items across all days.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.menus.iter().map(|day| day.items.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Half-open `[start, end)` window of requested menu days.
pub struct DateRange {
    /// First day (inclusive).
    pub start: NaiveDate,
    /// Day after the last requested day (exclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Window of `days` days starting at `start`.
    #[must_use]
    pub fn starting(start: NaiveDate, days: u8) -> Self {
        Self {
            start,
            end: start + Duration::days(i64::from(days)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Input of a single fetch cycle.
pub struct MenuRequest {
    /// Public menu URL as configured.
    pub menu_url: String,
    /// Building id taken from the URL's query.
    pub building_id: BuildingId,
    /// Number of days to fetch.
    pub days: u8,
}
