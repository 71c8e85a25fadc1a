//! Published sensor state: summary value plus flat attribute bag.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};

use crate::config::DOMAIN;
use crate::model::{MenuDay, MenuSnapshot};
use crate::scheduler::{PollOutcome, UpdateFailed};

/// Display name of the sensor.
pub const SENSOR_NAME: &str = "School Menu";
/// Icon of the sensor.
pub const SENSOR_ICON: &str = "mdi:food";

/// Attribute map published next to the sensor value.
pub type Attributes = IndexMap<String, Value>;

/// Summary line for a snapshot.
#[must_use]
pub fn summary(snapshot: Option<&MenuSnapshot>) -> String {
    let Some(snapshot) = snapshot else {
        return "No menu data".to_owned();
    };

    let total = snapshot.total_items();
    match snapshot.menus.as_slice() {
        [] => "No menus".to_owned(),
        _ if total == 0 => "No items".to_owned(),
        [day] => format!("{} items for {}", day.items.len(), day.date),
        days => format!("{total} items for {} days", days.len()),
    }
}

/// Flatten a snapshot into per-day attributes.
#[must_use]
pub fn attributes(snapshot: Option<&MenuSnapshot>, menu_url: &str) -> Attributes {
    let mut attributes = Attributes::new();
    let Some(snapshot) = snapshot else {
        return attributes;
    };

    attributes.insert(
        "last_updated".to_owned(),
        json!(snapshot.last_updated.to_rfc3339()),
    );
    attributes.insert("days_requested".to_owned(), json!(snapshot.days_requested));
    attributes.insert("menu_url".to_owned(), json!(menu_url));

    for (index, day) in snapshot.menus.iter().enumerate() {
        insert_day(&mut attributes, &format!("day_{}", index + 1), day);
    }

    attributes
}

fn insert_day(attributes: &mut Attributes, day_key: &str, day: &MenuDay) {
    let menu_items: Vec<Value> = day
        .categories
        .iter()
        .flat_map(|(category, items)| {
            items
                .iter()
                .map(move |item| json!({ "category_name": category, "item_name": item.name }))
        })
        .collect();

    attributes.insert(
        day_key.to_owned(),
        json!({
            "date": day.date,
            "date_display": day.date,
            "session": day.session,
            "menu_items": menu_items,
            "item_count": day.item_count,
            "category_count": day.category_count,
        }),
    );

    let categories: IndexMap<&str, Vec<&str>> = day
        .categories
        .iter()
        .map(|(category, items)| {
            let names = items.iter().map(|item| item.name.as_str()).collect();
            (category.as_str(), names)
        })
        .collect();

    attributes.insert(format!("{day_key}_date"), json!(day.date));
    attributes.insert(format!("{day_key}_items"), json!(day.items));
    attributes.insert(format!("{day_key}_categories"), json!(categories));
    attributes.insert(format!("{day_key}_item_count"), json!(day.item_count));
    attributes.insert(format!("{day_key}_category_count"), json!(day.category_count));

    if day.pictures.is_empty() {
        return;
    }

    for (index, item) in day.pictures.iter().enumerate() {
        let Some(url) = &item.picture_url else {
            continue;
        };
        let prefix = format!("{day_key}_picture_{}", index + 1);
        attributes.insert(format!("{prefix}_name"), json!(item.name));
        attributes.insert(format!("{prefix}_url"), json!(url));
        attributes.insert(format!("{prefix}_category"), json!(item.category));
    }
    attributes.insert(format!("{day_key}_picture_count"), json!(day.pictures.len()));
}

#[derive(Debug, Clone, Serialize)]
/// Everything the host needs to render the sensor.
pub struct SensorState {
    /// Unique id of the sensor.
    pub unique_id: String,
    /// Display name.
    pub name: &'static str,
    /// Icon.
    pub icon: &'static str,
    /// Summary value.
    pub value: String,
    /// Whether the last poll cycle succeeded.
    pub available: bool,
    /// Flat attribute bag.
    pub attributes: Attributes,
}

/// Sensor that republishes poll outcomes.
///
/// A failed cycle marks the sensor unavailable but keeps the last good
/// snapshot visible until the next success.
#[derive(Debug, Clone)]
pub struct MenuSensor {
    unique_id: String,
    menu_url: String,
    snapshot: Option<MenuSnapshot>,
    last_update_success: bool,
    last_error: Option<UpdateFailed>,
}

impl MenuSensor {
    /// Sensor for the config entry `entry_id` showing `menu_url`.
    #[must_use]
    pub fn new(entry_id: &str, menu_url: impl Into<String>) -> Self {
        Self {
            unique_id: format!("{DOMAIN}_{entry_id}"),
            menu_url: menu_url.into(),
            snapshot: None,
            last_update_success: true,
            last_error: None,
        }
    }

    /// Record the outcome of a poll cycle.
    pub fn apply(&mut self, outcome: PollOutcome) {
        match outcome {
            PollOutcome::Snapshot(snapshot) => {
                self.snapshot = Some(snapshot);
                self.last_update_success = true;
                self.last_error = None;
            }
            PollOutcome::Failed(err) => {
                self.last_update_success = false;
                self.last_error = Some(err);
            }
        }
    }

    /// Unique id, `linqconnect_school_menus_<entry id>`.
    #[must_use]
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Whether the last poll cycle succeeded.
    #[must_use]
    pub fn available(&self) -> bool {
        self.last_update_success
    }

    /// Error of the last failed cycle, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<&UpdateFailed> {
        self.last_error.as_ref()
    }

    /// Last good snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<&MenuSnapshot> {
        self.snapshot.as_ref()
    }

    /// Summary value.
    #[must_use]
    pub fn native_value(&self) -> String {
        summary(self.snapshot.as_ref())
    }

    /// Attribute bag.
    #[must_use]
    pub fn attributes(&self) -> Attributes {
        attributes(self.snapshot.as_ref(), &self.menu_url)
    }

    /// Full published state.
    #[must_use]
    pub fn state(&self) -> SensorState {
        SensorState {
            unique_id: self.unique_id.clone(),
            name: SENSOR_NAME,
            icon: SENSOR_ICON,
            value: self.native_value(),
            available: self.available(),
            attributes: self.attributes(),
        }
    }
}
