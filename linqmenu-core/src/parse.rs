//! Best-effort normalization of the `FamilyMenu` response into menu days.
//!
//! Every nesting level (session, plan, day, meal, category, recipe) is decoded
//! on its own, so a malformed entry is logged and skipped while its siblings
//! survive.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{MenuDay, MenuItem};

const API_DATE_FORMAT: &str = "%m/%d/%Y";
const DISPLAY_DATE_FORMAT: &str = "%A, %B %d, %Y";

/// Category used for recipes listed without a category name.
pub const FALLBACK_CATEGORY: &str = "Other";
const FALLBACK_SESSION: &str = "Unknown";
const FALLBACK_PLAN: &str = "Unknown Plan";

/// Top level of /api/FamilyMenu
#[derive(Debug, Deserialize)]
struct FamilyMenuResponse {
    #[serde(rename = "FamilyMenuSessions", default)]
    sessions: Option<Vec<Value>>,
}

/// Breakfast, Lunch, ...
#[derive(Debug, Deserialize)]
struct ServingSession {
    #[serde(rename = "ServingSession", default)]
    name: Option<String>,
    #[serde(rename = "MenuPlans", default)]
    plans: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct MenuPlan {
    #[serde(rename = "MenuPlanName", default)]
    name: Option<String>,
    #[serde(rename = "Days", default)]
    days: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct PlanDay {
    #[serde(rename = "Date", default)]
    date: Option<String>,
    #[serde(rename = "MenuMeals", default)]
    meals: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct MenuMeal {
    #[serde(rename = "RecipeCategories", default)]
    categories: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RecipeCategory {
    #[serde(rename = "CategoryName", default)]
    name: Option<String>,
    #[serde(rename = "Recipes", default)]
    recipes: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct Recipe {
    #[serde(rename = "RecipeName", default)]
    name: Option<String>,
    // string in most districts, number in a few
    #[serde(rename = "ItemId", default)]
    item_id: Option<Value>,
}

/// A parsed menu day whose items have not been enriched with pictures yet.
#[derive(Debug, Clone)]
pub struct DayDraft {
    /// Date string exactly as returned by the API.
    pub raw_date: String,
    /// Sortable date key.
    pub date_key: NaiveDate,
    /// Human readable date.
    pub date: String,
    /// Serving session name.
    pub session: String,
    /// Menu plan name.
    pub plan: String,
    /// All recipes of the day in encounter order.
    pub items: Vec<MenuItem>,
}

impl DayDraft {
    /// Group the items by category and produce the final menu day.
    ///
    /// `pictures` are the items that received a picture, in priority order.
    #[must_use]
    pub fn finish(self, pictures: Vec<MenuItem>) -> MenuDay {
        let labels: Vec<String> = self.items.iter().map(MenuItem::label).collect();

        let mut categories: IndexMap<String, Vec<MenuItem>> = IndexMap::new();
        for item in self.items {
            categories
                .entry(item.category.clone())
                .or_default()
                .push(item);
        }
        categories.retain(|_, items| !items.is_empty());
        for items in categories.values_mut() {
            items.sort_by(|left, right| left.name.cmp(&right.name));
        }

        MenuDay {
            date: self.date,
            date_key: self.date_key,
            raw_date: self.raw_date,
            session: self.session,
            plan: self.plan,
            item_count: labels.len(),
            items: labels,
            category_count: categories.len(),
            categories,
            pictures,
        }
    }
}

/// Parse a `FamilyMenu` body into at most `days` drafts sorted by date.
///
/// `today` is used as the date key of days whose date cannot be parsed.
#[must_use]
pub fn parse_family_menu(body: &Value, days: u8, today: NaiveDate) -> Vec<DayDraft> {
    let limit = usize::from(days);

    let response = match FamilyMenuResponse::deserialize(body) {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "Error parsing menu JSON");
            return Vec::new();
        }
    };

    let sessions = response.sessions.unwrap_or_default();
    if sessions.is_empty() {
        warn!("No menu sessions found in API response");
        return Vec::new();
    }

    let mut drafts = Vec::new();

    for session in parse_each::<ServingSession>(&sessions, "session") {
        let session_name = text_or(session.name, FALLBACK_SESSION);

        for plan in parse_each::<MenuPlan>(session.plans.as_deref().unwrap_or_default(), "plan") {
            let plan_name = text_or(plan.name, FALLBACK_PLAN);

            let mut plan_days: Vec<DayDraft> =
                parse_each::<PlanDay>(plan.days.as_deref().unwrap_or_default(), "day")
                    .filter_map(|day| parse_day(day, &session_name, &plan_name, today))
                    .collect();

            plan_days.sort_by_key(|day| day.date_key);
            keep_first(&mut plan_days, limit, "plan");
            drafts.extend(plan_days);
        }
    }

    drafts.sort_by_key(|day| day.date_key);
    keep_first(&mut drafts, limit, "menu");
    drafts
}

/// Truncate sorted days to `limit`, logging what falls off. Returns the dropped count.
fn keep_first(days: &mut Vec<DayDraft>, limit: usize, scope: &'static str) -> usize {
    let dropped = days.len().saturating_sub(limit);
    for day in days.iter().skip(limit) {
        debug!(
            scope,
            date = %day.date,
            session = %day.session,
            plan = %day.plan,
            "dropping day beyond requested window"
        );
    }
    days.truncate(limit);
    dropped
}

fn parse_day(day: PlanDay, session: &str, plan: &str, today: NaiveDate) -> Option<DayDraft> {
    let raw_date = day.date.unwrap_or_default();
    if raw_date.is_empty() {
        return None;
    }

    let (date_key, date) = match NaiveDate::parse_from_str(&raw_date, API_DATE_FORMAT) {
        Ok(parsed) => (parsed, parsed.format(DISPLAY_DATE_FORMAT).to_string()),
        Err(err) => {
            debug!(raw_date = %raw_date, error = %err, "unparsable menu date, keeping raw value");
            (today, raw_date.clone())
        }
    };

    let mut items = Vec::new();

    for meal in parse_each::<MenuMeal>(day.meals.as_deref().unwrap_or_default(), "meal") {
        let categories = meal.categories.unwrap_or_default();

        for category in parse_each::<RecipeCategory>(&categories, "category") {
            let category_name = category
                .name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(FALLBACK_CATEGORY)
                .to_owned();

            let recipes = category.recipes.unwrap_or_default();
            for recipe in parse_each::<Recipe>(&recipes, "recipe") {
                let name = recipe.name.as_deref().map(str::trim).unwrap_or_default();
                if name.is_empty() {
                    continue;
                }

                items.push(MenuItem {
                    name: name.to_owned(),
                    item_id: recipe.item_id.as_ref().map(id_text).unwrap_or_default(),
                    category: category_name.clone(),
                    picture_url: None,
                });
            }
        }
    }

    Some(DayDraft {
        raw_date,
        date_key,
        date,
        session: session.to_owned(),
        plan: plan.to_owned(),
        items,
    })
}

fn parse_each<'a, T: DeserializeOwned>(
    values: &'a [Value],
    kind: &'static str,
) -> impl Iterator<Item = T> + 'a {
    values
        .iter()
        .enumerate()
        .filter_map(move |(index, value)| match T::deserialize(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!(kind, index, error = %err, "skipping malformed menu entry");
                None
            }
        })
}

fn text_or(value: Option<String>, fallback: &str) -> String {
    value
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

/// Render an id field that may arrive as a string or a number.
pub(crate) fn id_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_owned(),
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    }
}
