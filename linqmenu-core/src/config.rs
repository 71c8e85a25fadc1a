//! Configuration constants, menu URL validation, and the setup connectivity check.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::client::MenuClient;
use crate::model::{BuildingId, MenuIdentifier, MenuRequest};

/// Integration domain, used as prefix of unique ids.
pub const DOMAIN: &str = "linqconnect_school_menus";

/// Days shown when the user does not choose.
pub const DEFAULT_DAYS_TO_SHOW: u8 = 1;
/// Smallest accepted days-to-show value.
pub const MIN_DAYS_TO_SHOW: u8 = 1;
/// Largest accepted days-to-show value.
pub const MAX_DAYS_TO_SHOW: u8 = 7;

/// Interval between two poll cycles.
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(60 * 60);

const ACCEPTED_HOST: &str = "linqconnect.com";
const BUILDING_ID_PARAM: &str = "buildingId";

#[derive(thiserror::Error, Debug)]
/// Problems found while validating user input.
pub enum ConfigError {
    /// The menu URL is not a URL at all.
    #[error("Menu URL could not be parsed: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The menu URL does not point at LINQ Connect.
    #[error("URL must be from linqconnect.com")]
    InvalidHost,
    /// The menu URL lacks the `buildingId` query parameter.
    #[error("Building ID not found in URL - URL should include ?buildingId=...")]
    InvalidBuildingId,
    /// The menu URL path carries no recognizable menu code.
    #[error(
        "Invalid menu URL format - should be like https://linqconnect.com/public/menu/MENUCODE?buildingId=..."
    )]
    InvalidMenuId,
    /// Days to show is out of range.
    #[error("Days to show must be between 1 and 7, got {0}")]
    InvalidDays(i64),
    /// The API could not be reached or returned no menu.
    #[error("Cannot connect: {0}")]
    CannotConnect(String),
}

impl ConfigError {
    /// Stable code shown to the user next to the offending field.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::InvalidUrl(_) => "invalid_url",
            ConfigError::InvalidHost => "invalid_host",
            ConfigError::InvalidBuildingId => "invalid_building_id",
            ConfigError::InvalidMenuId => "invalid_menu_id",
            ConfigError::InvalidDays(_) => "invalid_days",
            ConfigError::CannotConnect(_) => "cannot_connect",
        }
    }

    /// Form field the error belongs to; `base` for errors not tied to a field.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            ConfigError::InvalidUrl(_)
            | ConfigError::InvalidHost
            | ConfigError::InvalidBuildingId
            | ConfigError::InvalidMenuId => "menu_url",
            ConfigError::InvalidDays(_) => "days_to_show",
            ConfigError::CannotConnect(_) => "base",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Parts of a menu URL needed for API calls.
pub struct MenuUrl {
    /// Building the menu belongs to.
    pub building_id: BuildingId,
    /// Menu code from the path.
    pub menu_id: MenuIdentifier,
}

/// Split a LINQ Connect menu URL into building id and menu code.
///
/// Accepts `/public/menu/<CODE>` and `/unified/menu/.../<code>` paths.
///
/// # Errors
///
/// Returns the [`ConfigError`] describing the first problem found.
pub fn parse_menu_url(menu_url: &str) -> Result<MenuUrl, ConfigError> {
    let url = Url::parse(menu_url.trim())?;

    if !url.host_str().is_some_and(|host| host.contains(ACCEPTED_HOST)) {
        return Err(ConfigError::InvalidHost);
    }

    let building_id = url
        .query_pairs()
        .find(|(key, value)| key == BUILDING_ID_PARAM && !value.is_empty())
        .map(|(_, value)| BuildingId(value.into_owned()))
        .ok_or(ConfigError::InvalidBuildingId)?;

    let parts: Vec<&str> = url.path().split('/').collect();
    let has = |segment: &str| parts.iter().any(|part| *part == segment);

    let menu_id = if has("public") && has("menu") {
        parts
            .iter()
            .position(|part| *part == "menu")
            .and_then(|index| parts.get(index + 1))
            .copied()
    } else if has("unified") && has("menu") && parts.len() >= 5 {
        // e.g. /unified/menu/k12/milpitas
        parts.last().copied()
    } else {
        None
    };

    let menu_id = menu_id
        .filter(|code| !code.is_empty())
        .ok_or(ConfigError::InvalidMenuId)?;

    Ok(MenuUrl {
        building_id,
        menu_id: MenuIdentifier(menu_id.to_owned()),
    })
}

/// Check a days-to-show value, falling back to the default when absent.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDays`] outside `1..=7`.
pub fn validate_days(days: Option<i64>) -> Result<u8, ConfigError> {
    let Some(days) = days else {
        return Ok(DEFAULT_DAYS_TO_SHOW);
    };

    u8::try_from(days)
        .ok()
        .filter(|value| (MIN_DAYS_TO_SHOW..=MAX_DAYS_TO_SHOW).contains(value))
        .ok_or(ConfigError::InvalidDays(days))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Raw user input of the setup form.
pub struct ConfigInput {
    /// Public menu URL copied from the browser.
    pub menu_url: String,
    /// Requested days; defaults to one.
    #[serde(default)]
    pub days_to_show: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Validated configuration entry.
pub struct MenuConfig {
    /// Entry title, e.g. `School Menu (ABC123)`.
    pub title: String,
    /// Public menu URL.
    pub menu_url: String,
    /// Building id from the URL.
    pub building_id: BuildingId,
    /// Days shown per poll.
    pub days_to_show: u8,
    /// Menu code from the URL path.
    pub menu_id: MenuIdentifier,
}

impl MenuConfig {
    /// Request issued on every poll cycle.
    #[must_use]
    pub fn request(&self) -> MenuRequest {
        MenuRequest {
            menu_url: self.menu_url.clone(),
            building_id: self.building_id.clone(),
            days: self.days_to_show,
        }
    }
}

/// Validate the form input without touching the network.
///
/// # Errors
///
/// Returns a [`ConfigError`] for a malformed URL or out of range days.
pub fn parse_input(input: &ConfigInput) -> Result<MenuConfig, ConfigError> {
    let days_to_show = validate_days(input.days_to_show)?;
    let MenuUrl {
        building_id,
        menu_id,
    } = parse_menu_url(&input.menu_url)?;

    Ok(MenuConfig {
        title: format!("School Menu ({menu_id})"),
        menu_url: input.menu_url.clone(),
        building_id,
        days_to_show,
        menu_id,
    })
}

/// Validate the form input and prove the API answers for it.
///
/// Meant for the one-time setup step: a day without service (weekend,
/// holiday) fails the one-day menu probe.
///
/// # Errors
///
/// Returns a [`ConfigError`] for malformed input or when the district lookup
/// or a one-day menu fetch comes back empty.
pub async fn validate_input(
    input: &ConfigInput,
    client: &MenuClient,
) -> Result<MenuConfig, ConfigError> {
    let config = parse_input(input)?;

    if let Err(err) = client.district_id(&config.menu_id).await {
        error!(menu_id = %config.menu_id, error = %err, "failed to test API connection");
        return Err(ConfigError::CannotConnect(format!(
            "Cannot fetch district information for menu ID: {}",
            config.menu_id
        )));
    }

    let probe = MenuRequest {
        days: 1,
        ..config.request()
    };
    if client.get_menu_data(&probe).await.menus.is_empty() {
        return Err(ConfigError::CannotConnect(
            "Cannot fetch menu data from API".to_owned(),
        ));
    }

    debug!(menu_id = %config.menu_id, "menu URL validated");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::testing::FakeApi;

    const MENU_URL: &str = "https://linqconnect.com/public/menu/ABC123?buildingId=42";

    fn menu_with_one_day() -> serde_json::Value {
        json!({
            "FamilyMenuSessions": [{
                "ServingSession": "Lunch",
                "MenuPlans": [{ "MenuPlanName": "Lunch", "Days": [{ "Date": "09/08/2025", "MenuMeals": [] }] }]
            }]
        })
    }

    #[test]
    fn public_url_is_split() {
        let parsed = parse_menu_url(MENU_URL).expect("valid url");
        assert_eq!(parsed.building_id, BuildingId("42".to_owned()));
        assert_eq!(parsed.menu_id, MenuIdentifier("ABC123".to_owned()));
    }

    #[test]
    fn unified_url_uses_last_segment() {
        let parsed =
            parse_menu_url("https://www.linqconnect.com/unified/menu/k12/milpitas?buildingId=7")
                .expect("valid url");
        assert_eq!(parsed.menu_id, MenuIdentifier("milpitas".to_owned()));
        assert_eq!(parsed.building_id, BuildingId("7".to_owned()));
    }

    #[test]
    fn url_errors_have_distinct_codes() {
        let cases = [
            ("not a url", "invalid_url"),
            ("https://example.com/public/menu/ABC?buildingId=1", "invalid_host"),
            ("https://linqconnect.com/public/menu/ABC123", "invalid_building_id"),
            ("https://linqconnect.com/public/menu/ABC123?buildingId=", "invalid_building_id"),
            ("https://linqconnect.com/public/menu/?buildingId=1", "invalid_menu_id"),
            ("https://linqconnect.com/unified/menu/k12?buildingId=1", "invalid_menu_id"),
            ("https://linqconnect.com/somewhere?buildingId=1", "invalid_menu_id"),
        ];

        for (url, code) in cases {
            let err = parse_menu_url(url).expect_err(url);
            assert_eq!(err.code(), code, "{url}");
            assert_eq!(err.field(), "menu_url", "{url}");
        }
    }

    #[test]
    fn days_are_bounded() {
        assert_eq!(validate_days(None).expect("default"), 1);
        assert_eq!(validate_days(Some(7)).expect("max"), 7);
        for bad in [0, 8, -1, 300] {
            let err = validate_days(Some(bad)).expect_err("out of range");
            assert_eq!(err.code(), "invalid_days");
        }
    }

    #[tokio::test]
    async fn validation_probes_the_api() {
        let mut api = FakeApi::with_district("d-1");
        api.menu = Some(menu_with_one_day());
        let client = MenuClient::new(Arc::new(api));

        let config = validate_input(
            &ConfigInput {
                menu_url: MENU_URL.to_owned(),
                days_to_show: Some(3),
            },
            &client,
        )
        .await
        .expect("valid config");

        assert_eq!(config.title, "School Menu (ABC123)");
        assert_eq!(config.days_to_show, 3);
        assert_eq!(config.request().days, 3);
        assert_eq!(config.request().building_id, BuildingId("42".to_owned()));
    }

    #[tokio::test]
    async fn unreachable_district_cannot_connect() {
        let client = MenuClient::new(Arc::new(FakeApi::default()));
        let input = ConfigInput {
            menu_url: MENU_URL.to_owned(),
            days_to_show: None,
        };

        let err = validate_input(&input, &client).await.expect_err("no district");
        assert_eq!(err.code(), "cannot_connect");
        assert_eq!(err.field(), "base");
    }

    #[tokio::test]
    async fn empty_menu_cannot_connect() {
        let mut api = FakeApi::with_district("d-1");
        api.menu = Some(json!({ "FamilyMenuSessions": [] }));
        let client = MenuClient::new(Arc::new(api));
        let input = ConfigInput {
            menu_url: MENU_URL.to_owned(),
            days_to_show: None,
        };

        let err = validate_input(&input, &client).await.expect_err("empty menu");
        assert!(
            matches!(&err, ConfigError::CannotConnect(message) if message.contains("menu data")),
            "got {err:?}"
        );
    }

    #[test]
    fn offline_parse_builds_the_entry() {
        let config = parse_input(&ConfigInput {
            menu_url: MENU_URL.to_owned(),
            days_to_show: Some(2),
        })
        .expect("valid config");

        assert_eq!(config.title, "School Menu (ABC123)");
        assert_eq!(config.menu_id, MenuIdentifier("ABC123".to_owned()));
        assert_eq!(config.request().days, 2);

        let err = parse_input(&ConfigInput {
            menu_url: MENU_URL.to_owned(),
            days_to_show: Some(9),
        })
        .expect_err("too many days");
        assert_eq!(err.code(), "invalid_days");
    }

    #[tokio::test]
    async fn day_without_service_only_fails_the_setup_probe() {
        let mut api = FakeApi::with_district("d-1");
        api.menu = Some(json!({
            "FamilyMenuSessions": [{
                "ServingSession": "Lunch",
                "MenuPlans": [{ "MenuPlanName": "Lunch", "Days": [] }]
            }]
        }));
        let client = MenuClient::new(Arc::new(api));
        let input = ConfigInput {
            menu_url: MENU_URL.to_owned(),
            days_to_show: None,
        };

        let err = validate_input(&input, &client).await.expect_err("no service today");
        assert_eq!(err.code(), "cannot_connect");

        let config = parse_input(&input).expect("offline config");
        assert_eq!(config.days_to_show, 1);
    }
}
