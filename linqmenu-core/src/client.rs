//! Menu client: identifier → district → menu window → pictures.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use tracing::{Instrument, Span, debug, error, info_span};

use crate::model::{DateRange, DistrictId, MenuIdentifier, MenuRequest, MenuSnapshot};
use crate::parse::{id_text, parse_family_menu};
use crate::pictures::enrich_day;
use crate::ports::{LinqApi, MenuSource, PictureStore, PortError};

const PUBLIC_MENU_PATH: &str = "/public/menu/";

/// Extract the menu code from a `/public/menu/<CODE>` URL.
///
/// The code is a run of upper-case ASCII letters and digits; any other URL
/// shape yields `None`.
#[must_use]
pub fn extract_menu_identifier(menu_url: &str) -> Option<MenuIdentifier> {
    menu_url
        .match_indices(PUBLIC_MENU_PATH)
        .find_map(|(position, marker)| {
            let rest = menu_url.get(position + marker.len()..)?;
            let code: String = rest
                .chars()
                .take_while(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit())
                .collect();
            (!code.is_empty()).then_some(MenuIdentifier(code))
        })
}

/// Fetches and normalizes LINQ Connect menus.
///
/// All log output of a fetch cycle is emitted inside the client's span.
#[derive(Clone)]
pub struct MenuClient {
    api: Arc<dyn LinqApi>,
    pictures: Option<Arc<dyn PictureStore>>,
    span: Span,
}

impl MenuClient {
    /// Client without picture downloads, logging under a `linqconnect` span.
    #[must_use]
    pub fn new(api: Arc<dyn LinqApi>) -> Self {
        Self {
            api,
            pictures: None,
            span: info_span!("linqconnect"),
        }
    }

    /// Download item pictures into `store`.
    #[must_use]
    pub fn with_pictures(mut self, store: Arc<dyn PictureStore>) -> Self {
        self.pictures = Some(store);
        self
    }

    /// Emit logs inside `span` instead of the default one.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Resolve the district id for a menu identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the lookup fails or carries no `DistrictId`.
    pub async fn district_id(&self, identifier: &MenuIdentifier) -> Result<DistrictId, PortError> {
        let body = self.api.district_lookup(identifier).await?;

        let district = body.get("DistrictId").map(id_text).unwrap_or_default();
        if district.is_empty() {
            return Err(PortError::MissingDistrict(identifier.clone()));
        }

        debug!(district = %district, "found district id");
        Ok(DistrictId(district))
    }

    /// Run a full fetch cycle.
    ///
    /// Every failure is logged and turned into an empty snapshot.
    pub async fn get_menu_data(&self, request: &MenuRequest) -> MenuSnapshot {
        let today = Local::now().date_naive();

        let cycle = async {
            match self.try_get_menu_data(request, today).await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    error!(error = %err, "failed to fetch menu data");
                    MenuSnapshot::empty(request.days)
                }
            }
        };

        cycle.instrument(self.span.clone()).await
    }

    async fn try_get_menu_data(
        &self,
        request: &MenuRequest,
        today: NaiveDate,
    ) -> Result<MenuSnapshot, PortError> {
        let identifier = extract_menu_identifier(&request.menu_url)
            .ok_or_else(|| PortError::MissingIdentifier(request.menu_url.clone()))?;

        let district = self.district_id(&identifier).await?;

        let range = DateRange::starting(today, request.days);
        debug!(
            building = %request.building_id,
            district = %district,
            start = %range.start,
            end = %range.end,
            "fetching menu window"
        );
        let body = self
            .api
            .family_menu(&request.building_id, &district, range)
            .await?;

        let mut menus = Vec::new();
        for mut draft in parse_family_menu(&body, request.days, today) {
            let pictures = match &self.pictures {
                Some(store) => {
                    enrich_day(self.api.as_ref(), store.as_ref(), &district, &mut draft).await
                }
                None => Vec::new(),
            };
            menus.push(draft.finish(pictures));
        }

        Ok(MenuSnapshot {
            menus,
            last_updated: Local::now(),
            days_requested: request.days,
        })
    }
}

#[async_trait]
impl MenuSource for MenuClient {
    async fn fetch(&self, request: &MenuRequest) -> Result<MenuSnapshot, PortError> {
        Ok(self.get_menu_data(request).await)
    }
}
