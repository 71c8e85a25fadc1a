//! Provider implementation for LINQ Connect using the family menu API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use linqmenu_core::{
    client::MenuClient,
    model::{BuildingId, DateRange, DistrictId, MenuIdentifier},
    ports::{LinqApi, PictureStore, PortError},
};

/// Public API root of LINQ Connect.
pub const BASE_URL: &str = "https://api.linqconnect.com/api";

const QUERY_DATE_FORMAT: &str = "%m-%d-%Y";

/// HTTP implementation of the LINQ Connect endpoints.
#[derive(Debug, Clone)]
pub struct LinqConnectApi {
    client: Client,
    base_url: String,
}

impl LinqConnectApi {
    /// Create an API bound to the given HTTP client and the public endpoint.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, BASE_URL)
    }

    /// Create an API talking to a different root, e.g. a staging host.
    #[must_use]
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn district_request(&self, identifier: &MenuIdentifier) -> RequestBuilder {
        self.client
            .get(format!("{}/FamilyMenuIdentifier", self.base_url))
            .query(&[("identifier", identifier.0.as_str())])
    }

    fn menu_request(
        &self,
        building: &BuildingId,
        district: &DistrictId,
        range: DateRange,
    ) -> RequestBuilder {
        let start = range.start.format(QUERY_DATE_FORMAT).to_string();
        let end = range.end.format(QUERY_DATE_FORMAT).to_string();

        self.client
            .get(format!("{}/FamilyMenu", self.base_url))
            .query(&[
                ("buildingId", building.0.as_str()),
                ("districtId", district.0.as_str()),
                ("startDate", start.as_str()),
                ("endDate", end.as_str()),
            ])
    }

    fn recipe_request(&self, district: &DistrictId, item_id: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/FamilyMenuRecipe", self.base_url))
            .query(&[("districtId", district.0.as_str()), ("itemId", item_id)])
    }
}

#[async_trait]
impl LinqApi for LinqConnectApi {
    async fn district_lookup(&self, identifier: &MenuIdentifier) -> Result<Value, PortError> {
        fetch_json(self.district_request(identifier)).await
    }

    async fn family_menu(
        &self,
        building: &BuildingId,
        district: &DistrictId,
        range: DateRange,
    ) -> Result<Value, PortError> {
        fetch_json(self.menu_request(building, district, range)).await
    }

    async fn recipe(&self, district: &DistrictId, item_id: &str) -> Result<Value, PortError> {
        fetch_json(self.recipe_request(district, item_id)).await
    }
}

/// Build a menu client talking to LINQ Connect, optionally storing pictures.
#[must_use]
pub fn menu_client(client: Client, pictures: Option<Arc<dyn PictureStore>>) -> MenuClient {
    let menu_client = MenuClient::new(Arc::new(LinqConnectApi::new(client)));

    match pictures {
        Some(store) => menu_client.with_pictures(store),
        None => menu_client,
    }
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json(req: RequestBuilder) -> Result<Value, PortError> {
    let response = req.send().await.map_err(PortError::from)?;

    let status = response.status();
    debug!(url = %response.url(), status = status.as_u16(), "LINQ Connect response");
    let body = response.bytes().await.map_err(PortError::from)?;
    decode_body(status, &body)
}

fn decode_body(status: StatusCode, body: &[u8]) -> Result<Value, PortError> {
    if !status.is_success() {
        return Err(PortError::Status(status.as_u16()));
    }
    serde_json::from_slice(body).map_err(PortError::from)
}
