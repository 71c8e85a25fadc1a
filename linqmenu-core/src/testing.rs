//! In-memory doubles of the API and picture-store ports used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::model::{BuildingId, DateRange, DistrictId, MenuIdentifier};
use crate::ports::{LinqApi, PictureStore, PortError};

/// Scripted LINQ Connect backend.
#[derive(Default)]
pub(crate) struct FakeApi {
    /// Body of the district lookup; `None` simulates a connection failure.
    pub district: Option<Value>,
    /// Body of the menu call; `None` answers with HTTP 500.
    pub menu: Option<Value>,
    /// Recipe bodies by item id; unknown ids answer with HTTP 404.
    pub recipes: HashMap<String, Value>,
    /// Every request made, in order.
    pub calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub(crate) fn with_district(district: &str) -> Self {
        Self {
            district: Some(json!({ "DistrictId": district })),
            ..Self::default()
        }
    }

    pub(crate) fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl LinqApi for FakeApi {
    async fn district_lookup(&self, identifier: &MenuIdentifier) -> Result<Value, PortError> {
        self.record(format!("district:{identifier}"));
        self.district
            .clone()
            .ok_or_else(|| PortError::Internal("connection refused".to_owned()))
    }

    async fn family_menu(
        &self,
        building: &BuildingId,
        district: &DistrictId,
        range: DateRange,
    ) -> Result<Value, PortError> {
        self.record(format!(
            "menu:{building}:{district}:{}:{}",
            range.start, range.end
        ));
        self.menu.clone().ok_or(PortError::Status(500))
    }

    async fn recipe(&self, district: &DistrictId, item_id: &str) -> Result<Value, PortError> {
        self.record(format!("recipe:{district}:{item_id}"));
        self.recipes
            .get(item_id)
            .cloned()
            .ok_or(PortError::Status(404))
    }
}

/// Picture store keeping files in memory.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl PictureStore for MemoryStore {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String, PortError> {
        self.files
            .lock()
            .expect("files lock")
            .insert(filename.to_owned(), bytes.to_vec());
        Ok(format!("/local/school_menus/{filename}"))
    }
}
