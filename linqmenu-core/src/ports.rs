//! Traits describing the remote API, picture storage, and menu sources.

use async_trait::async_trait;
use base64::DecodeError;
use reqwest::Error as ReqwestError;
use serde_json::Value;

use crate::model::{BuildingId, DateRange, DistrictId, MenuIdentifier, MenuRequest, MenuSnapshot};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to the menu backend or storing pictures.
pub enum PortError {
    /// Network layer failed, including timeouts.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Backend answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(u16),
    /// Response body was not the JSON we expected.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The menu URL did not contain a menu identifier.
    #[error("Menu identifier not found in URL: {0}")]
    MissingIdentifier(String),
    /// District lookup succeeded but carried no district id.
    #[error("District id not found for identifier {0}")]
    MissingDistrict(MenuIdentifier),
    /// Picture payload was not valid base64.
    #[error("Picture decode error: {0}")]
    PictureDecode(#[from] DecodeError),
    /// Picture could not be written.
    #[error("Picture IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Picture file name would resolve outside the picture directory.
    #[error("Unsafe picture file name: {0}")]
    UnsafeFileName(String),
    /// Internal backend error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
/// Raw LINQ Connect endpoints; implementations perform the HTTP calls.
pub trait LinqApi: Send + Sync {
    /// Look up the district for a menu identifier.
    ///
    /// Returns the raw `FamilyMenuIdentifier` response body.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or the status is not success.
    async fn district_lookup(&self, identifier: &MenuIdentifier) -> Result<Value, PortError>;

    /// Fetch the family menu window for a building.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or the status is not success.
    async fn family_menu(
        &self,
        building: &BuildingId,
        district: &DistrictId,
        range: DateRange,
    ) -> Result<Value, PortError>;

    /// Fetch recipe details, including the base64 `Picture` field.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the request fails or the status is not success.
    async fn recipe(&self, district: &DistrictId, item_id: &str) -> Result<Value, PortError>;
}

#[async_trait]
/// Host-managed location for downloaded thumbnails.
pub trait PictureStore: Send + Sync {
    /// Store the decoded image bytes and return the URL they are served under.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Io`] when the file cannot be written.
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String, PortError>;
}

#[async_trait]
/// Anything able to produce a complete menu snapshot for a request.
pub trait MenuSource: Send + Sync {
    /// Run one full fetch cycle.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] only for failures the source does not absorb itself.
    async fn fetch(&self, request: &MenuRequest) -> Result<MenuSnapshot, PortError>;
}
