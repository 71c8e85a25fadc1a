//! Thumbnail download for the most interesting items of a menu day.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::future::join_all;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::model::{DistrictId, MenuItem};
use crate::parse::DayDraft;
use crate::ports::{LinqApi, PictureStore, PortError};

/// At most this many items per day get a picture lookup.
pub const MAX_PICTURES_PER_DAY: usize = 4;

/// Category names that put an item at the front of the picture queue.
pub const ENTREE_CATEGORIES: [&str; 4] = ["main entree", "main entrée", "entree", "entrée"];

/// Default URL prefix under which the host serves `www/school_menus`.
pub const DEFAULT_URL_PREFIX: &str = "/local/school_menus";

/// Whether the category counts as an entree.
#[must_use]
pub fn is_entree(category: &str) -> bool {
    let normalized = category.trim().to_lowercase();
    ENTREE_CATEGORIES.contains(&normalized.as_str())
}

/// Indices of the items that should get a picture lookup, in priority order.
///
/// Entree items come first, everything else follows; both groups keep
/// encounter order.
#[must_use]
pub fn picture_candidates(items: &[MenuItem]) -> Vec<usize> {
    let indices_where = |entree: bool| {
        items
            .iter()
            .enumerate()
            .filter(move |(_, item)| is_entree(&item.category) == entree)
            .map(|(index, _)| index)
    };

    indices_where(true)
        .chain(indices_where(false))
        .take(MAX_PICTURES_PER_DAY)
        .collect()
}

/// File name for an item's picture: item id plus a short digest of the name.
///
/// Only ASCII alphanumerics, `_` and `-` of the id are kept. Returns `None`
/// when nothing usable is left.
#[must_use]
pub fn picture_filename(item_id: &str, item_name: &str) -> Option<String> {
    let safe_id: String = item_id
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-'))
        .collect();
    if safe_id.is_empty() {
        return None;
    }

    let digest = Sha256::digest(item_name.as_bytes());
    let short: Vec<u8> = digest.iter().take(4).copied().collect();
    Some(format!("{safe_id}_{}.png", hex::encode(short)))
}

/// Fetch, decode and store pictures for the day's candidates.
///
/// Items that end up with a picture get their `picture_url` set; the returned
/// list holds those items in priority order. Failures only cost the picture.
pub async fn enrich_day(
    api: &dyn LinqApi,
    store: &dyn PictureStore,
    district: &DistrictId,
    day: &mut DayDraft,
) -> Vec<MenuItem> {
    let candidates: Vec<(usize, String, String)> = picture_candidates(&day.items)
        .into_iter()
        .filter_map(|index| {
            let item = day.items.get(index)?;
            (!item.item_id.is_empty()).then(|| (index, item.item_id.clone(), item.name.clone()))
        })
        .collect();

    let lookups = candidates.iter().map(|(index, item_id, name)| async move {
        let payload = fetch_picture(api, district, item_id).await?;
        let url = store_picture(store, item_id, name, &payload).await?;
        Some((*index, url))
    });

    let found: Vec<(usize, String)> = join_all(lookups).await.into_iter().flatten().collect();

    for (index, url) in &found {
        if let Some(item) = day.items.get_mut(*index) {
            debug!(item = %item.name, url = %url, "added picture URL");
            item.picture_url = Some(url.clone());
        }
    }

    candidates
        .iter()
        .filter_map(|(index, _, _)| day.items.get(*index))
        .filter(|item| item.picture_url.is_some())
        .cloned()
        .collect()
}

async fn fetch_picture(api: &dyn LinqApi, district: &DistrictId, item_id: &str) -> Option<String> {
    let body = match api.recipe(district, item_id).await {
        Ok(body) => body,
        Err(err) => {
            debug!(item_id, error = %err, "error fetching recipe picture");
            return None;
        }
    };

    let picture = body
        .get("Picture")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|payload| !payload.is_empty());

    if picture.is_none() {
        debug!(item_id, "no picture data found");
    }
    picture.map(str::to_owned)
}

async fn store_picture(
    store: &dyn PictureStore,
    item_id: &str,
    name: &str,
    payload: &str,
) -> Option<String> {
    let Some(filename) = picture_filename(item_id, name) else {
        debug!(item_id, "item id unusable as a file name");
        return None;
    };

    let saved = async {
        let bytes = STANDARD.decode(payload)?;
        store.save(&filename, &bytes).await
    };

    match saved.await {
        Ok(url) => Some(url),
        Err(err) => {
            warn!(item = name, error = %err, "failed to save picture file");
            None
        }
    }
}

/// Picture store writing PNG files into a directory served by the host.
#[derive(Debug, Clone)]
pub struct FsPictureStore {
    dir: PathBuf,
    url_prefix: String,
}

impl FsPictureStore {
    /// Store files in `dir` and publish them under `url_prefix`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into(),
        }
    }

    /// Conventional layout: `<config_dir>/www/school_menus`, served as `/local/school_menus`.
    #[must_use]
    pub fn for_config_dir(config_dir: &Path) -> Self {
        Self::new(
            config_dir.join("www").join("school_menus"),
            DEFAULT_URL_PREFIX,
        )
    }

    /// Directory the pictures are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl PictureStore for FsPictureStore {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<String, PortError> {
        let mut components = Path::new(filename).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(PortError::UnsafeFileName(filename.to_owned()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(filename), bytes).await?;
        Ok(format!(
            "{}/{filename}",
            self.url_prefix.trim_end_matches('/')
        ))
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine as _;
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::testing::{FakeApi, MemoryStore};

    fn item(name: &str, item_id: &str, category: &str) -> MenuItem {
        MenuItem {
            name: name.to_owned(),
            item_id: item_id.to_owned(),
            category: category.to_owned(),
            picture_url: None,
        }
    }

    fn draft(items: Vec<MenuItem>) -> DayDraft {
        DayDraft {
            raw_date: "09/08/2025".to_owned(),
            date_key: NaiveDate::from_ymd_opt(2025, 9, 8).expect("valid date"),
            date: "Monday, September 08, 2025".to_owned(),
            session: "Lunch".to_owned(),
            plan: "Lunch".to_owned(),
            items,
        }
    }

    #[test]
    fn entrees_jump_the_queue() {
        let items = vec![
            item("Milk", "1", "Beverage"),
            item("Apple", "2", "Fruit"),
            item("Pizza", "3", "Main Entree"),
            item("Corn", "4", "Vegetable"),
            item("Burger", "5", "ENTRÉE"),
            item("Salad", "6", "Sides"),
        ];

        assert_eq!(picture_candidates(&items), vec![2, 4, 0, 1]);
    }

    #[test]
    fn entree_synonyms() {
        assert!(is_entree("Main Entree"));
        assert!(is_entree(" entrée "));
        assert!(!is_entree("Entrees & Sides"));
        assert!(!is_entree("Other"));
    }

    #[test]
    fn filename_uses_short_name_digest() {
        let name = picture_filename("12345", "Cheese Pizza").expect("usable id");
        assert!(name.starts_with("12345_"), "unexpected prefix: {name}");
        assert!(name.ends_with(".png"), "unexpected suffix: {name}");
        assert_eq!(name.len(), "12345_".len() + 8 + ".png".len());
        assert_eq!(Some(name.clone()), picture_filename("12345", "Cheese Pizza"));
        assert_ne!(Some(name), picture_filename("12345", "Pepperoni Pizza"));
    }

    #[test]
    fn filename_strips_path_characters() {
        let name = picture_filename("../../../escaped", "Pizza").expect("usable id");
        assert!(name.starts_with("escaped_"), "unexpected name: {name}");
        assert!(!name.contains('/') && !name.contains(".."), "unexpected name: {name}");

        assert_eq!(picture_filename("../..", "Pizza"), None);
        assert_eq!(picture_filename("", "Pizza"), None);
    }

    #[tokio::test]
    async fn pictures_are_attached_and_failures_skipped() {
        let mut api = FakeApi::with_district("d-1");
        api.recipes
            .insert("pizza".to_owned(), json!({ "Picture": STANDARD.encode(b"png-bytes") }));
        api.recipes
            .insert("burger".to_owned(), json!({ "Picture": "!!not base64!!" }));
        api.recipes.insert("milk".to_owned(), json!({ "Picture": "  " }));

        let store = MemoryStore::default();
        let mut day = draft(vec![
            item("Milk", "milk", "Beverage"),
            item("Pizza", "pizza", "Main Entree"),
            item("Burger", "burger", "Entree"),
            item("Napkin", "", "Other"),
            item("Corn", "corn", "Vegetable"),
        ]);

        let pictures = enrich_day(&api, &store, &DistrictId("d-1".to_owned()), &mut day).await;

        assert_eq!(pictures.len(), 1);
        let pizza = pictures.first().expect("pizza picture");
        assert_eq!(pizza.name, "Pizza");
        let expected_url = format!(
            "/local/school_menus/{}",
            picture_filename("pizza", "Pizza").expect("usable id")
        );
        assert_eq!(pizza.picture_url.as_deref(), Some(expected_url.as_str()));
        assert!(
            day.items.iter().filter(|item| item.picture_url.is_some()).count() == 1,
            "only pizza should carry a picture"
        );

        let files = store.files.lock().expect("files lock");
        assert_eq!(
            files
                .get(&picture_filename("pizza", "Pizza").expect("usable id"))
                .map(Vec::as_slice),
            Some(b"png-bytes".as_slice())
        );

        let recipe_calls: Vec<String> = api
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("recipe:"))
            .collect();
        // Napkin has no id; Corn is fifth in line
        assert_eq!(recipe_calls.len(), 3);
    }

    #[tokio::test]
    async fn filesystem_store_writes_png() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = FsPictureStore::for_config_dir(tmp.path());

        let url = store
            .save("7_abcdef01.png", b"data")
            .await
            .expect("save succeeds");

        assert_eq!(url, "/local/school_menus/7_abcdef01.png");
        let written = std::fs::read(store.dir().join("7_abcdef01.png")).expect("file exists");
        assert_eq!(written, b"data");
    }

    #[tokio::test]
    async fn filesystem_store_refuses_paths() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = FsPictureStore::for_config_dir(&tmp.path().join("cfg"));

        for filename in ["../escaped.png", "a/b.png", "/abs.png", ".."] {
            let err = store.save(filename, b"data").await.expect_err(filename);
            assert!(matches!(err, PortError::UnsafeFileName(_)), "got {err:?}");
        }
        assert!(!tmp.path().join("escaped.png").exists());
    }

    #[tokio::test]
    async fn traversal_item_ids_stay_in_picture_dir() {
        let mut api = FakeApi::with_district("d-1");
        let payload = json!({ "Picture": STANDARD.encode(b"png-bytes") });
        api.recipes.insert("../../../escaped".to_owned(), payload.clone());
        api.recipes.insert("../..".to_owned(), payload);

        let tmp = tempfile::tempdir().expect("tempdir");
        let store = FsPictureStore::for_config_dir(&tmp.path().join("cfg"));
        let mut day = draft(vec![
            item("Pizza", "../../../escaped", "Entree"),
            item("Soup", "../..", "Entree"),
        ]);

        let pictures = enrich_day(&api, &store, &DistrictId("d-1".to_owned()), &mut day).await;

        let pizza = pictures.first().expect("pizza picture");
        assert_eq!(pictures.len(), 1);
        let url = pizza.picture_url.as_deref().expect("picture url");
        assert!(url.starts_with("/local/school_menus/escaped_"), "got {url}");
        assert!(!url.contains(".."), "got {url}");

        let written: Vec<_> = std::fs::read_dir(store.dir())
            .expect("picture dir")
            .map(|entry| entry.expect("dir entry").file_name())
            .collect();
        assert_eq!(written.len(), 1);
        let stray = std::fs::read_dir(tmp.path())
            .expect("tmp dir")
            .filter(|entry| {
                entry
                    .as_ref()
                    .is_ok_and(|entry| entry.file_name().to_string_lossy().ends_with(".png"))
            })
            .count();
        assert_eq!(stray, 0);
    }
}
