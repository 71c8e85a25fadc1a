use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use linqmenu_core::{
    config::{ConfigInput, UPDATE_INTERVAL},
    pictures::{DEFAULT_URL_PREFIX, FsPictureStore},
};
use serde::Deserialize;

const DEFAULT_ENTRY_ID: &str = "default";
// aiohttp's default total timeout
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Poll a LINQ Connect school menu and show it as a sensor.
#[derive(Debug, Parser)]
#[command(name = "linqmenu", version, about)]
pub(crate) struct Cli {
    /// TOML settings file.
    #[arg(short, long, env = "LINQMENU_CONFIG")]
    pub config: Option<PathBuf>,

    /// Public menu URL, e.g. https://linqconnect.com/public/menu/ABC123?buildingId=42
    #[arg(long, env = "LINQMENU_MENU_URL")]
    pub menu_url: Option<String>,

    /// Days to show (1-7).
    #[arg(long)]
    pub days: Option<i64>,

    /// Host configuration directory; pictures go to `<dir>/www/school_menus`.
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Do not download item pictures.
    #[arg(long)]
    pub no_pictures: bool,

    /// Probe the API (district lookup and today's menu) before starting.
    #[arg(long)]
    pub check: bool,

    /// Fetch once, print the sensor state as JSON and exit.
    #[arg(long)]
    pub once: bool,

    /// Where log output is written.
    #[arg(long, default_value = "linqmenu.log")]
    pub log_file: PathBuf,
}

/// Contents of the optional TOML settings file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileSettings {
    pub menu_url: Option<String>,
    pub days_to_show: Option<i64>,
    pub config_dir: Option<PathBuf>,
    pub media_dir: Option<PathBuf>,
    pub url_prefix: Option<String>,
    pub entry_id: Option<String>,
    pub update_interval_minutes: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub pictures: Option<bool>,
}

impl FileSettings {
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings file {}", path.display()))
    }
}

/// Effective settings after merging file and command line.
#[derive(Debug)]
pub(crate) struct Settings {
    pub input: ConfigInput,
    pub pictures: Option<FsPictureStore>,
    pub entry_id: String,
    pub interval: Duration,
    pub request_timeout: Duration,
}

impl Settings {
    pub(crate) fn load(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileSettings::from_path(path)?,
            None => FileSettings::default(),
        };
        Self::merge(cli, file)
    }

    pub(crate) fn merge(cli: &Cli, file: FileSettings) -> Result<Self> {
        let Some(menu_url) = cli.menu_url.clone().or(file.menu_url) else {
            bail!("no menu URL configured; pass --menu-url or set menu_url in the settings file");
        };

        let pictures_enabled = !cli.no_pictures && file.pictures.unwrap_or(true);
        let pictures = pictures_enabled.then(|| {
            let url_prefix = file
                .url_prefix
                .unwrap_or_else(|| DEFAULT_URL_PREFIX.to_owned());
            match (file.media_dir, cli.config_dir.clone().or(file.config_dir)) {
                (Some(media_dir), _) => FsPictureStore::new(media_dir, url_prefix),
                (None, Some(config_dir)) => {
                    let conventional = FsPictureStore::for_config_dir(&config_dir);
                    FsPictureStore::new(conventional.dir(), url_prefix)
                }
                (None, None) => {
                    let conventional = FsPictureStore::for_config_dir(Path::new("."));
                    FsPictureStore::new(conventional.dir(), url_prefix)
                }
            }
        });

        let interval = file
            .update_interval_minutes
            .map_or(UPDATE_INTERVAL, |minutes| Duration::from_secs(minutes.saturating_mul(60)));

        Ok(Self {
            input: ConfigInput {
                menu_url,
                days_to_show: cli.days.or(file.days_to_show),
            },
            pictures,
            entry_id: file
                .entry_id
                .unwrap_or_else(|| DEFAULT_ENTRY_ID.to_owned()),
            interval,
            request_timeout: file
                .request_timeout_secs
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs),
        })
    }
}
