//! Terminal host for linqmenu: polls a school menu and shows the published sensor state.

mod app;
mod input;
mod settings;
mod ui;

use std::{
    io::{self, Write as _},
    path::Path,
    sync::Arc,
    time::Duration as StdDuration,
};

use anyhow::{Result, anyhow};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{info, info_span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use linqmenu_core::{
    client::MenuClient,
    config::{ConfigInput, MenuConfig, parse_input, validate_input},
    ports::PictureStore,
    scheduler::{IntervalScheduler, PollOutcome, UpdateFailed},
    sensor::MenuSensor,
    service::MenuService,
};
use linqmenu_provider_linqconnect as linqconnect;

use crate::app::App;
use crate::input::Action;
use crate::settings::{Cli, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;
    let _guard = init_tracing(&cli.log_file)?;

    // HTTP + service setup
    let client = Client::builder()
        .user_agent("linqmenu/0.1")
        .timeout(settings.request_timeout)
        .build()?;

    let pictures = settings
        .pictures
        .clone()
        .map(|store| Arc::new(store) as Arc<dyn PictureStore>);
    let menu_client = linqconnect::menu_client(client, pictures).with_span(info_span!(
        "linqconnect",
        entry = %settings.entry_id
    ));

    let config = startup_config(&settings.input, cli.check, &menu_client).await?;
    info!(title = %config.title, days = config.days_to_show, "menu configured");

    let service = MenuService::new(Arc::new(menu_client), config.request());
    let sensor = MenuSensor::new(&settings.entry_id, config.menu_url.clone());

    if cli.once {
        return print_once(&service, sensor).await;
    }

    // Poll loop feeds the UI through a channel
    let (tx, rx) = mpsc::unbounded_channel();
    let mut outcomes = service.watch(&IntervalScheduler, settings.interval);
    let poller = tokio::spawn(async move {
        while let Some(outcome) = outcomes.next().await {
            if tx.send(outcome).is_err() {
                break;
            }
        }
    });

    let app = App::new(sensor, config.title);

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run(&mut terminal, app, rx);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    poller.abort();
    res
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    mut outcomes: mpsc::UnboundedReceiver<PollOutcome>,
) -> Result<()> {
    loop {
        while let Ok(outcome) = outcomes.try_recv() {
            app.apply(outcome);
        }

        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (small timeout keeps CPU low and picks up new outcomes)
        if event::poll(StdDuration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
            && input::handle_key_event(key, &mut app) == Action::Quit
        {
            break;
        }
    }

    Ok(())
}

async fn print_once(service: &MenuService, mut sensor: MenuSensor) -> Result<()> {
    let outcome = match service.refresh().await {
        Ok(snapshot) => PollOutcome::Snapshot(snapshot),
        Err(err) => PollOutcome::Failed(UpdateFailed(err.to_string())),
    };
    sensor.apply(outcome);

    let state = serde_json::to_string_pretty(&sensor.state())?;
    writeln!(io::stdout().lock(), "{state}")?;
    Ok(())
}

/// Offline validation by default; the API probe only runs on request.
async fn startup_config(
    input: &ConfigInput,
    check: bool,
    client: &MenuClient,
) -> Result<MenuConfig> {
    let config = if check {
        validate_input(input, client).await
    } else {
        parse_input(input)
    };
    config.map_err(|err| anyhow!("{} [{}]: {err}", err.field(), err.code()))
}

fn init_tracing(log_file: &Path) -> Result<WorkerGuard> {
    let directory = log_file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .ok_or_else(|| anyhow!("log file path has no file name: {}", log_file.display()))?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_err| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MENU_URL: &str = "https://linqconnect.com/public/menu/ABC123?buildingId=42";

    fn offline_client() -> MenuClient {
        let api = linqconnect::LinqConnectApi::with_base_url(Client::new(), "http://127.0.0.1:9/api");
        MenuClient::new(Arc::new(api))
    }

    #[tokio::test]
    async fn startup_does_not_need_the_api() {
        let input = ConfigInput {
            menu_url: MENU_URL.to_owned(),
            days_to_show: Some(3),
        };

        let config = startup_config(&input, false, &offline_client())
            .await
            .expect("offline startup");
        assert_eq!(config.days_to_show, 3);

        let err = startup_config(&input, true, &offline_client())
            .await
            .expect_err("probe needs the API");
        assert!(err.to_string().contains("cannot_connect"), "got {err}");
    }

    #[tokio::test]
    async fn startup_still_rejects_bad_urls() {
        let input = ConfigInput {
            menu_url: "https://example.com/public/menu/ABC123?buildingId=42".to_owned(),
            days_to_show: None,
        };

        let err = startup_config(&input, false, &offline_client())
            .await
            .expect_err("wrong host");
        assert!(err.to_string().contains("invalid_host"), "got {err}");
    }
}
