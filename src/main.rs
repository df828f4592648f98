mod app;
mod cli;
mod columns;
mod config;
mod drawer;
mod error;
mod input;
mod k8s;
mod list_view;
mod model;
mod resource;
mod route;
mod sort;
mod status;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppCommand};
use clap::Parser;
use cli::CliArgs;
use config::{CliOverrides, RuntimeConfigSnapshot, RuntimeConfigWatcher};
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use error::ApiError;
use futures::{StreamExt, TryStreamExt};
use k8s::KubeGateway;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::{Namespace, Pod};
use k8s_openapi::api::scheduling::v1::PriorityClass;
use kube::runtime::watcher::{Config as WatchConfig, watcher};
use kube::{Api, Client};
use model::{NamespaceScope, ResourceKind};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
const TABLE_REFRESH_TIMEOUT: Duration = Duration::from_secs(4);
const MUTATION_TIMEOUT: Duration = Duration::from_secs(8);

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let mut config_watcher = RuntimeConfigWatcher::discover();
    let config = match config_watcher.load_current() {
        Ok(config) => config,
        Err(error) => {
            warn!("ignoring runtime config: {}", compact_error(&error));
            RuntimeConfigSnapshot::default()
        }
    };

    let gateway = KubeGateway::new().await?;
    if args.all_namespaces && args.namespace.is_some() {
        warn!("both --all-namespaces and --namespace were provided, using all namespaces");
    }
    let namespace_scope = resolve_namespace_scope(&args, &gateway);

    let kind = config.resolve_kind(&args.kind).unwrap_or_else(|| {
        warn!("unknown resource kind {:?}, starting with pods", args.kind);
        ResourceKind::Pods
    });
    let overrides = CliOverrides {
        drawer_enabled: args.no_drawer.then_some(false),
        wide_columns: args.wide_columns,
    };

    let mut app = App::new(
        gateway.cluster().to_string(),
        gateway.context().to_string(),
        namespace_scope,
        kind,
        config,
        overrides,
    );

    run(&mut app, &gateway, &mut config_watcher, args.refresh_ms.max(500)).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    // The terminal belongs to the UI; without a log file events are dropped.
    let _ = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::sink).try_init(),
    };

    Ok(())
}

fn resolve_namespace_scope(args: &CliArgs, gateway: &KubeGateway) -> NamespaceScope {
    if args.all_namespaces {
        NamespaceScope::All
    } else if let Some(namespace) = &args.namespace {
        NamespaceScope::Named(namespace.clone())
    } else {
        NamespaceScope::Named(gateway.default_namespace().to_string())
    }
}

async fn run(
    app: &mut App,
    gateway: &KubeGateway,
    config_watcher: &mut RuntimeConfigWatcher,
    refresh_ms: u64,
) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, gateway, config_watcher, refresh_ms).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    gateway: &KubeGateway,
    config_watcher: &mut RuntimeConfigWatcher,
    refresh_ms: u64,
) -> Result<()> {
    let (width, _) = crossterm::terminal::size().context("failed to read terminal size")?;
    app.set_viewport_width(width);
    app.set_status("Loading resources…");
    refresh_kind(app, gateway, app.active_kind()).await;

    let mut reader = EventStream::new();
    let mut ticker = interval(Duration::from_millis(refresh_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let (watch_tx, mut watch_rx) = mpsc::unbounded_channel::<ResourceKind>();
    let watch_tasks = start_resource_watchers(gateway.client(), watch_tx);
    let mut watch_throttle = HashMap::<ResourceKind, Instant>::new();

    let result = loop {
        if let Err(error) = terminal.draw(|frame| ui::render(frame, app)) {
            break Err(error).context("failed to render terminal frame");
        }

        if !app.running() {
            break Ok(());
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            execute_app_command(app, gateway, command).await;
                        }
                    }
                    Some(Ok(Event::Resize(width, _))) => app.set_viewport_width(width),
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break Ok(());
                    }
                }
            }
            _ = ticker.tick() => {
                reload_config(app, config_watcher);
                let active = app.active_kind();
                refresh_kind(app, gateway, active).await;
            }
            maybe_kind = watch_rx.recv() => {
                if let Some(kind) = maybe_kind
                    && kind == app.active_kind()
                    && should_process_watch_event(kind, &mut watch_throttle) {
                    refresh_kind(app, gateway, kind).await;
                }
            }
        }
    };

    for task in watch_tasks {
        task.abort();
    }
    result
}

fn reload_config(app: &mut App, config_watcher: &mut RuntimeConfigWatcher) {
    match config_watcher.reload_if_changed() {
        Ok(Some(config)) => {
            app.apply_config(config);
            app.set_status("Runtime config reloaded");
        }
        Ok(None) => {}
        Err(error) => {
            let message = compact_error(&error);
            warn!("runtime config reload failed: {message}");
            app.set_status(format!("Config reload failed: {message}"));
        }
    }
}

async fn execute_app_command(app: &mut App, gateway: &KubeGateway, command: AppCommand) {
    match command {
        AppCommand::None => {}
        AppCommand::RefreshActive => {
            let active = app.active_kind();
            refresh_kind(app, gateway, active).await;
        }
        AppCommand::Delete { id } => {
            match timeout(MUTATION_TIMEOUT, gateway.delete(&id)).await {
                Ok(Ok(())) => {
                    info!(resource = %id, kind = %id.kind, "deleted");
                    app.set_status(format!("Deleted {} {}", id.kind.title(), id));
                    refresh_kind(app, gateway, id.kind).await;
                }
                Ok(Err(error)) => {
                    app.set_status(format!("Delete failed for {}: {error}", id));
                }
                Err(_) => app.set_status(format!("Delete timed out for {}", id)),
            }
        }
        AppCommand::CreateNamespace { name } => {
            match timeout(MUTATION_TIMEOUT, gateway.create_namespace(&name)).await {
                Ok(Ok(())) => {
                    info!(namespace = %name, "namespace created");
                    app.set_status(format!("Created namespace {name}"));
                    refresh_kind(app, gateway, ResourceKind::Namespaces).await;
                }
                Ok(Err(error)) => {
                    app.set_status(format!("Create namespace failed: {error}"));
                }
                Err(_) => app.set_status(format!("Create namespace {name} timed out")),
            }
        }
        AppCommand::Scale { id, replicas } => {
            match timeout(MUTATION_TIMEOUT, gateway.scale(&id, replicas)).await {
                Ok(Ok(())) => {
                    info!(resource = %id, replicas, "scaled");
                    app.set_status(format!("Scaled {} to {replicas} replicas", id));
                    refresh_kind(app, gateway, id.kind).await;
                }
                Ok(Err(error)) => {
                    app.set_status(format!("Scale failed for {}: {error}", id));
                }
                Err(_) => app.set_status(format!("Scale timed out for {}", id)),
            }
        }
    }
}

/// A timed-out list keeps the previous snapshot when there is one.
async fn refresh_kind(app: &mut App, gateway: &KubeGateway, kind: ResourceKind) {
    let scope = app.namespace_scope().clone();
    match timeout(TABLE_REFRESH_TIMEOUT, gateway.list(kind, &scope)).await {
        Ok(Ok(models)) => {
            debug!(kind = %kind, rows = models.len(), "list refreshed");
            app.set_snapshot(kind, Ok(models));
        }
        Ok(Err(error)) => {
            warn!(kind = %kind, status = ?error.status_code, "list failed: {error}");
            app.set_snapshot(kind, Err(error));
        }
        Err(_) => {
            if app.has_snapshot(kind) {
                app.set_status(format!(
                    "Refresh timed out for {} (showing cached data)",
                    kind.title()
                ));
            } else {
                app.set_snapshot(kind, Err(ApiError::timeout(kind)));
            }
        }
    }
}

fn should_process_watch_event(
    kind: ResourceKind,
    throttle: &mut HashMap<ResourceKind, Instant>,
) -> bool {
    let now = Instant::now();
    let min_interval = Duration::from_millis(350);
    let Some(last) = throttle.get(&kind) else {
        throttle.insert(kind, now);
        return true;
    };

    if now.duration_since(*last) >= min_interval {
        throttle.insert(kind, now);
        true
    } else {
        false
    }
}

fn start_resource_watchers(
    client: Client,
    tx: mpsc::UnboundedSender<ResourceKind>,
) -> Vec<JoinHandle<()>> {
    ResourceKind::ALL
        .into_iter()
        .map(|kind| match kind {
            ResourceKind::Pods => spawn_watch_task::<Pod>(client.clone(), kind, tx.clone()),
            ResourceKind::Deployments => {
                spawn_watch_task::<Deployment>(client.clone(), kind, tx.clone())
            }
            ResourceKind::ReplicaSets => {
                spawn_watch_task::<ReplicaSet>(client.clone(), kind, tx.clone())
            }
            ResourceKind::Namespaces => {
                spawn_watch_task::<Namespace>(client.clone(), kind, tx.clone())
            }
            ResourceKind::PriorityClasses => {
                spawn_watch_task::<PriorityClass>(client.clone(), kind, tx.clone())
            }
        })
        .collect()
}

fn spawn_watch_task<K>(
    client: Client,
    kind: ResourceKind,
    tx: mpsc::UnboundedSender<ResourceKind>,
) -> JoinHandle<()>
where
    K: Clone + std::fmt::Debug + serde::de::DeserializeOwned + kube::Resource + Send + 'static,
    <K as kube::Resource>::DynamicType: Default + Eq + std::hash::Hash + Clone + Send,
{
    tokio::spawn(async move {
        loop {
            let api: Api<K> = Api::all(client.clone());
            let mut events = watcher(api, WatchConfig::default()).boxed();
            loop {
                match events.try_next().await {
                    Ok(Some(_)) => {
                        if tx.send(kind).is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(error) => {
                        warn!("watch stream error for {}: {error}", kind.title());
                        break;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(900)).await;
        }
    })
}

fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("; ")
}

#[cfg(test)]
mod tests {
    use super::{compact_error, should_process_watch_event};
    use crate::model::ResourceKind;
    use anyhow::Context;
    use std::collections::HashMap;

    #[test]
    fn watch_events_are_throttled_per_kind() {
        let mut throttle = HashMap::new();
        assert!(should_process_watch_event(ResourceKind::Pods, &mut throttle));
        assert!(!should_process_watch_event(ResourceKind::Pods, &mut throttle));
        assert!(should_process_watch_event(ResourceKind::Deployments, &mut throttle));
    }

    #[test]
    fn compact_error_keeps_two_causes() {
        let error = Err::<(), _>(std::io::Error::other("disk"))
            .context("read")
            .context("load")
            .context("start")
            .unwrap_err();
        assert_eq!(
            compact_error(&error),
            "start; caused by: load; caused by: read"
        );
    }
}
