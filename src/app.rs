use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::columns::{CellValue, RenderContext};
use crate::config::{CliOverrides, RuntimeConfigSnapshot};
use crate::drawer::{DrawerController, DrawerState, DrawerStore, Effect, Subscription, Transition};
use crate::error::ApiError;
use crate::input::Action;
use crate::list_view::{ListView, TableRow, TableView};
use crate::model::{NamespaceScope, ResourceId, ResourceKind};
use crate::resource::ResourceModel;
use crate::route::{History, ListRoute};
use crate::sort::SortDirection;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Command,
    Filter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    RefreshActive,
    Delete { id: ResourceId },
    CreateNamespace { name: String },
    Scale { id: ResourceId, replicas: i32 },
}

#[derive(Debug, Clone)]
struct PendingConfirmation {
    prompt: String,
    command: AppCommand,
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    models: Option<Vec<ResourceModel>>,
    error: Option<ApiError>,
    refreshed_at: Option<DateTime<Local>>,
}

pub struct App {
    running: bool,
    mode: InputMode,
    active_kind: ResourceKind,
    namespace_scope: NamespaceScope,
    input: String,
    status: String,
    show_help: bool,
    pending_confirmation: Option<PendingConfirmation>,
    cluster: String,
    context: String,
    lists: HashMap<ResourceKind, ListView>,
    snapshots: HashMap<ResourceKind, Snapshot>,
    table: TableView,
    store: DrawerStore,
    drawer: DrawerController,
    drawer_dirty: Rc<Cell<bool>>,
    _drawer_subscription: Subscription,
    pending_transitions: Vec<Transition>,
    history: History,
    detail: Option<ResourceId>,
    config: RuntimeConfigSnapshot,
    overrides: CliOverrides,
    viewport_width: u16,
    table_page_size: usize,
}

impl App {
    pub fn new(
        cluster: String,
        context: String,
        namespace_scope: NamespaceScope,
        kind: ResourceKind,
        config: RuntimeConfigSnapshot,
        overrides: CliOverrides,
    ) -> Self {
        let lists = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, list_for(kind, &config)))
            .collect::<HashMap<_, _>>();
        let route = ListRoute::new(cluster.clone(), kind);
        let store = DrawerStore::new(overrides.drawer_enabled(&config), false, route.path());
        let drawer_dirty = Rc::new(Cell::new(false));
        let subscription = {
            let dirty = Rc::clone(&drawer_dirty);
            store.subscribe(move |_| dirty.set(true))
        };

        let mut app = Self {
            running: true,
            mode: InputMode::Normal,
            active_kind: kind,
            namespace_scope,
            input: String::new(),
            status: "Ready".to_string(),
            show_help: false,
            pending_confirmation: None,
            drawer: DrawerController::new(store.clone(), cluster.clone(), kind),
            cluster,
            context,
            lists,
            snapshots: HashMap::new(),
            table: TableView::default(),
            store,
            drawer_dirty,
            _drawer_subscription: subscription,
            pending_transitions: Vec::new(),
            history: History::new(route.path()),
            detail: None,
            config,
            overrides,
            viewport_width: 0,
            table_page_size: 10,
        };
        app.rebuild_table();
        app
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn active_kind(&self) -> ResourceKind {
        self.active_kind
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn namespace_scope(&self) -> &NamespaceScope {
        &self.namespace_scope
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn pending_confirmation_prompt(&self) -> Option<&str> {
        self.pending_confirmation
            .as_ref()
            .map(|pending| pending.prompt.as_str())
    }

    pub fn location(&self) -> &str {
        self.history.current()
    }

    pub fn filter(&self) -> &str {
        self.active_list().filter()
    }

    pub fn sort_column(&self) -> Option<&str> {
        self.active_list()
            .sort_state()
            .map(|sort| sort.column.as_str())
    }

    pub fn table(&self) -> &TableView {
        &self.table
    }

    pub fn selected_index(&self) -> usize {
        self.active_list().selected_index()
    }

    pub fn selected_row(&self) -> Option<&TableRow> {
        self.active_list().selected_row(&self.table)
    }

    pub fn has_snapshot(&self, kind: ResourceKind) -> bool {
        self.snapshots
            .get(&kind)
            .is_some_and(|snapshot| snapshot.models.is_some())
    }

    pub fn last_refreshed(&self) -> Option<String> {
        self.snapshots
            .get(&self.active_kind)
            .and_then(|snapshot| snapshot.refreshed_at)
            .map(|at| at.format("%H:%M:%S").to_string())
    }

    pub fn drawer_state(&self) -> DrawerState {
        self.drawer.state()
    }

    pub fn drawer_visible(&self) -> bool {
        self.drawer.visible()
    }

    pub fn drawer_target(&self) -> Option<&ResourceModel> {
        self.drawer.resolve_target(self.active_models())
    }

    pub fn detail_target(&self) -> Option<&ResourceModel> {
        let id = self.detail.as_ref()?;
        self.active_models().iter().find(|model| model.id() == id)
    }

    pub fn detail_open(&self) -> bool {
        self.detail.is_some()
    }

    pub fn set_table_page_size(&mut self, rows: usize) {
        self.table_page_size = rows.max(1);
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn set_viewport_width(&mut self, width: u16) {
        self.viewport_width = width;
        let wide = width >= self.overrides.wide_columns(&self.config);
        if wide != self.drawer.state().viewport_wide {
            debug!(width, wide, "viewport gate changed");
            let _ = self.drawer.dispatch(Transition::ViewportResize { wide });
        }
        self.flush_drawer();
    }

    pub fn set_snapshot(&mut self, kind: ResourceKind, result: Result<Vec<ResourceModel>, ApiError>) {
        let snapshot = self.snapshots.entry(kind).or_default();
        match result {
            Ok(models) => {
                snapshot.models = Some(models);
                snapshot.error = None;
            }
            Err(error) => {
                snapshot.error = Some(error);
            }
        }
        snapshot.refreshed_at = Some(Local::now());

        if kind == self.active_kind {
            self.rebuild_table();
        }
    }

    pub fn apply_config(&mut self, config: RuntimeConfigSnapshot) {
        for (kind, list) in &mut self.lists {
            list.set_column_options(&config.column_options(*kind));
            if list.sort_state().is_none()
                && let Some(sort) = config.default_sort.get(kind)
            {
                list.set_sort(&sort.column, sort.direction);
            }
        }

        let enabled = self.overrides.drawer_enabled(&config);
        info!(
            source = config.source.as_deref().unwrap_or("-"),
            drawer = enabled,
            "runtime config applied"
        );
        self.config = config;
        self.store.set_enabled_by_user(enabled);
        let width = self.viewport_width;
        self.set_viewport_width(width);
        self.rebuild_table();
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        let command = self.handle_action(action);
        self.flush_drawer();
        command
    }

    fn handle_action(&mut self, action: Action) -> AppCommand {
        if let Some(pending) = self.pending_confirmation.take() {
            match action {
                Action::ConfirmYes | Action::SelectRow => {
                    self.status = format!("Confirmed: {}", pending.prompt);
                    return pending.command;
                }
                Action::ConfirmNo | Action::CancelInput | Action::Close => {
                    self.status = "Action cancelled".to_string();
                    return AppCommand::None;
                }
                _ => {
                    self.pending_confirmation = Some(pending);
                    self.status =
                        "Pending confirmation: press y to confirm or n to cancel".to_string();
                    return AppCommand::None;
                }
            }
        }

        if self.show_help && !matches!(action, Action::ToggleHelp) {
            self.show_help = false;
        }

        match action {
            Action::Quit => {
                self.running = false;
                self.status = "Exit requested".to_string();
                AppCommand::None
            }
            Action::NextKind => self.switch_kind_by_offset(1),
            Action::PrevKind => self.switch_kind_by_offset(-1),
            Action::Down => {
                self.move_selection(1);
                AppCommand::None
            }
            Action::Up => {
                self.move_selection(-1);
                AppCommand::None
            }
            Action::PageDown => {
                self.move_selection(self.table_page_size as isize);
                AppCommand::None
            }
            Action::PageUp => {
                self.move_selection(-(self.table_page_size as isize));
                AppCommand::None
            }
            Action::Top => {
                let table = &self.table;
                if let Some(list) = self.lists.get_mut(&self.active_kind) {
                    list.select_first(table);
                }
                self.follow_selection();
                AppCommand::None
            }
            Action::Bottom => {
                let table = &self.table;
                if let Some(list) = self.lists.get_mut(&self.active_kind) {
                    list.select_last(table);
                }
                self.follow_selection();
                AppCommand::None
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::SelectRow => {
                self.select_current_row();
                AppCommand::None
            }
            Action::Close => {
                self.close_detail_or_drawer();
                AppCommand::None
            }
            Action::SortNextColumn => {
                let sorted = self.active_list_mut().sort_next_column();
                self.status = match sorted {
                    Some(column) => format!("Sorted by {column} ascending"),
                    None => "No sortable column".to_string(),
                };
                self.rebuild_table();
                AppCommand::None
            }
            Action::ReverseSort => {
                self.active_list_mut().reverse_sort();
                self.status = self.sort_status();
                self.rebuild_table();
                AppCommand::None
            }
            Action::ToggleDrawer => {
                self.set_drawer_enabled(!self.drawer.state().enabled_by_user);
                AppCommand::None
            }
            Action::StartCommand => {
                self.mode = InputMode::Command;
                self.input.clear();
                AppCommand::None
            }
            Action::StartFilter => {
                self.mode = InputMode::Filter;
                self.input = self.filter().to_string();
                AppCommand::None
            }
            Action::Refresh => AppCommand::RefreshActive,
            Action::SubmitInput => self.submit_input(),
            Action::CancelInput => {
                self.mode = InputMode::Normal;
                self.input.clear();
                AppCommand::None
            }
            Action::Backspace => {
                self.input.pop();
                AppCommand::None
            }
            Action::InputChar(c) => {
                self.input.push(c);
                AppCommand::None
            }
            Action::ConfirmYes | Action::ConfirmNo => AppCommand::None,
        }
    }

    fn submit_input(&mut self) -> AppCommand {
        match self.mode {
            InputMode::Normal => AppCommand::None,
            InputMode::Filter => {
                let filter = self.input.trim().to_string();
                self.mode = InputMode::Normal;
                self.input.clear();
                self.apply_filter(filter);
                AppCommand::None
            }
            InputMode::Command => {
                let command = self.input.trim().to_string();
                self.mode = InputMode::Normal;
                self.input.clear();
                self.execute_command_line(&command)
            }
        }
    }

    fn execute_command_line(&mut self, line: &str) -> AppCommand {
        let line = line.trim_start_matches(':').trim();
        if line.is_empty() {
            self.status = "No command entered".to_string();
            return AppCommand::None;
        }

        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default().to_ascii_lowercase();
        let args = parts.collect::<Vec<_>>();

        match (command.as_str(), args.as_slice()) {
            ("q" | "quit" | "exit", _) => {
                self.running = false;
                self.status = "Exit requested".to_string();
                AppCommand::None
            }
            ("refresh" | "reload" | "r", _) => AppCommand::RefreshActive,
            ("help" | "h", _) => {
                self.show_help = true;
                AppCommand::None
            }
            ("ns" | "namespace", [target]) => self.set_namespace_scope(target),
            ("ns" | "namespace", []) => self.switch_to_kind(ResourceKind::Namespaces),
            ("filter", rest) => {
                self.apply_filter(rest.join(" "));
                AppCommand::None
            }
            ("sort", []) | ("sort", ["off" | "none"]) => {
                self.active_list_mut().clear_sort();
                self.status = "Sort cleared".to_string();
                self.rebuild_table();
                AppCommand::None
            }
            ("sort", [column]) => {
                if self.active_list_mut().cycle_sort(column) {
                    self.status = self.sort_status();
                    self.rebuild_table();
                } else {
                    self.status = format!("Column '{column}' is unknown or not sortable");
                }
                AppCommand::None
            }
            ("sort", [column, direction]) => {
                let Some(direction) = SortDirection::parse(direction) else {
                    self.status = "Usage: :sort <column> [asc|desc]".to_string();
                    return AppCommand::None;
                };
                if self.active_list_mut().set_sort(column, direction) {
                    self.status = self.sort_status();
                    self.rebuild_table();
                } else {
                    self.status = format!("Column '{column}' is unknown or not sortable");
                }
                AppCommand::None
            }
            ("cols" | "col" | "columns", [column]) => {
                match self.active_list_mut().toggle_column(column) {
                    Some(true) => self.status = format!("Column '{column}' shown"),
                    Some(false) => self.status = format!("Column '{column}' hidden"),
                    None => self.status = format!("Unknown column '{column}'"),
                }
                self.rebuild_table();
                AppCommand::None
            }
            ("cols" | "col" | "columns", _) => {
                self.status = format!("Columns: {}", self.column_summary());
                AppCommand::None
            }
            ("drawer", ["on"]) => {
                self.set_drawer_enabled(true);
                AppCommand::None
            }
            ("drawer", ["off"]) => {
                self.set_drawer_enabled(false);
                AppCommand::None
            }
            ("drawer", _) => {
                self.status = "Usage: :drawer on|off".to_string();
                AppCommand::None
            }
            ("create", ["ns" | "namespace", name]) => {
                self.status = format!("Creating namespace {name}");
                AppCommand::CreateNamespace {
                    name: (*name).to_string(),
                }
            }
            ("create", _) => {
                self.status = "Usage: :create ns <name>".to_string();
                AppCommand::None
            }
            ("delete" | "del", _) => self.prepare_delete_confirmation(),
            ("scale", [replicas]) => match replicas.parse::<i32>() {
                Ok(replicas) => self.prepare_scale_command(replicas),
                Err(_) => {
                    self.status = "Usage: :scale <replicas>".to_string();
                    AppCommand::None
                }
            },
            (token, []) => match self.config.resolve_kind(token) {
                Some(kind) => self.switch_to_kind(kind),
                None => {
                    self.status = format!("Unknown command ':{line}'");
                    AppCommand::None
                }
            },
            _ => {
                self.status = format!("Unknown command ':{line}'");
                AppCommand::None
            }
        }
    }

    fn set_namespace_scope(&mut self, target: &str) -> AppCommand {
        self.namespace_scope = match target {
            "all" | "*" | "-A" => NamespaceScope::All,
            namespace => NamespaceScope::Named(namespace.to_string()),
        };
        for kind in ResourceKind::ALL.into_iter().filter(|kind| kind.namespaced()) {
            self.snapshots.remove(&kind);
        }
        self.status = format!("Namespace: {}", self.namespace_scope);
        self.rebuild_table();
        AppCommand::RefreshActive
    }

    fn set_drawer_enabled(&mut self, enabled: bool) {
        self.store.set_enabled_by_user(enabled);
        self.status = if enabled {
            "Drawer enabled".to_string()
        } else {
            "Drawer disabled".to_string()
        };
    }

    fn apply_filter(&mut self, filter: String) {
        self.status = if filter.is_empty() {
            "Filter cleared".to_string()
        } else {
            format!("Filter: '{filter}'")
        };
        self.active_list_mut().set_filter(filter);
        self.rebuild_table();
    }

    fn prepare_delete_confirmation(&mut self) -> AppCommand {
        let Some(row) = self.selected_row() else {
            self.status = "No selected resource to delete".to_string();
            return AppCommand::None;
        };

        let id = row.id.clone();
        let prompt = format!("Delete {} {}", id.kind.title(), id);
        self.pending_confirmation = Some(PendingConfirmation {
            prompt: prompt.clone(),
            command: AppCommand::Delete { id },
        });
        self.status = format!("{prompt}? [y/n]");
        AppCommand::None
    }

    fn prepare_scale_command(&mut self, replicas: i32) -> AppCommand {
        if replicas < 0 {
            self.status = "Replicas must be >= 0".to_string();
            return AppCommand::None;
        }

        if !matches!(
            self.active_kind,
            ResourceKind::Deployments | ResourceKind::ReplicaSets
        ) {
            self.status = "Scale is available only for Deployments and Replica Sets".to_string();
            return AppCommand::None;
        }

        let Some(row) = self.selected_row() else {
            self.status = "No selected workload".to_string();
            return AppCommand::None;
        };

        let id = row.id.clone();
        self.status = format!("Scaling {} {} to {} replicas", id.kind.title(), id, replicas);
        AppCommand::Scale { id, replicas }
    }

    fn switch_kind_by_offset(&mut self, delta: isize) -> AppCommand {
        let kinds = ResourceKind::ALL;
        let current = kinds
            .iter()
            .position(|kind| *kind == self.active_kind)
            .unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(kinds.len() as isize) as usize;
        self.switch_to_kind(kinds[next])
    }

    fn switch_to_kind(&mut self, kind: ResourceKind) -> AppCommand {
        if kind == self.active_kind && self.detail.is_none() {
            self.status = format!("Already viewing {}", kind.title());
            return AppCommand::None;
        }

        let path = ListRoute::new(self.cluster.clone(), kind).path();
        self.navigate(path);
        self.flush_drawer();

        self.active_kind = kind;
        self.detail = None;
        self.drawer = DrawerController::new(self.store.clone(), self.cluster.clone(), kind);
        self.status = format!("Viewing {}", kind.title());
        self.rebuild_table();
        AppCommand::RefreshActive
    }

    fn navigate(&mut self, path: String) {
        self.history.push(path.clone());
        self.pending_transitions.push(Transition::RouteChange(path));
    }

    fn select_current_row(&mut self) {
        let Some(row) = self.selected_row() else {
            self.status = "No selected resource".to_string();
            return;
        };
        let id = row.id.clone();
        let link = row.cells.iter().find_map(|cell| match cell {
            CellValue::Link(link) => Some(link.route.clone()),
            _ => None,
        });

        let state = self.drawer.state();
        if state.enabled_by_user && state.viewport_wide {
            self.pending_transitions.push(Transition::SelectRow(id));
            return;
        }

        // Without a usable drawer the row opens as its own page.
        let path = link.unwrap_or_else(|| self.drawer.route().resource_path(&id));
        self.navigate(path);
        self.detail = Some(id);
    }

    fn close_detail_or_drawer(&mut self) {
        if self.detail.take().is_some() {
            let previous = self.history.back().map(str::to_string);
            let path = match previous {
                Some(path) => path,
                None => {
                    let path = self.drawer.route().path();
                    self.history.replace(path.clone());
                    path
                }
            };
            self.pending_transitions.push(Transition::RouteChange(path));
            return;
        }

        if self.drawer.state().is_open() {
            self.pending_transitions.push(Transition::CloseDrawer);
            return;
        }

        if !self.filter().is_empty() {
            self.apply_filter(String::new());
        }
    }

    fn follow_selection(&mut self) {
        if !self.drawer.visible() {
            return;
        }
        if let Some(row) = self.selected_row() {
            let id = row.id.clone();
            self.pending_transitions.push(Transition::SelectRow(id));
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let table = &self.table;
        if let Some(list) = self.lists.get_mut(&self.active_kind) {
            list.move_cursor(table, delta);
        }
        self.follow_selection();
    }

    fn flush_drawer(&mut self) {
        if !self.pending_transitions.is_empty() {
            let transitions = std::mem::take(&mut self.pending_transitions);
            for effect in self.drawer.dispatch_batch(transitions) {
                match effect {
                    Effect::ReplaceUrl(path) => self.history.replace(path),
                }
            }
        }

        if self.drawer_dirty.replace(false) {
            self.rebuild_table();
            let state = self.drawer.state();
            if let Some(target) = state.target()
                && let Some(list) = self.lists.get_mut(&self.active_kind)
            {
                list.select_id(&self.table, target);
            }
        }
    }

    fn rebuild_table(&mut self) {
        let context = RenderContext::new(self.cluster.clone(), self.drawer.state().enabled_by_user);
        let snapshot = self.snapshots.get(&self.active_kind);
        let models = snapshot.and_then(|snapshot| snapshot.models.as_deref());
        let error = snapshot.and_then(|snapshot| snapshot.error.as_ref());

        let Some(list) = self.lists.get_mut(&self.active_kind) else {
            return;
        };
        self.table = list.render(models, error, &context);
        list.sync_cursor(&self.table);
    }

    fn active_models(&self) -> &[ResourceModel] {
        self.snapshots
            .get(&self.active_kind)
            .and_then(|snapshot| snapshot.models.as_deref())
            .unwrap_or(&[])
    }

    fn active_list(&self) -> &ListView {
        &self.lists[&self.active_kind]
    }

    fn active_list_mut(&mut self) -> &mut ListView {
        self.lists
            .entry(self.active_kind)
            .or_insert_with(|| list_for(self.active_kind, &self.config))
    }

    fn sort_status(&self) -> String {
        match self.active_list().sort_state() {
            Some(sort) => format!(
                "Sorted by {} {}",
                sort.column,
                match sort.direction {
                    SortDirection::Ascending => "ascending",
                    SortDirection::Descending => "descending",
                }
            ),
            None => "Unsorted".to_string(),
        }
    }

    fn column_summary(&self) -> String {
        let list = self.active_list();
        list.columns()
            .iter()
            .map(|column| {
                if list.column_visible(column) {
                    column.id.to_string()
                } else {
                    format!("({})", column.id)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn list_for(kind: ResourceKind, config: &RuntimeConfigSnapshot) -> ListView {
    let mut list = ListView::new(kind, &config.column_options(kind));
    if let Some(sort) = config.default_sort.get(&kind) {
        list.set_sort(&sort.column, sort.direction);
    }
    list
}

#[cfg(test)]
mod tests {
    use super::{App, AppCommand, InputMode};
    use crate::config::{CliOverrides, RuntimeConfigSnapshot};
    use crate::drawer::DrawerPhase;
    use crate::input::Action;
    use crate::model::{NamespaceScope, ResourceId, ResourceKind};
    use crate::resource::fixtures::{deployment, pod};
    use serde_json::json;

    fn app(kind: ResourceKind) -> App {
        let mut app = App::new(
            "prod".to_string(),
            "prod-admin".to_string(),
            NamespaceScope::Named("default".to_string()),
            kind,
            RuntimeConfigSnapshot::default(),
            CliOverrides::default(),
        );
        app.set_viewport_width(200);
        app
    }

    fn type_command(app: &mut App, line: &str) -> AppCommand {
        app.apply_action(Action::StartCommand);
        for c in line.chars() {
            app.apply_action(Action::InputChar(c));
        }
        app.apply_action(Action::SubmitInput)
    }

    fn with_pods(app: &mut App) {
        app.set_snapshot(
            ResourceKind::Pods,
            Ok(vec![
                pod("api", json!({ "phase": "Running" })),
                pod("web", json!({ "phase": "Running" })),
            ]),
        );
    }

    #[test]
    fn enter_opens_drawer_and_rewrites_location() {
        let mut app = app(ResourceKind::Pods);
        with_pods(&mut app);
        app.apply_action(Action::Down);
        app.apply_action(Action::SelectRow);

        assert!(app.drawer_visible());
        assert_eq!(app.location(), "/c/prod/pods/default/web");
        assert_eq!(app.drawer_target().map(|model| model.name()), Some("web"));

        app.apply_action(Action::Close);
        assert!(!app.drawer_visible());
        assert_eq!(app.location(), "/c/prod/pods");
    }

    #[test]
    fn narrow_terminal_hides_drawer_until_widened() {
        let mut app = app(ResourceKind::Pods);
        with_pods(&mut app);
        app.apply_action(Action::SelectRow);
        app.set_viewport_width(80);

        assert!(!app.drawer_visible());
        assert!(app.drawer_state().is_open());

        app.set_viewport_width(200);
        assert!(app.drawer_visible());
    }

    #[test]
    fn cursor_moves_retarget_open_drawer() {
        let mut app = app(ResourceKind::Pods);
        with_pods(&mut app);
        app.apply_action(Action::SelectRow);
        app.apply_action(Action::Down);

        assert_eq!(
            app.drawer_state().phase,
            DrawerPhase::Open(ResourceId::new(ResourceKind::Pods, Some("default"), "web"))
        );
    }

    #[test]
    fn switching_kind_closes_drawer() {
        let mut app = app(ResourceKind::Pods);
        with_pods(&mut app);
        app.apply_action(Action::SelectRow);
        let command = type_command(&mut app, "deploy");

        assert_eq!(command, AppCommand::RefreshActive);
        assert_eq!(app.active_kind(), ResourceKind::Deployments);
        assert_eq!(app.drawer_state().phase, DrawerPhase::Closed);
        assert_eq!(app.location(), "/c/prod/deployments");
    }

    #[test]
    fn disabled_drawer_opens_full_detail_and_esc_goes_back() {
        let mut app = app(ResourceKind::Pods);
        with_pods(&mut app);
        type_command(&mut app, "drawer off");
        app.apply_action(Action::SelectRow);

        assert!(app.detail_open());
        assert!(!app.drawer_visible());
        assert_eq!(app.location(), "/c/prod/pods/default/api");
        assert_eq!(app.detail_target().map(|model| model.name()), Some("api"));

        app.apply_action(Action::Close);
        assert!(!app.detail_open());
        assert_eq!(app.location(), "/c/prod/pods");
    }

    #[test]
    fn sort_and_filter_commands_update_table() {
        let mut app = app(ResourceKind::Deployments);
        app.set_snapshot(
            ResourceKind::Deployments,
            Ok(vec![
                deployment("three", Some(3), Some(1)),
                deployment("two", Some(2), Some(1)),
            ]),
        );

        type_command(&mut app, "sort pods desc");
        let names: Vec<&str> = app.table().rows.iter().map(|row| row.id.name.as_str()).collect();
        assert_eq!(names, vec!["three", "two"]);
        assert!(app.table().headers.iter().any(|header| header.label == "Pods ▼"));

        type_command(&mut app, "filter two");
        assert_eq!(app.table().rows.len(), 1);
        assert_eq!(app.mode(), InputMode::Normal);
    }

    #[test]
    fn delete_requires_confirmation() {
        let mut app = app(ResourceKind::Pods);
        with_pods(&mut app);
        assert_eq!(type_command(&mut app, "delete"), AppCommand::None);
        assert_eq!(
            app.pending_confirmation_prompt(),
            Some("Delete Pods default/api")
        );

        let command = app.apply_action(Action::ConfirmYes);
        assert_eq!(
            command,
            AppCommand::Delete {
                id: ResourceId::new(ResourceKind::Pods, Some("default"), "api")
            }
        );
    }

    #[test]
    fn scale_is_limited_to_workloads() {
        let mut app = app(ResourceKind::Pods);
        with_pods(&mut app);
        assert_eq!(type_command(&mut app, "scale 2"), AppCommand::None);

        let mut app = self::app(ResourceKind::Deployments);
        app.set_snapshot(
            ResourceKind::Deployments,
            Ok(vec![deployment("api", Some(1), Some(1))]),
        );
        assert_eq!(
            type_command(&mut app, "scale 3"),
            AppCommand::Scale {
                id: ResourceId::new(ResourceKind::Deployments, Some("default"), "api"),
                replicas: 3
            }
        );
    }

    #[test]
    fn namespace_commands_change_scope_or_list() {
        let mut app = app(ResourceKind::Pods);
        assert_eq!(type_command(&mut app, "ns all"), AppCommand::RefreshActive);
        assert_eq!(app.namespace_scope(), &NamespaceScope::All);

        type_command(&mut app, "ns");
        assert_eq!(app.active_kind(), ResourceKind::Namespaces);

        assert_eq!(
            type_command(&mut app, "create ns team-a"),
            AppCommand::CreateNamespace {
                name: "team-a".to_string()
            }
        );
    }

    #[test]
    fn transport_error_shows_table_message() {
        let mut app = app(ResourceKind::Pods);
        with_pods(&mut app);
        app.set_snapshot(
            ResourceKind::Pods,
            Err(crate::error::ApiError::new(Some(403), "forbidden")),
        );
        assert!(app.table().rows.is_empty());
        assert_eq!(
            app.table().error.as_deref(),
            Some("Error: No permissions to list pods")
        );
    }
}
