use crate::dispatch::{ListQuery, OperationId, ParamBag, RequestDescriptor};
use crate::error::TransportError;
use crate::input::Action;
use crate::menu::{ActionMenu, MenuAction, deployment_actions, key_value_actions, namespace_actions};
use crate::model::{
    ConfigMapRecord, DeploymentRecord, NamespaceRecord, Record, ResourceKind, SecretRecord,
};
use crate::pagination::Pagination;
use crate::sort::SortState;
use crate::store::{CollectionHandle, CollectionStore, LoadPhase};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Menu,
    Prompt,
    Confirm,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Screen {
    Namespaces,
    Deployments { namespace: String },
    Configs { namespace: String, pane: ResourceKind },
}

impl Screen {
    /// Collections shown on the screen, in display order.
    pub fn kinds(&self) -> &'static [ResourceKind] {
        match self {
            Self::Namespaces => &[ResourceKind::Namespaces],
            Self::Deployments { .. } => &[ResourceKind::Deployments],
            Self::Configs { .. } => &[ResourceKind::ConfigMaps, ResourceKind::Secrets],
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::Namespaces => None,
            Self::Deployments { namespace } | Self::Configs { namespace, .. } => Some(namespace),
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::Namespaces => "Namespaces".to_string(),
            Self::Deployments { namespace } => format!("Deployments · {namespace}"),
            Self::Configs { namespace, .. } => format!("Configs · {namespace}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RequestPurpose {
    Load { seq: u64 },
    Mutate { operation: OperationId },
}

/// A request the terminal loop must execute and report back through
/// [`App::handle_completion`].
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub target: ResourceKind,
    pub purpose: RequestPurpose,
    pub request: RequestDescriptor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub target: ResourceKind,
    pub purpose: RequestPurpose,
    pub result: Result<Value, TransportError>,
}

impl Completion {
    pub fn of(outbound: &OutboundRequest, result: Result<Value, TransportError>) -> Self {
        Self {
            target: outbound.target,
            purpose: outbound.purpose,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    None,
    Send(Vec<OutboundRequest>),
}

impl AppCommand {
    fn send(requests: Vec<OutboundRequest>) -> Self {
        if requests.is_empty() {
            Self::None
        } else {
            Self::Send(requests)
        }
    }
}

/// Per-table state, created when the table's screen is mounted.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub sort: SortState,
    pub pagination: Pagination,
    pub menu: ActionMenu,
    pub selected: usize,
}

impl ViewState {
    fn new(kind: ResourceKind, page_size: usize) -> Self {
        Self {
            sort: kind.initial_sort(),
            pagination: Pagination::new(page_size),
            menu: ActionMenu::default(),
            selected: 0,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DialogKind {
    CloneNamespace {
        source: String,
    },
    UpdateImage {
        deployment: String,
        namespace: String,
        container: String,
        current: String,
    },
    UpdateKeyValue {
        kind: ResourceKind,
        object: String,
        namespace: String,
        key: String,
        current: String,
    },
}

impl DialogKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::CloneNamespace { .. } => "Clone namespace",
            Self::UpdateImage { .. } => "Update deployment image",
            Self::UpdateKeyValue {
                kind: ResourceKind::Secrets,
                ..
            } => "Update secret",
            Self::UpdateKeyValue { .. } => "Update config map",
        }
    }

    pub fn prompt(&self) -> String {
        match self {
            Self::CloneNamespace { source } => format!("Target namespace for a copy of {source}"),
            Self::UpdateImage {
                deployment,
                container,
                current,
                ..
            } => format!("New image for {deployment}/{container} (now {current})"),
            Self::UpdateKeyValue {
                object,
                key,
                current,
                ..
            } => format!("New value for {object}.{key} (now {current})"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Dialog {
    pub kind: DialogKind,
    pub input: String,
}

#[derive(Debug, Clone)]
struct PendingConfirmation {
    prompt: String,
    target: ResourceKind,
    operation: OperationId,
    params: ParamBag,
}

pub struct App {
    running: bool,
    screen: Screen,
    page_size: usize,
    backend: String,
    status: String,
    show_help: bool,
    namespaces: CollectionStore<NamespaceRecord>,
    deployments: CollectionStore<DeploymentRecord>,
    config_maps: CollectionStore<ConfigMapRecord>,
    secrets: CollectionStore<SecretRecord>,
    views: HashMap<ResourceKind, ViewState>,
    dialog: Option<Dialog>,
    pending_confirmation: Option<PendingConfirmation>,
}

impl App {
    pub fn new(page_size: usize, backend: String) -> Self {
        Self {
            running: true,
            screen: Screen::Namespaces,
            page_size,
            backend,
            status: "Ready".to_string(),
            show_help: false,
            namespaces: CollectionStore::new(),
            deployments: CollectionStore::new(),
            config_maps: CollectionStore::new(),
            secrets: CollectionStore::new(),
            views: HashMap::new(),
            dialog: None,
            pending_confirmation: None,
        }
    }

    /// Mounts the first screen: the namespace list, or the deployments of
    /// `namespace` when one is given.
    pub fn start(&mut self, namespace: Option<String>) -> AppCommand {
        self.start_in(namespace, ResourceKind::Deployments)
    }

    /// Like [`App::start`], opening `view` inside the namespace.
    pub fn start_in(&mut self, namespace: Option<String>, view: ResourceKind) -> AppCommand {
        let Some(namespace) = namespace else {
            return self.mount(Screen::Namespaces);
        };
        match view {
            ResourceKind::Namespaces => self.mount(Screen::Namespaces),
            ResourceKind::Deployments => self.mount(Screen::Deployments { namespace }),
            pane @ (ResourceKind::ConfigMaps | ResourceKind::Secrets) => {
                self.mount(Screen::Configs { namespace, pane })
            }
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    pub fn confirmation_prompt(&self) -> Option<&str> {
        self.pending_confirmation
            .as_ref()
            .map(|pending| pending.prompt.as_str())
    }

    pub fn mode(&self) -> InputMode {
        if self.pending_confirmation.is_some() {
            InputMode::Confirm
        } else if self.dialog.is_some() {
            InputMode::Prompt
        } else if self
            .view(self.active_kind())
            .is_some_and(|view| view.menu.open_key().is_some())
        {
            InputMode::Menu
        } else {
            InputMode::Normal
        }
    }

    pub fn active_kind(&self) -> ResourceKind {
        match &self.screen {
            Screen::Namespaces => ResourceKind::Namespaces,
            Screen::Deployments { .. } => ResourceKind::Deployments,
            Screen::Configs { pane, .. } => *pane,
        }
    }

    pub fn view(&self, kind: ResourceKind) -> Option<&ViewState> {
        self.views.get(&kind)
    }

    pub fn store(&self, kind: ResourceKind) -> &dyn CollectionHandle {
        match kind {
            ResourceKind::Namespaces => &self.namespaces,
            ResourceKind::Deployments => &self.deployments,
            ResourceKind::ConfigMaps => &self.config_maps,
            ResourceKind::Secrets => &self.secrets,
        }
    }

    fn store_mut(&mut self, kind: ResourceKind) -> &mut dyn CollectionHandle {
        match kind {
            ResourceKind::Namespaces => &mut self.namespaces,
            ResourceKind::Deployments => &mut self.deployments,
            ResourceKind::ConfigMaps => &mut self.config_maps,
            ResourceKind::Secrets => &mut self.secrets,
        }
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = normalize_status_text(status.into());
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if let Some(pending) = self.pending_confirmation.take() {
            return match action {
                Action::ConfirmYes => {
                    self.set_status(format!("Confirmed: {}", pending.prompt));
                    self.send_mutate(pending.target, pending.operation, &pending.params)
                }
                Action::ConfirmNo | Action::CancelInput => {
                    self.set_status("Action cancelled");
                    AppCommand::None
                }
                Action::Quit => {
                    self.running = false;
                    AppCommand::None
                }
                _ => {
                    self.pending_confirmation = Some(pending);
                    self.set_status("Pending confirmation: press y to confirm or n to cancel");
                    AppCommand::None
                }
            };
        }

        if self.dialog.is_some() {
            return self.apply_dialog_action(action);
        }

        if self.show_help && !matches!(action, Action::ToggleHelp) {
            self.show_help = false;
        }

        match action {
            Action::Quit => {
                self.running = false;
                self.set_status("Exit requested");
                AppCommand::None
            }
            Action::Down => {
                self.move_selection(1);
                AppCommand::None
            }
            Action::Up => {
                self.move_selection(-1);
                AppCommand::None
            }
            Action::ToggleMenu => {
                self.toggle_menu();
                AppCommand::None
            }
            Action::MenuNext => {
                self.move_menu_highlight(1);
                AppCommand::None
            }
            Action::MenuPrev => {
                self.move_menu_highlight(-1);
                AppCommand::None
            }
            Action::CloseMenu => {
                self.close_menu();
                AppCommand::None
            }
            Action::FireMenu => self.fire_menu(),
            Action::NextPage => self.change_page(true),
            Action::PrevPage => self.change_page(false),
            Action::ToggleSort(column) => self.toggle_sort(column),
            Action::Refresh => {
                let kind = self.active_kind();
                self.set_status(format!("Refreshing {}", kind.title()));
                self.reload(kind)
            }
            Action::SwitchPane => {
                self.switch_pane();
                AppCommand::None
            }
            Action::Back => match self.screen {
                Screen::Namespaces => {
                    self.set_status("Already at the namespace list");
                    AppCommand::None
                }
                _ => self.mount(Screen::Namespaces),
            },
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::InputChar(_)
            | Action::Backspace
            | Action::SubmitInput
            | Action::CancelInput
            | Action::ConfirmYes
            | Action::ConfirmNo => AppCommand::None,
        }
    }

    /// Applies the outcome of a request issued earlier. Successful writes
    /// yield the follow-up reload.
    pub fn handle_completion(&mut self, completion: Completion) -> AppCommand {
        let Completion {
            target,
            purpose,
            result,
        } = completion;

        match purpose {
            RequestPurpose::Load { seq } => {
                self.finish_load(target, seq, result);
                AppCommand::None
            }
            RequestPurpose::Mutate { operation } => {
                let label = operation_label(operation);
                match self.store_mut(target).complete_mutate(operation, result) {
                    Ok(reload) => {
                        self.set_status(format!("{label} succeeded"));
                        let requests = reload
                            .map(|ticket| OutboundRequest {
                                target,
                                purpose: RequestPurpose::Load { seq: ticket.seq },
                                request: ticket.request,
                            })
                            .into_iter()
                            .collect();
                        AppCommand::send(requests)
                    }
                    Err(error) => {
                        self.set_status(format!("{label} failed: {error}"));
                        AppCommand::None
                    }
                }
            }
        }
    }

    fn finish_load(&mut self, kind: ResourceKind, seq: u64, result: Result<Value, TransportError>) {
        if !self.store_mut(kind).complete_load(seq, result) {
            return;
        }

        let store = self.store(kind);
        let phase = store.phase().clone();
        let keys = (0..store.len())
            .filter_map(|index| store.row_key(index))
            .collect::<Vec<_>>();

        let open_actions = self
            .views
            .get(&kind)
            .and_then(|view| view.menu.open_key())
            .filter(|open| keys.iter().any(|key| key == open))
            .map(|open| self.row_actions(kind, open).len());

        if let Some(view) = self.views.get_mut(&kind)
            && phase == LoadPhase::Loaded
        {
            view.pagination.record_loaded(keys.len());
            view.selected = view.selected.min(keys.len().saturating_sub(1));
            match open_actions {
                Some(count) => view.menu.clamp_highlight(count),
                None => view.menu = ActionMenu::default(),
            }
        }

        match phase {
            LoadPhase::Failed(error) => self.set_status(format!(
                "Failed loading {}: {error}. Press r to retry",
                kind.title()
            )),
            _ => debug!(kind = ?kind, rows = keys.len(), "collection loaded"),
        }
    }

    fn mount(&mut self, screen: Screen) -> AppCommand {
        for &kind in self.screen.kinds() {
            self.views.remove(&kind);
            self.store_mut(kind).reset();
        }
        self.screen = screen;

        let mut requests = Vec::new();
        for &kind in self.screen.kinds() {
            self.store_mut(kind).reset();
            self.views.insert(kind, ViewState::new(kind, self.page_size));
            if let Some(request) = self.issue_load(kind) {
                requests.push(request);
            }
        }
        self.set_status(format!("Viewing {}", self.screen.title()));
        AppCommand::send(requests)
    }

    fn load_params(&self, kind: ResourceKind) -> ParamBag {
        let mut params = ParamBag::new();
        if kind != ResourceKind::Namespaces
            && let Some(namespace) = self.screen.namespace()
        {
            params = params.namespace(namespace);
        }
        if let Some(view) = self.views.get(&kind) {
            params = params.list_query(ListQuery {
                page: view.pagination.page(),
                limit: view.pagination.page_size(),
                sort: view
                    .sort
                    .active()
                    .map(|(accessor, direction)| (accessor.to_string(), direction)),
            });
        }
        params
    }

    fn issue_load(&mut self, kind: ResourceKind) -> Option<OutboundRequest> {
        let params = self.load_params(kind);
        match self.store_mut(kind).begin_load(params) {
            Ok(ticket) => Some(OutboundRequest {
                target: kind,
                purpose: RequestPurpose::Load { seq: ticket.seq },
                request: ticket.request,
            }),
            Err(error) => {
                self.set_status(format!("Cannot load {}: {error}", kind.title()));
                None
            }
        }
    }

    fn reload(&mut self, kind: ResourceKind) -> AppCommand {
        AppCommand::send(self.issue_load(kind).into_iter().collect())
    }

    fn send_mutate(
        &mut self,
        target: ResourceKind,
        operation: OperationId,
        params: &ParamBag,
    ) -> AppCommand {
        let label = operation_label(operation);
        match self.store(target).begin_mutate(operation, params) {
            Ok(ticket) => {
                self.set_status(format!("{label}: sending {}", ticket.request));
                AppCommand::Send(vec![OutboundRequest {
                    target,
                    purpose: RequestPurpose::Mutate { operation },
                    request: ticket.request,
                }])
            }
            Err(error) => {
                self.set_status(format!("{label} not sent: {error}"));
                AppCommand::None
            }
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let kind = self.active_kind();
        let len = self.store(kind).len();
        let Some(view) = self.views.get_mut(&kind) else {
            return;
        };

        if len == 0 {
            view.selected = 0;
            return;
        }

        let max_index = len.saturating_sub(1) as isize;
        let current = view.selected.min(max_index as usize) as isize;
        view.selected = (current + delta).clamp(0, max_index) as usize;
    }

    fn toggle_menu(&mut self) {
        let kind = self.active_kind();
        let Some(selected) = self.view(kind).map(|view| view.selected) else {
            return;
        };
        let Some(row_key) = self.store(kind).row_key(selected) else {
            self.set_status(format!("No {} to act on", kind.title().to_lowercase()));
            return;
        };
        if let Some(view) = self.views.get_mut(&kind) {
            view.menu.toggle(&row_key);
        }
    }

    fn close_menu(&mut self) {
        let kind = self.active_kind();
        if let Some(view) = self.views.get_mut(&kind) {
            view.menu = ActionMenu::default();
        }
    }

    fn move_menu_highlight(&mut self, delta: isize) {
        let kind = self.active_kind();
        let len = self.menu_actions().len();
        if let Some(view) = self.views.get_mut(&kind) {
            view.menu.move_highlight(delta, len);
        }
    }

    /// Actions offered by the open menu of the active table.
    pub fn menu_actions(&self) -> Vec<MenuAction> {
        let kind = self.active_kind();
        match self.view(kind).and_then(|view| view.menu.open_key()) {
            Some(open) => self.row_actions(kind, open),
            None => Vec::new(),
        }
    }

    fn row_actions(&self, kind: ResourceKind, row_key: &str) -> Vec<MenuAction> {
        match kind {
            ResourceKind::Namespaces => self
                .namespaces
                .items()
                .iter()
                .find(|namespace| namespace.row_key() == row_key)
                .map(namespace_actions)
                .unwrap_or_default(),
            ResourceKind::Deployments => self
                .deployments
                .items()
                .iter()
                .find(|deployment| deployment.row_key() == row_key)
                .map(deployment_actions)
                .unwrap_or_default(),
            ResourceKind::ConfigMaps | ResourceKind::Secrets => key_value_actions(kind),
        }
    }

    fn fire_menu(&mut self) -> AppCommand {
        let kind = self.active_kind();
        let actions = self.menu_actions();
        let Some(view) = self.views.get_mut(&kind) else {
            return AppCommand::None;
        };
        let highlighted = view.menu.highlighted();
        let Some(row_key) = view.menu.fire() else {
            return AppCommand::None;
        };
        let Some(action) = actions.get(highlighted).copied() else {
            self.set_status(format!("No actions available for {row_key}"));
            return AppCommand::None;
        };
        self.run_menu_action(action, &row_key)
    }

    fn run_menu_action(&mut self, action: MenuAction, row_key: &str) -> AppCommand {
        match action {
            MenuAction::ViewDeployments => self.mount(Screen::Deployments {
                namespace: row_key.to_string(),
            }),
            MenuAction::ViewConfigs => self.mount(Screen::Configs {
                namespace: row_key.to_string(),
                pane: ResourceKind::ConfigMaps,
            }),
            MenuAction::CloneNamespace => {
                self.open_dialog(DialogKind::CloneNamespace {
                    source: row_key.to_string(),
                });
                AppCommand::None
            }
            MenuAction::UpdateDeployment => {
                match self.image_dialog(row_key) {
                    Ok(kind) => self.open_dialog(kind),
                    Err(message) => self.set_status(message),
                }
                AppCommand::None
            }
            MenuAction::ScaleUp => {
                match self.find_deployment(row_key) {
                    Some(deployment) => {
                        let prompt = format!(
                            "Scale up {}/{} to 1 replica?",
                            deployment.namespace, deployment.name
                        );
                        let params = ParamBag::new().deployment(deployment.name.clone());
                        self.pending_confirmation = Some(PendingConfirmation {
                            prompt: prompt.clone(),
                            target: ResourceKind::Deployments,
                            operation: OperationId::ScaleDeployment,
                            params,
                        });
                        self.set_status(format!("{prompt} (y/n)"));
                    }
                    None => self.set_status(format!("Deployment {row_key} is no longer listed")),
                }
                AppCommand::None
            }
            MenuAction::UpdateConfigMap | MenuAction::UpdateSecret => {
                match self.key_value_dialog(row_key) {
                    Ok(kind) => self.open_dialog(kind),
                    Err(message) => self.set_status(message),
                }
                AppCommand::None
            }
        }
    }

    fn find_deployment(&self, row_key: &str) -> Option<DeploymentRecord> {
        self.deployments
            .items()
            .iter()
            .find(|deployment| deployment.row_key() == row_key)
            .cloned()
    }

    fn image_dialog(&self, row_key: &str) -> Result<DialogKind, String> {
        let deployment = self
            .find_deployment(row_key)
            .ok_or_else(|| format!("Deployment {row_key} is no longer listed"))?;
        let (container, image) = deployment
            .primary_container()
            .ok_or_else(|| format!("Deployment {} has no containers", deployment.name))?;
        Ok(DialogKind::UpdateImage {
            deployment: deployment.name.clone(),
            namespace: deployment.namespace.clone(),
            container: container.to_string(),
            current: image.to_string(),
        })
    }

    fn key_value_dialog(&self, row_key: &str) -> Result<DialogKind, String> {
        let kind = self.active_kind();
        let entry = match kind {
            ResourceKind::ConfigMaps => self
                .config_maps
                .items()
                .iter()
                .find(|config_map| config_map.row_key() == row_key)
                .map(|config_map| (config_map.namespace.clone(), config_map.entry())),
            ResourceKind::Secrets => self
                .secrets
                .items()
                .iter()
                .find(|secret| secret.row_key() == row_key)
                .map(|secret| (secret.namespace.clone(), secret.entry())),
            ResourceKind::Namespaces | ResourceKind::Deployments => None,
        };

        let Some((namespace, entry)) = entry else {
            return Err(format!("{row_key} is no longer listed"));
        };
        let Some((key, current)) = entry else {
            return Err(format!("{row_key} has no data to update"));
        };
        let Some(namespace) = namespace.or_else(|| self.screen.namespace().map(str::to_string))
        else {
            return Err(format!("{row_key} has no namespace"));
        };

        Ok(DialogKind::UpdateKeyValue {
            kind,
            object: row_key.to_string(),
            namespace,
            key: key.to_string(),
            current: current.to_string(),
        })
    }

    fn open_dialog(&mut self, kind: DialogKind) {
        self.set_status(kind.prompt());
        self.dialog = Some(Dialog {
            kind,
            input: String::new(),
        });
    }

    fn apply_dialog_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::InputChar(c) => {
                if let Some(dialog) = self.dialog.as_mut() {
                    dialog.input.push(c);
                }
                AppCommand::None
            }
            Action::Backspace => {
                if let Some(dialog) = self.dialog.as_mut() {
                    dialog.input.pop();
                }
                AppCommand::None
            }
            Action::SubmitInput => self.submit_dialog(),
            Action::CancelInput => {
                self.dialog = None;
                self.set_status("Input cancelled");
                AppCommand::None
            }
            Action::Quit => {
                self.running = false;
                AppCommand::None
            }
            _ => AppCommand::None,
        }
    }

    fn submit_dialog(&mut self) -> AppCommand {
        let Some(dialog) = self.dialog.take() else {
            return AppCommand::None;
        };
        let value = dialog.input.trim().to_string();
        if value.is_empty() {
            self.set_status("Enter a value before submitting");
            self.dialog = Some(dialog);
            return AppCommand::None;
        }

        let (target, operation, params) = match dialog.kind {
            DialogKind::CloneNamespace { source } => (
                ResourceKind::Namespaces,
                OperationId::CloneNamespace,
                ParamBag::new().namespace(source).target_namespace(value),
            ),
            DialogKind::UpdateImage {
                deployment,
                namespace,
                container,
                ..
            } => (
                ResourceKind::Deployments,
                OperationId::UpdateDeploymentImage,
                ParamBag::new()
                    .deployment(deployment)
                    .container(container)
                    .image(value)
                    .namespace(namespace),
            ),
            DialogKind::UpdateKeyValue {
                kind,
                object,
                namespace,
                key,
                ..
            } => {
                let params = ParamBag::new()
                    .namespace(namespace)
                    .update_object(BTreeMap::from([(key, value)]));
                match kind {
                    ResourceKind::Secrets => (kind, OperationId::UpdateSecret, params.secret(object)),
                    _ => (
                        ResourceKind::ConfigMaps,
                        OperationId::UpdateConfigMap,
                        params.config_map(object),
                    ),
                }
            }
        };

        self.send_mutate(target, operation, &params)
    }

    fn change_page(&mut self, forward: bool) -> AppCommand {
        let kind = self.active_kind();
        let Some(view) = self.views.get_mut(&kind) else {
            return AppCommand::None;
        };

        let moved = if forward {
            view.pagination.next()
        } else {
            view.pagination.previous()
        };
        if !moved {
            let message = if forward {
                "No further page"
            } else {
                "Already on the first page"
            };
            self.set_status(message);
            return AppCommand::None;
        }

        view.selected = 0;
        view.menu = ActionMenu::default();
        let page = view.pagination.page();
        self.set_status(format!("{} page {page}", kind.title()));
        self.reload(kind)
    }

    fn toggle_sort(&mut self, column: u8) -> AppCommand {
        let kind = self.active_kind();
        let target = usize::from(column)
            .checked_sub(1)
            .and_then(|index| kind.columns().get(index))
            .filter(|target| target.sortable);
        let Some(target) = target else {
            self.set_status(format!("Column {column} cannot be sorted"));
            return AppCommand::None;
        };
        let Some(view) = self.views.get_mut(&kind) else {
            return AppCommand::None;
        };
        if !view.sort.toggle(target.accessor) {
            return AppCommand::None;
        }

        let direction = view.sort.direction_of(target.accessor);
        self.set_status(format!("Sorted by {} ({direction})", target.header));
        self.reload(kind)
    }

    fn switch_pane(&mut self) {
        let Screen::Configs { pane, .. } = &mut self.screen else {
            self.set_status("Only the configs screen has a second table");
            return;
        };
        *pane = match *pane {
            ResourceKind::ConfigMaps => ResourceKind::Secrets,
            _ => ResourceKind::ConfigMaps,
        };
        let title = pane.title();
        self.set_status(format!("Showing {title}"));
    }
}

fn operation_label(operation: OperationId) -> &'static str {
    match operation {
        OperationId::ListNamespaces => "List namespaces",
        OperationId::ListDeployments => "List deployments",
        OperationId::ListConfigMaps => "List config maps",
        OperationId::ListSecrets => "List secrets",
        OperationId::UpdateDeploymentImage => "Update deployment image",
        OperationId::ScaleDeployment => "Scale up deployment",
        OperationId::UpdateConfigMap => "Update config map",
        OperationId::UpdateSecret => "Update secret",
        OperationId::CloneNamespace => "Clone namespace",
    }
}

fn normalize_status_text(status: String) -> String {
    const MAX_STATUS_LEN: usize = 180;
    if status.chars().count() <= MAX_STATUS_LEN {
        return status;
    }

    let mut shortened = status
        .chars()
        .take(MAX_STATUS_LEN.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}

#[cfg(test)]
mod tests {
    use super::{
        App, AppCommand, Completion, DialogKind, InputMode, OutboundRequest, RequestPurpose,
        Screen,
    };
    use crate::dispatch::{Method, OperationId};
    use crate::error::TransportError;
    use crate::fixture::{FixtureData, FixtureTransport};
    use crate::input::Action;
    use crate::menu::MenuAction;
    use crate::model::ResourceKind;
    use crate::store::LoadPhase;
    use crate::transport::Transport;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::time::Duration;

    fn app() -> App {
        App::new(10, "test".to_string())
    }

    fn sent(command: AppCommand) -> Vec<OutboundRequest> {
        match command {
            AppCommand::Send(requests) => requests,
            AppCommand::None => Vec::new(),
        }
    }

    fn complete(
        app: &mut App,
        outbound: &OutboundRequest,
        result: Result<Value, TransportError>,
    ) -> Vec<OutboundRequest> {
        sent(app.handle_completion(Completion::of(outbound, result)))
    }

    fn namespaces(count: usize) -> Value {
        Value::Array(
            (0..count)
                .map(|index| json!({ "namespace": format!("ns-{index:02}"), "app": "api" }))
                .collect(),
        )
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.apply_action(Action::InputChar(c));
        }
    }

    /// Opens the deployments of `team-a` with a single scaled-down deployment.
    fn deployments_screen() -> App {
        let mut app = app();
        let load = sent(app.start(Some("team-a".to_string()))).remove(0);
        complete(
            &mut app,
            &load,
            Ok(json!({
                "deployments": [{
                    "name": "api",
                    "namespace": "team-a",
                    "containers": [{ "web": "nginx:1.25" }],
                    "replicas": 0
                }]
            })),
        );
        app
    }

    #[test]
    fn start_loads_first_namespace_page_with_initial_sort() {
        let mut app = app();
        let requests = sent(app.start(None));

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target, ResourceKind::Namespaces);
        assert_eq!(
            requests[0].request.to_string(),
            "GET /api/v1/namespaces?page=1&limit=10&sortBy=app&order=asc"
        );
        assert_eq!(
            app.store(ResourceKind::Namespaces).phase(),
            &LoadPhase::Loading
        );
    }

    #[test]
    fn start_in_opens_the_requested_pane_of_a_namespace() {
        let mut app = app();
        let requests = sent(app.start_in(Some("team-a".to_string()), ResourceKind::Secrets));

        assert_eq!(
            app.screen(),
            &Screen::Configs {
                namespace: "team-a".to_string(),
                pane: ResourceKind::Secrets,
            }
        );
        assert_eq!(app.active_kind(), ResourceKind::Secrets);
        assert_eq!(requests.len(), 2);
        assert!(
            requests[1]
                .request
                .path
                .starts_with("/api/v1/namespaces/team-a/secrets/display")
        );

        let mut app = App::new(10, "test".to_string());
        sent(app.start_in(None, ResourceKind::Secrets));
        assert_eq!(app.screen(), &Screen::Namespaces);
    }

    #[test]
    fn full_page_enables_next_and_short_page_disables_it() {
        let mut app = app();
        let load = sent(app.start(None)).remove(0);
        complete(&mut app, &load, Ok(namespaces(10)));
        let view = app.view(ResourceKind::Namespaces).unwrap();
        assert!(view.pagination.can_next());
        assert!(!view.pagination.can_previous());

        let next = sent(app.apply_action(Action::NextPage));
        assert_eq!(
            next[0].request.path,
            "/api/v1/namespaces?page=2&limit=10&sortBy=app&order=asc"
        );
        complete(&mut app, &next[0], Ok(namespaces(3)));
        assert!(!app.view(ResourceKind::Namespaces).unwrap().pagination.can_next());
        assert!(sent(app.apply_action(Action::NextPage)).is_empty());

        let previous = sent(app.apply_action(Action::PrevPage));
        assert_eq!(
            previous[0].request.path,
            "/api/v1/namespaces?page=1&limit=10&sortBy=app&order=asc"
        );
        assert!(sent(app.apply_action(Action::PrevPage)).is_empty());
    }

    #[test]
    fn next_page_waits_for_the_current_page_to_load() {
        let mut app = app();
        let load = sent(app.start(None)).remove(0);
        complete(&mut app, &load, Ok(namespaces(10)));

        let second = sent(app.apply_action(Action::NextPage));
        assert_eq!(second.len(), 1);
        assert_eq!(app.apply_action(Action::NextPage), AppCommand::None);
        assert_eq!(app.apply_action(Action::NextPage), AppCommand::None);
        assert_eq!(app.view(ResourceKind::Namespaces).unwrap().pagination.page(), 2);

        complete(&mut app, &second[0], Ok(namespaces(10)));
        let third = sent(app.apply_action(Action::NextPage));
        assert_eq!(
            third[0].request.path,
            "/api/v1/namespaces?page=3&limit=10&sortBy=app&order=asc"
        );
    }

    #[test]
    fn reload_shrinking_an_open_menu_keeps_highlight_in_range() {
        let mut app = deployments_screen();
        app.apply_action(Action::ToggleMenu);
        app.apply_action(Action::MenuNext);
        assert_eq!(
            app.menu_actions(),
            vec![MenuAction::UpdateDeployment, MenuAction::ScaleUp]
        );

        let reload = sent(app.apply_action(Action::Refresh)).remove(0);
        complete(
            &mut app,
            &reload,
            Ok(json!({
                "deployments": [{
                    "name": "api",
                    "namespace": "team-a",
                    "containers": [{ "web": "nginx:1.25" }],
                    "replicas": 1
                }]
            })),
        );

        let view = app.view(ResourceKind::Deployments).unwrap();
        assert_eq!(view.menu.open_key(), Some("team-a/api"));
        assert_eq!(view.menu.highlighted(), 0);
        assert_eq!(app.menu_actions(), vec![MenuAction::UpdateDeployment]);

        app.apply_action(Action::FireMenu);
        assert!(matches!(
            app.dialog().map(|dialog| &dialog.kind),
            Some(DialogKind::UpdateImage { .. })
        ));
    }

    #[test]
    fn sort_toggle_replaces_active_column_and_keeps_page() {
        let mut app = app();
        let load = sent(app.start(None)).remove(0);
        complete(&mut app, &load, Ok(namespaces(10)));
        let next = sent(app.apply_action(Action::NextPage));
        complete(&mut app, &next[0], Ok(namespaces(10)));

        let sorted = sent(app.apply_action(Action::ToggleSort(1)));
        assert_eq!(
            sorted[0].request.path,
            "/api/v1/namespaces?page=2&limit=10&sortBy=namespace&order=asc"
        );
        let sort = &app.view(ResourceKind::Namespaces).unwrap().sort;
        assert_eq!(sort.active().map(|(accessor, _)| accessor), Some("namespace"));
        assert!(!sort.direction_of("app").is_active());

        let reversed = sent(app.apply_action(Action::ToggleSort(1)));
        assert!(reversed[0].request.path.ends_with("sortBy=namespace&order=desc"));

        assert!(sent(app.apply_action(Action::ToggleSort(5))).is_empty());
        assert!(sent(app.apply_action(Action::ToggleSort(9))).is_empty());
    }

    #[test]
    fn clone_dialog_refuses_empty_input_and_reloads_after_success() {
        let mut app = app();
        let load = sent(app.start(None)).remove(0);
        complete(
            &mut app,
            &load,
            Ok(json!([{ "namespace": "team-a", "cloned": "false" }])),
        );

        app.apply_action(Action::ToggleMenu);
        assert_eq!(app.mode(), InputMode::Menu);
        assert!(sent(app.apply_action(Action::FireMenu)).is_empty());
        assert_eq!(app.mode(), InputMode::Prompt);

        assert!(sent(app.apply_action(Action::SubmitInput)).is_empty());
        assert_eq!(app.mode(), InputMode::Prompt);

        type_text(&mut app, "team-b");
        let write = sent(app.apply_action(Action::SubmitInput));
        assert_eq!(app.mode(), InputMode::Normal);
        assert_eq!(write.len(), 1);
        assert_eq!(write[0].request.method, Method::Post);
        assert_eq!(write[0].request.path, "/api/v1/namespaces/team-a/cloneNamespace");
        assert_eq!(write[0].request.body, Some(json!({ "targetNamespace": "team-b" })));
        assert_eq!(
            write[0].purpose,
            RequestPurpose::Mutate {
                operation: OperationId::CloneNamespace
            }
        );

        let reload = complete(&mut app, &write[0], Ok(json!({ "message": "cloned" })));
        assert_eq!(reload.len(), 1);
        assert_eq!(
            reload[0].request.path,
            "/api/v1/namespaces?page=1&limit=10&sortBy=app&order=asc"
        );
        assert!(app.status().contains("Clone namespace succeeded"));
    }

    #[test]
    fn failed_write_does_not_reload() {
        let mut app = deployments_screen();
        app.apply_action(Action::ToggleMenu);
        app.apply_action(Action::FireMenu);
        type_text(&mut app, "nginx:1.27");
        let write = sent(app.apply_action(Action::SubmitInput));

        let failure = TransportError::Status {
            status: 500,
            message: "patch failed".to_string(),
        };
        assert!(complete(&mut app, &write[0], Err(failure)).is_empty());
        assert!(app.status().contains("failed"));
        assert_eq!(app.store(ResourceKind::Deployments).len(), 1);
    }

    #[test]
    fn cloned_namespace_opens_deployments_and_drops_stale_loads() {
        let mut app = app();
        let first = sent(app.start(None)).remove(0);
        complete(
            &mut app,
            &first,
            Ok(json!([{ "namespace": "team-a", "cloned": true }])),
        );
        let refresh = sent(app.apply_action(Action::Refresh)).remove(0);

        app.apply_action(Action::ToggleMenu);
        assert_eq!(app.menu_actions().len(), 2);
        let mounted = sent(app.apply_action(Action::FireMenu));
        assert_eq!(
            app.screen(),
            &Screen::Deployments {
                namespace: "team-a".to_string()
            }
        );
        assert_eq!(
            mounted[0].request.path,
            "/api/v1/namespaces/team-a/deployments/display?page=1&limit=10&sortBy=namespace&order=asc"
        );

        assert!(complete(&mut app, &refresh, Ok(namespaces(4))).is_empty());
        assert!(app.store(ResourceKind::Namespaces).is_empty());
        assert_eq!(
            app.store(ResourceKind::Namespaces).phase(),
            &LoadPhase::Idle
        );
    }

    #[test]
    fn scale_up_waits_for_confirmation() {
        let mut app = deployments_screen();

        app.apply_action(Action::ToggleMenu);
        app.apply_action(Action::MenuNext);
        assert!(sent(app.apply_action(Action::FireMenu)).is_empty());
        assert_eq!(app.mode(), InputMode::Confirm);
        assert!(sent(app.apply_action(Action::ConfirmNo)).is_empty());
        assert_eq!(app.mode(), InputMode::Normal);

        app.apply_action(Action::ToggleMenu);
        app.apply_action(Action::MenuNext);
        app.apply_action(Action::FireMenu);
        let write = sent(app.apply_action(Action::ConfirmYes));
        assert_eq!(write[0].request.path, "/api/v1/deployments/api/scaleup");
        assert_eq!(write[0].request.body, None);
    }

    #[test]
    fn image_update_targets_first_container() {
        let mut app = deployments_screen();
        app.apply_action(Action::ToggleMenu);
        app.apply_action(Action::FireMenu);
        type_text(&mut app, "nginx:1.27");
        let write = sent(app.apply_action(Action::SubmitInput));

        assert_eq!(write[0].request.path, "/api/v1/deployments/api");
        assert_eq!(
            write[0].request.body,
            Some(json!({ "container": "web", "image": "nginx:1.27", "namespace": "team-a" }))
        );
    }

    #[test]
    fn failed_load_offers_retry() {
        let mut app = app();
        let load = sent(app.start(None)).remove(0);
        complete(
            &mut app,
            &load,
            Err(TransportError::Connection("refused".to_string())),
        );

        let store = app.store(ResourceKind::Namespaces);
        assert!(matches!(store.phase(), LoadPhase::Failed(_)));
        assert!(app.status().contains("retry"));

        let retry = sent(app.apply_action(Action::Refresh));
        assert_eq!(retry.len(), 1);
        assert_eq!(
            app.store(ResourceKind::Namespaces).phase(),
            &LoadPhase::Loading
        );
    }

    #[test]
    fn configs_screen_loads_both_tables_and_updates_own_object() {
        let mut app = app();
        let load = sent(app.start(None)).remove(0);
        complete(
            &mut app,
            &load,
            Ok(json!([{ "namespace": "team-a", "cloned": "true" }])),
        );
        app.apply_action(Action::ToggleMenu);
        app.apply_action(Action::MenuNext);
        let loads = sent(app.apply_action(Action::FireMenu));
        assert_eq!(loads.len(), 2);
        assert_eq!(loads[0].target, ResourceKind::ConfigMaps);
        assert_eq!(loads[1].target, ResourceKind::Secrets);

        complete(
            &mut app,
            &loads[0],
            Ok(json!([
                { "name": "cm1", "namespace": "team-a", "data": { "a": "1" } },
                { "name": "cm2", "namespace": "team-a", "data": { "k": "v" } }
            ])),
        );
        app.apply_action(Action::Down);
        app.apply_action(Action::ToggleMenu);
        app.apply_action(Action::FireMenu);
        type_text(&mut app, "x");
        let write = sent(app.apply_action(Action::SubmitInput));
        assert_eq!(write[0].request.path, "/api/v1/configmaps/cm2");
        assert_eq!(
            write[0].request.body,
            Some(json!({ "data": { "k": "x" }, "namespace": "team-a" }))
        );

        app.apply_action(Action::SwitchPane);
        assert_eq!(app.active_kind(), ResourceKind::Secrets);
        app.apply_action(Action::ToggleMenu);
        assert_eq!(app.mode(), InputMode::Normal);
    }

    #[test]
    fn back_returns_to_a_fresh_namespace_list() {
        let mut app = deployments_screen();
        let loads = sent(app.apply_action(Action::Back));
        assert_eq!(app.screen(), &Screen::Namespaces);
        assert_eq!(loads[0].target, ResourceKind::Namespaces);
        assert!(app.store(ResourceKind::Deployments).is_empty());
        assert!(app.view(ResourceKind::Deployments).is_none());
    }

    async fn drive(app: &mut App, transport: &FixtureTransport, command: AppCommand) {
        let mut queue = VecDeque::from(sent(command));
        while let Some(outbound) = queue.pop_front() {
            let result = transport.execute(&outbound.request).await;
            queue.extend(sent(app.handle_completion(Completion::of(&outbound, result))));
        }
    }

    #[tokio::test]
    async fn clone_round_trip_against_fixture_backend() {
        let transport = FixtureTransport::new(FixtureData::demo(), Duration::ZERO);
        let mut app = app();

        let command = app.start(None);
        drive(&mut app, &transport, command).await;
        assert_eq!(app.store(ResourceKind::Namespaces).len(), 10);
        assert_eq!(
            app.store(ResourceKind::Namespaces).row_key(0).as_deref(),
            Some("identity")
        );

        app.apply_action(Action::ToggleMenu);
        app.apply_action(Action::FireMenu);
        type_text(&mut app, "identity-copy");
        let command = app.apply_action(Action::SubmitInput);
        drive(&mut app, &transport, command).await;
        assert!(app.status().contains("Clone namespace succeeded"));

        let command = app.apply_action(Action::ToggleSort(4));
        drive(&mut app, &transport, command).await;
        let command = app.apply_action(Action::ToggleSort(4));
        drive(&mut app, &transport, command).await;
        let store = app.store(ResourceKind::Namespaces);
        assert_eq!(store.phase(), &LoadPhase::Loaded);
        assert_eq!(
            store.row_cells(0, ResourceKind::Namespaces.columns())[3],
            "true"
        );
    }
}
