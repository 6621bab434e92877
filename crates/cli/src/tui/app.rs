//! Session state and the transition function that mutates it.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use proto::{
    LaunchMode, LaunchOverrides, LaunchRequest, LaunchTarget, ModelDetails, RemoteModel,
};
use tracing::{debug, warn};

use super::action::{Action, Command};
use super::input::LineInput;
use super::modal::{Modal, OverrideEditor, QuantPicker};
use super::output::OutputLog;
use super::render::output_viewport_height;
use crate::discover::LocalModel;

const SEARCH_CHAR_LIMIT: usize = 100;

const READY_BANNER: &str = "Ready. Enter starts a server, c starts an interactive CLI, e edits launch settings.\n\
Press 1/2 to switch sources. On the remote source press / to search, i for details.\n";

// ─── Data types ──────────────────────────────────────────────

/// Which catalog the browse pane shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Local,
    Remote,
}

/// Which pane owns keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Browse,
    Output,
}

// ─── TuiApp ──────────────────────────────────────────────────

/// Full state for the launcher session.
#[derive(Debug)]
pub struct TuiApp {
    pub source: Source,
    pub focus: Pane,

    pub local_models: Vec<LocalModel>,
    pub local_selected: usize,
    pub remote_models: Vec<RemoteModel>,
    pub remote_selected: usize,

    pub search: LineInput,
    pub search_focused: bool,
    /// Query of the search in flight.
    pub searching: Option<String>,
    /// Remote model whose quantizations are being looked up.
    pub pending_quant: Option<RemoteModel>,
    /// Remote model whose details are being fetched.
    pub loading_details: Option<String>,

    /// Keys typed in the output pane go to the process.
    pub relay_mode: bool,
    pub relay_buffer: String,
    pub process_running: bool,

    pub overrides: LaunchOverrides,
    pub output: OutputLog,
    pub modal: Modal,

    pub width: u16,
    pub height: u16,
    /// Advances every tick; drives the status-bar spinner.
    pub spinner_tick: u8,
    pub should_quit: bool,
}

fn is_plain(key: &KeyEvent) -> bool {
    !key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

fn is_ctrl(key: &KeyEvent, ch: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(ch)
}

impl TuiApp {
    pub fn new(local_models: Vec<LocalModel>, overrides: LaunchOverrides) -> Self {
        let mut output = OutputLog::new();
        output.push(READY_BANNER);
        Self {
            source: Source::Local,
            focus: Pane::Browse,
            local_models,
            local_selected: 0,
            remote_models: Vec::new(),
            remote_selected: 0,
            search: LineInput::new(SEARCH_CHAR_LIMIT),
            search_focused: false,
            searching: None,
            pending_quant: None,
            loading_details: None,
            relay_mode: false,
            relay_buffer: String::new(),
            process_running: false,
            overrides,
            output,
            modal: Modal::None,
            width: 0,
            height: 0,
            spinner_tick: 0,
            should_quit: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────

    pub fn selected_local(&self) -> Option<&LocalModel> {
        self.local_models.get(self.local_selected)
    }

    pub fn selected_remote(&self) -> Option<&RemoteModel> {
        self.remote_models.get(self.remote_selected)
    }

    /// True while any catalog call is outstanding.
    pub fn is_loading(&self) -> bool {
        self.searching.is_some() || self.pending_quant.is_some() || self.loading_details.is_some()
    }

    /// Rows available to the output text at the current terminal height.
    pub fn output_rows(&self) -> usize {
        output_viewport_height(self.height) as usize
    }

    fn log(&mut self, text: impl AsRef<str>) {
        self.output.push(text.as_ref());
    }

    fn open_modal(&mut self, modal: Modal) {
        if self.modal.is_open() {
            warn!(
                active = self.modal.name(),
                dropped = modal.name(),
                "dialog already open, result not shown"
            );
            self.log(format!(
                "[{} not shown: {} dialog is open]\n",
                modal.name(),
                self.modal.name()
            ));
            return;
        }
        self.modal = modal;
    }

    // ── Transition ───────────────────────────────────────────

    /// Applies one action and returns the side effect to run.
    pub fn update(&mut self, action: Action) -> Command {
        match action {
            Action::Key(key) => self.handle_key(key),
            Action::Resize { width, height } => {
                self.width = width;
                self.height = height;
                self.output.follow_tail();
                Command::None
            }
            Action::Initialized => {
                self.log("Init completed - starting output monitoring\n");
                Command::None
            }
            Action::Tick {
                output,
                running,
                exited,
            } => {
                self.spinner_tick = self.spinner_tick.wrapping_add(1);
                for chunk in &output {
                    self.output.push(chunk);
                }
                if let Some(status) = exited {
                    self.log(format!("\n[process exited: {status}]\n"));
                }
                self.process_running = running;
                if !running && self.relay_mode {
                    self.relay_mode = false;
                    self.relay_buffer.clear();
                }
                Command::None
            }
            Action::LaunchFinished { request, result } => {
                self.apply_launch_result(request, result);
                Command::None
            }
            Action::InputFailed(err) => {
                self.log(format!("\n[Error sending input: {err}]\n"));
                Command::None
            }
            Action::SearchFinished { query, result } => {
                self.apply_search_result(query, result);
                Command::None
            }
            Action::QuantizationsFinished { model_id, result } => {
                self.apply_quant_result(model_id, result);
                Command::None
            }
            Action::DetailsFinished { model_id, result } => {
                self.apply_details_result(model_id, result);
                Command::None
            }
        }
    }

    // ── Key routing ──────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Command {
        if self.modal.is_open() {
            return self.handle_modal_key(key);
        }
        if self.search_focused {
            return self.handle_search_key(key);
        }
        if self.relay_mode && self.focus == Pane::Output && self.process_running {
            return self.handle_relay_key(key);
        }
        self.handle_global_key(key)
    }

    fn handle_modal_key(&mut self, key: KeyEvent) -> Command {
        match &self.modal {
            Modal::None => Command::None,
            Modal::ConfigEdit(_) => self.handle_editor_key(key),
            Modal::QuantPick(_) => self.handle_quant_key(key),
            Modal::Details(_) => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('i') | KeyCode::Char('q'))
                    && is_plain(&key)
                {
                    self.modal = Modal::None;
                }
                Command::None
            }
            Modal::NoQuantConfirm(_) => self.handle_no_quant_key(key),
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> Command {
        let Modal::ConfigEdit(editor) = &mut self.modal else {
            return Command::None;
        };
        match key.code {
            KeyCode::Esc => self.modal = Modal::None,
            KeyCode::Enter => {
                self.overrides = editor.commit(self.overrides);
                self.modal = Modal::None;
                self.log(format!(
                    "Session config updated: NGL={}, CtxSize={}\n",
                    self.overrides.ngl, self.overrides.ctx_size
                ));
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                editor.cycle_focus();
            }
            _ => {
                editor.focused_mut().handle_key(&key);
            }
        }
        Command::None
    }

    fn handle_quant_key(&mut self, key: KeyEvent) -> Command {
        let Modal::QuantPick(picker) = &mut self.modal else {
            return Command::None;
        };
        let mode = match key.code {
            KeyCode::Esc => {
                self.modal = Modal::None;
                return Command::None;
            }
            KeyCode::Up => {
                picker.up();
                return Command::None;
            }
            KeyCode::Down => {
                picker.down();
                return Command::None;
            }
            KeyCode::Enter => LaunchMode::Server,
            KeyCode::Char('c') if is_plain(&key) => LaunchMode::Interactive,
            _ => return Command::None,
        };
        let target = LaunchTarget::Remote {
            model_id: picker.model.id.clone(),
            quant: picker.selected_quant().map(str::to_string),
        };
        self.modal = Modal::None;
        self.launch(target, mode)
    }

    fn handle_no_quant_key(&mut self, key: KeyEvent) -> Command {
        let Modal::NoQuantConfirm(model) = &self.modal else {
            return Command::None;
        };
        let plain = is_plain(&key);
        let mode = match key.code {
            KeyCode::Esc => None,
            KeyCode::Char('n') if plain => None,
            KeyCode::Enter => Some(LaunchMode::Server),
            KeyCode::Char('y') if plain => Some(LaunchMode::Server),
            KeyCode::Char('c') if plain => Some(LaunchMode::Interactive),
            _ => return Command::None,
        };
        let model_id = model.id.clone();
        self.modal = Modal::None;
        match mode {
            Some(mode) => self.launch(
                LaunchTarget::Remote {
                    model_id,
                    quant: None,
                },
                mode,
            ),
            None => Command::None,
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Command {
        match key.code {
            KeyCode::Esc => {
                self.search_focused = false;
                Command::None
            }
            KeyCode::Enter => {
                self.search_focused = false;
                let query = self.search.value().trim().to_string();
                if query.is_empty() {
                    return Command::None;
                }
                self.searching = Some(query.clone());
                self.log(format!("Searching for '{query}'...\n"));
                Command::Search(query)
            }
            _ => {
                self.search.handle_key(&key);
                Command::None
            }
        }
    }

    fn handle_relay_key(&mut self, key: KeyEvent) -> Command {
        if is_ctrl(&key, 'c') {
            return self.quit();
        }
        match key.code {
            KeyCode::Esc => {
                self.relay_mode = false;
                self.relay_buffer.clear();
                self.log("\n[Exited CLI input mode]\n");
                Command::None
            }
            KeyCode::Enter => {
                let mut line = std::mem::take(&mut self.relay_buffer);
                line.push('\n');
                Command::SendInput(line)
            }
            KeyCode::Backspace => {
                self.relay_buffer.pop();
                Command::None
            }
            KeyCode::Char(ch) if is_plain(&key) => {
                self.relay_buffer.push(ch);
                Command::None
            }
            _ => Command::None,
        }
    }

    fn handle_global_key(&mut self, key: KeyEvent) -> Command {
        if is_ctrl(&key, 'c') {
            return self.quit();
        }
        if is_ctrl(&key, 'l') {
            self.output.clear();
            return Command::None;
        }
        if !is_plain(&key) {
            return Command::None;
        }

        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('1') => {
                self.source = Source::Local;
                Command::None
            }
            KeyCode::Char('2') => {
                self.source = Source::Remote;
                Command::None
            }
            KeyCode::Char('/') => {
                if self.source == Source::Remote && self.focus == Pane::Browse {
                    self.search_focused = true;
                }
                Command::None
            }
            KeyCode::Up => {
                self.move_selection(false);
                Command::None
            }
            KeyCode::Down => {
                self.move_selection(true);
                Command::None
            }
            KeyCode::Enter => self.launch_selected(LaunchMode::Server),
            KeyCode::Char('c') => self.launch_selected(LaunchMode::Interactive),
            KeyCode::Char('i') => self.request_details(),
            KeyCode::Char('e') => {
                self.modal = Modal::ConfigEdit(OverrideEditor::new(self.overrides));
                Command::None
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Pane::Browse => Pane::Output,
                    Pane::Output => Pane::Browse,
                };
                Command::None
            }
            _ => Command::None,
        }
    }

    // ── Operations ───────────────────────────────────────────

    fn quit(&mut self) -> Command {
        self.should_quit = true;
        Command::Quit
    }

    fn move_selection(&mut self, down: bool) {
        if self.focus == Pane::Output {
            let rows = self.output_rows();
            if down {
                self.output.scroll_down(rows);
            } else {
                self.output.scroll_up(rows);
            }
            return;
        }
        let (selected, len) = match self.source {
            Source::Local => (&mut self.local_selected, self.local_models.len()),
            Source::Remote => (&mut self.remote_selected, self.remote_models.len()),
        };
        if len == 0 {
            return;
        }
        *selected = if down {
            (*selected + 1) % len
        } else {
            selected.checked_sub(1).unwrap_or(len - 1)
        };
    }

    fn launch_selected(&mut self, mode: LaunchMode) -> Command {
        match self.source {
            Source::Local => {
                let Some(target) = self.selected_local().map(LocalModel::launch_target) else {
                    self.log("No local models found in the models directory\n");
                    return Command::None;
                };
                self.launch(target, mode)
            }
            Source::Remote => {
                let Some(model) = self.selected_remote().cloned() else {
                    return Command::None;
                };
                self.log(format!(
                    "Fetching available quantizations for {}...\n",
                    model.id
                ));
                let id = model.id.clone();
                self.pending_quant = Some(model);
                Command::FetchQuantizations(id)
            }
        }
    }

    fn request_details(&mut self) -> Command {
        if self.source != Source::Remote {
            return Command::None;
        }
        let Some(id) = self.selected_remote().map(|m| m.id.clone()) else {
            return Command::None;
        };
        self.log(format!("Fetching details for {id}...\n"));
        self.loading_details = Some(id.clone());
        Command::FetchDetails(id)
    }

    fn launch(&mut self, target: LaunchTarget, mode: LaunchMode) -> Command {
        self.log(format!(
            "Starting {} for {} (NGL={}, CtxSize={})...\n",
            mode_label(mode),
            target.label(),
            self.overrides.ngl,
            self.overrides.ctx_size
        ));
        Command::Launch(LaunchRequest {
            target,
            mode,
            overrides: self.overrides,
        })
    }

    // ── Completions ──────────────────────────────────────────

    fn apply_launch_result(&mut self, request: LaunchRequest, result: Result<Option<u32>, String>) {
        match result {
            Ok(pid) => {
                self.process_running = true;
                let pid = pid.map(|p| format!(" (pid {p})")).unwrap_or_default();
                let download_hint = if request.target.is_remote() {
                    ", model will be downloaded if needed"
                } else {
                    ""
                };
                match request.mode {
                    LaunchMode::Server => {
                        self.relay_mode = false;
                        self.relay_buffer.clear();
                        self.log(format!("Process started{pid}{download_hint}\n"));
                    }
                    LaunchMode::Interactive => {
                        self.focus = Pane::Output;
                        self.relay_mode = true;
                        self.relay_buffer.clear();
                        self.log(format!(
                            "CLI process started{pid}{download_hint} - type your message and press Enter...\n"
                        ));
                    }
                }
            }
            Err(err) => {
                self.process_running = false;
                self.relay_mode = false;
                self.log(format!(
                    "Error starting {}: {err}\n",
                    mode_label(request.mode)
                ));
            }
        }
    }

    fn apply_search_result(&mut self, query: String, result: Result<Vec<RemoteModel>, String>) {
        if self.searching.take_if(|q| *q == query).is_none() {
            debug!(query = %query, "ignoring stale search result");
            return;
        }
        match result {
            Ok(models) => {
                self.log(format!("Found {} models\n", models.len()));
                self.remote_models = models;
                self.remote_selected = 0;
            }
            Err(err) => self.log(format!("Search error: {err}\n")),
        }
    }

    fn apply_quant_result(&mut self, model_id: String, result: Result<Vec<String>, String>) {
        let Some(model) = self.pending_quant.take_if(|m| m.id == model_id) else {
            debug!(model_id = %model_id, "ignoring stale quantization result");
            return;
        };
        match result {
            Ok(quants) if quants.is_empty() => {
                self.log("No quantizations found for this model\n");
                self.open_modal(Modal::NoQuantConfirm(model));
            }
            Ok(quants) => {
                self.log(format!("Found {} quantizations\n", quants.len()));
                self.open_modal(Modal::QuantPick(QuantPicker::new(model, quants)));
            }
            Err(err) => self.log(format!("Error fetching quants: {err}\n")),
        }
    }

    fn apply_details_result(&mut self, model_id: String, result: Result<ModelDetails, String>) {
        if self
            .loading_details
            .take_if(|id| *id == model_id)
            .is_none()
        {
            debug!(model_id = %model_id, "ignoring stale details result");
            return;
        }
        match result {
            Ok(details) => self.open_modal(Modal::Details(Box::new(details))),
            Err(err) => self.log(format!("Error fetching details: {err}\n")),
        }
    }
}

fn mode_label(mode: LaunchMode) -> &'static str {
    match mode {
        LaunchMode::Server => "server",
        LaunchMode::Interactive => "CLI",
    }
}
