use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use album_core::{
    items_per_page, rows_for, AlbumApi, AlbumConfig, AlbumError, AppView, ClickModifiers,
    Controller, FavoritesView, FilterFavorites, HttpApi, JsonFileStore, MediaId, Notice,
    NoticeLevel, SortBy, SortOrder, TileView, Viewport, DEFAULT_COLUMNS, DEFAULT_SERVER, GRID_GAP,
};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures_util::{FutureExt, StreamExt};
use image::DynamicImage;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui_image::picker::Picker;
use ratatui_image::protocol::StatefulProtocol;
use ratatui_image::{Resize, StatefulImage};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Tui = ratatui::Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>;

const TICK_RATE: Duration = Duration::from_millis(150);
const CELL_WIDTH_PX: f64 = 8.0;
const CELL_HEIGHT_PX: f64 = 16.0;
const SIDE_PANEL_WIDTH: u16 = 30;
const PREV_LABEL: &str = "[< Prev]";
const NEXT_LABEL: &str = "[Next >]";
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const HELP: &str = "Space select, r range, a quick-tag, b batch, u undo, x untag, Enter view, d delete, / filter, Tab tags, n/p page, q quit";

#[derive(Parser)]
#[command(name = "album-tui", version, about = "TUI browser for a photo album server")]
struct Cli {
    /// Album server base URL
    #[arg(long, short, env = "ALBUM_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    /// Thumbnail columns per row
    #[arg(long, short, default_value_t = DEFAULT_COLUMNS)]
    columns: u32,

    /// capture_time, modification_time, filepath, filename or filesize
    #[arg(long, default_value = "capture_time")]
    sort_by: SortBy,

    /// asc or desc
    #[arg(long, default_value = "desc")]
    sort_order: SortOrder,

    /// Filter favorites file
    #[arg(long)]
    favorites: Option<PathBuf>,

    /// Draw thumbnails inside the grid tiles
    #[arg(long)]
    thumbnails: bool,

    /// Write logs to this file (the terminal is busy drawing)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum InputMode {
    Normal,
    Filter,
    NewTag,
    RemoveTag,
    Confirm,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum FocusPane {
    Grid,
    Tags,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ConfirmAction {
    DeleteSelected,
    DeleteTag(i64),
}

struct PendingConfirm {
    prompt: String,
    action: ConfirmAction,
}

/// Work that talks to the server. Queued by the key and mouse handlers and
/// run one at a time by the event loop, which keeps reading the terminal
/// while a request is in flight.
#[derive(Clone, Debug, PartialEq)]
enum Request {
    Start,
    Refresh,
    NextPage,
    PrevPage,
    Sort(SortBy, SortOrder),
    Columns(u32),
    Rescan,
    Click(usize, ClickModifiers),
    BatchTag,
    Undo,
    DeleteSelected,
    DeleteTag(i64),
    CreateTag(String),
    RemoveTag(MediaId, String),
    ApplyFilter,
    ClearFilter,
    FullImage(MediaId),
    Thumbnail(MediaId),
}

impl Request {
    fn label(&self) -> &'static str {
        match self {
            Request::Start => "Loading...",
            Request::Refresh => "Refreshing...",
            Request::NextPage | Request::PrevPage | Request::Columns(_) => "Loading page...",
            Request::Sort(..) => "Sorting...",
            Request::Rescan => "Scanning...",
            Request::Click(_, modifiers) if modifiers.quick_tag => "Tagging...",
            Request::Click(..) => "Working...",
            Request::BatchTag => "Tagging...",
            Request::Undo => "Undoing...",
            Request::DeleteSelected => "Deleting...",
            Request::DeleteTag(_) => "Deleting tag...",
            Request::CreateTag(_) => "Creating tag...",
            Request::RemoveTag(..) => "Removing tag...",
            Request::ApplyFilter => "Applying filter...",
            Request::ClearFilter => "Clearing filter...",
            Request::FullImage(_) => "Loading image...",
            Request::Thumbnail(_) => "Loading thumbnails...",
        }
    }

    /// Image fetches give way to the next key press or click and are
    /// requested again later.
    fn is_background(&self) -> bool {
        matches!(self, Request::FullImage(_) | Request::Thumbnail(_))
    }
}

enum Outcome {
    Updated { reset_cursor: bool },
    FullImage(MediaId, Result<Vec<u8>, AlbumError>),
    Thumbnail(MediaId, Result<Vec<u8>, AlbumError>),
}

enum JobEnd {
    Finished(Outcome),
    Interrupted(Event),
    Quit,
}

async fn perform<A: AlbumApi>(controller: &mut Controller<A>, request: Request) -> Outcome {
    let reset_cursor = match request {
        Request::Start => {
            controller.start().await;
            true
        }
        Request::Refresh => {
            controller.refresh().await;
            false
        }
        Request::NextPage => controller.next_page().await,
        Request::PrevPage => controller.prev_page().await,
        Request::Sort(sort_by, sort_order) => {
            controller.set_sort(sort_by, sort_order).await;
            true
        }
        Request::Columns(columns) => {
            controller.set_columns(columns).await;
            true
        }
        Request::Rescan => controller.rescan().await,
        Request::Click(index, modifiers) => {
            controller.click(index, modifiers).await;
            false
        }
        Request::BatchTag => {
            controller.batch_tag().await;
            false
        }
        Request::Undo => {
            controller.undo().await;
            false
        }
        Request::DeleteSelected => {
            let outcome = controller.delete_selected(|_| true).await;
            info!("delete finished: {outcome:?}");
            true
        }
        Request::DeleteTag(tag_id) => {
            controller.delete_tag(tag_id, |_| true).await;
            false
        }
        Request::CreateTag(name) => {
            controller.create_tag(&name).await;
            false
        }
        Request::RemoveTag(id, name) => {
            controller.remove_tag(id, &name).await;
            false
        }
        Request::ApplyFilter => controller.apply_filter().await,
        Request::ClearFilter => controller.clear_filter().await,
        Request::FullImage(id) => {
            return Outcome::FullImage(id, controller.api().fetch_file(id).await);
        }
        Request::Thumbnail(id) => {
            return Outcome::Thumbnail(id, controller.api().fetch_thumbnail(id).await);
        }
    };
    Outcome::Updated { reset_cursor }
}

#[derive(Clone, Debug, Default)]
struct LayoutInfo {
    grid_area: Rect,
    tiles: Vec<Rect>,
    tag_area: Rect,
    tag_offset: usize,
    prev_button: Rect,
    next_button: Rect,
    lightbox_area: Rect,
}

struct ImageSlot {
    protocol: Option<StatefulProtocol>,
    error: Option<String>,
}

impl ImageSlot {
    fn load(picker: &mut Picker, fetched: Result<Vec<u8>, AlbumError>) -> Self {
        match fetched
            .map_err(anyhow::Error::from)
            .and_then(|bytes| decode_image(&bytes))
        {
            Ok(image) => Self {
                protocol: Some(picker.new_resize_protocol(image)),
                error: None,
            },
            Err(err) => Self {
                protocol: None,
                error: Some(format!("{err:#}")),
            },
        }
    }
}

struct Images {
    picker: Picker,
    thumbnails: HashMap<MediaId, ImageSlot>,
    lightbox: Option<(MediaId, ImageSlot)>,
}

impl Images {
    fn new(picker: Picker) -> Self {
        Self {
            picker,
            thumbnails: HashMap::new(),
            lightbox: None,
        }
    }
}

/// What the screen shows, copied out of the controller after every change
/// so frames can be drawn while a request still holds the controller.
struct Snapshot {
    view: AppView,
    sort_by: SortBy,
    sort_order: SortOrder,
    columns: u32,
    items_per_page: u32,
    filter_text: String,
    filter_status: Option<Notice>,
}

impl Snapshot {
    fn capture<A: AlbumApi>(controller: &Controller<A>) -> Self {
        let state = controller.state();
        Self {
            view: controller.view(),
            sort_by: state.sort_by(),
            sort_order: state.sort_order(),
            columns: state.columns(),
            items_per_page: state.pagination().items_per_page,
            filter_text: state.filter_text().to_string(),
            filter_status: state.filter_status().cloned(),
        }
    }

    fn lightbox_open(&self) -> bool {
        self.view.lightbox.is_some()
    }
}

struct Ui {
    mode: InputMode,
    focus: FocusPane,
    cursor: usize,
    tag_cursor: usize,
    favorite_cursor: usize,
    input_buffer: String,
    status: Option<Notice>,
    busy: Option<&'static str>,
    spinner: usize,
    confirm: Option<PendingConfirm>,
    favorites: FavoritesView,
    layout: LayoutInfo,
    show_thumbnails: bool,
    images: Option<Images>,
}

impl Ui {
    fn new(show_thumbnails: bool) -> Self {
        Self {
            mode: InputMode::Normal,
            focus: FocusPane::Grid,
            cursor: 0,
            tag_cursor: 0,
            favorite_cursor: 0,
            input_buffer: String::new(),
            status: None,
            busy: None,
            spinner: 0,
            confirm: None,
            favorites: FavoritesView::default(),
            layout: LayoutInfo::default(),
            show_thumbnails,
            images: None,
        }
    }

    fn say(&mut self, text: impl Into<String>) {
        self.status = Some(Notice::info(text));
    }
}

struct App {
    controller: Controller<HttpApi>,
    snapshot: Snapshot,
    ui: Ui,
    started: bool,
    pending: VecDeque<Request>,
}

impl App {
    fn new(controller: Controller<HttpApi>, show_thumbnails: bool) -> Self {
        let snapshot = Snapshot::capture(&controller);
        Self {
            controller,
            snapshot,
            ui: Ui::new(show_thumbnails),
            started: false,
            pending: VecDeque::new(),
        }
    }

    fn set_image_picker(&mut self, picker: Picker) {
        self.ui.images = Some(Images::new(picker));
    }

    fn request(&mut self, request: Request) {
        self.pending.push_back(request);
    }

    fn next_request(&mut self) -> Option<Request> {
        self.pending.pop_front().or_else(|| self.image_request())
    }

    /// Pulls notices and a fresh snapshot out of the controller. Called after
    /// every handled event and every finished request, never while drawing.
    fn sync(&mut self) {
        for notice in self.controller.take_notices() {
            match notice.level {
                NoticeLevel::Error => warn!("{}", notice.text),
                _ => info!("{}", notice.text),
            }
            self.ui.status = Some(notice);
        }
        self.snapshot = Snapshot::capture(&self.controller);
        self.prune_images();
        self.clamp_cursor();
    }

    fn finish(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Updated { reset_cursor } => {
                if reset_cursor {
                    self.ui.cursor = 0;
                }
            }
            Outcome::FullImage(id, fetched) => {
                if let Some(images) = self.ui.images.as_mut() {
                    let slot = ImageSlot::load(&mut images.picker, fetched);
                    images.lightbox = Some((id, slot));
                }
            }
            Outcome::Thumbnail(id, fetched) => {
                if let Some(images) = self.ui.images.as_mut() {
                    let slot = ImageSlot::load(&mut images.picker, fetched);
                    images.thumbnails.insert(id, slot);
                }
            }
        }
        self.sync();
    }

    /// Feeds the grid's size to the controller. The first call queues the
    /// initial load; later calls reload only when the page size changes.
    fn sync_viewport(&mut self) {
        let viewport = viewport_for(self.ui.layout.grid_area);
        if viewport == self.controller.state().viewport() && self.started {
            return;
        }
        self.controller.set_viewport(viewport);
        if !self.started {
            self.started = true;
            self.request(Request::Start);
            return;
        }
        let per_page = items_per_page(self.controller.state().columns(), viewport, GRID_GAP);
        if per_page != self.controller.state().pagination().items_per_page
            && !self.pending.contains(&Request::Refresh)
        {
            self.request(Request::Refresh);
        }
    }

    fn image_request(&self) -> Option<Request> {
        let images = self.ui.images.as_ref()?;
        if let Some(lightbox) = &self.snapshot.view.lightbox {
            if images.lightbox.as_ref().map(|(id, _)| *id) != Some(lightbox.media_id) {
                return Some(Request::FullImage(lightbox.media_id));
            }
        }
        if !self.ui.show_thumbnails {
            return None;
        }
        self.snapshot
            .view
            .grid
            .tiles
            .iter()
            .map(|tile| tile.id)
            .find(|id| !images.thumbnails.contains_key(id))
            .map(Request::Thumbnail)
    }

    fn prune_images(&mut self) {
        let Some(images) = self.ui.images.as_mut() else {
            return;
        };
        if self.snapshot.view.lightbox.is_none() {
            images.lightbox = None;
        }
        let tiles = &self.snapshot.view.grid.tiles;
        images
            .thumbnails
            .retain(|id, _| tiles.iter().any(|tile| tile.id == *id));
    }

    fn item_count(&self) -> usize {
        self.snapshot.view.grid.tiles.len()
    }

    fn tag_count(&self) -> usize {
        self.snapshot.view.tag_panel.entries.len()
    }

    fn clamp_cursor(&mut self) {
        let len = self.item_count();
        self.ui.cursor = if len == 0 { 0 } else { self.ui.cursor.min(len - 1) };
        let tags = self.tag_count();
        self.ui.tag_cursor = if tags == 0 {
            0
        } else {
            self.ui.tag_cursor.min(tags - 1)
        };
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.item_count() as isize;
        if len == 0 {
            self.ui.cursor = 0;
            return;
        }
        self.ui.cursor = (self.ui.cursor as isize + delta).clamp(0, len - 1) as usize;
    }

    fn move_tag_cursor(&mut self, delta: isize) {
        let len = self.tag_count() as isize;
        if len == 0 {
            return;
        }
        self.ui.tag_cursor = (self.ui.tag_cursor as isize + delta).clamp(0, len - 1) as usize;
    }

    fn click(&mut self, index: usize, modifiers: ClickModifiers) {
        self.ui.cursor = index;
        self.request(Request::Click(index, modifiers));
    }

    fn columns(&self) -> u32 {
        self.snapshot.columns
    }

    fn cycle_sort(&mut self, toggle_order: bool) {
        let (sort_by, sort_order) = if toggle_order {
            (self.snapshot.sort_by, self.snapshot.sort_order.toggled())
        } else {
            (self.snapshot.sort_by.next(), self.snapshot.sort_order)
        };
        self.ui.say(format!("Sorted by {sort_by} {sort_order}"));
        self.request(Request::Sort(sort_by, sort_order));
    }

    fn change_columns(&mut self, delta: i32) {
        let columns = (self.columns() as i32 + delta).max(0) as u32;
        self.request(Request::Columns(columns));
    }

    fn refresh(&mut self) {
        self.ui.say("Refreshed.");
        self.request(Request::Refresh);
    }

    fn toggle_tag_at_cursor(&mut self) {
        let Some(name) = self
            .controller
            .state()
            .tags()
            .get(self.ui.tag_cursor)
            .map(|tag| tag.name.clone())
        else {
            return;
        };
        let active = self.controller.toggle_active_tag(&name);
        self.ui.say(format!(
            "Tag '{name}' {}",
            if active { "armed" } else { "disarmed" }
        ));
    }

    fn cursor_item(&self) -> Option<(MediaId, Vec<String>)> {
        self.controller
            .state()
            .items()
            .get(self.ui.cursor)
            .map(|item| (item.id, item.tags.clone()))
    }

    /// Runs the delete flow once with a refusing callback to learn the
    /// prompt. Nothing is sent before the callback answers, so the future
    /// is ready on its first poll; the real request is queued after the
    /// user answers.
    fn ask_delete_selected(&mut self) {
        let mut prompt = None;
        self.controller
            .delete_selected(|text| {
                prompt = Some(text.to_string());
                false
            })
            .now_or_never();
        if let Some(prompt) = prompt {
            self.ui.confirm = Some(PendingConfirm {
                prompt,
                action: ConfirmAction::DeleteSelected,
            });
            self.ui.mode = InputMode::Confirm;
        }
    }

    fn ask_delete_tag(&mut self) {
        let Some(tag_id) = self
            .controller
            .state()
            .tags()
            .get(self.ui.tag_cursor)
            .map(|tag| tag.id)
        else {
            self.ui.say("No tag selected.");
            return;
        };
        let mut prompt = None;
        self.controller
            .delete_tag(tag_id, |text| {
                prompt = Some(text.to_string());
                false
            })
            .now_or_never();
        if let Some(prompt) = prompt {
            self.ui.confirm = Some(PendingConfirm {
                prompt,
                action: ConfirmAction::DeleteTag(tag_id),
            });
            self.ui.mode = InputMode::Confirm;
        }
    }

    fn answer_confirm(&mut self, yes: bool) {
        self.ui.mode = InputMode::Normal;
        let Some(pending) = self.ui.confirm.take() else {
            return;
        };
        if !yes {
            self.ui.say("Canceled.");
            return;
        }
        match pending.action {
            ConfirmAction::DeleteSelected => self.request(Request::DeleteSelected),
            ConfirmAction::DeleteTag(tag_id) => self.request(Request::DeleteTag(tag_id)),
        }
    }

    fn begin_remove_tag(&mut self) {
        let Some((_, tags)) = self.cursor_item() else {
            self.ui.say("No item under the cursor.");
            return;
        };
        if tags.is_empty() {
            self.ui.say("This item has no tags.");
            return;
        }
        self.ui.input_buffer = tags[0].clone();
        self.ui.mode = InputMode::RemoveTag;
    }

    fn submit_input(&mut self) {
        let text = self.ui.input_buffer.trim().to_string();
        match self.ui.mode {
            InputMode::NewTag => self.request(Request::CreateTag(text)),
            InputMode::RemoveTag => {
                if let Some((id, _)) = self.cursor_item() {
                    self.request(Request::RemoveTag(id, text));
                }
            }
            _ => {}
        }
        self.ui.mode = InputMode::Normal;
        self.ui.input_buffer.clear();
    }

    fn edit_filter(&mut self, edit: impl FnOnce(&mut String)) {
        let mut text = self.controller.state().filter_text().to_string();
        edit(&mut text);
        self.controller.set_filter_text(text);
    }

    fn open_filter(&mut self) {
        self.ui.mode = InputMode::Filter;
        self.ui.favorite_cursor = 0;
        self.reload_favorites();
    }

    /// Re-reads the favorites store. Only the overlay's own actions change
    /// it, so the list is cached between them.
    fn reload_favorites(&mut self) {
        self.ui.favorites = self.controller.favorites_view();
        let count = self.ui.favorites.entries.len();
        self.ui.favorite_cursor = self.ui.favorite_cursor.min(count.saturating_sub(1));
    }
}

fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).context("unable to decode image")
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("album_tui=info,album_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow!("failed to install logger: {err}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let mut config = AlbumConfig::default()
        .with_server(cli.server)
        .with_columns(cli.columns)
        .with_sort(cli.sort_by, cli.sort_order);
    if let Some(path) = cli.favorites.as_deref() {
        config = config.with_favorites_path(path);
    }

    let api = HttpApi::new(&config.server).context("invalid server url")?;
    let favorites = FilterFavorites::new(Box::new(JsonFileStore::new(
        config.favorites_path.clone(),
    )));
    let controller = Controller::new(api, &config, favorites);
    info!("browsing {}", config.server);

    run_tui(App::new(controller, cli.thumbnails)).await
}

async fn run_tui(mut app: App) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("failed to enter alt screen")?;
    let picker = Picker::from_query_stdio().unwrap_or_else(|_| Picker::halfblocks());
    app.set_image_picker(picker);

    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend).context("failed to init terminal")?;

    let result = run_event_loop(&mut terminal, &mut app).await;

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )
    .ok();
    terminal.show_cursor().ok();

    result
}

async fn run_event_loop(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK_RATE);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        draw(terminal, app)?;
        app.sync_viewport();

        if let Some(request) = app.next_request() {
            match run_job(terminal, app, &mut events, &mut ticker, request).await? {
                JobEnd::Finished(outcome) => app.finish(outcome),
                JobEnd::Interrupted(event) => {
                    if handle_event(app, event) {
                        break;
                    }
                }
                JobEnd::Quit => break,
            }
            continue;
        }

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(event)) => {
                    if handle_event(app, event) {
                        break;
                    }
                }
                Some(Err(err)) => return Err(err).context("failed to read terminal event"),
                None => break,
            },
            _ = ticker.tick() => {}
        }
    }

    Ok(())
}

/// Drives one request to completion while still reading the terminal.
/// Ctrl+C (or q in the grid) abandons the request and quits; other input
/// is dropped unless the request is a background image fetch, which
/// yields to it.
async fn run_job(
    terminal: &mut Tui,
    app: &mut App,
    events: &mut EventStream,
    ticker: &mut Interval,
    request: Request,
) -> Result<JobEnd> {
    let background = request.is_background();
    app.ui.busy = Some(request.label());
    let job = perform(&mut app.controller, request);
    tokio::pin!(job);

    let end = loop {
        tokio::select! {
            biased;
            outcome = &mut job => break JobEnd::Finished(outcome),
            event = events.next() => match event {
                Some(Ok(event)) if background && is_user_action(&event) => {
                    break JobEnd::Interrupted(event);
                }
                Some(Ok(Event::Key(key)))
                    if quit_key(key, app.ui.mode, app.snapshot.lightbox_open()) =>
                {
                    break JobEnd::Quit;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err).context("failed to read terminal event"),
                None => break JobEnd::Quit,
            },
            _ = ticker.tick() => {
                app.ui.spinner = app.ui.spinner.wrapping_add(1);
            }
        }
        terminal.draw(|frame| render_ui(frame, &mut app.ui, &app.snapshot))?;
    };

    app.ui.busy = None;
    Ok(end)
}

fn draw(terminal: &mut Tui, app: &mut App) -> Result<()> {
    terminal.draw(|frame| render_ui(frame, &mut app.ui, &app.snapshot))?;
    Ok(())
}

fn is_user_action(event: &Event) -> bool {
    match event {
        Event::Key(_) => true,
        Event::Mouse(mouse) => matches!(
            mouse.kind,
            MouseEventKind::Down(_) | MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        ),
        _ => false,
    }
}

fn quit_key(key: KeyEvent, mode: InputMode, lightbox_open: bool) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }
    key.code == KeyCode::Char('q') && mode == InputMode::Normal && !lightbox_open
}

fn handle_event(app: &mut App, event: Event) -> bool {
    let quit = match event {
        Event::Key(key) => handle_key_event(app, key),
        Event::Mouse(mouse) => {
            handle_mouse_event(app, mouse);
            false
        }
        _ => false,
    };
    app.sync();
    quit
}

fn handle_key_event(app: &mut App, key: KeyEvent) -> bool {
    if quit_key(key, app.ui.mode, app.snapshot.lightbox_open()) {
        return true;
    }
    match app.ui.mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Filter => handle_filter_mode(app, key),
        InputMode::NewTag | InputMode::RemoveTag => handle_text_mode(app, key),
        InputMode::Confirm => {
            let yes = matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'));
            app.answer_confirm(yes);
        }
    }
    false
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    if app.snapshot.lightbox_open() {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                app.controller.lightbox_prev();
            }
            KeyCode::Right | KeyCode::Char('l') => {
                app.controller.lightbox_next();
            }
            KeyCode::Esc | KeyCode::Char('q') => app.controller.close_lightbox(),
            _ => {}
        }
        return;
    }

    let columns = app.columns().max(1) as isize;
    let cursor = app.ui.cursor;
    match (app.ui.focus, key.code) {
        (_, KeyCode::Tab) => {
            app.ui.focus = match app.ui.focus {
                FocusPane::Grid => FocusPane::Tags,
                FocusPane::Tags => FocusPane::Grid,
            };
        }
        (FocusPane::Tags, KeyCode::Char('j') | KeyCode::Down) => app.move_tag_cursor(1),
        (FocusPane::Tags, KeyCode::Char('k') | KeyCode::Up) => app.move_tag_cursor(-1),
        (FocusPane::Tags, KeyCode::Char(' ') | KeyCode::Enter) => app.toggle_tag_at_cursor(),
        (FocusPane::Tags, KeyCode::Char('d') | KeyCode::Delete) => app.ask_delete_tag(),
        (FocusPane::Grid, KeyCode::Char('h') | KeyCode::Left) => app.move_cursor(-1),
        (FocusPane::Grid, KeyCode::Char('l') | KeyCode::Right) => app.move_cursor(1),
        (FocusPane::Grid, KeyCode::Char('k') | KeyCode::Up) => app.move_cursor(-columns),
        (FocusPane::Grid, KeyCode::Char('j') | KeyCode::Down) => app.move_cursor(columns),
        (FocusPane::Grid, KeyCode::Char(' ')) => app.click(cursor, ClickModifiers::plain()),
        (FocusPane::Grid, KeyCode::Char('r')) => app.click(cursor, ClickModifiers::shift()),
        (FocusPane::Grid, KeyCode::Char('a')) => app.click(cursor, ClickModifiers::quick_tag()),
        (FocusPane::Grid, KeyCode::Enter | KeyCode::Char('o')) => {
            app.click(cursor, ClickModifiers::view())
        }
        (FocusPane::Grid, KeyCode::Char('x')) => app.begin_remove_tag(),
        (FocusPane::Grid, KeyCode::Char('d') | KeyCode::Delete) => app.ask_delete_selected(),
        (FocusPane::Grid, KeyCode::Esc) => {
            app.controller.clear_selection();
            app.ui.say("Selection cleared.");
        }
        (_, KeyCode::Char('b')) => app.request(Request::BatchTag),
        (_, KeyCode::Char('u')) => app.request(Request::Undo),
        (_, KeyCode::Char('n') | KeyCode::PageDown) => app.request(Request::NextPage),
        (_, KeyCode::Char('p') | KeyCode::PageUp) => app.request(Request::PrevPage),
        (_, KeyCode::Char('s')) => app.cycle_sort(false),
        (_, KeyCode::Char('S')) => app.cycle_sort(true),
        (_, KeyCode::Char('+') | KeyCode::Char('=')) => app.change_columns(1),
        (_, KeyCode::Char('-')) => app.change_columns(-1),
        (_, KeyCode::Char('g') | KeyCode::F(5)) => app.refresh(),
        (_, KeyCode::Char('R')) => app.request(Request::Rescan),
        (_, KeyCode::Char('t')) => {
            app.ui.mode = InputMode::NewTag;
            app.ui.input_buffer.clear();
        }
        (_, KeyCode::Char('/') | KeyCode::Char('f')) => app.open_filter(),
        _ => {}
    }
}

fn handle_text_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.ui.mode = InputMode::Normal;
            app.ui.input_buffer.clear();
            app.ui.say("Canceled.");
        }
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => {
            app.ui.input_buffer.pop();
        }
        KeyCode::Char(ch) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL) {
                app.ui.input_buffer.push(ch);
            }
        }
        _ => {}
    }
}

fn handle_filter_mode(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.ui.mode = InputMode::Normal,
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            app.edit_filter(|text| text.push('\n'))
        }
        KeyCode::Enter => app.request(Request::ApplyFilter),
        KeyCode::Char('x') if ctrl => app.request(Request::ClearFilter),
        KeyCode::Char('s') if ctrl => {
            app.controller.save_favorite();
            app.reload_favorites();
        }
        KeyCode::Char('o') if ctrl => {
            app.controller.load_favorite(app.ui.favorite_cursor);
        }
        KeyCode::Char('d') if ctrl => {
            app.controller.delete_favorite(app.ui.favorite_cursor);
            app.reload_favorites();
        }
        KeyCode::Up => app.ui.favorite_cursor = app.ui.favorite_cursor.saturating_sub(1),
        KeyCode::Down => {
            if app.ui.favorite_cursor + 1 < app.ui.favorites.entries.len() {
                app.ui.favorite_cursor += 1;
            }
        }
        KeyCode::Backspace => app.edit_filter(|text| {
            text.pop();
        }),
        KeyCode::Char(ch) if !ctrl => app.edit_filter(|text| text.push(ch)),
        _ => {}
    }
}

fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    let (x, y) = (mouse.column, mouse.row);

    if app.snapshot.lightbox_open() {
        if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
            let area = app.ui.layout.lightbox_area;
            if !point_in_rect(x, y, area) {
                app.controller.close_lightbox();
            } else if x < area.x + area.width / 2 {
                app.controller.lightbox_prev();
            } else {
                app.controller.lightbox_next();
            }
        }
        return;
    }
    if app.ui.mode != InputMode::Normal {
        return;
    }

    match mouse.kind {
        MouseEventKind::Down(button @ (MouseButton::Left | MouseButton::Right)) => {
            if point_in_rect(x, y, app.ui.layout.prev_button) {
                app.request(Request::PrevPage);
                return;
            }
            if point_in_rect(x, y, app.ui.layout.next_button) {
                app.request(Request::NextPage);
                return;
            }
            if let Some(index) = tile_at(&app.ui.layout.tiles, x, y) {
                if index >= app.item_count() {
                    return;
                }
                app.ui.focus = FocusPane::Grid;
                let modifiers = if button == MouseButton::Right {
                    ClickModifiers::view()
                } else {
                    click_modifiers(mouse.modifiers)
                };
                app.click(index, modifiers);
                return;
            }
            if let Some(row) = list_row_at(app.ui.layout.tag_area, x, y) {
                let index = app.ui.layout.tag_offset + row;
                if index < app.tag_count() {
                    app.ui.focus = FocusPane::Tags;
                    app.ui.tag_cursor = index;
                    app.toggle_tag_at_cursor();
                }
            }
        }
        MouseEventKind::ScrollUp if point_in_rect(x, y, app.ui.layout.grid_area) => {
            app.move_cursor(-(app.columns() as isize));
        }
        MouseEventKind::ScrollDown if point_in_rect(x, y, app.ui.layout.grid_area) => {
            app.move_cursor(app.columns() as isize);
        }
        _ => {}
    }
}

/// Terminal modifiers for a thumbnail click: Shift extends a range, Ctrl
/// quick-tags, Alt opens the viewer.
fn click_modifiers(modifiers: KeyModifiers) -> ClickModifiers {
    ClickModifiers {
        shift: modifiers.contains(KeyModifiers::SHIFT),
        view: modifiers.contains(KeyModifiers::ALT),
        quick_tag: modifiers.contains(KeyModifiers::CONTROL),
    }
}

/// Terminal cells are roughly twice as tall as they are wide; the page size
/// math works in pixels.
fn viewport_for(area: Rect) -> Viewport {
    Viewport::new(
        f64::from(area.width) * CELL_WIDTH_PX,
        f64::from(area.height) * CELL_HEIGHT_PX,
    )
}

fn tile_rects(area: Rect, columns: u32, rows: u32) -> Vec<Rect> {
    if columns == 0 || rows == 0 || area.width == 0 || area.height == 0 {
        return Vec::new();
    }
    let columns = columns.min(u32::from(area.width)) as u16;
    let rows = rows.min(u32::from(area.height)) as u16;
    let width = area.width / columns;
    let height = area.height / rows;
    (0..rows)
        .flat_map(|row| {
            (0..columns).map(move |col| {
                Rect::new(area.x + col * width, area.y + row * height, width, height)
            })
        })
        .collect()
}

fn tile_at(tiles: &[Rect], x: u16, y: u16) -> Option<usize> {
    tiles.iter().position(|rect| point_in_rect(x, y, *rect))
}

fn list_row_at(area: Rect, x: u16, y: u16) -> Option<usize> {
    if !point_in_rect(x, y, area) {
        return None;
    }
    Some(usize::from(y - area.y))
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x.min(100) / 100;
    let height = area.height * percent_y.min(100) / 100;
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 1 {
        return text.chars().take(width).collect();
    }
    let kept: String = text.chars().take(width - 1).collect();
    format!("{kept}~")
}

fn render_ui(frame: &mut Frame, ui: &mut Ui, snapshot: &Snapshot) {
    let view = &snapshot.view;
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, areas[0], ui, snapshot);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(SIDE_PANEL_WIDTH)])
        .split(areas[1]);
    render_grid(frame, main[0], ui, snapshot);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main[1]);
    render_tags(frame, side[0], ui, view);
    render_paths(frame, side[1], view);

    render_status(frame, areas[2], ui);

    if view.lightbox.is_some() {
        render_lightbox(frame, ui, view);
    } else {
        ui.layout.lightbox_area = Rect::default();
    }
    match ui.mode {
        InputMode::Filter => render_filter(frame, ui, snapshot),
        InputMode::Confirm => render_confirm(frame, ui),
        _ => {}
    }
}

fn render_header(frame: &mut Frame, area: Rect, ui: &mut Ui, snapshot: &Snapshot) {
    let view = &snapshot.view;
    let block = Block::default().borders(Borders::ALL).title("Album");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let enabled = Style::default().add_modifier(Modifier::BOLD);
    let disabled = Style::default().add_modifier(Modifier::DIM);
    let label = format!(" {} ", view.pagination.label);
    let line = Line::from(vec![
        Span::styled(
            PREV_LABEL,
            if view.pagination.prev_enabled { enabled } else { disabled },
        ),
        Span::raw(label.clone()),
        Span::styled(
            NEXT_LABEL,
            if view.pagination.next_enabled { enabled } else { disabled },
        ),
        Span::raw(format!(
            "  sort: {} {}  cols: {}  selected: {}  ",
            snapshot.sort_by, snapshot.sort_order, snapshot.columns, view.selected_count
        )),
        Span::styled(
            if view.undo.enabled { "[Undo]" } else { "[-]" },
            if view.undo.enabled { enabled } else { disabled },
        ),
        Span::raw(format!(" {}", view.undo.tooltip)),
    ]);
    frame.render_widget(Paragraph::new(line), inner);

    let prev_width = PREV_LABEL.chars().count() as u16;
    let next_x = inner.x + prev_width + label.chars().count() as u16;
    ui.layout.prev_button = Rect::new(inner.x, inner.y, prev_width, 1).intersection(inner);
    ui.layout.next_button =
        Rect::new(next_x, inner.y, NEXT_LABEL.chars().count() as u16, 1).intersection(inner);
}

fn render_grid(frame: &mut Frame, area: Rect, ui: &mut Ui, snapshot: &Snapshot) {
    let view = &snapshot.view;
    let title = if ui.focus == FocusPane::Grid {
        "Photos [Focus]"
    } else {
        "Photos"
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    ui.layout.grid_area = inner;

    if let Some(message) = &view.grid.message {
        ui.layout.tiles.clear();
        frame.render_widget(
            Paragraph::new(message.as_str())
                .centered()
                .wrap(Wrap { trim: true }),
            inner,
        );
        return;
    }

    let columns = snapshot.columns;
    let per_page = match snapshot.items_per_page {
        0 => view.grid.tiles.len() as u32,
        n => n,
    };
    ui.layout.tiles = tile_rects(inner, columns, rows_for(columns, per_page));

    let cursor = ui.cursor;
    let rects = ui.layout.tiles.clone();
    for (tile, rect) in view.grid.tiles.iter().zip(rects) {
        render_tile(frame, rect, tile, tile.index == cursor, ui);
    }
}

fn render_tile(frame: &mut Frame, area: Rect, tile: &TileView, is_cursor: bool, ui: &mut Ui) {
    let mut title_style = Style::default();
    if is_cursor {
        title_style = title_style.add_modifier(Modifier::REVERSED);
    }
    let border_style = if tile.selected {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let marker = if tile.selected { "[x] " } else { "" };
    let caption = truncate(
        &format!("{marker}{}", tile.caption),
        usize::from(area.width.saturating_sub(2)),
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(caption, title_style));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 {
        return;
    }

    let mut chips: Vec<Span> = Vec::new();
    for chip in &tile.tags {
        let style = if chip.dimmed {
            Style::default().add_modifier(Modifier::DIM | Modifier::CROSSED_OUT)
        } else {
            Style::default().fg(Color::Cyan)
        };
        chips.push(Span::styled(chip.name.clone(), style));
        chips.push(Span::raw(" "));
    }
    if tile.more_tags {
        chips.push(Span::styled("+", Style::default().add_modifier(Modifier::BOLD)));
    }
    let tag_line = Rect::new(inner.x, inner.y, inner.width, 1);
    frame.render_widget(Paragraph::new(Line::from(chips)), tag_line);

    let picture = Rect::new(
        inner.x,
        inner.y + 1,
        inner.width,
        inner.height.saturating_sub(1),
    );
    if picture.height == 0 {
        return;
    }
    let Some(images) = ui.images.as_mut() else {
        return;
    };
    match images.thumbnails.get_mut(&tile.id) {
        Some(ImageSlot {
            protocol: Some(protocol),
            ..
        }) => {
            frame.render_stateful_widget(
                StatefulImage::default().resize(Resize::Fit(None)),
                picture,
                protocol,
            );
        }
        Some(ImageSlot {
            error: Some(err), ..
        }) => {
            frame.render_widget(
                Paragraph::new(err.as_str())
                    .style(Style::default().add_modifier(Modifier::DIM))
                    .wrap(Wrap { trim: true }),
                picture,
            );
        }
        _ => {}
    }
}

fn render_tags(frame: &mut Frame, area: Rect, ui: &mut Ui, view: &AppView) {
    let title = if ui.focus == FocusPane::Tags {
        "Tags [Focus]"
    } else {
        "Tags"
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    ui.layout.tag_area = block.inner(area);

    if let Some(message) = &view.tag_panel.message {
        frame.render_widget(Paragraph::new(message.as_str()).block(block), area);
        ui.layout.tag_offset = 0;
        return;
    }

    let items = view
        .tag_panel
        .entries
        .iter()
        .map(|entry| {
            let (mark, style) = if entry.active {
                ("* ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
            } else {
                ("  ", Style::default())
            };
            ListItem::new(Span::styled(format!("{mark}{}", entry.name), style))
        })
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(block)
        .highlight_symbol("> ")
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if ui.focus == FocusPane::Tags {
        state.select(Some(ui.tag_cursor));
    }
    frame.render_stateful_widget(list, area, &mut state);
    ui.layout.tag_offset = state.offset();
}

fn render_paths(frame: &mut Frame, area: Rect, view: &AppView) {
    let items = view
        .org_paths
        .iter()
        .map(|path| ListItem::new(path.as_str()))
        .collect::<Vec<_>>();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Paths"));
    frame.render_widget(list, area);
}

fn render_status(frame: &mut Frame, area: Rect, ui: &Ui) {
    let (prefix, text, style) = match (ui.busy, ui.mode) {
        (Some(label), _) => (
            "BUSY",
            busy_text(label, ui.spinner),
            Style::default().fg(Color::Yellow),
        ),
        (None, InputMode::NewTag) => ("NEW TAG", format!("{}_", ui.input_buffer), Style::default()),
        (None, InputMode::RemoveTag) => ("UNTAG", format!("{}_", ui.input_buffer), Style::default()),
        (None, mode) => {
            let prefix = match mode {
                InputMode::Filter => "FILTER",
                InputMode::Confirm => "CONFIRM",
                _ => "NORMAL",
            };
            match &ui.status {
                Some(notice) => (prefix, notice.text.clone(), notice_style(notice.level)),
                None => (prefix, HELP.to_string(), Style::default()),
            }
        }
    };
    let status = Paragraph::new(Span::styled(format!("[{prefix}] {text}"), style))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status, area);
}

fn busy_text(label: &str, spinner: usize) -> String {
    format!("{} {label} (Ctrl+C quits)", SPINNER[spinner % SPINNER.len()])
}

fn notice_style(level: NoticeLevel) -> Style {
    match level {
        NoticeLevel::Info => Style::default(),
        NoticeLevel::Warning => Style::default().fg(Color::Yellow),
        NoticeLevel::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

fn render_lightbox(frame: &mut Frame, ui: &mut Ui, view: &AppView) {
    let Some(lightbox) = &view.lightbox else {
        return;
    };
    let area = centered_rect(90, 90, frame.area());
    ui.layout.lightbox_area = area;
    frame.render_widget(Clear, area);

    let hint = format!(
        "{} Esc close {}",
        if lightbox.show_prev { "< Prev" } else { "      " },
        if lightbox.show_next { "Next >" } else { "" }
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            "{} ({}/{})",
            lightbox.caption, lightbox.position, lightbox.total
        ))
        .title_bottom(Line::from(hint).centered());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let slot = ui
        .images
        .as_mut()
        .and_then(|images| images.lightbox.as_mut())
        .filter(|(id, _)| *id == lightbox.media_id)
        .map(|(_, slot)| slot);
    match slot {
        Some(ImageSlot {
            protocol: Some(protocol),
            ..
        }) => {
            frame.render_stateful_widget(
                StatefulImage::default().resize(Resize::Fit(None)),
                inner,
                protocol,
            );
        }
        Some(ImageSlot {
            error: Some(err), ..
        }) => {
            let text = format!("{}\n\nImage unavailable: {err}", lightbox.image_path);
            frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: false }), inner);
        }
        _ => {
            frame.render_widget(Paragraph::new(lightbox.image_path.as_str()), inner);
        }
    }
}

fn render_filter(frame: &mut Frame, ui: &Ui, snapshot: &Snapshot) {
    let area = centered_rect(80, 70, frame.area());
    frame.render_widget(Clear, area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Length(1),
            Constraint::Min(3),
        ])
        .split(area);

    let editor = Paragraph::new(format!("{}_", snapshot.filter_text))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Filter (Enter apply, Alt+Enter newline, Ctrl+X clear, Esc close)"),
        );
    frame.render_widget(editor, rows[0]);

    if let Some(status) = &snapshot.filter_status {
        frame.render_widget(
            Paragraph::new(Span::styled(status.text.as_str(), notice_style(status.level))),
            rows[1],
        );
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Favorites (Ctrl+S save, Up/Down, Ctrl+O load, Ctrl+D delete)");
    if let Some(message) = &ui.favorites.message {
        frame.render_widget(Paragraph::new(message.as_str()).block(block), rows[2]);
    } else {
        let items = ui
            .favorites
            .entries
            .iter()
            .map(|entry| ListItem::new(format!("{}. {}", entry.index + 1, entry.label)))
            .collect::<Vec<_>>();
        let list = List::new(items)
            .block(block)
            .highlight_symbol("> ")
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        let mut state = ListState::default();
        state.select(Some(ui.favorite_cursor));
        frame.render_stateful_widget(list, rows[2], &mut state);
    }
}

fn render_confirm(frame: &mut Frame, ui: &Ui) {
    let Some(pending) = &ui.confirm else {
        return;
    };
    let area = centered_rect(60, 25, frame.area());
    frame.render_widget(Clear, area);
    let text = format!("{}\n\n(y)es / any other key to cancel", pending.prompt);
    frame.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Confirm")),
        area,
    );
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::Duration;

    use album_core::{
        items_per_page, AlbumConfig, ClickModifiers, Controller, FilterFavorites, HttpApi,
        MemoryStore, GRID_GAP,
    };
    use crossterm::event::{
        Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    };
    use ratatui::layout::Rect;

    use super::{
        busy_text, centered_rect, click_modifiers, handle_filter_mode, is_user_action, list_row_at,
        perform, quit_key, tile_at, tile_rects, truncate, viewport_for, App, InputMode, Request,
    };

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn offline_app() -> App {
        let server = "http://127.0.0.1:9";
        let config = AlbumConfig::default().with_server(server);
        let favorites = FilterFavorites::new(Box::new(MemoryStore::default()));
        let controller = Controller::new(HttpApi::new(server).unwrap(), &config, favorites);
        App::new(controller, false)
    }

    fn mouse(kind: MouseEventKind) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn tiles_fill_the_grid_row_by_row() {
        let tiles = tile_rects(Rect::new(1, 1, 100, 40), 5, 2);
        assert_eq!(tiles.len(), 10);
        assert_eq!(tiles[0], Rect::new(1, 1, 20, 20));
        assert_eq!(tiles[4], Rect::new(81, 1, 20, 20));
        assert_eq!(tiles[5], Rect::new(1, 21, 20, 20));
        assert_eq!(tile_at(&tiles, 25, 22), Some(6));
        assert_eq!(tile_at(&tiles, 0, 0), None);
        assert!(tile_rects(Rect::new(0, 0, 0, 10), 5, 2).is_empty());
    }

    #[test]
    fn terminal_grid_maps_to_pixel_viewport() {
        let viewport = viewport_for(Rect::new(0, 0, 130, 53));
        assert_eq!(viewport.width, 1040.0);
        assert_eq!(viewport.height, 848.0);
        assert_eq!(items_per_page(5, viewport, GRID_GAP), 20);
        assert_eq!(items_per_page(5, viewport_for(Rect::default()), GRID_GAP), 20);
    }

    #[test]
    fn mouse_modifiers_pick_click_mode_flags() {
        assert_eq!(click_modifiers(KeyModifiers::NONE), ClickModifiers::plain());
        assert_eq!(click_modifiers(KeyModifiers::SHIFT), ClickModifiers::shift());
        assert_eq!(click_modifiers(KeyModifiers::CONTROL), ClickModifiers::quick_tag());
        assert_eq!(click_modifiers(KeyModifiers::ALT), ClickModifiers::view());
    }

    #[test]
    fn list_rows_are_relative_to_area() {
        let area = Rect::new(10, 5, 20, 4);
        assert_eq!(list_row_at(area, 12, 7), Some(2));
        assert_eq!(list_row_at(area, 12, 9), None);
    }

    #[test]
    fn overlays_are_centered() {
        assert_eq!(
            centered_rect(50, 50, Rect::new(0, 0, 100, 40)),
            Rect::new(25, 10, 50, 20)
        );
    }

    #[test]
    fn long_captions_are_cut() {
        assert_eq!(truncate("short.jpg", 20), "short.jpg");
        assert_eq!(truncate("a_very_long_name.jpg", 8), "a_very_~");
    }

    #[test]
    fn ctrl_c_always_quits_and_q_only_from_the_grid() {
        let ctrl_c = key(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let q = key(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(quit_key(ctrl_c, InputMode::Filter, true));
        assert!(quit_key(q, InputMode::Normal, false));
        assert!(!quit_key(q, InputMode::Normal, true));
        assert!(!quit_key(q, InputMode::NewTag, false));
        assert!(!quit_key(
            key(KeyCode::Char('c'), KeyModifiers::NONE),
            InputMode::Normal,
            false
        ));
    }

    #[test]
    fn requests_name_what_they_wait_for() {
        assert_eq!(Request::Rescan.label(), "Scanning...");
        assert_eq!(Request::BatchTag.label(), "Tagging...");
        assert_eq!(
            Request::Click(0, ClickModifiers::quick_tag()).label(),
            "Tagging..."
        );
        assert_eq!(Request::Click(0, ClickModifiers::plain()).label(), "Working...");
        assert!(Request::Thumbnail(1).is_background());
        assert!(!Request::Start.is_background());
        assert_eq!(busy_text("Scanning...", 5), "/ Scanning... (Ctrl+C quits)");
    }

    #[test]
    fn only_keys_and_clicks_interrupt_image_loads() {
        assert!(is_user_action(&Event::Key(key(
            KeyCode::Char('n'),
            KeyModifiers::NONE
        ))));
        assert!(is_user_action(&mouse(MouseEventKind::Down(MouseButton::Left))));
        assert!(!is_user_action(&mouse(MouseEventKind::Moved)));
        assert!(!is_user_action(&Event::Resize(80, 24)));
    }

    #[test]
    fn favorites_overlay_reads_the_store_only_on_its_own_actions() {
        let mut app = offline_app();
        app.controller.set_filter_text("tags:sea");
        app.controller.save_favorite();
        app.open_filter();
        assert_eq!(app.ui.mode, InputMode::Filter);
        assert_eq!(app.ui.favorites.entries.len(), 1);

        app.controller.save_favorite();
        assert_eq!(app.ui.favorites.entries.len(), 1);

        handle_filter_mode(&mut app, key(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert_eq!(app.ui.favorites.entries.len(), 3);
        handle_filter_mode(&mut app, key(KeyCode::Char('d'), KeyModifiers::CONTROL));
        assert_eq!(app.ui.favorites.entries.len(), 2);
    }

    #[test]
    fn notices_reach_the_status_line_on_sync() {
        let mut app = offline_app();
        app.controller.set_filter_text("   ");
        app.controller.save_favorite();
        assert!(app.ui.status.is_none());
        app.sync();
        assert!(app.ui.status.is_some());
    }

    #[tokio::test]
    async fn silent_server_request_can_be_abandoned() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let server = format!("http://{}", listener.local_addr().unwrap());
        let config = AlbumConfig::default().with_server(server.as_str());
        let favorites = FilterFavorites::new(Box::new(MemoryStore::default()));
        let mut controller = Controller::new(HttpApi::new(&server).unwrap(), &config, favorites);

        let finished = tokio::select! {
            _ = perform(&mut controller, Request::Start) => true,
            _ = tokio::time::sleep(Duration::from_millis(300)) => false,
        };
        assert!(!finished);
        assert!(controller.state().items().is_empty());
        assert!(controller.take_notices().is_empty());
        drop(listener);
    }
}
