use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Duration;

use arboard::Clipboard;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use seo_core::{
    Image, LintFilter, LintReport, MIN_PAGE_LIMIT, NEAR_DUPLICATE_THRESHOLD, PageQuery, SortMode,
    UndoBuffer, clamp_limit, find_near_duplicates, visible_images,
};
use tracing::{info, warn};

use crate::api::ImageSource;
use crate::debounce::SearchDebouncer;
use crate::fetcher::{ImageListFetcher, ListState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Search,
    Edit,
    Help,
}

#[derive(Debug, Clone)]
struct AltEdit {
    id: String,
    previous: Option<String>,
    seq: u64,
}

#[derive(Debug)]
struct SaveResult {
    id: String,
    seq: u64,
    alt_text: Option<String>,
    result: Result<(), String>,
}

/// Save bookkeeping for one image while any of its saves are in flight.
#[derive(Debug)]
struct PendingAlt {
    /// Most recent save issued for the image.
    latest: u64,
    latest_failed: bool,
    /// Alt text the server is known to hold and the save that stored it.
    confirmed: Option<String>,
    confirmed_seq: u64,
    in_flight: usize,
}

pub struct App<S> {
    pub mode: Mode,
    fetcher: Arc<ImageListFetcher<S>>,
    debouncer: SearchDebouncer<S>,
    pub search_input: String,
    pub edit_input: String,
    pub filter: LintFilter,
    pub sort: SortMode,
    pub selection: usize,
    pub page_size: u32,
    pub list: ListState,
    pub report: LintReport,
    pub near_duplicates: usize,
    pub message: Option<String>,
    editing: Option<String>,
    undo: UndoBuffer<AltEdit>,
    pending: HashMap<String, PendingAlt>,
    next_save: u64,
    save_tx: Sender<SaveResult>,
    save_rx: Receiver<SaveResult>,
    seen_revision: Option<u64>,
    seen_failures: u64,
}

impl<S: ImageSource> App<S> {
    pub fn new(fetcher: Arc<ImageListFetcher<S>>, quiet: Duration, page_size: u32) -> Self {
        let (save_tx, save_rx) = mpsc::channel();
        Self {
            mode: Mode::Browse,
            debouncer: SearchDebouncer::new(Arc::clone(&fetcher), quiet),
            fetcher,
            search_input: String::new(),
            edit_input: String::new(),
            filter: LintFilter::All,
            sort: SortMode::Server,
            selection: 0,
            page_size: clamp_limit(page_size),
            list: ListState::default(),
            report: LintReport::default(),
            near_duplicates: 0,
            message: None,
            editing: None,
            undo: UndoBuffer::default(),
            pending: HashMap::new(),
            next_save: 0,
            save_tx,
            save_rx,
            seen_revision: None,
            seen_failures: 0,
        }
    }

    /// Mount: arms the search guard and loads the first page.
    pub fn start(&mut self) {
        self.debouncer.on_change(&self.search_input, self.page_size);
        self.spawn_fetch(PageQuery::new(0, self.page_size, Some(self.search_input.clone())));
    }

    pub fn tick(&mut self) {
        self.list = self.fetcher.snapshot();
        if self.seen_revision != Some(self.list.revision) {
            self.seen_revision = Some(self.list.revision);
            self.report = LintReport::build(&self.list.images);
            self.near_duplicates =
                find_near_duplicates(&self.list.images, NEAR_DUPLICATE_THRESHOLD).len();
            self.clamp_selection();
        }
        if self.list.failures != self.seen_failures {
            self.seen_failures = self.list.failures;
            if let Some(error) = &self.list.error {
                self.message = Some(error.clone());
            }
        }
        self.drain_saves();
    }

    pub fn visible(&self) -> Vec<&Image> {
        visible_images(&self.list.images, &self.report, self.filter, self.sort)
    }

    pub fn selected_image(&self) -> Option<&Image> {
        self.visible().get(self.selection).copied()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            self.selection = 0;
        } else if self.selection >= len {
            self.selection = len - 1;
        }
    }

    fn move_selection(&mut self, delta: i32) {
        let len = self.visible().len();
        if len == 0 {
            self.selection = 0;
            return;
        }
        let current = self.selection as i32;
        self.selection = (current + delta).clamp(0, len as i32 - 1) as usize;
    }

    fn spawn_fetch(&self, query: PageQuery) {
        let fetcher = Arc::clone(&self.fetcher);
        tokio::spawn(async move {
            fetcher
                .fetch_page(query.offset, query.limit, query.search)
                .await;
        });
    }

    fn refresh(&mut self) {
        self.message = None;
        let fetcher = Arc::clone(&self.fetcher);
        tokio::spawn(async move {
            fetcher.refresh().await;
        });
    }

    fn next_page(&mut self) {
        let query = self.fetcher.current_query();
        match query.next(self.list.total) {
            Some(next) => self.spawn_fetch(next),
            None => self.message = Some("Already on the last page".to_string()),
        }
    }

    fn previous_page(&mut self) {
        let query = self.fetcher.current_query();
        match query.previous() {
            Some(previous) => self.spawn_fetch(previous),
            None => self.message = Some("Already on the first page".to_string()),
        }
    }

    fn resize_page(&mut self, delta: i32) {
        let step = MIN_PAGE_LIMIT as i32 * delta;
        let size = clamp_limit((self.page_size as i32 + step).max(0) as u32);
        if size != self.page_size {
            self.page_size = size;
            let search = self.fetcher.current_query().search;
            self.spawn_fetch(PageQuery::new(0, size, search));
        }
    }

    fn search_changed(&mut self) {
        self.debouncer.on_change(&self.search_input, self.page_size);
    }

    fn submit_search(&mut self) {
        self.debouncer.cancel_pending();
        self.spawn_fetch(PageQuery::new(0, self.page_size, Some(self.search_input.clone())));
        self.mode = Mode::Browse;
    }

    fn start_edit(&mut self) {
        let selected = self
            .selected_image()
            .map(|image| (image.id.clone(), image.alt().to_string()));
        let Some((id, alt)) = selected else {
            self.message = Some("No image selected".to_string());
            return;
        };
        self.edit_input = alt;
        self.editing = Some(id);
        self.mode = Mode::Edit;
    }

    fn save_edit(&mut self) {
        self.mode = Mode::Browse;
        let Some(id) = self.editing.take() else {
            return;
        };
        let alt_text = Some(self.edit_input.trim().to_string()).filter(|text| !text.is_empty());
        let Some(previous) = self.fetcher.patch_alt_text(&id, alt_text.clone()) else {
            self.message = Some("Image is no longer on this page".to_string());
            return;
        };
        if previous == alt_text {
            return;
        }
        let seq = self.begin_save(&id, previous.clone());
        self.undo.push(AltEdit {
            id: id.clone(),
            previous,
            seq,
        });
        self.spawn_save(id, alt_text, seq);
    }

    fn undo_edit(&mut self) {
        let Some(edit) = self.undo.pop() else {
            self.message = Some("Nothing to undo".to_string());
            return;
        };
        let replaced = self
            .fetcher
            .patch_alt_text(&edit.id, edit.previous.clone())
            .flatten();
        self.message = Some(format!("Reverted alt text for {}", edit.id));
        let seq = self.begin_save(&edit.id, replaced);
        self.spawn_save(edit.id, edit.previous, seq);
    }

    /// Registers a save for `id`. `previous` becomes the confirmed value
    /// only when no other save for the image is in flight.
    fn begin_save(&mut self, id: &str, previous: Option<String>) -> u64 {
        self.next_save += 1;
        let seq = self.next_save;
        let pending = self
            .pending
            .entry(id.to_string())
            .or_insert_with(|| PendingAlt {
                latest: 0,
                latest_failed: false,
                confirmed: previous,
                confirmed_seq: 0,
                in_flight: 0,
            });
        pending.latest = seq;
        pending.latest_failed = false;
        pending.in_flight += 1;
        seq
    }

    fn spawn_save(&self, id: String, alt_text: Option<String>, seq: u64) {
        let source = Arc::clone(self.fetcher.source());
        let tx = self.save_tx.clone();
        tokio::spawn(async move {
            let result = source
                .update_alt_text(&id, alt_text.as_deref())
                .await
                .map(|_| ())
                .map_err(|err| err.to_string());
            let _ = tx.send(SaveResult {
                id,
                seq,
                alt_text,
                result,
            });
        });
    }

    fn drain_saves(&mut self) {
        loop {
            match self.save_rx.try_recv() {
                Ok(save) => self.apply_save_result(save),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Local text only falls back once the latest save for the image has
    /// failed, and then only to a value the server accepted.
    fn apply_save_result(&mut self, save: SaveResult) {
        let Some(pending) = self.pending.get_mut(&save.id) else {
            return;
        };
        pending.in_flight = pending.in_flight.saturating_sub(1);
        match save.result {
            Ok(()) => {
                info!(id = %save.id, seq = save.seq, "alt text saved");
                if save.seq > pending.confirmed_seq {
                    pending.confirmed = save.alt_text;
                    pending.confirmed_seq = save.seq;
                    if pending.latest_failed {
                        self.fetcher.patch_alt_text(&save.id, pending.confirmed.clone());
                    }
                }
                self.message = Some(format!("Saved alt text for {}", save.id));
            }
            Err(err) => {
                warn!(id = %save.id, seq = save.seq, "alt text save failed: {err}");
                self.undo.retain(|edit| edit.seq != save.seq);
                if save.seq == pending.latest {
                    pending.latest_failed = true;
                    self.fetcher.patch_alt_text(&save.id, pending.confirmed.clone());
                }
                self.message = Some(format!("Failed to save alt text for {}: {err}", save.id));
            }
        }
        if pending.in_flight == 0 {
            self.pending.remove(&save.id);
        }
    }

    fn copy_alt_text(&mut self) {
        let Some(alt) = self.selected_image().map(|image| image.alt().to_string()) else {
            return;
        };
        let copied = Clipboard::new()
            .ok()
            .and_then(|mut clipboard| clipboard.set_text(alt).ok())
            .is_some();
        self.message = Some(if copied {
            "Alt text copied to clipboard".to_string()
        } else {
            "Clipboard is unavailable".to_string()
        });
    }
}

/// Returns `true` when the app should exit.
pub fn handle_key<S: ImageSource>(app: &mut App<S>, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match app.mode {
        Mode::Browse => handle_browse_key(app, key),
        Mode::Search => {
            handle_search_key(app, key);
            false
        }
        Mode::Edit => {
            handle_edit_key(app, key);
            false
        }
        Mode::Help => {
            app.mode = Mode::Browse;
            false
        }
    }
}

fn handle_browse_key<S: ImageSource>(app: &mut App<S>, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::Char('/') => app.mode = Mode::Search,
        KeyCode::Char('n') | KeyCode::Right => app.next_page(),
        KeyCode::Char('p') | KeyCode::Left => app.previous_page(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('f') => {
            app.filter = app.filter.next();
            app.selection = 0;
        }
        KeyCode::Char('s') => {
            app.sort = app.sort.next();
            app.selection = 0;
        }
        KeyCode::Char('e') | KeyCode::Enter => app.start_edit(),
        KeyCode::Char('u') => app.undo_edit(),
        KeyCode::Char('c') => app.copy_alt_text(),
        KeyCode::Char('+') => app.resize_page(1),
        KeyCode::Char('-') => app.resize_page(-1),
        KeyCode::Char('?') => app.mode = Mode::Help,
        _ => {}
    }
    false
}

fn handle_search_key<S: ImageSource>(app: &mut App<S>, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.mode = Mode::Browse,
        KeyCode::Enter => app.submit_search(),
        KeyCode::Backspace => {
            if app.search_input.pop().is_some() {
                app.search_changed();
            }
        }
        KeyCode::Char(ch) => {
            app.search_input.push(ch);
            app.search_changed();
        }
        _ => {}
    }
}

fn handle_edit_key<S: ImageSource>(app: &mut App<S>, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.edit_input.clear();
            app.editing = None;
            app.mode = Mode::Browse;
        }
        KeyCode::Enter => app.save_edit(),
        KeyCode::Backspace => {
            app.edit_input.pop();
        }
        KeyCode::Char(ch) => app.edit_input.push(ch),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::testing::MockSource;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text<S: ImageSource>(app: &mut App<S>, text: &str) {
        for ch in text.chars() {
            handle_key(app, key(KeyCode::Char(ch)));
        }
    }

    async fn settle<S: ImageSource>(app: &mut App<S>) {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        app.tick();
    }

    async fn started_app() -> App<MockSource> {
        let fetcher = Arc::new(ImageListFetcher::new(MockSource::default(), 20));
        let mut app = App::new(fetcher, Duration::from_millis(420), 20);
        app.start();
        settle(&mut app).await;
        app
    }

    #[tokio::test]
    async fn start_loads_first_page_and_lints_it() {
        let app = started_app().await;
        assert_eq!(app.list.images.len(), 20);
        assert_eq!(app.report.lints.len(), 20);
        // "Image 0".."Image 19" are all shorter than 15 chars
        assert_eq!(app.report.counts.short, 20);
    }

    #[tokio::test]
    async fn paging_moves_offset_by_page_size() {
        let mut app = started_app().await;
        handle_key(&mut app, key(KeyCode::Char('n')));
        settle(&mut app).await;
        assert_eq!(app.list.offset, 20);

        handle_key(&mut app, key(KeyCode::Char('p')));
        settle(&mut app).await;
        assert_eq!(app.list.offset, 0);

        handle_key(&mut app, key(KeyCode::Char('p')));
        assert_eq!(app.message.as_deref(), Some("Already on the first page"));
    }

    #[tokio::test]
    async fn edit_patches_locally_and_saves() {
        let mut app = started_app().await;
        handle_key(&mut app, key(KeyCode::Char('j')));
        handle_key(&mut app, key(KeyCode::Char('e')));
        assert_eq!(app.mode, Mode::Edit);
        assert_eq!(app.edit_input, "Image 1");

        app.edit_input.clear();
        type_text(&mut app, "Navy canvas tote bag");
        handle_key(&mut app, key(KeyCode::Enter));
        app.tick();
        assert_eq!(app.list.images[1].alt(), "Navy canvas tote bag");
        assert_eq!(app.undo_depth(), 1);

        settle(&mut app).await;
        let saves = app.fetcher.source().saves();
        assert_eq!(
            saves,
            [("1".to_string(), Some("Navy canvas tote bag".to_string()))]
        );
        assert_eq!(app.message.as_deref(), Some("Saved alt text for 1"));
    }

    #[tokio::test]
    async fn failed_save_reverts_optimistic_patch() {
        let mut app = started_app().await;
        app.fetcher.source().set_fail_saves(true);
        handle_key(&mut app, key(KeyCode::Char('e')));
        app.edit_input = "Red leather ankle boot".to_string();
        handle_key(&mut app, key(KeyCode::Enter));

        settle(&mut app).await;
        settle(&mut app).await;
        assert_eq!(app.list.images[0].alt(), "Image 0");
        assert_eq!(app.undo_depth(), 0);
        assert!(app.message.as_deref().unwrap().contains("save rejected"));
    }

    #[tokio::test]
    async fn overlapping_failed_saves_restore_server_text() {
        let mut app = started_app().await;
        app.fetcher.source().set_fail_saves(true);
        for alt in ["First attempt alt", "Second attempt alt"] {
            handle_key(&mut app, key(KeyCode::Char('e')));
            app.edit_input = alt.to_string();
            handle_key(&mut app, key(KeyCode::Enter));
        }
        assert_eq!(app.undo_depth(), 2);

        settle(&mut app).await;
        settle(&mut app).await;
        assert_eq!(app.fetcher.source().saves().len(), 2);
        assert_eq!(app.list.images[0].alt(), "Image 0");
        assert_eq!(app.undo_depth(), 0);
    }

    #[tokio::test]
    async fn failed_save_after_accepted_one_keeps_accepted_text() {
        let mut app = started_app().await;
        handle_key(&mut app, key(KeyCode::Char('e')));
        app.edit_input = "Brown suede chelsea boot".to_string();
        handle_key(&mut app, key(KeyCode::Enter));
        settle(&mut app).await;

        app.fetcher.source().set_fail_saves(true);
        handle_key(&mut app, key(KeyCode::Char('e')));
        app.edit_input = "Rejected alt text".to_string();
        handle_key(&mut app, key(KeyCode::Enter));
        settle(&mut app).await;
        settle(&mut app).await;

        assert_eq!(app.list.images[0].alt(), "Brown suede chelsea boot");
        assert_eq!(app.undo_depth(), 1);
    }

    #[tokio::test]
    async fn undo_restores_previous_alt_text() {
        let mut app = started_app().await;
        handle_key(&mut app, key(KeyCode::Char('e')));
        app.edit_input = "Green merino wool scarf".to_string();
        handle_key(&mut app, key(KeyCode::Enter));
        settle(&mut app).await;

        handle_key(&mut app, key(KeyCode::Char('u')));
        settle(&mut app).await;
        assert_eq!(app.list.images[0].alt(), "Image 0");
        assert_eq!(app.undo_depth(), 0);
        let saves = app.fetcher.source().saves();
        assert_eq!(saves.last(), Some(&("0".to_string(), Some("Image 0".to_string()))));

        handle_key(&mut app, key(KeyCode::Char('u')));
        assert_eq!(app.message.as_deref(), Some("Nothing to undo"));
    }

    #[tokio::test]
    async fn filter_cycle_narrows_visible_rows() {
        let mut app = started_app().await;
        handle_key(&mut app, key(KeyCode::Char('f')));
        assert_eq!(app.filter, LintFilter::Missing);
        assert!(app.visible().is_empty());
        handle_key(&mut app, key(KeyCode::Char('f')));
        assert_eq!(app.filter, LintFilter::Short);
        assert_eq!(app.visible().len(), 20);
    }

    #[tokio::test]
    async fn search_enter_fetches_immediately() {
        let mut app = started_app().await;
        handle_key(&mut app, key(KeyCode::Char('/')));
        type_text(&mut app, "boots");
        handle_key(&mut app, key(KeyCode::Enter));
        assert_eq!(app.mode, Mode::Browse);
        settle(&mut app).await;

        let calls = app.fetcher.source().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].search.as_deref(), Some("boots"));
    }

    #[tokio::test]
    async fn page_size_steps_and_refetches() {
        let mut app = started_app().await;
        handle_key(&mut app, key(KeyCode::Char('+')));
        settle(&mut app).await;
        assert_eq!(app.page_size, 25);
        assert_eq!(app.list.images.len(), 25);
    }

    #[tokio::test]
    async fn fetch_error_surfaces_as_message() {
        let mut app = started_app().await;
        app.fetcher.source().set_failure(Some(|| FetchError::RateLimited {
            retry_after_secs: Some(30),
        }));
        handle_key(&mut app, key(KeyCode::Char('r')));
        settle(&mut app).await;
        assert_eq!(
            app.message.as_deref(),
            Some("Rate limit exceeded. Please wait 30s and retry.")
        );
    }

    #[tokio::test]
    async fn repeated_identical_failure_is_shown_again() {
        let mut app = started_app().await;
        app.fetcher.source().set_failure(Some(|| FetchError::RateLimited {
            retry_after_secs: Some(30),
        }));
        for _ in 0..2 {
            handle_key(&mut app, key(KeyCode::Char('r')));
            assert_eq!(app.message, None);
            settle(&mut app).await;
            assert_eq!(
                app.message.as_deref(),
                Some("Rate limit exceeded. Please wait 30s and retry.")
            );
        }
    }

    #[tokio::test]
    async fn paging_keeps_applied_search() {
        let mut app = started_app().await;
        handle_key(&mut app, key(KeyCode::Char('/')));
        type_text(&mut app, "boots");
        handle_key(&mut app, key(KeyCode::Esc));
        assert_eq!(app.mode, Mode::Browse);

        handle_key(&mut app, key(KeyCode::Char('n')));
        settle(&mut app).await;
        let calls = app.fetcher.source().calls();
        assert_eq!(calls.last(), Some(&PageQuery::new(20, 20, None)));
        assert_eq!(app.list.offset, 20);
    }
}
