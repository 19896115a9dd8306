//! Board owner task.
//!
//! # Responsibility
//! - Serialize every intent through one Tokio task that owns `BoardState`.
//! - Run reducer effects against the `TaskStore` and keep the week
//!   subscription in sync with `current_week`.
//! - Publish snapshots (watch) and one-shot notifications (broadcast).
//!
//! # Invariants
//! - No two transitions run concurrently against the same state.
//! - `is_loading` is set before every store mutation and cleared after it,
//!   on success and failure alike.
//! - State is only changed from store emissions, never optimistically.
//! - After teardown nothing is published; late store replies are dropped.

use super::event::{BoardEvent, Effect, Notification};
use super::reducer::{reduce, select};
use super::state::{BoardState, ModalState};
use crate::model::task::{Task, Todo};
use crate::service::week_service::{subscribe_window, WeekTaskQuery};
use crate::store::{StoreResult, TaskStore};
use crate::week::{WeekOutOfRange, WeekTaskMap, WeekWindow};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const NOTIFICATION_CAPACITY: usize = 32;

/// Returned when sending to a board whose owner task has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardClosed;

impl Display for BoardClosed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "board controller is closed")
    }
}

impl Error for BoardClosed {}

/// UI-side handle. Dropping it tears the board down.
pub struct BoardHandle {
    intents: mpsc::UnboundedSender<BoardEvent>,
    state: watch::Receiver<BoardState>,
    notifications: broadcast::Sender<Notification>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl BoardHandle {
    /// Queues an intent. Intents are applied in send order.
    pub fn send(&self, event: BoardEvent) -> Result<(), BoardClosed> {
        if self.cancel.is_cancelled() {
            return Err(BoardClosed);
        }
        self.intents.send(event).map_err(|_| BoardClosed)
    }

    /// Latest published snapshot.
    pub fn state(&self) -> BoardState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<BoardState> {
        self.state.clone()
    }

    /// Attaches a notification listener. Only notifications sent while the
    /// receiver exists are delivered.
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Waits until a published snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&BoardState) -> bool,
    ) -> Result<BoardState, BoardClosed> {
        let mut state = self.state.clone();
        let snapshot = state
            .wait_for(|current| predicate(current))
            .await
            .map_err(|_| BoardClosed)?;
        Ok(snapshot.clone())
    }

    /// Cancels the owner task and waits for it to stop.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!("event=board_stop module=board status=error error={err}");
            }
        }
    }
}

impl Drop for BoardHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Single owner of one board session.
pub struct BoardController {
    store: TaskStore,
    state: BoardState,
    week: Option<WeekTaskQuery>,
    publisher: watch::Sender<BoardState>,
    notifications: broadcast::Sender<Notification>,
}

enum Step {
    Stop,
    Intent(BoardEvent),
    Week(Option<StoreResult<WeekTaskMap>>),
}

impl BoardController {
    /// Starts a board anchored on `today`.
    ///
    /// Must be called from within a Tokio runtime. Fails without spawning
    /// when `today` has no complete week in the calendar range.
    pub fn spawn(store: TaskStore, today: NaiveDate) -> Result<BoardHandle, WeekOutOfRange> {
        let state = BoardState::new(today)?;
        let (publisher, state_rx) = watch::channel(state.clone());
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let (intents_tx, intents_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let controller = Self {
            store,
            state,
            week: None,
            publisher,
            notifications: notifications.clone(),
        };
        let task = tokio::spawn(controller.run(intents_rx, cancel.clone()));
        info!("event=board_start module=board status=ok today={today}");

        Ok(BoardHandle {
            intents: intents_tx,
            state: state_rx,
            notifications,
            cancel,
            task: Some(task),
        })
    }

    /// Starts a board anchored on the local clock's date.
    pub fn spawn_for_today(store: TaskStore) -> Result<BoardHandle, WeekOutOfRange> {
        Self::spawn(store, chrono::Local::now().date_naive())
    }

    async fn run(
        mut self,
        mut intents: mpsc::UnboundedReceiver<BoardEvent>,
        cancel: CancellationToken,
    ) {
        self.subscribe(self.state.current_week);

        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Stop,
                emission = next_week(&mut self.week) => Step::Week(emission),
                intent = intents.recv() => intent.map_or(Step::Stop, Step::Intent),
            };

            match step {
                Step::Stop => break,
                Step::Week(emission) => self.on_week(emission),
                Step::Intent(event) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = self.handle(event) => {}
                    }
                }
            }
        }

        info!("event=board_stop module=board status=ok");
    }

    async fn handle(&mut self, event: BoardEvent) {
        debug!("event=board_intent module=board status=start intent={}", intent_name(&event));
        let effect = reduce(&mut self.state, event);
        self.publish();
        self.run_effect(effect).await;
    }

    async fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::Subscribe(window) => self.subscribe(window),
            Effect::Notify(notification) => self.notify(notification),
            Effect::Toggle(id) => {
                self.set_loading(true);
                let result = self.store.toggle_todo(id).await;
                self.set_loading(false);
                if result.is_err() {
                    self.notify(Notification::ToggleFailed);
                }
            }
            Effect::Delete(id) => {
                self.set_loading(true);
                let result = self.store.delete_task(id).await;
                self.set_loading(false);
                match result {
                    Ok(()) => self.notify(Notification::TaskDeleted),
                    Err(_) => self.notify(Notification::DeleteFailed),
                }
            }
            Effect::Create(task) => {
                let date = task.date();
                self.set_loading(true);
                let result = match task {
                    Task::Todo(todo) => self.store.add_todo(todo).await,
                    Task::Memo(memo) => self.store.add_memo(memo).await,
                };
                match result {
                    Ok(_) => {
                        self.state.sheet = ModalState::Closed;
                        let follow_up = select(&mut self.state, date);
                        self.set_loading(false);
                        self.run_subscribe(follow_up);
                    }
                    Err(_) => {
                        self.set_loading(false);
                        self.notify(Notification::SaveFailed);
                    }
                }
            }
            Effect::Update(task) => {
                self.set_loading(true);
                let result = match task {
                    Task::Todo(todo) => self.store.update_todo(todo).await,
                    Task::Memo(memo) => self.store.update_memo(memo).await,
                };
                match result {
                    Ok(()) => {
                        self.state.sheet = ModalState::Closed;
                        self.set_loading(false);
                    }
                    Err(_) => {
                        self.set_loading(false);
                        self.notify(Notification::UpdateFailed);
                    }
                }
            }
            Effect::Move { todos, to } => self.move_todos(todos, to).await,
        }
    }

    /// Re-dates each todo independently; already moved todos stay moved
    /// when a later one fails.
    async fn move_todos(&mut self, todos: Vec<Todo>, to: NaiveDate) {
        self.set_loading(true);
        let total = todos.len();
        let mut failed = 0usize;
        for todo in todos {
            let moved = Todo { date: to, ..todo };
            if self.store.update_todo(moved).await.is_err() {
                failed += 1;
            }
        }

        if failed > 0 {
            self.set_loading(false);
            warn!("event=board_move module=board status=error moved={} failed={}", total - failed, failed);
            self.notify(Notification::MoveFailed {
                moved: total - failed,
                failed,
            });
            return;
        }

        let follow_up = select(&mut self.state, to);
        self.set_loading(false);
        self.run_subscribe(follow_up);
        info!("event=board_move module=board status=ok moved={total}");
        self.notify(Notification::TodosMoved { count: total });
    }

    fn on_week(&mut self, emission: Option<StoreResult<WeekTaskMap>>) {
        match emission {
            Some(Ok(map)) => {
                if self.state.apply_week(map) {
                    self.publish();
                }
            }
            Some(Err(err)) => {
                self.week = None;
                self.state.load_error = Some(err.to_string());
                self.publish();
                self.notify(Notification::LoadFailed);
            }
            None => self.week = None,
        }
    }

    fn run_subscribe(&mut self, effect: Effect) {
        if let Effect::Subscribe(window) = effect {
            self.subscribe(window);
        }
    }

    fn subscribe(&mut self, window: WeekWindow) {
        debug!("event=board_subscribe module=board status=ok monday={}", window.monday);
        self.week = Some(subscribe_window(&self.store, window));
    }

    fn set_loading(&mut self, is_loading: bool) {
        self.state.is_loading = is_loading;
        self.publish();
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    fn notify(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            debug!("event=board_notify module=board status=dropped reason=no_listener");
        }
    }
}

async fn next_week(query: &mut Option<WeekTaskQuery>) -> Option<StoreResult<WeekTaskMap>> {
    match query {
        Some(query) => query.next().await,
        None => std::future::pending().await,
    }
}

fn intent_name(event: &BoardEvent) -> &'static str {
    match event {
        BoardEvent::ChangeSelectedDate(_) => "change_selected_date",
        BoardEvent::JumpToToday => "jump_to_today",
        BoardEvent::PreviousWeek => "previous_week",
        BoardEvent::NextWeek => "next_week",
        BoardEvent::ToggleTodo(_) => "toggle_todo",
        BoardEvent::DeleteTask(_) => "delete_task",
        BoardEvent::SaveNewTodo { .. } => "save_new_todo",
        BoardEvent::SaveNewMemo { .. } => "save_new_memo",
        BoardEvent::UpdateTodoTitle { .. } => "update_todo_title",
        BoardEvent::UpdateMemo { .. } => "update_memo",
        BoardEvent::RequestMoveIncompleteTodos => "request_move",
        BoardEvent::ConfirmMoveIncompleteTodos => "confirm_move",
        BoardEvent::ExpandFab => "expand_fab",
        BoardEvent::CollapseFab => "collapse_fab",
        BoardEvent::OpenSheet(_) => "open_sheet",
        BoardEvent::CloseSheet => "close_sheet",
        BoardEvent::CloseDialog => "close_dialog",
    }
}
