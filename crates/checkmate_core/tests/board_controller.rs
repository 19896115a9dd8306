use checkmate_core::board::{
    BoardController, BoardEvent, BoardHandle, BoardState, Notification, SheetTag,
};
use checkmate_core::model::task::{Task, Todo};
use checkmate_core::repo::task_repo::RepoError;
use checkmate_core::store::TaskStore;
use chrono::NaiveDate;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn wait_until(
    board: &BoardHandle,
    predicate: impl FnMut(&BoardState) -> bool,
) -> BoardState {
    timeout(WAIT, board.wait_for(predicate))
        .await
        .expect("state should settle in time")
        .expect("board should be running")
}

async fn next_notification(notes: &mut Receiver<Notification>) -> Notification {
    timeout(WAIT, notes.recv())
        .await
        .expect("notification should arrive in time")
        .expect("notification channel should be open")
}

fn titles(state: &BoardState) -> Vec<String> {
    state
        .selected_tasks()
        .iter()
        .map(|task| task.title().to_string())
        .collect()
}

#[tokio::test]
async fn scenario_saved_todo_appears_on_selected_monday() {
    let store = TaskStore::open_in_memory().unwrap();
    let monday = date(2024, 6, 10);
    let board = BoardController::spawn(store, monday).unwrap();
    let mut notes = board.subscribe_notifications();
    wait_until(&board, BoardState::week_is_current).await;

    board
        .send(BoardEvent::SaveNewTodo {
            title: "Buy milk".to_string(),
            date: None,
        })
        .unwrap();

    let state = wait_until(&board, |state| !state.selected_tasks().is_empty()).await;
    let todo = state.selected_tasks()[0].as_todo().cloned().unwrap();
    assert_eq!(todo.title, "Buy milk");
    assert_eq!(todo.date, monday);
    assert!(!todo.is_completed);

    let settled = wait_until(&board, |state| !state.is_loading).await;
    assert!(!settled.sheet.is_open());
    assert!(matches!(notes.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn scenario_toggle_marks_todo_completed() {
    let store = TaskStore::open_in_memory().unwrap();
    let monday = date(2024, 6, 10);
    let id = store.add_todo(Todo::new("a", monday)).await.unwrap();
    let board = BoardController::spawn(store, monday).unwrap();
    wait_until(&board, |state| state.find_todo(id).is_some()).await;

    board.send(BoardEvent::ToggleTodo(id)).unwrap();
    wait_until(&board, |state| {
        state.find_todo(id).is_some_and(|todo| todo.is_completed)
    })
    .await;

    board.send(BoardEvent::ToggleTodo(id)).unwrap();
    let state = wait_until(&board, |state| {
        !state.is_loading && state.find_todo(id).is_some_and(|todo| !todo.is_completed)
    })
    .await;
    assert_eq!(titles(&state), vec!["a".to_string()]);
}

#[tokio::test]
async fn scenario_next_monday_reloads_week() {
    let store = TaskStore::open_in_memory().unwrap();
    let next_week = date(2024, 6, 17);
    store.add_todo(Todo::new("later", next_week)).await.unwrap();
    let board = BoardController::spawn(store, date(2024, 6, 10)).unwrap();
    wait_until(&board, BoardState::week_is_current).await;

    board.send(BoardEvent::ChangeSelectedDate(next_week)).unwrap();

    let state = wait_until(&board, |state| {
        state.week_is_current() && state.current_week_monday() == next_week
    })
    .await;
    assert_eq!(titles(&state), vec!["later".to_string()]);
}

#[tokio::test]
async fn scenario_move_incomplete_todos_to_today() {
    let store = TaskStore::open_in_memory().unwrap();
    let day = date(2024, 6, 10);
    let today = date(2024, 6, 15);
    let first = store.add_todo(Todo::new("one", day)).await.unwrap();
    let second = store.add_todo(Todo::new("two", day)).await.unwrap();
    let done = store.add_todo(Todo::new("done", day)).await.unwrap();
    store.toggle_todo(done).await.unwrap();

    let board = BoardController::spawn(store, today).unwrap();
    let mut notes = board.subscribe_notifications();
    board.send(BoardEvent::ChangeSelectedDate(day)).unwrap();
    wait_until(&board, |state| state.selected_tasks().len() == 3).await;

    board.send(BoardEvent::RequestMoveIncompleteTodos).unwrap();
    board.send(BoardEvent::ConfirmMoveIncompleteTodos).unwrap();

    assert_eq!(
        next_notification(&mut notes).await,
        Notification::TodosMoved { count: 2 }
    );
    let state = wait_until(&board, |state| {
        state.selected_date == today && state.selected_tasks().len() == 2
    })
    .await;
    let moved: Vec<_> = state.selected_tasks().iter().map(Task::id).collect();
    assert_eq!(moved, vec![second, first]);
    assert!(state
        .selected_tasks()
        .iter()
        .all(|task| task.date() == today));
    assert!(!state.dialog.is_open());
}

#[tokio::test]
async fn partial_move_reports_counts_and_keeps_selection() {
    let store = TaskStore::open_in_memory().unwrap();
    let day = date(2024, 6, 10);
    let today = date(2024, 6, 15);
    let vanished = store.add_todo(Todo::new("one", day)).await.unwrap();
    let survivor = store.add_todo(Todo::new("two", day)).await.unwrap();

    let board = BoardController::spawn(store.clone(), today).unwrap();
    let mut notes = board.subscribe_notifications();
    board.send(BoardEvent::ChangeSelectedDate(day)).unwrap();
    wait_until(&board, |state| state.selected_tasks().len() == 2).await;

    // Raw deletion skips the change signal, so the board still lists both.
    store
        .execute(move |conn| {
            conn.execute("DELETE FROM todos WHERE id = ?1", [vanished])
                .map_err(RepoError::from)?;
            Ok(())
        })
        .await
        .unwrap();

    board.send(BoardEvent::RequestMoveIncompleteTodos).unwrap();
    board.send(BoardEvent::ConfirmMoveIncompleteTodos).unwrap();

    assert_eq!(
        next_notification(&mut notes).await,
        Notification::MoveFailed {
            moved: 1,
            failed: 1
        }
    );
    let state = wait_until(&board, |state| {
        !state.is_loading
            && state
                .week_tasks
                .as_ref()
                .is_some_and(|week| week.tasks_on(today).len() == 1)
    })
    .await;
    assert_eq!(state.selected_date, day);
    assert!(state.selected_tasks().is_empty());
    let moved = state.week_tasks.as_ref().unwrap().tasks_on(today)[0].as_todo().unwrap();
    assert_eq!((moved.id, moved.date), (survivor, today));
    assert!(!state.dialog.is_open());
}

#[tokio::test]
async fn edited_todo_title_is_saved_and_sheet_closes() {
    let store = TaskStore::open_in_memory().unwrap();
    let monday = date(2024, 6, 10);
    let id = store.add_todo(Todo::new("draft", monday)).await.unwrap();
    let board = BoardController::spawn(store, monday).unwrap();
    let state = wait_until(&board, |state| state.find_todo(id).is_some()).await;
    let todo = state.find_todo(id).cloned().unwrap();

    board.send(BoardEvent::OpenSheet(SheetTag::EditTodo { todo })).unwrap();
    board
        .send(BoardEvent::UpdateTodoTitle {
            id,
            title: "  renamed ".to_string(),
        })
        .unwrap();

    let state = wait_until(&board, |state| {
        !state.is_loading && titles(state) == vec!["renamed".to_string()]
    })
    .await;
    assert!(!state.sheet.is_open());
    let saved = state.find_todo(id).unwrap();
    assert_eq!((saved.date, saved.is_completed), (monday, false));
}

#[tokio::test]
async fn move_with_nothing_incomplete_still_selects_today() {
    let store = TaskStore::open_in_memory().unwrap();
    let today = date(2024, 6, 15);
    let board = BoardController::spawn(store, today).unwrap();
    let mut notes = board.subscribe_notifications();
    board
        .send(BoardEvent::ChangeSelectedDate(date(2024, 6, 3)))
        .unwrap();
    board.send(BoardEvent::RequestMoveIncompleteTodos).unwrap();
    board.send(BoardEvent::ConfirmMoveIncompleteTodos).unwrap();

    assert_eq!(
        next_notification(&mut notes).await,
        Notification::TodosMoved { count: 0 }
    );
    let state = wait_until(&board, |state| state.selected_date == today).await;
    assert_eq!(state.current_week_monday(), date(2024, 6, 10));
}

#[tokio::test]
async fn delete_notifies_and_removes_task() {
    let store = TaskStore::open_in_memory().unwrap();
    let monday = date(2024, 6, 10);
    let keep = store.add_todo(Todo::new("keep", monday)).await.unwrap();
    let gone = store.add_todo(Todo::new("gone", monday)).await.unwrap();
    let board = BoardController::spawn(store, monday).unwrap();
    let mut notes = board.subscribe_notifications();
    wait_until(&board, |state| state.selected_tasks().len() == 2).await;

    board.send(BoardEvent::DeleteTask(gone)).unwrap();

    assert_eq!(next_notification(&mut notes).await, Notification::TaskDeleted);
    let state = wait_until(&board, |state| state.selected_tasks().len() == 1).await;
    assert_eq!(state.selected_tasks()[0].id(), keep);
}

#[tokio::test]
async fn blank_title_is_reported_and_never_replayed() {
    let store = TaskStore::open_in_memory().unwrap();
    let board = BoardController::spawn(store, date(2024, 6, 10)).unwrap();
    let mut early = board.subscribe_notifications();

    board
        .send(BoardEvent::SaveNewMemo {
            title: "   ".to_string(),
            content: "body".to_string(),
            date: None,
        })
        .unwrap();

    assert_eq!(next_notification(&mut early).await, Notification::TitleRequired);
    let mut late = board.subscribe_notifications();
    assert!(matches!(late.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn storage_failure_becomes_notification_and_clears_loading() {
    let store = TaskStore::open_in_memory().unwrap();
    store
        .execute(|conn| {
            conn.execute_batch("DROP TABLE todos;")
                .map_err(RepoError::from)?;
            Ok(())
        })
        .await
        .unwrap();
    let board = BoardController::spawn(store, date(2024, 6, 10)).unwrap();
    let mut notes = board.subscribe_notifications();

    board
        .send(BoardEvent::SaveNewTodo {
            title: "a".to_string(),
            date: None,
        })
        .unwrap();

    // The week load fails too; skip its notification if it comes first.
    loop {
        let note = next_notification(&mut notes).await;
        assert!(note.is_failure());
        if note == Notification::SaveFailed {
            break;
        }
    }
    assert!(!board.state().is_loading);
}

#[tokio::test]
async fn shutdown_stops_publishing() {
    let store = TaskStore::open_in_memory().unwrap();
    let board = BoardController::spawn(store, date(2024, 6, 10)).unwrap();
    let mut states = board.subscribe_state();

    board.shutdown().await;

    states.borrow_and_update();
    assert!(timeout(WAIT, states.changed()).await.unwrap().is_err());
}
