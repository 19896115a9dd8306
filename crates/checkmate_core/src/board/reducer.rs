//! Pure board transitions.
//!
//! `reduce` mutates only the in-memory snapshot and names at most one I/O
//! step for the controller. Persisted data is never touched here, so every
//! transition is testable without a store.

use super::event::{BoardEvent, Effect, Notification};
use super::state::{BoardState, DialogTag, ModalState};
use crate::model::task::{is_blank_title, Memo, Task, Todo};
use crate::week::DAYS_PER_WEEK;
use chrono::{Days, NaiveDate};
use log::debug;

/// Applies one intent to `state` and returns the follow-up effect.
pub fn reduce(state: &mut BoardState, event: BoardEvent) -> Effect {
    match event {
        BoardEvent::ChangeSelectedDate(date) => select(state, date),
        BoardEvent::JumpToToday => {
            let today = state.today;
            select(state, today)
        }
        BoardEvent::PreviousWeek => {
            let week = Days::new(DAYS_PER_WEEK);
            match state.selected_date.checked_sub_days(week) {
                Some(target) => select(state, target),
                None => skip_out_of_range(state.selected_date),
            }
        }
        BoardEvent::NextWeek => {
            let week = Days::new(DAYS_PER_WEEK);
            match state.selected_date.checked_add_days(week) {
                Some(target) => select(state, target),
                None => skip_out_of_range(state.selected_date),
            }
        }
        BoardEvent::ToggleTodo(id) => Effect::Toggle(id),
        BoardEvent::DeleteTask(id) => Effect::Delete(id),
        BoardEvent::SaveNewTodo { title, date } => {
            if is_blank_title(&title) {
                return Effect::Notify(Notification::TitleRequired);
            }
            let date = date.unwrap_or(state.selected_date);
            Effect::Create(Task::Todo(Todo::new(title.trim(), date)))
        }
        BoardEvent::SaveNewMemo {
            title,
            content,
            date,
        } => {
            if is_blank_title(&title) {
                return Effect::Notify(Notification::TitleRequired);
            }
            let date = date.unwrap_or(state.selected_date);
            Effect::Create(Task::Memo(Memo::new(title.trim(), content, date)))
        }
        BoardEvent::UpdateTodoTitle { id, title } => {
            if is_blank_title(&title) {
                return Effect::Notify(Notification::TitleRequired);
            }
            match state.find_todo(id) {
                Some(existing) => Effect::Update(Task::Todo(Todo {
                    title: title.trim().to_string(),
                    ..existing.clone()
                })),
                None => {
                    debug!("event=board_update module=board status=skipped reason=todo_not_loaded id={id}");
                    Effect::Notify(Notification::UpdateFailed)
                }
            }
        }
        BoardEvent::UpdateMemo { id, title, content } => {
            if is_blank_title(&title) {
                return Effect::Notify(Notification::TitleRequired);
            }
            match state.find_memo(id) {
                Some(existing) => Effect::Update(Task::Memo(Memo {
                    title: title.trim().to_string(),
                    content,
                    ..existing.clone()
                })),
                None => {
                    debug!("event=board_update module=board status=skipped reason=memo_not_loaded id={id}");
                    Effect::Notify(Notification::UpdateFailed)
                }
            }
        }
        BoardEvent::RequestMoveIncompleteTodos => {
            state.dialog = ModalState::Opened(DialogTag::MoveIncompleteTodos);
            Effect::None
        }
        BoardEvent::ConfirmMoveIncompleteTodos => {
            if state.dialog.tag() != Some(&DialogTag::MoveIncompleteTodos) {
                debug!("event=board_move module=board status=skipped reason=not_requested");
                return Effect::None;
            }
            state.dialog = ModalState::Closed;
            let todos = state
                .selected_tasks()
                .iter()
                .filter_map(Task::as_todo)
                .filter(|todo| !todo.is_completed)
                .cloned()
                .collect();
            Effect::Move {
                todos,
                to: state.today,
            }
        }
        BoardEvent::ExpandFab => {
            state.is_fab_expanded = true;
            Effect::None
        }
        BoardEvent::CollapseFab => {
            state.is_fab_expanded = false;
            Effect::None
        }
        BoardEvent::OpenSheet(tag) => {
            state.sheet = ModalState::Opened(tag);
            Effect::None
        }
        BoardEvent::CloseSheet => {
            state.sheet = ModalState::Closed;
            Effect::None
        }
        BoardEvent::CloseDialog => {
            state.dialog = ModalState::Closed;
            Effect::None
        }
    }
}

/// Selects `date`, subscribing to its week when the week changed.
pub(crate) fn select(state: &mut BoardState, date: NaiveDate) -> Effect {
    match state.select_date(date) {
        Ok(Some(window)) => Effect::Subscribe(window),
        Ok(None) => Effect::None,
        Err(_) => skip_out_of_range(date),
    }
}

fn skip_out_of_range(date: NaiveDate) -> Effect {
    debug!("event=board_select module=board status=skipped reason=out_of_range date={date}");
    Effect::None
}

#[cfg(test)]
mod tests {
    use super::reduce;
    use crate::board::event::{BoardEvent, Effect, Notification};
    use crate::board::state::{BoardState, DialogTag, ModalState, SheetTag};
    use crate::model::task::{Memo, Task, Todo};
    use crate::week::{WeekTaskMap, WeekWindow};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn todo(id: i64, title: &str, on: NaiveDate, done: bool) -> Todo {
        Todo {
            id,
            title: title.to_string(),
            date: on,
            is_completed: done,
        }
    }

    fn loaded_state(today: NaiveDate, tasks: Vec<Task>) -> BoardState {
        let mut state = BoardState::new(today).unwrap();
        let map = WeekTaskMap::bucket(state.current_week, tasks);
        assert!(state.apply_week(map));
        state
    }

    #[test]
    fn changing_date_within_week_keeps_loaded_buckets() {
        let monday = date(2024, 6, 10);
        let mut state = loaded_state(monday, vec![Task::Todo(todo(1, "a", monday, false))]);
        let before = state.week_tasks.clone();

        let effect = reduce(&mut state, BoardEvent::ChangeSelectedDate(date(2024, 6, 12)));

        assert_eq!(effect, Effect::None);
        assert_eq!(state.selected_date, date(2024, 6, 12));
        assert_eq!(state.current_week_monday(), monday);
        assert_eq!(state.week_tasks, before);
    }

    #[test]
    fn changing_date_to_next_week_resubscribes() {
        let mut state = loaded_state(date(2024, 6, 10), Vec::new());

        let effect = reduce(&mut state, BoardEvent::ChangeSelectedDate(date(2024, 6, 17)));

        let expected = WeekWindow::try_containing(date(2024, 6, 17)).unwrap();
        assert_eq!(effect, Effect::Subscribe(expected));
        assert_eq!(state.current_week_monday(), date(2024, 6, 17));
        assert!(state.current_week.contains(state.selected_date));
    }

    #[test]
    fn week_buttons_keep_weekday_and_jump_to_today_returns() {
        let mut state = BoardState::new(date(2024, 6, 12)).unwrap();

        let effect = reduce(&mut state, BoardEvent::PreviousWeek);
        assert_eq!(state.selected_date, date(2024, 6, 5));
        assert_eq!(effect, Effect::Subscribe(WeekWindow::try_containing(date(2024, 6, 5)).unwrap()));

        reduce(&mut state, BoardEvent::NextWeek);
        reduce(&mut state, BoardEvent::NextWeek);
        assert_eq!(state.selected_date, date(2024, 6, 19));

        let effect = reduce(&mut state, BoardEvent::JumpToToday);
        assert_eq!(state.selected_date, date(2024, 6, 12));
        assert_eq!(effect, Effect::Subscribe(WeekWindow::try_containing(date(2024, 6, 12)).unwrap()));
    }

    #[test]
    fn blank_titles_only_notify() {
        let mut state = BoardState::new(date(2024, 6, 10)).unwrap();
        let before = state.clone();

        let effect = reduce(
            &mut state,
            BoardEvent::SaveNewTodo {
                title: "  ".to_string(),
                date: None,
            },
        );
        assert_eq!(effect, Effect::Notify(Notification::TitleRequired));

        let effect = reduce(
            &mut state,
            BoardEvent::SaveNewMemo {
                title: String::new(),
                content: "body".to_string(),
                date: None,
            },
        );
        assert_eq!(effect, Effect::Notify(Notification::TitleRequired));
        assert_eq!(state, before);
    }

    #[test]
    fn new_todo_defaults_to_selected_date() {
        let mut state = BoardState::new(date(2024, 6, 10)).unwrap();
        reduce(&mut state, BoardEvent::ChangeSelectedDate(date(2024, 6, 11)));

        let effect = reduce(
            &mut state,
            BoardEvent::SaveNewTodo {
                title: " Buy milk ".to_string(),
                date: None,
            },
        );

        assert_eq!(
            effect,
            Effect::Create(Task::Todo(Todo::new("Buy milk", date(2024, 6, 11))))
        );
    }

    #[test]
    fn update_title_preserves_date_and_completion() {
        let on = date(2024, 6, 11);
        let mut state = loaded_state(date(2024, 6, 10), vec![Task::Todo(todo(3, "old", on, true))]);

        let effect = reduce(
            &mut state,
            BoardEvent::UpdateTodoTitle {
                id: 3,
                title: "new".to_string(),
            },
        );

        assert_eq!(effect, Effect::Update(Task::Todo(todo(3, "new", on, true))));
    }

    #[test]
    fn update_of_unloaded_task_reports_failure() {
        let mut state = loaded_state(date(2024, 6, 10), Vec::new());
        let effect = reduce(
            &mut state,
            BoardEvent::UpdateMemo {
                id: 8,
                title: "t".to_string(),
                content: String::new(),
            },
        );
        assert_eq!(effect, Effect::Notify(Notification::UpdateFailed));
    }

    #[test]
    fn update_memo_replaces_title_and_content() {
        let on = date(2024, 6, 10);
        let mut memo = Memo::new("t", "old", on);
        memo.id = 4;
        let mut state = loaded_state(on, vec![Task::Memo(memo.clone())]);

        let effect = reduce(
            &mut state,
            BoardEvent::UpdateMemo {
                id: 4,
                title: "t2".to_string(),
                content: "new".to_string(),
            },
        );

        memo.title = "t2".to_string();
        memo.content = "new".to_string();
        assert_eq!(effect, Effect::Update(Task::Memo(memo)));
    }

    #[test]
    fn move_requires_confirmation_and_takes_only_incomplete_todos_of_selected_day() {
        let today = date(2024, 6, 15);
        let day = date(2024, 6, 10);
        let mut memo = Memo::new("m", "", day);
        memo.id = 5;
        let mut state = loaded_state(
            today,
            vec![
                Task::Todo(todo(1, "a", day, false)),
                Task::Todo(todo(2, "b", day, true)),
                Task::Todo(todo(3, "c", day, false)),
                Task::Todo(todo(4, "other day", date(2024, 6, 11), false)),
                Task::Memo(memo),
            ],
        );
        reduce(&mut state, BoardEvent::ChangeSelectedDate(day));

        assert_eq!(
            reduce(&mut state, BoardEvent::ConfirmMoveIncompleteTodos),
            Effect::None
        );

        reduce(&mut state, BoardEvent::RequestMoveIncompleteTodos);
        assert_eq!(
            state.dialog,
            ModalState::Opened(DialogTag::MoveIncompleteTodos)
        );

        let effect = reduce(&mut state, BoardEvent::ConfirmMoveIncompleteTodos);
        assert!(!state.dialog.is_open());
        assert_eq!(
            effect,
            Effect::Move {
                todos: vec![todo(3, "c", day, false), todo(1, "a", day, false)],
                to: today,
            }
        );
    }

    #[test]
    fn flags_and_modals_flip_without_effects() {
        let mut state = BoardState::new(date(2024, 6, 10)).unwrap();

        assert_eq!(reduce(&mut state, BoardEvent::ExpandFab), Effect::None);
        assert!(state.is_fab_expanded);
        reduce(&mut state, BoardEvent::CollapseFab);
        assert!(!state.is_fab_expanded);

        let tag = SheetTag::NewMemo {
            date: date(2024, 6, 10),
        };
        reduce(&mut state, BoardEvent::OpenSheet(tag.clone()));
        assert_eq!(state.sheet.tag(), Some(&tag));
        reduce(&mut state, BoardEvent::CloseSheet);
        assert!(!state.sheet.is_open());
    }

    #[test]
    fn selection_past_calendar_edges_is_ignored() {
        let mut state = BoardState::new(date(2024, 6, 12)).unwrap();
        let before = state.clone();

        assert_eq!(
            reduce(&mut state, BoardEvent::ChangeSelectedDate(NaiveDate::MAX)),
            Effect::None
        );
        assert_eq!(
            reduce(&mut state, BoardEvent::ChangeSelectedDate(NaiveDate::MIN)),
            Effect::None
        );
        assert_eq!(state, before);

        let mut latest = NaiveDate::MAX;
        let mut late = loop {
            match BoardState::new(latest) {
                Ok(state) => break state,
                Err(_) => latest = latest.pred_opt().unwrap(),
            }
        };
        let edge = late.clone();
        assert_eq!(reduce(&mut late, BoardEvent::NextWeek), Effect::None);
        assert_eq!(late, edge);

        let mut earliest = NaiveDate::MIN;
        let mut early = loop {
            match BoardState::new(earliest) {
                Ok(state) => break state,
                Err(_) => earliest = earliest.succ_opt().unwrap(),
            }
        };
        let edge = early.clone();
        assert_eq!(reduce(&mut early, BoardEvent::PreviousWeek), Effect::None);
        assert_eq!(early, edge);
    }
}
