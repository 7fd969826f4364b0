//! Sample features shared by the integration tests.

#![allow(dead_code, unused_imports)]

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::StreamExt;
use reducto::dependencies::{timer, ClockKey, DependencyRecord, UuidKey};
use reducto::reducer::{Combine, ForEach, IfLet, Scope};
use reducto::{
    Action, Dependencies, DependencyKey, DependencyTable, Effect, EffectId, Identifiable,
    IdentifiedVec, Reduce, Reducer, State,
};
use serde::Serialize;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Counter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CounterState {
    pub count: i64,
}

impl State for CounterState {}

#[derive(Debug, Clone, PartialEq)]
pub enum CounterAction {
    Increment,
    Decrement,
    Add(i64),
    /// Increments after one second on the clock dependency.
    DelayedIncrement,
}

impl Action for CounterAction {}

pub struct CounterReducer;

impl Reducer for CounterReducer {
    type State = CounterState;
    type Action = CounterAction;

    fn reduce(&self, state: &mut CounterState, action: CounterAction, deps: &Dependencies) -> Effect<CounterAction> {
        match action {
            CounterAction::Increment => state.count += 1,
            CounterAction::Decrement => state.count -= 1,
            CounterAction::Add(amount) => state.count += amount,
            CounterAction::DelayedIncrement => {
                let Ok(clock) = deps.resolve::<ClockKey>() else {
                    return Effect::none();
                };
                return Effect::run(move |emitter, _| async move {
                    clock.sleep(Duration::from_secs(1)).await;
                    emitter.send(CounterAction::Increment);
                });
            }
        }
        Effect::none()
    }
}

/// Applies `actions` to `state` the way [`CounterReducer`] does, without
/// any runtime involved.
pub fn fold_counter(mut state: CounterState, actions: &[CounterAction]) -> CounterState {
    for action in actions {
        match action {
            CounterAction::Increment => state.count += 1,
            CounterAction::Decrement => state.count -= 1,
            CounterAction::Add(amount) => state.count += amount,
            CounterAction::DelayedIncrement => {}
        }
    }
    state
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

pub const TIMER_ID: &str = "timer";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimerState {
    pub ticks: u32,
    pub running: bool,
}

impl State for TimerState {}

#[derive(Debug, Clone, PartialEq)]
pub enum TimerAction {
    Start,
    Stop,
    Tick,
}

impl Action for TimerAction {}

pub struct TimerReducer;

impl Reducer for TimerReducer {
    type State = TimerState;
    type Action = TimerAction;

    fn reduce(&self, state: &mut TimerState, action: TimerAction, deps: &Dependencies) -> Effect<TimerAction> {
        match action {
            TimerAction::Start => {
                state.running = true;
                let Ok(clock) = deps.resolve::<ClockKey>() else {
                    return Effect::none();
                };
                Effect::stream(timer(clock, Duration::from_secs(1)).map(|_| TimerAction::Tick))
                    .cancellable(TIMER_ID)
            }
            TimerAction::Stop => {
                state.running = false;
                Effect::cancel(TIMER_ID)
            }
            TimerAction::Tick => {
                state.ticks += 1;
                Effect::none()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Search, with a client dependency
// ---------------------------------------------------------------------------

pub const SEARCH_ID: &str = "search";
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

pub trait SearchClient: Send + Sync {
    fn search(&self, query: String) -> BoxFuture<'static, Result<Vec<String>, String>>;
}

pub struct SearchClientKey;

impl DependencyKey for SearchClientKey {
    type Value = Arc<dyn SearchClient>;
}

/// Live client: there is no network in tests.
pub struct OfflineSearch;

impl SearchClient for OfflineSearch {
    fn search(&self, _query: String) -> BoxFuture<'static, Result<Vec<String>, String>> {
        Box::pin(async { Err("offline".to_string()) })
    }
}

/// Answers every query with a single `"<query> result"`.
pub struct EchoSearch;

impl SearchClient for EchoSearch {
    fn search(&self, query: String) -> BoxFuture<'static, Result<Vec<String>, String>> {
        Box::pin(async move { Ok(vec![format!("{query} result")]) })
    }
}

pub fn echo_search() -> Arc<dyn SearchClient> {
    Arc::new(EchoSearch)
}

/// Built-in table plus the search client, which has no test variant.
pub fn search_table() -> Arc<DependencyTable> {
    let mut table = DependencyTable::with_defaults();
    table.declare::<SearchClientKey>(DependencyRecord::new(
        Arc::new(OfflineSearch) as Arc<dyn SearchClient>
    ));
    Arc::new(table)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<String>,
    pub error: Option<String>,
}

impl State for SearchState {}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchAction {
    QueryChanged(String),
    Response(Result<Vec<String>, String>),
}

impl Action for SearchAction {}

pub struct SearchReducer;

impl Reducer for SearchReducer {
    type State = SearchState;
    type Action = SearchAction;

    fn reduce(&self, state: &mut SearchState, action: SearchAction, deps: &Dependencies) -> Effect<SearchAction> {
        match action {
            SearchAction::QueryChanged(query) => {
                state.query = query.clone();
                if query.is_empty() {
                    state.results.clear();
                    return Effect::cancel(SEARCH_ID);
                }
                let (Ok(client), Ok(clock)) = (deps.resolve::<SearchClientKey>(), deps.resolve::<ClockKey>()) else {
                    return Effect::none();
                };
                Effect::task(client.search(query), SearchAction::Response).debounce(
                    SEARCH_ID,
                    clock,
                    SEARCH_DEBOUNCE,
                )
            }
            SearchAction::Response(Ok(results)) => {
                state.results = results;
                state.error = None;
                Effect::none()
            }
            SearchAction::Response(Err(error)) => {
                state.results.clear();
                state.error = Some(error);
                Effect::none()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Todos: an identified collection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub done: bool,
}

impl Identifiable for Todo {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl State for Todo {}

#[derive(Debug, Clone, PartialEq)]
pub enum TodoAction {
    Toggle,
    Rename(String),
}

impl Action for TodoAction {}

pub struct TodoReducer;

impl Reducer for TodoReducer {
    type State = Todo;
    type Action = TodoAction;

    fn reduce(&self, todo: &mut Todo, action: TodoAction, _deps: &Dependencies) -> Effect<TodoAction> {
        match action {
            TodoAction::Toggle => todo.done = !todo.done,
            TodoAction::Rename(title) => todo.title = title,
        }
        Effect::none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TodosState {
    pub todos: IdentifiedVec<Todo>,
}

impl State for TodosState {}

#[derive(Debug, Clone, PartialEq)]
pub enum TodosAction {
    Add(String),
    Todo(Uuid, TodoAction),
}

impl Action for TodosAction {}

pub fn todos_reducer() -> Combine<TodosState, TodosAction> {
    Combine::new()
        .with(Reduce::new(
            |state: &mut TodosState, action: TodosAction, deps: &Dependencies| {
                if let TodosAction::Add(title) = action {
                    if let Ok(uuid) = deps.resolve::<UuidKey>() {
                        state.todos.push(Todo {
                            id: uuid.generate(),
                            title,
                            done: false,
                        });
                    }
                }
                Effect::none()
            },
        ))
        .with(ForEach::new(
            |state: &mut TodosState| &mut state.todos,
            |action| match action {
                TodosAction::Todo(id, action) => Some((id, action)),
                _ => None,
            },
            TodosAction::Todo,
            TodoReducer,
        ))
}

// ---------------------------------------------------------------------------
// App: a scoped counter plus an optional detail counter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppState {
    pub counter: CounterState,
    pub detail: Option<CounterState>,
}

impl State for AppState {}

#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    Counter(CounterAction),
    Detail(CounterAction),
    OpenDetail,
    CloseDetail,
}

impl Action for AppAction {}

pub fn counter_scope() -> Scope<AppState, AppAction, CounterReducer> {
    Scope::new(
        |state: &mut AppState| &mut state.counter,
        |action| match action {
            AppAction::Counter(action) => Some(action),
            _ => None,
        },
        AppAction::Counter,
        CounterReducer,
    )
}

pub fn detail_if_let() -> IfLet<AppState, AppAction, CounterReducer> {
    IfLet::new(
        |state: &mut AppState| state.detail.as_mut(),
        |action| match action {
            AppAction::Detail(action) => Some(action),
            _ => None,
        },
        AppAction::Detail,
        CounterReducer,
    )
}

pub fn app_reducer() -> Combine<AppState, AppAction> {
    Combine::new()
        .with(Reduce::new(
            |state: &mut AppState, action: AppAction, _deps: &Dependencies| {
                match action {
                    AppAction::OpenDetail => state.detail = Some(state.counter.clone()),
                    AppAction::CloseDetail => state.detail = None,
                    AppAction::Counter(_) | AppAction::Detail(_) => {}
                }
                Effect::none()
            },
        ))
        .with(counter_scope())
        .with(detail_if_let())
}

/// Live dependencies over the built-in table.
pub fn live_dependencies() -> Dependencies {
    Dependencies::live(Arc::new(DependencyTable::with_defaults()))
}
