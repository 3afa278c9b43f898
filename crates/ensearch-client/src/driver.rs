//! Async driver for the search state machine
//!
//! One task owns the [`SearchMachine`] and processes events strictly one at a
//! time: keystrokes from the handle, the debounce timer, and completions of
//! in-flight lookups. Lookups are polled by that same task, so results are
//! applied in arrival order and never race with each other.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use url::form_urlencoded;

use crate::client::Resolve;
use crate::config::OrchestratorConfig;
use crate::orchestrator::{Command, Event, Generation, SearchMachine, SearchState};

/// Query parameter the settled query is mirrored into
pub const LOCATION_PARAM: &str = "q";

/// Shareable location fragment for a settled query (`?q=luc.eth`)
pub fn share_location(query: &str) -> String {
    let encoded: String = form_urlencoded::Serializer::new(String::new())
        .append_pair(LOCATION_PARAM, query)
        .finish();
    format!("?{encoded}")
}

/// Recover the query from a shared location, to resume a search
pub fn query_from_location(location: &str) -> Option<String> {
    let query = location.split_once('?').map_or(location, |(_, q)| q);
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == LOCATION_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.trim().is_empty())
}

/// Handle for feeding input to a running orchestrator and observing it
#[derive(Clone)]
pub struct OrchestratorHandle {
    input: mpsc::UnboundedSender<String>,
    state: watch::Receiver<SearchState>,
    location: watch::Receiver<Option<String>>,
}

impl OrchestratorHandle {
    /// Report the current contents of the search box.
    ///
    /// Returns `false` once the orchestrator has stopped.
    pub fn input(&self, text: impl Into<String>) -> bool {
        self.input.send(text.into()).is_ok()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.clone()
    }

    /// Shareable location for the settled query, if any
    pub fn location(&self) -> Option<String> {
        self.location.borrow().clone()
    }
}

pub struct Orchestrator<R> {
    resolver: Arc<R>,
    machine: SearchMachine,
    pending: FuturesUnordered<BoxFuture<'static, Event>>,
    state: watch::Sender<SearchState>,
    location: watch::Sender<Option<String>>,
}

impl<R: Resolve + 'static> Orchestrator<R> {
    /// Start the orchestrator task.
    ///
    /// The task ends once every handle has been dropped and the last
    /// settled query has finished.
    pub fn spawn(resolver: Arc<R>, config: OrchestratorConfig) -> (OrchestratorHandle, JoinHandle<()>) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SearchState::default());
        let (location_tx, location_rx) = watch::channel(None);

        let orchestrator = Orchestrator {
            resolver,
            machine: SearchMachine::new(config.debounce),
            pending: FuturesUnordered::new(),
            state: state_tx,
            location: location_tx,
        };
        let task = tokio::spawn(orchestrator.run(input_rx));

        let handle = OrchestratorHandle {
            input: input_tx,
            state: state_rx,
            location: location_rx,
        };
        (handle, task)
    }

    async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<String>) {
        let timer = sleep(std::time::Duration::ZERO);
        tokio::pin!(timer);
        let mut armed: Option<Generation> = None;
        let mut inputs_open = true;

        loop {
            // Once input is closed, finish the settled query and stop
            if !inputs_open && armed.is_none() && self.pending.is_empty() {
                break;
            }

            let event = tokio::select! {
                input = inputs.recv(), if inputs_open => match input {
                    Some(text) => Event::Input(text),
                    None => {
                        inputs_open = false;
                        continue;
                    }
                },
                () = &mut timer, if armed.is_some() => match armed.take() {
                    Some(generation) => Event::DebounceElapsed(generation),
                    None => continue,
                },
                Some(event) = self.pending.next(), if !self.pending.is_empty() => event,
            };

            for command in self.machine.apply(event) {
                if let Command::StartDebounce { generation, delay } = command {
                    timer.as_mut().reset(Instant::now() + delay);
                    armed = Some(generation);
                } else {
                    self.execute(command);
                }
            }

            self.state.send_replace(self.machine.state().clone());
        }

        tracing::debug!("Orchestrator stopped");
    }

    fn execute(&mut self, command: Command) {
        let resolver = Arc::clone(&self.resolver);
        match command {
            Command::Search { generation, term } => {
                self.pending.push(
                    async move {
                        let result = resolver.search(&term).await;
                        Event::SearchFinished { generation, result }
                    }
                    .boxed(),
                );
            }
            Command::PointLookup {
                generation,
                identifier,
            } => {
                self.pending.push(
                    async move {
                        let result = resolver.profile(&identifier).await;
                        Event::PointLookupFinished { generation, result }
                    }
                    .boxed(),
                );
            }
            Command::SuggestLookup { generation, name } => {
                self.pending.push(
                    async move {
                        let result = resolver.profile(&name).await;
                        Event::SuggestionFinished {
                            generation,
                            name,
                            result,
                        }
                    }
                    .boxed(),
                );
            }
            Command::UpdateLocation(query) => {
                self.location
                    .send_replace(query.as_deref().map(share_location));
            }
            Command::StartDebounce { .. } => {}
        }
    }
}
