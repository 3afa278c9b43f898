//! Search state machine
//!
//! ```text
//! Idle ──input──▶ Debouncing ──quiet period──▶ Searching ──▶ HasResults
//!                  ▲      │                        │    ├──▶ HasResultsWithSuggestedMatch
//!                  └input─┘ (empty query ▶ Idle)   │    ├──▶ NoResultsFallback
//!                                                  │    └──▶ NoResultsTerminal
//!                                                  └─error─▶ Failed
//! ```
//!
//! [`SearchMachine::apply`] is a pure transition function: it consumes an
//! [`Event`] and returns the [`Command`]s the driver must carry out. Every
//! keystroke bumps the generation; any timer or fetch event carrying an older
//! generation is dropped, which is how superseded queries are cancelled.

use std::time::Duration;

use ensearch_core::{eth_suggestion, should_attempt_direct_lookup, Profile};

use crate::error::ClientError;

/// Monotonic counter identifying the latest keystroke
pub type Generation = u64;

/// Outcome of a point lookup attached to a search state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointLookup {
    Pending,
    Found(Box<Profile>),
    /// The service has no profile for the query
    NotFound,
    /// The lookup itself broke (transport or backend error)
    Failed(String),
}

impl PointLookup {
    fn from_result(result: Result<Profile, ClientError>) -> Self {
        match result {
            Ok(profile) => PointLookup::Found(Box::new(profile)),
            Err(e) if e.is_no_profile() => PointLookup::NotFound,
            Err(e) => PointLookup::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Debouncing,
    Searching,
    HasResults(Vec<Profile>),
    /// Results with no exact name match for an identifier-shaped query:
    /// a point lookup runs alongside
    HasResultsWithSuggestedMatch {
        results: Vec<Profile>,
        point: PointLookup,
    },
    /// No results but the query looks resolvable: a point lookup runs instead
    NoResultsFallback(PointLookup),
    /// No results and nothing worth looking up directly
    NoResultsTerminal,
    /// The search request failed; retried only on the next input change
    Failed(String),
}

impl SearchPhase {
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            SearchPhase::Debouncing
                | SearchPhase::Searching
                | SearchPhase::NoResultsFallback(PointLookup::Pending)
        )
    }
}

/// Everything a presentation layer needs to render a search
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchState {
    /// Latest raw input
    pub input: String,
    /// Query the current phase belongs to, once settled
    pub settled: Option<String>,
    pub phase: SearchPhase,
    /// "Did you mean {query}.eth", set only when that name resolved
    pub suggestion: Option<String>,
    pub generation: Generation,
}

#[derive(Debug, Clone)]
pub enum Event {
    Input(String),
    DebounceElapsed(Generation),
    SearchFinished {
        generation: Generation,
        result: Result<Vec<Profile>, ClientError>,
    },
    PointLookupFinished {
        generation: Generation,
        result: Result<Profile, ClientError>,
    },
    SuggestionFinished {
        generation: Generation,
        name: String,
        result: Result<Profile, ClientError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// (Re)arm the debounce timer; replaces any armed timer
    StartDebounce {
        generation: Generation,
        delay: Duration,
    },
    Search {
        generation: Generation,
        term: String,
    },
    PointLookup {
        generation: Generation,
        identifier: String,
    },
    SuggestLookup {
        generation: Generation,
        name: String,
    },
    /// Mirror the settled query into the shareable location
    UpdateLocation(Option<String>),
}

pub struct SearchMachine {
    state: SearchState,
    debounce: Duration,
}

impl SearchMachine {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: SearchState::default(),
            debounce,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn apply(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::Input(text) => self.on_input(text),
            Event::DebounceElapsed(generation) => self.on_settled(generation),
            Event::SearchFinished { generation, result } => {
                self.on_search_finished(generation, result)
            }
            Event::PointLookupFinished { generation, result } => {
                self.on_point_lookup_finished(generation, result)
            }
            Event::SuggestionFinished {
                generation,
                name,
                result,
            } => self.on_suggestion_finished(generation, name, result),
        }
    }

    fn is_current(&self, generation: Generation) -> bool {
        generation == self.state.generation
    }

    fn on_input(&mut self, text: String) -> Vec<Command> {
        self.state.generation += 1;
        self.state.input = text;
        self.state.phase = SearchPhase::Debouncing;
        self.state.suggestion = None;

        vec![Command::StartDebounce {
            generation: self.state.generation,
            delay: self.debounce,
        }]
    }

    fn on_settled(&mut self, generation: Generation) -> Vec<Command> {
        if !self.is_current(generation) {
            return Vec::new();
        }

        let query = self.state.input.trim().to_string();
        if query.is_empty() {
            self.state.settled = None;
            self.state.phase = SearchPhase::Idle;
            return vec![Command::UpdateLocation(None)];
        }

        tracing::debug!(query = %query, generation, "Query settled");

        let mut commands = vec![
            Command::UpdateLocation(Some(query.clone())),
            Command::Search {
                generation,
                term: query.clone(),
            },
        ];
        if let Some(name) = eth_suggestion(&query) {
            commands.push(Command::SuggestLookup { generation, name });
        }

        self.state.settled = Some(query);
        self.state.phase = SearchPhase::Searching;
        commands
    }

    fn on_search_finished(
        &mut self,
        generation: Generation,
        result: Result<Vec<Profile>, ClientError>,
    ) -> Vec<Command> {
        if !self.is_current(generation) || self.state.phase != SearchPhase::Searching {
            tracing::trace!(generation, "Dropping superseded search result");
            return Vec::new();
        }
        let Some(query) = self.state.settled.clone() else {
            return Vec::new();
        };

        let results = match result {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Search failed");
                self.state.phase = SearchPhase::Failed(e.to_string());
                return Vec::new();
            }
        };

        let eligible = should_attempt_direct_lookup(&query);
        let lookup = Command::PointLookup {
            generation,
            identifier: query.clone(),
        };

        if results.is_empty() {
            if eligible {
                self.state.phase = SearchPhase::NoResultsFallback(PointLookup::Pending);
                return vec![lookup];
            }
            self.state.phase = SearchPhase::NoResultsTerminal;
            return Vec::new();
        }

        let exact = results.iter().any(|profile| profile.matches_name(&query));
        if eligible && !exact {
            self.state.phase = SearchPhase::HasResultsWithSuggestedMatch {
                results,
                point: PointLookup::Pending,
            };
            vec![lookup]
        } else {
            self.state.phase = SearchPhase::HasResults(results);
            Vec::new()
        }
    }

    fn on_point_lookup_finished(
        &mut self,
        generation: Generation,
        result: Result<Profile, ClientError>,
    ) -> Vec<Command> {
        if !self.is_current(generation) {
            return Vec::new();
        }

        match &mut self.state.phase {
            SearchPhase::HasResultsWithSuggestedMatch { point, .. }
            | SearchPhase::NoResultsFallback(point) => {
                *point = PointLookup::from_result(result);
            }
            _ => {}
        }
        Vec::new()
    }

    fn on_suggestion_finished(
        &mut self,
        generation: Generation,
        name: String,
        result: Result<Profile, ClientError>,
    ) -> Vec<Command> {
        if self.is_current(generation) && result.is_ok() {
            self.state.suggestion = Some(name);
        }
        Vec::new()
    }
}

impl Default for SearchMachine {
    fn default() -> Self {
        Self::new(crate::config::OrchestratorConfig::default().debounce)
    }
}
