//! ensearch-client: search and resolution client
//!
//! - [`ResolutionClient`]: HTTP access to the resolution service with a
//!   stale-while-revalidate cache and request coalescing
//! - [`SearchMachine`]: pure state machine deciding what a search shows
//! - [`Orchestrator`]: drives the state machine from keystrokes with a
//!   debounce and discards results for superseded queries

pub mod cache;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod orchestrator;
pub mod social;

pub use cache::{CacheKey, OperationKind, StaleCache};
pub use client::{ClientBuilder, Resolve, ResolutionClient};
pub use config::{ClientConfig, OrchestratorConfig};
pub use driver::{query_from_location, share_location, Orchestrator, OrchestratorHandle};
pub use error::ClientError;
pub use orchestrator::{Command, Event, Generation, PointLookup, SearchMachine, SearchPhase, SearchState};
pub use social::SocialStats;
