//! Nexus Flux - behavioral telemetry engine for a personalized content feed
//!
//! Flux turns raw UI telemetry from a feed's detail views into discrete
//! interaction events and keeps them in a bounded, persisted user profile that
//! an external content generator consumes: raw signal → collector → session
//! controller → profile store → ranking boundary.
//!
//! ## Modules
//!
//! - **Event model**: the closed set of interaction events and their wire shape
//! - **Collectors**: article and video state machines over raw UI signals
//! - **Session**: open/close lifecycle of a detail view and its summary events
//! - **Profile**: bounded history plus liked/viewed sets, persisted fail-open
//! - **Ranking**: generator contract, prompt rendering and response decoding

pub mod clock;
pub mod collector;
pub mod config;
pub mod error;
pub mod event;
pub mod feed;
pub mod pipeline;
pub mod profile;
pub mod ranking;
pub mod session;
pub mod signal;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use error::EngineError;
pub use event::{EventDetails, EventType, InteractionEvent, NewEvent};
pub use pipeline::{replay_trace, FeedEngine, ReplayOutcome};
pub use profile::ProfileStore;
pub use session::{CloseReason, SessionController, SessionSummary};
pub use types::{ContentItem, ItemType, UserProfile};

/// Library version
pub const NEXUS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "nexus-flux";
