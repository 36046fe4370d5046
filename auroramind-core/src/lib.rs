//! AuroraMind core library.
//!
//! A typed client for the AuroraMind backend: goals and their phases,
//! task lists, knowledge-base documents, summaries and accounts. The
//! knowledge-base chat streams its answer as server-sent events, decoded by
//! [`stream`] into [`StreamEvent`]s and dispatched to a [`ChatHandler`].

pub mod auth;
pub mod client;
pub mod config;
pub mod credentials;
pub mod goals;
pub mod knowledge;
pub mod stream;
pub mod summary;
pub mod tasks;

pub use auth::{AuthService, TokenResponse, User};
pub use client::{ApiClient, ClientError};
pub use config::{Config, ConfigError};
pub use credentials::{
    CredentialProvider, CredentialsError, StaticCredentials, TokenFile, resolve_credentials,
};
pub use goals::{BreakdownItem, BreakdownSelection, GoalService, GoalView, TaskGroup, TaskItem};
pub use knowledge::{ConversationRequest, KnowledgeDocument, KnowledgeService};
pub use stream::{ChatHandler, EventStream, StreamEvent, StreamOutcome};
pub use summary::{Summary, SummaryKind, SummaryService};
pub use tasks::{Task, TaskList, TaskService};
