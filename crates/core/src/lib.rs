pub mod audit;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod envelope;
pub mod errors;
pub mod operations;
pub mod resolver;
pub mod store;

pub use audit::{
    AuditCategory, AuditEvent, AuditOutcome, AuditSink, CallCounter, FanoutAuditSink,
    InMemoryAuditSink, NoopAuditSink, TracingAuditSink,
};
pub use config::{AppConfig, ConfigError, LoadOptions, MatchPolicy};
pub use dispatch::{DispatchState, Dispatcher};
pub use envelope::Envelope;
pub use errors::{DispatchError, ErrorKind, ResolveError, StoreError};
pub use operations::{Operation, OperationRegistry, OperationSpec};
pub use resolver::EntityResolver;
pub use store::{CrmStore, InMemoryCrmStore};
