use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use crate::config::MatchPolicy;
use crate::dispatch::execute::run_operation;
use crate::dispatch::states::DispatchState;
use crate::envelope::Envelope;
use crate::errors::DispatchError;
use crate::operations::args::{
    coerce_scalar, default_value, raw_arg, reference_list, reference_text,
};
use crate::operations::{
    ArgValue, BoundArgs, Counterparty, DefaultValue, EntityKind, Operation, OperationRegistry,
    OperationSpec, ParamKind,
};
use crate::resolver::EntityResolver;
use crate::store::CrmStore;

/// Validates and executes one proposed operation.
///
/// `execute` never returns an error and never panics: every outcome,
/// including a panic inside the store, becomes an [`Envelope`]. Each call
/// runs on its own task so a panic is contained at the join point.
#[derive(Clone)]
pub struct Dispatcher {
    core: Arc<DispatchCore>,
}

struct DispatchCore {
    store: Arc<dyn CrmStore>,
    registry: Arc<OperationRegistry>,
    resolver: EntityResolver,
    sink: Arc<dyn AuditSink>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn CrmStore>,
        registry: Arc<OperationRegistry>,
        sink: Arc<dyn AuditSink>,
        policy: MatchPolicy,
    ) -> Self {
        let resolver = EntityResolver::new(store.clone(), policy);
        Self { core: Arc::new(DispatchCore { store, registry, resolver, sink }) }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.core.registry
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.core.resolver
    }

    pub async fn execute(&self, operation: &str, args: Value) -> Envelope {
        let correlation_id = Uuid::new_v4().to_string();
        self.execute_with_correlation(&correlation_id, operation, args).await
    }

    pub async fn execute_with_correlation(
        &self,
        correlation_id: &str,
        operation: &str,
        args: Value,
    ) -> Envelope {
        let core = self.core.clone();
        let task_correlation = correlation_id.to_string();
        let task_operation = operation.to_string();
        let handle =
            tokio::spawn(async move { core.run(task_correlation, task_operation, args).await });

        match handle.await {
            Ok(envelope) => envelope,
            Err(join_error) => {
                let defect = DispatchError::Defect(if join_error.is_panic() {
                    "operation panicked during execution".to_string()
                } else {
                    "operation task was cancelled".to_string()
                });
                error!(
                    event_name = "dispatch.defect",
                    correlation_id,
                    operation,
                    error = %join_error,
                    "dispatch task did not complete"
                );
                self.core.sink.emit(
                    AuditEvent::new(
                        correlation_id,
                        operation,
                        "dispatch.failed",
                        AuditCategory::System,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("kind", defect.kind().as_str())
                    .with_metadata("message", defect.to_string()),
                );
                Envelope::error(&defect)
            }
        }
    }
}

impl DispatchCore {
    async fn run(&self, correlation_id: String, operation: String, args: Value) -> Envelope {
        let mut run = DispatchRun::start(self.sink.as_ref(), correlation_id, operation);
        match self.drive(&mut run, args).await {
            Ok(data) => {
                run.complete();
                Envelope::success(data)
            }
            Err(error) => {
                run.fail(&error);
                Envelope::error(&error)
            }
        }
    }

    async fn drive(&self, run: &mut DispatchRun<'_>, args: Value) -> Result<Value, DispatchError> {
        let spec = self
            .registry
            .lookup(&run.operation)
            .ok_or_else(|| DispatchError::UnknownOperation(run.operation.clone()))?;
        let raw = into_object(args)?;

        run.advance(DispatchState::ResolvingEntities)?;
        let mut bound = BoundArgs::default();
        self.resolve_references(spec, &raw, &mut bound).await?;
        validate_scalars(spec, &raw, &mut bound)?;
        let mut operation = Operation::bind(spec.name, bound)?;
        self.resolve_bound_parties(&mut operation).await?;
        run.advance(DispatchState::Validated)?;

        run.advance(DispatchState::Executing)?;
        run_operation(self.store.as_ref(), &self.resolver, operation).await
    }

    /// Entity references are resolved in declaration order, one at a time;
    /// the first failure stops the run before any write.
    async fn resolve_references(
        &self,
        spec: &OperationSpec,
        raw: &Map<String, Value>,
        bound: &mut BoundArgs,
    ) -> Result<(), DispatchError> {
        for param in spec.params.iter().filter(|param| param.is_entity_reference()) {
            let Some(value) = supplied_or_default(raw, param.name, param.default) else {
                if param.required {
                    return Err(DispatchError::validation(param.name, "is required"));
                }
                continue;
            };

            let resolved = match param.kind {
                ParamKind::EntityReference(kind) => {
                    let name = reference_text(param.name, &value)?;
                    self.resolve_one(kind, &name).await?
                }
                ParamKind::EntityReferenceList(EntityKind::Contact) => {
                    let names = reference_list(param.name, &value)?;
                    ArgValue::Contacts(self.resolver.resolve_contacts(&names).await?)
                }
                ParamKind::EntityReferenceList(kind) => {
                    return Err(DispatchError::Defect(format!(
                        "list references to {kind:?} are not supported"
                    )))
                }
                ParamKind::Scalar(_) => continue,
            };
            bound.insert(param.name, resolved);
        }
        Ok(())
    }

    /// Debt parties can only be resolved once binding has established which
    /// side is the user.
    async fn resolve_bound_parties(&self, operation: &mut Operation) -> Result<(), DispatchError> {
        if let Operation::TrackDebt(debt) = operation {
            if let Counterparty::Named(name) = &debt.counterparty {
                let contact = self.resolver.resolve_contact(name).await?;
                debt.counterparty = Counterparty::Resolved(contact);
            }
        }
        Ok(())
    }

    async fn resolve_one(&self, kind: EntityKind, name: &str) -> Result<ArgValue, DispatchError> {
        let resolver = &self.resolver;
        let value = match kind {
            EntityKind::Contact => ArgValue::Contact(resolver.resolve_contact(name).await?),
            EntityKind::Gender => ArgValue::Gender(resolver.resolve_gender(name).await?),
            EntityKind::RelationshipType => {
                ArgValue::RelationshipType(resolver.resolve_relationship_type(name).await?)
            }
            EntityKind::ContactFieldType => {
                ArgValue::Medium(resolver.resolve_contact_field_type(name).await?)
            }
            EntityKind::ActivityType => {
                ArgValue::ActivityType(resolver.resolve_activity_type(name).await?)
            }
        };
        Ok(value)
    }
}

/// First violation wins, in declaration order.
fn validate_scalars(
    spec: &OperationSpec,
    raw: &Map<String, Value>,
    bound: &mut BoundArgs,
) -> Result<(), DispatchError> {
    for param in &spec.params {
        let ParamKind::Scalar(scalar) = param.kind else {
            continue;
        };
        let Some(value) = supplied_or_default(raw, param.name, param.default) else {
            if param.required {
                return Err(DispatchError::validation(param.name, "is required"));
            }
            continue;
        };
        bound.insert(param.name, coerce_scalar(param.name, scalar, &value)?);
    }
    Ok(())
}

fn supplied_or_default(
    raw: &Map<String, Value>,
    name: &str,
    default: Option<DefaultValue>,
) -> Option<Value> {
    raw_arg(raw, name).cloned().or_else(|| default.map(default_value))
}

fn into_object(args: Value) -> Result<Map<String, Value>, DispatchError> {
    match args {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(DispatchError::validation("arguments", "expected a JSON object")),
    }
}

/// State and audit trail of a single `execute` call.
struct DispatchRun<'a> {
    sink: &'a dyn AuditSink,
    correlation_id: String,
    operation: String,
    state: DispatchState,
}

impl<'a> DispatchRun<'a> {
    fn start(sink: &'a dyn AuditSink, correlation_id: String, operation: String) -> Self {
        let run = Self { sink, correlation_id, operation, state: DispatchState::Received };
        run.emit("dispatch.received", AuditCategory::Ingress, AuditOutcome::Success, Vec::new());
        run
    }

    fn advance(&mut self, next: DispatchState) -> Result<(), DispatchError> {
        let from = self.state;
        self.state = from
            .transition(next)
            .map_err(|error| DispatchError::Defect(error.to_string()))?;
        self.emit(
            "dispatch.transition",
            category_for(next),
            AuditOutcome::Success,
            vec![("from", format!("{from:?}")), ("to", format!("{next:?}"))],
        );
        Ok(())
    }

    fn complete(&mut self) {
        if self.advance(DispatchState::Completed).is_err() {
            warn!(
                event_name = "dispatch.illegal_transition",
                correlation_id = %self.correlation_id,
                operation = %self.operation,
                from = ?self.state,
                "completion reached outside the executing state"
            );
            return;
        }
        info!(
            event_name = "dispatch.completed",
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            "operation completed"
        );
        self.emit("dispatch.completed", AuditCategory::Execution, AuditOutcome::Success, Vec::new());
    }

    fn fail(&mut self, error: &DispatchError) {
        let from = self.state;
        self.state = DispatchState::Failed;
        let outcome = match error {
            DispatchError::Remote(_) | DispatchError::Defect(_) => AuditOutcome::Failed,
            _ => AuditOutcome::Rejected,
        };
        warn!(
            event_name = "dispatch.failed",
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            from = ?from,
            kind = error.kind().as_str(),
            error = %error,
            "operation failed"
        );

        let mut metadata = vec![
            ("from", format!("{from:?}")),
            ("kind", error.kind().as_str().to_string()),
            ("message", error.to_string()),
        ];
        if let Some(field) = error.field() {
            metadata.push(("field", field.to_string()));
        }
        self.emit("dispatch.failed", category_for(from), outcome, metadata);
    }

    fn emit(
        &self,
        event_type: &str,
        category: AuditCategory,
        outcome: AuditOutcome,
        metadata: Vec<(&str, String)>,
    ) {
        let event = metadata.into_iter().fold(
            AuditEvent::new(&self.correlation_id, &self.operation, event_type, category, outcome),
            |event, (key, value)| event.with_metadata(key, value),
        );
        self.sink.emit(event);
    }
}

fn category_for(state: DispatchState) -> AuditCategory {
    match state {
        DispatchState::Received => AuditCategory::Ingress,
        DispatchState::ResolvingEntities => AuditCategory::Resolution,
        DispatchState::Validated => AuditCategory::Validation,
        DispatchState::Executing | DispatchState::Completed | DispatchState::Failed => {
            AuditCategory::Execution
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::audit::{AuditCategory, CallCounter, InMemoryAuditSink};
    use crate::config::MatchPolicy;
    use crate::dispatch::Dispatcher;
    use crate::errors::{ErrorKind, StoreError};
    use crate::operations::OperationRegistry;
    use crate::store::InMemoryCrmStore;

    fn dispatcher(store: &Arc<InMemoryCrmStore>, sink: Arc<InMemoryAuditSink>) -> Dispatcher {
        let registry = Arc::new(OperationRegistry::standard().expect("registry"));
        Dispatcher::new(store.clone(), registry, sink, MatchPolicy::Substring)
    }

    #[tokio::test]
    async fn unknown_operation_fails_before_any_store_call() {
        let store = Arc::new(InMemoryCrmStore::new());
        let sink = Arc::new(InMemoryAuditSink::default());

        let envelope = dispatcher(&store, sink.clone()).execute("launch_rocket", json!({})).await;

        assert_eq!(envelope.kind(), Some(ErrorKind::UnknownOperation));
        assert_eq!(envelope.message(), Some("Unknown operation 'launch_rocket'"));
        assert!(store.calls().is_empty());
        assert_eq!(sink.event_types(), vec!["dispatch.received", "dispatch.failed"]);
    }

    #[tokio::test]
    async fn successful_run_walks_every_state_in_order() {
        let store = Arc::new(InMemoryCrmStore::new());
        store.insert_contact("Jane", Some("Doe")).await;
        let sink = Arc::new(InMemoryAuditSink::default());

        let envelope = dispatcher(&store, sink.clone())
            .execute("create_task_for", json!({ "person_name": "Jane", "title": "Call back" }))
            .await;

        assert!(envelope.is_success(), "{envelope:?}");
        let transitions: Vec<String> = sink
            .events()
            .into_iter()
            .filter(|event| event.event_type == "dispatch.transition")
            .filter_map(|event| event.metadata.get("to").cloned())
            .collect();
        assert_eq!(transitions, vec!["ResolvingEntities", "Validated", "Executing", "Completed"]);
        assert_eq!(sink.event_types().last().map(String::as_str), Some("dispatch.completed"));
    }

    #[tokio::test]
    async fn first_invalid_scalar_is_named_and_nothing_is_written() {
        let store = Arc::new(InMemoryCrmStore::new());
        store.insert_contact("Jane", Some("Doe")).await;
        let sink = Arc::new(InMemoryAuditSink::default());

        let envelope = dispatcher(&store, sink.clone())
            .execute(
                "set_reminder_for",
                json!({ "person_name": "Jane", "title": "Birthday", "date": "next week" }),
            )
            .await;

        assert_eq!(envelope.kind(), Some(ErrorKind::ValidationError));
        assert_eq!(
            envelope.message(),
            Some("Invalid argument 'date': expected an ISO date (YYYY-MM-DD)")
        );
        assert!(store.mutating_calls().is_empty());
        let failed = sink.events().into_iter().last().expect("failure event");
        assert_eq!(failed.metadata.get("field").map(String::as_str), Some("date"));
    }

    #[tokio::test]
    async fn missing_required_reference_is_a_validation_error() {
        let store = Arc::new(InMemoryCrmStore::new());
        let sink = Arc::new(InMemoryAuditSink::default());

        let envelope = dispatcher(&store, sink)
            .execute("get_memories_about", json!({ "person_name": null }))
            .await;

        assert_eq!(envelope.message(), Some("Invalid argument 'person_name': is required"));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_debt_counterparty_fails_during_resolution() {
        let store = Arc::new(InMemoryCrmStore::new());
        let sink = Arc::new(InMemoryAuditSink::default());

        let envelope = dispatcher(&store, sink.clone())
            .execute(
                "track_debt",
                json!({ "person_who_owes_money": "Zed", "person_who_is_owed_money": "me", "amount": 20 }),
            )
            .await;

        assert_eq!(envelope.kind(), Some(ErrorKind::NotFoundError));
        assert!(store.mutating_calls().is_empty());
        let failed = sink.events().into_iter().last().expect("failure event");
        assert_eq!(failed.event_type, "dispatch.failed");
        assert_eq!(failed.category, AuditCategory::Resolution);
        assert_eq!(failed.metadata.get("from").map(String::as_str), Some("ResolvingEntities"));
    }

    #[tokio::test]
    async fn remote_failure_carries_the_store_message() {
        let store = Arc::new(InMemoryCrmStore::new());
        store.insert_contact("Jane", Some("Doe")).await;
        store.fail_on(
            "create_call",
            StoreError::Status { status: 422, message: "The called at field is required.".to_string() },
        );
        let sink = Arc::new(InMemoryAuditSink::default());

        let envelope = dispatcher(&store, sink)
            .execute(
                "log_call_with",
                json!({ "person_name": "Jane", "date": "2024-03-01", "description": "catch-up" }),
            )
            .await;

        assert_eq!(envelope.kind(), Some(ErrorKind::RemoteError));
        assert_eq!(
            envelope.message(),
            Some("CRM request failed: status 422: The called at field is required.")
        );
        assert_eq!(store.call_count("create_call"), 1);
    }

    #[tokio::test]
    async fn panic_inside_the_store_becomes_a_defect_envelope() {
        let store = Arc::new(InMemoryCrmStore::new());
        store.panic_on("search_contacts");
        let counter = Arc::new(CallCounter::default());
        let registry = Arc::new(OperationRegistry::standard().expect("registry"));
        let dispatcher =
            Dispatcher::new(store.clone(), registry, counter.clone(), MatchPolicy::Substring);

        let envelope = dispatcher.execute("find_people", json!({ "query": "anyone" })).await;

        assert_eq!(envelope.kind(), Some(ErrorKind::Defect));
        let counts = counter.snapshot();
        assert_eq!(counts["find_people"].invocations, 1);
        assert_eq!(counts["find_people"].failures, 1);

        // The dispatcher stays usable after a contained panic.
        let envelope = dispatcher.execute("launch_rocket", json!({})).await;
        assert_eq!(envelope.kind(), Some(ErrorKind::UnknownOperation));
    }

    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let store = Arc::new(InMemoryCrmStore::new());
        let sink = Arc::new(InMemoryAuditSink::default());

        let envelope = dispatcher(&store, sink).execute("find_people", json!(["Jane"])).await;

        assert_eq!(envelope.message(), Some("Invalid argument 'arguments': expected a JSON object"));
    }
}
