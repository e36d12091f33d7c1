//! Operations that take more than one store round-trip.
//!
//! None of these roll back: a company created for a job record stays even if
//! the occupation write then fails.

use rust_decimal::prelude::ToPrimitive;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::dispatch::to_data;
use crate::domain::{DebtStatus, NewConversation, NewDebt, NewMessage, NewOccupation};
use crate::errors::DispatchError;
use crate::operations::{
    AddMessageToConversation, Counterparty, LogJobForPerson, StartConversationWith, TrackDebt,
};
use crate::resolver::EntityResolver;
use crate::store::CrmStore;

/// Contact is already resolved; company is found or created, then both ids
/// go into a single occupation write.
pub async fn log_job_for_person(
    store: &dyn CrmStore,
    resolver: &EntityResolver,
    job: LogJobForPerson,
) -> Result<Value, DispatchError> {
    let company = resolver.resolve_or_create_company(&job.company_name).await?;

    let occupation = store
        .create_occupation(NewOccupation {
            contact_id: job.person.id,
            company_id: company.id,
            title: job.job_title,
            start_date: job.start_date.map(|date| date.to_string()),
        })
        .await
        .map_err(|error| {
            warn!(
                event_name = "dispatch.compound.partial_failure",
                company_id = %company.id,
                error = %error,
                "occupation write failed after company resolution; company is kept"
            );
            error
        })?;

    Ok(json!({
        "occupation": to_data(&occupation)?,
        "company": to_data(&company)?,
        "contact_id": job.person.id,
    }))
}

pub async fn track_debt(store: &dyn CrmStore, debt: TrackDebt) -> Result<Value, DispatchError> {
    let Counterparty::Resolved(contact) = debt.counterparty else {
        return Err(DispatchError::Defect(
            "debt counterparty reached execution unresolved".to_string(),
        ));
    };
    let amount = debt
        .amount
        .trunc()
        .to_i64()
        .ok_or_else(|| DispatchError::validation("amount", "is too large"))?;
    let status = if debt.is_settled { DebtStatus::Complete } else { DebtStatus::Inprogress };

    debug!(
        event_name = "dispatch.compound.debt",
        contact_id = %contact.id,
        in_debt = debt.direction.in_debt(),
        amount,
        "recording debt"
    );
    let created = store
        .create_debt(NewDebt {
            contact_id: contact.id,
            in_debt: debt.direction.in_debt().to_string(),
            status,
            amount,
            reason: debt.reason,
        })
        .await?;
    to_data(&created)
}

pub async fn start_conversation_with(
    store: &dyn CrmStore,
    conversation: StartConversationWith,
) -> Result<Value, DispatchError> {
    let created = store
        .create_conversation(NewConversation {
            contact_id: conversation.person.id,
            happened_at: conversation.date.to_string(),
            contact_field_type_id: conversation.medium.id,
        })
        .await?;
    to_data(&created)
}

/// The owning contact is read back from the conversation itself.
pub async fn add_message_to_conversation(
    store: &dyn CrmStore,
    message: AddMessageToConversation,
) -> Result<Value, DispatchError> {
    let conversation = store.get_conversation(message.conversation_id).await?;
    let updated = store
        .add_message(
            conversation.id,
            NewMessage {
                contact_id: conversation.contact.id,
                written_at: message.date.to_string(),
                written_by_me: message.written_by.is_me(),
                content: message.content,
            },
        )
        .await?;
    to_data(&updated)
}
