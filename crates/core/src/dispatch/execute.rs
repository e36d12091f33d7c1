use serde_json::{json, Value};

use crate::dispatch::{compound, to_data};
use crate::domain::{
    Contact, ContactSummary, NewActivity, NewCall, NewContact, NewGift, NewNote, NewRelationship,
    NewReminder, NewTask, TaskUpdate,
};
use crate::errors::DispatchError;
use crate::operations::{MarkTaskAsComplete, Operation, UntagPerson};
use crate::resolver::EntityResolver;
use crate::store::CrmStore;

/// Runs one typed operation against the store. Every mutating call happens
/// here, after resolution and validation have succeeded.
pub(crate) async fn run_operation(
    store: &dyn CrmStore,
    resolver: &EntityResolver,
    operation: Operation,
) -> Result<Value, DispatchError> {
    match operation {
        Operation::RememberPerson(person) => {
            let created = store
                .create_contact(NewContact::new(
                    person.first_name,
                    person.last_name,
                    person.nickname,
                    person.gender.id,
                ))
                .await?;
            to_data(&created)
        }
        Operation::FindPeople(search) => {
            let matches = store.search_contacts(&search.query).await?;
            let summaries: Vec<ContactSummary> = matches.iter().map(Contact::summary).collect();
            to_data(&summaries)
        }
        Operation::GetDetailsAboutPerson(target) => {
            to_data(&store.get_contact(target.person.id).await?)
        }
        Operation::ForgetPerson(target) => {
            store.delete_contact(target.person.id).await?;
            Ok(json!({ "deleted": true, "id": target.person.id }))
        }
        Operation::RememberSomethingAbout(memory) => {
            let note = store
                .create_note(NewNote {
                    contact_id: memory.person.id,
                    body: memory.memory_text,
                    is_favorited: memory.is_important,
                })
                .await?;
            to_data(&note)
        }
        Operation::GetMemoriesAbout(target) => to_data(&store.list_notes(target.person.id).await?),
        Operation::LogActivityWith(activity) => {
            let created = store
                .create_activity(NewActivity {
                    activity_type_id: activity.activity_type.id,
                    summary: activity.summary,
                    description: activity.description,
                    happened_at: activity.date.to_string(),
                    contacts: activity.people.iter().map(|person| person.id).collect(),
                })
                .await?;
            to_data(&created)
        }
        Operation::LogCallWith(call) => {
            let created = store
                .create_call(NewCall {
                    contact_id: call.person.id,
                    called_at: call.date.to_string(),
                    content: call.description,
                })
                .await?;
            to_data(&created)
        }
        Operation::StartConversationWith(conversation) => {
            compound::start_conversation_with(store, conversation).await
        }
        Operation::AddMessageToConversation(message) => {
            compound::add_message_to_conversation(store, message).await
        }
        Operation::SetRelationship(link) => {
            let created = store
                .create_relationship(NewRelationship {
                    contact_is: link.person1.id,
                    relationship_type_id: link.relationship_type.id,
                    of_contact: link.person2.id,
                })
                .await?;
            to_data(&created)
        }
        Operation::CreateTaskFor(task) => {
            let created = store
                .create_task(NewTask {
                    contact_id: task.person.id,
                    title: task.title,
                    description: task.description,
                })
                .await?;
            to_data(&created)
        }
        Operation::MarkTaskAsComplete(request) => mark_task_as_complete(store, request).await,
        Operation::SetReminderFor(reminder) => {
            let created = store
                .create_reminder(NewReminder {
                    contact_id: reminder.person.id,
                    title: reminder.title,
                    initial_date: reminder.date.to_string(),
                    frequency_type: reminder.frequency_type,
                    frequency_number: reminder.frequency_number,
                })
                .await?;
            to_data(&created)
        }
        Operation::TrackDebt(debt) => compound::track_debt(store, debt).await,
        Operation::LogGift(gift) => {
            let created = store
                .create_gift(NewGift {
                    contact_id: gift.person.id,
                    name: gift.gift_name,
                    status: gift.status,
                    date: gift.date.map(|date| date.to_string()),
                    amount: gift.amount,
                })
                .await?;
            to_data(&created)
        }
        Operation::LogJobForPerson(job) => compound::log_job_for_person(store, resolver, job).await,
        Operation::TagPerson(tagging) => {
            to_data(&store.set_tags(tagging.person.id, &tagging.tags).await?)
        }
        Operation::UntagPerson(untagging) => untag_person(store, resolver, untagging).await,
    }
}

async fn mark_task_as_complete(
    store: &dyn CrmStore,
    request: MarkTaskAsComplete,
) -> Result<Value, DispatchError> {
    let task = store.get_task(request.task_id).await?;
    if task.completed {
        return Ok(json!({ "already_completed": true, "task": to_data(&task)? }));
    }

    let updated = store
        .update_task(
            task.id,
            TaskUpdate {
                contact_id: task.contact.as_ref().map(|owner| owner.id),
                title: task.title.clone(),
                completed: true,
            },
        )
        .await?;
    Ok(json!({ "already_completed": false, "task": to_data(&updated)? }))
}

/// Tags are looked up, never created; one unknown name aborts before the
/// unset call.
async fn untag_person(
    store: &dyn CrmStore,
    resolver: &EntityResolver,
    untagging: UntagPerson,
) -> Result<Value, DispatchError> {
    let mut tag_ids = Vec::with_capacity(untagging.tags_to_remove.len());
    for name in &untagging.tags_to_remove {
        match resolver.resolve_tag(name).await? {
            Some(tag) => tag_ids.push(tag.id),
            None => return Err(DispatchError::NotFound(format!("Tag '{name}' not found"))),
        }
    }

    to_data(&store.unset_tags(untagging.person.id, &tag_ids).await?)
}
