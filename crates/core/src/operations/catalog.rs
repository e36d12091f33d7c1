use crate::domain::{Author, FrequencyType, GiftStatus};
use crate::operations::{
    DefaultValue, EntityKind, OperationCategory, OperationSpec, ParamKind, ParamSpec, ScalarType,
};

const STRING: ParamKind = ParamKind::Scalar(ScalarType::String);
const INT: ParamKind = ParamKind::Scalar(ScalarType::Int);
const FLOAT: ParamKind = ParamKind::Scalar(ScalarType::Float);
const BOOL: ParamKind = ParamKind::Scalar(ScalarType::Bool);
const DATE: ParamKind = ParamKind::Scalar(ScalarType::Date);
const STRING_LIST: ParamKind = ParamKind::Scalar(ScalarType::StringList);
const CONTACT: ParamKind = ParamKind::EntityReference(EntityKind::Contact);

fn person(description: &'static str) -> ParamSpec {
    ParamSpec::required("person_name", CONTACT, description)
}

/// Every operation the assistant can delegate, in presentation order.
pub fn standard_catalog() -> Vec<OperationSpec> {
    use OperationCategory::{Create, Delete, Read, Update};

    vec![
        OperationSpec::new(
            "remember_person",
            Create,
            "Add a new person to the address book.",
            vec![
                ParamSpec::required("first_name", STRING, "Given name."),
                ParamSpec::optional("last_name", STRING, "Family name."),
                ParamSpec::optional("nickname", STRING, "Nickname or short name."),
                ParamSpec::optional(
                    "gender",
                    ParamKind::EntityReference(EntityKind::Gender),
                    "Gender name as listed by the CRM.",
                )
                .with_default(DefaultValue::Text("Rather not say")),
            ],
        ),
        OperationSpec::new(
            "find_people",
            Read,
            "Search people by name; returns id, name, job and company for each match.",
            vec![ParamSpec::required("query", STRING, "Name or part of a name.")],
        ),
        OperationSpec::new(
            "get_details_about_person",
            Read,
            "Fetch the full record of one person.",
            vec![person("Who to look up.")],
        ),
        OperationSpec::new(
            "forget_person",
            Delete,
            "Delete a person from the address book.",
            vec![person("Who to delete.")],
        ),
        OperationSpec::new(
            "remember_something_about",
            Create,
            "Store a note about a person.",
            vec![
                person("Who the note is about."),
                ParamSpec::required("memory_text", STRING, "The note itself."),
                ParamSpec::optional("is_important", BOOL, "Mark the note as a favourite.")
                    .with_default(DefaultValue::Bool(false)),
            ],
        ),
        OperationSpec::new(
            "get_memories_about",
            Read,
            "List the notes stored about a person.",
            vec![person("Whose notes to list.")],
        ),
        OperationSpec::new(
            "log_activity_with",
            Create,
            "Record something done together with one or more people.",
            vec![
                ParamSpec::required(
                    "people_names",
                    ParamKind::EntityReferenceList(EntityKind::Contact),
                    "Everyone who took part.",
                ),
                ParamSpec::required("summary", STRING, "Short summary of the activity."),
                ParamSpec::required(
                    "activity_type",
                    ParamKind::EntityReference(EntityKind::ActivityType),
                    "Kind of activity, e.g. 'ate at a restaurant'.",
                ),
                ParamSpec::required("date", DATE, "When it happened."),
                ParamSpec::optional("description", STRING, "Longer description."),
            ],
        ),
        OperationSpec::new(
            "log_call_with",
            Create,
            "Record a phone call with a person.",
            vec![
                person("Who was on the call."),
                ParamSpec::required("date", DATE, "When the call happened."),
                ParamSpec::required("description", STRING, "What was discussed."),
            ],
        ),
        OperationSpec::new(
            "start_conversation_with",
            Create,
            "Open a conversation record with a person on a given medium.",
            vec![
                person("Who the conversation is with."),
                ParamSpec::required("date", DATE, "When the conversation happened."),
                ParamSpec::required(
                    "medium",
                    ParamKind::EntityReference(EntityKind::ContactFieldType),
                    "Medium such as Email, Phone or Twitter.",
                ),
            ],
        ),
        OperationSpec::new(
            "add_message_to_conversation",
            Update,
            "Append a message to an existing conversation.",
            vec![
                ParamSpec::required("conversation_id", INT, "Id of the conversation."),
                ParamSpec::required("content", STRING, "Message text."),
                ParamSpec::required(
                    "written_by",
                    ParamKind::Scalar(ScalarType::Enum(Author::NAMES)),
                    "'me' if the user wrote it, 'them' otherwise.",
                ),
                ParamSpec::optional("date", DATE, "When it was written. Defaults to today.")
                    .with_default(DefaultValue::Today),
            ],
        ),
        OperationSpec::new(
            "set_relationship",
            Create,
            "Link two people: person1 is <relationship> of person2.",
            vec![
                ParamSpec::required("person1_name", CONTACT, "First person."),
                ParamSpec::required(
                    "relationship_name",
                    ParamKind::EntityReference(EntityKind::RelationshipType),
                    "Relationship, e.g. 'parent', 'child', 'friend'.",
                ),
                ParamSpec::required("person2_name", CONTACT, "Second person."),
            ],
        ),
        OperationSpec::new(
            "create_task_for",
            Create,
            "Create a to-do item attached to a person.",
            vec![
                person("Who the task is about."),
                ParamSpec::required("title", STRING, "Task title."),
                ParamSpec::optional("description", STRING, "Task details."),
            ],
        ),
        OperationSpec::new(
            "mark_task_as_complete",
            Update,
            "Mark a task as done.",
            vec![ParamSpec::required("task_id", INT, "Id of the task.")],
        ),
        OperationSpec::new(
            "set_reminder_for",
            Create,
            "Schedule a reminder about a person.",
            vec![
                person("Who the reminder is about."),
                ParamSpec::required("title", STRING, "What to be reminded of."),
                ParamSpec::required("date", DATE, "First reminder date."),
                ParamSpec::optional(
                    "frequency_type",
                    ParamKind::Scalar(ScalarType::Enum(FrequencyType::NAMES)),
                    "How often it repeats.",
                )
                .with_default(DefaultValue::Text("one_time")),
                ParamSpec::optional("frequency_number", INT, "Repeat every N periods.")
                    .with_default(DefaultValue::Int(1)),
            ],
        ),
        OperationSpec::new(
            "track_debt",
            Create,
            "Record money owed between the user ('me') and someone else.",
            vec![
                ParamSpec::required(
                    "person_who_owes_money",
                    STRING,
                    "'me' or the name of the person who owes.",
                ),
                ParamSpec::required(
                    "person_who_is_owed_money",
                    STRING,
                    "'me' or the name of the person who is owed.",
                ),
                ParamSpec::required("amount", FLOAT, "Amount in whole currency units."),
                ParamSpec::optional("reason", STRING, "What the money was for."),
                ParamSpec::optional("is_settled", BOOL, "Whether it has been paid back.")
                    .with_default(DefaultValue::Bool(false)),
            ],
        ),
        OperationSpec::new(
            "log_gift",
            Create,
            "Record a gift idea, or a gift given or received.",
            vec![
                person("Who the gift is for or from."),
                ParamSpec::required("gift_name", STRING, "What the gift is."),
                ParamSpec::required(
                    "status",
                    ParamKind::Scalar(ScalarType::Enum(GiftStatus::NAMES)),
                    "idea, offered or received.",
                ),
                ParamSpec::optional("date", DATE, "When it was offered or received."),
                ParamSpec::optional("amount", FLOAT, "Price of the gift."),
            ],
        ),
        OperationSpec::new(
            "log_job_for_person",
            Update,
            "Record a person's job; the company is created if it is new.",
            vec![
                person("Whose job it is."),
                ParamSpec::required("job_title", STRING, "Job title."),
                ParamSpec::required("company_name", STRING, "Employer name."),
                ParamSpec::optional("start_date", DATE, "When the job started."),
            ],
        ),
        OperationSpec::new(
            "tag_person",
            Update,
            "Attach tags to a person, creating tags that do not exist yet.",
            vec![
                person("Who to tag."),
                ParamSpec::required("tags", STRING_LIST, "Tag names."),
            ],
        ),
        OperationSpec::new(
            "untag_person",
            Update,
            "Remove existing tags from a person.",
            vec![
                person("Who to untag."),
                ParamSpec::required("tags_to_remove", STRING_LIST, "Tag names to remove."),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::operations::catalog::standard_catalog;

    #[test]
    fn catalog_names_are_unique_and_snake_case() {
        let catalog = standard_catalog();
        let names: HashSet<_> = catalog.iter().map(|spec| spec.name).collect();

        assert_eq!(names.len(), catalog.len());
        assert_eq!(catalog.len(), 19);
        assert!(catalog
            .iter()
            .all(|spec| spec.name.chars().all(|ch| ch.is_ascii_lowercase() || ch == '_')));
    }

    #[test]
    fn defaults_only_on_optional_parameters() {
        for spec in standard_catalog() {
            for param in &spec.params {
                assert!(
                    !(param.required && param.default.is_some()),
                    "{}.{} is required but has a default",
                    spec.name,
                    param.name
                );
            }
        }
    }
}
