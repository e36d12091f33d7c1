//! The closed set of operations the dispatcher can run.
//!
//! [`OperationSpec`] is the declarative schema (what the intent model sees);
//! [`Operation`] is the typed invocation produced once names are resolved and
//! scalars validated.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{
    ActivityType, Author, Contact, ContactFieldType, ConversationId, DebtDirection, FrequencyType,
    Gender, GiftStatus, RelationshipType, TaskId,
};

pub mod args;
mod bind;
pub mod catalog;
pub mod registry;

pub use args::{ArgValue, BoundArgs};
pub use registry::{OperationRegistry, RegistryError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationCategory {
    Create,
    Read,
    Update,
    Delete,
}

/// Record kinds a parameter can name instead of carrying an id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Contact,
    Gender,
    RelationshipType,
    ContactFieldType,
    ActivityType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Int,
    Float,
    Bool,
    Date,
    Enum(&'static [&'static str]),
    StringList,
}

impl ScalarType {
    pub fn label(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Int => "int".to_string(),
            Self::Float => "float".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Date => "date (YYYY-MM-DD)".to_string(),
            Self::Enum(choices) => format!("enum({})", choices.join(", ")),
            Self::StringList => "string list".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Scalar(ScalarType),
    EntityReference(EntityKind),
    EntityReferenceList(EntityKind),
}

impl ParamKind {
    pub fn label(&self) -> String {
        match self {
            Self::Scalar(scalar) => scalar.label(),
            Self::EntityReference(kind) => format!("{} name", entity_label(*kind)),
            Self::EntityReferenceList(kind) => format!("list of {} names", entity_label(*kind)),
        }
    }
}

fn entity_label(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Contact => "contact",
        EntityKind::Gender => "gender",
        EntityKind::RelationshipType => "relationship type",
        EntityKind::ContactFieldType => "contact field type",
        EntityKind::ActivityType => "activity type",
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultValue {
    Text(&'static str),
    Int(i64),
    Bool(bool),
    /// Current UTC date at dispatch time.
    Today,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self { name, kind, required: true, default: None, description }
    }

    pub fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self { name, kind, required: false, default: None, description }
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn is_entity_reference(&self) -> bool {
        matches!(self.kind, ParamKind::EntityReference(_) | ParamKind::EntityReferenceList(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: &'static str,
    pub category: OperationCategory,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

impl OperationSpec {
    pub fn new(
        name: &'static str,
        category: OperationCategory,
        description: &'static str,
        params: Vec<ParamSpec>,
    ) -> Self {
        Self { name, category, description, params }
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|param| param.name == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    RememberPerson(RememberPerson),
    FindPeople(FindPeople),
    GetDetailsAboutPerson(PersonTarget),
    ForgetPerson(PersonTarget),
    RememberSomethingAbout(RememberSomethingAbout),
    GetMemoriesAbout(PersonTarget),
    LogActivityWith(LogActivityWith),
    LogCallWith(LogCallWith),
    StartConversationWith(StartConversationWith),
    AddMessageToConversation(AddMessageToConversation),
    SetRelationship(SetRelationship),
    CreateTaskFor(CreateTaskFor),
    MarkTaskAsComplete(MarkTaskAsComplete),
    SetReminderFor(SetReminderFor),
    TrackDebt(TrackDebt),
    LogGift(LogGift),
    LogJobForPerson(LogJobForPerson),
    TagPerson(TagPerson),
    UntagPerson(UntagPerson),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RememberPerson(_) => "remember_person",
            Self::FindPeople(_) => "find_people",
            Self::GetDetailsAboutPerson(_) => "get_details_about_person",
            Self::ForgetPerson(_) => "forget_person",
            Self::RememberSomethingAbout(_) => "remember_something_about",
            Self::GetMemoriesAbout(_) => "get_memories_about",
            Self::LogActivityWith(_) => "log_activity_with",
            Self::LogCallWith(_) => "log_call_with",
            Self::StartConversationWith(_) => "start_conversation_with",
            Self::AddMessageToConversation(_) => "add_message_to_conversation",
            Self::SetRelationship(_) => "set_relationship",
            Self::CreateTaskFor(_) => "create_task_for",
            Self::MarkTaskAsComplete(_) => "mark_task_as_complete",
            Self::SetReminderFor(_) => "set_reminder_for",
            Self::TrackDebt(_) => "track_debt",
            Self::LogGift(_) => "log_gift",
            Self::LogJobForPerson(_) => "log_job_for_person",
            Self::TagPerson(_) => "tag_person",
            Self::UntagPerson(_) => "untag_person",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RememberPerson {
    pub first_name: String,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub gender: Gender,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FindPeople {
    pub query: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PersonTarget {
    pub person: Contact,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RememberSomethingAbout {
    pub person: Contact,
    pub memory_text: String,
    pub is_important: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogActivityWith {
    pub people: Vec<Contact>,
    pub summary: String,
    pub activity_type: ActivityType,
    pub date: NaiveDate,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogCallWith {
    pub person: Contact,
    pub date: NaiveDate,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StartConversationWith {
    pub person: Contact,
    pub date: NaiveDate,
    pub medium: ContactFieldType,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AddMessageToConversation {
    pub conversation_id: ConversationId,
    pub content: String,
    pub written_by: Author,
    pub date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SetRelationship {
    pub person1: Contact,
    pub relationship_type: RelationshipType,
    pub person2: Contact,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateTaskFor {
    pub person: Contact,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MarkTaskAsComplete {
    pub task_id: TaskId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SetReminderFor {
    pub person: Contact,
    pub title: String,
    pub date: NaiveDate,
    pub frequency_type: FrequencyType,
    pub frequency_number: i64,
}

/// The contact side of a debt. Binding leaves it as a bare name because only
/// then is it known which side is the user; the dispatcher resolves it before
/// leaving the resolution phase.
#[derive(Clone, Debug, PartialEq)]
pub enum Counterparty {
    Named(String),
    Resolved(Contact),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackDebt {
    pub counterparty: Counterparty,
    pub direction: DebtDirection,
    pub amount: Decimal,
    pub reason: Option<String>,
    pub is_settled: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogGift {
    pub person: Contact,
    pub gift_name: String,
    pub status: GiftStatus,
    pub date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogJobForPerson {
    pub person: Contact,
    pub job_title: String,
    pub company_name: String,
    pub start_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TagPerson {
    pub person: Contact,
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UntagPerson {
    pub person: Contact,
    pub tags_to_remove: Vec<String>,
}
