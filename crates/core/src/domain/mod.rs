//! Records owned by the CRM store.
//!
//! Every id is opaque and stable once the store has issued it. Sub-resources
//! (notes, tasks, reminders, debts, gifts, calls, conversations) always carry
//! the id of their owning contact.

pub mod contact;
pub mod conversation;
pub mod records;
pub mod reference;
pub mod relationship;

macro_rules! record_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
            pub struct $name(pub i64);

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

record_id!(
    ContactId,
    CompanyId,
    TagId,
    NoteId,
    TaskId,
    ReminderId,
    DebtId,
    GiftId,
    CallId,
    ActivityId,
    ConversationId,
    MessageId,
    RelationshipId,
    RelationshipTypeId,
    OccupationId,
    GenderId,
    ContactFieldTypeId,
    ActivityTypeId,
    CurrencyId,
);

pub use contact::{Career, Contact, ContactInformation, ContactRef, ContactSummary, NewContact};
pub use conversation::{Author, Conversation, Message, NewConversation, NewMessage};
pub use records::{
    Activity, Call, Debt, DebtDirection, DebtStatus, FrequencyType, Gift, GiftStatus, NewActivity,
    NewCall, NewDebt, NewGift, NewNote, NewOccupation, NewReminder, NewTask, Note, Occupation,
    Reminder, Task, TaskUpdate,
};
pub use reference::{ActivityType, Company, ContactFieldType, Country, Currency, Gender, Tag};
pub use relationship::{NewRelationship, Relationship, RelationshipType};
