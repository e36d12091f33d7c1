//! The CRM store capability.
//!
//! Every method maps to one remote call. Implementations report transport and
//! status failures as [`StoreError`]; they never interpret domain outcomes
//! such as "no match" (an empty search is `Ok(vec![])`).

use async_trait::async_trait;

use crate::domain::{
    Activity, ActivityType, Call, Company, Contact, ContactFieldType, ContactId, Conversation,
    ConversationId, Country, Currency, Debt, Gender, Gift, NewActivity, NewCall, NewContact,
    NewConversation, NewDebt, NewGift, NewMessage, NewNote, NewOccupation, NewRelationship,
    NewReminder, NewTask, Note, Occupation, Relationship, RelationshipType, Reminder, Tag, TagId,
    Task, TaskId, TaskUpdate,
};
use crate::errors::StoreError;

pub mod memory;

pub use memory::InMemoryCrmStore;

#[async_trait]
pub trait CrmStore: Send + Sync {
    async fn search_contacts(&self, query: &str) -> Result<Vec<Contact>, StoreError>;
    async fn get_contact(&self, id: ContactId) -> Result<Contact, StoreError>;
    async fn create_contact(&self, contact: NewContact) -> Result<Contact, StoreError>;
    async fn delete_contact(&self, id: ContactId) -> Result<(), StoreError>;

    async fn list_notes(&self, contact: ContactId) -> Result<Vec<Note>, StoreError>;
    async fn create_note(&self, note: NewNote) -> Result<Note, StoreError>;

    async fn create_call(&self, call: NewCall) -> Result<Call, StoreError>;
    async fn create_activity(&self, activity: NewActivity) -> Result<Activity, StoreError>;

    async fn create_conversation(
        &self,
        conversation: NewConversation,
    ) -> Result<Conversation, StoreError>;
    async fn get_conversation(&self, id: ConversationId) -> Result<Conversation, StoreError>;
    async fn add_message(
        &self,
        conversation: ConversationId,
        message: NewMessage,
    ) -> Result<Conversation, StoreError>;

    async fn create_relationship(
        &self,
        relationship: NewRelationship,
    ) -> Result<Relationship, StoreError>;

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError>;
    async fn get_task(&self, id: TaskId) -> Result<Task, StoreError>;
    async fn update_task(&self, id: TaskId, update: TaskUpdate) -> Result<Task, StoreError>;

    async fn create_reminder(&self, reminder: NewReminder) -> Result<Reminder, StoreError>;
    async fn create_debt(&self, debt: NewDebt) -> Result<Debt, StoreError>;
    async fn create_gift(&self, gift: NewGift) -> Result<Gift, StoreError>;
    async fn create_occupation(&self, occupation: NewOccupation)
        -> Result<Occupation, StoreError>;

    async fn list_companies(&self) -> Result<Vec<Company>, StoreError>;
    async fn create_company(&self, name: &str) -> Result<Company, StoreError>;

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError>;
    /// Attaches tags by name, creating any that do not exist yet.
    async fn set_tags(&self, contact: ContactId, names: &[String]) -> Result<Contact, StoreError>;
    async fn unset_tags(&self, contact: ContactId, tags: &[TagId]) -> Result<Contact, StoreError>;

    async fn list_genders(&self) -> Result<Vec<Gender>, StoreError>;
    async fn list_currencies(&self) -> Result<Vec<Currency>, StoreError>;
    async fn list_countries(&self) -> Result<Vec<Country>, StoreError>;
    async fn list_activity_types(&self) -> Result<Vec<ActivityType>, StoreError>;
    async fn list_contact_field_types(&self) -> Result<Vec<ContactFieldType>, StoreError>;
    async fn list_relationship_types(&self) -> Result<Vec<RelationshipType>, StoreError>;
}
