use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::sync::{Barrier, RwLock};

use crate::domain::{
    Activity, ActivityId, ActivityType, ActivityTypeId, Call, CallId, Career, Company, CompanyId,
    Contact, ContactFieldType, ContactFieldTypeId, ContactId, ContactInformation, ContactRef,
    Conversation, ConversationId, Country, Currency, CurrencyId, Debt, DebtId, Gender, GenderId,
    Gift, GiftId, Message, MessageId, NewActivity, NewCall, NewContact, NewConversation, NewDebt,
    NewGift, NewMessage, NewNote, NewOccupation, NewRelationship, NewReminder, NewTask, Note,
    NoteId, Occupation, OccupationId, Relationship, RelationshipId, RelationshipType,
    RelationshipTypeId, Reminder, ReminderId, Tag, TagId, Task, TaskId, TaskUpdate,
};
use crate::errors::StoreError;
use crate::store::CrmStore;

const MUTATING_PREFIXES: &[&str] = &["create_", "delete_", "update_", "add_", "set_", "unset_"];

/// Store double backed by process memory.
///
/// Seeded with the reference lists a fresh CRM account ships with. Every
/// trait call is appended to a call log, and individual methods can be made
/// to fail (or panic) for fault-path tests. The `insert_*` helpers seed data
/// without touching the call log.
pub struct InMemoryCrmStore {
    state: RwLock<State>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, StoreError>>,
    panics: Mutex<HashSet<String>>,
    company_listing_hold: Mutex<Option<Arc<Barrier>>>,
}

struct State {
    next_id: i64,
    contacts: BTreeMap<ContactId, Contact>,
    contact_tags: HashMap<ContactId, BTreeSet<TagId>>,
    notes: Vec<(ContactId, Note)>,
    calls: Vec<(ContactId, Call)>,
    activities: Vec<(Vec<ContactId>, Activity)>,
    conversations: BTreeMap<ConversationId, Conversation>,
    relationships: Vec<Relationship>,
    tasks: BTreeMap<TaskId, Task>,
    reminders: Vec<(ContactId, Reminder)>,
    debts: Vec<(NewDebt, Debt)>,
    gifts: Vec<(ContactId, Gift)>,
    occupations: Vec<(NewOccupation, Occupation)>,
    companies: Vec<Company>,
    tags: Vec<Tag>,
    genders: Vec<Gender>,
    currencies: Vec<Currency>,
    countries: Vec<Country>,
    activity_types: Vec<ActivityType>,
    contact_field_types: Vec<ContactFieldType>,
    relationship_types: Vec<RelationshipType>,
}

impl State {
    fn seeded() -> Self {
        let genders = ["Man", "Woman", "Rather not say"]
            .iter()
            .zip(1..)
            .map(|(name, id)| Gender { id: GenderId(id), name: (*name).to_string() })
            .collect();
        let relationship_types = [
            ("partner", "partner"),
            ("spouse", "spouse"),
            ("parent", "child"),
            ("sibling", "sibling"),
            ("friend", "friend"),
            ("colleague", "colleague"),
            ("boss", "subordinate"),
            ("mentor", "protege"),
        ]
        .iter()
        .zip(1..)
        .map(|((name, reverse), id)| RelationshipType {
            id: RelationshipTypeId(id),
            name: (*name).to_string(),
            name_reverse_relationship: Some((*reverse).to_string()),
        })
        .collect();
        let contact_field_types = ["Email", "Phone", "Facebook", "Twitter", "WhatsApp", "Telegram"]
            .iter()
            .zip(1..)
            .map(|(name, id)| ContactFieldType {
                id: ContactFieldTypeId(id),
                name: (*name).to_string(),
            })
            .collect();
        let activity_types = [
            "just hung out",
            "ate at a restaurant",
            "watched a movie",
            "went to a bar",
            "had a meeting",
            "played sport",
        ]
        .iter()
        .zip(1..)
        .map(|(name, id)| ActivityType { id: ActivityTypeId(id), name: (*name).to_string() })
        .collect();
        let currencies = [
            ("USD", "US Dollar", "$"),
            ("EUR", "Euro", "€"),
            ("GBP", "British Pound", "£"),
            ("CAD", "Canadian Dollar", "$"),
        ]
        .iter()
        .zip(1..)
        .map(|((iso, name, symbol), id)| Currency {
            id: CurrencyId(id),
            iso: (*iso).to_string(),
            name: (*name).to_string(),
            symbol: Some((*symbol).to_string()),
        })
        .collect();
        let countries = [
            ("US", "United States"),
            ("GB", "United Kingdom"),
            ("FR", "France"),
            ("DE", "Germany"),
            ("CA", "Canada"),
        ]
        .iter()
        .map(|(code, name)| Country { id: (*code).to_string(), name: (*name).to_string() })
        .collect();

        Self {
            next_id: 1,
            contacts: BTreeMap::new(),
            contact_tags: HashMap::new(),
            notes: Vec::new(),
            calls: Vec::new(),
            activities: Vec::new(),
            conversations: BTreeMap::new(),
            relationships: Vec::new(),
            tasks: BTreeMap::new(),
            reminders: Vec::new(),
            debts: Vec::new(),
            gifts: Vec::new(),
            occupations: Vec::new(),
            companies: Vec::new(),
            tags: Vec::new(),
            genders,
            currencies,
            countries,
            activity_types,
            contact_field_types,
            relationship_types,
        }
    }

    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn contact(&self, id: ContactId) -> Result<&Contact, StoreError> {
        self.contacts.get(&id).ok_or_else(|| missing("contact", id))
    }

    fn require_contact(&self, id: ContactId) -> Result<(), StoreError> {
        self.contact(id).map(|_| ())
    }

    fn insert_contact(&mut self, first_name: &str, last_name: Option<&str>) -> Contact {
        let id = ContactId(self.next_id());
        let contact = Contact::new(id, first_name, last_name.map(str::to_string));
        self.contacts.insert(id, contact.clone());
        contact
    }

    fn insert_company(&mut self, name: &str) -> Company {
        let company = Company { id: CompanyId(self.next_id()), name: name.to_string() };
        self.companies.push(company.clone());
        company
    }

    fn insert_tag(&mut self, name: &str) -> Tag {
        let tag = Tag { id: TagId(self.next_id()), name: name.to_string() };
        self.tags.push(tag.clone());
        tag
    }

    /// Contact as the store would render it, with its tag set attached.
    fn render_contact(&self, id: ContactId) -> Result<Contact, StoreError> {
        let mut contact = self.contact(id)?.clone();
        let tags: Vec<Value> = self
            .contact_tags
            .get(&id)
            .map(|ids| {
                self.tags
                    .iter()
                    .filter(|tag| ids.contains(&tag.id))
                    .map(|tag| json!({ "id": tag.id, "name": tag.name }))
                    .collect()
            })
            .unwrap_or_default();
        contact.extra.insert("tags".to_string(), Value::Array(tags));
        Ok(contact)
    }
}

fn missing(entity: &'static str, id: impl ToString) -> StoreError {
    StoreError::Missing { entity, id: id.to_string() }
}

fn matches_query(contact: &Contact, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return false;
    }

    let full_name = contact.full_name();
    let fields = [
        Some(contact.first_name.as_str()),
        contact.last_name.as_deref(),
        contact.nickname.as_deref(),
        Some(full_name.as_str()),
    ];
    let hit = fields.into_iter().flatten().any(|field| field.to_lowercase().contains(&query));
    hit
}

impl Default for InMemoryCrmStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCrmStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::seeded()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            panics: Mutex::new(HashSet::new()),
            company_listing_hold: Mutex::new(None),
        }
    }

    pub async fn insert_contact(&self, first_name: &str, last_name: Option<&str>) -> Contact {
        self.state.write().await.insert_contact(first_name, last_name)
    }

    pub async fn insert_company(&self, name: &str) -> Company {
        self.state.write().await.insert_company(name)
    }

    pub async fn insert_tag(&self, name: &str) -> Tag {
        self.state.write().await.insert_tag(name)
    }

    pub async fn insert_task(&self, contact: ContactId, title: &str, completed: bool) -> Task {
        let mut state = self.state.write().await;
        let task = Task {
            id: TaskId(state.next_id()),
            title: title.to_string(),
            description: None,
            completed,
            contact: Some(ContactRef { id: contact }),
        };
        state.tasks.insert(task.id, task.clone());
        task
    }

    pub async fn contact(&self, id: ContactId) -> Option<Contact> {
        self.state.read().await.render_contact(id).ok()
    }

    pub async fn notes_for(&self, contact: ContactId) -> Vec<Note> {
        let state = self.state.read().await;
        state.notes.iter().filter(|(owner, _)| *owner == contact).map(|(_, note)| note.clone()).collect()
    }

    pub async fn debts_for(&self, contact: ContactId) -> Vec<NewDebt> {
        let state = self.state.read().await;
        state
            .debts
            .iter()
            .filter(|(request, _)| request.contact_id == contact)
            .map(|(request, _)| request.clone())
            .collect()
    }

    pub async fn occupations(&self) -> Vec<NewOccupation> {
        let state = self.state.read().await;
        state.occupations.iter().map(|(request, _)| request.clone()).collect()
    }

    pub async fn companies(&self) -> Vec<Company> {
        self.state.read().await.companies.clone()
    }

    pub async fn relationships(&self) -> Vec<Relationship> {
        self.state.read().await.relationships.clone()
    }

    pub async fn tag_names_for(&self, contact: ContactId) -> BTreeSet<String> {
        let state = self.state.read().await;
        let Some(ids) = state.contact_tags.get(&contact) else {
            return BTreeSet::new();
        };
        state.tags.iter().filter(|tag| ids.contains(&tag.id)).map(|tag| tag.name.clone()).collect()
    }

    /// Makes every later call to `method` fail with `error`.
    pub fn fail_on(&self, method: &str, error: StoreError) {
        let mut failures = match self.failures.lock() {
            Ok(failures) => failures,
            Err(poisoned) => poisoned.into_inner(),
        };
        failures.insert(method.to_string(), error);
    }

    /// Makes every later call to `method` panic, simulating a defect.
    pub fn panic_on(&self, method: &str) {
        let mut panics = match self.panics.lock() {
            Ok(panics) => panics,
            Err(poisoned) => poisoned.into_inner(),
        };
        panics.insert(method.to_string());
    }

    /// Parks every later `list_companies` call at `barrier` before it reads,
    /// so concurrent callers all observe the same company list.
    pub fn hold_company_listing(&self, barrier: Arc<Barrier>) {
        match self.company_listing_hold.lock() {
            Ok(mut hold) => *hold = Some(barrier),
            Err(poisoned) => *poisoned.into_inner() = Some(barrier),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls().iter().filter(|call| call.as_str() == method).count()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| MUTATING_PREFIXES.iter().any(|prefix| call.starts_with(prefix)))
            .collect()
    }

    fn enter(&self, method: &str) -> Result<(), StoreError> {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(method.to_string()),
            Err(poisoned) => poisoned.into_inner().push(method.to_string()),
        }

        let should_panic = match self.panics.lock() {
            Ok(panics) => panics.contains(method),
            Err(poisoned) => poisoned.into_inner().contains(method),
        };
        if should_panic {
            panic!("injected panic in {method}");
        }

        let failure = match self.failures.lock() {
            Ok(failures) => failures.get(method).cloned(),
            Err(poisoned) => poisoned.into_inner().get(method).cloned(),
        };
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl CrmStore for InMemoryCrmStore {
    async fn search_contacts(&self, query: &str) -> Result<Vec<Contact>, StoreError> {
        self.enter("search_contacts")?;
        let state = self.state.read().await;
        Ok(state.contacts.values().filter(|contact| matches_query(contact, query)).cloned().collect())
    }

    async fn get_contact(&self, id: ContactId) -> Result<Contact, StoreError> {
        self.enter("get_contact")?;
        self.state.read().await.render_contact(id)
    }

    async fn create_contact(&self, contact: NewContact) -> Result<Contact, StoreError> {
        self.enter("create_contact")?;
        let mut state = self.state.write().await;
        let gender = state
            .genders
            .iter()
            .find(|gender| gender.id == contact.gender_id)
            .map(|gender| gender.name.clone())
            .ok_or_else(|| StoreError::Status {
                status: 422,
                message: format!("The selected gender id {} is invalid.", contact.gender_id),
            })?;

        let mut created = state.insert_contact(&contact.first_name, contact.last_name.as_deref());
        created.nickname = contact.nickname;
        created.gender = Some(gender);
        state.contacts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_contact(&self, id: ContactId) -> Result<(), StoreError> {
        self.enter("delete_contact")?;
        let mut state = self.state.write().await;
        state.contacts.remove(&id).map(|_| ()).ok_or_else(|| missing("contact", id))
    }

    async fn list_notes(&self, contact: ContactId) -> Result<Vec<Note>, StoreError> {
        self.enter("list_notes")?;
        let state = self.state.read().await;
        state.require_contact(contact)?;
        Ok(state
            .notes
            .iter()
            .filter(|(owner, _)| *owner == contact)
            .map(|(_, note)| note.clone())
            .collect())
    }

    async fn create_note(&self, note: NewNote) -> Result<Note, StoreError> {
        self.enter("create_note")?;
        let mut state = self.state.write().await;
        state.require_contact(note.contact_id)?;
        let created =
            Note { id: NoteId(state.next_id()), body: note.body, is_favorited: note.is_favorited };
        state.notes.push((note.contact_id, created.clone()));
        Ok(created)
    }

    async fn create_call(&self, call: NewCall) -> Result<Call, StoreError> {
        self.enter("create_call")?;
        let mut state = self.state.write().await;
        state.require_contact(call.contact_id)?;
        let created = Call {
            id: CallId(state.next_id()),
            called_at: Some(call.called_at),
            content: Some(call.content),
        };
        state.calls.push((call.contact_id, created.clone()));
        Ok(created)
    }

    async fn create_activity(&self, activity: NewActivity) -> Result<Activity, StoreError> {
        self.enter("create_activity")?;
        let mut state = self.state.write().await;
        for contact in &activity.contacts {
            state.require_contact(*contact)?;
        }
        let created = Activity {
            id: ActivityId(state.next_id()),
            summary: activity.summary,
            happened_at: Some(activity.happened_at),
        };
        state.activities.push((activity.contacts, created.clone()));
        Ok(created)
    }

    async fn create_conversation(
        &self,
        conversation: NewConversation,
    ) -> Result<Conversation, StoreError> {
        self.enter("create_conversation")?;
        let mut state = self.state.write().await;
        state.require_contact(conversation.contact_id)?;
        let created = Conversation {
            id: ConversationId(state.next_id()),
            contact: ContactRef { id: conversation.contact_id },
            happened_at: Some(conversation.happened_at),
            contact_field_type_id: Some(conversation.contact_field_type_id),
            messages: Vec::new(),
        };
        state.conversations.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_conversation(&self, id: ConversationId) -> Result<Conversation, StoreError> {
        self.enter("get_conversation")?;
        let state = self.state.read().await;
        state.conversations.get(&id).cloned().ok_or_else(|| missing("conversation", id))
    }

    async fn add_message(
        &self,
        conversation: ConversationId,
        message: NewMessage,
    ) -> Result<Conversation, StoreError> {
        self.enter("add_message")?;
        let mut state = self.state.write().await;
        let message_id = MessageId(state.next_id());
        let target =
            state.conversations.get_mut(&conversation).ok_or_else(|| missing("conversation", conversation))?;
        if target.contact.id != message.contact_id {
            return Err(StoreError::Status {
                status: 422,
                message: "The contact does not own this conversation.".to_string(),
            });
        }
        target.messages.push(Message {
            id: message_id,
            content: message.content,
            written_by_me: message.written_by_me,
            written_at: Some(message.written_at),
        });
        Ok(target.clone())
    }

    async fn create_relationship(
        &self,
        relationship: NewRelationship,
    ) -> Result<Relationship, StoreError> {
        self.enter("create_relationship")?;
        let mut state = self.state.write().await;
        state.require_contact(relationship.contact_is)?;
        state.require_contact(relationship.of_contact)?;
        let created = Relationship {
            id: RelationshipId(state.next_id()),
            relationship_type_id: Some(relationship.relationship_type_id),
            contact_is: Some(relationship.contact_is),
            of_contact: Some(relationship.of_contact),
        };
        state.relationships.push(created.clone());
        Ok(created)
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.enter("create_task")?;
        let mut state = self.state.write().await;
        state.require_contact(task.contact_id)?;
        let created = Task {
            id: TaskId(state.next_id()),
            title: task.title,
            description: task.description,
            completed: false,
            contact: Some(ContactRef { id: task.contact_id }),
        };
        state.tasks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_task(&self, id: TaskId) -> Result<Task, StoreError> {
        self.enter("get_task")?;
        let state = self.state.read().await;
        state.tasks.get(&id).cloned().ok_or_else(|| missing("task", id))
    }

    async fn update_task(&self, id: TaskId, update: TaskUpdate) -> Result<Task, StoreError> {
        self.enter("update_task")?;
        let mut state = self.state.write().await;
        let task = state.tasks.get_mut(&id).ok_or_else(|| missing("task", id))?;
        task.title = update.title;
        task.completed = update.completed;
        if let Some(contact_id) = update.contact_id {
            task.contact = Some(ContactRef { id: contact_id });
        }
        Ok(task.clone())
    }

    async fn create_reminder(&self, reminder: NewReminder) -> Result<Reminder, StoreError> {
        self.enter("create_reminder")?;
        let mut state = self.state.write().await;
        state.require_contact(reminder.contact_id)?;
        let created = Reminder {
            id: ReminderId(state.next_id()),
            title: reminder.title,
            initial_date: Some(reminder.initial_date),
            frequency_type: Some(reminder.frequency_type),
            frequency_number: Some(reminder.frequency_number),
        };
        state.reminders.push((reminder.contact_id, created.clone()));
        Ok(created)
    }

    async fn create_debt(&self, debt: NewDebt) -> Result<Debt, StoreError> {
        self.enter("create_debt")?;
        let mut state = self.state.write().await;
        state.require_contact(debt.contact_id)?;
        let created = Debt {
            id: DebtId(state.next_id()),
            in_debt: Some(debt.in_debt.clone()),
            status: Some(debt.status),
            amount: Some(debt.amount.into()),
            reason: debt.reason.clone(),
        };
        state.debts.push((debt, created.clone()));
        Ok(created)
    }

    async fn create_gift(&self, gift: NewGift) -> Result<Gift, StoreError> {
        self.enter("create_gift")?;
        let mut state = self.state.write().await;
        state.require_contact(gift.contact_id)?;
        let created = Gift { id: GiftId(state.next_id()), name: gift.name, status: Some(gift.status) };
        state.gifts.push((gift.contact_id, created.clone()));
        Ok(created)
    }

    async fn create_occupation(
        &self,
        occupation: NewOccupation,
    ) -> Result<Occupation, StoreError> {
        self.enter("create_occupation")?;
        let mut state = self.state.write().await;
        let company = state
            .companies
            .iter()
            .find(|company| company.id == occupation.company_id)
            .cloned()
            .ok_or_else(|| missing("company", occupation.company_id))?;
        let id = OccupationId(state.next_id());
        let contact = state
            .contacts
            .get_mut(&occupation.contact_id)
            .ok_or_else(|| missing("contact", occupation.contact_id))?;
        contact.information = Some(ContactInformation {
            career: Some(Career { job: Some(occupation.title.clone()), company: Some(company.name) }),
        });

        let created = Occupation { id, title: occupation.title.clone() };
        state.occupations.push((occupation, created.clone()));
        Ok(created)
    }

    async fn list_companies(&self) -> Result<Vec<Company>, StoreError> {
        self.enter("list_companies")?;
        let hold = match self.company_listing_hold.lock() {
            Ok(hold) => hold.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if let Some(barrier) = hold {
            barrier.wait().await;
        }
        Ok(self.state.read().await.companies.clone())
    }

    async fn create_company(&self, name: &str) -> Result<Company, StoreError> {
        self.enter("create_company")?;
        Ok(self.state.write().await.insert_company(name))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        self.enter("list_tags")?;
        Ok(self.state.read().await.tags.clone())
    }

    async fn set_tags(&self, contact: ContactId, names: &[String]) -> Result<Contact, StoreError> {
        self.enter("set_tags")?;
        let mut state = self.state.write().await;
        state.require_contact(contact)?;

        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let existing = state.tags.iter().find(|tag| tag.name.eq_ignore_ascii_case(name)).cloned();
            let tag = match existing {
                Some(tag) => tag,
                None => state.insert_tag(name),
            };
            ids.push(tag.id);
        }
        state.contact_tags.entry(contact).or_default().extend(ids);
        state.render_contact(contact)
    }

    async fn unset_tags(&self, contact: ContactId, tags: &[TagId]) -> Result<Contact, StoreError> {
        self.enter("unset_tags")?;
        let mut state = self.state.write().await;
        state.require_contact(contact)?;
        if let Some(assigned) = state.contact_tags.get_mut(&contact) {
            for tag in tags {
                assigned.remove(tag);
            }
        }
        state.render_contact(contact)
    }

    async fn list_genders(&self) -> Result<Vec<Gender>, StoreError> {
        self.enter("list_genders")?;
        Ok(self.state.read().await.genders.clone())
    }

    async fn list_currencies(&self) -> Result<Vec<Currency>, StoreError> {
        self.enter("list_currencies")?;
        Ok(self.state.read().await.currencies.clone())
    }

    async fn list_countries(&self) -> Result<Vec<Country>, StoreError> {
        self.enter("list_countries")?;
        Ok(self.state.read().await.countries.clone())
    }

    async fn list_activity_types(&self) -> Result<Vec<ActivityType>, StoreError> {
        self.enter("list_activity_types")?;
        Ok(self.state.read().await.activity_types.clone())
    }

    async fn list_contact_field_types(&self) -> Result<Vec<ContactFieldType>, StoreError> {
        self.enter("list_contact_field_types")?;
        Ok(self.state.read().await.contact_field_types.clone())
    }

    async fn list_relationship_types(&self) -> Result<Vec<RelationshipType>, StoreError> {
        self.enter("list_relationship_types")?;
        Ok(self.state.read().await.relationship_types.clone())
    }
}
