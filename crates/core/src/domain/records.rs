use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    ActivityId, ActivityTypeId, CallId, CompanyId, ContactId, ContactRef, DebtId, GiftId, NoteId,
    OccupationId, ReminderId, TaskId,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_favorited: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub contact_id: ContactId,
    pub body: String,
    pub is_favorited: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub contact: Option<ContactRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub contact_id: ContactId,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub contact_id: Option<ContactId>,
    pub title: String,
    pub completed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyType {
    OneTime,
    Week,
    Month,
    Year,
}

impl FrequencyType {
    pub const NAMES: &'static [&'static str] = &["one_time", "week", "month", "year"];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "one_time" => Some(Self::OneTime),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    #[serde(default)]
    pub initial_date: Option<String>,
    #[serde(default)]
    pub frequency_type: Option<FrequencyType>,
    #[serde(default)]
    pub frequency_number: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReminder {
    pub contact_id: ContactId,
    pub title: String,
    pub initial_date: String,
    pub frequency_type: FrequencyType,
    pub frequency_number: i64,
}

/// Which way money flows between the user and the contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebtDirection {
    UserOwesContact,
    ContactOwesUser,
}

impl DebtDirection {
    /// Store encoding: "yes" when the user is the one in debt.
    pub fn in_debt(self) -> &'static str {
        match self {
            Self::UserOwesContact => "yes",
            Self::ContactOwesUser => "no",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtStatus {
    Inprogress,
    Complete,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub id: DebtId,
    #[serde(default)]
    pub in_debt: Option<String>,
    #[serde(default)]
    pub status: Option<DebtStatus>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Amounts are integral currency units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDebt {
    pub contact_id: ContactId,
    pub in_debt: String,
    pub status: DebtStatus,
    pub amount: i64,
    pub reason: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GiftStatus {
    Idea,
    Offered,
    Received,
}

impl GiftStatus {
    pub const NAMES: &'static [&'static str] = &["idea", "offered", "received"];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "idea" => Some(Self::Idea),
            "offered" => Some(Self::Offered),
            "received" => Some(Self::Received),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gift {
    pub id: GiftId,
    pub name: String,
    #[serde(default)]
    pub status: Option<GiftStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGift {
    pub contact_id: ContactId,
    pub name: String,
    pub status: GiftStatus,
    pub date: Option<String>,
    pub amount: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub id: CallId,
    #[serde(default)]
    pub called_at: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCall {
    pub contact_id: ContactId,
    pub called_at: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub happened_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewActivity {
    pub activity_type_id: ActivityTypeId,
    pub summary: String,
    pub description: Option<String>,
    pub happened_at: String,
    pub contacts: Vec<ContactId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupation {
    pub id: OccupationId,
    #[serde(default)]
    pub title: String,
}

/// Links a contact to a company with a job title in one store call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOccupation {
    pub contact_id: ContactId,
    pub company_id: CompanyId,
    pub title: String,
    pub start_date: Option<String>,
}
