use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{ContactId, GenderId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub information: Option<ContactInformation>,
    /// Remaining store fields, kept so detail lookups return the whole record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Contact {
    pub fn new(id: ContactId, first_name: impl Into<String>, last_name: Option<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name,
            nickname: None,
            gender: None,
            information: None,
            extra: Map::new(),
        }
    }

    /// Given and family name joined by a space, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name.as_deref().unwrap_or("")).trim().to_string()
    }

    pub fn job(&self) -> Option<&str> {
        self.career().and_then(|career| career.job.as_deref())
    }

    pub fn company(&self) -> Option<&str> {
        self.career().and_then(|career| career.company.as_deref())
    }

    pub fn summary(&self) -> ContactSummary {
        ContactSummary {
            id: self.id,
            name: self.full_name(),
            job: self.job().map(str::to_string),
            company: self.company().map(str::to_string),
        }
    }

    fn career(&self) -> Option<&Career> {
        self.information.as_ref().and_then(|information| information.career.as_ref())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInformation {
    #[serde(default)]
    pub career: Option<Career>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Career {
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

/// Owning-contact pointer embedded in sub-resources.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRef {
    pub id: ContactId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub id: ContactId,
    pub name: String,
    pub job: Option<String>,
    pub company: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub gender_id: GenderId,
    pub is_birthdate_known: bool,
    pub is_deceased: bool,
    pub is_deceased_date_known: bool,
}

impl NewContact {
    pub fn new(
        first_name: impl Into<String>,
        last_name: Option<String>,
        nickname: Option<String>,
        gender_id: GenderId,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name,
            nickname,
            gender_id,
            is_birthdate_known: false,
            is_deceased: false,
            is_deceased_date_known: false,
        }
    }
}
