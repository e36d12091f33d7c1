use serde::{Deserialize, Serialize};

use crate::domain::{ActivityTypeId, CompanyId, ContactFieldTypeId, CurrencyId, GenderId, TagId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gender {
    pub id: GenderId,
    pub name: String,
}

/// Communication medium (email, phone, Twitter, ...). Conversations are
/// filed under one of these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFieldType {
    pub id: ContactFieldTypeId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityType {
    pub id: ActivityTypeId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub id: CurrencyId,
    pub iso: String,
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Countries are keyed by their ISO code rather than a numeric id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: String,
    pub name: String,
}
