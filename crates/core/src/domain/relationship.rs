use serde::{Deserialize, Serialize};

use crate::domain::{ContactId, RelationshipId, RelationshipTypeId};

/// Named link kind. Resolvable by either direction, e.g. "parent" / "child".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipType {
    pub id: RelationshipTypeId,
    pub name: String,
    #[serde(default)]
    pub name_reverse_relationship: Option<String>,
}

impl RelationshipType {
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self
                .name_reverse_relationship
                .as_deref()
                .is_some_and(|reverse| reverse.eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    #[serde(default)]
    pub relationship_type_id: Option<RelationshipTypeId>,
    #[serde(default)]
    pub contact_is: Option<ContactId>,
    #[serde(default)]
    pub of_contact: Option<ContactId>,
}

/// Directed: `contact_is` is `relationship_type` of `of_contact`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRelationship {
    pub contact_is: ContactId,
    pub relationship_type_id: RelationshipTypeId,
    pub of_contact: ContactId,
}
