//! Turns natural-language names into single store records.
//!
//! Contacts are lookup-only and may be ambiguous; companies are
//! find-or-create; tags are lookup-only and may be absent; the small
//! reference lists (genders, media, activity and relationship types) are
//! matched case-insensitively against the store's full list.

use std::sync::Arc;

use tracing::debug;

use crate::config::MatchPolicy;
use crate::domain::{ActivityType, Company, Contact, ContactFieldType, Gender, RelationshipType, Tag};
use crate::errors::ResolveError;
use crate::store::CrmStore;

#[derive(Clone)]
pub struct EntityResolver {
    store: Arc<dyn CrmStore>,
    policy: MatchPolicy,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn CrmStore>, policy: MatchPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub async fn resolve_contact(&self, query: &str) -> Result<Contact, ResolveError> {
        let query = query.trim();
        let mut candidates = self.store.search_contacts(query).await?;

        match candidates.len() {
            0 => Err(ResolveError::NotFound(format!("No contact found matching '{query}'"))),
            1 => Ok(candidates.remove(0)),
            count => {
                let survivors: Vec<usize> = candidates
                    .iter()
                    .enumerate()
                    .filter(|(_, candidate)| self.narrows_to(candidate, query))
                    .map(|(index, _)| index)
                    .collect();

                if let [index] = survivors.as_slice() {
                    debug!(
                        event_name = "resolver.contact.narrowed",
                        query,
                        candidates = count,
                        policy = ?self.policy,
                        "ambiguous contact search narrowed to a single match"
                    );
                    return Ok(candidates.swap_remove(*index));
                }

                debug!(
                    event_name = "resolver.contact.ambiguous",
                    query,
                    candidates = count,
                    survivors = survivors.len(),
                    "contact search is ambiguous"
                );
                Err(ResolveError::MultipleMatches {
                    query: query.to_string(),
                    candidates: candidates.iter().map(Contact::full_name).collect(),
                })
            }
        }
    }

    /// Resolves each name in order; the first failure wins.
    pub async fn resolve_contacts(&self, queries: &[String]) -> Result<Vec<Contact>, ResolveError> {
        let mut contacts = Vec::with_capacity(queries.len());
        for query in queries {
            contacts.push(self.resolve_contact(query).await?);
        }
        Ok(contacts)
    }

    /// Not safe against concurrent creation of the same name; two racing
    /// callers can both create a company.
    pub async fn resolve_or_create_company(&self, name: &str) -> Result<Company, ResolveError> {
        let name = name.trim();
        let companies = self.store.list_companies().await?;
        if let Some(existing) =
            companies.into_iter().find(|company| company.name.trim().eq_ignore_ascii_case(name))
        {
            return Ok(existing);
        }

        let created = self.store.create_company(name).await?;
        debug!(
            event_name = "resolver.company.created",
            company_id = %created.id,
            company = %created.name,
            "created company during find-or-create"
        );
        Ok(created)
    }

    pub async fn resolve_relationship_type(
        &self,
        name: &str,
    ) -> Result<RelationshipType, ResolveError> {
        let name = name.trim();
        let types = self.store.list_relationship_types().await?;
        if let Some(found) = types.iter().find(|kind| kind.matches(name)) {
            return Ok(found.clone());
        }

        let valid: Vec<&str> = types.iter().map(|kind| kind.name.as_str()).collect();
        Err(ResolveError::NotFound(format!(
            "Relationship type '{name}' not found. Valid types: {}",
            valid.join(", ")
        )))
    }

    /// Lookup only. Never creates.
    pub async fn resolve_tag(&self, name: &str) -> Result<Option<Tag>, ResolveError> {
        let name = name.trim();
        let tags = self.store.list_tags().await?;
        Ok(tags.into_iter().find(|tag| tag.name.trim().eq_ignore_ascii_case(name)))
    }

    pub async fn resolve_gender(&self, name: &str) -> Result<Gender, ResolveError> {
        let genders = self.store.list_genders().await?;
        find_named(genders, name, |gender| &gender.name, "Gender")
    }

    pub async fn resolve_contact_field_type(
        &self,
        name: &str,
    ) -> Result<ContactFieldType, ResolveError> {
        let types = self.store.list_contact_field_types().await?;
        find_named(types, name, |kind| &kind.name, "Medium")
    }

    pub async fn resolve_activity_type(&self, name: &str) -> Result<ActivityType, ResolveError> {
        let types = self.store.list_activity_types().await?;
        find_named(types, name, |kind| &kind.name, "Activity type")
    }

    fn narrows_to(&self, candidate: &Contact, query: &str) -> bool {
        let full_name = candidate.full_name().to_lowercase();
        let query = query.to_lowercase();
        match self.policy {
            MatchPolicy::Substring => full_name.contains(&query),
            MatchPolicy::Exact => full_name == query,
        }
    }
}

fn find_named<T>(
    items: Vec<T>,
    name: &str,
    name_of: impl Fn(&T) -> &String,
    label: &str,
) -> Result<T, ResolveError> {
    let name = name.trim();
    let valid: Vec<String> = items.iter().map(|item| name_of(item).clone()).collect();
    items
        .into_iter()
        .find(|item| name_of(item).trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            ResolveError::NotFound(format!(
                "{label} '{name}' not found. Valid options: {}",
                valid.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::MatchPolicy;
    use crate::errors::{ResolveError, StoreError};
    use crate::resolver::EntityResolver;
    use crate::store::InMemoryCrmStore;

    fn resolver(store: &Arc<InMemoryCrmStore>, policy: MatchPolicy) -> EntityResolver {
        EntityResolver::new(store.clone(), policy)
    }

    #[tokio::test]
    async fn single_candidate_is_returned() {
        let store = Arc::new(InMemoryCrmStore::new());
        let jane = store.insert_contact("Jane", Some("Doe")).await;

        let found = resolver(&store, MatchPolicy::Substring).resolve_contact("jane").await;

        assert_eq!(found.map(|contact| contact.id), Ok(jane.id));
    }

    #[tokio::test]
    async fn zero_candidates_is_not_found_with_query_in_message() {
        let store = Arc::new(InMemoryCrmStore::new());

        let error = resolver(&store, MatchPolicy::Substring)
            .resolve_contact("Zed")
            .await
            .expect_err("nobody matches");

        assert_eq!(error, ResolveError::NotFound("No contact found matching 'Zed'".to_string()));
    }

    #[tokio::test]
    async fn substring_policy_narrows_an_ambiguous_pool() {
        let store = Arc::new(InMemoryCrmStore::new());
        let johnson = store.insert_contact("Alex", Some("Johnson")).await;
        store.insert_contact("Alexandra", Some("Smith")).await;

        let found = resolver(&store, MatchPolicy::Substring).resolve_contact("alex johnson").await;

        assert_eq!(found.map(|contact| contact.id), Ok(johnson.id));
    }

    #[tokio::test]
    async fn ties_are_reported_with_every_candidate() {
        let store = Arc::new(InMemoryCrmStore::new());
        store.insert_contact("Alex", Some("Johnson")).await;
        store.insert_contact("Alex", Some("Smith")).await;

        let error = resolver(&store, MatchPolicy::Substring)
            .resolve_contact("Alex")
            .await
            .expect_err("ambiguous");

        assert_eq!(
            error,
            ResolveError::MultipleMatches {
                query: "Alex".to_string(),
                candidates: vec!["Alex Johnson".to_string(), "Alex Smith".to_string()],
            }
        );
    }

    #[tokio::test]
    async fn exact_policy_refuses_partial_names() {
        let store = Arc::new(InMemoryCrmStore::new());
        store.insert_contact("Sam", Some("Lee")).await;
        store.insert_contact("Sam", Some("Leeds")).await;

        let exact = resolver(&store, MatchPolicy::Exact);
        assert!(matches!(
            exact.resolve_contact("sam lee").await,
            Ok(contact) if contact.full_name() == "Sam Lee"
        ));
        assert!(matches!(
            exact.resolve_contact("Sam").await,
            Err(ResolveError::MultipleMatches { .. })
        ));

        // "sam lee" is a substring of both full names under the default policy.
        let substring = resolver(&store, MatchPolicy::Substring);
        assert!(matches!(
            substring.resolve_contact("sam lee").await,
            Err(ResolveError::MultipleMatches { .. })
        ));
    }

    #[tokio::test]
    async fn company_is_found_case_insensitively_or_created() {
        let store = Arc::new(InMemoryCrmStore::new());
        let acme = store.insert_company("Acme Corp").await;
        let resolver = resolver(&store, MatchPolicy::Substring);

        let found = resolver.resolve_or_create_company("acme corp").await.expect("found");
        assert_eq!(found.id, acme.id);
        assert_eq!(store.call_count("create_company"), 0);

        let created = resolver.resolve_or_create_company("Globex").await.expect("created");
        assert_eq!(created.name, "Globex");
        assert_eq!(store.call_count("create_company"), 1);
    }

    #[tokio::test]
    async fn relationship_type_matches_reverse_name_and_lists_valid_types() {
        let store = Arc::new(InMemoryCrmStore::new());
        let resolver = resolver(&store, MatchPolicy::Substring);

        let child = resolver.resolve_relationship_type("Child").await.expect("reverse name");
        assert_eq!(child.name, "parent");

        let error = resolver.resolve_relationship_type("nemesis").await.expect_err("unknown type");
        let message = error.to_string();
        assert!(message.contains("'nemesis'"));
        assert!(message.contains("partner"));
        assert!(message.contains("sibling"));
    }

    #[tokio::test]
    async fn tag_lookup_never_creates() {
        let store = Arc::new(InMemoryCrmStore::new());
        store.insert_tag("family").await;
        let resolver = resolver(&store, MatchPolicy::Substring);

        assert!(resolver.resolve_tag("Family").await.expect("lookup").is_some());
        assert!(resolver.resolve_tag("work").await.expect("lookup").is_none());
        assert!(store.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_store_error() {
        let store = Arc::new(InMemoryCrmStore::new());
        store.fail_on("search_contacts", StoreError::Timeout("10s elapsed".to_string()));

        let error = resolver(&store, MatchPolicy::Substring)
            .resolve_contact("anyone")
            .await
            .expect_err("transport failure");

        assert!(matches!(error, ResolveError::Store(StoreError::Timeout(_))));
    }
}
