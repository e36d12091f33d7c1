//! CRM store over the Monica-style REST API.
//!
//! Every trait method is one request. Responses are unwrapped from their
//! `data` field when present, a 204 carries no payload, and any non-2xx
//! status surfaces the body's own error message.

use std::time::Duration;

use async_trait::async_trait;
use confidant_core::config::CrmConfig;
use confidant_core::domain::{
    Activity, ActivityType, Call, Company, Contact, ContactFieldType, ContactId, Conversation,
    ConversationId, Country, Currency, Debt, Gender, Gift, NewActivity, NewCall, NewContact,
    NewConversation, NewDebt, NewGift, NewMessage, NewNote, NewOccupation, NewRelationship,
    NewReminder, NewTask, Note, Occupation, Relationship, RelationshipType, Reminder, Tag, TagId,
    Task, TaskId, TaskUpdate,
};
use confidant_core::errors::StoreError;
use confidant_core::store::CrmStore;
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Page size for account-wide lists (tags, companies).
const LIST_LIMIT: u32 = 100;

pub struct HttpCrmStore {
    client: Client,
    base_url: String,
    api_token: SecretString,
    search_limit: u32,
}

impl std::fmt::Debug for HttpCrmStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCrmStore")
            .field("base_url", &self.base_url)
            .field("search_limit", &self.search_limit)
            .finish_non_exhaustive()
    }
}

impl HttpCrmStore {
    pub fn new(config: &CrmConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| StoreError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            search_limit: config.search_limit.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<Option<Value>, StoreError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(event_name = "store.http.request", method = %method, path, "sending CRM request");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(self.api_token.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = error_message(status, &bytes);
            warn!(
                event_name = "store.http.status",
                method = %method,
                path,
                status = status.as_u16(),
                message = %message,
                "CRM request was rejected"
            );
            return Err(StoreError::Status { status: status.as_u16(), message });
        }
        if status == StatusCode::NO_CONTENT || bytes.is_empty() {
            return Ok(None);
        }

        let payload: Value = serde_json::from_slice(&bytes)
            .map_err(|error| StoreError::MalformedBody(format!("{path}: {error}")))?;
        Ok(Some(unwrap_data(payload)))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, StoreError> {
        let payload = self
            .send(method, path, query, body)
            .await?
            .ok_or_else(|| StoreError::MalformedBody(format!("{path}: empty response body")))?;
        serde_json::from_value(payload)
            .map_err(|error| StoreError::MalformedBody(format!("{path}: {error}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        self.fetch(Method::GET, path, &[], None).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, StoreError> {
        self.fetch(Method::POST, path, &[], Some(to_body(body)?)).await
    }
}

fn to_body<B: Serialize>(body: &B) -> Result<Value, StoreError> {
    serde_json::to_value(body).map_err(|error| StoreError::MalformedBody(error.to_string()))
}

fn transport_error(error: reqwest::Error) -> StoreError {
    if error.is_timeout() {
        StoreError::Timeout(error.to_string())
    } else {
        StoreError::Transport(error.to_string())
    }
}

fn unwrap_data(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Monica wraps errors as `{"error": {"message": ...}}`; other servers use a
/// top-level `message`. Falls back to the raw body, then the status reason.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    let parsed = serde_json::from_slice::<Value>(body).ok();
    let structured = parsed.as_ref().and_then(|value| {
        value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .or_else(|| value.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    if let Some(message) = structured {
        return message;
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if !text.is_empty() {
        return text;
    }
    status.canonical_reason().unwrap_or("request failed").to_string()
}

#[async_trait]
impl CrmStore for HttpCrmStore {
    async fn search_contacts(&self, query: &str) -> Result<Vec<Contact>, StoreError> {
        let params = [("query", query.to_string()), ("limit", self.search_limit.to_string())];
        self.fetch(Method::GET, "contacts", &params, None).await
    }

    async fn get_contact(&self, id: ContactId) -> Result<Contact, StoreError> {
        self.get(&format!("contacts/{id}")).await
    }

    async fn create_contact(&self, contact: NewContact) -> Result<Contact, StoreError> {
        self.post("contacts", &contact).await
    }

    async fn delete_contact(&self, id: ContactId) -> Result<(), StoreError> {
        self.send(Method::DELETE, &format!("contacts/{id}"), &[], None).await?;
        Ok(())
    }

    async fn list_notes(&self, contact: ContactId) -> Result<Vec<Note>, StoreError> {
        self.get(&format!("contacts/{contact}/notes")).await
    }

    async fn create_note(&self, note: NewNote) -> Result<Note, StoreError> {
        self.post("notes", &note).await
    }

    async fn create_call(&self, call: NewCall) -> Result<Call, StoreError> {
        self.post("calls", &call).await
    }

    async fn create_activity(&self, activity: NewActivity) -> Result<Activity, StoreError> {
        self.post("activities", &activity).await
    }

    async fn create_conversation(
        &self,
        conversation: NewConversation,
    ) -> Result<Conversation, StoreError> {
        self.post("conversations", &conversation).await
    }

    async fn get_conversation(&self, id: ConversationId) -> Result<Conversation, StoreError> {
        self.get(&format!("conversations/{id}")).await
    }

    async fn add_message(
        &self,
        conversation: ConversationId,
        message: NewMessage,
    ) -> Result<Conversation, StoreError> {
        self.post(&format!("conversations/{conversation}/messages"), &message).await
    }

    async fn create_relationship(
        &self,
        relationship: NewRelationship,
    ) -> Result<Relationship, StoreError> {
        self.post("relationships", &relationship).await
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        self.post("tasks", &task).await
    }

    async fn get_task(&self, id: TaskId) -> Result<Task, StoreError> {
        self.get(&format!("tasks/{id}")).await
    }

    async fn update_task(&self, id: TaskId, update: TaskUpdate) -> Result<Task, StoreError> {
        self.fetch(Method::PUT, &format!("tasks/{id}"), &[], Some(to_body(&update)?)).await
    }

    async fn create_reminder(&self, reminder: NewReminder) -> Result<Reminder, StoreError> {
        self.post("reminders", &reminder).await
    }

    async fn create_debt(&self, debt: NewDebt) -> Result<Debt, StoreError> {
        self.post("debts", &debt).await
    }

    async fn create_gift(&self, gift: NewGift) -> Result<Gift, StoreError> {
        self.post("gifts", &gift).await
    }

    async fn create_occupation(
        &self,
        occupation: NewOccupation,
    ) -> Result<Occupation, StoreError> {
        self.post("occupations", &occupation).await
    }

    async fn list_companies(&self) -> Result<Vec<Company>, StoreError> {
        self.fetch(Method::GET, "companies", &[("limit", LIST_LIMIT.to_string())], None).await
    }

    async fn create_company(&self, name: &str) -> Result<Company, StoreError> {
        self.post("companies", &json!({ "name": name })).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        self.fetch(Method::GET, "tags", &[("limit", LIST_LIMIT.to_string())], None).await
    }

    async fn set_tags(&self, contact: ContactId, names: &[String]) -> Result<Contact, StoreError> {
        self.post(&format!("contacts/{contact}/setTags"), &json!({ "tags": names })).await
    }

    async fn unset_tags(&self, contact: ContactId, tags: &[TagId]) -> Result<Contact, StoreError> {
        self.post(&format!("contacts/{contact}/unsetTag"), &json!({ "tags": tags })).await
    }

    async fn list_genders(&self) -> Result<Vec<Gender>, StoreError> {
        self.get("genders").await
    }

    async fn list_currencies(&self) -> Result<Vec<Currency>, StoreError> {
        self.get("currencies").await
    }

    async fn list_countries(&self) -> Result<Vec<Country>, StoreError> {
        let payload: Value = self.get("countries").await?;
        countries_from(payload)
    }

    async fn list_activity_types(&self) -> Result<Vec<ActivityType>, StoreError> {
        self.get("activitytypes").await
    }

    async fn list_contact_field_types(&self) -> Result<Vec<ContactFieldType>, StoreError> {
        self.get("contactfieldtypes").await
    }

    async fn list_relationship_types(&self) -> Result<Vec<RelationshipType>, StoreError> {
        self.get("relationshiptypes").await
    }
}

/// Countries come back either as a list or as an object keyed by ISO code.
fn countries_from(payload: Value) -> Result<Vec<Country>, StoreError> {
    let entries: Vec<Value> = match payload {
        Value::Object(map) => map.into_iter().map(|(_, country)| country).collect(),
        Value::Array(list) => list,
        other => {
            return Err(StoreError::MalformedBody(format!("countries: unexpected payload {other}")))
        }
    };
    entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value(entry)
                .map_err(|error| StoreError::MalformedBody(format!("countries: {error}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{countries_from, error_message, unwrap_data};

    #[test]
    fn data_field_is_unwrapped_when_present() {
        assert_eq!(unwrap_data(json!({ "data": [1, 2] })), json!([1, 2]));
        assert_eq!(unwrap_data(json!({ "id": 4 })), json!({ "id": 4 }));
    }

    #[test]
    fn error_message_prefers_the_structured_body() {
        let monica = br#"{"error":{"message":"The contact id field is required.","error_code":32}}"#;
        assert_eq!(
            error_message(StatusCode::UNPROCESSABLE_ENTITY, monica),
            "The contact id field is required."
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, b"upstream down"), "upstream down");
        assert_eq!(error_message(StatusCode::NOT_FOUND, b""), "Not Found");
    }

    #[test]
    fn countries_accept_keyed_objects() {
        let countries = countries_from(json!({
            "FR": { "id": "FR", "name": "France" },
            "DE": { "id": "DE", "name": "Germany" }
        }))
        .expect("countries");

        assert_eq!(countries.len(), 2);
        assert!(countries.iter().any(|country| country.name == "France"));
    }
}
