use clap::ValueEnum;
use confidant_core::config::LoadOptions;
use confidant_core::errors::StoreError;
use confidant_core::store::CrmStore;
use serde::Serialize;
use serde_json::Value;

use super::{async_runtime, start, to_pretty_json, CommandResult, EXIT_OK, EXIT_RUNTIME};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReferenceKind {
    Genders,
    Currencies,
    Countries,
    ActivityTypes,
    ContactFieldTypes,
    RelationshipTypes,
    Tags,
    Companies,
}

pub fn run(options: LoadOptions, kind: ReferenceKind) -> CommandResult {
    let app = match start("reference", options) {
        Ok(app) => app,
        Err(result) => return result,
    };
    let runtime = match async_runtime("reference") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    match runtime.block_on(fetch(app.store.as_ref(), kind)) {
        Ok(listing) => CommandResult::new(EXIT_OK, to_pretty_json(&listing)),
        Err(error) => CommandResult::failure("reference", "store_request", error.to_string(), EXIT_RUNTIME),
    }
}

pub async fn fetch(store: &dyn CrmStore, kind: ReferenceKind) -> Result<Value, StoreError> {
    match kind {
        ReferenceKind::Genders => to_value(store.list_genders().await?),
        ReferenceKind::Currencies => to_value(store.list_currencies().await?),
        ReferenceKind::Countries => to_value(store.list_countries().await?),
        ReferenceKind::ActivityTypes => to_value(store.list_activity_types().await?),
        ReferenceKind::ContactFieldTypes => to_value(store.list_contact_field_types().await?),
        ReferenceKind::RelationshipTypes => to_value(store.list_relationship_types().await?),
        ReferenceKind::Tags => to_value(store.list_tags().await?),
        ReferenceKind::Companies => to_value(store.list_companies().await?),
    }
}

fn to_value<T: Serialize>(records: Vec<T>) -> Result<Value, StoreError> {
    serde_json::to_value(records).map_err(|error| StoreError::MalformedBody(error.to_string()))
}
