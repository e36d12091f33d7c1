use serde::Serialize;
use serde_json::Value;

use crate::errors::DispatchError;

pub mod compound;
pub mod engine;
mod execute;
pub mod states;

pub use engine::Dispatcher;
pub use states::{DispatchState, TransitionError};

pub(crate) fn to_data<T: Serialize>(value: &T) -> Result<Value, DispatchError> {
    serde_json::to_value(value)
        .map_err(|error| DispatchError::Defect(format!("could not serialize store payload: {error}")))
}
