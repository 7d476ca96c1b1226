//! Conversion of JSON request bodies into loose field maps.
//!
//! Clients send numbers and strings interchangeably (`"insuredId": 5` or
//! `"insuredId": "5"`). Scalars are stringified; `null` becomes an empty
//! value, which clears an optional field on update.

use serde_json::Value;
use timetravel_core::fields::FieldMap;

use crate::error::ApiError;

pub fn field_map(body: Value) -> Result<FieldMap, ApiError> {
  let Value::Object(object) = body else {
    return Err(ApiError::BadRequest(
      "request body must be a JSON object".into(),
    ));
  };

  object
    .into_iter()
    .map(|(key, value)| {
      let text = match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => {
          return Err(ApiError::BadRequest(format!(
            "field {key:?} must be a string or number"
          )));
        }
      };
      Ok((key, text))
    })
    .collect()
}
