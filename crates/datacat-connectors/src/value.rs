use std::borrow::Cow;

use datacat_types::Value;

/// Text form of a scalar: strings as-is, everything else as JSON.
pub(crate) fn value_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}
