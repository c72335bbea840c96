//! Compact value rendering for error messages: `'text'`, `[1, 2]`, `{a: true}`.

use serde_json::Value;

pub fn format_value(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => {
            out.push('\'');
            out.push_str(s);
            out.push('\'');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(key);
                out.push_str(": ");
                write_value(item, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formats_like_source_literals() {
        assert_eq!(format_value(&json!({})), "{}");
        assert_eq!(format_value(&json!("3")), "'3'");
        assert_eq!(format_value(&json!([1, "a", null])), "[1, 'a', null]");
        assert_eq!(format_value(&json!({"a": true, "b": {"c": 1.5}})), "{a: true, b: {c: 1.5}}");
    }
}
