//! Ruby literal rendering for Podfile and podspec text.

use serde_json::Value;

/// Single-quoted Ruby string.
pub fn quote(value: &str) -> String {
  format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Double-quoted Ruby string, as produced by `String#dump`.
pub fn dump(value: &str) -> String {
  let mut out = String::with_capacity(value.len() + 2);
  out.push('"');
  for c in value.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\t' => out.push_str("\\t"),
      '#' => out.push_str("\\#"),
      c => out.push(c),
    }
  }
  out.push('"');
  out
}

/// Render a JSON value as a Ruby literal.
pub fn literal(value: &Value) -> String {
  match value {
    Value::Null => "nil".to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    Value::String(s) => dump(s),
    Value::Array(items) => {
      let items: Vec<String> = items.iter().map(literal).collect();
      format!("[{}]", items.join(", "))
    }
    Value::Object(map) => {
      let pairs: Vec<String> = map
        .iter()
        .map(|(k, v)| format!("{} => {}", dump(k), literal(v)))
        .collect();
      format!("{{ {} }}", pairs.join(", "))
    }
  }
}
