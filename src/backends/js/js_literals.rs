use serde_json::Value;

/// Words a generated identifier must never take.
pub const JS_RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "export", "extends", "finally", "for", "function", "if", "import", "in",
    "instanceof", "new", "return", "super", "switch", "this", "throw", "try", "typeof", "var",
    "void", "while", "with", "yield", "enum", "implements", "interface", "let", "package",
    "private", "protected", "public", "static", "await", "undefined", "null", "true", "false",
    "NaN", "Infinity", "eval", "arguments",
    // Names the generated program itself uses
    "data", "record", "targets", "edgeCounts",
];

pub fn escape_js_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');

    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            // Line terminators inside JS source, even though JSON allows them
            '\u{2028}' | '\u{2029}' => escaped.push_str(&format!("\\u{:04X}", ch as u32)),
            control if control.is_control() => {
                escaped.push_str(&format!("\\u{:04X}", control as u32));
            }
            normal => escaped.push(normal),
        }
    }

    escaped.push('"');
    escaped
}

/// Any JSON value as a JS expression.
pub fn js_literal(value: &Value) -> String {
    match value {
        Value::Null => String::from("null"),
        Value::Bool(value) => value.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => escape_js_string(text),
        Value::Array(items) => {
            let items = items.iter().map(js_literal).collect::<Vec<_>>();
            format!("[{}]", items.join(", "))
        }
        Value::Object(fields) => {
            let fields = fields
                .iter()
                .map(|(name, value)| format!("{}: {}", escape_js_string(name), js_literal(value)))
                .collect::<Vec<_>>();
            format!("{{{}}}", fields.join(", "))
        }
    }
}

/// The infix operator for a comparison block's OP field.
pub fn comparison_operator(name: &str) -> Option<&'static str> {
    match name {
        "EQUAL" => Some("==="),
        "NOT_EQUAL" => Some("!=="),
        "LESS" => Some("<"),
        "LESS_OR_EQUAL" => Some("<="),
        "GREATER" => Some(">"),
        "GREATER_OR_EQUAL" => Some(">="),
        _ => None,
    }
}

pub fn logic_operator(name: &str) -> Option<&'static str> {
    match name {
        "AND" => Some("&&"),
        "OR" => Some("||"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escapes_quotes_and_control_characters() {
        assert_eq!(escape_js_string("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(escape_js_string("a\nb\\"), "\"a\\nb\\\\\"");
        assert_eq!(escape_js_string("\u{0}1"), "\"\\u00001\"");
        assert_eq!(escape_js_string("\u{2028}"), "\"\\u2028\"");
    }

    #[test]
    fn renders_nested_json() {
        assert_eq!(
            js_literal(&json!({"b": [1, "x"], "a": null})),
            "{\"a\": null, \"b\": [1, \"x\"]}"
        );
        assert_eq!(js_literal(&json!(2.5)), "2.5");
        assert_eq!(js_literal(&json!(true)), "true");
    }
}
