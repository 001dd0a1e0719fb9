use serde_json::{Map, Value};

/// Gets a template's name from the comment on the first line of its source.
///
/// Templates start with a comment like `{* Daily News *}`. The comment
/// markers are removed along with surrounding whitespace.
pub fn name_from_source(source: &str) -> String {
    let first_line = source.lines().next().unwrap_or_default();
    first_line
        .replacen("{*", "", 1)
        .replacen("*}", "", 1)
        .trim()
        .to_string()
}

/// Replaces `{{key}}` placeholders in each line with values from `data`.
///
/// Placeholders without a value in `data` are left as-is. Values are inserted
/// verbatim and never expanded again.
pub fn render(source: &str, data: &Map<String, Value>) -> String {
    source
        .split('\n')
        .map(|line| render_line(line.strip_suffix('\r').unwrap_or(line), data))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_line(line: &str, data: &Map<String, Value>) -> String {
    let mut output = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };

        if let Some(value) = data.get(&after[..end]) {
            output.push_str(&value_to_string(value));
            rest = &after[end + 2..];
        } else {
            // Unknown key, keep the brace and keep scanning after it
            output.push('{');
            rest = &rest[start + 1..];
        }
    }

    output.push_str(rest);
    output
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
