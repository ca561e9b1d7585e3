//! Template loading and management

use carno_codegen_common::{GeneratorError, Result};
use std::collections::HashMap;
use tera::{Tera, Value};

/// Load all templates
pub fn load_templates() -> Result<Tera> {
    let mut tera = Tera::default();
    // Go source, not HTML
    tera.autoescape_on(vec![]);

    tera.register_filter("go_quote", go_quote_filter);

    tera.add_raw_template(
        "service_file.go",
        include_str!("../templates/service_file.go.tera"),
    )
    .map_err(|e| {
        GeneratorError::Generation(format!("Failed to load service_file.go template: {}", e))
    })?;

    tera.add_raw_template(
        "aggregate_file.go",
        include_str!("../templates/aggregate_file.go.tera"),
    )
    .map_err(|e| {
        GeneratorError::Generation(format!("Failed to load aggregate_file.go template: {}", e))
    })?;

    Ok(tera)
}

/// Filter rendering a string as an interpreted Go string literal
fn go_quote_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("go_quote filter expects a string"))?;

    Ok(Value::String(go_quote(s)))
}

pub(crate) fn go_quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                quoted.push_str(&format!("\\x{:02x}", c as u32))
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
