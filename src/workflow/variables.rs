//! Variable Store
//!
//! Layered key-value merging and `${VAR}` substitution.
//!
//! Variables come from four layers, lowest to highest precedence:
//! global configuration, each included workflow's `variables` block
//! (in include resolution order), the root workflow's `variables`
//! block, and runtime overrides. Later layers overwrite earlier ones
//! key by key.
//!
//! Substitution is non-recursive: a substituted value is never
//! re-scanned for further placeholders.

use std::collections::BTreeMap;

/// Ordered variable mapping. `BTreeMap` keeps previews and merge
/// results deterministic.
pub type VariableMap = BTreeMap<String, String>;

/// Merges variable layers in precedence order (lowest first).
///
/// Merge is last-writer-wins per key, not per-layer replacement:
/// a layer only overrides the keys it actually defines.
pub fn merge_layers<'a, I>(layers: I) -> VariableMap
where
    I: IntoIterator<Item = &'a VariableMap>,
{
    let mut merged = VariableMap::new();
    for layer in layers {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Substitutes `${NAME}` placeholders in `text` from `vars`.
///
/// Returns the substituted string, or `Err` with the first
/// placeholder name that has no value in the mapping. A `$` not
/// followed by `{`, a `${` without a closing brace, or an empty
/// `${}` is kept as literal text.
pub fn substitute(text: &str, vars: &VariableMap) -> Result<String, String> {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                if name.is_empty() {
                    // Malformed, keep it literal like an unterminated one
                    result.push_str("${}");
                } else {
                    match vars.get(name) {
                        Some(value) => result.push_str(value),
                        None => return Err(name.to_string()),
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated placeholder, treat the rest as literal
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    Ok(result)
}

/// Substitutes placeholders in each element of a string list.
pub fn substitute_all(items: &[String], vars: &VariableMap) -> Result<Vec<String>, String> {
    items.iter().map(|item| substitute(item, vars)).collect()
}
