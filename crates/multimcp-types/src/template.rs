//! Level-1 URI template helpers (RFC 6570 simple string expansion).
//!
//! Only `{name}` expressions are recognised, where `name` consists of ASCII
//! alphanumerics, `_` and `.`. Expressions with an operator (`{+path}`,
//! `{?query}`) are left untouched by both functions.

use std::collections::HashMap;

/// Yields `(start, end, name)` for every simple expression in `template`,
/// with `start..end` spanning the braces.
fn expressions(template: &str) -> impl Iterator<Item = (usize, usize, &str)> {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        while let Some(offset) = template[cursor..].find('{') {
            let start = cursor + offset;
            let Some(len) = template[start + 1..].find('}') else {
                cursor = template.len();
                return None;
            };
            let end = start + 1 + len + 1;
            let name = &template[start + 1..end - 1];
            cursor = start + 1;
            if is_variable_name(name) {
                cursor = end;
                return Some((start, end, name));
            }
        }
        None
    })
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
}

/// Placeholder names in `uri_template`, in order of first appearance.
///
/// ```
/// use multimcp_types::template_variables;
///
/// let names = template_variables("resource_server:inventory://item/{item_id}/{field}");
/// assert_eq!(names, vec!["item_id", "field"]);
/// ```
#[must_use]
pub fn template_variables(uri_template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (_, _, name) in expressions(uri_template) {
        if !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Substitute known placeholders, leaving unknown ones in place.
///
/// Values are inserted verbatim; callers percent-encode if the backend
/// expects it.
///
/// ```
/// use std::collections::HashMap;
/// use multimcp_types::expand_template;
///
/// let values = HashMap::from([("item_id".to_string(), "42".to_string())]);
/// assert_eq!(
///     expand_template("inventory://item/{item_id}/{field}", &values),
///     "inventory://item/42/{field}",
/// );
/// ```
#[must_use]
pub fn expand_template(uri_template: &str, values: &HashMap<String, String>) -> String {
    let mut expanded = String::with_capacity(uri_template.len());
    let mut last = 0;
    for (start, end, name) in expressions(uri_template) {
        if let Some(value) = values.get(name) {
            expanded.push_str(&uri_template[last..start]);
            expanded.push_str(value);
            last = end;
        }
    }
    expanded.push_str(&uri_template[last..]);
    expanded
}

/// Match a concrete URI against a template, returning the bound values.
///
/// Each placeholder binds a non-empty run of characters up to the next
/// literal part of the template and never spans a `/`. Returns `None` when
/// the URI does not fit.
///
/// ```
/// use multimcp_types::template::match_template;
///
/// let bound = match_template("inventory://item/{item_id}", "inventory://item/42").unwrap();
/// assert_eq!(bound["item_id"], "42");
/// assert!(match_template("inventory://item/{item_id}", "inventory://other/42").is_none());
/// ```
#[must_use]
pub fn match_template(uri_template: &str, uri: &str) -> Option<HashMap<String, String>> {
    let mut parts: Vec<(&str, &str)> = Vec::new();
    let mut last = 0;
    for (start, end, name) in expressions(uri_template) {
        parts.push((&uri_template[last..start], name));
        last = end;
    }
    let tail = &uri_template[last..];

    let mut bound: HashMap<String, String> = HashMap::new();
    let mut rest = uri;
    for (index, (literal, name)) in parts.iter().enumerate() {
        rest = rest.strip_prefix(literal)?;
        let next_literal = parts
            .get(index + 1)
            .map_or(tail, |(literal, _)| *literal);
        let value_len = if next_literal.is_empty() {
            if index + 1 < parts.len() {
                // Two adjacent placeholders cannot be split unambiguously.
                return None;
            }
            rest.len()
        } else {
            rest.find(next_literal)?
        };
        let value = &rest[..value_len];
        if value.is_empty() || value.contains('/') {
            return None;
        }
        match bound.get(*name) {
            Some(existing) if existing != value => return None,
            _ => {
                bound.insert((*name).to_string(), value.to_string());
            }
        }
        rest = &rest[value_len..];
    }

    (rest == tail).then_some(bound)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_variables_deduplicated_in_order() {
        assert_eq!(
            template_variables("db://{table}/{id}/{table}"),
            vec!["table", "id"]
        );
    }

    #[test]
    fn test_variables_none() {
        assert!(template_variables("inventory://overview").is_empty());
        assert!(template_variables("").is_empty());
    }

    #[test]
    fn test_operator_expressions_ignored() {
        assert_eq!(template_variables("search://{?q}/{term}"), vec!["term"]);
        let values = values(&[("q", "x"), ("term", "y")]);
        let expanded = expand_template("search://{?q}/{term}", &values);
        assert_eq!(expanded, "search://{?q}/y");
    }

    #[test]
    fn test_unbalanced_braces() {
        assert_eq!(template_variables("x://{a/{b}"), vec!["b"]);
        assert!(template_variables("x://{open").is_empty());
        assert_eq!(expand_template("x://{open", &values(&[("open", "1")])), "x://{open");
    }

    #[test]
    fn test_match_template() {
        let bound = match_template("db://{table}/rows/{id}", "db://items/rows/7").unwrap();
        assert_eq!(bound, values(&[("table", "items"), ("id", "7")]));
    }

    #[test]
    fn test_match_template_rejects() {
        assert!(match_template("db://{table}/rows/{id}", "db://items/cols/7").is_none());
        assert!(match_template("db://{table}", "db://a/b").is_none());
        assert!(match_template("db://{table}", "db://").is_none());
        assert!(match_template("db://{a}{b}", "db://xy").is_none());
        assert!(match_template("db://{a}/{a}", "db://x/y").is_none());
        assert!(match_template("db://static", "db://static/extra").is_none());
    }

    #[test]
    fn test_match_template_without_variables() {
        assert_eq!(match_template("db://static", "db://static"), Some(HashMap::new()));
    }

    #[test]
    fn test_expand_repeated_and_namespaced() {
        let expanded = expand_template(
            "resource_server:inventory://item/{id}?copy={id}",
            &values(&[("id", "7")]),
        );
        assert_eq!(expanded, "resource_server:inventory://item/7?copy=7");
    }
}
