//! Environment lookup shared by the config loaders

/// Key → value source; `std::env::var` in production, a map in tests
pub trait Lookup: Fn(&str) -> Option<String> {}

impl<F: Fn(&str) -> Option<String>> Lookup for F {}

/// Process environment
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// First of `names` that is set to a non-blank value
pub fn first_set(lookup: &impl Lookup, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| lookup(*name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
pub(crate) fn map_lookup(pairs: &[(&str, &str)]) -> impl Lookup {
    let map: std::collections::HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_set_prefers_earlier_names() {
        let env = map_lookup(&[("A", "one"), ("B", "two")]);
        assert_eq!(first_set(&env, &["A", "B"]), Some("one".to_string()));
        assert_eq!(first_set(&env, &["C", "B"]), Some("two".to_string()));
        assert_eq!(first_set(&env, &["C"]), None);
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let env = map_lookup(&[("A", "  "), ("B", "two")]);
        assert_eq!(first_set(&env, &["A", "B"]), Some("two".to_string()));
    }
}
