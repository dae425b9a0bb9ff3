//! Matchit-based path-info maps.
//!
//! A map is an ordered list of `matchit` patterns such as `/{step}` or
//! `/{step}/{*_rest}`. The first pattern that matches the path-info wins and
//! its parameters are written into the form. Parameters whose name starts
//! with `_` only take part in matching.

use matchit::{Match, Router as InnerRouter};
use serde_json::Value;
use wayfare_core::{Fields, NavError};

/// An ordered set of path-info patterns.
pub struct PathInfoMap {
    routes: Vec<(String, InnerRouter<()>)>,
    first_word: bool,
}

impl std::fmt::Debug for PathInfoMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|(pattern, _)| pattern))
            .finish()
    }
}

impl PathInfoMap {
    /// Build a map from patterns; an invalid pattern is a configuration error.
    pub fn new<I, S>(patterns: I) -> Result<Self, NavError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut routes = Vec::new();
        for pattern in patterns {
            let pattern = pattern.into();
            let mut router = InnerRouter::new();
            router.insert(pattern.clone(), ()).map_err(|e| {
                NavError::Configuration(format!("invalid path_info_map pattern {pattern:?}: {e}"))
            })?;
            routes.push((pattern, router));
        }
        Ok(Self {
            routes,
            first_word: false,
        })
    }

    /// Build a map from a hook value: `null` is empty, otherwise a list of
    /// pattern strings.
    pub fn from_value(value: &Value) -> Result<Self, NavError> {
        match value {
            Value::Null => Self::new(Vec::<String>::new()),
            Value::Array(items) => {
                let patterns = items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            NavError::Configuration(format!(
                                "path_info_map entries must be strings, got {item}"
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Self::new(patterns)
            }
            other => Err(NavError::Configuration(format!(
                "path_info_map must be a list of patterns, got {other}"
            ))),
        }
    }

    /// The default base map: the first run of word characters in the first
    /// path segment names the step, so `/signup.html` selects `signup`.
    pub fn for_step_key(step_key: &str) -> Result<Self, NavError> {
        let mut map = Self::new([format!("/{{{step_key}}}"), format!("/{{{step_key}}}/{{*_rest}}")])?;
        map.first_word = true;
        Ok(map)
    }

    /// Whether the map has no patterns.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Parameters captured by the first matching pattern.
    pub fn captures(&self, path_info: &str) -> Option<Vec<(String, String)>> {
        if path_info.is_empty() {
            return None;
        }
        self.routes.iter().find_map(|(_, router)| {
            let Match { params, .. } = router.at(path_info).ok()?;
            Some(
                params
                    .iter()
                    .filter(|(key, _)| !key.starts_with('_'))
                    .filter_map(|(key, value)| {
                        let value = if self.first_word { first_word(value)? } else { value };
                        Some((key.to_string(), value.to_string()))
                    })
                    .collect(),
            )
        })
    }

    /// Write captures into `form`, keeping fields that are already set.
    ///
    /// Returns whether a pattern matched.
    pub fn apply(&self, path_info: &str, form: &mut Fields) -> bool {
        let Some(captures) = self.captures(path_info) else {
            return false;
        };
        for (key, value) in captures {
            form.entry(key).or_insert(Value::String(value));
        }
        true
    }
}

fn first_word(value: &str) -> Option<&str> {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let start = value.find(is_word)?;
    let rest = &value[start..];
    let end = rest.find(|c: char| !is_word(c)).unwrap_or(rest.len());
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wayfare_core::fields_from;

    #[test]
    fn test_base_map_selects_step() {
        let map = PathInfoMap::for_step_key("step").unwrap();

        let mut form = Fields::new();
        assert!(map.apply("/signup", &mut form));
        assert_eq!(form["step"], json!("signup"));

        let mut form = Fields::new();
        assert!(map.apply("/signup/extra/bits", &mut form));
        assert_eq!(form["step"], json!("signup"));
        assert!(!form.contains_key("_rest"));
    }

    #[test]
    fn test_base_map_drops_extension() {
        let map = PathInfoMap::for_step_key("step").unwrap();

        let mut form = Fields::new();
        assert!(map.apply("/signup.html", &mut form));
        assert_eq!(form["step"], json!("signup"));

        let mut form = Fields::new();
        assert!(map.apply("/-", &mut form));
        assert!(!form.contains_key("step"));
    }

    #[test]
    fn test_existing_fields_win() {
        let map = PathInfoMap::new(["/{id}"]).unwrap();
        let mut form = fields_from(json!({"id": "7"}));
        assert!(map.apply("/42", &mut form));
        assert_eq!(form["id"], json!("7"));
    }

    #[test]
    fn test_first_match_wins() {
        let map = PathInfoMap::new(["/user/{id}", "/{name}/{id}"]).unwrap();
        let captures = map.captures("/user/9").unwrap();
        assert_eq!(captures, vec![("id".to_string(), "9".to_string())]);
        assert!(map.captures("").is_none());
        assert!(map.captures("/a/b/c").is_none());
    }

    #[test]
    fn test_malformed_maps_are_configuration_errors() {
        assert!(matches!(
            PathInfoMap::new(["/{unclosed"]),
            Err(NavError::Configuration(_))
        ));
        assert!(matches!(
            PathInfoMap::from_value(&json!("/{step}")),
            Err(NavError::Configuration(_))
        ));
        assert!(matches!(
            PathInfoMap::from_value(&json!([1])),
            Err(NavError::Configuration(_))
        ));
        assert!(PathInfoMap::from_value(&Value::Null).unwrap().is_empty());
    }
}
