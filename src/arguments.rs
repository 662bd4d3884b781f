use std::collections::{HashMap, HashSet};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("{class}: missing required argument `{key}`")]
    Missing { class: String, key: String },
    #[error("{class}: can't parse `{key}={value}`")]
    BadValue { class: String, key: String, value: String },
    #[error("{class}: unused argument(s): {keys}")]
    Unused { class: String, keys: String },
}

/// The key=value argument map of one directive. Every read marks its key as
/// used; leftovers at the end of the directive are an error, so typos never
/// pass silently.
pub struct Arguments {
    class: String,
    map: HashMap<String, String>,
    used: HashSet<String>,
}

impl Arguments {
    pub fn new(class: &str, map: HashMap<String, String>) -> Arguments {
        Arguments { class: class.to_string(), map, used: HashSet::new() }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    fn take(&mut self, key: &str) -> Option<&String> {
        self.used.insert(key.to_string());
        self.map.get(key)
    }

    pub fn str(&mut self, key: &str) -> Result<String, ArgumentError> {
        match self.take(key) {
            Some(v) => Ok(v.clone()),
            None => Err(ArgumentError::Missing { class: self.class.clone(), key: key.to_string() }),
        }
    }

    pub fn str_or(&mut self, key: &str, default: &str) -> String {
        self.take(key).cloned().unwrap_or_else(|| default.to_string())
    }

    pub fn parse<T: std::str::FromStr>(&mut self, key: &str) -> Result<T, ArgumentError> {
        let class = self.class.clone();
        match self.take(key) {
            Some(v) => v.parse::<T>().map_err(|_| ArgumentError::BadValue {
                class,
                key: key.to_string(),
                value: v.clone(),
            }),
            None => Err(ArgumentError::Missing { class, key: key.to_string() }),
        }
    }

    pub fn parse_or<T: std::str::FromStr>(&mut self, key: &str, default: T) -> Result<T, ArgumentError> {
        if !self.has(key) {
            self.used.insert(key.to_string());
            return Ok(default);
        }
        self.parse(key)
    }

    /// Every directive must consume its whole map
    pub fn check_all_used(&self) -> Result<(), ArgumentError> {
        let leftover: Vec<&String> = self.map.keys().filter(|k| !self.used.contains(*k)).collect();
        if leftover.is_empty() {
            return Ok(());
        }
        let mut keys: Vec<String> = leftover.iter().map(|k| k.to_string()).collect();
        keys.sort();
        Err(ArgumentError::Unused { class: self.class.clone(), keys: keys.join(", ") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> Arguments {
        let map = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Arguments::new("Test", map)
    }

    #[test]
    fn unused_keys_are_flagged() {
        let mut a = args(&[("beta", "1.2"), ("typo", "yes")]);
        let beta: f64 = a.parse("beta").unwrap();
        assert_eq!(beta, 1.2);
        let err = a.check_all_used().unwrap_err();
        assert!(format!("{}", err).contains("typo"));
    }

    #[test]
    fn defaults_count_as_used() {
        let mut a = args(&[]);
        let w: f64 = a.parse_or("weight", 1.0).unwrap();
        assert_eq!(w, 1.0);
        assert!(a.check_all_used().is_ok());
    }
}
