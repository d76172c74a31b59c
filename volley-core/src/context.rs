//! Per-thread execution context

use std::collections::HashMap;

/// Variable holding `"true"`/`"false"` for the most recent sample's outcome
pub const LAST_SAMPLE_OK: &str = "LAST_SAMPLE_OK";

/// Thread-local variable store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: HashMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn put(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Variables
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// State owned by one virtual user for the duration of a run
#[derive(Debug, Clone)]
pub struct ThreadContext {
    /// Zero-based thread number within its group
    pub thread_num: usize,

    /// Human readable thread name, e.g. `"checkout 1-3"`
    pub thread_name: String,

    /// Main-loop iteration currently executing (1-based, 0 before the first)
    pub iteration: u64,

    /// Thread variables
    pub vars: Variables,
}

impl ThreadContext {
    pub fn new(thread_num: usize, thread_name: impl Into<String>) -> Self {
        Self {
            thread_num,
            thread_name: thread_name.into(),
            iteration: 0,
            vars: Variables::new(),
        }
    }

    /// Replace the variable store (builder style)
    pub fn with_vars(mut self, vars: Variables) -> Self {
        self.vars = vars;
        self
    }

    /// Whether the last executed sample failed
    pub fn last_sample_failed(&self) -> bool {
        self.vars
            .get(LAST_SAMPLE_OK)
            .is_some_and(|v| v.eq_ignore_ascii_case("false"))
    }
}

impl Default for ThreadContext {
    fn default() -> Self {
        Self::new(0, "thread-0")
    }
}
