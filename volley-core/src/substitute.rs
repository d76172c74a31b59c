//! `${NAME}` placeholder substitution against thread variables

use crate::context::Variables;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

/// Replace every `${NAME}` with the value of `NAME`.
///
/// Placeholders naming an unset variable are left untouched.
pub fn substitute(text: &str, vars: &Variables) -> String {
    if !text.contains("${") {
        return text.to_string();
    }
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| match vars.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
