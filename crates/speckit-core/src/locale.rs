//! Display language for user-facing text
//!
//! Only prompts, tracker labels and next steps are translated. Error messages
//! and log output stay in English.

/// Language the CLI talks to the user in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    English,
    Japanese,
}

/// Standard locale variables, in POSIX precedence order
const SYSTEM_LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

impl Locale {
    /// Parse a language tag such as "ja", "ja_JP.UTF-8" or "en-US"
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        let language = tag
            .split(|c| c == '_' || c == '-' || c == '.' || c == '@')
            .next()
            .unwrap_or_default();
        match language {
            "ja" | "jp" => Some(Locale::Japanese),
            "en" | "c" | "posix" => Some(Locale::English),
            _ => None,
        }
    }

    /// Resolve from the product override variable, then the system locale.
    ///
    /// Unset, empty and unrecognized values fall through to the next source.
    pub fn from_env(override_var: &str) -> Self {
        Self::resolve(|name| std::env::var(name).ok(), override_var)
    }

    fn resolve(lookup: impl Fn(&str) -> Option<String>, override_var: &str) -> Self {
        std::iter::once(override_var)
            .chain(SYSTEM_LOCALE_VARS)
            .filter_map(|name| lookup(name))
            .find_map(|value| Self::parse(&value))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)]) -> Locale {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Locale::resolve(|name| vars.get(name).cloned(), "TEST_LANG")
    }

    #[test]
    fn test_parse_language_tags() {
        assert_eq!(Locale::parse("ja"), Some(Locale::Japanese));
        assert_eq!(Locale::parse("ja_JP.UTF-8"), Some(Locale::Japanese));
        assert_eq!(Locale::parse("en-US"), Some(Locale::English));
        assert_eq!(Locale::parse("C.UTF-8"), Some(Locale::English));
        assert_eq!(Locale::parse("fr_FR"), None);
        assert_eq!(Locale::parse(""), None);
    }

    #[test]
    fn test_override_wins_over_system_locale() {
        assert_eq!(
            resolve(&[("TEST_LANG", "en"), ("LANG", "ja_JP.UTF-8")]),
            Locale::English
        );
        assert_eq!(
            resolve(&[("TEST_LANG", "ja"), ("LANG", "en_US.UTF-8")]),
            Locale::Japanese
        );
    }

    #[test]
    fn test_falls_back_through_system_variables() {
        assert_eq!(resolve(&[("LANG", "ja_JP.UTF-8")]), Locale::Japanese);
        assert_eq!(
            resolve(&[("LC_ALL", "de_DE"), ("LANG", "ja_JP.UTF-8")]),
            Locale::Japanese
        );
        assert_eq!(resolve(&[]), Locale::English);
    }
}
