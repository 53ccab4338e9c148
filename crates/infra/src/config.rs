//! Runtime configuration, read from the environment with fallbacks.

/// Knobs for the treatment coordinator and the recent-feed view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Name recorded when the acting user has no display name.
    pub system_actor: String,
    /// Entries non-manager roles see in the recent feed.
    pub recent_limit: usize,
    /// Ask the advisory generator after a treatment commit.
    pub advisory_enabled: bool,
    /// Reject writes to farm units past their expiry date.
    pub enforce_unit_expiry: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            system_actor: "Sistema".to_string(),
            recent_limit: 5,
            advisory_enabled: true,
            enforce_unit_expiry: true,
        }
    }
}

impl LedgerConfig {
    /// `BOIMEDICADO_SYSTEM_ACTOR`, `BOIMEDICADO_RECENT_LIMIT`,
    /// `BOIMEDICADO_ADVISORY` (`on`/`off`) and `BOIMEDICADO_ENFORCE_UNIT_EXPIRY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let system_actor = lookup("BOIMEDICADO_SYSTEM_ACTOR")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.system_actor);

        let recent_limit = match lookup("BOIMEDICADO_RECENT_LIMIT") {
            None => defaults.recent_limit,
            Some(raw) => raw.trim().parse::<usize>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "BOIMEDICADO_RECENT_LIMIT is not a number; using default");
                defaults.recent_limit
            }),
        };

        let advisory_enabled = flag(&lookup, "BOIMEDICADO_ADVISORY", defaults.advisory_enabled);
        let enforce_unit_expiry = flag(
            &lookup,
            "BOIMEDICADO_ENFORCE_UNIT_EXPIRY",
            defaults.enforce_unit_expiry,
        );

        Self {
            system_actor,
            recent_limit,
            advisory_enabled,
            enforce_unit_expiry,
        }
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => true,
        "off" | "false" | "0" | "no" => false,
        _ => {
            tracing::warn!(key, value = %raw, "unrecognised flag value; using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> LedgerConfig {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        LedgerConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(from(&[]), LedgerConfig::default());
    }

    #[test]
    fn values_are_parsed() {
        let config = from(&[
            ("BOIMEDICADO_SYSTEM_ACTOR", "Robô"),
            ("BOIMEDICADO_RECENT_LIMIT", "12"),
            ("BOIMEDICADO_ADVISORY", "off"),
            ("BOIMEDICADO_ENFORCE_UNIT_EXPIRY", "false"),
        ]);
        assert_eq!(config.system_actor, "Robô");
        assert_eq!(config.recent_limit, 12);
        assert!(!config.advisory_enabled);
        assert!(!config.enforce_unit_expiry);
    }

    #[test]
    fn garbage_falls_back() {
        let config = from(&[("BOIMEDICADO_RECENT_LIMIT", "many"), ("BOIMEDICADO_ADVISORY", "maybe")]);
        assert_eq!(config.recent_limit, 5);
        assert!(config.advisory_enabled);
    }
}
