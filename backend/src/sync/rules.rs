//! Path classification for the sync middleware.

use regex::Regex;

use crate::config::{ConfigError, RoutesConfig};

/// Compiled route configuration.
#[derive(Debug, Clone)]
pub struct RouteRules {
    blocked_path: String,
    protected: Vec<Regex>,
    static_prefixes: Vec<String>,
}

impl RouteRules {
    /// Compile the configured patterns. Each pattern must match the whole path.
    pub fn from_config(config: &RoutesConfig) -> Result<Self, ConfigError> {
        let protected = config
            .protected
            .iter()
            .map(|pattern| {
                Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            blocked_path: config.blocked_path.clone(),
            protected,
            static_prefixes: config
                .static_prefixes
                .iter()
                .map(|p| p.trim_end_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        })
    }

    pub fn blocked_path(&self) -> &str {
        &self.blocked_path
    }

    pub fn is_blocked_path(&self, path: &str) -> bool {
        path == self.blocked_path
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.protected.iter().any(|re| re.is_match(path))
    }

    /// Static assets never go through session sync.
    pub fn is_static_asset(&self, path: &str) -> bool {
        let under_prefix = self.static_prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        });
        if under_prefix {
            return true;
        }

        // Files like /favicon.ico or /assets/app.js, but never API routes.
        let is_api = path == "/api" || path.starts_with("/api/");
        !is_api
            && path
                .rsplit('/')
                .next()
                .is_some_and(|segment| segment.contains('.'))
    }
}
