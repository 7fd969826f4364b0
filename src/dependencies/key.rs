use serde::{Deserialize, Serialize};

/// Type-level name for an injectable dependency.
///
/// The key type itself is the identity; `Value` is what resolution
/// returns. Values are cloned out of the table, so they are usually cheap
/// handles such as `Arc<dyn Trait>`.
pub trait DependencyKey: 'static {
    type Value: Clone + Send + Sync + 'static;
}

/// Which variant of each dependency a context resolves by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Live,
    Preview,
    Test,
}

impl ExecutionMode {
    /// Parses `live`, `preview` or `test` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "live" => Some(Self::Live),
            "preview" => Some(Self::Preview),
            "test" => Some(Self::Test),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_modes() {
        assert_eq!(ExecutionMode::parse("live"), Some(ExecutionMode::Live));
        assert_eq!(ExecutionMode::parse(" Preview "), Some(ExecutionMode::Preview));
        assert_eq!(ExecutionMode::parse("TEST"), Some(ExecutionMode::Test));
        assert_eq!(ExecutionMode::parse("staging"), None);
    }
}
