//! Serde helpers for configuration files

/// `Duration` as whole seconds
///
/// TOML has no duration type, so timeouts are written as plain integers:
///
/// ```toml
/// [tunnel]
/// connect_timeout = 30
/// ready_timeout = 0   # wait forever
/// ```
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
