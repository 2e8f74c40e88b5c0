//! Runtime configuration (§10.3).
//!
//! A small, directly-constructed settings struct, mirroring
//! `control::config::ApplicationSettings`'s shape rather than that crate's
//! file-and-env settings loader: this subsystem is a library embedded in a
//! host process, not a standalone service that owns its own settings file.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// When `true`, outbound-reference detection (§4.F) is delegated to the
    /// data-store channel instead of being performed in-subsystem. Renamed
    /// from the source's DDS-specific flag name to stay generic.
    pub detect_outbound_routes_via_store: bool,

    /// Overrides the starting count used by `id::detached_id` so tests can
    /// get deterministic ids instead of depending on creation order.
    pub detached_id_seed: Option<usize>,

    /// Whether an `InternalConsistency` violation panics (debug builds) or
    /// is recorded and the offending op dropped (release builds), per the
    /// §7 policy split.
    pub panic_on_internal_consistency_violation: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detect_outbound_routes_via_store: false,
            detached_id_seed: None,
            panic_on_internal_consistency_violation: cfg!(debug_assertions),
        }
    }
}
