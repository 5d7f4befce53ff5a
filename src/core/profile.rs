//! Build profiles and `"auto"` resolution.
//!
//! A profile is a named overlay in the `profiles` section. Independently of
//! what the overlay contains, the profile name picks one of exactly two
//! buckets that decide every field left as `"auto"`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The profile whose name selects optimized defaults.
pub const OPTIMIZED_PROFILE: &str = "release";

/// The only profile that links the debug CRT.
pub const DEBUG_PROFILE: &str = "debug";

/// Profile used when none is given on the command line.
pub const DEFAULT_PROFILE: &str = OPTIMIZED_PROFILE;

/// Which of the two auto-resolution buckets a profile falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// The profile literally named `release`.
    Optimized,
    /// Any other profile, including custom ones.
    Unoptimized,
}

impl ProfileKind {
    /// Classify a profile by name.
    pub fn from_name(name: &str) -> Self {
        if name == OPTIMIZED_PROFILE {
            ProfileKind::Optimized
        } else {
            ProfileKind::Unoptimized
        }
    }

    pub fn is_optimized(self) -> bool {
        self == ProfileKind::Optimized
    }
}

/// Look up a profile's override block in an already merged tree.
pub fn profile_overlay<'a>(config: &'a Value, name: &str) -> Option<&'a Value> {
    config.get("profiles")?.get(name).filter(|v| v.is_object())
}

/// Names of all profiles defined in the tree, sorted.
pub fn profile_names(config: &Value) -> Vec<String> {
    let mut names: Vec<String> = config
        .get("profiles")
        .and_then(Value::as_object)
        .map(|profiles| profiles.keys().cloned().collect())
        .unwrap_or_default();
    names.sort();
    names
}

/// The literal `"auto"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoMarker {
    Auto,
}

/// A field that is either `"auto"` or an explicit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AutoOr<T> {
    Auto(AutoMarker),
    Value(T),
}

impl<T> AutoOr<T> {
    pub fn is_auto(&self) -> bool {
        matches!(self, AutoOr::Auto(_))
    }
}

impl<T> From<T> for AutoOr<T> {
    fn from(value: T) -> Self {
        AutoOr::Value(value)
    }
}

/// Concrete value an `"auto"` field takes for each profile bucket.
pub trait AutoDefault: Sized {
    fn for_profile(kind: ProfileKind) -> Self;
}

/// Resolve an `"auto"` field against the active profile.
///
/// Explicit values pass through untouched.
pub fn resolve_auto<T: AutoDefault>(value: AutoOr<T>, kind: ProfileKind) -> T {
    match value {
        AutoOr::Auto(_) => T::for_profile(kind),
        AutoOr::Value(v) => v,
    }
}
