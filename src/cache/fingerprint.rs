//! Fingerprint derivation
//!
//! Builds cache keys from an operation name and its serialized inputs.

use serde::Serialize;

use crate::error::{CacheError, Result};

/// Builds the cache key for `operation` applied to `inputs`.
///
/// The key is `"<operation>:<json>"`. Inputs go through `serde_json::Value`
/// first, whose maps keep their keys sorted, so two inputs with the same
/// content produce the same key whatever their field or insertion order.
pub fn fingerprint<I: Serialize + ?Sized>(operation: &str, inputs: &I) -> Result<String> {
    let canonical =
        serde_json::to_value(inputs).map_err(|e| CacheError::Fingerprint(e.to_string()))?;
    Ok(format!("{}:{}", operation, canonical))
}
