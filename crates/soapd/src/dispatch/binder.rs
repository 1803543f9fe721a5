//! Argument binding.
//!
//! Three calling conventions exist, with precedence
//! special-numeric > keywords > positional:
//!
//! - positional: the envelope's ordered arguments, named ones ignored;
//! - keywords: the named mapping as the only bundle, keys reduced to their
//!   local names (two keys sharing a local name are rejected);
//! - special-numeric: named keys of the form `_<digits>` become ordered
//!   arguments sorted by index, the rest stay named.
//!
//! Context-aware handlers receive a [`CallContext`] in every mode.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde_json::Value;
use thiserror::Error;

use crate::context::{CONTEXT_ARGUMENT, CallContext};
use crate::envelope::{QualifiedName, RequestEnvelope};
use crate::registry::{Arguments, Handler};

/// Calling convention selected for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// Ordered arguments only.
    Positional,
    /// Named arguments only.
    Keywords,
    /// `_<digits>` keys reordered into positional arguments.
    SpecialNumeric,
}

impl BindingMode {
    /// Mode for `handler` given the engine-wide `special_args` switch.
    #[must_use]
    pub const fn select(handler: &Handler, special_args: bool) -> Self {
        if special_args {
            return Self::SpecialNumeric;
        }
        match handler.signature() {
            Some(signature) if signature.keywords => Self::Keywords,
            _ => Self::Positional,
        }
    }
}

/// Reasons the named arguments could not be partitioned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// Two keys parse to the same index, such as `_1` and `_01`.
    #[error("arguments '{first}' and '{second}' both claim position {index}")]
    DuplicateIndex {
        index: usize,
        first: String,
        second: String,
    },

    /// Two namespaced keys reduce to the same local name.
    #[error("arguments '{first}' and '{second}' share the local name '{name}'")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },

    /// The digits do not fit a machine integer.
    #[error("argument '{key}' has an out-of-range position")]
    IndexOverflow { key: String },
}

/// Builds the call arguments for `handler` from `envelope`.
///
/// # Errors
///
/// Returns a [`BindError`] when two named keys collapse onto one local name
/// or special-numeric partitioning fails.
pub fn bind(
    handler: &Handler,
    envelope: &RequestEnvelope,
    special_args: bool,
) -> Result<Arguments, BindError> {
    let context = handler
        .wants_context()
        .then(|| CallContext::from_envelope(envelope));
    let arguments = match BindingMode::select(handler, special_args) {
        BindingMode::Positional => {
            Arguments::new(envelope.positional.clone(), BTreeMap::new(), context)
        }
        BindingMode::Keywords => Arguments::new(Vec::new(), plain_keys(envelope)?, context),
        BindingMode::SpecialNumeric => {
            let (ordered, named) = partition_special(plain_keys(envelope)?)?;
            Arguments::new(ordered, named, context)
        }
    };
    Ok(arguments)
}

/// Splits `_<digits>` keys out of `named` into an index-ordered sequence.
///
/// Keys must match the pattern in full; `_1x` stays named.
///
/// # Errors
///
/// Returns [`BindError::DuplicateIndex`] when two keys share an index and
/// [`BindError::IndexOverflow`] when an index does not fit in `usize`.
pub fn partition_special(
    named: BTreeMap<String, Value>,
) -> Result<(Vec<Value>, BTreeMap<String, Value>), BindError> {
    let mut ordered: BTreeMap<usize, (String, Value)> = BTreeMap::new();
    let mut rest = BTreeMap::new();
    for (key, value) in named {
        let Some(digits) = special_index(&key) else {
            rest.insert(key, value);
            continue;
        };
        let index = digits
            .parse::<usize>()
            .map_err(|_| BindError::IndexOverflow { key: key.clone() })?;
        match ordered.entry(index) {
            Entry::Vacant(slot) => {
                slot.insert((key, value));
            }
            Entry::Occupied(existing) => {
                return Err(BindError::DuplicateIndex {
                    index,
                    first: existing.get().0.clone(),
                    second: key,
                });
            }
        }
    }
    let ordered = ordered.into_values().map(|(_, value)| value).collect();
    Ok((ordered, rest))
}

fn special_index(key: &str) -> Option<&str> {
    let digits = key.strip_prefix('_')?;
    (!digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())).then_some(digits)
}

/// Named arguments keyed by local name, minus the reserved context key.
fn plain_keys(envelope: &RequestEnvelope) -> Result<BTreeMap<String, Value>, BindError> {
    let mut keys: BTreeMap<String, (&QualifiedName, Value)> = BTreeMap::new();
    for (name, value) in &envelope.named {
        let local = name.local_name();
        if local == CONTEXT_ARGUMENT {
            continue;
        }
        match keys.entry(local.to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert((name, value.clone()));
            }
            Entry::Occupied(existing) => {
                return Err(BindError::DuplicateName {
                    name: local.to_owned(),
                    first: existing.get().0.to_string(),
                    second: name.to_string(),
                });
            }
        }
    }
    Ok(keys
        .into_iter()
        .map(|(local, (_, value))| (local, value))
        .collect())
}
