//! Header contract checking.
//!
//! Every header element flagged `mustUnderstand` must name a header the
//! registry understands. Elements whose local name starts with `_` are
//! reserved and never checked.

use crate::envelope::RequestEnvelope;
use crate::fault::Fault;
use crate::registry::Registry;

/// Fails on the first mandatory header the registry does not understand.
pub(crate) fn check_headers(envelope: &RequestEnvelope, registry: &Registry) -> Result<(), Fault> {
    for element in &envelope.headers {
        let name = element.name.local_name();
        if name.starts_with('_') {
            continue;
        }
        let mandatory = envelope
            .attributes
            .must_understand(element.id)
            .is_some_and(is_truthy);
        if !mandatory {
            continue;
        }
        let namespace = element.name.namespace().unwrap_or_default();
        if !registry.understands(namespace, name) {
            return Err(Fault::must_understand(format!(
                "Don't understand `{name}' header element but mustUnderstand attribute is set."
            )));
        }
    }
    Ok(())
}

/// `mustUnderstand` is set when the trimmed value is a nonzero integer.
fn is_truthy(value: &str) -> bool {
    value.trim().parse::<i64>().is_ok_and(|flag| flag != 0)
}
