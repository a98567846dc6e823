//! Fixed contract-violation messages.

#[cold]
#[inline(never)]
pub(crate) fn unsafe_chain_err() -> String {
    "cannot retrieve data from an unsafe validation chain".to_string()
}

#[cold]
#[inline(never)]
pub(crate) fn pending_value_err() -> String {
    "cannot retrieve data from a chain that is still pending".to_string()
}

#[cold]
#[inline(never)]
pub(crate) fn sequence_type_err(op: &str, found: &str) -> String {
    format!("{}: expected Array data, got {}", op, found)
}

#[cold]
#[inline(never)]
pub(crate) fn duplicate_start_err(name: &str) -> String {
    format!("named chain '{}' was already started in this run", name)
}

#[cold]
#[inline(never)]
pub(crate) fn nested_start_err(outer: &str) -> String {
    format!("cannot start a named chain inside chain '{}'", outer)
}

#[cold]
#[inline(never)]
pub(crate) fn end_outside_chain_err() -> String {
    "end() is only legal on a named validation chain".to_string()
}

#[cold]
#[inline(never)]
pub(crate) fn double_end_err(name: &str) -> String {
    format!("named chain '{}' was already ended", name)
}
