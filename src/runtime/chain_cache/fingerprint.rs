//! Canonical watch encoding and digesting.
//!
//! Watch lists are compared positionally; the SHA-256 digest over a
//! canonical byte encoding is a cheap inequality fast path, never a
//! substitute for the positional comparison.

use sha2::{Digest, Sha256};

use crate::runtime::value::Value;

const NONE_TAG: u8 = 0;
const BOOL_TAG: u8 = 1;
const INT_TAG: u8 = 2;
const FLOAT_TAG: u8 = 3;
const STRING_TAG: u8 = 4;
const ARRAY_TAG: u8 = 5;
const MAP_TAG: u8 = 6;
const REPORT_TAG: u8 = 7;

fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    write_u32(out, s.len() as u32);
    out.extend_from_slice(s.as_bytes());
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::None => out.push(NONE_TAG),
        Value::Boolean(v) => {
            out.push(BOOL_TAG);
            out.push(*v as u8);
        }
        Value::Integer(v) => {
            out.push(INT_TAG);
            out.extend_from_slice(&v.to_be_bytes());
        }
        Value::Float(v) => {
            out.push(FLOAT_TAG);
            out.extend_from_slice(&v.to_bits().to_be_bytes());
        }
        Value::String(v) => {
            out.push(STRING_TAG);
            write_str(out, v);
        }
        Value::Array(elements) => {
            out.push(ARRAY_TAG);
            write_u32(out, elements.len() as u32);
            for element in elements.iter() {
                write_value(out, element);
            }
        }
        Value::Map(pairs) => {
            out.push(MAP_TAG);
            write_u32(out, pairs.len() as u32);
            for (k, v) in pairs.iter() {
                write_str(out, k);
                write_value(out, v);
            }
        }
        Value::Report(report) => {
            out.push(REPORT_TAG);
            out.push(match report.ok {
                None => 0,
                Some(false) => 1,
                Some(true) => 2,
            });
            write_u32(out, report.badges.len() as u32);
            for badge in &report.badges {
                write_str(out, badge);
            }
            write_u32(out, report.errors.len() as u32);
            for (badge, message) in &report.errors {
                write_str(out, badge);
                write_str(out, message);
            }
            write_value(out, &report.store);
        }
    }
}

/// Digest over the canonical encoding of a watch list.
pub(crate) fn watch_digest(watches: &[Value]) -> [u8; 32] {
    let mut encoded = Vec::new();
    write_u32(&mut encoded, watches.len() as u32);
    for watch in watches {
        write_value(&mut encoded, watch);
    }
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    hasher.finalize().into()
}
