// raw.rs: pointer-level entry used by the C ABI
use std::ffi::{c_char, c_int, CStr};
use std::slice;

use crate::error::ExtractError;
use crate::extractor::{extract_fields, MAX_FIELDS};

/// Extract fields from a NUL-terminated C string into four C buffers of
/// `capacity` bytes each.
///
/// Null `input` or any null buffer fails with `NullArgument` before anything is
/// written. A `capacity` of zero or less is treated as four empty buffers: no
/// byte is written, and the count reflects only how far the scan could get
/// without copying.
///
/// # Safety
/// - `input`, when non-null, must point to a NUL-terminated string that is not
///   mutated for the duration of the call.
/// - each non-null buffer must be valid for writes of `capacity` bytes.
/// - the four buffers must not overlap each other or `input`.
pub unsafe fn extract_fields_raw(
    input: *const c_char,
    delimiter: c_char,
    out: [*mut c_char; MAX_FIELDS],
    capacity: c_int,
) -> Result<usize, ExtractError> {
    if input.is_null() || out.iter().any(|p| p.is_null()) {
        return Err(ExtractError::NullArgument);
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    let input = unsafe { CStr::from_ptr(input) }.to_bytes();
    let len = usize::try_from(capacity).unwrap_or(0);
    // SAFETY: each pointer is non-null, writable for `len` bytes and disjoint.
    let mut slots = out.map(|p| unsafe { slice::from_raw_parts_mut(p.cast::<u8>(), len) });
    Ok(extract_fields(input, delimiter as u8, &mut slots))
}
