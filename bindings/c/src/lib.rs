// C ABI for gpsfields_core. Hosts load the shared library (dlopen, ctypes)
// and look up this one symbol:
//
//   int extract_fields(const char *input, char delimiter,
//                      char *out_lat, char *out_lon, char *out_hum, char *out_temp,
//                      int buffer_capacity);
use std::ffi::{c_char, c_int};

use gpsfields_core as core;
use log::debug;

/// Split `input` on `delimiter` into the four output buffers.
///
/// Returns the number of buffers written (`0..=4`) or `-1` when `input` or any
/// output buffer is NULL, in which case nothing is written. Each buffer always
/// ends up NUL-terminated with at most `buffer_capacity - 1` bytes; buffers
/// past the returned count hold the empty string.
///
/// # Safety
/// - `input` must be NULL or a NUL-terminated string.
/// - each output buffer must be NULL or writable for `buffer_capacity` bytes.
/// - output buffers must not overlap each other or `input`.
#[no_mangle]
pub unsafe extern "C" fn extract_fields(
    input: *const c_char,
    delimiter: c_char,
    out_lat: *mut c_char,
    out_lon: *mut c_char,
    out_hum: *mut c_char,
    out_temp: *mut c_char,
    buffer_capacity: c_int,
) -> c_int {
    let out = [out_lat, out_lon, out_hum, out_temp];
    // SAFETY: forwarded caller contract.
    match unsafe { core::extract_fields_raw(input, delimiter, out, buffer_capacity) } {
        Ok(found) => found as c_int,
        Err(e) => {
            debug!("extract_fields rejected call: {}", e);
            e.code()
        }
    }
}
