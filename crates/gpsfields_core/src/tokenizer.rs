// tokenizer.rs: bounded single-token copy into a NUL-terminated buffer
use memchr::{memchr, memchr2};

/// Terminator written after every copied token and recognised as end of input.
pub const NUL: u8 = 0;

/// Copy one token from the start of `src` into `dest`.
///
/// Copying stops at the first of:
/// - `delim` (neither copied nor consumed)
/// - a NUL byte or the end of `src`
/// - `dest.len() - 1` copied bytes, keeping one byte for the terminator
///
/// `dest[copied]` is always set to NUL, also when nothing was copied. The
/// return value is the number of bytes copied, which equals the number of
/// source bytes the caller must step over. An empty `dest` is left untouched
/// and yields 0.
pub fn copy_token(src: &[u8], delim: u8, dest: &mut [u8]) -> usize {
    let Some(room) = dest.len().checked_sub(1) else {
        return 0;
    };
    let window = &src[..src.len().min(room)];
    let copied = memchr2(delim, NUL, window).unwrap_or(window.len());
    dest[..copied].copy_from_slice(&window[..copied]);
    dest[copied] = NUL;
    copied
}

/// Byte at `pos`, reading past the end of `input` as the terminator.
#[inline]
pub(crate) fn byte_at(input: &[u8], pos: usize) -> u8 {
    input.get(pos).copied().unwrap_or(NUL)
}

/// The token stored in a NUL-terminated buffer, without its terminator.
/// A buffer with no NUL is returned whole.
pub fn terminated(buf: &[u8]) -> &[u8] {
    match memchr(NUL, buf) {
        Some(end) => &buf[..end],
        None => buf,
    }
}
