// extractor.rs: fixed-arity field extraction over caller-owned buffers
use std::borrow::Cow;

use log::debug;

use crate::tokenizer::{byte_at, copy_token, terminated, NUL};

/// Number of output slots, in record order.
pub const MAX_FIELDS: usize = 4;
/// Capacity of each output buffer, terminator included.
pub const DEFAULT_BUFFER_CAPACITY: usize = 32;
/// Largest per-buffer capacity accepted from configuration.
pub const MAX_BUFFER_CAPACITY: usize = 4096;

/// Position of a field within a sensor record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Lat,
    Lon,
    Humidity,
    Temperature,
}

impl Field {
    pub const ALL: [Field; MAX_FIELDS] = [Field::Lat, Field::Lon, Field::Humidity, Field::Temperature];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Field::Lat => "lat",
            Field::Lon => "lon",
            Field::Humidity => "humidity",
            Field::Temperature => "temperature",
        }
    }
}

/// Split `input` on `delimiter` into the four slots of `out`.
///
/// Every slot is reset to the empty string first, so slots past the returned
/// count never carry content from an earlier call. The input ends at its first
/// NUL byte or at the end of the slice.
///
/// Scanning stops when the input is exhausted, after the fourth slot, or when
/// the byte following a copied token is neither `delimiter` nor the
/// terminator. The last case happens when a token did not fit its slot; the
/// slot holds the truncated prefix and still counts. Buffers filled to
/// exactly `len - 1` bytes are therefore ambiguous between "fit exactly" and
/// "truncated".
///
/// Returns the number of slots written, `0..=4`. Does not allocate.
pub fn extract_fields(input: &[u8], delimiter: u8, out: &mut [&mut [u8]; MAX_FIELDS]) -> usize {
    for buf in out.iter_mut() {
        if let Some(first) = buf.first_mut() {
            *first = NUL;
        }
    }

    let mut cursor = 0usize;
    let mut found = 0usize;
    for (slot, buf) in out.iter_mut().enumerate() {
        if byte_at(input, cursor) == NUL {
            break;
        }
        let copied = copy_token(&input[cursor..], delimiter, buf);
        found += 1;
        cursor += copied;

        // terminator is checked first so a NUL delimiter can never step past the end
        match byte_at(input, cursor) {
            NUL => break,
            b if b == delimiter => cursor += 1,
            b => {
                debug!(
                    "stopping at {} after {} bytes: unexpected byte {:#04x} at offset {}",
                    Field::ALL[slot].name(),
                    copied,
                    b,
                    cursor
                );
                break;
            }
        }
    }
    found
}

/// Four owned output buffers of one capacity plus the count from the last
/// extraction. Buffers are allocated once; `extract` reuses them.
#[derive(Debug, Clone)]
pub struct SensorFields {
    bufs: [Vec<u8>; MAX_FIELDS],
    found: usize,
}

impl Default for SensorFields {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }
}

impl SensorFields {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { bufs: std::array::from_fn(|_| vec![NUL; capacity]), found: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.bufs[0].len()
    }

    /// Run `extract_fields` over the owned buffers and remember the count.
    pub fn extract(&mut self, input: &[u8], delimiter: u8) -> usize {
        let mut out = self.bufs.each_mut().map(Vec::as_mut_slice);
        self.found = extract_fields(input, delimiter, &mut out);
        self.found
    }

    /// Field count from the last `extract`.
    pub fn found(&self) -> usize {
        self.found
    }

    pub fn get(&self, field: Field) -> &[u8] {
        terminated(&self.bufs[field.index()])
    }

    pub fn get_str(&self, field: Field) -> Cow<'_, str> {
        String::from_utf8_lossy(self.get(field))
    }

    pub fn lat(&self) -> &[u8] {
        self.get(Field::Lat)
    }

    pub fn lon(&self) -> &[u8] {
        self.get(Field::Lon)
    }

    pub fn humidity(&self) -> &[u8] {
        self.get(Field::Humidity)
    }

    pub fn temperature(&self) -> &[u8] {
        self.get(Field::Temperature)
    }

    /// True when the buffer is filled to `capacity - 1` bytes, the only
    /// content-level hint that the token may have been cut short.
    pub fn is_saturated(&self, field: Field) -> bool {
        let cap = self.capacity();
        cap > 0 && self.get(field).len() == cap - 1
    }

    /// Fields written by the last `extract`, in record order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &[u8])> + '_ {
        Field::ALL.into_iter().take(self.found).map(move |f| (f, self.get(f)))
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_fields, Field, SensorFields, DEFAULT_BUFFER_CAPACITY, MAX_FIELDS};
    use crate::tokenizer::terminated;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn run(input: &[u8], cap: usize) -> (usize, Vec<Vec<u8>>) {
        let mut f = SensorFields::with_capacity(cap);
        let n = f.extract(input, b',');
        (n, Field::ALL.iter().map(|&fl| f.get(fl).to_vec()).collect())
    }

    #[test]
    fn test_full_record() {
        let (n, v) = run(b"19.12345,-98.54321,60.5,25.1", DEFAULT_BUFFER_CAPACITY);
        assert_eq!(n, 4);
        assert_eq!(v, vec![b"19.12345".to_vec(), b"-98.54321".to_vec(), b"60.5".to_vec(), b"25.1".to_vec()]);
    }

    #[test]
    fn test_two_fields_leave_rest_empty() {
        let (n, v) = run(b"20.001,-99.002", DEFAULT_BUFFER_CAPACITY);
        assert_eq!(n, 2);
        assert_eq!(v[0], b"20.001");
        assert_eq!(v[1], b"-99.002");
        assert!(v[2].is_empty());
        assert!(v[3].is_empty());
    }

    #[test]
    fn test_spaces_are_preserved() {
        let (n, v) = run(b"21.1, -100.2, 70, ", DEFAULT_BUFFER_CAPACITY);
        assert_eq!(n, 4);
        assert_eq!(v[1], b" -100.2");
        assert_eq!(v[2], b" 70");
        assert_eq!(v[3], b" ");
    }

    #[test]
    fn test_trailing_delimiter_does_not_count_a_field() {
        let (n, v) = run(b"1.2,3.4,,", DEFAULT_BUFFER_CAPACITY);
        assert_eq!(n, 3);
        assert!(v[2].is_empty());
        assert!(v[3].is_empty());

        let (n, _) = run(b"21.1,-100.2,70,", DEFAULT_BUFFER_CAPACITY);
        assert_eq!(n, 3);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(run(b"", DEFAULT_BUFFER_CAPACITY).0, 0);
        assert_eq!(run(b"\0ignored", DEFAULT_BUFFER_CAPACITY).0, 0);
    }

    #[test]
    fn test_leading_delimiter_gives_empty_first_field() {
        let (n, v) = run(b",b", DEFAULT_BUFFER_CAPACITY);
        assert_eq!(n, 2);
        assert!(v[0].is_empty());
        assert_eq!(v[1], b"b");
    }

    #[test]
    fn test_more_than_four_tokens() {
        let (n, v) = run(b"a,b,c,d,e,f", DEFAULT_BUFFER_CAPACITY);
        assert_eq!(n, 4);
        assert_eq!(v[3], b"d");
    }

    #[test]
    fn test_long_token_truncates_and_stops() {
        let token = b"verylongtoken123456789012345678901234567890";
        assert_eq!(token.len(), 43);
        let mut line = token.to_vec();
        line.extend_from_slice(b",next");
        let (n, v) = run(&line, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(n, 1);
        assert_eq!(v[0], &token[..31]);
        assert!(v[1].is_empty());

        let long45 = [b'x'; 45];
        let mut line = long45.to_vec();
        line.extend_from_slice(b",next");
        let (n, v) = run(&line, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(n, 1);
        assert_eq!(v[0].len(), 31);
    }

    #[test]
    fn test_truncation_landing_on_delimiter_continues() {
        // 32 bytes: 31 copied, then the cursor sits on the 32nd byte, not the comma
        let mut line = vec![b'y'; 32];
        line.extend_from_slice(b",next");
        assert_eq!(run(&line, DEFAULT_BUFFER_CAPACITY).0, 1);

        // 31 bytes: fits exactly, cursor lands on the comma and parsing goes on
        let mut line = vec![b'z'; 31];
        line.extend_from_slice(b",next");
        let (n, v) = run(&line, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(n, 2);
        assert_eq!(v[0].len(), 31);
        assert_eq!(v[1], b"next");
    }

    #[test]
    fn test_exact_fit_is_saturated_but_not_truncated() {
        let mut f = SensorFields::with_capacity(5);
        assert_eq!(f.extract(b"abcd,ef", b','), 2);
        assert_eq!(f.lat(), b"abcd");
        assert!(f.is_saturated(Field::Lat));
        assert!(!f.is_saturated(Field::Lon));
        assert_eq!(f.lon(), b"ef");
    }

    #[test]
    fn test_nul_ends_input() {
        let (n, v) = run(b"1,2\0,3,4", DEFAULT_BUFFER_CAPACITY);
        assert_eq!(n, 2);
        assert_eq!(v[1], b"2");
        assert!(v[2].is_empty());
    }

    #[test]
    fn test_nul_delimiter_stops_at_end() {
        let mut f = SensorFields::default();
        assert_eq!(f.extract(b"abc", 0), 1);
        assert_eq!(f.lat(), b"abc");
    }

    #[test]
    fn test_stale_content_is_cleared() {
        let mut f = SensorFields::default();
        assert_eq!(f.extract(b"1,2,3,4", b','), 4);
        assert_eq!(f.extract(b"9", b','), 1);
        assert_eq!(f.lat(), b"9");
        assert!(f.lon().is_empty());
        assert!(f.humidity().is_empty());
        assert!(f.temperature().is_empty());
    }

    #[test]
    fn test_other_delimiters() {
        let mut f = SensorFields::default();
        assert_eq!(f.extract(b"1;2;3", b';'), 3);
        assert_eq!(f.humidity(), b"3");
        // comma is ordinary data when the delimiter is ';'
        assert_eq!(f.extract(b"1,5;2", b';'), 2);
        assert_eq!(f.lat(), b"1,5");
    }

    #[test]
    fn test_iter_and_accessors() {
        let mut f = SensorFields::default();
        f.extract(b"1,2,3", b',');
        let got: Vec<(Field, &[u8])> = f.iter().collect();
        assert_eq!(got, vec![(Field::Lat, &b"1"[..]), (Field::Lon, &b"2"[..]), (Field::Humidity, &b"3"[..])]);
        assert_eq!(f.get_str(Field::Lon), "2");
        assert_eq!(f.found(), 3);
        assert_eq!(Field::Temperature.name(), "temperature");
        assert_eq!(Field::Humidity.index(), 2);
    }

    #[test]
    fn test_zero_capacity_slots_are_never_written() {
        let mut a: [u8; 0] = [];
        let mut b: [u8; 0] = [];
        let mut c: [u8; 0] = [];
        let mut d: [u8; 0] = [];
        let mut out: [&mut [u8]; MAX_FIELDS] = [&mut a, &mut b, &mut c, &mut d];
        assert_eq!(extract_fields(b"a,b", b',', &mut out), 1);
        assert_eq!(extract_fields(b",b", b',', &mut out), 2);
    }

    #[test]
    fn test_mixed_slot_capacities() {
        let mut a = [0xAAu8; 8];
        let mut b = [0xAAu8; 3];
        let mut c = [0xAAu8; 8];
        let mut d = [0xAAu8; 8];
        let mut out: [&mut [u8]; MAX_FIELDS] = [&mut a, &mut b, &mut c, &mut d];
        assert_eq!(extract_fields(b"12,345,6", b',', &mut out), 2);
        assert_eq!(terminated(&b), b"34");
        assert_eq!(c[0], 0);
    }

    fn sanitize(s: &str) -> Vec<u8> {
        s.bytes().filter(|b| b.is_ascii_alphanumeric() || *b == b'.' || *b == b'-').take(20).collect()
    }

    fn join(tokens: &[Vec<u8>]) -> Vec<u8> {
        tokens.join(&b","[..])
    }

    #[quickcheck]
    fn prop_well_formed_tokens_round_out(raw: Vec<String>) -> TestResult {
        let tokens: Vec<Vec<u8>> = raw.iter().take(MAX_FIELDS).map(|s| sanitize(s)).collect();
        match tokens.last() {
            Some(last) if !last.is_empty() => {}
            _ => return TestResult::discard(),
        }
        let (n, v) = run(&join(&tokens), DEFAULT_BUFFER_CAPACITY);
        TestResult::from_bool(n == tokens.len() && v[..n] == tokens[..] && v[n..].iter().all(|b| b.is_empty()))
    }

    #[quickcheck]
    fn prop_extra_tokens_are_ignored(raw: Vec<String>) -> TestResult {
        let tokens: Vec<Vec<u8>> = raw.iter().map(|s| sanitize(s)).collect();
        if tokens.len() <= MAX_FIELDS {
            return TestResult::discard();
        }
        let (n, v) = run(&join(&tokens), DEFAULT_BUFFER_CAPACITY);
        TestResult::from_bool(n == MAX_FIELDS && v[..] == tokens[..MAX_FIELDS])
    }

    #[quickcheck]
    fn prop_buffers_stay_terminated_and_tail_is_empty(input: Vec<u8>, delim: u8, cap: u8) -> bool {
        let cap = usize::from(cap % 40) + 1;
        let mut f = SensorFields::with_capacity(cap);
        let n = f.extract(&input, delim);
        n <= MAX_FIELDS
            && Field::ALL.iter().all(|&fl| f.get(fl).len() < cap)
            && Field::ALL[n..].iter().all(|&fl| f.get(fl).is_empty())
    }

    #[quickcheck]
    fn prop_extraction_is_idempotent(input: Vec<u8>, delim: u8) -> bool {
        let mut a = SensorFields::default();
        let mut b = SensorFields::default();
        a.extract(&input, delim) == b.extract(&input, delim)
            && Field::ALL.iter().all(|&fl| a.get(fl) == b.get(fl))
    }
}
