//! Primitive codec: variable-length naturals, fixed-length integers,
//! length-prefixed blobs, `Optional<T>`, and variable sequences.
//!
//! Internal decoders return `Option` (`None` on any malformed input) and stay
//! fast on the happy path; the `_checked` wrappers translate the failure into
//! the specific `CodecError` the API boundary promises, since `None` alone
//! cannot distinguish "truncated" from "non-canonical" from "overflowed".

use crate::errors::CodecError;

/// Decoding result: value and number of bytes consumed.
#[derive(Clone, Debug)]
pub struct DecodingResult<T> {
    pub value: T,
    pub consumed: i32,
}

impl<T> DecodingResult<T> {
    #[must_use]
    pub const fn new(value: T, consumed: i32) -> Self {
        Self { value, consumed }
    }
}

// ============================================================================
// Natural number encoding
// ============================================================================

/// Decode natural number from variable-length encoding. `None` on truncated,
/// overflowing, or non-canonical (non-shortest-prefix) input.
#[must_use]
pub fn decode_natural(data: &[u8]) -> Option<DecodingResult<u64>> {
    decode_natural_checked(data).ok()
}

/// Same as [`decode_natural`] but reports which `CodecError` applies.
pub fn decode_natural_checked(data: &[u8]) -> Result<DecodingResult<u64>, CodecError> {
    let first = *data.first().ok_or(CodecError::Truncated)?;

    if first == 0 {
        return Ok(DecodingResult::new(0, 1));
    }
    if (1..=127).contains(&first) {
        return Ok(DecodingResult::new(u64::from(first), 1));
    }
    if first == 0xff {
        if data.len() < 9 {
            return Err(CodecError::Truncated);
        }
        let mut value: u64 = 0;
        for (i, &b) in data[1..9].iter().enumerate() {
            value |= u64::from(b) << (i * 8);
        }
        // shortest form: a value representable with l < 8 data bytes must use that shorter prefix
        if value < (1u64 << 56) {
            return Err(CodecError::OrderingViolation);
        }
        return Ok(DecodingResult::new(value, 9));
    }

    let mut l = 0i32;
    for test_l in 1..=8 {
        let shift_8_minus_l = 8 - test_l;
        let min_prefix: u64 = 256u64.saturating_sub(1 << shift_8_minus_l);
        let seven_l_plus_one = 7 * (test_l + 1);
        let max_suffix = (1u64 << seven_l_plus_one).saturating_sub(1) >> (8 * test_l);
        let max_prefix = min_prefix.saturating_add(max_suffix);
        if u64::from(first) >= min_prefix && u64::from(first) <= max_prefix {
            l = test_l;
            break;
        }
    }
    if l == 0 {
        return Err(CodecError::Overflow);
    }
    if data.len() < 1 + l as usize {
        return Err(CodecError::Truncated);
    }

    let shift_8_minus_l = 8 - l;
    let prefix_base: u64 = 256u64.saturating_sub(1 << shift_8_minus_l);
    let high_bits = (u64::from(first).saturating_sub(prefix_base)) << (8 * l);

    let mut low_bits: u64 = 0;
    for (i, &b) in data[1..1 + l as usize].iter().enumerate() {
        low_bits |= u64::from(b) << (i * 8);
    }
    let value = high_bits | low_bits;

    // shortest-form check: re-encoding value with the minimal prefix must equal what we just read.
    if encode_natural(value).first() != Some(&first) {
        return Err(CodecError::OrderingViolation);
    }
    Ok(DecodingResult::new(value, 1 + l))
}

/// Encode natural number (variable-length). Zero = [0x00]; large = [0xFF, 8 bytes LE]; else prefix + suffix.
#[must_use]
pub fn encode_natural(value: u64) -> Vec<u8> {
    if value == 0 {
        return vec![0];
    }
    if value >= 1 << 56 {
        let mut out = vec![0xff; 9];
        for (i, b) in out[1..9].iter_mut().enumerate() {
            *b = (value >> (i * 8)) as u8;
        }
        return out;
    }
    if (1..=127).contains(&value) {
        return vec![value as u8];
    }

    let mut l = 1i32;
    while l <= 8 && value >= (1 << (7 * (l + 1))) {
        l += 1;
    }
    let prefix_base = (1 << 8) - (1 << (8 - l));
    let high_bits = value >> (8 * l);
    let prefix = prefix_base + high_bits;
    let suffix = value & ((1 << (8 * l)) - 1);

    let mut result = vec![0u8; 1 + l as usize];
    result[0] = prefix as u8;
    for (i, b) in result[1..].iter_mut().enumerate() {
        *b = (suffix >> (i * 8)) as u8;
    }
    result
}

pub(crate) fn read_le(data: &[u8], offset: usize, bytes: usize) -> Option<u32> {
    if offset + bytes > data.len() {
        return None;
    }
    let mut value: u32 = 0;
    for (i, &b) in data[offset..offset + bytes].iter().enumerate() {
        value |= u32::from(b) << (i * 8);
    }
    Some(value)
}

pub(crate) fn concat_bytes(slices: &[&[u8]]) -> Vec<u8> {
    let total = slices.iter().map(|s| s.len()).sum();
    let mut out = Vec::with_capacity(total);
    for s in slices {
        out.extend_from_slice(s);
    }
    out
}

// ============================================================================
// Fixed-length integers
// ============================================================================

/// Decode fixed-length little-endian value (1–8 bytes).
#[must_use]
pub fn decode_fixed_length(data: &[u8], length: i32) -> Option<DecodingResult<u64>> {
    let len = length as usize;
    if data.len() < len {
        return None;
    }
    let mut value: u64 = 0;
    for (i, &b) in data[..len].iter().enumerate() {
        value |= u64::from(b) << (i * 8);
    }
    Some(DecodingResult::new(value, length))
}

/// Decode fixed-length; reports `Truncated` specifically.
pub fn decode_fixed_length_checked(data: &[u8], length: i32) -> Result<DecodingResult<u64>, CodecError> {
    decode_fixed_length(data, length).ok_or(CodecError::Truncated)
}

/// Encode value as little-endian fixed length (1–8 bytes). Values wrap modulo 2^(8*length).
#[must_use]
pub fn encode_fixed_length(value: u64, length: i32) -> Vec<u8> {
    if length <= 0 {
        return vec![];
    }
    let wrapped = match length {
        1 => value % 256,
        2 => value % 65536,
        4 => value % 4_294_967_296,
        8 => value,
        _ => {
            let bits = (length as u32) * 8;
            if bits >= 64 {
                value
            } else {
                value % (1 << bits)
            }
        }
    };
    let bytes = length.min(8) as usize;
    let mut result = vec![0u8; length as usize];
    for (i, b) in result[..bytes].iter_mut().enumerate() {
        *b = (wrapped >> (i * 8)) as u8;
    }
    result
}

// ============================================================================
// Variable-length blob: natural(len) || bytes
// ============================================================================

/// Decode variable-length term: encode(len) || data.
#[must_use]
pub fn decode_variable_length(data: &[u8]) -> Option<DecodingResult<Vec<u8>>> {
    let length_result = decode_natural(data)?;
    let length = length_result.value as usize;
    let offset = length_result.consumed as usize;
    if data.len() < offset + length {
        return None;
    }
    let value = data[offset..offset + length].to_vec();
    Some(DecodingResult::new(value, (offset + length) as i32))
}

/// Decode variable-length blob; reports `Truncated` specifically.
pub fn decode_variable_length_checked(data: &[u8]) -> Result<DecodingResult<Vec<u8>>, CodecError> {
    let length_result = decode_natural_checked(data)?;
    let length = length_result.value as usize;
    let offset = length_result.consumed as usize;
    if data.len() < offset + length {
        return Err(CodecError::Truncated);
    }
    Ok(DecodingResult::new(
        data[offset..offset + length].to_vec(),
        (offset + length) as i32,
    ))
}

/// Encode a blob: natural(len) || bytes.
#[must_use]
pub fn encode_variable_length(bytes: &[u8]) -> Vec<u8> {
    let mut out = encode_natural(bytes.len() as u64);
    out.extend_from_slice(bytes);
    out
}

// ============================================================================
// Optional(T): 0x00 for none, 0x01 || encode(T) for some
// ============================================================================

/// Decode `Optional(T)` given an element decoder. Fails with `InvalidDiscriminant`
/// on any tag other than 0x00/0x01.
pub fn decode_optional<F, T>(data: &[u8], element_decoder: F) -> Result<DecodingResult<Option<T>>, CodecError>
where
    F: FnOnce(&[u8]) -> Result<DecodingResult<T>, CodecError>,
{
    match data.first() {
        None => Err(CodecError::Truncated),
        Some(0) => Ok(DecodingResult::new(None, 1)),
        Some(1) => {
            let inner = element_decoder(&data[1..])?;
            Ok(DecodingResult::new(Some(inner.value), 1 + inner.consumed))
        }
        Some(_) => Err(CodecError::InvalidDiscriminant),
    }
}

/// Encode `Optional(T)` given an element encoder.
pub fn encode_optional<T>(value: Option<&T>, element_encoder: impl FnOnce(&T) -> Vec<u8>) -> Vec<u8> {
    match value {
        None => vec![0],
        Some(v) => {
            let mut out = vec![1];
            out.extend_from_slice(&element_encoder(v));
            out
        }
    }
}

// ============================================================================
// Variable sequence: natural(count) || concat(element_i)
// ============================================================================

/// Decode variable-length sequence: encode(len) || element_0 || element_1 || ...
pub fn decode_variable_sequence<F, T>(data: &[u8], mut element_decoder: F) -> Option<DecodingResult<Vec<T>>>
where
    F: FnMut(&[u8]) -> Option<DecodingResult<T>>,
{
    let length_result = decode_natural(data)?;
    let length = length_result.value as i32;
    let mut current = &data[length_result.consumed as usize..];
    let mut result = Vec::with_capacity(length as usize);
    let start_len = data.len();

    for _ in 0..length {
        let element_result = element_decoder(current)?;
        result.push(element_result.value);
        current = current.get(element_result.consumed as usize..)?;
    }

    let consumed = start_len - current.len();
    Some(DecodingResult::new(result, consumed as i32))
}

/// Decode variable-length sequence reporting `CodecError` (element decoder likewise checked).
pub fn decode_variable_sequence_checked<F, T>(
    data: &[u8],
    mut element_decoder: F,
) -> Result<DecodingResult<Vec<T>>, CodecError>
where
    F: FnMut(&[u8]) -> Result<DecodingResult<T>, CodecError>,
{
    let length_result = decode_natural_checked(data)?;
    let length = length_result.value as usize;
    let mut current = data.get(length_result.consumed as usize..).ok_or(CodecError::Truncated)?;
    let mut result = Vec::with_capacity(length);
    let start_len = data.len();

    for _ in 0..length {
        let element_result = element_decoder(current)?;
        result.push(element_result.value);
        current = current
            .get(element_result.consumed as usize..)
            .ok_or(CodecError::Truncated)?;
    }

    let consumed = start_len - current.len();
    Ok(DecodingResult::new(result, consumed as i32))
}

/// Encode variable-length sequence of byte slices: encode(len) || encode(elem0) || ...
/// Each element encoded as var{bytes} = encode(len) || bytes.
#[must_use]
pub fn encode_variable_sequence(elements: &[Vec<u8>]) -> Vec<u8> {
    let len_enc = encode_natural(elements.len() as u64);
    let mut out = len_enc;
    for el in elements {
        out.extend_from_slice(&encode_natural(el.len() as u64));
        out.extend_from_slice(el);
    }
    out
}

/// Check that `keys` (already-decoded, in encounter order) are in strict ascending order.
/// Canonical encoders/decoders of maps/sets call this before accepting a sequence.
pub fn check_ascending<T: Ord>(keys: &[T]) -> Result<(), CodecError> {
    if keys.windows(2).any(|w| w[0] >= w[1]) {
        return Err(CodecError::OrderingViolation);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_edge_cases_match_spec() {
        assert_eq!(encode_natural(0), vec![0x00]);
        assert_eq!(encode_natural(127), vec![0x7f]);
        assert_eq!(encode_natural(128), vec![0x80, 0x80]);
        let mut max = vec![0xff];
        max.extend_from_slice(&[0xff; 8]);
        assert_eq!(encode_natural(u64::MAX), max);
    }

    #[test]
    fn natural_round_trips() {
        for v in [0u64, 1, 127, 128, 300, 1 << 20, 1 << 40, u64::MAX] {
            let enc = encode_natural(v);
            let dec = decode_natural_checked(&enc).unwrap();
            assert_eq!(dec.value, v);
            assert_eq!(dec.consumed as usize, enc.len());
        }
    }

    #[test]
    fn natural_rejects_non_canonical_prefix() {
        // 127 canonically encodes as [0x7f]; [0x80, 0x7f] uses a longer prefix than necessary.
        assert_eq!(
            decode_natural_checked(&[0x80, 0x7f]),
            Err(CodecError::OrderingViolation)
        );
        assert_eq!(
            decode_natural_checked(&[0x80, 0x00]),
            Err(CodecError::OrderingViolation)
        );
    }

    #[test]
    fn natural_rejects_truncated_input() {
        assert_eq!(decode_natural_checked(&[0x80]), Err(CodecError::Truncated));
        assert_eq!(decode_natural_checked(&[]), Err(CodecError::Truncated));
    }

    #[test]
    fn optional_round_trips() {
        let none: Option<u64> = None;
        let enc_none = encode_optional(none.as_ref(), |v| encode_natural(*v));
        assert_eq!(enc_none, vec![0x00]);
        let some = Some(42u64);
        let enc_some = encode_optional(some.as_ref(), |v| encode_natural(*v));
        let decoded = decode_optional(&enc_some, |d| {
            decode_natural_checked(d).map(|r| DecodingResult::new(r.value, r.consumed))
        })
        .unwrap();
        assert_eq!(decoded.value, Some(42));
    }

    #[test]
    fn optional_rejects_bad_discriminant() {
        let err = decode_optional(&[2], |d: &[u8]| {
            decode_natural_checked(d).map(|r| DecodingResult::new(r.value, r.consumed))
        })
        .unwrap_err();
        assert_eq!(err, CodecError::InvalidDiscriminant);
    }

    #[test]
    fn ascending_check_detects_violation() {
        assert!(check_ascending(&[1, 2, 3]).is_ok());
        assert_eq!(check_ascending(&[1, 3, 2]), Err(CodecError::OrderingViolation));
        assert_eq!(check_ascending(&[1, 1]), Err(CodecError::OrderingViolation));
    }
}
