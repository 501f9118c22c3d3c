//! Decoding of exactly one CBOR head plus its immediate content.

use half::f16;

use crate::allocator::StringAllocator;
use crate::cursor::InputCursor;
use crate::item::{Count, Span, Value};
use crate::limits::DecodeLimits;
use crate::mode::DecodeMode;
use crate::{CborError, ErrorCode};

const MAJOR_UINT: u8 = 0;
const MAJOR_NINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;

const AI_INDEFINITE: u8 = 31;

pub(crate) const BREAK_BYTE: u8 = 0xff;

/// One atomic unit of the input.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Atom<'a> {
    Value(Value<'a>),
    Tag(u64),
    Break,
    IndefiniteString { text: bool },
}

/// Settings that shape how atoms decode.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AtomRules {
    pub mode: DecodeMode,
    pub limits: DecodeLimits,
}

impl AtomRules {
    const fn preferred_numbers(&self) -> bool {
        self.mode.contains(DecodeMode::ONLY_PREFERRED_NUMBERS)
    }
}

/// Record a recoverable error; the latest one wins.
fn note(soft: &mut Option<CborError>, code: ErrorCode, offset: usize) {
    *soft = Some(CborError::new(code, offset));
}

/// Reads the argument for additional info 0..=27.
fn read_argument(
    cursor: &mut InputCursor<'_>,
    ai: u8,
    off: usize,
    rules: &AtomRules,
    soft: &mut Option<CborError>,
) -> Result<u64, CborError> {
    let (value, shortest) = match ai {
        0..=23 => return Ok(u64::from(ai)),
        24 => {
            let v = u64::from(cursor.read_u8()?);
            (v, v >= 24)
        }
        25 => {
            let v = u64::from(cursor.read_be_u16()?);
            (v, v > 0xff)
        }
        26 => {
            let v = u64::from(cursor.read_be_u32()?);
            (v, v > 0xffff)
        }
        27 => {
            let v = cursor.read_be_u64()?;
            (v, v > 0xffff_ffff)
        }
        _ => return Err(CborError::new(ErrorCode::Unsupported, off)),
    };
    if !shortest && rules.preferred_numbers() {
        note(soft, ErrorCode::PreferredConformance, off);
    }
    Ok(value)
}

/// Decode the atom at the cursor.
///
/// With `alloc` set, definite-length strings are copied into the allocator ("allocate all").
/// Recoverable conformance problems are written to `soft`; the atom is still returned.
pub(crate) fn decode_atom<'a>(
    cursor: &mut InputCursor<'a>,
    rules: &AtomRules,
    alloc: Option<&mut dyn StringAllocator>,
    soft: &mut Option<CborError>,
) -> Result<Atom<'a>, CborError> {
    let off = cursor.tell();
    let ib = cursor.read_u8()?;
    let major = ib >> 5;
    let ai = ib & 0x1f;

    match major {
        MAJOR_UINT | MAJOR_NINT => {
            if ai == AI_INDEFINITE {
                return Err(CborError::new(ErrorCode::BadInt, off));
            }
            let n = read_argument(cursor, ai, off, rules, soft)?;
            Ok(Atom::Value(integer_value(major, n)))
        }
        MAJOR_BYTES | MAJOR_TEXT => {
            let text = major == MAJOR_TEXT;
            if ai == AI_INDEFINITE {
                forbid_indefinite(rules, off)?;
                return Ok(Atom::IndefiniteString { text });
            }
            let len = read_argument(cursor, ai, off, rules, soft)?;
            let span = read_string(cursor, len, off, rules, alloc)?;
            Ok(Atom::Value(if text {
                Value::Text(span)
            } else {
                Value::Bytes(span)
            }))
        }
        MAJOR_ARRAY | MAJOR_MAP => {
            let count = if ai == AI_INDEFINITE {
                forbid_indefinite(rules, off)?;
                Count::Indefinite
            } else {
                let n = read_argument(cursor, ai, off, rules, soft)?;
                Count::Definite(container_len(major, n, off, rules)?)
            };
            Ok(Atom::Value(if major == MAJOR_ARRAY {
                Value::Array(count)
            } else if rules.mode.contains(DecodeMode::MAP_AS_ARRAY) {
                Value::MapAsArray(match count {
                    Count::Definite(n) => Count::Definite(n * 2),
                    Count::Indefinite => Count::Indefinite,
                })
            } else {
                Value::Map(count)
            }))
        }
        MAJOR_TAG => {
            if ai == AI_INDEFINITE {
                return Err(CborError::new(ErrorCode::BadInt, off));
            }
            Ok(Atom::Tag(read_argument(cursor, ai, off, rules, soft)?))
        }
        _ => decode_simple_or_float(cursor, ai, off, rules, soft),
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn integer_value(major: u8, n: u64) -> Value<'static> {
    if major == MAJOR_UINT {
        if n <= i64::MAX as u64 {
            Value::Int(n as i64)
        } else {
            Value::UInt(n)
        }
    } else if n <= i64::MAX as u64 {
        Value::Int(-1 - n as i64)
    } else {
        Value::NegativeBig(n)
    }
}

fn forbid_indefinite(rules: &AtomRules, off: usize) -> Result<(), CborError> {
    if rules.mode.contains(DecodeMode::NO_INDEFINITE_LENGTH) {
        return Err(CborError::new(ErrorCode::IndefiniteLengthForbidden, off));
    }
    Ok(())
}

fn container_len(major: u8, n: u64, off: usize, rules: &AtomRules) -> Result<u32, CborError> {
    let limit = if major == MAJOR_ARRAY {
        rules.limits.max_array_len
    } else if rules.mode.contains(DecodeMode::MAP_AS_ARRAY) {
        rules.limits.max_array_len / 2
    } else {
        rules.limits.max_map_len
    };
    match usize::try_from(n) {
        Ok(len) if len <= limit => {
            u32::try_from(len).map_err(|_| CborError::new(ErrorCode::ArrayTooLong, off))
        }
        _ => Err(CborError::new(ErrorCode::ArrayTooLong, off)),
    }
}

fn read_string<'a>(
    cursor: &mut InputCursor<'a>,
    len: u64,
    off: usize,
    rules: &AtomRules,
    alloc: Option<&mut dyn StringAllocator>,
) -> Result<Span<'a>, CborError> {
    let len = match usize::try_from(len) {
        Ok(len) if len <= rules.limits.max_string_len => len,
        _ => return Err(CborError::new(ErrorCode::StringTooLong, off)),
    };
    let bytes = cursor.read_exact(len)?;
    match alloc {
        None => Ok(Span::Borrowed(bytes)),
        Some(alloc) => {
            let handle = alloc
                .allocate(len)
                .ok_or_else(|| CborError::new(ErrorCode::StringAllocateFailed, off))?;
            alloc.bytes_mut(handle).copy_from_slice(bytes);
            Ok(Span::Allocated(handle))
        }
    }
}

fn decode_simple_or_float<'a>(
    cursor: &mut InputCursor<'a>,
    ai: u8,
    off: usize,
    rules: &AtomRules,
    soft: &mut Option<CborError>,
) -> Result<Atom<'a>, CborError> {
    let dcbor_simples = rules.mode.contains(DecodeMode::DISALLOW_DCBOR_SIMPLES);
    let value = match ai {
        0..=19 => {
            if dcbor_simples {
                note(soft, ErrorCode::DisallowedSimple, off);
            }
            Value::Simple(ai)
        }
        20 => Value::Bool(false),
        21 => Value::Bool(true),
        22 => Value::Null,
        23 => {
            if dcbor_simples {
                note(soft, ErrorCode::DisallowedSimple, off);
            }
            Value::Undefined
        }
        24 => {
            let v = cursor.read_u8()?;
            if v < 32 {
                return Err(CborError::new(ErrorCode::BadType7, off));
            }
            if dcbor_simples {
                note(soft, ErrorCode::DisallowedSimple, off);
            }
            Value::Simple(v)
        }
        25 => {
            let bits = cursor.read_be_u16()?;
            let v = f16::from_bits(bits).to_f64();
            if rules.mode.contains(DecodeMode::ONLY_REDUCED_FLOATS) && !is_reduced(v, Some(bits)) {
                note(soft, ErrorCode::DcborConformance, off);
            }
            Value::Double(v)
        }
        26 => {
            let v = f32::from_bits(cursor.read_be_u32()?);
            if rules.preferred_numbers() && single_fits_half(v) {
                note(soft, ErrorCode::PreferredConformance, off);
            }
            if rules.mode.contains(DecodeMode::ONLY_REDUCED_FLOATS) && !is_reduced(f64::from(v), None) {
                note(soft, ErrorCode::DcborConformance, off);
            }
            Value::Float(v)
        }
        27 => {
            let v = f64::from_bits(cursor.read_be_u64()?);
            if rules.preferred_numbers() && double_fits_single(v) {
                note(soft, ErrorCode::PreferredConformance, off);
            }
            if rules.mode.contains(DecodeMode::ONLY_REDUCED_FLOATS) && !is_reduced(v, None) {
                note(soft, ErrorCode::DcborConformance, off);
            }
            Value::Double(v)
        }
        28..=30 => return Err(CborError::new(ErrorCode::Unsupported, off)),
        _ => return Ok(Atom::Break),
    };
    Ok(Atom::Value(value))
}

/// True if `v` survives a round trip through binary16 unchanged.
fn single_fits_half(v: f32) -> bool {
    if v.is_nan() {
        return v.to_bits() & 0x1fff == 0;
    }
    f16::from_f32(v).to_f32().to_bits() == v.to_bits()
}

/// True if `v` survives a round trip through binary32 unchanged.
#[allow(clippy::cast_possible_truncation)]
fn double_fits_single(v: f64) -> bool {
    if v.is_nan() {
        return v.to_bits() & 0x1fff_ffff == 0;
    }
    f64::from(v as f32).to_bits() == v.to_bits()
}

/// dCBOR: integral floats must be integers and the only NaN is half-precision `0x7e00`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn is_reduced(v: f64, half_bits: Option<u16>) -> bool {
    if v.is_nan() {
        return half_bits == Some(0x7e00);
    }
    if v.is_infinite() {
        return true;
    }
    let integral = if v < 0.0 {
        v >= -9_223_372_036_854_775_808.0 && (v as i64) as f64 == v
    } else {
        v < 18_446_744_073_709_551_616.0 && (v as u64) as f64 == v
    };
    !integral
}

/// Skip one complete data item without interpreting it, tags and indefinite lengths included.
///
/// Used where only the encoded extent matters (sorted-map checks, tag-number lookahead). The
/// explicit stack bounds depth by `max_depth`.
pub(crate) fn skip_raw(cursor: &mut InputCursor<'_>, max_depth: usize) -> Result<(), CborError> {
    let rules = AtomRules {
        mode: DecodeMode::NORMAL,
        limits: DecodeLimits::default(),
    };
    // Remaining members per open container; `None` is indefinite.
    let mut stack: [Option<u64>; crate::limits::MAX_NESTING + 1] =
        [None; crate::limits::MAX_NESTING + 1];
    let mut depth = 0usize;
    let mut soft = None;

    loop {
        let off = cursor.tell();
        let atom = decode_atom(cursor, &rules, None, &mut soft)?;
        let mut completed = true;
        match atom {
            Atom::Tag(_) => continue,
            Atom::Break => {
                if depth == 0 || stack[depth - 1].is_some() {
                    return Err(CborError::new(ErrorCode::BadBreak, off));
                }
                depth -= 1;
            }
            Atom::IndefiniteString { text } => skip_chunks(cursor, text, &rules)?,
            Atom::Value(value) => {
                let members = match value {
                    Value::Array(c) => Some(c.members(1)),
                    Value::Map(c) => Some(c.members(2)),
                    _ => None,
                };
                match members {
                    Some(Some(0)) | None => {}
                    Some(members) => {
                        if depth >= max_depth.min(stack.len()) {
                            return Err(CborError::new(ErrorCode::NestingTooDeep, off));
                        }
                        stack[depth] = members;
                        depth += 1;
                        completed = false;
                    }
                }
            }
        }

        if completed {
            while depth > 0 {
                match &mut stack[depth - 1] {
                    Some(n) => {
                        *n -= 1;
                        if *n == 0 {
                            depth -= 1;
                            continue;
                        }
                    }
                    None => {}
                }
                break;
            }
        }
        if depth == 0 && completed {
            return Ok(());
        }
    }
}

fn skip_chunks(cursor: &mut InputCursor<'_>, text: bool, rules: &AtomRules) -> Result<(), CborError> {
    let mut soft = None;
    loop {
        let off = cursor.tell();
        match decode_atom(cursor, rules, None, &mut soft)? {
            Atom::Break => return Ok(()),
            Atom::Value(Value::Text(_)) if text => {}
            Atom::Value(Value::Bytes(_)) if !text => {}
            _ => return Err(CborError::new(ErrorCode::IndefiniteStringChunk, off)),
        }
    }
}

impl Count {
    /// Member count for skipping: items times `per_entry`, `None` when indefinite.
    const fn members(self, per_entry: u64) -> Option<u64> {
        match self {
            Self::Definite(n) => Some(n as u64 * per_entry),
            Self::Indefinite => None,
        }
    }
}
