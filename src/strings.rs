//! Coalescing of indefinite-length strings.

use crate::allocator::{AllocHandle, StringAllocator};
use crate::atomic::{decode_atom, Atom};
use crate::item::{Span, Value};
use crate::{CborError, Decoder, ErrorCode};

impl<'a> Decoder<'a> {
    /// The next atom, with an indefinite-length string assembled into one allocated span.
    pub(crate) fn next_full_atom(
        &mut self,
        soft: &mut Option<CborError>,
    ) -> Result<Atom<'a>, CborError> {
        let off = self.cursor.tell();
        let alloc: Option<&mut dyn StringAllocator> = match self.allocator.as_mut() {
            Some(a) if self.allocate_all => Some(&mut **a),
            _ => None,
        };
        match decode_atom(&mut self.cursor, &self.rules, alloc, soft)? {
            Atom::IndefiniteString { text } => {
                let span = self.assemble_chunks(text, off, soft)?;
                Ok(Atom::Value(if text {
                    Value::Text(span)
                } else {
                    Value::Bytes(span)
                }))
            }
            atom => Ok(atom),
        }
    }

    /// Append definite chunks of the same kind until `break`; partial storage is freed on error.
    ///
    /// The assembled length is held to the same cap as a definite-length string.
    fn assemble_chunks(
        &mut self,
        text: bool,
        off: usize,
        soft: &mut Option<CborError>,
    ) -> Result<Span<'a>, CborError> {
        let max_len = self.rules.limits.max_string_len;
        let Some(alloc) = self.allocator.as_mut() else {
            return Err(CborError::new(ErrorCode::NoStringAllocator, off));
        };

        let mut handle: Option<AllocHandle> = None;
        let result = loop {
            let chunk_off = self.cursor.tell();
            let chunk = match decode_atom(&mut self.cursor, &self.rules, None, soft) {
                Ok(chunk) => chunk,
                Err(err) => break Err(err),
            };
            let bytes = match chunk {
                Atom::Break => break Ok(()),
                Atom::Value(Value::Text(Span::Borrowed(b))) if text => b,
                Atom::Value(Value::Bytes(Span::Borrowed(b))) if !text => b,
                _ => break Err(CborError::new(ErrorCode::IndefiniteStringChunk, chunk_off)),
            };

            let old_len = handle.map_or(0, |h| h.len());
            let Some(new_len) = old_len
                .checked_add(bytes.len())
                .filter(|&len| len <= max_len)
            else {
                break Err(CborError::new(ErrorCode::StringTooLong, chunk_off));
            };
            let grown = match handle {
                None => alloc.allocate(new_len),
                Some(h) => alloc.reallocate(h, new_len),
            };
            let Some(grown) = grown else {
                break Err(CborError::new(ErrorCode::StringAllocateFailed, chunk_off));
            };
            if let Some(dst) = alloc.bytes_mut(grown).get_mut(old_len..) {
                dst.copy_from_slice(bytes);
            }
            handle = Some(grown);
        };

        match result {
            Ok(()) => {
                let handle = match handle {
                    Some(h) => h,
                    None => alloc
                        .allocate(0)
                        .ok_or_else(|| CborError::new(ErrorCode::StringAllocateFailed, off))?,
                };
                Ok(Span::Allocated(handle))
            }
            Err(err) => {
                if let Some(h) = handle {
                    alloc.free(h);
                }
                Err(err)
            }
        }
    }
}
