//! The decode context and its layered item pipeline.
//!
//! Each layer pulls from the one below it:
//! atoms ([`crate::atomic`]) → indefinite strings ([`crate::strings`]) → tag numbers →
//! map entries → nesting bookkeeping → tag content ([`crate::tag_content`]).

use defmt_or_log::{debug, trace};

use crate::allocator::StringAllocator;
use crate::atomic::{decode_atom, skip_raw, Atom, AtomRules, BREAK_BYTE};
use crate::cursor::InputCursor;
use crate::item::{Count, DecodedItem, Label, Span, TagList, Value};
use crate::limits::DecodeLimits;
use crate::mode::DecodeMode;
use crate::nesting::{BoundedKind, ContainerKind, Nesting, Remaining};
use crate::tag_content::{TagDecoderEntry, STANDARD_TAG_DECODERS};
use crate::tags::TagMap;
use crate::utf8;
use crate::TagRequirement;
use crate::{CborError, ErrorCode};

/// An item plus the recoverable error found while fetching it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fetched<'a> {
    pub item: DecodedItem<'a>,
    pub soft: Option<CborError>,
    /// Offset of the entry (label included) in the input.
    pub start: usize,
}

impl<'a> Fetched<'a> {
    pub(crate) fn into_result(self) -> Result<DecodedItem<'a>, CborError> {
        match self.soft {
            Some(err) => Err(err),
            None => Ok(self.item),
        }
    }
}

/// Tag numbers of the item at `offset` already handed out by `next_tag_number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TagCursor {
    pub offset: usize,
    pub consumed: usize,
}

/// Cursor and nesting state, restored after lookahead.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Snapshot<'a> {
    cursor: InputCursor<'a>,
    nesting: Nesting,
    tag_cursor: Option<TagCursor>,
}

/// A CBOR decode context.
///
/// Every operation returns a `Result`; see [`crate::CheckedDecoder`] for the sticky-error
/// variant. A decoder is single-threaded and borrows its input for `'a`.
pub struct Decoder<'a> {
    pub(crate) cursor: InputCursor<'a>,
    pub(crate) nesting: Nesting,
    pub(crate) rules: AtomRules,
    pub(crate) tag_map: TagMap,
    pub(crate) tag_decoders: &'a [TagDecoderEntry<'a>],
    pub(crate) allocator: Option<&'a mut dyn StringAllocator>,
    pub(crate) allocate_all: bool,
    /// End offset of the bounded level, from the last map search.
    pub(crate) map_end: Option<usize>,
    pub(crate) tag_cursor: Option<TagCursor>,
}

impl core::fmt::Debug for Decoder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Decoder")
            .field("offset", &self.cursor.tell())
            .field("nesting", &self.nesting)
            .field("mode", &self.rules.mode)
            .field("allocator", &self.allocator.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> Decoder<'a> {
    /// Create a decoder over `input` with default limits.
    ///
    /// # Errors
    ///
    /// Returns `InputTooLarge` if `input` exceeds the maximum input size.
    pub fn new(input: &'a [u8], mode: DecodeMode) -> Result<Self, CborError> {
        Self::with_limits(input, mode, DecodeLimits::default())
    }

    /// Create a decoder with explicit limits.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLimits` if `limits` exceed the compile-time maxima, and `InputTooLarge`
    /// if `input` is longer than `limits.max_input_bytes`.
    pub fn with_limits(
        input: &'a [u8],
        mode: DecodeMode,
        limits: DecodeLimits,
    ) -> Result<Self, CborError> {
        limits.validate()?;
        if input.len() > limits.max_input_bytes {
            return Err(CborError::new(ErrorCode::InputTooLarge, 0));
        }
        trace!("decoder init: {} bytes, mode {}", input.len(), mode.bits());
        Ok(Self {
            cursor: InputCursor::new(input),
            nesting: Nesting::new(limits.max_depth, input.len()),
            rules: AtomRules { mode, limits },
            tag_map: TagMap::new(),
            tag_decoders: STANDARD_TAG_DECODERS,
            allocator: None,
            allocate_all: false,
            map_end: None,
            tag_cursor: None,
        })
    }

    /// Install a string allocator.
    ///
    /// Indefinite-length strings require one. With `allocate_all`, every definite-length string
    /// is copied into the allocator as well.
    pub fn set_allocator(&mut self, allocator: &'a mut dyn StringAllocator, allocate_all: bool) {
        self.allocator = Some(allocator);
        self.allocate_all = allocate_all;
    }

    /// Replace the tag-content decoder table. The first matching entry wins.
    pub fn set_tag_decoders(&mut self, table: &'a [TagDecoderEntry<'a>]) {
        self.tag_decoders = table;
    }

    /// The decode mode.
    #[must_use]
    pub const fn mode(&self) -> DecodeMode {
        self.rules.mode
    }

    /// Offset of the next unread byte.
    #[must_use]
    pub const fn tell(&self) -> usize {
        self.cursor.tell()
    }

    /// Bytes of a span: borrowed input or allocator storage.
    ///
    /// Allocated spans resolve to an empty slice when no allocator is installed.
    #[must_use]
    pub fn bytes<'s>(&'s self, span: &Span<'a>) -> &'s [u8] {
        match span {
            Span::Borrowed(b) => *b,
            Span::Allocated(h) => self
                .allocator
                .as_deref()
                .map_or(&[] as &[u8], |a| a.bytes(*h)),
        }
    }

    /// A text span as `&str`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUtf8` if the bytes are not UTF-8.
    pub fn text<'s>(&'s self, span: &Span<'a>) -> Result<&'s str, CborError> {
        let bytes = self.bytes(span);
        utf8::as_text(bytes).ok_or_else(|| {
            let offset = self.cursor.offset_of(bytes).unwrap_or(0);
            CborError::new(ErrorCode::InvalidUtf8, offset)
        })
    }

    pub(crate) const fn snapshot(&self) -> Snapshot<'a> {
        Snapshot {
            cursor: self.cursor,
            nesting: self.nesting,
            tag_cursor: self.tag_cursor,
        }
    }

    pub(crate) fn restore(&mut self, snapshot: Snapshot<'a>) {
        self.cursor = snapshot.cursor;
        self.nesting = snapshot.nesting;
        self.tag_cursor = snapshot.tag_cursor;
    }

    pub(crate) const fn mode_has(&self, flag: DecodeMode) -> bool {
        self.rules.mode.contains(flag)
    }

    /// One item with its tag numbers collected.
    fn next_tagged(&mut self) -> Result<Fetched<'a>, CborError> {
        let start = self.cursor.tell();
        let mut soft = None;
        let mut tags = TagList::new();
        let mut limit_err = None;

        loop {
            let off = self.cursor.tell();
            match self.next_full_atom(&mut soft)? {
                Atom::Tag(number) => match self.tag_map.map(number, off) {
                    Ok(id) => {
                        if !tags.push(id) {
                            limit_err.get_or_insert(CborError::new(
                                ErrorCode::TooManyTagsPerItem,
                                off,
                            ));
                        }
                    }
                    Err(err) => {
                        limit_err.get_or_insert(err);
                    }
                },
                Atom::Break => return Err(CborError::new(ErrorCode::BadBreak, off)),
                Atom::IndefiniteString { .. } => {
                    return Err(CborError::new(ErrorCode::IndefiniteStringChunk, off))
                }
                Atom::Value(value) => {
                    if let Some(err) = limit_err {
                        return Err(err);
                    }
                    let mut item = DecodedItem::with_value(value);
                    item.tags = tags;
                    return Ok(Fetched { item, soft, start });
                }
            }
        }
    }

    /// Pairs label and value when the current level is a map.
    fn next_map_entry(&mut self) -> Result<Fetched<'a>, CborError> {
        if self.nesting.current_kind() != Some(ContainerKind::Map) {
            return self.next_tagged();
        }

        let label = self.next_tagged()?;
        if label.item.value.container_count().is_some() {
            return Err(CborError::new(ErrorCode::ContainerLabel, label.start));
        }
        let mut value = self.next_tagged()?;
        let (converted, label_err) = self.convert_label(&label);
        value.item.label = converted;
        value.soft = value.soft.or(label.soft).or(label_err);
        value.start = label.start;
        Ok(value)
    }

    fn convert_label(&self, label: &Fetched<'a>) -> (Label<'a>, Option<CborError>) {
        let bad = Some(CborError::new(ErrorCode::MapLabelType, label.start));
        let strings_only = self.mode_has(DecodeMode::MAP_STRINGS_ONLY);
        let mut err = None;
        let converted = match label.item.value {
            Value::Text(s) => Label::Text(s),
            Value::Int(i) => {
                err = if strings_only { bad } else { None };
                Label::Int(i)
            }
            Value::UInt(u) => {
                err = if strings_only { bad } else { None };
                Label::UInt(u)
            }
            Value::Bytes(s) => {
                err = if strings_only { bad } else { None };
                Label::Bytes(s)
            }
            other => {
                if strings_only || !self.mode_has(DecodeMode::ANY_LABEL_TYPES) {
                    err = bad;
                }
                Label::Other(other)
            }
        };
        if err.is_none()
            && !label.item.tags.is_empty()
            && !self.mode_has(DecodeMode::ALLOW_UNPROCESSED_TAG_NUMBERS)
        {
            err = Some(CborError::new(ErrorCode::UnprocessedTagNumber, label.start));
        }
        (converted, err)
    }

    /// The traversal engine: one entry with nesting levels applied.
    pub(crate) fn next_structural(&mut self) -> Result<Fetched<'a>, CborError> {
        if self.nesting.is_at_end_of_bounded() {
            return Err(CborError::new(ErrorCode::NoMoreItems, self.cursor.tell()));
        }
        if self.cursor.remaining() == 0 {
            let code = if self.nesting.current_is_wrapped() {
                ErrorCode::NoMoreItems
            } else {
                ErrorCode::HitEnd
            };
            return Err(CborError::new(code, self.cursor.tell()));
        }

        let mut fetched = self.next_map_entry()?;
        fetched.item.nest_level = self.nesting.current_level();

        let container = match fetched.item.value {
            Value::Array(c) => Some((ContainerKind::Array, c)),
            Value::Map(c) => Some((ContainerKind::Map, c)),
            Value::MapAsArray(c) => Some((ContainerKind::MapAsArray, c)),
            _ => None,
        };

        if let Some((kind, count)) = container {
            if kind != ContainerKind::Array
                && self.mode_has(DecodeMode::ONLY_SORTED_MAPS)
                && fetched.soft.is_none()
            {
                fetched.soft = self.check_map_order(kind, count)?;
            }
            if let Err(err) = self.nesting.descend_container(kind, count, fetched.start) {
                debug!("nesting limit exceeded at {}", fetched.start);
                return Err(err);
            }
        }

        let opened = matches!(container, Some((_, Count::Definite(n))) if n > 0);
        if !opened {
            self.ascend_closed_levels();
        }

        fetched.item.next_nest_level = self.next_level();
        Ok(fetched)
    }

    /// Nest level of the item at the cursor; 0 at the end of the bounded level.
    pub(crate) fn next_level(&self) -> u8 {
        if self.nesting.is_at_end_of_bounded() {
            0
        } else {
            self.nesting.current_level()
        }
    }

    /// Full pipeline: traversal plus tag-content resolution.
    pub(crate) fn next_resolved(&mut self) -> Result<Fetched<'a>, CborError> {
        let mut fetched = self.next_structural()?;
        self.resolve_tag_content(&mut fetched)?;
        Ok(fetched)
    }

    /// Close every level whose last item was just consumed.
    ///
    /// Stops at wrapped levels and at bounded levels, which are marked "at end" instead of
    /// popped.
    pub(crate) fn ascend_closed_levels(&mut self) {
        loop {
            if self.nesting.current_is_wrapped() {
                break;
            }
            let closed = match (self.nesting.current_total(), self.nesting.current_remaining()) {
                (_, Some(Remaining::Empty)) => true,
                (Some(Remaining::Indefinite), Some(Remaining::Indefinite)) => {
                    self.consume_break()
                }
                (Some(Remaining::Indefinite), Some(Remaining::Items(_))) => true,
                _ => self.nesting.decrement(),
            };
            if !closed {
                break;
            }
            if self.nesting.current_is_bounded() {
                if self.nesting.current_remaining() != Some(Remaining::Empty) {
                    self.nesting.set_current_remaining(Remaining::Items(0));
                }
                break;
            }
            self.nesting.ascend();
        }
    }

    fn consume_break(&mut self) -> bool {
        if self.cursor.peek_u8() == Some(BREAK_BYTE) {
            self.cursor.seek(self.cursor.tell() + 1);
            true
        } else {
            false
        }
    }

    /// Encoded labels of the map at the cursor must be strictly increasing bytewise.
    fn check_map_order(
        &self,
        kind: ContainerKind,
        count: Count,
    ) -> Result<Option<CborError>, CborError> {
        let mut cur = self.cursor;
        let data = cur.data();
        let depth = self.rules.limits.max_depth;
        let pairs = match count {
            Count::Definite(n) if kind == ContainerKind::MapAsArray => Some(n / 2),
            Count::Definite(n) => Some(n),
            Count::Indefinite => None,
        };

        let mut prev: Option<&[u8]> = None;
        let mut seen = 0u32;
        loop {
            match pairs {
                Some(p) if seen == p => break,
                None if cur.peek_u8() == Some(BREAK_BYTE) => break,
                _ => {}
            }
            let start = cur.tell();
            skip_raw(&mut cur, depth)?;
            let label = &data[start..cur.tell()];
            if let Some(prev) = prev {
                match prev.cmp(label) {
                    core::cmp::Ordering::Less => {}
                    core::cmp::Ordering::Equal => {
                        return Ok(Some(CborError::new(ErrorCode::DuplicateLabel, start)))
                    }
                    core::cmp::Ordering::Greater => {
                        return Ok(Some(CborError::new(ErrorCode::UnsortedMap, start)))
                    }
                }
            }
            prev = Some(label);
            skip_raw(&mut cur, depth)?;
            seen += 1;
        }
        Ok(None)
    }

    /// Get the next item in pre-order.
    ///
    /// Containers are returned as headers; their members follow. Compare `nest_level` and
    /// `next_nest_level` to see where containers close.
    ///
    /// # Errors
    ///
    /// Returns `NoMoreItems` at the end of the input or of the entered level, a not-well-formed
    /// code for malformed input, or a recoverable code for invalid content. After a recoverable
    /// error traversal may continue with the next item.
    pub fn next_item(&mut self) -> Result<DecodedItem<'a>, CborError> {
        self.next_resolved()?.into_result()
    }

    /// Get the next item without consuming it.
    ///
    /// Strings copied into an allocator while peeking stay allocated.
    ///
    /// # Errors
    ///
    /// Same as [`Decoder::next_item`].
    pub fn peek_item(&mut self) -> Result<DecodedItem<'a>, CborError> {
        let snapshot = self.snapshot();
        let result = self.next_item();
        self.restore(snapshot);
        result
    }

    /// Get the next item and skip its members if it is a container.
    ///
    /// # Errors
    ///
    /// Same as [`Decoder::next_item`]; errors inside the skipped members are reported only
    /// when unrecoverable.
    pub fn next_consume(&mut self) -> Result<DecodedItem<'a>, CborError> {
        let fetched = self.next_resolved()?;
        let mut item = fetched.item;
        item.next_nest_level = self.consume_rest(&item)?;
        Fetched { item, ..fetched }.into_result()
    }

    /// Skip the members of `item` if it is an open container; returns the next nest level.
    pub(crate) fn consume_rest(&mut self, item: &DecodedItem<'a>) -> Result<u8, CborError> {
        if !item.is_open_container() {
            return Ok(item.next_nest_level);
        }
        loop {
            let next = self.next_structural()?.item.next_nest_level;
            if next < item.next_nest_level {
                return Ok(next);
            }
        }
    }

    /// Return the next tag number of the upcoming item, outermost first.
    ///
    /// Tag numbers returned here are consumed: the item itself will not carry them and no
    /// content decoder runs for them. Returns `None` once all of the item's tag numbers were
    /// returned, or when the next item has none.
    ///
    /// # Errors
    ///
    /// Returns a not-well-formed code if the lookahead hits malformed input.
    pub fn next_tag_number(&mut self) -> Result<Option<u64>, CborError> {
        let start = self.cursor.tell();
        if self.nesting.is_at_end_of_bounded() || self.cursor.remaining() == 0 {
            return Ok(None);
        }
        let consumed = match self.tag_cursor {
            Some(tc) if tc.offset == start => tc.consumed,
            _ => 0,
        };

        let mut cur = self.cursor;
        if self.nesting.current_kind() == Some(ContainerKind::Map) {
            skip_raw(&mut cur, self.rules.limits.max_depth)?;
        }
        let mut soft = None;
        let mut seen = 0;
        while let Atom::Tag(number) = decode_atom(&mut cur, &self.rules, None, &mut soft)? {
            if seen == consumed {
                self.tag_cursor = Some(TagCursor {
                    offset: start,
                    consumed: consumed + 1,
                });
                return Ok(Some(number));
            }
            seen += 1;
        }
        Ok(None)
    }

    /// The `n`-th remaining tag number of `item`, outermost first.
    #[must_use]
    pub fn tag_number(&self, item: &DecodedItem<'a>, n: usize) -> Option<u64> {
        self.tag_map.unmap(item.tags.get(n)?)
    }

    /// Enter the byte string at the cursor as embedded CBOR.
    ///
    /// Afterwards the cursor only sees the string's contents, which may hold a CBOR sequence.
    /// Returns the wrapped bytes.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` if the item does not satisfy `requirement`,
    /// `CannotEnterAllocatedString` for strings copied into an allocator, and
    /// `NestingTooDeep` when the nesting stack is full.
    pub fn enter_bstr_wrapped(
        &mut self,
        requirement: TagRequirement,
    ) -> Result<&'a [u8], CborError> {
        let before = self.nesting;
        let item = self.next_item()?;
        self.enter_bstr_item(&item, requirement, before)
    }

    /// Enter `item`, just fetched with `before` as the nesting state.
    ///
    /// The enclosing level is put back to `before` so that its count (or pending `break`) is
    /// handled again when the region is exited.
    pub(crate) fn enter_bstr_item(
        &mut self,
        item: &DecodedItem<'a>,
        requirement: TagRequirement,
        before: Nesting,
    ) -> Result<&'a [u8], CborError> {
        let off = self.cursor.tell();
        let span = match (item.value, requirement) {
            (Value::WrappedCbor(s) | Value::WrappedCborSequence(s), TagRequirement::Tag)
            | (
                Value::WrappedCbor(s) | Value::WrappedCborSequence(s) | Value::Bytes(s),
                TagRequirement::Optional,
            )
            | (Value::Bytes(s), TagRequirement::NotATag) => s,
            _ => return Err(CborError::new(ErrorCode::UnexpectedType, off)),
        };
        let Span::Borrowed(bytes) = span else {
            return Err(CborError::new(ErrorCode::CannotEnterAllocatedString, off));
        };
        let start = self
            .cursor
            .offset_of(bytes)
            .ok_or_else(|| CborError::new(ErrorCode::CannotEnterAllocatedString, off))?;

        self.nesting = before;
        let saved_end = self.cursor.end();
        if let Err(err) = self.nesting.descend_wrapped(saved_end, start, off) {
            debug!("nesting limit exceeded at {}", off);
            return Err(err);
        }
        self.cursor.set_end(start + bytes.len());
        self.cursor.seek(start);
        self.map_end = None;
        trace!("enter bstr-wrapped at {} ({} bytes)", start, bytes.len());
        Ok(bytes)
    }

    /// Leave the entered bstr-wrapped region and continue after the byte string.
    ///
    /// # Errors
    ///
    /// Returns `ExitMismatch` if the bounded level is not a bstr-wrapped region.
    pub fn exit_bstr_wrapped(&mut self) -> Result<(), CborError> {
        let off = self.cursor.tell();
        if self.nesting.bounded_kind() != Some(BoundedKind::Wrapped) {
            return Err(CborError::new(ErrorCode::ExitMismatch, off));
        }
        let end = self.cursor.end();
        let saved_end = self
            .nesting
            .bounded_saved_end()
            .ok_or_else(|| CborError::new(ErrorCode::ExitMismatch, off))?;
        self.cursor.set_end(saved_end);
        trace!("exit bstr-wrapped, resume at {}", end);
        self.exit_bounded_level(end)
    }

    /// Leave the bounded level whose encoding ends at `end`.
    pub(crate) fn exit_bounded_level(&mut self, end: usize) -> Result<(), CborError> {
        self.cursor.seek(end);
        self.nesting.level_up_current();
        self.ascend_closed_levels();
        self.nesting.level_up_bounded();
        self.map_end = None;
        Ok(())
    }

    /// Bytes consumed so far, checking that the input was traversed completely.
    ///
    /// Can be called repeatedly; does not destruct the allocator.
    ///
    /// # Errors
    ///
    /// Returns `ArrayOrMapUnconsumed` if containers or wrapped regions are still open, and
    /// `ExtraBytes` if input remains.
    pub fn partial_finish(&self) -> Result<usize, CborError> {
        let off = self.cursor.tell();
        if !self.nesting.is_at_top() {
            return Err(CborError::new(ErrorCode::ArrayOrMapUnconsumed, off));
        }
        if self.cursor.remaining() != 0 {
            return Err(CborError::new(ErrorCode::ExtraBytes, off));
        }
        Ok(off)
    }

    /// End decoding: run the allocator destructor and check that the input was traversed
    /// completely.
    ///
    /// # Errors
    ///
    /// Same as [`Decoder::partial_finish`].
    pub fn finish(mut self) -> Result<(), CborError> {
        if let Some(alloc) = self.allocator.as_mut() {
            alloc.destruct();
        }
        let result = self.partial_finish().map(|_| ());
        trace!("finish at {}: ok={}", self.cursor.tell(), result.is_ok());
        result
    }
}
