//! Label-directed access to entered maps and arrays.
//!
//! A search scans the direct members of the bounded level once, matching every member's label
//! against all requested labels, and then restores the traversal state. Nested containers are
//! skipped, never searched.

use defmt_or_log::{debug, trace};

use crate::decoder::Decoder;
use crate::item::{DecodedItem, ItemType, Label, Value};
use crate::nesting::{BoundedKind, ContainerKind, Nesting};
use crate::{CborError, ErrorCode, TagRequirement};

/// Maximum number of labels in one search.
pub const MAX_SEARCH_LABELS: usize = 64;

/// A map label to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapLabel<'q> {
    /// Integer label. Also matches an unsigned label of the same value.
    Int(i64),
    /// Unsigned integer label.
    UInt(u64),
    /// Text-string label.
    Text(&'q str),
    /// Byte-string label.
    Bytes(&'q [u8]),
}

/// The type a searched item must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Any type.
    Any,
    /// Exactly this type.
    Type(ItemType),
}

/// One requested label of a batch search and, afterwards, its result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchEntry<'q, 'a> {
    /// Label to match.
    pub label: MapLabel<'q>,
    /// Required item type.
    pub expected: Expect,
    /// The matched item, or `None` if the label is not in the map.
    pub item: Option<DecodedItem<'a>>,
}

impl<'q, 'a> SearchEntry<'q, 'a> {
    /// A request for `label`.
    #[must_use]
    pub const fn new(label: MapLabel<'q>, expected: Expect) -> Self {
        Self {
            label,
            expected,
            item: None,
        }
    }

    /// A request for an integer label.
    #[must_use]
    pub const fn int(label: i64, expected: Expect) -> Self {
        Self::new(MapLabel::Int(label), expected)
    }

    /// A request for a text label.
    #[must_use]
    pub const fn text(label: &'q str, expected: Expect) -> Self {
        Self::new(MapLabel::Text(label), expected)
    }

    /// The matched item.
    #[must_use]
    pub const fn found(&self) -> Option<&DecodedItem<'a>> {
        self.item.as_ref()
    }
}

/// Where the first matched entry sits in the bounded level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SearchInfo {
    /// Offset of the entry, label included.
    pub offset: usize,
    /// Position of the entry among the level's members.
    pub index: u32,
}

type Callback<'c, 'a> = &'c mut dyn FnMut(&DecodedItem<'a>) -> Result<(), CborError>;

impl<'a> Decoder<'a> {
    /// Scan the bounded level once, filling `entries`.
    ///
    /// With no entries the bounded level may be an array; the scan then only records where the
    /// level ends. Recoverable errors of members that match no entry are ignored.
    pub(crate) fn map_search(
        &mut self,
        entries: &mut [SearchEntry<'_, 'a>],
        callback: Option<Callback<'_, 'a>>,
    ) -> Result<Option<SearchInfo>, CborError> {
        let off = self.cursor.tell();
        if entries.len() > MAX_SEARCH_LABELS {
            return Err(CborError::new(ErrorCode::TooManySearchLabels, off));
        }
        match self.nesting.bounded_kind() {
            Some(BoundedKind::Container(ContainerKind::Map)) => {}
            Some(BoundedKind::Container(_)) if entries.is_empty() => {}
            _ => return Err(CborError::new(ErrorCode::MapNotEntered, off)),
        }
        let start = self
            .nesting
            .bounded_start()
            .ok_or_else(|| CborError::new(ErrorCode::MapNotEntered, off))?;

        for entry in entries.iter_mut() {
            entry.item = None;
        }
        if self.nesting.is_bounded_empty() {
            self.map_end = Some(start);
            return Ok(None);
        }

        trace!("map search at {}: {} labels", start, entries.len());
        let snapshot = self.snapshot();
        let result = self.scan_bounded(start, entries, callback);
        self.restore(snapshot);
        trace!("map search done: end {:?}", self.map_end);
        result
    }

    fn scan_bounded(
        &mut self,
        start: usize,
        entries: &mut [SearchEntry<'_, 'a>],
        mut callback: Option<Callback<'_, 'a>>,
    ) -> Result<Option<SearchInfo>, CborError> {
        self.nesting.prepare_for_search();
        self.cursor.seek(start);
        self.tag_cursor = None;
        let level = self.nesting.current_level();

        let mut found = 0u64;
        let mut info = None;
        let mut index = 0u32;
        loop {
            let entry_start = self.cursor.tell();
            let fetched = self.next_resolved()?;
            let item = fetched.item;

            let mut matched = false;
            for (i, entry) in entries.iter_mut().enumerate() {
                if !self.label_matches(&item.label, &entry.label) {
                    continue;
                }
                let bit = 1u64 << i;
                if found & bit != 0 {
                    debug!("duplicate label in map search at {}", entry_start);
                    return Err(CborError::new(ErrorCode::DuplicateLabel, entry_start));
                }
                if let Some(err) = fetched.soft {
                    return Err(err);
                }
                if let Expect::Type(want) = entry.expected {
                    if item.item_type() != want {
                        return Err(CborError::new(ErrorCode::UnexpectedType, entry_start));
                    }
                }
                found |= bit;
                entry.item = Some(item);
                matched = true;
                info.get_or_insert(SearchInfo {
                    offset: entry_start,
                    index,
                });
            }
            if !matched {
                if let Some(cb) = callback.as_deref_mut() {
                    cb(&item)?;
                }
            }

            let next = self.consume_rest(&item)?;
            index = index.saturating_add(1);
            if next < level {
                break;
            }
        }

        self.map_end = Some(self.cursor.tell());
        Ok(info)
    }

    fn label_matches(&self, label: &Label<'a>, want: &MapLabel<'_>) -> bool {
        match (*label, *want) {
            (Label::Int(have), MapLabel::Int(want)) => have == want,
            (Label::Int(have), MapLabel::UInt(want)) => u64::try_from(have) == Ok(want),
            (Label::UInt(have), MapLabel::UInt(want)) => have == want,
            (Label::UInt(have), MapLabel::Int(want)) => u64::try_from(want) == Ok(have),
            (Label::Text(span), MapLabel::Text(want)) => self.bytes(&span) == want.as_bytes(),
            (Label::Bytes(span), MapLabel::Bytes(want)) => self.bytes(&span) == want,
            _ => false,
        }
    }

    /// Position the traversal on the bounded-level entry with `label`.
    pub(crate) fn seek_to_label(&mut self, label: MapLabel<'_>) -> Result<(), CborError> {
        let off = self.cursor.tell();
        let mut entries = [SearchEntry::new(label, Expect::Any)];
        let info = self
            .map_search(&mut entries, None)?
            .ok_or_else(|| CborError::new(ErrorCode::LabelNotFound, off))?;
        self.cursor.seek(info.offset);
        self.tag_cursor = None;
        self.nesting.set_current_to_bounded();
        self.nesting.set_bounded_consumed(info.index);
        Ok(())
    }

    /// Seek to `label` and run `enter`; the traversal state is put back if either fails.
    fn enter_by_label<T>(
        &mut self,
        label: MapLabel<'_>,
        enter: impl FnOnce(&mut Self) -> Result<T, CborError>,
    ) -> Result<T, CborError> {
        let snapshot = self.snapshot();
        let result = self.seek_to_label(label).and_then(|()| enter(self));
        if result.is_err() {
            self.restore(snapshot);
        }
        result
    }

    fn enter_container(&mut self, want: ContainerKind) -> Result<DecodedItem<'a>, CborError> {
        let before = self.nesting;
        let off = self.cursor.tell();
        let item = self.next_item()?;
        let kind = match (item.value, want) {
            (Value::Map(_), ContainerKind::Map) => ContainerKind::Map,
            (Value::Array(_), ContainerKind::Array) => ContainerKind::Array,
            (Value::MapAsArray(_), ContainerKind::Array) => ContainerKind::MapAsArray,
            _ => return Err(CborError::new(ErrorCode::UnexpectedType, off)),
        };

        if !item.is_open_container() {
            // Empty containers push no level; give them one so exit works uniformly.
            self.enter_empty(before, kind, off)?;
        }
        self.nesting.enter_bounded(self.cursor.tell());
        self.map_end = None;
        trace!("entered container at {}, level {}", off, self.nesting.current_level());
        Ok(item)
    }

    fn enter_empty(
        &mut self,
        before: Nesting,
        kind: ContainerKind,
        off: usize,
    ) -> Result<(), CborError> {
        self.nesting = before;
        self.nesting.descend_empty(kind, off)
    }

    fn exit_container(&mut self, accept: fn(ContainerKind) -> bool) -> Result<(), CborError> {
        let off = self.cursor.tell();
        match self.nesting.bounded_kind() {
            Some(BoundedKind::Container(kind)) if accept(kind) => {}
            _ => return Err(CborError::new(ErrorCode::ExitMismatch, off)),
        }
        let end = match self.map_end {
            Some(end) => end,
            None => {
                self.map_search(&mut [], None)?;
                self.map_end
                    .ok_or_else(|| CborError::new(ErrorCode::ExitMismatch, off))?
            }
        };
        trace!("exit container, resume at {}", end);
        self.exit_bounded_level(end)
    }

    /// Enter the map at the cursor for label-based access. Returns the map header.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedType` if the next item is not a map, any error of the item itself, and
    /// `NestingTooDeep` if no level is left.
    pub fn enter_map(&mut self) -> Result<DecodedItem<'a>, CborError> {
        self.enter_container(ContainerKind::Map)
    }

    /// Enter the array at the cursor. Maps decoded as arrays may be entered too.
    ///
    /// # Errors
    ///
    /// Same as [`Decoder::enter_map`].
    pub fn enter_array(&mut self) -> Result<DecodedItem<'a>, CborError> {
        self.enter_container(ContainerKind::Array)
    }

    /// Enter the map stored under `label` in the entered map.
    ///
    /// # Errors
    ///
    /// Returns `MapNotEntered` if no map is entered, `LabelNotFound` if the label is absent, and
    /// the errors of [`Decoder::enter_map`]. On error the position is unchanged.
    pub fn enter_map_by_label(&mut self, label: MapLabel<'_>) -> Result<DecodedItem<'a>, CborError> {
        self.enter_by_label(label, |d| d.enter_container(ContainerKind::Map))
    }

    /// Enter the array stored under `label` in the entered map.
    ///
    /// # Errors
    ///
    /// Same as [`Decoder::enter_map_by_label`].
    pub fn enter_array_by_label(
        &mut self,
        label: MapLabel<'_>,
    ) -> Result<DecodedItem<'a>, CborError> {
        self.enter_by_label(label, |d| d.enter_container(ContainerKind::Array))
    }

    /// Enter the byte string stored under `label` as embedded CBOR. Returns the wrapped bytes.
    ///
    /// # Errors
    ///
    /// Same as [`Decoder::enter_map_by_label`] and [`Decoder::enter_bstr_wrapped`].
    pub fn enter_bstr_wrapped_by_label(
        &mut self,
        label: MapLabel<'_>,
        requirement: TagRequirement,
    ) -> Result<&'a [u8], CborError> {
        self.enter_by_label(label, |d| {
            let before = d.nesting;
            let item = d.next_item()?;
            d.enter_bstr_item(&item, requirement, before)
        })
    }

    /// Leave the entered map and continue after it.
    ///
    /// Members not read are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ExitMismatch` if the bounded level is not a map, and any unrecoverable error
    /// found while skipping the rest of the map.
    pub fn exit_map(&mut self) -> Result<(), CborError> {
        self.exit_container(|kind| kind == ContainerKind::Map)
    }

    /// Leave the entered array and continue after it.
    ///
    /// # Errors
    ///
    /// Same as [`Decoder::exit_map`], for arrays.
    pub fn exit_array(&mut self) -> Result<(), CborError> {
        self.exit_container(|kind| kind != ContainerKind::Map)
    }

    /// Get the item with `label` from the entered map without moving the cursor.
    ///
    /// # Errors
    ///
    /// Returns `LabelNotFound` if the label is absent, `DuplicateLabel` if it occurs twice,
    /// `UnexpectedType` if the item has the wrong type, the item's own recoverable error, and any
    /// unrecoverable error in the map.
    pub fn get_item_in_map(
        &mut self,
        label: MapLabel<'_>,
        expected: Expect,
    ) -> Result<DecodedItem<'a>, CborError> {
        let off = self.cursor.tell();
        let mut entries = [SearchEntry::new(label, expected)];
        self.map_search(&mut entries, None)?;
        let [entry] = entries;
        entry
            .item
            .ok_or_else(|| CborError::new(ErrorCode::LabelNotFound, off))
    }

    /// Look up several labels in one pass over the entered map.
    ///
    /// Entries whose label is absent are left with `item == None`.
    ///
    /// # Errors
    ///
    /// Same as [`Decoder::get_item_in_map`], except that absent labels are not an error.
    pub fn get_items_in_map(&mut self, entries: &mut [SearchEntry<'_, 'a>]) -> Result<(), CborError> {
        self.map_search(entries, None).map(|_| ())
    }

    /// Like [`Decoder::get_items_in_map`], calling `callback` for every member that matches no
    /// entry.
    ///
    /// # Errors
    ///
    /// Same as [`Decoder::get_items_in_map`]; an error returned by `callback` ends the search and
    /// is returned as is.
    pub fn get_items_in_map_with_callback(
        &mut self,
        entries: &mut [SearchEntry<'_, 'a>],
        callback: &mut dyn FnMut(&DecodedItem<'a>) -> Result<(), CborError>,
    ) -> Result<(), CborError> {
        self.map_search(entries, Some(callback)).map(|_| ())
    }

    /// Restart traversal at the first member of the bounded level.
    ///
    /// At the top level this restarts at the beginning of the input. Which level is bounded does
    /// not change.
    pub fn rewind(&mut self) {
        self.tag_cursor = None;
        match self.nesting.bounded_kind() {
            Some(BoundedKind::Wrapped) => {
                self.nesting.set_current_to_bounded();
            }
            Some(BoundedKind::Container(_)) => {
                self.nesting.prepare_for_search();
            }
            None => {
                self.nesting = Nesting::new(self.rules.limits.max_depth, self.cursor.end());
                self.cursor.seek(0);
                return;
            }
        }
        if let Some(start) = self.nesting.bounded_start() {
            self.cursor.seek(start);
        }
    }
}
