//! The nesting stack.
//!
//! Level 0 is the top of the input and is modelled as a byte-string wrap so that ascent stops
//! there like at any other wrapped region. Two indices point into the stack: `current` (where the
//! traversal is) and `bounded` (the deepest level entered for label-based access).

use crate::item::Count;
use crate::limits::MAX_NESTING;
use crate::{CborError, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Array,
    Map,
    MapAsArray,
}

/// Items left at a container level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    /// Definite count; also the "at end" marker of an indefinite bounded level when 0.
    Items(u32),
    /// Indefinite length, closed by a `break`.
    Indefinite,
    /// Entered empty container.
    Empty,
}

#[derive(Debug, Clone, Copy)]
pub enum Level {
    Wrapped {
        saved_end: usize,
        start: usize,
    },
    Container {
        kind: ContainerKind,
        total: Remaining,
        remaining: Remaining,
        bounded_start: Option<usize>,
    },
}

/// Which kind of level is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundedKind {
    Wrapped,
    Container(ContainerKind),
}

#[derive(Debug, Clone, Copy)]
pub struct Nesting {
    levels: [Level; MAX_NESTING + 1],
    current: usize,
    bounded: Option<usize>,
    max_depth: usize,
}

impl Nesting {
    pub const fn new(max_depth: usize, input_len: usize) -> Self {
        Self {
            levels: [Level::Wrapped {
                saved_end: input_len,
                start: 0,
            }; MAX_NESTING + 1],
            current: 0,
            bounded: None,
            max_depth,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn current_level(&self) -> u8 {
        self.current as u8
    }

    pub const fn is_at_top(&self) -> bool {
        self.current == 0
    }

    const fn level(&self, index: usize) -> &Level {
        &self.levels[index]
    }

    pub const fn current_is_wrapped(&self) -> bool {
        matches!(self.level(self.current), Level::Wrapped { .. })
    }

    pub fn current_kind(&self) -> Option<ContainerKind> {
        match self.levels[self.current] {
            Level::Container { kind, .. } => Some(kind),
            Level::Wrapped { .. } => None,
        }
    }

    pub fn current_remaining(&self) -> Option<Remaining> {
        match self.levels[self.current] {
            Level::Container { remaining, .. } => Some(remaining),
            Level::Wrapped { .. } => None,
        }
    }

    pub fn current_total(&self) -> Option<Remaining> {
        match self.levels[self.current] {
            Level::Container { total, .. } => Some(total),
            Level::Wrapped { .. } => None,
        }
    }

    pub fn set_current_remaining(&mut self, value: Remaining) {
        if let Level::Container { remaining, .. } = &mut self.levels[self.current] {
            *remaining = value;
        }
    }

    /// Wrapped levels and entered containers are bounded.
    const fn is_level_bounded(&self, index: usize) -> bool {
        match self.level(index) {
            Level::Wrapped { .. } => true,
            Level::Container { bounded_start, .. } => bounded_start.is_some(),
        }
    }

    pub const fn current_is_bounded(&self) -> bool {
        self.is_level_bounded(self.current)
    }

    /// True when the current level is the bounded level and all its items are consumed.
    pub fn is_at_end_of_bounded(&self) -> bool {
        if self.bounded != Some(self.current) {
            return false;
        }
        matches!(
            self.levels[self.current],
            Level::Container {
                remaining: Remaining::Items(0) | Remaining::Empty,
                bounded_start: Some(_),
                ..
            }
        )
    }

    fn push(&mut self, level: Level, offset: usize) -> Result<(), CborError> {
        if self.current + 1 > self.max_depth {
            return Err(CborError::new(ErrorCode::NestingTooDeep, offset));
        }
        self.current += 1;
        self.levels[self.current] = level;
        Ok(())
    }

    /// Push a level for a container with members. Empty definite containers push nothing.
    pub fn descend_container(
        &mut self,
        kind: ContainerKind,
        count: Count,
        offset: usize,
    ) -> Result<(), CborError> {
        let total = match count {
            Count::Definite(0) => return Ok(()),
            Count::Definite(n) => Remaining::Items(n),
            Count::Indefinite => Remaining::Indefinite,
        };
        self.push(
            Level::Container {
                kind,
                total,
                remaining: total,
                bounded_start: None,
            },
            offset,
        )
    }

    /// Push a level for an entered empty container.
    pub fn descend_empty(&mut self, kind: ContainerKind, offset: usize) -> Result<(), CborError> {
        self.push(
            Level::Container {
                kind,
                total: Remaining::Empty,
                remaining: Remaining::Empty,
                bounded_start: None,
            },
            offset,
        )
    }

    pub fn descend_wrapped(
        &mut self,
        saved_end: usize,
        start: usize,
        offset: usize,
    ) -> Result<(), CborError> {
        self.push(Level::Wrapped { saved_end, start }, offset)?;
        self.bounded = Some(self.current);
        Ok(())
    }

    /// Mark the current container level as entered at `start`.
    pub fn enter_bounded(&mut self, start: usize) {
        if let Level::Container { bounded_start, .. } = &mut self.levels[self.current] {
            *bounded_start = Some(start);
            self.bounded = Some(self.current);
        }
    }

    /// Decrement the current definite level; returns true when it reaches zero.
    pub fn decrement(&mut self) -> bool {
        match &mut self.levels[self.current] {
            Level::Container {
                remaining: Remaining::Items(n),
                ..
            } => {
                *n = n.saturating_sub(1);
                *n == 0
            }
            _ => false,
        }
    }

    pub fn ascend(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    /// Move `current` to the level enclosing the bounded one.
    pub fn level_up_current(&mut self) {
        if let Some(b) = self.bounded {
            self.current = b.saturating_sub(1);
        }
    }

    /// Move `bounded` to the next enclosing bounded level. Level 0 always qualifies.
    pub fn level_up_bounded(&mut self) {
        let Some(mut b) = self.bounded else {
            return;
        };
        while b > 0 {
            b -= 1;
            if self.is_level_bounded(b) {
                break;
            }
        }
        self.bounded = if b == 0 { None } else { Some(b) };
    }

    pub fn bounded_kind(&self) -> Option<BoundedKind> {
        let b = self.bounded?;
        Some(match self.levels[b] {
            Level::Wrapped { .. } => BoundedKind::Wrapped,
            Level::Container { kind, .. } => BoundedKind::Container(kind),
        })
    }

    /// Offset of the first member of the bounded container.
    pub fn bounded_start(&self) -> Option<usize> {
        match self.levels[self.bounded?] {
            Level::Container { bounded_start, .. } => bounded_start,
            Level::Wrapped { start, .. } => Some(start),
        }
    }

    /// Visible input length to restore when leaving the bounded wrapped level.
    pub fn bounded_saved_end(&self) -> Option<usize> {
        match self.levels[self.bounded?] {
            Level::Wrapped { saved_end, .. } => Some(saved_end),
            Level::Container { .. } => None,
        }
    }

    pub fn is_bounded_empty(&self) -> bool {
        self.bounded.is_some_and(|b| {
            matches!(
                self.levels[b],
                Level::Container {
                    remaining: Remaining::Empty,
                    ..
                }
            )
        })
    }

    /// Position `current` on the bounded level and restore its full count.
    pub fn prepare_for_search(&mut self) {
        if let Some(b) = self.bounded {
            self.current = b;
            self.reset_count();
        }
    }

    pub fn set_current_to_bounded(&mut self) {
        if let Some(b) = self.bounded {
            self.current = b;
        }
    }

    /// Restore the bounded level's count to its total.
    pub fn reset_count(&mut self) {
        let Some(b) = self.bounded else {
            return;
        };
        if let Level::Container {
            total, remaining, ..
        } = &mut self.levels[b]
        {
            if *remaining != Remaining::Empty {
                *remaining = *total;
            }
        }
    }

    /// Set the bounded level's count as if `consumed` of its items had been read.
    pub fn set_bounded_consumed(&mut self, consumed: u32) {
        let Some(b) = self.bounded else {
            return;
        };
        if let Level::Container {
            total, remaining, ..
        } = &mut self.levels[b]
        {
            *remaining = match *total {
                Remaining::Items(n) => Remaining::Items(n.saturating_sub(consumed)),
                other => other,
            };
        }
    }
}
