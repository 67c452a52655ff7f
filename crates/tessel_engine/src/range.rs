//! Key ranges (bound descriptors).

use crate::error::{EngineError, EngineResult};
use crate::key::Key;
use std::fmt;
use std::ops::Bound;

/// The engine's native range object.
///
/// A range is either a single key or an interval whose ends are each
/// optional and each either inclusive or exclusive. Intervals are always
/// well formed: `lower <= upper` when both are present, and a degenerate
/// interval (`lower == upper`) is closed on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRange {
    /// Exactly one key.
    Only(Key),
    /// An interval.
    Bounded {
        /// Lower end, if any.
        lower: Option<Key>,
        /// Upper end, if any.
        upper: Option<Key>,
        /// Whether the lower end is excluded.
        lower_open: bool,
        /// Whether the upper end is excluded.
        upper_open: bool,
    },
}

impl KeyRange {
    /// A range matching exactly `key`.
    pub fn only(key: impl Into<Key>) -> Self {
        KeyRange::Only(key.into())
    }

    /// All keys above `lower` (excluding it when `open`).
    pub fn lower_bound(lower: impl Into<Key>, open: bool) -> Self {
        KeyRange::Bounded {
            lower: Some(lower.into()),
            upper: None,
            lower_open: open,
            upper_open: false,
        }
    }

    /// All keys below `upper` (excluding it when `open`).
    pub fn upper_bound(upper: impl Into<Key>, open: bool) -> Self {
        KeyRange::Bounded {
            lower: None,
            upper: Some(upper.into()),
            lower_open: false,
            upper_open: open,
        }
    }

    /// All keys between `lower` and `upper`.
    ///
    /// # Errors
    ///
    /// Returns a data error if `lower > upper`, or if `lower == upper`
    /// and either end is open.
    pub fn bound(
        lower: impl Into<Key>,
        upper: impl Into<Key>,
        lower_open: bool,
        upper_open: bool,
    ) -> EngineResult<Self> {
        let lower = lower.into();
        let upper = upper.into();
        if lower > upper {
            return Err(EngineError::data(format!(
                "lower bound {lower} is greater than upper bound {upper}"
            )));
        }
        if lower == upper && (lower_open || upper_open) {
            return Err(EngineError::data(format!(
                "empty range: bounds equal {lower} but an end is open"
            )));
        }
        Ok(KeyRange::Bounded {
            lower: Some(lower),
            upper: Some(upper),
            lower_open,
            upper_open,
        })
    }

    /// Builds a range from standard library bounds.
    ///
    /// Returns `Ok(None)` when both ends are unbounded.
    ///
    /// # Errors
    ///
    /// Returns a data error for malformed intervals, as [`KeyRange::bound`].
    pub fn from_bounds(lower: Bound<Key>, upper: Bound<Key>) -> EngineResult<Option<Self>> {
        let split = |bound: Bound<Key>| match bound {
            Bound::Included(k) => (Some(k), false),
            Bound::Excluded(k) => (Some(k), true),
            Bound::Unbounded => (None, false),
        };
        let (lower, lower_open) = split(lower);
        let (upper, upper_open) = split(upper);
        match (lower, upper) {
            (None, None) => Ok(None),
            (Some(lo), None) => Ok(Some(KeyRange::lower_bound(lo, lower_open))),
            (None, Some(hi)) => Ok(Some(KeyRange::upper_bound(hi, upper_open))),
            (Some(lo), Some(hi)) => KeyRange::bound(lo, hi, lower_open, upper_open).map(Some),
        }
    }

    /// Checks that the range is well formed.
    ///
    /// Ranges built through the constructors always are; this guards
    /// ranges assembled directly from the enum variant.
    ///
    /// # Errors
    ///
    /// Returns a data error for an inverted or empty open interval.
    pub fn validate(&self) -> EngineResult<()> {
        match self {
            KeyRange::Bounded {
                lower: Some(lower),
                upper: Some(upper),
                lower_open,
                upper_open,
            } => KeyRange::bound(lower.clone(), upper.clone(), *lower_open, *upper_open).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Returns the lower end.
    #[must_use]
    pub fn lower(&self) -> Option<&Key> {
        match self {
            KeyRange::Only(key) => Some(key),
            KeyRange::Bounded { lower, .. } => lower.as_ref(),
        }
    }

    /// Returns the upper end.
    #[must_use]
    pub fn upper(&self) -> Option<&Key> {
        match self {
            KeyRange::Only(key) => Some(key),
            KeyRange::Bounded { upper, .. } => upper.as_ref(),
        }
    }

    /// Whether the lower end is excluded.
    #[must_use]
    pub fn lower_open(&self) -> bool {
        matches!(self, KeyRange::Bounded { lower_open: true, .. })
    }

    /// Whether the upper end is excluded.
    #[must_use]
    pub fn upper_open(&self) -> bool {
        matches!(self, KeyRange::Bounded { upper_open: true, .. })
    }

    /// Returns the range as a pair of standard library bounds.
    #[must_use]
    pub fn to_bounds(&self) -> (Bound<&Key>, Bound<&Key>) {
        fn wrap<'k>(key: Option<&'k Key>, open: bool) -> Bound<&'k Key> {
            match (key, open) {
                (None, _) => Bound::Unbounded,
                (Some(k), true) => Bound::Excluded(k),
                (Some(k), false) => Bound::Included(k),
            }
        }
        (
            wrap(self.lower(), self.lower_open()),
            wrap(self.upper(), self.upper_open()),
        )
    }

    /// Checks whether `key` falls inside the range.
    #[must_use]
    pub fn includes(&self, key: &Key) -> bool {
        let (lower, upper) = self.to_bounds();
        let above = match lower {
            Bound::Unbounded => true,
            Bound::Included(lo) => key >= lo,
            Bound::Excluded(lo) => key > lo,
        };
        let below = match upper {
            Bound::Unbounded => true,
            Bound::Included(hi) => key <= hi,
            Bound::Excluded(hi) => key < hi,
        };
        above && below
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRange::Only(key) => write!(f, "={key}"),
            KeyRange::Bounded {
                lower,
                upper,
                lower_open,
                upper_open,
            } => {
                f.write_str(if *lower_open { "(" } else { "[" })?;
                match lower {
                    Some(k) => write!(f, "{k}")?,
                    None => f.write_str("-inf")?,
                }
                f.write_str(", ")?;
                match upper {
                    Some(k) => write!(f, "{k}")?,
                    None => f.write_str("+inf")?,
                }
                f.write_str(if *upper_open { ")" } else { "]" })
            }
        }
    }
}
