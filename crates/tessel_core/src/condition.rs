//! Condition translation.
//!
//! A [`Condition`] is one comparison against the key of the chosen index
//! (or the primary key). [`translate`] maps it onto the engine's
//! [`KeyRange`]. [`Comparisons`] is the multi-field form where several
//! comparisons may be set at once; [`Comparisons::resolve`] picks one by
//! precedence:
//!
//! ```text
//! eq > between > startsWith > gte&lte > gt&lt > gte&lt > gt&lte > gt > gte > lt > lte
//! ```
//!
//! In strict mode contradictory combinations are rejected instead.

use crate::error::{CoreError, CoreResult};
use serde_json::Value;
use std::fmt;
use std::ops::Bound;
use tessel_engine::{Key, KeyRange};

/// Highest BMP code point, appended to a prefix to close its range.
///
/// Keys compare by UTF-16 units, so a string that continues the prefix
/// with U+FFFF and then more text sorts past the upper end and is missed.
pub const PREFIX_SENTINEL: char = '\u{FFFF}';

/// A single comparison over an index key.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Key equals the value.
    Equals(Key),
    /// Key is strictly greater.
    GreaterThan(Key),
    /// Key is greater or equal.
    GreaterOrEqual(Key),
    /// Key is strictly less.
    LessThan(Key),
    /// Key is less or equal.
    LessOrEqual(Key),
    /// Key is within `[lower, upper]`, both inclusive.
    Between(Key, Key),
    /// Key is a string starting with the prefix.
    StartsWith(String),
    /// Arbitrary combination of a lower and an upper end.
    Range {
        /// Lower end.
        lower: Bound<Key>,
        /// Upper end.
        upper: Bound<Key>,
    },
}

impl Condition {
    /// Translates into a key range; see [`translate`].
    ///
    /// # Errors
    ///
    /// As [`translate`].
    pub fn to_range(&self) -> CoreResult<Option<KeyRange>> {
        translate(self)
    }
}

/// Maps a condition onto the engine's range object.
///
/// Returns `Ok(None)` for a condition without any end, which scans
/// everything.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] for an interval whose lower end is
/// above its upper end, or one that is empty because both ends are equal
/// and one is open.
pub fn translate(condition: &Condition) -> CoreResult<Option<KeyRange>> {
    let range = match condition {
        Condition::Equals(key) => KeyRange::only(key.clone()),
        Condition::GreaterThan(key) => KeyRange::lower_bound(key.clone(), true),
        Condition::GreaterOrEqual(key) => KeyRange::lower_bound(key.clone(), false),
        Condition::LessThan(key) => KeyRange::upper_bound(key.clone(), true),
        Condition::LessOrEqual(key) => KeyRange::upper_bound(key.clone(), false),
        Condition::Between(lower, upper) => {
            KeyRange::bound(lower.clone(), upper.clone(), false, false).map_err(invalid)?
        }
        Condition::StartsWith(prefix) => {
            let upper = format!("{prefix}{PREFIX_SENTINEL}");
            KeyRange::bound(prefix.as_str(), upper, false, false).map_err(invalid)?
        }
        Condition::Range { lower, upper } => {
            return KeyRange::from_bounds(lower.clone(), upper.clone()).map_err(invalid)
        }
    };
    Ok(Some(range))
}

fn invalid(error: tessel_engine::EngineError) -> CoreError {
    CoreError::validation(format!("malformed condition: {error}"))
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Equals(key) => write!(f, "= {key}"),
            Condition::GreaterThan(key) => write!(f, "> {key}"),
            Condition::GreaterOrEqual(key) => write!(f, ">= {key}"),
            Condition::LessThan(key) => write!(f, "< {key}"),
            Condition::LessOrEqual(key) => write!(f, "<= {key}"),
            Condition::Between(lower, upper) => write!(f, "between {lower} and {upper}"),
            Condition::StartsWith(prefix) => write!(f, "starts with {prefix:?}"),
            Condition::Range { lower, upper } => {
                let mut parts = Vec::new();
                match lower {
                    Bound::Included(k) => parts.push(format!(">= {k}")),
                    Bound::Excluded(k) => parts.push(format!("> {k}")),
                    Bound::Unbounded => {}
                }
                match upper {
                    Bound::Included(k) => parts.push(format!("<= {k}")),
                    Bound::Excluded(k) => parts.push(format!("< {k}")),
                    Bound::Unbounded => {}
                }
                if parts.is_empty() {
                    f.write_str("any")
                } else {
                    f.write_str(&parts.join(" and "))
                }
            }
        }
    }
}

/// Several optional comparisons over the same key.
///
/// Build it fluently or parse it with [`Comparisons::from_json`]:
///
/// ```rust
/// use tessel_core::{Comparisons, Condition};
/// use std::ops::Bound;
///
/// let cmp = Comparisons::new().gte(10).lte(20);
/// assert_eq!(
///     cmp.resolve(),
///     Some(Condition::Range {
///         lower: Bound::Included(10.into()),
///         upper: Bound::Included(20.into()),
///     })
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparisons {
    /// Equality.
    pub eq: Option<Key>,
    /// Strictly greater.
    pub gt: Option<Key>,
    /// Greater or equal.
    pub gte: Option<Key>,
    /// Strictly less.
    pub lt: Option<Key>,
    /// Less or equal.
    pub lte: Option<Key>,
    /// Inclusive interval.
    pub between: Option<(Key, Key)>,
    /// String prefix.
    pub starts_with: Option<String>,
}

impl Comparisons {
    /// Creates an empty set of comparisons (matches everything).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `eq`.
    #[must_use]
    pub fn eq(mut self, key: impl Into<Key>) -> Self {
        self.eq = Some(key.into());
        self
    }

    /// Sets `gt`.
    #[must_use]
    pub fn gt(mut self, key: impl Into<Key>) -> Self {
        self.gt = Some(key.into());
        self
    }

    /// Sets `gte`.
    #[must_use]
    pub fn gte(mut self, key: impl Into<Key>) -> Self {
        self.gte = Some(key.into());
        self
    }

    /// Sets `lt`.
    #[must_use]
    pub fn lt(mut self, key: impl Into<Key>) -> Self {
        self.lt = Some(key.into());
        self
    }

    /// Sets `lte`.
    #[must_use]
    pub fn lte(mut self, key: impl Into<Key>) -> Self {
        self.lte = Some(key.into());
        self
    }

    /// Sets `between`.
    #[must_use]
    pub fn between(mut self, lower: impl Into<Key>, upper: impl Into<Key>) -> Self {
        self.between = Some((lower.into(), upper.into()));
        self
    }

    /// Sets `startsWith`.
    #[must_use]
    pub fn starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.starts_with = Some(prefix.into());
        self
    }

    /// Whether no comparison is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Parses the JSON form.
    ///
    /// An object may carry `eq`, `gt`, `gte`, `lt`, `lte`,
    /// `between: [lower, upper]` and `startsWith`. Any other value is
    /// shorthand for `eq`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for unknown fields and values
    /// that are not valid keys.
    pub fn from_json(value: &Value) -> CoreResult<Self> {
        let Value::Object(fields) = value else {
            return Ok(Self::new().eq(json_key("eq", value)?));
        };

        let mut cmp = Self::new();
        for (field, value) in fields {
            match field.as_str() {
                "eq" => cmp.eq = Some(json_key(field, value)?),
                "gt" => cmp.gt = Some(json_key(field, value)?),
                "gte" => cmp.gte = Some(json_key(field, value)?),
                "lt" => cmp.lt = Some(json_key(field, value)?),
                "lte" => cmp.lte = Some(json_key(field, value)?),
                "between" => match value.as_array().map(Vec::as_slice) {
                    Some([lower, upper]) => {
                        cmp.between = Some((json_key(field, lower)?, json_key(field, upper)?));
                    }
                    _ => {
                        return Err(CoreError::validation(
                            "between expects a two element array [lower, upper]",
                        ))
                    }
                },
                "startsWith" => match value {
                    Value::String(prefix) => cmp.starts_with = Some(prefix.clone()),
                    _ => return Err(CoreError::validation("startsWith expects a string")),
                },
                other => {
                    return Err(CoreError::validation(format!(
                        "unknown comparison {other:?}"
                    )))
                }
            }
        }
        Ok(cmp)
    }

    /// Picks the comparison that applies, by precedence.
    ///
    /// Returns `None` when nothing is set.
    #[must_use]
    pub fn resolve(&self) -> Option<Condition> {
        use Bound::{Excluded, Included};

        if let Some(key) = &self.eq {
            return Some(Condition::Equals(key.clone()));
        }
        if let Some((lower, upper)) = &self.between {
            return Some(Condition::Between(lower.clone(), upper.clone()));
        }
        if let Some(prefix) = &self.starts_with {
            return Some(Condition::StartsWith(prefix.clone()));
        }

        let range = |lower: Bound<&Key>, upper: Bound<&Key>| Condition::Range {
            lower: lower.cloned(),
            upper: upper.cloned(),
        };
        let condition = match (&self.gt, &self.gte, &self.lt, &self.lte) {
            (_, Some(gte), _, Some(lte)) => range(Included(gte), Included(lte)),
            (Some(gt), _, Some(lt), _) => range(Excluded(gt), Excluded(lt)),
            (_, Some(gte), Some(lt), _) => range(Included(gte), Excluded(lt)),
            (Some(gt), _, _, Some(lte)) => range(Excluded(gt), Included(lte)),
            (Some(gt), _, _, _) => Condition::GreaterThan(gt.clone()),
            (_, Some(gte), _, _) => Condition::GreaterOrEqual(gte.clone()),
            (_, _, Some(lt), _) => Condition::LessThan(lt.clone()),
            (_, _, _, Some(lte)) => Condition::LessOrEqual(lte.clone()),
            (None, None, None, None) => return None,
        };
        Some(condition)
    }

    /// Rejects combinations where precedence would silently drop a field.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the conflicting fields.
    pub fn check_strict(&self) -> CoreResult<()> {
        let set: Vec<&str> = [
            ("eq", self.eq.is_some()),
            ("between", self.between.is_some()),
            ("startsWith", self.starts_with.is_some()),
            ("gt", self.gt.is_some()),
            ("gte", self.gte.is_some()),
            ("lt", self.lt.is_some()),
            ("lte", self.lte.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect();

        let exclusive = set
            .iter()
            .find(|name| matches!(**name, "eq" | "between" | "startsWith"));
        if let Some(name) = exclusive {
            if set.len() > 1 {
                return Err(CoreError::validation(format!(
                    "{name} cannot be combined with other comparisons (got {})",
                    set.join(", ")
                )));
            }
        }
        if self.gt.is_some() && self.gte.is_some() {
            return Err(CoreError::validation("gt and gte are both set"));
        }
        if self.lt.is_some() && self.lte.is_some() {
            return Err(CoreError::validation("lt and lte are both set"));
        }
        Ok(())
    }

    /// Resolves and translates in one step.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for contradictory fields in
    /// strict mode and for malformed intervals.
    pub fn to_range(&self, strict: bool) -> CoreResult<Option<KeyRange>> {
        if strict {
            self.check_strict()?;
        }
        match self.resolve() {
            Some(condition) => translate(&condition),
            None => Ok(None),
        }
    }
}

impl From<Condition> for Comparisons {
    fn from(condition: Condition) -> Self {
        let cmp = Comparisons::new();
        match condition {
            Condition::Equals(key) => cmp.eq(key),
            Condition::GreaterThan(key) => cmp.gt(key),
            Condition::GreaterOrEqual(key) => cmp.gte(key),
            Condition::LessThan(key) => cmp.lt(key),
            Condition::LessOrEqual(key) => cmp.lte(key),
            Condition::Between(lower, upper) => cmp.between(lower, upper),
            Condition::StartsWith(prefix) => cmp.starts_with(prefix),
            Condition::Range { lower, upper } => {
                let mut cmp = cmp;
                match lower {
                    Bound::Included(k) => cmp.gte = Some(k),
                    Bound::Excluded(k) => cmp.gt = Some(k),
                    Bound::Unbounded => {}
                }
                match upper {
                    Bound::Included(k) => cmp.lte = Some(k),
                    Bound::Excluded(k) => cmp.lt = Some(k),
                    Bound::Unbounded => {}
                }
                cmp
            }
        }
    }
}

fn json_key(field: &str, value: &Value) -> CoreResult<Key> {
    Key::from_json(value)
        .ok_or_else(|| CoreError::validation(format!("{field}: {value} is not a valid key")))
}
