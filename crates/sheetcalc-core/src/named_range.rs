//! Named range definitions
//!
//! A named range gives a meaningful name to a cell or block of cells so formulas
//! can refer to it by name.
//!
//! # Example
//!
//! ```text
//! // Define "Sales" as B2:B13
//! calculator.define_name("Sales", "B2:B13")?;
//!
//! // Use it in formulas
//! =SUM(Sales)
//! =Sales * 2       (expression formulas substitute the range text)
//! ```

use ahash::AHashMap;
use lazy_regex::regex_is_match;

use crate::cell::{parse_address, resolve_range, CellRange};
use crate::error::{Error, Result};

/// A named range definition
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamedRange {
    /// The name (e.g., "SalesData", "TaxRate")
    /// Names are case-insensitive
    pub name: String,
    /// The reference text the name stands for ("B1" or "A1:D10")
    pub refers_to: String,
}

impl NamedRange {
    /// Create a named range, validating both the name and the reference
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let refers_to = refers_to.into().trim().to_string();

        if !is_valid_name(&name) {
            return Err(Error::InvalidName(name));
        }
        if Self::parse_reference(&refers_to).is_none() {
            return Err(Error::InvalidRange(refers_to));
        }

        Ok(Self { name, refers_to })
    }

    /// The block of cells the name refers to
    pub fn range(&self) -> Option<CellRange> {
        Self::parse_reference(&self.refers_to)
    }

    /// Check if the name refers to more than one cell
    pub fn is_range(&self) -> bool {
        self.refers_to.contains(':')
    }

    fn parse_reference(text: &str) -> Option<CellRange> {
        if text.contains(':') {
            resolve_range(text)
        } else {
            parse_address(text).map(CellRange::single)
        }
    }
}

/// Check whether a name can be defined.
///
/// Names start with a letter or underscore, continue with letters, digits,
/// underscores or dots, and must not read as a cell reference or a boolean.
pub fn is_valid_name(name: &str) -> bool {
    if !regex_is_match!(r"^[A-Za-z_][A-Za-z0-9_.]*$", name) {
        return false;
    }
    let upper = name.to_ascii_uppercase();
    if upper == "TRUE" || upper == "FALSE" {
        return false;
    }
    parse_address(&upper).is_none()
}

/// Collection of named ranges with case-insensitive lookup
#[derive(Debug, Default, Clone)]
pub struct NamedRangeCollection {
    /// Named ranges stored by uppercase name
    ranges: AHashMap<String, NamedRange>,
}

impl NamedRangeCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self::default()
    }

    fn make_key(name: &str) -> String {
        name.to_ascii_uppercase()
    }

    /// Define a new named range
    ///
    /// Returns an error if the name already exists (in any letter case)
    pub fn define(&mut self, range: NamedRange) -> Result<()> {
        let key = Self::make_key(&range.name);

        if self.ranges.contains_key(&key) {
            return Err(Error::DuplicateName(range.name));
        }

        self.ranges.insert(key, range);
        Ok(())
    }

    /// Define or update a named range
    pub fn define_or_update(&mut self, range: NamedRange) {
        let key = Self::make_key(&range.name);
        self.ranges.insert(key, range);
    }

    /// Get a named range by name
    pub fn get(&self, name: &str) -> Option<&NamedRange> {
        self.ranges.get(&Self::make_key(name))
    }

    /// Remove a named range
    pub fn remove(&mut self, name: &str) -> Option<NamedRange> {
        self.ranges.remove(&Self::make_key(name))
    }

    /// Check if a name is defined
    pub fn contains(&self, name: &str) -> bool {
        self.ranges.contains_key(&Self::make_key(name))
    }

    /// Iterate over all named ranges
    pub fn iter(&self) -> impl Iterator<Item = &NamedRange> {
        self.ranges.values()
    }

    /// Get the number of named ranges
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
