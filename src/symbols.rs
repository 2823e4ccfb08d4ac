//! Symbol scopes binding interned identifiers to numeric values.

use crate::error::{ChainError, Result};
use std::fmt;
use symbios::SymbolTable;

/// A table of identifier bindings used to resolve DH expressions.
///
/// Names are interned through a [`symbios::SymbolTable`]; values live in a
/// vector indexed by symbol ID. Rebinding a name overwrites its value (last
/// write wins) but keeps its first position in iteration order.
pub struct SymbolScope {
    interner: SymbolTable,
    values: Vec<Option<f64>>,
    order: Vec<(String, u16)>,
}

impl Default for SymbolScope {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolScope {
    /// An empty scope.
    pub fn new() -> Self {
        Self {
            interner: SymbolTable::new(),
            values: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Builds the joint placeholder scope: `{prefix}1 ..= {prefix}{dof}` bound to `value`.
    ///
    /// Joint variables only get real values at runtime, so the static DH table is
    /// evaluated with every joint neutralized.
    pub fn joint_placeholders(prefix: &str, dof: usize, value: f64) -> Result<Self> {
        let mut scope = Self::new();
        for i in 1..=dof {
            scope.bind(&format!("{prefix}{i}"), value)?;
        }
        Ok(scope)
    }

    /// Binds `name` to `value`, growing the value map when a new symbol is interned.
    pub fn bind(&mut self, name: &str, value: f64) -> Result<()> {
        let id = match self.interner.resolve_id(name) {
            Some(id) => id,
            None => {
                self.interner
                    .intern(name)
                    .map_err(|_| ChainError::Symbol(name.to_string()))?;
                let id = self
                    .interner
                    .resolve_id(name)
                    .ok_or_else(|| ChainError::Symbol(name.to_string()))?;
                self.order.push((name.to_string(), id));
                id
            }
        };

        let idx = id as usize;
        if idx >= self.values.len() {
            self.values.resize(idx + 1, None);
        }
        self.values[idx] = Some(value);
        Ok(())
    }

    /// Returns the value bound to `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<f64> {
        let id = self.interner.resolve_id(name)?;
        self.values.get(id as usize).copied().flatten()
    }

    /// Returns the literal text that replaces `name` in a resolved expression.
    pub fn replacement(&self, name: &str) -> Option<String> {
        self.lookup(name).map(format_literal)
    }

    /// Whether `name` has a value.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing has been bound yet.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates bindings in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.order.iter().filter_map(|(name, id)| {
            self.values
                .get(*id as usize)
                .copied()
                .flatten()
                .map(|v| (name.as_str(), v))
        })
    }
}

impl fmt::Debug for SymbolScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Formats a value as an expression literal; negative values are parenthesized.
pub(crate) fn format_literal(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else if value < 0.0 {
        format!("({value})")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins_and_order_is_stable() {
        let mut scope = SymbolScope::new();
        scope.bind("L1", 0.1).unwrap();
        scope.bind("L2", 0.2).unwrap();
        scope.bind("L1", 0.3).unwrap();

        assert_eq!(scope.len(), 2);
        assert_eq!(scope.lookup("L1"), Some(0.3));
        let names: Vec<_> = scope.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["L1", "L2"]);
    }

    #[test]
    fn joint_placeholders_cover_configured_range() {
        let scope = SymbolScope::joint_placeholders("q", 27, 0.0).unwrap();
        assert_eq!(scope.len(), 27);
        assert_eq!(scope.lookup("q1"), Some(0.0));
        assert_eq!(scope.lookup("q27"), Some(0.0));
        assert_eq!(scope.lookup("q28"), None);
        assert_eq!(scope.lookup("q0"), None);
    }

    #[test]
    fn literals_are_parenthesized_when_negative() {
        assert_eq!(format_literal(0.5), "0.5");
        assert_eq!(format_literal(-0.25), "(-0.25)");
        assert_eq!(format_literal(-0.0), "0");
    }
}
