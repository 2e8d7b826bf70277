//! Elemental composition parsed from a chemical formula.

use crate::error::CatalogError;
use indexmap::IndexMap;

/// Element symbol to amount per formula unit.
///
/// # Examples
///
/// ```
/// use kiln_catalog::Composition;
///
/// let c = Composition::parse("Ba4Ti13O30").unwrap();
/// assert_eq!(c.get("Ti"), 13.0);
/// let c = Composition::parse("Ca(OH)2").unwrap();
/// assert_eq!(c.get("H"), 2.0);
/// assert_eq!(c.num_atoms(), 5.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Composition {
    amounts: IndexMap<String, f64>,
}

impl Composition {
    /// Parse a formula such as `BaTiO3`, `Ca(OH)2` or `Li0.5Mn2O4`.
    pub fn parse(formula: &str) -> Result<Self, CatalogError> {
        let chars: Vec<char> = formula.chars().filter(|c| !c.is_whitespace()).collect();
        if chars.is_empty() {
            return Err(invalid(formula, "empty formula"));
        }
        let mut parser = Parser {
            formula,
            chars: &chars,
            pos: 0,
        };
        let amounts = parser.group(None)?;
        if parser.pos != chars.len() {
            return Err(invalid(formula, "unbalanced closing bracket"));
        }
        Ok(Self { amounts })
    }

    /// Amount of `element` per formula unit, zero if absent.
    pub fn get(&self, element: &str) -> f64 {
        self.amounts.get(element).copied().unwrap_or(0.0)
    }

    /// Elements in order of first appearance.
    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.amounts.keys().map(String::as_str)
    }

    /// Element amounts in order of first appearance.
    pub fn amounts(&self) -> &IndexMap<String, f64> {
        &self.amounts
    }

    /// Total atoms per formula unit.
    pub fn num_atoms(&self) -> f64 {
        self.amounts.values().sum()
    }
}

fn invalid(formula: &str, reason: &str) -> CatalogError {
    CatalogError::InvalidFormula {
        formula: formula.to_string(),
        reason: reason.to_string(),
    }
}

struct Parser<'a> {
    formula: &'a str,
    chars: &'a [char],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Parse until end of input or the matching `close` bracket.
    fn group(&mut self, close: Option<char>) -> Result<IndexMap<String, f64>, CatalogError> {
        let mut out: IndexMap<String, f64> = IndexMap::new();
        while let Some(c) = self.peek() {
            let inner = match c {
                '(' | '[' => {
                    self.pos += 1;
                    let expected = if c == '(' { ')' } else { ']' };
                    let inner = self.group(Some(expected))?;
                    self.pos += 1;
                    inner
                }
                ')' | ']' => {
                    if close == Some(c) {
                        return Ok(out);
                    }
                    return Err(invalid(self.formula, "unbalanced closing bracket"));
                }
                c if c.is_ascii_uppercase() => {
                    let mut symbol = c.to_string();
                    self.pos += 1;
                    while let Some(l) = self.peek().filter(char::is_ascii_lowercase) {
                        symbol.push(l);
                        self.pos += 1;
                    }
                    IndexMap::from([(symbol, 1.0)])
                }
                other => {
                    return Err(invalid(
                        self.formula,
                        &format!("unexpected character '{other}'"),
                    ))
                }
            };
            let count = self.count()?;
            for (el, n) in inner {
                *out.entry(el).or_insert(0.0) += n * count;
            }
        }
        match close {
            Some(_) => Err(invalid(self.formula, "unclosed bracket")),
            None => Ok(out),
        }
    }

    fn count(&mut self) -> Result<f64, CatalogError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        if start == self.pos {
            return Ok(1.0);
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map_err(|_| invalid(self.formula, &format!("bad count '{text}'")))
    }
}
