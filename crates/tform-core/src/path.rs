//! Path expressions for reaching into records
//!
//! A [`FieldPath`] is an ordered list of key and index steps such as
//! `address.home.city` or `orders[0].lines[2].sku`. Evaluating a path through
//! an [`Accessor`](crate::Accessor) is the same as chaining the equivalent
//! `get`/`at` calls by hand, so absent intermediate values never fail and
//! tracing sees every key step.
//!
//! Grammar:
//!
//! ```text
//! path    := segment ( '.' segment | bracket )*
//! segment := key bracket* | bracket+
//! key     := any characters except '.', '[' and ']'
//! bracket := '[' digits ']' | '["' chars '"]' | "['" chars "']"
//! ```
//!
//! Copyright (c) 2025 Tform Contributors
//! Licensed under the Apache-2.0 license

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a path expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path expression is empty")]
    Empty,

    #[error("empty key segment at position {position}")]
    EmptySegment { position: usize },

    #[error("invalid array index '{index}' at position {position}")]
    InvalidIndex { index: String, position: usize },

    #[error("unclosed bracket opened at position {position}")]
    UnclosedBracket { position: usize },

    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { found: char, position: usize },
}

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// Named property of an object
    Key(String),
    /// Position in an array
    Index(usize),
}

/// A parsed path expression
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    steps: Vec<PathStep>,
}

impl FieldPath {
    /// Create an empty path, which resolves to the handle it is applied to
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path expression
    pub fn parse(input: &str) -> Result<Self, PathError> {
        if input.is_empty() {
            return Err(PathError::Empty);
        }

        let chars: Vec<(usize, char)> = input.char_indices().collect();
        let mut steps = Vec::new();
        let mut i = 0;
        // true at the start and right after a '.', where a key may begin
        let mut segment_start = true;

        while i < chars.len() {
            let (position, c) = chars[i];
            match c {
                '.' => {
                    if segment_start {
                        return Err(PathError::EmptySegment { position });
                    }
                    segment_start = true;
                    i += 1;
                }
                '[' => {
                    let (step, next) = parse_bracket(input, &chars, i)?;
                    steps.push(step);
                    segment_start = false;
                    i = next;
                }
                ']' => return Err(PathError::UnexpectedCharacter { found: c, position }),
                _ => {
                    if !segment_start {
                        return Err(PathError::UnexpectedCharacter { found: c, position });
                    }
                    let start = position;
                    while i < chars.len() && !matches!(chars[i].1, '.' | '[' | ']') {
                        i += 1;
                    }
                    let end = chars.get(i).map_or(input.len(), |(p, _)| *p);
                    steps.push(PathStep::Key(input[start..end].to_string()));
                    segment_start = false;
                }
            }
        }

        if segment_start {
            return Err(PathError::EmptySegment {
                position: input.len(),
            });
        }

        Ok(Self { steps })
    }

    /// Append a key step
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.steps.push(PathStep::Key(key.into()));
        self
    }

    /// Append an index step
    pub fn index(mut self, index: usize) -> Self {
        self.steps.push(PathStep::Index(index));
        self
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Key steps only, in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match step {
            PathStep::Key(key) => Some(key.as_str()),
            PathStep::Index(_) => None,
        })
    }
}

fn parse_bracket(
    input: &str,
    chars: &[(usize, char)],
    open: usize,
) -> Result<(PathStep, usize), PathError> {
    let position = chars[open].0;
    let mut j = open + 1;

    match chars.get(j) {
        None => Err(PathError::UnclosedBracket { position }),
        Some(&(_, quote @ ('"' | '\''))) => {
            j += 1;
            let start = j;
            while j < chars.len() && chars[j].1 != quote {
                j += 1;
            }
            if j >= chars.len() {
                return Err(PathError::UnclosedBracket { position });
            }
            let begin = chars.get(start).map_or(input.len(), |(p, _)| *p);
            let key = input[begin..chars[j].0].to_string();
            j += 1;
            match chars.get(j) {
                Some(&(_, ']')) => Ok((PathStep::Key(key), j + 1)),
                Some(&(p, found)) => Err(PathError::UnexpectedCharacter {
                    found,
                    position: p,
                }),
                None => Err(PathError::UnclosedBracket { position }),
            }
        }
        Some(_) => {
            let start = j;
            while j < chars.len() && chars[j].1 != ']' {
                j += 1;
            }
            if j >= chars.len() {
                return Err(PathError::UnclosedBracket { position });
            }
            let raw = &input[chars[start].0..chars[j].0];
            let index = raw.parse::<usize>().map_err(|_| PathError::InvalidIndex {
                index: raw.to_string(),
                position: chars[start].0,
            })?;
            Ok((PathStep::Index(index), j + 1))
        }
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Key(key) if key.is_empty() || key.contains(['.', '[', ']']) => {
                    write!(f, "[\"{}\"]", key)?
                }
                PathStep::Key(key) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", key)?
                }
                PathStep::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}
