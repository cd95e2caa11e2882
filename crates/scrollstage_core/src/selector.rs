//! Element selectors
//!
//! A small subset of CSS selectors, enough to locate the markers and
//! wrappers the scroll effects work with:
//!
//! - Type selectors: `body`, `img`, `*`
//! - Class selectors: `.image-wrap`
//! - Attribute selectors: `[data-theme]`, `[data-theme="to-dark"]`
//! - Descendant combinator: `.images-stack .image-wrap`
//! - Selector lists: `h1, p, span`
//!
//! Parsing uses nom combinators; a selector that does not parse in full is
//! rejected with the byte offset where parsing stopped.

use std::fmt;
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt, verify},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use smallvec::SmallVec;

use crate::document::{Document, ElementId};
use crate::error::SelectorError;

/// One filter applied to a single element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualifier {
    Class(String),
    Attribute { name: String, value: Option<String> },
}

/// A run of filters that must all match the same element
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Compound {
    /// `None` and `Some("*")` both match any tag
    pub tag: Option<String>,
    pub qualifiers: SmallVec<[Qualifier; 2]>,
}

impl Compound {
    fn matches(&self, doc: &dyn Document, el: ElementId) -> bool {
        if let Some(tag) = self.tag.as_deref() {
            if tag != "*" && doc.tag(el).map_or(true, |t| !t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        self.qualifiers.iter().all(|q| match q {
            Qualifier::Class(class) => doc.has_class(el, class),
            Qualifier::Attribute { name, value } => match (doc.attribute(el, name), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            },
        })
    }
}

/// Compounds joined by descendant combinators
pub type Complex = Vec<Compound>;

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: SmallVec<[Complex; 1]>,
}

impl Selector {
    /// Parse a selector string
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        match selector_list(input) {
            Ok(("", alternatives)) => Ok(Self {
                source: input.trim().to_string(),
                alternatives: alternatives.into_iter().collect(),
            }),
            Ok((rest, _)) => Err(SelectorError::Invalid {
                selector: input.to_string(),
                position: input.len() - rest.len(),
            }),
            Err(_) => Err(SelectorError::Invalid {
                selector: input.to_string(),
                position: 0,
            }),
        }
    }

    /// The selector as written (trimmed)
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The comma-separated alternatives
    pub fn alternatives(&self) -> &[Complex] {
        &self.alternatives
    }

    /// Compounds of the first alternative
    pub fn parts(&self) -> &[Compound] {
        self.alternatives.first().map_or(&[][..], Vec::as_slice)
    }

    /// Check whether `el` matches any alternative
    pub fn matches(&self, doc: &dyn Document, el: ElementId) -> bool {
        self.alternatives
            .iter()
            .any(|parts| complex_matches(parts, doc, el))
    }
}

/// Matching runs right to left: the last compound must match the element
/// itself, each earlier compound must match some ancestor above the
/// previous match.
fn complex_matches(parts: &[Compound], doc: &dyn Document, el: ElementId) -> bool {
    let Some((last, ancestors)) = parts.split_last() else {
        return false;
    };
    if !last.matches(doc, el) {
        return false;
    }

    let mut cursor = doc.parent(el);
    for compound in ancestors.iter().rev() {
        loop {
            match cursor {
                Some(candidate) => {
                    cursor = doc.parent(candidate);
                    if compound.matches(doc, candidate) {
                        break;
                    }
                }
                None => return false,
            }
        }
    }
    true
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ============================================================================
// Grammar
// ============================================================================

fn ident(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_')(input)
}

fn type_selector(input: &str) -> IResult<&str, String> {
    map(alt((tag("*"), ident)), str::to_string)(input)
}

fn class_qualifier(input: &str) -> IResult<&str, Qualifier> {
    map(preceded(char('.'), ident), |name| {
        Qualifier::Class(name.to_string())
    })(input)
}

fn attribute_value(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('"'), opt(is_not("\"")), char('"')),
            delimited(char('\''), opt(is_not("'")), char('\'')),
            map(ident, Some),
        )),
        |value| value.unwrap_or_default().to_string(),
    )(input)
}

fn attribute_qualifier(input: &str) -> IResult<&str, Qualifier> {
    map(
        delimited(
            pair(char('['), multispace0),
            tuple((
                ident,
                opt(preceded(
                    tuple((multispace0, char('='), multispace0)),
                    attribute_value,
                )),
            )),
            pair(multispace0, char(']')),
        ),
        |(name, value)| Qualifier::Attribute {
            name: name.to_string(),
            value,
        },
    )(input)
}

fn compound(input: &str) -> IResult<&str, Compound> {
    map(
        verify(
            pair(
                opt(type_selector),
                many0(alt((class_qualifier, attribute_qualifier))),
            ),
            |(tag, qualifiers): &(Option<String>, Vec<Qualifier>)| {
                tag.is_some() || !qualifiers.is_empty()
            },
        ),
        |(tag, qualifiers)| Compound {
            tag,
            qualifiers: qualifiers.into_iter().collect(),
        },
    )(input)
}

fn complex(input: &str) -> IResult<&str, Complex> {
    separated_list1(multispace1, compound)(input)
}

fn selector_list(input: &str) -> IResult<&str, Vec<Complex>> {
    delimited(
        multispace0,
        separated_list1(tuple((multispace0, char(','), multispace0)), complex),
        multispace0,
    )(input)
}
