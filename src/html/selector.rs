use std::fmt;
use std::fmt::{Display, Formatter};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,
    #[error("Invalid selector part `{0}`")]
    InvalidPart(String),
}

/// Anything a selector can be tested against.
pub trait Matchable {
    fn tag(&self) -> &str;
    fn has_class(&self, class: &str) -> bool;
    fn id(&self) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Compound {
    fn parse(part: &str) -> Result<Compound, SelectorError> {
        let mut compound = Compound { tag: None, id: None, classes: vec![] };
        let mut rest = part;

        let tag_end = rest.find(['.', '#']).unwrap_or(rest.len());
        let tag = &rest[..tag_end];
        if !tag.is_empty() && tag != "*" {
            if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return Err(SelectorError::InvalidPart(part.to_string()));
            }
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_end..];

        while !rest.is_empty() {
            let marker = rest.as_bytes()[0];
            let body = &rest[1..];
            let end = body.find(['.', '#']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return Err(SelectorError::InvalidPart(part.to_string()));
            }
            match marker {
                b'.' => compound.classes.push(name.to_string()),
                _ => compound.id = Some(name.to_string()),
            }
            rest = &body[end..];
        }

        Ok(compound)
    }

    fn matches<M: Matchable + ?Sized>(&self, element: &M) -> bool {
        if let Some(ref tag) = self.tag {
            if !element.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(ref id) = self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| element.has_class(c))
    }
}

impl Display for Compound {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(ref tag) = self.tag {
            write!(f, "{}", tag)?;
        }
        if let Some(ref id) = self.id {
            write!(f, "#{}", id)?;
        }
        for class in self.classes.iter() {
            write!(f, ".{}", class)?;
        }
        Ok(())
    }
}

/// Structural selector: a comma separated list of descendant chains built
/// from `tag`, `.class` and `#id` parts, e.g. `.post-title, h1` or
/// `.blog-post-title a`.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    alternatives: Vec<Vec<Compound>>,
}

impl Selector {
    pub fn parse(buf: &str) -> Result<Selector, SelectorError> {
        let mut alternatives = vec![];
        for alternative in buf.split(',') {
            let chain = alternative.split_whitespace()
                .map(Compound::parse)
                .collect::<Result<Vec<_>, _>>()?;
            if chain.is_empty() {
                return Err(SelectorError::Empty);
            }
            alternatives.push(chain);
        }

        Ok(Selector { alternatives })
    }

    /// `path` starts at the candidate element and walks up through its ancestors.
    pub fn matches_path<'m, M, I>(&self, path: I) -> bool
        where
            M: Matchable + ?Sized + 'm,
            I: Iterator<Item=&'m M> + Clone,
    {
        self.alternatives.iter().any(|chain| Self::chain_matches(chain, path.clone()))
    }

    fn chain_matches<'m, M, I>(chain: &[Compound], mut path: I) -> bool
        where
            M: Matchable + ?Sized + 'm,
            I: Iterator<Item=&'m M>,
    {
        let mut compounds = chain.iter().rev();
        let Some(last) = compounds.next() else {
            return false;
        };
        match path.next() {
            Some(element) if last.matches(element) => {}
            _ => return false,
        }

        // Descendant combinator only, so greedy matching is enough
        for compound in compounds {
            loop {
                match path.next() {
                    Some(ancestor) if compound.matches(ancestor) => break,
                    Some(_) => continue,
                    None => return false,
                }
            }
        }
        true
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let alternatives: Vec<String> = self.alternatives.iter()
            .map(|chain| chain.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" "))
            .collect();
        write!(f, "{}", alternatives.join(", "))
    }
}
