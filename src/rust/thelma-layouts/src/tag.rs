// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Domain of the tags that carry experimental factor levels.
pub const EXPERIMENT_DESIGN_DOMAIN: &str = "experimentdesign";

/// A `(domain, predicate, value)` triple.
///
/// Domains are authored input and therefore kept as opaque strings. Tags are
/// ordered by domain, then predicate, then value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub domain: String,
    pub predicate: String,
    pub value: String,
}

impl Tag {
    pub fn new(
        domain: impl Into<String>,
        predicate: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Tag {
            domain: domain.into(),
            predicate: predicate.into(),
            value: value.into(),
        }
    }

    /// A factor level tag of the experiment design.
    pub fn factor(predicate: impl Into<String>, value: impl Into<String>) -> Self {
        Tag::new(EXPERIMENT_DESIGN_DOMAIN, predicate, value)
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}={}", self.domain, self.predicate, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let mut tags = vec![
            Tag::new("b", "a", "a"),
            Tag::new("a", "b", "a"),
            Tag::new("a", "a", "b"),
            Tag::new("a", "a", "a"),
        ];
        tags.sort();
        let rendered: Vec<_> = tags.iter().map(|t| t.to_string()).collect();
        assert_eq!(rendered, vec!["a:a=a", "a:a=b", "a:b=a", "b:a=a"]);
    }

    #[test]
    fn test_factor_domain() {
        let tag = Tag::factor("cell line", "MCF7");
        assert_eq!(tag.domain, "experimentdesign");
    }
}
