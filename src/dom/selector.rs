//! CSS selector subset used by the DOM contract.
//!
//! Supported grammar:
//!
//! ```text
//! group    := complex ("," complex)*
//! complex  := compound ((" " | ">") compound)*
//! compound := tag? ("#" id | "." class | "[" attr (op value)? "]")*
//! op       := "=" | "^=" | "$=" | "*=" | "~="
//! ```
//!
//! Pseudo-classes and sibling combinators are rejected with
//! [`DomError::UnsupportedSelector`]; no component needs them.

use super::{DomError, NodeId};

/// Read-only view a selector needs to evaluate a node.
pub(crate) trait Matchable {
    fn tag_of(&self, node: NodeId) -> Option<&str>;
    fn attr_of(&self, node: NodeId, name: &str) -> Option<&str>;
    fn parent_element(&self, node: NodeId) -> Option<NodeId>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists(String),
    Equals(String, String),
    StartsWith(String, String),
    EndsWith(String, String),
    Contains(String, String),
    Includes(String, String),
}

impl AttrCondition {
    fn matches(&self, actual: Option<&str>) -> bool {
        match (self, actual) {
            (_, None) => false,
            (Self::Exists(_), Some(_)) => true,
            (Self::Equals(_, v), Some(a)) => a == v,
            (Self::StartsWith(_, v), Some(a)) => !v.is_empty() && a.starts_with(v.as_str()),
            (Self::EndsWith(_, v), Some(a)) => !v.is_empty() && a.ends_with(v.as_str()),
            (Self::Contains(_, v), Some(a)) => !v.is_empty() && a.contains(v.as_str()),
            (Self::Includes(_, v), Some(a)) => a.split_ascii_whitespace().any(|w| w == v),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Exists(n)
            | Self::Equals(n, _)
            | Self::StartsWith(n, _)
            | Self::EndsWith(n, _)
            | Self::Contains(n, _)
            | Self::Includes(n, _) => n,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    compound: Compound,
    // Relation to the part on the left.
    combinator: Option<Combinator>,
}

/// A parsed selector group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    groups: Vec<Vec<Part>>,
}

impl Selector {
    pub fn parse(selector: &str) -> Result<Self, DomError> {
        let unsupported = || DomError::UnsupportedSelector(selector.to_string());
        let mut groups = Vec::new();
        for group in split_outside_brackets(selector, ',').ok_or_else(unsupported)? {
            let group = group.trim();
            if group.is_empty() {
                return Err(unsupported());
            }
            groups.push(parse_complex(group).ok_or_else(unsupported)?);
        }
        Ok(Self { groups })
    }

    pub(crate) fn matches(&self, tree: &impl Matchable, node: NodeId) -> bool {
        self.groups.iter().any(|parts| matches_chain(tree, node, parts))
    }
}

fn matches_compound(tree: &impl Matchable, node: NodeId, compound: &Compound) -> bool {
    let Some(tag) = tree.tag_of(node) else {
        return false;
    };
    if let Some(expected) = &compound.tag {
        if !expected.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if tree.attr_of(node, "id") != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.is_empty() {
        let classes = tree.attr_of(node, "class").unwrap_or("");
        if !compound
            .classes
            .iter()
            .all(|c| classes.split_ascii_whitespace().any(|have| have == c))
        {
            return false;
        }
    }
    compound
        .attrs
        .iter()
        .all(|cond| cond.matches(tree.attr_of(node, cond.name())))
}

fn matches_chain(tree: &impl Matchable, node: NodeId, parts: &[Part]) -> bool {
    let Some((last, rest)) = parts.split_last() else {
        return false;
    };
    if !matches_compound(tree, node, &last.compound) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    match last.combinator.unwrap_or(Combinator::Descendant) {
        Combinator::Child => tree
            .parent_element(node)
            .is_some_and(|parent| matches_chain(tree, parent, rest)),
        Combinator::Descendant => {
            let mut cursor = tree.parent_element(node);
            while let Some(ancestor) = cursor {
                if matches_chain(tree, ancestor, rest) {
                    return true;
                }
                cursor = tree.parent_element(ancestor);
            }
            false
        }
    }
}

fn split_outside_brackets(src: &str, sep: char) -> Option<Vec<&str>> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in src.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.checked_sub(1)?,
            (None, c) if c == sep && depth == 0 => {
                out.push(&src[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 || quote.is_some() {
        return None;
    }
    out.push(&src[start..]);
    Some(out)
}

fn parse_complex(src: &str) -> Option<Vec<Part>> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for ch in src.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }
        match ch {
            '"' | '\'' if depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth.checked_sub(1)?;
                current.push(ch);
            }
            '>' if depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(">".to_string());
            }
            c if c.is_ascii_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            '+' | '~' | ':' if depth == 0 => return None,
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    let mut parts = Vec::new();
    let mut pending: Option<Combinator> = None;
    for token in tokens {
        if token == ">" {
            if pending.is_some() || parts.is_empty() {
                return None;
            }
            pending = Some(Combinator::Child);
            continue;
        }
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(Part {
            compound: parse_compound(&token)?,
            combinator,
        });
    }
    if parts.is_empty() || pending.is_some() {
        return None;
    }
    Some(parts)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &[char], mut i: usize) -> (String, usize) {
    let mut out = String::new();
    while i < chars.len() && is_ident_char(chars[i]) {
        out.push(chars[i]);
        i += 1;
    }
    (out, i)
}

fn parse_compound(src: &str) -> Option<Compound> {
    let chars: Vec<char> = src.chars().collect();
    let mut compound = Compound::default();
    let mut i = 0;
    let mut universal = false;
    while i < chars.len() {
        match chars[i] {
            '*' if i == 0 => {
                universal = true;
                i += 1;
            }
            '#' => {
                let (id, next) = take_ident(&chars, i + 1);
                if id.is_empty() || compound.id.replace(id).is_some() {
                    return None;
                }
                i = next;
            }
            '.' => {
                let (class, next) = take_ident(&chars, i + 1);
                if class.is_empty() {
                    return None;
                }
                compound.classes.push(class);
                i = next;
            }
            '[' => {
                let close = chars[i..].iter().position(|&c| c == ']')? + i;
                let inner: String = chars[i + 1..close].iter().collect();
                compound.attrs.push(parse_attr(&inner)?);
                i = close + 1;
            }
            c if is_ident_char(c) && i == 0 => {
                let (tag, next) = take_ident(&chars, i);
                compound.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
            _ => return None,
        }
    }
    let empty = compound.tag.is_none()
        && compound.id.is_none()
        && compound.classes.is_empty()
        && compound.attrs.is_empty();
    if empty && !universal {
        return None;
    }
    Some(compound)
}

fn parse_attr(inner: &str) -> Option<AttrCondition> {
    let inner = inner.trim();
    let Some(eq) = inner.find('=') else {
        let name = inner.to_ascii_lowercase();
        return (!name.is_empty() && name.chars().all(is_ident_char))
            .then_some(AttrCondition::Exists(name));
    };
    let (mut name, op) = match inner[..eq].chars().last() {
        Some(c @ ('^' | '$' | '*' | '~')) => (&inner[..eq - 1], Some(c)),
        _ => (&inner[..eq], None),
    };
    name = name.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return None;
    }
    let name = name.to_ascii_lowercase();
    let raw = inner[eq + 1..].trim();
    let value = if raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"'))
            || (raw.starts_with('\'') && raw.ends_with('\'')))
    {
        raw[1..raw.len() - 1].to_string()
    } else {
        raw.to_string()
    };
    Some(match op {
        None => AttrCondition::Equals(name, value),
        Some('^') => AttrCondition::StartsWith(name, value),
        Some('$') => AttrCondition::EndsWith(name, value),
        Some('*') => AttrCondition::Contains(name, value),
        Some(_) => AttrCondition::Includes(name, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Flat fixture: node index → (tag, attrs, parent).
    struct Fixture(Vec<(&'static str, HashMap<&'static str, &'static str>, Option<usize>)>);

    impl Matchable for Fixture {
        fn tag_of(&self, node: NodeId) -> Option<&str> {
            self.0.get(node.0).map(|n| n.0)
        }
        fn attr_of(&self, node: NodeId, name: &str) -> Option<&str> {
            self.0.get(node.0).and_then(|n| n.1.get(name).copied())
        }
        fn parent_element(&self, node: NodeId) -> Option<NodeId> {
            self.0.get(node.0).and_then(|n| n.2).map(NodeId)
        }
    }

    fn nav_fixture() -> Fixture {
        Fixture(vec![
            ("nav", HashMap::from([("class", "main-nav"), ("id", "mainNav")]), None),
            ("li", HashMap::from([("class", "has-dropdown open")]), Some(0)),
            ("a", HashMap::from([("class", "dropdown-toggle"), ("href", "services.html")]), Some(1)),
            ("a", HashMap::from([("href", "tel:3375550199")]), Some(0)),
        ])
    }

    fn matches(sel: &str, node: usize) -> bool {
        Selector::parse(sel).unwrap().matches(&nav_fixture(), NodeId(node))
    }

    #[test]
    fn matches_tag_class_and_id() {
        assert!(matches("nav", 0));
        assert!(matches(".main-nav", 0));
        assert!(matches("#mainNav", 0));
        assert!(matches("li.has-dropdown.open", 1));
        assert!(!matches("li.closed", 1));
    }

    #[test]
    fn matches_attribute_operators() {
        assert!(matches("a[href^=\"tel:\"]", 3));
        assert!(matches("a[href$='.html']", 2));
        assert!(matches("a[href*=vice]", 2));
        assert!(matches("[href]", 3));
        assert!(matches("li[class~=open]", 1));
        assert!(!matches("a[href^=\"tel:\"]", 2));
    }

    #[test]
    fn matches_descendant_and_child_combinators() {
        assert!(matches(".main-nav a", 2));
        assert!(matches("li.has-dropdown > a.dropdown-toggle", 2));
        assert!(!matches(".main-nav > a.dropdown-toggle", 2));
        assert!(matches(".main-nav > a", 3));
    }

    #[test]
    fn matches_any_group() {
        assert!(matches(".hamburger, #mainNav", 0));
    }

    #[test]
    fn rejects_unsupported_syntax() {
        for sel in ["", "a:hover", "a + b", "a ~ b", "[", "a,", "> a"] {
            assert!(
                matches!(Selector::parse(sel), Err(DomError::UnsupportedSelector(_))),
                "{sel:?} should be rejected"
            );
        }
    }
}
