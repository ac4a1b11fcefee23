//! Segment trie keyed by path templates.
//!
//! # Responsibilities
//! - Store compiled patterns, one value per (verb, template shape)
//! - Resolve (verb, path) to a value plus captured variables
//! - Distinguish "no such path" from "path exists, verb does not"
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Literal children in a HashMap, one variable edge, one wildcard edge
//! - Literal edges are tried first; the walk backtracks into the variable
//!   edge and finally the wildcard edge
//! - Variable names live on the leaf, so two patterns may name the same
//!   position differently

use std::collections::{BTreeMap, HashMap};

use axum::http::Method;
use thiserror::Error;

use super::pattern::{PathPattern, Segment};

/// Lookup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("not matching route found")]
    NotFound,
    #[error("method not allowed")]
    MethodNotAllowed,
}

/// Registration failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    #[error("route {method} {template} conflicts with already registered {existing}")]
    Duplicate {
        method: Method,
        template: String,
        existing: String,
    },
}

/// A captured path variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Captured {
    /// Value of a single-segment variable.
    Segment(String),
    /// Segments consumed by a wildcard.
    Wildcard(Vec<String>),
}

impl Captured {
    /// Value as it appeared in the path (wildcards re-joined with `/`).
    pub fn joined(&self) -> String {
        match self {
            Captured::Segment(s) => s.clone(),
            Captured::Wildcard(parts) => parts.join("/"),
        }
    }
}

/// Variables captured by a successful lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(BTreeMap<String, Captured>);

impl Captures {
    pub fn get(&self, name: &str) -> Option<&Captured> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Captured)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Successful lookup result.
#[derive(Debug)]
pub struct Match<'a, T> {
    pub value: &'a T,
    pub captures: Captures,
    /// Template the request matched.
    pub template: &'a str,
}

#[derive(Debug)]
struct Leaf<T> {
    method: Method,
    verb: Option<String>,
    names: Vec<String>,
    template: String,
    value: T,
}

#[derive(Debug)]
struct Node<T> {
    literals: HashMap<String, Node<T>>,
    variable: Option<Box<Node<T>>>,
    wildcard: Option<Box<Node<T>>>,
    leaves: Vec<Leaf<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            literals: HashMap::new(),
            variable: None,
            wildcard: None,
            leaves: Vec::new(),
        }
    }
}

enum Raw<'p> {
    One(&'p str),
    Rest(&'p [&'p str]),
}

enum Walk<'a, T> {
    Found(&'a Leaf<T>),
    /// Shape matched somewhere, verb did not.
    WrongMethod,
    Miss,
}

/// Path trie mapping (verb, path) to values of type `T`.
#[derive(Debug)]
pub struct Router<T> {
    root: Node<T>,
    len: usize,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of (verb, pattern) bindings.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Register `value` under every verb in `methods`.
    ///
    /// Fails without modifying the trie if any (verb, shape) pair is
    /// already taken.
    pub fn insert(
        &mut self,
        methods: &[Method],
        pattern: &PathPattern,
        value: T,
    ) -> Result<(), InsertError>
    where
        T: Clone,
    {
        let mut node = &mut self.root;
        for segment in pattern.segments() {
            node = match segment {
                Segment::Literal(lit) => node.literals.entry(lit.clone()).or_default(),
                Segment::Variable(_) => node
                    .variable
                    .get_or_insert_with(|| Box::new(Node::default()))
                    .as_mut(),
                Segment::Wildcard(_) => node
                    .wildcard
                    .get_or_insert_with(|| Box::new(Node::default()))
                    .as_mut(),
            };
        }

        let verb = pattern.verb().map(str::to_string);
        for method in methods {
            if let Some(existing) = node
                .leaves
                .iter()
                .find(|l| &l.method == method && l.verb == verb)
            {
                return Err(InsertError::Duplicate {
                    method: method.clone(),
                    template: pattern.template().to_string(),
                    existing: existing.template.clone(),
                });
            }
        }

        let names: Vec<String> = pattern.variables().map(str::to_string).collect();
        for method in methods {
            node.leaves.push(Leaf {
                method: method.clone(),
                verb: verb.clone(),
                names: names.clone(),
                template: pattern.template().to_string(),
                value: value.clone(),
            });
            self.len += 1;
        }
        Ok(())
    }

    /// Resolve `path` for `method`.
    pub fn search(&self, method: &Method, path: &str) -> Result<Match<'_, T>, RouteError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        // "/jobs/42:cancel" addresses the custom verb first; a verb shape
        // that exists for another method is final.
        if let Some((&last, rest)) = segments.split_last() {
            if let Some(idx) = last.rfind(':').filter(|&i| i > 0) {
                let mut trimmed: Vec<&str> = rest.to_vec();
                trimmed.push(&last[..idx]);
                let verb = &last[idx + 1..];
                let mut raw = Vec::new();
                match walk(&self.root, &trimmed, Some(verb), method, &mut raw) {
                    Walk::Found(leaf) => return Ok(build_match(leaf, raw)),
                    Walk::WrongMethod => return Err(RouteError::MethodNotAllowed),
                    Walk::Miss => {}
                }
            }
        }

        let mut raw = Vec::new();
        match walk(&self.root, &segments, None, method, &mut raw) {
            Walk::Found(leaf) => Ok(build_match(leaf, raw)),
            Walk::WrongMethod => Err(RouteError::MethodNotAllowed),
            Walk::Miss => Err(RouteError::NotFound),
        }
    }

    /// Registered (verb, template) pairs, in no particular order.
    pub fn routes(&self) -> Vec<(Method, String)> {
        let mut out = Vec::with_capacity(self.len);
        collect(&self.root, &mut out);
        out
    }
}

fn build_match<'a, T>(leaf: &'a Leaf<T>, raw: Vec<Raw<'_>>) -> Match<'a, T> {
    let mut captures = BTreeMap::new();
    for (name, value) in leaf.names.iter().zip(raw) {
        let captured = match value {
            Raw::One(s) => Captured::Segment(s.to_string()),
            Raw::Rest(parts) => Captured::Wildcard(parts.iter().map(|s| s.to_string()).collect()),
        };
        captures.insert(name.clone(), captured);
    }
    Match {
        value: &leaf.value,
        captures: Captures(captures),
        template: &leaf.template,
    }
}

fn terminal<'a, T>(node: &'a Node<T>, verb: Option<&str>, method: &Method) -> Walk<'a, T> {
    let mut shape = false;
    for leaf in node.leaves.iter().filter(|l| l.verb.as_deref() == verb) {
        if &leaf.method == method {
            return Walk::Found(leaf);
        }
        shape = true;
    }
    if shape {
        Walk::WrongMethod
    } else {
        Walk::Miss
    }
}

fn walk<'a, 'p, T>(
    node: &'a Node<T>,
    segments: &'p [&'p str],
    verb: Option<&str>,
    method: &Method,
    raw: &mut Vec<Raw<'p>>,
) -> Walk<'a, T> {
    let Some((head, tail)) = segments.split_first() else {
        return terminal(node, verb, method);
    };

    let mut wrong_method = false;

    if let Some(child) = node.literals.get(*head) {
        match walk(child, tail, verb, method, raw) {
            Walk::Found(leaf) => return Walk::Found(leaf),
            Walk::WrongMethod => wrong_method = true,
            Walk::Miss => {}
        }
    }

    if let Some(child) = node.variable.as_deref() {
        raw.push(Raw::One(*head));
        match walk(child, tail, verb, method, raw) {
            Walk::Found(leaf) => return Walk::Found(leaf),
            Walk::WrongMethod => wrong_method = true,
            Walk::Miss => {}
        }
        raw.pop();
    }

    if let Some(child) = node.wildcard.as_deref() {
        raw.push(Raw::Rest(segments));
        match terminal(child, verb, method) {
            Walk::Found(leaf) => return Walk::Found(leaf),
            Walk::WrongMethod => wrong_method = true,
            Walk::Miss => {}
        }
        raw.pop();
    }

    if wrong_method {
        Walk::WrongMethod
    } else {
        Walk::Miss
    }
}

fn collect<T>(node: &Node<T>, out: &mut Vec<(Method, String)>) {
    for leaf in &node.leaves {
        out.push((leaf.method.clone(), leaf.template.clone()));
    }
    for child in node.literals.values() {
        collect(child, out);
    }
    if let Some(child) = node.variable.as_deref() {
        collect(child, out);
    }
    if let Some(child) = node.wildcard.as_deref() {
        collect(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router(routes: &[(Method, &str, &'static str)]) -> Router<&'static str> {
        let mut r = Router::new();
        for (m, p, v) in routes {
            r.insert(&[m.clone()], &PathPattern::parse(p).unwrap(), *v)
                .unwrap();
        }
        r
    }

    #[test]
    fn test_literal_match_has_no_captures() {
        let r = router(&[
            (Method::GET, "/items", "list"),
            (Method::POST, "/items", "create"),
            (Method::GET, "/items/archive/all", "archive"),
        ]);
        for (m, p, v) in [
            (Method::GET, "/items", "list"),
            (Method::POST, "/items", "create"),
            (Method::GET, "/items/archive/all", "archive"),
        ] {
            let hit = r.search(&m, p).unwrap();
            assert_eq!(*hit.value, v);
            assert!(hit.captures.is_empty());
        }
    }

    #[test]
    fn test_variable_capture() {
        let r = router(&[(Method::GET, "/items/:id", "get")]);
        let hit = r.search(&Method::GET, "/items/42").unwrap();
        assert_eq!(*hit.value, "get");
        assert_eq!(
            hit.captures.get("id"),
            Some(&Captured::Segment("42".into()))
        );
        assert_eq!(hit.template, "/items/:id");
    }

    #[test]
    fn test_literal_beats_variable() {
        let r = router(&[
            (Method::GET, "/a/:x", "var"),
            (Method::GET, "/a/b", "lit"),
        ]);
        let hit = r.search(&Method::GET, "/a/b").unwrap();
        assert_eq!(*hit.value, "lit");
        assert!(hit.captures.is_empty());

        let hit = r.search(&Method::GET, "/a/c").unwrap();
        assert_eq!(*hit.value, "var");
    }

    #[test]
    fn test_backtracks_into_variable_edge() {
        let r = router(&[
            (Method::GET, "/a/b/c", "lit"),
            (Method::GET, "/a/{x}/d", "var"),
        ]);
        let hit = r.search(&Method::GET, "/a/b/d").unwrap();
        assert_eq!(*hit.value, "var");
        assert_eq!(hit.captures.get("x").unwrap().joined(), "b");
    }

    #[test]
    fn test_method_not_allowed() {
        let r = router(&[(Method::GET, "/items/:id", "get")]);
        assert_eq!(
            r.search(&Method::DELETE, "/items/42").unwrap_err(),
            RouteError::MethodNotAllowed
        );
        assert_eq!(
            r.search(&Method::GET, "/other").unwrap_err(),
            RouteError::NotFound
        );
        assert_eq!(
            r.search(&Method::GET, "/items/42/extra").unwrap_err(),
            RouteError::NotFound
        );
    }

    #[test]
    fn test_wrong_method_on_literal_still_tries_variable() {
        let r = router(&[
            (Method::POST, "/a/b", "lit"),
            (Method::GET, "/a/:x", "var"),
        ]);
        assert_eq!(*r.search(&Method::GET, "/a/b").unwrap().value, "var");
    }

    #[test]
    fn test_wildcard_capture() {
        let r = router(&[(Method::GET, "/files/{path=**}", "files")]);
        let hit = r.search(&Method::GET, "/files/docs/2024/report.pdf").unwrap();
        assert_eq!(
            hit.captures.get("path"),
            Some(&Captured::Wildcard(vec![
                "docs".into(),
                "2024".into(),
                "report.pdf".into()
            ]))
        );
        assert_eq!(
            hit.captures.get("path").unwrap().joined(),
            "docs/2024/report.pdf"
        );
        assert_eq!(
            r.search(&Method::GET, "/files").unwrap_err(),
            RouteError::NotFound
        );
    }

    #[test]
    fn test_verb_suffix() {
        let r = router(&[
            (Method::POST, "/jobs/{id}:cancel", "cancel"),
            (Method::GET, "/jobs/{id}", "get"),
        ]);
        let hit = r.search(&Method::POST, "/jobs/7:cancel").unwrap();
        assert_eq!(*hit.value, "cancel");
        assert_eq!(hit.captures.get("id").unwrap().joined(), "7");

        let hit = r.search(&Method::GET, "/jobs/7").unwrap();
        assert_eq!(*hit.value, "get");

        assert_eq!(
            r.search(&Method::GET, "/jobs/7:cancel").unwrap_err(),
            RouteError::MethodNotAllowed
        );
    }

    #[test]
    fn test_different_variable_names_same_position() {
        let r = router(&[
            (Method::GET, "/u/:user", "user"),
            (Method::GET, "/u/:org/repos", "repos"),
        ]);
        let hit = r.search(&Method::GET, "/u/acme/repos").unwrap();
        assert_eq!(*hit.value, "repos");
        assert_eq!(hit.captures.get("org").unwrap().joined(), "acme");
        assert!(hit.captures.get("user").is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut r = Router::new();
        r.insert(&[Method::GET], &PathPattern::parse("/a/:x").unwrap(), 1)
            .unwrap();
        let err = r
            .insert(&[Method::GET], &PathPattern::parse("/a/{y}").unwrap(), 2)
            .unwrap_err();
        assert!(matches!(err, InsertError::Duplicate { .. }));
        // another verb on the same shape is fine
        r.insert(&[Method::PUT], &PathPattern::parse("/a/{y}").unwrap(), 3)
            .unwrap();
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_multi_verb_insert_is_atomic() {
        let mut r = Router::new();
        let p = PathPattern::parse("/x").unwrap();
        r.insert(&[Method::POST], &p, 1).unwrap();
        assert!(r.insert(&[Method::GET, Method::POST], &p, 2).is_err());
        assert_eq!(r.len(), 1);
        assert_eq!(
            r.search(&Method::GET, "/x").unwrap_err(),
            RouteError::MethodNotAllowed
        );
    }

    #[test]
    fn test_root_route() {
        let r = router(&[(Method::GET, "/", "root")]);
        assert_eq!(*r.search(&Method::GET, "/").unwrap().value, "root");
        assert_eq!(r.routes(), vec![(Method::GET, "/".to_string())]);
    }
}
