//! Relative path queries over markup nodes.
//!
//! Supports the XPath subset field templates use in practice:
//! - child steps separated by `/`, and `//` for descendant-or-self
//! - node tests: `name`, `prefix:name` (matched on local name), `*`, `.`, `..`,
//!   `@name`, `@*`, `text()`, `node()`
//! - predicates: `[n]`, `[last()]`, `[@attr]`, `[@attr='v']`, `[child]`, `[child='v']`
//!
//! Paths are always relative: leading `/` characters are stripped.

use roxmltree::Node;

use eadhier_shared::{EadHierError, Result};

use crate::node::MarkupNode;

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

/// One result of a path query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryMatch<'a, 'input> {
    /// An element, text, or other tree node.
    Node(MarkupNode<'a, 'input>),
    /// An attribute of `owner`; `index` is its position among the owner's attributes.
    Attribute {
        owner: MarkupNode<'a, 'input>,
        index: usize,
        name: &'a str,
        value: &'a str,
    },
}

impl<'a, 'input> QueryMatch<'a, 'input> {
    /// Text value: descendant text for nodes, the value for attributes.
    pub fn text(&self) -> String {
        match self {
            Self::Node(node) => node.text(),
            Self::Attribute { value, .. } => (*value).to_string(),
        }
    }

    /// Document-order key; attributes sort right after their owner.
    ///
    /// Node ids are allocated in document order, so their raw index orders
    /// nodes the way they appear in the source.
    fn order_key(&self) -> (u32, usize) {
        match self {
            Self::Node(node) => (node.raw().id().get(), 0),
            Self::Attribute { owner, index, .. } => (owner.raw().id().get(), index + 1),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsed query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    AnyElement,
    SelfNode,
    Parent,
    Attribute(String),
    AnyAttribute,
    Text,
    AnyNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    Last,
    HasAttribute(String),
    AttributeEquals(String, String),
    HasChild(String),
    ChildEquals(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    /// Preceded by `//`.
    descendant: bool,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

/// A compiled relative path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    steps: Vec<Step>,
}

impl PathQuery {
    /// Compile a path expression. Leading `/` characters are ignored.
    pub fn parse(path: &str) -> Result<Self> {
        let relative = path.trim().trim_start_matches('/');
        if relative.is_empty() {
            return Err(EadHierError::query(path, "empty path"));
        }

        let steps = split_steps(relative)
            .and_then(|raw| {
                raw.into_iter()
                    .map(|(descendant, text)| parse_step(descendant, text))
                    .collect::<std::result::Result<Vec<_>, String>>()
            })
            .map_err(|msg| EadHierError::query(path, msg))?;

        Ok(Self { steps })
    }

    /// Evaluate against `context`, returning matches in document order without duplicates.
    pub fn evaluate<'a, 'input>(
        &self,
        context: MarkupNode<'a, 'input>,
    ) -> Vec<QueryMatch<'a, 'input>> {
        let mut current = vec![QueryMatch::Node(context)];

        for step in &self.steps {
            let mut next = Vec::new();
            for item in &current {
                let QueryMatch::Node(node) = item else {
                    continue;
                };
                let origins: Vec<Node<'a, 'input>> = if step.descendant {
                    node.raw().descendants().collect()
                } else {
                    vec![node.raw()]
                };
                for origin in origins {
                    let candidates = select(&step.test, origin);
                    next.extend(apply_predicates(candidates, &step.predicates));
                }
            }

            next.sort_by_key(QueryMatch::order_key);
            next.dedup_by_key(|m| m.order_key());
            current = next;
            if current.is_empty() {
                break;
            }
        }

        current
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn select<'a, 'input>(test: &NodeTest, origin: Node<'a, 'input>) -> Vec<QueryMatch<'a, 'input>> {
    let node_match = |n: Node<'a, 'input>| QueryMatch::Node(MarkupNode::new(n));
    let attr_match = |(index, attr): (usize, roxmltree::Attribute<'a, 'input>)| {
        QueryMatch::Attribute {
            owner: MarkupNode::new(origin),
            index,
            name: attr.name(),
            value: attr.value(),
        }
    };

    match test {
        NodeTest::Name(name) => origin
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == name)
            .map(node_match)
            .collect(),
        NodeTest::AnyElement => origin
            .children()
            .filter(|n| n.is_element())
            .map(node_match)
            .collect(),
        NodeTest::SelfNode => vec![node_match(origin)],
        NodeTest::Parent => origin.parent_element().map(node_match).into_iter().collect(),
        NodeTest::Attribute(name) => origin
            .attributes()
            .enumerate()
            .filter(|(_, attr)| attr.name() == name)
            .map(attr_match)
            .collect(),
        NodeTest::AnyAttribute => origin.attributes().enumerate().map(attr_match).collect(),
        NodeTest::Text => origin
            .children()
            .filter(|n| n.is_text())
            .map(node_match)
            .collect(),
        NodeTest::AnyNode => origin.children().map(node_match).collect(),
    }
}

fn apply_predicates<'a, 'input>(
    mut items: Vec<QueryMatch<'a, 'input>>,
    predicates: &[Predicate],
) -> Vec<QueryMatch<'a, 'input>> {
    for predicate in predicates {
        items = match predicate {
            Predicate::Position(n) => items.into_iter().nth(n - 1).into_iter().collect(),
            Predicate::Last => items.pop().into_iter().collect(),
            Predicate::HasAttribute(name) => retain_nodes(items, |n| n.attribute(name).is_some()),
            Predicate::AttributeEquals(name, value) => {
                retain_nodes(items, |n| n.attribute(name) == Some(value.as_str()))
            }
            Predicate::HasChild(name) => {
                retain_nodes(items, |n| !n.children_with_tag(name).is_empty())
            }
            Predicate::ChildEquals(name, value) => retain_nodes(items, |n| {
                n.children_with_tag(name).iter().any(|c| c.text() == *value)
            }),
        };
    }
    items
}

fn retain_nodes<'a, 'input>(
    items: Vec<QueryMatch<'a, 'input>>,
    keep: impl Fn(&MarkupNode<'a, 'input>) -> bool,
) -> Vec<QueryMatch<'a, 'input>> {
    items
        .into_iter()
        .filter(|m| matches!(m, QueryMatch::Node(n) if n.is_element() && keep(n)))
        .collect()
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Split on `/` outside predicates, flagging steps preceded by `//`.
fn split_steps(path: &str) -> std::result::Result<Vec<(bool, &str)>, String> {
    let chars: Vec<(usize, char)> = path.char_indices().collect();
    let mut steps = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut descendant = false;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') if depth > 0 => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                if depth == 0 {
                    return Err("unmatched ']'".into());
                }
                depth -= 1;
            }
            (None, '/') if depth == 0 => {
                let step = path[start..pos].trim();
                if step.is_empty() {
                    return Err("empty step".into());
                }
                steps.push((descendant, step));
                descendant = false;
                if matches!(chars.get(i + 1), Some((_, '/'))) {
                    descendant = true;
                    i += 1;
                }
                start = chars.get(i + 1).map_or(path.len(), |&(p, _)| p);
            }
            _ => {}
        }
        i += 1;
    }

    if quote.is_some() {
        return Err("unterminated string literal".into());
    }
    if depth > 0 {
        return Err("unclosed predicate".into());
    }
    let last = path[start..].trim();
    if last.is_empty() {
        return Err("path ends with '/'".into());
    }
    steps.push((descendant, last));
    Ok(steps)
}

fn parse_step(descendant: bool, text: &str) -> std::result::Result<Step, String> {
    let (head, mut rest) = match text.find('[') {
        Some(i) => (&text[..i], &text[i..]),
        None => (text, ""),
    };
    let test = parse_node_test(head.trim())?;

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let close = closing_bracket(rest)?;
        predicates.push(parse_predicate(&rest[1..close])?);
        rest = rest[close + 1..].trim_start();
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(format!("unexpected '{rest}' after predicate"));
        }
    }

    Ok(Step {
        descendant,
        test,
        predicates,
    })
}

/// Index of the `]` closing the predicate that opens at `text[0]`.
fn closing_bracket(text: &str) -> std::result::Result<usize, String> {
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => return Err("nested predicates are not supported".into()),
            (None, ']') => return Ok(i),
            _ => {}
        }
    }
    Err("unclosed predicate".into())
}

fn parse_node_test(head: &str) -> std::result::Result<NodeTest, String> {
    match head {
        "" => Err("missing node test".into()),
        "." => Ok(NodeTest::SelfNode),
        ".." => Ok(NodeTest::Parent),
        "*" => Ok(NodeTest::AnyElement),
        "@*" => Ok(NodeTest::AnyAttribute),
        "text()" => Ok(NodeTest::Text),
        "node()" => Ok(NodeTest::AnyNode),
        _ if head.contains("::") => Err(format!("unsupported axis in '{head}'")),
        _ => match head.strip_prefix('@') {
            Some(attr) => Ok(NodeTest::Attribute(parse_name(attr)?)),
            None => Ok(NodeTest::Name(parse_name(head)?)),
        },
    }
}

fn parse_predicate(inner: &str) -> std::result::Result<Predicate, String> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Err("empty predicate".into());
    }
    if let Ok(n) = inner.parse::<usize>() {
        if n == 0 {
            return Err("positions start at 1".into());
        }
        return Ok(Predicate::Position(n));
    }
    if inner == "last()" {
        return Ok(Predicate::Last);
    }

    let (lhs, value) = match inner.split_once('=') {
        Some((lhs, rhs)) => (lhs.trim(), Some(parse_literal(rhs.trim())?)),
        None => (inner, None),
    };

    match (lhs.strip_prefix('@'), value) {
        (Some(attr), Some(v)) => Ok(Predicate::AttributeEquals(parse_name(attr)?, v)),
        (Some(attr), None) => Ok(Predicate::HasAttribute(parse_name(attr)?)),
        (None, Some(v)) => Ok(Predicate::ChildEquals(parse_name(lhs)?, v)),
        (None, None) => Ok(Predicate::HasChild(parse_name(lhs)?)),
    }
}

fn parse_literal(text: &str) -> std::result::Result<String, String> {
    let mut chars = text.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open @ ('\'' | '"')), Some(close)) if open == close && text.len() >= 2 => {
            Ok(text[1..text.len() - 1].to_string())
        }
        _ => Err(format!("expected quoted string, found '{text}'")),
    }
}

/// Validate a (possibly prefixed) name and return its local part.
fn parse_name(name: &str) -> std::result::Result<String, String> {
    let local = name.rsplit_once(':').map_or(name, |(_, local)| local);
    let valid = local
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && local
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(local.to_string())
    } else {
        Err(format!("invalid name '{name}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::MarkupDocument;

    const COMPONENT: &str = r#"<c01 level="series" id="ser1">
        <did>
            <unitid type="call">MS-1</unitid>
            <unitid type="local">L-7</unitid>
            <unittitle>Correspondence</unittitle>
            <unitdate normal="1901/1910">1901-1910</unitdate>
        </did>
        <scopecontent><p>First.</p><p>Second.</p></scopecontent>
        <c02 level="file"><did><unittitle>Letters</unittitle></did></c02>
    </c01>"#;

    fn texts(xml: &str, path: &str) -> Vec<String> {
        let doc = MarkupDocument::parse(xml).expect("parse");
        doc.root()
            .query(path)
            .expect("query")
            .iter()
            .map(QueryMatch::text)
            .collect()
    }

    #[test]
    fn child_steps_resolve() {
        assert_eq!(texts(COMPONENT, "did/unittitle"), vec!["Correspondence"]);
        assert_eq!(texts(COMPONENT, "did/unitid"), vec!["MS-1", "L-7"]);
        assert!(texts(COMPONENT, "did/missing").is_empty());
    }

    #[test]
    fn leading_separators_are_stripped() {
        assert_eq!(texts(COMPONENT, "/did/unittitle"), vec!["Correspondence"]);
        assert_eq!(texts(COMPONENT, "//did/unittitle"), vec!["Correspondence"]);
    }

    #[test]
    fn descendant_axis_finds_nested_nodes() {
        assert_eq!(
            texts(COMPONENT, "did//unittitle"),
            vec!["Correspondence"]
        );
        assert_eq!(
            texts(COMPONENT, ".//unittitle"),
            vec!["Correspondence", "Letters"]
        );
    }

    #[test]
    fn attributes_and_predicates() {
        assert_eq!(texts(COMPONENT, "@level"), vec!["series"]);
        assert_eq!(texts(COMPONENT, "did/unitdate/@normal"), vec!["1901/1910"]);
        assert_eq!(texts(COMPONENT, "did/unitid[@type='local']"), vec!["L-7"]);
        assert_eq!(texts(COMPONENT, "did/unitid[2]"), vec!["L-7"]);
        assert_eq!(texts(COMPONENT, "scopecontent/p[last()]"), vec!["Second."]);
        assert_eq!(texts(COMPONENT, "did[unitid='MS-1']/unittitle"), vec!["Correspondence"]);
        assert!(texts(COMPONENT, "did/unitid[@type=\"other\"]").is_empty());
        assert_eq!(texts(COMPONENT, "@*"), vec!["series", "ser1"]);
    }

    #[test]
    fn self_parent_and_text_steps() {
        assert_eq!(texts(COMPONENT, "did/unittitle/../unitdate"), vec!["1901-1910"]);
        assert_eq!(texts(COMPONENT, "did/unittitle/text()"), vec!["Correspondence"]);
        assert_eq!(texts(COMPONENT, "./did/./unittitle"), vec!["Correspondence"]);
    }

    #[test]
    fn prefixed_names_match_local_name() {
        let xml = r#"<ead:c01 xmlns:ead="urn:isbn:1-931666-22-9"><ead:unittitle>Series</ead:unittitle></ead:c01>"#;
        assert_eq!(texts(xml, "ead:unittitle"), vec!["Series"]);
        assert_eq!(texts(xml, "unittitle"), vec!["Series"]);
    }

    #[test]
    fn descendant_results_are_deduplicated() {
        let xml = "<a><b><b><c>x</c></b></b></a>";
        assert_eq!(texts(xml, ".//b//c"), vec!["x"]);
    }

    #[test]
    fn descendant_matches_come_back_in_document_order() {
        let xml = r#"<a><x n="1"><y>first</y></x><y>second</y><x n="2"><y>third</y></x></a>"#;
        assert_eq!(texts(xml, ".//y"), vec!["first", "second", "third"]);
    }

    #[test]
    fn attributes_follow_their_owner() {
        let xml = r#"<a><x n="1" m="2"><x n="3"/></x></a>"#;
        assert_eq!(texts(xml, ".//x/@*"), vec!["1", "2", "3"]);
        assert_eq!(texts(xml, "//x/@n"), vec!["1"]);
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for bad in [
            "",
            "/",
            "did/",
            "did///unittitle",
            "unitid[",
            "unitid]",
            "unitid[0]",
            "unitid[@type=call]",
            "unitid[@type='call'",
            "child::unitid",
            "concat(a)",
            "unitid[a[1]]",
        ] {
            let err = PathQuery::parse(bad).expect_err(bad);
            assert!(matches!(err, EadHierError::Query { .. }), "{bad}: {err}");
        }
    }
}
