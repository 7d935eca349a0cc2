//! The styled box tree seen through a provider trait, plus an in-memory
//! implementation used by the CLI and the tests.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::error::SelectorError;
use crate::model::{BoxContent, ComputedStyle, PxRect, StyledBox};

/// Access to a laid-out, styled document. Any layout engine can sit behind it.
pub trait LayoutProvider {
    type Node: Clone + Eq + Hash + fmt::Debug;

    /// Geometry, style and content of one node; `None` for detached nodes.
    fn get_box(&self, node: &Self::Node) -> Option<StyledBox>;

    /// Children in document order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Evaluate one selector against a node.
    fn matches(&self, node: &Self::Node, selector: &str) -> Result<bool, SelectorError>;

    /// First node in document order matching `selector`.
    fn query(&self, selector: &str) -> Option<Self::Node>;

    /// Resolves once fonts, images and layout have settled.
    fn ready(&self) -> BoxFuture<'_, ()> {
        Box::pin(futures::future::ready(()))
    }
}

/// True when any selector matches. Selectors that fail to evaluate count as
/// non-matching.
pub fn matches_any<P: LayoutProvider>(provider: &P, node: &P::Node, selectors: &[String]) -> bool {
    selectors.iter().any(|sel| match provider.matches(node, sel) {
        Ok(hit) => hit,
        Err(e) => {
            log::debug!("selector ignored: {e}");
            false
        }
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxId(pub u32);

/// Hands out stable integer ids to provider nodes on first visit.
pub struct BoxArena<N> {
    ids: HashMap<N, BoxId>,
}

impl<N: Clone + Eq + Hash> BoxArena<N> {
    pub fn new() -> Self {
        Self { ids: HashMap::new() }
    }

    pub fn id(&mut self, node: &N) -> BoxId {
        let next = BoxId(self.ids.len() as u32);
        *self.ids.entry(node.clone()).or_insert(next)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<N: Clone + Eq + Hash> Default for BoxArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialized form of a box and its subtree.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct BoxNode {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub rect: PxRect,
    pub style: ComputedStyle,
    pub content: BoxContent,
    pub children: Vec<BoxNode>,
}

impl BoxNode {
    pub fn element(tag: &str, rect: PxRect, style: ComputedStyle) -> Self {
        Self {
            tag: tag.to_string(),
            rect,
            style,
            ..Default::default()
        }
    }

    pub fn text(rect: PxRect, style: ComputedStyle, text: &str) -> Self {
        Self {
            tag: "#text".to_string(),
            rect,
            style,
            content: BoxContent::Text {
                text: text.to_string(),
            },
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_content(mut self, content: BoxContent) -> Self {
        self.content = content;
        self
    }

    pub fn child(mut self, child: BoxNode) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeIndex(pub usize);

struct NodeData {
    styled: StyledBox,
    children: Vec<NodeIndex>,
}

/// Arena-backed tree implementing [`LayoutProvider`].
pub struct DocumentTree {
    nodes: Vec<NodeData>,
    roots: Vec<NodeIndex>,
}

impl DocumentTree {
    pub fn new(roots: Vec<BoxNode>) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        };
        for root in roots {
            let idx = tree.insert(root);
            tree.roots.push(idx);
        }
        tree
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Input {
            Many(Vec<BoxNode>),
            One(Box<BoxNode>),
        }
        let roots = match serde_json::from_str::<Input>(json)? {
            Input::Many(v) => v,
            Input::One(b) => vec![*b],
        };
        Ok(Self::new(roots))
    }

    fn insert(&mut self, node: BoxNode) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len());
        let BoxNode {
            tag,
            id,
            classes,
            rect,
            style,
            content,
            children,
        } = node;
        self.nodes.push(NodeData {
            styled: StyledBox {
                tag,
                id,
                classes,
                rect,
                style,
                content,
            },
            children: Vec::new(),
        });
        let kids: Vec<NodeIndex> = children.into_iter().map(|c| self.insert(c)).collect();
        self.nodes[idx.0].children = kids;
        idx
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn walk(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        let mut stack: Vec<NodeIndex> = self.roots.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
            Some(next)
        })
    }
}

/// Compound selector: `tag`, `#id`, `.class` and combinations such as
/// `div.note#intro`. Combinators, attributes and pseudo-classes are rejected.
#[derive(Debug, Default, PartialEq)]
struct Compound<'a> {
    tag: Option<&'a str>,
    id: Option<&'a str>,
    classes: Vec<&'a str>,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(sel: &str) -> Result<Compound<'_>, SelectorError> {
    let invalid = || SelectorError(sel.to_string());
    if sel.is_empty() || sel == "*" {
        return if sel == "*" {
            Ok(Compound::default())
        } else {
            Err(invalid())
        };
    }
    let mut out = Compound::default();
    let mut rest = sel;
    let tag_len = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
    if tag_len > 0 {
        out.tag = Some(&rest[..tag_len]);
        rest = &rest[tag_len..];
    }
    while let Some(marker) = rest.chars().next() {
        let body = &rest[1..];
        let len = body.find(|c: char| !is_ident_char(c)).unwrap_or(body.len());
        if len == 0 {
            return Err(invalid());
        }
        match marker {
            '#' => out.id = Some(&body[..len]),
            '.' => out.classes.push(&body[..len]),
            _ => return Err(invalid()),
        }
        rest = &body[len..];
    }
    Ok(out)
}

fn compound_matches(c: &Compound<'_>, b: &StyledBox) -> bool {
    c.tag.is_none_or(|t| t.eq_ignore_ascii_case(&b.tag))
        && c.id.is_none_or(|id| b.id.as_deref() == Some(id))
        && c.classes.iter().all(|cls| b.classes.iter().any(|have| have == cls))
}

/// Match a comma-separated selector list against a box.
pub fn selector_matches(selector: &str, b: &StyledBox) -> Result<bool, SelectorError> {
    let mut hit = false;
    for part in selector.split(',') {
        let compound = parse_compound(part.trim())?;
        hit |= compound_matches(&compound, b);
    }
    Ok(hit)
}

impl LayoutProvider for DocumentTree {
    type Node = NodeIndex;

    fn get_box(&self, node: &NodeIndex) -> Option<StyledBox> {
        self.nodes.get(node.0).map(|n| n.styled.clone())
    }

    fn children(&self, node: &NodeIndex) -> Vec<NodeIndex> {
        self.nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn matches(&self, node: &NodeIndex, selector: &str) -> Result<bool, SelectorError> {
        match self.nodes.get(node.0) {
            Some(n) => selector_matches(selector, &n.styled),
            None => Ok(false),
        }
    }

    fn query(&self, selector: &str) -> Option<NodeIndex> {
        self.walk()
            .find(|idx| selector_matches(selector, &self.nodes[idx.0].styled).unwrap_or(false))
    }
}
