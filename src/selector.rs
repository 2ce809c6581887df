use crate::parsers::BumperError;
use roxmltree::{Document, Node};
use scraper::error::SelectorErrorKind;
use scraper::selector::{CssLocalName, CssString, NonTSPseudoClass, Parser, PseudoElement, Simple};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::matching::{
    self, ElementSelectorFlags, IgnoreNthChildForInvalidation, MatchingContext, MatchingMode,
    NeedsSelectorFlags, QuirksMode,
};
use selectors::parser::ParseRelative;
use selectors::{Element, NthIndexCache, OpaqueElement, SelectorImpl, SelectorList};

type Namespace = <Simple as SelectorImpl>::BorrowedNamespaceUrl;

/// A CSS selector group evaluated against `roxmltree` element trees.
///
/// Parsing uses the same grammar as `scraper`, so escapes (`my\.version`), attribute operators,
/// combinators and the structural pseudo-classes (`:first-child`, `:nth-of-type(2)`, ...) all work.
/// Names are compared case-sensitively since the documents are XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    selectors: SelectorList<Simple>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, BumperError> {
        let mut parser_input = cssparser::ParserInput::new(input);
        let mut parser = cssparser::Parser::new(&mut parser_input);

        SelectorList::parse(&Parser, &mut parser, ParseRelative::No)
            .map(|selectors| Self { selectors })
            .map_err(|e| BumperError::InvalidSelector {
                selector: input.to_string(),
                reason: SelectorErrorKind::from(e).to_string(),
            })
    }

    /// The first matching element in document order.
    pub fn select_first<'a, 'input>(&self, document: &'a Document<'input>) -> Option<Node<'a, 'input>> {
        let anchors = vec![0u8; document.descendants().count()];
        let mut nth_index_cache = NthIndexCache::default();
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            &mut nth_index_cache,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            IgnoreNthChildForInvalidation::No,
        );

        document.descendants().filter(Node::is_element).find(|node| {
            let element = XmlElement {
                node: *node,
                anchors: &anchors,
            };
            matching::matches_selector_list(&self.selectors, &element, &mut context)
        })
    }
}

/// An element node plus one byte per document node, whose addresses give each node a stable
/// identity for the nth-index cache.
#[derive(Debug, Clone, Copy)]
struct XmlElement<'s, 'a, 'input> {
    node: Node<'a, 'input>,
    anchors: &'s [u8],
}

impl<'s, 'a, 'input> XmlElement<'s, 'a, 'input> {
    fn wrap(&self, node: Node<'a, 'input>) -> Self {
        Self {
            node,
            anchors: self.anchors,
        }
    }
}

impl Element for XmlElement<'_, '_, '_> {
    type Impl = Simple;

    fn opaque(&self) -> OpaqueElement {
        match self.anchors.get(self.node.id().get_usize()) {
            Some(anchor) => OpaqueElement::new(anchor),
            None => OpaqueElement::new(self),
        }
    }

    fn parent_element(&self) -> Option<Self> {
        self.node.parent_element().map(|parent| self.wrap(parent))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.node.prev_sibling_element().map(|sibling| self.wrap(sibling))
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.node.next_sibling_element().map(|sibling| self.wrap(sibling))
    }

    fn first_element_child(&self) -> Option<Self> {
        self.node.first_element_child().map(|child| self.wrap(child))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        false
    }

    fn has_local_name(&self, name: &CssLocalName) -> bool {
        &*name.0 == self.node.tag_name().name()
    }

    fn has_namespace(&self, namespace: &Namespace) -> bool {
        &**namespace == self.node.tag_name().namespace().unwrap_or_default()
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.node.tag_name() == other.node.tag_name()
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&Namespace>,
        local_name: &CssLocalName,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        self.node.attributes().any(|attribute| {
            let in_namespace = match ns {
                NamespaceConstraint::Any => true,
                NamespaceConstraint::Specific(url) => &***url == attribute.namespace().unwrap_or_default(),
            };
            in_namespace && &*local_name.0 == attribute.name() && operation.eval_str(attribute.value())
        })
    }

    fn match_non_ts_pseudo_class(
        &self,
        pc: &NonTSPseudoClass,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        match *pc {}
    }

    fn match_pseudo_element(&self, pe: &PseudoElement, _context: &mut MatchingContext<Self::Impl>) -> bool {
        match *pe {}
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        false
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.node
            .attribute("id")
            .is_some_and(|value| case_sensitivity.eq(id.0.as_bytes(), value.as_bytes()))
    }

    fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
        self.node.attribute("class").is_some_and(|classes| {
            classes
                .split_whitespace()
                .any(|class| case_sensitivity.eq(name.0.as_bytes(), class.as_bytes()))
        })
    }

    fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
        None
    }

    fn is_part(&self, _name: &CssLocalName) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        !self
            .node
            .children()
            .any(|child| child.is_element() || (child.is_text() && child.text().is_some_and(|text| !text.is_empty())))
    }

    fn is_root(&self) -> bool {
        self.node.parent().is_some_and(|parent| parent.is_root())
    }
}
