//! Rendered element tree for the simulated app.

/// What clicking an element does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Login,
    Logout,
    AddItem,
    EditItem(u64),
    SaveItem(u64),
    DeleteItem(u64),
    ConfirmModal,
    CancelModal,
}

/// Which piece of app state an input edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binding {
    Username,
    Password,
    NewItem,
    EditName,
}

/// One rendered element.
///
/// `key` is stable across re-renders for as long as the element stays
/// mounted, so handles survive typing but go stale when a row or a screen
/// goes away.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub key: String,
    pub tag: &'static str,
    pub id: Option<String>,
    pub classes: Vec<&'static str>,
    pub text: String,
    pub value: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub displayed: bool,
    pub enabled: bool,
    pub in_overlay: bool,
    pub action: Option<Action>,
    pub binding: Option<Binding>,
}

impl Node {
    pub fn new(tag: &'static str, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tag,
            id: None,
            classes: Vec::new(),
            text: String::new(),
            value: String::new(),
            parent: None,
            children: Vec::new(),
            displayed: true,
            enabled: true,
            in_overlay: false,
            action: None,
            binding: None,
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, classes: &[&'static str]) -> Self {
        self.classes.extend_from_slice(classes);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn on_click(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn bind(mut self, binding: Binding, value: &str) -> Self {
        self.binding = Some(binding);
        self.value = value.to_string();
        self
    }

    fn is_block(&self) -> bool {
        matches!(
            self.tag,
            "div" | "p" | "ul" | "li" | "h1" | "h2" | "h3" | "body" | "html"
        )
    }
}

/// Element tree in document (pre-)order
#[derive(Debug, Clone, Default)]
pub(crate) struct Dom {
    nodes: Vec<Node>,
}

impl Dom {
    /// An empty document: `<html><body></body></html>`
    pub fn blank() -> Self {
        let mut dom = Self::default();
        let html = dom.append(None, Node::new("html", "html"));
        dom.append(Some(html), Node::new("body", "body"));
        dom
    }

    /// The `<body>` element
    pub const fn body(&self) -> usize {
        1
    }

    pub fn append(&mut self, parent: Option<usize>, mut node: Node) -> usize {
        let idx = self.nodes.len();
        node.parent = parent;
        if let Some(p) = parent {
            node.in_overlay |= self.nodes[p].in_overlay;
            self.nodes[p].children.push(idx);
        }
        self.nodes.push(node);
        idx
    }

    /// Mark a subtree root as an overlay; everything appended below inherits it
    pub fn mark_overlay(&mut self, idx: usize) {
        self.nodes[idx].in_overlay = true;
    }

    /// Render `idx` and its subtree as `display: none`
    pub fn hide(&mut self, idx: usize) {
        for node in std::iter::once(idx).chain(self.descendants(idx)) {
            self.nodes[node].displayed = false;
        }
    }

    pub fn disable(&mut self, idx: usize) {
        self.nodes[idx].enabled = false;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.nodes[idx].parent
    }

    pub fn children(&self, idx: usize) -> &[usize] {
        &self.nodes[idx].children
    }

    pub fn find_key(&self, key: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.key == key)
    }

    pub fn has_overlay(&self) -> bool {
        self.nodes.iter().any(|n| n.in_overlay)
    }

    /// All strict descendants of `idx`, in document order
    pub fn descendants(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[idx].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev());
        }
        out
    }

    pub fn is_descendant_of(&self, idx: usize, ancestor: usize) -> bool {
        let mut cur = self.parent(idx);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.parent(p);
        }
        false
    }

    /// Rendered text, block children on their own lines
    pub fn text_of(&self, idx: usize) -> String {
        let node = &self.nodes[idx];
        if !node.displayed {
            return String::new();
        }
        let mut out = node.text.trim().to_string();
        for &child in &node.children {
            let text = self.text_of(child);
            if text.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(if self.nodes[child].is_block() { '\n' } else { ' ' });
            }
            out.push_str(&text);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dom {
        let mut dom = Dom::blank();
        let body = dom.body();
        let list = dom.append(Some(body), Node::new("ul", "list").id("itemList"));
        let row = dom.append(Some(list), Node::new("li", "row:1"));
        dom.append(Some(row), Node::new("div", "row:1/label").text("ID: 1 - Name: A"));
        let actions = dom.append(Some(row), Node::new("div", "row:1/actions"));
        dom.append(Some(actions), Node::new("button", "row:1/edit").text("Edit"));
        dom.append(Some(actions), Node::new("button", "row:1/delete").text("Delete"));
        dom
    }

    #[test]
    fn test_text_joins_blocks_and_inlines() {
        let dom = sample();
        let list = dom.find_key("list").unwrap();
        assert_eq!(dom.text_of(list), "ID: 1 - Name: A\nEdit Delete");
    }

    #[test]
    fn test_descendants_in_document_order() {
        let dom = sample();
        let list = dom.find_key("list").unwrap();
        let keys: Vec<&str> = dom
            .descendants(list)
            .into_iter()
            .map(|i| dom.node(i).key.as_str())
            .collect();
        assert_eq!(
            keys,
            vec!["row:1", "row:1/label", "row:1/actions", "row:1/edit", "row:1/delete"]
        );
    }

    #[test]
    fn test_overlay_is_inherited() {
        let mut dom = Dom::blank();
        let body = dom.body();
        let overlay = dom.append(Some(body), Node::new("div", "modal"));
        dom.mark_overlay(overlay);
        let button = dom.append(Some(overlay), Node::new("button", "confirm"));
        assert!(dom.node(button).in_overlay);
        assert!(dom.has_overlay());
        assert!(dom.is_descendant_of(button, body));
    }

    #[test]
    fn test_hide_covers_subtree() {
        let mut dom = sample();
        let row = dom.find_key("row:1").unwrap();
        dom.hide(row);
        let edit = dom.find_key("row:1/edit").unwrap();
        assert!(!dom.node(edit).displayed);
        let list = dom.find_key("list").unwrap();
        assert!(dom.node(list).displayed);
        assert_eq!(dom.text_of(list), "");
    }
}
