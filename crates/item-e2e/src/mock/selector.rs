//! Locator resolution over the simulated tree.
//!
//! Supports the selector shapes page objects actually use: ids, CSS compound
//! selectors (`tag`, `#id`, `.class`) joined by descendant or `>` child
//! combinators, and XPath location paths built from `/` and `//` steps with an
//! optional `[@id="..."]` or positional predicate. Anything else is rejected
//! as an invalid selector rather than silently matching nothing.

use super::dom::Dom;
use crate::locator::Locator;
use crate::result::{SuiteError, SuiteResult};

/// Resolve `locator` to node indices in document order.
///
/// With a `scope`, only strict descendants of that node are returned; XPath
/// expressions starting with `.` are evaluated relative to it.
pub(crate) fn select(dom: &Dom, locator: &Locator, scope: Option<usize>) -> SuiteResult<Vec<usize>> {
    let mut found: Vec<usize> = match locator {
        Locator::Id(id) => (0..dom.len())
            .filter(|&i| dom.node(i).id.as_deref() == Some(id.as_str()))
            .collect(),
        Locator::Css(css) => {
            let parts = parse_css(css).ok_or_else(|| invalid(locator))?;
            (0..dom.len())
                .filter(|&i| css_matches(dom, i, &parts))
                .collect()
        }
        Locator::XPath(xpath) => {
            let path = parse_xpath(xpath).ok_or_else(|| invalid(locator))?;
            eval_xpath(dom, &path, scope)
        }
    };
    if let Some(scope) = scope {
        found.retain(|&i| dom.is_descendant_of(i, scope));
    }
    Ok(found)
}

fn invalid(locator: &Locator) -> SuiteError {
    SuiteError::driver(format!("invalid selector: {locator}"))
}

// =============================================================================
// CSS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

fn parse_css(selector: &str) -> Option<Vec<(Combinator, Compound)>> {
    let mut parts = Vec::new();
    let mut combinator = Combinator::Descendant;
    let mut buf = String::new();

    for ch in selector.trim().chars().chain(std::iter::once(' ')) {
        match ch {
            '>' => {
                if !buf.is_empty() {
                    parts.push((combinator, parse_compound(&buf)?));
                    buf.clear();
                }
                combinator = Combinator::Child;
            }
            c if c.is_whitespace() => {
                if !buf.is_empty() {
                    parts.push((combinator, parse_compound(&buf)?));
                    buf.clear();
                    combinator = Combinator::Descendant;
                }
            }
            c => buf.push(c),
        }
    }
    (!parts.is_empty()).then_some(parts)
}

fn parse_compound(text: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut rest = text;

    let tag_end = rest.find(['#', '.']).unwrap_or(rest.len());
    let tag = &rest[..tag_end];
    if !tag.is_empty() && tag != "*" {
        compound.tag = Some(valid_ident(tag)?.to_ascii_lowercase());
    }
    rest = &rest[tag_end..];

    while let Some(marker) = rest.chars().next() {
        let body = &rest[1..];
        let end = body.find(['#', '.']).unwrap_or(body.len());
        let name = valid_ident(&body[..end])?.to_string();
        match marker {
            '#' => compound.id = Some(name),
            '.' => compound.classes.push(name),
            _ => return None,
        }
        rest = &body[end..];
    }
    Some(compound)
}

fn valid_ident(s: &str) -> Option<&str> {
    let ok = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    ok.then_some(s)
}

fn compound_matches(dom: &Dom, idx: usize, compound: &Compound) -> bool {
    let node = dom.node(idx);
    compound.tag.as_deref().map_or(true, |t| t == node.tag)
        && compound
            .id
            .as_deref()
            .map_or(true, |id| node.id.as_deref() == Some(id))
        && compound
            .classes
            .iter()
            .all(|c| node.classes.iter().any(|nc| nc == c))
}

fn css_matches(dom: &Dom, idx: usize, parts: &[(Combinator, Compound)]) -> bool {
    let Some(((combinator, compound), rest)) = parts.split_last() else {
        return true;
    };
    if !compound_matches(dom, idx, compound) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    match combinator {
        Combinator::Child => dom.parent(idx).is_some_and(|p| css_matches(dom, p, rest)),
        Combinator::Descendant => {
            let mut cur = dom.parent(idx);
            while let Some(p) = cur {
                if css_matches(dom, p, rest) {
                    return true;
                }
                cur = dom.parent(p);
            }
            false
        }
    }
}

// =============================================================================
// XPATH
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Id(String),
    Position(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    descendant: bool,
    name: Option<String>,
    predicate: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LocationPath {
    relative: bool,
    steps: Vec<Step>,
}

fn parse_xpath(expression: &str) -> Option<LocationPath> {
    let mut rest = expression.trim();
    let relative = rest.starts_with('.');
    if relative {
        rest = &rest[1..];
    }

    let mut steps = Vec::new();
    while !rest.is_empty() {
        let descendant = if let Some(r) = rest.strip_prefix("//") {
            rest = r;
            true
        } else if let Some(r) = rest.strip_prefix('/') {
            rest = r;
            false
        } else {
            return None;
        };

        let mut depth = 0_i32;
        let end = rest
            .char_indices()
            .find(|&(_, c)| {
                match c {
                    '[' => depth += 1,
                    ']' => depth -= 1,
                    _ => {}
                }
                c == '/' && depth == 0
            })
            .map_or(rest.len(), |(i, _)| i);
        steps.push(parse_step(&rest[..end], descendant)?);
        rest = &rest[end..];
    }
    (!steps.is_empty()).then_some(LocationPath { relative, steps })
}

fn parse_step(text: &str, descendant: bool) -> Option<Step> {
    let (name, predicate) = match text.find('[') {
        Some(open) => {
            let inner = text[open..].strip_prefix('[')?.strip_suffix(']')?;
            (&text[..open], Some(parse_predicate(inner)?))
        }
        None => (text, None),
    };
    let name = match name {
        "*" => None,
        n => Some(valid_ident(n)?.to_ascii_lowercase()),
    };
    Some(Step {
        descendant,
        name,
        predicate,
    })
}

fn parse_predicate(inner: &str) -> Option<Predicate> {
    let inner = inner.trim();
    if let Ok(position) = inner.parse::<usize>() {
        return (position > 0).then_some(Predicate::Position(position));
    }
    let value = inner.strip_prefix("@id")?.trim().strip_prefix('=')?.trim();
    let unquoted = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))?;
    Some(Predicate::Id(unquoted.to_string()))
}

/// Children of `parent`, where `None` is the document node
fn children_of(dom: &Dom, parent: Option<usize>) -> Vec<usize> {
    match parent {
        None => vec![0],
        Some(n) => dom.children(n).to_vec(),
    }
}

fn eval_xpath(dom: &Dom, path: &LocationPath, scope: Option<usize>) -> Vec<usize> {
    // `None` stands for the document node
    let mut context: Vec<Option<usize>> = vec![if path.relative { scope } else { None }];

    for step in &path.steps {
        let mut next: Vec<usize> = Vec::new();
        for ctx in &context {
            // `//x` is `/descendant-or-self::node()/x`: positions count per parent
            let parents: Vec<Option<usize>> = if step.descendant {
                let below = match ctx {
                    None => (0..dom.len()).collect(),
                    Some(n) => dom.descendants(*n),
                };
                std::iter::once(*ctx).chain(below.into_iter().map(Some)).collect()
            } else {
                vec![*ctx]
            };
            for parent in parents {
                let named: Vec<usize> = children_of(dom, parent)
                    .into_iter()
                    .filter(|&i| step.name.as_deref().map_or(true, |t| dom.node(i).tag == t))
                    .collect();
                match &step.predicate {
                    None => next.extend(named),
                    Some(Predicate::Id(id)) => next.extend(
                        named
                            .into_iter()
                            .filter(|&i| dom.node(i).id.as_deref() == Some(id.as_str())),
                    ),
                    Some(Predicate::Position(p)) => next.extend(named.get(p - 1).copied()),
                }
            }
        }
        next.sort_unstable();
        next.dedup();
        context = next.into_iter().map(Some).collect();
    }

    context.into_iter().flatten().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::dom::Node;
    use super::*;

    /// `#root > div > div > div > p` shaped like the app's items screen
    fn app_like() -> Dom {
        let mut dom = Dom::blank();
        let body = dom.body();
        let root = dom.append(Some(body), Node::new("div", "root").id("root"));
        let screen = dom.append(Some(root), Node::new("div", "screen"));
        let card = dom.append(Some(screen), Node::new("div", "card"));
        let page = dom.append(Some(card), Node::new("div", "page"));
        dom.append(Some(page), Node::new("p", "error").class(&["error"]).text("boom"));
        let list = dom.append(Some(page), Node::new("ul", "list").id("itemList"));
        for n in 1..=2 {
            let row = dom.append(Some(list), Node::new("li", format!("row:{n}")));
            dom.append(
                Some(row),
                Node::new("button", format!("row:{n}/edit")).class(&["edit-btn"]),
            );
        }
        dom
    }

    fn keys(dom: &Dom, found: &[usize]) -> Vec<String> {
        found.iter().map(|&i| dom.node(i).key.clone()).collect()
    }

    mod css_tests {
        use super::*;

        #[test]
        fn test_id_and_class() {
            let dom = app_like();
            let found = select(&dom, &Locator::css("#itemList"), None).unwrap();
            assert_eq!(keys(&dom, &found), vec!["list"]);
            let found = select(&dom, &Locator::css(".edit-btn"), None).unwrap();
            assert_eq!(keys(&dom, &found), vec!["row:1/edit", "row:2/edit"]);
        }

        #[test]
        fn test_descendant_combinator() {
            let dom = app_like();
            let found = select(&dom, &Locator::css("#itemList li"), None).unwrap();
            assert_eq!(keys(&dom, &found), vec!["row:1", "row:2"]);
        }

        #[test]
        fn test_child_combinator_chain() {
            let dom = app_like();
            let found = select(&dom, &Locator::css("#root > div > div > div > p"), None).unwrap();
            assert_eq!(keys(&dom, &found), vec!["error"]);
            let none = select(&dom, &Locator::css("#root > p"), None).unwrap();
            assert!(none.is_empty());
        }

        #[test]
        fn test_compound_tag_and_class() {
            let dom = app_like();
            let found = select(&dom, &Locator::css("p.error"), None).unwrap();
            assert_eq!(found.len(), 1);
            assert!(select(&dom, &Locator::css("div.error"), None).unwrap().is_empty());
        }

        #[test]
        fn test_scoped_lookup() {
            let dom = app_like();
            let row = dom.find_key("row:2").unwrap();
            let found = select(&dom, &Locator::css(".edit-btn"), Some(row)).unwrap();
            assert_eq!(keys(&dom, &found), vec!["row:2/edit"]);
        }

        #[test]
        fn test_unsupported_selector_is_rejected() {
            let dom = app_like();
            let err = select(&dom, &Locator::css("li:first-child"), None).unwrap_err();
            assert!(err.to_string().contains("invalid selector"));
        }
    }

    mod xpath_tests {
        use super::*;

        #[test]
        fn test_absolute_path_with_id_predicate() {
            let dom = app_like();
            let found = select(
                &dom,
                &Locator::xpath("//*[@id=\"root\"]/div/div/div/p"),
                None,
            )
            .unwrap();
            assert_eq!(keys(&dom, &found), vec!["error"]);
        }

        #[test]
        fn test_positional_predicate() {
            let dom = app_like();
            let found = select(&dom, &Locator::xpath("//ul/li[2]"), None).unwrap();
            assert_eq!(keys(&dom, &found), vec!["row:2"]);
        }

        #[test]
        fn test_positional_predicate_counts_per_parent() {
            let mut dom = Dom::blank();
            let body = dom.body();
            for list in ["a", "b"] {
                let ul = dom.append(Some(body), Node::new("ul", list));
                for n in 1..=2 {
                    dom.append(Some(ul), Node::new("li", format!("{list}/{n}")));
                }
            }
            let found = select(&dom, &Locator::xpath("//li[1]"), None).unwrap();
            assert_eq!(keys(&dom, &found), vec!["a/1", "b/1"]);
            let found = select(&dom, &Locator::xpath("//li[2]"), None).unwrap();
            assert_eq!(keys(&dom, &found), vec!["a/2", "b/2"]);
            assert!(select(&dom, &Locator::xpath("//li[3]"), None).unwrap().is_empty());
        }

        #[test]
        fn test_relative_path() {
            let dom = app_like();
            let row = dom.find_key("row:1").unwrap();
            let found = select(&dom, &Locator::xpath(".//button"), Some(row)).unwrap();
            assert_eq!(keys(&dom, &found), vec!["row:1/edit"]);
        }

        #[test]
        fn test_rooted_single_slash() {
            let dom = app_like();
            let found = select(&dom, &Locator::xpath("/html/body/div"), None).unwrap();
            assert_eq!(keys(&dom, &found), vec!["root"]);
        }

        #[test]
        fn test_malformed_expression() {
            let dom = app_like();
            assert!(select(&dom, &Locator::xpath("div[@class='x']"), None).is_err());
            assert!(select(&dom, &Locator::xpath("//div[contains(., 'x')]"), None).is_err());
        }
    }

    #[test]
    fn test_id_locator() {
        let dom = app_like();
        let found = select(&dom, &Locator::id("root"), None).unwrap();
        assert_eq!(keys(&dom, &found), vec!["root"]);
    }
}
