use crate::error::AppError;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use scraper::node::Text;
use scraper::{ElementRef, Html, Node, Selector};
use std::path::Path;

lazy_static! {
    static ref LINE_BREAKS: Selector = Selector::parse("br").expect("valid selector");
    static ref PARAGRAPHS: Selector = Selector::parse("p").expect("valid selector");
    static ref PAGINATION: Selector =
        Selector::parse("a.next, a.prev, img.next, img.prev").expect("valid selector");
    static ref SELF_CLOSING_TAG: Regex = Regex::new(
        r#"<([A-Za-z][A-Za-z0-9:_.-]*)((?:\s+[^\s"'<>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*/>"#
    )
    .expect("valid regex");
    static ref DOCTYPE: Regex = Regex::new(r"(?i)<!DOCTYPE[^>]*>").expect("valid regex");
}

const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Elements that never have content. Only these may stay in `<tag/>` form
/// when the markup is handed to the HTML parser.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Counts of what a normalization pass changed in one document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeStats {
    pub line_breaks: usize,
    pub paragraphs: usize,
    pub pagination_links: usize,
}

/// Normalizes the document at `path` and overwrites it in place.
pub fn normalize_html_file(path: &Path) -> Result<NormalizeStats, AppError> {
    log::trace!("Reading markup: {:?}", path);
    let markup = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;

    let (normalized, stats) = normalize_markup(&markup);

    std::fs::write(path, normalized).map_err(|e| AppError::io(path, e))?;
    log::debug!(
        "Normalized {:?}: {} line breaks, {} paragraphs, {} pagination links",
        path,
        stats.line_breaks,
        stats.paragraphs,
        stats.pagination_links
    );
    Ok(stats)
}

/// Removes `<br>`, collapses every paragraph to its single-spaced text and
/// deletes `next`/`prev` pagination anchors and images.
///
/// XHTML input (an XML declaration or the XHTML namespace) is written back
/// as XHTML: void elements self-close and the original DOCTYPE is kept.
/// Anything else is serialized as HTML.
pub fn normalize_markup(markup: &str) -> (String, NormalizeStats) {
    let xhtml = is_xhtml(markup);
    let (prolog, body) = split_xml_prolog(markup);
    let mut document = Html::parse_document(&expand_self_closing(body));

    let stats = NormalizeStats {
        line_breaks: remove_matching(&mut document, &LINE_BREAKS),
        paragraphs: collapse_paragraphs(&mut document),
        pagination_links: remove_matching(&mut document, &PAGINATION),
    };

    let serialized = if xhtml {
        let doctype = DOCTYPE.find(body).map(|m| m.as_str());
        write_xhtml(&document, doctype)
    } else {
        document.html()
    };
    let serialized = match prolog {
        Some(prolog) => format!("{}\n{}", prolog, serialized),
        None => serialized,
    };
    (serialized, stats)
}

fn is_xhtml(markup: &str) -> bool {
    markup
        .trim_start_matches('\u{feff}')
        .trim_start()
        .starts_with("<?xml")
        || markup.contains(XHTML_NAMESPACE)
}

/// The HTML parser would turn an XML declaration into a comment, so it is
/// cut off here and written back unchanged.
fn split_xml_prolog(markup: &str) -> (Option<&str>, &str) {
    let trimmed = markup.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return (Some(&trimmed[..end + 2]), &trimmed[end + 2..]);
        }
    }
    (None, markup)
}

/// Rewrites `<tag .../>` as `<tag ...></tag>` for every non-void element.
/// The HTML parser ignores the trailing slash, so `<title/>` would otherwise
/// open a title that swallows the rest of the document.
fn expand_self_closing(markup: &str) -> std::borrow::Cow<'_, str> {
    SELF_CLOSING_TAG.replace_all(markup, |caps: &Captures| {
        let name = &caps[1];
        if VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
            caps[0].to_string()
        } else {
            format!("<{}{}></{}>", name, &caps[2], name)
        }
    })
}

fn remove_matching(document: &mut Html, selector: &Selector) -> usize {
    let ids: Vec<_> = document.select(selector).map(|element| element.id()).collect();
    for id in &ids {
        if let Some(mut node) = document.tree.get_mut(*id) {
            node.detach();
        }
    }
    ids.len()
}

fn collapse_paragraphs(document: &mut Html) -> usize {
    let ids: Vec<_> = document.select(&PARAGRAPHS).map(|element| element.id()).collect();

    for id in &ids {
        let Some(paragraph) = document.tree.get(*id) else {
            continue;
        };
        let text = paragraph
            .descendants()
            .filter_map(|node| node.value().as_text())
            .flat_map(|text| text.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ");
        let children: Vec<_> = paragraph.children().map(|child| child.id()).collect();

        for child in children {
            if let Some(mut node) = document.tree.get_mut(child) {
                node.detach();
            }
        }
        if text.is_empty() {
            continue;
        }
        if let Some(mut node) = document.tree.get_mut(*id) {
            node.append(Node::Text(Text { text: text.into() }));
        }
    }
    ids.len()
}

fn write_xhtml(document: &Html, doctype: Option<&str>) -> String {
    let mut out = String::new();
    for child in document.tree.root().children() {
        match child.value() {
            Node::Doctype(parsed) => {
                match doctype {
                    Some(original) => out.push_str(original),
                    None => {
                        out.push_str("<!DOCTYPE ");
                        out.push_str(parsed.name());
                        out.push('>');
                    }
                }
                out.push('\n');
            }
            Node::Comment(comment) => write_comment(comment, &mut out),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    write_element(element, &mut out);
                }
            }
            _ => {}
        }
    }
    out
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let value = element.value();
    let name = value.name();
    out.push('<');
    out.push_str(name);
    for (attr, text) in value.attrs.iter() {
        out.push(' ');
        if let Some(prefix) = &attr.prefix {
            out.push_str(prefix);
            out.push(':');
        }
        out.push_str(&attr.local);
        out.push_str("=\"");
        escape_into(text, true, out);
        out.push('"');
    }
    if VOID_ELEMENTS.contains(&name) {
        out.push_str("/>");
        return;
    }
    out.push('>');

    let raw_text = matches!(name, "script" | "style");
    for child in element.children() {
        match child.value() {
            Node::Text(text) if raw_text => out.push_str(text),
            Node::Text(text) => escape_into(text, false, out),
            Node::Comment(comment) => write_comment(comment, out),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(child, out);
                }
            }
            _ => {}
        }
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn write_comment(comment: &str, out: &mut String) {
    out.push_str("<!--");
    out.push_str(comment);
    out.push_str("-->");
}

/// XML escaping. Non-breaking spaces stay literal characters, since `&nbsp;`
/// is not a predefined XML entity.
fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
