//! Re-serialises a scraped element to HTML while dropping the parts we never
//! want to republish.

use scraper::{ElementRef, Node};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

#[derive(Debug, Clone, Copy)]
pub struct SanitizeRules {
    /// Elements removed along with their subtree.
    pub drop_tags: &'static [&'static str],
    /// Elements whose class or id contains one of these are removed.
    pub drop_class_hints: &'static [&'static str],
    /// A heading containing one of these ends the content at its level.
    pub cut_headings: &'static [&'static str],
    /// Remove elements with no text and no images inside.
    pub drop_empty: bool,
}

pub const BLOG_RULES: SanitizeRules = SanitizeRules {
    drop_tags: &["script", "style", "noscript"],
    drop_class_hints: &[],
    cut_headings: &[],
    drop_empty: false,
};

/// Doctor profiles are full of booking widgets.
pub const PROFILE_RULES: SanitizeRules = SanitizeRules {
    drop_tags: &[
        "script", "style", "noscript", "form", "iframe", "button", "select", "input", "textarea",
    ],
    drop_class_hints: &[
        "appoint", "booking", "elementor-widget-form", "elementor-form", "wpcf7", "wpforms", "recaptcha",
        "contact-form", "mktoform", "hs-form",
    ],
    cut_headings: &["appointment", "book", "schedule"],
    drop_empty: true,
};

/// Inner HTML of `element` with `rules` applied. Comments are always dropped.
pub fn sanitize_html(element: ElementRef<'_>, rules: &SanitizeRules) -> String {
    let mut out = String::new();
    write_children(element, rules, &mut out);
    out.trim().to_string()
}

fn write_children(element: ElementRef<'_>, rules: &SanitizeRules, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => escape_text(text, out),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else { continue };
                if is_cut_heading(child, rules) {
                    break;
                }
                write_element(child, rules, out);
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, rules: &SanitizeRules, out: &mut String) {
    let value = element.value();
    let name = value.name();

    if rules.drop_tags.contains(&name) || has_class_hint(element, rules) {
        return;
    }
    if rules.drop_empty && is_empty(element) {
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, val) in value.attrs() {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        escape_attr(val, out);
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }
    write_children(element, rules, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn has_class_hint(element: ElementRef<'_>, rules: &SanitizeRules) -> bool {
    if rules.drop_class_hints.is_empty() {
        return false;
    }
    let value = element.value();
    let class = value.attr("class").unwrap_or_default().to_ascii_lowercase();
    let id = value.attr("id").unwrap_or_default().to_ascii_lowercase();
    rules
        .drop_class_hints
        .iter()
        .any(|hint| class.contains(hint) || id.contains(hint))
}

fn is_cut_heading(element: ElementRef<'_>, rules: &SanitizeRules) -> bool {
    if rules.cut_headings.is_empty() || !HEADINGS.contains(&element.value().name()) {
        return false;
    }
    let text = element.text().collect::<String>().to_lowercase();
    rules.cut_headings.iter().any(|word| text.contains(word))
}

fn is_empty(element: ElementRef<'_>) -> bool {
    let name = element.value().name();
    if name == "img" || name == "figure" || name == "br" {
        return false;
    }
    let has_text = element.text().any(|t| !t.trim().is_empty());
    let has_image = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|e| e.value().name() == "img");
    !has_text && !has_image
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
