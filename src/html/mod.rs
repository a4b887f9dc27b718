//! Error-tolerant HTML fragment parser.
//!
//! Builds nodes inside a [`Document`] arena from HTML text. The parser
//! accepts the usual malformed-but-common markup:
//!
//! - Missing closing tags (auto-closed based on HTML content model rules)
//! - Unquoted attribute values (`<div class=main>`)
//! - Void elements that never need closing (`<br>`, `<img>`, `<hr>`, etc.)
//! - Case-insensitive tag name matching
//! - Bare `&` characters (not just `&amp;`)
//! - Boolean attributes without values (`<input disabled>`)
//!
//! Unlike a full document parser it never synthesizes `html`, `head` or
//! `body`: the parsed nodes land exactly where they appear. Output always
//! goes into a fresh fragment node, so nothing is indexed until the caller
//! moves the nodes into the document.

use crate::error::HtmlError;
use crate::tree::{Attribute, Document, NodeId};

/// Maximum element nesting depth before parsing aborts.
const MAX_DEPTH: usize = 512;

/// Options controlling HTML parser behavior.
///
/// ```
/// use selectoxide::HtmlParseOptions;
///
/// let opts = HtmlParseOptions::default().no_blanks(true);
/// assert!(opts.no_blanks);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HtmlParseOptions {
    /// If true, strip whitespace-only text nodes.
    pub no_blanks: bool,
}

impl HtmlParseOptions {
    /// Enables or disables stripping of blank text nodes.
    #[must_use]
    pub fn no_blanks(mut self, yes: bool) -> Self {
        self.no_blanks = yes;
        self
    }
}

/// Parses `input` into a new fragment node of `doc`, returning the fragment.
///
/// # Errors
///
/// Returns `HtmlError` if elements nest deeper than the parser allows.
pub fn parse_fragment(
    doc: &mut Document,
    input: &str,
    options: &HtmlParseOptions,
) -> Result<NodeId, HtmlError> {
    let fragment = doc.create_fragment_node();
    let mut parser = HtmlParser {
        input,
        pos: 0,
        doc,
        options,
        fragment,
        open_elements: Vec::new(),
    };
    parser.parse_content()?;
    Ok(fragment)
}

// --- Void elements (elements that must not have content) ---

/// Returns true if the given tag name (lowercase) is a void element.
fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Returns true if `tag` is an element whose opening auto-closes `open_tag`.
fn auto_closes(open_tag: &str, tag: &str) -> bool {
    match open_tag {
        "p" => matches!(
            tag,
            "p" | "div"
                | "ul"
                | "ol"
                | "dl"
                | "pre"
                | "table"
                | "blockquote"
                | "h1"
                | "h2"
                | "h3"
                | "h4"
                | "h5"
                | "h6"
                | "hr"
                | "form"
                | "section"
                | "article"
                | "header"
                | "footer"
                | "nav"
        ),
        "li" => tag == "li",
        "dt" => matches!(tag, "dt" | "dd"),
        "dd" => matches!(tag, "dt" | "dd"),
        "tr" => tag == "tr",
        "td" | "th" => matches!(tag, "td" | "th" | "tr"),
        "option" => matches!(tag, "option" | "optgroup"),
        "optgroup" => tag == "optgroup",
        _ => false,
    }
}

/// Returns true if `tag` is a raw text element whose content is not parsed.
fn is_raw_text_element(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "textarea" | "title")
}

/// Resolves the named character references this parser knows.
fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{A0}',
        "copy" => '\u{A9}',
        "reg" => '\u{AE}',
        "trade" => '\u{2122}',
        "hellip" => '\u{2026}',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "laquo" => '\u{AB}',
        "raquo" => '\u{BB}',
        "middot" => '\u{B7}',
        "times" => '\u{D7}',
        "euro" => '\u{20AC}',
        _ => return None,
    })
}

// --- The HTML Parser ---

struct HtmlParser<'a> {
    input: &'a str,
    /// Byte offset into `input`.
    pos: usize,
    doc: &'a mut Document,
    options: &'a HtmlParseOptions,
    fragment: NodeId,
    /// Stack of open element node IDs and their lowercase tag names.
    open_elements: Vec<(NodeId, String)>,
}

impl HtmlParser<'_> {
    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn looking_at(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn looking_at_ci(&self, s: &str) -> bool {
        self.rest()
            .as_bytes()
            .get(..s.len())
            .is_some_and(|b| b.eq_ignore_ascii_case(s.as_bytes()))
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.rest().chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn skip_to_gt(&mut self) {
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'>' {
                break;
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn current_parent(&self) -> NodeId {
        self.open_elements
            .last()
            .map_or(self.fragment, |&(id, _)| id)
    }

    fn parse_content(&mut self) -> Result<(), HtmlError> {
        while !self.at_end() {
            if self.looking_at("<!--") {
                self.parse_comment();
            } else if self.looking_at("</") {
                self.parse_end_tag();
            } else if self.peek() == Some(b'<') && self.peek_at(1).is_some_and(|b| b.is_ascii_alphabetic()) {
                self.parse_start_tag()?;
            } else if self.peek() == Some(b'<') && matches!(self.peek_at(1), Some(b'!' | b'?')) {
                // Doctypes and processing instructions carry nothing we keep.
                self.skip_to_gt();
            } else {
                self.parse_text();
            }
        }
        Ok(())
    }

    // --- Start Tag ---

    fn parse_start_tag(&mut self) -> Result<(), HtmlError> {
        let tag_offset = self.pos;
        self.pos += 1; // consume '<'
        let tag = self
            .take_while(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':')
            .to_ascii_lowercase();

        let attributes = self.parse_attributes();
        self.skip_whitespace();

        let explicit_self_close = self.peek() == Some(b'/');
        if explicit_self_close {
            self.pos += 1;
        }
        if self.peek() == Some(b'>') {
            self.pos += 1;
        } else {
            self.skip_to_gt();
        }

        self.handle_auto_close(&tag);

        let parent = self.current_parent();
        let element = self.doc.create_element_with_attributes(&tag, attributes);
        self.doc.append_child(parent, element);

        if is_void_element(&tag) || explicit_self_close {
            return Ok(());
        }

        if is_raw_text_element(&tag) {
            self.parse_raw_text(element, &tag);
            return Ok(());
        }

        if self.open_elements.len() >= MAX_DEPTH {
            return Err(HtmlError {
                message: format!("maximum nesting depth of {MAX_DEPTH} exceeded at <{tag}>"),
                offset: tag_offset,
            });
        }
        self.open_elements.push((element, tag));
        Ok(())
    }

    /// Pops open elements that the new tag implicitly closes.
    fn handle_auto_close(&mut self, new_tag: &str) {
        while self
            .open_elements
            .last()
            .is_some_and(|(_, open_tag)| auto_closes(open_tag, new_tag))
        {
            self.open_elements.pop();
        }
    }

    // --- End Tag ---

    fn parse_end_tag(&mut self) {
        self.pos += 2; // consume '</'
        let tag = self
            .take_while(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':')
            .to_ascii_lowercase();
        self.skip_to_gt();

        // Stray end tags are ignored; a matched one closes everything above it.
        if let Some(idx) = self.open_elements.iter().rposition(|(_, name)| *name == tag) {
            self.open_elements.truncate(idx);
        }
    }

    // --- Attributes ---

    fn parse_attributes(&mut self) -> Vec<Attribute> {
        let mut attributes = Vec::new();

        loop {
            self.skip_whitespace();
            if self.at_end() || self.peek() == Some(b'>') || self.looking_at("/>") {
                break;
            }

            let name = self
                .take_while(|b| {
                    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'<' | b'"' | b'\'')
                })
                .to_owned();
            if name.is_empty() {
                // Skip the bad character and continue
                self.pos += 1;
                continue;
            }

            self.skip_whitespace();
            // Boolean attributes get an empty value.
            let value = if self.peek() == Some(b'=') {
                self.pos += 1;
                self.skip_whitespace();
                self.parse_attr_value()
            } else {
                String::new()
            };
            attributes.push(Attribute::new(&name, value));
        }

        attributes
    }

    fn parse_attr_value(&mut self) -> String {
        let mut value = String::new();
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                while let Some(b) = self.peek() {
                    if b == quote {
                        self.pos += 1;
                        break;
                    }
                    self.push_char_or_reference(&mut value);
                }
            }
            _ => {
                while self
                    .peek()
                    .is_some_and(|b| !b.is_ascii_whitespace() && b != b'>')
                {
                    self.push_char_or_reference(&mut value);
                }
            }
        }
        value
    }

    // --- Text Content ---

    fn parse_text(&mut self) {
        let mut text = String::new();
        while self.peek().is_some_and(|b| b != b'<') {
            self.push_char_or_reference(&mut text);
        }
        // A '<' that starts no markup is literal text.
        if text.is_empty() {
            if let Some(c) = self.next_char() {
                text.push(c);
            }
        }
        self.append_text(text);
    }

    fn append_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if self.options.no_blanks && text.chars().all(char::is_whitespace) {
            return;
        }
        let parent = self.current_parent();
        let node = self.doc.create_text(text);
        self.doc.append_child(parent, node);
    }

    // --- Raw text (script/style) ---

    fn parse_raw_text(&mut self, element: NodeId, tag: &str) {
        let end_tag = format!("</{tag}");
        let start = self.pos;
        while !self.at_end() && !self.looking_at_ci(&end_tag) {
            self.next_char();
        }
        let content = self.input[start..self.pos].to_owned();
        if !content.is_empty() {
            let node = self.doc.create_text(content);
            self.doc.append_child(element, node);
        }
        if !self.at_end() {
            self.skip_to_gt();
        }
    }

    // --- Comments ---

    fn parse_comment(&mut self) {
        self.pos += 4; // consume '<!--'
        let content = match self.rest().find("-->") {
            Some(end) => {
                let content = self.rest()[..end].to_owned();
                self.pos += end + 3;
                content
            }
            None => {
                let content = self.rest().to_owned();
                self.pos = self.input.len();
                content
            }
        };
        let parent = self.current_parent();
        let node = self.doc.create_comment(content);
        self.doc.append_child(parent, node);
    }

    // --- Character references ---

    /// Appends the next character to `buf`, resolving a character reference
    /// if one starts here. Unrecognized references are kept literally.
    fn push_char_or_reference(&mut self, buf: &mut String) {
        if self.peek() == Some(b'&') {
            if let Some((c, len)) = self.character_reference() {
                buf.push(c);
                self.pos += len;
                return;
            }
        }
        if let Some(c) = self.next_char() {
            buf.push(c);
        }
    }

    /// Decodes a reference at the cursor, returning the character and the
    /// byte length of the reference.
    fn character_reference(&self) -> Option<(char, usize)> {
        let rest = self.rest();
        let semi = rest.as_bytes().iter().take(34).position(|&b| b == b';')?;
        let body = rest.get(1..semi)?;
        let c = if let Some(num) = body.strip_prefix('#') {
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)?
        } else {
            named_entity(body)?
        };
        Some((c, semi + 1))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tree::NodeKind;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Document {
        Document::parse_html(input).unwrap()
    }

    fn tags(doc: &Document, parent: NodeId) -> Vec<String> {
        doc.element_children(parent)
            .map(|c| doc.tag_name(c).unwrap().to_owned())
            .collect()
    }

    #[test]
    fn test_parse_simple_fragment() {
        let doc = parse("<div><p>Hello</p></div>");
        let div = doc.root_element().unwrap();
        assert_eq!(doc.tag_name(div), Some("div"));
        assert_eq!(tags(&doc, div), vec!["p"]);
        assert_eq!(doc.text_content(div), "Hello");
    }

    #[test]
    fn test_no_implied_structure() {
        let doc = parse("<p>a</p><p>b</p>");
        assert_eq!(tags(&doc, doc.root()), vec!["p", "p"]);
    }

    #[test]
    fn test_void_elements() {
        let doc = parse("<div><br><img src=x.png><span>t</span></div>");
        let div = doc.root_element().unwrap();
        assert_eq!(tags(&doc, div), vec!["br", "img", "span"]);
    }

    #[test]
    fn test_case_insensitive_tags_and_attributes() {
        let doc = parse("<DIV ID=Main><P>x</p></div>");
        let div = doc.root_element().unwrap();
        assert_eq!(doc.tag_name(div), Some("div"));
        assert_eq!(doc.attribute(div, "id"), Some("Main"));
        assert_eq!(tags(&doc, div), vec!["p"]);
    }

    #[test]
    fn test_boolean_and_quoted_attributes() {
        let doc = parse("<input disabled type='text' value=\"a b\">");
        let input = doc.root_element().unwrap();
        assert_eq!(doc.attribute(input, "disabled"), Some(""));
        assert_eq!(doc.attribute(input, "type"), Some("text"));
        assert_eq!(doc.attribute(input, "value"), Some("a b"));
    }

    #[test]
    fn test_auto_close() {
        let doc = parse("<ul><li>a<li>b</ul><p>x<p>y");
        let ul = doc.root_element().unwrap();
        assert_eq!(tags(&doc, ul), vec!["li", "li"]);
        assert_eq!(tags(&doc, doc.root()), vec!["ul", "p", "p"]);
    }

    #[test]
    fn test_character_references() {
        let doc = parse("<p title=\"&lt;x&gt;\">a &amp; b &#65;&#x42; & c &bogus;</p>");
        let p = doc.root_element().unwrap();
        assert_eq!(doc.attribute(p, "title"), Some("<x>"));
        assert_eq!(doc.text_content(p), "a & b AB & c &bogus;");
    }

    #[test]
    fn test_raw_text() {
        let doc = parse("<script>if (a < b) {}</script><p>x</p>");
        let script = doc.root_element().unwrap();
        assert_eq!(doc.text_content(script), "if (a < b) {}");
        assert_eq!(tags(&doc, doc.root()), vec!["script", "p"]);
    }

    #[test]
    fn test_comments_and_doctype() {
        let doc = parse("<!DOCTYPE html><!-- note --><div></div>");
        let children: Vec<_> = doc.children(doc.root()).collect();
        assert_eq!(children.len(), 2);
        assert!(matches!(
            &doc.node(children[0]).kind,
            NodeKind::Comment { content } if content == " note "
        ));
    }

    #[test]
    fn test_no_blanks_option() {
        let opts = HtmlParseOptions::default().no_blanks(true);
        let doc = Document::parse_html_with_options("<div> <p>x</p> </div>", &opts).unwrap();
        let div = doc.root_element().unwrap();
        assert_eq!(doc.children(div).count(), 1);
    }

    #[test]
    fn test_stray_end_tag_is_ignored() {
        let doc = parse("<div></span><p></p></div>");
        let div = doc.root_element().unwrap();
        assert_eq!(tags(&doc, div), vec!["p"]);
    }

    #[test]
    fn test_fragment_is_disconnected() {
        let mut doc = Document::new();
        let nodes = doc.create_fragment("<b>x</b><i>y</i>").unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(!doc.is_connected(nodes[0]));
        assert_eq!(doc.index_len(), 0);
    }

    #[test]
    fn test_depth_limit() {
        let input = "<div>".repeat(MAX_DEPTH + 1);
        let err = Document::parse_html(&input).unwrap_err();
        assert!(err.message.contains("nesting depth"));
    }
}
