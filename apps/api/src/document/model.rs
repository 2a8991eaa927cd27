//! WordprocessingML views over the `word/document.xml` element tree.
//!
//! The views borrow elements mutably and expose the text semantics the fill
//! engine relies on: a run's text is its `w:t` content (with tabs and breaks
//! as `\t` / `\n`), a paragraph's text is the concatenation of its runs, and a
//! cell's text is its paragraphs joined by newlines.

use super::xml::{Element, XmlDocument};
use super::DocumentError;

const BODY: &str = "w:body";
const TABLE: &str = "w:tbl";
const ROW: &str = "w:tr";
const CELL: &str = "w:tc";
const CELL_PROPS: &str = "w:tcPr";
const PARAGRAPH: &str = "w:p";
const PARAGRAPH_PROPS: &str = "w:pPr";
const HYPERLINK: &str = "w:hyperlink";
const RUN: &str = "w:r";
const RUN_PROPS: &str = "w:rPr";
const TEXT: &str = "w:t";
const TAB: &str = "w:tab";
const BREAK: &str = "w:br";
const CARRIAGE_RETURN: &str = "w:cr";

/// The main document part of a DOCX package.
#[derive(Debug, Clone)]
pub struct Document {
    xml: XmlDocument,
}

impl Document {
    pub fn from_xml(bytes: &[u8]) -> Result<Self, DocumentError> {
        let document = Self {
            xml: XmlDocument::parse(bytes)?,
        };
        if document.body().is_none() {
            return Err(DocumentError::MissingBody);
        }
        Ok(document)
    }

    pub fn to_xml(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(self.xml.to_bytes()?)
    }

    fn body(&self) -> Option<&Element> {
        self.xml.root().and_then(|root| root.child(BODY))
    }

    fn body_mut(&mut self) -> Option<&mut Element> {
        self.xml.root_mut().and_then(|root| root.child_mut(BODY))
    }

    /// Top-level tables in document order.
    pub fn tables(&mut self) -> impl Iterator<Item = Table<'_>> {
        self.body_mut()
            .into_iter()
            .flat_map(|body| body.children_named_mut(TABLE))
            .map(|el| Table { el })
    }

    /// Top-level paragraphs in document order. Paragraphs inside tables are
    /// reached through their cells.
    pub fn paragraphs(&mut self) -> impl Iterator<Item = Paragraph<'_>> {
        self.body_mut()
            .into_iter()
            .flat_map(|body| body.children_named_mut(PARAGRAPH))
            .map(|el| Paragraph { el })
    }

    /// Text of every top-level table cell, row by row.
    #[cfg(test)]
    pub fn cell_texts(&self) -> Vec<Vec<Vec<String>>> {
        self.body()
            .into_iter()
            .flat_map(|body| body.children_named(TABLE))
            .map(|table| {
                table
                    .children_named(ROW)
                    .map(|row| row.children_named(CELL).map(cell_text).collect())
                    .collect()
            })
            .collect()
    }

    #[cfg(test)]
    pub fn paragraph_texts(&self) -> Vec<String> {
        self.body()
            .into_iter()
            .flat_map(|body| body.children_named(PARAGRAPH))
            .map(paragraph_text)
            .collect()
    }
}

pub struct Table<'a> {
    el: &'a mut Element,
}

impl Table<'_> {
    pub fn rows(&mut self) -> impl Iterator<Item = Row<'_>> {
        self.el.children_named_mut(ROW).map(|el| Row { el })
    }
}

pub struct Row<'a> {
    el: &'a mut Element,
}

impl Row<'_> {
    pub fn cells(&mut self) -> impl Iterator<Item = Cell<'_>> {
        self.el.children_named_mut(CELL).map(|el| Cell { el })
    }
}

pub struct Cell<'a> {
    el: &'a mut Element,
}

impl Cell<'_> {
    pub fn text(&self) -> String {
        cell_text(self.el)
    }

    /// Replaces the cell content with a single paragraph holding `text`.
    /// Cell properties survive, as do the first paragraph's properties and
    /// its first run's formatting.
    pub fn set_text(&mut self, text: &str) {
        let first_paragraph = self.el.child(PARAGRAPH);
        let paragraph_props = first_paragraph
            .and_then(|p| p.child(PARAGRAPH_PROPS))
            .cloned();
        let run_props = first_paragraph.and_then(first_run_props);

        self.el.retain_elements(&[CELL_PROPS]);

        let mut paragraph = Element::new(PARAGRAPH);
        if let Some(props) = paragraph_props {
            paragraph = paragraph.with_child(props);
        }
        paragraph = paragraph.with_child(build_run(run_props, text));
        self.el.children.push(paragraph.into());
    }
}

pub struct Paragraph<'a> {
    el: &'a mut Element,
}

impl Paragraph<'_> {
    pub fn text(&self) -> String {
        paragraph_text(self.el)
    }

    /// Replaces all inline content with one run holding `text`, formatted like
    /// the paragraph's first run.
    pub fn set_text(&mut self, text: &str) {
        let run_props = first_run_props(self.el);
        self.el.retain_elements(&[PARAGRAPH_PROPS]);
        self.el.children.push(build_run(run_props, text).into());
    }

    /// Direct runs of the paragraph. Runs nested in hyperlinks are only
    /// reachable through the paragraph text.
    pub fn runs(&mut self) -> impl Iterator<Item = Run<'_>> {
        self.el.children_named_mut(RUN).map(|el| Run { el })
    }
}

pub struct Run<'a> {
    el: &'a mut Element,
}

impl Run<'_> {
    pub fn text(&self) -> String {
        run_text(self.el)
    }

    pub fn set_text(&mut self, text: &str) {
        self.el.retain_elements(&[RUN_PROPS]);
        self.el.children.extend(run_content(text).into_iter().map(Into::into));
    }
}

fn cell_text(cell: &Element) -> String {
    cell.children_named(PARAGRAPH)
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

fn paragraph_text(paragraph: &Element) -> String {
    let mut text = String::new();
    for child in paragraph.elements() {
        if child.is(RUN) {
            text.push_str(&run_text(child));
        } else if child.is(HYPERLINK) {
            for run in child.children_named(RUN) {
                text.push_str(&run_text(run));
            }
        }
    }
    text
}

fn run_text(run: &Element) -> String {
    let mut text = String::new();
    for child in run.elements() {
        match child.name.as_str() {
            TEXT => text.push_str(&child.own_text()),
            TAB => text.push('\t'),
            BREAK | CARRIAGE_RETURN => text.push('\n'),
            _ => {}
        }
    }
    text
}

fn first_run_props(paragraph: &Element) -> Option<Element> {
    paragraph
        .elements()
        .find_map(|child| {
            if child.is(RUN) {
                Some(child)
            } else if child.is(HYPERLINK) {
                child.child(RUN)
            } else {
                None
            }
        })
        .and_then(|run| run.child(RUN_PROPS))
        .cloned()
}

fn build_run(props: Option<Element>, text: &str) -> Element {
    let mut run = Element::new(RUN);
    if let Some(props) = props {
        run = run.with_child(props);
    }
    run.children.extend(run_content(text).into_iter().map(Into::into));
    run
}

/// Splits `text` into `w:t`, `w:tab` and `w:br` elements.
fn run_content(text: &str) -> Vec<Element> {
    let mut content = Vec::new();
    let mut pending = String::new();
    for ch in text.chars() {
        match ch {
            '\t' | '\n' => {
                flush_text(&mut pending, &mut content);
                content.push(Element::new(if ch == '\t' { TAB } else { BREAK }));
            }
            _ => pending.push(ch),
        }
    }
    flush_text(&mut pending, &mut content);
    content
}

fn flush_text(pending: &mut String, content: &mut Vec<Element>) {
    if pending.is_empty() {
        return;
    }
    let mut t = Element::new(TEXT);
    if pending.starts_with(char::is_whitespace) || pending.ends_with(char::is_whitespace) {
        t = t.with_attribute("xml:space", "preserve");
    }
    content.push(t.with_text(std::mem::take(pending)));
}
