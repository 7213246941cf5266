//! Data structures describing the logical content of a report.
//!
//! The assembler produces a [`Report`] without touching the file system or any rendering
//! library.  The DOCX and PDF renderers walk the same value, so both formats share one layout
//! and tests can inspect the structure directly.

use std::path::{Path, PathBuf};

use crate::richtext::{self, Span};

/// Horizontal placement of a paragraph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Rich text paragraph carrying inline styling information and alignment metadata.
///
/// Span text may contain `\n`; renderers turn those into line breaks within the paragraph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RichParagraph {
    spans: Vec<Span>,
    alignment: HorizontalAlignment,
}

impl RichParagraph {
    /// Creates a paragraph from the provided spans using left alignment.
    pub fn new(spans: impl Into<Vec<Span>>) -> Self {
        Self {
            spans: spans.into(),
            ..Self::default()
        }
    }

    /// Creates a paragraph holding `text` as one unstyled span.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(vec![Span::new(text)])
    }

    /// Creates a paragraph from text with markdown emphasis, falling back to plain text.
    pub fn from_markup(text: &str) -> Self {
        Self::new(richtext::parse_markup_lossy(text))
    }

    /// Returns the spans that make up the paragraph.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Returns the configured alignment.
    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    /// Sets the alignment and returns the updated paragraph.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Concatenated span text without styling.
    pub fn text(&self) -> String {
        self.spans.iter().map(Span::text).collect()
    }

    /// Splits the spans at `\n`, yielding one span list per rendered line.
    pub fn lines(&self) -> Vec<Vec<Span>> {
        let mut lines = vec![Vec::new()];
        for span in &self.spans {
            for (index, piece) in span.text().split('\n').enumerate() {
                if index > 0 {
                    lines.push(Vec::new());
                }
                if !piece.is_empty() {
                    if let Some(line) = lines.last_mut() {
                        line.push(span.with_text(piece));
                    }
                }
            }
        }
        lines
    }
}

/// A chart image embedded at a fixed display width, preceded by a caption line.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    path: PathBuf,
    caption: Option<RichParagraph>,
    width_mm: f64,
}

impl ImageBlock {
    /// Creates an image block for the file at `path`.
    pub fn new(path: impl Into<PathBuf>, width_mm: f64) -> Self {
        Self {
            path: path.into(),
            caption: None,
            width_mm,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn caption(&self) -> Option<&RichParagraph> {
        self.caption.as_ref()
    }

    /// Rendered width in millimetres; the height follows the aspect ratio.
    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }

    /// Sets the caption and returns the updated image block.
    pub fn with_caption(mut self, caption: impl Into<Option<RichParagraph>>) -> Self {
        self.caption = caption.into();
        self
    }
}

/// A table with a header row; every body row has the header's width.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableBlock {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableBlock {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }
}

/// Individual content blocks that make up sections and the cover.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// Styled paragraph content.
    Paragraph(RichParagraph),
    /// Captioned image content.
    Image(ImageBlock),
    /// Tabular content.
    Table(TableBlock),
    /// Explicit page break request.
    PageBreak,
}

impl Block {
    /// Convenience helper for building an unstyled paragraph block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Paragraph(RichParagraph::plain(text))
    }
}

/// Title page: the document title followed by free-form blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct Cover {
    title: String,
    blocks: Vec<Block>,
}

impl Cover {
    /// Creates a new cover with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Appends a block to the cover and returns the updated instance.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }
}

/// Logical representation of a document section: a level-one heading plus blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    title: String,
    blocks: Vec<Block>,
}

impl Section {
    /// Creates a new section with the provided title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Appends a block and returns the updated section.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Extends the section with additional blocks and returns the updated instance.
    pub fn with_blocks<I>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = Block>,
    {
        self.blocks.extend(blocks);
        self
    }

    /// Plain text of every paragraph block, in order.
    pub fn paragraph_texts(&self) -> Vec<String> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Paragraph(paragraph) => Some(paragraph.text()),
                _ => None,
            })
            .collect()
    }

    /// Creates a builder that can append a closing page break.
    pub fn builder(title: impl Into<String>) -> SectionBuilder {
        SectionBuilder::new(title)
    }
}

/// Builder for [`Section`] values.
///
/// Callers can request that the following content starts on a new page via
/// [`SectionBuilder::end_with_page_break`]; the break is not duplicated when the last block
/// already is one.
#[derive(Clone, Debug, Default)]
pub struct SectionBuilder {
    title: String,
    blocks: Vec<Block>,
    end_with_page_break: bool,
}

impl SectionBuilder {
    /// Creates a builder for a section with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Marks the section to be followed by a page break.
    pub fn end_with_page_break(mut self, end_with_page_break: bool) -> Self {
        self.end_with_page_break = end_with_page_break;
        self
    }

    /// Pushes an additional block into the section.
    pub fn push_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Extends the builder with multiple blocks.
    pub fn extend_blocks<I>(mut self, blocks: I) -> Self
    where
        I: IntoIterator<Item = Block>,
    {
        self.blocks.extend(blocks);
        self
    }

    /// Builds the final section, appending a page break when requested.
    pub fn build(mut self) -> Section {
        if self.end_with_page_break && !matches!(self.blocks.last(), Some(Block::PageBreak)) {
            self.blocks.push(Block::PageBreak);
        }

        Section::new(self.title).with_blocks(self.blocks)
    }
}

/// A complete report: cover page followed by sections in document order.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    product: String,
    cover: Cover,
    sections: Vec<Section>,
}

impl Report {
    pub fn new(product: impl Into<String>, cover: Cover) -> Self {
        Self {
            product: product.into(),
            cover,
            sections: Vec::new(),
        }
    }

    /// Sanitised product name the report was generated for.
    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn cover(&self) -> &Cover {
        &self.cover
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Appends a section and returns the updated report.
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Looks up a section by its exact title.
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.title() == title)
    }

    /// Every table in the report, in document order.
    pub fn tables(&self) -> impl Iterator<Item = &TableBlock> + '_ {
        self.all_blocks().filter_map(|block| match block {
            Block::Table(table) => Some(table),
            _ => None,
        })
    }

    /// Every image in the report, in document order.
    pub fn images(&self) -> impl Iterator<Item = &ImageBlock> + '_ {
        self.all_blocks().filter_map(|block| match block {
            Block::Image(image) => Some(image),
            _ => None,
        })
    }

    fn all_blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.cover
            .blocks()
            .iter()
            .chain(self.sections.iter().flat_map(|section| section.blocks().iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_appends_page_break() {
        let section = Section::builder("Intro")
            .end_with_page_break(true)
            .push_block(Block::text("body"))
            .build();

        assert!(matches!(section.blocks().last(), Some(Block::PageBreak)));
        assert_eq!(section.blocks().len(), 2);
    }

    #[test]
    fn builder_does_not_duplicate_page_break() {
        let section = Section::builder("Intro")
            .end_with_page_break(true)
            .push_block(Block::PageBreak)
            .build();

        assert_eq!(section.blocks(), [Block::PageBreak]);
    }

    #[test]
    fn lines_split_spans_and_keep_styles() {
        let paragraph = RichParagraph::new(vec![
            Span::new("LCA").bold(),
            Span::new(": Life Cycle Assessment\nGWP: Global Warming Potential"),
        ]);
        let lines = paragraph.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], vec![Span::new("LCA").bold(), Span::new(": Life Cycle Assessment")]);
        assert_eq!(lines[1], vec![Span::new("GWP: Global Warming Potential")]);
    }

    #[test]
    fn paragraph_text_drops_markup() {
        let paragraph = RichParagraph::from_markup("A **bold** claim");
        assert_eq!(paragraph.text(), "A bold claim");
        assert_eq!(paragraph.spans().len(), 3);
    }
}
