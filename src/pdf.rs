//! PDF rendering of a [`Report`] through genpdf.

use genpdf::elements::{Break, FrameCellDecorator, LinearLayout, PageBreak, Paragraph, TableLayout};
use genpdf::error::{Error, ErrorKind};
use genpdf::render::Area;
use genpdf::style::Style;
use genpdf::{Alignment, Context, Document, Element, PageDecorator, Position};

use crate::assemble::ReportError;
use crate::elements::{mm_from_f64, ChartFigure};
use crate::fonts;
use crate::model::{Block, HorizontalAlignment, ImageBlock, Report, RichParagraph, TableBlock};

const PAGE_MARGIN_MM: f64 = 20.0;
const FOOTER_HEIGHT_MM: f64 = 10.0;
const TITLE_FONT_SIZE: u8 = 24;
const HEADING_FONT_SIZE: u8 = 16;
const FOOTER_FONT_SIZE: u8 = 9;

/// Renders `report` into PDF bytes.
///
/// Requires a TrueType family; see [`crate::fonts`].
pub fn render_pdf(report: &Report) -> Result<Vec<u8>, ReportError> {
    let mut document = Document::new(fonts::default_font_family()?);
    document.set_title(report.cover().title());
    document.set_page_decorator(ReportPageDecorator::new(report.product()));

    document.push(heading(report.cover().title(), TITLE_FONT_SIZE));
    for block in report.cover().blocks() {
        push_block(&mut document, block)?;
    }

    for section in report.sections() {
        document.push(heading(section.title(), HEADING_FONT_SIZE));
        for block in section.blocks() {
            push_block(&mut document, block)?;
        }
    }

    let mut bytes = Vec::new();
    document.render(&mut bytes)?;
    Ok(bytes)
}

/// Footer text for `page`; the title page carries none.
fn footer_label(product: &str, page: usize) -> Option<String> {
    (page > 1).then(|| format!("{product} LCA Report | Page {page}"))
}

/// Applies the page margins and draws the footer below the body area.
struct ReportPageDecorator {
    page: usize,
    product: String,
}

impl ReportPageDecorator {
    fn new(product: impl Into<String>) -> Self {
        Self {
            page: 0,
            product: product.into(),
        }
    }
}

impl PageDecorator for ReportPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        context: &Context,
        mut area: Area<'a>,
        style: Style,
    ) -> Result<Area<'a>, Error> {
        self.page += 1;
        area.add_margins(mm_from_f64(PAGE_MARGIN_MM));

        let footer_height = mm_from_f64(FOOTER_HEIGHT_MM);
        let available = area.size().height;
        if footer_height > available {
            return Err(Error::new(
                "Page is too small for the footer",
                ErrorKind::InvalidData,
            ));
        }

        if let Some(label) = footer_label(&self.product, self.page) {
            let mut footer_area = area.clone();
            footer_area.add_offset(Position::new(0, available - footer_height));
            let mut footer = Paragraph::new(label)
                .aligned(Alignment::Center)
                .styled(Style::new().with_font_size(FOOTER_FONT_SIZE));
            if footer.render(context, footer_area, style)?.has_more {
                return Err(Error::new(
                    "Footer does not fit on one line",
                    ErrorKind::PageSizeExceeded,
                ));
            }
        }

        area.set_height(available - footer_height);
        Ok(area)
    }
}

fn heading(text: &str, size: u8) -> impl Element {
    LinearLayout::vertical()
        .element(Paragraph::new(text).styled(Style::new().bold().with_font_size(size)))
        .element(Break::new(1))
}

fn push_block(document: &mut genpdf::Document, block: &Block) -> Result<(), Error> {
    match block {
        Block::Paragraph(paragraph) => document.push(rich_paragraph(paragraph)),
        Block::Table(table) => {
            if table.column_count() > 0 {
                document.push(data_table(table)?);
            }
        }
        Block::Image(image) => document.push(chart_figure(image)?),
        Block::PageBreak => document.push(PageBreak::new()),
    }
    Ok(())
}

/// One genpdf paragraph per line, followed by a blank line.
fn rich_paragraph(paragraph: &RichParagraph) -> LinearLayout {
    let alignment = match paragraph.alignment() {
        HorizontalAlignment::Left => Alignment::Left,
        HorizontalAlignment::Center => Alignment::Center,
        HorizontalAlignment::Right => Alignment::Right,
    };

    let mut layout = LinearLayout::vertical();
    for line in paragraph.lines() {
        let mut element = Paragraph::default();
        for span in &line {
            element.push(span.to_styled_string());
        }
        element.set_alignment(alignment);
        layout.push(element);
    }
    layout.push(Break::new(1));
    layout
}

fn data_table(table: &TableBlock) -> Result<LinearLayout, Error> {
    let mut layout = TableLayout::new(vec![1; table.column_count()]);
    layout.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    let mut header = layout.row();
    for cell in table.header() {
        header.push_element(Paragraph::new(cell.as_str()).styled(Style::new().bold()).padded(1));
    }
    header.push()?;

    for cells in table.rows() {
        let mut row = layout.row();
        for cell in cells {
            row.push_element(Paragraph::new(cell.as_str()).padded(1));
        }
        row.push()?;
    }

    Ok(LinearLayout::vertical().element(layout).element(Break::new(1)))
}

fn chart_figure(image: &ImageBlock) -> Result<ChartFigure, Error> {
    let caption = image
        .caption()
        .map(|caption| {
            let mut element = Paragraph::default();
            for span in caption.spans() {
                element.push(span.to_styled_string());
            }
            element
        })
        .unwrap_or_default();

    Ok(ChartFigure::from_path(image.path(), caption)?.with_width(mm_from_f64(image.width_mm())))
}
