//! Word (DOCX) rendering of a [`Report`].

use std::fs;
use std::io::Cursor;

use docx_rs::{
    AlignmentType, BreakType, Docx, Paragraph, Pic, Run, Style, StyleType, Table, TableCell,
    TableRow,
};

use crate::assemble::ReportError;
use crate::model::{Block, HorizontalAlignment, ImageBlock, Report, RichParagraph, TableBlock};
use crate::richtext::Span;

const TITLE_STYLE: &str = "Title";
const HEADING_STYLE: &str = "Heading1";

const EMU_PER_MM: f64 = 36_000.0;

/// Serialises `report` into the bytes of a `.docx` package.
pub fn render_docx(report: &Report) -> Result<Vec<u8>, ReportError> {
    let mut docx = Docx::new()
        .add_style(
            Style::new(TITLE_STYLE, StyleType::Paragraph)
                .name("Title")
                .size(52)
                .bold(),
        )
        .add_style(
            Style::new(HEADING_STYLE, StyleType::Paragraph)
                .name("Heading 1")
                .size(32)
                .bold(),
        );

    docx = docx.add_paragraph(heading(report.cover().title(), TITLE_STYLE));
    for block in report.cover().blocks() {
        docx = add_block(docx, block)?;
    }

    for section in report.sections() {
        docx = docx.add_paragraph(heading(section.title(), HEADING_STYLE));
        for block in section.blocks() {
            docx = add_block(docx, block)?;
        }
    }

    let mut buffer = Vec::new();
    docx.build()
        .pack(Cursor::new(&mut buffer))
        .map_err(|err| ReportError::Docx(err.to_string()))?;
    Ok(buffer)
}

fn heading(text: &str, style: &str) -> Paragraph {
    Paragraph::new()
        .style(style)
        .add_run(Run::new().add_text(text))
}

fn add_block(docx: Docx, block: &Block) -> Result<Docx, ReportError> {
    Ok(match block {
        Block::Paragraph(paragraph) => docx.add_paragraph(rich_paragraph(paragraph)),
        Block::Table(table) => docx.add_table(data_table(table)),
        Block::Image(image) => {
            let mut docx = docx;
            if let Some(caption) = image.caption() {
                docx = docx.add_paragraph(rich_paragraph(caption));
            }
            docx.add_paragraph(picture(image)?)
        }
        Block::PageBreak => {
            docx.add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)))
        }
    })
}

fn styled_run(span: &Span) -> Run {
    let mut run = Run::new().add_text(span.text());
    if span.is_bold() {
        run = run.bold();
    }
    if span.is_italic() {
        run = run.italic();
    }
    run
}

/// Converts a paragraph into runs, turning embedded newlines into line breaks.
fn rich_paragraph(paragraph: &RichParagraph) -> Paragraph {
    let alignment = match paragraph.alignment() {
        HorizontalAlignment::Left => AlignmentType::Left,
        HorizontalAlignment::Center => AlignmentType::Center,
        HorizontalAlignment::Right => AlignmentType::Right,
    };

    let mut out = Paragraph::new().align(alignment);
    for (index, line) in paragraph.lines().iter().enumerate() {
        if index > 0 {
            out = out.add_run(Run::new().add_break(BreakType::TextWrapping));
        }
        for span in line {
            out = out.add_run(styled_run(span));
        }
    }
    out
}

fn data_table(table: &TableBlock) -> Table {
    let row = |cells: &[String], bold: bool| {
        TableRow::new(
            cells
                .iter()
                .map(|text| {
                    let mut run = Run::new().add_text(text.as_str());
                    if bold {
                        run = run.bold();
                    }
                    TableCell::new().add_paragraph(Paragraph::new().add_run(run))
                })
                .collect(),
        )
    };

    let mut rows = vec![row(table.header(), true)];
    rows.extend(table.rows().iter().map(|cells| row(cells, false)));
    Table::new(rows)
}

fn picture(image: &ImageBlock) -> Result<Paragraph, ReportError> {
    let image_error = |source| ReportError::Image {
        path: image.path().to_path_buf(),
        source,
    };

    let (px_width, px_height) = image::image_dimensions(image.path()).map_err(image_error)?;
    let bytes = fs::read(image.path()).map_err(|source| ReportError::Io {
        path: image.path().to_path_buf(),
        source,
    })?;

    let width_emu = image.width_mm() * EMU_PER_MM;
    let height_emu = if px_width == 0 {
        0.0
    } else {
        width_emu * f64::from(px_height) / f64::from(px_width)
    };

    let pic = Pic::new(&bytes).size(width_emu.round() as u32, height_emu.round() as u32);
    Ok(Paragraph::new().add_run(Run::new().add_image(pic)))
}
