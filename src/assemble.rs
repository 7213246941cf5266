//! Lays out the report content in its fixed order and writes the finished document.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::info;
use thiserror::Error;

use crate::charts::ChartArtifact;
use crate::config::ReportFormat;
use crate::intake::report_file_name;
use crate::inventory::InventoryTable;
use crate::model::{Block, Cover, HorizontalAlignment, ImageBlock, Report, RichParagraph, Section, TableBlock};
use crate::narrative::NarrativeSection;
use crate::{docx, pdf};

/// Entries listed on the contents page.
pub const TABLE_OF_CONTENTS: [&str; 14] = [
    "Title Page",
    "Executive Summary",
    "1. Introduction",
    "2. Goal and Scope",
    "3. Functional Unit",
    "4. System Boundary",
    WEB_DATA_TITLE,
    INVENTORY_TITLE,
    LCIA_TITLE,
    "8. Interpretation",
    "9. Limitations",
    "10. Recommendations",
    GLOSSARY_TITLE,
    REFERENCES_TITLE,
];

pub const CONTENTS_TITLE: &str = "Table of Contents";
pub const WEB_DATA_TITLE: &str = "5. Web Data";
pub const INVENTORY_TITLE: &str = "6. Inventory Analysis";
pub const LCIA_TITLE: &str = "7. LCIA";
pub const GLOSSARY_TITLE: &str = "Appendix A: Glossary";
pub const REFERENCES_TITLE: &str = "Appendix B: References";

pub const CONFIDENTIALITY_NOTICE: &str = "Confidential — For Internal Use Only";
pub const NO_WEB_CONTENT: &str = "No web content found.";

pub const GLOSSARY: &str = "LCA: Life Cycle Assessment\nGWP: Global Warming Potential\nMJ: Megajoules\nCO2-eq: Carbon dioxide equivalent";
pub const REFERENCES: &str =
    "1. ISO 14040/44\n2. Ecoinvent\n3. OpenLCA\n4. Public sources scraped from web.";

/// Display width of every chart image (5.5 in).
pub const CHART_WIDTH_MM: f64 = 139.7;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read chart image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to build DOCX document: {0}")]
    Docx(String),
    #[error("failed to render PDF document: {0}")]
    Pdf(#[from] genpdf::error::Error),
}

/// Title shown on the cover page.
pub fn report_title(product: &str) -> String {
    format!("LCA Report for: {product}")
}

/// Builds the report in document order.
///
/// The function is pure: the same inputs always produce an equal [`Report`].
pub fn assemble(
    product: &str,
    table: &InventoryTable,
    charts: &[ChartArtifact],
    web_text: &str,
    narratives: &[NarrativeSection],
    date: NaiveDate,
) -> Report {
    let cover = Cover::new(report_title(product))
        .with_block(Block::text(format!("Date: {}", date.format("%Y-%m-%d"))))
        .with_block(Block::Paragraph(
            RichParagraph::plain(CONFIDENTIALITY_NOTICE).with_alignment(HorizontalAlignment::Right),
        ))
        .with_block(Block::PageBreak);

    let contents = Section::builder(CONTENTS_TITLE)
        .extend_blocks(TABLE_OF_CONTENTS.iter().map(|entry| Block::text(*entry)))
        .end_with_page_break(true)
        .build();

    let mut report = Report::new(product, cover).with_section(contents);

    for narrative in narratives {
        let paragraph = if narrative.fallback {
            RichParagraph::plain(narrative.text.as_str())
        } else {
            RichParagraph::from_markup(&narrative.text)
        };
        report = report.with_section(
            Section::builder(narrative.title.as_str())
                .push_block(Block::Paragraph(paragraph))
                .end_with_page_break(true)
                .build(),
        );
    }

    let web_paragraph = if web_text.is_empty() { NO_WEB_CONTENT } else { web_text };
    let (header, rows) = table.to_string_rows();

    report
        .with_section(
            Section::builder(WEB_DATA_TITLE)
                .push_block(Block::text(web_paragraph))
                .end_with_page_break(true)
                .build(),
        )
        .with_section(
            Section::builder(INVENTORY_TITLE)
                .push_block(Block::Table(TableBlock::new(header, rows)))
                .end_with_page_break(true)
                .build(),
        )
        .with_section(
            Section::builder(LCIA_TITLE)
                .extend_blocks(charts.iter().map(|chart| {
                    Block::Image(
                        ImageBlock::new(&chart.path, CHART_WIDTH_MM)
                            .with_caption(RichParagraph::plain(chart.caption())),
                    )
                }))
                .end_with_page_break(true)
                .build(),
        )
        .with_section(
            Section::builder(GLOSSARY_TITLE)
                .push_block(Block::text(GLOSSARY))
                .end_with_page_break(true)
                .build(),
        )
        .with_section(Section::new(REFERENCES_TITLE).with_block(Block::text(REFERENCES)))
}

/// Renders `report` in `format` into `dir`, replacing a same-named file.
pub fn write_report(report: &Report, format: ReportFormat, dir: &Path) -> Result<PathBuf, ReportError> {
    let bytes = match format {
        ReportFormat::Docx => docx::render_docx(report)?,
        ReportFormat::Pdf => pdf::render_pdf(report)?,
    };

    let path = dir.join(report_file_name(report.product(), format));
    fs::write(&path, bytes).map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;
    info!("Wrote {} report to {}", format, path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::parse;
    use crate::narrative::NarrativeGenerator;
    use crate::config::ModelChoice;

    fn fixture_table() -> InventoryTable {
        parse(b"Life Cycle Stage,Energy Use (MJ),Water Use (L)\nMaterials,10.5,3\nUse Phase,,7\n")
            .unwrap()
    }

    fn fixture_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn fixture_charts() -> Vec<ChartArtifact> {
        vec![
            ChartArtifact {
                column: "Energy Use (MJ)".into(),
                path: PathBuf::from("run/Energy_Use_(MJ).png"),
            },
            ChartArtifact {
                column: "Water Use (L)".into(),
                path: PathBuf::from("run/Water_Use_(L).png"),
            },
        ]
    }

    fn fixture_report(web_text: &str) -> Report {
        let narratives = NarrativeGenerator::unconfigured(ModelChoice::Gpt35Turbo).generate_all("Cup");
        assemble("Cup", &fixture_table(), &fixture_charts(), web_text, &narratives, fixture_date())
    }

    fn titles(report: &Report) -> Vec<&str> {
        report.sections().iter().map(Section::title).collect()
    }

    #[test]
    fn sections_follow_fixed_order() {
        let report = fixture_report("");
        assert_eq!(report.cover().title(), "LCA Report for: Cup");
        assert_eq!(
            titles(&report),
            [
                "Table of Contents",
                "Executive Summary",
                "1. Introduction",
                "2. Goal and Scope",
                "3. Functional Unit",
                "4. System Boundary",
                "8. Interpretation",
                "9. Limitations",
                "10. Recommendations",
                "5. Web Data",
                "6. Inventory Analysis",
                "7. LCIA",
                "Appendix A: Glossary",
                "Appendix B: References",
            ]
        );
    }

    #[test]
    fn cover_has_date_and_right_aligned_notice() {
        let report = fixture_report("");
        let blocks = report.cover().blocks();
        assert_eq!(blocks[0], Block::text("Date: 2024-05-17"));
        match &blocks[1] {
            Block::Paragraph(paragraph) => {
                assert_eq!(paragraph.text(), CONFIDENTIALITY_NOTICE);
                assert_eq!(paragraph.alignment(), HorizontalAlignment::Right);
            }
            other => panic!("unexpected block {other:?}"),
        }
        assert_eq!(blocks.last(), Some(&Block::PageBreak));
    }

    #[test]
    fn contents_lists_fourteen_entries() {
        let report = fixture_report("");
        let contents = report.section(CONTENTS_TITLE).unwrap();
        assert_eq!(contents.paragraph_texts(), TABLE_OF_CONTENTS);
    }

    #[test]
    fn every_section_but_the_last_ends_with_a_page_break() {
        let report = fixture_report("snippets");
        let (last, rest) = report.sections().split_last().unwrap();
        for section in rest {
            assert_eq!(section.blocks().last(), Some(&Block::PageBreak), "{}", section.title());
        }
        assert!(!last.blocks().contains(&Block::PageBreak));
        assert_eq!(last.paragraph_texts(), [REFERENCES]);
    }

    #[test]
    fn empty_web_text_uses_placeholder() {
        let report = fixture_report("");
        assert_eq!(
            report.section(WEB_DATA_TITLE).unwrap().paragraph_texts(),
            [NO_WEB_CONTENT]
        );

        let report = fixture_report("Batteries matter.");
        assert_eq!(
            report.section(WEB_DATA_TITLE).unwrap().paragraph_texts(),
            ["Batteries matter."]
        );
    }

    #[test]
    fn table_matches_inventory_columns() {
        let table = fixture_table();
        let report = fixture_report("");
        let tables: Vec<_> = report.tables().collect();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header(), table.columns());
        assert_eq!(tables[0].rows()[1], ["Use Phase", "", "7"]);
        assert!(tables[0].rows().iter().all(|row| row.len() == table.column_count()));
    }

    #[test]
    fn charts_are_captioned_in_order() {
        let report = fixture_report("");
        let images: Vec<_> = report.images().collect();
        assert_eq!(images.len(), 2);
        assert_eq!(
            images[0].caption().map(RichParagraph::text).as_deref(),
            Some("Chart: Energy_Use_(MJ)")
        );
        assert!((images[1].width_mm() - CHART_WIDTH_MM).abs() < f64::EPSILON);
    }

    #[test]
    fn fallback_text_is_kept_verbatim() {
        let error = "completion endpoint returned 400 Bad Request: *model* not found";
        let narratives = [
            NarrativeSection {
                title: "1. Introduction".to_owned(),
                text: format!("[Fallback] Unable to generate content for '1. Introduction': {error}."),
                fallback: true,
            },
            NarrativeSection {
                title: "9. Limitations".to_owned(),
                text: "* Reduce plastic\n* Use **recycled** nylon".to_owned(),
                fallback: false,
            },
        ];
        let report = assemble("Cup", &fixture_table(), &[], "", &narratives, fixture_date());

        let intro = report.section("1. Introduction").unwrap();
        assert_eq!(intro.paragraph_texts(), [narratives[0].text.as_str()]);

        let limitations = report.section("9. Limitations").unwrap();
        assert_eq!(
            limitations.paragraph_texts(),
            ["* Reduce plastic\n* Use recycled nylon"]
        );
        let Some(Block::Paragraph(paragraph)) = limitations.blocks().first() else {
            panic!("expected a paragraph");
        };
        assert!(paragraph.spans().iter().any(|span| span.is_bold() && span.text() == "recycled"));
    }

    #[test]
    fn assembly_is_deterministic() {
        assert_eq!(fixture_report("x"), fixture_report("x"));
    }
}
