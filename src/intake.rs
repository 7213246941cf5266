//! Product-name intake and the file names derived from it.

use crate::config::ReportFormat;

const REPORT_FILE_PREFIX: &str = "LCA_Report_";
const CHART_FILE_EXTENSION: &str = "png";

/// Removes every `<` and `>` and trims surrounding whitespace.
///
/// Whitespace left at either end after removing the brackets is trimmed as well.
/// No other escaping is applied.
pub fn sanitize(name: &str) -> String {
    name.replace(['<', '>'], "").trim().to_owned()
}

/// Name of the report file for `product`, e.g. `LCA_Report_Electric_Toothbrush.docx`.
pub fn report_file_name(product: &str, format: ReportFormat) -> String {
    format!(
        "{REPORT_FILE_PREFIX}{}.{}",
        product.replace(' ', "_"),
        format.extension()
    )
}

/// Name of the chart image rendered for `column`.
///
/// Distinct columns can map to the same name; the later chart then replaces the earlier file.
pub fn chart_file_name(column: &str) -> String {
    format!("{}.{CHART_FILE_EXTENSION}", column.replace(' ', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_whitespace_and_angle_brackets() {
        assert_eq!(sanitize("  <Toothbrush>  "), "Toothbrush");
        assert_eq!(sanitize("<<b>>Bamboo <i>Cup</i>"), "bBamboo iCup/i");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for input in ["  <Toothbrush>  ", "Electric Toothbrush", "\t<a>\n", "", "> <", "< Cup"] {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once);
            assert!(!once.contains('<') && !once.contains('>'));
            assert_eq!(once.trim(), once);
        }
    }

    #[test]
    fn whitespace_exposed_by_brackets_is_trimmed() {
        assert_eq!(sanitize("< Cup >"), "Cup");
        assert_eq!(sanitize("Bamboo  Cup"), "Bamboo  Cup");
    }

    #[test]
    fn derives_report_names() {
        assert_eq!(
            report_file_name(&sanitize("  <Toothbrush>  "), ReportFormat::Docx),
            "LCA_Report_Toothbrush.docx"
        );
        assert_eq!(
            report_file_name("Electric Toothbrush", ReportFormat::Pdf),
            "LCA_Report_Electric_Toothbrush.pdf"
        );
    }

    #[test]
    fn derives_chart_names() {
        assert_eq!(chart_file_name("Energy Use (MJ)"), "Energy_Use_(MJ).png");
        assert_eq!(chart_file_name("Water Use"), chart_file_name("Water_Use"));
    }
}
