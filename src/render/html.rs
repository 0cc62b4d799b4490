//! HTML rendering.
//!
//! Output is a self-contained document with inline CSS. The only part that
//! changes between two renders of the same document is the generation
//! timestamp, which sits between `GENERATED_START` and `GENERATED_END`.

use super::document::ReportDocument;

pub const GENERATED_START: &str = "<!-- generated -->";
pub const GENERATED_END: &str = "<!-- /generated -->";

/// Escape text for element content and double-quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render `doc` with `generated_at` as the generation timestamp
pub fn render_html(doc: &ReportDocument, generated_at: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>{css}</style>
</head>
<body>
<h2 class="title">{title}</h2>
{summary}
<p class="generated">Generated On: {start}{generated}{end}</p>
<hr>
{sections}
<hr>
{table}
</body>
</html>
"#,
        title = escape_html(&doc.title),
        css = inline_css(),
        summary = render_summary(&doc.summary),
        start = GENERATED_START,
        generated = escape_html(generated_at),
        end = GENERATED_END,
        sections = render_sections(doc),
        table = render_table(doc),
    )
}

fn render_summary(pairs: &[(String, String)]) -> String {
    let mut out = String::from("<table class=\"summary\">\n");
    for (label, value) in pairs {
        out.push_str(&format!("<tr><th>{}</th><td>{}</td></tr>\n", escape_html(label), escape_html(value)));
    }
    out.push_str("</table>");
    out
}

fn render_sections(doc: &ReportDocument) -> String {
    doc.sections
        .iter()
        .map(|s| {
            let body = escape_html(&s.body).replace('\n', "<br>\n");
            format!("<h3>{}</h3>\n<p>{}</p>", escape_html(&s.heading), body)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_table(doc: &ReportDocument) -> String {
    let table = &doc.table;
    let mut out = format!("<h3>{}</h3>\n<table class=\"details\">\n<thead><tr>", escape_html(&table.heading));
    for column in &table.columns {
        out.push_str(&format!("<th>{}</th>", escape_html(column)));
    }
    out.push_str("</tr></thead>\n<tbody>\n");

    if table.rows.is_empty() {
        out.push_str(&format!("<tr><td colspan=\"{}\">No rows</td></tr>\n", table.columns.len().max(1)));
    }
    for row in &table.rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str(&format!("<td class=\"{}\">{}</td>", cell_class(cell), escape_html(cell)));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>");
    out
}

/// Status cells get a colour class; everything else renders plain
fn cell_class(cell: &str) -> &'static str {
    match cell {
        "PASSED" => "status-passed",
        "FAILED" => "status-failed",
        "BLOCKED" => "status-blocked",
        "UNEXECUTED" => "status-unexecuted",
        _ => "cell",
    }
}

fn inline_css() -> &'static str {
    "body{font-family:Arial,Helvetica,sans-serif;margin:24px;color:#212121}\
.title{color:#0D47A1}\
table{border-collapse:collapse;margin:8px 0}\
th,td{border:1px solid #BDBDBD;padding:4px 8px;text-align:left}\
table.summary th{background:#E3F2FD}\
table.details thead th{background:#0D47A1;color:#FFFFFF;text-align:center}\
.generated{color:#616161;font-size:90%}\
.status-passed{color:#2E7D32;font-weight:bold}\
.status-failed{color:#C62828;font-weight:bold}\
.status-blocked{color:#EF6C00;font-weight:bold}\
.status-unexecuted{color:#757575}"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::document::{DetailTable, TextSection};

    fn strip_generated(html: &str) -> String {
        let start = html.find(GENERATED_START).expect("start marker");
        let end = html.find(GENERATED_END).expect("end marker");
        format!("{}{}", &html[..start], &html[end..])
    }

    fn sample() -> ReportDocument {
        ReportDocument {
            title: "Jira Issue Report - RD-1".to_string(),
            summary: vec![("Status".to_string(), "Done".to_string()), ("Owner".to_string(), "A & B".to_string())],
            sections: vec![TextSection { heading: "Description".to_string(), body: "line 1\n<line 2>".to_string() }],
            table: DetailTable {
                heading: "Test Cases".to_string(),
                columns: vec!["Key".to_string(), "Status".to_string()],
                rows: vec![
                    vec!["TC-2".to_string(), "FAILED".to_string()],
                    vec!["TC-1".to_string(), "PASSED".to_string()],
                ],
            },
        }
    }

    #[test]
    fn test_render_is_deterministic_outside_generated_region() {
        let a = render_html(&sample(), "2024-01-01 00:00:00");
        let b = render_html(&sample(), "2025-12-31 23:59:59");
        assert_ne!(a, b);
        assert_eq!(strip_generated(&a), strip_generated(&b));
        assert_eq!(a.matches(GENERATED_START).count(), 1);
    }

    #[test]
    fn test_values_are_escaped() {
        let html = render_html(&sample(), "now");
        assert!(html.contains("<td>A &amp; B</td>"));
        assert!(html.contains("line 1<br>\n&lt;line 2&gt;"));
        assert!(!html.contains("<line 2>"));
    }

    #[test]
    fn test_rows_keep_input_order() {
        let html = render_html(&sample(), "now");
        let first = html.find("TC-2").unwrap();
        let second = html.find("TC-1").unwrap();
        assert!(first < second);
        assert!(html.contains("<td class=\"status-failed\">FAILED</td>"));
    }

    #[test]
    fn test_empty_table_renders_placeholder_row() {
        let mut doc = sample();
        doc.table.rows.clear();
        assert!(render_html(&doc, "now").contains("<td colspan=\"2\">No rows</td>"));
    }

    #[test]
    fn test_summary_order_is_preserved() {
        let html = render_html(&sample(), "now");
        assert!(html.find("<th>Status</th>").unwrap() < html.find("<th>Owner</th>").unwrap());
    }
}
