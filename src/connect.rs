use scraper::{Html, Selector};

use crate::session::ForumSession;
use crate::utils::error::AppError;

pub const CONNECT_URL: &str = "https://connect.linux.do/";

/// One row of the trust-level requirement table on the connect page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRow {
    pub project: String,
    pub current: String,
    pub requirement: String,
}

/// Fetch the connect page over the authenticated session and parse the
/// requirement table.
pub async fn fetch_connect_info(
    session: &ForumSession,
    url: &str,
) -> Result<Vec<ConnectRow>, AppError> {
    let html = session.get_html(url).await?;
    parse_connect_table(&html)
}

/// Parse `table tr` rows with at least three cells. Empty cells are
/// reported as "0", matching how the page renders missing counters.
pub fn parse_connect_table(html: &str) -> Result<Vec<ConnectRow>, AppError> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("table tr")
        .map_err(|e| AppError::Scraping(format!("invalid row selector: {e:?}")))?;
    let cell_selector = Selector::parse("td")
        .map_err(|e| AppError::Scraping(format!("invalid cell selector: {e:?}")))?;

    let mut rows = Vec::new();
    for row in document.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| {
                let text = cell.text().collect::<Vec<_>>().join(" ").trim().to_string();
                if text.is_empty() { "0".to_string() } else { text }
            })
            .collect();

        if cells.len() >= 3 {
            rows.push(ConnectRow {
                project: cells[0].clone(),
                current: cells[1].clone(),
                requirement: cells[2].clone(),
            });
        }
    }

    Ok(rows)
}

/// Render the rows as an aligned plain-text table.
pub fn render_table(rows: &[ConnectRow]) -> String {
    let headers = ("Project", "Current", "Requirement");

    let mut widths = (headers.0.len(), headers.1.len(), headers.2.len());
    for row in rows {
        widths.0 = widths.0.max(row.project.chars().count());
        widths.1 = widths.1.max(row.current.chars().count());
        widths.2 = widths.2.max(row.requirement.chars().count());
    }

    let mut out = String::new();
    let line = |a: &str, b: &str, c: &str, widths: (usize, usize, usize)| {
        format!(
            "| {:<w0$} | {:<w1$} | {:<w2$} |\n",
            a,
            b,
            c,
            w0 = widths.0,
            w1 = widths.1,
            w2 = widths.2,
        )
    };
    let separator = format!(
        "+{}+{}+{}+\n",
        "-".repeat(widths.0 + 2),
        "-".repeat(widths.1 + 2),
        "-".repeat(widths.2 + 2),
    );

    out.push_str(&separator);
    out.push_str(&line(headers.0, headers.1, headers.2, widths));
    out.push_str(&separator);
    for row in rows {
        out.push_str(&line(&row.project, &row.current, &row.requirement, widths));
    }
    out.push_str(&separator);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html><body>
            <table>
                <tr><th>Project</th><th>Current</th><th>Requirement</th></tr>
                <tr><td>Topics viewed</td><td>120</td><td>100</td></tr>
                <tr><td>Posts read</td><td></td><td>500</td></tr>
                <tr><td>Short row</td><td>1</td></tr>
            </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_connect_table() {
        let rows = parse_connect_table(SAMPLE).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            ConnectRow {
                project: "Topics viewed".to_string(),
                current: "120".to_string(),
                requirement: "100".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_connect_table_empty_cell_becomes_zero() {
        let rows = parse_connect_table(SAMPLE).unwrap();
        assert_eq!(rows[1].current, "0");
        assert_eq!(rows[1].requirement, "500");
    }

    #[test]
    fn test_parse_connect_table_skips_short_rows() {
        let rows = parse_connect_table(SAMPLE).unwrap();
        assert!(rows.iter().all(|r| r.project != "Short row"));
    }

    #[test]
    fn test_parse_connect_table_no_table() {
        assert!(
            parse_connect_table("<html><body><p>nothing</p></body></html>")
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_render_table_alignment() {
        let rows = vec![
            ConnectRow {
                project: "Topics viewed".to_string(),
                current: "120".to_string(),
                requirement: "100".to_string(),
            },
            ConnectRow {
                project: "Likes".to_string(),
                current: "3".to_string(),
                requirement: "30".to_string(),
            },
        ];

        let rendered = render_table(&rows);
        let lines: Vec<&str> = rendered.lines().collect();
        // separator, header, separator, two rows, separator
        assert_eq!(lines.len(), 6);
        assert!(lines[1].contains("Project"));
        assert!(lines[3].contains("Topics viewed"));
        // All lines share the same width.
        let width = lines[0].len();
        assert!(lines.iter().all(|l| l.len() == width));
    }

    #[test]
    fn test_render_table_empty() {
        let rendered = render_table(&[]);
        assert!(rendered.contains("Project"));
        assert_eq!(rendered.lines().count(), 4);
    }
}
