//! Self-contained HTML dashboard.
//!
//! Each panel is an inline SVG chart with transparent hover targets carrying
//! `<title>` tooltips, followed by the panel's data as a table that sorts on
//! header click. The document has no external assets.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use log::info;

use crate::{
    charts::{self, Hotspot, Panel, PanelKind, histogram_bins},
    io_utils,
    stats::format_number,
};

const SORT_SCRIPT: &str = r#"
document.querySelectorAll("table.data th").forEach(function (header) {
  header.addEventListener("click", function () {
    var table = header.closest("table");
    var body = table.tBodies[0];
    var index = Array.prototype.indexOf.call(header.parentNode.children, header);
    var ascending = header.dataset.order !== "asc";
    header.dataset.order = ascending ? "asc" : "desc";
    var rows = Array.prototype.slice.call(body.rows);
    rows.sort(function (a, b) {
      var x = a.cells[index].dataset.value || a.cells[index].textContent;
      var y = b.cells[index].dataset.value || b.cells[index].textContent;
      var nx = parseFloat(x), ny = parseFloat(y);
      var cmp = (!isNaN(nx) && !isNaN(ny)) ? nx - ny : x.localeCompare(y);
      return ascending ? cmp : -cmp;
    });
    rows.forEach(function (row) { body.appendChild(row); });
  });
});
"#;

const STYLE: &str = "body { font-family: Arial, sans-serif; margin: 24px; color: #222; }
h1 { text-align: center; }
.grid { display: grid; grid-template-columns: repeat(2, 1fr); gap: 24px; }
.panel { border: 1px solid #ddd; border-radius: 6px; padding: 12px; }
.panel svg { width: 100%; height: auto; }
.panel rect.hotspot:hover { fill: rgba(0, 0, 0, 0.12); }
table.data { border-collapse: collapse; width: 100%; margin-top: 8px; font-size: 12px; }
table.data th, table.data td { border: 1px solid #ddd; padding: 4px 8px; }
table.data th { background-color: #4682b4; color: white; cursor: pointer; }
table.data td.num { text-align: right; }
details { margin-top: 8px; }
";

/// Header row plus display/sort-key cell pairs behind one panel.
pub fn panel_table(panel: &Panel) -> (Vec<String>, Vec<Vec<(String, String)>>) {
    let numeric = |value: f64| (format_number(value), value.to_string());
    let text = |value: &str| (value.to_string(), String::new());
    match &panel.kind {
        PanelKind::Bars { labels, values, .. } | PanelKind::Line { labels, values, .. } => (
            vec!["Label".to_string(), "Value".to_string()],
            labels
                .iter()
                .zip(values)
                .map(|(label, value)| vec![text(label), numeric(*value)])
                .collect(),
        ),
        PanelKind::Histogram { values, bins } => (
            vec!["From".to_string(), "To".to_string(), "Count".to_string()],
            histogram_bins(values, *bins)
                .iter()
                .map(|bin| {
                    vec![
                        numeric(bin.lower),
                        numeric(bin.upper),
                        numeric(bin.count as f64),
                    ]
                })
                .collect(),
        ),
        PanelKind::Scatter { points, shades } => {
            let mut headers = vec![panel.x_desc.clone(), panel.y_desc.clone()];
            if shades.is_some() {
                headers.push("Shade".to_string());
            }
            let rows = points
                .iter()
                .enumerate()
                .map(|(idx, (x, y))| {
                    let mut row = vec![numeric(*x), numeric(*y)];
                    if let Some(shade) = shades.as_ref().and_then(|s| s.get(idx)) {
                        row.push(numeric(*shade));
                    }
                    row
                })
                .collect();
            (headers, rows)
        }
        PanelKind::Boxplot { groups } => (
            vec!["Group".to_string(), "Count".to_string()],
            groups
                .iter()
                .map(|(label, values)| vec![text(label), numeric(values.len() as f64)])
                .collect(),
        ),
    }
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Appends hover targets just before the closing `</svg>` tag.
pub fn inject_hotspots(svg: &str, hotspots: &[Hotspot]) -> String {
    let Some(end) = svg.rfind("</svg>") else {
        return svg.to_string();
    };
    let mut output = String::with_capacity(svg.len() + hotspots.len() * 96);
    output.push_str(&svg[..end]);
    output.push_str("<g class=\"hotspots\">");
    for spot in hotspots {
        let _ = write!(
            output,
            "<rect class=\"hotspot\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"transparent\"><title>{}</title></rect>",
            spot.x,
            spot.y,
            spot.width,
            spot.height,
            escape_html(&spot.label)
        );
    }
    output.push_str("</g>");
    output.push_str(&svg[end..]);
    output
}

fn render_data_table(output: &mut String, panel: &Panel) {
    let (headers, rows) = panel_table(panel);
    let _ = writeln!(output, "<details><summary>Data ({} rows)</summary>", rows.len());
    let _ = writeln!(output, "<table class=\"data\"><thead><tr>");
    for header in &headers {
        let _ = write!(output, "<th>{}</th>", escape_html(header));
    }
    let _ = writeln!(output, "</tr></thead><tbody>");
    for row in rows {
        output.push_str("<tr>");
        for (display, key) in row {
            if key.is_empty() {
                let _ = write!(output, "<td>{}</td>", escape_html(&display));
            } else {
                let _ = write!(
                    output,
                    "<td class=\"num\" data-value=\"{}\">{}</td>",
                    escape_html(&key),
                    escape_html(&display)
                );
            }
        }
        output.push_str("</tr>\n");
    }
    let _ = writeln!(output, "</tbody></table></details>");
}

/// Builds the dashboard document for up to four panels.
pub fn render_dashboard(title: &str, panels: &[Panel]) -> Result<String> {
    let mut output = String::new();
    output.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(output, "<title>{}</title>", escape_html(title));
    let _ = writeln!(output, "<style>\n{STYLE}</style>");
    output.push_str("</head>\n<body>\n");
    let _ = writeln!(output, "<h1>{}</h1>", escape_html(title));
    output.push_str("<div class=\"grid\">\n");
    for panel in panels {
        let (svg, hotspots) = charts::render_panel_svg(panel, charts::PANEL_SIZE)?;
        output.push_str("<section class=\"panel\">\n");
        output.push_str(&inject_hotspots(&svg, &hotspots));
        output.push('\n');
        render_data_table(&mut output, panel);
        output.push_str("</section>\n");
    }
    output.push_str("</div>\n");
    let _ = writeln!(output, "<script>{SORT_SCRIPT}</script>");
    output.push_str("</body>\n</html>\n");
    Ok(output)
}

pub fn write_dashboard(path: &Path, title: &str, panels: &[Panel]) -> Result<()> {
    let html = render_dashboard(title, panels)?;
    io_utils::write_text_atomically(path, &html)?;
    info!("Interactive dashboard saved to {path:?}");
    Ok(())
}
