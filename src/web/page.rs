//! HTML for the submission form and the result page.

use crate::commands::Outcome;
use crate::services::annotator::prediction_summary;
use crate::types::{EquipmentInfo, LogTable};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{Datelike, Local};
use std::fmt::Write;
use std::fs;
use std::path::Path;
use tracing::debug;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #1f2937; }
h1 { color: #2563eb; }
img.logo { max-height: 96px; }
label { display: block; margin-top: 0.8rem; font-weight: 600; }
input[type=text] { width: 100%; padding: 0.4rem; }
button, a.download { display: inline-block; margin-top: 1rem; padding: 0.5rem 1.2rem; background: #2563eb; color: #fff; border: none; border-radius: 4px; text-decoration: none; }
.error { background: #fee2e2; color: #991b1b; padding: 0.8rem; border-radius: 4px; }
.success { background: #dcfce7; color: #166534; padding: 0.8rem; border-radius: 4px; }
.notice { background: #fef9c3; color: #854d0e; padding: 0.8rem; border-radius: 4px; }
table { border-collapse: collapse; margin-top: 0.5rem; font-size: 0.9rem; }
th, td { border: 1px solid #e5e7eb; padding: 0.3rem 0.6rem; }
th { background: #2563eb; color: #fff; }
footer { margin-top: 3rem; text-align: center; color: #888; font-size: 14px; border-top: 1px solid #f0f0f0; padding-top: 1rem; }
"#;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

/// Logo image as a `data:` URI; `None` when the file is absent or unreadable.
pub fn logo_data_uri(path: &Path) -> Option<String> {
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        _ => "image/png",
    };
    match fs::read(path) {
        Ok(bytes) => Some(format!("data:{};base64,{}", mime, BASE64.encode(bytes))),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No logo, pages render without it");
            None
        }
    }
}

fn layout(body: &str, logo: Option<&str>) -> String {
    let (icon, image) = match logo {
        Some(uri) => (
            format!(r#"<link rel="icon" href="{}">"#, uri),
            format!(r#"<img class="logo" src="{}" alt="MedPredict">"#, uri),
        ),
        None => (String::new(), String::new()),
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>MedPredict</title>{icon}<style>{style}</style></head>
<body>
{image}
<h1>MedPredict - Predictive Maintenance</h1>
{body}
<footer>&copy; MedPredict {year} - All rights reserved</footer>
</body>
</html>"#,
        icon = icon,
        image = image,
        style = STYLE,
        body = body,
        year = Local::now().year()
    )
}

fn form(values: &EquipmentInfo) -> String {
    format!(
        r#"<form method="post" action="/submit" enctype="multipart/form-data">
<label for="equipment_name">Equipment Name</label>
<input type="text" id="equipment_name" name="equipment_name" placeholder="Surgical Microscope" value="{name}">
<label for="company">Company</label>
<input type="text" id="company" name="company" placeholder="Leica" value="{company}">
<label for="model">Model</label>
<input type="text" id="model" name="model" placeholder="Provido" value="{model}">
<label for="logs">Upload Logs (Excel .xlsx)</label>
<input type="file" id="logs" name="logs" accept=".xlsx,.xlsm,.xls,.ods">
<label for="manual">Upload Technical Manual (PDF)</label>
<input type="file" id="manual" name="manual" accept=".pdf,.docx,.txt">
<button type="submit">Submit</button>
</form>"#,
        name = escape(&values.equipment_name),
        company = escape(&values.company),
        model = escape(&values.model),
    )
}

pub fn render_table(table: &LogTable) -> String {
    let mut html = String::from("<table>\n<tr>");
    for col in &table.columns {
        let _ = write!(html, "<th>{}</th>", escape(col));
    }
    html.push_str("</tr>\n");
    for row in &table.rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape(&cell.to_string()));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>");
    html
}

/// Empty form, optionally with an error banner above it and the user's text kept.
pub fn form_page(values: &EquipmentInfo, error: Option<&str>, logo: Option<&str>) -> String {
    let banner = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default();
    let body = format!(
        "<p>Welcome to your predictive maintenance application.</p>\n{}\n{}",
        banner,
        form(values)
    );
    layout(&body, logo)
}

/// Results, download link and a fresh form. On a predicted failure the warning is shown
/// at once and the alert sound starts playing after the alert delay.
pub fn result_page(outcome: &Outcome, logo: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str(r#"<p class="success">Information and files loaded successfully.</p>"#);
    for notice in &outcome.notices {
        let _ = write!(body, r#"<p class="notice">{}</p>"#, escape(notice));
    }
    if let Some(alert) = &outcome.alert {
        let _ = write!(body, r#"<p class="error">{}</p>"#, escape(&alert.message));
        if let Some(sound) = &alert.sound {
            let _ = write!(
                body,
                r#"<audio id="alert-sound" preload="auto"><source src="{}"></audio>
<script>setTimeout(function () {{ document.getElementById("alert-sound").play(); }}, {});</script>"#,
                sound,
                alert.delay.as_millis()
            );
        }
    }

    body.push_str("<h2>Loaded data</h2>");
    body.push_str(&render_table(&outcome.preview));

    body.push_str("<h2>Result with recommended actions</h2><ul>");
    for (label, count) in prediction_summary(&outcome.result.predictions) {
        let _ = write!(body, "<li>{}: {}</li>", escape(&label), count);
    }
    body.push_str("</ul>");
    body.push_str(&render_table(&outcome.result.table));

    let _ = write!(
        body,
        r#"<p><a class="download" download="{name}" href="data:{mime};base64,{data}">Download Results as Excel</a></p>"#,
        name = outcome.file_name,
        mime = outcome.mime,
        data = BASE64.encode(&outcome.workbook)
    );
    body.push_str("<h2>New analysis</h2>");
    body.push_str(&form(&outcome.equipment));
    layout(&body, logo)
}
