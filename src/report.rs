use chrono::{DateTime, Utc};

use crate::models::report::Report;

const NOT_AVAILABLE: &str = "Not available";
const NO_TREATMENTS: &str = "No specific treatments recommended.";

const STYLE: &str = r#"
        body {
            font-family: Arial, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 800px;
            margin: 0 auto;
            padding: 20px;
        }
        .header {
            background: linear-gradient(to right, #4F46E5, #7C3AED);
            color: white;
            padding: 20px;
            border-radius: 10px;
            margin-bottom: 30px;
            text-align: center;
        }
        .section {
            background: #f9fafb;
            padding: 20px;
            border-radius: 8px;
            margin-bottom: 20px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }
        .section-title {
            color: #4F46E5;
            font-size: 1.2em;
            margin-bottom: 10px;
            border-bottom: 2px solid #4F46E5;
            padding-bottom: 5px;
        }
        .treatment-list {
            list-style-type: none;
            padding-left: 0;
        }
        .treatment-item {
            padding: 10px;
            border-left: 3px solid #4F46E5;
            margin-bottom: 10px;
            background: white;
        }
        .footer {
            text-align: center;
            margin-top: 30px;
            padding-top: 20px;
            border-top: 1px solid #ddd;
            color: #666;
        }
"#;

/// Render a report as a standalone HTML document.
///
/// All report text is escaped before interpolation. Absent fields render as
/// "Not available" and an empty treatment list renders a single placeholder item.
pub fn render_report(report: &Report, generated_at: DateTime<Utc>) -> String {
    let d = &report.diagnosis;

    let sections = [
        section("Disease Name", d.disease_name.as_deref()),
        section("Description", d.description.as_deref()),
        section("Related Issues", d.related_issues.as_deref()),
        section("Risk Factors", d.risk_factors.as_deref()),
    ]
    .concat();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <style>{style}</style>
</head>
<body>
    <div class="header">
        <h1>Skin Disease Detection Report</h1>
        <p>Generated on {generated}</p>
    </div>
{sections}
    <div class="section">
        <div class="section-title">Recommended Treatments</div>
        <ul class="treatment-list">
{treatments}        </ul>
    </div>

    <div class="footer">
        <p>This is an automated report from Derma Analyzer</p>
        <p>Please consult with a healthcare professional for medical advice</p>
    </div>
</body>
</html>
"#,
        style = STYLE,
        generated = generated_at.format("%B %-d, %Y at %H:%M UTC"),
        sections = sections,
        treatments = treatment_items(&report.treatments),
    )
}

/// Subject line: the disease name when known, otherwise a generic label.
pub fn report_subject(report: &Report) -> String {
    let label = report
        .diagnosis
        .disease_name
        .as_deref()
        .unwrap_or("Analysis");
    format!("Skin Disease Detection Report - {}", label)
}

/// Body of the diagnostic message sent by `/api/send-test-email`.
pub fn test_email_html(sent_at: DateTime<Utc>) -> String {
    format!(
        "<h1>Test Email</h1>\
         <p>This is a test email from Derma Analyzer server.</p>\
         <p>Sent at {}.</p>",
        sent_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

fn section(title: &str, body: Option<&str>) -> String {
    let body = body.map(html_escape).unwrap_or_else(|| NOT_AVAILABLE.to_string());
    format!(
        r#"
    <div class="section">
        <div class="section-title">{}</div>
        <p>{}</p>
    </div>
"#,
        title, body
    )
}

fn treatment_items(treatments: &[String]) -> String {
    if treatments.is_empty() {
        return format!("            <li class=\"treatment-item\">{}</li>\n", NO_TREATMENTS);
    }
    treatments
        .iter()
        .map(|t| format!("            <li class=\"treatment-item\">{}</li>\n", html_escape(t)))
        .collect()
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
