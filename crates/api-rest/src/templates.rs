//! Server-rendered HTML pages.
//!
//! Every interpolated value goes through [`html_escape`]. Pages carry no script; forms
//! post back to the relay.

use fhir::{ObservationForm, PatientSummary, VitalSign};

const TITLE: &str = "Vitals Entry";

const STYLES: &str = r#"
body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
    max-width: 720px;
    margin: 2rem auto;
    padding: 0 1rem;
    color: #212529;
    line-height: 1.5;
}

table {
    border-collapse: collapse;
    margin-bottom: 1.5rem;
}

th, td {
    border: 1px solid #dee2e6;
    padding: 0.375rem 0.75rem;
    text-align: left;
}

.form-group {
    margin-bottom: 0.75rem;
}

.form-label {
    display: block;
    font-weight: 500;
}

.status-success {
    color: #198754;
}

.status-error {
    color: #dc3545;
}
"#;

/// Outcome line shown above the observation form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusLine {
    Success { status: String, id: Option<String> },
    Error(String),
}

/// Base HTML template wrapper.
fn html_page(content: &str) -> String {
    let mut html = String::with_capacity(content.len() + 1200);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str("    <title>");
    html.push_str(TITLE);
    html.push_str("</title>\n    <style>");
    html.push_str(STYLES);
    html.push_str("</style>\n</head>\n<body>\n<h1>");
    html.push_str(TITLE);
    html.push_str("</h1>\n");
    html.push_str(content);
    html.push_str("\n</body>\n</html>");
    html
}

fn sign_in_button(content: &mut String) {
    content.push_str("<form method=\"GET\" action=\"/api/auth/signin\">\n");
    content.push_str("<button type=\"submit\">Sign In</button>\n</form>\n");
}

fn sign_out_button(content: &mut String) {
    content.push_str("<form method=\"POST\" action=\"/api/auth/signout\">\n");
    content.push_str("<button type=\"submit\">Sign Out</button>\n</form>\n");
}

fn sign_in_placeholder(content: &mut String) {
    sign_in_button(content);
    content.push_str("<p>Please sign in to access your data.</p>\n");
}

/// Path under `/patient/{id}`, with `link_query` appended when credentials travel in the URL.
fn patient_path(patient_id: &str, suffix: &str, link_query: Option<&str>) -> String {
    let mut path = format!("/patient/{}{suffix}", urlencoding::encode(patient_id));
    if let Some(query) = link_query {
        path.push('?');
        path.push_str(query);
    }
    path
}

/// Renders the home page.
///
/// `patient_id` is `None` when the browser has not signed in. `link_query` is appended to
/// every link and form action.
pub fn render_home(
    patient_id: Option<&str>,
    link_query: Option<&str>,
    form: &ObservationForm,
) -> String {
    let mut content = String::with_capacity(4096);

    let Some(patient_id) = patient_id else {
        sign_in_placeholder(&mut content);
        return html_page(&content);
    };

    sign_in_button(&mut content);
    content.push_str("<p>Patient ID: ");
    content.push_str(&html_escape(patient_id));
    content.push_str("</p>\n<p><a href=\"");
    content.push_str(&html_escape(&patient_path(patient_id, "", link_query)));
    content.push_str("\">View Patient Data</a></p>\n");

    observation_form(&mut content, patient_id, link_query, form, None);
    sign_out_button(&mut content);
    html_page(&content)
}

/// Renders the patient page.
///
/// `patient` is the fetched summary, or the error message when the fetch failed.
pub fn render_patient(
    patient_id: &str,
    link_query: Option<&str>,
    patient: Result<&PatientSummary, &str>,
    form: &ObservationForm,
    status: Option<&StatusLine>,
) -> String {
    let mut content = String::with_capacity(4096);

    match patient {
        Ok(summary) => patient_table(&mut content, patient_id, summary),
        Err(message) => {
            content.push_str("<p>No patient data found.</p>\n");
            content.push_str("<p class=\"status-error\">Error: ");
            content.push_str(&html_escape(message));
            content.push_str("</p>\n");
        }
    }

    observation_form(&mut content, patient_id, link_query, form, status);
    sign_out_button(&mut content);
    html_page(&content)
}

/// Renders the result of an observation submission.
pub fn render_submission(
    patient_id: &str,
    link_query: Option<&str>,
    form: &ObservationForm,
    status: &StatusLine,
) -> String {
    let mut content = String::with_capacity(4096);
    content.push_str("<p>Patient ID: ");
    content.push_str(&html_escape(patient_id));
    content.push_str("</p>\n<p><a href=\"");
    content.push_str(&html_escape(&patient_path(patient_id, "", link_query)));
    content.push_str("\">View Patient Data</a></p>\n");

    observation_form(&mut content, patient_id, link_query, form, Some(status));
    sign_out_button(&mut content);
    html_page(&content)
}

/// Renders the page shown to signed-out browsers.
pub fn render_signed_out() -> String {
    let mut content = String::with_capacity(512);
    sign_in_placeholder(&mut content);
    html_page(&content)
}

fn patient_table(content: &mut String, patient_id: &str, summary: &PatientSummary) {
    let id = summary.id.as_deref().unwrap_or(patient_id);
    let rows = [
        ("Name", summary.name.as_deref()),
        ("ID", Some(id)),
        ("Date of Birth", summary.birth_date.as_deref()),
        ("Address", summary.address.as_deref()),
    ];

    content.push_str("<h2>Patient Data</h2>\n<table>\n");
    for (label, value) in rows {
        content.push_str("<tr><th>");
        content.push_str(label);
        content.push_str("</th><td>");
        content.push_str(&html_escape(value.unwrap_or("N/A")));
        content.push_str("</td></tr>\n");
    }
    content.push_str("</table>\n");
}

fn observation_form(
    content: &mut String,
    patient_id: &str,
    link_query: Option<&str>,
    form: &ObservationForm,
    status: Option<&StatusLine>,
) {
    content.push_str("<h2>Create Observation</h2>\n");

    match status {
        Some(StatusLine::Success { status, id }) => {
            content.push_str("<p class=\"status-success\">Success: ");
            content.push_str(&html_escape(status));
            content.push_str("</p>\n");
            if let Some(id) = id {
                content.push_str("<p class=\"status-success\">New Observation ID: ");
                content.push_str(&html_escape(id));
                content.push_str("</p>\n");
            }
        }
        Some(StatusLine::Error(message)) => {
            content.push_str("<p class=\"status-error\">Error: ");
            content.push_str(&html_escape(message));
            content.push_str("</p>\n");
        }
        None => {}
    }

    content.push_str("<form method=\"POST\" action=\"");
    content.push_str(&html_escape(&patient_path(
        patient_id,
        "/observations",
        link_query,
    )));
    content.push_str("\">\n");

    // Code
    content.push_str("<div class=\"form-group\">\n");
    content.push_str("<label class=\"form-label\" for=\"code\">Code</label>\n");
    content.push_str("<select id=\"code\" name=\"code\">\n");
    for vital in VitalSign::ALL {
        content.push_str("<option value=\"");
        content.push_str(vital.code());
        content.push('"');
        if vital.code() == form.code {
            content.push_str(" selected");
        }
        content.push('>');
        content.push_str(vital.display());
        content.push_str(" (");
        content.push_str(vital.code());
        content.push_str(")</option>\n");
    }
    content.push_str("</select>\n</div>\n");

    text_input(
        content,
        "effectiveDateTime",
        "Effective Date Time (UTC, YYYY-MM-DD HH:MM)",
        &form.effective_date_time,
    );
    text_input(content, "encounter", "Encounter", &form.encounter);
    text_input(content, "value", "Value", &form.value);

    content.push_str("<button type=\"submit\">Create Observation</button>\n</form>\n");
}

fn text_input(content: &mut String, name: &str, label: &str, value: &str) {
    content.push_str("<div class=\"form-group\">\n");
    content.push_str("<label class=\"form-label\" for=\"");
    content.push_str(name);
    content.push_str("\">");
    content.push_str(&html_escape(label));
    content.push_str("</label>\n<input type=\"text\" id=\"");
    content.push_str(name);
    content.push_str("\" name=\"");
    content.push_str(name);
    content.push_str("\" value=\"");
    content.push_str(&html_escape(value));
    content.push_str("\">\n</div>\n");
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
