//! The single HTML page: header, input row, flow indicator and result tabs.

use std::fmt::Write;

use eduforge_pipeline::{MAX_GRADE, MIN_GRADE};
use eduforge_render::{escape_html, HtmlPanes, TAB_TITLES};

/// What the page shows: the submitted inputs and any rendered panes.
#[derive(Debug, Clone, Default)]
pub struct PageView {
    /// Slider position.
    pub grade: u8,
    /// Topic field contents.
    pub topic: String,
    /// Result regions; empty before the first submit.
    pub panes: HtmlPanes,
}

impl PageView {
    /// A view with the given inputs and no results.
    #[must_use]
    pub fn new(grade: u8, topic: &str) -> Self {
        Self {
            grade: grade.clamp(MIN_GRADE, MAX_GRADE),
            topic: topic.to_string(),
            panes: HtmlPanes::default(),
        }
    }

    /// Attaches rendered panes.
    #[must_use]
    pub fn with_panes(mut self, panes: HtmlPanes) -> Self {
        self.panes = panes;
        self
    }
}

const STYLE: &str = r"
body { font-family: system-ui, sans-serif; max-width: 900px; margin: 0 auto; padding: 1rem; color: #222; }
header { text-align: center; }
form { display: flex; gap: 1rem; align-items: flex-end; flex-wrap: wrap; }
label { display: flex; flex-direction: column; font-weight: 600; }
input[type=text] { width: 400px; padding: 0.4rem; }
button { padding: 0.5rem 1rem; background: #1565c0; color: #fff; border: 0; border-radius: 4px; cursor: pointer; }
button:disabled { background: #90a4ae; cursor: wait; }
.spinner { width: 22px; height: 22px; border: 3px solid #ccc; border-top-color: #1565c0; border-radius: 50%; animation: spin 0.8s linear infinite; }
.spinner[hidden] { display: none; }
@keyframes spin { to { transform: rotate(360deg); } }
.tabs { display: flex; gap: 0.5rem; margin-top: 1rem; }
.tabs button { background: #e3e7eb; color: #222; }
.tabs button.active { background: #1565c0; color: #fff; }
.pane { background: #f8f9fa; padding: 15px; border-radius: 8px; margin-top: 0.5rem; }
.pane[hidden] { display: none; }
.correct { font-weight: 600; }
.badge.pass { color: #2e7d32; }
.badge.fail { color: #c62828; }
.error { white-space: pre-wrap; }
";

const SCRIPT: &str = r"
const form = document.getElementById('run-form');
const grade = document.getElementById('grade');
form.addEventListener('submit', () => {
  document.getElementById('run-button').disabled = true;
  document.getElementById('spinner').hidden = false;
});
grade.addEventListener('input', () => {
  document.getElementById('grade-value').textContent = grade.value;
});
document.querySelectorAll('.tabs button').forEach((tab) => {
  tab.addEventListener('click', () => {
    document.querySelectorAll('.tabs button').forEach((t) => t.classList.toggle('active', t === tab));
    document.querySelectorAll('.pane').forEach((p) => { p.hidden = p.id !== tab.dataset.pane; });
  });
});
";

/// Renders the complete page.
#[must_use]
pub fn render_page(view: &PageView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html lang=\"en\">\n<head>");
    let _ = writeln!(output, "<meta charset=\"utf-8\">");
    let _ = writeln!(output, "<title>EduForge</title>");
    let _ = writeln!(output, "<style>{STYLE}</style>\n</head>\n<body>");
    let _ = writeln!(
        output,
        "<header>\n<h1>🎓 EduForge</h1>\n<p><strong>Educational content generator &amp; reviewer</strong></p>\n</header>\n<hr>"
    );

    write_form(&mut output, view);
    let _ = writeln!(output, "<hr>");

    if !view.panes.is_empty() {
        write_results(&mut output, &view.panes);
    }

    let _ = writeln!(output, "<script>{SCRIPT}</script>\n</body>\n</html>");
    output
}

fn write_form(output: &mut String, view: &PageView) {
    let _ = writeln!(output, "<form id=\"run-form\" method=\"post\" action=\"/\">");
    let _ = writeln!(
        output,
        "<label>Grade Level: <span id=\"grade-value\">{grade}</span>\n\
         <input type=\"range\" id=\"grade\" name=\"grade\" min=\"{MIN_GRADE}\" max=\"{MAX_GRADE}\" value=\"{grade}\" step=\"1\">\n\
         </label>",
        grade = view.grade
    );
    let _ = writeln!(
        output,
        "<label>Topic\n<input type=\"text\" name=\"topic\" placeholder=\"e.g. Types of angles\" value=\"{}\">\n</label>",
        escape_html(&view.topic)
    );
    let _ = writeln!(
        output,
        "<button type=\"submit\" id=\"run-button\">Generate &amp; Review</button>"
    );
    let _ = writeln!(output, "<div id=\"spinner\" class=\"spinner\" hidden></div>");
    let _ = writeln!(output, "</form>");
}

fn write_results(output: &mut String, panes: &HtmlPanes) {
    if !panes.flow.is_empty() {
        let _ = writeln!(output, "<section id=\"flow\">\n{}</section>", panes.flow);
    }

    let regions = [
        ("draft", &panes.draft),
        ("review", &panes.review),
        ("refined", &panes.refined),
    ];

    let _ = writeln!(output, "<nav class=\"tabs\">");
    for (i, ((id, _), title)) in regions.iter().zip(TAB_TITLES).enumerate() {
        let class = if i == 0 { " class=\"active\"" } else { "" };
        let _ = writeln!(
            output,
            "<button type=\"button\" data-pane=\"pane-{id}\"{class}>{title}</button>"
        );
    }
    let _ = writeln!(output, "</nav>");

    for (i, (id, body)) in regions.iter().enumerate() {
        let hidden = if i == 0 { "" } else { " hidden" };
        let _ = writeln!(
            output,
            "<section id=\"pane-{id}\" class=\"pane\"{hidden}>\n{body}</section>"
        );
    }
}
