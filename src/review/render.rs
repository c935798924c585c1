//! Preview page rendering.
//!
//! [`render`] turns an artifact into the `index.html` served by the review
//! server, plus any side files the page loads. Every page starts with the
//! same fixed control bar (Accept, Reject, comment box) that posts the
//! decision to `/result`; the artifact is displayed below it according to
//! its [`ContentKind`]:
//!
//! | Kind               | Display                                              |
//! |--------------------|------------------------------------------------------|
//! | `markdown`         | converted to HTML with pulldown-cmark, not sanitized |
//! | `html`             | staged as `content.html`, shown in an `<iframe>`     |
//! | `json`, `plain-text` | escaped inside `<pre>`                             |
//! | `component-source` | bundle staged as `bundle.js`, mounted into `#root`   |
//!
//! For `component-source` the payload passed in must already be the bundler
//! output, not the original source.

use pulldown_cmark::{Options, Parser, html};

use super::models::ContentKind;

/// Side file for `html` previews.
pub const EMBEDDED_HTML_FILE: &str = "content.html";
/// Side file for `component-source` previews.
pub const BUNDLE_FILE: &str = "bundle.js";
/// The page the server serves and the browser opens.
pub const INDEX_FILE: &str = "index.html";
/// Route the control bar posts to.
pub const RESULT_ROUTE: &str = "/result";

const REACT_IMPORT_MAP: &str = r#"{
  "imports": {
    "react": "https://esm.sh/react@18",
    "react/jsx-runtime": "https://esm.sh/react@18/jsx-runtime",
    "react-dom": "https://esm.sh/react-dom@18",
    "react-dom/client": "https://esm.sh/react-dom@18/client"
  }
}"#;

const STYLE: &str = r#"
  body { margin: 0; font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; }
  #hitl-controls {
    position: fixed; top: 0; left: 0; right: 0; z-index: 2147483647;
    display: flex; gap: 8px; align-items: center;
    padding: 8px 12px; background: #1f2328; color: #fff;
  }
  #hitl-controls input { flex: 1; padding: 6px; border-radius: 4px; border: none; }
  #hitl-controls button { padding: 6px 16px; border: none; border-radius: 4px; cursor: pointer; color: #fff; }
  #hitl-accept { background: #1a7f37; }
  #hitl-reject { background: #cf222e; }
  #hitl-content { margin-top: 56px; padding: 16px; }
  #hitl-content pre { white-space: pre-wrap; word-break: break-word; }
  .hitl-frame { width: 100%; height: calc(100vh - 90px); border: 1px solid #d0d7de; }
"#;

const CONTROL_BAR: &str = r#"<div id="hitl-controls">
  <button id="hitl-accept" type="button">Accept</button>
  <button id="hitl-reject" type="button">Reject</button>
  <input id="hitl-comment" type="text" placeholder="Comment (optional)">
  <span id="hitl-status"></span>
</div>"#;

const CONTROL_SCRIPT: &str = r#"<script>
(function () {
  var accept = document.getElementById("hitl-accept");
  var reject = document.getElementById("hitl-reject");
  var comment = document.getElementById("hitl-comment");
  var status = document.getElementById("hitl-status");
  function submit(accepted) {
    accept.disabled = true;
    reject.disabled = true;
    fetch("/result", {
      method: "POST",
      headers: { "Content-Type": "application/json" },
      body: JSON.stringify({ accepted: accepted, comment: comment.value })
    }).then(function (res) {
      status.textContent = res.ok ? "Decision sent. You can close this tab." : "Submission failed (" + res.status + ")";
    }).catch(function (err) {
      status.textContent = "Submission failed: " + err;
      accept.disabled = false;
      reject.disabled = false;
    });
  }
  accept.addEventListener("click", function () { submit(true); });
  reject.addEventListener("click", function () { submit(false); });
})();
</script>"#;

/// A file staged next to `index.html`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewAsset {
    pub name: &'static str,
    pub contents: String,
}

/// Markup for `index.html` plus the kind it was actually rendered as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub markup: String,
    pub kind: ContentKind,
    pub assets: Vec<PreviewAsset>,
}

/// Escape the five HTML-sensitive characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Convert markdown to HTML. Raw HTML in the source passes through untouched.
pub fn markdown_to_html(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

pub fn render(payload: &str, kind: ContentKind) -> RenderedDocument {
    render_with_title(payload, kind, "Review")
}

/// Render `payload` as a review page titled `title`.
pub fn render_with_title(payload: &str, kind: ContentKind, title: &str) -> RenderedDocument {
    let mut assets = Vec::new();
    let mut head = String::new();

    let content = match kind {
        ContentKind::Markdown => {
            format!("<article class=\"markdown-body\">\n{}</article>", markdown_to_html(payload))
        }
        ContentKind::Html => {
            assets.push(PreviewAsset {
                name: EMBEDDED_HTML_FILE,
                contents: payload.to_string(),
            });
            format!(
                "<iframe class=\"hitl-frame\" src=\"{}\" sandbox=\"allow-scripts\" title=\"{}\"></iframe>",
                EMBEDDED_HTML_FILE,
                escape_html(title)
            )
        }
        ContentKind::ComponentSource => {
            assets.push(PreviewAsset {
                name: BUNDLE_FILE,
                contents: payload.to_string(),
            });
            head.push_str("<script type=\"importmap\">\n");
            head.push_str(REACT_IMPORT_MAP);
            head.push_str("\n</script>\n");
            format!(
                "<div id=\"root\"></div>\n<script type=\"module\">\n\
                 import React from \"react\";\n\
                 import {{ createRoot }} from \"react-dom/client\";\n\
                 import Component from \"./{}\";\n\
                 createRoot(document.getElementById(\"root\")).render(React.createElement(Component));\n\
                 </script>",
                BUNDLE_FILE
            )
        }
        ContentKind::Json | ContentKind::PlainText => {
            format!("<pre>{}</pre>", escape_html(payload))
        }
    };

    RenderedDocument {
        markup: page(title, &head, &content),
        kind,
        assets,
    }
}

fn page(title: &str, head: &str, content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 4096);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    out.push_str("<style>");
    out.push_str(STYLE);
    out.push_str("</style>\n");
    out.push_str(head);
    out.push_str("</head>\n<body>\n");
    out.push_str(CONTROL_BAR);
    out.push_str("\n<main id=\"hitl-content\">\n");
    out.push_str(content);
    out.push_str("\n</main>\n");
    out.push_str(CONTROL_SCRIPT);
    out.push_str("\n</body>\n</html>\n");
    out
}
