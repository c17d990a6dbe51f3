use html_escape::{encode_double_quoted_attribute, encode_text};
use pulldown_cmark::{Event, Options, Parser, html};

use crate::shell::Stage;

const TITLE: &str = "Necture";
const TAGLINE: &str = "Turn YouTube lectures into clean study notes.";
const URL_LABEL: &str = "Paste a YouTube video link:";
const URL_PLACEHOLDER: &str = "https://www.youtube.com/watch?v=...";

pub const VALID_LINK: &str = "Valid YouTube link detected!";
pub const INVALID_LINK: &str = "Please enter a valid YouTube video link.";
pub const NO_TRANSCRIPT: &str = "No transcript available for this video.";
pub const GENERATE_BUTTON: &str = "Generate Study Notes";
pub const GENERATING: &str = "Generating notes...";
pub const NOTES_HEADING: &str = "Study Notes";

const STYLE: &str = "\
body{font-family:sans-serif;max-width:46rem;margin:2rem auto;padding:0 1rem;color:#262730}\
input[type=text]{width:100%;padding:.5rem;font-size:1rem;box-sizing:border-box}\
.msg{padding:.75rem 1rem;border-radius:.4rem;margin:1rem 0}\
.success{background:#e8f9ee;color:#177233}\
.warning{background:#fffce7;color:#926c05}\
.error{background:#ffecec;color:#7d353b}\
.notes{line-height:1.5}\
.spinner{display:none;color:#555}\
pre{white-space:pre-wrap}";

/// Render the page for a settled stage
pub fn render_page(url: &str, stage: &Stage) -> String {
    page(url, &stage_body(url, stage))
}

/// Render the page for an interaction that failed outright
pub fn render_error(url: &str, err: &eyre::Report) -> String {
    let body = format!(
        "<div class=\"msg error\"><strong>{}</strong><pre>{}</pre></div>",
        encode_text(&err.to_string()),
        encode_text(&format!("{err:?}")),
    );
    page(url, &body)
}

fn stage_body(url: &str, stage: &Stage) -> String {
    match stage {
        Stage::Idle => String::new(),
        Stage::Invalid | Stage::Parsed { video_id: None } => message("error", INVALID_LINK),
        Stage::Parsed {
            video_id: Some(video_id),
        }
        | Stage::Fetching { video_id } => detected(video_id),
        Stage::Unavailable { video_id, .. } => format!("{}{}", detected(video_id), message("warning", NO_TRANSCRIPT)),
        Stage::Ready { video_id, .. } => format!("{}{}", detected(video_id), generate_form(url)),
        Stage::Generating { video_id, .. } => format!(
            "{}<p class=\"spinner\" style=\"display:block\">{GENERATING}</p>",
            detected(video_id)
        ),
        Stage::Displayed { video_id, notes } => format!(
            "{}<h2>{NOTES_HEADING}</h2><div class=\"notes\">{}</div>",
            detected(video_id),
            render_notes(notes)
        ),
    }
}

/// Render model markdown to HTML. Raw HTML in the notes is shown as text.
fn render_notes(notes: &str) -> String {
    let parser = Parser::new_ext(notes, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(notes.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn detected(video_id: &str) -> String {
    format!(
        "{}<p>Video ID: <code>{}</code></p>",
        message("success", VALID_LINK),
        encode_text(video_id)
    )
}

fn message(kind: &str, text: &str) -> String {
    format!("<div class=\"msg {kind}\">{}</div>", encode_text(text))
}

/// The generate button re-submits the entered link; the spinner shows while the request is in flight
fn generate_form(url: &str) -> String {
    format!(
        "<form method=\"post\" action=\"/\" \
         onsubmit=\"this.querySelector('button').disabled=true;this.querySelector('.spinner').style.display='block'\">\
         <input type=\"hidden\" name=\"url\" value=\"{url}\">\
         <input type=\"hidden\" name=\"generate\" value=\"true\">\
         <button type=\"submit\">{GENERATE_BUTTON}</button>\
         <p class=\"spinner\">{GENERATING}</p></form>",
        url = encode_double_quoted_attribute(url),
    )
}

fn page(url: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{TITLE}</title><style>{STYLE}</style></head><body><main>\
         <h1>{TITLE}</h1><p>{TAGLINE}</p><hr>\
         <form method=\"get\" action=\"/\"><label for=\"url\">{URL_LABEL}</label>\
         <input type=\"text\" id=\"url\" name=\"url\" value=\"{value}\" placeholder=\"{URL_PLACEHOLDER}\" \
         onchange=\"this.form.submit()\"></form>\
         {body}</main></body></html>\n",
        value = encode_double_quoted_attribute(url),
    )
}
