//! Markdown → HTML markup for chat items.
//!
//! Thin wrapper around `pulldown_cmark`'s HTML writer. Fenced code blocks are
//! routed through the optional [`Highlighter`] extension and the final markup
//! through the optional [`Sanitizer`] extension. Both are host-supplied; when
//! no sanitizer is configured the markup is passed through as-is, which is
//! only safe for trusted backends.

use std::fmt;
use std::sync::{Arc, LazyLock};

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::ui::dom::escape;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Syntax-highlighting extension: raw code + language hint → HTML markup.
pub trait Highlighter: Send + Sync {
    fn name(&self) -> &str;

    /// Returns markup for the inside of a `<code>` element. Must escape `code`.
    fn highlight(&self, code: &str, language: &str) -> String;
}

/// HTML sanitizer extension: raw HTML → safe HTML.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, html: &str) -> String;
}

/// Rendering extensions shared by every chat item of one chat.
#[derive(Clone, Default)]
pub struct RenderExtensions {
    pub highlighter: Option<Arc<dyn Highlighter>>,
    /// `None` means markup is NOT sanitized.
    pub sanitizer: Option<Arc<dyn Sanitizer>>,
}

impl fmt::Debug for RenderExtensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderExtensions")
            .field("highlighter", &self.highlighter.as_ref().map(|h| h.name().to_string()))
            .field("sanitizer", &self.sanitizer.is_some())
            .finish()
    }
}

/// Render markdown `content` to HTML using the given extensions.
pub fn render(content: &str, extensions: &RenderExtensions) -> String {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_TABLES);

    // Buffer code block text so it can be highlighted as a whole.
    let mut code: Option<(String, String)> = None;
    let mut events: Vec<Event<'_>> = Vec::new();

    for event in Parser::new_ext(content, opts) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(l) => l.split_whitespace().next().unwrap_or("").to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code = Some((lang, String::new()));
            }
            Event::Text(text) if code.is_some() => {
                if let Some((_, buf)) = code.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((lang, buf)) = code.take() {
                    let block = code_block(&buf, &lang, extensions);
                    events.push(Event::Html(CowStr::from(block)));
                }
            }
            other => events.push(other),
        }
    }

    let mut html = String::with_capacity(content.len() * 2);
    pulldown_cmark::html::push_html(&mut html, events.into_iter());

    match &extensions.sanitizer {
        Some(sanitizer) => sanitizer.sanitize(&html),
        None => html,
    }
}

fn code_block(code: &str, lang: &str, extensions: &RenderExtensions) -> String {
    let body = match (&extensions.highlighter, lang.is_empty()) {
        (Some(highlighter), false) => highlighter.highlight(code, lang),
        _ => escape(code),
    };
    if lang.is_empty() {
        format!("<pre class=\"code-block\"><code>{body}</code></pre>\n")
    } else {
        format!(
            "<pre class=\"code-block\" data-language=\"{}\"><code>{body}</code></pre>\n",
            escape(lang)
        )
    }
}

// ── Default highlighter ─────────────────────────────────────────────────────

/// Class-based syntect highlighter. Emits `<span class="...">` markup so the
/// host theme controls colours.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntectHighlighter;

impl Highlighter for SyntectHighlighter {
    fn name(&self) -> &str {
        "syntect"
    }

    fn highlight(&self, code: &str, language: &str) -> String {
        let Some(syntax) = SYNTAX_SET.find_syntax_by_token(language) else {
            return escape(code);
        };
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced);
        for line in LinesWithEndings::from(code) {
            if generator
                .parse_html_for_line_which_includes_newline(line)
                .is_err()
            {
                return escape(code);
            }
        }
        generator.finalize()
    }
}
