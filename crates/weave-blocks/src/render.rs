//! HTML rendering of expanded documents.

use pulldown_cmark::{Options, Parser, html};

/// Render markdown to HTML.
///
/// Tables, strikethrough and task lists are enabled.
#[must_use]
pub fn render_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_render_paragraph() {
        assert_eq!(render_html("Hello *world*"), "<p>Hello <em>world</em></p>\n");
    }

    #[test]
    fn test_render_blockquote_heading() {
        assert_eq!(
            render_html("> # Title"),
            "<blockquote>\n<h1>Title</h1>\n</blockquote>\n"
        );
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_html(""), "");
    }
}
