//! [`Html`] rendering of generated content, and the styled [`page`] around it.

use std::ops::Deref;

use pulldown_cmark::{html::push_html, Event, Parser};
use xml::escape::escape_str_pcdata;

/// Immutable wrapper around a [`String`] of HTML.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
#[display("{inner}")]
pub struct Html {
    inner: String,
}

impl Html {
    /// Create a new `Html` from a stream of markdown events.
    pub fn from_events<'a>(events: impl Iterator<Item = Event<'a>>) -> Self {
        events.collect::<Html>()
    }

    /// Render markdown. Raw HTML in the source is shown as text, not
    /// interpreted, since it comes from the model.
    pub fn from_markdown(markdown: &str) -> Self {
        Self::from_events(Parser::new(markdown).map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        }))
    }

    /// Extend the HTML with a stream of markdown events.
    pub fn extend<'a, It>(
        &mut self,
        events: impl IntoIterator<Item = Event<'a>, IntoIter = It>,
    ) where
        It: Iterator<Item = Event<'a>>,
    {
        let it: It = events.into_iter();
        push_html(&mut self.inner, it);
    }

    /// Append already safe HTML, such as a download link we built.
    pub fn push_raw(&mut self, html: &str) {
        self.inner.push_str(html);
    }
}

impl From<Html> for String {
    fn from(html: Html) -> Self {
        html.inner
    }
}

impl AsRef<str> for Html {
    fn as_ref(&self) -> &str {
        self.deref()
    }
}

impl std::borrow::Borrow<str> for Html {
    fn borrow(&self) -> &str {
        self.as_ref()
    }
}

impl std::ops::Deref for Html {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<'a> FromIterator<Event<'a>> for Html {
    fn from_iter<T: IntoIterator<Item = Event<'a>>>(iter: T) -> Self {
        let mut html = Html {
            inner: String::new(),
        };
        html.extend(iter);
        html
    }
}

/// Color used when a generated one can't be trusted in CSS.
pub const FALLBACK_COLOR: &str = "#FFFFFF";

/// `color` if it is plausible CSS color syntax (hex, a name or a functional
/// notation such as `rgb(…)`), otherwise [`FALLBACK_COLOR`].
pub fn safe_color(color: &str) -> &str {
    let color = color.trim();
    let plausible = !color.is_empty()
        && color.len() <= 64
        && color
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "#(),.% -".contains(c));
    if plausible {
        color
    } else {
        #[cfg(feature = "log")]
        log::warn!("Ignoring unsafe color {:?}", color);
        FALLBACK_COLOR
    }
}

/// Self-contained page with `body` on a `background` colored page.
pub fn page(title: &str, background: &str, body: &Html) -> Html {
    Html {
        inner: format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{}</title>
<style>
body {{
    background-color: {};
    font-family: sans-serif;
    max-width: 48rem;
    margin: 2rem auto;
    padding: 0 1rem;
}}
</style>
</head>
<body>
{}</body>
</html>
"#,
            escape_str_pcdata(title),
            safe_color(background),
            body.as_ref(),
        ),
    }
}
