#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! `eureka` generates app ideas with a model hosted on [Replicate].
//!
//! A [`PromptRequest`] is sent through a [`Client`], the streamed output is
//! collected from a [`Stream`], parsed by [`idea`] and rendered by
//! [`render`]. The [`Generator`] ties these together, including the domain
//! lookup ([`whois`]), the document export ([`docx`]) and the persisted
//! theme ([`theme`]).
//!
//! [Replicate]: <https://replicate.com/docs/reference/http>

pub mod key;
pub use key::Key;

pub mod client;
pub use client::Client;

pub mod model;
pub use model::Model;

pub mod prompt;
pub use prompt::{PromptRequest, Variant};

pub mod stream;
pub use stream::Stream;

pub mod idea;
pub use idea::{AppIdea, Palette};

pub mod whois;

pub mod docx;

/// Markdown to HTML and the styled page.
pub mod html;

pub mod render;

pub mod theme;

pub mod config;
pub use config::Settings;

pub mod app;
pub use app::{Generator, Report};

/// Re-exports of commonly used crates to avoid version conflicts and reduce
/// dependency bloat.
pub mod exports {
    pub use base64;
    pub use eventsource_stream;
    pub use futures;
    #[cfg(feature = "log")]
    pub use log;
    pub use pulldown_cmark;
    pub use reqwest;
    pub use serde;
    pub use serde_json;
    pub use toml;
}
