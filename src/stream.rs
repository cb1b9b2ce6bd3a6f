//! [`Event`] [`Stream`] for streaming predictions from Replicate as well as
//! associated types and errors only used when streaming.
use futures::{future, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::{future::Future, pin::Pin, task::Poll};

use crate::client::ReplicateError;

/// Successful server-sent event from a prediction stream. See
/// [`stream::Error`] for errors.
///
/// [`stream::Error`]: Error
#[derive(Debug, Clone, PartialEq, derive_more::IsVariant)]
pub enum Event {
    /// A fragment of generated text, in order.
    Output {
        /// The text content.
        text: String,
    },
    /// The prediction finished. Nothing follows this event.
    Done {
        /// Why it finished early, such as `canceled`. [`None`] on success.
        reason: Option<String>,
    },
}

/// Payload of a `done` event.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DonePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Stream error. This can be transport errors, JSON parsing errors or errors
/// reported by the prediction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// [`eventsource_stream::EventStreamError`] wrapping a [`reqwest::Error`].
    #[error("HTTP error: {error}")]
    Stream {
        #[from]
        /// Error from the `eventsource_stream` crate.
        error: eventsource_stream::EventStreamError<reqwest::Error>,
    },
    /// JSON parsing error in a control event.
    #[error("JSON error: {error}")]
    Parse {
        /// Error from [`serde_json`].
        error: serde_json::Error,
        /// [`eventsource_stream::Event`] that did not parse.
        event: eventsource_stream::Event,
    },
    /// The prediction failed.
    #[error("Prediction error: {error}")]
    Replicate {
        /// Error from the prediction.
        error: ReplicateError,
        /// [`eventsource_stream::Event`] containing the error.
        event: eventsource_stream::Event,
    },
    /// The prediction ended early, so the text is incomplete.
    #[error("Prediction ended early: {reason}")]
    Ended {
        /// Reason from the `done` event, such as `canceled`.
        reason: String,
    },
}

/// Stream of [`Event`]s or [`Error`]s.
pub struct Stream {
    inner: Pin<
        Box<dyn futures::Stream<Item = Result<Event, Error>> + Send + 'static>,
    >,
}

static_assertions::assert_impl_all!(Stream: futures::Stream, Send);

/// Map one raw event. [`None`] for event names we don't know.
fn decode(event: eventsource_stream::Event) -> Option<Result<Event, Error>> {
    #[cfg(feature = "log")]
    log::trace!("Event: {:?}", event);

    match event.event.as_str() {
        "output" => Some(Ok(Event::Output { text: event.data })),
        "done" => {
            if event.data.trim().is_empty() {
                return Some(Ok(Event::Done { reason: None }));
            }
            match serde_json::from_str::<DonePayload>(&event.data) {
                Ok(DonePayload { reason }) => {
                    // Replicate sends an empty reason on success.
                    let reason = reason.filter(|r| !r.is_empty());
                    Some(Ok(Event::Done { reason }))
                }
                Err(error) => Some(Err(Error::Parse { error, event })),
            }
        }
        "error" => {
            let error = serde_json::from_str::<ReplicateError>(&event.data)
                .unwrap_or_else(|_| ReplicateError {
                    title: None,
                    detail: event.data.clone(),
                    status: None,
                });
            Some(Err(Error::Replicate { error, event }))
        }
        _other => {
            #[cfg(feature = "log")]
            log::debug!("Skipping unknown event `{}`", _other);
            None
        }
    }
}

impl Stream {
    /// Create a new stream from an [`eventsource_stream::EventStream`] or
    /// similar stream of [`eventsource_stream::Event`]s.
    pub fn new<S>(stream: S) -> Self
    where
        S: futures::Stream<
                Item = Result<
                    eventsource_stream::Event,
                    eventsource_stream::EventStreamError<reqwest::Error>,
                >,
            > + Send
            + 'static,
    {
        Self {
            inner: Box::pin(stream.filter_map(|event| {
                future::ready(match event {
                    Ok(event) => decode(event),
                    Err(error) => {
                        #[cfg(feature = "log")]
                        log::error!("Stream error: {:?}", error);
                        Some(Err(Error::Stream { error }))
                    }
                })
            })),
        }
    }
}

impl futures::Stream for Stream {
    type Item = Result<Event, Error>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context,
    ) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Extension trait for [`Event`] [`Stream`]s to get at the generated text.
pub trait FilterExt:
    futures::stream::Stream<Item = Result<Event, Error>> + Sized
{
    /// Output fragments, in order, ending at [`Event::Done`]. Errors are
    /// passed through. A `done` with a reason yields [`Error::Ended`].
    fn text(self) -> impl futures::Stream<Item = Result<String, Error>> {
        self.try_take_while(|event| {
            future::ready(match event {
                Event::Done {
                    reason: Some(reason),
                } => Err(Error::Ended {
                    reason: reason.clone(),
                }),
                Event::Done { reason: None } => Ok(false),
                Event::Output { .. } => Ok(true),
            })
        })
        .try_filter_map(|event| {
            future::ready(Ok(match event {
                Event::Output { text } => Some(text),
                Event::Done { .. } => None,
            }))
        })
    }

    /// Concatenate every output fragment into one string. The first error
    /// aborts collection.
    fn collect_text(self) -> impl Future<Output = Result<String, Error>> {
        self.text().try_fold(String::new(), |mut text, piece| {
            text.push_str(&piece);
            future::ready(Ok(text))
        })
    }
}

impl<S> FilterExt for S where S: futures::Stream<Item = Result<Event, Error>> {}
