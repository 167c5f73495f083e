// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level command runner, shared by `main` and tests.

use std::io::Write;

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Command, Config, LogFormat};
use crate::credential::flow::AuthPrompt;
use crate::dispatch::Dispatcher;
use crate::error::ApiError;
use crate::prefs::PrefsStore;
use crate::request::RequestDescriptor;
use crate::response::{render_request, render_response, ResponseView};

/// Install the global subscriber. Logs go to stderr; stdout is for responses.
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let result = match config.log_format {
        LogFormat::Json => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().try_init(),
        LogFormat::Text => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init(),
    };
    drop(result);
}

/// Run one CLI command, writing user-facing output to `out`.
///
/// `color` allows syntax highlighting of what goes to `out`.
pub async fn run<W: Write>(
    command: &Command,
    store: &dyn PrefsStore,
    prompt: &dyn AuthPrompt,
    out: &mut W,
    color: bool,
) -> Result<(), ApiError> {
    match command {
        Command::Use { api_url } => use_api(api_url, store, out),
        Command::Request(words) => send_request(words, store, prompt, out, color).await,
    }
}

fn use_api<W: Write>(api_url: &str, store: &dyn PrefsStore, out: &mut W) -> Result<(), ApiError> {
    let mut prefs = store.load()?;
    prefs.api_url = api_url.to_owned();
    let prefs = prefs.validate()?;
    store.save(&prefs)?;
    debug!(api_url = %prefs.api_url, path = %store.location().display(), "switched api");
    writeln!(out, "Now using {}", prefs.api_url).map_err(output_error)
}

async fn send_request<W: Write>(
    words: &[String],
    store: &dyn PrefsStore,
    prompt: &dyn AuthPrompt,
    out: &mut W,
    color: bool,
) -> Result<(), ApiError> {
    let prefs = store.load()?;
    let request = RequestDescriptor::from_args(words, &prefs)?;
    let mut dispatcher = Dispatcher::new(prefs, store, prompt)?;

    if dispatcher.prefs().verboseness.request {
        let shown = render_request(&request, dispatcher.session().headers(), dispatcher.prefs(), color);
        writeln!(out, "{shown}").map_err(output_error)?;
    }

    let response = dispatcher.dispatch(&request).await?;
    if let Some(e) = dispatcher.take_persist_error() {
        warn!(err = e.as_str(), "new access token was not saved");
        eprint!("{}", e.report());
    }

    let view = ResponseView::collect(response).await?;
    write!(out, "{}", render_response(&view, dispatcher.prefs(), color)).map_err(output_error)?;
    out.flush().map_err(output_error)
}

fn output_error(e: std::io::Error) -> ApiError {
    ApiError::Output { reason: e.to_string() }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
