//! Tracing setup for the `node-build` binary
//!
//! The filter comes from `NODE_BUILD_LOG` (same syntax as `RUST_LOG`) and
//! defaults to info for this crate. Events always go to stderr, so stdout
//! stays reserved for command results; a log file gets a copy of them.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, prelude::*};

use crate::config::LOG_FILTER_ENV;

const DEFAULT_FILTER: &str = "node_build=info";
const DEFAULT_LOG_FILE: &str = "node-build.log";

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Emit one JSON object per event
    pub json: bool,
    /// Also append events to this file
    pub file: Option<PathBuf>,
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// until the process exits. Calling this twice leaves the first subscriber in place.
pub fn init(options: &LogOptions) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let (layers, guard) = layers(options);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layers)
        .try_init();

    guard
}

/// stderr layer, plus a non-blocking file layer when a log file is set
fn layers<S>(options: &LogOptions) -> (Vec<BoxedLayer<S>>, Option<WorkerGuard>)
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let mut layers = vec![fmt_layer(
        options.json,
        true,
        BoxMakeWriter::new(std::io::stderr),
    )];

    let guard = options.file.as_deref().map(|path| {
        let (dir, name) = split_log_path(path);
        let appender = tracing_appender::rolling::never(dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(fmt_layer(options.json, false, BoxMakeWriter::new(writer)));
        guard
    });

    (layers, guard)
}

fn fmt_layer<S>(json: bool, ansi: bool, writer: BoxMakeWriter) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed()
    }
}

/// Directory and file name for the appender; bare names land in the working directory
fn split_log_path(path: &Path) -> (PathBuf, OsString) {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = path
        .file_name()
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| OsString::from(DEFAULT_LOG_FILE));
    (dir, name)
}
