//! Console logging for gatehouse binaries.
//!
//! Each line is a level icon, a `MM.DD HH:MM:SS` local timestamp and the
//! message, with the message coloured by level:
//!
//! ```text
//! ℹ 10.18 14:02:11: Bot is ready
//! ⚠ 10.18 14:02:15: Invite recorded but role grant failed, reconcile manually
//! ```

use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const RESET: &str = "\x1b[0m";
const GREEN: &str = "\x1b[92m";
const GREEN_BOLD: &str = "\x1b[92m\x1b[1m";
const GREY: &str = "\x1b[37m";

/// Icon shown in front of each line.
pub fn level_icon(level: &Level) -> &'static str {
    match *level {
        Level::TRACE | Level::DEBUG => "-",
        Level::INFO => "ℹ",
        Level::WARN => "!",
        Level::ERROR => "⚠",
    }
}

/// ANSI colour for the message body.
pub fn level_color(level: &Level) -> &'static str {
    match *level {
        Level::TRACE | Level::DEBUG => "\x1b[94m",
        Level::INFO => "\x1b[97m",
        Level::WARN => "\x1b[93m",
        Level::ERROR => "\x1b[91m",
    }
}

/// Event formatter producing the console layout above.
#[derive(Debug, Clone)]
pub struct ConsoleFormat {
    ansi: bool,
}

impl ConsoleFormat {
    pub fn new(ansi: bool) -> Self {
        Self { ansi }
    }
}

impl Default for ConsoleFormat {
    fn default() -> Self {
        Self::new(true)
    }
}

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = event.metadata().level();
        let now = chrono::Local::now().format("%m.%d %H:%M:%S");

        if self.ansi {
            write!(
                writer,
                "{GREEN_BOLD}{}{RESET}{GREEN} {}{GREY}: {}",
                level_icon(level),
                now,
                level_color(level)
            )?;
        } else {
            write!(writer, "{} {}: ", level_icon(level), now)?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        if self.ansi {
            write!(writer, "{RESET}")?;
        }
        writeln!(writer)
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().event_format(ConsoleFormat::default()))
        .try_init();
}
