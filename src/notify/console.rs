use std::io::{self, Write};
use url::Url;

use super::describe_event;
use crate::error::Result;
use crate::tracker::NotificationEvent;

/// Prints one line per notification, to stdout unless told otherwise.
pub struct ConsoleNotifier {
    website_url: Url,
    out: Box<dyn Write + Send>,
}

impl ConsoleNotifier {
    pub fn new(website_url: Url) -> Self {
        Self::with_writer(website_url, io::stdout())
    }

    pub fn with_writer(website_url: Url, out: impl Write + Send + 'static) -> Self {
        Self {
            website_url,
            out: Box::new(out),
        }
    }

    pub(crate) fn send(&mut self, event: &NotificationEvent) -> Result<()> {
        writeln!(self.out, "{}", describe_event(&self.website_url, event))?;
        self.out.flush()?;
        Ok(())
    }
}
