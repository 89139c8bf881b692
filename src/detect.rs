use log::debug;
use scraper::{Html, Selector};
use std::mem::discriminant;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::fetch::PollResult;

/// The booking form only renders this dropdown when appointments can be
/// requested.
const DROPDOWN_SELECTOR: &str = r#"select[id="form"][name="form"]"#;

pub const DROPDOWN_MISSING: &str = "The dropdown-button could not be found.";
pub const EMPTY_BODY: &str = "The page could not be parsed: the response body is empty.";

/// Classification of the watched page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AvailabilityState {
    /// No poll has completed yet.
    #[default]
    Unknown,
    Available,
    Unavailable(String),
}

impl AvailabilityState {
    /// Whether both states are the same variant, ignoring the reason text.
    pub fn same_kind(&self, other: &Self) -> bool {
        discriminant(self) == discriminant(other)
    }
}

/// Classifies polls. Holds the dropdown selector so it is built once per run.
#[derive(Debug)]
pub struct Detector {
    dropdown: Selector,
}

impl Detector {
    /// # Errors
    ///
    /// Fails if the dropdown selector does not compile.
    pub fn new() -> Result<Self> {
        let dropdown =
            Selector::parse(DROPDOWN_SELECTOR).map_err(|e| Error::Selector(e.to_string()))?;
        Ok(Self { dropdown })
    }

    /// Classifies a poll. `elapsed` is how long the request took and only
    /// shows up in the timeout reason.
    pub fn classify(&self, result: &PollResult, elapsed: Duration) -> AvailabilityState {
        match result {
            PollResult::Timeout => AvailabilityState::Unavailable(format!(
                "The request timed out ({:.2}s).",
                elapsed.as_secs_f64()
            )),
            PollResult::HttpError(status) => AvailabilityState::Unavailable(format!(
                "The website returned the HTTP code {status}."
            )),
            PollResult::Success(body) => self.detect(body),
        }
    }

    /// Looks for the appointment dropdown in a 2xx body.
    ///
    /// html5ever recovers from any malformed markup, so the only body that
    /// cannot be parsed into a page is one with no markup at all.
    pub fn detect(&self, body: &str) -> AvailabilityState {
        if body.trim().is_empty() {
            return AvailabilityState::Unavailable(EMPTY_BODY.to_string());
        }

        let document = Html::parse_document(body);
        if !document.errors.is_empty() {
            debug!("Parsed page with {} markup errors", document.errors.len());
        }

        if document.select(&self.dropdown).next().is_some() {
            AvailabilityState::Available
        } else {
            AvailabilityState::Unavailable(DROPDOWN_MISSING.to_string())
        }
    }
}
