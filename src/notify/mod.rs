//! Notification channels.
//!
//! Every channel answers the same two calls, `success` and `error`. Channel
//! failures are logged here and never reach the poll loop.

mod console;
mod email;
mod sound;

pub use console::ConsoleNotifier;
pub use email::EmailNotifier;
pub use sound::SoundNotifier;

use log::{error, info};
use url::Url;

use crate::config::Config;
use crate::error::Result;
use crate::tracker::NotificationEvent;

pub enum Notifier {
    Console(ConsoleNotifier),
    Sound(SoundNotifier),
    Email(EmailNotifier),
    /// Forwards every call to each child, in order.
    Broadcast(Vec<Notifier>),
}

impl Notifier {
    /// Builds the notifier the configuration asks for.
    ///
    /// Returns `None` when every channel is disabled, and the bare channel
    /// when only one is enabled.
    ///
    /// # Errors
    ///
    /// Fails if the email channel is enabled with unusable addresses.
    pub fn from_config(config: &Config, website_url: &Url) -> Result<Option<Self>> {
        let mut notifiers = Vec::new();

        if config.message_enabled {
            notifiers.push(Notifier::Console(ConsoleNotifier::new(website_url.clone())));
        }
        if config.sound_enabled {
            notifiers.push(Notifier::Sound(SoundNotifier::new()));
        }
        if let Some(email) = &config.email {
            notifiers.push(Notifier::Email(EmailNotifier::new(
                website_url.clone(),
                email.clone(),
            )?));
        }

        let notifier = match notifiers.len() {
            0 => None,
            1 => notifiers.pop(),
            _ => Some(Notifier::Broadcast(notifiers)),
        };
        match &notifier {
            Some(n) => info!("Notifying through: {}", n.describe()),
            None => info!("Every notification channel is disabled"),
        }
        Ok(notifier)
    }

    pub async fn success(&mut self) {
        self.notify(&NotificationEvent::Success).await;
    }

    pub async fn error(&mut self, reason: Option<&str>) {
        self.notify(&NotificationEvent::Error(reason.map(str::to_string)))
            .await;
    }

    /// Delivers `event` on every channel. A failing channel is logged and
    /// does not stop the ones after it.
    pub async fn notify(&mut self, event: &NotificationEvent) {
        if let Notifier::Broadcast(children) = self {
            for child in children {
                Box::pin(child.notify(event)).await;
            }
            return;
        }

        if let Err(e) = self.send(event).await {
            error!("The {} notification failed: {e}", self.name());
        }
    }

    async fn send(&mut self, event: &NotificationEvent) -> Result<()> {
        match self {
            Notifier::Console(console) => console.send(event),
            Notifier::Sound(sound) => sound.send(event).await,
            Notifier::Email(email) => email.send(event).await,
            Notifier::Broadcast(_) => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Notifier::Console(_) => "console",
            Notifier::Sound(_) => "sound",
            Notifier::Email(_) => "email",
            Notifier::Broadcast(_) => "broadcast",
        }
    }

    fn describe(&self) -> String {
        match self {
            Notifier::Broadcast(children) => children
                .iter()
                .map(Notifier::describe)
                .collect::<Vec<_>>()
                .join(", "),
            other => other.name().to_string(),
        }
    }
}

/// Human readable line for `event`, shared by the console and the email body.
pub(crate) fn describe_event(website_url: &Url, event: &NotificationEvent) -> String {
    match event {
        NotificationEvent::Success => format!("The website {website_url} is online!"),
        NotificationEvent::Error(Some(reason)) => {
            format!("The website {website_url} is offline: {reason}")
        }
        NotificationEvent::Error(None) => format!("The website {website_url} is offline."),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Writer that collects everything into a shared buffer.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Writer standing in for a missing audio device.
    pub(crate) struct BrokenDevice;

    impl Write for BrokenDevice {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::NotConnected, "no audio device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::NotConnected, "no audio device"))
        }
    }

    fn url() -> Url {
        Url::parse("https://icp.example.test/icpplus/index.html").unwrap()
    }

    fn config(message: bool, sound: bool) -> Config {
        Config {
            connect_timeout: Duration::from_secs(5),
            read_timeout: None,
            poll_interval: Duration::from_secs(5),
            sound_enabled: sound,
            message_enabled: message,
            email: None,
            verbose: false,
            debug: false,
        }
    }

    #[test]
    fn test_describe_event() {
        assert_eq!(
            describe_event(&url(), &NotificationEvent::Success),
            "The website https://icp.example.test/icpplus/index.html is online!"
        );
        assert_eq!(
            describe_event(
                &url(),
                &NotificationEvent::Error(Some("The website returned the HTTP code 503.".into()))
            ),
            "The website https://icp.example.test/icpplus/index.html is offline: The website returned the HTTP code 503."
        );
        assert_eq!(
            describe_event(&url(), &NotificationEvent::Error(None)),
            "The website https://icp.example.test/icpplus/index.html is offline."
        );
    }

    #[test]
    fn test_no_channel_means_no_notifier() {
        let notifier = Notifier::from_config(&config(false, false), &url()).unwrap();
        assert!(notifier.is_none());
    }

    #[test]
    fn test_single_channel_is_not_wrapped() {
        let notifier = Notifier::from_config(&config(true, false), &url())
            .unwrap()
            .unwrap();
        assert!(matches!(notifier, Notifier::Console(_)));
    }

    #[test]
    fn test_several_channels_are_broadcast_in_order() {
        let notifier = Notifier::from_config(&config(true, true), &url())
            .unwrap()
            .unwrap();
        match notifier {
            Notifier::Broadcast(children) => {
                let names: Vec<_> = children.iter().map(Notifier::name).collect();
                assert_eq!(names, vec!["console", "sound"]);
            }
            other => panic!("Expected a broadcast, got {}", other.name()),
        }
    }

    #[tokio::test]
    async fn test_broken_sound_does_not_silence_console() {
        let buffer = SharedBuffer::default();
        let mut notifier = Notifier::Broadcast(vec![
            Notifier::Console(ConsoleNotifier::with_writer(url(), buffer.clone())),
            Notifier::Sound(SoundNotifier::with_device(BrokenDevice)),
        ]);

        notifier.error(Some("The request timed out (5.00s).")).await;

        assert_eq!(
            buffer.contents(),
            "The website https://icp.example.test/icpplus/index.html is offline: The request timed out (5.00s).\n"
        );
    }

    #[tokio::test]
    async fn test_missing_terminal_leaves_console_output_clean() {
        let buffer = SharedBuffer::default();
        let mut notifier = Notifier::Broadcast(vec![
            Notifier::Console(ConsoleNotifier::with_writer(url(), buffer.clone())),
            Notifier::Sound(SoundNotifier::with_terminal("/nonexistent/tty")),
        ]);

        notifier.success().await;

        assert_eq!(
            buffer.contents(),
            "The website https://icp.example.test/icpplus/index.html is online!\n"
        );
    }

    #[tokio::test]
    async fn test_failing_child_does_not_stop_later_children() {
        let buffer = SharedBuffer::default();
        let mut notifier = Notifier::Broadcast(vec![
            Notifier::Sound(SoundNotifier::with_device(BrokenDevice)),
            Notifier::Console(ConsoleNotifier::with_writer(url(), buffer.clone())),
        ]);

        notifier.success().await;

        assert_eq!(
            buffer.contents(),
            "The website https://icp.example.test/icpplus/index.html is online!\n"
        );
    }

    #[tokio::test]
    async fn test_nested_broadcast_reaches_every_leaf() {
        let first = SharedBuffer::default();
        let second = SharedBuffer::default();
        let mut notifier = Notifier::Broadcast(vec![
            Notifier::Console(ConsoleNotifier::with_writer(url(), first.clone())),
            Notifier::Broadcast(vec![Notifier::Console(ConsoleNotifier::with_writer(
                url(),
                second.clone(),
            ))]),
        ]);

        notifier.success().await;

        assert_eq!(first.contents(), second.contents());
        assert!(!first.contents().is_empty());
    }
}
