use std::fs::OpenOptions;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::Result;
use crate::tracker::NotificationEvent;

#[cfg(windows)]
const CONTROLLING_TERMINAL: &str = "CONOUT$";
#[cfg(not(windows))]
const CONTROLLING_TERMINAL: &str = "/dev/tty";

const BELL: &[u8] = b"\x07";
const ERROR_BELLS: usize = 3;
const BELL_GAP: Duration = Duration::from_millis(150);

enum Device {
    /// Opened for every cue; must be a terminal.
    Terminal(PathBuf),
    Writer(Box<dyn Write + Send>),
}

/// Rings the terminal bell: once when the site comes back, three times when
/// it goes away.
///
/// The bell goes to the controlling terminal, never to stdout, so it cannot
/// end up in redirected console output.
pub struct SoundNotifier {
    device: Device,
}

impl SoundNotifier {
    pub fn new() -> Self {
        Self::with_terminal(CONTROLLING_TERMINAL)
    }

    /// Rings the terminal at `path`. A cue fails if `path` cannot be opened
    /// or is not a terminal.
    pub fn with_terminal(path: impl Into<PathBuf>) -> Self {
        Self {
            device: Device::Terminal(path.into()),
        }
    }

    /// Writes the bells to `device` as is.
    pub fn with_device(device: impl Write + Send + 'static) -> Self {
        Self {
            device: Device::Writer(Box::new(device)),
        }
    }

    pub(crate) async fn send(&mut self, event: &NotificationEvent) -> Result<()> {
        let rings = match event {
            NotificationEvent::Success => 1,
            NotificationEvent::Error(_) => ERROR_BELLS,
        };

        match &mut self.device {
            Device::Terminal(path) => {
                let mut terminal = open_terminal(path)?;
                ring(&mut terminal, rings).await
            }
            Device::Writer(device) => ring(device, rings).await,
        }
    }
}

impl Default for SoundNotifier {
    fn default() -> Self {
        Self::new()
    }
}

fn open_terminal(path: &Path) -> Result<std::fs::File> {
    let file = OpenOptions::new().write(true).open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("no terminal to ring at {}: {e}", path.display()))
    })?;
    if !file.is_terminal() {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{} is not a terminal, the bell cannot be heard", path.display()),
        )
        .into());
    }
    Ok(file)
}

async fn ring<W: Write + Send + ?Sized>(device: &mut W, rings: usize) -> Result<()> {
    for ring in 0..rings {
        if ring > 0 {
            sleep(BELL_GAP).await;
        }
        device.write_all(BELL)?;
        device.flush()?;
    }
    Ok(())
}
