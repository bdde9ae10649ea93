use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

pub mod memory;
pub use memory::MemoryPlayer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerEvent {
    VolumeChanged,
    Paused,
    Unpaused,
    Seeked,
    SongStarted,
    /// repeat, shuffle or single changed
    OptionsChanged,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackOptions {
    pub repeat: bool,
    pub shuffle: bool,
    pub single: bool,
}

/// The host application. Subscriber callbacks must not call back into the
/// player.
pub trait Player {
    fn info(&self) -> Option<Rc<Track>>;

    fn paused(&self) -> bool;

    fn set_paused(&self, paused: bool);

    fn play_pause(&self);

    fn stop(&self);

    fn next(&self);

    fn previous(&self);

    fn position(&self) -> Duration;

    fn seek(&self, position: Duration);

    /// Linear volume in `0.0..=1.0`.
    fn volume(&self) -> f64;

    fn set_volume(&self, volume: f64);

    fn options(&self) -> PlaybackOptions;

    fn set_repeat(&self, repeat: bool);

    fn set_shuffle(&self, shuffle: bool);

    fn set_single(&self, single: bool);

    fn subscribe(&self, callback: Box<dyn Fn(PlayerEvent)>) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Track {
    pub filename: String,
    pub length: Duration,
    pub sample_rate: u32,
    pub bit_depth: u32,
    pub channels: u32,
    /// kbit/s
    pub bitrate: u32,
    tags: BTreeMap<String, Vec<String>>,
}

impl Track {
    pub fn new(filename: impl ToString) -> Track {
        Track {
            filename: filename.to_string(),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, key: impl ToString, value: impl ToString) -> Track {
        self.tags
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    pub fn with_length(mut self, length: Duration) -> Track {
        self.length = length;
        self
    }

    pub fn with_format(mut self, sample_rate: u32, bit_depth: u32, channels: u32) -> Track {
        self.sample_rate = sample_rate;
        self.bit_depth = bit_depth;
        self.channels = channels;
        self
    }

    pub fn with_bitrate(mut self, bitrate: u32) -> Track {
        self.bitrate = bitrate;
        self
    }

    /// All values of `key` joined with `", "`, `None` if unset or empty.
    pub fn tag(&self, key: &str) -> Option<String> {
        let values = self.tags.get(key)?;
        let joined = values.join(", ");
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }

    pub fn year(&self) -> Option<String> {
        let date = self.tags.get("date")?.first()?;
        let year: String = date.chars().take_while(|c| c.is_ascii_digit()).collect();
        if year.is_empty() {
            None
        } else {
            Some(year)
        }
    }

    pub fn basename(&self) -> Option<String> {
        Path::new(&self.filename)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}
