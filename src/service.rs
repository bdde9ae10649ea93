use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tracing::{debug, info};

use crate::connection::ConnectionId;
use crate::outbox::Outbox;
use crate::permission::Permission;
use crate::player::{Player, PlayerEvent, SubscriptionId, Track};
use crate::tags::format_tags;

pub const PROTOCOL_VERSION: (u32, u32, u32) = (0, 17, 0);

pub type Pairs = Vec<(&'static str, String)>;

pub struct Service {
    player: Rc<dyn Player>,
    password: Option<String>,
    default_permission: Permission,
    connections: HashMap<ConnectionId, Outbox>,
    // empty set means "everything"
    idle_subscriptions: HashMap<ConnectionId, BTreeSet<String>>,
    idle_queue: HashMap<ConnectionId, BTreeSet<String>>,
    playlist_version: u32,
    subscriptions: Vec<SubscriptionId>,
    // filled by the player callbacks, applied in `drain_events`
    events: mpsc::UnboundedReceiver<PlayerEvent>,
}

impl Service {
    /// Player callbacks only queue their event and poke `wake`, they never
    /// re-enter the service.
    pub fn new(player: Rc<dyn Player>, password: Option<String>, wake: Rc<Notify>) -> Service {
        info!("creating the MPD service");

        let default_permission = match password.as_deref() {
            None | Some("") => Permission::ALL,
            Some(_) => Permission::NONE,
        };

        let (tx, events) = mpsc::unbounded_channel();
        let id = player.subscribe(Box::new(move |event| {
            // the receiver lives as long as the subscription
            let _ = tx.send(event);
            wake.notify_one();
        }));

        Service {
            player,
            password,
            default_permission,
            connections: HashMap::new(),
            idle_subscriptions: HashMap::new(),
            idle_queue: HashMap::new(),
            playlist_version: 0,
            subscriptions: vec![id],
            events,
        }
    }

    pub fn destroy(mut self) {
        info!("destroying the MPD service");
        self.release();
    }

    fn release(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.player.unsubscribe(id);
        }
    }

    pub fn version(&self) -> String {
        let (major, minor, patch) = PROTOCOL_VERSION;
        format!("{}.{}.{}", major, minor, patch)
    }

    pub fn default_permission(&self) -> Permission {
        self.default_permission
    }

    pub fn password_matches(&self, password: &str) -> bool {
        self.password.as_deref().unwrap_or("") == password
    }

    pub fn playlist_version(&self) -> u32 {
        self.playlist_version
    }

    // ------------ connections & idle ------------

    pub fn add_connection(&mut self, id: ConnectionId, outbox: Outbox) {
        self.connections.insert(id, outbox);
        self.idle_queue.insert(id, BTreeSet::new());
    }

    pub fn remove_connection(&mut self, id: ConnectionId) {
        self.idle_subscriptions.remove(&id);
        self.idle_queue.remove(&id);
        self.connections.remove(&id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_idle(&self, id: ConnectionId) -> bool {
        self.idle_subscriptions.contains_key(&id)
    }

    pub fn register_idle(&mut self, id: ConnectionId, subsystems: &[String]) {
        debug_assert!(self.connections.contains_key(&id));

        self.idle_subscriptions
            .insert(id, subsystems.iter().cloned().collect());
        self.flush_idle();
    }

    pub fn unregister_idle(&mut self, id: ConnectionId) {
        self.idle_subscriptions.remove(&id);
    }

    pub fn emit_changed(&mut self, subsystem: &str) {
        debug!("changed: {}", subsystem);

        for queued in self.idle_queue.values_mut() {
            queued.insert(subsystem.to_string());
        }
        self.flush_idle();
    }

    /// Answers every idle request that has matching pending changes. Each
    /// answered connection has to issue `idle` again to get the next batch.
    pub fn flush_idle(&mut self) {
        let mut flushed = vec![];

        for (id, subscribed) in self.idle_subscriptions.iter() {
            let Some(queued) = self.idle_queue.get_mut(id) else {
                continue;
            };

            let to_send: Vec<String> = if subscribed.is_empty() {
                std::mem::take(queued).into_iter().collect()
            } else {
                let matched: Vec<String> = subscribed.intersection(queued).cloned().collect();
                for subsystem in &matched {
                    queued.remove(subsystem);
                }
                matched
            };

            if to_send.is_empty() {
                continue;
            }

            if let Some(outbox) = self.connections.get(id) {
                for subsystem in &to_send {
                    outbox.write_line(&format!("changed: {}", subsystem));
                }
                outbox.write_line("OK");
                outbox.start_write();
            }
            flushed.push(*id);
        }

        for id in flushed {
            self.idle_subscriptions.remove(&id);
        }
    }

    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::VolumeChanged => self.emit_changed("mixer"),
            PlayerEvent::Paused | PlayerEvent::Unpaused | PlayerEvent::Seeked => {
                self.emit_changed("player")
            }
            PlayerEvent::SongStarted => {
                self.playlist_version += 1;
                self.emit_changed("playlist");
            }
            PlayerEvent::OptionsChanged => self.emit_changed("options"),
        }
    }

    // ------------ playback ------------

    pub fn play(&self) {
        self.player.play_pause();
    }

    pub fn playid(&self, _songid: i64) {
        self.play();
    }

    pub fn pause(&self, value: Option<bool>) {
        let paused = value.unwrap_or_else(|| !self.player.paused());
        self.player.set_paused(paused);
    }

    pub fn stop(&self) {
        self.player.stop();
    }

    pub fn next(&self) {
        self.player.next();
    }

    pub fn previous(&self) {
        self.player.previous();
    }

    pub fn seek(&self, _songpos: i64, seconds: i64) {
        self.player.seek(seconds_to_duration(seconds as f64));
    }

    pub fn seekid(&self, _songid: i64, seconds: i64) {
        self.player.seek(seconds_to_duration(seconds as f64));
    }

    pub fn seekcur(&self, value: f64, relative: bool) {
        let target = if relative {
            self.player.position().as_secs_f64() + value
        } else {
            value
        };
        self.player.seek(seconds_to_duration(target));
    }

    pub fn setvol(&self, value: i64) {
        self.player.set_volume(value as f64 / 100.0);
    }

    pub fn repeat(&self, value: bool) {
        self.player.set_repeat(value);
    }

    pub fn random(&self, value: bool) {
        self.player.set_shuffle(value);
    }

    pub fn single(&self, value: bool) {
        self.player.set_single(value);
    }

    // ------------ queries ------------

    pub fn stats(&self) -> Pairs {
        let has_song = u8::from(self.player.info().is_some());
        vec![
            ("artists", has_song.to_string()),
            ("albums", has_song.to_string()),
            ("songs", has_song.to_string()),
            ("uptime", "1".to_string()),
            ("playtime", "1".to_string()),
            ("db_playtime", "1".to_string()),
            ("db_update", "1252868674".to_string()),
        ]
    }

    pub fn status(&self) -> Pairs {
        let player = &self.player;
        let info = player.info();
        let options = player.options();

        let state = match (&info, player.paused()) {
            (None, _) => "stop",
            (Some(_), true) => "pause",
            (Some(_), false) => "play",
        };

        let mut status = vec![
            ("volume", ((player.volume() * 100.0).round() as i64).to_string()),
            ("repeat", u8::from(options.repeat).to_string()),
            ("random", u8::from(options.shuffle).to_string()),
            ("single", u8::from(options.single).to_string()),
            ("consume", "0".to_string()),
            ("playlist", self.playlist_version.to_string()),
            ("playlistlength", u8::from(info.is_some()).to_string()),
            ("mixrampdb", "0.0".to_string()),
            ("state", state.to_string()),
        ];

        if let Some(track) = info {
            status.push((
                "audio",
                format!(
                    "{}:{}:{}",
                    track.sample_rate, track.bit_depth, track.channels
                ),
            ));
            status.push(("song", "0".to_string()));
            status.push(("songid", song_id(&track).to_string()));

            if state != "stop" {
                let position = player.position();
                status.push((
                    "time",
                    format!("{}:{}", position.as_secs(), track.length.as_secs()),
                ));
                status.push(("elapsed", format!("{:.3}", position.as_secs_f64())));
                status.push(("bitrate", track.bitrate.to_string()));
            }
        }

        status
    }

    // one entry playlist: the loaded track at position 0
    pub fn currentsong(&self) -> Option<Vec<String>> {
        let track = self.player.info()?;

        let mut lines = vec![format!("file: {}", track.filename)];
        lines.extend(format_tags(&track));
        lines.push(format!("Time: {}", track.length.as_secs()));
        lines.push("Pos: 0".to_string());
        lines.push(format!("Id: {}", song_id(&track)));

        Some(lines)
    }

    pub fn playlistinfo(&self, range: Option<(i64, i64)>) -> Option<Vec<String>> {
        match range {
            Some((start, _)) if start > 1 => None,
            _ => self.currentsong(),
        }
    }

    pub fn playlistid(&self, _songid: Option<i64>) -> Option<Vec<String>> {
        self.currentsong()
    }

    pub fn plchanges(&self, version: i64) -> Option<Vec<String>> {
        if version != i64::from(self.playlist_version) {
            self.currentsong()
        } else {
            None
        }
    }

    pub fn plchangesposid(&self, version: i64) -> Option<Vec<String>> {
        if version == i64::from(self.playlist_version) {
            return None;
        }

        let track = self.player.info()?;
        Some(vec![
            format!("file: {}", track.filename),
            "Pos: 0".to_string(),
            format!("Id: {}", song_id(&track)),
        ])
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.release();
    }
}

// tracks carry no id, the address of the shared allocation stands in
pub fn song_id(track: &Rc<Track>) -> u32 {
    ((Rc::as_ptr(track) as usize & 0xFFFF_FFFF) >> 1) as u32
}

fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds > 0.0 {
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}
