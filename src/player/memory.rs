use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{PlaybackOptions, Player, PlayerEvent, SubscriptionId, Track};

/// A player without audio output that walks through a fixed queue.
///
/// Used by the bundled binary and by the tests as the host application.
pub struct MemoryPlayer {
    state: RefCell<State>,
    subscribers: RefCell<Vec<(SubscriptionId, Box<dyn Fn(PlayerEvent)>)>>,
    next_subscription: Cell<u64>,
}

struct State {
    queue: Vec<Rc<Track>>,
    current: Option<usize>,
    paused: bool,
    // position at `resumed_at`, or the frozen position while paused
    position: Duration,
    resumed_at: Option<Instant>,
    volume: f64,
    options: PlaybackOptions,
}

impl State {
    fn position(&self) -> Duration {
        match self.resumed_at {
            Some(at) => self.position.saturating_add(at.elapsed()),
            None => self.position,
        }
    }

    fn freeze(&mut self) {
        self.position = self.position();
        self.resumed_at = None;
    }

    fn load(&mut self, index: Option<usize>) {
        self.current = index;
        self.position = Duration::ZERO;
        self.resumed_at = match (index, self.paused) {
            (Some(_), false) => Some(Instant::now()),
            _ => None,
        };
    }
}

impl MemoryPlayer {
    pub fn new(tracks: Vec<Track>) -> MemoryPlayer {
        MemoryPlayer {
            state: RefCell::new(State {
                queue: tracks.into_iter().map(Rc::new).collect(),
                current: None,
                paused: true,
                position: Duration::ZERO,
                resumed_at: None,
                volume: 1.0,
                options: PlaybackOptions::default(),
            }),
            subscribers: RefCell::new(vec![]),
            next_subscription: Cell::new(0),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    fn emit(&self, event: PlayerEvent) {
        debug!("player event {:?}", event);
        for (_, callback) in self.subscribers.borrow().iter() {
            callback(event);
        }
    }

    fn step(&self, forward: bool) {
        {
            let mut state = self.state.borrow_mut();
            let len = state.queue.len();
            let index = match state.current {
                _ if len == 0 => None,
                None => Some(0),
                Some(i) if forward => {
                    if i + 1 < len {
                        Some(i + 1)
                    } else if state.options.repeat {
                        Some(0)
                    } else {
                        None
                    }
                }
                Some(i) => Some(i.saturating_sub(1)),
            };
            state.load(index);
        }
        self.emit(PlayerEvent::SongStarted);
    }
}

impl Player for MemoryPlayer {
    fn info(&self) -> Option<Rc<Track>> {
        let state = self.state.borrow();
        state.current.map(|i| Rc::clone(&state.queue[i]))
    }

    fn paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn set_paused(&self, paused: bool) {
        {
            let mut state = self.state.borrow_mut();
            if state.paused == paused {
                return;
            }
            state.paused = paused;
            if paused {
                state.freeze();
            } else if state.current.is_some() {
                state.resumed_at = Some(Instant::now());
            }
        }

        self.emit(if paused {
            PlayerEvent::Paused
        } else {
            PlayerEvent::Unpaused
        });
    }

    fn play_pause(&self) {
        let (loaded, empty, paused) = {
            let state = self.state.borrow();
            (
                state.current.is_some(),
                state.queue.is_empty(),
                state.paused,
            )
        };

        if loaded {
            self.set_paused(!paused);
        } else if !empty {
            self.state.borrow_mut().paused = false;
            self.step(true);
            self.emit(PlayerEvent::Unpaused);
        }
    }

    fn stop(&self) {
        let was_loaded = {
            let mut state = self.state.borrow_mut();
            let was_loaded = state.current.is_some();
            state.paused = true;
            state.load(None);
            was_loaded
        };

        if was_loaded {
            self.emit(PlayerEvent::Paused);
            self.emit(PlayerEvent::SongStarted);
        }
    }

    fn next(&self) {
        self.step(true);
    }

    fn previous(&self) {
        self.step(false);
    }

    fn position(&self) -> Duration {
        self.state.borrow().position()
    }

    fn seek(&self, position: Duration) {
        {
            let mut state = self.state.borrow_mut();
            if state.current.is_none() {
                return;
            }
            state.position = position;
            if state.resumed_at.is_some() {
                state.resumed_at = Some(Instant::now());
            }
        }
        self.emit(PlayerEvent::Seeked);
    }

    fn volume(&self) -> f64 {
        self.state.borrow().volume
    }

    fn set_volume(&self, volume: f64) {
        self.state.borrow_mut().volume = volume.clamp(0.0, 1.0);
        self.emit(PlayerEvent::VolumeChanged);
    }

    fn options(&self) -> PlaybackOptions {
        self.state.borrow().options
    }

    fn set_repeat(&self, repeat: bool) {
        self.state.borrow_mut().options.repeat = repeat;
        self.emit(PlayerEvent::OptionsChanged);
    }

    fn set_shuffle(&self, shuffle: bool) {
        self.state.borrow_mut().options.shuffle = shuffle;
        self.emit(PlayerEvent::OptionsChanged);
    }

    fn set_single(&self, single: bool) {
        self.state.borrow_mut().options.single = single;
        self.emit(PlayerEvent::OptionsChanged);
    }

    fn subscribe(&self, callback: Box<dyn Fn(PlayerEvent)>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.subscribers.borrow_mut().push((id, callback));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.borrow_mut().retain(|(sub, _)| *sub != id);
    }
}
