use tokio::sync::broadcast;

// listeners also wake once every clone is dropped
#[derive(Clone, Debug)]
pub struct Trigger {
    notify: broadcast::Sender<()>,
}

impl Trigger {
    pub fn new() -> Trigger {
        let (notify, _) = broadcast::channel(1);
        Trigger { notify }
    }

    pub fn listen(&self) -> Shutdown {
        Shutdown {
            shutdown: false,
            notify: self.notify.subscribe(),
        }
    }

    pub fn fire(&self) {
        // no listeners left just means nothing is running
        let _ = self.notify.send(());
    }
}

impl Default for Trigger {
    fn default() -> Trigger {
        Trigger::new()
    }
}

#[derive(Debug)]
pub struct Shutdown {
    shutdown: bool,
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Waits for the stop signal. Returns immediately once it was seen.
    pub async fn recv(&mut self) {
        if self.shutdown {
            return;
        }

        // either the stop message or `Closed` once every trigger is gone
        let _ = self.notify.recv().await;

        self.shutdown = true;
    }
}
