use std::cell::RefCell;
use std::rc::Rc;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::sync::Notify;

/// Outgoing bytes of one connection plus its write interest.
#[derive(Clone, Debug, Default)]
pub struct Outbox {
    inner: Rc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    buffer: RefCell<BytesMut>,
    writable: Notify,
}

impl Outbox {
    pub fn new() -> Outbox {
        Outbox::default()
    }

    pub fn write_line(&self, line: &str) {
        let mut buffer = self.inner.buffer.borrow_mut();
        buffer.put_slice(line.as_bytes());
        buffer.put_u8(b'\n');
    }

    pub fn start_write(&self) {
        self.inner.writable.notify_one();
    }

    pub async fn wait_writable(&self) {
        self.inner.writable.notified().await
    }

    pub fn take(&self) -> Bytes {
        self.inner.buffer.borrow_mut().split().freeze()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.buffer.borrow().is_empty()
    }

    pub fn discard(&self) {
        self.inner.buffer.borrow_mut().clear();
    }

    pub fn ptr_eq(&self, other: &Outbox) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ts_on_shared_buffer() {
        let outbox = Outbox::new();
        let other = outbox.clone();
        assert!(outbox.ptr_eq(&other));

        outbox.write_line("OK MPD 0.17.0");
        other.write_line("changed: player");
        assert_eq!(&outbox.take()[..], b"OK MPD 0.17.0\nchanged: player\n");
        assert!(other.is_empty());

        other.write_line("OK");
        outbox.discard();
        assert!(outbox.is_empty());
    }

    #[tokio::test]
    async fn ts_on_start_write_before_wait() {
        let outbox = Outbox::new();
        outbox.start_write();
        // the stored permit wakes the waiter immediately
        outbox.wait_writable().await;
    }
}
