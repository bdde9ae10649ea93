use bytes::{Buf, Bytes, BytesMut};

/// Callers drain `next_line` after every `feed`.
#[derive(Debug)]
pub struct LineBuffer {
    buffer: BytesMut,
}

impl LineBuffer {
    pub fn new() -> LineBuffer {
        LineBuffer {
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    // the buffer is untouched when no newline arrived yet
    pub fn next_line(&mut self) -> Option<Bytes> {
        let end = find_newline(&self.buffer)?;

        let line = self.buffer.split_to(end).freeze();
        // drop the '\n' itself
        self.buffer.advance(1);

        Some(line)
    }

    pub fn pending(&self) -> &[u8] {
        &self.buffer[..]
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        LineBuffer::new()
    }
}

fn find_newline(src: &[u8]) -> Option<usize> {
    src.iter().position(|b| *b == b'\n')
}

#[cfg(test)]
mod tests {

    use super::*;

    fn drain(lines: &mut LineBuffer) -> Vec<Bytes> {
        let mut out = vec![];
        while let Some(line) = lines.next_line() {
            out.push(line);
        }
        out
    }

    #[test]
    fn ts_on_find_newline() {
        assert_eq!(find_newline(b"abc"), None);
        assert_eq!(find_newline(b"\n"), Some(0));
        assert_eq!(find_newline(b"ab\ncd\n"), Some(2));
    }

    #[test]
    fn ts_on_many_lines_in_one_feed() {
        let mut lines = LineBuffer::new();
        lines.feed(b"status\nping\n\ncurrentsong\nsetv");

        let got = drain(&mut lines);
        assert_eq!(
            got,
            vec![
                Bytes::from_static(b"status"),
                Bytes::from_static(b"ping"),
                Bytes::from_static(b""),
                Bytes::from_static(b"currentsong"),
            ]
        );

        // the unterminated tail stays buffered
        assert_eq!(lines.pending(), b"setv");
        assert_eq!(lines.next_line(), None);
        assert_eq!(lines.pending(), b"setv");

        lines.feed(b"ol 50\n");
        assert_eq!(lines.next_line(), Some(Bytes::from_static(b"setvol 50")));
        assert_eq!(lines.next_line(), None);
        assert!(lines.is_empty());
    }

    #[test]
    fn ts_on_byte_by_byte_feed() {
        let mut lines = LineBuffer::new();
        let mut got = vec![];

        for b in b"play\npause 1\n" {
            lines.feed(&[*b]);
            got.extend(drain(&mut lines));
        }

        assert_eq!(
            got,
            vec![Bytes::from_static(b"play"), Bytes::from_static(b"pause 1")]
        );
        assert!(lines.is_empty());
    }

    #[test]
    fn ts_on_empty_buffer() {
        let mut lines = LineBuffer::default();
        assert_eq!(lines.next_line(), None);
        assert!(lines.is_empty());
    }
}
