use std::str;

use snafu::{prelude::*, ResultExt};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed for bad string encode {}", source))]
    EncodeError { source: str::Utf8Error },
    #[snafu(display("no closing quotation"))]
    UnclosedQuoteError,
    #[snafu(display("no escaped character"))]
    EscapeError,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An empty line parses to an empty command.
pub fn parse_command(line: &[u8]) -> Result<(String, Vec<String>)> {
    let (command, rest) = split_command(line);

    let command = str::from_utf8(command).context(EncodeSnafu)?.to_string();

    let args = if rest.is_empty() {
        vec![]
    } else {
        let rest = str::from_utf8(rest).context(EncodeSnafu)?;
        split_args(rest)?
    };

    Ok((command, args))
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn split_command(line: &[u8]) -> (&[u8], &[u8]) {
    match line.iter().position(|b| is_blank(*b)) {
        Some(start) => {
            let end = line[start..]
                .iter()
                .position(|b| !is_blank(*b))
                .map_or(line.len(), |n| start + n);
            (&line[..start], &line[end..])
        }
        None => (line, &[]),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Blank,
    Word,
    Quoted,
    Escape { quoted: bool },
}

/// Shell style word splitting: blanks separate words, double quotes group,
/// a backslash escapes the next character. Inside quotes only `"` and `\`
/// can be escaped, any other backslash is kept as is.
fn split_args(src: &str) -> Result<Vec<String>> {
    let mut args = vec![];
    let mut token = String::new();
    // distinguishes `""` (an empty argument) from no argument at all
    let mut quoted = false;
    let mut state = State::Blank;

    for c in src.chars() {
        state = match state {
            State::Blank => match c {
                ' ' | '\t' => State::Blank,
                '\\' => State::Escape { quoted: false },
                '"' => {
                    quoted = true;
                    State::Quoted
                }
                _ => {
                    token.push(c);
                    State::Word
                }
            },
            State::Word => match c {
                ' ' | '\t' => {
                    args.push(std::mem::take(&mut token));
                    quoted = false;
                    State::Blank
                }
                '\\' => State::Escape { quoted: false },
                '"' => {
                    quoted = true;
                    State::Quoted
                }
                _ => {
                    token.push(c);
                    State::Word
                }
            },
            State::Quoted => match c {
                '"' => State::Word,
                '\\' => State::Escape { quoted: true },
                _ => {
                    token.push(c);
                    State::Quoted
                }
            },
            State::Escape { quoted: true } => {
                if c != '"' && c != '\\' {
                    token.push('\\');
                }
                token.push(c);
                State::Quoted
            }
            State::Escape { quoted: false } => {
                token.push(c);
                State::Word
            }
        };
    }

    match state {
        State::Quoted => UnclosedQuoteSnafu.fail()?,
        State::Escape { .. } => EscapeSnafu.fail()?,
        State::Word => args.push(token),
        State::Blank => {
            if quoted || !token.is_empty() {
                args.push(token);
            }
        }
    }

    Ok(args)
}
