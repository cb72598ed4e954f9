use std::borrow::Cow;

use thiserror::Error;

use super::escape::unescape_bytes;

/// One structural event from the wire text.
#[derive(PartialEq, Debug)]
pub enum Event<'a> {
    Open {
        name: &'a [u8],
        attrs: Vec<(&'a [u8], Cow<'a, [u8]>)>,
    },
    Close(&'a [u8]),
    Text(&'a [u8]),
}

#[derive(Debug, PartialEq, Error)]
pub enum ReadError {
    #[error("unterminated tag at byte {0}")]
    UnterminatedTag(usize),
    #[error("empty tag name at byte {0}")]
    EmptyTagName(usize),
    #[error("unterminated comment at byte {0}")]
    UnterminatedComment(usize),
    #[error("unterminated processing instruction at byte {0}")]
    UnterminatedPi(usize),
    #[error("malformed attribute at byte {0}")]
    BadAttribute(usize),
}

/// Single-pass lexer for the tagged-text grammar. Not a general XML
/// parser: it knows tags, double-quoted attributes, self-closing tags, and
/// it skips comments and processing instructions. Everything between tags
/// comes out as verbatim text events.
pub struct Reader<'a> {
    src: &'a [u8],
    pos: usize,
    // a self-closed tag yields its close event on the following call
    pending_close: Option<&'a [u8]>,
}

impl<'a> Reader<'a> {
    pub fn new(src: &'a [u8]) -> Reader<'a> {
        Reader {
            src,
            pos: 0,
            pending_close: None,
        }
    }

    /// Returns the next event, or None once the input is exhausted.
    pub fn next_event(&mut self) -> Result<Option<Event<'a>>, ReadError> {
        if let Some(name) = self.pending_close.take() {
            return Ok(Some(Event::Close(name)));
        }
        loop {
            if self.pos >= self.src.len() {
                return Ok(None);
            }
            if self.src[self.pos] != b'<' {
                return Ok(Some(self.text_event()));
            }
            if self.src[self.pos..].starts_with(b"<!--") {
                self.skip_comment()?;
                continue;
            }
            if self.src[self.pos..].starts_with(b"<?") {
                self.skip_pi()?;
                continue;
            }
            return self.tag_event().map(Some);
        }
    }

    fn text_event(&mut self) -> Event<'a> {
        let src = self.src;
        let start = self.pos;
        let end = match src[start..].iter().position(|b| *b == b'<') {
            Some(i) => start + i,
            None => src.len(),
        };
        self.pos = end;
        Event::Text(&src[start..end])
    }

    fn tag_event(&mut self) -> Result<Event<'a>, ReadError> {
        let src = self.src;
        let open_at = self.pos;
        let end = match src[open_at..].iter().position(|b| *b == b'>') {
            Some(i) => open_at + i,
            None => return Err(ReadError::UnterminatedTag(open_at)),
        };
        let mut body = &src[open_at + 1..end];
        self.pos = end + 1;

        let closing = body.first() == Some(&b'/');
        if closing {
            body = &body[1..];
        }
        let self_closing = !closing && body.last() == Some(&b'/');
        if self_closing {
            body = &body[..body.len() - 1];
        }

        let name_end = body
            .iter()
            .position(|b| b.is_ascii_whitespace())
            .unwrap_or(body.len());
        let name = &body[..name_end];
        if name.is_empty() {
            return Err(ReadError::EmptyTagName(open_at));
        }

        if closing {
            return Ok(Event::Close(name));
        }
        let attrs = parse_attrs(&body[name_end..], open_at)?;
        if self_closing {
            self.pending_close = Some(name);
        }
        Ok(Event::Open { name, attrs })
    }

    fn skip_comment(&mut self) -> Result<(), ReadError> {
        let start = self.pos;
        match find(&self.src[start..], b"-->") {
            Some(i) => {
                self.pos = start + i + 3;
                Ok(())
            }
            None => Err(ReadError::UnterminatedComment(start)),
        }
    }

    fn skip_pi(&mut self) -> Result<(), ReadError> {
        let start = self.pos;
        match find(&self.src[start..], b"?>") {
            Some(i) => {
                self.pos = start + i + 2;
                Ok(())
            }
            None => Err(ReadError::UnterminatedPi(start)),
        }
    }
}

fn parse_attrs<'a>(
    mut rest: &'a [u8],
    tag_at: usize,
) -> Result<Vec<(&'a [u8], Cow<'a, [u8]>)>, ReadError> {
    let mut attrs = Vec::new();
    loop {
        while rest.first().is_some_and(|b| b.is_ascii_whitespace()) {
            rest = &rest[1..];
        }
        if rest.is_empty() {
            return Ok(attrs);
        }

        let eq = rest
            .iter()
            .position(|b| *b == b'=')
            .ok_or(ReadError::BadAttribute(tag_at))?;
        let key = rest[..eq].trim_ascii();
        if key.is_empty() {
            return Err(ReadError::BadAttribute(tag_at));
        }
        rest = &rest[eq + 1..];

        while rest.first().is_some_and(|b| b.is_ascii_whitespace()) {
            rest = &rest[1..];
        }
        if rest.first() != Some(&b'"') {
            return Err(ReadError::BadAttribute(tag_at));
        }
        rest = &rest[1..];
        let close = rest
            .iter()
            .position(|b| *b == b'"')
            .ok_or(ReadError::BadAttribute(tag_at))?;
        let raw = &rest[..close];
        rest = &rest[close + 1..];

        attrs.push((key, unescape_bytes(raw, true)));
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod test_reader {
    use super::*;

    fn all_events(src: &[u8]) -> Vec<Event<'_>> {
        let mut reader = Reader::new(src);
        let mut events = Vec::new();
        while let Some(event) = reader.next_event().unwrap() {
            events.push(event);
        }
        events
    }

    #[test]
    fn simple_tag_with_body() {
        assert_eq!(
            all_events(b"<int>42</int>"),
            vec![
                Event::Open {
                    name: b"int",
                    attrs: vec![],
                },
                Event::Text(b"42"),
                Event::Close(b"int"),
            ]
        );
    }

    #[test]
    fn self_closing_tag_yields_open_then_close() {
        assert_eq!(
            all_events(b"<none />"),
            vec![
                Event::Open {
                    name: b"none",
                    attrs: vec![],
                },
                Event::Close(b"none"),
            ]
        );
    }

    #[test]
    fn attributes_are_unescaped() {
        let events = all_events(b"<pickle method=\"a&quot;b\" encoding=\"base64\">AQ==</pickle>");
        match &events[0] {
            Event::Open { name, attrs } => {
                assert_eq!(*name, b"pickle");
                assert_eq!(
                    attrs,
                    &vec![
                        (b"method".as_slice(), Cow::Owned(b"a\"b".to_vec())),
                        (b"encoding".as_slice(), Cow::Borrowed(b"base64".as_slice())),
                    ]
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(events[1], Event::Text(b"AQ=="));
        assert_eq!(events[2], Event::Close(b"pickle"));
    }

    #[test]
    fn prolog_and_comments_are_skipped() {
        assert_eq!(
            all_events(b"<?xml version=\"1.0\"?><!-- a <comment> --><int>1</int>"),
            vec![
                Event::Open {
                    name: b"int",
                    attrs: vec![],
                },
                Event::Text(b"1"),
                Event::Close(b"int"),
            ]
        );
    }

    #[test]
    fn whitespace_between_tags_is_text() {
        let events = all_events(b"<list>\n  <int>1</int>\n</list>");
        assert_eq!(events[1], Event::Text(b"\n  "));
        assert_eq!(events[5], Event::Text(b"\n"));
        assert_eq!(events.len(), 7);
    }

    #[test]
    fn error_unterminated_tag() {
        let mut reader = Reader::new(b"text<int");
        assert!(matches!(reader.next_event().unwrap(), Some(Event::Text(b"text"))));
        assert_eq!(
            reader.next_event().unwrap_err(),
            ReadError::UnterminatedTag(4)
        );
    }

    #[test]
    fn error_unterminated_comment() {
        let mut reader = Reader::new(b"<!-- oops");
        assert_eq!(
            reader.next_event().unwrap_err(),
            ReadError::UnterminatedComment(0)
        );
    }

    #[test]
    fn error_bad_attribute() {
        let mut reader = Reader::new(b"<pickle method=base64>");
        assert_eq!(
            reader.next_event().unwrap_err(),
            ReadError::BadAttribute(0)
        );
    }

    #[test]
    fn error_empty_tag_name() {
        let mut reader = Reader::new(b"<>");
        assert_eq!(reader.next_event().unwrap_err(), ReadError::EmptyTagName(0));
    }
}
