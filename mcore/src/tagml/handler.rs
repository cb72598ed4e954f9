use std::borrow::Cow;
use std::string::FromUtf8Error;

use atoi::FromRadix10SignedChecked;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::{debug, trace};
use thiserror::Error;

use super::escape::unescape_bytes;
use super::value::{LongNum, Opaque, Value};

/// Tag registry, fixed at compile time. `key` and `value` wrappers are
/// deliberately absent: they go through the unknown-tag path, so their
/// children land directly on the stack.
#[derive(Clone, Copy, PartialEq, Debug)]
enum Tag {
    None,
    Int,
    Long,
    Float,
    Complex,
    Bool,
    String,
    Unicode,
    Tuple,
    List,
    Dict,
    Pickle,
}

impl Tag {
    fn lookup(name: &[u8]) -> Option<Tag> {
        match name {
            b"none" => Some(Tag::None),
            b"int" => Some(Tag::Int),
            b"long" => Some(Tag::Long),
            b"float" => Some(Tag::Float),
            b"complex" => Some(Tag::Complex),
            b"bool" => Some(Tag::Bool),
            b"string" => Some(Tag::String),
            b"unicode" => Some(Tag::Unicode),
            b"tuple" => Some(Tag::Tuple),
            b"list" => Some(Tag::List),
            b"dict" => Some(Tag::Dict),
            b"pickle" => Some(Tag::Pickle),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Tag::None => "none",
            Tag::Int => "int",
            Tag::Long => "long",
            Tag::Float => "float",
            Tag::Complex => "complex",
            Tag::Bool => "bool",
            Tag::String => "string",
            Tag::Unicode => "unicode",
            Tag::Tuple => "tuple",
            Tag::List => "list",
            Tag::Dict => "dict",
            Tag::Pickle => "pickle",
        }
    }
}

/// Stack slot: a finished value, or the sentinel separating a
/// container-in-progress from its completed children.
#[derive(Debug)]
enum Entry {
    Marker,
    Value(Value),
}

#[derive(Debug, Error)]
pub enum HandleError {
    #[error("cannot parse {text:?} inside <{tag}>")]
    MalformedScalar { tag: &'static str, text: String },
    #[error("</{0}> without a matching open tag")]
    UnmatchedClose(&'static str),
    #[error("</list> does not line up with its open tag")]
    MisplacedListClose,
    #[error("dictionary key has no value")]
    OrphanedKey,
    #[error("<unicode> body is not valid UTF-8")]
    Utf8(#[from] FromUtf8Error),
    #[error("cannot decode <pickle> payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unsupported pickle encoding {0:?}")]
    UnknownPickleEncoding(String),
    #[error("document contains no value")]
    EmptyDocument,
    #[error("container never closed")]
    UnfinishedContainer,
    #[error("expected a single top-level value, found {0}")]
    MultipleValues(usize),
}

struct PickleAttrs {
    method: String,
    encoding: String,
}

/// Rebuilds a value tree from a flat open/text/close event stream.
///
/// The producer delivers events in a single forward pass with no structural
/// lookahead, so container contents are collected on an explicit stack:
/// each container open pushes a marker, and the matching close scans back
/// to the most recent marker to find where its children begin. The scan is
/// unavoidable - the stack holds completed siblings interleaved with
/// still-open containers, so the child count is unknown until the marker
/// turns up.
///
/// One handler decodes one document; construct a fresh one per decode.
pub struct Handler {
    stack: Vec<Entry>,
    buffer: Vec<u8>,
    pickle: Option<PickleAttrs>,
}

impl Handler {
    pub fn new() -> Handler {
        Handler {
            stack: Vec::new(),
            buffer: Vec::new(),
            pickle: None,
        }
    }

    /// Open tags never fail: recognized scalars reset the text buffer,
    /// containers drop their marker, everything else is ignored so that
    /// unknown wrapper tags stay transparent.
    pub fn on_open(&mut self, name: &[u8], attrs: &[(&[u8], Cow<'_, [u8]>)]) {
        let Some(tag) = Tag::lookup(name) else {
            debug!("ignoring unknown tag <{}>", String::from_utf8_lossy(name));
            return;
        };

        match tag {
            Tag::None
            | Tag::Int
            | Tag::Long
            | Tag::Float
            | Tag::Complex
            | Tag::Bool
            | Tag::String
            | Tag::Unicode => self.buffer.clear(),
            Tag::Tuple | Tag::Dict => self.stack.push(Entry::Marker),
            Tag::List => {
                // the placeholder makes a list-in-progress recognizable on
                // the stack before any of its children have arrived
                self.stack.push(Entry::Marker);
                self.stack.push(Entry::Value(Value::List(Vec::new())));
            }
            Tag::Pickle => {
                self.buffer.clear();
                let mut method = String::from("pickle");
                let mut encoding = String::from("base64");
                for (key, val) in attrs {
                    match *key {
                        b"method" => method = String::from_utf8_lossy(val).into_owned(),
                        b"encoding" => encoding = String::from_utf8_lossy(val).into_owned(),
                        _ => {}
                    }
                }
                self.pickle = Some(PickleAttrs { method, encoding });
            }
        }
    }

    /// Text accumulates verbatim; unescaping waits until the closing tag
    /// says what the buffer is.
    pub fn on_text(&mut self, chars: &[u8]) {
        self.buffer.extend_from_slice(chars);
    }

    pub fn on_close(&mut self, name: &[u8]) -> Result<(), HandleError> {
        let Some(tag) = Tag::lookup(name) else {
            debug!(
                "ignoring unknown close tag </{}>",
                String::from_utf8_lossy(name)
            );
            return Ok(());
        };

        match tag {
            Tag::None => self.push(Value::Null),
            Tag::Int => {
                let parsed = parse_i64(self.buffer.trim_ascii());
                match parsed {
                    Some(n) => self.push(Value::Int(n)),
                    None => return Err(self.malformed(tag)),
                }
            }
            Tag::Long => {
                let text = String::from_utf8_lossy(&self.buffer);
                match LongNum::parse(text.trim()) {
                    Ok(n) => self.push(Value::Long(n)),
                    Err(_) => return Err(self.malformed(tag)),
                }
            }
            Tag::Float => {
                let parsed = std::str::from_utf8(self.buffer.trim_ascii())
                    .ok()
                    .and_then(|text| text.parse::<f64>().ok());
                match parsed {
                    Some(v) => self.push(Value::Float(v)),
                    None => return Err(self.malformed(tag)),
                }
            }
            Tag::Complex => {
                let parsed = parse_complex(self.buffer.trim_ascii());
                match parsed {
                    Some((real, imag)) => self.push(Value::Complex(real, imag)),
                    None => return Err(self.malformed(tag)),
                }
            }
            // anything but the literal "True" reads as false
            Tag::Bool => {
                let parsed = self.buffer.trim_ascii() == b"True";
                self.push(Value::Bool(parsed));
            }
            Tag::String => {
                let bytes = unescape_bytes(&self.buffer, false).into_owned();
                self.push(Value::Bytes(bytes));
            }
            Tag::Unicode => {
                let bytes = unescape_bytes(&self.buffer, false).into_owned();
                let text = String::from_utf8(bytes)?;
                self.push(Value::Text(text));
            }
            Tag::Tuple => {
                let at = self
                    .marker_position()
                    .ok_or(HandleError::UnmatchedClose("tuple"))?;
                let items = self.take_children(at);
                self.stack.truncate(at);
                self.push(Value::Tuple(items));
            }
            Tag::List => {
                let at = self
                    .marker_position()
                    .ok_or(HandleError::UnmatchedClose("list"))?;
                let mut items = self.take_children(at);
                self.stack.truncate(at);
                if items.is_empty() {
                    return Err(HandleError::MisplacedListClose);
                }
                let mut list = match items.remove(0) {
                    Value::List(placeholder) => placeholder,
                    _ => return Err(HandleError::MisplacedListClose),
                };
                list.extend(items);
                self.push(Value::List(list));
            }
            Tag::Dict => {
                let at = self
                    .marker_position()
                    .ok_or(HandleError::UnmatchedClose("dict"))?;
                let children = self.take_children(at);
                self.stack.truncate(at);
                if children.len() % 2 != 0 {
                    return Err(HandleError::OrphanedKey);
                }
                let mut entries = Vec::with_capacity(children.len() / 2);
                let mut children = children.into_iter();
                while let (Some(key), Some(val)) = (children.next(), children.next()) {
                    entries.push((key, val));
                }
                self.push(Value::Dict(entries));
            }
            Tag::Pickle => {
                let attrs = self.pickle.take().unwrap_or_else(|| PickleAttrs {
                    method: String::from("pickle"),
                    encoding: String::from("base64"),
                });
                if attrs.encoding != "base64" {
                    return Err(HandleError::UnknownPickleEncoding(attrs.encoding));
                }
                let mut payload = self.buffer.clone();
                payload.retain(|b| !b.is_ascii_whitespace());
                let data = STANDARD.decode(&payload)?;
                self.push(Value::Pickle(Opaque {
                    method: attrs.method,
                    data,
                }));
            }
        }
        Ok(())
    }

    /// Hands over the single completed value once the stream has ended.
    pub fn finish(mut self) -> Result<Value, HandleError> {
        if self.stack.iter().any(|e| matches!(e, Entry::Marker)) {
            return Err(HandleError::UnfinishedContainer);
        }
        match self.stack.len() {
            0 => Err(HandleError::EmptyDocument),
            1 => {
                let Some(Entry::Value(value)) = self.stack.pop() else {
                    return Err(HandleError::EmptyDocument);
                };
                trace!("document finished with a {value} value");
                Ok(value)
            }
            n => Err(HandleError::MultipleValues(n)),
        }
    }

    fn push(&mut self, value: Value) {
        self.stack.push(Entry::Value(value));
    }

    fn marker_position(&self) -> Option<usize> {
        self.stack
            .iter()
            .rposition(|entry| matches!(entry, Entry::Marker))
    }

    /// Removes every entry above the marker at `at` and returns the
    /// finished values in emission order. The marker itself stays put.
    fn take_children(&mut self, at: usize) -> Vec<Value> {
        self.stack
            .drain(at + 1..)
            .map(|entry| match entry {
                Entry::Value(value) => value,
                Entry::Marker => unreachable!("a marker above `at` would have been found first"),
            })
            .collect()
    }

    fn malformed(&self, tag: Tag) -> HandleError {
        HandleError::MalformedScalar {
            tag: tag.name(),
            text: String::from_utf8_lossy(&self.buffer).into_owned(),
        }
    }
}

fn parse_i64(text: &[u8]) -> Option<i64> {
    let (parsed, used) = i64::from_radix_10_signed_checked(text);
    match parsed {
        Some(n) if used == text.len() && !text.is_empty() => Some(n),
        _ => None,
    }
}

fn parse_complex(text: &[u8]) -> Option<(f64, f64)> {
    let text = std::str::from_utf8(text).ok()?;
    let mut parts = text.split_whitespace();
    let real = parts.next()?.parse().ok()?;
    let imag = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((real, imag))
}
