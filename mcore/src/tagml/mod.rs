pub mod escape;
pub mod handler;
pub mod reader;
pub mod value;
pub mod writer;

pub use handler::HandleError;
pub use handler::Handler;
pub use reader::Event;
pub use reader::ReadError;
pub use reader::Reader;
pub use value::{LongNum, Opaque, Value};
pub use writer::Writer;
pub use writer::encode;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed wire text: {0}")]
    Read(#[from] ReadError),
    #[error(transparent)]
    Handle(#[from] HandleError),
}

/// Decodes a single value from wire text. Each call runs a fresh handler,
/// so independent documents decode independently.
pub fn decode(src: &[u8]) -> Result<Value, DecodeError> {
    let mut reader = Reader::new(src);
    let mut handler = Handler::new();
    while let Some(event) = reader.next_event()? {
        match event {
            Event::Open { name, attrs } => handler.on_open(name, &attrs),
            Event::Text(chars) => handler.on_text(chars),
            Event::Close(name) => handler.on_close(name)?,
        }
    }
    Ok(handler.finish()?)
}
