use std::io::{self, Write};

use base64::{Engine as _, engine::general_purpose::STANDARD};

use super::escape::{escape, escape_bytes};
use super::value::Value;

const INDENT: &[u8] = b"  ";

/// Emits a value tree as indented tagged text. One emission rule per
/// variant; the only failure mode is the sink refusing a write.
pub struct Writer<W: Write> {
    out: W,
}

impl<W: Write> Writer<W> {
    pub fn new(out: W) -> Writer<W> {
        Writer { out }
    }

    /// Standard document prolog, for callers that wrap the value in their
    /// own document root.
    pub fn write_prolog(&mut self) -> io::Result<()> {
        self.out
            .write_all(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")
    }

    pub fn write(&mut self, value: &Value) -> io::Result<()> {
        self.write_value(value, 0)
    }

    fn write_value(&mut self, value: &Value, indent: usize) -> io::Result<()> {
        match value {
            Value::Null => self.line(indent, "<none />"),
            Value::Int(v) => self.line(indent, &format!("<int>{v}</int>")),
            Value::Long(v) => self.line(indent, &format!("<long>{v}</long>")),
            // f64 Display is locale-independent and survives a parse back
            Value::Float(v) => self.line(indent, &format!("<float>{v}</float>")),
            Value::Complex(real, imag) => {
                self.line(indent, &format!("<complex>{real} {imag}</complex>"))
            }
            Value::Bool(v) => {
                let literal = if *v { "True" } else { "False" };
                self.line(indent, &format!("<bool>{literal}</bool>"))
            }
            Value::Bytes(bytes) => {
                self.pad(indent)?;
                self.out.write_all(b"<string>")?;
                self.out.write_all(&escape_bytes(bytes))?;
                self.out.write_all(b"</string>\n")
            }
            Value::Text(text) => {
                self.line(indent, &format!("<unicode>{}</unicode>", escape(text, false)))
            }
            Value::Tuple(items) => {
                self.line(indent, "<tuple>")?;
                for item in items {
                    self.write_value(item, indent + 1)?;
                }
                self.line(indent, "</tuple>")
            }
            Value::List(items) => {
                self.line(indent, "<list>")?;
                for item in items {
                    self.write_value(item, indent + 1)?;
                }
                self.line(indent, "</list>")
            }
            Value::Dict(entries) => {
                self.line(indent, "<dict>")?;
                // entries go out sorted by the key's rendered wire text, so
                // repeated encodes of the same dict are byte-identical
                let mut order: Vec<(Vec<u8>, &(Value, Value))> =
                    entries.iter().map(|entry| (encode(&entry.0), entry)).collect();
                order.sort_by(|a, b| a.0.cmp(&b.0));
                for (_, entry) in order {
                    let (key, val) = entry;
                    self.line(indent + 1, "<key>")?;
                    self.write_value(key, indent + 2)?;
                    self.line(indent + 1, "</key>")?;
                    self.line(indent + 1, "<value>")?;
                    self.write_value(val, indent + 2)?;
                    self.line(indent + 1, "</value>")?;
                }
                self.line(indent, "</dict>")
            }
            Value::Pickle(opaque) => {
                let payload = STANDARD.encode(&opaque.data);
                self.line(
                    indent,
                    &format!(
                        "<pickle method=\"{}\" encoding=\"base64\">{payload}</pickle>",
                        escape(&opaque.method, true)
                    ),
                )
            }
        }
    }

    fn pad(&mut self, indent: usize) -> io::Result<()> {
        for _ in 0..indent {
            self.out.write_all(INDENT)?;
        }
        Ok(())
    }

    fn line(&mut self, indent: usize, text: &str) -> io::Result<()> {
        self.pad(indent)?;
        self.out.write_all(text.as_bytes())?;
        self.out.write_all(b"\n")
    }
}

/// Serializes a value into a standalone buffer.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    Writer::new(&mut out)
        .write(value)
        .expect("writing to a Vec<u8> does not fail");
    out
}

#[cfg(test)]
mod test_writer {
    use super::super::value::{LongNum, Opaque};
    use super::*;

    fn encoded(value: &Value) -> String {
        String::from_utf8(encode(value)).unwrap()
    }

    #[test]
    fn scalars() {
        assert_eq!(encoded(&Value::Null), "<none />\n");
        assert_eq!(encoded(&Value::Int(-42)), "<int>-42</int>\n");
        assert_eq!(encoded(&Value::Float(3.25)), "<float>3.25</float>\n");
        assert_eq!(encoded(&Value::Bool(true)), "<bool>True</bool>\n");
        assert_eq!(encoded(&Value::Bool(false)), "<bool>False</bool>\n");
        assert_eq!(
            encoded(&Value::Complex(1.5, -2.25)),
            "<complex>1.5 -2.25</complex>\n"
        );
        assert_eq!(
            encoded(&Value::Long(LongNum::parse("123456789012345678901").unwrap())),
            "<long>123456789012345678901</long>\n"
        );
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(
            encoded(&Value::Text(String::from("a & b < c"))),
            "<unicode>a &amp; b &lt; c</unicode>\n"
        );
        assert_eq!(
            encode(&Value::Bytes(b">raw<".to_vec())),
            b"<string>&gt;raw&lt;</string>\n"
        );
    }

    #[test]
    fn nested_list_indents_children() {
        let value = Value::List(vec![Value::Int(1), Value::Tuple(vec![Value::Null])]);
        assert_eq!(
            encoded(&value),
            "<list>\n  <int>1</int>\n  <tuple>\n    <none />\n  </tuple>\n</list>\n"
        );
    }

    #[test]
    fn empty_containers() {
        assert_eq!(encoded(&Value::Tuple(vec![])), "<tuple>\n</tuple>\n");
        assert_eq!(encoded(&Value::List(vec![])), "<list>\n</list>\n");
        assert_eq!(encoded(&Value::Dict(vec![])), "<dict>\n</dict>\n");
    }

    #[test]
    fn dict_keys_come_out_sorted() {
        let value = Value::Dict(vec![
            (Value::from("b"), Value::Int(2)),
            (Value::from("a"), Value::Int(1)),
        ]);
        assert_eq!(
            encoded(&value),
            "<dict>\n\
             \x20 <key>\n\
             \x20   <unicode>a</unicode>\n\
             \x20 </key>\n\
             \x20 <value>\n\
             \x20   <int>1</int>\n\
             \x20 </value>\n\
             \x20 <key>\n\
             \x20   <unicode>b</unicode>\n\
             \x20 </key>\n\
             \x20 <value>\n\
             \x20   <int>2</int>\n\
             \x20 </value>\n\
             </dict>\n"
        );
    }

    #[test]
    fn dict_keys_sort_by_rendered_text_not_numeric_value() {
        let value = Value::Dict(vec![
            (Value::Int(2), Value::Null),
            (Value::Int(10), Value::Null),
        ]);
        let text = encoded(&value);
        let pos10 = text.find("<int>10</int>").unwrap();
        let pos2 = text.find("<int>2</int>").unwrap();
        assert!(pos10 < pos2);
    }

    #[test]
    fn pickle_carries_method_and_base64_payload() {
        let value = Value::Pickle(Opaque {
            method: String::from("pickle"),
            data: vec![1, 2, 3],
        });
        assert_eq!(
            encoded(&value),
            "<pickle method=\"pickle\" encoding=\"base64\">AQID</pickle>\n"
        );
    }

    #[test]
    fn pickle_method_is_attribute_escaped() {
        let value = Value::Pickle(Opaque {
            method: String::from("a\"b"),
            data: vec![],
        });
        assert_eq!(
            encoded(&value),
            "<pickle method=\"a&quot;b\" encoding=\"base64\"></pickle>\n"
        );
    }

    #[test]
    fn prolog() {
        let mut out = Vec::new();
        Writer::new(&mut out).write_prolog().unwrap();
        assert_eq!(out, b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    }
}
