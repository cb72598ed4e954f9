use std::borrow::Cow;

fn needs_escape(byte: u8, attribute: bool) -> bool {
    matches!(byte, b'&' | b'<' | b'>') || (attribute && byte == b'"')
}

/// Escape `&`, `<` and `>` in body text, plus `"` in attribute position.
/// A single pass never rescans an emitted entity, which is the point of the
/// ampersand-first rule in the wire grammar.
pub fn escape(data: &str, attribute: bool) -> Cow<'_, str> {
    if !data.bytes().any(|b| needs_escape(b, attribute)) {
        return Cow::Borrowed(data);
    }

    let mut out = String::with_capacity(data.len() + 8);
    for ch in data.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Body-text escaping for raw 8-bit strings.
pub fn escape_bytes(data: &[u8]) -> Cow<'_, [u8]> {
    if !data.iter().any(|b| needs_escape(*b, false)) {
        return Cow::Borrowed(data);
    }

    let mut out = Vec::with_capacity(data.len() + 8);
    for byte in data {
        match byte {
            b'&' => out.extend_from_slice(b"&amp;"),
            b'<' => out.extend_from_slice(b"&lt;"),
            b'>' => out.extend_from_slice(b"&gt;"),
            _ => out.push(*byte),
        }
    }
    Cow::Owned(out)
}

/// Reverses [`escape`]/[`escape_bytes`]. Entities other than the four we
/// emit pass through untouched.
pub fn unescape_bytes(data: &[u8], attribute: bool) -> Cow<'_, [u8]> {
    if !data.contains(&b'&') {
        return Cow::Borrowed(data);
    }

    let mut out = Vec::with_capacity(data.len());
    let mut pos = 0;
    while pos < data.len() {
        if data[pos] == b'&' {
            let rest = &data[pos..];
            if rest.starts_with(b"&amp;") {
                out.push(b'&');
                pos += 5;
                continue;
            }
            if rest.starts_with(b"&lt;") {
                out.push(b'<');
                pos += 4;
                continue;
            }
            if rest.starts_with(b"&gt;") {
                out.push(b'>');
                pos += 4;
                continue;
            }
            if attribute && rest.starts_with(b"&quot;") {
                out.push(b'"');
                pos += 6;
                continue;
            }
        }
        out.push(data[pos]);
        pos += 1;
    }
    Cow::Owned(out)
}
