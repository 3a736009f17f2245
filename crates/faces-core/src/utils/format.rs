use std::cmp::Ordering;

/// Case-insensitive comparison without allocating lowercase copies.
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Format a count with thousands separators, or "N/A" when unknown.
pub fn format_number(value: Option<u64>) -> String {
    let Some(n) = value else {
        return "N/A".to_string();
    };

    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Escape text for inclusion in HTML/XML content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value so whitespace collapsing leaves it intact.
/// Only single plain spaces stay literal; every other whitespace character
/// becomes a numeric reference.
pub fn escape_attr(s: &str) -> String {
    let escaped = escape_html(s);
    let mut out = String::with_capacity(escaped.len());
    let mut after_space = false;
    for c in escaped.chars() {
        if c.is_whitespace() {
            if c == ' ' && !after_space {
                out.push(c);
            } else {
                out.push_str(&format!("&#{};", c as u32));
            }
            after_space = true;
        } else {
            out.push(c);
            after_space = false;
        }
    }
    out
}

/// Decode `&#N;` references. Malformed ones are kept as written.
fn decode_numeric_refs(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("&#") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let decoded = tail.find(';').and_then(|end| {
            let c = tail[..end].parse::<u32>().ok().and_then(char::from_u32)?;
            Some((c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push_str("&#");
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Reverse of `escape_html` and `escape_attr` for the entities they produce.
pub fn unescape_html(s: &str) -> String {
    decode_numeric_refs(s)
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
