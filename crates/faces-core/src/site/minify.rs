//! Regex minifiers for the generated pages.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern compiles"))
}

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        fn $name() -> &'static Regex {
            static CELL: OnceLock<Regex> = OnceLock::new();
            cached(&CELL, $re)
        }
    };
}

pattern!(newlines, r"\n+");
pattern!(html_comment, r"<!--[\s\S]*?-->");
pattern!(between_tags, r">\s+<");
pattern!(multi_space, r"\s{2,}");
pattern!(any_space, r"\s+");
pattern!(block_comment, r"/\*[\s\S]*?\*/");
pattern!(js_punct, r"\s*([{}();,])\s*");
pattern!(css_punct, r"\s*([{}:;,>+~])\s*");
pattern!(script_block, r"(?is)<script(\b[^>]*)>(.*?)</script>");
pattern!(style_block, r"(?is)<style\b[^>]*>(.*?)</style\s*>");
pattern!(src_attr, r#"(?i)\bsrc\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#);

/// Minify inline `<script>` (without `src`) and `<style>` blocks, then
/// strip comments and collapse whitespace.
pub fn minify_html(html: &str) -> String {
    let html = html.replace('\r', "");

    // Inline code first, while line comments still end at a newline
    let html = script_block().replace_all(&html, |caps: &Captures| {
        let attrs = &caps[1];
        if src_attr().is_match(attrs) {
            caps[0].to_string()
        } else {
            format!("<script{}>{}</script>", attrs, minify_js(&caps[2]))
        }
    });
    let html = style_block().replace_all(&html, |caps: &Captures| {
        format!("<style>{}</style>", minify_css(&caps[1]))
    });

    let html = newlines().replace_all(&html, " ");
    let html = html_comment().replace_all(&html, "");
    let html = between_tags().replace_all(&html, "><");
    let html = multi_space().replace_all(&html, " ");
    html.trim().to_string()
}

/// Cut a `//` line comment. A `//` right after a colon is a URL scheme.
fn strip_line_comment(line: &str) -> &str {
    let mut from = 0;
    while let Some(pos) = line[from..].find("//") {
        let at = from + pos;
        if !line[..at].ends_with(':') {
            return &line[..at];
        }
        from = at + 2;
    }
    line
}

pub fn minify_js(code: &str) -> String {
    let code: Vec<&str> = code.lines().map(strip_line_comment).collect();
    let code = code.join("\n");
    let code = block_comment().replace_all(&code, "");
    let code = any_space().replace_all(&code, " ");
    let code = js_punct().replace_all(&code, "$1");
    let code = any_space().replace_all(&code, " ");
    code.trim().to_string()
}

pub fn minify_css(code: &str) -> String {
    let code = block_comment().replace_all(code, "");
    let code = any_space().replace_all(&code, " ");
    let code = css_punct().replace_all(&code, "$1");
    code.trim().to_string()
}

pub fn minify_xml(xml: &str) -> String {
    let xml = html_comment().replace_all(xml, "");
    let xml = between_tags().replace_all(&xml, "><");
    let xml = multi_space().replace_all(&xml, " ");
    xml.trim().to_string()
}
