//! The emitter's output contract (§4.8): a sink that knows nothing about
//! the AST, only how to write well-formed, indented XML.

use quick_xml::escape::escape;

pub trait Sink {
    fn open_tag(&mut self, name: &str, attrs: &[(&str, &str)]);
    fn close_tag(&mut self);
    fn self_closing(&mut self, name: &str, attrs: &[(&str, &str)]);
    fn text(&mut self, s: &str);
    fn cdata(&mut self, s: &str);
}

/// A `Vec<u8>`-backed sink with configurable indentation, matching
/// `xml_emitter.py`'s `_needs_newline` bookkeeping: a self-closing tag
/// immediately following an open or another self-closing tag (no text in
/// between) starts on its own indented line; text content is written inline
/// with its opening tag instead of on its own line.
pub struct IndentedWriter {
    buf: String,
    indent: usize,
    depth: usize,
    stack: Vec<String>,
    /// True right after an open/self-closing tag with no text emitted yet;
    /// cleared once text is written so a following close_tag stays inline.
    pending_newline: bool,
}

impl IndentedWriter {
    pub fn new(indent: usize) -> Self {
        IndentedWriter {
            buf: String::new(),
            indent,
            depth: 0,
            stack: Vec::new(),
            pending_newline: false,
        }
    }

    fn write_indent(&mut self) {
        if self.pending_newline {
            self.buf.push('\n');
        }
        self.buf.push_str(&" ".repeat(self.depth * self.indent));
    }

    fn write_attrs(&mut self, attrs: &[(&str, &str)]) {
        for (k, v) in attrs {
            let key = k.replace('_', "-");
            self.buf.push(' ');
            self.buf.push_str(&key);
            self.buf.push_str("=\"");
            self.buf.push_str(&escape(v));
            self.buf.push('"');
        }
    }

    pub fn finish(mut self) -> String {
        if !self.buf.ends_with('\n') {
            self.buf.push('\n');
        }
        std::mem::take(&mut self.buf)
    }
}

impl Sink for IndentedWriter {
    fn open_tag(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.write_indent();
        self.buf.push('<');
        self.buf.push_str(name);
        self.write_attrs(attrs);
        self.buf.push('>');
        self.stack.push(name.to_string());
        self.depth += 1;
        self.pending_newline = true;
    }

    fn close_tag(&mut self) {
        self.depth -= 1;
        let name = self.stack.pop().expect("close_tag without matching open_tag");
        if self.pending_newline {
            self.buf.push('\n');
            self.buf.push_str(&" ".repeat(self.depth * self.indent));
        }
        self.buf.push_str("</");
        self.buf.push_str(&name);
        self.buf.push('>');
        self.pending_newline = true;
    }

    fn self_closing(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.write_indent();
        self.buf.push('<');
        self.buf.push_str(name);
        self.write_attrs(attrs);
        self.buf.push_str("/>");
        self.pending_newline = true;
    }

    fn text(&mut self, s: &str) {
        self.buf.push_str(&escape(s));
        self.pending_newline = false;
    }

    fn cdata(&mut self, s: &str) {
        self.buf.push_str("<![CDATA[");
        self.buf.push_str(s);
        self.buf.push_str("]]>");
        self.pending_newline = false;
    }
}
