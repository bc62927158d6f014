//! The parse-tree combinator engine (C4): a small library of composable
//! `Node` primitives that assemble into a recursive-descent parser with
//! built-in error recovery. A grammar is a tree of `Box<dyn Node>` values;
//! running it over a token stream produces a tree of [`ParseGroup`]s that
//! C5 walks into typed AST nodes.
//!
//! Every primitive here mirrors one matcher from the source grammar this
//! engine replaced: `Sequence` matches children in order and fails if any
//! does; `Statement` is a `Sequence` that survives a child's hard error by
//! recording it and marking the group incomplete; `ZeroOrMore`/`Until` skip
//! one token and keep going after a hard error, so one bad token doesn't
//! sink the whole file.

pub mod combinators;

use std::collections::HashMap;

use crate::diagnostics::Diagnostic;
use crate::token::{Span, Token, TokenKind};

/// Tag identifying which AST constructor a [`ParseGroup`] should become.
/// Kept as a string (rather than a function pointer) so the parse engine
/// does not need to depend on the AST module's types.
pub type GroupKind = &'static str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    Success,
    Failure,
    /// Matched, but consumed no tokens. Distinguished from `Success` so
    /// `ZeroOrMore`-style repetition can stop instead of looping forever.
    Empty,
}

impl ParseOutcome {
    pub fn matched(self) -> bool {
        matches!(self, ParseOutcome::Success)
    }

    pub fn succeeded(self) -> bool {
        self != ParseOutcome::Failure
    }

    pub fn failed(self) -> bool {
        self == ParseOutcome::Failure
    }
}

/// A value captured by a `Use*` leaf matcher into its enclosing [`ParseGroup`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Ident(String),
    Number(f64),
    NumberText(String),
    Quoted(String),
    Bool(bool),
}

impl Value {
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Value::Ident(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_quoted(&self) -> Option<&str> {
        match self {
            Value::Quoted(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// A matched group: the raw material C5 converts into a typed AST node.
#[derive(Debug, Clone)]
pub struct ParseGroup {
    pub kind: GroupKind,
    pub children: Vec<ParseGroup>,
    pub keys: HashMap<String, Value>,
    pub key_tokens: HashMap<String, Token>,
    pub span: Span,
    pub incomplete: bool,
}

impl ParseGroup {
    fn new(kind: GroupKind, start: usize) -> Self {
        ParseGroup {
            kind,
            children: Vec::new(),
            keys: HashMap::new(),
            key_tokens: HashMap::new(),
            span: Span::new(start, start),
            incomplete: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.keys.get(key)
    }

    pub fn token_for(&self, key: &str) -> Option<&Token> {
        self.key_tokens.get(key)
    }

    pub fn children_of_kind<'a>(&'a self, kind: GroupKind) -> impl Iterator<Item = &'a ParseGroup> {
        self.children.iter().filter(move |c| c.kind == kind)
    }
}

/// Raised when a `HardErr` (`.expected(...)`) matcher fails; the diagnostic has already been
/// pushed onto the cursor. Propagates like a failure through everything
/// except the recovery points (`Statement`, `ZeroOrMore`, `Until`) that
/// explicitly catch it.
#[derive(Debug, Clone, Copy)]
pub struct Aborted;

pub type StepResult = Result<bool, Aborted>;

/// In-progress accumulation for the group currently being built at one
/// nesting level; frames form a stack mirroring the combinator call tree.
struct Frame {
    group: Option<ParseGroup>,
    keys: HashMap<String, Value>,
    key_tokens: HashMap<String, Token>,
    children: Vec<ParseGroup>,
    incomplete: bool,
    start_index: usize,
}

impl Frame {
    fn new(start_index: usize) -> Self {
        Frame {
            group: None,
            keys: HashMap::new(),
            key_tokens: HashMap::new(),
            children: Vec::new(),
            incomplete: false,
            start_index,
        }
    }
}

/// Parser state: the token stream, current position, the frame stack used
/// to assemble [`ParseGroup`]s, and the diagnostics collected so far.
/// Diagnostics are never rolled back on backtrack — only group state is.
pub struct Cursor<'src> {
    tokens: &'src [Token],
    source: &'src str,
    index: usize,
    frames: Vec<Frame>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'src> Cursor<'src> {
    pub fn new(tokens: &'src [Token], source: &'src str) -> Self {
        assert!(
            tokens.last().map(|t| t.kind) == Some(TokenKind::Eof),
            "token stream must be terminated by Eof"
        );
        Cursor {
            tokens,
            source,
            index: 0,
            frames: vec![Frame::new(0)],
            diagnostics: Vec::new(),
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    fn skip(&mut self) {
        while self.index < self.tokens.len() - 1 && self.tokens[self.index].kind.is_skippable() {
            self.index += 1;
        }
    }

    /// Advances past the next significant token and returns it.
    pub fn next_token(&mut self) -> &'src Token {
        self.skip();
        let tok = &self.tokens[self.index];
        if self.tokens[self.index].kind != TokenKind::Eof {
            self.index += 1;
        }
        tok
    }

    /// Peeks the next significant token without consuming it.
    pub fn peek_token(&mut self) -> &'src Token {
        self.skip();
        &self.tokens[self.index]
    }

    pub fn is_eof(&mut self) -> bool {
        self.skip();
        self.tokens[self.index].kind == TokenKind::Eof
    }

    fn top(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("frame stack never empty")
    }

    pub fn start_group(&mut self, kind: GroupKind) {
        self.skip();
        let start = self.tokens[self.index].span.start();
        let frame = self.top();
        assert!(frame.group.is_none(), "a frame may only start one group");
        frame.group = Some(ParseGroup::new(kind, start));
    }

    pub fn set_group_val(&mut self, key: &str, value: Value, token: Option<Token>) {
        let frame = self.top();
        frame.keys.insert(key.to_string(), value);
        if let Some(t) = token {
            frame.key_tokens.insert(key.to_string(), t);
        }
    }

    pub fn set_group_incomplete(&mut self) {
        self.top().incomplete = true;
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// The byte span from the top frame's start token up to (not including
    /// skippable tokens before) the current position; used by `HardErr` to
    /// report a diagnostic over the unmatched region.
    pub fn current_span(&self) -> Span {
        let frame = self.frames.last().expect("frame stack never empty");
        let mut start_idx = frame.start_index;
        while start_idx < self.tokens.len() - 1 && self.tokens[start_idx].kind.is_skippable() {
            start_idx += 1;
        }
        let start = self.tokens[start_idx].span.start();
        let end_idx = self.index.min(self.tokens.len() - 1);
        let end = self.tokens[end_idx].span.end();
        Span::new(start.min(end), end.max(start))
    }

    /// Runs `node` at the current position as a nested attempt: pushes a
    /// fresh frame, invokes its matcher, then either merges the frame into
    /// the parent on success or rewinds the index and discards it.
    pub fn attempt(&mut self, node: &dyn Node) -> Result<ParseOutcome, Aborted> {
        let start_idx = self.index;
        self.frames.push(Frame::new(start_idx));
        let result = node.try_match(self);
        match result {
            Ok(true) => {
                self.merge_top_into_parent();
                if self.index == start_idx {
                    Ok(ParseOutcome::Empty)
                } else {
                    Ok(ParseOutcome::Success)
                }
            }
            Ok(false) => {
                self.frames.pop();
                self.index = start_idx;
                Ok(ParseOutcome::Failure)
            }
            Err(Aborted) => {
                self.frames.pop();
                self.index = start_idx;
                Err(Aborted)
            }
        }
    }

    fn merge_top_into_parent(&mut self) {
        let finished = self.frames.pop().expect("pushed before merge");
        let end_idx = self.index.saturating_sub(1).min(self.tokens.len() - 1);
        let end = self.tokens[end_idx].span.end();

        if let Some(mut group) = finished.group {
            for (k, v) in finished.keys {
                group.keys.insert(k, v);
            }
            for (k, t) in finished.key_tokens {
                group.key_tokens.insert(k, t);
            }
            group.children = finished.children;
            group.span = Span::new(group.span.start(), end.max(group.span.start()));
            group.incomplete = finished.incomplete;
            self.top().children.push(group);
        } else {
            let parent = self.top();
            parent.keys.extend(finished.keys);
            parent.key_tokens.extend(finished.key_tokens);
            parent.children.extend(finished.children);
            parent.incomplete |= finished.incomplete;
        }
    }

    /// Runs a full grammar over the whole cursor and returns the resulting
    /// top-level group (if the grammar produced one) and the collected
    /// diagnostics regardless of outcome.
    pub fn run(mut self, root: &dyn Node) -> (Option<ParseGroup>, Vec<Diagnostic>) {
        let group = match self.attempt(root) {
            Ok(outcome) if outcome.succeeded() => self.frames[0].children.pop(),
            _ => None,
        };
        (group, self.diagnostics)
    }
}

/// Anything that can attempt to match at the cursor's current position.
/// Implementors should treat failure as "no input consumed beyond what the
/// cursor's backtracking already undoes" — i.e. don't hand-roll index
/// rewinding, let [`Cursor::attempt`] do it.
pub trait Node {
    fn try_match(&self, cur: &mut Cursor) -> StepResult;
}

pub use combinators::*;
