//! Diagnostics (C7): the accumulation, hinting, and code-action surface
//! shared by the parse-tree engine, AST validation, and the expression
//! sub-language.

use crate::token::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// The semantic error kind (§7), independent of severity: a `Deprecated`
/// diagnostic is a `Warning` that additionally carries the `Deprecated`
/// editor tag, `InternalInvariant` is an `Error` that additionally prints a
/// stack trace and a "please report" hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lex,
    Parse,
    UnresolvedReference,
    TypeMismatch,
    DuplicateDefinition,
    Deprecated,
    Unused,
    VersionMismatch,
    MissingNamespace,
    InternalInvariant,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::Deprecated | DiagnosticKind::Unused => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// LSP editor tags (`DiagnosticTag::DEPRECATED` / `::UNNECESSARY`).
    pub fn tags(self) -> &'static [Tag] {
        match self {
            DiagnosticKind::Deprecated => &[Tag::Deprecated],
            DiagnosticKind::Unused => &[Tag::Unnecessary],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Deprecated,
    Unnecessary,
}

/// An additional range the editor should highlight alongside the primary
/// one, e.g. the first definition when reporting a duplicate id.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedInfo {
    pub message: String,
    pub span: Span,
}

/// A single textual replacement, offered alongside a diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeAction {
    pub title: String,
    pub replace_with: String,
    /// The span to replace; defaults to the diagnostic's own span when `None`.
    pub span: Option<Span>,
}

impl CodeAction {
    pub fn new(title: impl Into<String>, replace_with: impl Into<String>) -> Self {
        CodeAction {
            title: title.into(),
            replace_with: replace_with.into(),
            span: None,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub span: Span,
    pub message: String,
    pub hints: Vec<String>,
    pub actions: Vec<CodeAction>,
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Diagnostic::of_kind(DiagnosticKind::Parse, message, span)
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            kind: DiagnosticKind::Parse,
            span,
            message: message.into(),
            hints: Vec::new(),
            actions: Vec::new(),
            related: Vec::new(),
        }
    }

    pub fn of_kind(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            severity: kind.severity(),
            kind,
            span,
            message: message.into(),
            hints: Vec::new(),
            actions: Vec::new(),
            related: Vec::new(),
        }
    }

    pub fn unresolved(message: impl Into<String>, span: Span) -> Self {
        Diagnostic::of_kind(DiagnosticKind::UnresolvedReference, message, span)
    }

    pub fn type_mismatch(message: impl Into<String>, span: Span) -> Self {
        Diagnostic::of_kind(DiagnosticKind::TypeMismatch, message, span)
    }

    pub fn duplicate(message: impl Into<String>, span: Span, first_definition: Span) -> Self {
        Diagnostic::of_kind(DiagnosticKind::DuplicateDefinition, message, span)
            .with_related("first defined here", first_definition)
    }

    pub fn deprecated(message: impl Into<String>, span: Span) -> Self {
        Diagnostic::of_kind(DiagnosticKind::Deprecated, message, span)
    }

    pub fn unused(message: impl Into<String>, span: Span) -> Self {
        Diagnostic::of_kind(DiagnosticKind::Unused, message, span)
    }

    pub fn version_mismatch(message: impl Into<String>, span: Span) -> Self {
        Diagnostic::of_kind(DiagnosticKind::VersionMismatch, message, span)
    }

    pub fn missing_namespace(message: impl Into<String>, span: Span) -> Self {
        Diagnostic::of_kind(DiagnosticKind::MissingNamespace, message, span)
    }

    /// An internal invariant violation: prints a stack trace and a
    /// "please report" hint rather than a normal user-facing message.
    pub fn compiler_bug(message: impl Into<String>, span: Span) -> Self {
        Diagnostic::of_kind(DiagnosticKind::InternalInvariant, message, span)
            .with_hint("this is a compiler bug, please report it")
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn with_action(mut self, action: CodeAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_related(mut self, message: impl Into<String>, span: Span) -> Self {
        self.related.push(RelatedInfo { message: message.into(), span });
        self
    }

    /// Appends "did you mean" hints/actions for `word` against `options`,
    /// exactly as the underscore/hyphen short-circuit then Levenshtein scan.
    pub fn did_you_mean(mut self, word: &str, options: &[&str]) -> Self {
        let hyphenated = word.replace('_', "-");
        if hyphenated != word && options.contains(&hyphenated.as_str()) {
            return self.with_hint(format!("use '-', not '_': `{hyphenated}`"));
        }
        match closest_match(word, options) {
            Some(recommend) => {
                if word.to_lowercase() == recommend.to_lowercase() {
                    self = self.with_hint(format!("Did you mean `{recommend}` (note the capitalization)?"));
                } else {
                    self = self.with_hint(format!("Did you mean `{recommend}`?"));
                }
                self.with_action(CodeAction::new(format!("Change to `{recommend}`"), recommend))
            }
            None => self
                .with_hint("Did you check your spelling?")
                .with_hint("Are your dependencies up to date?"),
        }
    }
}

/// Finds the closest option to `word` by Levenshtein distance (substitution
/// cost 2, or 1 when only casing differs) capped at a distance of 5.
pub fn closest_match<'a>(word: &str, options: &[&'a str]) -> Option<&'a str> {
    if options.is_empty() {
        return None;
    }
    options
        .iter()
        .map(|opt| (*opt, levenshtein(word, opt)))
        .min_by_key(|(_, dist)| *dist)
        .filter(|(_, dist)| *dist <= 5)
        .map(|(opt, _)| opt)
}

fn levenshtein(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());
    if m == 0 {
        return n as u32;
    }
    if n == 0 {
        return m as u32;
    }

    let mut dist = vec![vec![0u32; n]; m];
    for (i, row) in dist.iter_mut().enumerate() {
        row[0] = i as u32;
    }
    for j in 0..n {
        dist[0][j] = j as u32;
    }

    for j in 1..n {
        for i in 1..m {
            let cost = if a[i] == b[j] {
                0
            } else if a[i].to_lowercase().eq(b[j].to_lowercase()) {
                1
            } else {
                2
            };
            dist[i][j] = (dist[i - 1][j] + 2)
                .min(dist[i][j - 1] + 2)
                .min(dist[i - 1][j - 1] + cost);
        }
    }

    dist[m - 1][n - 1]
}

/// Collects diagnostics from one compile unit in encounter order; errors and
/// warnings live in the same bag so callers can sort by span once at the end.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticBag {
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn sorted_by_span(&self) -> Vec<&Diagnostic> {
        let mut v: Vec<&Diagnostic> = self.diagnostics.iter().collect();
        v.sort_by_key(|d| (d.span.start(), d.span.end()));
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscore_hyphen_short_circuit_beats_distance_scoring() {
        let d = Diagnostic::error("x", Span::new(0, 1)).did_you_mean("icon_name", &["icon-name", "label"]);
        assert_eq!(d.hints[0], "use '-', not '_': `icon-name`");
        assert!(d.actions.is_empty());
    }

    #[test]
    fn close_typo_recommends_and_offers_action() {
        let d = Diagnostic::error("x", Span::new(0, 1)).did_you_mean("labl", &["label", "icon-name"]);
        assert_eq!(d.hints[0], "Did you mean `label`?");
        assert_eq!(d.actions[0].replace_with, "label");
    }

    #[test]
    fn far_word_gets_generic_hints_and_no_action() {
        let d = Diagnostic::error("x", Span::new(0, 1)).did_you_mean("zzzzzzzzzz", &["label"]);
        assert!(d.actions.is_empty());
        assert!(d.hints.iter().any(|h| h.contains("spelling")));
    }

    #[test]
    fn case_only_difference_is_noted_distinctly() {
        let d = Diagnostic::error("x", Span::new(0, 1)).did_you_mean("Label", &["label"]);
        assert!(d.hints[0].contains("capitalization"));
    }
}
