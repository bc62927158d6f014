//! # blu-lsp
//!
//! The thin `tower-lsp` adapter: wires the transport-agnostic request
//! handlers in `blu::lsp` to `tower_lsp`'s `LspService`/`Server` over
//! stdio. Everything here is plumbing; the actual hover/completion/code
//! action/etc. logic lives in the library and is exercised directly by
//! its own unit tests.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tower_lsp::jsonrpc::{Error as RpcError, Result as RpcResult};
use tower_lsp::lsp_types::{
    CodeAction, CodeActionKind, CodeActionOrCommand, CodeActionParams, CodeActionProviderCapability,
    CodeActionResponse, CompletionItem as LspCompletionItem, CompletionItemKind, CompletionOptions,
    CompletionParams, CompletionResponse, Diagnostic as LspDiagnostic, DiagnosticRelatedInformation,
    DiagnosticSeverity, DiagnosticTag, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DocumentFormattingParams, DocumentSymbol as LspDocumentSymbol,
    DocumentSymbolParams, DocumentSymbolResponse, GotoDefinitionParams, GotoDefinitionResponse, Hover,
    HoverContents, HoverParams, HoverProviderCapability, InitializeParams, InitializeResult,
    InitializedParams, InsertTextFormat, Location, MarkedString, OneOf, Position as LspPosition,
    Range as LspRange, SemanticToken as LspSemanticToken, SemanticTokenType, SemanticTokensFullOptions,
    SemanticTokensLegend, SemanticTokensOptions, SemanticTokensParams, SemanticTokensResult,
    SemanticTokensServerCapabilities, ServerCapabilities, ServerInfo, SymbolKind as LspSymbolKind,
    TextDocumentContentChangeEvent, TextDocumentIdentifier, TextDocumentSyncCapability,
    TextDocumentSyncKind, TextEdit as LspTextEdit, Url, WorkspaceEdit,
};
use tower_lsp::{async_trait, Client, LanguageServer, LspService, Server};

use blu::ast::{DocumentSymbol as BluDocumentSymbol, SymbolKind as BluSymbolKind};
use blu::completion::{complete, CompletionItem as BluCompletionItem, CompletionKind};
use blu::config::SearchConfig;
use blu::diagnostics::{Diagnostic as BluDiagnostic, Severity as BluSeverity, Tag as BluTag};
use blu::idr::IdrCache;
use blu::lsp::{
    byte_offset, code_actions, compile as compile_request, definition as definition_request,
    hover as hover_request, position, semantic_tokens, Change, DocumentStore, Position as BluPosition,
    Range as BluRange, SEMANTIC_TOKEN_TYPES,
};

/// `LanguageServer` requires `Send + Sync + 'static`: `async_trait` boxes
/// the handler futures as `Send`, since `tower-lsp` may hand them to a
/// multi-threaded executor. Every field below (`DocumentStore`'s `Rc<IdrCache>`
/// and `DashMap`, in turn holding `Document`s full of `Rc`s) is deliberately
/// built for the single-threaded compiler described in the core (no request
/// concurrency, one document store mutated without locks). This process
/// only ever runs a current-thread Tokio runtime (see `main`), so `Backend`
/// is in practice touched from exactly one OS thread at a time; the unsafe
/// impls below assert that invariant to the type system.
struct Backend {
    client: Client,
    documents: DocumentStore,
}

unsafe impl Send for Backend {}
unsafe impl Sync for Backend {}

impl Backend {
    async fn publish(&self, uri: &Url) {
        let Some(entry) = self.documents.get(uri.as_str()) else { return };
        let diags = lsp_diagnostics(uri, entry.text(), &entry.doc.diagnostics.diagnostics);
        let version = entry.version;
        drop(entry);
        self.client.publish_diagnostics(uri.clone(), diags, Some(version)).await;
    }

    async fn blueprint_compile(&self, params: CompileParams) -> RpcResult<CompileResult> {
        let entry = self.documents.get(params.text_document.uri.as_str()).ok_or_else(RpcError::invalid_params)?;
        match compile_request(&entry.doc) {
            Ok(xml) => Ok(CompileResult { xml }),
            Err(_) => Err(RpcError::invalid_request()),
        }
    }

    async fn blueprint_decompile(&self, _params: DecompileParams) -> RpcResult<DecompileResult> {
        // The decompiler (XML -> source) is explicitly out of scope.
        Err(RpcError::method_not_found())
    }
}

#[derive(Deserialize)]
struct CompileParams {
    text_document: TextDocumentIdentifier,
}

#[derive(Serialize)]
struct CompileResult {
    xml: String,
}

#[derive(Deserialize)]
struct DecompileParams {
    #[allow(dead_code)]
    text_document: TextDocumentIdentifier,
}

#[derive(Serialize)]
struct DecompileResult {
    blp: String,
}

#[async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _: InitializeParams) -> RpcResult<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::INCREMENTAL)),
                completion_provider: Some(CompletionOptions::default()),
                code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                definition_provider: Some(OneOf::Left(true)),
                document_formatting_provider: Some(OneOf::Left(true)),
                semantic_tokens_provider: Some(SemanticTokensServerCapabilities::SemanticTokensOptions(
                    SemanticTokensOptions {
                        legend: SemanticTokensLegend {
                            token_types: SEMANTIC_TOKEN_TYPES.iter().map(|t| SemanticTokenType::new(t)).collect(),
                            token_modifiers: Vec::new(),
                        },
                        full: Some(SemanticTokensFullOptions::Bool(true)),
                        ..Default::default()
                    },
                )),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo { name: "blu-lsp".into(), version: Some(env!("CARGO_PKG_VERSION").into()) }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client.log_message(tower_lsp::lsp_types::MessageType::INFO, "blu-lsp ready").await;
    }

    async fn shutdown(&self) -> RpcResult<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.open(uri.as_str(), params.text_document.text, params.text_document.version);
        self.publish(&uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let changes = params
            .content_changes
            .into_iter()
            .map(|c: TextDocumentContentChangeEvent| Change { range: c.range.map(to_blu_range), text: c.text })
            .collect();
        self.documents.change(uri.as_str(), changes, params.text_document.version);
        self.publish(&uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.close(uri.as_str());
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn hover(&self, params: HoverParams) -> RpcResult<Option<Hover>> {
        let pos = params.text_document_position_params.position;
        let uri = params.text_document_position_params.text_document.uri;
        let Some(entry) = self.documents.get(uri.as_str()) else { return Ok(None) };
        let text = hover_request(&entry.doc, entry.text(), to_blu_pos(pos));
        Ok(text.map(|t| Hover { contents: HoverContents::Scalar(MarkedString::String(t)), range: None }))
    }

    async fn completion(&self, params: CompletionParams) -> RpcResult<Option<CompletionResponse>> {
        let pos = params.text_document_position.position;
        let uri = params.text_document_position.text_document.uri;
        let Some(entry) = self.documents.get(uri.as_str()) else { return Ok(None) };
        let items = complete(&entry.doc, entry.text(), to_blu_pos(pos));
        Ok(Some(CompletionResponse::Array(items.into_iter().map(to_lsp_completion).collect())))
    }

    async fn code_action(&self, params: CodeActionParams) -> RpcResult<Option<CodeActionResponse>> {
        let uri = params.text_document.uri;
        let Some(entry) = self.documents.get(uri.as_str()) else { return Ok(None) };
        let query = to_blu_range(params.range);
        let actions = code_actions(&entry.doc, entry.text(), query);
        let response: CodeActionResponse = actions
            .into_iter()
            .map(|a| {
                let mut changes = HashMap::new();
                changes.insert(
                    uri.clone(),
                    vec![LspTextEdit { range: to_lsp_range(a.edit.range), new_text: a.edit.new_text }],
                );
                CodeActionOrCommand::CodeAction(CodeAction {
                    title: a.title,
                    kind: Some(CodeActionKind::QUICKFIX),
                    edit: Some(WorkspaceEdit { changes: Some(changes), ..Default::default() }),
                    ..Default::default()
                })
            })
            .collect();
        Ok(Some(response))
    }

    async fn document_symbol(&self, params: DocumentSymbolParams) -> RpcResult<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        let Some(entry) = self.documents.get(uri.as_str()) else { return Ok(None) };
        let text = entry.text();
        let syms = entry.doc.document_symbols().into_iter().map(|s| to_lsp_symbol(&s, text)).collect();
        Ok(Some(DocumentSymbolResponse::Nested(syms)))
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> RpcResult<Option<GotoDefinitionResponse>> {
        let pos = params.text_document_position_params.position;
        let uri = params.text_document_position_params.text_document.uri;
        let Some(entry) = self.documents.get(uri.as_str()) else { return Ok(None) };
        let range = definition_request(&entry.doc, entry.text(), to_blu_pos(pos));
        Ok(range.map(|r| GotoDefinitionResponse::Scalar(Location { uri: uri.clone(), range: to_lsp_range(r) })))
    }

    async fn semantic_tokens_full(&self, params: SemanticTokensParams) -> RpcResult<Option<SemanticTokensResult>> {
        let uri = params.text_document.uri;
        let Some(entry) = self.documents.get(uri.as_str()) else { return Ok(None) };
        let data = semantic_tokens(&entry.doc, entry.text())
            .into_iter()
            .map(|t| LspSemanticToken {
                delta_line: t.delta_line,
                delta_start: t.delta_start,
                length: t.length,
                token_type: t.token_type,
                token_modifiers_bitset: 0,
            })
            .collect();
        Ok(Some(SemanticTokensResult::Tokens(tower_lsp::lsp_types::SemanticTokens { result_id: None, data })))
    }

    async fn formatting(&self, _: DocumentFormattingParams) -> RpcResult<Option<Vec<LspTextEdit>>> {
        // No reformatting rules exist in this build; identity transform.
        Ok(Some(Vec::new()))
    }
}

fn to_blu_pos(p: LspPosition) -> BluPosition {
    BluPosition { line: p.line, character: p.character }
}

fn to_lsp_pos(p: BluPosition) -> LspPosition {
    LspPosition { line: p.line, character: p.character }
}

fn to_blu_range(r: LspRange) -> BluRange {
    BluRange { start: to_blu_pos(r.start), end: to_blu_pos(r.end) }
}

fn to_lsp_range(r: BluRange) -> LspRange {
    LspRange { start: to_lsp_pos(r.start), end: to_lsp_pos(r.end) }
}

fn span_range(text: &str, span: blu::token::Span) -> LspRange {
    LspRange { start: to_lsp_pos(position(text, span.start())), end: to_lsp_pos(position(text, span.end())) }
}

fn lsp_diagnostics(uri: &Url, text: &str, diagnostics: &[BluDiagnostic]) -> Vec<LspDiagnostic> {
    diagnostics
        .iter()
        .map(|d| {
            let severity = match d.severity {
                BluSeverity::Error => DiagnosticSeverity::ERROR,
                BluSeverity::Warning => DiagnosticSeverity::WARNING,
            };
            let tags: Vec<DiagnosticTag> = d
                .kind
                .tags()
                .iter()
                .map(|t| match t {
                    BluTag::Deprecated => DiagnosticTag::DEPRECATED,
                    BluTag::Unnecessary => DiagnosticTag::UNNECESSARY,
                })
                .collect();
            let mut message = d.message.clone();
            for hint in &d.hints {
                message.push('\n');
                message.push_str(hint);
            }
            let related_information = if d.related.is_empty() {
                None
            } else {
                Some(
                    d.related
                        .iter()
                        .map(|r| DiagnosticRelatedInformation {
                            location: Location { uri: uri.clone(), range: span_range(text, r.span) },
                            message: r.message.clone(),
                        })
                        .collect(),
                )
            };
            LspDiagnostic {
                range: span_range(text, d.span),
                severity: Some(severity),
                code: None,
                code_description: None,
                source: Some("blu".into()),
                message,
                related_information,
                tags: if tags.is_empty() { None } else { Some(tags) },
                data: None,
            }
        })
        .collect()
}

fn to_lsp_completion(item: BluCompletionItem) -> LspCompletionItem {
    let kind = match item.kind {
        CompletionKind::Keyword => CompletionItemKind::KEYWORD,
        CompletionKind::Class => CompletionItemKind::CLASS,
        CompletionKind::Property => CompletionItemKind::PROPERTY,
        CompletionKind::Signal => CompletionItemKind::EVENT,
        CompletionKind::EnumMember => CompletionItemKind::ENUM_MEMBER,
        CompletionKind::AccessibilityProp => CompletionItemKind::PROPERTY,
    };
    LspCompletionItem {
        label: item.label,
        kind: Some(kind),
        detail: item.detail,
        documentation: item
            .docs
            .map(|d| tower_lsp::lsp_types::Documentation::String(d)),
        insert_text: item.snippet.clone(),
        insert_text_format: item.snippet.as_ref().map(|_| InsertTextFormat::SNIPPET),
        sort_text: Some(item.sort_key),
        additional_text_edits: if item.additional_edits.is_empty() {
            None
        } else {
            Some(
                item.additional_edits
                    .into_iter()
                    .map(|e| LspTextEdit { range: to_lsp_range(e.range), new_text: e.new_text })
                    .collect(),
            )
        },
        ..Default::default()
    }
}

#[allow(deprecated)]
fn to_lsp_symbol(sym: &BluDocumentSymbol, text: &str) -> LspDocumentSymbol {
    let kind = match sym.kind {
        BluSymbolKind::Template => LspSymbolKind::CLASS,
        BluSymbolKind::Object => LspSymbolKind::OBJECT,
        BluSymbolKind::Property => LspSymbolKind::PROPERTY,
        BluSymbolKind::Signal => LspSymbolKind::EVENT,
    };
    let range = span_range(text, sym.span);
    LspDocumentSymbol {
        name: sym.name.clone(),
        detail: None,
        kind,
        tags: None,
        deprecated: None,
        range,
        selection_range: range,
        children: if sym.children.is_empty() {
            None
        } else {
            Some(sym.children.iter().map(|c| to_lsp_symbol(c, text)).collect())
        },
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(|client| {
        let idr = Rc::new(IdrCache::new(SearchConfig::from_env()));
        Backend { client, documents: DocumentStore::new(idr) }
    })
    .custom_method("textDocument/x-blueprint-compile", Backend::blueprint_compile)
    .custom_method("x-blueprint/decompile", Backend::blueprint_decompile)
    .finish();

    Server::new(stdin, stdout, socket).serve(service).await;
}
