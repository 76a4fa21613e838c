//! Front-end adapter.
//!
//! Parsing is delegated to `swc_ecma_parser` in TypeScript declaration mode. The
//! transformer never re-implements parsing: every rewrite it performs is followed by
//! a fresh `parse` of the rewritten text.

use crate::error::{Result, TransformError};
use dtsb_common::Span;
use swc_common::{BytePos, Spanned};
use swc_ecma_ast::{EsVersion, Module};
use swc_ecma_parser::lexer::Lexer;
use swc_ecma_parser::{Parser, StringInput, Syntax, TsSyntax};
use tracing::trace;

/// Offset of the first byte of a unit in parser positions.
///
/// Position 0 is reserved for dummy spans by the parser, so text starts at 1.
const START_POS: u32 = 1;

/// One parsed declaration file: its text, statements and position index.
pub struct DeclarationUnit {
    pub file_name: String,
    pub text: String,
    pub module: Module,
}

impl DeclarationUnit {
    /// Convert a parser span into a byte span into `self.text`.
    pub fn span(&self, span: swc_common::Span) -> Span {
        let start = span.lo.0.saturating_sub(START_POS);
        let end = span.hi.0.saturating_sub(START_POS).max(start);
        Span::new(start, end)
    }

    pub fn slice(&self, span: Span) -> &str {
        span.slice(&self.text)
    }
}

impl std::fmt::Debug for DeclarationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeclarationUnit")
            .field("file_name", &self.file_name)
            .field("statements", &self.module.body.len())
            .finish()
    }
}

/// Parse `text` as a TypeScript declaration file.
pub fn parse(file_name: &str, text: String) -> Result<DeclarationUnit> {
    let module = {
        let end = BytePos(START_POS + text.len() as u32);
        let input = StringInput::new(&text, BytePos(START_POS), end);
        let syntax = Syntax::Typescript(TsSyntax {
            dts: true,
            ..Default::default()
        });
        let lexer = Lexer::new(syntax, EsVersion::latest(), input, None);
        let mut parser = Parser::new_from(lexer);

        let result = parser.parse_module();
        let recovered = parser.take_errors();
        let module = result.map_err(|err| parse_error(err.span(), err.kind().msg().to_string()))?;
        if let Some(err) = recovered.into_iter().next() {
            return Err(parse_error(err.span(), err.kind().msg().to_string()));
        }
        module
    };

    trace!(file = file_name, statements = module.body.len(), "parsed declaration unit");
    Ok(DeclarationUnit {
        file_name: file_name.to_string(),
        text,
        module,
    })
}

fn parse_error(span: swc_common::Span, message: String) -> TransformError {
    let start = span.lo.0.saturating_sub(START_POS);
    let end = span.hi.0.saturating_sub(START_POS).max(start);
    TransformError::Parse {
        span: Span::new(start, end),
        message,
    }
}
