//! In-process engine for plain CSS sources.
//!
//! Parses and re-prints the stylesheet with `lightningcss`. Useful when no
//! sass binary is installed and the document is already plain CSS.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

use super::{Engine, EngineFactory, EngineReply, OutputStyle, TransportError};

/// Status reported for parse and print errors (matches sass's data error).
const STATUS_INVALID: i32 = 65;

pub struct CssFactory {
    style: OutputStyle,
}

impl CssFactory {
    pub fn new(style: OutputStyle) -> Self {
        Self { style }
    }
}

impl EngineFactory for CssFactory {
    fn name(&self) -> &str {
        "lightningcss"
    }

    fn start(&self) -> Result<Box<dyn Engine>, TransportError> {
        Ok(Box::new(CssEngine { style: self.style }))
    }
}

pub struct CssEngine {
    style: OutputStyle,
}

impl Engine for CssEngine {
    fn compile(&mut self, source: &str) -> Result<EngineReply, TransportError> {
        let stylesheet = match StyleSheet::parse(source, ParserOptions::default()) {
            Ok(stylesheet) => stylesheet,
            Err(e) => {
                let message = match &e.loc {
                    // lightningcss lines are 0-based
                    Some(loc) => format!("{} at {}:{}", e.kind, loc.line + 1, loc.column),
                    None => e.kind.to_string(),
                };
                return Ok(EngineReply::new(STATUS_INVALID, message));
            }
        };

        let printed = stylesheet.to_css(PrinterOptions {
            minify: self.style == OutputStyle::Compressed,
            ..PrinterOptions::default()
        });
        Ok(match printed {
            Ok(result) => EngineReply::new(0, result.code),
            Err(e) => EngineReply::new(STATUS_INVALID, e.to_string()),
        })
    }
}
