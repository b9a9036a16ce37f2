//! `stylepad compile`: one-shot compile through the same client the live
//! preview uses.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::compiler::engine::factory_for;
use crate::compiler::{CompileResult, CompilerClient, Diagnostic};
use crate::config::cfg;
use crate::log;

/// Compile `file` once. Output goes to `output` or stdout; a failed compile
/// is returned as an error carrying the diagnostic.
pub async fn compile_file(file: &Path, output: Option<&Path>) -> Result<()> {
    let config = cfg();
    let source =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let file = std::path::absolute(file)
        .with_context(|| format!("Invalid path: {}", file.display()))?;
    let cwd = file.parent().unwrap_or(config.get_root());

    let client = CompilerClient::new(factory_for(&config.compile, cwd), 1);
    let reply = match config.compile.timeout() {
        Some(limit) => tokio::time::timeout(limit, client.compile(source))
            .await
            .unwrap_or_else(|_| Ok(CompileResult::failure(Diagnostic::timeout(limit)))),
        None => client.compile(source).await,
    };
    client.dispose();

    match reply? {
        CompileResult::Success { output: css } => write_output(&css, output),
        CompileResult::Failure { diagnostic } => {
            bail!("{}\n{}", diagnostic.summary(), diagnostic.message.trim_end())
        }
    }
}

fn write_output(css: &str, output: Option<&Path>) -> Result<()> {
    let Some(path) = output else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(css.as_bytes())?;
        if !css.ends_with('\n') {
            writeln!(stdout)?;
        }
        return Ok(());
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, css).with_context(|| format!("Failed to write {}", path.display()))?;
    log!("compile"; "wrote {}", path.display());
    Ok(())
}
