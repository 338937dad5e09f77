use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

use uscope_core::model::{Declaration, SymbolKind, VariableSymbol};
use uscope_core::scope::scan_local_scope;
use uscope_core::{CompletionReply, DefinitionReply, SymbolEngine};

pub async fn complete(
    root: PathBuf,
    file: PathBuf,
    chain: String,
    line: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ready_engine(root).await?;
    let locals = locals_at(&file, line);
    let class = current_class(&file);

    match engine
        .query_completions(&chain, &locals, class.as_deref())
        .await
    {
        CompletionReply::Ready(decls) => {
            let items: Vec<_> = decls.iter().map(declaration_json).collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        CompletionReply::NotFound { name } => info!("no symbol named `{name}`"),
        CompletionReply::Pending { request_id } => {
            info!("engine busy; request {request_id} deferred")
        }
    }
    Ok(())
}

pub async fn definition(
    root: PathBuf,
    file: PathBuf,
    chain: String,
    line: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ready_engine(root).await?;
    let locals = locals_at(&file, line);
    let class = current_class(&file);

    match engine
        .query_definition(&chain, &locals, class.as_deref())
        .await
    {
        DefinitionReply::Found(decl) => {
            println!("{}", serde_json::to_string_pretty(&declaration_json(&decl))?);
        }
        DefinitionReply::NotFound { name } => info!("no symbol named `{name}`"),
        DefinitionReply::Pending { request_id } => {
            info!("engine busy; request {request_id} deferred")
        }
    }
    Ok(())
}

async fn ready_engine(root: PathBuf) -> Result<SymbolEngine, Box<dyn std::error::Error>> {
    let engine = SymbolEngine::new(vec![root]);
    engine.begin_collection().await?;
    Ok(engine)
}

/// The current class is named by the file the cursor is in.
fn current_class(file: &Path) -> Option<String> {
    file.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// Locals and parameters visible at the cursor line, scanned from the file
/// text above it. Without a line there is no local scope.
fn locals_at(file: &Path, line: Option<usize>) -> Vec<VariableSymbol> {
    let Some(line) = line else {
        return Vec::new();
    };
    let Ok(text) = std::fs::read_to_string(file) else {
        return Vec::new();
    };
    let prefix: String = text
        .lines()
        .take(line.saturating_sub(1))
        .map(|l| format!("{l}\n"))
        .collect();
    scan_local_scope(&prefix)
}

fn declaration_json(decl: &Declaration) -> serde_json::Value {
    let kind = match decl.kind {
        SymbolKind::Class => "class",
        SymbolKind::Variable => "variable",
        SymbolKind::Function => "function",
        SymbolKind::Local => "local",
        SymbolKind::Parameter => "parameter",
    };
    json!({
        "name": decl.name,
        "kind": kind,
        "type": decl.type_name,
        "file": decl.file.display().to_string(),
        "line": decl.line,
        "doc": decl.doc,
    })
}
