use color_eyre::{eyre::ContextCompat, Result};
use hl7_check::{message, SchemaRegistry};
use lsp_textdocument::TextDocuments;
use lsp_types::{
    CompletionItem, CompletionItemKind, CompletionItemLabelDetails, CompletionParams,
    CompletionResponse,
};

pub fn handle_completion_request(
    params: CompletionParams,
    documents: &TextDocuments,
    registry: &SchemaRegistry,
) -> Result<CompletionResponse> {
    let uri = params.text_document_position.text_document.uri;
    let text = documents
        .get_document_content(&uri, None)
        .wrap_err_with(|| format!("no document found for uri: {:?}", uri))?;
    let position = params.text_document_position.position;

    Ok(CompletionResponse::Array(completions(
        text,
        position.line as usize,
        position.character as usize,
        registry,
    )))
}

fn completions(
    text: &str,
    line: usize,
    column: usize,
    registry: &SchemaRegistry,
) -> Vec<CompletionItem> {
    let mut completions = Vec::new();

    if let Some(values) = table_values_at(text, line, column, registry) {
        completions.extend(values.map(|(code, label)| CompletionItem {
            label: code.clone(),
            label_details: Some(CompletionItemLabelDetails {
                detail: Some(format!(" {label}")),
                description: None,
            }),
            kind: Some(CompletionItemKind::VALUE),
            ..Default::default()
        }));
    }

    if completions.is_empty() && column < 3 {
        completions.extend(registry.segment_ids().into_iter().map(|id| CompletionItem {
            label: id.to_string(),
            detail: registry.segment(id).map(|segment| segment.name.clone()),
            kind: Some(CompletionItemKind::CLASS),
            ..Default::default()
        }));
    }

    completions
}

/// Codes of the table behind the field at the cursor, if it has one.
fn table_values_at<'r>(
    text: &str,
    line: usize,
    column: usize,
    registry: &'r SchemaRegistry,
) -> Option<impl Iterator<Item = (&'r String, &'r String)>> {
    let cursor = message::locate(text, line, column)?;
    let lines = message::split(text);
    let segment = registry.segment(message::segment_id(lines.get(cursor.line)?))?;
    let field = segment.fields.get(cursor.field.checked_sub(1)?)?;
    let table = registry.table(field.table.as_deref()?)?;
    tracing::trace!(table = %table.id, "found field table values");
    Some(table.values.iter())
}
