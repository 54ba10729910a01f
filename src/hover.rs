use crate::utils::field_range;
use color_eyre::{eyre::ContextCompat, Result};
use hl7_check::{
    field_info::{resolve_field, FieldInfo},
    message, SchemaRegistry,
};
use lsp_textdocument::TextDocuments;
use lsp_types::{Hover, HoverContents, HoverParams, MarkedString};

pub fn handle_hover_request(
    params: HoverParams,
    documents: &TextDocuments,
    registry: &SchemaRegistry,
) -> Result<Option<Hover>> {
    let uri = params.text_document_position_params.text_document.uri;
    let text = documents
        .get_document_content(&uri, None)
        .wrap_err_with(|| format!("no document found for uri: {:?}", uri))?;
    let position = params.text_document_position_params.position;

    let Some(cursor) = message::locate(text, position.line as usize, position.character as usize)
    else {
        return Ok(None);
    };
    let lines = message::segment_lines(text);
    let texts: Vec<&str> = lines.iter().map(|line| line.text).collect();
    let Some(info) = resolve_field(&texts, cursor.line, cursor.field, registry) else {
        tracing::trace!(?cursor, "nothing to describe");
        return Ok(None);
    };

    Ok(Some(Hover {
        contents: HoverContents::Scalar(MarkedString::from_markdown(describe(&info, registry))),
        range: Some(field_range(&lines[cursor.line], cursor.field)),
    }))
}

/// Render a resolved field as markdown.
pub fn describe(info: &FieldInfo, registry: &SchemaRegistry) -> String {
    let mut text = format!("`{}-{}` **{}**", info.segment, info.field, info.name);
    if !info.description.is_empty() {
        text.push_str(format!("\n\n{}", info.description).as_str());
    }

    let required = if info.required { "yes" } else { "no" };
    text.push_str(format!("\n\n- Required: {required}").as_str());

    match registry.data_type(&info.data_type) {
        Some(data_type) => {
            let header = format!("\n- Data type: `{}` ({})", data_type.id, data_type.name);
            text.push_str(&header);
            if !data_type.description.is_empty() {
                text.push_str(format!(": {}", data_type.description).as_str());
            }
            let components: Vec<String> = data_type
                .components
                .iter()
                .enumerate()
                .map(|(i, component)| {
                    format!("\n    {}. {} (`{}`)", i + 1, component.name, component.data_type)
                })
                .collect();
            text.push_str(&components.join(""));
        }
        None if !info.data_type.is_empty() => {
            text.push_str(format!("\n- Data type: `{}`", info.data_type).as_str());
        }
        None => {}
    }

    if let Some(length) = info.length {
        text.push_str(format!("\n- Length: {length}").as_str());
    }

    if let Some(table) = &info.table {
        text.push_str(format!("\n- Table: `{table}`").as_str());
        if let Some(name) = registry.table(table).map(|t| t.name.as_str()) {
            text.push_str(format!(" ({name})").as_str());
        }
        if let Some(values) = &info.table_values {
            let values: Vec<String> = values
                .iter()
                .map(|(code, label)| format!("\n    - `{code}` {label}"))
                .collect();
            text.push_str(&values.join(""));
        }
    }

    if info.value.is_empty() {
        text.push_str("\n- Value: _empty_");
    } else {
        text.push_str(format!("\n- Value: `{}`", info.value).as_str());
    }

    if let Some(message) = &info.validation_message {
        text.push_str(format!("\n\n**{message}**").as_str());
    }

    text
}
