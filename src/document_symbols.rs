use crate::utils::{field_range, line_range};
use color_eyre::{eyre::ContextCompat, Result};
use hl7_check::{
    message::{self, SegmentLine},
    SchemaRegistry,
};
use lsp_textdocument::TextDocuments;
use lsp_types::{DocumentSymbol, DocumentSymbolParams, SymbolKind};

pub fn handle_document_symbols_request(
    params: DocumentSymbolParams,
    documents: &TextDocuments,
    registry: &SchemaRegistry,
) -> Result<Vec<DocumentSymbol>> {
    let uri = params.text_document.uri;
    let text = documents
        .get_document_content(&uri, None)
        .wrap_err_with(|| format!("no document found for uri: {uri:?}"))?;

    Ok(segment_symbols(text, registry))
}

fn segment_symbols(text: &str, registry: &SchemaRegistry) -> Vec<DocumentSymbol> {
    let mut symbols = Vec::new();
    for line in message::segment_lines(text) {
        let id = message::segment_id(line.text);
        let range = line_range(&line);

        #[allow(deprecated)]
        let symbol = DocumentSymbol {
            name: id.to_string(),
            detail: registry.segment(id).map(|segment| segment.name.clone()),
            kind: SymbolKind::CLASS,
            tags: None,
            range,
            selection_range: field_range(&line, 0),
            children: Some(field_symbols(&line, registry)),
            deprecated: None,
        };
        symbols.push(symbol);
    }

    symbols
}

fn field_symbols(line: &SegmentLine<'_>, registry: &SchemaRegistry) -> Vec<DocumentSymbol> {
    let fields = message::fields(line.text);
    let id = fields[0];
    let definition = registry.segment(id);

    let mut symbols = Vec::new();
    for position in 1..fields.len() {
        let range = field_range(line, position);

        #[allow(deprecated)]
        let symbol = DocumentSymbol {
            name: format!("{id}.{position}"),
            detail: definition
                .and_then(|segment| segment.fields.get(position - 1))
                .map(|field| field.name.clone()),
            kind: SymbolKind::FIELD,
            tags: None,
            range,
            selection_range: range,
            children: None,
            deprecated: None,
        };
        symbols.push(symbol);
    }

    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_and_fields_become_symbols() {
        let registry = SchemaRegistry::fallback();
        let symbols = segment_symbols("MSH|^~\\&\n\nPID|1||123||DOE\nZZZ|a", &registry);

        let names: Vec<&str> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["MSH", "PID", "ZZZ"]);
        assert_eq!(symbols[1].detail.as_deref(), Some("Patient Identification"));
        assert_eq!(symbols[1].range.start.line, 2);
        assert_eq!(symbols[2].detail, None);

        let fields = symbols[1].children.as_ref().expect("PID has fields");
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[4].name, "PID.5");
        assert_eq!(fields[4].detail.as_deref(), Some("Patient Name"));

        let unknown = symbols[2].children.as_ref().expect("ZZZ has fields");
        assert_eq!(unknown[0].name, "ZZZ.1");
        assert_eq!(unknown[0].detail, None);
    }
}
