use cli::{Cli, Commands};
use color_eyre::eyre::Context;
use color_eyre::Result;
use crossbeam_channel::select;
use hl7_check::config::{Config, RegistryOverrides, RegistrySettings};
use hl7_check::registry::{RegistryLoad, RegistryStatus};
use hl7_check::{validate, SchemaRegistry};
use lsp_server::{Connection, ExtractError, Message, Request, RequestId};
use lsp_textdocument::TextDocuments;
use lsp_types::notification::{
    self, DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument, LogMessage,
    Notification,
};
use lsp_types::request::{Completion, DocumentSymbolRequest, HoverRequest};
use lsp_types::{
    ClientCapabilities, CompletionOptions, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, HoverProviderCapability, LogMessageParams, MessageType, OneOf,
    PositionEncodingKind, TextDocumentSyncCapability, TextDocumentSyncKind, Uri, WorkspaceFolder,
};
use lsp_types::{InitializeParams, ServerCapabilities};
use std::fs::{self};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::instrument;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{filter, prelude::*, Registry};
use utils::build_response;

mod check;
mod cli;
mod completion;
mod diagnostics;
mod document_symbols;
mod hover;
mod utils;

fn setup_logging(cli: &Cli) -> Result<()> {
    let use_colours = match (cli.colour, &cli.command) {
        (clap::ColorChoice::Never, _) => false,
        (clap::ColorChoice::Always, _) => true,
        (_, Some(Commands::LogToFile { .. })) => false,
        (_, _) => std::io::stderr().is_terminal(),
    };

    color_eyre::config::HookBuilder::new()
        .theme(if use_colours {
            color_eyre::config::Theme::dark()
        } else {
            color_eyre::config::Theme::new()
        })
        .install()
        .wrap_err("Failed to install `color_eyre`")?;

    let log_level = match cli.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let log_file = match cli.command {
        Some(Commands::LogToFile { ref log_file }) => Some(log_file),
        _ => None,
    };

    let logs_filter = move |metadata: &tracing::Metadata<'_>| {
        metadata.target().starts_with("hl7_check") && *metadata.level() <= log_level
    };

    let stderr_log = if log_file.is_none() {
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(use_colours)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .with_filter(filter::filter_fn(logs_filter)),
        )
    } else {
        None
    };

    let file_log = if let Some(log_file) = log_file {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .wrap_err_with(|| format!("Failed to open log file: {log_file:?}"))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(use_colours)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_target(false)
                .with_level(true)
                .with_writer(file)
                .with_filter(filter::filter_fn(logs_filter)),
        )
    } else {
        None
    };

    Registry::default().with(stderr_log).with(file_log).init();
    Ok(())
}

/// Work out where the registry comes from: an explicit config file, or the
/// first `hl7-check.toml` in `folders`, overridden by the command line.
fn registry_settings<P: AsRef<Path>>(
    overrides: &RegistryOverrides,
    config: Option<&Path>,
    folders: &[P],
) -> Result<RegistrySettings> {
    let config = match config {
        Some(path) => Some(Config::load(path).wrap_err("Failed to load configuration")?),
        None => Config::discover(folders).wrap_err("Failed to load configuration")?,
    };
    let settings = RegistrySettings::resolve(overrides, config.as_ref().map(|c| &c.registry));
    tracing::debug!(?settings, "registry settings");
    Ok(settings)
}

fn load_registry(overrides: &RegistryOverrides, config: Option<&Path>) -> Result<SchemaRegistry> {
    let cwd = std::env::current_dir().wrap_err("Failed to get current directory")?;
    let RegistryLoad { registry, report } = registry_settings(overrides, config, &[cwd])?.load();
    match report.status() {
        RegistryStatus::Loaded => tracing::info!("{report}"),
        RegistryStatus::FallbackEngaged { .. } => tracing::warn!("{report}"),
    }
    Ok(registry)
}

fn main() -> Result<()> {
    let cli = cli::cli();
    setup_logging(&cli).wrap_err_with(|| "Failed to setup logging")?;
    let overrides = cli.registry_overrides();

    match cli.command {
        Some(Commands::Check { ref files, format }) => {
            let registry = load_registry(&overrides, cli.config.as_deref())?;
            let ok = check::check_files(&mut std::io::stdout().lock(), files, format, &registry)?;
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Commands::Inspect {
            ref file,
            line,
            field,
        }) => {
            let registry = load_registry(&overrides, cli.config.as_deref())?;
            let found =
                check::inspect_field(&mut std::io::stdout().lock(), file, line, field, &registry)?;
            if !found {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Commands::LogToStderr) | Some(Commands::LogToFile { .. }) | None => {
            run_server(overrides, cli.config)
        }
    }
}

fn run_server(overrides: RegistryOverrides, config: Option<PathBuf>) -> Result<()> {
    let initial_span = tracing::info_span!("initialise");
    let _initial_span_guard = initial_span.enter();
    tracing::info!("Starting HL7 check language server");
    let (connection, io_threads) = Connection::stdio();

    let (id, params) = connection.initialize_start()?;
    let init_params: InitializeParams =
        serde_json::from_value(params).wrap_err("Failed to parse initialize params")?;
    tracing::info!(client_info = ?init_params.client_info, "client connected");
    tracing::debug!(?init_params.workspace_folders, "workspace folders");
    let client_capabilities = init_params.capabilities;
    let workspace_folders = init_params.workspace_folders;

    let client_supports_utf8_positions = client_capabilities
        .general
        .as_ref()
        .and_then(|g| g.position_encodings.as_ref())
        .map(|p| p.contains(&PositionEncodingKind::UTF8))
        .unwrap_or(false);
    let encoding = if client_supports_utf8_positions {
        PositionEncodingKind::UTF8
    } else {
        tracing::warn!(
            "Client does not support UTF-8 position encoding, unicode stuff will probably be broken"
        );
        PositionEncodingKind::UTF16
    };

    let server_capabilities = serde_json::to_value(&ServerCapabilities {
        position_encoding: Some(encoding),
        text_document_sync: Some(TextDocumentSyncCapability::Kind(
            TextDocumentSyncKind::INCREMENTAL,
        )),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        document_symbol_provider: Some(OneOf::Right(lsp_types::DocumentSymbolOptions {
            label: Some("HL7 Message".to_string()),
            work_done_progress_options: Default::default(),
        })),
        completion_provider: Some(CompletionOptions {
            trigger_characters: Some(vec!["|".to_string()]),
            ..Default::default()
        }),
        ..Default::default()
    })
    .wrap_err("Failed to serialize server capabilities")?;

    let initialize_data = serde_json::json!({
        "capabilities": server_capabilities,
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        }
    });

    connection
        .initialize_finish(id, initialize_data)
        .wrap_err_with(|| "Failed to finish LSP initialisation")?;
    drop(_initial_span_guard);

    main_loop(
        &connection,
        client_capabilities,
        workspace_folders,
        overrides,
        config,
    )?;
    drop(connection);
    io_threads.join()?;

    // Shut down gracefully.
    tracing::info!("Shutting down\n");
    Ok(())
}

fn send_log_message<S: ToString>(
    connection: &Connection,
    message_type: MessageType,
    message: S,
) -> Result<()> {
    connection
        .sender
        .send(Message::Notification(lsp_server::Notification::new(
            LogMessage::METHOD.to_string(),
            LogMessageParams {
                typ: message_type,
                message: message.to_string(),
            },
        )))
        .wrap_err_with(|| "Failed to send log message")
}

/// The registry requests are answered from.
///
/// Until the configured registry has loaded, hover and completion use the
/// built-in definitions and diagnostics are held back.
struct Registries {
    fallback: SchemaRegistry,
    loaded: Option<SchemaRegistry>,
}

impl Registries {
    fn current(&self) -> &SchemaRegistry {
        self.loaded.as_ref().unwrap_or(&self.fallback)
    }
}

#[instrument(
    level = "debug",
    skip(connection, client_capabilities, workspace_folders, overrides, config)
)]
fn main_loop(
    connection: &Connection,
    client_capabilities: ClientCapabilities,
    workspace_folders: Option<Vec<WorkspaceFolder>>,
    overrides: RegistryOverrides,
    config: Option<PathBuf>,
) -> Result<()> {
    let mut documents = TextDocuments::new();

    let diagnostics_enabled = client_capabilities
        .text_document
        .as_ref()
        .map(|tdc| tdc.publish_diagnostics.is_some())
        .unwrap_or(false);
    tracing::debug!("diagnostics enabled: {diagnostics_enabled}");

    let folders: Vec<PathBuf> = workspace_folders
        .unwrap_or_default()
        .into_iter()
        .map(|folder| PathBuf::from(folder.uri.path().as_str()))
        .filter(|path| path.is_dir())
        .collect();
    let settings = match registry_settings(&overrides, config.as_deref(), &folders) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("{e:?}");
            send_log_message(connection, MessageType::ERROR, format!("{e:#}"))?;
            RegistrySettings::resolve(&overrides, None)
        }
    };

    let (registry_tx, registry_rx) = crossbeam_channel::bounded(1);
    let never = crossbeam_channel::never();
    std::thread::spawn(move || {
        let load_registry_span = tracing::info_span!("load_registry");
        let _load_registry_span_guard = load_registry_span.enter();
        if registry_tx.send(settings.load()).is_err() {
            tracing::debug!("server stopped before the registry loaded");
        }
    });

    let mut registries = Registries {
        fallback: SchemaRegistry::fallback(),
        loaded: None,
    };

    tracing::debug!("starting main loop");
    loop {
        let pending_registry = if registries.loaded.is_none() {
            &registry_rx
        } else {
            &never
        };
        select! {
            recv(&connection.receiver) -> msg => {
                let Ok(msg) = msg else {
                    break;
                };
                let shutdown = handle_msg(
                    msg,
                    connection,
                    &mut documents,
                    &registries,
                    diagnostics_enabled,
                )
                .wrap_err_with(|| "Failed to handle message")?;
                if shutdown {
                    break;
                }
            }
            recv(pending_registry) -> load => {
                let Ok(RegistryLoad { registry, report }) = load else {
                    tracing::error!("registry loader stopped without a result");
                    registries.loaded = Some(registries.fallback.clone());
                    continue;
                };

                let message_type = match report.status() {
                    RegistryStatus::Loaded => {
                        tracing::info!("{report}");
                        MessageType::INFO
                    }
                    RegistryStatus::FallbackEngaged { .. } => {
                        tracing::warn!("{report}");
                        MessageType::WARNING
                    }
                };
                send_log_message(connection, message_type, &report)?;
                registries.loaded = Some(registry);

                if diagnostics_enabled {
                    for (uri, document) in documents.documents() {
                        handle_diagnostics(
                            connection,
                            uri,
                            Some(document.version()),
                            &documents,
                            &registries,
                        );
                    }
                }
            }
        }
    }

    Ok(())
}

fn document_uri<P: serde::de::DeserializeOwned>(
    params: &serde_json::Value,
    uri: impl FnOnce(P) -> (Uri, Option<i32>),
) -> Option<(Uri, Option<i32>)> {
    match serde_json::from_value(params.clone()) {
        Ok(params) => Some(uri(params)),
        Err(e) => {
            tracing::warn!("Failed to parse notification params: {e:?}");
            None
        }
    }
}

/// Returns `true` once the client has asked the server to shut down.
fn handle_msg(
    msg: Message,
    connection: &Connection,
    documents: &mut TextDocuments,
    registries: &Registries,
    diagnostics_enabled: bool,
) -> Result<bool> {
    match msg {
        Message::Request(req) => {
            let request_span = tracing::debug_span!("request", method = ?req.method, id = ?req.id);
            let _request_span_guard = request_span.enter();

            if connection.handle_shutdown(&req)? {
                return Ok(true);
            }

            let registry = registries.current();
            if let Some(req) = handle_hover_req(req, documents, registry, connection)
                .and_then(|req| handle_document_symbols_req(req, documents, registry, connection))
                .and_then(|req| handle_completion_request(req, documents, registry, connection))
            {
                tracing::warn!("unhandled request: {req:?}");
            }
        }
        Message::Response(resp) => {
            tracing::warn!(response = ?resp, "got response from server??");
        }
        Message::Notification(not) => {
            let notification_span = tracing::debug_span!("notification", method = ?not.method);
            let _notification_span_guard = notification_span.enter();

            if documents.listen(not.method.as_str(), &not.params) {
                if !diagnostics_enabled {
                    return Ok(false);
                }

                let diagnostics_span = tracing::debug_span!("diagnostics");
                let _diagnostics_span_guard = diagnostics_span.enter();

                match not.method.as_str() {
                    <DidOpenTextDocument as notification::Notification>::METHOD => {
                        if let Some((uri, version)) =
                            document_uri(&not.params, |params: DidOpenTextDocumentParams| {
                                (params.text_document.uri, Some(params.text_document.version))
                            })
                        {
                            handle_diagnostics(connection, &uri, version, documents, registries);
                        }
                    }
                    <DidChangeTextDocument as notification::Notification>::METHOD => {
                        if let Some((uri, version)) =
                            document_uri(&not.params, |params: DidChangeTextDocumentParams| {
                                (params.text_document.uri, Some(params.text_document.version))
                            })
                        {
                            handle_diagnostics(connection, &uri, version, documents, registries);
                        }
                    }
                    <DidCloseTextDocument as notification::Notification>::METHOD => {
                        if let Some((uri, _)) =
                            document_uri(&not.params, |params: DidCloseTextDocumentParams| {
                                (params.text_document.uri, None)
                            })
                        {
                            diagnostics::clear_diagnostics(connection, uri);
                        }
                    }
                    _ => {}
                }
            } else {
                tracing::warn!("unhandled notification: {not:?}");
            }
        }
    }
    Ok(false)
}

/// Validate a document and publish its diagnostics.
///
/// Nothing is published until the configured registry has loaded; open
/// documents are revisited once it arrives.
#[instrument(level = "debug", skip(connection, documents, registries))]
fn handle_diagnostics(
    connection: &Connection,
    uri: &Uri,
    version: Option<i32>,
    documents: &TextDocuments,
    registries: &Registries,
) {
    let Some(registry) = registries.loaded.as_ref() else {
        tracing::debug!("registry not loaded yet, deferring diagnostics");
        return;
    };

    let Some(text) = documents.get_document_content(uri, None) else {
        diagnostics::clear_diagnostics(connection, uri.clone());
        return;
    };

    let validate_span = tracing::debug_span!("validate");
    let _validate_span_guard = validate_span.enter();
    let errors = validate(text, registry);
    let diagnostics = diagnostics::to_diagnostics(text, &errors);
    drop(_validate_span_guard);

    let publish_diagnostics_span = tracing::debug_span!("publish diagnostics");
    let _publish_diagnostics_span_guard = publish_diagnostics_span.enter();
    diagnostics::publish_diagnostics(connection, uri.clone(), diagnostics, version);
}

fn cast_request<R>(req: Request) -> Result<(RequestId, R::Params), ExtractError<Request>>
where
    R: lsp_types::request::Request,
    R::Params: serde::de::DeserializeOwned,
{
    req.extract(R::METHOD)
}

fn send_response(connection: &Connection, response: lsp_server::Response) {
    if let Err(e) = connection.sender.send(Message::Response(response)) {
        tracing::error!("Failed to send response: {e:?}");
    }
}

fn invalid_params(connection: &Connection, id: RequestId, error: serde_json::Error) {
    tracing::warn!("Invalid request params: {error:?}");
    send_response(
        connection,
        lsp_server::Response::new_err(
            id,
            lsp_server::ErrorCode::InvalidParams as i32,
            error.to_string(),
        ),
    );
}

fn handle_hover_req(
    req: Request,
    documents: &TextDocuments,
    registry: &SchemaRegistry,
    connection: &Connection,
) -> Option<Request> {
    let id = req.id.clone();
    match cast_request::<HoverRequest>(req) {
        Ok((_, params)) => {
            tracing::debug!("got Hover request");
            let resp = hover::handle_hover_request(params, documents, registry).map_err(|e| {
                tracing::warn!("Failed to handle hover request: {e:?}");
                e
            });
            send_response(connection, build_response(id, resp));
            None
        }
        Err(ExtractError::JsonError { method: _, error }) => {
            invalid_params(connection, id, error);
            None
        }
        Err(ExtractError::MethodMismatch(req)) => Some(req),
    }
}

fn handle_document_symbols_req(
    req: Request,
    documents: &TextDocuments,
    registry: &SchemaRegistry,
    connection: &Connection,
) -> Option<Request> {
    let id = req.id.clone();
    match cast_request::<DocumentSymbolRequest>(req) {
        Ok((_, params)) => {
            tracing::debug!("got DocumentSymbol request");
            let resp =
                document_symbols::handle_document_symbols_request(params, documents, registry)
                    .map_err(|e| {
                        tracing::warn!("Failed to handle document symbols request: {e:?}");
                        e
                    });
            send_response(connection, build_response(id, resp));
            None
        }
        Err(ExtractError::JsonError { method: _, error }) => {
            invalid_params(connection, id, error);
            None
        }
        Err(ExtractError::MethodMismatch(req)) => Some(req),
    }
}

fn handle_completion_request(
    req: Request,
    documents: &TextDocuments,
    registry: &SchemaRegistry,
    connection: &Connection,
) -> Option<Request> {
    let id = req.id.clone();
    match cast_request::<Completion>(req) {
        Ok((_, params)) => {
            tracing::debug!("got Completion request");
            let resp = completion::handle_completion_request(params, documents, registry)
                .map_err(|e| {
                    tracing::warn!("Failed to handle completion request: {e:?}");
                    e
                });
            send_response(connection, build_response(id, resp));
            None
        }
        Err(ExtractError::JsonError { method: _, error }) => {
            invalid_params(connection, id, error);
            None
        }
        Err(ExtractError::MethodMismatch(req)) => Some(req),
    }
}
