//! Lexparse MCP Server
//!
//! JSON-RPC over stdio, one message per line.
//!
//! Tools:
//! - analyze: Tokenize, parse and build the symbol table for one expression
//! - analyze_batch: Analyze a list of expressions with accepted/rejected totals
//! - analyze_file: Analyze every expression in a data-path file
//! - grammar: Describe the grammar and operator table
//!
//! Resources:
//! - lexparse://files/{name} - Expression files (.expr, .txt) in the data path

use lexparse::batch::{self, BatchEntry, ExpressionLine};
use lexparse::{Analyzer, AnalyzerConfig, Associativity, BinOp, Renderer};
use lexparse_core::LexparseError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const PROTOCOL_VERSION: &str = "2025-11-25";
const SERVER_NAME: &str = "lexparse";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const DATA_PATH_ENV: &str = "LEXPARSE_DATA_PATH";
const RESOURCE_PREFIX: &str = "lexparse://files/";

const GRAMMAR: &str = "\
expression  := addExpr
addExpr     := mulExpr (('+'|'-') mulExpr)*
mulExpr     := unaryExpr (('*'|'/'|'%') unaryExpr)*
unaryExpr   := ('-'|'+')? powerExpr
powerExpr   := primary ('^' unaryExpr)?
primary     := NUMBER | IDENTIFIER | '(' expression ')'";

const BINARY_OPERATORS: [BinOp; 6] = [
    BinOp::Add,
    BinOp::Sub,
    BinOp::Mul,
    BinOp::Div,
    BinOp::Rem,
    BinOp::Pow,
];

/// Get the data path from environment
fn data_path() -> PathBuf {
    env::var(DATA_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./data"))
}

#[derive(Debug, Serialize)]
struct ExprFileInfo {
    name: String,
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// List expression files directly under `dir`, sorted by name
fn list_expression_files(dir: &Path) -> Vec<ExprFileInfo> {
    let mut files = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return files;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !has_input_extension(&path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
            files.push(ExprFileInfo {
                name: name.to_string(),
                size: fs::metadata(&path).ok().map(|m| m.len()),
                description: extract_description(&path),
                path: path.clone(),
            });
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    files
}

fn has_input_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| batch::INPUT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// First line `# ...` comment of an expression file
fn extract_description(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let first_line = content.lines().next()?.trim();
    first_line.strip_prefix("# ").map(|d| d.to_string())
}

// MCP Protocol types
#[derive(Debug, Deserialize)]
struct McpRequest {
    jsonrpc: String,
    id: Option<JsonValue>,
    method: String,
    #[serde(default)]
    params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
struct McpResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<McpError>,
}

#[derive(Debug, Serialize)]
struct McpError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<JsonValue>,
}

impl McpError {
    const PARSE_ERROR: i32 = -32700;
    const INVALID_REQUEST: i32 = -32600;
    const METHOD_NOT_FOUND: i32 = -32601;
    const INVALID_PARAMS: i32 = -32602;
    const INTERNAL_ERROR: i32 = -32603;

    fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message)
    }

    fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<LexparseError> for McpError {
    fn from(e: LexparseError) -> Self {
        match e {
            LexparseError::Json(_) => McpError::new(McpError::INTERNAL_ERROR, e.to_string()),
            _ => McpError::invalid_params(e.to_string()),
        }
    }
}

impl McpResponse {
    fn new(id: Option<JsonValue>, result: Result<JsonValue, McpError>) -> Self {
        match result {
            Ok(r) => McpResponse { jsonrpc: "2.0".to_string(), id, result: Some(r), error: None },
            Err(e) => McpResponse { jsonrpc: "2.0".to_string(), id, result: None, error: Some(e) },
        }
    }
}

/// Shared state for request handling
struct Server {
    analyzer: Analyzer,
    renderer: Renderer,
    data_path: PathBuf,
}

impl Server {
    fn new(config: AnalyzerConfig, data_path: PathBuf) -> Self {
        Self {
            analyzer: Analyzer::with_config(config),
            renderer: Renderer::new(),
            data_path,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AnalyzerConfig::from_env().unwrap_or_else(|e| {
        warn!(error = %e, "invalid configuration, using defaults");
        AnalyzerConfig::default()
    });
    let server = Server::new(config, data_path());

    info!(version = SERVER_VERSION, protocol = PROTOCOL_VERSION, "Lexparse MCP Server started");
    info!(
        data_path = %server.data_path.display(),
        record_steps = server.analyzer.config().record_steps,
        max_input_chars = ?server.analyzer.config().max_input_chars,
        "configuration loaded"
    );

    let files = list_expression_files(&server.data_path);
    info!(count = files.len(), "expression files available");
    for f in &files {
        debug!(name = %f.name, description = ?f.description, "expression file");
    }

    let stdin = io::stdin();
    let mut reader = io::BufReader::new(stdin.lock());

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                info!("client disconnected (EOF)");
                break;
            }
            Ok(_) => {
                let Some(response) = handle_line(&server, &line) else {
                    continue;
                };
                if let Err(e) = write_response(&response) {
                    error!(error = %e, "error writing response");
                    break;
                }
            }
            Err(e) => {
                error!(error = %e, "error reading input");
                break;
            }
        }
    }

    info!("server shutting down");
}

/// Handle one input line; `None` for blank lines and notifications
fn handle_line(server: &Server, line: &str) -> Option<McpResponse> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    debug!(bytes = line.len(), "received message");

    let request: McpRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "error parsing request");
            return Some(McpResponse::new(
                None,
                Err(McpError::new(McpError::PARSE_ERROR, format!("Parse error: {}", e))),
            ));
        }
    };

    let response = handle_request(server, &request);

    // Notifications (no id) do not receive a response
    if request.id.is_none() {
        debug!(method = %request.method, "notification processed");
        return None;
    }
    Some(response)
}

fn write_response(response: &McpResponse) -> io::Result<()> {
    let response_json = serde_json::to_string(response).unwrap_or_else(|e| {
        error!(error = %e, "error serializing response");
        json!({
            "jsonrpc": "2.0",
            "id": response.id,
            "error": { "code": McpError::INTERNAL_ERROR, "message": "Internal error" }
        })
        .to_string()
    });
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", response_json)?;
    stdout.flush()
}

fn handle_request(server: &Server, request: &McpRequest) -> McpResponse {
    debug!(method = %request.method, "processing request");

    if request.jsonrpc != "2.0" {
        return McpResponse::new(
            request.id.clone(),
            Err(McpError::new(
                McpError::INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            )),
        );
    }

    let result = match request.method.as_str() {
        // Lifecycle
        "initialize" => handle_initialize(&request.params),
        "initialized" => Ok(json!({})),
        "ping" => Ok(json!({})),

        // Tools
        "tools/list" => handle_tools_list(),
        "tools/call" => handle_tool_call(server, &request.params),

        // Resources
        "resources/list" => handle_resources_list(server),
        "resources/read" => handle_resources_read(server, &request.params),

        _ => Err(McpError::new(
            McpError::METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        )),
    };

    McpResponse::new(request.id.clone(), result)
}

fn handle_initialize(params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let client_info = params.as_ref()
        .and_then(|p| p.get("clientInfo"))
        .and_then(|c| c.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("unknown");

    // Use client's protocol version for compatibility
    let client_protocol = params.as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(PROTOCOL_VERSION);

    info!(client = client_info, protocol = client_protocol, "client connected");

    Ok(json!({
        "protocolVersion": client_protocol,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "description": "Expression analyzer: tokens, symbol table and parse tree"
        },
        "capabilities": {
            "tools": {
                "listChanged": false
            },
            "resources": {
                "subscribe": false,
                "listChanged": false
            }
        },
        "instructions": "Use 'analyze' to tokenize and parse one arithmetic expression. Use 'analyze_batch' or 'analyze_file' for many expressions at once, and 'grammar' to see what the parser accepts."
    }))
}

fn handle_tools_list() -> Result<JsonValue, McpError> {
    Ok(json!({
        "tools": [
            {
                "name": "analyze",
                "description": "Analyze one expression. Returns tokens, symbol table, parse tree and diagnostics.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "expression": {
                            "type": "string",
                            "description": "Expression text, e.g. (a + b) * 2"
                        },
                        "steps": {
                            "type": "boolean",
                            "description": "Include the derivation trace (default: false)"
                        }
                    },
                    "required": ["expression"]
                }
            },
            {
                "name": "analyze_batch",
                "description": "Analyze several expressions and report accepted/rejected totals.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "expressions": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Expressions to analyze"
                        }
                    },
                    "required": ["expressions"]
                }
            },
            {
                "name": "analyze_file",
                "description": "Analyze every expression in a .expr or .txt file from the data directory.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "File name, with or without extension"
                        }
                    },
                    "required": ["name"]
                }
            },
            {
                "name": "grammar",
                "description": "Describe the accepted grammar and the operator table.",
                "inputSchema": {
                    "type": "object",
                    "properties": {}
                }
            }
        ]
    }))
}

fn handle_resources_list(server: &Server) -> Result<JsonValue, McpError> {
    let files = list_expression_files(&server.data_path);

    let resources: Vec<JsonValue> = files.iter().map(|f| {
        json!({
            "uri": format!("{}{}", RESOURCE_PREFIX, f.name),
            "name": f.name,
            "description": f.description.clone().unwrap_or_else(|| format!("Expression file: {}", f.name)),
            "mimeType": "text/plain"
        })
    }).collect();

    Ok(json!({ "resources": resources }))
}

fn handle_resources_read(server: &Server, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let uri = params.as_ref()
        .and_then(|p| p.get("uri"))
        .and_then(|u| u.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing uri parameter"))?;

    let name = uri.strip_prefix(RESOURCE_PREFIX).ok_or_else(|| {
        McpError::invalid_params(format!("Invalid URI: {}. Expected {}{{name}}", uri, RESOURCE_PREFIX))
    })?;

    let path = resolve_file(&server.data_path, name)?;
    let content = fs::read_to_string(&path)
        .map_err(|e| McpError::from(LexparseError::io(&path, e)))?;

    Ok(json!({
        "contents": [{
            "uri": uri,
            "mimeType": "text/plain",
            "text": content
        }]
    }))
}

/// Find `name` in the data path, trying the known extensions when it has none
fn resolve_file(dir: &Path, name: &str) -> Result<PathBuf, McpError> {
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(McpError::invalid_params(format!("Invalid file name: '{}'", name)));
    }

    let direct = dir.join(name);
    let mut candidates = Vec::new();
    if has_input_extension(&direct) {
        candidates.push(direct);
    } else {
        for ext in batch::INPUT_EXTENSIONS {
            candidates.push(dir.join(format!("{}.{}", name, ext)));
        }
    }

    candidates.into_iter().find(|p| p.is_file()).ok_or_else(|| {
        let available: Vec<String> = list_expression_files(dir).into_iter().map(|f| f.name).collect();
        McpError::invalid_params(format!("File '{}' not found", name))
            .with_data(json!({ "available": available }))
    })
}

fn handle_tool_call(server: &Server, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let params = params.as_ref().ok_or_else(|| McpError::invalid_params("Missing params"))?;

    let name = params.get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing tool name"))?;

    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    match name {
        "analyze" => tool_analyze(server, args),
        "analyze_batch" => tool_analyze_batch(server, args),
        "analyze_file" => tool_analyze_file(server, args),
        "grammar" => tool_grammar(),
        _ => Err(McpError::invalid_params(format!("Unknown tool: {}", name))),
    }
}

fn tool_analyze(server: &Server, args: JsonValue) -> Result<JsonValue, McpError> {
    let expression = args.get("expression")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing expression argument"))?;

    let steps = args.get("steps").and_then(|v| v.as_bool()).unwrap_or(false);
    let result = if steps {
        server.analyzer.clone().with_steps(true).analyze(expression)
    } else {
        server.analyzer.analyze(expression)
    };

    let report = server.renderer.render_report(&result);

    Ok(json!({
        "content": [{ "type": "text", "text": report }],
        "accepted": result.is_accepted(),
        "status": result.status(),
        "tokens": result.tokens,
        "symbols": result.symbols,
        "tree": result.tree,
        "sexpr": result.tree.as_ref().map(|t| t.to_string()),
        "diagnostics": result.diagnostics,
        "steps": result.steps,
        "isError": false
    }))
}

fn tool_analyze_batch(server: &Server, args: JsonValue) -> Result<JsonValue, McpError> {
    let expressions = args.get("expressions")
        .and_then(|v| v.as_array())
        .ok_or_else(|| McpError::invalid_params("Missing expressions argument"))?;

    let mut lines = Vec::with_capacity(expressions.len());
    for (i, value) in expressions.iter().enumerate() {
        let expression = value.as_str().ok_or_else(|| {
            McpError::invalid_params(format!("expressions[{}] is not a string", i))
        })?;
        lines.push(ExpressionLine { expression: expression.to_string(), line_number: i + 1 });
    }

    let entries = batch::analyze_all(&server.analyzer, &lines);
    Ok(batch_response(&entries))
}

fn tool_analyze_file(server: &Server, args: JsonValue) -> Result<JsonValue, McpError> {
    let name = args.get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing name argument"))?;

    let path = resolve_file(&server.data_path, name)?;
    let lines = batch::read_expressions(&path)?;
    let entries = batch::analyze_all(&server.analyzer, &lines);

    let mut response = batch_response(&entries);
    if let Some(obj) = response.as_object_mut() {
        let source = path.file_name().map(|n| n.to_string_lossy().to_string());
        obj.insert("source_file".to_string(), json!(source));
    }
    Ok(response)
}

/// Text summary plus per-entry results for a batch
fn batch_response(entries: &[BatchEntry]) -> JsonValue {
    let summary = batch::summarize(entries);

    let mut text = format!(
        "Analyzed {} expressions: {} accepted ({:.1}%), {} rejected ({:.1}%)\n\n",
        summary.total,
        summary.accepted,
        summary.accepted_percent(),
        summary.rejected,
        summary.rejected_percent()
    );

    let results: Vec<JsonValue> = entries.iter().map(|entry| {
        let result = &entry.result;
        let detail = match (&result.tree, result.first_error()) {
            (_, Some(error)) => error,
            (Some(tree), None) => tree.to_string(),
            (None, None) => String::new(),
        };
        text.push_str(&format!(
            "{:>3}. {} {} => {}\n",
            entry.line_number, result.status(), result.source, detail
        ));

        json!({
            "line_number": entry.line_number,
            "expression": result.source,
            "status": result.status(),
            "tree": result.tree.as_ref().map(|t| t.to_string()),
            "diagnostics": result.diagnostics,
        })
    }).collect();

    json!({
        "content": [{ "type": "text", "text": text }],
        "summary": summary,
        "results": results
    })
}

fn tool_grammar() -> Result<JsonValue, McpError> {
    let operators: Vec<JsonValue> = BINARY_OPERATORS.iter().map(|op| {
        json!({
            "symbol": op.symbol(),
            "precedence": op.precedence(),
            "associativity": op.associativity(),
        })
    }).collect();

    let mut text = format!("{}\n\n| operator | precedence | associativity |\n|----------|------------|---------------|\n", GRAMMAR);
    for op in BINARY_OPERATORS {
        let assoc = match op.associativity() {
            Associativity::Left => "left",
            Associativity::Right => "right",
        };
        text.push_str(&format!("| {} | {} | {} |\n", op.symbol(), op.precedence(), assoc));
    }
    text.push_str("\nUnary prefix: - +\nLexed but outside the grammar: == != <= >= && || = < > ! & |\n");

    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "grammar": GRAMMAR,
        "operators": operators
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Server over a fresh data directory holding one sample file
    fn test_server() -> (Server, PathBuf) {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = env::temp_dir().join(format!("lexparse_mcp_{}_{}", std::process::id(), n));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("sample.expr"), batch::sample_file_contents()).unwrap();
        fs::write(dir.join("notes.md"), "not an expression file").unwrap();
        (Server::new(AnalyzerConfig::default(), dir.clone()), dir)
    }

    fn request(id: Option<JsonValue>, method: &str, params: Option<JsonValue>) -> McpRequest {
        McpRequest {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }

    fn call_tool(server: &Server, name: &str, arguments: JsonValue) -> McpResponse {
        handle_request(
            server,
            &request(
                Some(json!(1)),
                "tools/call",
                Some(json!({ "name": name, "arguments": arguments })),
            ),
        )
    }

    #[test]
    fn test_error_codes_from_library_errors() {
        let unsupported = McpError::from(LexparseError::unsupported_format("xml", &["txt", "csv"]));
        assert_eq!(unsupported.code, McpError::INVALID_PARAMS);
        assert!(unsupported.message.contains("xml"));

        let json_err = serde_json::from_str::<JsonValue>("{").unwrap_err();
        let internal = McpError::from(LexparseError::from(json_err));
        assert_eq!(internal.code, McpError::INTERNAL_ERROR);
    }

    #[test]
    fn test_initialize() {
        let (server, dir) = test_server();
        let response = handle_request(
            &server,
            &request(Some(json!(1)), "initialize", Some(json!({ "protocolVersion": "2024-11-05" }))),
        );
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_unknown_method() {
        let (server, dir) = test_server();
        let response = handle_request(&server, &request(Some(json!(2)), "prompts/list", None));
        let error = response.error.unwrap();
        assert_eq!(error.code, McpError::METHOD_NOT_FOUND);
        assert_eq!(response.id, Some(json!(2)));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_wrong_jsonrpc_version() {
        let (server, dir) = test_server();
        let mut req = request(Some(json!(3)), "ping", None);
        req.jsonrpc = "1.0".to_string();
        let response = handle_request(&server, &req);
        assert_eq!(response.error.unwrap().code, McpError::INVALID_REQUEST);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_tools_list() {
        let result = handle_tools_list().unwrap();
        let names: Vec<&str> = result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert_eq!(names, vec!["analyze", "analyze_batch", "analyze_file", "grammar"]);
    }

    #[test]
    fn test_analyze_tool() {
        let (server, dir) = test_server();
        let response = call_tool(&server, "analyze", json!({ "expression": "x + x * 2" }));
        let result = response.result.unwrap();
        assert_eq!(result["accepted"], true);
        assert_eq!(result["status"], "ACCEPTED");
        assert_eq!(result["sexpr"], "(+ x (* x 2))");
        assert_eq!(result["symbols"][0]["name"], "x");
        assert_eq!(result["symbols"][0]["occurrence_count"], 2);
        assert!(result["content"][0]["text"].as_str().unwrap().contains("Status: ACCEPTED"));
        assert!(result["steps"].as_array().unwrap().is_empty());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_analyze_tool_with_steps_and_errors() {
        let (server, dir) = test_server();
        let response = call_tool(&server, "analyze", json!({ "expression": "(1 + 2", "steps": true }));
        let result = response.result.unwrap();
        assert_eq!(result["accepted"], false);
        assert_eq!(result["diagnostics"][0]["severity"], "SYNTAX_ERROR");
        assert_eq!(result["sexpr"], "(+ 1 2)");
        assert!(!result["steps"].as_array().unwrap().is_empty());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_analyze_missing_argument() {
        let (server, dir) = test_server();
        let response = call_tool(&server, "analyze", json!({}));
        assert_eq!(response.error.unwrap().code, McpError::INVALID_PARAMS);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_analyze_batch_tool() {
        let (server, dir) = test_server();
        let response = call_tool(&server, "analyze_batch", json!({ "expressions": ["a+b", "3+", "(x)"] }));
        let result = response.result.unwrap();
        assert_eq!(result["summary"]["total"], 3);
        assert_eq!(result["summary"]["accepted"], 2);
        assert_eq!(result["summary"]["rejected"], 1);
        assert_eq!(result["results"][1]["status"], "REJECTED");
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_analyze_batch_rejects_non_strings() {
        let (server, dir) = test_server();
        let response = call_tool(&server, "analyze_batch", json!({ "expressions": ["a", 5] }));
        assert!(response.error.unwrap().message.contains("expressions[1]"));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_analyze_file_tool() {
        let (server, dir) = test_server();
        let response = call_tool(&server, "analyze_file", json!({ "name": "sample" }));
        let result = response.result.unwrap();
        assert_eq!(result["source_file"], "sample.expr");
        assert_eq!(result["summary"]["total"], 13);
        assert_eq!(result["results"][0]["line_number"], 6);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_analyze_file_not_found() {
        let (server, dir) = test_server();
        let response = call_tool(&server, "analyze_file", json!({ "name": "missing" }));
        let error = response.error.unwrap();
        assert_eq!(error.code, McpError::INVALID_PARAMS);
        assert_eq!(error.data.unwrap()["available"], json!(["sample.expr"]));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_path_traversal_rejected() {
        let (server, dir) = test_server();
        let response = call_tool(&server, "analyze_file", json!({ "name": "../sample.expr" }));
        assert!(response.error.unwrap().message.contains("Invalid file name"));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_grammar_tool() {
        let result = tool_grammar().unwrap();
        assert_eq!(result["operators"].as_array().unwrap().len(), 6);
        assert_eq!(result["operators"][5]["symbol"], "^");
        assert_eq!(result["operators"][5]["associativity"], "right");
        assert!(result["content"][0]["text"].as_str().unwrap().contains("| * | 2 | left |"));
    }

    #[test]
    fn test_resources() {
        let (server, dir) = test_server();
        let list = handle_request(&server, &request(Some(json!(1)), "resources/list", None));
        let resources = list.result.unwrap()["resources"].clone();
        assert_eq!(resources.as_array().unwrap().len(), 1);
        assert_eq!(resources[0]["uri"], "lexparse://files/sample.expr");
        assert_eq!(resources[0]["description"], "Sample input file for the expression analyzer");

        let read = handle_request(
            &server,
            &request(Some(json!(2)), "resources/read", Some(json!({ "uri": "lexparse://files/sample.expr" }))),
        );
        let text = read.result.unwrap()["contents"][0]["text"].as_str().unwrap().to_string();
        assert!(text.contains("3+4*5"));

        let bad = handle_request(
            &server,
            &request(Some(json!(3)), "resources/read", Some(json!({ "uri": "file:///etc/passwd" }))),
        );
        assert_eq!(bad.error.unwrap().code, McpError::INVALID_PARAMS);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_handle_line() {
        let (server, dir) = test_server();
        assert!(handle_line(&server, "   \n").is_none());
        assert!(handle_line(&server, r#"{"jsonrpc":"2.0","method":"initialized"}"#).is_none());

        let parse_error = handle_line(&server, "{not json").unwrap();
        assert_eq!(parse_error.error.unwrap().code, McpError::PARSE_ERROR);

        let ping = handle_line(&server, r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#).unwrap();
        assert_eq!(ping.id, Some(json!(7)));
        assert_eq!(ping.result, Some(json!({})));
        fs::remove_dir_all(dir).unwrap();
    }
}
