//! stdio transport for the MCP server.
//!
//! One UTF-8 JSON-RPC message per line on stdin and stdout. Messages never
//! contain embedded newlines. Logging goes to stderr.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::mcp::protocol::{JsonRpcError, JsonRpcResponse};

/// Line-delimited JSON-RPC over stdin/stdout.
pub struct StdioTransport {
    reader: BufReader<tokio::io::Stdin>,
    writer: tokio::io::Stdout,
}

impl StdioTransport {
    /// Creates a transport on the process's stdin and stdout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            writer: tokio::io::stdout(),
        }
    }

    /// Reads the next line, without its line terminator.
    ///
    /// Returns `None` once stdin is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from stdin fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Writes a success response.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        self.write_message(response).await
    }

    /// Writes an error response.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_error(&mut self, error: &JsonRpcError) -> io::Result<()> {
        self.write_message(error).await
    }

    async fn write_message<T: Serialize + Sync>(&mut self, message: &T) -> io::Result<()> {
        let json = encode_line(message)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.flush().await
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialises a message as a single newline-terminated line.
fn encode_line<T: Serialize>(message: &T) -> io::Result<String> {
    let mut json =
        serde_json::to_string(message).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    debug_assert!(!json.contains('\n'), "JSON message must not contain embedded newlines");
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::RequestId;

    #[test]
    fn encoded_response_is_one_line() {
        let response = JsonRpcResponse::success(
            RequestId::Number(1),
            serde_json::json!({ "text": "line one\nline two", "nested": { "k": [1, 2] } }),
        );
        let line = encode_line(&response).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn encoded_error_is_one_line() {
        let error = JsonRpcError::method_not_found(RequestId::Number(2), "prompts/list");
        let line = encode_line(&error).unwrap();
        assert_eq!(line.matches('\n').count(), 1);
    }
}
