//! JSON-lines front end for the VFS gateway.
//!
//! Each input line is one request:
//!
//! ```json
//! {"id": 1, "user": {"username": "amy"}, "method": "ls", "args": "/User"}
//! ```
//!
//! Each output line answers one request, echoing its `id`:
//!
//! ```json
//! {"id": 1, "success": true, "payload": {"..": {}}}
//! {"id": 2, "error": "unknown method: format"}
//! ```
//!
//! Requests run concurrently, so replies may arrive out of order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use webdesk_types::{Reply, User};
use webdesk_vfs::Gateway;

/// One request line.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: Option<Value>,
    pub user: User,
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

/// One response line.
#[derive(Debug, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub reply: Option<Reply>,
    /// Set when the request never reached an operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn reply(id: Option<Value>, reply: Reply) -> Self {
        Self {
            id,
            reply: Some(reply),
            error: None,
        }
    }

    fn error(id: Option<Value>, error: impl Into<String>) -> Self {
        Self {
            id,
            reply: None,
            error: Some(error.into()),
        }
    }
}

/// Serve requests from `input` until EOF, then wait for every reply.
pub async fn serve<R, W>(gateway: Gateway, input: R, mut output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();

    let reader = async move {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            submit(&gateway, &line, &tx);
        }
        tracing::debug!("input closed");
        anyhow::Ok(())
    };

    let writer = async {
        while let Some(response) = rx.recv().await {
            let mut text = serde_json::to_string(&response)?;
            text.push('\n');
            output.write_all(text.as_bytes()).await?;
            output.flush().await?;
        }
        anyhow::Ok(())
    };

    tokio::try_join!(reader, writer)?;
    Ok(())
}

fn submit(gateway: &Gateway, line: &str, tx: &mpsc::UnboundedSender<Response>) {
    let envelope: Envelope = match serde_json::from_str(line) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("invalid request line: {}", e);
            let _ = tx.send(Response::error(None, format!("invalid request: {e}")));
            return;
        }
    };

    let Envelope {
        id,
        user,
        method,
        args,
    } = envelope;
    let reply_tx = tx.clone();
    let reply_id = id.clone();
    let known = gateway.call(user, &method, args, move |reply| {
        let _ = reply_tx.send(Response::reply(reply_id, reply));
    });
    if !known {
        let _ = tx.send(Response::error(id, format!("unknown method: {method}")));
    }
}
