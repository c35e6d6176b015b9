use std::time::Duration;

use redis_protocol::resp2::types::OwnedFrame as RespFrame;
use tokio_util::sync::CancellationToken;

use super::utils::{error, extract_integer, extract_string, extract_utf8, wrong_arity};
use crate::{QueueError, QueueRegistry};

/// Runs one command against the registry.
///
/// Returns `None` when the command was cancelled and nothing should be
/// written back.
pub async fn handle_command(
    frame: RespFrame,
    registry: &QueueRegistry,
    cancel: &CancellationToken,
) -> Option<RespFrame> {
    let cmd_array = match frame {
        RespFrame::Array(arr) => arr,
        _ => return Some(error("ERR expected array")),
    };

    if cmd_array.is_empty() {
        return Some(error("ERR empty command"));
    }

    let command_name = match &cmd_array[0] {
        RespFrame::BulkString(data) | RespFrame::SimpleString(data) => {
            String::from_utf8_lossy(data).to_uppercase()
        }
        _ => return Some(error("ERR invalid command format")),
    };

    let response = match command_name.as_str() {
        "PING" => handle_ping(&cmd_array),
        "LPUSH" => handle_lpush(&cmd_array, registry),
        "RPOP" => handle_rpop(&cmd_array, registry),
        "BRPOP" => return handle_brpop(&cmd_array, registry, cancel).await,
        "LLEN" => handle_llen(&cmd_array, registry),
        "COMMAND" => handle_command_docs(),
        _ => error(format!("ERR unknown command '{}'", command_name)),
    };

    Some(response)
}

/// PING [message]
fn handle_ping(cmd: &[RespFrame]) -> RespFrame {
    match cmd.len() {
        1 => RespFrame::SimpleString(b"PONG".to_vec()),
        2 => cmd[1].clone(),
        _ => wrong_arity("ping"),
    }
}

/// LPUSH queue value - one message per call
fn handle_lpush(cmd: &[RespFrame], registry: &QueueRegistry) -> RespFrame {
    if cmd.len() != 3 {
        return wrong_arity("lpush");
    }

    let queue_name = match extract_string(&cmd[1]) {
        Ok(name) => name,
        Err(e) => return e,
    };
    let value = match extract_utf8(&cmd[2]) {
        Ok(value) => value,
        Err(e) => return e,
    };

    match registry.enqueue(&queue_name, value) {
        Ok(len) => RespFrame::Integer(len as i64),
        Err(e) => error(format!("ERR {}", e)),
    }
}

/// RPOP queue - never waits
fn handle_rpop(cmd: &[RespFrame], registry: &QueueRegistry) -> RespFrame {
    if cmd.len() != 2 {
        return wrong_arity("rpop");
    }

    let queue_name = match extract_string(&cmd[1]) {
        Ok(name) => name,
        Err(e) => return e,
    };

    match registry.get_or_create(&queue_name).try_dequeue() {
        Some(message) => RespFrame::BulkString(message.into_payload().into_bytes()),
        None => RespFrame::Null,
    }
}

/// BRPOP queue timeout - waits up to `timeout` seconds.
///
/// Unlike Redis, a timeout of 0 returns null at once when the queue is
/// empty instead of blocking indefinitely.
async fn handle_brpop(
    cmd: &[RespFrame],
    registry: &QueueRegistry,
    cancel: &CancellationToken,
) -> Option<RespFrame> {
    if cmd.len() != 3 {
        return Some(wrong_arity("brpop"));
    }

    let queue_name = match extract_string(&cmd[1]) {
        Ok(name) => name,
        Err(e) => return Some(e),
    };

    let timeout_secs = match extract_integer(&cmd[2]) {
        Ok(n) => n,
        Err(e) => return Some(e),
    };

    if timeout_secs < 0 {
        return Some(error("ERR timeout is negative"));
    }

    let timeout = Duration::from_secs(timeout_secs as u64);

    match registry.dequeue(&queue_name, timeout, cancel).await {
        Ok(message) => {
            tracing::debug!(queue = %queue_name, waited = ?message.age(), "message delivered");
            Some(RespFrame::Array(vec![
                RespFrame::BulkString(queue_name.into_bytes()),
                RespFrame::BulkString(message.into_payload().into_bytes()),
            ]))
        }
        Err(QueueError::TimedOut) => Some(RespFrame::Null),
        Err(QueueError::Cancelled) => {
            tracing::debug!(queue = %queue_name, "brpop cancelled");
            None
        }
        Err(e) => Some(error(format!("ERR {}", e))),
    }
}

/// LLEN queue
fn handle_llen(cmd: &[RespFrame], registry: &QueueRegistry) -> RespFrame {
    if cmd.len() != 2 {
        return wrong_arity("llen");
    }

    let queue_name = match extract_string(&cmd[1]) {
        Ok(name) => name,
        Err(e) => return e,
    };

    let len = registry.get(&queue_name).map_or(0, |queue| queue.len());
    RespFrame::Integer(len as i64)
}

/// COMMAND - Return supported commands
fn handle_command_docs() -> RespFrame {
    RespFrame::Array(vec![
        RespFrame::BulkString(b"PING".to_vec()),
        RespFrame::BulkString(b"LPUSH".to_vec()),
        RespFrame::BulkString(b"RPOP".to_vec()),
        RespFrame::BulkString(b"BRPOP".to_vec()),
        RespFrame::BulkString(b"LLEN".to_vec()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(parts: &[&str]) -> RespFrame {
        RespFrame::Array(
            parts
                .iter()
                .map(|part| RespFrame::BulkString(part.as_bytes().to_vec()))
                .collect(),
        )
    }

    async fn run(registry: &QueueRegistry, parts: &[&str]) -> Option<RespFrame> {
        handle_command(command(parts), registry, &CancellationToken::new()).await
    }

    #[tokio::test]
    async fn test_ping() {
        let registry = QueueRegistry::new();

        let response = run(&registry, &["ping"]).await;

        assert_eq!(response, Some(RespFrame::SimpleString(b"PONG".to_vec())));
    }

    #[tokio::test]
    async fn test_lpush_then_rpop() {
        let registry = QueueRegistry::new();

        assert_eq!(run(&registry, &["LPUSH", "jobs", "a"]).await, Some(RespFrame::Integer(1)));
        assert_eq!(run(&registry, &["LPUSH", "jobs", "b"]).await, Some(RespFrame::Integer(2)));
        assert_eq!(
            run(&registry, &["RPOP", "jobs"]).await,
            Some(RespFrame::BulkString(b"a".to_vec()))
        );
        assert_eq!(run(&registry, &["LLEN", "jobs"]).await, Some(RespFrame::Integer(1)));
    }

    #[tokio::test]
    async fn test_lpush_rejects_empty_value_and_batches() {
        let registry = QueueRegistry::new();

        let empty = run(&registry, &["LPUSH", "jobs", ""]).await;
        let batch = run(&registry, &["LPUSH", "jobs", "a", "b"]).await;

        assert!(matches!(empty, Some(RespFrame::Error(_))));
        assert!(matches!(batch, Some(RespFrame::Error(_))));
        assert!(registry.get("jobs").is_none());
    }

    #[tokio::test]
    async fn test_rpop_empty_returns_null() {
        let registry = QueueRegistry::new();

        assert_eq!(run(&registry, &["RPOP", "nothing"]).await, Some(RespFrame::Null));
    }

    #[tokio::test]
    async fn test_brpop_zero_timeout_returns_null_immediately() {
        let registry = QueueRegistry::new();
        let start = std::time::Instant::now();

        let response = run(&registry, &["BRPOP", "nothing", "0"]).await;

        assert_eq!(response, Some(RespFrame::Null));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_brpop_returns_queue_and_value() {
        let registry = QueueRegistry::new();
        registry.enqueue("jobs", "payload".to_string()).unwrap();

        let response = run(&registry, &["BRPOP", "jobs", "1"]).await;

        assert_eq!(
            response,
            Some(RespFrame::Array(vec![
                RespFrame::BulkString(b"jobs".to_vec()),
                RespFrame::BulkString(b"payload".to_vec()),
            ]))
        );
    }

    #[tokio::test]
    async fn test_brpop_rejects_negative_timeout() {
        let registry = QueueRegistry::new();

        let response = run(&registry, &["BRPOP", "jobs", "-1"]).await;

        assert!(matches!(response, Some(RespFrame::Error(_))));
    }

    #[tokio::test]
    async fn test_cancelled_brpop_writes_nothing() {
        let registry = QueueRegistry::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let response = handle_command(command(&["BRPOP", "jobs", "5"]), &registry, &cancel).await;

        assert_eq!(response, None);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let registry = QueueRegistry::new();

        let response = run(&registry, &["DEL", "jobs"]).await;

        assert_eq!(response, Some(RespFrame::Error("ERR unknown command 'DEL'".to_string())));
    }
}
