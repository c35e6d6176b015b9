use redis_protocol::resp2::types::OwnedFrame as RespFrame;

pub fn error(message: impl Into<String>) -> RespFrame {
    RespFrame::Error(message.into())
}

pub fn wrong_arity(command: &str) -> RespFrame {
    error(format!("ERR wrong number of arguments for '{}' command", command))
}

/// Reads a name-like argument; invalid UTF-8 is replaced rather than rejected.
pub fn extract_string(frame: &RespFrame) -> Result<String, RespFrame> {
    match frame {
        RespFrame::BulkString(data) | RespFrame::SimpleString(data) => {
            Ok(String::from_utf8_lossy(data).to_string())
        }
        _ => Err(error("ERR invalid string")),
    }
}

/// Reads a payload argument, which must be valid UTF-8 so it comes back
/// unchanged.
pub fn extract_utf8(frame: &RespFrame) -> Result<String, RespFrame> {
    match frame {
        RespFrame::BulkString(data) | RespFrame::SimpleString(data) => String::from_utf8(data.clone())
            .map_err(|_| error("ERR value is not valid UTF-8")),
        _ => Err(error("ERR invalid value")),
    }
}

pub fn extract_integer(frame: &RespFrame) -> Result<i64, RespFrame> {
    match frame {
        RespFrame::Integer(n) => Ok(*n),
        RespFrame::BulkString(data) | RespFrame::SimpleString(data) => {
            let s = String::from_utf8_lossy(data);
            s.trim()
                .parse::<i64>()
                .map_err(|_| error("ERR value is not an integer or out of range"))
        }
        _ => Err(error("ERR value is not an integer or out of range")),
    }
}
