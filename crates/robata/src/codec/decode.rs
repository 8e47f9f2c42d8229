use serde_json::Value;
use tracing::warn;
use crate::request::RequestId;
use super::record::{OutputLine, RawRecord, RawResult, RecordError};

/// Decodes an output or error artifact into one [`RawResult`] per non-blank
/// line, in artifact order.
///
/// Each line is decoded on its own, so one corrupt line never hides the
/// others. Lines that are not JSON objects come back as
/// [`RawRecord::Undecodable`] without an id; a line with an id but neither an
/// output nor an error is undecodable but keeps its id.
pub fn decode(bytes: &[u8]) -> Vec<RawResult> {
    bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
        .map(|(index, line)| decode_line(index + 1, line))
        .collect()
}

fn decode_line(line: usize, bytes: &[u8]) -> RawResult {
    let parsed = match serde_json::from_slice::<OutputLine>(bytes) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(line, error = %e, "undecodable result line");
            return RawResult {
                line,
                request_id: None,
                record: RawRecord::Undecodable(e.to_string()),
            };
        }
    };

    let request_id = parsed.record_id.and_then(id_from_value);
    let record = match (parsed.model_output, parsed.error) {
        (_, Some(error)) if !error.is_null() => RawRecord::Error(RecordError::from_value(error)),
        (Some(output), _) if !output.is_null() => RawRecord::Output(output),
        _ => RawRecord::Undecodable("line has neither a model output nor an error".to_string()),
    };
    RawResult {
        line,
        request_id,
        record,
    }
}

fn id_from_value(value: Value) -> Option<RequestId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(RequestId::from(s)),
        Value::Number(n) => Some(RequestId::from(n.to_string())),
        _ => None,
    }
}
