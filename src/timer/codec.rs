//! Timer wire codec.
//!
//! The same JSON body is used by clients creating timers and by peers
//! replicating them; the only difference is that replication bodies carry a
//! concrete `reliability.replicas` list. Interval and repeat-for travel in
//! whole seconds on the wire and are held in milliseconds internally.
//!
//! Parsing is deliberately permissive about unknown fields but strict about
//! structure: every mismatch produces an error naming the offending field,
//! and a body that fails to decode never touches the store.

use crate::cluster::view::ClusterView;
use crate::core::error::{ChimeError, ChimeResult};
use crate::core::time::Clock;
use crate::timer::entity::{Timer, TimerId};
use serde_json::{json, Map, Value};

/// Replica count applied when a request carries no reliability section.
pub const DEFAULT_REPLICATION_FACTOR: u32 = 2;

/// A decoded timer plus its provenance.
#[derive(Debug)]
pub struct Decoded {
    /// The decoded timer, replica set fully determined.
    pub timer: Timer,

    /// True when the body carried explicit replicas, i.e. it was a
    /// replication message from a peer rather than a client creation.
    pub replicated: bool,
}

/// Decode a timer body received for the given id.
///
/// `replica_hash` is the bloom field recovered from the request URL, or 0
/// for a freshly created timer.
pub fn decode(
    id: TimerId,
    replica_hash: u64,
    body: &str,
    view: &ClusterView,
    clock: &dyn Clock,
) -> ChimeResult<Decoded> {
    let doc: Value = serde_json::from_str(body)
        .map_err(|e| ChimeError::decode(format!("failed to parse JSON body: {e}")))?;

    let root = doc
        .as_object()
        .ok_or_else(|| ChimeError::decode("body should be a JSON object"))?;

    // Timing block: interval and repeat-for are mandatory, in seconds.
    let timing = as_object(require(root, "the JSON body", "timing")?, "timing")?;
    let interval_s = as_integer(require(timing, "timing", "interval")?, "interval")?;
    let repeat_for_s = as_integer(require(timing, "timing", "repeat-for")?, "repeat-for")?;

    let mut timer = Timer::new(id, interval_s * 1_000, repeat_for_s * 1_000, clock);

    if let Some(start_time) = timing.get("start-time") {
        timer.start_time = as_integer(start_time, "start-time")?;
    }

    if let Some(sequence_number) = timing.get("sequence-number") {
        timer.sequence_number = as_integer(sequence_number, "sequence-number")? as u32;
    }

    // Callback block.
    let callback = as_object(require(root, "the JSON body", "callback")?, "callback")?;
    let http = as_object(require(callback, "callback", "http")?, "http")?;
    timer.callback_url = as_string(require(http, "http", "uri")?, "uri")?;
    timer.callback_body = as_string(require(http, "http", "opaque")?, "opaque")?;

    if interval_s == 0 && !timer.callback_url.is_empty() {
        return Err(ChimeError::decode("'interval' must be greater than zero"));
    }

    // Reliability block: explicit replicas, a bare factor, or nothing.
    match root.get("reliability") {
        Some(reliability) => {
            let reliability = as_object(reliability, "reliability")?;

            if let Some(replicas) = reliability.get("replicas") {
                let replicas = replicas
                    .as_array()
                    .ok_or_else(|| ChimeError::decode("'replicas' should be an array"))?;

                if replicas.is_empty() {
                    return Err(ChimeError::decode(
                        "if 'replicas' is specified it must be non-empty",
                    ));
                }

                timer.replication_factor = replicas.len() as u32;
                for replica in replicas {
                    timer
                        .replicas
                        .push(as_string(replica, "replica address")?);
                }
            } else if let Some(factor) = reliability.get("replication-factor") {
                timer.replication_factor =
                    as_integer(factor, "replication-factor")? as u32;
            } else {
                timer.replication_factor = DEFAULT_REPLICATION_FACTOR;
            }
        }
        None => {
            timer.replication_factor = DEFAULT_REPLICATION_FACTOR;
        }
    }

    // A body without explicit replicas is a client request: derive the
    // replica set locally. Explicit replicas mean a peer already did.
    let replicated = if timer.replicas.is_empty() {
        timer.calculate_replicas(view, replica_hash)?;
        false
    } else {
        true
    };

    Ok(Decoded { timer, replicated })
}

/// Render a timer as a wire body.
///
/// Emits the concrete replica list so the receiving peer stores exactly
/// this placement; interval and repeat-for are rounded down to seconds.
pub fn encode(timer: &Timer) -> String {
    let body = json!({
        "timing": {
            "start-time": timer.start_time,
            "sequence-number": timer.sequence_number,
            "interval": timer.interval / 1_000,
            "repeat-for": timer.repeat_for / 1_000,
        },
        "callback": {
            "http": {
                "uri": timer.callback_url,
                "opaque": timer.callback_body,
            }
        },
        "reliability": {
            "replicas": timer.replicas,
        }
    });

    tracing::debug!(id = timer.id, "built replication body");
    body.to_string()
}

fn require<'a>(
    obj: &'a Map<String, Value>,
    parent: &str,
    key: &str,
) -> ChimeResult<&'a Value> {
    obj.get(key)
        .ok_or_else(|| ChimeError::decode(format!("couldn't find '{key}' in {parent}")))
}

fn as_object<'a>(value: &'a Value, name: &str) -> ChimeResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ChimeError::decode(format!("'{name}' should be an object")))
}

fn as_integer(value: &Value, name: &str) -> ChimeResult<u64> {
    value
        .as_u64()
        .ok_or_else(|| ChimeError::decode(format!("'{name}' should be an integer")))
}

fn as_string(value: &Value, name: &str) -> ChimeResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ChimeError::decode(format!("'{name}' should be a string")))
}
