//! Offline inspection of recorded streams.
//!
//! [`inspect`] replays a stream in a session built from config and collects
//! every record's outcome together with per-player counters.
use std::collections::BTreeMap;

use lockstep_core::codec::Reader;
use lockstep_core::{ActionKind, ErrorContext, Frame, Owner, StreamError};
use serde::Serialize;

use crate::error::Result;
use crate::hooks::{ActionLog, ActionRecord, PlayerCounts};
use crate::session::Session;

/// One block header of a frame-gated stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BlockHeader {
    /// `None` for a negative frame, which is never due.
    pub frame: Option<Frame>,
    /// Byte offset of the header.
    pub offset: usize,
    /// Payload length.
    pub len: u8,
}

/// Lists every block without decoding records.
///
/// # Errors
///
/// [`StreamError::TruncatedBlock`] when a header or payload runs past the end.
pub fn scan_blocks(stream: &[u8]) -> std::result::Result<Vec<BlockHeader>, StreamError> {
    let mut reader = Reader::new(stream);
    let mut blocks = Vec::new();
    while !reader.is_empty() {
        let offset = reader.position();
        let last = last_due(&blocks).unwrap_or(Frame::ZERO);
        let context = ErrorContext::new(last).with_position(offset);
        let (Some(frame), Some(len)) = (reader.get::<i32>(), reader.get::<u8>()) else {
            return Err(StreamError::TruncatedBlock { context });
        };
        reader
            .take(len as usize)
            .ok_or(StreamError::TruncatedBlock { context })?;
        blocks.push(BlockHeader {
            frame: u32::try_from(frame).ok().map(Frame),
            offset,
            len,
        });
    }
    Ok(blocks)
}

fn last_due(blocks: &[BlockHeader]) -> Option<Frame> {
    blocks.iter().rev().find_map(|block| block.frame)
}

/// Outcome of replaying a stream.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    /// Frames simulated (one past the last frame replayed).
    pub frames: u32,
    pub blocks: usize,
    pub records: Vec<ActionRecord>,
    pub players: BTreeMap<u8, PlayerCounts>,
    pub kinds: BTreeMap<ActionKind, usize>,
    pub state_hash: String,
}

/// Replays `stream` in `session` up to `until` (or through the last block)
/// and reports every record.
pub fn inspect(mut session: Session, stream: &[u8], until: Option<Frame>) -> Result<Report> {
    let blocks = scan_blocks(stream)?;
    let end = until.unwrap_or_else(|| last_due(&blocks).map_or(Frame::ZERO, Frame::next));

    let log = ActionLog::new();
    session.register_hook(Box::new(log.clone()));
    session.feed(stream);
    session.run_until(end)?;

    let records = log.drain();
    let mut kinds = BTreeMap::new();
    for record in &records {
        *kinds.entry(record.kind).or_default() += 1;
    }
    let players = Owner::all()
        .filter_map(|owner| {
            let counts = session.apm().counts(owner)?;
            (counts.total > 0).then(|| (owner.0, counts.clone()))
        })
        .collect();

    Ok(Report {
        frames: session.frame().0,
        blocks: blocks
            .iter()
            .filter(|b| b.frame.is_some_and(|frame| frame < end))
            .count(),
        records,
        players,
        kinds,
        state_hash: session.state_hash()?,
    })
}
