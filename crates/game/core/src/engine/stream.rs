//! Frame-gated action stream.
//!
//! The stream is a sequence of blocks:
//!
//! ```text
//! [i32 frame][u8 len][len bytes of records]
//! record = [u8 player][action tag][action parameters]
//! ```
//!
//! A frame may span several consecutive blocks. The reader consumes blocks for
//! the current frame only; at the first block for any other frame it records
//! that frame as the next one due and stops without consuming it. A block with
//! a negative frame is never due, so the stream stalls in front of it.

use tracing::debug;

use crate::action::{self, Action, DecodeContext, EncodeError};
use crate::codec::{Reader, Writer};
use crate::config::CommandConfig;
use crate::env::GameEnv;
use crate::error::ErrorContext;
use crate::state::{Frame, PlayerId};
use crate::world::{UnitLookup, World};

use super::errors::StreamError;
use super::hook::ExecutionHook;
use super::ActionEngine;

/// Bytes of a block header: frame number and payload length.
pub const FRAME_HEADER_LEN: usize = 5;

/// What one `process_frame` call consumed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameSummary {
    pub frame: Frame,
    pub blocks: usize,
    pub records: usize,
    /// Records whose command reported success.
    pub succeeded: usize,
}

impl<W: World> ActionEngine<'_, W> {
    /// Decodes and applies every record due at `frame`.
    ///
    /// Resumes from the cursor stored in the action state and advances it
    /// past each fully applied block. When the stream is exhausted the next
    /// due frame becomes `frame + 1`.
    ///
    /// # Errors
    ///
    /// Truncated blocks, unknown players, undecodable records and fatal
    /// execution errors. The cursor is left at the start of the failing block.
    pub fn process_frame<H>(
        &mut self,
        env: GameEnv<'_>,
        stream: &[u8],
        frame: Frame,
        hook: &mut H,
    ) -> Result<FrameSummary, StreamError>
    where
        H: ExecutionHook + ?Sized,
    {
        let mut summary = FrameSummary {
            frame,
            ..FrameSummary::default()
        };
        if frame < self.state.next_action_frame() {
            return Ok(summary);
        }

        let mut reader = Reader::at(stream, self.state.stream_position());
        while !reader.is_empty() {
            let block_start = reader.position();
            let context = ErrorContext::new(frame).with_position(block_start);
            let (Some(block_frame), Some(len)) = (reader.get::<i32>(), reader.get::<u8>()) else {
                return Err(StreamError::TruncatedBlock { context });
            };

            let Some(block_frame) = u32::try_from(block_frame).ok().map(Frame) else {
                self.state.set_next_action_frame(frame.next());
                debug!(target: "lockstep::stream", %frame, block_frame, "negative block frame");
                return Ok(summary);
            };
            if block_frame != frame {
                self.state.set_next_action_frame(block_frame);
                debug!(
                    target: "lockstep::stream",
                    %frame,
                    next = %block_frame,
                    records = summary.records,
                    "frame done"
                );
                return Ok(summary);
            }

            let payload_start = reader.position();
            let payload = reader
                .take(len as usize)
                .ok_or(StreamError::TruncatedBlock { context })?;
            self.process_block(env, payload, payload_start, frame, hook, &mut summary)?;

            summary.blocks += 1;
            self.state.set_stream_position(reader.position());
        }

        self.state.set_next_action_frame(frame.next());
        debug!(
            target: "lockstep::stream",
            %frame,
            records = summary.records,
            "stream exhausted"
        );
        Ok(summary)
    }

    fn process_block<H>(
        &mut self,
        env: GameEnv<'_>,
        payload: &[u8],
        base: usize,
        frame: Frame,
        hook: &mut H,
        summary: &mut FrameSummary,
    ) -> Result<(), StreamError>
    where
        H: ExecutionHook + ?Sized,
    {
        let tables = env.tables()?;
        let mut records = Reader::new(payload);

        while let Some(player) = records.get::<u8>() {
            let player = PlayerId(player);
            let context = ErrorContext::new(frame).with_position(base + records.position() - 1);
            let owner = self
                .state
                .owner_of(player)
                .ok_or(StreamError::UnknownPlayer { player, context })?;
            let context = context.with_owner(owner);

            let decoded = {
                let ctx = DecodeContext::new(&*self.world, tables);
                action::decode(&mut records, &ctx)
            };
            let action = decoded.map_err(|source| StreamError::Decode { source, context })?;

            let success = self
                .execute(env, owner, &action)
                .map_err(|source| StreamError::Execute { source, context })?;
            hook.on_action(frame, owner, action.kind(), success);

            summary.records += 1;
            if success {
                summary.succeeded += 1;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Builds a frame-gated stream from `(frame, player, action)` records.
///
/// Records for one frame share a block until it would exceed the one-byte
/// length, after which a new block for the same frame is opened.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionStreamWriter {
    bytes: Vec<u8>,
    /// Frame and header offset of the block currently being filled.
    open: Option<(Frame, usize)>,
}

impl ActionStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Encoding failures, records longer than a block, and frames earlier
    /// than the last one written.
    pub fn push(
        &mut self,
        frame: Frame,
        player: PlayerId,
        action: &Action,
        units: &dyn UnitLookup,
    ) -> Result<(), EncodeError> {
        if let Some(last) = self.last_frame().filter(|&last| frame < last) {
            return Err(EncodeError::FrameOutOfOrder { frame, last });
        }

        let mut record = Writer::new();
        record.put(&player.0);
        action::encode_into(action, units, &mut record)?;
        if record.len() > CommandConfig::MAX_FRAME_BLOCK {
            return Err(EncodeError::RecordTooLong {
                kind: action.kind(),
                len: record.len(),
            });
        }

        let header = match self.open {
            Some((open_frame, header))
                if open_frame == frame
                    && self.bytes.len() - header - FRAME_HEADER_LEN + record.len()
                        <= CommandConfig::MAX_FRAME_BLOCK =>
            {
                header
            }
            _ => self.open_block(frame),
        };

        self.bytes.extend_from_slice(record.as_bytes());
        let len = self.bytes.len() - header - FRAME_HEADER_LEN;
        self.bytes[header + FRAME_HEADER_LEN - 1] = len as u8;
        Ok(())
    }

    fn open_block(&mut self, frame: Frame) -> usize {
        let header = self.bytes.len();
        let mut writer = Writer::with_capacity(FRAME_HEADER_LEN);
        writer.put(&frame.0);
        writer.put(&0u8);
        self.bytes.extend_from_slice(writer.as_bytes());
        self.open = Some((frame, header));
        header
    }

    /// Last frame written, if any.
    pub fn last_frame(&self) -> Option<Frame> {
        self.open.map(|(frame, _)| frame)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, DecodeError};
    use crate::config::CommandConfig;
    use crate::env::{ConfigOracle, Env, PathOracle, TablesOracle};
    use crate::state::{ActionState, Owner, UnitHandle};
    use crate::testing::{StubPath, StubWorld, TABLES};

    #[derive(Default)]
    struct Recorder(Vec<(Frame, Owner, ActionKind, bool)>);

    impl ExecutionHook for Recorder {
        fn on_action(&mut self, frame: Frame, owner: Owner, kind: ActionKind, success: bool) {
            self.0.push((frame, owner, kind, success));
        }
    }

    fn run(
        state: &mut ActionState,
        world: &mut StubWorld,
        stream: &[u8],
        frame: u32,
        hook: &mut Recorder,
    ) -> Result<FrameSummary, StreamError> {
        let path = StubPath::open(4096);
        let config = CommandConfig::default();
        let tables: &dyn TablesOracle = &TABLES;
        let path: &dyn PathOracle = &path;
        let config: &dyn ConfigOracle = &config;
        ActionEngine::new(state, world).process_frame(
            Env::with_all(tables, path, config),
            stream,
            Frame(frame),
            hook,
        )
    }

    fn select(units: &[u16]) -> Action {
        Action::Select {
            units: units.iter().map(|&u| UnitHandle(u)).collect(),
        }
    }

    #[test]
    fn frames_are_gated_and_resumed() {
        let mut world = StubWorld::with_units(3);
        let mut writer = ActionStreamWriter::new();
        writer.push(Frame(2), PlayerId(0), &select(&[0]), &world).unwrap();
        writer.push(Frame(2), PlayerId(1), &Action::KeepAlive {}, &world).unwrap();
        writer.push(Frame(5), PlayerId(0), &select(&[1, 2]), &world).unwrap();
        let stream = writer.into_bytes();
        let first_block_len = FRAME_HEADER_LEN + stream[4] as usize;

        let mut state = ActionState::with_identity_players();
        let mut hook = Recorder::default();

        let summary = run(&mut state, &mut world, &stream, 0, &mut hook).unwrap();
        assert_eq!(summary.records, 0);
        assert_eq!(state.next_action_frame(), Frame(2));
        assert_eq!(state.stream_position(), 0);

        // Frame 1 is skipped without reading.
        run(&mut state, &mut world, &stream, 1, &mut hook).unwrap();
        assert_eq!(state.stream_position(), 0);

        let summary = run(&mut state, &mut world, &stream, 2, &mut hook).unwrap();
        assert_eq!((summary.blocks, summary.records, summary.succeeded), (1, 2, 2));
        assert_eq!(state.stream_position(), first_block_len);
        assert_eq!(state.next_action_frame(), Frame(5));
        assert_eq!(state.selection(Owner(0)), &[UnitHandle(0)]);

        let summary = run(&mut state, &mut world, &stream, 5, &mut hook).unwrap();
        assert_eq!(summary.records, 1);
        assert_eq!(state.stream_position(), stream.len());
        assert_eq!(state.next_action_frame(), Frame(6));
        assert_eq!(state.selection(Owner(0)), &[UnitHandle(1), UnitHandle(2)]);

        assert_eq!(
            hook.0,
            vec![
                (Frame(2), Owner(0), ActionKind::Select, true),
                (Frame(2), Owner(1), ActionKind::KeepAlive, true),
                (Frame(5), Owner(0), ActionKind::Select, true),
            ]
        );
    }

    #[test]
    fn failed_commands_do_not_stop_the_frame() {
        let mut world = StubWorld::with_units(1);
        let mut writer = ActionStreamWriter::new();
        writer.push(Frame(0), PlayerId(0), &Action::Stop { queue: false }, &world).unwrap();
        writer.push(Frame(0), PlayerId(0), &select(&[0]), &world).unwrap();
        let stream = writer.into_bytes();

        let mut state = ActionState::with_identity_players();
        let mut hook = Recorder::default();
        let summary = run(&mut state, &mut world, &stream, 0, &mut hook).unwrap();
        assert_eq!((summary.records, summary.succeeded), (2, 1));
    }

    #[test]
    fn unknown_player_is_fatal() {
        let mut world = StubWorld::with_units(1);
        let mut writer = ActionStreamWriter::new();
        writer.push(Frame(0), PlayerId(7), &Action::KeepAlive {}, &world).unwrap();
        let stream = writer.into_bytes();

        let mut state = ActionState::new();
        let error = run(&mut state, &mut world, &stream, 0, &mut Recorder::default()).unwrap_err();
        assert!(matches!(
            error,
            StreamError::UnknownPlayer {
                player: PlayerId(7),
                ..
            }
        ));
        assert_eq!(state.stream_position(), 0);
    }

    #[test]
    fn unknown_tag_is_fatal() {
        let mut world = StubWorld::with_units(1);
        let stream = [0, 0, 0, 0, 2, 0, 0xFF];
        let mut state = ActionState::with_identity_players();
        let error = run(&mut state, &mut world, &stream, 0, &mut Recorder::default()).unwrap_err();
        match error {
            StreamError::Decode { source, context } => {
                assert_eq!(
                    source,
                    DecodeError::UnknownAction {
                        tag: Some(0xFF),
                        position: 1
                    }
                );
                assert_eq!(context.position, FRAME_HEADER_LEN);
                assert_eq!(context.owner, Some(Owner(0)));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn truncated_block_is_fatal() {
        let mut world = StubWorld::with_units(1);
        let mut state = ActionState::with_identity_players();
        for stream in [&[0u8, 0, 0][..], &[0, 0, 0, 0, 4, 0, 0x05]] {
            assert!(matches!(
                run(&mut state, &mut world, stream, 0, &mut Recorder::default()),
                Err(StreamError::TruncatedBlock { .. })
            ));
        }
    }

    #[test]
    fn overflow_in_stream_is_fatal() {
        let mut world = StubWorld::with_units(13);
        let mut writer = ActionStreamWriter::new();
        let units: Vec<u16> = (0..13).collect();
        writer.push(Frame(0), PlayerId(0), &select(&units), &world).unwrap();
        let stream = writer.into_bytes();

        let mut state = ActionState::with_identity_players();
        let error = run(&mut state, &mut world, &stream, 0, &mut Recorder::default()).unwrap_err();
        assert!(matches!(error, StreamError::Execute { .. }));
    }

    #[test]
    fn writer_splits_oversized_frames() {
        let world = StubWorld::default();
        let chat = Action::Chat { text: "x".repeat(10) };
        let mut writer = ActionStreamWriter::new();
        for _ in 0..4 {
            writer.push(Frame(9), PlayerId(0), &chat, &world).unwrap();
        }
        // 83-byte records: three fit in one 255-byte block.
        let bytes = writer.as_bytes();
        assert_eq!(bytes[4], 249);
        let second = FRAME_HEADER_LEN + 249;
        assert_eq!(&bytes[second..second + 4], &9u32.to_le_bytes());
        assert_eq!(bytes[second + 4], 83);
        assert_eq!(writer.len(), 2 * FRAME_HEADER_LEN + 4 * 83);
    }

    #[test]
    fn negative_block_frame_is_never_due() {
        let mut world = StubWorld::with_units(1);
        let mut stream = (-2i32).to_le_bytes().to_vec();
        stream.extend_from_slice(&[2, 0x00, 0x05]);

        let mut state = ActionState::with_identity_players();
        let mut hook = Recorder::default();
        for frame in [0, 1, 2] {
            let summary = run(&mut state, &mut world, &stream, frame, &mut hook).unwrap();
            assert_eq!(summary.records, 0);
            assert_eq!(state.stream_position(), 0);
            assert_eq!(state.next_action_frame(), Frame(frame + 1));
        }
        assert!(hook.0.is_empty());
    }

    #[test]
    fn writer_rejects_frame_regression() {
        let world = StubWorld::default();
        let mut writer = ActionStreamWriter::new();
        writer.push(Frame(4), PlayerId(0), &Action::KeepAlive {}, &world).unwrap();
        assert_eq!(
            writer.push(Frame(3), PlayerId(0), &Action::KeepAlive {}, &world),
            Err(EncodeError::FrameOutOfOrder {
                frame: Frame(3),
                last: Frame(4)
            })
        );
    }

    #[test]
    fn split_frames_replay_as_one() {
        let mut world = StubWorld::with_units(1);
        let mut writer = ActionStreamWriter::new();
        for _ in 0..4 {
            let chat = Action::Chat { text: "hi".into() };
            writer.push(Frame(0), PlayerId(3), &chat, &world).unwrap();
        }
        let stream = writer.into_bytes();

        let mut state = ActionState::with_identity_players();
        let summary = run(&mut state, &mut world, &stream, 0, &mut Recorder::default()).unwrap();
        assert_eq!((summary.blocks, summary.records), (2, 4));
        assert_eq!(world.chat.len(), 4);
    }
}
