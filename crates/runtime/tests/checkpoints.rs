//! Checkpoints written to disk resume the same simulation.
use lockstep_core::{Action, Frame, OrderId, OrderRef, Owner, PlayerId, UnitTypeRef, World, Xy};
use lockstep_runtime::{
    Checkpoint, CheckpointRepository, FileCheckpointRepository, InMemoryCheckpointRepository,
    PlayerStart, RuntimeConfig, RuntimeError, Session, StartingUnit, StaticTables,
};
use tempfile::tempdir;

fn config() -> RuntimeConfig {
    RuntimeConfig {
        starts: vec![PlayerStart {
            owner: Owner(0),
            minerals: 400,
            gas: 0,
            supply: 20,
        }],
        units: vec![
            StartingUnit {
                owner: Owner(0),
                unit_type: StaticTables::BARRACKS,
                x: 96,
                y: 96,
            },
            StartingUnit {
                owner: Owner(0),
                unit_type: StaticTables::MARINE,
                x: 160,
                y: 96,
            },
        ],
        ..RuntimeConfig::default()
    }
}

/// Session with a marine in training and a move order in flight.
fn busy_session() -> Session {
    let mut session = Session::from_config(config()).unwrap();
    let units = session.world().owned_units(Owner(0));
    let tables = session.world().tables();
    let marine = UnitTypeRef::resolve(tables, StaticTables::MARINE);
    let movement = OrderRef::resolve(tables, OrderId::MOVE).unwrap();

    session
        .submit(PlayerId(0), Action::Select { units: vec![units[0]] })
        .unwrap();
    session
        .submit(PlayerId(0), Action::Train { unit_type: marine })
        .unwrap();
    session
        .submit(PlayerId(0), Action::Select { units: vec![units[1]] })
        .unwrap();
    session
        .submit(
            PlayerId(0),
            Action::Order {
                position: Xy::new(400, 400),
                target: None,
                target_type: None,
                order: movement,
                queue: false,
            },
        )
        .unwrap();
    session.run_until(Frame(20)).unwrap();
    session
}

#[test]
fn file_checkpoint_resumes_to_the_same_state() {
    let dir = tempdir().unwrap();
    let repository = FileCheckpointRepository::new(dir.path()).unwrap();

    let mut live = busy_session();
    live.save(&repository, "mid-game").unwrap();
    assert_eq!(repository.list().unwrap(), vec!["mid-game".to_owned()]);

    let mut resumed = Session::load(live.oracles().clone(), &repository, "mid-game")
        .unwrap()
        .unwrap();
    assert_eq!(resumed.frame(), Frame(20));
    assert_eq!(resumed.state_hash().unwrap(), live.state_hash().unwrap());

    live.run_until(Frame(120)).unwrap();
    resumed.run_until(Frame(120)).unwrap();
    assert_eq!(resumed.state_hash().unwrap(), live.state_hash().unwrap());
    assert_eq!(resumed.world().owned_units(Owner(0)).len(), 3);
    assert_eq!(resumed.apm().counts(Owner(0)), live.apm().counts(Owner(0)));
    assert_eq!(resumed.recorded(), live.recorded());
}

#[test]
fn missing_and_deleted_checkpoints_load_as_none() {
    let dir = tempdir().unwrap();
    let repository = FileCheckpointRepository::new(dir.path()).unwrap();
    let session = busy_session();
    let oracles = session.oracles().clone();

    assert!(
        Session::load(oracles.clone(), &repository, "absent")
            .unwrap()
            .is_none()
    );

    session.save(&repository, "a").unwrap();
    session.save(&repository, "b").unwrap();
    assert_eq!(repository.list().unwrap(), vec!["a", "b"]);

    repository.delete("a").unwrap();
    assert_eq!(repository.list().unwrap(), vec!["b"]);
    assert!(Session::load(oracles, &repository, "a").unwrap().is_none());
}

#[test]
fn corrupted_files_are_rejected() {
    let dir = tempdir().unwrap();
    let repository = FileCheckpointRepository::new(dir.path()).unwrap();
    let session = busy_session();
    session.save(&repository, "broken").unwrap();

    std::fs::write(dir.path().join("checkpoint_broken.bin"), b"not a checkpoint").unwrap();
    assert!(matches!(
        Session::load(session.oracles().clone(), &repository, "broken"),
        Err(RuntimeError::Checkpoint(_))
    ));
}

#[test]
fn version_mismatch_is_reported() {
    let session = busy_session();
    let mut checkpoint = session.checkpoint(None).unwrap();
    checkpoint.version = Checkpoint::VERSION + 1;
    let bytes = checkpoint.to_bytes().unwrap();

    assert!(matches!(
        Checkpoint::from_bytes(&bytes),
        Err(RuntimeError::CheckpointVersion { found, expected })
            if found == Checkpoint::VERSION + 1 && expected == Checkpoint::VERSION
    ));
}

#[test]
fn in_memory_repository_matches_file_behaviour() {
    let repository = InMemoryCheckpointRepository::new();
    let mut live = busy_session();
    live.save(&repository, "snap").unwrap();

    let mut resumed = Session::load(live.oracles().clone(), &repository, "snap")
        .unwrap()
        .unwrap();
    live.run_until(Frame(60)).unwrap();
    resumed.run_until(Frame(60)).unwrap();
    assert_eq!(resumed.state_hash().unwrap(), live.state_hash().unwrap());

    // A resumed session still replays from the original world.
    let origin = Session::from_config(config()).unwrap().world().state().clone();
    resumed.verify_replay(origin).unwrap();
}
