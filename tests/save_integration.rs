//! Save/load integration tests

use std::fmt::Write as _;
use std::path::Path;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use madden_imperialism::core::{CountyId, GameConfig, GameError, GeoPoint, TeamId};
use madden_imperialism::game::GameSession;
use madden_imperialism::history::{Battle, BattleOutcome};
use madden_imperialism::map::{Color, County, CountyAtlas, Team};
use madden_imperialism::persist::{self, SaveFile, SAVE_VERSION};

fn atlas() -> CountyAtlas {
    let mut counties = Vec::new();
    for row in 0..4 {
        for col in 0..4 {
            let id = format!("{:05}", row * 4 + col + 1);
            let point = GeoPoint::new(30.0 + row as f64 * 3.0, -110.0 + col as f64 * 10.0);
            counties.push(County::new(CountyId::new(id), format!("County {}-{}", row, col), "TX", point));
        }
    }
    CountyAtlas::new(counties).unwrap()
}

fn write_counties_csv(path: &Path) {
    let mut csv = String::from("fips,name,state,lat,lng\n");
    for county in atlas().counties() {
        let point = county.centroid.unwrap();
        writeln!(csv, "{},{},{},{},{}", county.id, county.name, county.state, point.lat, point.lon).unwrap();
    }
    std::fs::write(path, csv).unwrap();
}

fn started_session() -> GameSession {
    let mut session = GameSession::new(atlas(), GameConfig::default());
    for (id, lat, lon) in [("cowboys", 30.0, -110.0), ("texans", 39.0, -80.0), ("oilers", 35.0, -95.0)] {
        session
            .add_team(Team::new(TeamId::new(id), id, Color::new(120, 80, 40), GeoPoint::new(lat, lon)))
            .unwrap();
    }
    session.start().unwrap();
    session
}

fn play(session: &mut GameSession, rounds: usize) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for round in 0..rounds {
        if session.spin(&mut rng).unwrap().is_none() {
            break;
        }
        let outcome = if round % 3 == 0 {
            BattleOutcome::DefenderWins
        } else {
            BattleOutcome::AttackerWins
        };
        session.resolve_pending(outcome).unwrap();
    }
}

#[test]
fn test_save_and_reload_reproduces_game() {
    let mut session = started_session();
    play(&mut session, 8);
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let pending = session.spin(&mut rng).unwrap().cloned();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.json");
    let save = SaveFile::from_session(&session, Some("counties.csv".into())).unwrap();
    assert_eq!(save.version, SAVE_VERSION);
    persist::save(&path, &save).unwrap();

    let loaded = persist::load(&path).unwrap();
    assert_eq!(loaded, save);

    let restored = loaded.into_session(atlas(), GameConfig::default()).unwrap();
    let before = session.engine().unwrap();
    let after = restored.engine().unwrap();
    assert_eq!(restored.id(), session.id());
    assert_eq!(after.events(), before.events());
    assert_eq!(after.current(), before.current());
    assert_eq!(restored.pending().cloned(), pending);
    for step in 0..=before.len() {
        assert_eq!(after.ownership_at_step(step).unwrap(), before.ownership_at_step(step).unwrap());
    }
}

#[test]
fn test_damaged_saves_are_save_corrupt() {
    let mut session = started_session();
    play(&mut session, 4);
    let json = SaveFile::from_session(&session, None).unwrap().to_json().unwrap();

    let truncated = &json[..json.len() / 2];
    assert!(matches!(SaveFile::from_json(truncated), Err(GameError::SaveCorrupt(_))));

    let future = json.replacen(
        &format!("\"version\": {}", SAVE_VERSION),
        &format!("\"version\": {}", SAVE_VERSION + 1),
        1,
    );
    assert!(matches!(SaveFile::from_json(&future), Err(GameError::SaveCorrupt(_))));

    // Event that no longer validates against the replayed state
    let mut save = SaveFile::from_json(&json).unwrap();
    if let Some(event) = save.events.first_mut() {
        event.defender = TeamId::new("nobody");
    }
    assert!(matches!(save.into_parts(), Err(GameError::SaveCorrupt(_))));
}

#[test]
fn test_restore_requires_matching_county_data() {
    let session = started_session();
    let save = SaveFile::from_session(&session, None).unwrap();

    let smaller = CountyAtlas::new(atlas().counties()[..3].to_vec()).unwrap();
    assert!(matches!(
        save.into_session(smaller, GameConfig::default()),
        Err(GameError::SaveCorrupt(_))
    ));
}

#[test]
fn test_setup_sessions_cannot_be_saved() {
    let session = GameSession::new(atlas(), GameConfig::default());
    assert!(matches!(
        SaveFile::from_session(&session, None),
        Err(GameError::WrongPhase { .. })
    ));
}

#[test]
fn test_manual_battle_survives_reload() {
    let mut session = started_session();
    let victim = session
        .current()
        .unwrap()
        .counties_of(&TeamId::new("texans"))
        .next()
        .cloned()
        .unwrap();
    session
        .record_battle(Battle::new(
            TeamId::new("cowboys"),
            TeamId::new("texans"),
            victim.clone(),
            BattleOutcome::AttackerWins,
        ))
        .unwrap();

    let json = SaveFile::from_session(&session, None).unwrap().to_json().unwrap();
    let restored = SaveFile::from_json(&json)
        .unwrap()
        .into_session(atlas(), GameConfig::default())
        .unwrap();
    assert_eq!(restored.current().unwrap().owner(&victim), Some(&TeamId::new("cowboys")));
}

#[test]
fn test_relative_county_path_resolves_beside_the_save() {
    let mut session = started_session();
    play(&mut session, 3);

    // The test process runs elsewhere, so only the save's directory can satisfy the path
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    write_counties_csv(&data.join("counties.csv"));
    let path = dir.path().join("game.json");
    let save = SaveFile::from_session(&session, Some(Path::new("data").join("counties.csv"))).unwrap();
    persist::save(&path, &save).unwrap();

    let (restored, counties_path) = persist::open_game(&path, GameConfig::default()).unwrap();
    assert_eq!(counties_path, std::fs::canonicalize(data.join("counties.csv")).unwrap());
    assert!(counties_path.is_absolute());
    assert_eq!(restored.current().unwrap(), session.current().unwrap());
}

#[test]
fn test_absolute_county_path_opens_from_any_directory() {
    let session = started_session();
    let data_dir = tempfile::tempdir().unwrap();
    let save_dir = tempfile::tempdir().unwrap();
    let csv = data_dir.path().join("counties.csv");
    write_counties_csv(&csv);
    let csv = std::fs::canonicalize(&csv).unwrap();

    let path = save_dir.path().join("game.json");
    persist::save(&path, &SaveFile::from_session(&session, Some(csv.clone())).unwrap()).unwrap();

    let (restored, counties_path) = persist::open_game(&path, GameConfig::default()).unwrap();
    assert_eq!(counties_path, csv);
    assert_eq!(restored.id(), session.id());
}

#[test]
fn test_missing_county_file_is_save_corrupt() {
    let session = started_session();
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("counties.csv");
    write_counties_csv(&csv);
    let path = dir.path().join("game.json");
    persist::save(&path, &SaveFile::from_session(&session, Some(csv.clone())).unwrap()).unwrap();
    assert!(persist::open_game(&path, GameConfig::default()).is_ok());

    std::fs::remove_file(&csv).unwrap();
    let err = persist::open_game(&path, GameConfig::default()).unwrap_err();
    assert!(matches!(&err, GameError::SaveCorrupt(msg) if msg.contains("not found")), "{:?}", err);

    persist::save(&path, &SaveFile::from_session(&session, None).unwrap()).unwrap();
    assert!(matches!(
        persist::open_game(&path, GameConfig::default()),
        Err(GameError::SaveCorrupt(_))
    ));
}
