use kanade_chart::parse;
use kanade_play::{
    Judge, KeyBindings, PlayConfig, PlayState, Session, SessionStatus, Tier,
};
use proptest::prelude::*;

const CHART: &str = "osu file format v14

[General]
AudioFilename: audio.mp3
Mode: 3

[Metadata]
Title:Short

[Difficulty]
CircleSize:4

[TimingPoints]
0,500,4,2,0,40,1,0

[HitObjects]
64,192,1000,1,0,0:0:0:0:
192,192,1000,1,0,0:0:0:0:
320,192,1500,128,0,2500:0:0:0:0:
448,192,2000,1,0,0:0:0:0:
64,192,3000,1,0,0:0:0:0:
";

fn config() -> PlayConfig {
    PlayConfig {
        play_delay: 0.0,
        universal_offset: 0.0,
        ..Default::default()
    }
}

#[test]
fn test_full_play_through() {
    let chart = parse(CHART).unwrap();
    let mut session = Session::start(chart, 1.0, config(), 0.0).unwrap();

    assert_eq!(session.key_down(0, 1010.0), Some(Tier::Marvelous));
    assert_eq!(session.key_down(1, 1030.0), Some(Tier::Perfect));
    assert_eq!(session.key_down(2, 1500.0), Some(Tier::Marvelous));
    assert_eq!(session.key_up(2, 2450.0), Some(Tier::Ok));

    // Lane 3 is never pressed and lane 0's second note is pressed late.
    let mut now = 1500.0;
    while session.tick(now) == SessionStatus::Playing {
        if now == 3070.0 {
            assert_eq!(session.key_down(0, now), Some(Tier::Bad));
        }
        now += 10.0;
    }

    let state = session.state();
    assert_eq!(state.ledger().judged_count(), 6);
    assert_eq!(state.ledger().lane(3)[0].tier, Tier::Miss);
    assert_eq!(state.combo().max(), 4);
    assert_eq!(state.combo().current(), 1);

    let counts = state.ledger().tier_counts();
    assert_eq!(counts.get(Tier::Marvelous), 2);
    assert_eq!(counts.get(Tier::Miss), 1);

    // (100 + 100 + 100 + 50 - 20 + 0) / 600
    assert!((state.ledger().accuracy().unwrap() - 330.0 / 600.0).abs() < 1e-9);
}

#[test]
fn test_rate_change_between_sessions() {
    let chart = parse(CHART).unwrap();
    let session = Session::start(chart, 1.5, config(), 0.0).unwrap();
    let chart = session.into_chart();

    let session = Session::start(chart, 1.5, config(), 0.0).unwrap();
    assert_eq!(session.chart().lanes()[3][0].time, 2000.0 / 1.5);
    assert!((session.chart().timing_points()[0].bpm - 180.0).abs() < 1e-9);
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    // Missing file gives the defaults.
    assert_eq!(PlayConfig::load(&path).unwrap(), PlayConfig::default());

    let mut config = PlayConfig {
        judge_offset: 15.0,
        autoplay: true,
        ..Default::default()
    };
    config
        .key_bindings
        .set(4, ["KeyD", "KeyF", "KeyJ", "KeyK"].map(String::from).to_vec());
    config.save(&path).unwrap();

    let loaded = PlayConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.key_bindings.lane_for(4, "KeyK"), Some(3));
    assert_ne!(loaded.key_bindings, KeyBindings::default());
}

#[derive(Clone, Debug)]
enum Event {
    Down(usize, f64),
    Up(usize, f64),
    Timeout(usize, f64),
}

fn event() -> impl Strategy<Value = Event> {
    (0..3u8, 0..5usize, 0.0..4000.0f64).prop_map(|(kind, lane, time)| match kind {
        0 => Event::Down(lane, time),
        1 => Event::Up(lane, time),
        _ => Event::Timeout(lane, time),
    })
}

proptest! {
    #[test]
    fn ledger_only_grows(events in prop::collection::vec(event(), 0..64)) {
        let chart = parse(CHART).unwrap();
        let judge = Judge::new(Default::default(), 0.0);
        let mut state = PlayState::new(chart.key_count());

        let mut previous = vec![0; chart.key_count()];
        for event in events {
            match event {
                Event::Down(lane, time) => judge.on_key_down(chart.lanes(), &mut state, lane, time),
                Event::Up(lane, time) => judge.on_key_up(chart.lanes(), &mut state, lane, time),
                Event::Timeout(lane, time) => judge.on_timeout(chart.lanes(), &mut state, lane, time),
            };

            for (lane, notes) in chart.lanes().iter().enumerate() {
                let judged = state.ledger().next_index(lane);
                prop_assert!(judged >= previous[lane]);
                prop_assert!(judged <= notes.len());
                previous[lane] = judged;
            }
        }
    }
}
