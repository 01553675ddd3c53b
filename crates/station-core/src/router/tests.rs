use super::*;
use crate::{
    config::READY_BANNER,
    response::{ResponseRenderer, Snapshot},
    sensor::ClimateReading,
};

struct ScriptedClimate<'a> {
    readings: &'a [Option<ClimateReading>],
    cursor: usize,
}

impl<'a> ScriptedClimate<'a> {
    const fn new(readings: &'a [Option<ClimateReading>]) -> Self {
        Self {
            readings,
            cursor: 0,
        }
    }
}

impl ClimateSensor for ScriptedClimate<'_> {
    type Error = ();

    fn read(&mut self) -> Result<ClimateReading, Self::Error> {
        let next = self.readings.get(self.cursor).copied().flatten();
        self.cursor = self.cursor.saturating_add(1);
        next.ok_or(())
    }
}

struct ScriptedEcho<'a> {
    echoes: &'a [Option<u32>],
    fired: usize,
}

impl<'a> ScriptedEcho<'a> {
    const fn new(echoes: &'a [Option<u32>]) -> Self {
        Self { echoes, fired: 0 }
    }
}

impl RangeSensor for ScriptedEcho<'_> {
    type Error = ();

    fn echo_time_us(&mut self) -> Result<Option<u32>, Self::Error> {
        let next = self.echoes.get(self.fired).copied().flatten();
        self.fired = self.fired.saturating_add(1);
        Ok(next)
    }
}

/// Emulates a 16x2 panel so tests can read back what was drawn.
#[derive(Default)]
struct RecordingDisplay {
    rows: [String; 2],
    cursor_row: usize,
    clears: usize,
}

impl CharDisplay for RecordingDisplay {
    type Error = ();

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.rows = Default::default();
        self.cursor_row = 0;
        self.clears += 1;
        Ok(())
    }

    fn set_cursor(&mut self, column: u8, row: u8) -> Result<(), Self::Error> {
        assert_eq!(column, 0);
        self.cursor_row = row as usize;
        Ok(())
    }

    fn write_str(&mut self, text: &str) -> Result<(), Self::Error> {
        self.rows[self.cursor_row].push_str(text);
        Ok(())
    }
}

struct BrokenDisplay;

impl CharDisplay for BrokenDisplay {
    type Error = ();

    fn clear(&mut self) -> Result<(), Self::Error> {
        Err(())
    }

    fn set_cursor(&mut self, _column: u8, _row: u8) -> Result<(), Self::Error> {
        Err(())
    }

    fn write_str(&mut self, _text: &str) -> Result<(), Self::Error> {
        Err(())
    }
}

#[derive(Default)]
struct RecordingLed {
    on: bool,
    writes: usize,
}

impl Actuator for RecordingLed {
    type Error = ();

    fn set_on(&mut self, on: bool) -> Result<(), Self::Error> {
        self.on = on;
        self.writes += 1;
        Ok(())
    }

    fn is_on(&mut self) -> bool {
        self.on
    }
}

type TestRouter<'a> =
    RequestRouter<ScriptedClimate<'a>, ScriptedEcho<'a>, RecordingDisplay, RecordingLed>;

fn reading(temperature_c: f32, humidity_pct: f32) -> Option<ClimateReading> {
    Some(ClimateReading {
        temperature_c,
        humidity_pct,
    })
}

fn router<'a>(climate: &'a [Option<ClimateReading>], echoes: &'a [Option<u32>]) -> TestRouter<'a> {
    RequestRouter::new(
        SensorReader::new(ScriptedClimate::new(climate), ScriptedEcho::new(echoes)),
        RecordingDisplay::default(),
        RecordingLed::default(),
        &StationConfig::default(),
    )
}

fn pulses(router: &TestRouter<'_>) -> usize {
    router.sensors.range_sensor().fired
}

fn get(path: &str) -> String {
    format!("GET {path} HTTP/1.1\r\nHost: 192.168.4.1\r\nAccept: */*\r\n\r\n")
}

const GOOD: [Option<ClimateReading>; 8] = [Some(ClimateReading {
    temperature_c: 21.5,
    humidity_pct: 40.0,
}); 8];

#[test]
fn unrecognized_mode_leaves_mode_unchanged() {
    let mut state = DeviceState::new(READY_BANNER);
    let mut router = router(&GOOD, &[]);

    router.handle(&mut state, &get("/?mode=distance"));
    assert_eq!(state.display_mode(), DisplayMode::Distance);

    router.handle(&mut state, &get("/?mode=sideways"));
    assert_eq!(state.display_mode(), DisplayMode::Distance);

    router.handle(&mut state, &get("/?mode=temperature"));
    assert_eq!(state.display_mode(), DisplayMode::Temperature);

    router.handle(&mut state, &get("/?mode=custom"));
    assert_eq!(state.display_mode(), DisplayMode::Custom);
    assert_eq!(state.custom_message(), READY_BANNER);
}

#[test]
fn clear_resets_message_and_mode() {
    for setup in ["/?mode=distance", "/?msg=hello", "/?mode=temperature"] {
        let mut state = DeviceState::new(READY_BANNER);
        let mut router = router(&GOOD, &[]);
        router.handle(&mut state, &get(setup));

        router.handle(&mut state, &get("/?mode=clear"));
        assert_eq!(state.custom_message(), "");
        assert_eq!(state.display_mode(), DisplayMode::Custom);
        assert_eq!(router.display().rows, [String::new(), String::new()]);
    }
}

#[test]
fn message_wins_over_mode_in_same_request() {
    let mut state = DeviceState::new(READY_BANNER);
    let mut router = router(&GOOD, &[]);

    router.handle(&mut state, &get("/?msg=hello&mode=distance"));
    assert_eq!(state.display_mode(), DisplayMode::Custom);
    assert_eq!(state.custom_message(), "hello");
    assert_eq!(router.display().rows[0], "hello");
}

#[test]
fn message_escapes_decode_to_spaces() {
    let mut state = DeviceState::new(READY_BANNER);
    let mut router = router(&GOOD, &[]);

    router.handle(&mut state, &get("/?msg=hello+world%20again"));
    assert_eq!(state.custom_message(), "hello world again");
    assert_eq!(router.display().rows[0], "hello world agai");
}

#[test]
fn request_without_commands_changes_nothing_but_readings() {
    let mut state = DeviceState::new(READY_BANNER);
    let mut router = router(&GOOD, &[]);
    router.handle(&mut state, &get("/?led=on&mode=temperature"));
    let writes_before = router.actuator().writes;

    let response = router.handle(&mut state, &get("/"));

    assert_eq!(response, Response::Page { actuator_on: true });
    assert_eq!(state.display_mode(), DisplayMode::Temperature);
    assert_eq!(state.custom_message(), READY_BANNER);
    assert_eq!(router.actuator().writes, writes_before);
}

#[test]
fn long_message_is_truncated_not_dropped() {
    let mut state = DeviceState::new(READY_BANNER);
    let mut router = router(&GOOD, &[]);
    let path = format!("/?msg={}", "a".repeat(300));

    router.handle(&mut state, &get(&path));

    assert_eq!(state.custom_message(), "a".repeat(32));
    assert_eq!(state.display_mode(), DisplayMode::Custom);
    assert_eq!(router.display().rows[0], "a".repeat(16));
}

#[test]
fn led_commands_drive_actuator() {
    let mut state = DeviceState::new(READY_BANNER);
    let mut router = router(&GOOD, &[]);

    assert_eq!(
        router.handle(&mut state, &get("/?led=on")),
        Response::Page { actuator_on: true }
    );
    assert_eq!(
        router.handle(&mut state, &get("/?msg=hi&led=off")),
        Response::Page { actuator_on: false }
    );
    assert_eq!(router.actuator().writes, 2);
}

#[test]
fn distance_timeout_is_error_on_display_and_null_in_json() {
    let mut state = DeviceState::new(READY_BANNER);
    // First request succeeds, the next two pulses time out.
    let mut router = router(&GOOD, &[Some(1_000), None, None]);

    router.handle(&mut state, &get("/?mode=distance"));
    assert_eq!(router.display().rows[0], "Distance:17.1cm");

    let response = router.handle(&mut state, &get("/data"));
    assert_eq!(router.display().rows[0], "Distance: Error");
    assert_eq!(
        response,
        Response::Json(Snapshot {
            temperature: 21.5,
            humidity: 40.0,
            distance: None,
        })
    );
    assert_eq!(state.last_distance(), None);

    let mut html = String::new();
    ResponseRenderer::new(3_000)
        .page(&mut html, &state, false)
        .unwrap();
    assert!(html.contains("Last distance: unavailable"));
}

#[test]
fn data_request_fires_its_own_pulse() {
    let mut state = DeviceState::new(READY_BANNER);
    state.set_display_mode(DisplayMode::Distance);
    let mut router = router(&GOOD, &[Some(100), Some(2_000)]);

    let response = router.handle(&mut state, &get("/data"));

    assert_eq!(pulses(&router), 2);
    assert_eq!(router.display().rows[0], "Distance:1.7cm");
    match response {
        Response::Json(snapshot) => {
            assert!((snapshot.distance.unwrap() - 34.3).abs() < 1e-3)
        }
        other => panic!("unexpected response {other:?}"),
    }
}

#[test]
fn custom_mode_data_request_fires_one_pulse() {
    let mut state = DeviceState::new(READY_BANNER);
    let mut router = router(&GOOD, &[Some(100)]);

    router.handle(&mut state, &get("/data"));
    assert_eq!(pulses(&router), 1);
    assert_eq!(router.display().rows[0], READY_BANNER);
}

#[test]
fn repeated_climate_failures_keep_last_good_values() {
    let script = [reading(22.0, 55.0), None, None, None];
    let mut state = DeviceState::new(READY_BANNER);
    let mut router = router(&script, &[]);

    router.handle(&mut state, &get("/"));
    assert!(!state.sensor_error());

    for _ in 0..3 {
        router.handle(&mut state, &get("/"));
        assert!(state.sensor_error());
        assert_eq!(state.temperature(), 22.0);
        assert_eq!(state.humidity(), 55.0);
    }
}

#[test]
fn temperature_mode_shows_stored_temperature() {
    for echo in [Some(500), None] {
        let script = [reading(23.4, 50.0)];
        let echoes = [echo];
        let mut state = DeviceState::new(READY_BANNER);
        let mut router = router(&script, &echoes);

        router.handle(&mut state, &get("/?mode=temperature"));
        assert_eq!(router.display().rows[1], "Temp:23.4C");
    }
}

#[test]
fn favicon_probe_touches_nothing() {
    let mut state = DeviceState::new(READY_BANNER);
    let mut router = router(&GOOD, &[Some(100)]);
    let before = state.clone();

    let response = router.handle(&mut state, &get("/favicon.ico?led=on&mode=clear"));

    assert_eq!(response, Response::Close);
    assert_eq!(state, before);
    assert_eq!(router.actuator().writes, 0);
    assert_eq!(router.display().clears, 0);
    assert_eq!(pulses(&router), 0);
}

#[test]
fn every_render_clears_first() {
    let mut state = DeviceState::new(READY_BANNER);
    let mut router = router(&GOOD, &[]);

    router.handle(&mut state, &get("/"));
    router.handle(&mut state, &get("/"));
    assert_eq!(router.display().clears, 2);
}

#[test]
fn display_failure_still_answers_request() {
    let mut state = DeviceState::new(READY_BANNER);
    let mut router = RequestRouter::new(
        SensorReader::new(ScriptedClimate::new(&GOOD), ScriptedEcho::new(&[])),
        BrokenDisplay,
        RecordingLed::default(),
        &StationConfig::default(),
    );

    assert_eq!(
        router.handle(&mut state, &get("/?mode=custom")),
        Response::Page { actuator_on: false }
    );
    assert!(router.refresh_display(&mut state).is_none());
}
