//! End-to-end station change tests
//!
//! Drives the full beep-then-switch sequence through the client against a live
//! decode thread and checks what the decoder ended up doing.


use histor_audio::{AudioTaskError, ClientConfig, Connection, SimulatedDecoder};
use histor_core::FileStore;
use std::thread;
use std::time::Duration;
use test_helpers::{beep_decoder, spawn_recording, BEEP};

const SWITCH_TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn beep_plays_before_station_switch() {
    let running = spawn_recording(beep_decoder(20), ClientConfig::default());
    let client = running.task.client();

    assert!(client.connect_to_host("http://old-station").unwrap());
    assert_eq!(client.set_volume(8).unwrap(), 8);

    assert!(client.stop_station_prepare_beep(BEEP).unwrap());
    assert_eq!(
        running.probe.connection(),
        Some(Connection::File(FileStore::Internal, BEEP.to_string()))
    );
    assert!(!running.probe.is_running());

    assert!(client.change_station("http://new-station", 14).unwrap());
    assert!(client.wait_station_switch(SWITCH_TIMEOUT).unwrap());

    assert_eq!(
        running.probe.history(),
        vec![
            Connection::Host("http://old-station".to_string()),
            Connection::File(FileStore::Internal, BEEP.to_string()),
            Connection::Host("http://new-station".to_string()),
        ]
    );
    assert_eq!(client.volume().unwrap(), 14);
    assert!(client.is_running().unwrap());

    running.task.shutdown().unwrap();
}

#[test]
fn latest_change_station_wins() {
    let running = spawn_recording(beep_decoder(200), ClientConfig::default());
    let client = running.task.client();

    assert!(client.stop_station_prepare_beep(BEEP).unwrap());
    assert!(client.change_station("http://first", 5).unwrap());
    // Second request lands while the beep is still audible
    assert!(client.change_station("http://second", 9).unwrap());
    assert!(running.probe.is_running());

    assert!(client.wait_station_switch(SWITCH_TIMEOUT).unwrap());
    assert_eq!(running.probe.current_host().as_deref(), Some("http://second"));
    assert_eq!(client.volume().unwrap(), 9);
    assert!(!running
        .probe
        .history()
        .contains(&Connection::Host("http://first".to_string())));

    running.task.shutdown().unwrap();
}

#[test]
fn completion_survives_intervening_queries() {
    let running = spawn_recording(beep_decoder(30), ClientConfig::default());
    let client = running.task.client();

    client.stop_station_prepare_beep(BEEP).unwrap();
    client.change_station("http://station", 12).unwrap();

    // Keep querying until the switch has happened underneath us
    while running.probe.current_host().is_none() {
        client.elapsed_time().unwrap();
        thread::sleep(Duration::from_millis(2));
    }
    client.is_running().unwrap();

    assert!(client
        .wait_station_switch(Duration::from_millis(500))
        .unwrap());

    running.task.shutdown().unwrap();
}

#[test]
fn change_station_from_live_stream_without_beep() {
    let running = spawn_recording(SimulatedDecoder::new(), ClientConfig::default());
    let client = running.task.client();

    assert!(client.connect_to_host("http://old-station").unwrap());
    assert!(client.change_station("http://new-station", 6).unwrap());
    assert!(client.wait_station_switch(SWITCH_TIMEOUT).unwrap());

    assert_eq!(running.probe.current_host().as_deref(), Some("http://new-station"));
    assert_eq!(client.volume().unwrap(), 6);
    assert!(client.is_running().unwrap());

    running.task.shutdown().unwrap();
}

#[test]
fn unreachable_station_reports_failed_switch() {
    let decoder = SimulatedDecoder::new()
        .with_chunk_bytes(100)
        .with_file(FileStore::Internal, BEEP, 500)
        .with_unreachable_host("http://down");
    let running = spawn_recording(decoder, ClientConfig::default());
    let client = running.task.client();

    client.stop_station_prepare_beep(BEEP).unwrap();
    assert!(client.change_station("http://down", 10).unwrap());
    assert!(!client.wait_station_switch(SWITCH_TIMEOUT).unwrap());
    assert!(!client.is_running().unwrap());

    running.task.shutdown().unwrap();
}

#[test]
fn waiting_without_change_station_is_an_error() {
    let running = spawn_recording(SimulatedDecoder::new(), ClientConfig::default());
    assert!(matches!(
        running.task.client().wait_station_switch(SWITCH_TIMEOUT),
        Err(AudioTaskError::NoStationChange)
    ));
    running.task.shutdown().unwrap();
}

#[test]
fn listener_sees_beep_and_station_as_separate_runs() {
    let running = spawn_recording(beep_decoder(20), ClientConfig::default());
    let client = running.task.client();

    client.stop_station_prepare_beep(BEEP).unwrap();
    client.change_station("http://station", 10).unwrap();
    client.wait_station_switch(SWITCH_TIMEOUT).unwrap();
    client.stop_song().unwrap();
    thread::sleep(Duration::from_millis(20));

    running.task.shutdown().unwrap();

    // Beep starts, beep ends, station starts, station stops
    let edges = running.edges.lock().unwrap().clone();
    assert_eq!(edges, vec![true, false, true, false]);
}
