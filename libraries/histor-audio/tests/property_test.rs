//! Property-based tests for the queue pair and the control loop
//!
//! Uses proptest to check ordering and clamping across random inputs.

use histor_audio::{
    envelope_channel, AudioTaskConfig, CommandKind, ControlLoop, Envelope, NoopListener,
    SimulatedDecoder, StationSequencer, StationTarget, DEFAULT_CAPACITY,
};
use histor_core::Volume;
use proptest::prelude::*;

fn arbitrary_kind() -> impl Strategy<Value = CommandKind> {
    prop::sample::select(CommandKind::ALL.to_vec())
}

fn arbitrary_request() -> impl Strategy<Value = Envelope> {
    (
        arbitrary_kind(),
        any::<u32>(),                            // seq
        any::<u32>(),                            // value
        proptest::option::of("[a-z/:.]{1,24}"), // text
    )
        .prop_map(|(kind, seq, value, text)| {
            let request = Envelope::request(kind, seq).with_value(value);
            match text {
                Some(text) => request.with_text(text),
                None => request,
            }
        })
}

fn control_loop() -> (
    ControlLoop<SimulatedDecoder>,
    histor_audio::EnvelopeSender,
    histor_audio::EnvelopeReceiver,
) {
    let config = AudioTaskConfig {
        idle_delay_ms: 0,
        ..AudioTaskConfig::default()
    };
    let (command_tx, command_rx) = envelope_channel(config.queue_capacity).unwrap();
    let (response_tx, response_rx) = envelope_channel(config.queue_capacity).unwrap();
    let control = ControlLoop::new(
        SimulatedDecoder::new(),
        command_rx,
        response_tx,
        Box::new(NoopListener),
        &config,
    );
    (control, command_tx, response_rx)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: envelopes come out in the order they went in, unchanged
    #[test]
    fn queue_preserves_fifo_order(
        requests in prop::collection::vec(arbitrary_request(), 1..=DEFAULT_CAPACITY)
    ) {
        let (tx, rx) = envelope_channel(DEFAULT_CAPACITY).unwrap();
        for request in &requests {
            tx.try_send(request.clone()).unwrap();
        }

        for expected in &requests {
            let received = rx.try_recv().unwrap();
            prop_assert_eq!(received.as_ref(), Some(expected));
        }
        prop_assert!(rx.is_empty());
    }

    /// Property: a full queue refuses the extra envelope and keeps what it holds
    #[test]
    fn full_queue_never_drops_or_reorders(
        capacity in 1usize..16,
        extra in 1usize..5
    ) {
        let (tx, rx) = envelope_channel(capacity).unwrap();
        let mut refused = 0;
        for seq in 0..(capacity + extra) {
            if tx.try_send(Envelope::request(CommandKind::IsRunning, seq as u32)).is_err() {
                refused += 1;
            }
        }

        prop_assert_eq!(refused, extra);
        for seq in 0..capacity {
            prop_assert_eq!(rx.try_recv().unwrap().unwrap().seq, seq as u32);
        }
    }

    /// Property: set-volume echoes the applied level and get-volume agrees
    #[test]
    fn set_volume_then_get_volume_agree(level in any::<u32>()) {
        let (mut control, tx, rx) = control_loop();

        tx.send(Envelope::request(CommandKind::SetVolume, 1).with_value(level)).unwrap();
        control.step();
        let applied = rx.try_recv().unwrap().unwrap().ret;

        tx.send(Envelope::request(CommandKind::GetVolume, 2)).unwrap();
        control.step();
        let reported = rx.try_recv().unwrap().unwrap().ret;

        prop_assert_eq!(applied, u32::from(Volume::clamped(level).get()));
        prop_assert_eq!(reported, applied);
        prop_assert!(applied <= u32::from(Volume::MAX));
    }

    /// Property: every request gets exactly one immediate reply with its own seq
    #[test]
    fn each_request_gets_one_reply(
        requests in prop::collection::vec(arbitrary_request(), 1..20)
    ) {
        let (mut control, tx, rx) = control_loop();

        for request in &requests {
            tx.send(request.clone()).unwrap();
            control.step();

            let first = rx.try_recv().unwrap();
            prop_assert_eq!(first.as_ref().map(|reply| reply.seq), Some(request.seq));
            prop_assert_eq!(first.as_ref().map(|reply| reply.cmd), Some(request.cmd));

            // Only change-station may add its deferred completion
            while let Some(extra) = rx.try_recv().unwrap() {
                prop_assert_eq!(extra.kind().unwrap(), CommandKind::ChangeStation);
            }
        }
    }

    /// Property: however many targets are armed, only the last is switched to
    #[test]
    fn sequencer_keeps_latest_target(
        urls in prop::collection::vec("http://[a-z]{1,8}", 1..10)
    ) {
        let mut sequencer = StationSequencer::new();
        for (seq, url) in urls.iter().enumerate() {
            sequencer.arm(StationTarget {
                url: url.clone(),
                volume: Volume::default(),
                seq: seq as u32,
            });
        }

        let target = sequencer.begin_switch().unwrap();
        prop_assert_eq!(&target.url, urls.last().unwrap());
        prop_assert_eq!(target.seq, (urls.len() - 1) as u32);
        prop_assert!(sequencer.begin_switch().is_none());
    }
}
