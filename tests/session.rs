use std::collections::VecDeque;
use std::io::Write;
use std::time::Duration;

use face_follow::{
    Candidate, FrameSize, FrameSource, GainParameters, LargestCandidate, LinkError, ReplayFile,
    Session, SessionOptions, TargetObservation, TrackerError, TrackerResult, TrackingController,
    TrackingMode, VehicleTransport, VelocityCommand,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Rc { lateral: i8, forward: i8, vertical: i8, yaw: i8 },
    Takeoff,
    Land,
}

fn rc(command: VelocityCommand) -> Call {
    Call::Rc {
        lateral: command.lateral_speed,
        forward: command.forward_speed,
        vertical: command.vertical_speed,
        yaw: command.yaw,
    }
}

/// Records everything it is asked to do.
#[derive(Default)]
struct FakeLink {
    calls: Vec<Call>,
    // readiness answers in order, ready once exhausted
    ready: VecDeque<bool>,
    fail_sends: bool,
    battery: Option<u8>,
}

impl VehicleTransport for FakeLink {
    fn is_ready(&mut self) -> bool {
        self.ready.pop_front().unwrap_or(true)
    }

    fn send_velocities(&mut self, lateral: i8, forward: i8, vertical: i8, yaw: i8) -> Result<(), LinkError> {
        if self.fail_sends {
            return Err(LinkError::NotConnected);
        }
        self.calls.push(Call::Rc { lateral, forward, vertical, yaw });
        Ok(())
    }

    fn takeoff(&mut self) -> Result<(), LinkError> {
        self.calls.push(Call::Takeoff);
        Ok(())
    }

    fn land(&mut self) -> Result<(), LinkError> {
        self.calls.push(Call::Land);
        Ok(())
    }

    fn battery(&mut self) -> Result<Option<u8>, LinkError> {
        Ok(self.battery)
    }
}

struct ScriptedFrames(VecDeque<Vec<Candidate>>);

impl FrameSource for ScriptedFrames {
    type Frame = Vec<Candidate>;

    fn next_frame(&mut self) -> TrackerResult<Option<Vec<Candidate>>> {
        Ok(self.0.pop_front())
    }
}

fn face(x: i32, y: i32, side: u32) -> Candidate {
    Candidate { x, y, w: side, h: side }
}

fn options() -> SessionOptions {
    SessionOptions {
        tick_interval: Duration::from_millis(1),
        takeoff_delay: Duration::ZERO,
    }
}

fn controller() -> TrackingController {
    TrackingController::new(GainParameters::pd(0.1937, 0.2039), FrameSize::new(720, 480))
}

fn session(frames: Vec<Vec<Candidate>>, link: FakeLink) -> Session<ScriptedFrames, LargestCandidate, FakeLink> {
    Session::new(ScriptedFrames(frames.into()), LargestCandidate, link, controller(), options())
}

#[test]
fn step_tracks_largest_face_and_holds_when_lost() {
    let frames = vec![
        // small face at the centre, larger one to the right wins
        vec![face(350, 230, 20), face(520, 200, 80)],
        vec![],
        vec![face(320, 200, 80)],
    ];
    let mut session = session(frames, FakeLink::default());

    let first = session.step().unwrap().unwrap();
    assert_eq!(first.tick, 1);
    assert_eq!(first.mode, TrackingMode::Tracking);
    assert_eq!(first.observation, Some(TargetObservation::new(560, 240, 6400)));
    assert_eq!((first.error_x, first.error_y), (200, 0));
    assert_eq!(first.command.yaw, 79);

    let second = session.step().unwrap().unwrap();
    assert_eq!(second.mode, TrackingMode::Lost);
    assert_eq!(second.observation, None);
    assert_eq!((second.error_x, second.error_y), (0, 0));
    assert!(second.command.is_hold());

    let third = session.step().unwrap().unwrap();
    assert_eq!(third.mode, TrackingMode::Tracking);
    assert_eq!((third.error_x, third.error_y), (0, 0));
    assert!(third.command.is_hold());

    assert!(session.step().unwrap().is_none());

    let summary = session.summary();
    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.tracked, 2);
    assert_eq!(summary.sent, 3);
    assert_eq!(
        session.link().calls,
        vec![rc(first.command), rc(second.command), rc(third.command)]
    );
}

#[test]
fn not_ready_link_is_skipped_without_error() {
    let link = FakeLink {
        ready: VecDeque::from(vec![false, true]),
        ..FakeLink::default()
    };
    let frames = vec![vec![face(520, 200, 80)], vec![face(520, 200, 80)]];
    let mut session = session(frames, link);

    let first = session.step().unwrap().unwrap();
    let second = session.step().unwrap().unwrap();

    // the controller still ran on the skipped tick, so the second tick has
    // no derivative kick
    assert_eq!(first.command.yaw, 79);
    assert_eq!(second.command.yaw, 38);
    assert_eq!(session.summary().skipped, 1);
    assert_eq!(session.summary().sent, 1);
    assert_eq!(session.link().calls, vec![rc(second.command)]);
}

#[test]
fn failed_sends_do_not_stop_the_session() {
    let link = FakeLink { fail_sends: true, ..FakeLink::default() };
    let frames = vec![vec![face(0, 0, 10)], vec![], vec![face(700, 400, 10)]];
    let mut session = session(frames, link);

    while session.step().unwrap().is_some() {}
    let summary = session.summary();
    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.sent, 0);
}

#[test]
fn bring_up_zeroes_velocities() {
    let link = FakeLink { battery: Some(87), ..FakeLink::default() };
    let mut session = session(vec![], link);
    session.bring_up();
    assert_eq!(session.link().calls, vec![rc(VelocityCommand::HOLD)]);
}

#[tokio::test]
async fn run_takes_off_flies_and_lands() {
    let frames = vec![vec![face(520, 200, 80)], vec![], vec![face(100, 100, 40)]];
    let mut session = session(frames, FakeLink::default());

    let summary = session.run().await.unwrap();
    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.tracked, 2);

    let calls = &session.link().calls;
    assert_eq!(calls.len(), 7);
    assert_eq!(calls[0], rc(VelocityCommand::HOLD));
    assert_eq!(calls[1], Call::Takeoff);
    assert!(matches!(calls[2], Call::Rc { yaw: 79, vertical: 0, .. }));
    assert_eq!(calls[3], rc(VelocityCommand::HOLD));
    assert!(matches!(calls[4], Call::Rc { lateral: 0, forward: 0, .. }));
    assert_eq!(calls[5], rc(VelocityCommand::HOLD));
    assert_eq!(calls[6], Call::Land);
}

#[tokio::test]
async fn long_run_waits_on_one_interrupt_listener() {
    let frames: Vec<Vec<Candidate>> = (0..500)
        .map(|i| if i % 3 == 0 { vec![] } else { vec![face(300 + i % 50, 200, 60)] })
        .collect();
    let mut session = session(frames, FakeLink::default());

    let summary = tokio::time::timeout(Duration::from_secs(10), session.run())
        .await
        .expect("session did not finish")
        .unwrap();
    assert_eq!(summary.ticks, 500);
    assert_eq!(session.link().calls.last(), Some(&Call::Land));
}

#[tokio::test]
async fn bad_replay_line_stops_but_still_lands() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[{{\"x\":520,\"y\":200,\"w\":80,\"h\":80}}]").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "[{{\"x\":520").unwrap();
    file.flush().unwrap();

    let source = ReplayFile::open(file.path()).unwrap();
    let mut session = Session::new(source, LargestCandidate, FakeLink::default(), controller(), options());

    match session.run().await {
        Err(TrackerError::Replay { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected replay error, got {:?}", other),
    }
    assert_eq!(session.summary().ticks, 1);
    assert_eq!(session.link().calls.last(), Some(&Call::Land));
}

#[tokio::test]
async fn unreachable_telemetry_relay_is_ignored() {
    let frames = vec![vec![face(520, 200, 80)], vec![]];
    let mut session = session(frames, FakeLink::default())
        .with_telemetry(face_follow::TelemetrySink::new("http://127.0.0.1:9/telemetry").unwrap());

    let summary = session.run().await.unwrap();
    assert_eq!(summary.ticks, 2);
    assert_eq!(session.link().calls.last(), Some(&Call::Land));
}
