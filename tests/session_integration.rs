//! End-to-end session tests against a scripted primary over an in-memory stream

use std::sync::Arc;

use synclient::dispatch::{
    standard_handlers, Dispatcher, ProtocolVersion, SessionState, TerminationReason,
};
use synclient::input::{InputEvent, Modifiers, RecordingInputSink};
use synclient::network::{ClientState, FrameTransport, Session, SessionEnd};
use synclient::protocol::{Codec, Registry};
use synclient::screen::{ScreenGeometry, StaticDisplay};
use tokio::io::DuplexStream;

fn session(stream: DuplexStream, sink: RecordingInputSink) -> Session<DuplexStream> {
    let registry = Arc::new(Registry::standard().unwrap());
    let dispatcher = Arc::new(Dispatcher::new(standard_handlers(), &registry));
    assert!(dispatcher.missing().is_empty());

    Session::new(
        FrameTransport::new(stream),
        Codec::new(registry),
        dispatcher,
        Box::new(sink),
        Box::new(StaticDisplay::new(ScreenGeometry::centered(0, 0, 1920, 1080))),
        SessionState::new("tablet", ProtocolVersion::default()),
    )
}

#[tokio::test]
async fn test_full_session() {
    let (client, server) = tokio::io::duplex(4096);
    let sink = RecordingInputSink::new();
    let mut session = session(client, sink.clone());
    let mut primary = FrameTransport::new(server);

    let script = async move {
        primary.write_frame(b"Synergy\x00\x01\x00\x06").await.unwrap();
        primary.write_frame(b"CALV").await.unwrap();
        primary.write_frame(b"XXXX\x00\x01").await.unwrap();
        primary
            .write_frame(b"CINN\x00\x64\x00\xc8\x00\x00\x00\x01\x00\x00")
            .await
            .unwrap();
        primary.write_frame(b"QINF").await.unwrap();
        primary.write_frame(b"DMMV\x01\x00\x01\x20").await.unwrap();
        primary.write_frame(b"EBAD").await.unwrap();

        let mut replies = Vec::new();
        while let Some(frame) = primary.read_frame().await.unwrap() {
            replies.push(frame);
        }
        replies
    };

    let (end, replies) = tokio::join!(session.run(), script);

    assert_eq!(
        end.unwrap(),
        SessionEnd::Terminated(TerminationReason::ProtocolViolation)
    );
    assert_eq!(session.client_state(), ClientState::Terminated);

    // No reply to the unknown frame, the enter or the protocol violation
    assert_eq!(replies.len(), 3);
    assert_eq!(
        replies[0].as_ref(),
        b"Synergy\x00\x01\x00\x06\x00\x00\x00\x06tablet"
    );
    assert_eq!(replies[1].as_ref(), b"CALV");
    assert_eq!(
        replies[2].as_ref(),
        b"DINF\x00\x00\x00\x00\x07\x80\x04\x38\x00\x00\x00\x64\x00\xc8"
    );

    assert_eq!(
        sink.events(),
        vec![
            InputEvent::Enter {
                x: 100,
                y: 200,
                modifiers: Modifiers::default(),
            },
            InputEvent::MouseMove { x: 256, y: 288 },
        ]
    );

    let stats = session.stats();
    assert_eq!(stats.frames_received, 7);
    assert_eq!(stats.decode_failures, 1);
    assert_eq!(stats.replies_sent, 3);
    assert_eq!(session.state().enter_sequence, 1);
}

#[tokio::test]
async fn test_incompatible_server() {
    let (client, server) = tokio::io::duplex(1024);
    let mut session = session(client, RecordingInputSink::new());
    let mut primary = FrameTransport::new(server);

    primary.write_frame(b"EICV\x00\x02\x00\x00").await.unwrap();

    let end = session.run().await.unwrap();
    assert_eq!(
        end,
        SessionEnd::Terminated(TerminationReason::IncompatibleVersion(ProtocolVersion::new(
            2, 0
        )))
    );
    assert!(primary.read_frame().await.unwrap().is_none());
}

#[tokio::test]
async fn test_options_and_keys() {
    let (client, server) = tokio::io::duplex(1024);
    let sink = RecordingInputSink::new();
    let mut session = session(client, sink.clone());
    let mut primary = FrameTransport::new(server);

    primary
        .write_frame(b"DSOP\x00\x00\x00\x02HART\x00\x00\x0b\xb8")
        .await
        .unwrap();
    primary
        .write_frame(b"DKDN\x00\x61\x00\x02\x00\x26")
        .await
        .unwrap();
    primary
        .write_frame(b"DKUP\x00\x61\x00\x02\x00\x26")
        .await
        .unwrap();
    primary.close().await.unwrap();

    assert_eq!(session.run().await.unwrap(), SessionEnd::PeerClosed);
    assert_eq!(session.state().option("HART"), Some(3000));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    match &events[0] {
        InputEvent::KeyDown(key) => {
            assert_eq!(key.key_id, 0x61);
            assert!(key.modifiers.ctrl);
            assert_eq!(key.button, 0x26);
        }
        other => panic!("expected key down, got {:?}", other),
    }
    assert!(matches!(events[1], InputEvent::KeyUp(_)));
}

#[tokio::test]
async fn test_relative_moves_past_edge_keep_session_alive() {
    let (client, server) = tokio::io::duplex(4096);
    let mut session = session(client, RecordingInputSink::new());
    let mut primary = FrameTransport::new(server);

    primary.write_frame(b"DMMV\x07\x80\x04\x38").await.unwrap();
    primary.write_frame(b"DMRM\x7f\xff\x00\x00").await.unwrap();
    primary.write_frame(b"DMRM\x7f\xff\x00\x00").await.unwrap();
    primary.write_frame(b"QINF").await.unwrap();
    primary.write_frame(b"CALV").await.unwrap();
    primary.close().await.unwrap();

    assert_eq!(session.run().await.unwrap(), SessionEnd::PeerClosed);

    assert_eq!(
        primary.read_frame().await.unwrap().unwrap().as_ref(),
        b"DINF\x00\x00\x00\x00\x07\x80\x04\x38\x00\x00\x07\x7f\x04\x37"
    );
    assert_eq!(
        primary.read_frame().await.unwrap().unwrap().as_ref(),
        b"CALV"
    );
    assert_eq!(session.stats().replies_sent, 2);
}
