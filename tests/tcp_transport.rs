use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use gesture_groove::driver::{ClientMessage, ServerMessage};
use gesture_groove::landmarks::{open_hand_at, pinched_hand_at, LandmarkRecord};
use gesture_groove::playback::PlayerCall;
use gesture_groove::{
    ActionDispatcher, GestureLabel, GestureServer, InMemoryPlayer, LandmarkFrame, ServerConfig,
    ServerHandle,
};

struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    fn connect(handle: &ServerHandle) -> Self {
        let stream = TcpStream::connect(handle.addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("read timeout");
        let writer = stream.try_clone().expect("clone stream");
        Self {
            reader: BufReader::new(stream),
            writer,
        }
    }

    fn send_raw(&mut self, line: &str) {
        self.send_bytes(line.as_bytes());
        self.send_bytes(b"\n");
    }

    fn send_bytes(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).expect("send");
    }

    fn send(&mut self, message: &ClientMessage) {
        let line = serde_json::to_string(message).expect("encode");
        self.send_raw(&line);
    }

    fn send_frame(&mut self, frame: &LandmarkFrame) {
        self.send(&ClientMessage::Landmarks(LandmarkRecord::from(frame)));
    }

    fn recv(&mut self) -> ServerMessage {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("reply");
        serde_json::from_str(&line).expect("decode reply")
    }
}

fn spawn_server(player: &InMemoryPlayer) -> ServerHandle {
    let dispatcher = ActionDispatcher::new(Arc::new(player.clone()), 30);
    let cfg = ServerConfig {
        addr: "127.0.0.1:0".to_string(),
        ..ServerConfig::default()
    };
    GestureServer::new(cfg, dispatcher).spawn().expect("spawn server")
}

#[test]
fn swipe_over_tcp_dispatches_next() {
    let player = InMemoryPlayer::new();
    let handle = spawn_server(&player);
    let mut client = Client::connect(&handle);

    for (i, x) in [0.2f32, 0.3, 0.4, 0.5, 0.6].into_iter().enumerate() {
        client.send_frame(&LandmarkFrame::hand(open_hand_at(x, 0.5), 640, 480));
        if i == 4 {
            assert_eq!(
                client.recv(),
                ServerMessage::GestureDetected {
                    gesture: GestureLabel::Next
                }
            );
        }
        assert_eq!(
            client.recv(),
            ServerMessage::Processed {
                frame: i as u64 + 1
            }
        );
    }

    assert_eq!(player.calls(), vec![PlayerCall::Next]);
    drop(client);
    handle.stop().expect("stop server");
}

#[test]
fn malformed_messages_keep_the_session_open() {
    let player = InMemoryPlayer::new();
    let handle = spawn_server(&player);
    let mut client = Client::connect(&handle);

    client.send_raw("{not json");
    assert!(matches!(client.recv(), ServerMessage::Error { .. }));

    client.send_raw(r#"{"type":"landmarks","width":0,"height":480,"landmarks":null}"#);
    assert!(matches!(client.recv(), ServerMessage::Error { .. }));

    client.send_frame(&LandmarkFrame::hand(pinched_hand_at(0.5, 0.5), 640, 480));
    assert_eq!(
        client.recv(),
        ServerMessage::GestureDetected {
            gesture: GestureLabel::PlayPause
        }
    );
    assert_eq!(client.recv(), ServerMessage::Processed { frame: 1 });

    drop(client);
    handle.stop().expect("stop server");
}

#[test]
fn connections_have_independent_cooldowns() {
    let player = InMemoryPlayer::new();
    let handle = spawn_server(&player);
    let mut first = Client::connect(&handle);
    let mut second = Client::connect(&handle);
    let pinch = LandmarkFrame::hand(pinched_hand_at(0.5, 0.5), 640, 480);

    first.send_frame(&pinch);
    assert!(matches!(first.recv(), ServerMessage::GestureDetected { .. }));
    assert_eq!(first.recv(), ServerMessage::Processed { frame: 1 });

    // Inside the first client's cooldown window.
    first.send_frame(&pinch);
    assert_eq!(first.recv(), ServerMessage::Processed { frame: 2 });

    second.send_frame(&pinch);
    assert!(matches!(second.recv(), ServerMessage::GestureDetected { .. }));
    assert_eq!(second.recv(), ServerMessage::Processed { frame: 1 });

    assert_eq!(
        player.calls(),
        vec![
            PlayerCall::Play(Some("local-speaker".to_string())),
            PlayerCall::Pause,
        ]
    );
    drop(first);
    drop(second);
    handle.stop().expect("stop server");
}

#[test]
fn manual_action_is_performed() {
    let player = InMemoryPlayer::new();
    let handle = spawn_server(&player);
    let mut client = Client::connect(&handle);

    client.send(&ClientMessage::Action {
        action: "volume_up".to_string(),
    });
    assert_eq!(
        client.recv(),
        ServerMessage::ActionPerformed {
            action: GestureLabel::VolumeUp
        }
    );
    assert_eq!(player.volume(), 80);

    client.send(&ClientMessage::Action {
        action: "rewind".to_string(),
    });
    assert!(matches!(client.recv(), ServerMessage::Error { .. }));

    drop(client);
    handle.stop().expect("stop server");
}

#[test]
fn stop_closes_open_sessions() {
    let player = InMemoryPlayer::new();
    let handle = spawn_server(&player);
    let mut client = Client::connect(&handle);
    client.send_frame(&LandmarkFrame::no_hand(640, 480));
    assert_eq!(client.recv(), ServerMessage::Processed { frame: 1 });

    // The client stays connected; stop must still return.
    handle.stop().expect("stop server");
    let mut line = String::new();
    let read = client.reader.read_line(&mut line).unwrap_or(0);
    assert_eq!(read, 0);
}

#[test]
fn oversized_message_is_rejected_before_its_newline() {
    let player = InMemoryPlayer::new();
    let handle = spawn_server(&player);
    let mut client = Client::connect(&handle);

    // Four times the limit, and no newline yet.
    client.send_bytes(&vec![b'a'; 256 * 1024]);
    assert_eq!(
        client.recv(),
        ServerMessage::Error {
            message: "message too large".to_string()
        }
    );

    // The rest of the oversized line is dropped; the session keeps working.
    client.send_bytes(b"aaaa\n");
    client.send(&ClientMessage::Action {
        action: "next".to_string(),
    });
    assert_eq!(
        client.recv(),
        ServerMessage::ActionPerformed {
            action: GestureLabel::Next
        }
    );
    assert_eq!(player.calls(), vec![PlayerCall::Next]);

    drop(client);
    handle.stop().expect("stop server");
}

#[test]
fn invalid_utf8_gets_an_error_and_the_session_continues() {
    let player = InMemoryPlayer::new();
    let handle = spawn_server(&player);
    let mut client = Client::connect(&handle);

    client.send_bytes(b"\xff\xfe garbage\n");
    assert_eq!(
        client.recv(),
        ServerMessage::Error {
            message: "invalid utf-8".to_string()
        }
    );

    client.send_raw(r#"{"type":"action","action":"next"}"#);
    assert_eq!(
        client.recv(),
        ServerMessage::ActionPerformed {
            action: GestureLabel::Next
        }
    );

    drop(client);
    handle.stop().expect("stop server");
}
