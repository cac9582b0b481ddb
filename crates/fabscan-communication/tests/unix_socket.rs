use fabscan_communication::{NetConnectClient, NetConnectConfig, NetConnectError};
use serde_json::json;
use std::io::{Read, Write};
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Accept one connection, read the request up to its NUL, answer with
/// `reply` written in `piece`-sized writes and hand the request back
fn serve_once(listener: UnixListener, reply: Vec<u8>, piece: usize) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut request = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            stream.read_exact(&mut byte).expect("read request");
            request.push(byte[0]);
            if byte[0] == 0 {
                break;
            }
        }
        for chunk in reply.chunks(piece) {
            stream.write_all(chunk).expect("write reply");
            stream.flush().expect("flush");
            thread::sleep(Duration::from_millis(2));
        }
        request
    })
}

fn config_for(path: PathBuf) -> NetConnectConfig {
    NetConnectConfig {
        socket_path: path,
        timeout: Duration::from_secs(2),
        ..NetConnectConfig::default()
    }
}

#[test]
fn test_round_trip_over_unix_socket_with_fragmented_reply() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("netconnectd.sock");
    let listener = UnixListener::bind(&path).expect("bind");

    let reply = b"{\"result\": [{\"ssid\": \"home\", \"address\": \"AA:BB\", \"signal\": 70, \"encrypted\": true}]}\n\x00";
    let server = serve_once(listener, reply.to_vec(), 5);

    let client = NetConnectClient::new(config_for(path));
    let networks = client.list_wifi(false).expect("list wifi");
    let request = server.join().expect("server thread");

    assert_eq!(request, b"{\"list_wifi\":{}}\x00".to_vec());
    assert_eq!(networks.len(), 1);
    assert_eq!(
        serde_json::to_value(&networks).expect("serialize"),
        json!([{"ssid": "home", "address": "AA:BB", "quality": 70, "encrypted": true}])
    );
}

#[test]
fn test_silent_daemon_times_out() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("netconnectd.sock");
    let listener = UnixListener::bind(&path).expect("bind");

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        thread::sleep(Duration::from_millis(500));
        drop(stream);
    });

    let client = NetConnectClient::new(NetConnectConfig {
        timeout: Duration::from_millis(100),
        ..config_for(path)
    });
    assert!(matches!(client.status(), Err(NetConnectError::Timeout)));
    server.join().expect("server thread");
}

#[test]
fn test_absent_daemon_fails_to_connect() {
    let dir = tempfile::tempdir().expect("temp dir");
    let client = NetConnectClient::new(config_for(dir.path().join("missing.sock")));

    match client.status() {
        Err(NetConnectError::Connect { path, .. }) => assert!(path.ends_with("missing.sock")),
        other => panic!("expected connect failure, got {:?}", other),
    }
}
