mod common;

use common::FakeServer;
use noisetorch_pulse::protocol::Command;
use noisetorch_pulse::{Client, Error};
use tokio::net::UnixStream;

#[tokio::test]
async fn handshake_masks_version_and_keeps_client_index() {
    let cookie = common::cookie();
    let (client_end, server_end) = UnixStream::pair().unwrap();

    let server = tokio::spawn(async move {
        let mut server = FakeServer::new(server_end);

        let mut auth = server.recv().await;
        assert!(auth.is(Command::Auth));
        assert_eq!(auth.args.read_u32().unwrap(), 32);
        assert_eq!(auth.args.read_arbitrary().unwrap(), vec![0xA5; 256]);
        assert!(auth.args.is_empty());
        server
            .reply(auth.tag, |w| {
                w.put_u32(0x1000_0020);
            })
            .await;

        let mut name = server.recv().await;
        assert!(name.is(Command::SetClientName));
        let props = name.args.read_proplist().unwrap();
        server
            .reply(name.tag, |w| {
                w.put_u32(7);
            })
            .await;
        (server, props)
    });

    let client = Client::with_stream(client_end, common::config(&cookie))
        .await
        .unwrap();
    let (_server, props) = server.await.unwrap();

    assert_eq!(client.protocol_version(), 32);
    assert_eq!(client.client_index(), 7);
    assert!(client.is_connected());
    assert_eq!(props.get("application.name"), Some("noisetorch-test"));
    assert_eq!(props.get("application.language"), Some("en_US.UTF-8"));
    let pid = std::process::id().to_string();
    assert_eq!(props.get("application.process.id"), Some(pid.as_str()));
    assert!(props.get("application.process.binary").is_some());
}

#[tokio::test]
async fn old_server_is_rejected_and_the_socket_closed() {
    let cookie = common::cookie();
    let (client_end, server_end) = UnixStream::pair().unwrap();

    let server = tokio::spawn(async move {
        let mut server = FakeServer::new(server_end);
        let auth = server.recv().await;
        server
            .reply(auth.tag, |w| {
                w.put_u32(30);
            })
            .await;
        server.expect_eof().await;
    });

    let err = Client::with_stream(client_end, common::config(&cookie))
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::VersionUnsupported {
            server: 30,
            required: 32
        }
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn short_cookie_fails_before_anything_is_sent() {
    let mut cookie = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut cookie, &[1u8; 128]).unwrap();
    let (client_end, server_end) = UnixStream::pair().unwrap();

    let err = Client::with_stream(client_end, common::config(&cookie))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, Error::BadCookie { .. }));

    let mut server = FakeServer::new(server_end);
    server.expect_eof().await;
}

#[tokio::test]
async fn auth_rejected_by_server() {
    let cookie = common::cookie();
    let (client_end, server_end) = UnixStream::pair().unwrap();

    let server = tokio::spawn(async move {
        let mut server = FakeServer::new(server_end);
        let auth = server.recv().await;
        server.error(auth.tag, 1).await;
        server.expect_eof().await;
    });

    let err = Client::with_stream(client_end, common::config(&cookie))
        .await
        .err()
        .unwrap();
    assert_eq!(err.pulse_code(), Some(1));
    server.await.unwrap();
}

#[tokio::test]
async fn missing_socket_is_a_connect_error() {
    let cookie = common::cookie();
    let dir = tempfile::tempdir().unwrap();
    let config = common::config(&cookie).with_socket_path(dir.path().join("native"));

    let err = Client::connect(config).await.err().unwrap();
    assert!(matches!(err, Error::Connect { .. }));
}
