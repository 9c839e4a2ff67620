use std::net::UdpSocket;
use std::time::Duration;

use rstest::rstest;
use stroker_hardware::error::HwError;
use stroker_hardware::UdpTransport;
use stroker_traits::Transport;

fn receiver() -> UdpSocket {
    let sock = UdpSocket::bind("127.0.0.1:0").expect("bind receiver");
    sock.set_read_timeout(Some(Duration::from_secs(2)))
        .expect("read timeout");
    sock
}

#[test]
fn line_arrives_as_one_datagram() {
    let rx = receiver();
    let target = rx.local_addr().unwrap().to_string();

    let mut tx = UdpTransport::new("127.0.0.1:0");
    tx.connect(&target).expect("connect");
    assert!(tx.is_connected());
    assert_eq!(tx.peer(), Some(rx.local_addr().unwrap()));

    tx.send(b"L0500I10 R0500I10\n").expect("send");

    let mut buf = [0u8; 64];
    let (n, from) = rx.recv_from(&mut buf).expect("recv");
    assert_eq!(&buf[..n], b"L0500I10 R0500I10\n");
    assert_eq!(Some(from), tx.local_addr());
}

#[test]
fn send_before_connect_is_not_connected() {
    let mut tx = UdpTransport::default();
    let err = tx.send(b"L0500I10\n").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HwError>(),
        Some(HwError::NotConnected)
    ));
}

#[rstest]
#[case("not an address")]
#[case("127.0.0.1")]
fn bad_target_rejected(#[case] target: &str) {
    let mut tx = UdpTransport::default();
    let err = tx.connect(target).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HwError>(),
        Some(HwError::InvalidTarget(_))
    ));
    assert!(!tx.is_connected());
}

#[test]
fn disconnect_is_idempotent() {
    let rx = receiver();
    let mut tx = UdpTransport::new("127.0.0.1:0");
    tx.connect(&rx.local_addr().unwrap().to_string()).unwrap();
    tx.disconnect();
    tx.disconnect();
    assert!(!tx.is_connected());
    assert!(tx.send(b"L0500I10\n").is_err());
}
