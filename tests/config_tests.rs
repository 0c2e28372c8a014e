use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tcp_link::LinkConfig;

#[test]
fn defaults_match_a_local_client() {
    let cfg = LinkConfig::default();

    assert_eq!(cfg.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(cfg.port, 5760);
    assert!(!cfg.as_server);
    assert_eq!(cfg.connect_timeout(), Duration::from_secs(5));
    assert_eq!(cfg.accept_timeout(), Duration::from_secs(5));
    assert!(cfg.no_delay);
    assert_eq!(cfg.rate_buffer_size, 20);
}

#[test]
fn display_name_follows_mode_host_and_port() {
    let client = LinkConfig::client(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 5)), 14550);
    assert_eq!(client.display_name(), "TCP Link (host:192.168.1.5 port:14550)");

    let server = LinkConfig::server(5760);
    assert_eq!(server.display_name(), "TCP Server (host:127.0.0.1 port:5760)");
}

#[test]
fn server_binds_any_address_of_the_host_family() {
    let v4 = LinkConfig::server(7000);
    assert_eq!(v4.bind_addr(), SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 7000));

    let v6 = LinkConfig::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 7001, true);
    assert_eq!(v6.bind_addr(), SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 7001));
    assert_eq!(v6.remote_addr(), SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 7001));
}

#[test]
fn builder_sets_timeouts() {
    let cfg = LinkConfig::server(1)
        .with_accept_timeout(Duration::from_millis(250))
        .with_connect_timeout(Duration::from_millis(750))
        .with_write_timeout(Duration::from_secs(1))
        .with_no_delay(false)
        .with_rate_buffer_size(8);

    assert_eq!(cfg.accept_timeout(), Duration::from_millis(250));
    assert_eq!(cfg.connect_timeout(), Duration::from_millis(750));
    assert_eq!(cfg.write_timeout(), Duration::from_secs(1));
    assert!(!cfg.no_delay);
    assert_eq!(cfg.rate_buffer_size, 8);
}

#[test]
fn deserializes_with_defaults_for_missing_fields() {
    let cfg: LinkConfig =
        serde_json::from_str(r#"{ "host": "10.0.0.2", "port": 6000, "as_server": true }"#)
            .expect("valid config");

    assert_eq!(cfg.host, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
    assert_eq!(cfg.port, 6000);
    assert!(cfg.as_server);
    assert_eq!(cfg.connect_timeout_ms, 5_000);
    assert_eq!(cfg.rate_buffer_size, 20);
}

#[test]
fn rejects_malformed_host() {
    let res: Result<LinkConfig, _> = serde_json::from_str(r#"{ "host": "not-an-ip" }"#);
    assert!(res.is_err());
}

#[test]
fn huge_timeouts_saturate_instead_of_wrapping() {
    let cfg = LinkConfig::default().with_connect_timeout(Duration::MAX);

    assert_eq!(cfg.connect_timeout_ms, u64::MAX);
    assert_eq!(cfg.connect_timeout(), Duration::from_millis(u64::MAX));
}
