//! TCP helper for probing Moxa serial-to-Ethernet gateways.
//!
//! A Moxa NPort exposes each of its serial channels on a TCP port
//! (conventionally 4001, 4002, ...). This module does strictly best-effort
//! plumbing: connect, optionally fire a payload, read whatever comes back
//! within the timeout. An empty response is normal whenever the attached
//! instrument stays silent; it is not an error.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How long the follow-up reads in [`exchange`] wait for bytes that
/// trickle in after the first chunk.
const TRICKLE_TIMEOUT: Duration = Duration::from_millis(200);

/// Gateway connection settings.
///
/// Loaded from the `moxa` section of a JSON config file:
///
/// ```json
/// { "moxa": { "host": "192.168.1.10", "ports": [4001, 4002], "timeout_s": 1.0 } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MoxaConfig {
    /// IP address or hostname of the gateway.
    pub host: String,
    /// TCP ports to probe, one per serial channel.
    pub ports: Vec<u16>,
    /// Connect/read timeout in seconds.
    #[serde(default = "default_timeout_s")]
    pub timeout_s: f64,
}

fn default_timeout_s() -> f64 {
    1.0
}

impl MoxaConfig {
    /// The configured timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_s)
    }

    /// Parse a config document holding a `moxa` section.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        struct Document {
            moxa: MoxaConfig,
        }
        Ok(serde_json::from_str::<Document>(text)?.moxa)
    }

    /// Load the config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&text)?)
    }
}

/// Outcome of probing a single TCP port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortProbe {
    pub port: u16,
    pub ok: bool,
    /// `"connect_ok"`, or the connect error rendered as text.
    pub detail: String,
}

/// Open a TCP connection to one gateway port, with the timeout applied to
/// connecting, reading and writing.
pub fn connect(host: &str, port: u16, timeout: Duration) -> std::io::Result<TcpStream> {
    let addr: SocketAddr = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| std::io::Error::new(ErrorKind::AddrNotAvailable, "host did not resolve"))?;
    let stream = TcpStream::connect_timeout(&addr, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    Ok(stream)
}

/// Try to connect to every configured port, recording success or failure
/// per port. Never fails as a whole.
pub fn scan(config: &MoxaConfig) -> Vec<PortProbe> {
    config
        .ports
        .iter()
        .map(|&port| match connect(&config.host, port, config.timeout()) {
            Ok(_) => {
                debug!("port {port} on {} accepts connections", config.host);
                PortProbe {
                    port,
                    ok: true,
                    detail: "connect_ok".to_owned(),
                }
            }
            Err(e) => {
                warn!("port {port} on {} unreachable: {e}", config.host);
                PortProbe {
                    port,
                    ok: false,
                    detail: e.to_string(),
                }
            }
        })
        .collect()
}

/// Connect to `port`, send `payload` (if any), and read back at most
/// `read_bytes` bytes per chunk.
///
/// After the first chunk, a couple of short follow-up reads pick up bytes
/// that arrive late. Returns whatever arrived; an empty buffer means the
/// channel accepted the payload but nothing answered within the timeout.
pub fn exchange(
    config: &MoxaConfig,
    port: u16,
    payload: &[u8],
    read_bytes: usize,
) -> std::io::Result<Vec<u8>> {
    let mut stream = connect(&config.host, port, config.timeout())?;
    if !payload.is_empty() {
        stream.write_all(payload)?;
    }

    let mut response = Vec::new();
    let mut chunk = vec![0u8; read_bytes.max(1)];
    match stream.read(&mut chunk) {
        Ok(0) => {}
        Ok(count) => {
            response.extend_from_slice(&chunk[..count]);
            stream.set_read_timeout(Some(TRICKLE_TIMEOUT))?;
            for _ in 0..2 {
                match stream.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(count) => response.extend_from_slice(&chunk[..count]),
                    // Timed out: nothing more is coming.
                    Err(e) if is_timeout(&e) => break,
                    Err(e) => return Err(e),
                }
            }
        }
        // Silence within the timeout is a normal outcome.
        Err(e) if is_timeout(&e) => {}
        Err(e) => return Err(e),
    }
    Ok(response)
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn config(host: &str, ports: Vec<u16>) -> MoxaConfig {
        MoxaConfig {
            host: host.to_owned(),
            ports,
            timeout_s: 0.5,
        }
    }

    #[test]
    fn parses_the_original_config_shape() {
        let text = r#"{ "moxa": { "host": "192.168.1.10", "ports": [4001, 4002], "timeout_s": 2.5 } }"#;
        let config = MoxaConfig::from_json(text).unwrap();
        assert_eq!(config.host, "192.168.1.10");
        assert_eq!(config.ports, vec![4001, 4002]);
        assert_eq!(config.timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn timeout_defaults_to_one_second() {
        let text = r#"{ "moxa": { "host": "10.0.0.2", "ports": [4001] } }"#;
        let config = MoxaConfig::from_json(text).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn missing_section_is_rejected() {
        assert!(MoxaConfig::from_json(r#"{ "host": "10.0.0.2" }"#).is_err());
    }

    #[test]
    fn scan_records_success_and_failure_per_port() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let open_port = listener.local_addr().unwrap().port();
        // Grab a port the OS considers free, then release it again.
        let closed_port = {
            let probe = TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };

        let results = scan(&config("127.0.0.1", vec![open_port, closed_port]));

        assert_eq!(results.len(), 2);
        assert!(results[0].ok);
        assert_eq!(results[0].port, open_port);
        assert_eq!(results[0].detail, "connect_ok");
        assert!(!results[1].ok);
        assert_eq!(results[1].port, closed_port);
        assert!(!results[1].detail.is_empty());
    }

    #[test]
    fn exchange_round_trips_a_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"ping");
            stream.write_all(b"pong").unwrap();
            // Dropping the stream closes the connection, ending the
            // client's follow-up reads promptly.
        });

        let response = exchange(&config("127.0.0.1", vec![port]), port, b"ping", 256).unwrap();
        assert_eq!(response, b"pong");
        server.join().unwrap();
    }

    #[test]
    fn silent_peer_yields_an_empty_response() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            // Hold the connection open without answering until the client
            // has certainly timed out.
            std::thread::sleep(Duration::from_millis(700));
            drop(stream);
        });

        let response = exchange(&config("127.0.0.1", vec![port]), port, b"\r\n", 256).unwrap();
        assert!(response.is_empty());
        server.join().unwrap();
    }
}
