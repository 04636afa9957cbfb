use std::{
    fmt,
    io::{self, Write},
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket},
    str::FromStr,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

use parking_lot::Mutex;

use crate::{
    error::{ConfigError, WriterError},
    log::{
        log_record::Record,
        log_writer::{CloseReport, LogWriter},
    },
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// One datagram per record.
    #[default]
    Udp,
    /// Newline-delimited records over one stream.
    Tcp,
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "udp" => Ok(Protocol::Udp),
            "tcp" => Ok(Protocol::Tcp),
            other => Err(ConfigError::Invalid(vec![format!(
                "unknown socket protocol {other:?}"
            )])),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Udp => "udp",
            Protocol::Tcp => "tcp",
        })
    }
}

enum Transport {
    Udp(UdpSocket),
    Tcp(TcpStream),
}

/// Sends each record as a JSON object to a network endpoint.
///
/// Sending happens inline on the caller's thread. The connection is opened
/// on first use and re-opened after a failure; failed sends are counted and
/// never reported to the caller.
pub struct SocketWriter {
    endpoint: String,
    protocol: Protocol,
    conn: Mutex<Option<Transport>>,
    closed: AtomicBool,
    failed: AtomicU64,
    rejected: AtomicU64,
}

impl SocketWriter {
    pub fn new(protocol: Protocol, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            protocol,
            conn: Mutex::new(None),
            closed: AtomicBool::new(false),
            failed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Records lost to encoding, connect or send failures so far.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    fn send(&self, record: &Record) -> Result<(), WriterError> {
        let mut payload = serde_json::to_vec(record)?;
        let mut conn = self.conn.lock();
        if conn.is_none() {
            *conn = Some(self.connect()?);
        }
        let result = match conn.as_mut() {
            Some(Transport::Udp(sock)) => sock.send(&payload).map(|_| ()),
            Some(Transport::Tcp(stream)) => {
                payload.push(b'\n');
                stream.write_all(&payload)
            }
            None => Ok(()),
        };
        if result.is_err() {
            *conn = None;
        }
        result.map_err(WriterError::from)
    }

    fn connect(&self) -> Result<Transport, WriterError> {
        let addr = self.resolve()?;
        match self.protocol {
            Protocol::Udp => {
                let local: SocketAddr = if addr.is_ipv4() {
                    ([0, 0, 0, 0], 0).into()
                } else {
                    ([0u16; 8], 0).into()
                };
                let sock = UdpSocket::bind(local)?;
                sock.connect(addr)?;
                Ok(Transport::Udp(sock))
            }
            Protocol::Tcp => {
                let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
                stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
                Ok(Transport::Tcp(stream))
            }
        }
    }

    fn resolve(&self) -> Result<SocketAddr, WriterError> {
        self.endpoint.to_socket_addrs()?.next().ok_or_else(|| {
            WriterError::Write(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{} resolved to no address", self.endpoint),
            ))
        })
    }
}

impl LogWriter for SocketWriter {
    fn accept(&self, record: Record) {
        if self.closed.load(Ordering::Acquire) {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if let Err(e) = self.send(&record) {
            self.failed.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(endpoint = %self.endpoint, protocol = %self.protocol, error = %e, "log send failed");
        }
    }

    fn close(&self) -> CloseReport {
        if self.closed.swap(true, Ordering::AcqRel) {
            return CloseReport::default();
        }
        if let Some(Transport::Tcp(stream)) = self.conn.lock().take() {
            let _ = stream.shutdown(Shutdown::Write);
        }
        CloseReport {
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            ..CloseReport::default()
        }
    }
}
