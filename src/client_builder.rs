use crate::error::{Error, Result};
use crate::Client;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// A convenience builder for plaintext [`Client`] connections with bounded timeouts.
///
/// ```no_run
/// # use postoffice::ClientBuilder;
/// # use std::time::Duration;
/// # fn main() -> Result<(), postoffice::Error> {
/// let mut client = ClientBuilder::new("pop.example.com", 110)
///     .connect_timeout(Duration::from_secs(5))
///     .timeout(Duration::from_secs(10))
///     .connect()?;
/// client.read_greeting()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder<D>
where
    D: AsRef<str>,
{
    domain: D,
    port: u16,
    connect_timeout: Option<Duration>,
    timeout: Option<Duration>,
}

impl<D> ClientBuilder<D>
where
    D: AsRef<str>,
{
    /// Make a new `ClientBuilder` using the given domain and port.
    pub fn new(domain: D, port: u16) -> Self {
        ClientBuilder {
            domain,
            port,
            connect_timeout: None,
            timeout: None,
        }
    }

    /// Give up on each resolved address after `timeout`.
    pub fn connect_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Fail any single read or write on the session that blocks for longer than `timeout`.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Open the TCP connection.
    ///
    /// Every address the domain resolves to is tried in order; the error from the last attempt
    /// is returned as [`Error::Connect`]. The server greeting is left unread.
    pub fn connect(&self) -> Result<Client<TcpStream>> {
        let tcp = self.open().map_err(Error::Connect)?;
        tcp.set_read_timeout(self.timeout)?;
        tcp.set_write_timeout(self.timeout)?;
        tracing::debug!(domain = self.domain.as_ref(), port = self.port, "connected");
        Ok(Client::new(tcp))
    }

    fn open(&self) -> io::Result<TcpStream> {
        let addr = (self.domain.as_ref(), self.port);
        let timeout = match self.connect_timeout {
            Some(timeout) => timeout,
            None => return TcpStream::connect(addr),
        };

        let mut last_err = None;
        for addr in addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(tcp) => return Ok(tcp),
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "couldn't connect");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "domain resolved to no addresses")
        }))
    }
}
