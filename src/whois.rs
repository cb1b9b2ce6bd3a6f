//! Domain availability over the WHOIS protocol (RFC 3912).
//!
//! Lookups never fail from the caller's point of view: [`check`] folds every
//! error into [`DomainStatus::Unknown`].

use std::{future::Future, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

/// WHOIS error. Only visible to [`Lookup`] implementors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connecting, writing or reading failed.
    #[error("WHOIS I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The server took too long.
    #[error("WHOIS lookup timed out after {0:?}")]
    Timeout(Duration),
    /// The server closed the connection without a reply.
    #[error("WHOIS server sent an empty reply")]
    Empty,
}

/// Something that can tell whether a domain is registered.
pub trait Lookup {
    /// `true` if `domain` is registered.
    fn is_registered(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<bool, Error>> + Send;
}

/// Port-43 WHOIS client.
#[derive(Debug, Clone)]
pub struct Whois {
    /// `host:port` of the server.
    pub server: String,
    /// Upper bound for the whole exchange.
    pub timeout: Duration,
}

impl Whois {
    /// Registry server for `.com` and `.net`.
    pub const DEFAULT_SERVER: &'static str = "whois.verisign-grs.com:43";
    /// Default [`Self::timeout`].
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Client for `server` (`host` or `host:port`).
    pub fn new<S>(server: S, timeout: Duration) -> Self
    where
        S: Into<String>,
    {
        let mut server = server.into();
        if !server.contains(':') {
            server.push_str(":43");
        }
        Self { server, timeout }
    }

    /// Send the query and read the whole reply.
    pub async fn query(&self, domain: &str) -> Result<String, Error> {
        let exchange = async {
            let mut socket = TcpStream::connect(&self.server).await?;
            socket.write_all(format!("{domain}\r\n").as_bytes()).await?;
            let mut reply = Vec::new();
            socket.read_to_end(&mut reply).await?;
            Ok::<_, Error>(String::from_utf8_lossy(&reply).into_owned())
        };

        let reply = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;

        #[cfg(feature = "log")]
        log::debug!("WHOIS reply for {}:\n{}", domain, reply);

        if reply.trim().is_empty() {
            return Err(Error::Empty);
        }
        Ok(reply)
    }
}

impl Default for Whois {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SERVER, Self::DEFAULT_TIMEOUT)
    }
}

/// A reply describes a registration if it carries a `Domain Name:` field.
/// "No match" replies don't.
pub fn reply_is_registered(reply: &str) -> bool {
    reply.lines().any(|line| {
        line.trim_start()
            .get(..12)
            .is_some_and(|field| field.eq_ignore_ascii_case("domain name:"))
    })
}

impl Lookup for Whois {
    fn is_registered(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<bool, Error>> + Send {
        let domain = domain.to_string();
        async move {
            let reply = self.query(&domain).await?;
            Ok(reply_is_registered(&reply))
        }
    }
}

/// Availability of the domain derived from an app name.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::IsVariant,
)]
pub enum DomainStatus {
    #[allow(missing_docs)]
    #[display("The Domain is Available ✅")]
    Available,
    #[allow(missing_docs)]
    #[display("Domain Taken ❌")]
    Taken,
    /// The lookup failed or no domain could be derived.
    #[display("Domain Availability Unknown ❔")]
    Unknown,
}

/// First word of `name`, lowercased, with `.com` appended. [`None`] for a
/// blank name.
pub fn domain_for(name: &str) -> Option<String> {
    let word = name.split_whitespace().next()?;
    Some(format!("{}.com", word.to_lowercase()))
}

/// Look up the domain for `name`. Errors are logged and reported as
/// [`DomainStatus::Unknown`].
pub async fn check<L>(lookup: &L, name: &str) -> DomainStatus
where
    L: Lookup,
{
    let Some(domain) = domain_for(name) else {
        return DomainStatus::Unknown;
    };

    match lookup.is_registered(&domain).await {
        Ok(true) => DomainStatus::Taken,
        Ok(false) => DomainStatus::Available,
        Err(_error) => {
            #[cfg(feature = "log")]
            log::debug!("Lookup of {} failed: {}", domain, _error);
            DomainStatus::Unknown
        }
    }
}
