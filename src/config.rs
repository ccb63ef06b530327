//! Service hosts, zone presets, and client configuration.

use std::time::Duration;

use url::Url;

use crate::{Error, Result, types::DEFAULT_TIMEOUT};

/// Base URLs of the service families.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hosts {
    /// Form upload.
    pub up: Url,
    /// Fetch and prefetch.
    pub io: Url,
    /// Resource management and batch.
    pub rs: Url,
    /// Listing.
    pub rsf: Url,
    /// Persistent processing.
    pub api: Url,
    /// CDN refresh.
    pub cdn: Url,
}

impl Hosts {
    /// Builds hosts from base URL strings, validating each.
    pub fn new(
        up: &str,
        io: &str,
        rs: &str,
        rsf: &str,
        api: &str,
        cdn: &str,
    ) -> Result<Self> {
        Ok(Self {
            up: parse_host(up)?,
            io: parse_host(io)?,
            rs: parse_host(rs)?,
            rsf: parse_host(rsf)?,
            api: parse_host(api)?,
            cdn: parse_host(cdn)?,
        })
    }
}

fn parse_host(value: &str) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|_| Error::invalid_config(format!("host must be a valid absolute URL: {value}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::invalid_config("host scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(Error::invalid_config("host URL must include a host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::invalid_config(
            "host URL must not include query or fragment",
        ));
    }
    Ok(url)
}

/// Appends `path_and_query` to a host base URL.
pub(crate) fn join(base: &Url, path_and_query: &str) -> Result<Url> {
    let joined = format!("{}{}", base.as_str().trim_end_matches('/'), path_and_query);
    Url::parse(&joined).map_err(|_| Error::invalid_config(format!("invalid request URL: {joined}")))
}

/// Storage regions with well-known hosts.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Zone {
    /// East China.
    Z0,
    /// North China.
    Z1,
    /// South China.
    Z2,
    /// North America.
    Na0,
    /// Southeast Asia.
    As0,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Z0 => "z0",
            Self::Z1 => "z1",
            Self::Z2 => "z2",
            Self::Na0 => "na0",
            Self::As0 => "as0",
        }
    }

    /// Hosts of this zone over https (or plain http).
    pub fn hosts(&self, use_https: bool) -> Result<Hosts> {
        let scheme = if use_https { "https" } else { "http" };
        let (up, io, rs, rsf, api) = match self {
            Self::Z0 => (
                "up.qiniup.com",
                "iovip.qbox.me",
                "rs.qbox.me",
                "rsf.qbox.me",
                "api.qiniuapi.com",
            ),
            Self::Z1 => (
                "up-z1.qiniup.com",
                "iovip-z1.qbox.me",
                "rs-z1.qbox.me",
                "rsf-z1.qbox.me",
                "api-z1.qiniuapi.com",
            ),
            Self::Z2 => (
                "up-z2.qiniup.com",
                "iovip-z2.qbox.me",
                "rs-z2.qbox.me",
                "rsf-z2.qbox.me",
                "api-z2.qiniuapi.com",
            ),
            Self::Na0 => (
                "up-na0.qiniup.com",
                "iovip-na0.qbox.me",
                "rs-na0.qbox.me",
                "rsf-na0.qbox.me",
                "api-na0.qiniuapi.com",
            ),
            Self::As0 => (
                "up-as0.qiniup.com",
                "iovip-as0.qbox.me",
                "rs-as0.qbox.me",
                "rsf-as0.qbox.me",
                "api-as0.qiniuapi.com",
            ),
        };

        let url = |host: &str| format!("{scheme}://{host}");
        Hosts::new(
            &url(up),
            &url(io),
            &url(rs),
            &url(rsf),
            &url(api),
            &url("fusion.qiniuapi.com"),
        )
    }
}

impl std::str::FromStr for Zone {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "z0" => Ok(Self::Z0),
            "z1" => Ok(Self::Z1),
            "z2" => Ok(Self::Z2),
            "na0" => Ok(Self::Na0),
            "as0" => Ok(Self::As0),
            "" => Err(Error::invalid_config("zone must not be empty")),
            other => Err(Error::invalid_config(format!("unknown zone: {other}"))),
        }
    }
}

/// Read-only client configuration, fixed at build time.
#[derive(Clone, Debug)]
pub struct Config {
    pub hosts: Hosts,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Overrides the generated `User-Agent`.
    pub user_agent: Option<String>,
}

impl Config {
    pub fn new(hosts: Hosts) -> Self {
        Self {
            hosts,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.timeout.as_millis() == 0 {
            return Err(Error::invalid_config(
                "timeout must be a positive number of milliseconds",
            ));
        }
        if let Some(ua) = &self.user_agent
            && ua.trim().is_empty()
        {
            return Err(Error::invalid_config("user agent must not be empty"));
        }
        Ok(())
    }
}
