use std::{fmt, time::Duration};

use anyhow::Context;

use crate::gateway::checksum::MerchantKey;

const DEFAULT_WEBSITE: &str = "DEFAULT";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SUCCESS_PAGE: &str = "/success.html";
const DEFAULT_FAILURE_PAGE: &str = "/payment-failed.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Staging,
    Production,
}

impl Environment {
    /// Anything other than `production` falls back to the staging gateway
    fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("production") => Self::Production,
            _ => Self::Staging,
        }
    }

    pub fn gateway_host(&self) -> &'static str {
        match self {
            Self::Staging => "securegw-stage.paytm.in",
            Self::Production => "securegw.paytm.in",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merchant credentials shared by the coordinator and the gateway client
#[derive(Debug, Clone)]
pub struct Merchant {
    pub mid: String,
    pub key: MerchantKey,
    pub website: String,
}

#[derive(Debug, Clone)]
pub struct RedirectPages {
    pub success: String,
    pub failure: String,
}

/// Process configuration.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub merchant: Merchant,
    pub environment: Environment,
    pub port: u16,
    /// Public base url used to build the gateway callback url. When absent the
    /// url is derived from the incoming request host.
    pub callback_base_url: Option<String>,
    pub gateway_timeout: Duration,
    pub pages: RedirectPages,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mid = var("PAYTM_MID").context("PAYTM_MID is not defined")?;
        let key = var("PAYTM_KEY")
            .context("PAYTM_KEY is not defined")?
            .parse::<MerchantKey>()
            .context("PAYTM_KEY is invalid")?;
        let website = var("PAYTM_WEBSITE").unwrap_or_else(|| DEFAULT_WEBSITE.to_string());
        let environment = Environment::from_flag(var("PAYTM_ENV").as_deref());

        let port = match var("PORT") {
            Some(port) => port
                .parse()
                .with_context(|| format!("PORT is not a valid port: {port}"))?,
            None => DEFAULT_PORT,
        };
        let gateway_timeout = match var("GATEWAY_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(
                secs.parse()
                    .with_context(|| format!("GATEWAY_TIMEOUT_SECS is not a number: {secs}"))?,
            ),
            None => DEFAULT_GATEWAY_TIMEOUT,
        };
        let callback_base_url = var("CALLBACK_URL").map(|url| trim_base_url(&url));

        Ok(Self {
            merchant: Merchant { mid, key, website },
            environment,
            port,
            callback_base_url,
            gateway_timeout,
            pages: RedirectPages {
                success: var("SUCCESS_PAGE").unwrap_or_else(|| DEFAULT_SUCCESS_PAGE.to_string()),
                failure: var("FAILURE_PAGE").unwrap_or_else(|| DEFAULT_FAILURE_PAGE.to_string()),
            },
        })
    }

    pub fn gateway_host(&self) -> &'static str {
        self.environment.gateway_host()
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
