use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::redirect::Policy;
use reqwest::{Method, StatusCode};
use thiserror::Error;
use tokio::net::lookup_host;
use tokio::time::{self, timeout_at};
use tracing::{debug, warn};
use url::{Host, Url};

use super::types::CheckOutcome;
use crate::validation::{TargetPolicy, ValidationError, is_private_ip, validate_site_url, validate_timeout_ms};

/// Redirects followed before a check gives up
const MAX_REDIRECTS: usize = 10;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Issues one bounded reachability check against a URL.
///
/// Unreachable targets are reported as a `Down` outcome, never as an error.
/// Only input that fails validation is rejected, before any network call.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str, timeout_ms: u64) -> Result<CheckOutcome, ValidationError>;
}

/// HTTP prober: HEAD first, one GET when the target refuses HEAD.
///
/// Latency is measured on the request whose response gets classified, from
/// dispatch to headers received. Both requests share the caller's deadline.
///
/// When the policy refuses private targets, the refusal also covers the
/// addresses a hostname resolves to and every redirect hop.
pub struct HttpProber {
    client: reqwest::Client,
    policy: TargetPolicy,
}

#[derive(Debug, Error)]
enum RedirectRefused {
    #[error("more than {MAX_REDIRECTS} redirects")]
    TooMany,
    #[error("redirect to {0}")]
    Target(#[from] ValidationError),
}

/// Decide whether the redirect to `next` may be followed, `sent` requests into the chain
fn check_redirect(next: &Url, sent: usize, policy: TargetPolicy) -> Result<(), RedirectRefused> {
    if sent > MAX_REDIRECTS {
        return Err(RedirectRefused::TooMany);
    }
    validate_site_url(next.as_str(), policy)?;
    Ok(())
}

fn redirect_policy(policy: TargetPolicy) -> Policy {
    Policy::custom(move |attempt| {
        let verdict = check_redirect(attempt.url(), attempt.previous().len(), policy);
        match verdict {
            Ok(()) => attempt.follow(),
            Err(refused) => attempt.error(refused),
        }
    })
}

/// Resolver handing reqwest only public addresses
struct PublicResolver;

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_public(name))
    }
}

async fn resolve_public(name: Name) -> Result<Addrs, BoxError> {
    let addrs: Vec<SocketAddr> = lookup_host((name.as_str(), 0))
        .await?
        .filter(|addr| !is_private_ip(addr.ip()))
        .collect();
    if addrs.is_empty() {
        return Err(Box::new(ValidationError::PrivateTarget(name.as_str().to_string())));
    }
    Ok(Box::new(addrs.into_iter()))
}

/// Refuse a hostname that resolves to a private address.
///
/// Lookup failures pass: the request itself then fails and reports `Down`.
async fn ensure_public_host(host: &str, port: u16) -> Result<(), ValidationError> {
    let Ok(mut addrs) = lookup_host((host, port)).await else {
        return Ok(());
    };
    match addrs.find(|addr| is_private_ip(addr.ip())) {
        Some(addr) => Err(ValidationError::PrivateTarget(format!("{host} ({})", addr.ip()))),
        None => Ok(()),
    }
}

impl HttpProber {
    pub fn new(user_agent: &str, policy: TargetPolicy) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent).redirect(redirect_policy(policy));
        if !policy.allow_private_targets {
            builder = builder.dns_resolver(Arc::new(PublicResolver));
        }

        Ok(Self { client: builder.build()?, policy })
    }

    async fn send_timed(&self, method: Method, url: Url) -> Result<(StatusCode, u64), reqwest::Error> {
        let start = Instant::now();
        let response = self.client.request(method, url).send().await?;
        let elapsed = start.elapsed().as_millis() as u64;

        Ok((response.status(), elapsed))
    }

    async fn head_then_get(&self, url: Url) -> Result<(StatusCode, u64), reqwest::Error> {
        let (status, elapsed) = self.send_timed(Method::HEAD, url.clone()).await?;

        if status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_IMPLEMENTED {
            debug!(%url, %status, "HEAD refused, retrying probe with GET");
            return self.send_timed(Method::GET, url).await;
        }

        Ok((status, elapsed))
    }
}

fn timed_out(url: &Url, timeout_ms: u64) -> CheckOutcome {
    warn!(%url, timeout_ms, "Probe timed out");
    CheckOutcome::unreachable(format!("timed out after {timeout_ms} ms"), Utc::now())
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, timeout_ms: u64) -> Result<CheckOutcome, ValidationError> {
        let timeout_ms = validate_timeout_ms(timeout_ms)?;
        let url = validate_site_url(url, self.policy)?;
        let deadline = time::Instant::now() + Duration::from_millis(timeout_ms);

        if !self.policy.allow_private_targets {
            if let Some(Host::Domain(domain)) = url.host() {
                let port = url.port_or_known_default().unwrap_or(80);
                match timeout_at(deadline, ensure_public_host(domain, port)).await {
                    Ok(checked) => checked?,
                    Err(_) => return Ok(timed_out(&url, timeout_ms)),
                }
            }
        }

        let outcome = match timeout_at(deadline, self.head_then_get(url.clone())).await {
            Ok(Ok((status, elapsed))) => CheckOutcome::responded(status.as_u16(), elapsed, Utc::now()),
            Ok(Err(e)) => {
                warn!(%url, error = %e, "Failed to reach site");
                CheckOutcome::unreachable(describe_failure(&e), Utc::now())
            }
            Err(_) => timed_out(&url, timeout_ms),
        };

        debug!(
            %url,
            status = %outcome.status,
            status_code = ?outcome.http_status_code,
            response_time_ms = outcome.response_time_ms,
            "Probe finished"
        );

        Ok(outcome)
    }
}

fn describe_failure(error: &reqwest::Error) -> String {
    // reqwest's own message leaves out the cause (refused hop, resolver refusal)
    let cause = error.source().map(|source| format!(": {source}")).unwrap_or_default();
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        format!("connection failed{cause}")
    } else if error.is_redirect() {
        format!("redirect not followed{cause}")
    } else {
        format!("request failed: {error}")
    }
}
