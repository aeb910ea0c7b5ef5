use anyhow::{Context as AnyhowContext, Result};
use std::net::SocketAddr;

pub(crate) const AUTH_TOKEN_ENV: &str = "HUILERIE_AUTH_TOKEN";

/// Shared secret expected in `Authorization: Bearer <token>`.
#[derive(Clone, Debug)]
pub(crate) struct AuthToken {
    secret: String,
}

impl AuthToken {
    pub(crate) fn parse(raw: Option<&str>) -> Result<Option<Self>> {
        match raw.map(str::trim) {
            None => Ok(None),
            Some("") => anyhow::bail!("auth token must not be blank"),
            Some(secret) => Ok(Some(Self {
                secret: secret.to_string(),
            })),
        }
    }

    pub(crate) fn accepts(&self, authorization: &str) -> bool {
        bearer_credential(authorization)
            .is_some_and(|presented| constant_time_eq(presented, &self.secret))
    }
}

/// Pick the token from the flag, falling back to the environment, and refuse
/// a public bind that would run without one.
pub(crate) fn resolve_auth_token(flag: Option<&str>, public: bool) -> Result<Option<AuthToken>> {
    let from_env = std::env::var(AUTH_TOKEN_ENV).ok();
    let token = AuthToken::parse(flag.or(from_env.as_deref()))?;
    if public && token.is_none() {
        anyhow::bail!("--public requires an auth token: set --auth-token or export {AUTH_TOKEN_ENV}");
    }
    Ok(token)
}

pub(crate) async fn resolve_guarded_bind_addrs(bind: &str, public: bool) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(bind)
        .await
        .with_context(|| format!("Failed to resolve bind address: {bind}"))?
        .collect();
    if addrs.is_empty() {
        anyhow::bail!("Bind address resolved to no socket addresses: {bind}");
    }

    let exposed: Vec<String> = addrs
        .iter()
        .filter(|addr| !addr.ip().is_loopback())
        .map(ToString::to_string)
        .collect();
    if !exposed.is_empty() && !public {
        anyhow::bail!(
            "Refusing to bind {bind} ({}) without --public. To expose the back office on the network, pass --public and provide {AUTH_TOKEN_ENV} or --auth-token.",
            exposed.join(", ")
        );
    }
    Ok(addrs)
}

/// Prefer an IPv4 address so `localhost` does not land on `::1` alone.
pub(crate) fn choose_preferred_bind_addr(addrs: &[SocketAddr]) -> Option<SocketAddr> {
    addrs
        .iter()
        .copied()
        .find(SocketAddr::is_ipv4)
        .or_else(|| addrs.first().copied())
}

fn bearer_credential(header_value: &str) -> Option<&str> {
    header_value
        .trim()
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|credential| !credential.is_empty())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_trimmed_and_only_bearer_scheme_is_accepted() {
        let token = AuthToken::parse(Some("  olive  ")).unwrap().unwrap();
        assert!(token.accepts("Bearer olive"));
        assert!(token.accepts("  Bearer   olive "));
        assert!(!token.accepts("olive"));
        assert!(!token.accepts("Basic olive"));
        assert!(!token.accepts("Bearer olives"));
        assert!(!token.accepts("Bearer "));
    }

    #[test]
    fn blank_token_is_rejected() {
        assert!(AuthToken::parse(Some("   ")).is_err());
        assert!(AuthToken::parse(None).unwrap().is_none());
    }

    #[test]
    fn explicit_flag_satisfies_public_bind() {
        let token = resolve_auth_token(Some("press"), true).unwrap();
        assert!(token.is_some());
    }

    #[tokio::test]
    async fn non_loopback_bind_needs_public_flag() {
        resolve_guarded_bind_addrs("127.0.0.1:0", false).await.unwrap();

        let err = resolve_guarded_bind_addrs("0.0.0.0:0", false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Refusing to bind"));

        resolve_guarded_bind_addrs("0.0.0.0:0", true).await.unwrap();
    }

    #[tokio::test]
    async fn server_binds_a_checked_address() {
        let addrs = resolve_guarded_bind_addrs("127.0.0.1:0", false).await.unwrap();
        let chosen = choose_preferred_bind_addr(&addrs).unwrap();
        assert!(addrs.contains(&chosen));
        assert!(chosen.ip().is_loopback());

        let v6: SocketAddr = "[::1]:7800".parse().unwrap();
        let v4: SocketAddr = "127.0.0.1:7800".parse().unwrap();
        assert_eq!(choose_preferred_bind_addr(&[v6, v4]), Some(v4));
        assert_eq!(choose_preferred_bind_addr(&[v6]), Some(v6));
        assert_eq!(choose_preferred_bind_addr(&[]), None);
    }
}
