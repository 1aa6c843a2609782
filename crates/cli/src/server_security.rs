use anyhow::{Context as AnyhowContext, Result};
use std::net::SocketAddr;

/// Resolve `bind` and refuse non-loopback targets unless `public` is set
pub(crate) async fn resolve_guarded_bind_addrs(
    bind: &str,
    public: bool,
) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(bind)
        .await
        .with_context(|| format!("Failed to resolve bind address: {bind}"))?
        .collect();
    if addrs.is_empty() {
        anyhow::bail!("Bind address resolved to zero socket addrs: {bind}")
    }
    check_loopback(bind, &addrs, public)?;
    Ok(addrs)
}

fn check_loopback(bind: &str, addrs: &[SocketAddr], public: bool) -> Result<()> {
    if !public && addrs.iter().any(|addr| !addr.ip().is_loopback()) {
        anyhow::bail!(
            "Refusing to bind to non-loopback address without --public: {bind}. The org chart exposes directory data to anyone who can reach it."
        )
    }
    Ok(())
}
