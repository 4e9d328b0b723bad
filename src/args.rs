use anyhow::{Context, Result};
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};

pub struct PingArgs {
    pub dst: Ipv4Addr,
}

pub fn parse() -> Result<PingArgs> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        anyhow::bail!("Uso: ecoping <host|ipv4>");
    }
    let dst = resolve(&args[1])?;
    Ok(PingArgs { dst })
}

/// Aceita um literal IPv4 ou resolve um nome para o primeiro endereço
/// IPv4 retornado pelo sistema.
fn resolve(host: &str) -> Result<Ipv4Addr> {
    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Ok(addr);
    }

    let addrs = (host, 0u16)
        .to_socket_addrs()
        .with_context(|| format!("Não foi possível resolver {}", host))?;

    addrs
        .filter_map(|sa| match sa.ip() {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .next()
        .with_context(|| format!("Nenhum endereço IPv4 para {}", host))
}
