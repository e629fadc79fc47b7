use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use super::params::{ConnectionParameters, Timeouts};
use crate::error::{SyncError, SyncResult};

/// 解析地址，取第一个可用项
pub(super) fn resolve_addr(addr: &str) -> SyncResult<SocketAddr> {
    let mut addrs = addr.to_socket_addrs().map_err(|e| SyncError::connection(addr, e))?;
    addrs.next().ok_or_else(|| SyncError::connection(addr, "address did not resolve"))
}

/// 创建并配置 TCP 连接
pub(super) fn create_tcp_connection(addr: &str, timeouts: &Timeouts) -> SyncResult<TcpStream> {
    let sock = resolve_addr(addr)?;
    let tcp = TcpStream::connect_timeout(&sock, timeouts.connect)
        .map_err(|e| SyncError::connection(addr, e))?;
    let _ = tcp.set_read_timeout(Some(timeouts.io));
    let _ = tcp.set_write_timeout(Some(timeouts.io));
    Ok(tcp)
}

/// TCP connect, SSH handshake and password authentication.
pub(super) fn connect_session(
    params: &ConnectionParameters,
    timeouts: &Timeouts,
) -> SyncResult<ssh2::Session> {
    let addr = params.addr();
    let tcp = create_tcp_connection(&addr, timeouts)?;
    let mut sess = ssh2::Session::new()
        .map_err(|e| SyncError::connection(&addr, format!("cannot create SSH session: {}", e)))?;
    sess.set_tcp_stream(tcp);
    // libssh2 blocking calls honour this in milliseconds; 0 would mean "forever"
    sess.set_timeout(timeouts.io.as_millis().clamp(1, u32::MAX as u128) as u32);
    sess.handshake()
        .map_err(|e| SyncError::connection(&addr, format!("SSH handshake failed: {}", e)))?;

    sess.userauth_password(&params.username, &params.password).map_err(|e| {
        let reason = format!("authentication failed for {}: {}", params.username, e);
        SyncError::connection(&addr, reason)
    })?;
    if !sess.authenticated() {
        return Err(SyncError::connection(
            &addr,
            format!("authentication failed for {}", params.username),
        ));
    }
    Ok(sess)
}
