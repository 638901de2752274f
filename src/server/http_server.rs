use std::env;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use may::coroutine::JoinHandle;
use may_minihttp::{HttpServerWithHeaders, HttpService};
use tracing::{debug, info};

/// Coroutine stack size used when `BRRTK_STACK_SIZE` is unset or invalid (16 KB).
pub const DEFAULT_STACK_SIZE: usize = 0x4000;

fn parse_stack_size(raw: Option<&str>) -> usize {
    match raw.map(str::trim) {
        Some(val) => match val.strip_prefix("0x") {
            Some(hex) => usize::from_str_radix(hex, 16).unwrap_or(DEFAULT_STACK_SIZE),
            None => val.parse().unwrap_or(DEFAULT_STACK_SIZE),
        },
        None => DEFAULT_STACK_SIZE,
    }
}

/// Apply `BRRTK_STACK_SIZE` (decimal or `0x` hex) to the coroutine runtime.
///
/// Call once before starting the server. Returns the stack size applied.
pub fn configure_runtime() -> usize {
    let stack_size = parse_stack_size(env::var("BRRTK_STACK_SIZE").ok().as_deref());
    may::config().set_stack_size(stack_size);
    debug!(stack_size, "Coroutine runtime configured");
    stack_size
}

/// Wrapper around may_minihttp's HTTP server
///
/// Uses 32 max headers to accept traffic from API gateways and proxies.
pub struct HttpServer<T>(pub T);

/// Handle to a running HTTP server
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready to accept connections
    ///
    /// # Errors
    ///
    /// `TimedOut` if the server doesn't accept a connection within ~250ms.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Cancel the server coroutine and wait for it to finish.
    pub fn stop(self) {
        // SAFETY: cancelling is marked unsafe by the may runtime; the handle is owned
        // here and is not used after the cancel.
        unsafe {
            self.handle.coroutine().cancel();
        }
        let _ = self.handle.join();
        info!(addr = %self.addr, "Server stopped");
    }

    /// Block until the server coroutine completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the server coroutine panicked.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Start the HTTP server on the given address
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the port cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let handle = HttpServerWithHeaders::<_, 32>(self.0).start(addr)?;
        info!(addr = %addr, "Server listening");
        Ok(ServerHandle { addr, handle })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stack_size() {
        assert_eq!(parse_stack_size(None), DEFAULT_STACK_SIZE);
        assert_eq!(parse_stack_size(Some("0x8000")), 0x8000);
        assert_eq!(parse_stack_size(Some("32768")), 32768);
        assert_eq!(parse_stack_size(Some("lots")), DEFAULT_STACK_SIZE);
    }
}
