//! The lazily-connecting, strictly-serial RCON client.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::RconError;
use crate::packet::{
    read_packet, write_packet, Packet, MAX_BODY, TYPE_AUTH, TYPE_EXEC_OR_AUTH_RESPONSE,
    TYPE_RESPONSE_VALUE,
};

/// Connect timeout for a dial attempt.
const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for a single command exchange on an established connection.
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);

struct Connection {
    stream: TcpStream,
    next_id: i32,
}

impl Connection {
    fn take_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }
}

/// Client for the game's admin port.
///
/// Cheap to share behind an `Arc`; `exec` takes `&self` and serializes
/// callers internally so exactly one command is in flight at a time.
pub struct RconClient {
    address: String,
    password: String,
    conn: Mutex<Option<Connection>>,
}

impl RconClient {
    /// A client for `host:port` with the shared password. No connection
    /// is made until the first [`exec`](Self::exec).
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            address: format!("{}:{port}", host.into()),
            password: password.into(),
            conn: Mutex::new(None),
        }
    }

    /// Execute a console command and return its textual output.
    ///
    /// A call that finds no live connection dials once; a call that loses
    /// the connection mid-exchange redials once and retries the command.
    /// Either way at most one redial happens per call.
    ///
    /// # Errors
    ///
    /// Returns [`RconError::NotReady`] when dialing fails, or the
    /// underlying I/O / protocol error when the retried exchange fails.
    pub async fn exec(&self, cmd: &str) -> Result<String, RconError> {
        let mut guard = self.conn.lock().await;

        let mut dialed_this_call = false;
        if guard.is_none() {
            *guard = Some(self.dial().await?);
            dialed_this_call = true;
        }

        // The unwrap-free pattern: the Option was just filled above.
        let Some(conn) = guard.as_mut() else {
            return Err(RconError::NotReady("no connection".to_owned()));
        };

        match exchange(conn, cmd).await {
            Ok(text) => Ok(text),
            Err(err) => {
                debug!(error = %err, "rcon exchange failed, dropping connection");
                *guard = None;
                if dialed_this_call {
                    // Already spent this call's redial budget.
                    return Err(err);
                }
                *guard = Some(self.dial().await?);
                let Some(conn) = guard.as_mut() else {
                    return Err(RconError::NotReady("no connection".to_owned()));
                };
                match exchange(conn, cmd).await {
                    Ok(text) => Ok(text),
                    Err(err) => {
                        *guard = None;
                        Err(err)
                    }
                }
            }
        }
    }

    /// Drop the connection if one is open. Subsequent calls redial.
    pub async fn close(&self) {
        *self.conn.lock().await = None;
    }

    async fn dial(&self) -> Result<Connection, RconError> {
        let stream = tokio::time::timeout(DIAL_TIMEOUT, TcpStream::connect(&self.address))
            .await
            .map_err(|_| RconError::NotReady(format!("dial timeout to {}", self.address)))?
            .map_err(|err| RconError::NotReady(format!("dial {}: {err}", self.address)))?;

        let mut conn = Connection { stream, next_id: 1 };
        authenticate(&mut conn, &self.password).await?;
        debug!(address = %self.address, "rcon connected");
        Ok(conn)
    }
}

async fn authenticate(conn: &mut Connection, password: &str) -> Result<(), RconError> {
    let auth_id = conn.take_id();
    let request = Packet::new(auth_id, TYPE_AUTH, password.as_bytes());
    let verdict = tokio::time::timeout(EXCHANGE_TIMEOUT, async {
        write_packet(&mut conn.stream, &request).await?;
        loop {
            let packet = read_packet(&mut conn.stream).await?;
            // The server may echo an empty response value before the
            // auth verdict frame.
            if packet.kind == TYPE_EXEC_OR_AUTH_RESPONSE {
                return Ok::<Packet, RconError>(packet);
            }
        }
    })
    .await
    .map_err(|_| RconError::Timeout)??;

    if verdict.id == -1 {
        return Err(RconError::AuthRejected);
    }
    Ok(())
}

/// One command round trip. Large outputs span multiple frames; a trailing
/// sentinel request marks the end of the response stream.
async fn exchange(conn: &mut Connection, cmd: &str) -> Result<String, RconError> {
    let cmd_id = conn.take_id();
    let sentinel_id = conn.take_id();

    tokio::time::timeout(EXCHANGE_TIMEOUT, async {
        write_packet(
            &mut conn.stream,
            &Packet::new(cmd_id, TYPE_EXEC_OR_AUTH_RESPONSE, cmd.as_bytes()),
        )
        .await?;
        write_packet(
            &mut conn.stream,
            &Packet::new(sentinel_id, TYPE_RESPONSE_VALUE, Vec::new()),
        )
        .await?;

        let mut body = Vec::with_capacity(MAX_BODY);
        loop {
            let packet = read_packet(&mut conn.stream).await?;
            if packet.id == sentinel_id {
                break;
            }
            if packet.id == cmd_id && packet.kind == TYPE_RESPONSE_VALUE {
                body.extend_from_slice(&packet.body);
            }
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    })
    .await
    .map_err(|_| RconError::Timeout)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Minimal in-process RCON server: accepts one password, answers every
    /// exec with its body uppercased, echoes sentinels, and drops the
    /// connection after `max_commands` commands.
    async fn spawn_server(password: &'static str, max_commands: usize) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let auth = read_packet(&mut stream).await.unwrap();
                    let verdict_id = if auth.body_text() == password {
                        auth.id
                    } else {
                        -1
                    };
                    write_packet(
                        &mut stream,
                        &Packet::new(verdict_id, TYPE_EXEC_OR_AUTH_RESPONSE, Vec::new()),
                    )
                    .await
                    .unwrap();
                    if verdict_id == -1 {
                        return;
                    }
                    for _ in 0..max_commands {
                        let Ok(cmd) = read_packet(&mut stream).await else {
                            return;
                        };
                        let Ok(sentinel) = read_packet(&mut stream).await else {
                            return;
                        };
                        let reply = cmd.body_text().to_uppercase();
                        write_packet(
                            &mut stream,
                            &Packet::new(cmd.id, TYPE_RESPONSE_VALUE, reply.into_bytes()),
                        )
                        .await
                        .unwrap();
                        write_packet(
                            &mut stream,
                            &Packet::new(sentinel.id, TYPE_RESPONSE_VALUE, Vec::new()),
                        )
                        .await
                        .unwrap();
                    }
                    // Simulate the game closing the port.
                });
            }
        });
        port
    }

    #[tokio::test]
    async fn exec_roundtrip() {
        let port = spawn_server("hunter2", 16).await;
        let client = RconClient::new("127.0.0.1", port, "hunter2");
        assert_eq!(client.exec("status").await.unwrap(), "STATUS");
        assert_eq!(client.exec("tf_lobby_debug").await.unwrap(), "TF_LOBBY_DEBUG");
    }

    #[tokio::test]
    async fn bad_password_is_rejected() {
        let port = spawn_server("hunter2", 16).await;
        let client = RconClient::new("127.0.0.1", port, "wrong");
        assert!(matches!(
            client.exec("status").await,
            Err(RconError::AuthRejected)
        ));
    }

    #[tokio::test]
    async fn reconnects_after_server_drop() {
        let port = spawn_server("hunter2", 1).await;
        let client = RconClient::new("127.0.0.1", port, "hunter2");
        assert_eq!(client.exec("one").await.unwrap(), "ONE");
        // The server dropped the connection after the first command; the
        // next call redials transparently and succeeds.
        assert_eq!(client.exec("two").await.unwrap(), "TWO");
    }

    #[tokio::test]
    async fn unreachable_port_reports_not_ready() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let client = RconClient::new("127.0.0.1", port, "pw");
        assert!(matches!(
            client.exec("status").await,
            Err(RconError::NotReady(_))
        ));
    }
}
