//! Ordered regular-expression matchers over console lines.
//!
//! Every matcher expects the `MM/DD/YYYY - HH:MM:SS` prefix the game
//! writes to `console.log`. Lines fed back from admin-channel responses
//! (`tf_lobby_debug` output) arrive without that prefix; for those the
//! current wall-clock time is used so the same matcher set serves both
//! sources. A line that matches no pattern, or that matches but carries an
//! unparseable sub-field, is dropped -- parsing never fails upward.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use spycheck_types::{SteamId, Team};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::event::LogEvent;

/// Format of the timestamp prefix.
const TIMESTAMP_FORMAT: &str = "%m/%d/%Y - %H:%M:%S";

/// Compiled matcher set.
pub struct LogParser {
    rx_prefix: Regex,
    rx_chat: Regex,
    rx_kill: Regex,
    rx_connect: Regex,
    rx_status: Regex,
    rx_hostname: Regex,
    rx_map: Regex,
    rx_tags: Regex,
    rx_address: Regex,
    rx_lobby: Regex,
    rx_lobby_changed: Regex,
}

impl Default for LogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LogParser {
    /// Compile the matcher set. The patterns are static, so compilation
    /// cannot fail at runtime.
    #[allow(clippy::unwrap_used)]
    pub fn new() -> Self {
        Self {
            rx_prefix: Regex::new(r"^(\d{2}/\d{2}/\d{4} - \d{2}:\d{2}:\d{2}): ").unwrap(),
            rx_chat: Regex::new(r"^(\*DEAD\*)?(\(TEAM\))?\s*(.+?) :  (.+)$").unwrap(),
            rx_kill: Regex::new(r"^(.+?) killed (.+?) with (.+)\.( \(crit\))?$").unwrap(),
            rx_connect: Regex::new(r"^(.+) connected$").unwrap(),
            rx_status: Regex::new(
                r#"^#\s+(\d+)\s+"(.+)"\s+\[(U:\d+:\d+)\]\s+([\d:]+)\s+(\d+)\s+(\d+)\s+(\w+)"#,
            )
            .unwrap(),
            rx_hostname: Regex::new(r"^hostname: (.+)$").unwrap(),
            rx_map: Regex::new(r"^map\s+: (\S+) at:").unwrap(),
            rx_tags: Regex::new(r"^tags\s+: (.+)$").unwrap(),
            rx_address: Regex::new(r"^udp/ip\s+: ([\d.]+):(\d+)").unwrap(),
            rx_lobby: Regex::new(
                r"^\s*(?:Member|Pending)\[\d+\]\s+\[(U:\d+:\d+)\]\s+team = TF_GC_TEAM_(\w+)",
            )
            .unwrap(),
            rx_lobby_changed: Regex::new(r"^(?:Differing lobby received\.|Disconnect(?::.*)?$)")
                .unwrap(),
        }
    }

    /// Parse a single console line into a typed event.
    ///
    /// Matchers are consulted in a fixed order; the first success wins.
    pub fn parse(&self, line: &str) -> Option<LogEvent> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return None;
        }

        let (timestamp, rest) = match self.rx_prefix.captures(line) {
            Some(caps) => {
                let raw = caps.get(1)?.as_str();
                let parsed = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
                    .map(|naive| naive.and_utc());
                let Ok(ts) = parsed else {
                    debug!(line, "dropping line with malformed timestamp");
                    return None;
                };
                (ts, &line[caps.get(0)?.end()..])
            }
            None => (Utc::now(), line),
        };

        self.parse_body(timestamp, rest)
    }

    fn parse_body(&self, timestamp: DateTime<Utc>, rest: &str) -> Option<LogEvent> {
        if let Some(caps) = self.rx_chat.captures(rest) {
            return Some(LogEvent::Chat {
                timestamp,
                name: caps.get(3)?.as_str().to_owned(),
                message: caps.get(4)?.as_str().to_owned(),
                dead: caps.get(1).is_some(),
                team_only: caps.get(2).is_some(),
            });
        }
        if let Some(caps) = self.rx_kill.captures(rest) {
            return Some(LogEvent::Kill {
                timestamp,
                attacker: caps.get(1)?.as_str().to_owned(),
                victim: caps.get(2)?.as_str().to_owned(),
                weapon: caps.get(3)?.as_str().to_owned(),
                crit: caps.get(4).is_some(),
            });
        }
        if let Some(caps) = self.rx_connect.captures(rest) {
            return Some(LogEvent::Connect {
                timestamp,
                name: caps.get(1)?.as_str().to_owned(),
            });
        }
        if let Some(caps) = self.rx_status.captures(rest) {
            let user_id: i64 = parse_field(caps.get(1)?.as_str(), "user id")?;
            let steam_id = match SteamId::parse_sid3(caps.get(3)?.as_str()) {
                Ok(id) => id,
                Err(err) => {
                    debug!(error = %err, "dropping status line with bad steam id");
                    return None;
                }
            };
            let connected_secs = parse_duration(caps.get(4)?.as_str())?;
            let ping: u32 = parse_field(caps.get(5)?.as_str(), "ping")?;
            return Some(LogEvent::Status {
                timestamp,
                user_id,
                name: caps.get(2)?.as_str().to_owned(),
                steam_id,
                connected_secs,
                ping,
            });
        }
        if let Some(caps) = self.rx_hostname.captures(rest) {
            return Some(LogEvent::Hostname {
                timestamp,
                hostname: caps.get(1)?.as_str().to_owned(),
            });
        }
        if let Some(caps) = self.rx_map.captures(rest) {
            return Some(LogEvent::Map {
                timestamp,
                map: caps.get(1)?.as_str().to_owned(),
            });
        }
        if let Some(caps) = self.rx_tags.captures(rest) {
            let tags = caps
                .get(1)?
                .as_str()
                .split(',')
                .map(|t| t.trim().to_owned())
                .filter(|t| !t.is_empty())
                .collect();
            return Some(LogEvent::Tags { timestamp, tags });
        }
        if let Some(caps) = self.rx_address.captures(rest) {
            let port: u16 = parse_field(caps.get(2)?.as_str(), "port")?;
            return Some(LogEvent::Address {
                timestamp,
                address: caps.get(1)?.as_str().to_owned(),
                port,
            });
        }
        if let Some(caps) = self.rx_lobby.captures(rest) {
            let steam_id = match SteamId::parse_sid3(caps.get(1)?.as_str()) {
                Ok(id) => id,
                Err(err) => {
                    debug!(error = %err, "dropping lobby line with bad steam id");
                    return None;
                }
            };
            let team = match caps.get(2)?.as_str() {
                "DEFENDERS" => Team::Red,
                "INVADERS" => Team::Blue,
                _ => Team::Unassigned,
            };
            return Some(LogEvent::Lobby {
                timestamp,
                steam_id,
                team,
            });
        }
        if self.rx_lobby_changed.is_match(rest) {
            return Some(LogEvent::LobbyChanged { timestamp });
        }
        None
    }
}

fn parse_field<T: std::str::FromStr>(raw: &str, what: &str) -> Option<T> {
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(raw, field = what, "dropping line with unparseable field");
            None
        }
    }
}

/// Parse a `mm:ss` or `hh:mm:ss` connection duration into whole seconds.
fn parse_duration(raw: &str) -> Option<u64> {
    let parts: Vec<&str> = raw.split(':').collect();
    let numbers: Option<Vec<u64>> = parts.iter().map(|p| p.parse().ok()).collect();
    match numbers?.as_slice() {
        [minutes, seconds] => Some(minutes * 60 + seconds),
        [hours, minutes, seconds] => Some(hours * 3600 + minutes * 60 + seconds),
        _ => {
            debug!(raw, "dropping status line with malformed duration");
            None
        }
    }
}

/// Drain raw lines from `lines`, parse each, and forward events until the
/// channel closes or `cancel` fires.
pub async fn run(
    parser: LogParser,
    mut lines: mpsc::Receiver<String>,
    events: mpsc::Sender<LogEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            line = lines.recv() => {
                let Some(line) = line else { break };
                if let Some(event) = parser.parse(&line) {
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
    debug!("log parser exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 2, 24, 23, 37, 19).unwrap()
    }

    fn parse(line: &str) -> Option<LogEvent> {
        LogParser::new().parse(line)
    }

    #[test]
    fn chat_plain() {
        let event = parse("02/24/2023 - 23:37:19: PopcornBucketGames :  I did tell you vix.");
        assert_eq!(
            event,
            Some(LogEvent::Chat {
                timestamp: ts(),
                name: "PopcornBucketGames".to_owned(),
                message: "I did tell you vix.".to_owned(),
                dead: false,
                team_only: false,
            })
        );
    }

    #[test]
    fn chat_dead() {
        let event = parse("02/24/2023 - 23:37:19: *DEAD* that's pretty thick-headed :  ty");
        assert_eq!(
            event,
            Some(LogEvent::Chat {
                timestamp: ts(),
                name: "that's pretty thick-headed".to_owned(),
                message: "ty".to_owned(),
                dead: true,
                team_only: false,
            })
        );
    }

    #[test]
    fn chat_dead_team_only() {
        let event =
            parse("02/24/2023 - 23:37:19: *DEAD*(TEAM) Hassium :  thats the problem vixian");
        assert_eq!(
            event,
            Some(LogEvent::Chat {
                timestamp: ts(),
                name: "Hassium".to_owned(),
                message: "thats the problem vixian".to_owned(),
                dead: true,
                team_only: true,
            })
        );
    }

    #[test]
    fn kill_with_unicode_names() {
        let event = parse("02/24/2023 - 23:37:19: ❤ Ashley ❤ killed [TrC] Nosy with spy_cicle.");
        assert_eq!(
            event,
            Some(LogEvent::Kill {
                timestamp: ts(),
                attacker: "❤ Ashley ❤".to_owned(),
                victim: "[TrC] Nosy".to_owned(),
                weapon: "spy_cicle".to_owned(),
                crit: false,
            })
        );
    }

    #[test]
    fn kill_crit() {
        let event =
            parse("02/24/2023 - 23:37:19: ❤ Ashley ❤ killed [TrC] Nosy with spy_cicle. (crit)");
        let Some(LogEvent::Kill { weapon, crit, .. }) = event else {
            panic!("expected kill event");
        };
        assert_eq!(weapon, "spy_cicle");
        assert!(crit);
    }

    #[test]
    fn connect() {
        let event = parse("02/24/2023 - 23:37:19: Hassium connected");
        assert_eq!(
            event,
            Some(LogEvent::Connect {
                timestamp: ts(),
                name: "Hassium".to_owned(),
            })
        );
    }

    #[test]
    fn status_minutes_seconds() {
        let event = parse(
            "02/24/2023 - 23:37:19: #    672 \"🎄AndreaJingling🎄\" [U:1:238393055] 42:57      62    0 active",
        );
        assert_eq!(
            event,
            Some(LogEvent::Status {
                timestamp: ts(),
                user_id: 672,
                name: "🎄AndreaJingling🎄".to_owned(),
                steam_id: SteamId::from_u64(76_561_198_198_658_783),
                connected_secs: 2577,
                ping: 62,
            })
        );
    }

    #[test]
    fn status_hours_minutes_seconds() {
        let event = parse(
            "02/24/2023 - 23:37:19: #    672 \"some nerd\" [U:1:238393055] 42:57:02    62    0 active",
        );
        let Some(LogEvent::Status { connected_secs, .. }) = event else {
            panic!("expected status event");
        };
        assert_eq!(connected_secs, 154_622);
    }

    #[test]
    fn hostname() {
        let event =
            parse("02/24/2023 - 23:37:19: hostname: Uncletopia | Seattle | 1 | All Maps");
        assert_eq!(
            event,
            Some(LogEvent::Hostname {
                timestamp: ts(),
                hostname: "Uncletopia | Seattle | 1 | All Maps".to_owned(),
            })
        );
    }

    #[test]
    fn map_name_only() {
        let event =
            parse("02/24/2023 - 23:37:19: map     : pl_swiftwater_final1 at: 0 x, 0 y, 0 z");
        assert_eq!(
            event,
            Some(LogEvent::Map {
                timestamp: ts(),
                map: "pl_swiftwater_final1".to_owned(),
            })
        );
    }

    #[test]
    fn tags_split() {
        let event = parse("02/24/2023 - 23:37:19: tags    : nocrits,nodmgspread,payload,uncletopia");
        assert_eq!(
            event,
            Some(LogEvent::Tags {
                timestamp: ts(),
                tags: vec![
                    "nocrits".to_owned(),
                    "nodmgspread".to_owned(),
                    "payload".to_owned(),
                    "uncletopia".to_owned(),
                ],
            })
        );
    }

    #[test]
    fn address() {
        let event = parse("02/24/2023 - 23:37:19: udp/ip  : 74.91.117.2:27015");
        assert_eq!(
            event,
            Some(LogEvent::Address {
                timestamp: ts(),
                address: "74.91.117.2".to_owned(),
                port: 27015,
            })
        );
    }

    #[test]
    fn lobby_member_without_timestamp() {
        // tf_lobby_debug output arrives via the admin channel, unprefixed.
        let event =
            parse("  Member[22] [U:1:238393055]  team = TF_GC_TEAM_DEFENDERS  type = MATCH_PLAYER");
        let Some(LogEvent::Lobby { steam_id, team, .. }) = event else {
            panic!("expected lobby event");
        };
        assert_eq!(steam_id, SteamId::from_u64(76_561_198_198_658_783));
        assert_eq!(team, Team::Red);
    }

    #[test]
    fn lobby_invaders_are_blue() {
        let event = parse("  Member[3] [U:1:111] team = TF_GC_TEAM_INVADERS  type = MATCH_PLAYER");
        let Some(LogEvent::Lobby { team, .. }) = event else {
            panic!("expected lobby event");
        };
        assert_eq!(team, Team::Blue);
    }

    #[test]
    fn differing_lobby_sentinel() {
        let event = parse(
            "02/24/2023 - 23:37:19: Differing lobby received. Lobby: [A:1:1191368713:22805]/Match79636263/Lobby601530352177650 CurrentlyAssigned: [A:1:1191368713:22805]/Match79636024/Lobby601530352177650 ConnectedToMatchServer: 1 HasLobby: 1 AssignedMatchEnded: 0",
        );
        assert_eq!(event, Some(LogEvent::LobbyChanged { timestamp: ts() }));
    }

    #[test]
    fn disconnect_is_a_session_end() {
        let event = parse("02/24/2023 - 23:37:19: Disconnect: #TF_Idle_kicked.");
        assert_eq!(event, Some(LogEvent::LobbyChanged { timestamp: ts() }));
    }

    #[test]
    fn noise_is_dropped() {
        assert_eq!(parse("02/24/2023 - 23:37:19: Lobby updated"), None);
        assert_eq!(parse(""), None);
        assert_eq!(parse("some random unprefixed text"), None);
    }
}
