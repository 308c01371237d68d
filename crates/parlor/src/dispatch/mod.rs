//! Inbound packet dispatch.
//!
//! Routing is a registration table keyed by `(kind, command)`, built once
//! at startup. One handler per command id, and an unknown command is a
//! uniform table miss: logged, ignored, connection stays open.

mod agl;
mod area;
mod chat;
mod game;
mod login;
mod room;
mod rules;
mod slot;

pub use login::send_login_query;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;

use parlor_lobby::Client;
use parlor_protocol::{Direction, Kind, Packet, commands};
use parlor_transport::ConnectionId;

use crate::state::ServerState;

pub(crate) type HandlerFuture<'a> =
    Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// One registered handler. Runs synchronously inside the read task that
/// received the packet.
pub(crate) type Handler =
    for<'a> fn(&'a ServerState, ConnectionId, Packet) -> HandlerFuture<'a>;

macro_rules! handler {
    ($name:path) => {{
        fn wrapper<'a>(
            state: &'a ServerState,
            conn: ConnectionId,
            packet: Packet,
        ) -> HandlerFuture<'a> {
            Box::pin($name(state, conn, packet))
        }
        wrapper as Handler
    }};
}

fn table() -> &'static HashMap<(Kind, u16), Handler> {
    static TABLE: OnceLock<HashMap<(Kind, u16), Handler>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use parlor_protocol::commands::*;

        let mut t: HashMap<(Kind, u16), Handler> = HashMap::new();
        let mut q = |cmd: u16, h: Handler| {
            t.insert((Kind::Query, cmd), h);
        };

        // Login and account screens.
        q(UNKN_61A0, handler!(login::on_timeout_params));
        q(UNKN_61A1, handler!(login::on_latency_params));
        q(CHECKRND, handler!(login::on_check_rnd));
        q(HNSELECT, handler!(login::on_hn_select));
        q(MOTHEDAY, handler!(login::on_motd));
        q(CHARSELECT, handler!(login::on_char_select));
        q(RANKINGS, handler!(login::on_rankings));
        q(UNKN_6881, handler!(login::on_6881));
        q(UNKN_6882, handler!(login::on_6882));
        q(UNKN_6181, handler!(login::on_6181));
        q(UNKN_6002, handler!(login::on_6002));
        q(LOGOUT, handler!(login::on_logout));

        // Area screens.
        q(AREACOUNT, handler!(area::on_area_count));
        q(AREAPLAYERCNT, handler!(area::on_area_player_count));
        q(AREASTATUS, handler!(area::on_area_status));
        q(AREANAME, handler!(area::on_area_name));
        q(AREADESCRIPT, handler!(area::on_area_description));
        q(AREASELECT, handler!(area::on_area_select));
        q(EXITAREA, handler!(area::on_exit_area));

        // Room screens.
        q(ROOMSCOUNT, handler!(room::on_rooms_count));
        q(ROOMPLAYERCNT, handler!(room::on_room_player_count));
        q(ROOMSTATUS, handler!(room::on_room_status));
        q(ROOMNAME, handler!(room::on_room_name));
        q(UNKN_6308, handler!(room::on_6308));
        q(ENTERROOM, handler!(room::on_enter_room));

        // Slot screens.
        q(SLOTCOUNT, handler!(slot::on_slot_count));
        q(SLOTSTATUS, handler!(slot::on_slot_status));
        q(SLOTPLRSTATUS, handler!(slot::on_slot_player_status));
        q(SLOTTITLE, handler!(slot::on_slot_title));
        q(SLOTATTRIB2, handler!(slot::on_slot_attrib2));
        q(SLOTPWDPROT, handler!(slot::on_passwd_protect));
        q(SLOTSCENTYPE, handler!(slot::on_scene_type));
        q(PLAYERSTATS, handler!(slot::on_player_stats));
        q(EXITSLOTLIST, handler!(slot::on_exit_slotlist));
        q(CREATESLOT, handler!(slot::on_create_slot));
        q(JOINGAME, handler!(slot::on_join_game));
        q(CANCELSLOT, handler!(slot::on_cancel_slot));
        q(UNKN_6412, handler!(slot::on_6412));
        q(UNKN_6504, handler!(slot::on_6504));

        // Rule configuration.
        q(RULESCOUNT, handler!(rules::on_rules_count));
        q(RULEATTCOUNT, handler!(rules::on_rule_att_count));
        q(UNKN_6601, handler!(rules::on_6601));
        q(UNKN_6602, handler!(rules::on_6602));
        q(RULEDESCRIPT, handler!(rules::on_rule_description));
        q(RULEVALUE, handler!(rules::on_rule_value));
        q(RULEATTRIB, handler!(rules::on_rule_attribute));
        q(ATTRDESCRIPT, handler!(rules::on_attr_description));
        q(ATTRATTRIB, handler!(rules::on_attr_attribute));
        q(SETRULE, handler!(rules::on_set_rule));
        q(SLOTNAME, handler!(rules::on_slot_name));
        q(SLOTPASSWD, handler!(rules::on_slot_password));
        q(SCENESELECT, handler!(rules::on_scene_select));
        q(SLOTTIMER, handler!(rules::on_slot_timer));
        q(UNKN_660C, handler!(rules::on_660c));

        // Pre-game data.
        q(PLAYERCOUNT, handler!(game::on_player_count));
        q(PLAYERNUMBER, handler!(game::on_player_number));
        q(PLAYERSTAT, handler!(game::on_player_stat));
        q(PLAYERSCORE, handler!(game::on_player_score));
        q(GAMESESSION, handler!(game::on_game_session));
        q(GAMEDIFF, handler!(game::on_difficulty));
        q(GSINFO, handler!(game::on_gs_info));

        // After-game lobby.
        q(ENTERAGL, handler!(agl::on_enter_agl));
        q(AGLSTATS, handler!(agl::on_agl_stats));
        q(AGLPLAYERCNT, handler!(agl::on_agl_player_count));
        q(LEAVEAGL, handler!(agl::on_leave_agl));

        // Messaging.
        q(GETINFO, handler!(chat::on_get_info));
        q(EVENTDAT, handler!(chat::on_event_data));
        q(BUDDYLIST, handler!(chat::on_buddy_list));
        q(CHECKBUDDY, handler!(chat::on_check_buddy));
        q(PRIVATEMSG, handler!(chat::on_private_message));

        // Answers to server queries.
        t.insert((Kind::Answer, LOGIN), handler!(login::on_login_answer));
        t.insert(
            (Kind::Answer, CHECKVERSION),
            handler!(login::on_version_answer),
        );
        t.insert(
            (Kind::Answer, CONNCHECK),
            handler!(login::on_conncheck_answer),
        );

        // Client-initiated broadcasts.
        t.insert(
            (Kind::Broadcast, STARTGAME),
            handler!(game::on_start_game),
        );
        t.insert((Kind::Broadcast, CHATIN), handler!(chat::on_chat_in));

        t
    })
}

/// Routes one decoded packet to its handler.
pub async fn dispatch(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    tracing::debug!(
        %conn,
        direction = %packet.direction,
        kind = %packet.kind,
        command = %commands::name(packet.command),
        sequence_id = packet.sequence_id,
        "in"
    );

    if packet.direction != Direction::FromClient {
        tracing::warn!(
            %conn,
            direction = %packet.direction,
            "frame with non-client direction on lobby link, ignoring"
        );
        return;
    }

    match table().get(&(packet.kind, packet.command)) {
        Some(handler) => handler(state, conn, packet).await,
        None => {
            tracing::debug!(
                %conn,
                kind = %packet.kind,
                command = format_args!("0x{:04X}", packet.command),
                "unrecognized command, ignoring"
            );
        }
    }
}

/// Snapshot of the client behind a connection. Frames from connections
/// without one are logged and dropped.
pub(crate) async fn client_of(
    state: &ServerState,
    conn: ConnectionId,
) -> Option<Client> {
    let directory = state.directory.lock().await;
    let client = directory.by_conn(conn).cloned();
    if client.is_none() {
        tracing::debug!(%conn, "frame from connection with no client, dropping");
    }
    client
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_known_commands() {
        let t = table();
        assert!(t.contains_key(&(Kind::Query, commands::AREASELECT)));
        assert!(t.contains_key(&(Kind::Answer, commands::LOGIN)));
        assert!(t.contains_key(&(Kind::Broadcast, commands::CHATIN)));
    }

    #[test]
    fn test_table_misses_unknown_commands() {
        let t = table();
        assert!(!t.contains_key(&(Kind::Query, 0x7FFF)));
        // STARTGAME is only registered as a broadcast.
        assert!(!t.contains_key(&(Kind::Query, commands::STARTGAME)));
    }
}
