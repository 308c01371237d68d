//! Compound state transitions shared by handlers, the liveness loop, and
//! the disconnect path.

use parlor_lobby::SlotStatus;
use parlor_protocol::{Kind, commands};
use parlor_session::OnlineStatus;
use parlor_transport::ConnectionId;

use crate::broadcasts;
use crate::scopes::Scope;
use crate::state::ServerState;

/// Starts the game in a slot: allocates a game number for every occupant
/// if none exists yet, flips the slot to Busy, and tells exactly that
/// slot's occupants to get ready.
pub(crate) async fn start_game(
    state: &ServerState,
    area: u16,
    room: u16,
    slot: u16,
) {
    let existing = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(area, room, slot)
            .map(|s| s.game_number())
            .unwrap_or(0)
    };

    if existing == 0 {
        let game_number = state.next_game_number();
        let occupants: Vec<_> = {
            let mut directory = state.directory.lock().await;
            directory
                .iter_mut()
                .filter(|c| {
                    c.area == area && c.room == room && c.slot == slot
                })
                .map(|c| {
                    c.game_number = game_number;
                    c.user.clone()
                })
                .collect()
        };
        for user in &occupants {
            if let Err(err) =
                state.store.update_game_number(user, game_number).await
            {
                tracing::warn!(%user, %err, "store failure saving game number");
            }
        }
        if let Ok(s) = state.lobby.lock().await.slot_mut(area, room, slot) {
            s.set_game_number(game_number);
        }
        tracing::info!(area, room, slot, game_number, "game session allocated");
    }

    if let Ok(s) = state.lobby.lock().await.slot_mut(area, room, slot) {
        s.set_status(SlotStatus::Busy);
    }
    broadcasts::slot_status(state, area, room, slot).await;

    let packet = state.server_packet(
        commands::GETREADY,
        Kind::Broadcast,
        Vec::new(),
    );
    state.broadcast(Scope::Slot(area, room, slot), &packet).await;
}

/// How a client removal should treat the underlying socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseMode {
    /// Force the connection closed after eviction.
    Disconnect,
    /// The socket is already going away (read loop exiting); just clean
    /// up shared state.
    SocketGone,
}

/// Removes a client from the directory with all slot fixups and
/// broadcasts, persists it offline, and optionally closes its socket.
///
/// Eviction from shared state always happens before the close, so no
/// broadcast can ever address a dangling directory entry.
pub(crate) async fn remove_client(
    state: &ServerState,
    conn: ConnectionId,
    mode: CloseMode,
) {
    let removed = {
        let mut directory = state.directory.lock().await;
        directory.remove(conn)
    };
    let Some(client) = removed else {
        if mode == CloseMode::Disconnect {
            state.connections.close(conn);
        }
        return;
    };

    tracing::info!(%conn, user = %client.user, "removing client");
    if let Err(err) = state
        .store
        .update_origin(&client.user, OnlineStatus::Offline, -1, 0, 0)
        .await
    {
        tracing::warn!(user = %client.user, %err, "store failure going offline");
    }

    let (area, room, slot) = (client.area, client.room, client.slot);

    if client.host && slot != 0 {
        // A vanished host tears the whole slot down.
        if let Ok(s) = state.lobby.lock().await.slot_mut(area, room, slot) {
            s.reset();
        }
        broadcasts::cancel_slot(state, area, room, slot).await;
        broadcasts::passwd_protect(state, area, room, slot).await;
        broadcasts::scene_type(state, area, room, slot).await;
        broadcasts::slot_title(state, area, room, slot).await;
        broadcasts::slot_attrib2(state, area, room, slot).await;
        broadcasts::slot_player_status(state, area, room, slot).await;
        broadcasts::slot_status(state, area, room, slot).await;
    }

    if !client.host && slot != 0 {
        broadcasts::leave_slot(state, area, room, slot, client.handle_fixed())
            .await;

        let (count, host_alive) = {
            let directory = state.directory.lock().await;
            (
                directory.count_in_slot(area, room, slot),
                directory.host_of_slot(area, room, slot).is_some(),
            )
        };
        let max = {
            let lobby = state.lobby.lock().await;
            lobby
                .slot(area, room, slot)
                .map(|s| s.rules().max_players())
                .unwrap_or(0)
        };

        if count < usize::from(max) && host_alive {
            // Space again and a host still present: reopen for joins.
            if let Ok(s) =
                state.lobby.lock().await.slot_mut(area, room, slot)
            {
                s.set_status(SlotStatus::RuleSet);
            }
        }
        if count == 0 {
            if let Ok(s) =
                state.lobby.lock().await.slot_mut(area, room, slot)
            {
                s.reset();
            }
            broadcasts::passwd_protect(state, area, room, slot).await;
            broadcasts::scene_type(state, area, room, slot).await;
            broadcasts::slot_title(state, area, room, slot).await;
        }

        broadcasts::slot_attrib2(state, area, room, slot).await;
        broadcasts::slot_player_status(state, area, room, slot).await;
        broadcasts::slot_status(state, area, room, slot).await;
    }

    broadcasts::room_player_count(state, area, room).await;

    if mode == CloseMode::Disconnect {
        state.connections.close(conn);
    }
}
