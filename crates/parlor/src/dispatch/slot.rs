//! Slot-screen handlers: browsing, creation, joining, leaving.

use parlor_lobby::SlotStatus;
use parlor_protocol::{Kind, Packet, commands, crypt, packet_string};
use parlor_session::OnlineStatus;
use parlor_transport::ConnectionId;

use crate::broadcasts;
use crate::dispatch::client_of;
use crate::scopes::Scope;
use crate::state::ServerState;

/// `[count:2]` — slots per room.
pub(crate) async fn on_slot_count(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let count = {
        let lobby = state.lobby.lock().await;
        lobby.slot_count()
    };
    let answer = state.answer(
        &packet,
        commands::SLOTCOUNT,
        count.to_be_bytes().to_vec(),
    );
    state.send(conn, &answer);
}

/// `[slot:2][status]`.
pub(crate) async fn on_slot_status(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();
    let status = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(client.area, client.room, slot)
            .map(|s| s.status().as_byte())
            .unwrap_or(0)
    };
    let mut payload = slot.to_be_bytes().to_vec();
    payload.push(status);

    let answer = state.answer(&packet, commands::SLOTSTATUS, payload);
    state.send(conn, &answer);
}

/// Occupancy/capacity of one slot.
pub(crate) async fn on_slot_player_status(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();
    let payload = broadcasts::slot_player_status_payload(
        state,
        client.area,
        client.room,
        slot,
    )
    .await;

    let answer = state.answer(&packet, commands::SLOTPLRSTATUS, payload);
    state.send(conn, &answer);
}

/// `[slot:2][len:2][title]`.
pub(crate) async fn on_slot_title(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();

    // Character test slot keeps its fixed name.
    let title = if client.area == 2 && client.room == 1 && slot == 3 {
        b"Testgame".to_vec()
    } else {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(client.area, client.room, slot)
            .map(|s| s.name().to_vec())
            .unwrap_or_default()
    };

    let mut payload = slot.to_be_bytes().to_vec();
    payload.extend_from_slice(&packet_string(&title));

    let answer = state.answer(&packet, commands::SLOTTITLE, payload);
    state.send(conn, &answer);
}

/// Secondary slot attributes.
pub(crate) async fn on_slot_attrib2(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();
    let payload = broadcasts::slot_attrib2_payload(
        state,
        client.area,
        client.room,
        slot,
    )
    .await;

    let answer = state.answer(&packet, commands::SLOTATTRIB2, payload);
    state.send(conn, &answer);
}

/// `[slot:2][protection]`.
pub(crate) async fn on_passwd_protect(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();
    let protection = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(client.area, client.room, slot)
            .map(|s| s.protection())
            .unwrap_or(0)
    };
    let mut payload = slot.to_be_bytes().to_vec();
    payload.push(protection);

    let answer = state.answer(&packet, commands::SLOTPWDPROT, payload);
    state.send(conn, &answer);
}

/// `[slot:2][00 type][00 scenario]`.
pub(crate) async fn on_scene_type(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();
    let payload = broadcasts::scene_type_payload(
        state,
        client.area,
        client.room,
        slot,
    )
    .await;

    let answer = state.answer(&packet, commands::SLOTSCENTYPE, payload);
    state.send(conn, &answer);
}

/// Statistics of every occupant of a slot.
pub(crate) async fn on_player_stats(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();
    let mut block = {
        let directory = state.directory.lock().await;
        directory.player_stats_block(client.area, client.room, slot)
    };

    // Character test slot: overwrite one byte per entry with a dummy
    // value, walking handle/nickname/stats fields by their prefixes.
    if client.area == 2 && client.room == 1 && slot == 3 {
        let count = block.get(3).copied().unwrap_or(0);
        let mut ptr = 4usize;
        'entries: for _ in 0..count {
            for _ in 0..3 {
                let Some(&len) = block.get(ptr + 1) else {
                    break 'entries;
                };
                ptr += 2 + usize::from(len);
            }
            if ptr >= 8 && ptr <= block.len() {
                block[ptr - 8] = 0xFF;
            }
        }
    }

    let answer = state.answer(&packet, commands::PLAYERSTATS, block);
    state.send(conn, &answer);
}

/// Back to the room list.
pub(crate) async fn on_exit_slotlist(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let (area, room) = (client.area, client.room);

    {
        let mut directory = state.directory.lock().await;
        if let Some(c) = directory.by_conn_mut(conn) {
            c.room = 0;
        }
    }
    if let Err(err) = state
        .store
        .update_origin(
            &client.user,
            OnlineStatus::Lobby,
            i32::from(area),
            room,
            0,
        )
        .await
    {
        tracing::warn!(user = %client.user, %err, "store failure persisting exit");
    }

    let answer = state.answer(&packet, commands::EXITSLOTLIST, Vec::new());
    state.send(conn, &answer);

    broadcasts::room_player_count(state, area, room).await;
}

/// Creates a slot: the requester becomes host and player 1, the slot
/// enters creation with its wait timer armed.
pub(crate) async fn on_create_slot(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let (area, room) = (client.area, client.room);
    let slot = packet.leading_number();

    {
        let mut directory = state.directory.lock().await;
        if let Some(c) = directory.by_conn_mut(conn) {
            c.slot = slot;
            c.host = true;
            c.player = 1;
        }
    }
    if let Err(err) = state
        .store
        .update_origin(
            &client.user,
            OnlineStatus::Lobby,
            i32::from(area),
            room,
            slot,
        )
        .await
    {
        tracing::warn!(user = %client.user, %err, "store failure persisting slot");
    }

    {
        let mut lobby = state.lobby.lock().await;
        if let Ok(s) = lobby.slot_mut(area, room, slot) {
            s.set_status(SlotStatus::InCreation);
            s.arm_timer();
            s.set_host(client.user.clone());
        }
    }

    broadcasts::slot_player_status(state, area, room, slot).await;
    broadcasts::slot_status(state, area, room, slot).await;

    let answer = state.answer(
        &packet,
        commands::CREATESLOT,
        vec![0x00, slot as u8],
    );
    state.send(conn, &answer);
}

/// Joins a configured slot.
///
/// Rejections (full / not joinable yet / wrong password) answer with the
/// error flag and a markup message before any state mutates.
pub(crate) async fn on_join_game(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let (area, room) = (client.area, client.room);
    let slot = packet.leading_number();
    tracing::debug!(%conn, area, room, slot, "join request");

    let (status, password, protection, max) = {
        let lobby = state.lobby.lock().await;
        match lobby.slot(area, room, slot) {
            Some(s) => (
                s.status(),
                s.password().to_vec(),
                s.protection(),
                s.rules().max_players(),
            ),
            None => (SlotStatus::Disabled, Vec::new(), 0, 0),
        }
    };

    if status == SlotStatus::Busy {
        let message =
            packet_string(b"<LF=6><BODY><CENTER>game is full<END>");
        let answer = state
            .answer(&packet, commands::JOINGAME, message)
            .with_error();
        state.send(conn, &answer);
        return;
    }
    if status != SlotStatus::RuleSet {
        let message =
            packet_string(b"<LF=6><BODY><CENTER>not possible<END>");
        let answer = state
            .answer(&packet, commands::JOINGAME, message)
            .with_error();
        state.send(conn, &answer);
        return;
    }

    let offered = if packet.payload.len() > 2 {
        crypt::decrypt_field(&packet.payload, 2, packet.sequence_id)
            .map(|(data, _)| data)
            .unwrap_or_default()
    } else {
        Vec::new()
    };
    if offered != password && protection != 0 {
        let message =
            packet_string(b"<LF=6><BODY><CENTER>wrong password<END>");
        let answer = state
            .answer(&packet, commands::JOINGAME, message)
            .with_error();
        state.send(conn, &answer);
        return;
    }

    let (player, count_after) = {
        let mut directory = state.directory.lock().await;
        let player = directory.free_player_number(area, room, slot);
        if let Some(c) = directory.by_conn_mut(conn) {
            c.slot = slot;
            c.player = player;
        }
        (player, directory.count_in_slot(area, room, slot))
    };
    tracing::debug!(%conn, player, "assigned player number");

    if let Err(err) = state
        .store
        .update_origin(
            &client.user,
            OnlineStatus::Lobby,
            i32::from(area),
            room,
            slot,
        )
        .await
    {
        tracing::warn!(user = %client.user, %err, "store failure persisting join");
    }

    let answer = state.answer(
        &packet,
        commands::JOINGAME,
        vec![0x00, slot as u8],
    );
    state.send(conn, &answer);

    if count_after >= usize::from(max) {
        if let Ok(s) = state.lobby.lock().await.slot_mut(area, room, slot) {
            s.set_status(SlotStatus::Busy);
        }
    }

    broadcasts::slot_player_status(state, area, room, slot).await;
    broadcasts::slot_status(state, area, room, slot).await;
    broadcasts::slot_attrib2(state, area, room, slot).await;

    // The slot learns about its new player's statistics.
    let stats = {
        let directory = state.directory.lock().await;
        directory.by_conn(conn).map(|c| c.stat_block())
    };
    if let Some(stats) = stats {
        let broadcast = state.server_packet(
            commands::PLAYERSTATBC,
            Kind::Broadcast,
            stats,
        );
        state
            .broadcast(Scope::Slot(area, room, slot), &broadcast)
            .await;
    }
}

/// Host cancellation resets the slot; a non-host simply leaves. Either
/// way the occupancy and status are re-announced.
pub(crate) async fn on_cancel_slot(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let (area, room, slot) = (client.area, client.room, client.slot);
    let was_host = client.host;

    if was_host {
        {
            let mut directory = state.directory.lock().await;
            if let Some(c) = directory.by_conn_mut(conn) {
                c.host = false;
            }
        }
        if let Ok(s) = state.lobby.lock().await.slot_mut(area, room, slot) {
            s.reset();
        }
        broadcasts::cancel_slot(state, area, room, slot).await;
        broadcasts::passwd_protect(state, area, room, slot).await;
        broadcasts::scene_type(state, area, room, slot).await;
        broadcasts::slot_title(state, area, room, slot).await;
    }

    broadcasts::leave_slot(state, area, room, slot, client.handle_fixed())
        .await;

    {
        let mut directory = state.directory.lock().await;
        if let Some(c) = directory.by_conn_mut(conn) {
            c.player = 0;
            c.slot = 0;
        }
    }
    if let Err(err) = state
        .store
        .update_origin(
            &client.user,
            OnlineStatus::Lobby,
            i32::from(area),
            room,
            0,
        )
        .await
    {
        tracing::warn!(user = %client.user, %err, "store failure persisting leave");
    }

    broadcasts::slot_attrib2(state, area, room, slot).await;

    let (count, max) = {
        let directory = state.directory.lock().await;
        let count = directory.count_in_slot(area, room, slot);
        let lobby = state.lobby.lock().await;
        let max = lobby
            .slot(area, room, slot)
            .map(|s| s.rules().max_players())
            .unwrap_or(0);
        (count, max)
    };
    if count < usize::from(max) && !was_host {
        // Others can come in again.
        if let Ok(s) = state.lobby.lock().await.slot_mut(area, room, slot) {
            s.set_status(SlotStatus::RuleSet);
        }
    }

    broadcasts::slot_player_status(state, area, room, slot).await;
    broadcasts::slot_status(state, area, room, slot).await;

    let answer = state.answer(&packet, commands::CANCELSLOT, Vec::new());
    state.send(conn, &answer);
}

/// Unknown; echoes the queried number ahead of four zero bytes.
pub(crate) async fn on_6412(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let nr = packet.leading_number();
    let answer = state.answer(
        &packet,
        commands::UNKN_6412,
        vec![0x00, nr as u8, 0x00, 0x00, 0x00, 0x00],
    );
    state.send(conn, &answer);
}

/// Final packet from the slot creator: the slot opens for joins and its
/// full attribute set is re-announced.
pub(crate) async fn on_6504(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let (area, room, slot) = (client.area, client.room, client.slot);

    if client.host {
        let mut lobby = state.lobby.lock().await;
        if let Ok(s) = lobby.slot_mut(area, room, slot) {
            s.set_status(SlotStatus::RuleSet);
            s.arm_timer();
        }
    }

    broadcasts::slot_player_status(state, area, room, slot).await;
    broadcasts::passwd_protect(state, area, room, slot).await;
    broadcasts::scene_type(state, area, room, slot).await;
    broadcasts::slot_attrib2(state, area, room, slot).await;
    broadcasts::slot_status(state, area, room, slot).await;
    broadcasts::player_ok(state, area, room, slot, client.player).await;

    let first = packet.payload.first().copied().unwrap_or(1);
    let answer = state.answer(&packet, commands::UNKN_6504, vec![first]);
    state.send(conn, &answer);
}
