//! Room-screen handlers.

use parlor_protocol::{Packet, commands, packet_string};
use parlor_session::OnlineStatus;
use parlor_transport::ConnectionId;

use crate::broadcasts;
use crate::dispatch::client_of;
use crate::state::ServerState;

/// `[count:2]` — rooms per area.
pub(crate) async fn on_rooms_count(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let count = {
        let lobby = state.lobby.lock().await;
        lobby.rooms().count()
    };
    let answer = state.answer(
        &packet,
        commands::ROOMSCOUNT,
        count.to_be_bytes().to_vec(),
    );
    state.send(conn, &answer);
}

/// `[room:2][count:2][busy:2][FF FF][00 00]`.
pub(crate) async fn on_room_player_count(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let room = packet.leading_number();
    let payload =
        broadcasts::room_player_count_payload(state, client.area, room)
            .await;

    let answer = state.answer(&packet, commands::ROOMPLAYERCNT, payload);
    state.send(conn, &answer);
}

/// `[room:2][status]`.
pub(crate) async fn on_room_status(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let room = packet.leading_number();
    let status = {
        let lobby = state.lobby.lock().await;
        lobby.rooms().status(client.area, room)
    };
    let mut payload = room.to_be_bytes().to_vec();
    payload.push(status);

    let answer = state.answer(&packet, commands::ROOMSTATUS, payload);
    state.send(conn, &answer);
}

/// `[room:2][len:2][name]`.
pub(crate) async fn on_room_name(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let room = packet.leading_number();
    let name = {
        let lobby = state.lobby.lock().await;
        lobby.rooms().name(client.area, room).to_string()
    };
    let mut payload = room.to_be_bytes().to_vec();
    payload.extend_from_slice(&packet_string(name.as_bytes()));

    let answer = state.answer(&packet, commands::ROOMNAME, payload);
    state.send(conn, &answer);
}

/// Unknown; echoes the queried number ahead of constant bytes.
pub(crate) async fn on_6308(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let mut payload = vec![0x00, 0x01, 0x00, 0x02, 0x81, 0x40];
    if packet.payload.len() >= 2 {
        payload[0] = packet.payload[0];
        payload[1] = packet.payload[1];
    }
    let answer = state.answer(&packet, commands::UNKN_6308, payload);
    state.send(conn, &answer);
}

/// Enter a room: move the client, persist, echo, refresh the room
/// occupancy for the area's browsers.
pub(crate) async fn on_enter_room(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let room = packet.leading_number();
    let area = client.area;

    {
        let mut directory = state.directory.lock().await;
        if let Some(c) = directory.by_conn_mut(conn) {
            c.room = room;
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
        tracing::warn!(user = %client.user, %err, "store failure persisting room");
    }
    tracing::debug!(%conn, area, room, "entered room");

    let answer = state.answer(
        &packet,
        commands::ENTERROOM,
        room.to_be_bytes().to_vec(),
    );
    state.send(conn, &answer);

    broadcasts::room_player_count(state, area, room).await;
}
