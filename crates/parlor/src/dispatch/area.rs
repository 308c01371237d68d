//! Area-screen handlers.

use parlor_protocol::{Packet, commands, packet_string};
use parlor_session::OnlineStatus;
use parlor_transport::ConnectionId;

use crate::broadcasts;
use crate::dispatch::client_of;
use crate::state::ServerState;

/// `[count:2]` — how many areas this server offers.
pub(crate) async fn on_area_count(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let count = {
        let lobby = state.lobby.lock().await;
        lobby.areas().count()
    };
    let answer = state.answer(
        &packet,
        commands::AREACOUNT,
        count.to_be_bytes().to_vec(),
    );
    state.send(conn, &answer);
}

/// `[area:2][room-list:2][in-room:2][FF FF][after-game:2]`.
pub(crate) async fn on_area_player_count(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let area = packet.leading_number();
    let counts = {
        let directory = state.directory.lock().await;
        directory.count_in_area(area)
    };

    let mut payload = Vec::with_capacity(10);
    payload.extend_from_slice(&area.to_be_bytes());
    payload.extend_from_slice(&counts.room_list.to_be_bytes());
    payload.extend_from_slice(&counts.in_room.to_be_bytes());
    payload.extend_from_slice(&[0xFF, 0xFF]);
    payload.extend_from_slice(&counts.after_game.to_be_bytes());

    let answer = state.answer(&packet, commands::AREAPLAYERCNT, payload);
    state.send(conn, &answer);
}

/// `[area:2][status]` — available (3) or locked (0).
pub(crate) async fn on_area_status(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let area = packet.leading_number();
    let status = {
        let lobby = state.lobby.lock().await;
        lobby.areas().status(area)
    };
    let mut payload = area.to_be_bytes().to_vec();
    payload.push(status);

    let answer = state.answer(&packet, commands::AREASTATUS, payload);
    state.send(conn, &answer);
}

/// `[area:2][len:2][name]`.
pub(crate) async fn on_area_name(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let area = packet.leading_number();
    let name = {
        let lobby = state.lobby.lock().await;
        lobby.areas().name(area).to_string()
    };
    let mut payload = area.to_be_bytes().to_vec();
    payload.extend_from_slice(&packet_string(name.as_bytes()));

    let answer = state.answer(&packet, commands::AREANAME, payload);
    state.send(conn, &answer);
}

/// `[area:2][len:2][description]`.
pub(crate) async fn on_area_description(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let area = packet.leading_number();
    let description = {
        let lobby = state.lobby.lock().await;
        lobby.areas().description(area).to_string()
    };
    let mut payload = area.to_be_bytes().to_vec();
    payload.extend_from_slice(&packet_string(description.as_bytes()));

    let answer = state.answer(&packet, commands::AREADESCRIPT, payload);
    state.send(conn, &answer);
}

/// Area selection: move the client in, persist, echo, and refresh the
/// area occupancy for everyone watching.
pub(crate) async fn on_area_select(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let area = packet.leading_number();

    {
        let mut directory = state.directory.lock().await;
        if let Some(c) = directory.by_conn_mut(conn) {
            c.area = area;
        }
    }
    if let Err(err) = state
        .store
        .update_origin(
            &client.user,
            OnlineStatus::Lobby,
            i32::from(area),
            0,
            0,
        )
        .await
    {
        tracing::warn!(user = %client.user, %err, "store failure persisting area");
    }

    let answer = state.answer(
        &packet,
        commands::AREASELECT,
        area.to_be_bytes().to_vec(),
    );
    state.send(conn, &answer);

    broadcasts::area_player_count(state, area).await;
}

/// Back to the area list; the vacated area's occupancy is re-broadcast.
pub(crate) async fn on_exit_area(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let area = client.area;

    {
        let mut directory = state.directory.lock().await;
        if let Some(c) = directory.by_conn_mut(conn) {
            c.area = 0;
        }
    }
    if let Err(err) = state
        .store
        .update_origin(&client.user, OnlineStatus::Lobby, 0, 0, 0)
        .await
    {
        tracing::warn!(user = %client.user, %err, "store failure persisting exit");
    }

    let answer = state.answer(&packet, commands::EXITAREA, Vec::new());
    state.send(conn, &answer);

    broadcasts::area_player_count(state, area).await;
}
