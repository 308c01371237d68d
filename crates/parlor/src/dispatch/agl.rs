//! After-game-lobby handlers. The AGL is a pseudo-area (51) scoped by
//! game number instead of room/slot.

use parlor_lobby::AGL_AREA;
use parlor_protocol::{Kind, Packet, commands};
use parlor_session::OnlineStatus;
use parlor_transport::ConnectionId;

use crate::broadcasts;
use crate::dispatch::client_of;
use crate::scopes::Scope;
use crate::state::ServerState;

/// Enter the after-game lobby: adopt the pending game number, announce
/// the newcomer's statistics to the session.
pub(crate) async fn on_enter_agl(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let game_number = match state.store.game_number(&client.user).await {
        Ok(n) => n,
        Err(err) => {
            tracing::warn!(user = %client.user, %err, "store failure reading game number");
            return;
        }
    };

    {
        let mut directory = state.directory.lock().await;
        if let Some(c) = directory.by_conn_mut(conn) {
            c.game_number = game_number;
            c.area = AGL_AREA;
        }
    }
    if let Err(err) = state
        .store
        .update_origin(
            &client.user,
            OnlineStatus::Lobby,
            i32::from(AGL_AREA),
            client.room,
            client.slot,
        )
        .await
    {
        tracing::warn!(user = %client.user, %err, "store failure persisting agl entry");
    }

    let answer = state.answer(&packet, commands::ENTERAGL, Vec::new());
    state.send(conn, &answer);

    broadcasts::agl_player_count(state, game_number).await;

    let stats = {
        let directory = state.directory.lock().await;
        directory.by_conn(conn).map(|c| c.stat_block())
    };
    if let Some(stats) = stats {
        let joined = state.server_packet(
            commands::AGLJOIN,
            Kind::Broadcast,
            stats,
        );
        state
            .broadcast(Scope::ActiveGame(game_number), &joined)
            .await;
    }
}

/// `[0000][03][count]` then every session member's statistics block.
pub(crate) async fn on_agl_stats(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let game_number = client.game_number;

    let payload = {
        let directory = state.directory.lock().await;
        let mut out = vec![0x00, 0x00];
        // Constant observed on the wire; meaning unknown.
        out.push(3);
        out.push(directory.agl_count(game_number));
        for member in directory
            .iter()
            .filter(|c| c.game_number == game_number)
        {
            out.extend_from_slice(&member.stat_block());
        }
        out
    };

    let answer = state.answer(&packet, commands::AGLSTATS, payload);
    state.send(conn, &answer);
}

/// `[00][count]` — occupants of the asker's session.
pub(crate) async fn on_agl_player_count(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let count = {
        let directory = state.directory.lock().await;
        directory.agl_count(client.game_number)
    };
    let answer = state.answer(
        &packet,
        commands::AGLPLAYERCNT,
        vec![0x00, count],
    );
    state.send(conn, &answer);
}

/// Leave the after-game lobby: announce, drop the game number, land back
/// on the area-selection screen.
pub(crate) async fn on_leave_agl(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let game_number = client.game_number;

    let mut leaving = vec![0x00, 0x06];
    leaving.extend_from_slice(&client.handle_fixed());
    let notice = state.server_packet(
        commands::LEAVEAGL,
        Kind::Broadcast,
        leaving,
    );
    state
        .broadcast(Scope::ActiveGame(game_number), &notice)
        .await;

    {
        let mut directory = state.directory.lock().await;
        if let Some(c) = directory.by_conn_mut(conn) {
            c.area = 0;
            c.game_number = 0;
        }
    }
    if let Err(err) =
        state.store.update_game_number(&client.user, 0).await
    {
        tracing::warn!(user = %client.user, %err, "store failure clearing game");
    }
    if let Err(err) = state
        .store
        .update_origin(&client.user, OnlineStatus::Lobby, 0, 0, 0)
        .await
    {
        tracing::warn!(user = %client.user, %err, "store failure persisting agl exit");
    }

    let answer = state.answer(&packet, commands::LEAVEAGL, Vec::new());
    state.send(conn, &answer);

    broadcasts::agl_player_count(state, game_number).await;
    broadcasts::room_player_count(state, 1, 1).await;
}
