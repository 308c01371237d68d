//! Pre-game handlers: the start broadcast and the detail queries the
//! clients fire after GETREADY.

use parlor_protocol::{Packet, commands};
use parlor_transport::ConnectionId;

use crate::actions;
use crate::dispatch::client_of;
use crate::state::ServerState;

/// Host pressed start: run the start-game sequence for their slot.
pub(crate) async fn on_start_game(
    state: &ServerState,
    conn: ConnectionId,
    _packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    actions::start_game(state, client.area, client.room, client.slot).await;
}

/// `[count]` — players in the starting session.
pub(crate) async fn on_player_count(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let count = {
        let directory = state.directory.lock().await;
        directory.count_in_slot(client.area, client.room, client.slot) as u8
    };
    let answer = state.answer(&packet, commands::PLAYERCOUNT, vec![count]);
    state.send(conn, &answer);
}

/// `[player]` — the asker's own player number.
pub(crate) async fn on_player_number(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let answer = state.answer(
        &packet,
        commands::PLAYERNUMBER,
        vec![client.player],
    );
    state.send(conn, &answer);
}

/// `[player][character]` — pre-game status of one slot occupant; a
/// zeroed first byte marks an occupant who already left.
pub(crate) async fn on_player_stat(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let player = packet.payload.first().copied().unwrap_or(0);

    let payload = {
        let directory = state.directory.lock().await;
        match directory.by_position(
            client.area,
            client.room,
            client.slot,
            player,
        ) {
            Some(occupant) => vec![player, occupant.character as u8],
            None => vec![0, 0],
        }
    };

    let answer = state.answer(&packet, commands::PLAYERSTAT, payload);
    state.send(conn, &answer);
}

/// Ranking score of one player: demonstration values in the observed
/// layout `[player][scenario:2]` followed by five 32-bit scores.
pub(crate) async fn on_player_score(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let player = packet.payload.first().copied().unwrap_or(0);
    let scenario = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(client.area, client.room, client.slot)
            .map(|s| s.scenario())
            .unwrap_or(0)
    };

    let mut payload = Vec::with_capacity(23);
    payload.push(player);
    payload.extend_from_slice(&u16::from(scenario).to_be_bytes());
    for score in [110u32, 220, 330, 440, 550] {
        payload.extend_from_slice(&score.to_be_bytes());
    }

    let answer = state.answer(&packet, commands::PLAYERSCORE, payload);
    state.send(conn, &answer);
}

/// `[000F][15-digit key][0000]` — the session key the relay recognizes.
pub(crate) async fn on_game_session(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let key = format!("{:015}", client.game_number);

    let mut payload = Vec::with_capacity(19);
    payload.extend_from_slice(&0x000Fu16.to_be_bytes());
    payload.extend_from_slice(key.as_bytes());
    payload.extend_from_slice(&0x0000u16.to_be_bytes());

    let answer = state.answer(&packet, commands::GAMESESSION, payload);
    state.send(conn, &answer);
}

/// Difficulty settings of the starting game; constants as observed.
pub(crate) async fn on_difficulty(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let (difficulty, friendly_fire) = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(client.area, client.room, client.slot)
            .map(|s| (s.rules().difficulty(), s.rules().friendly_fire()))
            .unwrap_or((0, 0))
    };

    let mut payload = vec![
        0x00, 0x10, 0x01, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];
    payload[3] = difficulty;
    payload[4] = friendly_fire;

    let answer = state.answer(&packet, commands::GAMEDIFF, payload);
    state.send(conn, &answer);
}

/// The advertised relay address:
/// `[0004][ip:4][0002][port:2][00 00 1E 00]`.
pub(crate) async fn on_gs_info(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let advert = state.relay_advert;

    let mut payload = Vec::with_capacity(14);
    payload.extend_from_slice(&0x0004u16.to_be_bytes());
    payload.extend_from_slice(&advert.ip);
    payload.extend_from_slice(&0x0002u16.to_be_bytes());
    payload.extend_from_slice(&advert.port.to_be_bytes());
    payload.extend_from_slice(&[0x00, 0x00, 0x1E, 0x00]);

    let answer = state.answer(&packet, commands::GSINFO, payload);
    state.send(conn, &answer);
}
