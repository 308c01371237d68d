//! Login, account, and connection-lifecycle handlers.

use parlor_lobby::{AGL_AREA, Client, HnPair, STATS_LEN, random_handle};
use parlor_protocol::{Kind, Packet, commands, crypt};
use parlor_session::{OnlineStatus, StoredPair, derive_session_key};
use parlor_transport::ConnectionId;

use crate::actions::{self, CloseMode};
use crate::broadcasts;
use crate::dispatch::client_of;
use crate::state::ServerState;

/// Cap on attempts to draw an unclaimed random handle.
const HANDLE_ATTEMPTS: usize = 100;

/// The server speaks first: a login query whose payload seeds the
/// session obfuscation on the client side.
pub fn send_login_query(state: &ServerState, conn: ConnectionId) {
    let packet = state.server_packet(
        commands::LOGIN,
        Kind::Query,
        vec![0x28, 0x37],
    );
    state.send(conn, &packet);
}

/// Login answer: verify the session, create the client, move on to the
/// version check.
///
/// A session miss leaves the connection without a client — later frames
/// from it are dropped, but the connection stays open for a retry.
pub(crate) async fn on_login_answer(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    if packet.payload.len() < 12 {
        tracing::debug!(%conn, "login answer too short");
        return;
    }
    let key = match derive_session_key(
        packet.sequence_id,
        &packet.payload[2..12],
    ) {
        Ok(key) => key,
        Err(err) => {
            tracing::debug!(%conn, %err, "malformed login answer");
            return;
        }
    };

    let user = match state.store.user_for_session(&key).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::info!(%conn, session = %key, "session check failed");
            return;
        }
        Err(err) => {
            tracing::warn!(%conn, %err, "store failure on session check");
            return;
        }
    };
    tracing::info!(%conn, %user, session = %key, "session check passed");

    // One client per identity: tear down any previous connection for
    // this user before the new one enters the directory.
    let stale: Vec<ConnectionId> = {
        let directory = state.directory.lock().await;
        directory
            .iter()
            .filter(|c| c.user == user)
            .map(|c| c.conn)
            .collect()
    };
    for old in stale {
        actions::remove_client(state, old, CloseMode::Disconnect).await;
    }

    {
        let mut directory = state.directory.lock().await;
        directory.add(Client::new(conn, user.clone(), key));
    }
    if let Err(err) = state
        .store
        .update_origin(&user, OnlineStatus::Lobby, 0, 0, 0)
        .await
    {
        tracing::warn!(%user, %err, "store failure persisting lobby origin");
    }

    // A user carrying an unfinished game lands in the after-game lobby.
    match state.store.game_number(&user).await {
        Ok(game_number) if game_number > 0 => {
            {
                let mut directory = state.directory.lock().await;
                if let Some(client) = directory.by_conn_mut(conn) {
                    client.area = AGL_AREA;
                }
            }
            if let Err(err) = state
                .store
                .update_origin(
                    &user,
                    OnlineStatus::AfterGameLobby,
                    i32::from(AGL_AREA),
                    0,
                    0,
                )
                .await
            {
                tracing::warn!(%user, %err, "store failure persisting agl origin");
            }
        }
        Ok(_) => {}
        Err(err) => {
            tracing::warn!(%user, %err, "store failure reading game number");
        }
    }

    let version_check = state.server_packet(
        commands::CHECKVERSION,
        Kind::Query,
        vec![0x00, 0x00],
    );
    state.send(conn, &version_check);
}

/// Version answer: decode the client version string. The patch-serving
/// path exists in the protocol but is never taken; the login continues
/// with the stored handle/nickname pairs.
pub(crate) async fn on_version_answer(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    match crypt::decrypt_field(&packet.payload, 3, packet.sequence_id) {
        Ok((version, _)) => {
            tracing::info!(
                %conn,
                version = %String::from_utf8_lossy(&version),
                "client version"
            );
        }
        Err(err) => {
            tracing::debug!(%conn, %err, "undecodable version answer");
        }
    }

    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let pairs = match state.store.stored_pairs(&client.user).await {
        Ok(pairs) => pairs,
        Err(err) => {
            tracing::warn!(user = %client.user, %err, "store failure listing pairs");
            Vec::new()
        }
    };
    let pairs: Vec<HnPair> = pairs
        .iter()
        .map(|p| HnPair::new(p.handle.as_bytes(), &p.nickname))
        .collect();

    let packet = state.server_packet(
        commands::IDHNPAIRS,
        Kind::Broadcast,
        parlor_lobby::pair_list_wire(&pairs),
    );
    state.send(conn, &packet);
}

/// Liveness answer: the client is still there.
pub(crate) async fn on_conncheck_answer(
    state: &ServerState,
    conn: ConnectionId,
    _packet: Packet,
) {
    let mut directory = state.directory.lock().await;
    if let Some(client) = directory.by_conn_mut(conn) {
        client.alive = true;
    }
}

/// Handle/nickname selection. A wildcard handle is replaced by a
/// server-generated one; completion fires the post-game probe (when a
/// game is pending) and the login-complete broadcast.
pub(crate) async fn on_hn_select(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let mut pair =
        match crypt::decrypt_pair(&packet.payload, packet.sequence_id) {
            Ok((handle, nickname)) => HnPair::new(&handle, &nickname),
            Err(err) => {
                tracing::debug!(%conn, %err, "undecodable pair selection");
                return;
            }
        };

    if pair.is_wildcard() {
        let mut generated = None;
        for _ in 0..HANDLE_ATTEMPTS {
            let candidate = random_handle();
            match state
                .store
                .handle_available(&String::from_utf8_lossy(&candidate))
                .await
            {
                Ok(true) => {
                    generated = Some(candidate);
                    break;
                }
                Ok(false) => continue,
                Err(err) => {
                    tracing::warn!(%err, "store failure checking handle");
                    break;
                }
            }
        }
        let Some(handle) = generated else {
            tracing::warn!(%conn, "could not generate an unused handle");
            return;
        };
        pair.handle = handle;
        if let Err(err) = state
            .store
            .insert_pair(
                &client.user,
                &StoredPair {
                    handle: String::from_utf8_lossy(&pair.handle).into_owned(),
                    nickname: pair.nickname.clone(),
                },
            )
            .await
        {
            tracing::warn!(user = %client.user, %err, "store failure saving pair");
        }
    }

    if let Err(err) = state
        .store
        .update_pair(
            &client.user,
            &StoredPair {
                handle: String::from_utf8_lossy(&pair.handle).into_owned(),
                nickname: pair.nickname.clone(),
            },
        )
        .await
    {
        tracing::warn!(user = %client.user, %err, "store failure refreshing pair");
    }

    let handle = pair.handle_fixed();
    {
        let mut directory = state.directory.lock().await;
        if let Some(c) = directory.by_conn_mut(conn) {
            c.hn_pair = Some(pair);
        }
    }

    let mut chosen = vec![0x00, 0x06];
    chosen.extend_from_slice(&handle);
    let answer = state.answer(&packet, commands::HNSELECT, chosen);
    state.send(conn, &answer);

    // Returning from an unfinished game: ask for its outcome first.
    match state.store.game_number(&client.user).await {
        Ok(game_number) if game_number > 0 => {
            let probe = state.server_packet(
                commands::POSTGAMEINFO,
                Kind::Query,
                Vec::new(),
            );
            state.send(conn, &probe);
        }
        Ok(_) => {}
        Err(err) => {
            tracing::warn!(user = %client.user, %err, "store failure reading game number");
        }
    }

    // End of the login procedure.
    let complete = state.server_packet(
        commands::UNKN_6104,
        Kind::Broadcast,
        Vec::new(),
    );
    state.send(conn, &complete);
}

/// Message of the day, wrapped in the client's markup.
pub(crate) async fn on_motd(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let message = match state.store.motd().await {
        Ok(Some(message)) => message,
        Ok(None) => String::new(),
        Err(err) => {
            tracing::warn!(%err, "store failure reading motd");
            String::new()
        }
    };
    let wrapped = format!("<LF=6><BODY><CENTER>{message}<END>");

    let mut payload = Vec::with_capacity(wrapped.len() + 3);
    payload.push(1);
    payload.extend_from_slice(&(wrapped.len() as u16).to_be_bytes());
    payload.extend_from_slice(wrapped.as_bytes());

    let answer = state.answer(&packet, commands::MOTHEDAY, payload);
    state.send(conn, &answer);
}

/// Character selection: store the decrypted statistics blob.
pub(crate) async fn on_char_select(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    if packet.payload.len() >= 4 + STATS_LEN {
        let character = i16::from_be_bytes([
            packet.payload[0],
            packet.payload[1],
        ]);
        let costume = i16::from_be_bytes([
            packet.payload[2],
            packet.payload[3],
        ]);
        match crypt::decrypt_fixed(
            &packet.payload,
            4,
            STATS_LEN,
            packet.sequence_id,
        ) {
            Ok(stats) => {
                let mut directory = state.directory.lock().await;
                if let Some(client) = directory.by_conn_mut(conn) {
                    client.character = character;
                    client.costume = costume;
                    client.stats = stats;
                }
            }
            Err(err) => {
                tracing::debug!(%conn, %err, "undecodable character stats");
            }
        }
    } else {
        tracing::debug!(%conn, len = packet.payload.len(), "short character selection");
    }

    let answer = state.answer(&packet, commands::CHARSELECT, Vec::new());
    state.send(conn, &answer);
}

/// Area rankings: demonstration values in the exact observed layout.
pub(crate) async fn on_rankings(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let area = packet.payload.get(1).copied().unwrap_or(0);

    let mut payload = Vec::with_capacity(207);
    payload.extend_from_slice(&u16::from(area).to_be_bytes());
    payload.extend_from_slice(&(111i32 * 100).to_be_bytes());
    payload.extend_from_slice(&i32::from(area).to_be_bytes());
    payload.push(0);
    payload.extend_from_slice(&(310i32 * 10).to_be_bytes());
    payload.extend_from_slice(&(320i32 * 10).to_be_bytes());
    payload.extend_from_slice(&(330i32 * 100).to_be_bytes());
    payload.extend_from_slice(&(340i32 * 100).to_be_bytes());
    payload.extend_from_slice(&350i32.to_be_bytes());
    payload.extend_from_slice(&(360i32 * 100).to_be_bytes());
    payload.extend_from_slice(&370i32.to_be_bytes());

    for t in 0u8..6 {
        payload.push(1); // status: alive
        payload.push(t); // character
        payload.extend_from_slice(&6u16.to_be_bytes());
        payload.extend_from_slice(b"HANDLE");
        payload.extend_from_slice(&16u16.to_be_bytes());
        payload.push(0x41 + t);
        payload.extend_from_slice(b"- RANKTEST     ");
    }

    let answer = state.answer(&packet, commands::RANKINGS, payload);
    state.send(conn, &answer);
}

/// Fixed data-count answer; purpose unknown.
pub(crate) async fn on_6881(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let answer = state.answer(
        &packet,
        commands::UNKN_6881,
        vec![0x01, 0x00, 0x00, 0x12, 0x5D],
    );
    state.send(conn, &answer);
}

/// Data-window read paired with 0x6881. Modeled but not served: the
/// answer echoes the request with an empty window.
pub(crate) async fn on_6882(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let mut payload = vec![0u8; 9];
    let n = packet.payload.len().min(5);
    payload[..n].copy_from_slice(&packet.payload[..n]);
    tracing::debug!(%conn, "data window requested, serving empty window");

    let answer = state.answer(&packet, commands::UNKN_6882, payload);
    state.send(conn, &answer);
}

/// Timeout parameters, reproduced as observed.
pub(crate) async fn on_timeout_params(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let answer = state.answer(
        &packet,
        commands::UNKN_61A0,
        vec![0x00, 0x09, 0x01, 0x2C, 0x00, 0x00, 0x02, 0x58],
    );
    state.send(conn, &answer);
}

/// Latency parameters, presumed; reproduced as observed.
pub(crate) async fn on_latency_params(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let answer = state.answer(
        &packet,
        commands::UNKN_61A1,
        vec![0x00, 0x00, 0x03, 0x84, 0x00, 0x00, 0x07, 0x08, 0x00, 0x00],
    );
    state.send(conn, &answer);
}

/// Random-number check: echo the first decrypted byte.
pub(crate) async fn on_check_rnd(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let first = crypt::decrypt_string(&packet.payload, packet.sequence_id)
        .ok()
        .and_then(|d| d.first().copied())
        .unwrap_or(0x30);

    let answer = state.answer(
        &packet,
        commands::CHECKRND,
        vec![0x00, 0x01, first],
    );
    state.send(conn, &answer);
}

/// Unknown command accepted without effect.
pub(crate) async fn on_6181(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let answer = state.answer(&packet, commands::UNKN_6181, Vec::new());
    state.send(conn, &answer);
}

/// Resets the client's lobby position; an emptied slot is reclaimed.
pub(crate) async fn on_6002(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let (area, room, slot) = (client.area, client.room, client.slot);

    {
        let mut directory = state.directory.lock().await;
        if let Some(c) = directory.by_conn_mut(conn) {
            c.area = 0;
            c.room = 0;
            c.slot = 0;
            c.player = 0;
        }
    }

    let emptied = {
        let directory = state.directory.lock().await;
        directory.count_in_slot(area, room, slot) == 0
    };
    if emptied {
        if let Ok(s) = state.lobby.lock().await.slot_mut(area, room, slot) {
            s.reset();
        }
        broadcasts::slot_player_status(state, area, room, slot).await;
        broadcasts::passwd_protect(state, area, room, slot).await;
        broadcasts::slot_title(state, area, room, slot).await;
        broadcasts::scene_type(state, area, room, slot).await;
        broadcasts::slot_attrib2(state, area, room, slot).await;
        broadcasts::slot_status(state, area, room, slot).await;
    }

    let answer = state.answer(&packet, commands::UNKN_6002, Vec::new());
    state.send(conn, &answer);
}

/// Explicit logout: clear the pending game, answer while the writer can
/// still drain, then evict and notify the area.
pub(crate) async fn on_logout(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let area = client.area;

    if let Err(err) =
        state.store.update_game_number(&client.user, 0).await
    {
        tracing::warn!(user = %client.user, %err, "store failure clearing game");
    }

    let answer = state.answer(&packet, commands::LOGOUT, Vec::new());
    state.send(conn, &answer);

    actions::remove_client(state, conn, CloseMode::Disconnect).await;
    broadcasts::area_player_count(state, area).await;
}
