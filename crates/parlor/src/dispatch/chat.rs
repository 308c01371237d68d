//! Chat, private messaging, buddy queries, event relay, and info pages.
//!
//! These are the symmetric decrypt → look up recipient → forward
//! handlers. Server-originated fields go out in clear framing, per the
//! protocol's own convention.

use parlor_lobby::AGL_AREA;
use parlor_protocol::{Kind, Packet, commands, crypt, packet_string};
use parlor_transport::ConnectionId;

use crate::dispatch::client_of;
use crate::scopes::Scope;
use crate::state::ServerState;

/// Chat: decrypt, re-wrap with the sender's pair, and fan out to the
/// narrowest scope the sender occupies.
pub(crate) async fn on_chat_in(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let message = match crypt::decrypt_string(
        &packet.payload,
        packet.sequence_id,
    ) {
        Ok(message) => message,
        Err(err) => {
            tracing::debug!(%conn, %err, "undecodable chat message");
            return;
        }
    };

    let pair_wire = client
        .hn_pair
        .as_ref()
        .map(|p| p.to_wire())
        .unwrap_or_default();
    let mut payload =
        Vec::with_capacity(pair_wire.len() + message.len() + 7);
    payload.extend_from_slice(&pair_wire);
    payload.extend_from_slice(&(message.len() as u16).to_be_bytes());
    payload.extend_from_slice(&message);
    payload.push(0x00);
    payload.extend_from_slice(&0x0000_00FFu32.to_be_bytes());

    let outbound =
        state.server_packet(commands::CHATOUT, Kind::Broadcast, payload);

    if client.slot > 0 {
        state
            .broadcast(
                Scope::Slot(client.area, client.room, client.slot),
                &outbound,
            )
            .await;
    } else if client.area != 0 && client.area != AGL_AREA {
        state.broadcast(Scope::Area(client.area), &outbound).await;
    } else if client.game_number > 0 {
        state
            .broadcast(Scope::ActiveGame(client.game_number), &outbound)
            .await;
    }
}

/// Private message: accept toward the sender, deliver to the recipient,
/// or report them offline with the error flag.
pub(crate) async fn on_private_message(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let (recipient, message) =
        match crypt::decrypt_pair(&packet.payload, packet.sequence_id) {
            Ok(pair) => pair,
            Err(err) => {
                tracing::debug!(%conn, %err, "undecodable private message");
                return;
            }
        };

    let target = {
        let directory = state.directory.lock().await;
        directory.by_handle(&recipient).map(|c| c.conn)
    };

    let Some(target) = target else {
        let offline =
            packet_string(b"<BODY><SIZE=3>not connected<END>");
        let answer = state
            .answer(&packet, commands::PRIVATEMSG, offline)
            .with_error();
        state.send(conn, &answer);
        return;
    };

    let accept = state.answer(&packet, commands::PRIVATEMSG, Vec::new());
    state.send(conn, &accept);

    let (handle, nickname) = client
        .hn_pair
        .as_ref()
        .map(|p| (p.handle.clone(), p.nickname.clone()))
        .unwrap_or_default();
    let mut delivery = Vec::with_capacity(
        handle.len() + nickname.len() + message.len() + 6,
    );
    delivery.extend_from_slice(&(handle.len() as u16).to_be_bytes());
    delivery.extend_from_slice(&handle);
    delivery.extend_from_slice(&(nickname.len() as u16).to_be_bytes());
    delivery.extend_from_slice(&nickname);
    delivery.extend_from_slice(&(message.len() as u16).to_be_bytes());
    delivery.extend_from_slice(&message);

    let broadcast = state.server_packet(
        commands::PRIVATEMSGBC,
        Kind::Broadcast,
        delivery,
    );
    state.send(target, &broadcast);
}

/// Buddy online-status query.
pub(crate) async fn on_buddy_list(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let handle = match crypt::decrypt_string(
        &packet.payload,
        packet.sequence_id,
    ) {
        Ok(handle) => handle,
        Err(err) => {
            tracing::debug!(%conn, %err, "undecodable buddy query");
            return;
        }
    };

    let status = {
        let directory = state.directory.lock().await;
        directory.handle_status(&handle)
    };

    use parlor_lobby::HandleStatus;
    let answer = match status {
        HandleStatus::Online => state.answer(
            &packet,
            commands::BUDDYLIST,
            vec![0, 0, 0, 0, 0, 0, 0],
        ),
        HandleStatus::InGame => state.answer(
            &packet,
            commands::BUDDYLIST,
            vec![0, 0, 0, 0, 0, 0, 1],
        ),
        HandleStatus::Offline => state
            .answer(
                &packet,
                commands::BUDDYLIST,
                packet_string(b"<BODY><SIZE=3>not connected<END>"),
            )
            .with_error(),
    };
    state.send(conn, &answer);
}

/// Buddy detail check; fixed byte vectors as observed.
pub(crate) async fn on_check_buddy(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    const ONLINE: &[u8] = &[
        0x00, 0x0C, 0x30, 0x61, 0x64, 0x36, 0x30, 0x31, 0x30, 0x38, 0x32,
        0x30, 0x30, 0x38, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03,
        0x00, 0x29, 0x3C, 0x42, 0x4F, 0x44, 0x59, 0x3E, 0x3C, 0x53, 0x49,
        0x5A, 0x45, 0x3D, 0x33, 0x3E, 0x82, 0x65, 0x82, 0x71, 0x82, 0x64,
        0x82, 0x64, 0x83, 0x47, 0x83, 0x8A, 0x83, 0x41, 0x82, 0xC9, 0x82,
        0xA2, 0x82, 0xDC, 0x82, 0xB7, 0x3C, 0x45, 0x4E, 0x44, 0x3E,
    ];
    const INGAME: &[u8] = &[
        0x00, 0x2B, 0x3C, 0x42, 0x4F, 0x44, 0x59, 0x3E, 0x3C, 0x53, 0x49,
        0x5A, 0x45, 0x3D, 0x33, 0x3E, 0x8C, 0xBB, 0x8D, 0xDD, 0x81, 0x41,
        0x83, 0x51, 0x81, 0x5B, 0x83, 0x80, 0x83, 0x76, 0x83, 0x8C, 0x83,
        0x43, 0x92, 0x86, 0x82, 0xC5, 0x82, 0xB7, 0x3C, 0x45, 0x4E, 0x44,
        0x3E,
    ];

    let handle = match crypt::decrypt_string(
        &packet.payload,
        packet.sequence_id,
    ) {
        Ok(handle) => handle,
        Err(err) => {
            tracing::debug!(%conn, %err, "undecodable buddy check");
            return;
        }
    };

    let status = {
        let directory = state.directory.lock().await;
        directory.handle_status(&handle)
    };

    use parlor_lobby::HandleStatus;
    let answer = match status {
        HandleStatus::Online => {
            state.answer(&packet, commands::CHECKBUDDY, ONLINE.to_vec())
        }
        HandleStatus::InGame => state
            .answer(&packet, commands::CHECKBUDDY, INGAME.to_vec())
            .with_error(),
        HandleStatus::Offline => state
            .answer(
                &packet,
                commands::CHECKBUDDY,
                packet_string(b"<BODY><SIZE=3><CENTER>not connected<END>"),
            )
            .with_error(),
    };
    state.send(conn, &answer);
}

/// Opaque event data: forward to the embedded recipient, echo the
/// recipient back in the clear as the acceptance.
pub(crate) async fn on_event_data(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let event = match crypt::decrypt_string(
        &packet.payload,
        packet.sequence_id,
    ) {
        Ok(event) => event,
        Err(err) => {
            tracing::debug!(%conn, %err, "undecodable event data");
            return;
        }
    };
    if event.len() < 10 {
        tracing::debug!(%conn, len = event.len(), "short event data");
        return;
    }

    // Layout inside the field: recipient handle at 2..8, data length at
    // 8..10, data after.
    let recipient = &event[2..8];
    let data_len =
        usize::from(u16::from_be_bytes([event[8], event[9]]));
    let Some(data) = event.get(10..10 + data_len) else {
        tracing::debug!(%conn, "event data length out of bounds");
        return;
    };

    let mut forward = Vec::with_capacity(data.len() + 10);
    forward.extend_from_slice(&0x0006u16.to_be_bytes());
    forward.extend_from_slice(&client.handle_fixed());
    forward.extend_from_slice(&(data_len as u16).to_be_bytes());
    forward.extend_from_slice(data);

    let target = {
        let directory = state.directory.lock().await;
        directory.by_handle(recipient).map(|c| c.conn)
    };
    if let Some(target) = target {
        let broadcast = state.server_packet(
            commands::EVENTDATBC,
            Kind::Broadcast,
            forward,
        );
        state.send(target, &broadcast);
    }

    let mut accepted = vec![0x00, 0x06];
    accepted.extend_from_slice(recipient);
    let answer = state.answer(&packet, commands::EVENTDAT, accepted);
    state.send(conn, &answer);
}

/// Info page fetch: `[urllen:2][url][datalen:2][data]`.
pub(crate) async fn on_get_info(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let url = match crypt::decrypt_string(
        &packet.payload,
        packet.sequence_id,
    ) {
        Ok(url) => url,
        Err(err) => {
            tracing::debug!(%conn, %err, "undecodable info request");
            return;
        }
    };
    let data = state.info.get(&url).await;

    let mut payload = Vec::with_capacity(url.len() + data.len() + 4);
    payload.extend_from_slice(&(url.len() as u16).to_be_bytes());
    payload.extend_from_slice(&url);
    payload.extend_from_slice(&(data.len() as u16).to_be_bytes());
    payload.extend_from_slice(&data);

    let answer = state.answer(&packet, commands::GETINFO, payload);
    state.send(conn, &answer);
}
