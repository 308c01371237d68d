//! Rule-configuration handlers. Writable only through the slot the
//! client occupies; queries address any slot in the room.

use parlor_protocol::{Packet, commands, crypt, packet_string};
use parlor_transport::ConnectionId;

use crate::actions;
use crate::broadcasts;
use crate::dispatch::client_of;
use crate::state::ServerState;

/// `[count]` — rules of a slot.
pub(crate) async fn on_rules_count(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();
    let count = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(client.area, client.room, slot)
            .map(|s| s.rules().count())
            .unwrap_or(0)
    };
    let answer = state.answer(&packet, commands::RULESCOUNT, vec![count]);
    state.send(conn, &answer);
}

/// `[rule][choice-count]`.
pub(crate) async fn on_rule_att_count(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();
    let rule = packet.payload.get(2).copied().unwrap_or(0);
    let count = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(client.area, client.room, slot)
            .map(|s| s.rules().choice_count(usize::from(rule)))
            .unwrap_or(0)
    };
    let answer =
        state.answer(&packet, commands::RULEATTCOUNT, vec![rule, count]);
    state.send(conn, &answer);
}

/// Unknown rule-screen query; `[01][nr:2]`.
pub(crate) async fn on_6601(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let nr = packet.leading_number();
    let mut payload = vec![0x01];
    payload.extend_from_slice(&nr.to_be_bytes());
    let answer = state.answer(&packet, commands::UNKN_6601, payload);
    state.send(conn, &answer);
}

/// Unknown rule-screen query; `[01][nr:2]`.
pub(crate) async fn on_6602(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let nr = packet.leading_number();
    let mut payload = vec![0x01];
    payload.extend_from_slice(&nr.to_be_bytes());
    let answer = state.answer(&packet, commands::UNKN_6602, payload);
    state.send(conn, &answer);
}

/// `[rule][len:2][name]`.
pub(crate) async fn on_rule_description(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();
    let rule = packet.payload.get(2).copied().unwrap_or(0);
    let name = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(client.area, client.room, slot)
            .map(|s| s.rules().name(usize::from(rule)))
            .unwrap_or("")
    };
    let mut payload = vec![rule];
    payload.extend_from_slice(&packet_string(name.as_bytes()));

    let answer = state.answer(&packet, commands::RULEDESCRIPT, payload);
    state.send(conn, &answer);
}

/// `[rule][value]`.
pub(crate) async fn on_rule_value(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();
    let rule = packet.payload.get(2).copied().unwrap_or(0);
    let value = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(client.area, client.room, slot)
            .map(|s| s.rules().value(usize::from(rule)))
            .unwrap_or(0)
    };
    let answer =
        state.answer(&packet, commands::RULEVALUE, vec![rule, value]);
    state.send(conn, &answer);
}

/// `[rule][attribute]`.
pub(crate) async fn on_rule_attribute(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();
    let rule = packet.payload.get(2).copied().unwrap_or(0);
    let attribute = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(client.area, client.room, slot)
            .map(|s| s.rules().attribute(usize::from(rule)))
            .unwrap_or(0)
    };
    let answer =
        state.answer(&packet, commands::RULEATTRIB, vec![rule, attribute]);
    state.send(conn, &answer);
}

/// `[rule][choice][len:2][name]`.
pub(crate) async fn on_attr_description(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();
    let rule = packet.payload.get(2).copied().unwrap_or(0);
    let choice = packet.payload.get(3).copied().unwrap_or(0);
    let name = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(client.area, client.room, slot)
            .map(|s| {
                s.rules()
                    .choice_name(usize::from(rule), usize::from(choice))
            })
            .unwrap_or("")
    };
    let mut payload = vec![rule, choice];
    payload.extend_from_slice(&packet_string(name.as_bytes()));

    let answer = state.answer(&packet, commands::ATTRDESCRIPT, payload);
    state.send(conn, &answer);
}

/// `[rule][choice][attribute]`.
pub(crate) async fn on_attr_attribute(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = packet.leading_number();
    let rule = packet.payload.get(2).copied().unwrap_or(0);
    let choice = packet.payload.get(3).copied().unwrap_or(0);
    let attribute = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(client.area, client.room, slot)
            .map(|s| {
                s.rules()
                    .choice_attribute(usize::from(rule), usize::from(choice))
            })
            .unwrap_or(0)
    };
    let answer = state.answer(
        &packet,
        commands::ATTRATTRIB,
        vec![rule, choice, attribute],
    );
    state.send(conn, &answer);
}

/// Sets one rule value on the client's own slot.
pub(crate) async fn on_set_rule(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let rule = packet.payload.first().copied().unwrap_or(0);
    let value = packet.payload.get(1).copied().unwrap_or(0);

    {
        let mut lobby = state.lobby.lock().await;
        if let Ok(s) =
            lobby.slot_mut(client.area, client.room, client.slot)
        {
            s.rules_mut().set_value(usize::from(rule), value);
        }
    }

    let answer = state.answer(&packet, commands::SETRULE, vec![0]);
    state.send(conn, &answer);
}

/// Sets the title of the client's own slot and mirrors it to the room.
pub(crate) async fn on_slot_name(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let (area, room, slot) = (client.area, client.room, client.slot);

    let title = match crypt::decrypt_string(
        &packet.payload,
        packet.sequence_id,
    ) {
        Ok(title) => title,
        Err(err) => {
            tracing::debug!(%conn, %err, "undecodable slot title");
            return;
        }
    };
    tracing::debug!(
        %conn, area, room, slot,
        title = %String::from_utf8_lossy(&title),
        "slot title set"
    );

    {
        let mut lobby = state.lobby.lock().await;
        if let Ok(s) = lobby.slot_mut(area, room, slot) {
            s.set_name(title);
        }
    }

    let echoed = packet.payload.clone();
    let answer = state.answer(&packet, commands::SLOTNAME, echoed);
    state.send(conn, &answer);

    broadcasts::slot_title(state, area, room, slot).await;
}

/// Sets the password of the client's own slot; a non-empty password
/// turns protection on.
pub(crate) async fn on_slot_password(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };

    let password = match crypt::decrypt_string(
        &packet.payload,
        packet.sequence_id,
    ) {
        Ok(password) => password,
        Err(err) => {
            tracing::debug!(%conn, %err, "undecodable slot password");
            return;
        }
    };

    {
        let mut lobby = state.lobby.lock().await;
        if let Ok(s) =
            lobby.slot_mut(client.area, client.room, client.slot)
        {
            s.set_password(password);
        }
    }

    let echoed = packet.payload.clone();
    let answer = state.answer(&packet, commands::SLOTPASSWD, echoed);
    state.send(conn, &answer);
}

/// Scenario/media selection for the client's own slot.
///
/// Payload words: media type (0x11 DVD, 0x12 HDD), then scenario id.
pub(crate) async fn on_scene_select(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let slot = client.slot;
    let media = packet.payload.get(1).copied().unwrap_or(0);
    let scenario = packet.payload.get(3).copied().unwrap_or(0);

    {
        let mut lobby = state.lobby.lock().await;
        if let Ok(s) = lobby.slot_mut(client.area, client.room, slot) {
            s.set_media_type(media);
            s.set_scenario(scenario);
        }
    }

    let payload = vec![0x00, slot as u8, 0x00, media, 0x00, scenario];
    let answer = state.answer(&packet, commands::SCENESELECT, payload);
    state.send(conn, &answer);
}

/// Remaining wait time of the client's own slot; a zeroed timer starts
/// the game.
pub(crate) async fn on_slot_timer(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let Some(client) = client_of(state, conn).await else {
        return;
    };
    let (area, room, slot) = (client.area, client.room, client.slot);
    let remaining = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(area, room, slot)
            .map(|s| s.remaining_secs())
            .unwrap_or(0)
    } as u16;

    let mut payload = vec![slot as u8, 0x00];
    payload.extend_from_slice(&remaining.to_be_bytes());
    let answer = state.answer(&packet, commands::SLOTTIMER, payload);
    state.send(conn, &answer);

    if remaining == 0 {
        actions::start_game(state, area, room, slot).await;
    }
}

/// Unknown; the payload is accepted and echoed.
pub(crate) async fn on_660c(
    state: &ServerState,
    conn: ConnectionId,
    packet: Packet,
) {
    let echoed = packet.payload.clone();
    let answer = state.answer(&packet, commands::UNKN_660C, echoed);
    state.send(conn, &answer);
}
