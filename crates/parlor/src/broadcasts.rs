//! Broadcast payload builders shared by handlers, eviction, and sweeps.
//!
//! Each builder reads the registries briefly, assembles the observed
//! byte layout, and fans out to its scope. Constant bytes whose meaning
//! is unknown are reproduced as-is.

use parlor_lobby::AGL_AREA;
use parlor_protocol::{Kind, commands, packet_string};

use crate::scopes::Scope;
use crate::state::ServerState;

/// `[area:2][room-list:2][in-room:2][FF FF][after-game:2]` to everyone in
/// the area or still picking one. The third tally folds in the relay's
/// in-game players.
pub(crate) async fn area_player_count(state: &ServerState, area: u16) {
    let (counts, agl_room) = {
        let directory = state.directory.lock().await;
        (
            directory.count_in_area(area),
            directory.count_in_room(AGL_AREA, 0) as u16,
        )
    };
    let third = counts.after_game + agl_room + state.in_game_count();

    let mut payload = Vec::with_capacity(10);
    payload.extend_from_slice(&area.to_be_bytes());
    payload.extend_from_slice(&counts.room_list.to_be_bytes());
    payload.extend_from_slice(&counts.in_room.to_be_bytes());
    payload.extend_from_slice(&[0xFF, 0xFF]);
    payload.extend_from_slice(&third.to_be_bytes());

    let packet = state.server_packet(
        commands::AREAPLAYERCNT,
        Kind::Broadcast,
        payload,
    );
    state.broadcast(Scope::AreaOrSelect(area), &packet).await;
}

/// Builds the room-occupancy payload; shared by the query answer and the
/// broadcast after navigation.
pub(crate) async fn room_player_count_payload(
    state: &ServerState,
    area: u16,
    room: u16,
) -> Vec<u8> {
    let (count, agl_room) = {
        let directory = state.directory.lock().await;
        (
            directory.count_in_room(area, room) as u16,
            directory.count_in_room(AGL_AREA, 0) as u16,
        )
    };
    let busy = agl_room + state.in_game_count();

    let mut payload = Vec::with_capacity(10);
    payload.extend_from_slice(&room.to_be_bytes());
    payload.extend_from_slice(&count.to_be_bytes());
    payload.extend_from_slice(&busy.to_be_bytes());
    payload.extend_from_slice(&[0xFF, 0xFF, 0x00, 0x00]);
    payload
}

/// `[room:2][count:2][busy:2][FF FF][00 00]` to the area's room-list
/// browsers.
pub(crate) async fn room_player_count(
    state: &ServerState,
    area: u16,
    room: u16,
) {
    let payload = room_player_count_payload(state, area, room).await;
    let packet = state.server_packet(
        commands::ROOMPLAYERCNT,
        Kind::Broadcast,
        payload,
    );
    state.broadcast(Scope::Area(area), &packet).await;
}

/// Builds `[slot:2][00 count][00 00][00 max][00 count]`.
pub(crate) async fn slot_player_status_payload(
    state: &ServerState,
    area: u16,
    room: u16,
    slot: u16,
) -> Vec<u8> {
    let count = {
        let directory = state.directory.lock().await;
        directory.count_in_slot(area, room, slot) as u8
    };
    let max = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(area, room, slot)
            .map(|s| s.rules().max_players())
            .unwrap_or(0)
    };

    let mut payload = Vec::with_capacity(10);
    payload.extend_from_slice(&slot.to_be_bytes());
    payload.extend_from_slice(&[0x00, count, 0x00, 0x00, 0x00, max]);
    payload.extend_from_slice(&[0x00, count]);
    payload
}

/// Occupancy/capacity of a slot, to the slot and its room's browsers.
pub(crate) async fn slot_player_status(
    state: &ServerState,
    area: u16,
    room: u16,
    slot: u16,
) {
    let payload =
        slot_player_status_payload(state, area, room, slot).await;
    let packet = state.server_packet(
        commands::SLOTPLRSTATUS,
        Kind::Broadcast,
        payload,
    );
    state
        .broadcast(Scope::SlotOrBrowsing(area, room, slot), &packet)
        .await;
}

/// `[slot:2][status]` to the slot and its room's browsers.
pub(crate) async fn slot_status(
    state: &ServerState,
    area: u16,
    room: u16,
    slot: u16,
) {
    let status = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(area, room, slot)
            .map(|s| s.status().as_byte())
            .unwrap_or(0)
    };
    let mut payload = slot.to_be_bytes().to_vec();
    payload.push(status);

    let packet =
        state.server_packet(commands::SLOTSTATUS, Kind::Broadcast, payload);
    state
        .broadcast(Scope::SlotOrBrowsing(area, room, slot), &packet)
        .await;
}

/// `[slot:2][len:2][title]` to the slot and its room's browsers.
pub(crate) async fn slot_title(
    state: &ServerState,
    area: u16,
    room: u16,
    slot: u16,
) {
    let title = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(area, room, slot)
            .map(|s| s.name().to_vec())
            .unwrap_or_default()
    };
    let mut payload = slot.to_be_bytes().to_vec();
    payload.extend_from_slice(&packet_string(&title));

    let packet =
        state.server_packet(commands::SLOTTITLE, Kind::Broadcast, payload);
    state
        .broadcast(Scope::SlotOrBrowsing(area, room, slot), &packet)
        .await;
}

/// `[slot:2][protection]` to the whole room.
pub(crate) async fn passwd_protect(
    state: &ServerState,
    area: u16,
    room: u16,
    slot: u16,
) {
    let protection = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(area, room, slot)
            .map(|s| s.protection())
            .unwrap_or(0)
    };
    let mut payload = slot.to_be_bytes().to_vec();
    payload.push(protection);

    let packet = state.server_packet(
        commands::SLOTPWDPROT,
        Kind::Broadcast,
        payload,
    );
    state.broadcast(Scope::Room(area, room), &packet).await;
}

/// Builds `[slot:2][00 type][00 scenario]`.
pub(crate) async fn scene_type_payload(
    state: &ServerState,
    area: u16,
    room: u16,
    slot: u16,
) -> Vec<u8> {
    let (media, scenario) = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(area, room, slot)
            .map(|s| (s.media_type(), s.scenario()))
            .unwrap_or((0, 0))
    };
    let mut payload = slot.to_be_bytes().to_vec();
    payload.extend_from_slice(&[0x00, media, 0x00, scenario]);
    payload
}

/// Scenario/media type of a slot, to the slot and its room's browsers.
pub(crate) async fn scene_type(
    state: &ServerState,
    area: u16,
    room: u16,
    slot: u16,
) {
    let payload = scene_type_payload(state, area, room, slot).await;
    let packet = state.server_packet(
        commands::SLOTSCENTYPE,
        Kind::Broadcast,
        payload,
    );
    state
        .broadcast(Scope::SlotOrBrowsing(area, room, slot), &packet)
        .await;
}

/// Builds `[slot:2][00 max][00 04][00 01][00 04][00 01]`. The tail
/// constants are observed on the wire; meaning unknown.
pub(crate) async fn slot_attrib2_payload(
    state: &ServerState,
    area: u16,
    room: u16,
    slot: u16,
) -> Vec<u8> {
    let max = {
        let lobby = state.lobby.lock().await;
        lobby
            .slot(area, room, slot)
            .map(|s| s.rules().max_players())
            .unwrap_or(0)
    };
    let mut payload = slot.to_be_bytes().to_vec();
    payload.extend_from_slice(&[
        0x00, max, 0x00, 0x04, 0x00, 0x01, 0x00, 0x04, 0x00, 0x01,
    ]);
    payload
}

/// Secondary slot attributes, to the slot and its room's browsers.
pub(crate) async fn slot_attrib2(
    state: &ServerState,
    area: u16,
    room: u16,
    slot: u16,
) {
    let payload = slot_attrib2_payload(state, area, room, slot).await;
    let packet = state.server_packet(
        commands::SLOTATTRIB2,
        Kind::Broadcast,
        payload,
    );
    state
        .broadcast(Scope::SlotOrBrowsing(area, room, slot), &packet)
        .await;
}

/// Cancellation notice to the slot's occupants.
pub(crate) async fn cancel_slot(
    state: &ServerState,
    area: u16,
    room: u16,
    slot: u16,
) {
    let payload =
        packet_string(b"<LF=6><BODY><CENTER>host cancelled game<END>");
    let packet = state.server_packet(
        commands::CANCELSLOTBC,
        Kind::Broadcast,
        payload,
    );
    state.broadcast(Scope::Slot(area, room, slot), &packet).await;
}

/// `[00 06][handle:6]` leaving announcement to the slot's occupants.
pub(crate) async fn leave_slot(
    state: &ServerState,
    area: u16,
    room: u16,
    slot: u16,
    handle: [u8; 6],
) {
    let mut payload = vec![0x00, 0x06];
    payload.extend_from_slice(&handle);
    let packet =
        state.server_packet(commands::LEAVESLOT, Kind::Broadcast, payload);
    state.broadcast(Scope::Slot(area, room, slot), &packet).await;
}

/// `[00 player][00 00]` unlock announcement to the slot's occupants.
pub(crate) async fn player_ok(
    state: &ServerState,
    area: u16,
    room: u16,
    slot: u16,
    player: u8,
) {
    let payload = vec![0x00, player, 0x00, 0x00];
    let packet =
        state.server_packet(commands::PLAYEROK, Kind::Broadcast, payload);
    state.broadcast(Scope::Slot(area, room, slot), &packet).await;
}

/// `[00 count]` after-game-lobby occupancy to the game session.
pub(crate) async fn agl_player_count(state: &ServerState, game_number: u32) {
    let count = {
        let directory = state.directory.lock().await;
        directory.agl_count(game_number)
    };
    let packet = state.server_packet(
        commands::AGLPLAYERCNT,
        Kind::Broadcast,
        vec![0x00, count],
    );
    state
        .broadcast(Scope::ActiveGame(game_number), &packet)
        .await;
}
