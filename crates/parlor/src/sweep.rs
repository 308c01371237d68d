//! The liveness/cleanup loop.
//!
//! Driven by [`parlor_tick::SweepScheduler`]: the unsolicited heartbeat,
//! the directed liveness check with eviction, slot auto-start, and
//! ghost-slot reclamation.

use std::sync::Arc;

use parlor_lobby::{AGL_AREA, SlotStatus};
use parlor_protocol::{Kind, commands};
use parlor_tick::{Sweep, SweepConfig, SweepScheduler};
use parlor_transport::ConnectionId;

use crate::actions::{self, CloseMode};
use crate::broadcasts;
use crate::scopes::Scope;
use crate::state::ServerState;

/// Runs the maintenance cadences forever.
pub async fn run_sweeps(state: Arc<ServerState>, config: SweepConfig) {
    let mut scheduler = SweepScheduler::new(config);
    loop {
        match scheduler.next_sweep().await {
            Sweep::Ping => broadcast_ping(&state).await,
            Sweep::Liveness => liveness_check(&state).await,
            Sweep::AutoStart => check_auto_start(&state).await,
            Sweep::GhostClean => clean_ghost_slots(&state).await,
        }
    }
}

/// Unsolicited ping to every client. Payload as observed; meaning of
/// the bytes unknown.
pub async fn broadcast_ping(state: &ServerState) {
    let packet = state.server_packet(
        commands::HEARTBEAT,
        Kind::Broadcast,
        vec![0x00, 0x02, 0x00, 0x01, 0x03, 0xE7, 0x00, 0x01],
    );
    state.broadcast(Scope::Everyone, &packet).await;
}

/// Directed liveness check.
///
/// Clients that answered since the last cycle get their flag cleared and
/// a fresh check; clients that never answered are evicted. After-game
/// lobby occupants are exempt — they are tracked by game number.
pub async fn liveness_check(state: &ServerState) {
    let mut evict: Vec<ConnectionId> = Vec::new();
    let mut ping: Vec<ConnectionId> = Vec::new();
    {
        let mut directory = state.directory.lock().await;
        for client in directory.iter_mut() {
            if client.area == AGL_AREA {
                continue;
            }
            if client.alive {
                client.alive = false;
                ping.push(client.conn);
            } else {
                tracing::info!(
                    conn = %client.conn,
                    user = %client.user,
                    "liveness check failed, evicting"
                );
                evict.push(client.conn);
            }
        }
    }

    for conn in ping {
        let check = state.server_packet(
            commands::CONNCHECK,
            Kind::Query,
            Vec::new(),
        );
        state.send(conn, &check);
    }
    for conn in evict {
        actions::remove_client(state, conn, CloseMode::Disconnect).await;
    }

    // Relay clients prove liveness through their own traffic.
    for old in state.relay_roster.sweep_liveness() {
        tracing::info!(
            conn = %old.conn,
            user = %old.user,
            "relay liveness failed, evicting"
        );
        state.connections.close(old.conn);
    }
}

/// Auto-start for the first area's first room: a slot whose wait timer
/// ran out starts its game exactly as the host broadcast would.
pub async fn check_auto_start(state: &ServerState) {
    let occupied: Vec<(u16, u16, u16)> = {
        let directory = state.directory.lock().await;
        let mut slots: Vec<(u16, u16, u16)> = directory
            .iter()
            .filter(|c| c.area == 1 && c.room == 1 && c.slot != 0)
            .map(|c| (c.area, c.room, c.slot))
            .collect();
        slots.sort_unstable();
        slots.dedup();
        slots
    };

    for (area, room, slot) in occupied {
        let expired = {
            let lobby = state.lobby.lock().await;
            lobby.slot(area, room, slot).is_some_and(|s| {
                s.remaining_secs() == 0
                    && s.status() != SlotStatus::Busy
            })
        };
        if expired {
            tracing::info!(area, room, slot, "wait timer expired, auto-starting");
            actions::start_game(state, area, room, slot).await;
        }
    }
}

/// Reclaims slots stuck open-for-join with nobody inside, and tells the
/// room so the stale status disappears from browsers.
pub async fn clean_ghost_slots(state: &ServerState) {
    let coordinates: Vec<(u16, u16, u16)> = {
        let lobby = state.lobby.lock().await;
        lobby.coordinates().collect()
    };

    for (area, room, slot) in coordinates {
        let ghost = {
            let directory = state.directory.lock().await;
            let lobby = state.lobby.lock().await;
            lobby
                .slot(area, room, slot)
                .is_some_and(|s| s.status() == SlotStatus::RuleSet)
                && directory.count_in_slot(area, room, slot) == 0
        };
        if ghost {
            if let Ok(s) =
                state.lobby.lock().await.slot_mut(area, room, slot)
            {
                s.set_status(SlotStatus::Free);
            }
            broadcasts::slot_status(state, area, room, slot).await;
            tracing::info!(area, room, slot, "reclaimed ghost slot");
        }
    }
}
