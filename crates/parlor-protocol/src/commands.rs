//! Command ids, organized by the lobby screens they belong to.
//!
//! Ids whose purpose is not understood keep an `UNKN_` name; their observed
//! answers are reproduced without inferring meaning. [`name`] maps ids to
//! symbolic names for logs only — the names are not part of the contract.

/// First packet of a connection; carries the session seed.
pub const LOGIN: u16 = 0x6101;
/// Timeout parameters, presumed.
pub const UNKN_61A0: u16 = 0x61A0;
/// Client version exchange.
pub const CHECKVERSION: u16 = 0x6103;
/// Random-number check.
pub const CHECKRND: u16 = 0x600E;
/// Latency parameters, presumed.
pub const UNKN_61A1: u16 = 0x61A1;
/// Stored handle/nickname pairs on offer (max 3).
pub const IDHNPAIRS: u16 = 0x6131;
/// Which pair the client chose.
pub const HNSELECT: u16 = 0x6132;
/// Buddy online-status query.
pub const BUDDYLIST: u16 = 0x6133;
/// Buddy detail check.
pub const CHECKBUDDY: u16 = 0x6134;
/// Private message to a handle.
pub const PRIVATEMSG: u16 = 0x6135;
/// Private message delivery.
pub const PRIVATEMSGBC: u16 = 0x6136;
/// Statistics of the previous game, used for rankings.
pub const POSTGAMEINFO: u16 = 0x6138;
/// Unknown; fires at the end of the login procedure.
pub const UNKN_6104: u16 = 0x6104;
/// Info page fetch.
pub const GETINFO: u16 = 0x6148;
/// Message of the day.
pub const MOTHEDAY: u16 = 0x614C;
/// Unknown; sent when a client backs out to the lobby top.
pub const UNKN_6141: u16 = 0x6141;
/// Area ranking list.
pub const RANKINGS: u16 = 0x6145;
/// Opaque event data relay.
pub const EVENTDAT: u16 = 0x6161;
/// Event data delivery.
pub const EVENTDATBC: u16 = 0x6162;
/// Unknown; accepted without effect.
pub const UNKN_6181: u16 = 0x6181;
/// Selected character and its statistics block.
pub const CHARSELECT: u16 = 0x6190;
/// Unknown; fixed data-count answer.
pub const UNKN_6881: u16 = 0x6881;
/// Unknown; data-window read, modeled but not served.
pub const UNKN_6882: u16 = 0x6882;

/// Number of areas on this server.
pub const AREACOUNT: u16 = 0x6203;
/// Area name.
pub const AREANAME: u16 = 0x6204;
/// Players in an area (triple: room list / in room / after-game).
pub const AREAPLAYERCNT: u16 = 0x6205;
/// Area available (0) or locked (3).
pub const AREASTATUS: u16 = 0x6206;
/// Choose an area.
pub const AREASELECT: u16 = 0x6207;
/// Leave the room list, back to the area list.
pub const EXITAREA: u16 = 0x6209;
/// Area description markup.
pub const AREADESCRIPT: u16 = 0x620A;
/// Unsolicited ping to every client.
pub const HEARTBEAT: u16 = 0x6202;
/// Enter the after-game lobby.
pub const ENTERAGL: u16 = 0x6210;
/// After-game lobby player statistics.
pub const AGLSTATS: u16 = 0x6211;
/// After-game lobby player count.
pub const AGLPLAYERCNT: u16 = 0x6212;
/// Leave the after-game lobby.
pub const LEAVEAGL: u16 = 0x6213;
/// Broadcast of a player joining the after-game lobby.
pub const AGLJOIN: u16 = 0x6214;

/// Rooms in the selected area.
pub const ROOMSCOUNT: u16 = 0x6301;
/// Room name.
pub const ROOMNAME: u16 = 0x6302;
/// Players in a room.
pub const ROOMPLAYERCNT: u16 = 0x6303;
/// Room status.
pub const ROOMSTATUS: u16 = 0x6304;
/// Enter a room.
pub const ENTERROOM: u16 = 0x6305;
/// Unknown; fixed answer echoing the queried number.
pub const UNKN_6308: u16 = 0x6308;

/// Game slots in the room.
pub const SLOTCOUNT: u16 = 0x6401;
/// Slot title.
pub const SLOTTITLE: u16 = 0x6402;
/// Occupancy / capacity of a slot.
pub const SLOTPLRSTATUS: u16 = 0x6403;
/// Slot availability.
pub const SLOTSTATUS: u16 = 0x6404;
/// Password protection flag of a slot.
pub const SLOTPWDPROT: u16 = 0x6405;
/// Join a configured slot.
pub const JOINGAME: u16 = 0x6406;
/// Create a slot (become host).
pub const CREATESLOT: u16 = 0x6407;
/// Leave the slot list, back to the room list.
pub const EXITSLOTLIST: u16 = 0x6408;
/// Wait timer of a slot.
pub const SLOTTIMER: u16 = 0x6409;
/// Statistics of the players in a slot.
pub const PLAYERSTATS: u16 = 0x640A;
/// Secondary slot attributes.
pub const SLOTATTRIB2: u16 = 0x640B;
/// Unknown; fixed answer echoing the queried number.
pub const UNKN_6412: u16 = 0x6412;

/// Host cancels / player leaves a slot in creation.
pub const CANCELSLOT: u16 = 0x6501;
/// Leaving player announcement.
pub const LEAVESLOT: u16 = 0x6502;
/// Broadcast of a joining player's statistics.
pub const PLAYERSTATBC: u16 = 0x6503;
/// Unknown; final packet from the slot creator.
pub const UNKN_6504: u16 = 0x6504;
/// Broadcast when the host cancels the slot.
pub const CANCELSLOTBC: u16 = 0x6505;
/// Broadcast when a player is unlocked.
pub const PLAYEROK: u16 = 0x6506;
/// Host starts the game.
pub const STARTGAME: u16 = 0x6508;
/// Scenario and media type selection for a slot.
pub const SCENESELECT: u16 = 0x6509;
/// Scenario and media type of a slot.
pub const SLOTSCENTYPE: u16 = 0x650A;

/// Unknown rule-screen query.
pub const UNKN_6601: u16 = 0x6601;
/// Unknown rule-screen query.
pub const UNKN_6602: u16 = 0x6602;
/// Number of rules for a slot.
pub const RULESCOUNT: u16 = 0x6603;
/// Rule name.
pub const RULEDESCRIPT: u16 = 0x6604;
/// Rule attribute.
pub const RULEATTRIB: u16 = 0x6605;
/// Current rule value.
pub const RULEVALUE: u16 = 0x6606;
/// Number of choices for a rule.
pub const RULEATTCOUNT: u16 = 0x6607;
/// Name of a rule choice.
pub const ATTRDESCRIPT: u16 = 0x6608;
/// Set the slot title.
pub const SLOTNAME: u16 = 0x6609;
/// Set the slot password.
pub const SLOTPASSWD: u16 = 0x660A;
/// Set a rule value.
pub const SETRULE: u16 = 0x660B;
/// Unknown; payload echoed back.
pub const UNKN_660C: u16 = 0x660C;
/// Attribute of a rule choice.
pub const ATTRATTRIB: u16 = 0x660E;

/// Chat message from a client.
pub const CHATIN: u16 = 0x6701;
/// Chat message from the server.
pub const CHATOUT: u16 = 0x6702;

/// Broadcast that starts the pre-game sequence.
pub const GETREADY: u16 = 0x6910;
/// Total players for the game session.
pub const PLAYERCOUNT: u16 = 0x6911;
/// This player's number.
pub const PLAYERNUMBER: u16 = 0x6912;
/// Pre-game status of one player.
pub const PLAYERSTAT: u16 = 0x6913;
/// Game difficulty settings.
pub const GAMEDIFF: u16 = 0x6914;
/// 15-digit session key for the game.
pub const GAMESESSION: u16 = 0x6915;
/// Relay server address and port.
pub const GSINFO: u16 = 0x6916;
/// Ranking score of one player.
pub const PLAYERSCORE: u16 = 0x6917;

/// Directed liveness check.
pub const CONNCHECK: u16 = 0x6001;
/// Unknown; resets the client's lobby position.
pub const UNKN_6002: u16 = 0x6002;
/// Explicit logout.
pub const LOGOUT: u16 = 0x6006;
/// First login packet on the relay link.
pub const GSLOGIN: u16 = 0x1031;

/// Symbolic name for a command id, for diagnostics.
pub fn name(command: u16) -> &'static str {
    match command {
        LOGIN => "LOGIN",
        UNKN_61A0 => "UNKN_61A0",
        CHECKVERSION => "CHECKVERSION",
        CHECKRND => "CHECKRND",
        UNKN_61A1 => "UNKN_61A1",
        IDHNPAIRS => "IDHNPAIRS",
        HNSELECT => "HNSELECT",
        BUDDYLIST => "BUDDYLIST",
        CHECKBUDDY => "CHECKBUDDY",
        PRIVATEMSG => "PRIVATEMSG",
        PRIVATEMSGBC => "PRIVATEMSGBC",
        POSTGAMEINFO => "POSTGAMEINFO",
        UNKN_6104 => "UNKN_6104",
        GETINFO => "GETINFO",
        MOTHEDAY => "MOTHEDAY",
        UNKN_6141 => "UNKN_6141",
        RANKINGS => "RANKINGS",
        EVENTDAT => "EVENTDAT",
        EVENTDATBC => "EVENTDATBC",
        UNKN_6181 => "UNKN_6181",
        CHARSELECT => "CHARSELECT",
        UNKN_6881 => "UNKN_6881",
        UNKN_6882 => "UNKN_6882",
        AREACOUNT => "AREACOUNT",
        AREANAME => "AREANAME",
        AREAPLAYERCNT => "AREAPLAYERCNT",
        AREASTATUS => "AREASTATUS",
        AREASELECT => "AREASELECT",
        EXITAREA => "EXITAREA",
        AREADESCRIPT => "AREADESCRIPT",
        HEARTBEAT => "HEARTBEAT",
        ENTERAGL => "ENTERAGL",
        AGLSTATS => "AGLSTATS",
        AGLPLAYERCNT => "AGLPLAYERCNT",
        LEAVEAGL => "LEAVEAGL",
        AGLJOIN => "AGLJOIN",
        ROOMSCOUNT => "ROOMSCOUNT",
        ROOMNAME => "ROOMNAME",
        ROOMPLAYERCNT => "ROOMPLAYERCNT",
        ROOMSTATUS => "ROOMSTATUS",
        ENTERROOM => "ENTERROOM",
        UNKN_6308 => "UNKN_6308",
        SLOTCOUNT => "SLOTCOUNT",
        SLOTTITLE => "SLOTTITLE",
        SLOTPLRSTATUS => "SLOTPLRSTATUS",
        SLOTSTATUS => "SLOTSTATUS",
        SLOTPWDPROT => "SLOTPWDPROT",
        JOINGAME => "JOINGAME",
        CREATESLOT => "CREATESLOT",
        EXITSLOTLIST => "EXITSLOTLIST",
        SLOTTIMER => "SLOTTIMER",
        PLAYERSTATS => "PLAYERSTATS",
        SLOTATTRIB2 => "SLOTATTRIB2",
        UNKN_6412 => "UNKN_6412",
        CANCELSLOT => "CANCELSLOT",
        LEAVESLOT => "LEAVESLOT",
        PLAYERSTATBC => "PLAYERSTATBC",
        UNKN_6504 => "UNKN_6504",
        CANCELSLOTBC => "CANCELSLOTBC",
        PLAYEROK => "PLAYEROK",
        STARTGAME => "STARTGAME",
        SCENESELECT => "SCENESELECT",
        SLOTSCENTYPE => "SLOTSCENTYPE",
        UNKN_6601 => "UNKN_6601",
        UNKN_6602 => "UNKN_6602",
        RULESCOUNT => "RULESCOUNT",
        RULEDESCRIPT => "RULEDESCRIPT",
        RULEATTRIB => "RULEATTRIB",
        RULEVALUE => "RULEVALUE",
        RULEATTCOUNT => "RULEATTCOUNT",
        ATTRDESCRIPT => "ATTRDESCRIPT",
        SLOTNAME => "SLOTNAME",
        SLOTPASSWD => "SLOTPASSWD",
        SETRULE => "SETRULE",
        UNKN_660C => "UNKN_660C",
        ATTRATTRIB => "ATTRATTRIB",
        CHATIN => "CHATIN",
        CHATOUT => "CHATOUT",
        GETREADY => "GETREADY",
        PLAYERCOUNT => "PLAYERCOUNT",
        PLAYERNUMBER => "PLAYERNUMBER",
        PLAYERSTAT => "PLAYERSTAT",
        GAMEDIFF => "GAMEDIFF",
        GAMESESSION => "GAMESESSION",
        GSINFO => "GSINFO",
        PLAYERSCORE => "PLAYERSCORE",
        CONNCHECK => "CONNCHECK",
        UNKN_6002 => "UNKN_6002",
        LOGOUT => "LOGOUT",
        GSLOGIN => "GSLOGIN",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_known_commands() {
        assert_eq!(name(LOGIN), "LOGIN");
        assert_eq!(name(GETREADY), "GETREADY");
        assert_eq!(name(GSLOGIN), "GSLOGIN");
    }

    #[test]
    fn test_name_unknown_command_is_unknown() {
        assert_eq!(name(0x0000), "UNKNOWN");
        assert_eq!(name(0x7FFF), "UNKNOWN");
    }
}
