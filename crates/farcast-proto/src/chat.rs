//! Chat channel metadata and player records.
//!
//! The original client resolved channel display names and filter
//! categories through runtime attribute reflection; here they are static
//! `match` tables so the compiler checks exhaustiveness and lookups cost
//! nothing.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// The game's chat log channel of a message.
///
/// Values are the game's own identifiers and are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u16)]
#[allow(missing_docs)] // variant names are the documentation
pub enum ChatType {
    Debug = 1,
    Urgent = 2,
    Notice = 3,
    Say = 10,
    Shout = 11,
    TellOutgoing = 12,
    TellIncoming = 13,
    Party = 14,
    Alliance = 15,
    Linkshell1 = 16,
    Linkshell2 = 17,
    Linkshell3 = 18,
    Linkshell4 = 19,
    Linkshell5 = 20,
    Linkshell6 = 21,
    Linkshell7 = 22,
    Linkshell8 = 23,
    FreeCompany = 24,
    NoviceNetwork = 27,
    CustomEmote = 28,
    StandardEmote = 29,
    Yell = 30,
    CrossParty = 32,
    PvpTeam = 36,
    CrossLinkshell1 = 37,
    Damage = 41,
    Miss = 42,
    Action = 43,
    Item = 44,
    Healing = 45,
    GainBuff = 46,
    GainDebuff = 47,
    LoseBuff = 48,
    LoseDebuff = 49,
    Alarm = 55,
    Echo = 56,
    System = 57,
    BattleSystem = 58,
    GatheringSystem = 59,
    Error = 60,
    NpcDialogue = 61,
    LootNotice = 62,
    Progress = 64,
    LootRoll = 65,
    Crafting = 66,
    Gathering = 67,
    NpcAnnouncement = 68,
    FreeCompanyAnnouncement = 69,
    FreeCompanyLoginLogout = 70,
    RetainerSale = 71,
    PeriodicRecruitmentNotification = 72,
    Sign = 73,
    RandomNumber = 74,
    NoviceNetworkSystem = 75,
    Orchestrion = 76,
    PvpTeamAnnouncement = 77,
    PvpTeamLoginLogout = 78,
    MessageBook = 79,
    GmTell = 80,
    GmSay = 81,
    GmShout = 82,
    GmYell = 83,
    GmParty = 84,
    GmFreeCompany = 85,
    GmLinkshell1 = 86,
    GmLinkshell2 = 87,
    GmLinkshell3 = 88,
    GmLinkshell4 = 89,
    GmLinkshell5 = 90,
    GmLinkshell6 = 91,
    GmLinkshell7 = 92,
    GmLinkshell8 = 93,
    GmNoviceNetwork = 94,
    CrossLinkshell2 = 101,
    CrossLinkshell3 = 102,
    CrossLinkshell4 = 103,
    CrossLinkshell5 = 104,
    CrossLinkshell6 = 105,
    CrossLinkshell7 = 106,
    CrossLinkshell8 = 107,
}

impl ChatType {
    /// Human-readable channel name as shown in the game's log filter
    /// configuration.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Urgent => "Urgent",
            Self::Notice => "Notice",
            Self::Say => "Say",
            Self::Shout => "Shout",
            Self::TellOutgoing => "Tell (Outgoing)",
            Self::TellIncoming => "Tell (Incoming)",
            Self::Party => "Party",
            Self::Alliance => "Alliance",
            Self::Linkshell1 => "Linkshell [1]",
            Self::Linkshell2 => "Linkshell [2]",
            Self::Linkshell3 => "Linkshell [3]",
            Self::Linkshell4 => "Linkshell [4]",
            Self::Linkshell5 => "Linkshell [5]",
            Self::Linkshell6 => "Linkshell [6]",
            Self::Linkshell7 => "Linkshell [7]",
            Self::Linkshell8 => "Linkshell [8]",
            Self::FreeCompany => "Free Company",
            Self::NoviceNetwork => "Novice Network",
            Self::CustomEmote => "Custom Emotes",
            Self::StandardEmote => "Standard Emotes",
            Self::Yell => "Yell",
            Self::CrossParty => "Cross-world Party",
            Self::PvpTeam => "PvP Team",
            Self::CrossLinkshell1 => "Cross-world Linkshell [1]",
            Self::Damage => "Damage dealt",
            Self::Miss => "Failed attacks",
            Self::Action => "Actions used",
            Self::Item => "Items used",
            Self::Healing => "Healing",
            Self::GainBuff => "Beneficial effects granted",
            Self::GainDebuff => "Detrimental effects inflicted",
            Self::LoseBuff => "Beneficial effects lost",
            Self::LoseDebuff => "Detrimental effects cured",
            Self::Alarm => "Alarm Notifications",
            Self::Echo => "Echo",
            Self::System => "System Messages",
            Self::BattleSystem => "Battle System Messages",
            Self::GatheringSystem => "Gathering System Messages",
            Self::Error => "Error Messages",
            Self::NpcDialogue => "NPC Dialogue",
            Self::LootNotice => "Loot Notices",
            Self::Progress => "Progression Messages",
            Self::LootRoll => "Loot Messages",
            Self::Crafting => "Synthesis Messages",
            Self::Gathering => "Gathering Messages",
            Self::NpcAnnouncement => "NPC Dialogue (Announcements)",
            Self::FreeCompanyAnnouncement => "Free Company Announcements",
            Self::FreeCompanyLoginLogout => "Free Company Member Login Notifications",
            Self::RetainerSale => "Retainer Sale Notifications",
            Self::PeriodicRecruitmentNotification => "Periodic Recruitment Notifications",
            Self::Sign => "Sign Messages for PC Targets",
            Self::RandomNumber => "Random Number Messages",
            Self::NoviceNetworkSystem => "Novice Network Notifications",
            Self::Orchestrion => "Current Orchestrion Track Messages",
            Self::PvpTeamAnnouncement => "PvP Team Announcements",
            Self::PvpTeamLoginLogout => "PvP Team Member Login Notifications",
            Self::MessageBook => "Message Book Alert",
            Self::GmTell => "Tell (GM)",
            Self::GmSay => "Say (GM)",
            Self::GmShout => "Shout (GM)",
            Self::GmYell => "Yell (GM)",
            Self::GmParty => "Party (GM)",
            Self::GmFreeCompany => "Free Company (GM)",
            Self::GmLinkshell1 => "Linkshell [1] (GM)",
            Self::GmLinkshell2 => "Linkshell [2] (GM)",
            Self::GmLinkshell3 => "Linkshell [3] (GM)",
            Self::GmLinkshell4 => "Linkshell [4] (GM)",
            Self::GmLinkshell5 => "Linkshell [5] (GM)",
            Self::GmLinkshell6 => "Linkshell [6] (GM)",
            Self::GmLinkshell7 => "Linkshell [7] (GM)",
            Self::GmLinkshell8 => "Linkshell [8] (GM)",
            Self::GmNoviceNetwork => "Novice Network (GM)",
            Self::CrossLinkshell2 => "Cross-world Linkshell [2]",
            Self::CrossLinkshell3 => "Cross-world Linkshell [3]",
            Self::CrossLinkshell4 => "Cross-world Linkshell [4]",
            Self::CrossLinkshell5 => "Cross-world Linkshell [5]",
            Self::CrossLinkshell6 => "Cross-world Linkshell [6]",
            Self::CrossLinkshell7 => "Cross-world Linkshell [7]",
            Self::CrossLinkshell8 => "Cross-world Linkshell [8]",
        }
    }

    /// Whether this channel carries battle log noise rather than
    /// conversation.
    #[must_use]
    pub const fn is_battle(self) -> bool {
        matches!(
            self,
            Self::Damage
                | Self::Miss
                | Self::Action
                | Self::Item
                | Self::Healing
                | Self::GainBuff
                | Self::LoseBuff
                | Self::GainDebuff
                | Self::LoseDebuff
                | Self::BattleSystem
        )
    }
}

/// The chat input channel a submitted message goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum InputChannel {
    Tell = 0,
    Say = 1,
    Party = 2,
    Alliance = 3,
    Yell = 4,
    Shout = 5,
    FreeCompany = 6,
    PvpTeam = 7,
    NoviceNetwork = 8,
    CrossLinkshell1 = 9,
    CrossLinkshell2 = 10,
    CrossLinkshell3 = 11,
    CrossLinkshell4 = 12,
    CrossLinkshell5 = 13,
    CrossLinkshell6 = 14,
    CrossLinkshell7 = 15,
    CrossLinkshell8 = 16,
    Linkshell1 = 19,
    Linkshell2 = 20,
    Linkshell3 = 21,
    Linkshell4 = 22,
    Linkshell5 = 23,
    Linkshell6 = 24,
    Linkshell7 = 25,
    Linkshell8 = 26,
}

impl InputChannel {
    /// Zero-based linkshell slot for (cross-world) linkshell channels,
    /// `0` for everything else.
    #[must_use]
    pub const fn linkshell_index(self) -> u32 {
        match self {
            Self::Linkshell1 | Self::CrossLinkshell1 => 0,
            Self::Linkshell2 | Self::CrossLinkshell2 => 1,
            Self::Linkshell3 | Self::CrossLinkshell3 => 2,
            Self::Linkshell4 | Self::CrossLinkshell4 => 3,
            Self::Linkshell5 | Self::CrossLinkshell5 => 4,
            Self::Linkshell6 | Self::CrossLinkshell6 => 5,
            Self::Linkshell7 | Self::CrossLinkshell7 => 6,
            Self::Linkshell8 | Self::CrossLinkshell8 => 7,
            _ => 0,
        }
    }
}

/// Which roster a player-list request or response refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum PlayerListType {
    Party = 1,
    Friend = 2,
    Linkshell = 3,
    CrossLinkshell = 4,
}

/// One entry of a player list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Character name.
    pub name: Option<String>,
    /// Free company tag.
    pub free_company: Option<String>,
    /// Bitset of [`PlayerStatus`] flags.
    pub status: u64,
    /// Current world id.
    pub current_world: u16,
    /// Current world display name.
    pub current_world_name: Option<String>,
    /// Home world id.
    pub home_world: u16,
    /// Home world display name.
    pub home_world_name: Option<String>,
    /// Territory id the player is in.
    pub territory: u16,
    /// Territory display name.
    pub territory_name: Option<String>,
    /// Job id.
    pub job: u8,
    /// Job display name.
    pub job_name: Option<String>,
    /// Grand company id.
    pub grand_company: u8,
    /// Grand company display name.
    pub grand_company_name: Option<String>,
    /// Supported language bitset.
    pub languages: u8,
    /// Primary language id.
    pub main_language: u8,
}

impl Player {
    /// Test a status flag on this player's status bitset.
    #[must_use]
    pub const fn has_status(&self, status: PlayerStatus) -> bool {
        (self.status & (1 << status as u64)) != 0
    }
}

/// Online-status flag bit positions used in [`Player::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum PlayerStatus {
    GameQa = 1,
    GameMaster1 = 2,
    GameMaster2 = 3,
    EventParticipant = 4,
    Disconnected = 5,
    WaitingForFriendListApproval = 6,
    WaitingForLinkshellApproval = 7,
    WaitingForFreeCompanyApproval = 8,
    NotFound = 9,
    Offline = 10,
    BattleMentor = 11,
    Busy = 12,
    Pvp = 13,
    PlayingTripleTriad = 14,
    ViewingCutscene = 15,
    UsingAChocoboPorter = 16,
    AwayFromKeyboard = 17,
    CameraMode = 18,
    LookingForRepairs = 19,
    LookingToRepair = 20,
    LookingToMeldMateria = 21,
    RolePlaying = 22,
    LookingForParty = 23,
    SwordForHire = 24,
    WaitingForDutyFinder = 25,
    RecruitingPartyMembers = 26,
    Mentor = 27,
    PveMentor = 28,
    TradeMentor = 29,
    PvpMentor = 30,
    Returner = 31,
    NewAdventurer = 32,
    AllianceLeader = 33,
    AlliancePartyLeader = 34,
    AlliancePartyMember = 35,
    PartyLeader = 36,
    PartyMember = 37,
    PartyLeaderCrossWorld = 38,
    PartyMemberCrossWorld = 39,
    AnotherWorld = 40,
    SharingDuty = 41,
    SimilarDuty = 42,
    InDuty = 43,
    TrialAdventurer = 44,
    FreeCompany = 45,
    GrandCompany = 46,
    Online = 47,
}
