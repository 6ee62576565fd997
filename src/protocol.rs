//! Constants and command codes of the PulseAudio native protocol.

/// Protocol version we speak and the minimum we accept from the server.
pub const PROTOCOL_VERSION: u32 = 32;

/// The server's version word carries flags in the upper half.
pub const PROTOCOL_VERSION_MASK: u32 = 0x0000_FFFF;

/// Largest payload we send or accept.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Size of the frame descriptor that precedes every payload.
pub const DESCRIPTOR_SIZE: usize = 20;

/// Control channel id written into every descriptor.
pub const CONTROL_CHANNEL: u32 = 0xFFFF_FFFF;

/// Request tag the server uses for subscription events.
pub const SUBSCRIPTION_TAG: u32 = 0xFFFF_FFFF;

pub const COOKIE_LENGTH: usize = 256;

/// Subscription mask covering every facility.
pub const SUBSCRIPTION_MASK_ALL: u32 = 0x02FF;

/// Index value meaning "address the object by name instead".
pub const INVALID_INDEX: u32 = 0xFFFF_FFFF;

macro_rules! commands {
    ($($name:ident = $value:literal,)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum Command {
            $($name = $value,)*
        }

        impl Command {
            pub fn from_u32(value: u32) -> Option<Self> {
                match value {
                    $($value => Some(Command::$name),)*
                    _ => None,
                }
            }
        }
    };
}

commands! {
    // Generic commands
    Error = 0,
    Timeout = 1,
    Reply = 2,

    // Client -> server
    CreatePlaybackStream = 3,
    DeletePlaybackStream = 4,
    CreateRecordStream = 5,
    DeleteRecordStream = 6,
    Exit = 7,
    Auth = 8,
    SetClientName = 9,
    LookupSink = 10,
    LookupSource = 11,
    DrainPlaybackStream = 12,
    Stat = 13,
    GetPlaybackLatency = 14,
    CreateUploadStream = 15,
    DeleteUploadStream = 16,
    FinishUploadStream = 17,
    PlaySample = 18,
    RemoveSample = 19,

    GetServerInfo = 20,
    GetSinkInfo = 21,
    GetSinkInfoList = 22,
    GetSourceInfo = 23,
    GetSourceInfoList = 24,
    GetModuleInfo = 25,
    GetModuleInfoList = 26,
    GetClientInfo = 27,
    GetClientInfoList = 28,
    GetSinkInputInfo = 29,
    GetSinkInputInfoList = 30,
    GetSourceOutputInfo = 31,
    GetSourceOutputInfoList = 32,
    GetSampleInfo = 33,
    GetSampleInfoList = 34,
    Subscribe = 35,

    SetSinkVolume = 36,
    SetSinkInputVolume = 37,
    SetSourceVolume = 38,
    SetSinkMute = 39,
    SetSourceMute = 40,

    CorkPlaybackStream = 41,
    FlushPlaybackStream = 42,
    TriggerPlaybackStream = 43,

    SetDefaultSink = 44,
    SetDefaultSource = 45,

    SetPlaybackStreamName = 46,
    SetRecordStreamName = 47,

    KillClient = 48,
    KillSinkInput = 49,
    KillSourceOutput = 50,

    LoadModule = 51,
    UnloadModule = 52,

    // Obsolete autoload commands
    AddAutoloadObsolete = 53,
    RemoveAutoloadObsolete = 54,
    GetAutoloadInfoObsolete = 55,
    GetAutoloadInfoListObsolete = 56,

    GetRecordLatency = 57,
    CorkRecordStream = 58,
    FlushRecordStream = 59,
    PrebufPlaybackStream = 60,

    // Server -> client
    Request = 61,
    Overflow = 62,
    Underflow = 63,
    PlaybackStreamKilled = 64,
    RecordStreamKilled = 65,
    SubscribeEvent = 66,

    MoveSinkInput = 67,
    MoveSourceOutput = 68,
    SetSinkInputMute = 69,
    SuspendSink = 70,
    SuspendSource = 71,
    SetPlaybackStreamBufferAttr = 72,
    SetRecordStreamBufferAttr = 73,
    UpdatePlaybackStreamSampleRate = 74,
    UpdateRecordStreamSampleRate = 75,

    // Server -> client
    PlaybackStreamSuspended = 76,
    RecordStreamSuspended = 77,
    PlaybackStreamMoved = 78,
    RecordStreamMoved = 79,

    UpdateRecordStreamProplist = 80,
    UpdatePlaybackStreamProplist = 81,
    UpdateClientProplist = 82,
    RemoveRecordStreamProplist = 83,
    RemovePlaybackStreamProplist = 84,
    RemoveClientProplist = 85,

    // Server -> client
    Started = 86,

    Extension = 87,

    GetCardInfo = 88,
    GetCardInfoList = 89,
    SetCardProfile = 90,

    ClientEvent = 91,
    PlaybackStreamEvent = 92,
    RecordStreamEvent = 93,

    // Server -> client
    PlaybackBufferAttrChanged = 94,
    RecordBufferAttrChanged = 95,

    SetSinkPort = 96,
    SetSourcePort = 97,
    SetSourceOutputVolume = 98,
    SetSourceOutputMute = 99,
    SetPortLatencyOffset = 100,

    // Both directions
    EnableSrbchannel = 101,
    DisableSrbchannel = 102,
    RegisterMemfdShmid = 103,
}

/// Facility part of a subscription event word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facility {
    Sink,
    Source,
    SinkInput,
    SourceOutput,
    Module,
    Client,
    SampleCache,
    Server,
    Card,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    New,
    Change,
    Remove,
    Other(u32),
}

/// Splits a subscription event word into facility and kind.
pub fn split_event(event: u32) -> (Facility, EventKind) {
    let facility = match event & 0x0F {
        0 => Facility::Sink,
        1 => Facility::Source,
        2 => Facility::SinkInput,
        3 => Facility::SourceOutput,
        4 => Facility::Module,
        5 => Facility::Client,
        6 => Facility::SampleCache,
        7 => Facility::Server,
        9 => Facility::Card,
        other => Facility::Other(other),
    };
    let kind = match event & 0x30 {
        0x00 => EventKind::New,
        0x10 => EventKind::Change,
        0x20 => EventKind::Remove,
        other => EventKind::Other(other),
    };
    (facility, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_codes_match_the_wire() {
        assert_eq!(Command::Auth as u32, 8);
        assert_eq!(Command::GetSinkInfoList as u32, 22);
        assert_eq!(Command::LoadModule as u32, 51);
        assert_eq!(Command::SubscribeEvent as u32, 66);
        assert_eq!(Command::SetCardProfile as u32, 90);
        assert_eq!(Command::from_u32(103), Some(Command::RegisterMemfdShmid));
        assert_eq!(Command::from_u32(104), None);
    }

    #[test]
    fn event_words_split_into_facility_and_kind() {
        assert_eq!(split_event(0x0010), (Facility::Sink, EventKind::Change));
        assert_eq!(split_event(0x0024), (Facility::Module, EventKind::Remove));
        assert_eq!(split_event(0x0009), (Facility::Card, EventKind::New));
    }
}
