// Warning codes delivered through the advisory `on_warning` event

use serde::{Deserialize, Serialize};

/// Warning codes reported asynchronously by the engine.
///
/// Warnings never correspond 1:1 with a synchronous call failure; they are
/// advisory and may be ignored by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum WarningCode {
    InvalidView = 8,
    InitVideo = 16,
    Pending = 20,
    NoAvailableChannel = 103,
    LookupChannelTimeout = 104,
    LookupChannelRejected = 105,
    OpenChannelTimeout = 106,
    OpenChannelRejected = 107,
    SwitchLiveVideoTimeout = 111,
    SetClientRoleTimeout = 118,
    AudioMixingOpenError = 701,
    AdmRuntimePlayoutWarning = 1014,
    AdmRuntimeRecordingWarning = 1016,
    AdmRecordAudioSilence = 1019,
    AdmPlayoutMalfunction = 1020,
    AdmRecordMalfunction = 1021,
    AdmRecordAudioLowlevel = 1031,
    ApmHowling = 1051,
}

impl WarningCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        let warning = match code {
            8 => WarningCode::InvalidView,
            16 => WarningCode::InitVideo,
            20 => WarningCode::Pending,
            103 => WarningCode::NoAvailableChannel,
            104 => WarningCode::LookupChannelTimeout,
            105 => WarningCode::LookupChannelRejected,
            106 => WarningCode::OpenChannelTimeout,
            107 => WarningCode::OpenChannelRejected,
            111 => WarningCode::SwitchLiveVideoTimeout,
            118 => WarningCode::SetClientRoleTimeout,
            701 => WarningCode::AudioMixingOpenError,
            1014 => WarningCode::AdmRuntimePlayoutWarning,
            1016 => WarningCode::AdmRuntimeRecordingWarning,
            1019 => WarningCode::AdmRecordAudioSilence,
            1020 => WarningCode::AdmPlayoutMalfunction,
            1021 => WarningCode::AdmRecordMalfunction,
            1031 => WarningCode::AdmRecordAudioLowlevel,
            1051 => WarningCode::ApmHowling,
            _ => return None,
        };
        Some(warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_code_values() {
        assert_eq!(WarningCode::AudioMixingOpenError.code(), 701);
        assert_eq!(WarningCode::ApmHowling.code(), 1051);
        assert_eq!(WarningCode::from_code(104), Some(WarningCode::LookupChannelTimeout));
        assert_eq!(WarningCode::from_code(0), None);
    }
}
