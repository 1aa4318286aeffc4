/// Device details published on the `/status/zp` support page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakerInfo {
    pub zone_name: String,
    pub zone_icon: String,
    pub configuration: String,
    pub local_uid: String,
    pub serial_number: String,
    pub software_version: String,
    pub software_date: String,
    pub software_scm: String,
    pub min_compatible_version: String,
    pub legacy_compatible_version: String,
    pub hardware_version: String,
    pub dsp_version: String,
    pub hw_flags: String,
    pub hw_features: String,
    pub variant: String,
    pub general_flags: String,
    pub ip_address: String,
    pub mac_address: String,
    pub copyright: String,
    pub extra_info: String,
    pub ht_audio_in_code: String,
    pub idx_trk: String,
    pub mdp2_ver: String,
    pub mdp3_ver: String,
}
