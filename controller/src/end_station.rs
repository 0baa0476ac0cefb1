//! One discovered AVDECC end station: advertisement state, lifecycle, and
//! the descriptor registry its enumeration fills.

use crate::descriptor::DescriptorRegistry;
use crate::enumeration::EnumerationState;
use crate::message::adp::{
    Adpdu, EntityCapabilities, ListenerCapabilities, TalkerCapabilities,
};
use crate::message::{EntityId, Mac};
use crate::util::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndStationState {
    /// Discovered; the descriptor walk is running.
    Enumerating,
    /// The full descriptor tree has been read.
    Ready,
    /// The entity advertised new state; the registry no longer reflects it.
    Stale,
    /// Removed from the network, kept only transiently.
    Departed,
}

pub struct EndStation {
    pub entity_id: EntityId,
    pub entity_model_id: u64,
    pub mac: Mac,
    pub entity_capabilities: EntityCapabilities,
    pub talker_stream_sources: u16,
    pub talker_capabilities: TalkerCapabilities,
    pub listener_stream_sinks: u16,
    pub listener_capabilities: ListenerCapabilities,
    pub available_index: u32,
    pub gptp_grandmaster_id: u64,
    pub gptp_domain_number: u8,
    pub identify_control_index: u16,
    pub interface_index: u16,
    pub association_id: u64,
    /// Advertised validity, already scaled to milliseconds.
    pub valid_time_ms: u64,
    pub expires_at: Timestamp,
    pub last_seen: Timestamp,
    /// From the ENTITY descriptor once read; 0 until then.
    pub current_configuration: u16,
    pub state: EndStationState,
    pub registry: DescriptorRegistry,
    /// Non-SUCCESS or timed-out reads during the current enumeration pass.
    pub read_error_count: u32,
    pub(crate) enumeration: EnumerationState,
}

impl EndStation {
    pub(crate) fn from_advertisement(pdu: &Adpdu, src: Mac, now: Timestamp) -> Self {
        // valid_time is in 2-second units on the wire.
        let valid_time_ms = u64::from(pdu.valid_time) * 2000;
        EndStation {
            entity_id: pdu.entity_id,
            entity_model_id: pdu.entity_model_id,
            mac: src,
            entity_capabilities: pdu.entity_capabilities,
            talker_stream_sources: pdu.talker_stream_sources,
            talker_capabilities: pdu.talker_capabilities,
            listener_stream_sinks: pdu.listener_stream_sinks,
            listener_capabilities: pdu.listener_capabilities,
            available_index: pdu.available_index,
            gptp_grandmaster_id: pdu.gptp_grandmaster_id,
            gptp_domain_number: pdu.gptp_domain_number,
            identify_control_index: pdu.identify_control_index,
            interface_index: pdu.interface_index,
            association_id: pdu.association_id,
            valid_time_ms,
            expires_at: now + valid_time_ms,
            last_seen: now,
            current_configuration: 0,
            state: EndStationState::Enumerating,
            registry: DescriptorRegistry::new(),
            read_error_count: 0,
            enumeration: EnumerationState::default(),
        }
    }

    /// Fold a fresh AVAILABLE advertisement into the record.
    pub(crate) fn apply_advertisement(&mut self, pdu: &Adpdu, src: Mac, now: Timestamp) {
        self.mac = src;
        self.entity_model_id = pdu.entity_model_id;
        self.entity_capabilities = pdu.entity_capabilities;
        self.talker_stream_sources = pdu.talker_stream_sources;
        self.talker_capabilities = pdu.talker_capabilities;
        self.listener_stream_sinks = pdu.listener_stream_sinks;
        self.listener_capabilities = pdu.listener_capabilities;
        self.available_index = pdu.available_index;
        self.gptp_grandmaster_id = pdu.gptp_grandmaster_id;
        self.gptp_domain_number = pdu.gptp_domain_number;
        self.identify_control_index = pdu.identify_control_index;
        self.interface_index = pdu.interface_index;
        self.association_id = pdu.association_id;
        self.valid_time_ms = u64::from(pdu.valid_time) * 2000;
        self.refresh(now);
    }

    pub(crate) fn refresh(&mut self, now: Timestamp) {
        self.last_seen = now;
        self.expires_at = now + self.valid_time_ms;
    }
}
