//! Breadth-first descriptor enumeration (the "read entity model" pass).
//!
//! For each newly known entity: read ENTITY 0, read the CONFIGURATION it
//! points at, then fan out one READ_DESCRIPTOR per (type, index) pair the
//! configuration advertises. Reads ride the AECP state machine, which
//! serializes per destination on its own; the engine additionally enforces
//! the controller-wide cap on internal reads in flight.

use std::collections::{HashSet, VecDeque};

use crate::descriptor::{Descriptor, DescriptorType};
use crate::end_station::{EndStation, EndStationState};
use crate::exchange::AecpStateMachine;
use crate::log::{LogLevel, Logger};
use crate::message::aecp::{self, AemCommandType};
use crate::notification::NotificationId;
use crate::transport::AvbNetwork;
use crate::util::time::Timestamp;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum EnumPhase {
    #[default]
    Idle,
    /// Waiting for the ENTITY descriptor.
    Entity,
    /// Waiting for the CONFIGURATION descriptor.
    Configuration,
    /// Draining the per-type fan-out.
    Walk,
    Complete,
}

/// Per-station walk bookkeeping, owned by the [`EndStation`].
#[derive(Debug, Default)]
pub(crate) struct EnumerationState {
    pub(crate) phase: EnumPhase,
    pub(crate) pending: VecDeque<(u16, u16)>,
    pub(crate) outstanding: HashSet<(u16, u16)>,
}

impl EnumerationState {
    fn reset(&mut self) {
        self.phase = EnumPhase::Idle;
        self.pending.clear();
        self.outstanding.clear();
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.outstanding.is_empty()
    }
}

pub(crate) struct EnumerationEngine {
    max_inflight: Option<usize>,
    outstanding_total: usize,
    log: Logger,
}

impl EnumerationEngine {
    pub fn new(max_inflight: Option<usize>, log: Logger) -> Self {
        EnumerationEngine {
            max_inflight,
            outstanding_total: 0,
            log,
        }
    }

    pub fn set_max_inflight(&mut self, max_inflight: Option<usize>) {
        self.max_inflight = max_inflight;
    }

    pub fn outstanding_total(&self) -> usize {
        self.outstanding_total
    }

    fn has_capacity(&self) -> bool {
        self.max_inflight
            .map_or(true, |cap| self.outstanding_total < cap)
    }

    /// Account one resolved internal read, matched or not to a live station.
    pub fn note_read_resolved(&mut self) {
        self.outstanding_total = self.outstanding_total.saturating_sub(1);
    }

    /// Start (or restart) the walk for one station.
    pub fn begin(
        &mut self,
        station: &mut EndStation,
        aecp: &mut AecpStateMachine,
        now: Timestamp,
        net: &mut dyn AvbNetwork,
    ) {
        station.registry.clear();
        station.read_error_count = 0;
        station.state = EndStationState::Enumerating;
        station.enumeration.reset();
        station.enumeration.phase = EnumPhase::Entity;
        self.log.post(
            LogLevel::Info,
            format!("enumerating entity {}", station.entity_id),
            now,
        );
        self.submit_read(station, aecp, DescriptorType::Entity as u16, 0, now, net);
    }

    fn submit_read(
        &mut self,
        station: &mut EndStation,
        aecp: &mut AecpStateMachine,
        descriptor_type: u16,
        descriptor_index: u16,
        now: Timestamp,
        net: &mut dyn AvbNetwork,
    ) {
        // ENTITY and CONFIGURATION reads are configuration-unscoped.
        let configuration_index = if descriptor_type == DescriptorType::Entity as u16
            || descriptor_type == DescriptorType::Configuration as u16
        {
            0
        } else {
            station.current_configuration
        };
        station
            .enumeration
            .outstanding
            .insert((descriptor_type, descriptor_index));
        self.outstanding_total += 1;
        aecp.submit(
            station.entity_id,
            station.mac,
            AemCommandType::ReadDescriptor as u16,
            aecp::read_descriptor(configuration_index, descriptor_type, descriptor_index),
            NotificationId::NONE,
            now,
            net,
        );
    }

    /// Fold one resolved read into the walk. `descriptor` is the raw image
    /// from a SUCCESS response, `None` for any failure. Returns true when
    /// the station just finished its walk.
    pub fn handle_read_result(
        &mut self,
        station: &mut EndStation,
        aecp: &mut AecpStateMachine,
        descriptor_type: u16,
        descriptor_index: u16,
        descriptor: Option<&[u8]>,
        now: Timestamp,
        net: &mut dyn AvbNetwork,
    ) -> bool {
        match descriptor {
            Some(image) => {
                self.apply_descriptor(station, aecp, descriptor_type, image, now, net)
            }
            None => {
                station.read_error_count += 1;
                // A failed root read leaves nothing to walk; the station
                // still settles so the pass terminates.
                if matches!(
                    station.enumeration.phase,
                    EnumPhase::Entity | EnumPhase::Configuration
                ) {
                    station.enumeration.phase = EnumPhase::Walk;
                }
            }
        }
        self.pump_station(station, aecp, now, net);
        self.finish_if_drained(station, now)
    }

    fn apply_descriptor(
        &mut self,
        station: &mut EndStation,
        aecp: &mut AecpStateMachine,
        descriptor_type: u16,
        image: &[u8],
        now: Timestamp,
        net: &mut dyn AvbNetwork,
    ) {
        let descriptor = match Descriptor::parse(image) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                station.read_error_count += 1;
                self.log.post(
                    LogLevel::Warning,
                    format!(
                        "entity {}: dropping undecodable {} descriptor: {e}",
                        station.entity_id,
                        crate::util::descriptor_name(descriptor_type)
                    ),
                    now,
                );
                if matches!(
                    station.enumeration.phase,
                    EnumPhase::Entity | EnumPhase::Configuration
                ) {
                    station.enumeration.phase = EnumPhase::Walk;
                }
                return;
            }
        };

        let mut follow_up = None;
        match (&descriptor, station.enumeration.phase) {
            (Descriptor::Entity(entity), EnumPhase::Entity) => {
                station.current_configuration = entity.current_configuration;
                station.enumeration.phase = EnumPhase::Configuration;
                follow_up = Some((
                    DescriptorType::Configuration as u16,
                    entity.current_configuration,
                ));
            }
            (Descriptor::Configuration(configuration), EnumPhase::Configuration) => {
                for count in &configuration.descriptor_counts {
                    for index in 0..count.count {
                        station
                            .enumeration
                            .pending
                            .push_back((count.descriptor_type, index));
                    }
                }
                station.enumeration.phase = EnumPhase::Walk;
            }
            _ => {}
        }
        station.registry.insert(descriptor);
        if let Some((descriptor_type, descriptor_index)) = follow_up {
            self.submit_read(station, aecp, descriptor_type, descriptor_index, now, net);
        }
    }

    /// Move pending reads onto the wire while the global cap allows.
    pub fn pump_station(
        &mut self,
        station: &mut EndStation,
        aecp: &mut AecpStateMachine,
        now: Timestamp,
        net: &mut dyn AvbNetwork,
    ) {
        while self.has_capacity() {
            let Some((descriptor_type, descriptor_index)) =
                station.enumeration.pending.pop_front()
            else {
                break;
            };
            self.submit_read(station, aecp, descriptor_type, descriptor_index, now, net);
        }
    }

    fn finish_if_drained(&mut self, station: &mut EndStation, now: Timestamp) -> bool {
        if station.enumeration.phase == EnumPhase::Walk && station.enumeration.is_drained() {
            station.enumeration.phase = EnumPhase::Complete;
            station.state = EndStationState::Ready;
            self.log.post(
                LogLevel::Info,
                format!(
                    "entity {} read complete: {} descriptors, {} errors",
                    station.entity_id,
                    station.registry.len(),
                    station.read_error_count
                ),
                now,
            );
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::adp::{AdpMessageType, Adpdu};
    use crate::message::{EntityId, Mac};
    use crate::transport::testing::MockNetwork;

    fn station() -> EndStation {
        let mut pdu = Adpdu::discover(EntityId::ZERO);
        pdu.message_type = AdpMessageType::EntityAvailable;
        pdu.entity_id = EntityId(0x1111);
        pdu.valid_time = 10;
        pdu.available_index = 1;
        EndStation::from_advertisement(&pdu, Mac(0xAA), 0)
    }

    fn harness() -> (EnumerationEngine, AecpStateMachine, MockNetwork) {
        let log = Logger::new(LogLevel::Verbose);
        let net = MockNetwork::new(Mac(0x0E));
        let mut aecp = AecpStateMachine::new(log.clone());
        aecp.set_identity(EntityId(0x2222), Mac(0x0E));
        (EnumerationEngine::new(None, log), aecp, net)
    }

    #[test]
    fn begin_reads_entity_descriptor_first() {
        let (mut engine, mut aecp, mut net) = harness();
        let mut station = station();
        engine.begin(&mut station, &mut aecp, 0, &mut net);
        assert_eq!(engine.outstanding_total(), 1);
        assert_eq!(station.enumeration.phase, EnumPhase::Entity);
        assert!(station.enumeration.outstanding.contains(&(0x0000, 0)));
        assert_eq!(net.sent_count(), 1);
    }

    #[test]
    fn inflight_cap_gates_the_fan_out() {
        let (mut engine, mut aecp, mut net) = harness();
        engine.set_max_inflight(Some(2));
        let mut station = station();
        station.enumeration.phase = EnumPhase::Walk;
        for index in 0..5 {
            station.enumeration.pending.push_back((0x0005, index));
        }
        engine.pump_station(&mut station, &mut aecp, 0, &mut net);
        assert_eq!(engine.outstanding_total(), 2);
        assert_eq!(station.enumeration.pending.len(), 3);

        // Resolving one read frees capacity for exactly one more.
        station.enumeration.outstanding.remove(&(0x0005, 0));
        engine.note_read_resolved();
        engine.pump_station(&mut station, &mut aecp, 0, &mut net);
        assert_eq!(engine.outstanding_total(), 2);
        assert_eq!(station.enumeration.pending.len(), 2);
    }

    #[test]
    fn failed_read_counts_and_walk_still_settles() {
        let (mut engine, mut aecp, mut net) = harness();
        let mut station = station();
        station.enumeration.phase = EnumPhase::Walk;
        station.enumeration.outstanding.insert((0x0005, 0));
        engine.outstanding_total = 1;

        station.enumeration.outstanding.remove(&(0x0005, 0));
        engine.note_read_resolved();
        let completed =
            engine.handle_read_result(&mut station, &mut aecp, 0x0005, 0, None, 10, &mut net);
        assert!(completed);
        assert_eq!(station.read_error_count, 1);
        assert_eq!(station.state, EndStationState::Ready);
        assert!(!station.registry.contains(0x0005, 0));
    }
}
