//! ADP tracker: the end station table and its availability lifecycle
//! (IEEE 1722.1 clause 6.2.5).
//!
//! The tracker decides what an incoming advertisement means — new entity,
//! refresh, state change, restart, departure — and reports it as an event.
//! Re-enumeration and notifications are the controller's follow-up.

use std::collections::HashMap;

use crate::end_station::{EndStation, EndStationState};
use crate::log::{LogLevel, Logger};
use crate::message::adp::{
    AdpMessageType, Adpdu, EntityCapabilities, ListenerCapabilities, TalkerCapabilities,
};
use crate::message::{EntityId, Mac};
use crate::util::time::Timestamp;

/// Required-capability masks applied at ADP receipt. An entity missing any
/// required flag is never inserted, never enumerated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilityFilters {
    pub entity: EntityCapabilities,
    pub talker: TalkerCapabilities,
    pub listener: ListenerCapabilities,
}

impl CapabilityFilters {
    fn accepts(&self, pdu: &Adpdu) -> bool {
        pdu.entity_capabilities.contains(self.entity)
            && pdu.talker_capabilities.contains(self.talker)
            && pdu.listener_capabilities.contains(self.listener)
    }
}

/// What an ADPDU meant for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// First appearance (or a restart detected by an available_index
    /// decrease); the record is fresh and wants enumeration.
    Discovered(EntityId),
    /// available_index advanced: the registry is stale, re-enumerate.
    Updated(EntityId),
    /// ENTITY_DEPARTING removed the record.
    Departed(EntityId),
    /// Known entity, unchanged state; expiry pushed out.
    Refreshed(EntityId),
    /// Filtered out, not for us, or otherwise without effect.
    Ignored,
}

pub struct DiscoveryTracker {
    stations: Vec<EndStation>,
    by_entity: HashMap<EntityId, usize>,
    filters: CapabilityFilters,
    log: Logger,
}

impl DiscoveryTracker {
    pub fn new(filters: CapabilityFilters, log: Logger) -> Self {
        DiscoveryTracker {
            stations: Vec::new(),
            by_entity: HashMap::new(),
            filters,
            log,
        }
    }

    pub fn set_filters(&mut self, filters: CapabilityFilters) {
        self.filters = filters;
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndStation> {
        self.stations.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EndStation> {
        self.stations.iter_mut()
    }

    pub fn by_index(&self, index: usize) -> Option<&EndStation> {
        self.stations.get(index)
    }

    pub fn get(&self, entity_id: EntityId) -> Option<&EndStation> {
        self.by_entity.get(&entity_id).map(|&i| &self.stations[i])
    }

    pub fn get_mut(&mut self, entity_id: EntityId) -> Option<&mut EndStation> {
        self.by_entity
            .get(&entity_id)
            .map(|&i| &mut self.stations[i])
    }

    pub fn by_mac(&self, mac: Mac) -> Option<&EndStation> {
        self.stations.iter().find(|s| s.mac == mac)
    }

    /// Apply one ADPDU to the table.
    pub fn handle_adpdu(&mut self, pdu: &Adpdu, src: Mac, now: Timestamp) -> DiscoveryEvent {
        match pdu.message_type {
            AdpMessageType::EntityAvailable => self.handle_available(pdu, src, now),
            AdpMessageType::EntityDeparting => match self.remove(pdu.entity_id) {
                true => {
                    self.log.post(
                        LogLevel::Info,
                        format!("entity {} departing", pdu.entity_id),
                        now,
                    );
                    DiscoveryEvent::Departed(pdu.entity_id)
                }
                false => DiscoveryEvent::Ignored,
            },
            // Controllers do not answer discovery probes.
            AdpMessageType::EntityDiscover => DiscoveryEvent::Ignored,
        }
    }

    fn handle_available(&mut self, pdu: &Adpdu, src: Mac, now: Timestamp) -> DiscoveryEvent {
        if !self.filters.accepts(pdu) {
            return DiscoveryEvent::Ignored;
        }
        let known = self.by_entity.get(&pdu.entity_id).copied();
        let Some(index) = known else {
            self.insert(EndStation::from_advertisement(pdu, src, now));
            self.log.post(
                LogLevel::Info,
                format!("entity {} discovered at {}", pdu.entity_id, src),
                now,
            );
            return DiscoveryEvent::Discovered(pdu.entity_id);
        };
        let station = &mut self.stations[index];

        if pdu.available_index == station.available_index {
            station.refresh(now);
            DiscoveryEvent::Refreshed(pdu.entity_id)
        } else if pdu.available_index > station.available_index {
            station.apply_advertisement(pdu, src, now);
            station.state = EndStationState::Stale;
            self.log.post(
                LogLevel::Info,
                format!(
                    "entity {} advertised available_index {}, registry stale",
                    pdu.entity_id, pdu.available_index
                ),
                now,
            );
            DiscoveryEvent::Updated(pdu.entity_id)
        } else {
            // available_index went backwards: the entity restarted. Rebuild
            // the record as if first seen.
            let fresh = EndStation::from_advertisement(pdu, src, now);
            *station = fresh;
            self.log.post(
                LogLevel::Info,
                format!("entity {} restarted (available_index reset)", pdu.entity_id),
                now,
            );
            DiscoveryEvent::Discovered(pdu.entity_id)
        }
    }

    /// Entities whose advertisement lapsed without a refresh. The records
    /// are removed; the caller owns the fallout.
    pub fn expire(&mut self, now: Timestamp) -> Vec<EntityId> {
        let lapsed: Vec<EntityId> = self
            .stations
            .iter()
            .filter(|s| s.expires_at <= now)
            .map(|s| s.entity_id)
            .collect();
        for entity_id in &lapsed {
            self.remove(*entity_id);
            self.log.post(
                LogLevel::Info,
                format!("entity {entity_id} timed out"),
                now,
            );
        }
        lapsed
    }

    pub fn remove(&mut self, entity_id: EntityId) -> bool {
        let Some(index) = self.by_entity.remove(&entity_id) else {
            return false;
        };
        self.stations.remove(index);
        self.reindex();
        true
    }

    fn insert(&mut self, station: EndStation) {
        self.by_entity.insert(station.entity_id, self.stations.len());
        self.stations.push(station);
    }

    fn reindex(&mut self) {
        self.by_entity.clear();
        for (index, station) in self.stations.iter().enumerate() {
            self.by_entity.insert(station.entity_id, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::adp::EntityCapabilities;

    fn available(entity: u64, available_index: u32) -> Adpdu {
        let mut pdu = Adpdu::discover(EntityId::ZERO);
        pdu.message_type = AdpMessageType::EntityAvailable;
        pdu.entity_id = EntityId(entity);
        pdu.entity_capabilities = EntityCapabilities::AEM_SUPPORTED;
        pdu.available_index = available_index;
        pdu.valid_time = 31; // 62 s
        pdu
    }

    fn tracker() -> DiscoveryTracker {
        DiscoveryTracker::new(
            CapabilityFilters::default(),
            Logger::new(LogLevel::Verbose),
        )
    }

    #[test]
    fn discover_refresh_update_depart() {
        let mut tracker = tracker();
        let src = Mac(0xAA);

        assert_eq!(
            tracker.handle_adpdu(&available(1, 1), src, 0),
            DiscoveryEvent::Discovered(EntityId(1))
        );
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.get(EntityId(1)).unwrap().expires_at, 62_000);

        // Same available_index: refresh only.
        assert_eq!(
            tracker.handle_adpdu(&available(1, 1), src, 10_000),
            DiscoveryEvent::Refreshed(EntityId(1))
        );
        assert_eq!(tracker.get(EntityId(1)).unwrap().expires_at, 72_000);

        // Higher available_index: state changed remotely.
        assert_eq!(
            tracker.handle_adpdu(&available(1, 2), src, 20_000),
            DiscoveryEvent::Updated(EntityId(1))
        );
        assert_eq!(
            tracker.get(EntityId(1)).unwrap().state,
            EndStationState::Stale
        );

        let mut departing = available(1, 2);
        departing.message_type = AdpMessageType::EntityDeparting;
        assert_eq!(
            tracker.handle_adpdu(&departing, src, 30_000),
            DiscoveryEvent::Departed(EntityId(1))
        );
        assert!(tracker.is_empty());
    }

    #[test]
    fn available_index_decrease_reads_as_restart() {
        let mut tracker = tracker();
        tracker.handle_adpdu(&available(1, 5), Mac(0xAA), 0);
        tracker.get_mut(EntityId(1)).unwrap().read_error_count = 3;

        let event = tracker.handle_adpdu(&available(1, 2), Mac(0xAA), 1000);
        assert_eq!(event, DiscoveryEvent::Discovered(EntityId(1)));
        let station = tracker.get(EntityId(1)).unwrap();
        assert_eq!(station.available_index, 2);
        assert_eq!(station.read_error_count, 0);
        assert!(station.registry.is_empty());
    }

    #[test]
    fn expiry_purges_silent_entities() {
        let mut tracker = tracker();
        tracker.handle_adpdu(&available(1, 1), Mac(0xAA), 0);
        tracker.handle_adpdu(&available(2, 1), Mac(0xBB), 10_000);

        assert!(tracker.expire(61_999).is_empty());
        assert_eq!(tracker.expire(62_000), vec![EntityId(1)]);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.get(EntityId(2)).is_some());
        // Index map survives removal.
        assert_eq!(tracker.by_index(0).unwrap().entity_id, EntityId(2));
    }

    #[test]
    fn capability_filters_gate_insertion() {
        let mut tracker = tracker();
        tracker.set_filters(CapabilityFilters {
            entity: EntityCapabilities::AEM_SUPPORTED,
            talker: TalkerCapabilities::AUDIO_SOURCE,
            listener: ListenerCapabilities::empty(),
        });

        // AEM but no audio-source talker capability: filtered.
        assert_eq!(
            tracker.handle_adpdu(&available(1, 1), Mac(0xAA), 0),
            DiscoveryEvent::Ignored
        );

        let mut pdu = available(2, 1);
        pdu.talker_capabilities =
            TalkerCapabilities::IMPLEMENTED | TalkerCapabilities::AUDIO_SOURCE;
        assert_eq!(
            tracker.handle_adpdu(&pdu, Mac(0xBB), 0),
            DiscoveryEvent::Discovered(EntityId(2))
        );
    }

    #[test]
    fn lookup_by_mac() {
        let mut tracker = tracker();
        tracker.handle_adpdu(&available(1, 1), Mac(0xAA), 0);
        assert_eq!(tracker.by_mac(Mac(0xAA)).unwrap().entity_id, EntityId(1));
        assert!(tracker.by_mac(Mac(0xBB)).is_none());
    }
}
