//! The controller core: frame dispatch, completion routing, and the public
//! facade. All state here is mutated from a single driving thread (see
//! [`crate::system`]); boundary rings carry events out.

use num::FromPrimitive;

use crate::constants::{
    ACMP_NOTIFICATION_RING_CAPACITY, ADP_DISCOVER_INTERVAL_MS, AVDECC_MULTICAST_MAC,
    NOTIFICATION_RING_CAPACITY,
};
use crate::descriptor::{ConfigurationDescriptor, Descriptor, DescriptorType};
use crate::discovery::{CapabilityFilters, DiscoveryEvent, DiscoveryTracker};
use crate::end_station::EndStation;
use crate::enumeration::EnumerationEngine;
use crate::error::Error;
use crate::exchange::{AcmpCompletion, AcmpStateMachine, AecpCompletion, AecpStateMachine};
use crate::log::{LogLevel, LogReceiver, Logger};
use crate::message::acmp::{AcmpFlags, AcmpMessageType, Acmpdu};
use crate::message::adp::Adpdu;
use crate::message::aecp::{
    self, AecpMessageType, AemCommandType, AemPdu, ReadDescriptorResponse, AEM_STATUS_SUCCESS,
};
use crate::message::{parse_frame, EntityId, Mac, Pdu};
use crate::notification::{
    AcmpNotification, CommandStatus, Notification, NotificationId, NotificationKind,
    NotificationReceiver, Notifier,
};
use crate::transport::AvbNetwork;
use crate::util::time::Timestamp;
use crate::CommandPayload;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Controller identity; derived from the interface MAC when unset.
    pub entity_id: Option<EntityId>,
    pub filters: CapabilityFilters,
    /// Controller-wide cap on enumeration reads in flight; `None` = uncapped.
    pub max_inflight_read_descriptor: Option<usize>,
    pub log_level: LogLevel,
    /// Solicited ENTITY_DISCOVER cadence, clamped to [1 s, 10 s].
    pub discover_interval_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            entity_id: None,
            filters: CapabilityFilters::default(),
            max_inflight_read_descriptor: None,
            log_level: LogLevel::Error,
            discover_interval_ms: ADP_DISCOVER_INTERVAL_MS,
        }
    }
}

pub struct Controller {
    entity_id: EntityId,
    local_mac: Mac,
    net: Box<dyn AvbNetwork>,
    discovery: DiscoveryTracker,
    aecp: AecpStateMachine,
    acmp: AcmpStateMachine,
    enumeration: EnumerationEngine,
    logger: Logger,
    notifier: Notifier<Notification>,
    acmp_notifier: Notifier<AcmpNotification>,
    next_notification_id: u64,
    discover_interval_ms: u64,
    next_discover_at: Timestamp,
    started: bool,
}

impl Controller {
    pub fn new(net: Box<dyn AvbNetwork>, config: ControllerConfig) -> Self {
        let local_mac = net.local_mac();
        let entity_id = config
            .entity_id
            .unwrap_or_else(|| EntityId::from_mac(local_mac));
        let logger = Logger::new(config.log_level);
        Controller {
            entity_id,
            local_mac,
            net,
            discovery: DiscoveryTracker::new(config.filters, logger.clone()),
            aecp: AecpStateMachine::new(logger.clone()),
            acmp: AcmpStateMachine::new(logger.clone()),
            enumeration: EnumerationEngine::new(
                config.max_inflight_read_descriptor,
                logger.clone(),
            ),
            logger,
            notifier: Notifier::with_capacity(NOTIFICATION_RING_CAPACITY),
            acmp_notifier: Notifier::with_capacity(ACMP_NOTIFICATION_RING_CAPACITY),
            next_notification_id: 0,
            discover_interval_ms: config.discover_interval_ms.clamp(1000, 10_000),
            next_discover_at: 0,
            started: false,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn local_mac(&self) -> Mac {
        self.local_mac
    }

    /// Override the controller identity. Only legal before [`Self::start`].
    pub fn set_entity_id(&mut self, entity_id: EntityId) -> Result<(), Error> {
        if self.started {
            return Err(Error::InvalidState("entity_id is fixed after start"));
        }
        self.entity_id = entity_id;
        Ok(())
    }

    /// Fix the identity, arm the discovery cadence and send the first
    /// ENTITY_DISCOVER probe.
    pub fn start(&mut self, now: Timestamp) {
        if self.started {
            return;
        }
        self.started = true;
        self.aecp.set_identity(self.entity_id, self.local_mac);
        self.acmp.set_identity(self.entity_id, self.local_mac);
        self.logger.post(
            LogLevel::Notice,
            format!("controller {} started", self.entity_id),
            now,
        );
        self.send_discover(now);
        self.next_discover_at = now + self.discover_interval_ms;
    }

    /// Stop: every outstanding command resolves as canceled.
    pub fn shutdown(&mut self, now: Timestamp) {
        let aecp_canceled = self.aecp.cancel_all();
        for completion in aecp_canceled {
            self.route_aecp_completion(completion, now);
        }
        let acmp_canceled = self.acmp.cancel_all();
        for completion in acmp_canceled {
            self.post_acmp_notification(completion);
        }
        self.logger
            .post(LogLevel::Notice, "controller stopped", now);
    }

    // ------------------------------------------------------------------
    // Event-loop inputs
    // ------------------------------------------------------------------

    /// Feed one received Ethernet frame into the core.
    pub fn handle_frame(&mut self, frame: &[u8], now: Timestamp) {
        let received = match parse_frame(frame) {
            Ok(received) => received,
            Err(e) => {
                self.logger
                    .post(LogLevel::Warning, format!("dropping frame: {e}"), now);
                return;
            }
        };
        match received.pdu {
            Pdu::Adp(pdu) => self.on_adpdu(&pdu, received.src, now),
            Pdu::Aecp(pdu) => self.on_aem_pdu(&pdu, received.src, now),
            Pdu::Acmp(pdu) => self.on_acmpdu(&pdu, now),
        }
    }

    /// Timer tick: expire advertisements, fire deadline scans, re-probe.
    pub fn tick(&mut self, now: Timestamp) {
        if self.started && now >= self.next_discover_at {
            self.send_discover(now);
            self.next_discover_at = now + self.discover_interval_ms;
        }
        for entity_id in self.discovery.expire(now) {
            self.handle_departure(entity_id, now);
        }
        let aecp_done = self.aecp.tick(now, self.net.as_mut());
        for completion in aecp_done {
            self.route_aecp_completion(completion, now);
        }
        let acmp_done = self.acmp.tick(now);
        for completion in acmp_done {
            self.post_acmp_notification(completion);
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn on_adpdu(&mut self, pdu: &Adpdu, src: Mac, now: Timestamp) {
        match self.discovery.handle_adpdu(pdu, src, now) {
            DiscoveryEvent::Discovered(entity_id) => {
                self.notify(
                    NotificationKind::EntityDiscovered,
                    entity_id,
                    0,
                    0,
                    0,
                    CommandStatus::Protocol(AEM_STATUS_SUCCESS),
                    NotificationId::NONE,
                );
                self.restart_enumeration(entity_id, now);
            }
            DiscoveryEvent::Updated(entity_id) => {
                self.notify(
                    NotificationKind::EntityUpdated,
                    entity_id,
                    0,
                    0,
                    0,
                    CommandStatus::Protocol(AEM_STATUS_SUCCESS),
                    NotificationId::NONE,
                );
                self.restart_enumeration(entity_id, now);
            }
            DiscoveryEvent::Departed(entity_id) => self.handle_departure(entity_id, now),
            DiscoveryEvent::Refreshed(_) | DiscoveryEvent::Ignored => {}
        }
    }

    fn restart_enumeration(&mut self, entity_id: EntityId, now: Timestamp) {
        // Reads of a previous pass must not leak into the new registry.
        let canceled = self.aecp.cancel_target(entity_id);
        for completion in canceled {
            self.route_aecp_completion(completion, now);
        }
        if let Some(station) = self.discovery.get_mut(entity_id) {
            self.enumeration
                .begin(station, &mut self.aecp, now, self.net.as_mut());
        }
    }

    fn handle_departure(&mut self, entity_id: EntityId, now: Timestamp) {
        self.discovery.remove(entity_id);
        let canceled = self.aecp.cancel_target(entity_id);
        for completion in canceled {
            self.route_aecp_completion(completion, now);
        }
        self.notify(
            NotificationKind::EntityDeparted,
            entity_id,
            0,
            0,
            0,
            CommandStatus::Protocol(AEM_STATUS_SUCCESS),
            NotificationId::NONE,
        );
    }

    fn on_aem_pdu(&mut self, pdu: &AemPdu, src: Mac, now: Timestamp) {
        match pdu.message_type {
            AecpMessageType::AemCommand => {
                // The only command a controller answers is another
                // controller's liveness probe.
                if pdu.target_entity_id == self.entity_id
                    && pdu.command_type == AemCommandType::ControllerAvailable as u16
                {
                    let response = AemPdu::response_to(pdu);
                    let frame = response.to_frame(src, self.local_mac);
                    if let Err(e) = self.net.send_frame(&frame) {
                        self.logger.post(
                            LogLevel::Error,
                            format!("CONTROLLER_AVAILABLE response send failed: {e}"),
                            now,
                        );
                    }
                } else {
                    self.logger.post(
                        LogLevel::Verbose,
                        format!("ignoring AEM command {}", pdu.command_name()),
                        now,
                    );
                }
            }
            AecpMessageType::AemResponse => {
                if pdu.unsolicited {
                    self.on_unsolicited_response(pdu, now);
                    return;
                }
                if pdu.controller_entity_id != self.entity_id {
                    self.logger.post(
                        LogLevel::Debug,
                        format!(
                            "response addressed to controller {}",
                            pdu.controller_entity_id
                        ),
                        now,
                    );
                    return;
                }
                match self.aecp.handle_response(pdu, now, self.net.as_mut()) {
                    Ok(Some(completion)) => self.route_aecp_completion(completion, now),
                    Ok(None) => {}
                    Err(e) => self.logger.post(LogLevel::Debug, e.to_string(), now),
                }
            }
        }
    }

    /// Unsolicited responses never touch the inflight set; known state
    /// changes are folded straight into the registry.
    fn on_unsolicited_response(&mut self, pdu: &AemPdu, now: Timestamp) {
        let (descriptor_type, descriptor_index) =
            aecp::descriptor_ref(pdu.command_type, &pdu.payload);
        if let Some(station) = self.discovery.get_mut(pdu.target_entity_id) {
            apply_unsolicited_update(station, pdu, descriptor_type, descriptor_index);
        }
        self.logger.post(
            LogLevel::Debug,
            format!(
                "unsolicited {} from {}",
                crate::util::aem_command_name(pdu.command_type),
                pdu.target_entity_id
            ),
            now,
        );
        self.notify(
            NotificationKind::UnsolicitedResponseReceived,
            pdu.target_entity_id,
            pdu.command_type,
            descriptor_type,
            descriptor_index,
            CommandStatus::Protocol(pdu.status),
            NotificationId::NONE,
        );
    }

    fn on_acmpdu(&mut self, pdu: &Acmpdu, now: Timestamp) {
        if pdu.message_type.is_command() {
            // Controllers never serve the talker/listener side.
            return;
        }
        if pdu.controller_entity_id != self.entity_id {
            return;
        }
        match self.acmp.handle_response(pdu) {
            Ok(completion) => self.post_acmp_notification(completion),
            Err(e) => self.logger.post(LogLevel::Debug, e.to_string(), now),
        }
    }

    // ------------------------------------------------------------------
    // Completion routing
    // ------------------------------------------------------------------

    fn route_aecp_completion(&mut self, completion: AecpCompletion, now: Timestamp) {
        let (descriptor_type, descriptor_index) =
            aecp::descriptor_ref(completion.command_type, &completion.payload);
        let internal_read = completion.notification_id.is_none()
            && completion.command_type == AemCommandType::ReadDescriptor as u16;

        if internal_read {
            self.enumeration.note_read_resolved();
            self.fold_enumeration_read(&completion, descriptor_type, descriptor_index, now);
            self.pump_enumeration(now);
        }

        match completion.status {
            CommandStatus::Timeout => {
                self.notify(
                    NotificationKind::CommandTimeout,
                    completion.target_entity_id,
                    completion.command_type,
                    descriptor_type,
                    descriptor_index,
                    CommandStatus::Timeout,
                    completion.notification_id,
                );
            }
            CommandStatus::Canceled => {
                if !completion.notification_id.is_none() {
                    self.notify(
                        NotificationKind::CommandCanceled,
                        completion.target_entity_id,
                        completion.command_type,
                        descriptor_type,
                        descriptor_index,
                        CommandStatus::Canceled,
                        completion.notification_id,
                    );
                }
            }
            CommandStatus::Protocol(status) => {
                if status != AEM_STATUS_SUCCESS {
                    self.logger.post(
                        LogLevel::Error,
                        format!(
                            "RESPONSE_RECEIVED, {}, {}, {}, {}, {}",
                            completion.target_entity_id,
                            crate::util::aem_command_name(completion.command_type),
                            crate::util::descriptor_name(descriptor_type),
                            descriptor_index,
                            crate::util::aem_status_name(status)
                        ),
                        now,
                    );
                }
                if !completion.notification_id.is_none() {
                    let kind = if AemCommandType::from_u16(completion.command_type).is_some() {
                        NotificationKind::ResponseReceived
                    } else {
                        self.logger.post(
                            LogLevel::Warning,
                            format!("unknown command_type 0x{:04X}", completion.command_type),
                            now,
                        );
                        NotificationKind::NoMatchFound
                    };
                    self.notify(
                        kind,
                        completion.target_entity_id,
                        completion.command_type,
                        descriptor_type,
                        descriptor_index,
                        completion.status,
                        completion.notification_id,
                    );
                }
            }
        }
    }

    fn fold_enumeration_read(
        &mut self,
        completion: &AecpCompletion,
        descriptor_type: u16,
        descriptor_index: u16,
        now: Timestamp,
    ) {
        let Some(station) = self.discovery.get_mut(completion.target_entity_id) else {
            return;
        };
        station
            .enumeration
            .outstanding
            .remove(&(descriptor_type, descriptor_index));
        if completion.status == CommandStatus::Canceled {
            // The pass is being torn down; nothing to fold.
            return;
        }

        let image = match completion.status {
            CommandStatus::Protocol(AEM_STATUS_SUCCESS) => {
                match ReadDescriptorResponse::parse(&completion.payload) {
                    Ok(response) => Some(response.descriptor),
                    Err(_) => None,
                }
            }
            _ => None,
        };
        let finished = self.enumeration.handle_read_result(
            station,
            &mut self.aecp,
            descriptor_type,
            descriptor_index,
            image,
            now,
            self.net.as_mut(),
        );
        if finished {
            let entity_id = completion.target_entity_id;
            self.notify(
                NotificationKind::EndStationReadCompleted,
                entity_id,
                AemCommandType::ReadDescriptor as u16,
                0,
                0,
                CommandStatus::Protocol(AEM_STATUS_SUCCESS),
                NotificationId::NONE,
            );
        }
    }

    fn pump_enumeration(&mut self, now: Timestamp) {
        let waiting: Vec<EntityId> = self
            .discovery
            .iter()
            .filter(|s| !s.enumeration.pending.is_empty())
            .map(|s| s.entity_id)
            .collect();
        for entity_id in waiting {
            if let Some(station) = self.discovery.get_mut(entity_id) {
                self.enumeration
                    .pump_station(station, &mut self.aecp, now, self.net.as_mut());
            }
        }
    }

    fn post_acmp_notification(&mut self, completion: AcmpCompletion) {
        let response = &completion.response;
        if completion.status.is_success() {
            let kind = match completion.command_type {
                AcmpMessageType::ConnectRxCommand | AcmpMessageType::ConnectTxCommand => {
                    Some(NotificationKind::EndStationConnected)
                }
                AcmpMessageType::DisconnectRxCommand | AcmpMessageType::DisconnectTxCommand => {
                    Some(NotificationKind::EndStationDisconnected)
                }
                _ => None,
            };
            if let Some(kind) = kind {
                self.notify(
                    kind,
                    response.listener_entity_id,
                    completion.command_type as u16,
                    0,
                    0,
                    completion.status,
                    completion.notification_id,
                );
            }
        }
        self.acmp_notifier.post(AcmpNotification {
            message_type: completion.command_type,
            status: completion.status,
            sequence_id: response.sequence_id,
            talker_entity_id: response.talker_entity_id,
            talker_unique_id: response.talker_unique_id,
            listener_entity_id: response.listener_entity_id,
            listener_unique_id: response.listener_unique_id,
            connection_count: response.connection_count,
            flags: response.flags,
            id: completion.notification_id,
        });
    }

    // ------------------------------------------------------------------
    // AEM command facade
    // ------------------------------------------------------------------

    fn alloc_notification_id(&mut self) -> NotificationId {
        self.next_notification_id += 1;
        NotificationId(self.next_notification_id)
    }

    /// Submit a raw AEM command; typed helpers below build on this.
    pub fn send_aem_command(
        &mut self,
        entity_id: EntityId,
        command_type: u16,
        payload: CommandPayload,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        let mac = self
            .discovery
            .get(entity_id)
            .map(|s| s.mac)
            .ok_or(Error::UnknownEntity(entity_id))?;
        let notification_id = self.alloc_notification_id();
        self.aecp.submit(
            entity_id,
            mac,
            command_type,
            payload,
            notification_id,
            now,
            self.net.as_mut(),
        );
        Ok(notification_id)
    }

    pub fn read_descriptor(
        &mut self,
        entity_id: EntityId,
        descriptor_type: u16,
        descriptor_index: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        let configuration_index = if descriptor_type == DescriptorType::Entity as u16
            || descriptor_type == DescriptorType::Configuration as u16
        {
            0
        } else {
            self.discovery
                .get(entity_id)
                .map(|s| s.current_configuration)
                .unwrap_or(0)
        };
        self.send_aem_command(
            entity_id,
            AemCommandType::ReadDescriptor as u16,
            aecp::read_descriptor(configuration_index, descriptor_type, descriptor_index),
            now,
        )
    }

    pub fn acquire_entity(
        &mut self,
        entity_id: EntityId,
        flags: u32,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::AcquireEntity as u16,
            aecp::acquire_entity(flags, EntityId::ZERO, DescriptorType::Entity as u16, 0),
            now,
        )
    }

    pub fn lock_entity(
        &mut self,
        entity_id: EntityId,
        flags: u32,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::LockEntity as u16,
            aecp::acquire_entity(flags, EntityId::ZERO, DescriptorType::Entity as u16, 0),
            now,
        )
    }

    /// ENTITY_AVAILABLE liveness probe toward an end station.
    pub fn entity_available(
        &mut self,
        entity_id: EntityId,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::EntityAvailable as u16,
            CommandPayload::new(),
            now,
        )
    }

    /// CONTROLLER_AVAILABLE probe toward another controller.
    pub fn controller_available(
        &mut self,
        entity_id: EntityId,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::ControllerAvailable as u16,
            CommandPayload::new(),
            now,
        )
    }

    pub fn set_stream_format(
        &mut self,
        entity_id: EntityId,
        descriptor_type: u16,
        descriptor_index: u16,
        stream_format: u64,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::SetStreamFormat as u16,
            aecp::set_stream_format(descriptor_type, descriptor_index, stream_format),
            now,
        )
    }

    pub fn get_stream_format(
        &mut self,
        entity_id: EntityId,
        descriptor_type: u16,
        descriptor_index: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::GetStreamFormat as u16,
            aecp::descriptor_only(descriptor_type, descriptor_index),
            now,
        )
    }

    pub fn set_name(
        &mut self,
        entity_id: EntityId,
        descriptor_type: u16,
        descriptor_index: u16,
        name_index: u16,
        name: &[u8; 64],
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        let configuration_index = self
            .discovery
            .get(entity_id)
            .map(|s| s.current_configuration)
            .unwrap_or(0);
        self.send_aem_command(
            entity_id,
            AemCommandType::SetName as u16,
            aecp::set_name(
                descriptor_type,
                descriptor_index,
                name_index,
                configuration_index,
                name,
            ),
            now,
        )
    }

    pub fn get_name(
        &mut self,
        entity_id: EntityId,
        descriptor_type: u16,
        descriptor_index: u16,
        name_index: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        let configuration_index = self
            .discovery
            .get(entity_id)
            .map(|s| s.current_configuration)
            .unwrap_or(0);
        self.send_aem_command(
            entity_id,
            AemCommandType::GetName as u16,
            aecp::get_name(
                descriptor_type,
                descriptor_index,
                name_index,
                configuration_index,
            ),
            now,
        )
    }

    pub fn set_sampling_rate(
        &mut self,
        entity_id: EntityId,
        descriptor_index: u16,
        sampling_rate: u32,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::SetSamplingRate as u16,
            aecp::set_sampling_rate(
                DescriptorType::AudioUnit as u16,
                descriptor_index,
                sampling_rate,
            ),
            now,
        )
    }

    pub fn get_sampling_rate(
        &mut self,
        entity_id: EntityId,
        descriptor_index: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::GetSamplingRate as u16,
            aecp::descriptor_only(DescriptorType::AudioUnit as u16, descriptor_index),
            now,
        )
    }

    pub fn set_clock_source(
        &mut self,
        entity_id: EntityId,
        clock_domain_index: u16,
        clock_source_index: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::SetClockSource as u16,
            aecp::set_clock_source(
                DescriptorType::ClockDomain as u16,
                clock_domain_index,
                clock_source_index,
            ),
            now,
        )
    }

    pub fn get_clock_source(
        &mut self,
        entity_id: EntityId,
        clock_domain_index: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::GetClockSource as u16,
            aecp::descriptor_only(DescriptorType::ClockDomain as u16, clock_domain_index),
            now,
        )
    }

    pub fn set_configuration(
        &mut self,
        entity_id: EntityId,
        configuration_index: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::SetConfiguration as u16,
            aecp::set_configuration(configuration_index),
            now,
        )
    }

    pub fn start_streaming(
        &mut self,
        entity_id: EntityId,
        descriptor_type: u16,
        descriptor_index: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::StartStreaming as u16,
            aecp::descriptor_only(descriptor_type, descriptor_index),
            now,
        )
    }

    pub fn stop_streaming(
        &mut self,
        entity_id: EntityId,
        descriptor_type: u16,
        descriptor_index: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::StopStreaming as u16,
            aecp::descriptor_only(descriptor_type, descriptor_index),
            now,
        )
    }

    pub fn register_unsolicited_notification(
        &mut self,
        entity_id: EntityId,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::RegisterUnsolicitedNotification as u16,
            CommandPayload::new(),
            now,
        )
    }

    pub fn deregister_unsolicited_notification(
        &mut self,
        entity_id: EntityId,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::DeregisterUnsolicitedNotification as u16,
            CommandPayload::new(),
            now,
        )
    }

    pub fn get_stream_info(
        &mut self,
        entity_id: EntityId,
        descriptor_type: u16,
        descriptor_index: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::GetStreamInfo as u16,
            aecp::descriptor_only(descriptor_type, descriptor_index),
            now,
        )
    }

    pub fn get_counters(
        &mut self,
        entity_id: EntityId,
        descriptor_type: u16,
        descriptor_index: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::GetCounters as u16,
            aecp::descriptor_only(descriptor_type, descriptor_index),
            now,
        )
    }

    pub fn get_avb_info(
        &mut self,
        entity_id: EntityId,
        avb_interface_index: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.send_aem_command(
            entity_id,
            AemCommandType::GetAvbInfo as u16,
            aecp::descriptor_only(DescriptorType::AvbInterface as u16, avb_interface_index),
            now,
        )
    }

    // ------------------------------------------------------------------
    // ACMP facade
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn submit_acmp(
        &mut self,
        message_type: AcmpMessageType,
        talker_entity_id: EntityId,
        talker_unique_id: u16,
        listener_entity_id: EntityId,
        listener_unique_id: u16,
        flags: AcmpFlags,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        let notification_id = self.alloc_notification_id();
        self.acmp.submit(
            message_type,
            talker_entity_id,
            talker_unique_id,
            listener_entity_id,
            listener_unique_id,
            flags,
            notification_id,
            now,
            self.net.as_mut(),
        )?;
        Ok(notification_id)
    }

    pub fn connect_rx(
        &mut self,
        talker_entity_id: EntityId,
        talker_unique_id: u16,
        listener_entity_id: EntityId,
        listener_unique_id: u16,
        flags: AcmpFlags,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.submit_acmp(
            AcmpMessageType::ConnectRxCommand,
            talker_entity_id,
            talker_unique_id,
            listener_entity_id,
            listener_unique_id,
            flags,
            now,
        )
    }

    pub fn disconnect_rx(
        &mut self,
        talker_entity_id: EntityId,
        talker_unique_id: u16,
        listener_entity_id: EntityId,
        listener_unique_id: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.submit_acmp(
            AcmpMessageType::DisconnectRxCommand,
            talker_entity_id,
            talker_unique_id,
            listener_entity_id,
            listener_unique_id,
            AcmpFlags::empty(),
            now,
        )
    }

    pub fn connect_tx(
        &mut self,
        talker_entity_id: EntityId,
        talker_unique_id: u16,
        listener_entity_id: EntityId,
        listener_unique_id: u16,
        flags: AcmpFlags,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.submit_acmp(
            AcmpMessageType::ConnectTxCommand,
            talker_entity_id,
            talker_unique_id,
            listener_entity_id,
            listener_unique_id,
            flags,
            now,
        )
    }

    pub fn disconnect_tx(
        &mut self,
        talker_entity_id: EntityId,
        talker_unique_id: u16,
        listener_entity_id: EntityId,
        listener_unique_id: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.submit_acmp(
            AcmpMessageType::DisconnectTxCommand,
            talker_entity_id,
            talker_unique_id,
            listener_entity_id,
            listener_unique_id,
            AcmpFlags::empty(),
            now,
        )
    }

    pub fn get_tx_state(
        &mut self,
        talker_entity_id: EntityId,
        talker_unique_id: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.submit_acmp(
            AcmpMessageType::GetTxStateCommand,
            talker_entity_id,
            talker_unique_id,
            EntityId::ZERO,
            0,
            AcmpFlags::empty(),
            now,
        )
    }

    pub fn get_rx_state(
        &mut self,
        listener_entity_id: EntityId,
        listener_unique_id: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.submit_acmp(
            AcmpMessageType::GetRxStateCommand,
            EntityId::ZERO,
            0,
            listener_entity_id,
            listener_unique_id,
            AcmpFlags::empty(),
            now,
        )
    }

    pub fn get_tx_connection(
        &mut self,
        talker_entity_id: EntityId,
        talker_unique_id: u16,
        now: Timestamp,
    ) -> Result<NotificationId, Error> {
        self.submit_acmp(
            AcmpMessageType::GetTxConnectionCommand,
            talker_entity_id,
            talker_unique_id,
            EntityId::ZERO,
            0,
            AcmpFlags::empty(),
            now,
        )
    }

    // ------------------------------------------------------------------
    // Lookups and configuration
    // ------------------------------------------------------------------

    pub fn end_station_count(&self) -> usize {
        self.discovery.len()
    }

    pub fn end_station_by_index(&self, index: usize) -> Option<&EndStation> {
        self.discovery.by_index(index)
    }

    pub fn end_station_by_entity_id(&self, entity_id: EntityId) -> Option<&EndStation> {
        self.discovery.get(entity_id)
    }

    pub fn end_station_by_mac(&self, mac: Mac) -> Option<&EndStation> {
        self.discovery.by_mac(mac)
    }

    pub fn end_stations(&self) -> impl Iterator<Item = &EndStation> {
        self.discovery.iter()
    }

    /// The CONFIGURATION descriptor the entity currently runs.
    pub fn get_current_config_desc(
        &self,
        entity_id: EntityId,
    ) -> Option<&ConfigurationDescriptor> {
        let station = self.discovery.get(entity_id)?;
        self.get_config_desc(entity_id, station.current_configuration)
    }

    pub fn get_config_desc(
        &self,
        entity_id: EntityId,
        configuration_index: u16,
    ) -> Option<&ConfigurationDescriptor> {
        let station = self.discovery.get(entity_id)?;
        match station
            .registry
            .get(DescriptorType::Configuration as u16, configuration_index)?
        {
            Descriptor::Configuration(configuration) => Some(configuration),
            _ => None,
        }
    }

    pub fn set_capability_filters(&mut self, filters: CapabilityFilters) {
        self.discovery.set_filters(filters);
    }

    pub fn set_logging_level(&self, level: LogLevel) {
        self.logger.set_level(level);
    }

    pub fn set_max_inflight_read_descriptor(&mut self, max_inflight: Option<usize>) {
        self.enumeration.set_max_inflight(max_inflight);
    }

    pub fn notifications(&self) -> NotificationReceiver<Notification> {
        self.notifier.receiver()
    }

    pub fn acmp_notifications(&self) -> NotificationReceiver<AcmpNotification> {
        self.acmp_notifier.receiver()
    }

    pub fn logs(&self) -> LogReceiver {
        self.logger.receiver()
    }

    pub fn missed_notification_count(&self) -> u32 {
        self.notifier.missed_count()
    }

    pub fn missed_acmp_notification_count(&self) -> u32 {
        self.acmp_notifier.missed_count()
    }

    pub fn missed_log_count(&self) -> u32 {
        self.logger.missed_count()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn send_discover(&mut self, now: Timestamp) {
        let frame =
            Adpdu::discover(EntityId::ZERO).to_frame(AVDECC_MULTICAST_MAC, self.local_mac);
        if let Err(e) = self.net.send_frame(&frame) {
            self.logger
                .post(LogLevel::Error, format!("discover probe failed: {e}"), now);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        kind: NotificationKind,
        entity_id: EntityId,
        command_type: u16,
        descriptor_type: u16,
        descriptor_index: u16,
        status: CommandStatus,
        id: NotificationId,
    ) {
        self.notifier.post(Notification {
            kind,
            entity_id,
            command_type,
            descriptor_type,
            descriptor_index,
            status,
            id,
        });
    }
}

/// Fold an unsolicited state-change response into the stored descriptors.
fn apply_unsolicited_update(
    station: &mut EndStation,
    pdu: &AemPdu,
    descriptor_type: u16,
    descriptor_index: u16,
) {
    use crate::descriptor::StreamFormat;

    let payload: &[u8] = &pdu.payload;
    match AemCommandType::from_u16(pdu.command_type) {
        Some(AemCommandType::SetStreamFormat) if payload.len() >= 12 => {
            let format = u64::from_be_bytes(payload[4..12].try_into().expect("slice of 8"));
            if let Some(Descriptor::StreamInput(stream) | Descriptor::StreamOutput(stream)) =
                station.registry.get_mut(descriptor_type, descriptor_index)
            {
                stream.current_format = StreamFormat(format);
            }
        }
        Some(AemCommandType::SetSamplingRate) if payload.len() >= 8 => {
            let rate = u32::from_be_bytes(payload[4..8].try_into().expect("slice of 4"));
            if let Some(Descriptor::AudioUnit(unit)) =
                station.registry.get_mut(descriptor_type, descriptor_index)
            {
                unit.current_sampling_rate = rate;
            }
        }
        Some(AemCommandType::SetClockSource) if payload.len() >= 6 => {
            let source = u16::from_be_bytes([payload[4], payload[5]]);
            if let Some(Descriptor::ClockDomain(domain)) =
                station.registry.get_mut(descriptor_type, descriptor_index)
            {
                domain.clock_source_index = source;
            }
        }
        _ => {}
    }
}
