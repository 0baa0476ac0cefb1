//! The cooperative event loop. One tokio task owns the [`Controller`] and
//! is its sole mutator; everything else talks to it through queues:
//! inbound frames over a recycled-buffer channel, submissions over a
//! bounded command queue with oneshot replies, and results back out through
//! the notification and log rings.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thingbuf::mpsc as frame_mpsc;
use thingbuf::recycling::WithCapacity;
use tokio::sync::{mpsc, oneshot};

use crate::constants::SYSTEM_TICK_MS;
use crate::controller::Controller;
use crate::discovery::CapabilityFilters;
use crate::end_station::EndStationState;
use crate::error::Error;
use crate::log::{LogLevel, LogReceiver};
use crate::message::acmp::{AcmpFlags, AcmpMessageType};
use crate::message::{EntityId, Mac};
use crate::notification::{AcmpNotification, Notification, NotificationId, NotificationReceiver};
use crate::transport::Packet;
use crate::util::time::MonotonicClock;
use crate::CommandPayload;

const FRAME_CHANNEL_CAPACITY: usize = 64;
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// A point-in-time view of one end station, for cross-thread queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndStationSummary {
    pub entity_id: EntityId,
    pub mac: Mac,
    pub state: EndStationState,
    pub current_configuration: u16,
    pub descriptor_count: usize,
    pub read_error_count: u32,
}

enum SystemCommand {
    SendAemCommand {
        entity_id: EntityId,
        command_type: u16,
        payload: CommandPayload,
        reply: oneshot::Sender<Result<NotificationId, Error>>,
    },
    ReadDescriptor {
        entity_id: EntityId,
        descriptor_type: u16,
        descriptor_index: u16,
        reply: oneshot::Sender<Result<NotificationId, Error>>,
    },
    ControllerAvailable {
        entity_id: EntityId,
        reply: oneshot::Sender<Result<NotificationId, Error>>,
    },
    Acmp {
        message_type: AcmpMessageType,
        talker_entity_id: EntityId,
        talker_unique_id: u16,
        listener_entity_id: EntityId,
        listener_unique_id: u16,
        flags: AcmpFlags,
        reply: oneshot::Sender<Result<NotificationId, Error>>,
    },
    SetCapabilityFilters(CapabilityFilters),
    SetLoggingLevel(LogLevel),
    SetMaxInflightReadDescriptor(Option<usize>),
    Snapshot {
        reply: oneshot::Sender<Vec<EndStationSummary>>,
    },
    Shutdown,
}

/// Delivers raw received frames into the loop; hand its `deliver` to the
/// network backend as the receive handler. Frames arriving while the
/// channel is full are counted and dropped, never blocked on.
#[derive(Clone)]
pub struct FrameSender {
    tx: frame_mpsc::Sender<Packet, WithCapacity>,
    dropped: Arc<AtomicU32>,
}

impl FrameSender {
    pub fn deliver(&self, frame: &[u8]) {
        match self.tx.try_send_ref() {
            Ok(mut slot) => {
                slot.bytes.clear();
                slot.bytes.extend_from_slice(frame);
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn dropped_count(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Thread-safe face of a running [`System`].
#[derive(Clone)]
pub struct SystemHandle {
    commands: mpsc::Sender<SystemCommand>,
    frames: FrameSender,
    notifications: NotificationReceiver<Notification>,
    acmp_notifications: NotificationReceiver<AcmpNotification>,
    logs: LogReceiver,
}

impl SystemHandle {
    pub fn frame_sender(&self) -> FrameSender {
        self.frames.clone()
    }

    pub fn notifications(&self) -> NotificationReceiver<Notification> {
        self.notifications.clone()
    }

    pub fn acmp_notifications(&self) -> NotificationReceiver<AcmpNotification> {
        self.acmp_notifications.clone()
    }

    pub fn logs(&self) -> LogReceiver {
        self.logs.clone()
    }

    async fn submit(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<NotificationId, Error>>) -> SystemCommand,
    ) -> Result<NotificationId, Error> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(build(reply_tx))
            .await
            .map_err(|_| Error::InvalidState("system stopped"))?;
        reply_rx
            .await
            .map_err(|_| Error::InvalidState("system stopped"))?
    }

    pub async fn send_aem_command(
        &self,
        entity_id: EntityId,
        command_type: u16,
        payload: CommandPayload,
    ) -> Result<NotificationId, Error> {
        self.submit(|reply| SystemCommand::SendAemCommand {
            entity_id,
            command_type,
            payload,
            reply,
        })
        .await
    }

    pub async fn read_descriptor(
        &self,
        entity_id: EntityId,
        descriptor_type: u16,
        descriptor_index: u16,
    ) -> Result<NotificationId, Error> {
        self.submit(|reply| SystemCommand::ReadDescriptor {
            entity_id,
            descriptor_type,
            descriptor_index,
            reply,
        })
        .await
    }

    pub async fn controller_available(
        &self,
        entity_id: EntityId,
    ) -> Result<NotificationId, Error> {
        self.submit(|reply| SystemCommand::ControllerAvailable { entity_id, reply })
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn acmp_command(
        &self,
        message_type: AcmpMessageType,
        talker_entity_id: EntityId,
        talker_unique_id: u16,
        listener_entity_id: EntityId,
        listener_unique_id: u16,
        flags: AcmpFlags,
    ) -> Result<NotificationId, Error> {
        self.submit(|reply| SystemCommand::Acmp {
            message_type,
            talker_entity_id,
            talker_unique_id,
            listener_entity_id,
            listener_unique_id,
            flags,
            reply,
        })
        .await
    }

    pub async fn connect_rx(
        &self,
        talker_entity_id: EntityId,
        talker_unique_id: u16,
        listener_entity_id: EntityId,
        listener_unique_id: u16,
        flags: AcmpFlags,
    ) -> Result<NotificationId, Error> {
        self.acmp_command(
            AcmpMessageType::ConnectRxCommand,
            talker_entity_id,
            talker_unique_id,
            listener_entity_id,
            listener_unique_id,
            flags,
        )
        .await
    }

    pub async fn disconnect_rx(
        &self,
        talker_entity_id: EntityId,
        talker_unique_id: u16,
        listener_entity_id: EntityId,
        listener_unique_id: u16,
    ) -> Result<NotificationId, Error> {
        self.acmp_command(
            AcmpMessageType::DisconnectRxCommand,
            talker_entity_id,
            talker_unique_id,
            listener_entity_id,
            listener_unique_id,
            AcmpFlags::empty(),
        )
        .await
    }

    pub async fn set_capability_filters(&self, filters: CapabilityFilters) {
        let _ = self
            .commands
            .send(SystemCommand::SetCapabilityFilters(filters))
            .await;
    }

    pub async fn set_logging_level(&self, level: LogLevel) {
        let _ = self
            .commands
            .send(SystemCommand::SetLoggingLevel(level))
            .await;
    }

    pub async fn set_max_inflight_read_descriptor(&self, max_inflight: Option<usize>) {
        let _ = self
            .commands
            .send(SystemCommand::SetMaxInflightReadDescriptor(max_inflight))
            .await;
    }

    /// Snapshot of the end station table.
    pub async fn snapshot(&self) -> Result<Vec<EndStationSummary>, Error> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(SystemCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| Error::InvalidState("system stopped"))?;
        reply_rx
            .await
            .map_err(|_| Error::InvalidState("system stopped"))
    }

    /// Stop the loop; all inflight commands resolve as canceled.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(SystemCommand::Shutdown).await;
    }
}

/// Owns the controller and drives it from frames, submissions and a timer.
pub struct System {
    controller: Controller,
    frames: frame_mpsc::Receiver<Packet, WithCapacity>,
    commands: mpsc::Receiver<SystemCommand>,
    clock: MonotonicClock,
    tick: Duration,
}

impl System {
    pub fn new(controller: Controller) -> (System, SystemHandle) {
        let recycle = WithCapacity::new()
            .with_min_capacity(128)
            .with_max_capacity(1600);
        let (frame_tx, frame_rx) = frame_mpsc::with_recycle(FRAME_CHANNEL_CAPACITY, recycle);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let handle = SystemHandle {
            commands: command_tx,
            frames: FrameSender {
                tx: frame_tx,
                dropped: Arc::new(AtomicU32::new(0)),
            },
            notifications: controller.notifications(),
            acmp_notifications: controller.acmp_notifications(),
            logs: controller.logs(),
        };
        let system = System {
            controller,
            frames: frame_rx,
            commands: command_rx,
            clock: MonotonicClock::new(),
            tick: Duration::from_millis(SYSTEM_TICK_MS),
        };
        (system, handle)
    }

    /// Run until shutdown or until every handle is gone. Consumes the
    /// system; spawn it on the runtime of your choice.
    pub async fn run(self) {
        let System {
            mut controller,
            frames,
            mut commands,
            clock,
            tick,
        } = self;

        controller.start(clock.now_ms());
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = frames.recv_ref() => match received {
                    Some(packet) => controller.handle_frame(&packet.bytes, clock.now_ms()),
                    // The backend dropped its sender: the interface is gone.
                    None => break,
                },
                command = commands.recv() => match command {
                    Some(command) => {
                        if Self::apply(&mut controller, command, &clock) {
                            break;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => controller.tick(clock.now_ms()),
            }
        }
        controller.shutdown(clock.now_ms());
    }

    /// Returns true when the command asks the loop to stop.
    fn apply(controller: &mut Controller, command: SystemCommand, clock: &MonotonicClock) -> bool {
        let now = clock.now_ms();
        match command {
            SystemCommand::SendAemCommand {
                entity_id,
                command_type,
                payload,
                reply,
            } => {
                let _ = reply.send(controller.send_aem_command(
                    entity_id,
                    command_type,
                    payload,
                    now,
                ));
            }
            SystemCommand::ReadDescriptor {
                entity_id,
                descriptor_type,
                descriptor_index,
                reply,
            } => {
                let _ = reply.send(controller.read_descriptor(
                    entity_id,
                    descriptor_type,
                    descriptor_index,
                    now,
                ));
            }
            SystemCommand::ControllerAvailable { entity_id, reply } => {
                let _ = reply.send(controller.controller_available(entity_id, now));
            }
            SystemCommand::Acmp {
                message_type,
                talker_entity_id,
                talker_unique_id,
                listener_entity_id,
                listener_unique_id,
                flags,
                reply,
            } => {
                let result = match message_type {
                    AcmpMessageType::ConnectRxCommand => controller.connect_rx(
                        talker_entity_id,
                        talker_unique_id,
                        listener_entity_id,
                        listener_unique_id,
                        flags,
                        now,
                    ),
                    AcmpMessageType::DisconnectRxCommand => controller.disconnect_rx(
                        talker_entity_id,
                        talker_unique_id,
                        listener_entity_id,
                        listener_unique_id,
                        now,
                    ),
                    AcmpMessageType::ConnectTxCommand => controller.connect_tx(
                        talker_entity_id,
                        talker_unique_id,
                        listener_entity_id,
                        listener_unique_id,
                        flags,
                        now,
                    ),
                    AcmpMessageType::DisconnectTxCommand => controller.disconnect_tx(
                        talker_entity_id,
                        talker_unique_id,
                        listener_entity_id,
                        listener_unique_id,
                        now,
                    ),
                    AcmpMessageType::GetTxStateCommand => {
                        controller.get_tx_state(talker_entity_id, talker_unique_id, now)
                    }
                    AcmpMessageType::GetRxStateCommand => {
                        controller.get_rx_state(listener_entity_id, listener_unique_id, now)
                    }
                    AcmpMessageType::GetTxConnectionCommand => {
                        controller.get_tx_connection(talker_entity_id, talker_unique_id, now)
                    }
                    _ => Err(Error::InvalidState("ACMP submit requires a command type")),
                };
                let _ = reply.send(result);
            }
            SystemCommand::SetCapabilityFilters(filters) => {
                controller.set_capability_filters(filters);
            }
            SystemCommand::SetLoggingLevel(level) => controller.set_logging_level(level),
            SystemCommand::SetMaxInflightReadDescriptor(max_inflight) => {
                controller.set_max_inflight_read_descriptor(max_inflight);
            }
            SystemCommand::Snapshot { reply } => {
                let summaries = controller
                    .end_stations()
                    .map(|station| EndStationSummary {
                        entity_id: station.entity_id,
                        mac: station.mac,
                        state: station.state,
                        current_configuration: station.current_configuration,
                        descriptor_count: station.registry.len(),
                        read_error_count: station.read_error_count,
                    })
                    .collect();
                let _ = reply.send(summaries);
            }
            SystemCommand::Shutdown => return true,
        }
        false
    }
}
