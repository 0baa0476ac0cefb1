//! ACMP controller state machine (IEEE 1722.1 clause 8.2.2).
//!
//! Transactions to any number of entities run concurrently; the
//! controller-global sequence id disambiguates responses, so there is no
//! per-destination serialization and no retry. Each command message type
//! carries its own standard timeout.

use crate::constants::{
    ACMP_CONNECT_RX_TIMEOUT_MS, ACMP_CONNECT_TX_TIMEOUT_MS, ACMP_DISCONNECT_RX_TIMEOUT_MS,
    ACMP_DISCONNECT_TX_TIMEOUT_MS, ACMP_GET_RX_STATE_TIMEOUT_MS, ACMP_GET_TX_CONNECTION_TIMEOUT_MS,
    ACMP_GET_TX_STATE_TIMEOUT_MS, AVDECC_MULTICAST_MAC,
};
use crate::error::Error;
use crate::log::{LogLevel, Logger};
use crate::message::acmp::{Acmpdu, AcmpFlags, AcmpMessageType};
use crate::message::{EntityId, Mac};
use crate::notification::{CommandStatus, NotificationId};
use crate::transport::AvbNetwork;
use crate::util::time::Timestamp;

/// A resolved ACMP transaction. On timeout `response` echoes the request so
/// the notification still carries the stream endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcmpCompletion {
    pub notification_id: NotificationId,
    pub command_type: AcmpMessageType,
    pub status: CommandStatus,
    pub response: Acmpdu,
}

struct InflightTransaction {
    sequence_id: u16,
    message_type: AcmpMessageType,
    request: Acmpdu,
    deadline: Timestamp,
    notification_id: NotificationId,
}

pub struct AcmpStateMachine {
    controller_entity_id: EntityId,
    local_mac: Mac,
    next_sequence_id: u16,
    inflight: Vec<InflightTransaction>,
    log: Logger,
}

fn timeout_for(message_type: AcmpMessageType) -> u64 {
    match message_type {
        AcmpMessageType::ConnectTxCommand => ACMP_CONNECT_TX_TIMEOUT_MS,
        AcmpMessageType::DisconnectTxCommand => ACMP_DISCONNECT_TX_TIMEOUT_MS,
        AcmpMessageType::GetTxStateCommand => ACMP_GET_TX_STATE_TIMEOUT_MS,
        AcmpMessageType::ConnectRxCommand => ACMP_CONNECT_RX_TIMEOUT_MS,
        AcmpMessageType::DisconnectRxCommand => ACMP_DISCONNECT_RX_TIMEOUT_MS,
        AcmpMessageType::GetRxStateCommand => ACMP_GET_RX_STATE_TIMEOUT_MS,
        AcmpMessageType::GetTxConnectionCommand => ACMP_GET_TX_CONNECTION_TIMEOUT_MS,
        // Responses never start a transaction.
        _ => ACMP_GET_TX_STATE_TIMEOUT_MS,
    }
}

impl AcmpStateMachine {
    pub fn new(log: Logger) -> Self {
        AcmpStateMachine {
            controller_entity_id: EntityId::ZERO,
            local_mac: Mac(0),
            next_sequence_id: 0,
            inflight: Vec::new(),
            log,
        }
    }

    pub fn set_identity(&mut self, controller_entity_id: EntityId, local_mac: Mac) {
        self.controller_entity_id = controller_entity_id;
        self.local_mac = local_mac;
    }

    pub fn inflight_count(&self) -> usize {
        self.inflight.len()
    }

    /// Originate one transaction. The PDU goes to the AVDECC multicast
    /// address; a send refusal leaves the record to expire on the next tick.
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        &mut self,
        message_type: AcmpMessageType,
        talker_entity_id: EntityId,
        talker_unique_id: u16,
        listener_entity_id: EntityId,
        listener_unique_id: u16,
        flags: AcmpFlags,
        notification_id: NotificationId,
        now: Timestamp,
        net: &mut dyn AvbNetwork,
    ) -> Result<u16, Error> {
        if !message_type.is_command() {
            return Err(Error::InvalidState("ACMP submit requires a command type"));
        }
        let sequence_id = self.next_sequence_id;
        self.next_sequence_id = self.next_sequence_id.wrapping_add(1);

        let request = Acmpdu::command(
            message_type,
            self.controller_entity_id,
            talker_entity_id,
            talker_unique_id,
            listener_entity_id,
            listener_unique_id,
            sequence_id,
            flags,
        );
        let frame = request.to_frame(AVDECC_MULTICAST_MAC, self.local_mac);
        let mut deadline = now + timeout_for(message_type);
        if let Err(e) = net.send_frame(&frame) {
            deadline = now;
            self.log.post(
                LogLevel::Error,
                format!("send_frame failed for ACMP sequence id {sequence_id}: {e}"),
                now,
            );
        }
        self.inflight.push(InflightTransaction {
            sequence_id,
            message_type,
            request,
            deadline,
            notification_id,
        });
        Ok(sequence_id)
    }

    /// Route a response PDU already verified to carry our controller id.
    pub fn handle_response(&mut self, pdu: &Acmpdu) -> Result<AcmpCompletion, Error> {
        let position = self
            .inflight
            .iter()
            .position(|t| {
                t.sequence_id == pdu.sequence_id
                    && t.message_type.response() == Some(pdu.message_type)
            })
            .ok_or(Error::SequenceMismatch(pdu.sequence_id))?;
        let transaction = self.inflight.swap_remove(position);
        Ok(AcmpCompletion {
            notification_id: transaction.notification_id,
            command_type: transaction.message_type,
            status: CommandStatus::Protocol(pdu.status),
            response: pdu.clone(),
        })
    }

    /// Expire transactions past their per-type deadline; no retries.
    pub fn tick(&mut self, now: Timestamp) -> Vec<AcmpCompletion> {
        let mut completions = Vec::new();
        let mut i = 0;
        while i < self.inflight.len() {
            if self.inflight[i].deadline <= now {
                let transaction = self.inflight.swap_remove(i);
                self.log.post(
                    LogLevel::Error,
                    format!(
                        "ACMP timeout, sequence id {}, talker {}, listener {}",
                        transaction.sequence_id,
                        transaction.request.talker_entity_id,
                        transaction.request.listener_entity_id
                    ),
                    now,
                );
                completions.push(AcmpCompletion {
                    notification_id: transaction.notification_id,
                    command_type: transaction.message_type,
                    status: CommandStatus::Timeout,
                    response: transaction.request,
                });
            } else {
                i += 1;
            }
        }
        completions
    }

    /// Resolve every outstanding transaction as canceled.
    pub fn cancel_all(&mut self) -> Vec<AcmpCompletion> {
        self.inflight
            .drain(..)
            .map(|transaction| AcmpCompletion {
                notification_id: transaction.notification_id,
                command_type: transaction.message_type,
                status: CommandStatus::Canceled,
                response: transaction.request,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::acmp::ACMP_STATUS_SUCCESS;
    use crate::message::{parse_frame, Pdu};
    use crate::transport::testing::MockNetwork;

    const US: EntityId = EntityId(0x2222);
    const TALKER: EntityId = EntityId(0x3333);
    const LISTENER: EntityId = EntityId(0x4444);

    fn machine() -> (AcmpStateMachine, MockNetwork) {
        let net = MockNetwork::new(Mac(0x0E_0000_0001));
        let mut sm = AcmpStateMachine::new(Logger::new(LogLevel::Verbose));
        sm.set_identity(US, net.local_mac());
        (sm, net)
    }

    fn sent_pdu(net: &MockNetwork, nth: usize) -> Acmpdu {
        let frames = net.sent_frames();
        let Pdu::Acmp(pdu) = parse_frame(&frames[nth]).expect("sent frame parses").pdu else {
            panic!("expected ACMP frame");
        };
        pdu
    }

    #[test]
    fn sequence_space_is_controller_global() {
        let (mut sm, mut net) = machine();
        let a = sm
            .submit(
                AcmpMessageType::ConnectRxCommand,
                TALKER,
                0,
                LISTENER,
                0,
                AcmpFlags::empty(),
                NotificationId(1),
                0,
                &mut net,
            )
            .unwrap();
        let b = sm
            .submit(
                AcmpMessageType::GetTxStateCommand,
                EntityId(0x5555),
                0,
                EntityId::ZERO,
                0,
                AcmpFlags::empty(),
                NotificationId(2),
                0,
                &mut net,
            )
            .unwrap();
        assert_eq!((a, b), (0, 1));
        // Both on the wire at once; no per-destination gating.
        assert_eq!(net.sent_count(), 2);
        assert_eq!(sent_pdu(&net, 0).controller_entity_id, US);
    }

    #[test]
    fn response_matches_on_type_and_sequence() {
        let (mut sm, mut net) = machine();
        sm.submit(
            AcmpMessageType::ConnectRxCommand,
            TALKER,
            0,
            LISTENER,
            1,
            AcmpFlags::empty(),
            NotificationId(7),
            0,
            &mut net,
        )
        .unwrap();
        let mut response = sent_pdu(&net, 0);
        response.message_type = AcmpMessageType::ConnectRxResponse;
        response.status = ACMP_STATUS_SUCCESS;
        response.connection_count = 1;

        // A response of the wrong type does not match.
        let mut wrong = response.clone();
        wrong.message_type = AcmpMessageType::ConnectTxResponse;
        assert!(sm.handle_response(&wrong).is_err());

        let done = sm.handle_response(&response).expect("matches");
        assert_eq!(done.notification_id, NotificationId(7));
        assert_eq!(done.response.connection_count, 1);
        assert_eq!(sm.inflight_count(), 0);
    }

    #[test]
    fn per_type_timeouts_no_retry() {
        let (mut sm, mut net) = machine();
        sm.submit(
            AcmpMessageType::ConnectRxCommand,
            TALKER,
            0,
            LISTENER,
            0,
            AcmpFlags::empty(),
            NotificationId(1),
            0,
            &mut net,
        )
        .unwrap();
        sm.submit(
            AcmpMessageType::GetTxStateCommand,
            TALKER,
            0,
            EntityId::ZERO,
            0,
            AcmpFlags::empty(),
            NotificationId(2),
            0,
            &mut net,
        )
        .unwrap();

        // GET_TX_STATE expires at 200 ms, CONNECT_RX only at 4.5 s.
        let early = sm.tick(200);
        assert_eq!(early.len(), 1);
        assert_eq!(early[0].notification_id, NotificationId(2));
        assert_eq!(net.sent_count(), 2); // no retransmissions

        assert!(sm.tick(4499).is_empty());
        let late = sm.tick(4500);
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].status, CommandStatus::Timeout);
        // The timed-out completion still names the endpoints.
        assert_eq!(late[0].response.talker_entity_id, TALKER);
    }

    #[test]
    fn cancel_all_flushes_inflight() {
        let (mut sm, mut net) = machine();
        for i in 0..3 {
            sm.submit(
                AcmpMessageType::ConnectRxCommand,
                TALKER,
                i,
                LISTENER,
                i,
                AcmpFlags::empty(),
                NotificationId(u64::from(i) + 1),
                0,
                &mut net,
            )
            .unwrap();
        }
        let canceled = sm.cancel_all();
        assert_eq!(canceled.len(), 3);
        assert!(canceled.iter().all(|c| c.status == CommandStatus::Canceled));
    }
}
