//! AECP controller state machine (IEEE 1722.1 clause 9.2.2.2).
//!
//! Commands to one target entity are serialized: at most one is on the wire
//! while the rest wait in a per-target queue, so completion order equals
//! submission order. Sequence IDs are 16-bit per-target counters; a
//! retransmission reuses the stored frame bytes and therefore the same
//! sequence id. IN_PROGRESS responses extend the running deadline without
//! spending the retry budget, up to a hard cap from submission time.

use std::collections::{HashMap, VecDeque};

use bytes::BytesMut;

use crate::constants::{AECP_COMMAND_TIMEOUT_MS, AECP_IN_PROGRESS_CAP_MS, AECP_RETRY_COUNT};
use crate::error::Error;
use crate::log::{LogLevel, Logger};
use crate::message::aecp::{AemPdu, AEM_STATUS_IN_PROGRESS};
use crate::message::{EntityId, Mac};
use crate::notification::{CommandStatus, NotificationId};
use crate::transport::AvbNetwork;
use crate::util::time::Timestamp;
use crate::CommandPayload;

/// A command resolved by the state machine, ready for routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AecpCompletion {
    pub target_entity_id: EntityId,
    pub notification_id: NotificationId,
    pub command_type: u16,
    pub status: CommandStatus,
    /// Response payload for matched responses; the original command payload
    /// for timeouts and cancellations, so descriptor references survive.
    pub payload: CommandPayload,
}

struct PendingCommand {
    command_type: u16,
    payload: CommandPayload,
    notification_id: NotificationId,
}

struct InflightCommand {
    sequence_id: u16,
    command_type: u16,
    payload: CommandPayload,
    frame: BytesMut,
    submitted_at: Timestamp,
    deadline: Timestamp,
    retries_remaining: u8,
    notification_id: NotificationId,
}

#[derive(Default)]
struct Target {
    mac: Mac,
    next_sequence_id: u16,
    current: Option<InflightCommand>,
    queue: VecDeque<PendingCommand>,
}

pub struct AecpStateMachine {
    controller_entity_id: EntityId,
    local_mac: Mac,
    targets: HashMap<EntityId, Target>,
    log: Logger,
}

impl AecpStateMachine {
    pub fn new(log: Logger) -> Self {
        AecpStateMachine {
            controller_entity_id: EntityId::ZERO,
            local_mac: Mac(0),
            targets: HashMap::new(),
            log,
        }
    }

    pub fn set_identity(&mut self, controller_entity_id: EntityId, local_mac: Mac) {
        self.controller_entity_id = controller_entity_id;
        self.local_mac = local_mac;
    }

    /// Number of commands queued or on the wire across all targets.
    pub fn inflight_count(&self) -> usize {
        self.targets
            .values()
            .map(|t| t.queue.len() + usize::from(t.current.is_some()))
            .sum()
    }

    /// Queue a command to `target`; it is transmitted immediately when the
    /// target has nothing on the wire.
    pub fn submit(
        &mut self,
        target_entity_id: EntityId,
        mac: Mac,
        command_type: u16,
        payload: CommandPayload,
        notification_id: NotificationId,
        now: Timestamp,
        net: &mut dyn AvbNetwork,
    ) {
        let target = self.targets.entry(target_entity_id).or_default();
        target.mac = mac;
        target.queue.push_back(PendingCommand {
            command_type,
            payload,
            notification_id,
        });
        if target.current.is_none() {
            self.start_next(target_entity_id, now, net);
        }
    }

    fn start_next(&mut self, target_entity_id: EntityId, now: Timestamp, net: &mut dyn AvbNetwork) {
        let Some(target) = self.targets.get_mut(&target_entity_id) else {
            return;
        };
        let Some(pending) = target.queue.pop_front() else {
            return;
        };
        let sequence_id = target.next_sequence_id;
        target.next_sequence_id = target.next_sequence_id.wrapping_add(1);

        let pdu = AemPdu::command(
            target_entity_id,
            self.controller_entity_id,
            sequence_id,
            pending.command_type,
            pending.payload.clone(),
        );
        let frame = pdu.to_frame(target.mac, self.local_mac);

        let mut inflight = InflightCommand {
            sequence_id,
            command_type: pending.command_type,
            payload: pending.payload,
            frame,
            submitted_at: now,
            deadline: now + AECP_COMMAND_TIMEOUT_MS,
            retries_remaining: AECP_RETRY_COUNT,
            notification_id: pending.notification_id,
        };
        if let Err(e) = net.send_frame(&inflight.frame) {
            // Expire on the next tick; retries get their own chance to send.
            inflight.deadline = now;
            self.log.post(
                LogLevel::Error,
                format!("send_frame failed for {target_entity_id}: {e}"),
                now,
            );
        }
        target.current = Some(inflight);
    }

    /// Route a solicited AEM response. Returns the resolved command, or
    /// `Err(SequenceMismatch)` when nothing inflight matches.
    pub fn handle_response(
        &mut self,
        pdu: &AemPdu,
        now: Timestamp,
        net: &mut dyn AvbNetwork,
    ) -> Result<Option<AecpCompletion>, Error> {
        let target = self
            .targets
            .get_mut(&pdu.target_entity_id)
            .ok_or(Error::SequenceMismatch(pdu.sequence_id))?;
        let matches = target.current.as_ref().is_some_and(|c| {
            c.sequence_id == pdu.sequence_id && c.command_type == pdu.command_type
        });
        if !matches {
            return Err(Error::SequenceMismatch(pdu.sequence_id));
        }

        if pdu.status == AEM_STATUS_IN_PROGRESS {
            let current = target.current.as_mut().expect("matched inflight");
            let cap = current.submitted_at + AECP_IN_PROGRESS_CAP_MS;
            current.deadline = (current.deadline + AECP_COMMAND_TIMEOUT_MS).min(cap);
            self.log.post(
                LogLevel::Debug,
                format!(
                    "IN_PROGRESS from {}, sequence id {} deadline extended",
                    pdu.target_entity_id, pdu.sequence_id
                ),
                now,
            );
            return Ok(None);
        }

        let resolved = target.current.take().expect("matched inflight");
        let completion = AecpCompletion {
            target_entity_id: pdu.target_entity_id,
            notification_id: resolved.notification_id,
            command_type: resolved.command_type,
            status: CommandStatus::Protocol(pdu.status),
            payload: pdu.payload.clone(),
        };
        self.start_next(pdu.target_entity_id, now, net);
        Ok(Some(completion))
    }

    /// Expire due inflight commands: retransmit while budget remains, then
    /// resolve as timed out and move the queue along.
    pub fn tick(&mut self, now: Timestamp, net: &mut dyn AvbNetwork) -> Vec<AecpCompletion> {
        let mut completions = Vec::new();
        let due: Vec<EntityId> = self
            .targets
            .iter()
            .filter(|(_, t)| t.current.as_ref().is_some_and(|c| c.deadline <= now))
            .map(|(id, _)| *id)
            .collect();

        for entity_id in due {
            let target = self.targets.get_mut(&entity_id).expect("due target");
            let current = target.current.as_mut().expect("due inflight");
            if current.retries_remaining > 0 {
                current.retries_remaining -= 1;
                current.deadline = now + AECP_COMMAND_TIMEOUT_MS;
                self.log.post(
                    LogLevel::Debug,
                    format!("resend command with sequence id {}", current.sequence_id),
                    now,
                );
                if let Err(e) = net.send_frame(&current.frame) {
                    current.deadline = now;
                    self.log.post(
                        LogLevel::Error,
                        format!("send_frame failed for {entity_id}: {e}"),
                        now,
                    );
                }
            } else {
                let resolved = target.current.take().expect("due inflight");
                self.log.post(
                    LogLevel::Error,
                    format!(
                        "command timeout, {entity_id}, {}, sequence id {}",
                        crate::util::aem_command_name(resolved.command_type),
                        resolved.sequence_id
                    ),
                    now,
                );
                completions.push(AecpCompletion {
                    target_entity_id: entity_id,
                    notification_id: resolved.notification_id,
                    command_type: resolved.command_type,
                    status: CommandStatus::Timeout,
                    payload: resolved.payload,
                });
                self.start_next(entity_id, now, net);
            }
        }
        completions
    }

    /// Resolve everything queued or inflight for one target as canceled.
    /// The sequence counter survives so a late response to an old command
    /// can never match a fresh one.
    pub fn cancel_target(&mut self, target_entity_id: EntityId) -> Vec<AecpCompletion> {
        let Some(target) = self.targets.get_mut(&target_entity_id) else {
            return Vec::new();
        };
        let mut completions = Vec::new();
        if let Some(current) = target.current.take() {
            completions.push(AecpCompletion {
                target_entity_id,
                notification_id: current.notification_id,
                command_type: current.command_type,
                status: CommandStatus::Canceled,
                payload: current.payload,
            });
        }
        for pending in target.queue.drain(..) {
            completions.push(AecpCompletion {
                target_entity_id,
                notification_id: pending.notification_id,
                command_type: pending.command_type,
                status: CommandStatus::Canceled,
                payload: pending.payload,
            });
        }
        completions
    }

    /// Cancel every target; used on fatal shutdown.
    pub fn cancel_all(&mut self) -> Vec<AecpCompletion> {
        let ids: Vec<EntityId> = self.targets.keys().copied().collect();
        ids.into_iter()
            .flat_map(|id| self.cancel_target(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::aecp::{self, AecpMessageType, AemCommandType, AEM_STATUS_SUCCESS};
    use crate::message::{parse_frame, Pdu};
    use crate::transport::testing::MockNetwork;

    const TARGET: EntityId = EntityId(0x1111);
    const TARGET_MAC: Mac = Mac(0xAA_BBCC_DDEE);
    const US: EntityId = EntityId(0x2222);

    fn machine() -> (AecpStateMachine, MockNetwork) {
        let net = MockNetwork::new(Mac(0x0E_0000_0001));
        let mut sm = AecpStateMachine::new(Logger::new(LogLevel::Verbose));
        sm.set_identity(US, net.local_mac());
        (sm, net)
    }

    fn submit_read(
        sm: &mut AecpStateMachine,
        net: &mut MockNetwork,
        id: u64,
        index: u16,
        now: Timestamp,
    ) {
        sm.submit(
            TARGET,
            TARGET_MAC,
            AemCommandType::ReadDescriptor as u16,
            aecp::read_descriptor(0, 0x0005, index),
            NotificationId(id),
            now,
            net,
        );
    }

    fn sent_pdu(net: &MockNetwork, nth: usize) -> AemPdu {
        let frames = net.sent_frames();
        let Pdu::Aecp(pdu) = parse_frame(&frames[nth]).expect("sent frame parses").pdu else {
            panic!("expected AECP frame");
        };
        pdu
    }

    fn response_for(cmd: &AemPdu, status: u8) -> AemPdu {
        let mut pdu = cmd.clone();
        pdu.message_type = AecpMessageType::AemResponse;
        pdu.status = status;
        pdu
    }

    #[test]
    fn serializes_per_target_and_allocates_sequence_ids() {
        let (mut sm, mut net) = machine();
        submit_read(&mut sm, &mut net, 1, 0, 0);
        submit_read(&mut sm, &mut net, 2, 1, 0);
        // Second command queued, only one on the wire.
        assert_eq!(net.sent_count(), 1);
        assert_eq!(sent_pdu(&net, 0).sequence_id, 0);

        let done = sm
            .handle_response(&response_for(&sent_pdu(&net, 0), AEM_STATUS_SUCCESS), 10, &mut net)
            .expect("matches")
            .expect("completes");
        assert_eq!(done.notification_id, NotificationId(1));
        assert!(done.status.is_success());
        // Completion starts the next queued command with the next sequence id.
        assert_eq!(net.sent_count(), 2);
        assert_eq!(sent_pdu(&net, 1).sequence_id, 1);
    }

    #[test]
    fn retry_keeps_sequence_id_then_times_out() {
        let (mut sm, mut net) = machine();
        submit_read(&mut sm, &mut net, 1, 0, 0);

        // First deadline: one retransmission, byte-identical frame.
        assert!(sm.tick(250, &mut net).is_empty());
        let frames = net.sent_frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], frames[1]);

        // Second deadline: terminal timeout.
        let completions = sm.tick(500, &mut net);
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].status, CommandStatus::Timeout);
        assert_eq!(completions[0].command_type, AemCommandType::ReadDescriptor as u16);
        assert_eq!(sm.inflight_count(), 0);
    }

    #[test]
    fn in_progress_extends_deadline_without_spending_retries() {
        let (mut sm, mut net) = machine();
        submit_read(&mut sm, &mut net, 1, 0, 0);
        let cmd = sent_pdu(&net, 0);

        let extended = sm
            .handle_response(&response_for(&cmd, AEM_STATUS_IN_PROGRESS), 100, &mut net)
            .expect("matches");
        assert!(extended.is_none());

        // Old deadline passes without a retransmission.
        assert!(sm.tick(250, &mut net).is_empty());
        assert_eq!(net.sent_count(), 1);

        // Extended deadline expires: the single retry still happens.
        assert!(sm.tick(500, &mut net).is_empty());
        assert_eq!(net.sent_count(), 2);
    }

    #[test]
    fn in_progress_extension_is_capped() {
        let (mut sm, mut net) = machine();
        submit_read(&mut sm, &mut net, 1, 0, 0);
        let cmd = sent_pdu(&net, 0);
        for _ in 0..20 {
            let _ = sm.handle_response(&response_for(&cmd, AEM_STATUS_IN_PROGRESS), 100, &mut net);
        }
        // Deadline is clamped to submission + 2.5 s; past it the retry fires.
        assert!(sm.tick(2499, &mut net).is_empty());
        assert_eq!(net.sent_count(), 1);
        sm.tick(2500, &mut net);
        assert_eq!(net.sent_count(), 2);
    }

    #[test]
    fn mismatched_sequence_is_rejected() {
        let (mut sm, mut net) = machine();
        submit_read(&mut sm, &mut net, 1, 0, 0);
        let mut response = response_for(&sent_pdu(&net, 0), AEM_STATUS_SUCCESS);
        response.sequence_id = 0x0BAD;
        assert_eq!(
            sm.handle_response(&response, 10, &mut net),
            Err(Error::SequenceMismatch(0x0BAD))
        );
        assert_eq!(sm.inflight_count(), 1);
    }

    #[test]
    fn send_failure_resolves_as_timeout_after_retries() {
        let (mut sm, mut net) = machine();
        net.set_fail_sends(true);
        submit_read(&mut sm, &mut net, 1, 0, 0);
        assert!(sm.tick(0, &mut net).is_empty()); // retry, also refused
        let completions = sm.tick(1, &mut net);
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].status, CommandStatus::Timeout);
    }

    #[test]
    fn cancel_target_resolves_queue_and_current() {
        let (mut sm, mut net) = machine();
        submit_read(&mut sm, &mut net, 1, 0, 0);
        submit_read(&mut sm, &mut net, 2, 1, 0);
        submit_read(&mut sm, &mut net, 3, 2, 0);
        let completions = sm.cancel_target(TARGET);
        assert_eq!(completions.len(), 3);
        assert!(completions
            .iter()
            .all(|c| c.status == CommandStatus::Canceled));
        assert_eq!(sm.inflight_count(), 0);
    }
}
