//! Protocol constants shared across the library.
//! Timeouts follow IEEE 1722.1-2013 clauses 6.2, 8.2 and 9.2.

use crate::message::Mac;

/// EtherType carrying all AVTP traffic, control PDUs included.
pub const ETHERTYPE_AVTP: u16 = 0x22F0;
/// 802.1Q tag protocol identifier, skipped transparently on receive.
pub const ETHERTYPE_VLAN: u16 = 0x8100;

/// Destination MAC for ADP and ACMP multicast (91:E0:F0:01:00:00).
pub const AVDECC_MULTICAST_MAC: Mac = Mac(0x91E0_F001_0000);

/// AVTP control PDU subtypes.
pub const SUBTYPE_ADP: u8 = 0x7A;
pub const SUBTYPE_AECP: u8 = 0x7B;
pub const SUBTYPE_ACMP: u8 = 0x7C;

/// Octets of an Ethernet II header (dest + src + ethertype).
pub const ETHER_HDR_LEN: usize = 14;
/// Octets of the AVTPDU common control header, `stream_id` included.
pub const CONTROL_HDR_LEN: usize = 12;
/// `control_data_length` of every ADPDU.
pub const ADPDU_CONTROL_DATA_LEN: u16 = 56;
/// `control_data_length` of every ACMPDU.
pub const ACMPDU_CONTROL_DATA_LEN: u16 = 44;
/// AECP `control_data_length` floor: controller_entity_id + sequence_id
/// + command_type, before any command payload.
pub const AECPDU_AEM_BASE_LEN: u16 = 12;

/// Default AECP command timeout (clause 9.2.1).
pub const AECP_COMMAND_TIMEOUT_MS: u64 = 250;
/// Retransmissions after the first timeout.
pub const AECP_RETRY_COUNT: u8 = 1;
/// Ceiling on IN_PROGRESS deadline extension, measured from submission.
pub const AECP_IN_PROGRESS_CAP_MS: u64 = 2500;

/// ACMP command timeouts (clause 8.2.2), indexed by command message type.
pub const ACMP_CONNECT_TX_TIMEOUT_MS: u64 = 2000;
pub const ACMP_DISCONNECT_TX_TIMEOUT_MS: u64 = 200;
pub const ACMP_GET_TX_STATE_TIMEOUT_MS: u64 = 200;
pub const ACMP_CONNECT_RX_TIMEOUT_MS: u64 = 4500;
pub const ACMP_DISCONNECT_RX_TIMEOUT_MS: u64 = 500;
pub const ACMP_GET_RX_STATE_TIMEOUT_MS: u64 = 200;
pub const ACMP_GET_TX_CONNECTION_TIMEOUT_MS: u64 = 200;

/// Interval between solicited ENTITY_DISCOVER probes. The standard leaves
/// this to the controller; anything in [1 s, 10 s] is conformant.
pub const ADP_DISCOVER_INTERVAL_MS: u64 = 5000;

/// Capacity of the controller notification ring.
pub const NOTIFICATION_RING_CAPACITY: usize = 64;
/// Capacity of the ACMP notification ring.
pub const ACMP_NOTIFICATION_RING_CAPACITY: usize = 64;
/// Capacity of the log message ring.
pub const LOG_RING_CAPACITY: usize = 256;

/// Default timer granularity of the system event loop.
pub const SYSTEM_TICK_MS: u64 = 5;
